//! Command facade: bind, render, execute and decode in one call.

use crate::binder::{ArgumentBinder, ScriptArgs};
use crate::config::ScriptOpsConfig;
use crate::decoder::{decode_list, decode_optional};
use crate::executor::{ExecutionMode, SessionExecutor};
use crate::session::Session;
use crate::template::TemplateRegistry;
use crate::ScriptOpsResult;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Runs registered script templates against one remote session.
///
/// The registry and binder are shared and immutable; the executor, and the
/// session it owns, belong to this client alone. Drive several sessions
/// concurrently by giving each its own client.
#[derive(Debug)]
pub struct ScriptClient<S> {
    registry: Arc<TemplateRegistry>,
    binder: Arc<ArgumentBinder>,
    executor: SessionExecutor<S>,
}

impl<S: Session> ScriptClient<S> {
    pub fn new(
        registry: Arc<TemplateRegistry>,
        binder: Arc<ArgumentBinder>,
        executor: SessionExecutor<S>,
    ) -> Self {
        Self {
            registry,
            binder,
            executor,
        }
    }

    /// Build a client whose executor honours the configured command timeout.
    pub fn from_config(
        config: &ScriptOpsConfig,
        registry: Arc<TemplateRegistry>,
        binder: Arc<ArgumentBinder>,
        session: S,
    ) -> Self {
        let mut executor = SessionExecutor::new(session);
        if let Some(limit) = config.command_timeout() {
            executor = executor.with_timeout(limit);
        }
        Self::new(registry, binder, executor)
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    pub fn binder(&self) -> &ArgumentBinder {
        &self.binder
    }

    pub fn executor(&self) -> &SessionExecutor<S> {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut SessionExecutor<S> {
        &mut self.executor
    }

    /// Bind and render without sending anything.
    pub fn render<A: ScriptArgs + ?Sized>(&self, template: &str, args: &A) -> ScriptOpsResult<String> {
        let bound = self.binder.bind(args)?;
        self.registry.render(template, &bound)
    }

    /// Run a template and decode stdout as a sequence of `T`.
    pub async fn run_with_result<T, A>(&mut self, template: &str, args: &A) -> ScriptOpsResult<Vec<T>>
    where
        T: DeserializeOwned,
        A: ScriptArgs + ?Sized,
    {
        let script = self.render(template, args)?;
        tracing::debug!(template, "Running script with result");
        let raw = self
            .executor
            .execute(&script, ExecutionMode::WithResult)
            .await?;
        decode_list(&raw.stdout)
    }

    /// Run a template whose output is at most one `T`.
    pub async fn run_optional<T, A>(&mut self, template: &str, args: &A) -> ScriptOpsResult<Option<T>>
    where
        T: DeserializeOwned,
        A: ScriptArgs + ?Sized,
    {
        let script = self.render(template, args)?;
        tracing::debug!(template, "Running script with optional result");
        let raw = self
            .executor
            .execute(&script, ExecutionMode::WithResult)
            .await?;
        decode_optional(&raw.stdout)
    }

    /// Run a template for its effect only.
    pub async fn run_fire_and_forget<A>(&mut self, template: &str, args: &A) -> ScriptOpsResult<()>
    where
        A: ScriptArgs + ?Sized,
    {
        let script = self.render(template, args)?;
        tracing::debug!(template, "Running fire-and-forget script");
        self.executor
            .execute(&script, ExecutionMode::FireAndForget)
            .await?;
        Ok(())
    }

    /// Run `(template, args)` items in order as fire-and-forget commands.
    ///
    /// Stops at the first failing item and returns its error unchanged;
    /// later items are never sent. Items that already ran are not rolled
    /// back, so a failed batch can leave the remote host partially updated
    /// and re-applying the batch runs the earlier items again.
    pub async fn apply_batch<N, A, I>(&mut self, items: I) -> ScriptOpsResult<()>
    where
        I: IntoIterator<Item = (N, A)>,
        N: AsRef<str>,
        A: ScriptArgs,
    {
        for (index, (template, args)) in items.into_iter().enumerate() {
            let template = template.as_ref();
            if let Err(err) = self.run_fire_and_forget(template, &args).await {
                tracing::warn!(
                    index,
                    template,
                    code = err.code(),
                    "Batch stopped at failing item"
                );
                return Err(err);
            }
        }
        Ok(())
    }
}
