use crate::session::{RawExecutionResult, Session};
use crate::{ScriptOpsError, ScriptOpsResult};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// How the caller wants a script's output treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Stdout is the payload.
    WithResult,
    /// Only success or failure matters; stdout is dropped.
    FireAndForget,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WithResult => "with_result",
            Self::FireAndForget => "fire_and_forget",
        }
    }
}

/// Owns a session and runs one script at a time on it.
#[derive(Debug)]
pub struct SessionExecutor<S> {
    session: S,
    timeout: Option<Duration>,
    cancel: Option<CancellationToken>,
    indeterminate: bool,
}

impl<S: Session> SessionExecutor<S> {
    pub fn new(session: S) -> Self {
        Self {
            session,
            timeout: None,
            cancel: None,
            indeterminate: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// True once a run was abandoned by timeout or cancellation. The remote
    /// side may or may not have finished that script.
    pub fn is_indeterminate(&self) -> bool {
        self.indeterminate
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn into_session(self) -> S {
        self.session
    }

    /// Run a script and wait for a definite outcome.
    pub async fn execute(
        &mut self,
        script: &str,
        mode: ExecutionMode,
    ) -> ScriptOpsResult<RawExecutionResult> {
        tracing::trace!(mode = mode.as_str(), script, "Sending remote script");
        let started = Instant::now();

        let limit = self.timeout;
        let cancel = self.cancel.clone();
        let send = async {
            match limit {
                Some(limit) => timeout(limit, self.session.send(script))
                    .await
                    .map_err(|_| ScriptOpsError::Timeout {
                        timeout_ms: limit.as_millis() as u64,
                    }),
                None => Ok(self.session.send(script).await),
            }
        };

        let outcome = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(ScriptOpsError::Cancelled),
                outcome = send => outcome,
            },
            None => send.await,
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;

        let raw = match outcome {
            Err(err) => {
                self.indeterminate = true;
                tracing::warn!(
                    mode = mode.as_str(),
                    elapsed_ms,
                    code = err.code(),
                    "Remote script abandoned"
                );
                return Err(err);
            }
            Ok(Err(err)) => {
                tracing::warn!(mode = mode.as_str(), elapsed_ms, error = %err, "Remote session transport failed");
                return Err(ScriptOpsError::Transport {
                    message: err.message,
                });
            }
            Ok(Ok(raw)) => raw,
        };

        if !raw.success {
            tracing::debug!(
                mode = mode.as_str(),
                elapsed_ms,
                exit_code = ?raw.exit_code,
                stderr = %raw.stderr,
                "Remote script failed"
            );
            return Err(ScriptOpsError::RemoteExecution {
                exit_code: raw.exit_code,
                stderr: raw.stderr,
            });
        }

        tracing::debug!(
            mode = mode.as_str(),
            elapsed_ms,
            stdout_len = raw.stdout.len(),
            "Remote script completed"
        );

        match mode {
            ExecutionMode::WithResult => Ok(raw),
            ExecutionMode::FireAndForget => Ok(RawExecutionResult {
                stdout: String::new(),
                ..raw
            }),
        }
    }
}
