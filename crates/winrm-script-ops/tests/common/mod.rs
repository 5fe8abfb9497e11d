#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use winrm_script_ops::{
    integration_services, ArgumentBinder, RawExecutionResult, ScriptClient, Session,
    SessionExecutor, TemplateRegistry, TransportError,
};

/// One canned reply from the scripted session.
#[derive(Debug, Clone)]
pub enum Reply {
    Ok(&'static str),
    Fail(i32, &'static str),
    Disconnect(&'static str),
}

/// Fake session that answers scripts from a queue and records what it was sent.
///
/// When the queue runs out every further script succeeds with empty output.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSession {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    sent: Arc<Mutex<Vec<String>>>,
}

impl ScriptedSession {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into_iter().collect())),
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Scripts sent so far, shared with clones handed to a client.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().expect("sent lock").clone()
    }
}

#[async_trait]
impl Session for ScriptedSession {
    async fn send(&mut self, script: &str) -> Result<RawExecutionResult, TransportError> {
        self.sent.lock().expect("sent lock").push(script.to_string());
        let reply = self.replies.lock().expect("replies lock").pop_front();
        match reply {
            None => Ok(RawExecutionResult::succeeded("")),
            Some(Reply::Ok(stdout)) => Ok(RawExecutionResult::succeeded(stdout)),
            Some(Reply::Fail(code, stderr)) => Ok(RawExecutionResult::failed(Some(code), stderr)),
            Some(Reply::Disconnect(message)) => Err(TransportError::new(message)),
        }
    }
}

/// Registry with the integration service templates plus a generic `GetList`.
pub fn registry() -> Arc<TemplateRegistry> {
    let mut registry = TemplateRegistry::new();
    integration_services::register_templates(&mut registry).expect("register templates");
    registry
        .register(
            "GetList",
            "Get-Item -Name '{{ target }}' | ConvertTo-Json -Compress",
        )
        .expect("register GetList");
    registry
        .register("SetItem", "Set-Item -Name '{{ target }}' -Value '{{ value }}'")
        .expect("register SetItem");
    Arc::new(registry)
}

pub fn binder() -> Arc<ArgumentBinder> {
    Arc::new(
        integration_services::register_categories(ArgumentBinder::new())
            .expect("register categories"),
    )
}

/// Client over a scripted session; the returned session handle shares its log.
pub fn client(replies: impl IntoIterator<Item = Reply>) -> (ScriptClient<ScriptedSession>, ScriptedSession) {
    let session = ScriptedSession::new(replies);
    let client = ScriptClient::new(registry(), binder(), SessionExecutor::new(session.clone()));
    (client, session)
}
