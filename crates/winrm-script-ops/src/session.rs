//! The remote session seam.
//!
//! Connection setup, authentication and pooling belong to the caller; this
//! crate only needs something that can run a script and report what came
//! back.

use async_trait::async_trait;
use thiserror::Error;

/// Raw output of one remote script run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub success: bool,
}

impl RawExecutionResult {
    pub fn succeeded(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
            success: true,
        }
    }

    pub fn failed(exit_code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code,
            success: false,
        }
    }
}

/// The session could not deliver the script or collect its output.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A live channel to a remote PowerShell host.
///
/// `send` takes `&mut self`: a session runs one script at a time and must
/// not be shared between concurrent callers.
#[async_trait]
pub trait Session: Send {
    async fn send(&mut self, script: &str) -> Result<RawExecutionResult, TransportError>;
}

#[async_trait]
impl<S: Session + ?Sized> Session for Box<S> {
    async fn send(&mut self, script: &str) -> Result<RawExecutionResult, TransportError> {
        (**self).send(script).await
    }
}
