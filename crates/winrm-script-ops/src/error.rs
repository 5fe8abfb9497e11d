use thiserror::Error;

/// Error taxonomy for templated remote script execution.
#[derive(Debug, Error)]
pub enum ScriptOpsError {
    #[error("Template {name} has invalid syntax: {message}")]
    TemplateSyntax { name: String, message: String },

    #[error("Template {name} is already registered")]
    DuplicateTemplate { name: String },

    #[error("Template {name} is not registered")]
    UnknownTemplate { name: String },

    #[error("Template {template} requires substitution `{key}` which was not bound")]
    MissingSubstitution { template: String, key: String },

    #[error("Unrecognized {category} value: {label:?}")]
    UnrecognizedCategory { category: String, label: String },

    #[error("Invalid argument `{key}`: {message}")]
    InvalidArgument { key: String, message: String },

    #[error("Remote session transport failed: {message}")]
    Transport { message: String },

    /// The session delivered the script but the interpreter reported failure.
    /// `stderr` is exactly what the remote side wrote.
    #[error("Remote script failed (exit code {exit_code:?}): {stderr}")]
    RemoteExecution {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Remote script timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Remote script execution was cancelled")]
    Cancelled,

    #[error("Failed to decode remote script output: {message}")]
    Decode { message: String, raw: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScriptOpsError {
    /// Stable machine-readable error code for callers that report per-target failures.
    pub fn code(&self) -> &'static str {
        match self {
            Self::TemplateSyntax { .. } => "template_syntax",
            Self::DuplicateTemplate { .. } => "duplicate_template",
            Self::UnknownTemplate { .. } => "unknown_template",
            Self::MissingSubstitution { .. } => "missing_substitution",
            Self::UnrecognizedCategory { .. } => "unrecognized_category",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::Transport { .. } => "transport",
            Self::RemoteExecution { .. } => "remote_execution",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled => "cancelled",
            Self::Decode { .. } => "decode",
            Self::Config(_) => "config",
        }
    }

    /// True when the error was raised before anything was sent to the session.
    pub fn is_pre_dispatch(&self) -> bool {
        matches!(
            self,
            Self::TemplateSyntax { .. }
                | Self::DuplicateTemplate { .. }
                | Self::UnknownTemplate { .. }
                | Self::MissingSubstitution { .. }
                | Self::UnrecognizedCategory { .. }
                | Self::InvalidArgument { .. }
                | Self::Config(_)
        )
    }
}

/// Result type for script operations.
pub type ScriptOpsResult<T> = Result<T, ScriptOpsError>;
