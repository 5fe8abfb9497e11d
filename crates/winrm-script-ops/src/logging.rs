//! Logging initialization.
//!
//! The crate only emits `tracing` events. Binaries embedding it call
//! [`init_logging`] once at startup to get structured JSON lines on stderr.

use crate::config::ScriptOpsConfig;
use tracing_subscriber::EnvFilter;

/// Install a JSON `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `level`. Calling this more than once is
/// harmless; only the first subscriber is installed.
///
/// ```ignore
/// init_logging("info");
/// tracing::info!("Provider started");
/// ```
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(parse_level(level).as_str().to_ascii_lowercase()));

    let installed = tracing_subscriber::fmt()
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_target(true)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    if installed.is_err() {
        tracing::debug!("Global tracing subscriber already installed");
    }
}

/// Initialize logging with the level from `config`.
pub fn init_logging_from_config(config: &ScriptOpsConfig) {
    init_logging(&config.log_level);
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
