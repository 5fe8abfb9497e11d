//! # WinRM Script Ops
//!
//! Typed PowerShell script orchestration over remote management sessions.
//!
//! WinRM Script Ops owns template rendering, argument escaping, categorical
//! lookups, execution timeout and cancellation, output decoding, and error
//! normalization. Session transport is supplied by the caller through the
//! [`Session`] trait.
//!
//! ```ignore
//! let mut registry = TemplateRegistry::new();
//! integration_services::register_templates(&mut registry)?;
//! let binder = integration_services::register_categories(ArgumentBinder::new())?;
//!
//! let mut client = ScriptClient::from_config(
//!     &ScriptOpsConfig::new(),
//!     Arc::new(registry),
//!     Arc::new(binder),
//!     session,
//! );
//! let services = integration_services::get_vm_integration_services(&mut client, "web-01").await?;
//! ```

mod binder;
mod client;
mod config;
mod decoder;
mod error;
mod executor;
pub mod integration_services;
mod logging;
mod session;
mod template;

pub use binder::{
    escape_single_quoted, escape_wildcard_literal, ArgumentBinder, BoundArgs, CategoricalMapping,
    ScriptArgs,
};
pub use client::ScriptClient;
pub use config::{ScriptOpsConfig, DEFAULT_LOG_LEVEL, LOG_LEVEL_ENV, TIMEOUT_ENV};
pub use decoder::{decode_list, decode_optional};
pub use error::{ScriptOpsError, ScriptOpsResult};
pub use executor::{ExecutionMode, SessionExecutor};
pub use integration_services::VmIntegrationService;
pub use logging::{init_logging, init_logging_from_config, parse_level};
pub use session::{RawExecutionResult, Session, TransportError};
pub use template::{CommandTemplate, TemplateRegistry};
pub use tokio_util::sync::CancellationToken;
