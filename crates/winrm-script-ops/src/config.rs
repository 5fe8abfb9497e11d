//! Configuration for script execution.

use crate::binder::{ArgumentBinder, CategoricalMapping};
use crate::{ScriptOpsError, ScriptOpsResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable overriding the log level.
pub const LOG_LEVEL_ENV: &str = "WINRM_SCRIPT_OPS_LOG_LEVEL";

/// Environment variable overriding the per-command timeout, in seconds.
pub const TIMEOUT_ENV: &str = "WINRM_SCRIPT_OPS_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptOpsConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Per-command timeout. `None` or `0` waits for the remote side indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_timeout_secs: Option<u64>,
    /// Extra category tables: category name, then label to remote identifier.
    #[serde(default)]
    pub categories: BTreeMap<String, BTreeMap<String, String>>,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for ScriptOpsConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            command_timeout_secs: None,
            categories: BTreeMap::new(),
        }
    }
}

impl ScriptOpsConfig {
    /// Defaults, then environment overrides.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load from `path` if it exists (defaults otherwise), then apply environment overrides.
    pub fn load(path: &Path) -> ScriptOpsResult<Self> {
        let mut config = if path.exists() {
            Self::load_from_file(path)?
        } else {
            Self::default()
        };
        config.load_from_env();
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> ScriptOpsResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|err| {
            ScriptOpsError::Config(format!("failed to read {}: {err}", path.display()))
        })?;
        serde_json::from_str(&content).map_err(|err| {
            ScriptOpsError::Config(format!("failed to parse {}: {err}", path.display()))
        })
    }

    pub fn save(&self, path: &Path) -> ScriptOpsResult<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|err| ScriptOpsError::Config(format!("failed to serialize config: {err}")))?;
        std::fs::write(path, content).map_err(|err| {
            ScriptOpsError::Config(format!("failed to write {}: {err}", path.display()))
        })
    }

    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var(LOG_LEVEL_ENV) {
            if !log_level.trim().is_empty() {
                self.log_level = log_level.trim().to_string();
            }
        }

        if let Ok(raw) = std::env::var(TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => self.command_timeout_secs = Some(secs),
                Err(_) => tracing::warn!(value = %raw, "Ignoring invalid {TIMEOUT_ENV}"),
            }
        }
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn with_command_timeout_secs(mut self, secs: u64) -> Self {
        self.command_timeout_secs = Some(secs);
        self
    }

    pub fn with_category<I, L, R>(mut self, category: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (L, R)>,
        L: Into<String>,
        R: Into<String>,
    {
        self.categories.insert(
            category.into(),
            entries
                .into_iter()
                .map(|(label, id)| (label.into(), id.into()))
                .collect(),
        );
        self
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Add the configured category tables to `binder`.
    pub fn extend_binder(&self, mut binder: ArgumentBinder) -> ScriptOpsResult<ArgumentBinder> {
        for (category, entries) in &self.categories {
            let mapping = CategoricalMapping::new(category.clone(), entries.clone())?;
            binder = binder.with_mapping(mapping)?;
        }
        Ok(binder)
    }
}
