//! Module: config
//! Responsibility: engine tuning loaded from TOML.
//! Does not own: action or aggregation metadata (callers build those).
//! Boundary: every field has a default; an empty document is a valid config.


use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {message}")]
    Read { path: String, message: String },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

///
/// EngineConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub block: BlockConfig,
    pub metrics: MetricsConfig,
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;

        Ok(config)
    }

    /// Read, parse, and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        log::debug!("loading engine config from {}", path.display());

        Self::from_toml_str(&text)
    }

    /// Apply process-wide settings to the current thread.
    pub fn install(&self) {
        crate::obs::set_metrics_enabled(self.metrics.enabled);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block.max_steps == Some(0) {
            return Err(ConfigError::Invalid {
                field: "block.max_steps",
                reason: "must be at least 1 when set".to_string(),
            });
        }

        Ok(())
    }
}

///
/// BlockConfig
///
/// Action block execution settings.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlockConfig {
    /// Upper bound on action invocations per `act` call. `None` is unbounded;
    /// backward jumps can then loop forever.
    pub max_steps: Option<u64>,

    /// Emit a trace-level log line per action with its elapsed time.
    pub trace_actions: bool,
}

///
/// MetricsConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    /// Route engine events to the metrics sink.
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}
