//! Controller configuration loaded from `config.toml`.
//!
//! ```toml
//! [retry]
//! steps = 5
//! initial_backoff_ms = 10
//! factor = 1.0
//!
//! [profiles]
//! directory = "/etc/nfdeploy/profiles"
//!
//! [logging]
//! filter = "nfdeploy=debug,info"
//! ```

pub mod parser;
pub mod store;

use std::path::PathBuf;

use anyhow::bail;
use serde::{Deserialize, Serialize};

pub use parser::{parse_config, parse_config_str};
pub use store::ConfigStore;

pub const DEFAULT_LOG_FILTER: &str = "nfdeploy=debug,info";

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ControllerConfig {
    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub profiles: ProfilesConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ControllerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.retry.steps == 0 {
            bail!("retry.steps must be at least 1");
        }
        if !self.retry.factor.is_finite() || self.retry.factor < 1.0 {
            bail!("retry.factor must be a finite number >= 1.0");
        }
        if let Some(max) = self.retry.max_backoff_ms
            && max < self.retry.initial_backoff_ms
        {
            bail!("retry.max_backoff_ms must not be lower than retry.initial_backoff_ms");
        }
        Ok(())
    }
}

/// Conflict retry policy for status writes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of write attempts
    #[serde(default = "default_steps")]
    pub steps: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Multiplier applied to the backoff after each conflict
    #[serde(default = "default_factor")]
    pub factor: f64,

    /// Upper bound on a single backoff; 60s when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_backoff_ms: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            initial_backoff_ms: default_initial_backoff_ms(),
            factor: default_factor(),
            max_backoff_ms: None,
        }
    }
}

fn default_steps() -> u32 {
    5
}

fn default_initial_backoff_ms() -> u64 {
    10
}

fn default_factor() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProfilesConfig {
    /// Directory of NF type and capacity profile documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}
