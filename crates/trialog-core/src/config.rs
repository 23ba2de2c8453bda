//! Configuration types for Trialog.
//!
//! Settings come from `trialog.yml`, then `REDIS_*` environment variables,
//! then command-line flags, each layer overriding the previous one.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use trialog_proto::{DEFAULT_NAMESPACE, KeySchema};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrialogConfig {
    /// Key-value store connection settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Live viewer settings.
    #[serde(default)]
    pub viewer: ViewerConfig,

    /// Suppress all warnings (for CI environments).
    #[serde(default, rename = "_suppress_warnings")]
    pub suppress_warnings: bool,
}

/// Key-value store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Full connection URL. Takes precedence over host/port/db when set.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Logical database index. Reset flushes this database only.
    #[serde(default)]
    pub db: u32,

    /// Namespace tag prefixed to every key. `null` disables the prefix.
    #[serde(default = "default_namespace")]
    pub namespace: Option<String>,

    /// Deadline for establishing the connection.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Deadline for each individual store operation.
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    6379
}

#[allow(clippy::unnecessary_wraps)]
fn default_namespace() -> Option<String> {
    Some(DEFAULT_NAMESPACE.to_string())
}

fn default_connect_timeout_ms() -> u64 {
    1000
}

fn default_op_timeout_ms() -> u64 {
    2000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: default_host(),
            port: default_port(),
            db: 0,
            namespace: default_namespace(),
            connect_timeout_ms: default_connect_timeout_ms(),
            op_timeout_ms: default_op_timeout_ms(),
        }
    }
}

impl StoreConfig {
    /// Connection URL derived from the explicit URL or host/port/db.
    pub fn redis_url(&self) -> String {
        self.url
            .clone()
            .unwrap_or_else(|| format!("redis://{}:{}/{}", self.host, self.port, self.db))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }

    /// Key schema for the configured namespace tag.
    pub fn key_schema(&self) -> Result<KeySchema, ConfigError> {
        KeySchema::new(self.namespace.as_deref()).map_err(|e| ConfigError::Invalid {
            field: "store.namespace".to_string(),
            message: e.to_string(),
        })
    }
}

/// Live viewer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Wall-clock interval between read cycles.
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    /// Most recent records loaded when a conversation is first selected.
    #[serde(default = "default_max_records")]
    pub max_records: usize,
}

fn default_refresh_interval_ms() -> u64 {
    2000
}

fn default_max_records() -> usize {
    500
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval_ms(),
            max_records: default_max_records(),
        }
    }
}

impl ViewerConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

impl TrialogConfig {
    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        debug!(path = %path_ref.display(), "Loading configuration from file");
        let content = std::fs::read_to_string(path_ref)?;
        let config: Self = serde_yaml::from_str(&content)?;
        debug!(
            url = %config.store.redis_url(),
            namespace = ?config.store.namespace,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Applies `REDIS_HOST`, `REDIS_PORT`, `REDIS_DB`, and `REDIS_URL` from the
    /// process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Applies environment overrides read through `lookup`.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("REDIS_HOST") {
            debug!(from = "REDIS_HOST", value = %host, "Applying environment override");
            self.store.host = host;
        }
        if let Some(port) = lookup("REDIS_PORT") {
            self.store.port = port.trim().parse().map_err(|_| ConfigError::Invalid {
                field: "REDIS_PORT".to_string(),
                message: format!("'{port}' is not a valid port"),
            })?;
            debug!(from = "REDIS_PORT", value = self.store.port, "Applying environment override");
        }
        if let Some(db) = lookup("REDIS_DB") {
            self.store.db = db.trim().parse().map_err(|_| ConfigError::Invalid {
                field: "REDIS_DB".to_string(),
                message: format!("'{db}' is not a valid database index"),
            })?;
        }
        if let Some(url) = lookup("REDIS_URL") {
            self.store.url = Some(url);
        }
        Ok(())
    }

    /// Validates the configuration and returns warnings.
    ///
    /// Zero timeouts, a zero refresh interval, a zero record window, and a bad
    /// namespace tag are hard errors.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, ConfigError> {
        if self.store.connect_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "store.connect_timeout_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.store.op_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "store.op_timeout_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.viewer.refresh_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "viewer.refresh_interval_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.viewer.max_records == 0 {
            return Err(ConfigError::Invalid {
                field: "viewer.max_records".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        self.store.key_schema()?;

        let mut warnings = Vec::new();
        if self.suppress_warnings {
            return Ok(warnings);
        }

        if self.store.connect_timeout_ms > 5000 {
            warnings.push(ConfigWarning::InvalidValue {
                field: "store.connect_timeout_ms".to_string(),
                message: format!(
                    "{} ms connect timeout lets a store outage stall each trial for that long",
                    self.store.connect_timeout_ms
                ),
            });
        }

        if self.store.namespace.is_none() {
            warnings.push(ConfigWarning::InvalidValue {
                field: "store.namespace".to_string(),
                message: "No namespace tag; keys may collide with other data in the store"
                    .to_string(),
            });
        }

        if self.store.url.is_some() && (self.store.host != default_host() || self.store.port != default_port()) {
            warnings.push(ConfigWarning::IgnoredField {
                field: "store.host/store.port".to_string(),
                reason: "store.url takes precedence".to_string(),
            });
        }

        if self.viewer.refresh_interval_ms < 250 {
            warnings.push(ConfigWarning::InvalidValue {
                field: "viewer.refresh_interval_ms".to_string(),
                message: format!(
                    "{} ms refresh interval polls the store very aggressively",
                    self.viewer.refresh_interval_ms
                ),
            });
        }

        Ok(warnings)
    }
}

/// Configuration warnings emitted during validation.
#[derive(Debug, Clone)]
pub enum ConfigWarning {
    /// Field is present but has no effect.
    IgnoredField { field: String, reason: String },
    /// Field has a questionable value.
    InvalidValue { field: String, message: String },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::IgnoredField { field, reason } => {
                write!(f, "Warning [{}]: Field ignored - {}", field, reason)
            }
            ConfigWarning::InvalidValue { field, message } => {
                write!(f, "Warning [{}]: {}", field, message)
            }
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for '{field}': {message}")]
    Invalid { field: String, message: String },
}
