//! Configuration loading and typed config structures for `FieldPulse`.
//!
//! The canonical configuration lives in `fieldpulse-config.yaml` next to
//! the engine binary's working directory. Every field has a serde default
//! so a partial (or absent) file still yields a complete configuration.

use std::path::Path;
use std::time::Duration;

use chrono::FixedOffset;
use serde::Deserialize;

use crate::generator::GeneratorConfig;

/// Seconds in one minute, for UTC offset conversion.
const SECONDS_PER_MINUTE: i32 = 60;

/// Largest accepted UTC offset magnitude, in minutes (exclusive).
const MAX_UTC_OFFSET_MINUTES: i32 = 24 * 60;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed correctly but is outside its accepted range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
///
/// Mirrors the structure of `fieldpulse-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FieldPulseConfig {
    /// Generation cadence and simulation parameters.
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Document store selection and addressing.
    #[serde(default)]
    pub store: StoreConfig,

    /// Observer API server settings.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FieldPulseConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `DRAGONFLY_URL` overrides `store.dragonfly_url` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Same as [`from_file`](Self::from_file) when the file exists.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::from_file(path);
        }
        tracing::info!(path = %path.display(), "Config file not found, using defaults");
        let mut config = Self::default();
        config.store.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.store.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Check range constraints that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.telemetry.validate()
    }
}

// ---------------------------------------------------------------------------
// Telemetry
// ---------------------------------------------------------------------------

/// Generation cadence and simulation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TelemetryConfig {
    /// Seconds between periodic generations.
    #[serde(default = "default_period_secs")]
    pub period_secs: u64,

    /// Maximum number of temperature history entries.
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,

    /// Offset of the garden's local time from UTC, in minutes.
    ///
    /// Drives the diurnal temperature curve and the midnight water reset.
    #[serde(default)]
    pub utc_offset_minutes: i32,

    /// Seed for the jitter source. Absent means OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            period_secs: default_period_secs(),
            history_cap: default_history_cap(),
            utc_offset_minutes: 0,
            seed: None,
        }
    }
}

impl TelemetryConfig {
    /// Period of the repeating generation timer.
    pub const fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }

    /// The garden's local UTC offset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the offset is a day or more.
    pub fn utc_offset(&self) -> Result<FixedOffset, ConfigError> {
        if self.utc_offset_minutes.unsigned_abs() >= MAX_UTC_OFFSET_MINUTES.unsigned_abs() {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "telemetry.utc_offset_minutes must be within +/-{MAX_UTC_OFFSET_MINUTES}, got {}",
                    self.utc_offset_minutes
                ),
            });
        }
        let seconds = self
            .utc_offset_minutes
            .checked_mul(SECONDS_PER_MINUTE)
            .ok_or_else(|| ConfigError::Invalid {
                reason: "telemetry.utc_offset_minutes overflow".to_owned(),
            })?;
        FixedOffset::east_opt(seconds).ok_or_else(|| ConfigError::Invalid {
            reason: format!("telemetry.utc_offset_minutes {} is not a valid offset", self.utc_offset_minutes),
        })
    }

    /// Build the generator configuration from these settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the UTC offset is invalid.
    pub fn generator_config(&self) -> Result<GeneratorConfig, ConfigError> {
        Ok(GeneratorConfig {
            history_cap: self.history_cap,
            utc_offset: self.utc_offset()?,
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.period_secs == 0 {
            return Err(ConfigError::Invalid {
                reason: "telemetry.period_secs must be at least 1".to_owned(),
            });
        }
        if self.history_cap == 0 {
            return Err(ConfigError::Invalid {
                reason: "telemetry.history_cap must be at least 1".to_owned(),
            });
        }
        self.utc_offset().map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Which document store backend the engine uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local store. Snapshots are lost on restart.
    #[default]
    Memory,
    /// `Dragonfly` (Redis-compatible) with pub/sub change notifications.
    Dragonfly,
}

/// Document store selection and addressing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    /// Backend to persist snapshots in.
    #[serde(default)]
    pub backend: StoreBackend,

    /// `Dragonfly` connection URL.
    #[serde(default = "default_dragonfly_url")]
    pub dragonfly_url: String,

    /// Namespace the live document lives in.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Identifier of the live document.
    #[serde(default = "default_document")]
    pub document: String,
}

impl StoreConfig {
    /// Override the `Dragonfly` URL with `DRAGONFLY_URL` when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DRAGONFLY_URL") {
            self.dragonfly_url = val;
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            dragonfly_url: default_dragonfly_url(),
            namespace: default_namespace(),
            document: default_document(),
        }
    }
}

// ---------------------------------------------------------------------------
// Observer
// ---------------------------------------------------------------------------

/// Observer API server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObserverConfig {
    /// Whether the engine starts the observer server.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Host address to bind.
    #[serde(default = "default_observer_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_observer_port")]
    pub port: u16,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_observer_host(),
            port: default_observer_port(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_period_secs() -> u64 {
    300
}

const fn default_history_cap() -> usize {
    fieldpulse_types::TEMPERATURE_HISTORY_CAP
}

fn default_dragonfly_url() -> String {
    "redis://localhost:6379".to_owned()
}

fn default_namespace() -> String {
    "metrics".to_owned()
}

fn default_document() -> String {
    "live".to_owned()
}

fn default_observer_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_observer_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}
