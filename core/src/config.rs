use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Main configuration structure for g1lens.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub gc: GcConfig,

    #[serde(default)]
    pub access_log: AccessLogConfig,

    #[serde(default)]
    pub service_log: ServiceLogConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path.as_ref()).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration from a TOML file, or the defaults when no file exists at `path`.
    /// A file that exists but cannot be read or parsed is still an error.
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if !path.as_ref().exists() {
            tracing::debug!(path = ?path.as_ref(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    /// Get the default configuration as a TOML string.
    pub fn default_toml() -> Result<String> {
        let config = Self::default();
        toml::to_string_pretty(&config).context("Failed to serialize default config")
    }

    /// Validate the configuration for obvious misconfiguration.
    pub fn validate(&self) -> Result<()> {
        if self.gc.global_limit == 0 {
            anyhow::bail!("gc.global_limit must be greater than 0");
        }

        if self.gc.batch_size == 0 {
            anyhow::bail!("gc.batch_size must be greater than 0");
        }

        if self.gc.batch_size > self.gc.global_limit {
            anyhow::bail!(
                "gc.batch_size ({}) cannot exceed gc.global_limit ({})",
                self.gc.batch_size,
                self.gc.global_limit
            );
        }

        if self.gc.window_size == 0
            || self.access_log.window_size == 0
            || self.service_log.window_size == 0
        {
            anyhow::bail!("Rate window sizes must be greater than 0");
        }

        if !self.gc.long_pause_ms.is_finite() || self.gc.long_pause_ms < 0.0 {
            anyhow::bail!("gc.long_pause_ms must be a non-negative number");
        }

        if self.service_log.service_marker.is_empty() {
            anyhow::bail!("service_log.service_marker cannot be empty");
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => anyhow::bail!("Invalid log level: {}", other),
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).context("Failed to parse config")?;
        Ok(config)
    }
}

/// GC log parsing limits and thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GcConfig {
    /// Hard cap on GC events accepted per run
    #[serde(default = "default_global_limit")]
    pub global_limit: usize,

    /// Completed events per batch before yielding
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_gc_window")]
    pub window_size: usize,

    #[serde(default = "default_long_pause_ms")]
    pub long_pause_ms: f64,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            global_limit: default_global_limit(),
            batch_size: default_batch_size(),
            window_size: default_gc_window(),
            long_pause_ms: default_long_pause_ms(),
        }
    }
}

/// Access log ranking and rate window.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccessLogConfig {
    #[serde(default = "default_stream_window")]
    pub window_size: usize,

    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self {
            window_size: default_stream_window(),
            top_n: default_top_n(),
        }
    }
}

/// Service log state machine settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceLogConfig {
    #[serde(default = "default_stream_window")]
    pub window_size: usize,

    /// Methods whose name contains this marker are tracked as service calls
    #[serde(default = "default_service_marker")]
    pub service_marker: String,
}

impl Default for ServiceLogConfig {
    fn default() -> Self {
        Self {
            window_size: default_stream_window(),
            service_marker: default_service_marker(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub include_modules: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            include_modules: false,
        }
    }
}

// Default providers ---------------------------------------------------------

fn default_global_limit() -> usize {
    10_000
}

fn default_batch_size() -> usize {
    1_000
}

fn default_gc_window() -> usize {
    10
}

fn default_long_pause_ms() -> f64 {
    crate::classify::LONG_PAUSE_MS
}

fn default_stream_window() -> usize {
    30
}

fn default_top_n() -> usize {
    3
}

fn default_service_marker() -> String {
    "Sv".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// Tests ---------------------------------------------------------------------
