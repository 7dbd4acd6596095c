//! Configuration management for the `WeatherInsights` service
//!
//! Handles loading configuration from an optional TOML file and environment
//! variables, and validates every setting before the service starts.

use crate::InsightsError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Prefix for environment overrides, e.g. `WEATHER_INSIGHTS_BACKGROUND__INTERVAL_SECONDS`
pub const ENV_PREFIX: &str = "WEATHER_INSIGHTS";

/// Root configuration structure for the `WeatherInsights` service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightsConfig {
    /// HTTP listener configuration
    pub server: ServerConfig,
    /// Application identity reported by the status endpoint
    pub app: AppConfig,
    /// Background trace loop configuration
    pub background: BackgroundConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// OpenTelemetry export configuration
    pub telemetry: TelemetryConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

/// Application identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name
    #[serde(default = "default_app_name")]
    pub name: String,
    /// Deployment environment name
    #[serde(default = "default_environment")]
    pub environment: String,
}

/// Background trace loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundConfig {
    /// Whether the loop is started at all
    #[serde(default = "default_background_enabled")]
    pub enabled: bool,
    /// Pause between successful iterations, in seconds
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
    /// Pause after a failed iteration, in seconds
    #[serde(default = "default_backoff")]
    pub backoff_seconds: u64,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// OpenTelemetry export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Service name attached to every exported span and log
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Base URL of an OTLP/HTTP collector; export is disabled when unset
    pub otlp_endpoint: Option<String>,
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_app_name() -> String {
    "WeatherInsights".to_string()
}

fn default_environment() -> String {
    "Production".to_string()
}

fn default_background_enabled() -> bool {
    true
}

fn default_interval() -> u64 {
    30
}

fn default_backoff() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_service_name() -> String {
    "weather-insights".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            environment: default_environment(),
        }
    }
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            enabled: default_background_enabled(),
            interval_seconds: default_interval(),
            backoff_seconds: default_backoff(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            otlp_endpoint: None,
        }
    }
}

impl BackgroundConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    #[must_use]
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_seconds)
    }
}

impl InsightsConfig {
    /// Load configuration from a file and environment variables.
    ///
    /// An explicit `config_path` must exist; the default path is optional.
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        match config_path {
            Some(config_file) => {
                if !config_file.is_file() {
                    return Err(InsightsError::config(format!(
                        "Configuration file '{}' not found",
                        config_file.display()
                    ))
                    .into());
                }
                builder = builder.add_source(
                    File::from(config_file)
                        .required(true)
                        .format(config::FileFormat::Toml),
                );
            }
            None => {
                let config_file = Self::default_config_path();
                if config_file.exists() {
                    builder = builder.add_source(
                        File::from(config_file)
                            .required(false)
                            .format(config::FileFormat::Toml),
                    );
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: InsightsConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Path consulted when no explicit config file is given
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        PathBuf::from("config").join("weather-insights.toml")
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.server.bind_address.is_empty() {
            self.server.bind_address = default_bind_address();
        }
        if self.app.name.is_empty() {
            self.app.name = default_app_name();
        }
        if self.app.environment.is_empty() {
            self.app.environment = default_environment();
        }
        if self.background.interval_seconds == 0 {
            self.background.interval_seconds = default_interval();
        }
        if self.background.backoff_seconds == 0 {
            self.background.backoff_seconds = default_backoff();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.telemetry.service_name.is_empty() {
            self.telemetry.service_name = default_service_name();
        }
        if self
            .telemetry
            .otlp_endpoint
            .as_deref()
            .is_some_and(str::is_empty)
        {
            self.telemetry.otlp_endpoint = None;
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.background.interval_seconds > 3600 {
            return Err(InsightsError::config(
                "Background interval cannot exceed 3600 seconds (1 hour)",
            )
            .into());
        }

        if self.background.backoff_seconds > self.background.interval_seconds.max(60) {
            return Err(InsightsError::config(
                "Background backoff cannot exceed the interval (or 60 seconds)",
            )
            .into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        if self.server.bind_address.parse::<SocketAddr>().is_err() {
            return Err(InsightsError::config(format!(
                "Invalid bind address '{}'. Expected host:port, e.g. 0.0.0.0:8080",
                self.server.bind_address
            ))
            .into());
        }

        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(InsightsError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(InsightsError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if let Some(endpoint) = &self.telemetry.otlp_endpoint
            && !endpoint.starts_with("http://")
            && !endpoint.starts_with("https://")
        {
            return Err(InsightsError::config(
                "OTLP endpoint must be a valid HTTP or HTTPS URL",
            )
            .into());
        }

        Ok(())
    }
}
