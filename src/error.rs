//! Error types and handling for the `WeatherInsights` service

use thiserror::Error;

/// Main error type for the `WeatherInsights` service
#[derive(Error, Debug)]
pub enum InsightsError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A trace generator could not complete its sequence
    #[error("Trace generation failed: {message}")]
    Trace { message: String },

    /// Errors raised on purpose to exercise error reporting
    #[error("{message}")]
    Simulated { message: String },

    /// The forecast window could not be built from the current date
    #[error("Forecast error: {message}")]
    Forecast { message: String },

    /// Telemetry pipeline setup errors
    #[error("Telemetry error: {message}")]
    Telemetry { message: String },
}

impl InsightsError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new trace generation error
    pub fn trace<S: Into<String>>(message: S) -> Self {
        Self::Trace {
            message: message.into(),
        }
    }

    /// Create a new simulated error
    pub fn simulated<S: Into<String>>(message: S) -> Self {
        Self::Simulated {
            message: message.into(),
        }
    }

    /// Create a new telemetry error
    pub fn telemetry<S: Into<String>>(message: S) -> Self {
        Self::Telemetry {
            message: message.into(),
        }
    }

    /// Create a new forecast error
    pub fn forecast<S: Into<String>>(message: S) -> Self {
        Self::Forecast {
            message: message.into(),
        }
    }
}
