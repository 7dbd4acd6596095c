//! `WeatherInsights` - a demo weather API that emits rich tracing telemetry
//!
//! This library provides the HTTP endpoints, the synthetic trace generators
//! and the background loop that keeps a tracing backend populated.

pub mod api;
pub mod background;
pub mod config;
pub mod error;
pub mod models;
pub mod telemetry;
pub mod traces;
pub mod web;

use rand::SeedableRng;
use rand::rngs::StdRng;

// Re-export core types for public API
pub use background::{BackgroundTraceService, LoopStats, SyntheticWorkload, Workload};
pub use config::InsightsConfig;
pub use error::InsightsError;
pub use models::{StatusSnapshot, WeatherForecast};
pub use traces::{SampleTraceService, TraceService};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, InsightsError>;

/// Fresh, independently seeded generator for a single request
pub fn request_rng() -> StdRng {
    StdRng::seed_from_u64(rand::random())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngExt;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_request_rngs_are_independent() {
        let a: Vec<u64> = (0..4).map(|_| request_rng().random()).collect();
        assert!(a.windows(2).any(|w| w[0] != w[1]));
    }
}
