//! Data models for the `WeatherInsights` service
//!
//! All values are transient and generated per request:
//! - Forecast: randomly generated daily forecast items
//! - Status: an on-demand snapshot of the running process

pub mod forecast;
pub mod status;

pub use forecast::{SUMMARIES, WeatherForecast};
pub use status::StatusSnapshot;
