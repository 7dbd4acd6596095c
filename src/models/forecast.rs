//! Weather forecast model and factory methods

use chrono::{Days, NaiveDate};
use rand::RngExt;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::{InsightsError, Result};

/// Number of days covered by a generated forecast
pub const FORECAST_DAYS: u64 = 5;

/// Inclusive range of generated temperatures in Celsius
pub const TEMPERATURE_RANGE_C: RangeInclusive<i32> = -20..=54;

/// Fixed vocabulary of forecast summaries
pub const SUMMARIES: [&str; 10] = [
    "Freezing",
    "Bracing",
    "Chilly",
    "Cool",
    "Mild",
    "Warm",
    "Balmy",
    "Hot",
    "Sweltering",
    "Scorching",
];

/// A single daily forecast item
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WeatherForecast {
    /// Day this forecast applies to
    pub date: NaiveDate,
    /// Temperature in Celsius
    pub temperature_c: i32,
    /// Temperature in Fahrenheit, derived from Celsius
    pub temperature_f: i32,
    /// One of [`SUMMARIES`]
    pub summary: String,
}

impl WeatherForecast {
    /// Create a forecast item, deriving the Fahrenheit value
    #[must_use]
    pub fn new(date: NaiveDate, temperature_c: i32, summary: impl Into<String>) -> Self {
        Self {
            date,
            temperature_c,
            temperature_f: celsius_to_fahrenheit(temperature_c),
            summary: summary.into(),
        }
    }

    /// Generate forecasts for the days following `today`, one per day, in ascending date order.
    ///
    /// Fails rather than returning a short list when the window runs past the
    /// last representable date.
    pub fn generate(today: NaiveDate, rng: &mut StdRng) -> Result<Vec<Self>> {
        (1..=FORECAST_DAYS)
            .map(|offset| -> Result<Self> {
                let date = today.checked_add_days(Days::new(offset)).ok_or_else(|| {
                    InsightsError::forecast(format!("{today} + {offset} days is out of range"))
                })?;
                let temperature_c = rng.random_range(TEMPERATURE_RANGE_C);
                let summary = SUMMARIES[rng.random_range(0..SUMMARIES.len())];
                Ok(Self::new(date, temperature_c, summary))
            })
            .collect()
    }
}

/// Approximate conversion truncated toward zero
#[must_use]
pub fn celsius_to_fahrenheit(celsius: i32) -> i32 {
    32 + (f64::from(celsius) / 0.5556) as i32
}
