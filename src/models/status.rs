//! Application status snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

pub const RUNNING: &str = "Running";

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub application: String,
    pub status: String,
    /// Always UTC
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub environment: String,
    pub machine_name: String,
    pub process_id: u32,
}

impl StatusSnapshot {
    /// Capture the status of the current process
    #[must_use]
    pub fn capture(app: &AppConfig) -> Self {
        Self {
            application: app.name.clone(),
            status: RUNNING.to_string(),
            timestamp: Utc::now(),
            version: crate::VERSION.to_string(),
            environment: app.environment.clone(),
            machine_name: machine_name(),
            process_id: std::process::id(),
        }
    }
}

fn machine_name() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}
