//! Background trace generation
//!
//! A single long-lived task that, until cancelled, opens a root span, runs
//! every [`Step`] of its [`Workload`] in order, then sleeps. A failing step
//! is logged and followed by a shorter backoff sleep; the loop itself never
//! gives up. Cancellation is observed at every sleep and between steps.

use async_trait::async_trait;
use chrono::Utc;
use std::fmt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{Span, debug, error, info, info_span};

use crate::Result;
use crate::config::BackgroundConfig;

pub mod generators;

pub use generators::SyntheticWorkload;

/// The themed sub-generators, in the order the loop runs them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Business,
    SystemMetrics,
    UserActivity,
}

impl Step {
    pub const ALL: [Step; 3] = [Step::Business, Step::SystemMetrics, Step::UserActivity];
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Business => "business",
            Step::SystemMetrics => "system_metrics",
            Step::UserActivity => "user_activity",
        };
        f.write_str(name)
    }
}

/// Work performed for each step of an iteration
#[async_trait]
pub trait Workload: Send {
    async fn run_step(&mut self, step: Step, parent: &Span) -> Result<()>;
}

/// Counters returned when the loop exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Iterations in which every step completed
    pub iterations: u64,
    /// Iterations abandoned because a step failed
    pub failures: u64,
}

enum Iteration {
    Completed,
    Cancelled,
}

pub struct BackgroundTraceService<W> {
    workload: W,
    interval: Duration,
    backoff: Duration,
}

impl<W: Workload + 'static> BackgroundTraceService<W> {
    pub fn new(workload: W, config: &BackgroundConfig) -> Self {
        Self {
            workload,
            interval: config.interval(),
            backoff: config.backoff(),
        }
    }

    /// Run the loop on its own task until `cancel` fires
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<LoopStats> {
        tokio::spawn(self.run(cancel))
    }

    pub async fn run(mut self, cancel: CancellationToken) -> LoopStats {
        info!(
            interval_secs = self.interval.as_secs(),
            backoff_secs = self.backoff.as_secs(),
            "Background trace service started"
        );

        let mut stats = LoopStats::default();
        loop {
            let pause = match self.generate_once(&cancel).await {
                Ok(Iteration::Completed) => {
                    stats.iterations += 1;
                    self.interval
                }
                Ok(Iteration::Cancelled) => break,
                Err(e) => {
                    stats.failures += 1;
                    error!(error = %e, "Error occurred in background trace service");
                    self.backoff
                }
            };

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = sleep(pause) => {}
            }
        }

        info!("Background trace service is stopping");
        info!(
            iterations = stats.iterations,
            failures = stats.failures,
            "Background trace service stopped"
        );
        stats
    }

    async fn generate_once(&mut self, cancel: &CancellationToken) -> Result<Iteration> {
        let root = info_span!(
            parent: None,
            "BackgroundTraceGeneration",
            service = "BackgroundTraceService",
            operation = "continuous_trace_generation",
        );
        info!(parent: &root, time = %Utc::now(), "Generating background traces");

        for step in Step::ALL {
            if cancel.is_cancelled() {
                return Ok(Iteration::Cancelled);
            }
            let started = Instant::now();
            self.workload.run_step(step, &root).await?;
            debug!(
                parent: &root,
                %step,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Sub-generator finished"
            );
        }

        info!(parent: &root, "Background traces generated successfully");
        Ok(Iteration::Completed)
    }
}
