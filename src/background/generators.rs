//! The three themed sub-generators run by the background loop
//!
//! Each opens its own span under the iteration root, walks a fixed list of
//! placeholder items with a random delay, and may flag an item span as
//! failed. Flagging is reported back to the caller but never aborts the run.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use std::ops::RangeInclusive;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{Instrument, Span, debug, field, info, info_span, warn};

use super::{Step, Workload};
use crate::Result;
use crate::traces::mark_error;

pub const BUSINESS_OPERATIONS: [&str; 5] = [
    "ProcessOrder",
    "ValidatePayment",
    "UpdateInventory",
    "SendNotification",
    "GenerateReport",
];

pub const USER_ACTIVITIES: [&str; 5] = [
    "UserLogin",
    "ViewProduct",
    "AddToCart",
    "Checkout",
    "Logout",
];

const BUSINESS_DELAY_MS: RangeInclusive<u64> = 100..=500;
const BUSINESS_ERROR_ODDS: u32 = 20;
pub const BUSINESS_ERROR_MESSAGE: &str = "Simulated business error";

const CPU_RANGE: RangeInclusive<u32> = 20..=89;
const MEMORY_RANGE: RangeInclusive<u32> = 30..=84;
const DISK_RANGE: RangeInclusive<u32> = 40..=94;
const METRICS_DELAY_MS: RangeInclusive<u64> = 50..=200;
const HIGH_USAGE_PERCENT: u32 = 80;

const USER_ID_RANGE: RangeInclusive<u32> = 1000..=9999;
const USER_DELAY_MS: RangeInclusive<u64> = 50..=300;
const USER_ERROR_ODDS: u32 = 15;
pub const USER_ERROR_MESSAGE: &str = "Simulated user activity error";

/// Operations flagged as failed during one business run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusinessReport {
    pub failed: Vec<&'static str>,
}

/// Usage percentages sampled during one metrics run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemMetrics {
    pub cpu: u32,
    pub memory: u32,
    pub disk: u32,
}

impl SystemMetrics {
    fn sample(rng: &mut StdRng) -> Self {
        Self {
            cpu: rng.random_range(CPU_RANGE),
            memory: rng.random_range(MEMORY_RANGE),
            disk: rng.random_range(DISK_RANGE),
        }
    }

    #[must_use]
    pub fn high_cpu(&self) -> bool {
        self.cpu > HIGH_USAGE_PERCENT
    }

    #[must_use]
    pub fn high_memory(&self) -> bool {
        self.memory > HIGH_USAGE_PERCENT
    }
}

/// Outcome of one simulated user session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserActivityReport {
    pub user_id: u32,
    pub failed: Vec<&'static str>,
}

pub async fn generate_business_traces(parent: &Span, rng: &mut StdRng) -> BusinessReport {
    let span = info_span!(
        parent: parent,
        "GenerateBusinessTraces",
        trace_type = "business",
        category = "background",
    );
    debug!(parent: &span, "Generating business traces");

    let mut report = BusinessReport::default();
    for operation in BUSINESS_OPERATIONS {
        let delay = Duration::from_millis(rng.random_range(BUSINESS_DELAY_MS));
        let failed = rng.random_ratio(1, BUSINESS_ERROR_ODDS);

        let op_span = info_span!(
            parent: &span,
            "business_operation",
            otel.name = operation,
            operation,
            trace_type = "business",
            error = field::Empty,
            error_message = field::Empty,
            otel.status_code = field::Empty,
        );

        async {
            info!(operation, "Executing business operation");
            sleep(delay).await;
            if failed {
                warn!(operation, "Simulated error in operation");
                mark_error(&op_span, BUSINESS_ERROR_MESSAGE);
            } else {
                debug!(operation, "Operation completed successfully");
            }
        }
        .instrument(op_span.clone())
        .await;

        if failed {
            report.failed.push(operation);
        }
    }
    report
}

pub async fn generate_system_metrics(parent: &Span, rng: &mut StdRng) -> SystemMetrics {
    let metrics = SystemMetrics::sample(rng);
    let delay = Duration::from_millis(rng.random_range(METRICS_DELAY_MS));

    let span = info_span!(
        parent: parent,
        "GenerateSystemMetrics",
        trace_type = "system",
        category = "background",
        cpu_usage = metrics.cpu,
        memory_usage = metrics.memory,
        disk_usage = metrics.disk,
    );

    async {
        debug!("Generating system metrics");
        info!(
            cpu = metrics.cpu,
            memory = metrics.memory,
            disk = metrics.disk,
            "System metrics - CPU: {}%, Memory: {}%, Disk: {}%",
            metrics.cpu,
            metrics.memory,
            metrics.disk
        );

        sleep(delay).await;

        if metrics.high_cpu() {
            warn!(cpu = metrics.cpu, "High CPU usage detected: {}%", metrics.cpu);
        }
        if metrics.high_memory() {
            warn!(
                memory = metrics.memory,
                "High memory usage detected: {}%", metrics.memory
            );
        }
    }
    .instrument(span)
    .await;

    metrics
}

pub async fn generate_user_activity(parent: &Span, rng: &mut StdRng) -> UserActivityReport {
    let user_id = rng.random_range(USER_ID_RANGE);
    let span = info_span!(
        parent: parent,
        "GenerateUserActivity",
        trace_type = "user_activity",
        category = "background",
        user_id,
    );
    debug!(parent: &span, "Generating user activity traces");

    let mut report = UserActivityReport {
        user_id,
        failed: Vec::new(),
    };
    for activity in USER_ACTIVITIES {
        let delay = Duration::from_millis(rng.random_range(USER_DELAY_MS));
        let failed = rng.random_ratio(1, USER_ERROR_ODDS);

        let activity_span = info_span!(
            parent: &span,
            "user_activity",
            otel.name = activity,
            user_id,
            activity,
            error = field::Empty,
            error_message = field::Empty,
            otel.status_code = field::Empty,
        );

        async {
            info!(user_id, activity, "User {} performed activity: {}", user_id, activity);
            sleep(delay).await;
            if failed {
                warn!(user_id, activity, "User encountered error in activity");
                mark_error(&activity_span, USER_ERROR_MESSAGE);
            }
        }
        .instrument(activity_span.clone())
        .await;

        if failed {
            report.failed.push(activity);
        }
    }
    report
}

/// The production workload: all three sub-generators driven by one owned RNG
pub struct SyntheticWorkload {
    rng: StdRng,
}

impl SyntheticWorkload {
    /// Seeded from the thread-local entropy source
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::seeded(rand::random())
    }

    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

#[async_trait]
impl Workload for SyntheticWorkload {
    async fn run_step(&mut self, step: Step, parent: &Span) -> Result<()> {
        match step {
            Step::Business => {
                generate_business_traces(parent, &mut self.rng).await;
            }
            Step::SystemMetrics => {
                generate_system_metrics(parent, &mut self.rng).await;
            }
            Step::UserActivity => {
                generate_user_activity(parent, &mut self.rng).await;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traces::capture::CaptureLayer;
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;

    /// First seed whose initial metrics sample satisfies `wanted`
    fn seed_where(wanted: impl Fn(&SystemMetrics) -> bool) -> u64 {
        (0..10_000)
            .find(|&seed| wanted(&SystemMetrics::sample(&mut StdRng::seed_from_u64(seed))))
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_validate_payment_error_rate_near_five_percent() {
        let mut rng = StdRng::seed_from_u64(2024);
        let runs = 1000;
        let mut validate_failures = 0;

        for _ in 0..runs {
            let report = generate_business_traces(&Span::none(), &mut rng).await;
            if report.failed.contains(&"ValidatePayment") {
                validate_failures += 1;
            }
        }

        let rate = f64::from(validate_failures) / f64::from(runs);
        assert!(
            (0.03..=0.075).contains(&rate),
            "ValidatePayment error rate {rate} not near 5%"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_business_delays_stay_in_bounds() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..20 {
            let started = tokio::time::Instant::now();
            generate_business_traces(&Span::none(), &mut rng).await;
            let elapsed = started.elapsed();
            assert!(elapsed >= Duration::from_millis(500));
            assert!(elapsed <= Duration::from_millis(2_500 + 10));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_system_metrics_ranges() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..200 {
            let metrics = generate_system_metrics(&Span::none(), &mut rng).await;
            assert!(CPU_RANGE.contains(&metrics.cpu));
            assert!(MEMORY_RANGE.contains(&metrics.memory));
            assert!(DISK_RANGE.contains(&metrics.disk));
        }
    }

    #[test]
    fn test_high_usage_thresholds() {
        let calm = SystemMetrics {
            cpu: 80,
            memory: 80,
            disk: 94,
        };
        assert!(!calm.high_cpu());
        assert!(!calm.high_memory());

        let busy = SystemMetrics {
            cpu: 81,
            memory: 84,
            disk: 40,
        };
        assert!(busy.high_cpu());
        assert!(busy.high_memory());
    }

    #[tokio::test(start_paused = true)]
    async fn test_high_cpu_emits_warning() {
        let capture = CaptureLayer::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let seed = seed_where(|m| m.high_cpu() && !m.high_memory());
        let metrics = generate_system_metrics(&Span::none(), &mut StdRng::seed_from_u64(seed)).await;
        assert!(metrics.cpu > HIGH_USAGE_PERCENT);

        let warnings = capture.events_at(Level::WARN, "High CPU usage detected");
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            warnings[0].message,
            format!("High CPU usage detected: {}%", metrics.cpu)
        );
        assert_eq!(warnings[0].fields["cpu"], metrics.cpu.to_string());
        assert_eq!(warnings[0].span.as_deref(), Some("GenerateSystemMetrics"));
        assert!(capture.events_at(Level::WARN, "High memory usage").is_empty());

        let span = &capture.named("GenerateSystemMetrics")[0];
        assert_eq!(span.fields["cpu_usage"], metrics.cpu.to_string());
        assert_eq!(span.fields["memory_usage"], metrics.memory.to_string());
        assert_eq!(span.fields["disk_usage"], metrics.disk.to_string());
    }

    #[tokio::test(start_paused = true)]
    async fn test_high_memory_emits_warning() {
        let capture = CaptureLayer::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let seed = seed_where(|m| m.high_memory() && !m.high_cpu());
        let metrics = generate_system_metrics(&Span::none(), &mut StdRng::seed_from_u64(seed)).await;

        let warnings = capture.events_at(Level::WARN, "High memory usage detected");
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            warnings[0].message,
            format!("High memory usage detected: {}%", metrics.memory)
        );
        assert!(capture.events_at(Level::WARN, "High CPU usage").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_normal_usage_emits_no_warning() {
        let capture = CaptureLayer::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let seed = seed_where(|m| !m.high_cpu() && !m.high_memory());
        generate_system_metrics(&Span::none(), &mut StdRng::seed_from_u64(seed)).await;

        assert!(
            capture
                .events()
                .iter()
                .all(|event| event.level != Level::WARN)
        );
        let info = capture.events_at(Level::INFO, "System metrics - CPU:");
        assert_eq!(info.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_activity_covers_every_activity() {
        let capture = CaptureLayer::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut rng = StdRng::seed_from_u64(99);
        let report = generate_user_activity(&Span::none(), &mut rng).await;
        assert!(USER_ID_RANGE.contains(&report.user_id));

        let outer = capture.named("GenerateUserActivity");
        assert_eq!(outer.len(), 1);
        assert_eq!(outer[0].fields["user_id"], report.user_id.to_string());

        for activity in USER_ACTIVITIES {
            let spans = capture.named(activity);
            assert_eq!(spans.len(), 1);
            assert_eq!(spans[0].parent.as_deref(), Some("GenerateUserActivity"));
            let flagged = spans[0].fields.contains_key("error");
            assert_eq!(flagged, report.failed.contains(&activity));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_flagged_business_spans_carry_message() {
        let capture = CaptureLayer::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut rng = StdRng::seed_from_u64(3);
        let mut failed = Vec::new();
        for _ in 0..40 {
            failed.extend(generate_business_traces(&Span::none(), &mut rng).await.failed);
        }
        assert!(!failed.is_empty(), "40 runs should flag at least one operation");

        let flagged: Vec<_> = capture
            .spans()
            .into_iter()
            .filter(|span| span.fields.contains_key("error"))
            .collect();
        assert_eq!(flagged.len(), failed.len());
        for span in flagged {
            assert_eq!(span.fields["error_message"], BUSINESS_ERROR_MESSAGE);
            assert_eq!(span.parent.as_deref(), Some("GenerateBusinessTraces"));
        }
    }
}
