//! Synthetic trace generation
//!
//! Every routine here takes the span it should nest under instead of relying
//! on whatever span happens to be current. Dynamic span names are carried in
//! the `otel.name` field, which the OpenTelemetry layer uses as the exported
//! span name.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{Instrument, Span, debug, info, info_span};

use crate::Result;

/// Mark a span as failed.
///
/// The span must have declared `error`, `error_message` and `otel.status_code`
/// as empty fields; undeclared fields are silently dropped by `tracing`.
pub fn mark_error(span: &Span, message: &str) {
    span.record("error", true);
    span.record("error_message", message);
    span.record("otel.status_code", "error");
}

/// Produces the short sample trace used by request handlers
#[async_trait]
pub trait TraceService: Send + Sync {
    async fn generate_sample_traces(&self, parent: &Span) -> Result<()>;
}

struct SampleStep {
    name: &'static str,
    step: &'static str,
    delay: Duration,
    started: &'static str,
    finished: &'static str,
}

static SAMPLE_STEPS: [SampleStep; 3] = [
    SampleStep {
        name: "ProcessUserData",
        step: "process_user_data",
        delay: Duration::from_millis(50),
        started: "Processing user data",
        finished: "User data processed successfully",
    },
    SampleStep {
        name: "ValidateData",
        step: "validate_data",
        delay: Duration::from_millis(30),
        started: "Validating data",
        finished: "Data validation completed",
    },
    SampleStep {
        name: "SaveData",
        step: "save_data",
        delay: Duration::from_millis(20),
        started: "Saving data",
        finished: "Data saved successfully",
    },
];

/// Fixed process, validate, save sequence. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleTraceService;

#[async_trait]
impl TraceService for SampleTraceService {
    async fn generate_sample_traces(&self, parent: &Span) -> Result<()> {
        let span = info_span!(
            parent: parent,
            "GenerateSampleTraces",
            service = "TraceService",
            operation = "generate_traces",
        );

        async {
            info!("Starting to generate sample traces");
            for step in &SAMPLE_STEPS {
                run_step(&span, step).await;
            }
            info!("Sample traces generation completed");
        }
        .instrument(span.clone())
        .await;

        Ok(())
    }
}

async fn run_step(parent: &Span, step: &SampleStep) {
    let span = info_span!(
        parent: parent,
        "sample_step",
        otel.name = step.name,
        step = step.step,
    );

    async {
        debug!("{}", step.started);
        sleep(step.delay).await;
        debug!("{}", step.finished);
    }
    .instrument(span)
    .await;
}


#[cfg(test)]
mod tests {
    use super::capture::CaptureLayer;
    use super::*;
    use tracing::field;
    use tracing_subscriber::layer::SubscriberExt;

    #[tokio::test(start_paused = true)]
    async fn test_sample_traces_nest_under_parent() {
        let capture = CaptureLayer::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let root = info_span!("request");
        SampleTraceService
            .generate_sample_traces(&root)
            .await
            .unwrap();

        let generated = capture.named("GenerateSampleTraces");
        assert_eq!(generated.len(), 1);
        assert_eq!(generated[0].parent.as_deref(), Some("request"));
        assert_eq!(generated[0].fields["service"], "TraceService");

        for (name, step) in [
            ("ProcessUserData", "process_user_data"),
            ("ValidateData", "validate_data"),
            ("SaveData", "save_data"),
        ] {
            let spans = capture.named(name);
            assert_eq!(spans.len(), 1, "expected one {name} span");
            assert_eq!(spans[0].parent.as_deref(), Some("GenerateSampleTraces"));
            assert_eq!(spans[0].fields["step"], step);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sample_traces_take_fixed_delays() {
        let started = tokio::time::Instant::now();
        SampleTraceService
            .generate_sample_traces(&Span::none())
            .await
            .unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_millis(110));
    }

    #[test]
    fn test_mark_error_records_declared_fields() {
        let capture = CaptureLayer::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());

        tracing::subscriber::with_default(subscriber, || {
            let span = info_span!(
                "business_operation",
                otel.name = "ValidatePayment",
                trace_type = "business",
                error = field::Empty,
                error_message = field::Empty,
                otel.status_code = field::Empty,
            );
            mark_error(&span, "Simulated business error");
        });

        let spans = capture.named("ValidatePayment");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].fields["error"], "true");
        assert_eq!(spans[0].fields["error_message"], "Simulated business error");
        assert_eq!(spans[0].fields["otel.status_code"], "error");
        assert_eq!(spans[0].fields["trace_type"], "business");
    }
}
