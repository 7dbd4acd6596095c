//! Logging and trace export setup
//!
//! Console output always goes through a `tracing-subscriber` fmt layer.
//! When an OTLP endpoint is configured, spans are additionally exported via
//! `tracing-opentelemetry` and log events via the OpenTelemetry log bridge.

use anyhow::{Context, Result};
use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::{LogExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_semantic_conventions::resource::SERVICE_VERSION;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::InsightsError;
use crate::config::InsightsConfig;

/// Crates whose own logs would feed back into the exporter
const QUIET_TARGETS: [&str; 4] = ["hyper=off", "h2=off", "reqwest=off", "opentelemetry=off"];

/// Keeps export pipelines alive; call [`TelemetryGuard::shutdown`] before exit
#[derive(Default)]
pub struct TelemetryGuard {
    tracer_provider: Option<SdkTracerProvider>,
    logger_provider: Option<SdkLoggerProvider>,
}

impl TelemetryGuard {
    /// Flush pending spans and logs
    pub fn shutdown(self) {
        if let Some(provider) = self.tracer_provider
            && let Err(e) = provider.shutdown()
        {
            eprintln!("Failed to shut down tracer provider: {e}");
        }
        if let Some(provider) = self.logger_provider
            && let Err(e) = provider.shutdown()
        {
            eprintln!("Failed to shut down logger provider: {e}");
        }
    }

    #[must_use]
    pub fn is_exporting(&self) -> bool {
        self.tracer_provider.is_some()
    }
}

/// Install the global subscriber
pub fn init(config: &InsightsConfig) -> Result<TelemetryGuard> {
    let mut filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .map_err(|e| {
            InsightsError::telemetry(format!(
                "Invalid log filter '{}': {e}",
                config.logging.level
            ))
        })?;

    let guard = match &config.telemetry.otlp_endpoint {
        Some(endpoint) => {
            for target in QUIET_TARGETS {
                filter = filter.add_directive(target.parse()?);
            }
            export_pipeline(config, endpoint)?
        }
        None => TelemetryGuard::default(),
    };

    let fmt_layer = match config.logging.format.as_str() {
        "json" => fmt::layer().json().with_current_span(true).boxed(),
        _ => fmt::layer().with_target(true).boxed(),
    };

    let otel_traces = guard.tracer_provider.as_ref().map(|provider| {
        tracing_opentelemetry::layer()
            .with_tracer(provider.tracer(config.telemetry.service_name.clone()))
    });
    let otel_logs = guard
        .logger_provider
        .as_ref()
        .map(OpenTelemetryTracingBridge::new);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(otel_traces)
        .with(otel_logs)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    if let Some(endpoint) = &config.telemetry.otlp_endpoint {
        tracing::info!(%endpoint, "Exporting traces and logs over OTLP/HTTP");
    }

    Ok(guard)
}

fn export_pipeline(config: &InsightsConfig, endpoint: &str) -> Result<TelemetryGuard> {
    let endpoint = endpoint.trim_end_matches('/');
    let resource = resource(config);

    let span_exporter = SpanExporter::builder()
        .with_http()
        .with_endpoint(format!("{endpoint}/v1/traces"))
        .build()
        .context("Failed to build OTLP span exporter")?;
    let tracer_provider = SdkTracerProvider::builder()
        .with_resource(resource.clone())
        .with_batch_exporter(span_exporter)
        .build();
    opentelemetry::global::set_tracer_provider(tracer_provider.clone());

    let log_exporter = LogExporter::builder()
        .with_http()
        .with_endpoint(format!("{endpoint}/v1/logs"))
        .build()
        .context("Failed to build OTLP log exporter")?;
    let logger_provider = SdkLoggerProvider::builder()
        .with_resource(resource)
        .with_batch_exporter(log_exporter)
        .build();

    Ok(TelemetryGuard {
        tracer_provider: Some(tracer_provider),
        logger_provider: Some(logger_provider),
    })
}

fn resource(config: &InsightsConfig) -> Resource {
    Resource::builder()
        .with_service_name(config.telemetry.service_name.clone())
        .with_attributes([
            KeyValue::new(SERVICE_VERSION, crate::VERSION),
            KeyValue::new("deployment.environment.name", config.app.environment.clone()),
        ])
        .build()
}
