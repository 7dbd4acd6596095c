use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::State,
    response::Json,
    routing::{get, post},
};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{Instrument, Span, error, field, info, info_span, warn};

use crate::{
    InsightsError, Result,
    config::AppConfig,
    models::{StatusSnapshot, WeatherForecast},
    traces::{TraceService, mark_error},
};

mod error;

pub use error::{ApiError, ErrorBody};

const CONTROLLER: &str = "WeatherController";
const WEATHER_DELAY: Duration = Duration::from_millis(100);
const MANUAL_TRACE_DELAY: Duration = Duration::from_millis(100);
pub const MANUAL_TRACE_COUNT: u32 = 5;
pub const SIMULATED_ERROR_MESSAGE: &str =
    "This is a simulated error for testing Application Insights";
pub const TRACES_GENERATED_MESSAGE: &str = "Traces generated successfully";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub traces: Arc<dyn TraceService>,
    pub app: AppConfig,
}

impl AppState {
    pub fn new(traces: Arc<dyn TraceService>, app: AppConfig) -> Self {
        Self { traces, app }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TraceConfirmation {
    pub message: String,
    pub count: u32,
    pub timestamp: DateTime<Utc>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/weather", get(get_weather))
        .route("/weather/error", get(get_error))
        .route("/weather/status", get(get_status))
        .route("/weather/generate-traces", post(generate_traces))
        .with_state(state)
}

async fn get_weather(
    State(state): State<AppState>,
) -> std::result::Result<Json<Vec<WeatherForecast>>, ApiError> {
    let span = info_span!(
        parent: &Span::current(),
        "GetWeather",
        operation = "get_weather",
        controller = CONTROLLER,
        items_count = field::Empty,
        error = field::Empty,
        error_message = field::Empty,
        otel.status_code = field::Empty,
    );

    async {
        info!("Getting weather forecast");
        match build_forecast(&state, &span).await {
            Ok(weather) => {
                info!(
                    count = weather.len(),
                    "Weather forecast generated successfully"
                );
                span.record("items_count", weather.len() as u64);
                Ok(Json(weather))
            }
            Err(e) => {
                error!(error = %e, "Error occurred while getting weather forecast");
                mark_error(&span, &e.to_string());
                Err(ApiError::Propagated(e))
            }
        }
    }
    .instrument(span.clone())
    .await
}

async fn build_forecast(state: &AppState, span: &Span) -> Result<Vec<WeatherForecast>> {
    sleep(WEATHER_DELAY).await;
    state.traces.generate_sample_traces(span).await?;

    let mut rng = crate::request_rng();
    WeatherForecast::generate(Local::now().date_naive(), &mut rng)
}

async fn get_error() -> ApiError {
    let span = info_span!(
        parent: &Span::current(),
        "GetError",
        operation = "get_error",
        controller = CONTROLLER,
        error = field::Empty,
        error_message = field::Empty,
        otel.status_code = field::Empty,
    );

    span.in_scope(|| {
        warn!("Simulating an error for testing purposes");
        match simulate_failure() {
            Ok(never) => match never {},
            Err(e) => {
                error!(error = %e, "Simulated error occurred");
                mark_error(&span, &e.to_string());
                ApiError::Payload(e)
            }
        }
    })
}

fn simulate_failure() -> Result<Infallible> {
    Err(InsightsError::simulated(SIMULATED_ERROR_MESSAGE))
}

async fn get_status(State(state): State<AppState>) -> Json<StatusSnapshot> {
    let span = info_span!(
        parent: &Span::current(),
        "GetStatus",
        operation = "get_status",
        controller = CONTROLLER,
        status = field::Empty,
        machine_name = field::Empty,
    );

    span.in_scope(|| {
        info!("Application status requested");
        let status = StatusSnapshot::capture(&state.app);

        span.record("status", "healthy");
        span.record("machine_name", status.machine_name.as_str());
        info!(status = %status.status, "Application status: {}", status.status);

        Json(status)
    })
}

async fn generate_traces(
    State(state): State<AppState>,
) -> std::result::Result<Json<TraceConfirmation>, ApiError> {
    let span = info_span!(
        parent: &Span::current(),
        "GenerateTraces",
        operation = "generate_traces",
        controller = CONTROLLER,
        traces_generated = field::Empty,
        error = field::Empty,
        error_message = field::Empty,
        otel.status_code = field::Empty,
    );

    async {
        info!("Manual trace generation requested");
        match run_manual_traces(&state, &span).await {
            Ok(count) => {
                info!("Manual trace generation completed successfully");
                span.record("traces_generated", count);
                Ok(Json(TraceConfirmation {
                    message: TRACES_GENERATED_MESSAGE.to_string(),
                    count,
                    timestamp: Utc::now(),
                }))
            }
            Err(e) => {
                error!(error = %e, "Error occurred during manual trace generation");
                mark_error(&span, &e.to_string());
                Err(ApiError::Payload(e))
            }
        }
    }
    .instrument(span.clone())
    .await
}

async fn run_manual_traces(state: &AppState, parent: &Span) -> Result<u32> {
    state.traces.generate_sample_traces(parent).await?;

    for trace_number in 0..MANUAL_TRACE_COUNT {
        let span = info_span!(
            parent: parent,
            "manual_trace",
            otel.name = %format!("ManualTrace_{trace_number}"),
            trace_number,
            source = "manual_request",
        );

        async {
            info!(trace_number, "Generated manual trace {}", trace_number);
            sleep(MANUAL_TRACE_DELAY).await;
        }
        .instrument(span)
        .await;
    }

    Ok(MANUAL_TRACE_COUNT)
}
