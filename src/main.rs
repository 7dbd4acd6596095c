use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use weather_insights::api::AppState;
use weather_insights::{
    BackgroundTraceService, InsightsConfig, SampleTraceService, SyntheticWorkload, telemetry, web,
};

#[derive(Parser)]
#[command(name = "weather-insights")]
#[command(about = "Demo weather API that emits synthetic traces", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen address, e.g. 127.0.0.1:8080
    #[arg(short, long)]
    bind: Option<String>,

    /// Do not start the background trace loop
    #[arg(long)]
    no_background: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = InsightsConfig::load_from_path(cli.config)?;
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    if cli.no_background {
        config.background.enabled = false;
    }
    config.validate()?;

    let telemetry = telemetry::init(&config)?;
    tracing::info!(
        version = weather_insights::VERSION,
        environment = %config.app.environment,
        "Starting {}",
        config.app.name
    );

    let listener = match web::bind(&config.server).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "Failed to bind {}", config.server.bind_address);
            telemetry.shutdown();
            return Err(e).with_context(|| format!("Failed to bind {}", config.server.bind_address));
        }
    };

    let shutdown = CancellationToken::new();

    let background = config.background.enabled.then(|| {
        BackgroundTraceService::new(SyntheticWorkload::from_entropy(), &config.background)
            .spawn(shutdown.child_token())
    });

    tokio::spawn(web::shutdown_on_signal(shutdown.clone()));

    let state = AppState::new(Arc::new(SampleTraceService), config.app.clone());
    let served = web::run(listener, web::app(state), shutdown.clone()).await;

    shutdown.cancel();
    if let Some(handle) = background {
        match handle.await {
            Ok(stats) => tracing::info!(
                iterations = stats.iterations,
                failures = stats.failures,
                "Background loop finished"
            ),
            Err(e) => tracing::error!(error = %e, "Background loop task failed"),
        }
    }

    telemetry.shutdown();
    served.context("Web server failed")
}
