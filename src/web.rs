use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::{self, AppState};
use crate::config::ServerConfig;

/// Full application: API routes plus the HTTP middleware stack.
///
/// There is no request timeout; handlers are bounded by their own fixed delays.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    api::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Bind the configured listen address
pub async fn bind(config: &ServerConfig) -> std::io::Result<TcpListener> {
    TcpListener::bind(&config.bind_address).await
}

/// Serve until `shutdown` is cancelled, then drain in-flight requests
pub async fn run(
    listener: TcpListener,
    app: Router,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!("Web server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("Web server stopped");
    Ok(())
}

/// Cancel `shutdown` on Ctrl+C or, on Unix, SIGTERM
pub async fn shutdown_on_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    shutdown.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_reports_address_in_use() {
        let first = bind(&ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            ..ServerConfig::default()
        })
        .await
        .unwrap();
        let taken = first.local_addr().unwrap();

        let second = bind(&ServerConfig {
            bind_address: taken.to_string(),
            ..ServerConfig::default()
        })
        .await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn test_run_stops_when_cancelled() {
        let listener = bind(&ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            ..ServerConfig::default()
        })
        .await
        .unwrap();
        let state = AppState::new(
            std::sync::Arc::new(crate::SampleTraceService),
            crate::config::AppConfig::default(),
        );
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        run(listener, app(state), shutdown)
            .await
            .unwrap();
    }
}
