//! CSOS API Server Entry Point
//!
//! Reads configuration from the environment, warms the rule cache and
//! starts the Axum HTTP server.

use csos_api::telemetry::{init_tracing, TelemetryConfig};
use csos_api::{
    create_api_router, ApiConfig, ApiError, ApiResult, AppState, AuthConfig, BackendConfig,
    RulesConfig,
};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::from_env();
    init_tracing(&telemetry_config)?;

    let backend = BackendConfig::from_env()?;
    let rules = RulesConfig::from_env()?;
    let api_config = ApiConfig::from_env()?;
    let auth_config = AuthConfig::from_env();

    let state = AppState::from_config(&backend, &rules, auth_config, api_config.clone())?;

    let loaded = state.cache.preload().await;
    tracing::info!(loaded, bucket = %rules.bucket, "Rule cache warmed");

    let app = create_api_router(state)?;

    let addr = api_config.bind_addr();
    tracing::info!(%addr, "Starting CSOS API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
