//! HTTP server startup and shutdown.

use crate::api::{self, AppState};
use crate::config::AppConfig;
use crate::db;
use crate::error::AppError;
use crate::services::ReviewerSelector;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Routes with request tracing and a per-request time limit.
pub fn build_app(state: AppState, request_timeout: Duration) -> Router {
    api::router(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}

fn selector_for(config: &AppConfig) -> ReviewerSelector {
    match config.rng_seed {
        Some(seed) => {
            log::info!("[server] Using fixed reviewer selection seed {}", seed);
            ReviewerSelector::from_seed(seed)
        }
        None => ReviewerSelector::from_entropy(),
    }
}

/// Open the database, bind the listener and serve until `shutdown` fires.
///
/// In-flight requests are allowed to finish before this returns.
pub async fn serve(config: AppConfig, shutdown: CancellationToken) -> Result<(), AppError> {
    let pool = db::initialize_with(&config.db_path, config.pool_options()).await?;
    log::info!("[server] Database ready at {}", config.db_path.display());

    let state = AppState::sqlite(
        pool.clone(),
        Arc::new(selector_for(&config)),
        config.store_timeout(),
    );
    let app = build_app(state, config.request_timeout());

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind to {}: {}", addr, e)))?;

    log::info!("[server] Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            log::info!("[server] Shutdown requested");
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    pool.close().await;
    log::info!("[server] Server stopped");
    Ok(())
}
