//! `/stats` route.

use super::{ApiErr, AppState};
use crate::models::StatsResponse;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

pub(super) fn routes() -> Router<AppState> {
    Router::new().route("/stats", get(get_stats))
}

/// GET /stats
async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiErr> {
    Ok(Json(state.stats.get_stats().await?))
}
