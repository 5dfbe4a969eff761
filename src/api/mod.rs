//! HTTP API.
//!
//! Handlers are thin: decode the request, call one service method, wrap the
//! result. Every failure leaves as `{"error": {"code", "message"}}` with a
//! status picked by [`status_for`].

mod pull_requests;
mod stats;
mod teams;
mod users;

use crate::db::DbPool;
use crate::error::AppError;
use crate::services::{PrService, ReviewerSelector, StatsService, TeamService, UserService};
use crate::store::{Directory, PrStore, SqliteDirectory, SqlitePrStore};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Services shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub prs: PrService,
    pub teams: TeamService,
    pub users: UserService,
    pub stats: StatsService,
}

impl AppState {
    pub fn new(
        prs: Arc<dyn PrStore>,
        directory: Arc<dyn Directory>,
        selector: Arc<ReviewerSelector>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            prs: PrService::new(prs.clone(), directory.clone(), selector, store_timeout),
            teams: TeamService::new(directory.clone(), store_timeout),
            users: UserService::new(directory, prs.clone(), store_timeout),
            stats: StatsService::new(prs, store_timeout),
        }
    }

    /// State backed by the SQLite stores on `pool`.
    pub fn sqlite(pool: DbPool, selector: Arc<ReviewerSelector>, store_timeout: Duration) -> Self {
        Self::new(
            Arc::new(SqlitePrStore::new(pool.clone())),
            Arc::new(SqliteDirectory::new(pool)),
            selector,
            store_timeout,
        )
    }
}

/// All routes, without middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(teams::routes())
        .merge(users::routes())
        .merge(pull_requests::routes())
        .merge(stats::routes())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ── Error handling ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

/// HTTP status for an application error.
pub fn status_for(err: &AppError) -> StatusCode {
    match err {
        AppError::InvalidInput { .. } | AppError::TeamExists { .. } => StatusCode::BAD_REQUEST,
        AppError::NotFound { .. } => StatusCode::NOT_FOUND,
        AppError::PrExists { .. }
        | AppError::PrMerged { .. }
        | AppError::NotAssigned { .. }
        | AppError::NoCandidate { .. } => StatusCode::CONFLICT,
        AppError::Database {
            transient: true, ..
        } => StatusCode::SERVICE_UNAVAILABLE,
        AppError::Database { .. } | AppError::Internal { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Wrapper to make AppError usable as an axum error response.
#[derive(Debug)]
pub struct ApiErr(pub AppError);

impl IntoResponse for ApiErr {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        (
            status,
            Json(ErrorBody {
                error: ErrorDetail {
                    code: self.0.code(),
                    message: self.0.to_string(),
                },
            }),
        )
            .into_response()
    }
}

impl From<AppError> for ApiErr {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiErr {
    fn from(rejection: JsonRejection) -> Self {
        Self(AppError::invalid_input(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiErr {
    fn from(rejection: QueryRejection) -> Self {
        Self(AppError::invalid_input(rejection.body_text()))
    }
}

/// Reject an empty required field.
fn required(value: &str, field: &str) -> Result<(), ApiErr> {
    if value.trim().is_empty() {
        return Err(ApiErr(AppError::invalid_input_field(
            format!("{} is required", field),
            field,
        )));
    }
    Ok(())
}
