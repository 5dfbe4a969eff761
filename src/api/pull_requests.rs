//! `/pullRequest/*` routes.

use super::{required, ApiErr, AppState};
use crate::models::PullRequest;
use crate::services::Reassignment;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/pullRequest/create", post(create))
        .route("/pullRequest/merge", post(merge))
        .route("/pullRequest/reassign", post(reassign))
}

#[derive(Debug, Deserialize)]
struct CreateRequest {
    #[serde(default)]
    pull_request_id: String,
    #[serde(default)]
    pull_request_name: String,
    #[serde(default)]
    author_id: String,
}

#[derive(Debug, Deserialize)]
struct MergeRequest {
    #[serde(default)]
    pull_request_id: String,
}

#[derive(Debug, Deserialize)]
struct ReassignRequest {
    #[serde(default)]
    pull_request_id: String,
    #[serde(default)]
    old_user_id: String,
}

#[derive(Serialize)]
struct PrResponse {
    pr: PullRequest,
}

/// POST /pullRequest/create
async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PrResponse>), ApiErr> {
    let Json(req) = payload?;
    required(&req.pull_request_id, "pull_request_id")?;
    required(&req.pull_request_name, "pull_request_name")?;
    required(&req.author_id, "author_id")?;

    let pr = state
        .prs
        .create_pr(&req.pull_request_id, &req.pull_request_name, &req.author_id)
        .await?;
    Ok((StatusCode::CREATED, Json(PrResponse { pr })))
}

/// POST /pullRequest/merge
async fn merge(
    State(state): State<AppState>,
    payload: Result<Json<MergeRequest>, JsonRejection>,
) -> Result<Json<PrResponse>, ApiErr> {
    let Json(req) = payload?;
    required(&req.pull_request_id, "pull_request_id")?;

    let pr = state.prs.merge_pr(&req.pull_request_id).await?;
    Ok(Json(PrResponse { pr }))
}

/// POST /pullRequest/reassign
async fn reassign(
    State(state): State<AppState>,
    payload: Result<Json<ReassignRequest>, JsonRejection>,
) -> Result<Json<Reassignment>, ApiErr> {
    let Json(req) = payload?;
    let result = state
        .prs
        .reassign_reviewer(&req.pull_request_id, &req.old_user_id)
        .await?;
    Ok(Json(result))
}
