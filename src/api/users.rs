//! `/users/*` routes.

use super::{ApiErr, AppState};
use crate::models::{PullRequestShort, User};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/setIsActive", post(set_is_active))
        .route("/users/getReview", get(get_review))
}

#[derive(Debug, Deserialize)]
struct SetActiveRequest {
    #[serde(default)]
    user_id: String,
    is_active: bool,
}

#[derive(Debug, Deserialize)]
struct UserQuery {
    #[serde(default)]
    user_id: String,
}

#[derive(Serialize)]
struct UserResponse {
    user: User,
}

#[derive(Serialize)]
struct ReviewsResponse {
    user_id: String,
    pull_requests: Vec<PullRequestShort>,
}

/// POST /users/setIsActive
async fn set_is_active(
    State(state): State<AppState>,
    payload: Result<Json<SetActiveRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiErr> {
    let Json(req) = payload?;
    let user = state.users.set_is_active(&req.user_id, req.is_active).await?;
    Ok(Json(UserResponse { user }))
}

/// GET /users/getReview?user_id=X
async fn get_review(
    State(state): State<AppState>,
    params: Result<Query<UserQuery>, QueryRejection>,
) -> Result<Json<ReviewsResponse>, ApiErr> {
    let Query(params) = params?;
    let pull_requests = state.users.get_reviews(&params.user_id).await?;
    Ok(Json(ReviewsResponse {
        user_id: params.user_id,
        pull_requests,
    }))
}
