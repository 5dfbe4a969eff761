//! `/team/*` routes.

use super::{ApiErr, AppState};
use crate::models::Team;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/team/add", post(add_team))
        .route("/team/get", get(get_team))
}

#[derive(Debug, Deserialize)]
struct TeamQuery {
    #[serde(default)]
    team_name: String,
}

#[derive(Serialize)]
struct TeamResponse {
    team: Team,
}

/// POST /team/add
async fn add_team(
    State(state): State<AppState>,
    payload: Result<Json<Team>, JsonRejection>,
) -> Result<(StatusCode, Json<TeamResponse>), ApiErr> {
    let Json(team) = payload?;
    let team = state.teams.create_team(team).await?;
    Ok((StatusCode::CREATED, Json(TeamResponse { team })))
}

/// GET /team/get?team_name=X
async fn get_team(
    State(state): State<AppState>,
    params: Result<Query<TeamQuery>, QueryRejection>,
) -> Result<Json<Team>, ApiErr> {
    let Query(params) = params?;
    Ok(Json(state.teams.get_team(&params.team_name).await?))
}
