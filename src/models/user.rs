//! User model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A member of exactly one team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Caller-supplied identifier, unique across all teams.
    #[sqlx(rename = "id")]
    pub user_id: String,

    pub username: String,

    pub team_name: String,

    /// Inactive users are never picked as reviewers.
    pub is_active: bool,
}
