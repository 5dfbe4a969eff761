//! Team model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A member entry as it appears inside a [`Team`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TeamMember {
    #[sqlx(rename = "id")]
    pub user_id: String,
    pub username: String,
    pub is_active: bool,
}

/// A named team and its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub team_name: String,
    #[serde(default)]
    pub members: Vec<TeamMember>,
}
