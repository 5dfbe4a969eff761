//! Review statistics.

use serde::Serialize;
use sqlx::FromRow;

/// Number of reviewer assignments held by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct UserStats {
    #[sqlx(rename = "id")]
    pub user_id: String,
    pub username: String,
    pub review_count: i64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub total_prs_created: i64,
    pub reviews_by_user: Vec<UserStats>,
}
