//! Data models for the application.
//!
//! These models represent the entities stored in the SQLite database and
//! returned over the HTTP API. Field names follow the JSON wire format.

pub mod pull_request;
pub mod stats;
pub mod team;
pub mod user;

// Re-exports for convenient access
pub use pull_request::{PrStatus, PullRequest, PullRequestShort};
pub use stats::{StatsResponse, UserStats};
pub use team::{Team, TeamMember};
pub use user::User;
