//! Business logic services.
//!
//! Services hold `Arc`s to the store contracts and are cheap to clone into
//! request handlers. They validate input, call the store with a time bound,
//! and translate store failures into [`AppError`](crate::error::AppError).

pub mod pr_lifecycle;
pub mod reviewer_selection;
pub mod stats_service;
pub mod team_service;
pub mod user_service;

pub use pr_lifecycle::{PrService, Reassignment};
pub use reviewer_selection::ReviewerSelector;
pub use stats_service::StatsService;
pub use team_service::TeamService;
pub use user_service::UserService;
