//! Storage contracts used by the services.
//!
//! The lifecycle manager never touches SQL. It talks to a [`Directory`] for
//! users and teams and to a [`PrStore`] for pull requests. Every write that
//! must be atomic is a single trait method, so a caller never observes or
//! reasons about partial completion.
//!
//! Two backends exist: [`sqlite`] for production and [`memory`] for tests.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::{SqliteDirectory, SqlitePrStore};

use crate::models::pull_request::UnknownStatus;
use crate::models::{PullRequest, PullRequestShort, Team, User, UserStats};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by store implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} already exists: {id}")]
    Conflict { entity: &'static str, id: String },

    #[error("reviewer {reviewer_id} is not assigned to {pr_id}")]
    NotAssigned { pr_id: String, reviewer_id: String },

    #[error("pull request {pr_id} is merged")]
    Merged { pr_id: String },

    /// The reviewer set no longer matches what the caller read.
    #[error("reviewers of {pr_id} changed concurrently")]
    ReviewersChanged { pr_id: String },

    #[error("store operation timed out: {operation}")]
    Timeout { operation: String },

    #[error("store backend failure: {message}")]
    Backend { message: String, transient: bool },
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn conflict(entity: &'static str, id: impl Into<String>) -> Self {
        Self::Conflict {
            entity,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let transient = match &err {
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
            // SQLITE_BUSY (5) and SQLITE_LOCKED (6), including extended codes
            sqlx::Error::Database(db) => db
                .code()
                .and_then(|c| c.parse::<i32>().ok())
                .is_some_and(|c| matches!(c & 0xff, 5 | 6)),
            _ => false,
        };
        Self::Backend {
            message: err.to_string(),
            transient,
        }
    }
}

impl From<UnknownStatus> for StoreError {
    fn from(err: UnknownStatus) -> Self {
        Self::Backend {
            message: err.to_string(),
            transient: false,
        }
    }
}

/// How a reviewer swap was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    /// The old association now points at the new reviewer.
    Swapped,
    /// The new reviewer was already in the expected set, so the old row was
    /// dropped instead of creating a duplicate. Only reachable when the
    /// caller passes a set that already contains the new reviewer.
    DroppedStaleDuplicate,
}

/// User and team membership lookups.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Fails with `NotFound` for unknown ids.
    async fn get_user(&self, user_id: &str) -> Result<User, StoreError>;

    /// Active members of a team. Fails with `NotFound` if the team does not exist.
    async fn get_active_team_members(&self, team_name: &str) -> Result<Vec<User>, StoreError>;

    async fn team_exists(&self, team_name: &str) -> Result<bool, StoreError>;

    /// Create a team and upsert its members in one transaction.
    ///
    /// Fails with `Conflict` if the team already exists.
    async fn create_team(&self, team: &Team) -> Result<(), StoreError>;

    /// A team with all members, active or not.
    async fn get_team(&self, team_name: &str) -> Result<Team, StoreError>;

    async fn set_user_active(&self, user_id: &str, is_active: bool) -> Result<User, StoreError>;
}

/// Durable pull request storage.
#[async_trait]
pub trait PrStore: Send + Sync {
    /// A pull request with its reviewer set, read from one snapshot.
    async fn get_pr(&self, pr_id: &str) -> Result<PullRequest, StoreError>;

    /// Insert the pull request and all of its reviewer rows atomically.
    ///
    /// Fails with `Conflict` if the id is taken; nothing is written then.
    async fn create_pr(&self, pr: &PullRequest) -> Result<(), StoreError>;

    /// Move an open pull request to `MERGED` with the given timestamp.
    ///
    /// A pull request that is already merged is returned unchanged, so
    /// concurrent callers converge on the first timestamp written.
    async fn merge_pr(
        &self,
        pr_id: &str,
        merged_at: DateTime<Utc>,
    ) -> Result<PullRequest, StoreError>;

    /// Swap `old_reviewer` for `new_reviewer` in one transaction.
    ///
    /// `expected` is the reviewer set the caller chose `new_reviewer`
    /// against. Re-checks inside the transaction that the pull request is
    /// still open (`Merged`), that `old_reviewer` is still assigned
    /// (`NotAssigned`) and that the stored set still equals `expected`
    /// (`ReviewersChanged`, safe to retry with a fresh read).
    async fn replace_reviewer(
        &self,
        pr_id: &str,
        old_reviewer: &str,
        new_reviewer: &str,
        expected: &[String],
    ) -> Result<ReplaceOutcome, StoreError>;

    /// Pull requests on which the user is an assigned reviewer.
    async fn list_by_reviewer(&self, user_id: &str) -> Result<Vec<PullRequestShort>, StoreError>;

    async fn total_count(&self) -> Result<i64, StoreError>;

    /// Reviewer assignment counts for every known user, zero included.
    async fn review_counts(&self) -> Result<Vec<UserStats>, StoreError>;
}

/// Whether two reviewer lists hold the same ids, ignoring order.
pub fn same_reviewers(a: &[String], b: &[String]) -> bool {
    let mut a: Vec<&String> = a.iter().collect();
    let mut b: Vec<&String> = b.iter().collect();
    a.sort();
    b.sort();
    a == b
}

/// Run a store call, giving up after `limit`.
pub async fn bounded<T, F>(limit: Duration, operation: &str, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout {
            operation: operation.to_string(),
        }),
    }
}
