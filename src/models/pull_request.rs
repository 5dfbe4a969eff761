//! Pull request model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use thiserror::Error;

/// Status of a pull request.
///
/// `Merged` is terminal: once reached, neither the status nor the merge
/// timestamp changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrStatus {
    Open,
    Merged,
}

impl PrStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Merged => "MERGED",
        }
    }
}

/// A status string that is neither `OPEN` nor `MERGED`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown pull request status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for PrStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(Self::Open),
            "MERGED" => Ok(Self::Merged),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for PrStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pull request with its current reviewer set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub pull_request_id: String,

    pub pull_request_name: String,

    pub author_id: String,

    pub status: PrStatus,

    /// Reviewer identifiers. Never contains the author or duplicates.
    pub assigned_reviewers: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub created_at: Option<DateTime<Utc>>,

    /// Set exactly once, on the transition to `MERGED`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub merged_at: Option<DateTime<Utc>>,
}

impl PullRequest {
    /// A freshly created, open pull request.
    pub fn new_open(
        pull_request_id: impl Into<String>,
        pull_request_name: impl Into<String>,
        author_id: impl Into<String>,
        assigned_reviewers: Vec<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            pull_request_id: pull_request_id.into(),
            pull_request_name: pull_request_name.into(),
            author_id: author_id.into(),
            status: PrStatus::Open,
            assigned_reviewers,
            created_at: Some(created_at),
            merged_at: None,
        }
    }

    pub fn is_merged(&self) -> bool {
        self.status == PrStatus::Merged
    }

    pub fn has_reviewer(&self, user_id: &str) -> bool {
        self.assigned_reviewers.iter().any(|r| r == user_id)
    }

    pub fn to_short(&self) -> PullRequestShort {
        PullRequestShort {
            pull_request_id: self.pull_request_id.clone(),
            pull_request_name: self.pull_request_name.clone(),
            author_id: self.author_id.clone(),
            status: self.status,
        }
    }
}

/// Pull request without reviewers or timestamps, used in listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestShort {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
    pub status: PrStatus,
}

/// Row shape of the `pull_requests` table.
///
/// Reviewers live in `pr_reviewers` and are attached by the store.
#[derive(Debug, Clone, FromRow)]
pub struct PullRequestRow {
    pub id: String,
    pub name: String,
    pub author_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
}

impl PullRequestRow {
    pub fn into_pull_request(
        self,
        assigned_reviewers: Vec<String>,
    ) -> Result<PullRequest, UnknownStatus> {
        Ok(PullRequest {
            pull_request_id: self.id,
            pull_request_name: self.name,
            author_id: self.author_id,
            status: self.status.parse()?,
            assigned_reviewers,
            created_at: Some(self.created_at),
            merged_at: self.merged_at,
        })
    }

    pub fn into_short(self) -> Result<PullRequestShort, UnknownStatus> {
        Ok(PullRequestShort {
            status: self.status.parse()?,
            pull_request_id: self.id,
            pull_request_name: self.name,
            author_id: self.author_id,
        })
    }
}
