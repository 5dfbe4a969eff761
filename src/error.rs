//! Application error types.
//!
//! Every failure a service can return is one of these variants. The HTTP
//! layer maps them to status codes with a plain `match`, and the wire code
//! (`INVALID_INPUT`, `PR_MERGED`, ...) comes from [`AppError::code`].

use crate::store::StoreError;
use thiserror::Error;

/// Application-level errors returned by the services.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required field is missing or malformed.
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        field: Option<String>,
    },

    /// Requested resource not found.
    #[error("Not found: {resource}")]
    NotFound {
        resource: String,
        id: Option<String>,
    },

    /// A pull request with this id already exists.
    #[error("Pull request already exists: {pr_id}")]
    PrExists { pr_id: String },

    /// A team with this name already exists.
    #[error("Team already exists: {team_name}")]
    TeamExists { team_name: String },

    /// The pull request is merged and can no longer change.
    #[error("Cannot reassign on merged pull request: {pr_id}")]
    PrMerged { pr_id: String },

    /// The user is not a reviewer of the pull request.
    #[error("Reviewer {reviewer_id} is not assigned to pull request {pr_id}")]
    NotAssigned { pr_id: String, reviewer_id: String },

    /// No active replacement candidate exists in the team.
    #[error("No active replacement candidate for pull request {pr_id}")]
    NoCandidate { pr_id: String },

    /// Database or store operation failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        operation: Option<String>,
        /// Set when the failure was a timeout or busy store; safe to retry.
        transient: bool,
    },

    /// Internal application error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: None,
        }
    }

    /// Create an invalid input error with field name.
    pub fn invalid_input_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a not found error with ID.
    pub fn not_found_with_id(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: Some(id.into()),
        }
    }

    pub fn pr_exists(pr_id: impl Into<String>) -> Self {
        Self::PrExists {
            pr_id: pr_id.into(),
        }
    }

    pub fn team_exists(team_name: impl Into<String>) -> Self {
        Self::TeamExists {
            team_name: team_name.into(),
        }
    }

    pub fn pr_merged(pr_id: impl Into<String>) -> Self {
        Self::PrMerged {
            pr_id: pr_id.into(),
        }
    }

    pub fn not_assigned(pr_id: impl Into<String>, reviewer_id: impl Into<String>) -> Self {
        Self::NotAssigned {
            pr_id: pr_id.into(),
            reviewer_id: reviewer_id.into(),
        }
    }

    pub fn no_candidate(pr_id: impl Into<String>) -> Self {
        Self::NoCandidate {
            pr_id: pr_id.into(),
        }
    }

    /// Create a non-retryable database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            operation: None,
            transient: false,
        }
    }

    /// Create a retryable database error (timeout, busy store).
    pub fn transient(message: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            operation: Some(operation.into()),
            transient: true,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::PrExists { .. } => "PR_EXISTS",
            Self::TeamExists { .. } => "TEAM_EXISTS",
            Self::PrMerged { .. } => "PR_MERGED",
            Self::NotAssigned { .. } => "NOT_ASSIGNED",
            Self::NoCandidate { .. } => "NO_CANDIDATE",
            Self::Database { .. } | Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Whether the caller may retry the operation.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Database { transient: true, .. })
    }
}

// Conversions from common error types

impl From<crate::db::DbError> for AppError {
    fn from(err: crate::db::DbError) -> Self {
        Self::database(err.to_string())
    }
}

/// Fallback translation for store errors without operation context.
///
/// Services translate `NotFound`/`Conflict`/`NotAssigned`/`Merged` themselves
/// because only they know which entity the failure refers to.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Timeout { operation } => {
                Self::transient("Store operation timed out", operation)
            }
            StoreError::Backend { message, transient } => Self::Database {
                message,
                operation: None,
                transient,
            },
            other => Self::database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(AppError::invalid_input("x").code(), "INVALID_INPUT");
        assert_eq!(AppError::not_found_with_id("User", "u1").code(), "NOT_FOUND");
        assert_eq!(AppError::pr_exists("p").code(), "PR_EXISTS");
        assert_eq!(AppError::team_exists("t").code(), "TEAM_EXISTS");
        assert_eq!(AppError::pr_merged("p").code(), "PR_MERGED");
        assert_eq!(AppError::not_assigned("p", "u").code(), "NOT_ASSIGNED");
        assert_eq!(AppError::no_candidate("p").code(), "NO_CANDIDATE");
        assert_eq!(AppError::database("boom").code(), "INTERNAL_ERROR");
        assert_eq!(AppError::internal("boom").code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_store_timeout_is_transient() {
        let err = AppError::from(StoreError::Timeout {
            operation: "get_pr".to_string(),
        });
        assert!(err.is_transient());
        assert_eq!(err.code(), "INTERNAL_ERROR");
        assert!(!AppError::database("boom").is_transient());
    }

    #[test]
    fn test_store_backend_keeps_transient_flag() {
        let busy = AppError::from(StoreError::Backend {
            message: "database is locked".to_string(),
            transient: true,
        });
        assert!(busy.is_transient());

        let broken = AppError::from(StoreError::Backend {
            message: "unknown pull request status: CLOSED".to_string(),
            transient: false,
        });
        assert!(!broken.is_transient());
        assert_eq!(broken.code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_display_impl() {
        let err = AppError::pr_merged("pr-7");
        assert_eq!(
            format!("{}", err),
            "Cannot reassign on merged pull request: pr-7"
        );
    }
}
