//! User activity flags and review listings.

use crate::error::AppError;
use crate::models::{PullRequestShort, User};
use crate::store::{bounded, Directory, PrStore, StoreError};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct UserService {
    directory: Arc<dyn Directory>,
    prs: Arc<dyn PrStore>,
    store_timeout: Duration,
}

fn require_user_id(user_id: &str) -> Result<(), AppError> {
    if user_id.trim().is_empty() {
        return Err(AppError::invalid_input_field("user_id is required", "user_id"));
    }
    Ok(())
}

fn classify(operation: &str, user_id: &str, err: StoreError) -> AppError {
    match err {
        StoreError::NotFound { .. } => AppError::not_found_with_id("User", user_id),
        other => {
            log::error!("[user] {} failed: {}", operation, other);
            AppError::from(other)
        }
    }
}

impl UserService {
    pub fn new(
        directory: Arc<dyn Directory>,
        prs: Arc<dyn PrStore>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            directory,
            prs,
            store_timeout,
        }
    }

    /// Toggle whether a user may be picked as a reviewer.
    ///
    /// Existing assignments are left in place.
    pub async fn set_is_active(&self, user_id: &str, is_active: bool) -> Result<User, AppError> {
        require_user_id(user_id)?;

        let user = bounded(
            self.store_timeout,
            "set_user_active",
            self.directory.set_user_active(user_id, is_active),
        )
        .await
        .map_err(|e| classify("set_user_active", user_id, e))?;

        log::info!("[user] {} is_active={}", user_id, is_active);
        Ok(user)
    }

    /// Pull requests the user is currently assigned to review.
    pub async fn get_reviews(&self, user_id: &str) -> Result<Vec<PullRequestShort>, AppError> {
        require_user_id(user_id)?;
        let limit = self.store_timeout;

        bounded(limit, "get_user", self.directory.get_user(user_id))
            .await
            .map_err(|e| classify("get_user", user_id, e))?;

        bounded(limit, "list_by_reviewer", self.prs.list_by_reviewer(user_id))
            .await
            .map_err(|e| classify("list_by_reviewer", user_id, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PullRequest, Team, TeamMember};
    use crate::store::MemoryStore;
    use chrono::Utc;

    async fn service() -> UserService {
        let store = Arc::new(MemoryStore::new());
        store
            .create_team(&Team {
                team_name: "core".to_string(),
                members: vec![TeamMember {
                    user_id: "u1".to_string(),
                    username: "Alice".to_string(),
                    is_active: true,
                }],
            })
            .await
            .unwrap();
        store
            .create_pr(&PullRequest::new_open(
                "pr-1",
                "Docs",
                "u0",
                vec!["u1".to_string()],
                Utc::now(),
            ))
            .await
            .unwrap();
        UserService::new(store.clone(), store, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_set_is_active() {
        let svc = service().await;
        let user = svc.set_is_active("u1", false).await.unwrap();
        assert!(!user.is_active);

        let err = svc.set_is_active("nobody", false).await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
        assert_eq!(svc.set_is_active("", true).await.unwrap_err().code(), "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_get_reviews() {
        let svc = service().await;
        let reviews = svc.get_reviews("u1").await.unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].pull_request_id, "pr-1");

        assert_eq!(svc.get_reviews("nobody").await.unwrap_err().code(), "NOT_FOUND");
    }
}
