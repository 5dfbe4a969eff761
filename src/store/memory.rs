//! In-memory implementation of both store contracts.
//!
//! All state lives in one map guarded by a `RwLock`, so every trait method is
//! trivially atomic. Used by service tests, which can also make the store
//! slow or unavailable to exercise error paths.

use super::{same_reviewers, Directory, PrStore, ReplaceOutcome, StoreError};
use crate::models::{PrStatus, PullRequest, PullRequestShort, Team, TeamMember, User, UserStats};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Default)]
struct Data {
    teams: BTreeSet<String>,
    users: BTreeMap<String, User>,
    prs: BTreeMap<String, PullRequest>,
}

/// In-memory directory and pull request store.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<Data>,
    unavailable: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with a transient backend error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delay every call, for exercising caller timeouts.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap_or_else(|p| p.into_inner()) = delay;
    }

    /// Append a raw reviewer entry, bypassing every invariant check.
    ///
    /// Lets tests build the stale-duplicate state that the public API
    /// never produces.
    pub async fn inject_reviewer_row(&self, pr_id: &str, reviewer_id: &str) {
        let mut data = self.data.write().await;
        if let Some(pr) = data.prs.get_mut(pr_id) {
            pr.assigned_reviewers.push(reviewer_id.to_string());
        }
    }

    async fn gate(&self) -> Result<(), StoreError> {
        let delay = *self.delay.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Backend {
                message: "memory store unavailable".to_string(),
                transient: true,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Directory for MemoryStore {
    async fn get_user(&self, user_id: &str) -> Result<User, StoreError> {
        self.gate().await?;
        let data = self.data.read().await;
        data.users
            .get(user_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("User", user_id))
    }

    async fn get_active_team_members(&self, team_name: &str) -> Result<Vec<User>, StoreError> {
        self.gate().await?;
        let data = self.data.read().await;
        if !data.teams.contains(team_name) {
            return Err(StoreError::not_found("Team", team_name));
        }
        Ok(data
            .users
            .values()
            .filter(|u| u.team_name == team_name && u.is_active)
            .cloned()
            .collect())
    }

    async fn team_exists(&self, team_name: &str) -> Result<bool, StoreError> {
        self.gate().await?;
        Ok(self.data.read().await.teams.contains(team_name))
    }

    async fn create_team(&self, team: &Team) -> Result<(), StoreError> {
        self.gate().await?;
        let mut data = self.data.write().await;
        if !data.teams.insert(team.team_name.clone()) {
            return Err(StoreError::conflict("Team", &team.team_name));
        }
        for member in &team.members {
            data.users.insert(
                member.user_id.clone(),
                User {
                    user_id: member.user_id.clone(),
                    username: member.username.clone(),
                    team_name: team.team_name.clone(),
                    is_active: member.is_active,
                },
            );
        }
        Ok(())
    }

    async fn get_team(&self, team_name: &str) -> Result<Team, StoreError> {
        self.gate().await?;
        let data = self.data.read().await;
        if !data.teams.contains(team_name) {
            return Err(StoreError::not_found("Team", team_name));
        }
        let members = data
            .users
            .values()
            .filter(|u| u.team_name == team_name)
            .map(|u| TeamMember {
                user_id: u.user_id.clone(),
                username: u.username.clone(),
                is_active: u.is_active,
            })
            .collect();
        Ok(Team {
            team_name: team_name.to_string(),
            members,
        })
    }

    async fn set_user_active(&self, user_id: &str, is_active: bool) -> Result<User, StoreError> {
        self.gate().await?;
        let mut data = self.data.write().await;
        let user = data
            .users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::not_found("User", user_id))?;
        user.is_active = is_active;
        Ok(user.clone())
    }
}

#[async_trait]
impl PrStore for MemoryStore {
    async fn get_pr(&self, pr_id: &str) -> Result<PullRequest, StoreError> {
        self.gate().await?;
        let data = self.data.read().await;
        data.prs
            .get(pr_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("PullRequest", pr_id))
    }

    async fn create_pr(&self, pr: &PullRequest) -> Result<(), StoreError> {
        self.gate().await?;
        let mut data = self.data.write().await;
        if data.prs.contains_key(&pr.pull_request_id) {
            return Err(StoreError::conflict("PullRequest", &pr.pull_request_id));
        }
        let mut stored = pr.clone();
        stored.status = PrStatus::Open;
        stored.merged_at = None;
        stored.created_at.get_or_insert_with(Utc::now);
        data.prs.insert(pr.pull_request_id.clone(), stored);
        Ok(())
    }

    async fn merge_pr(
        &self,
        pr_id: &str,
        merged_at: DateTime<Utc>,
    ) -> Result<PullRequest, StoreError> {
        self.gate().await?;
        let mut data = self.data.write().await;
        let pr = data
            .prs
            .get_mut(pr_id)
            .ok_or_else(|| StoreError::not_found("PullRequest", pr_id))?;
        if pr.status == PrStatus::Open {
            pr.status = PrStatus::Merged;
            pr.merged_at = Some(merged_at);
        }
        Ok(pr.clone())
    }

    async fn replace_reviewer(
        &self,
        pr_id: &str,
        old_reviewer: &str,
        new_reviewer: &str,
        expected: &[String],
    ) -> Result<ReplaceOutcome, StoreError> {
        self.gate().await?;
        let mut data = self.data.write().await;
        let pr = data
            .prs
            .get_mut(pr_id)
            .ok_or_else(|| StoreError::not_found("PullRequest", pr_id))?;
        if pr.status == PrStatus::Merged {
            return Err(StoreError::Merged {
                pr_id: pr_id.to_string(),
            });
        }
        let Some(pos) = pr.assigned_reviewers.iter().position(|r| r == old_reviewer) else {
            return Err(StoreError::NotAssigned {
                pr_id: pr_id.to_string(),
                reviewer_id: old_reviewer.to_string(),
            });
        };
        if !same_reviewers(&pr.assigned_reviewers, expected) {
            return Err(StoreError::ReviewersChanged {
                pr_id: pr_id.to_string(),
            });
        }

        if pr.has_reviewer(new_reviewer) {
            pr.assigned_reviewers.remove(pos);
            Ok(ReplaceOutcome::DroppedStaleDuplicate)
        } else {
            pr.assigned_reviewers[pos] = new_reviewer.to_string();
            Ok(ReplaceOutcome::Swapped)
        }
    }

    async fn list_by_reviewer(&self, user_id: &str) -> Result<Vec<PullRequestShort>, StoreError> {
        self.gate().await?;
        let data = self.data.read().await;
        Ok(data
            .prs
            .values()
            .filter(|pr| pr.has_reviewer(user_id))
            .map(PullRequest::to_short)
            .collect())
    }

    async fn total_count(&self) -> Result<i64, StoreError> {
        self.gate().await?;
        Ok(self.data.read().await.prs.len() as i64)
    }

    async fn review_counts(&self) -> Result<Vec<UserStats>, StoreError> {
        self.gate().await?;
        let data = self.data.read().await;
        let mut stats: Vec<UserStats> = data
            .users
            .values()
            .map(|u| UserStats {
                user_id: u.user_id.clone(),
                username: u.username.clone(),
                review_count: data
                    .prs
                    .values()
                    .flat_map(|pr| pr.assigned_reviewers.iter())
                    .filter(|r| **r == u.user_id)
                    .count() as i64,
                is_active: u.is_active,
            })
            .collect();
        stats.sort_by(|a, b| {
            b.review_count
                .cmp(&a.review_count)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unavailable_store_fails_transiently() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let err = store.get_user("u1").await.unwrap_err();
        assert!(matches!(err, StoreError::Backend { transient: true, .. }));

        store.set_unavailable(false);
        assert!(store.get_user("u1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_merge_keeps_first_timestamp() {
        let store = MemoryStore::new();
        let pr = PullRequest::new_open("pr-1", "x", "a", vec![], Utc::now());
        store.create_pr(&pr).await.unwrap();

        let first = store.merge_pr("pr-1", Utc::now()).await.unwrap();
        let second = store
            .merge_pr("pr-1", Utc::now() + chrono::Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(first.merged_at, second.merged_at);
    }

    #[tokio::test]
    async fn test_replace_onto_duplicate_row_drops_old() {
        let store = MemoryStore::new();
        let pr = PullRequest::new_open("pr-1", "x", "a", vec!["b".to_string()], Utc::now());
        store.create_pr(&pr).await.unwrap();
        store.inject_reviewer_row("pr-1", "c").await;

        let expected = vec!["b".to_string(), "c".to_string()];
        let outcome = store
            .replace_reviewer("pr-1", "b", "c", &expected)
            .await
            .unwrap();
        assert_eq!(outcome, ReplaceOutcome::DroppedStaleDuplicate);
        assert_eq!(store.get_pr("pr-1").await.unwrap().assigned_reviewers, vec!["c"]);
    }

    #[tokio::test]
    async fn test_replace_with_outdated_set_is_rejected() {
        let store = MemoryStore::new();
        let pr = PullRequest::new_open(
            "pr-1",
            "x",
            "a",
            vec!["b".to_string(), "c".to_string()],
            Utc::now(),
        );
        store.create_pr(&pr).await.unwrap();
        let snapshot = pr.assigned_reviewers.clone();

        store.replace_reviewer("pr-1", "b", "d", &snapshot).await.unwrap();
        let err = store
            .replace_reviewer("pr-1", "c", "d", &snapshot)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ReviewersChanged { .. }));
        assert_eq!(
            store.get_pr("pr-1").await.unwrap().assigned_reviewers,
            vec!["d", "c"]
        );
    }
}
