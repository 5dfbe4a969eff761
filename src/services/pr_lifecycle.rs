//! Pull request lifecycle: create, merge, reassign.
//!
//! A pull request starts `OPEN` with up to two reviewers drawn from the
//! author's team. Reviewers can be swapped one at a time while it is open.
//! It moves to `MERGED` exactly once; merging again returns it unchanged.
//!
//! Store failures never leave this module raw. `NotFound`, `Conflict`,
//! `NotAssigned` and `Merged` become the matching [`AppError`] for the entity
//! involved; everything else is logged and returned as an internal error.

use crate::error::AppError;
use crate::models::{PullRequest, User};
use crate::services::reviewer_selection::{
    ReviewerSelector, CREATE_REVIEWER_COUNT, REASSIGN_REVIEWER_COUNT,
};
use crate::store::{bounded, Directory, PrStore, ReplaceOutcome, StoreError};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Read-pick-swap rounds before a contended reassignment gives up.
const MAX_REASSIGN_ATTEMPTS: usize = 5;

/// Result of a successful reassignment.
#[derive(Debug, Clone, Serialize)]
pub struct Reassignment {
    pub pr: PullRequest,
    pub replaced_by: String,
}

/// Orchestrates pull request state changes.
#[derive(Clone)]
pub struct PrService {
    prs: Arc<dyn PrStore>,
    directory: Arc<dyn Directory>,
    selector: Arc<ReviewerSelector>,
    store_timeout: Duration,
}

/// Log a store failure with its cause and classify it as internal.
fn store_failure(operation: &str, err: StoreError) -> AppError {
    log::error!("[pr] {} failed: {}", operation, err);
    AppError::from(err)
}

/// Ids from `members` not in `excluded`, deduplicated, in input order.
fn eligible_pool(members: &[User], excluded: &HashSet<&str>) -> Vec<String> {
    let mut seen = HashSet::new();
    members
        .iter()
        .filter(|u| u.is_active && !excluded.contains(u.user_id.as_str()))
        .filter(|u| seen.insert(u.user_id.as_str()))
        .map(|u| u.user_id.clone())
        .collect()
}

impl PrService {
    pub fn new(
        prs: Arc<dyn PrStore>,
        directory: Arc<dyn Directory>,
        selector: Arc<ReviewerSelector>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            prs,
            directory,
            selector,
            store_timeout,
        }
    }

    /// Create an open pull request and assign up to two reviewers.
    ///
    /// Reviewers are active members of the author's team other than the
    /// author. The pull request and its reviewer rows are written together.
    pub async fn create_pr(
        &self,
        pr_id: &str,
        name: &str,
        author_id: &str,
    ) -> Result<PullRequest, AppError> {
        let limit = self.store_timeout;

        match bounded(limit, "get_pr", self.prs.get_pr(pr_id)).await {
            Ok(_) => return Err(AppError::pr_exists(pr_id)),
            Err(StoreError::NotFound { .. }) => {}
            Err(e) => return Err(store_failure("get_pr", e)),
        }

        let author = match bounded(limit, "get_user", self.directory.get_user(author_id)).await {
            Ok(user) => user,
            Err(StoreError::NotFound { .. }) => {
                return Err(AppError::not_found_with_id("User", author_id))
            }
            Err(e) => return Err(store_failure("get_user", e)),
        };

        let members = match bounded(
            limit,
            "get_active_team_members",
            self.directory.get_active_team_members(&author.team_name),
        )
        .await
        {
            Ok(members) => members,
            Err(StoreError::NotFound { .. }) => {
                return Err(AppError::not_found_with_id("Team", &author.team_name))
            }
            Err(e) => return Err(store_failure("get_active_team_members", e)),
        };

        let excluded = HashSet::from([author_id]);
        let pool = eligible_pool(&members, &excluded);
        let reviewers = self.selector.pick(&pool, CREATE_REVIEWER_COUNT);

        let pr = PullRequest::new_open(pr_id, name, author_id, reviewers, Utc::now());

        match bounded(limit, "create_pr", self.prs.create_pr(&pr)).await {
            Ok(()) => {}
            // Lost a race with a concurrent create of the same id
            Err(StoreError::Conflict { .. }) => return Err(AppError::pr_exists(pr_id)),
            Err(e) => return Err(store_failure("create_pr", e)),
        }

        log::info!(
            "[pr] Created {} by {} with reviewers {:?}",
            pr_id,
            author_id,
            pr.assigned_reviewers
        );
        Ok(pr)
    }

    /// Merge a pull request. Merging a merged pull request is a no-op.
    pub async fn merge_pr(&self, pr_id: &str) -> Result<PullRequest, AppError> {
        let limit = self.store_timeout;

        let pr = match bounded(limit, "get_pr", self.prs.get_pr(pr_id)).await {
            Ok(pr) => pr,
            Err(StoreError::NotFound { .. }) => {
                return Err(AppError::not_found_with_id("PullRequest", pr_id))
            }
            Err(e) => return Err(store_failure("get_pr", e)),
        };

        if pr.is_merged() {
            log::debug!("[pr] {} already merged", pr_id);
            return Ok(pr);
        }

        let merged = match bounded(limit, "merge_pr", self.prs.merge_pr(pr_id, Utc::now())).await
        {
            Ok(pr) => pr,
            Err(StoreError::NotFound { .. }) => {
                return Err(AppError::not_found_with_id("PullRequest", pr_id))
            }
            Err(e) => return Err(store_failure("merge_pr", e)),
        };

        log::info!("[pr] Merged {}", pr_id);
        Ok(merged)
    }

    /// Replace one reviewer with another active member of that reviewer's team.
    ///
    /// The replacement is never the author, the outgoing reviewer, or someone
    /// already reviewing. If another reassignment on the same pull request
    /// commits first, the candidate pool is rebuilt from a fresh read.
    pub async fn reassign_reviewer(
        &self,
        pr_id: &str,
        old_reviewer_id: &str,
    ) -> Result<Reassignment, AppError> {
        if pr_id.trim().is_empty() {
            return Err(AppError::invalid_input_field(
                "pull_request_id is required",
                "pull_request_id",
            ));
        }
        if old_reviewer_id.trim().is_empty() {
            return Err(AppError::invalid_input_field(
                "old_user_id is required",
                "old_user_id",
            ));
        }

        for attempt in 1..=MAX_REASSIGN_ATTEMPTS {
            if let Some(done) = self.try_reassign(pr_id, old_reviewer_id).await? {
                return Ok(done);
            }
            log::debug!(
                "[pr] Reviewers of {} changed mid-reassignment (attempt {}/{})",
                pr_id,
                attempt,
                MAX_REASSIGN_ATTEMPTS
            );
        }

        log::warn!(
            "[pr] Gave up reassigning {} on {} after {} attempts",
            old_reviewer_id,
            pr_id,
            MAX_REASSIGN_ATTEMPTS
        );
        Err(AppError::transient(
            format!("Reviewers of {} kept changing", pr_id),
            "replace_reviewer",
        ))
    }

    /// One read-pick-swap round. `None` means the reviewer set changed
    /// between the read and the swap.
    async fn try_reassign(
        &self,
        pr_id: &str,
        old_reviewer_id: &str,
    ) -> Result<Option<Reassignment>, AppError> {
        let limit = self.store_timeout;

        let pr = match bounded(limit, "get_pr", self.prs.get_pr(pr_id)).await {
            Ok(pr) => pr,
            Err(StoreError::NotFound { .. }) => {
                return Err(AppError::not_found_with_id("PullRequest", pr_id))
            }
            Err(e) => return Err(store_failure("get_pr", e)),
        };

        if pr.is_merged() {
            return Err(AppError::pr_merged(pr_id));
        }
        if !pr.has_reviewer(old_reviewer_id) {
            return Err(AppError::not_assigned(pr_id, old_reviewer_id));
        }

        let old_reviewer =
            match bounded(limit, "get_user", self.directory.get_user(old_reviewer_id)).await {
                Ok(user) => user,
                Err(StoreError::NotFound { .. }) => {
                    return Err(AppError::not_found_with_id("User", old_reviewer_id))
                }
                Err(e) => return Err(store_failure("get_user", e)),
            };

        let members = match bounded(
            limit,
            "get_active_team_members",
            self.directory.get_active_team_members(&old_reviewer.team_name),
        )
        .await
        {
            Ok(members) => members,
            Err(StoreError::NotFound { .. }) => return Err(AppError::no_candidate(pr_id)),
            Err(e) => return Err(store_failure("get_active_team_members", e)),
        };

        let mut excluded: HashSet<&str> =
            pr.assigned_reviewers.iter().map(String::as_str).collect();
        excluded.insert(old_reviewer_id);
        excluded.insert(pr.author_id.as_str());

        let pool = eligible_pool(&members, &excluded);
        let Some(new_reviewer_id) = self
            .selector
            .pick(&pool, REASSIGN_REVIEWER_COUNT)
            .into_iter()
            .next()
        else {
            return Err(AppError::no_candidate(pr_id));
        };

        let swap = self.prs.replace_reviewer(
            pr_id,
            old_reviewer_id,
            &new_reviewer_id,
            &pr.assigned_reviewers,
        );
        let outcome = match bounded(limit, "replace_reviewer", swap).await {
            Ok(outcome) => outcome,
            Err(StoreError::ReviewersChanged { .. }) => return Ok(None),
            Err(StoreError::NotFound { .. }) => {
                return Err(AppError::not_found_with_id("PullRequest", pr_id))
            }
            Err(StoreError::Merged { .. }) => return Err(AppError::pr_merged(pr_id)),
            Err(StoreError::NotAssigned { .. }) => {
                return Err(AppError::not_assigned(pr_id, old_reviewer_id))
            }
            Err(e) => return Err(store_failure("replace_reviewer", e)),
        };

        if outcome == ReplaceOutcome::DroppedStaleDuplicate {
            log::warn!(
                "[pr] {} already had a row for {}; dropped {} instead of duplicating",
                pr_id,
                new_reviewer_id,
                old_reviewer_id
            );
        }

        let updated = bounded(limit, "get_pr", self.prs.get_pr(pr_id))
            .await
            .map_err(|e| store_failure("get_pr", e))?;

        log::info!(
            "[pr] Reassigned {} on {} to {}",
            old_reviewer_id,
            pr_id,
            new_reviewer_id
        );
        Ok(Some(Reassignment {
            pr: updated,
            replaced_by: new_reviewer_id,
        }))
    }
}
