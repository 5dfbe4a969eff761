//! End-to-end lifecycle tests against a real SQLite database.
//!
//! Each test opens a fresh database in a temporary directory and drives the
//! services the same way the HTTP handlers do.

use pr_reviewers_lib::api::AppState;
use pr_reviewers_lib::db::{self, DbPool};
use pr_reviewers_lib::models::{PrStatus, Team, TeamMember};
use pr_reviewers_lib::services::ReviewerSelector;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

async fn setup(seed: u64) -> (AppState, DbPool) {
    let dir = tempdir().unwrap();
    let pool = db::initialize(&dir.path().join("test.db")).await.unwrap();
    // Keep the directory alive for the whole test
    std::mem::forget(dir);
    let state = AppState::sqlite(
        pool.clone(),
        Arc::new(ReviewerSelector::from_seed(seed)),
        Duration::from_secs(5),
    );
    (state, pool)
}

fn team(name: &str, members: &[(&str, bool)]) -> Team {
    Team {
        team_name: name.to_string(),
        members: members
            .iter()
            .map(|(id, active)| TeamMember {
                user_id: id.to_string(),
                username: format!("User {}", id),
                is_active: *active,
            })
            .collect(),
    }
}

async fn reviewer_rows(pool: &DbPool, pr_id: &str) -> Vec<String> {
    sqlx::query_scalar("SELECT reviewer_id FROM pr_reviewers WHERE pr_id = ? ORDER BY reviewer_id")
        .bind(pr_id)
        .fetch_all(pool)
        .await
        .unwrap()
}

/// Scenario: team "T" has active members A (author), B, C, D.
#[tokio::test]
async fn test_create_picks_two_of_the_other_three() {
    let (state, _) = setup(11).await;
    state
        .teams
        .create_team(team("T", &[("A", true), ("B", true), ("C", true), ("D", true)]))
        .await
        .unwrap();

    let pr = state.prs.create_pr("pr-1", "Feature", "A").await.unwrap();

    assert_eq!(pr.status, PrStatus::Open);
    assert_eq!(pr.assigned_reviewers.len(), 2);
    let picked: HashSet<&str> = pr.assigned_reviewers.iter().map(String::as_str).collect();
    assert!(picked.is_subset(&HashSet::from(["B", "C", "D"])));
}

/// Scenario: reviewers {B, C}, author A, only B and C active besides A.
#[tokio::test]
async fn test_reassign_with_empty_pool_is_no_candidate() {
    let (state, pool) = setup(1).await;
    state
        .teams
        .create_team(team("T", &[("A", true), ("B", true), ("C", true)]))
        .await
        .unwrap();
    state.prs.create_pr("pr-1", "Feature", "A").await.unwrap();

    let err = state.prs.reassign_reviewer("pr-1", "B").await.unwrap_err();
    assert_eq!(err.code(), "NO_CANDIDATE");
    assert_eq!(reviewer_rows(&pool, "pr-1").await, vec!["B", "C"]);
}

#[tokio::test]
async fn test_merge_unknown_is_not_found() {
    let (state, _) = setup(1).await;
    let err = state.prs.merge_pr("missing").await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
}

#[tokio::test]
async fn test_full_lifecycle() {
    let (state, _) = setup(5).await;
    state
        .teams
        .create_team(team(
            "backend",
            &[("a", true), ("b", true), ("c", true), ("d", true), ("e", false)],
        ))
        .await
        .unwrap();

    let created = state.prs.create_pr("pr-1", "Add search", "a").await.unwrap();
    assert!(!created.has_reviewer("a"));
    assert!(!created.has_reviewer("e"));

    let old = created.assigned_reviewers[0].clone();
    let swap = state.prs.reassign_reviewer("pr-1", &old).await.unwrap();
    assert_ne!(swap.replaced_by, old);
    assert!(swap.pr.has_reviewer(&swap.replaced_by));
    assert!(!swap.pr.has_reviewer(&old));
    assert_eq!(swap.pr.assigned_reviewers.len(), 2);

    let merged = state.prs.merge_pr("pr-1").await.unwrap();
    assert_eq!(merged.status, PrStatus::Merged);
    let stamp = merged.merged_at.unwrap();

    let again = state.prs.merge_pr("pr-1").await.unwrap();
    assert_eq!(again.merged_at, Some(stamp));

    let err = state
        .prs
        .reassign_reviewer("pr-1", &swap.replaced_by)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "PR_MERGED");

    let reviews = state.users.get_reviews(&swap.replaced_by).await.unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].status, PrStatus::Merged);

    let stats = state.stats.get_stats().await.unwrap();
    assert_eq!(stats.total_prs_created, 1);
    let total: i64 = stats.reviews_by_user.iter().map(|s| s.review_count).sum();
    assert_eq!(total, 2);
}

#[tokio::test]
async fn test_pr_ids_are_never_reused() {
    let (state, _) = setup(1).await;
    state
        .teams
        .create_team(team("T", &[("a", true), ("b", true)]))
        .await
        .unwrap();
    state.prs.create_pr("pr-1", "First", "a").await.unwrap();
    state.prs.merge_pr("pr-1").await.unwrap();

    let err = state.prs.create_pr("pr-1", "Second", "b").await.unwrap_err();
    assert_eq!(err.code(), "PR_EXISTS");
}

#[tokio::test]
async fn test_repeated_reassignment_never_duplicates_rows() {
    let (state, pool) = setup(3).await;
    state
        .teams
        .create_team(team(
            "T",
            &[("a", true), ("b", true), ("c", true), ("d", true), ("e", true), ("f", true)],
        ))
        .await
        .unwrap();
    state.prs.create_pr("pr-1", "Churn", "a").await.unwrap();

    for _ in 0..25 {
        let current = reviewer_rows(&pool, "pr-1").await;
        let swap = state.prs.reassign_reviewer("pr-1", &current[0]).await.unwrap();

        let rows = reviewer_rows(&pool, "pr-1").await;
        let unique: HashSet<&String> = rows.iter().collect();
        assert_eq!(rows.len(), 2, "reviewer count must stay at two");
        assert_eq!(unique.len(), rows.len());
        assert!(!rows.contains(&"a".to_string()));
        assert!(rows.contains(&swap.replaced_by));
    }
}

#[tokio::test]
async fn test_deactivated_user_is_not_picked() {
    let (state, _) = setup(9).await;
    state
        .teams
        .create_team(team("T", &[("a", true), ("b", true), ("c", true)]))
        .await
        .unwrap();
    state.users.set_is_active("c", false).await.unwrap();

    for i in 0..10 {
        let pr = state
            .prs
            .create_pr(&format!("pr-{}", i), "x", "a")
            .await
            .unwrap();
        assert_eq!(pr.assigned_reviewers, vec!["b"]);
    }
}

#[tokio::test]
async fn test_concurrent_merges_converge() {
    let (state, _) = setup(1).await;
    state
        .teams
        .create_team(team("T", &[("a", true), ("b", true)]))
        .await
        .unwrap();
    state.prs.create_pr("pr-1", "Race", "a").await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let prs = state.prs.clone();
            tokio::spawn(async move { prs.merge_pr("pr-1").await })
        })
        .collect();

    let mut stamps = HashSet::new();
    for handle in handles {
        let pr = handle.await.unwrap().unwrap();
        assert_eq!(pr.status, PrStatus::Merged);
        stamps.insert(pr.merged_at.unwrap());
    }
    assert_eq!(stamps.len(), 1);
}

#[tokio::test]
async fn test_concurrent_creates_of_same_id() {
    let (state, pool) = setup(1).await;
    state
        .teams
        .create_team(team("T", &[("a", true), ("b", true), ("c", true)]))
        .await
        .unwrap();

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let prs = state.prs.clone();
            tokio::spawn(async move { prs.create_pr("pr-1", "Race", "a").await })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(e) => assert!(
                e.code() == "PR_EXISTS" || e.is_transient(),
                "unexpected {}",
                e.code()
            ),
        }
    }
    assert_eq!(created, 1);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pull_requests")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_parallel_reassignments_on_one_pr() {
    let (state, pool) = setup(21).await;
    state
        .teams
        .create_team(team(
            "T",
            &[("a", true), ("b", true), ("c", true), ("d", true)],
        ))
        .await
        .unwrap();

    for round in 0..5 {
        let pr_id = format!("pr-{}", round);
        let created = state.prs.create_pr(&pr_id, "Race", "a").await.unwrap();
        assert_eq!(created.assigned_reviewers.len(), 2);

        let handles: Vec<_> = created
            .assigned_reviewers
            .iter()
            .cloned()
            .map(|old| {
                let prs = state.prs.clone();
                let pr_id = pr_id.clone();
                tokio::spawn(async move { prs.reassign_reviewer(&pr_id, &old).await })
            })
            .collect();

        for handle in handles {
            if let Err(e) = handle.await.unwrap() {
                assert_eq!(e.code(), "NO_CANDIDATE", "unexpected {}", e);
            }
        }

        let rows = reviewer_rows(&pool, &pr_id).await;
        let unique: HashSet<&String> = rows.iter().collect();
        assert_eq!(rows.len(), 2, "round {} ended with {:?}", round, rows);
        assert_eq!(unique.len(), 2);
        assert!(!rows.contains(&"a".to_string()));
    }
}
