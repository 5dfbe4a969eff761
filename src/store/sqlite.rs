//! SQLite-backed stores.
//!
//! Writes that must be atomic run inside one transaction. Transactions that
//! read before writing take the SQLite write lock first with a no-op
//! `UPDATE` on the pull request row, so two reassignments on the same pull
//! request queue behind each other instead of interleaving.

use super::{same_reviewers, Directory, PrStore, ReplaceOutcome, StoreError};
use crate::db::pool::DbPool;
use crate::models::pull_request::PullRequestRow;
use crate::models::{PrStatus, PullRequest, PullRequestShort, Team, TeamMember, User, UserStats};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

/// Load a pull request and its reviewers on an existing connection.
async fn fetch_pr(
    conn: &mut SqliteConnection,
    pr_id: &str,
) -> Result<Option<PullRequest>, StoreError> {
    let row: Option<PullRequestRow> = sqlx::query_as(
        r#"
        SELECT id, name, author_id, status, created_at, merged_at
        FROM pull_requests
        WHERE id = ?
        "#,
    )
    .bind(pr_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let reviewers = fetch_reviewers(conn, pr_id).await?;
    Ok(Some(row.into_pull_request(reviewers)?))
}

async fn fetch_reviewers(
    conn: &mut SqliteConnection,
    pr_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT reviewer_id FROM pr_reviewers WHERE pr_id = ? ORDER BY reviewer_id")
        .bind(pr_id)
        .fetch_all(&mut *conn)
        .await
}

/// Pull request store over the shared pool.
#[derive(Clone)]
pub struct SqlitePrStore {
    pool: DbPool,
}

impl SqlitePrStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PrStore for SqlitePrStore {
    async fn get_pr(&self, pr_id: &str) -> Result<PullRequest, StoreError> {
        // Read inside a transaction so the row and its reviewers share a snapshot
        let mut tx = self.pool.begin().await?;
        let pr = fetch_pr(&mut tx, pr_id).await?;
        tx.commit().await?;

        pr.ok_or_else(|| StoreError::not_found("PullRequest", pr_id))
    }

    async fn create_pr(&self, pr: &PullRequest) -> Result<(), StoreError> {
        let created_at = pr.created_at.unwrap_or_else(Utc::now);
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO pull_requests (id, name, author_id, status, created_at, merged_at)
            VALUES (?, ?, ?, 'OPEN', ?, NULL)
            "#,
        )
        .bind(&pr.pull_request_id)
        .bind(&pr.pull_request_name)
        .bind(&pr.author_id)
        .bind(created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::conflict("PullRequest", &pr.pull_request_id)
            } else {
                StoreError::from(e)
            }
        })?;

        for reviewer_id in &pr.assigned_reviewers {
            sqlx::query("INSERT INTO pr_reviewers (pr_id, reviewer_id) VALUES (?, ?)")
                .bind(&pr.pull_request_id)
                .bind(reviewer_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn merge_pr(
        &self,
        pr_id: &str,
        merged_at: DateTime<Utc>,
    ) -> Result<PullRequest, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Only the first merge writes; later ones leave status and timestamp alone
        sqlx::query(
            r#"
            UPDATE pull_requests SET status = 'MERGED', merged_at = ?
            WHERE id = ? AND status = 'OPEN'
            "#,
        )
        .bind(merged_at)
        .bind(pr_id)
        .execute(&mut *tx)
        .await?;

        let pr = fetch_pr(&mut tx, pr_id).await?;
        tx.commit().await?;

        pr.ok_or_else(|| StoreError::not_found("PullRequest", pr_id))
    }

    async fn replace_reviewer(
        &self,
        pr_id: &str,
        old_reviewer: &str,
        new_reviewer: &str,
        expected: &[String],
    ) -> Result<ReplaceOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Take the write lock before reading anything
        let locked = sqlx::query("UPDATE pull_requests SET status = status WHERE id = ?")
            .bind(pr_id)
            .execute(&mut *tx)
            .await?;
        if locked.rows_affected() == 0 {
            return Err(StoreError::not_found("PullRequest", pr_id));
        }

        let status: String = sqlx::query_scalar("SELECT status FROM pull_requests WHERE id = ?")
            .bind(pr_id)
            .fetch_one(&mut *tx)
            .await?;
        if status.parse::<PrStatus>()? == PrStatus::Merged {
            return Err(StoreError::Merged {
                pr_id: pr_id.to_string(),
            });
        }

        let current = fetch_reviewers(&mut tx, pr_id).await?;
        if !current.iter().any(|r| r == old_reviewer) {
            return Err(StoreError::NotAssigned {
                pr_id: pr_id.to_string(),
                reviewer_id: old_reviewer.to_string(),
            });
        }
        if !same_reviewers(&current, expected) {
            return Err(StoreError::ReviewersChanged {
                pr_id: pr_id.to_string(),
            });
        }

        let outcome = if current.iter().any(|r| r == new_reviewer) {
            sqlx::query("DELETE FROM pr_reviewers WHERE pr_id = ? AND reviewer_id = ?")
                .bind(pr_id)
                .bind(old_reviewer)
                .execute(&mut *tx)
                .await?;
            ReplaceOutcome::DroppedStaleDuplicate
        } else {
            sqlx::query(
                "UPDATE pr_reviewers SET reviewer_id = ? WHERE pr_id = ? AND reviewer_id = ?",
            )
            .bind(new_reviewer)
            .bind(pr_id)
            .bind(old_reviewer)
            .execute(&mut *tx)
            .await?;
            ReplaceOutcome::Swapped
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn list_by_reviewer(&self, user_id: &str) -> Result<Vec<PullRequestShort>, StoreError> {
        let rows: Vec<PullRequestRow> = sqlx::query_as(
            r#"
            SELECT p.id, p.name, p.author_id, p.status, p.created_at, p.merged_at
            FROM pull_requests p
            JOIN pr_reviewers r ON p.id = r.pr_id
            WHERE r.reviewer_id = ?
            ORDER BY p.created_at, p.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| row.into_short().map_err(StoreError::from))
            .collect()
    }

    async fn total_count(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pull_requests")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn review_counts(&self) -> Result<Vec<UserStats>, StoreError> {
        let stats: Vec<UserStats> = sqlx::query_as(
            r#"
            SELECT u.id, u.username, u.is_active, COUNT(r.pr_id) AS review_count
            FROM users u
            LEFT JOIN pr_reviewers r ON r.reviewer_id = u.id
            GROUP BY u.id, u.username, u.is_active
            ORDER BY review_count DESC, u.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(stats)
    }
}

/// User and team directory over the shared pool.
#[derive(Clone)]
pub struct SqliteDirectory {
    pool: DbPool,
}

impl SqliteDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Directory for SqliteDirectory {
    async fn get_user(&self, user_id: &str) -> Result<User, StoreError> {
        let user: Option<User> =
            sqlx::query_as("SELECT id, username, team_name, is_active FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        user.ok_or_else(|| StoreError::not_found("User", user_id))
    }

    async fn get_active_team_members(&self, team_name: &str) -> Result<Vec<User>, StoreError> {
        if !self.team_exists(team_name).await? {
            return Err(StoreError::not_found("Team", team_name));
        }

        let users: Vec<User> = sqlx::query_as(
            r#"
            SELECT id, username, team_name, is_active
            FROM users
            WHERE team_name = ? AND is_active = 1
            ORDER BY id
            "#,
        )
        .bind(team_name)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn team_exists(&self, team_name: &str) -> Result<bool, StoreError> {
        let exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM teams WHERE name = ?)")
            .bind(team_name)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists != 0)
    }

    async fn create_team(&self, team: &Team) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO teams (name) VALUES (?)")
            .bind(&team.team_name)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::conflict("Team", &team.team_name)
                } else {
                    StoreError::from(e)
                }
            })?;

        // Existing users move to the new team
        for member in &team.members {
            sqlx::query(
                r#"
                INSERT INTO users (id, username, team_name, is_active)
                VALUES (?, ?, ?, ?)
                ON CONFLICT (id) DO UPDATE SET
                    username = excluded.username,
                    team_name = excluded.team_name,
                    is_active = excluded.is_active
                "#,
            )
            .bind(&member.user_id)
            .bind(&member.username)
            .bind(&team.team_name)
            .bind(member.is_active)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_team(&self, team_name: &str) -> Result<Team, StoreError> {
        if !self.team_exists(team_name).await? {
            return Err(StoreError::not_found("Team", team_name));
        }

        let members: Vec<TeamMember> = sqlx::query_as(
            "SELECT id, username, is_active FROM users WHERE team_name = ? ORDER BY id",
        )
        .bind(team_name)
        .fetch_all(&self.pool)
        .await?;

        Ok(Team {
            team_name: team_name.to_string(),
            members,
        })
    }

    async fn set_user_active(&self, user_id: &str, is_active: bool) -> Result<User, StoreError> {
        let user: Option<User> = sqlx::query_as(
            r#"
            UPDATE users SET is_active = ?
            WHERE id = ?
            RETURNING id, username, team_name, is_active
            "#,
        )
        .bind(is_active)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        user.ok_or_else(|| StoreError::not_found("User", user_id))
    }
}
