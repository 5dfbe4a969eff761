//! Team registration and lookup.

use crate::error::AppError;
use crate::models::Team;
use crate::store::{bounded, Directory, StoreError};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct TeamService {
    directory: Arc<dyn Directory>,
    store_timeout: Duration,
}

impl TeamService {
    pub fn new(directory: Arc<dyn Directory>, store_timeout: Duration) -> Self {
        Self {
            directory,
            store_timeout,
        }
    }

    /// Register a team and upsert its members.
    ///
    /// Members that already belong to another team are moved to this one.
    pub async fn create_team(&self, team: Team) -> Result<Team, AppError> {
        if team.team_name.trim().is_empty() {
            return Err(AppError::invalid_input_field(
                "team_name is required",
                "team_name",
            ));
        }
        let mut seen = HashSet::new();
        for member in &team.members {
            if member.user_id.trim().is_empty() {
                return Err(AppError::invalid_input_field(
                    "user_id is required for every member",
                    "members",
                ));
            }
            if !seen.insert(member.user_id.as_str()) {
                return Err(AppError::invalid_input_field(
                    format!("duplicate member {}", member.user_id),
                    "members",
                ));
            }
        }

        let limit = self.store_timeout;
        let exists = bounded(limit, "team_exists", self.directory.team_exists(&team.team_name))
            .await
            .map_err(|e| {
                log::error!("[team] team_exists failed: {}", e);
                AppError::from(e)
            })?;
        if exists {
            return Err(AppError::team_exists(&team.team_name));
        }

        match bounded(limit, "create_team", self.directory.create_team(&team)).await {
            Ok(()) => {}
            Err(StoreError::Conflict { .. }) => return Err(AppError::team_exists(&team.team_name)),
            Err(e) => {
                log::error!("[team] create_team failed: {}", e);
                return Err(AppError::from(e));
            }
        }

        log::info!(
            "[team] Created {} with {} members",
            team.team_name,
            team.members.len()
        );
        Ok(team)
    }

    pub async fn get_team(&self, team_name: &str) -> Result<Team, AppError> {
        if team_name.trim().is_empty() {
            return Err(AppError::invalid_input_field(
                "team_name is required",
                "team_name",
            ));
        }

        match bounded(self.store_timeout, "get_team", self.directory.get_team(team_name)).await {
            Ok(team) => Ok(team),
            Err(StoreError::NotFound { .. }) => Err(AppError::not_found_with_id("Team", team_name)),
            Err(e) => {
                log::error!("[team] get_team failed: {}", e);
                Err(AppError::from(e))
            }
        }
    }
}
