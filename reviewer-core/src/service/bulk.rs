//! Team-scoped bulk deactivation
//!
//! The whole batch runs in one transaction. Every targeted active user is
//! marked inactive before any cascade runs, so no replacement reviewer is
//! ever drawn from the batch itself; a single stranded pull request rolls
//! back every deactivation in the request.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::User;
use crate::ports::{finish, TxManager};
use crate::repos::{TeamRepository, UserRepository};

use super::ReviewerReassignment;

/// Outcome of a bulk deactivation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkDeactivation {
    /// Users that went from active to inactive
    pub deactivated: usize,
    /// Pull requests that received a replacement reviewer
    pub reassigned: usize,
}

pub struct BulkDeactivationService<M: TxManager> {
    tx: Arc<M>,
    users: Arc<dyn UserRepository<M::Tx>>,
    teams: Arc<dyn TeamRepository<M::Tx>>,
    reassignment: Arc<dyn ReviewerReassignment<M::Tx>>,
}

impl<M: TxManager> BulkDeactivationService<M> {
    pub fn new(
        tx: Arc<M>,
        users: Arc<dyn UserRepository<M::Tx>>,
        teams: Arc<dyn TeamRepository<M::Tx>>,
        reassignment: Arc<dyn ReviewerReassignment<M::Tx>>,
    ) -> Self {
        Self {
            tx,
            users,
            teams,
            reassignment,
        }
    }

    /// Deactivate `user_ids` in `team_id` and reassign their open reviews
    ///
    /// Already-inactive users are skipped and count towards neither total.
    pub async fn deactivate(&self, team_id: &str, user_ids: &[String]) -> Result<BulkDeactivation> {
        let ids = dedup(user_ids);
        if ids.is_empty() {
            return Err(Error::EmptyBulkUserIds);
        }

        let mut tx = self.tx.begin_write().await?;
        let result = self.deactivate_in(&mut tx, team_id, &ids).await;
        let outcome = finish(self.tx.as_ref(), tx, result).await?;

        tracing::info!(
            team_id,
            requested = ids.len(),
            deactivated = outcome.deactivated,
            reassigned = outcome.reassigned,
            "Bulk deactivation committed"
        );
        Ok(outcome)
    }

    async fn deactivate_in(
        &self,
        tx: &mut M::Tx,
        team_id: &str,
        ids: &[String],
    ) -> Result<BulkDeactivation> {
        self.teams.get_by_id(tx, team_id).await?;

        let loaded = self.users.list_by_ids(tx, ids).await?;
        if loaded.len() != ids.len() {
            return Err(Error::NotFound);
        }
        if let Some(stranger) = loaded.iter().find(|u| u.team_id != team_id) {
            tracing::debug!(user_id = %stranger.id, team_id, "Bulk target outside team");
            return Err(Error::CrossTeamDeactivation);
        }

        // Request order, not storage order.
        let mut targets: Vec<User> = Vec::new();
        for id in ids {
            if let Some(user) = loaded.iter().find(|u| &u.id == id) {
                if user.is_active {
                    targets.push(user.clone());
                }
            }
        }

        for user in &mut targets {
            user.is_active = false;
            self.users.update(tx, user).await?;
        }

        let mut outcome = BulkDeactivation {
            deactivated: targets.len(),
            reassigned: 0,
        };
        for user in &targets {
            outcome.reassigned += self
                .reassignment
                .reassign_user_in_open_prs(tx, team_id, user)
                .await?;
        }
        Ok(outcome)
    }
}

/// Unique ids in first-seen order
fn dedup(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}
