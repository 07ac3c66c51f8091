//! User lifecycle and single-user deactivation

use std::sync::Arc;

use serde::Deserialize;

use crate::config::IdMode;
use crate::error::{Error, Result};
use crate::model::User;
use crate::ports::{finish, Clock, IdGenerator, TxManager};
use crate::repos::{TeamRepository, UserRepository};

use super::{is_blank, resolve_id, ReviewerReassignment};

/// Partial update of a user; at least one field must be set
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.is_active.is_none()
    }
}

pub struct UserService<M: TxManager> {
    tx: Arc<M>,
    users: Arc<dyn UserRepository<M::Tx>>,
    teams: Arc<dyn TeamRepository<M::Tx>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    reassignment: Arc<dyn ReviewerReassignment<M::Tx>>,
    id_mode: IdMode,
}

impl<M: TxManager> UserService<M> {
    pub fn new(
        tx: Arc<M>,
        users: Arc<dyn UserRepository<M::Tx>>,
        teams: Arc<dyn TeamRepository<M::Tx>>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        reassignment: Arc<dyn ReviewerReassignment<M::Tx>>,
        id_mode: IdMode,
    ) -> Self {
        Self {
            tx,
            users,
            teams,
            clock,
            ids,
            reassignment,
            id_mode,
        }
    }

    pub async fn create(
        &self,
        team_id: &str,
        name: &str,
        is_active: bool,
        id: Option<String>,
    ) -> Result<User> {
        if is_blank(name) {
            return Err(Error::InvalidUserName);
        }

        let user = User {
            id: resolve_id(self.id_mode, self.ids.as_ref(), id)?,
            name: name.to_string(),
            team_id: team_id.to_string(),
            is_active,
            created_at: self.clock.now(),
        };

        let mut tx = self.tx.begin_write().await?;
        let result = self.create_in(&mut tx, &user).await;
        finish(self.tx.as_ref(), tx, result).await?;

        tracing::info!(user_id = %user.id, team_id = %user.team_id, "User created");
        Ok(user)
    }

    async fn create_in(&self, tx: &mut M::Tx, user: &User) -> Result<()> {
        self.teams.get_by_id(tx, &user.team_id).await?;
        self.users.create(tx, user).await
    }

    pub async fn get(&self, id: &str) -> Result<User> {
        let mut tx = self.tx.begin().await?;
        let result = self.users.get_by_id(&mut tx, id).await;
        finish(self.tx.as_ref(), tx, result).await
    }

    /// Users oldest first, optionally filtered by team and active flag
    pub async fn list(&self, team_id: Option<&str>, is_active: Option<bool>) -> Result<Vec<User>> {
        let mut tx = self.tx.begin().await?;
        let result = self.users.list(&mut tx, team_id, is_active).await;
        finish(self.tx.as_ref(), tx, result).await
    }

    /// Rename and/or (de)activate a user
    ///
    /// Deactivating an active user hands their open reviews to teammates in
    /// the same transaction; if any of those pull requests has no eligible
    /// replacement the update fails with [`Error::NoCandidate`] and the user
    /// stays active.
    pub async fn update(&self, id: &str, update: UserUpdate) -> Result<User> {
        if update.is_empty() {
            return Err(Error::EmptyUpdate);
        }
        if update.name.as_deref().is_some_and(is_blank) {
            return Err(Error::InvalidUserName);
        }

        let mut tx = self.tx.begin_write().await?;
        let result = self.update_in(&mut tx, id, update).await;
        let (user, reassigned) = finish(self.tx.as_ref(), tx, result).await?;

        tracing::info!(
            user_id = %user.id,
            is_active = user.is_active,
            reassigned,
            "User updated"
        );
        Ok(user)
    }

    async fn update_in(
        &self,
        tx: &mut M::Tx,
        id: &str,
        update: UserUpdate,
    ) -> Result<(User, usize)> {
        let mut user = self.users.get_by_id(tx, id).await?;
        let deactivating = user.is_active && update.is_active == Some(false);

        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(is_active) = update.is_active {
            user.is_active = is_active;
        }

        let mut reassigned = 0;
        if deactivating {
            reassigned = self
                .reassignment
                .reassign_user_in_open_prs(tx, &user.team_id, &user)
                .await?;
        }

        self.users.update(tx, &user).await?;
        Ok((user, reassigned))
    }
}
