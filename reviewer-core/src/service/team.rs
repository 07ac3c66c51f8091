//! Team creation and lookup

use std::sync::Arc;

use crate::config::IdMode;
use crate::error::{Error, Result};
use crate::model::Team;
use crate::ports::{finish, Clock, IdGenerator, TxManager};
use crate::repos::TeamRepository;

use super::{is_blank, resolve_id};

pub struct TeamService<M: TxManager> {
    tx: Arc<M>,
    teams: Arc<dyn TeamRepository<M::Tx>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    id_mode: IdMode,
}

impl<M: TxManager> TeamService<M> {
    pub fn new(
        tx: Arc<M>,
        teams: Arc<dyn TeamRepository<M::Tx>>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        id_mode: IdMode,
    ) -> Self {
        Self {
            tx,
            teams,
            clock,
            ids,
            id_mode,
        }
    }

    /// Create a team; names are unique
    pub async fn create(&self, name: &str, id: Option<String>) -> Result<Team> {
        if is_blank(name) {
            return Err(Error::InvalidTeamName);
        }

        let team = Team {
            id: resolve_id(self.id_mode, self.ids.as_ref(), id)?,
            name: name.to_string(),
            created_at: self.clock.now(),
        };

        let mut tx = self.tx.begin_write().await?;
        let result = self.teams.create(&mut tx, &team).await;
        finish(self.tx.as_ref(), tx, result).await?;

        tracing::info!(team_id = %team.id, name = %team.name, "Team created");
        Ok(team)
    }

    pub async fn get(&self, id: &str) -> Result<Team> {
        let mut tx = self.tx.begin().await?;
        let result = self.teams.get_by_id(&mut tx, id).await;
        finish(self.tx.as_ref(), tx, result).await
    }

    /// All teams, oldest first
    pub async fn list(&self) -> Result<Vec<Team>> {
        let mut tx = self.tx.begin().await?;
        let result = self.teams.list(&mut tx).await;
        finish(self.tx.as_ref(), tx, result).await
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{AssignmentSettings, IdMode};
    use crate::service::testing::{fixture, fixture_with};
    use crate::Error;

    #[tokio::test]
    async fn test_create_and_get_team() {
        let fx = fixture();

        let team = fx.engine.teams.create("backend", None).await.unwrap();
        assert_eq!(team.id, "id-1");

        let fetched = fx.engine.teams.get(&team.id).await.unwrap();
        assert_eq!(fetched, team);
    }

    #[tokio::test]
    async fn test_empty_name_is_rejected() {
        let fx = fixture();
        let err = fx.engine.teams.create("   ", None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidTeamName));
    }

    #[tokio::test]
    async fn test_duplicate_name_is_rejected() {
        let fx = fixture();
        fx.engine.teams.create("backend", None).await.unwrap();

        let err = fx.engine.teams.create("backend", None).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists));
        assert_eq!(fx.engine.teams.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_team_is_not_found() {
        let fx = fixture();
        assert!(matches!(
            fx.engine.teams.get("nope").await,
            Err(Error::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_external_ids() {
        let fx = fixture_with(
            AssignmentSettings {
                id_mode: IdMode::External,
                ..Default::default()
            },
            1,
        );

        let team = fx
            .engine
            .teams
            .create("payments", Some("team-payments".to_string()))
            .await
            .unwrap();
        assert_eq!(team.id, "team-payments");

        let err = fx.engine.teams.create("infra", None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_list_is_oldest_first() {
        let fx = fixture();
        fx.engine.teams.create("first", None).await.unwrap();
        fx.clock.advance(chrono::Duration::seconds(1));
        fx.engine.teams.create("second", None).await.unwrap();

        let names: Vec<String> = fx
            .engine
            .teams
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }
}
