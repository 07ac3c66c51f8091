//! Team persistence

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use reviewer_core::{Result, Team, TeamRepository};

use super::{SqliteStore, SqliteTx};
use crate::error::translate;

#[derive(sqlx::FromRow)]
struct TeamRow {
    id: String,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<TeamRow> for Team {
    fn from(row: TeamRow) -> Self {
        Team {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl TeamRepository<SqliteTx> for SqliteStore {
    async fn create(&self, tx: &mut SqliteTx, team: &Team) -> Result<()> {
        sqlx::query("INSERT INTO teams (id, name, created_at) VALUES (?, ?, ?)")
            .bind(&team.id)
            .bind(&team.name)
            .bind(team.created_at)
            .execute(&mut **tx)
            .await
            .map_err(translate)?;
        Ok(())
    }

    async fn get_by_id(&self, tx: &mut SqliteTx, id: &str) -> Result<Team> {
        sqlx::query_as::<_, TeamRow>("SELECT id, name, created_at FROM teams WHERE id = ?")
            .bind(id)
            .fetch_one(&mut **tx)
            .await
            .map(Team::from)
            .map_err(translate)
    }

    async fn list(&self, tx: &mut SqliteTx) -> Result<Vec<Team>> {
        let rows = sqlx::query_as::<_, TeamRow>(
            "SELECT id, name, created_at FROM teams ORDER BY created_at, rowid",
        )
        .fetch_all(&mut **tx)
        .await
        .map_err(translate)?;
        Ok(rows.into_iter().map(Team::from).collect())
    }
}
