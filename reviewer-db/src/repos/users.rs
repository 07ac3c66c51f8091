//! User persistence

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};

use reviewer_core::{Error, Result, User, UserRepository};

use super::{SqliteStore, SqliteTx};
use crate::error::translate;

const USER_COLUMNS: &str = "SELECT id, name, team_id, is_active, created_at FROM users";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    name: String,
    team_id: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            name: row.name,
            team_id: row.team_id,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

async fn fetch_users(
    tx: &mut SqliteTx,
    mut query: QueryBuilder<'_, Sqlite>,
) -> Result<Vec<User>> {
    query.push(" ORDER BY created_at, rowid");
    let rows = query
        .build_query_as::<UserRow>()
        .fetch_all(&mut **tx)
        .await
        .map_err(translate)?;
    Ok(rows.into_iter().map(User::from).collect())
}

/// Append `column [NOT] IN (?, ?, ...)`; `ids` must not be empty
fn push_in_list<'a>(
    query: &mut QueryBuilder<'a, Sqlite>,
    column: &str,
    negate: bool,
    ids: &'a [String],
) {
    query.push(column);
    query.push(if negate { " NOT IN (" } else { " IN (" });
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(id.as_str());
    }
    separated.push_unseparated(")");
}

#[async_trait]
impl UserRepository<SqliteTx> for SqliteStore {
    async fn create(&self, tx: &mut SqliteTx, user: &User) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, name, team_id, is_active, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.team_id)
        .bind(user.is_active)
        .bind(user.created_at)
        .execute(&mut **tx)
        .await
        .map_err(translate)?;
        Ok(())
    }

    async fn get_by_id(&self, tx: &mut SqliteTx, id: &str) -> Result<User> {
        let sql = format!("{} WHERE id = ?", USER_COLUMNS);
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_one(&mut **tx)
            .await
            .map(User::from)
            .map_err(translate)
    }

    async fn update(&self, tx: &mut SqliteTx, user: &User) -> Result<()> {
        let result = sqlx::query("UPDATE users SET name = ?, is_active = ? WHERE id = ?")
            .bind(&user.name)
            .bind(user.is_active)
            .bind(&user.id)
            .execute(&mut **tx)
            .await
            .map_err(translate)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    async fn list(
        &self,
        tx: &mut SqliteTx,
        team_id: Option<&str>,
        is_active: Option<bool>,
    ) -> Result<Vec<User>> {
        let mut query = QueryBuilder::<Sqlite>::new(USER_COLUMNS);
        query.push(" WHERE 1 = 1");
        if let Some(team_id) = team_id {
            query.push(" AND team_id = ").push_bind(team_id);
        }
        if let Some(is_active) = is_active {
            query.push(" AND is_active = ").push_bind(is_active);
        }
        fetch_users(tx, query).await
    }

    async fn list_by_ids(&self, tx: &mut SqliteTx, ids: &[String]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut query = QueryBuilder::<Sqlite>::new(USER_COLUMNS);
        query.push(" WHERE ");
        push_in_list(&mut query, "id", false, ids);
        fetch_users(tx, query).await
    }

    async fn list_active_by_team_except(
        &self,
        tx: &mut SqliteTx,
        team_id: &str,
        exclude: &[String],
    ) -> Result<Vec<User>> {
        let mut query = QueryBuilder::<Sqlite>::new(USER_COLUMNS);
        query.push(" WHERE is_active = 1 AND team_id = ").push_bind(team_id);
        if !exclude.is_empty() {
            query.push(" AND ");
            push_in_list(&mut query, "id", true, exclude);
        }
        fetch_users(tx, query).await
    }
}
