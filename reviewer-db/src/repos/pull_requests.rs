//! Pull request and reviewer slot persistence

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};

use reviewer_core::{
    Error, PrStatus, PullRequest, PullRequestRepository, PullRequestStats, Result, ReviewerSlot,
    UserAssignmentStats,
};

use super::{SqliteStore, SqliteTx};
use crate::error::translate;

const PR_COLUMNS: &str =
    "SELECT id, title, author_id, status, created_at, merged_at FROM pull_requests";

/// Stored status code; 1 = OPEN, 2 = MERGED
fn status_code(status: PrStatus) -> i64 {
    match status {
        PrStatus::Open => 1,
        PrStatus::Merged => 2,
    }
}

fn status_from_code(code: i64) -> Result<PrStatus> {
    match code {
        1 => Ok(PrStatus::Open),
        2 => Ok(PrStatus::Merged),
        other => Err(Error::Storage(format!(
            "unknown pull request status code: {}",
            other
        ))),
    }
}

#[derive(sqlx::FromRow)]
struct PullRequestRow {
    id: String,
    title: String,
    author_id: String,
    status: i64,
    created_at: DateTime<Utc>,
    merged_at: Option<DateTime<Utc>>,
}

impl PullRequestRow {
    fn into_pull_request(self, reviewers: Vec<ReviewerSlot>) -> Result<PullRequest> {
        Ok(PullRequest {
            status: status_from_code(self.status)?,
            id: self.id,
            title: self.title,
            author_id: self.author_id,
            created_at: self.created_at,
            merged_at: self.merged_at,
            reviewers,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ReviewerRow {
    pr_id: String,
    slot: i64,
    user_id: String,
    assigned_at: DateTime<Utc>,
}

impl ReviewerRow {
    fn into_slot(self) -> Result<ReviewerSlot> {
        let slot = u32::try_from(self.slot)
            .map_err(|_| Error::Storage(format!("invalid reviewer slot: {}", self.slot)))?;
        Ok(ReviewerSlot {
            pr_id: self.pr_id,
            slot,
            user_id: self.user_id,
            assigned_at: self.assigned_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserStatsRow {
    user_id: String,
    total_assigned: i64,
    open_assigned: i64,
    merged_assigned: i64,
}

#[derive(sqlx::FromRow)]
struct PrStatsRow {
    pr_id: String,
    reviewers_count: i64,
}

/// Load the reviewer slots of `rows` and assemble the aggregates, keeping row order
async fn with_reviewers(
    tx: &mut SqliteTx,
    rows: Vec<PullRequestRow>,
) -> Result<Vec<PullRequest>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT pr_id, slot, user_id, assigned_at FROM pr_reviewers WHERE pr_id IN (",
    );
    let mut separated = query.separated(", ");
    for row in &rows {
        separated.push_bind(row.id.as_str());
    }
    separated.push_unseparated(") ORDER BY pr_id, slot");

    let reviewer_rows = query
        .build_query_as::<ReviewerRow>()
        .fetch_all(&mut **tx)
        .await
        .map_err(translate)?;

    let mut by_pr: HashMap<String, Vec<ReviewerSlot>> = HashMap::new();
    for r in reviewer_rows {
        let slot = r.into_slot()?;
        by_pr.entry(slot.pr_id.clone()).or_default().push(slot);
    }

    rows.into_iter()
        .map(|row| {
            let reviewers = by_pr.remove(&row.id).unwrap_or_default();
            row.into_pull_request(reviewers)
        })
        .collect()
}

async fn insert_reviewers(tx: &mut SqliteTx, reviewers: &[ReviewerSlot]) -> Result<()> {
    for r in reviewers {
        sqlx::query(
            "INSERT INTO pr_reviewers (pr_id, slot, user_id, assigned_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&r.pr_id)
        .bind(i64::from(r.slot))
        .bind(&r.user_id)
        .bind(r.assigned_at)
        .execute(&mut **tx)
        .await
        .map_err(translate)?;
    }
    Ok(())
}

#[async_trait]
impl PullRequestRepository<SqliteTx> for SqliteStore {
    async fn create(&self, tx: &mut SqliteTx, pr: &PullRequest) -> Result<()> {
        sqlx::query(
            "INSERT INTO pull_requests (id, title, author_id, status, created_at, merged_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&pr.id)
        .bind(&pr.title)
        .bind(&pr.author_id)
        .bind(status_code(pr.status))
        .bind(pr.created_at)
        .bind(pr.merged_at)
        .execute(&mut **tx)
        .await
        .map_err(translate)?;

        insert_reviewers(tx, &pr.reviewers).await
    }

    async fn get_by_id(
        &self,
        tx: &mut SqliteTx,
        id: &str,
        for_update: bool,
    ) -> Result<PullRequest> {
        if for_update {
            // SQLite has no row locks; a no-op write takes the database write
            // lock until the transaction ends.
            sqlx::query("UPDATE pull_requests SET status = status WHERE id = ?")
                .bind(id)
                .execute(&mut **tx)
                .await
                .map_err(translate)?;
        }

        let sql = format!("{} WHERE id = ?", PR_COLUMNS);
        let row = sqlx::query_as::<_, PullRequestRow>(&sql)
            .bind(id)
            .fetch_one(&mut **tx)
            .await
            .map_err(translate)?;

        let mut prs = with_reviewers(tx, vec![row]).await?;
        prs.pop().ok_or(Error::NotFound)
    }

    async fn update_status(
        &self,
        tx: &mut SqliteTx,
        id: &str,
        status: PrStatus,
        merged_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let result = sqlx::query("UPDATE pull_requests SET status = ?, merged_at = ? WHERE id = ?")
            .bind(status_code(status))
            .bind(merged_at)
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(translate)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    async fn replace_reviewers(
        &self,
        tx: &mut SqliteTx,
        pr_id: &str,
        reviewers: &[ReviewerSlot],
    ) -> Result<()> {
        let exists: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM pull_requests WHERE id = ?")
            .bind(pr_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(translate)?;
        if exists.is_none() {
            return Err(Error::NotFound);
        }
        if reviewers.iter().any(|r| r.pr_id != pr_id) {
            return Err(Error::ConstraintViolation);
        }

        sqlx::query("DELETE FROM pr_reviewers WHERE pr_id = ?")
            .bind(pr_id)
            .execute(&mut **tx)
            .await
            .map_err(translate)?;

        insert_reviewers(tx, reviewers).await
    }

    async fn list(&self, tx: &mut SqliteTx, status: Option<PrStatus>) -> Result<Vec<PullRequest>> {
        let mut query = QueryBuilder::<Sqlite>::new(PR_COLUMNS);
        if let Some(status) = status {
            query.push(" WHERE status = ").push_bind(status_code(status));
        }
        query.push(" ORDER BY created_at DESC, rowid DESC");

        let rows = query
            .build_query_as::<PullRequestRow>()
            .fetch_all(&mut **tx)
            .await
            .map_err(translate)?;
        with_reviewers(tx, rows).await
    }

    async fn list_assigned_to(
        &self,
        tx: &mut SqliteTx,
        user_id: &str,
        status: Option<PrStatus>,
    ) -> Result<Vec<PullRequest>> {
        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT p.id, p.title, p.author_id, p.status, p.created_at, p.merged_at
             FROM pull_requests p
             JOIN pr_reviewers r ON r.pr_id = p.id
             WHERE r.user_id = ",
        );
        query.push_bind(user_id);
        if let Some(status) = status {
            query.push(" AND p.status = ").push_bind(status_code(status));
        }
        query.push(" ORDER BY p.created_at DESC, p.rowid DESC");

        let rows = query
            .build_query_as::<PullRequestRow>()
            .fetch_all(&mut **tx)
            .await
            .map_err(translate)?;
        with_reviewers(tx, rows).await
    }

    async fn stats_by_user(
        &self,
        tx: &mut SqliteTx,
        team_id: Option<&str>,
    ) -> Result<Vec<UserAssignmentStats>> {
        let rows = sqlx::query_as::<_, UserStatsRow>(
            "SELECT u.id AS user_id,
                    COUNT(p.id) AS total_assigned,
                    COALESCE(SUM(CASE WHEN p.status = 1 THEN 1 ELSE 0 END), 0) AS open_assigned,
                    COALESCE(SUM(CASE WHEN p.status = 2 THEN 1 ELSE 0 END), 0) AS merged_assigned
             FROM users u
             LEFT JOIN pr_reviewers r ON r.user_id = u.id
             LEFT JOIN pull_requests p ON p.id = r.pr_id
             WHERE ?1 IS NULL OR u.team_id = ?1
             GROUP BY u.id
             ORDER BY u.id",
        )
        .bind(team_id)
        .fetch_all(&mut **tx)
        .await
        .map_err(translate)?;

        Ok(rows
            .into_iter()
            .map(|r| UserAssignmentStats {
                user_id: r.user_id,
                total_assigned: r.total_assigned.max(0) as u64,
                open_assigned: r.open_assigned.max(0) as u64,
                merged_assigned: r.merged_assigned.max(0) as u64,
            })
            .collect())
    }

    async fn stats_by_pr(
        &self,
        tx: &mut SqliteTx,
        team_id: Option<&str>,
    ) -> Result<Vec<PullRequestStats>> {
        let rows = sqlx::query_as::<_, PrStatsRow>(
            "SELECT p.id AS pr_id, COUNT(r.user_id) AS reviewers_count
             FROM pull_requests p
             JOIN users a ON a.id = p.author_id
             LEFT JOIN pr_reviewers r ON r.pr_id = p.id
             WHERE ?1 IS NULL OR a.team_id = ?1
             GROUP BY p.id
             ORDER BY p.id",
        )
        .bind(team_id)
        .fetch_all(&mut **tx)
        .await
        .map_err(translate)?;

        Ok(rows
            .into_iter()
            .map(|r| PullRequestStats {
                pr_id: r.pr_id,
                reviewers_count: r.reviewers_count.max(0) as u64,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(status_code(PrStatus::Open), 1);
        assert_eq!(status_code(PrStatus::Merged), 2);
        assert_eq!(status_from_code(2).unwrap(), PrStatus::Merged);
        assert!(matches!(status_from_code(7), Err(Error::Storage(_))));
    }
}
