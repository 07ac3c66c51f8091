//! Read-only review load reports

use std::sync::Arc;

use crate::error::Result;
use crate::model::{PullRequestStats, UserAssignmentStats};
use crate::ports::{finish, TxManager};
use crate::repos::PullRequestRepository;

pub struct StatsService<M: TxManager> {
    tx: Arc<M>,
    prs: Arc<dyn PullRequestRepository<M::Tx>>,
}

impl<M: TxManager> StatsService<M> {
    pub fn new(tx: Arc<M>, prs: Arc<dyn PullRequestRepository<M::Tx>>) -> Self {
        Self { tx, prs }
    }

    /// Assignment counts for every user, optionally limited to one team
    pub async fn by_user(&self, team_id: Option<&str>) -> Result<Vec<UserAssignmentStats>> {
        let mut tx = self.tx.begin().await?;
        let result = self.prs.stats_by_user(&mut tx, team_id).await;
        finish(self.tx.as_ref(), tx, result).await
    }

    /// Reviewer count per pull request, optionally limited to one author team
    pub async fn by_pr(&self, team_id: Option<&str>) -> Result<Vec<PullRequestStats>> {
        let mut tx = self.tx.begin().await?;
        let result = self.prs.stats_by_pr(&mut tx, team_id).await;
        finish(self.tx.as_ref(), tx, result).await
    }
}
