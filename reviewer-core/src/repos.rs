//! Repository contracts consumed by the services
//!
//! Every method takes the transaction handle explicitly, so two transactions
//! can never be mixed inside one operation. Adapters translate their storage
//! errors into the engine taxonomy: a missing row is [`Error::NotFound`],
//! duplicate keys are [`Error::AlreadyExists`] and reviewer slot uniqueness
//! violations are [`Error::ConstraintViolation`].
//!
//! [`Error::NotFound`]: crate::Error::NotFound
//! [`Error::AlreadyExists`]: crate::Error::AlreadyExists
//! [`Error::ConstraintViolation`]: crate::Error::ConstraintViolation

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{
    PrStatus, PullRequest, PullRequestStats, ReviewerSlot, Team, User, UserAssignmentStats,
};

#[async_trait]
pub trait TeamRepository<Tx: Send>: Send + Sync {
    async fn create(&self, tx: &mut Tx, team: &Team) -> Result<()>;

    async fn get_by_id(&self, tx: &mut Tx, id: &str) -> Result<Team>;

    /// All teams, oldest first
    async fn list(&self, tx: &mut Tx) -> Result<Vec<Team>>;
}

#[async_trait]
pub trait UserRepository<Tx: Send>: Send + Sync {
    async fn create(&self, tx: &mut Tx, user: &User) -> Result<()>;

    async fn get_by_id(&self, tx: &mut Tx, id: &str) -> Result<User>;

    /// Persist name and active flag
    async fn update(&self, tx: &mut Tx, user: &User) -> Result<()>;

    /// Users oldest first, optionally filtered by team and active flag
    async fn list(
        &self,
        tx: &mut Tx,
        team_id: Option<&str>,
        is_active: Option<bool>,
    ) -> Result<Vec<User>>;

    /// Users whose id is in `ids`; unknown ids are silently absent
    async fn list_by_ids(&self, tx: &mut Tx, ids: &[String]) -> Result<Vec<User>>;

    /// Active members of `team_id` whose id is not in `exclude`, oldest first
    async fn list_active_by_team_except(
        &self,
        tx: &mut Tx,
        team_id: &str,
        exclude: &[String],
    ) -> Result<Vec<User>>;
}

#[async_trait]
pub trait PullRequestRepository<Tx: Send>: Send + Sync {
    /// Insert the pull request and its reviewer slots
    async fn create(&self, tx: &mut Tx, pr: &PullRequest) -> Result<()>;

    /// Load a pull request with its slots ordered by slot number
    ///
    /// With `for_update` the row stays locked until the transaction ends,
    /// serializing concurrent mutations of the same pull request.
    async fn get_by_id(&self, tx: &mut Tx, id: &str, for_update: bool) -> Result<PullRequest>;

    async fn update_status(
        &self,
        tx: &mut Tx,
        id: &str,
        status: PrStatus,
        merged_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Swap the whole reviewer slot list of a pull request
    async fn replace_reviewers(
        &self,
        tx: &mut Tx,
        pr_id: &str,
        reviewers: &[ReviewerSlot],
    ) -> Result<()>;

    /// Pull requests newest first, optionally filtered by status
    async fn list(&self, tx: &mut Tx, status: Option<PrStatus>) -> Result<Vec<PullRequest>>;

    /// Pull requests where `user_id` holds a slot, newest first
    async fn list_assigned_to(
        &self,
        tx: &mut Tx,
        user_id: &str,
        status: Option<PrStatus>,
    ) -> Result<Vec<PullRequest>>;

    /// Review load per user, including users with no assignments
    async fn stats_by_user(
        &self,
        tx: &mut Tx,
        team_id: Option<&str>,
    ) -> Result<Vec<UserAssignmentStats>>;

    /// Reviewer count per pull request; the team filter applies to the author
    async fn stats_by_pr(&self, tx: &mut Tx, team_id: Option<&str>)
        -> Result<Vec<PullRequestStats>>;
}
