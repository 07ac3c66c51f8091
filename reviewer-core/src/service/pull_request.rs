//! Pull request lifecycle: create, read, reassign, merge
//!
//! `Open` is the only mutable state. Mutating operations read the pull
//! request with `for_update` so concurrent attempts on the same pull request
//! serialize at the store.

use std::sync::Arc;

use crate::assignment::AssignmentStrategy;
use crate::config::AssignmentSettings;
use crate::error::{Error, Result};
use crate::model::{normalize_reviewer_slots, PrStatus, PullRequest, ReviewerSlot};
use crate::ports::{finish, Clock, IdGenerator, TxManager};
use crate::repos::{PullRequestRepository, UserRepository};

use super::{is_blank, resolve_id};

pub struct PullRequestService<M: TxManager> {
    tx: Arc<M>,
    prs: Arc<dyn PullRequestRepository<M::Tx>>,
    users: Arc<dyn UserRepository<M::Tx>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    strategy: Arc<dyn AssignmentStrategy>,
    settings: AssignmentSettings,
}

impl<M: TxManager> PullRequestService<M> {
    pub fn new(
        tx: Arc<M>,
        prs: Arc<dyn PullRequestRepository<M::Tx>>,
        users: Arc<dyn UserRepository<M::Tx>>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        strategy: Arc<dyn AssignmentStrategy>,
        settings: AssignmentSettings,
    ) -> Self {
        Self {
            tx,
            prs,
            users,
            clock,
            ids,
            strategy,
            settings,
        }
    }

    /// Open a pull request and assign its initial reviewers
    ///
    /// Reviewers are drawn from the author's team: active members other than
    /// the author, at most `max_reviewers` of them, in slots `1..=N`.
    pub async fn create(
        &self,
        title: &str,
        author_id: &str,
        id: Option<String>,
    ) -> Result<PullRequest> {
        if is_blank(title) {
            return Err(Error::InvalidPrTitle);
        }
        let id = resolve_id(self.settings.id_mode, self.ids.as_ref(), id)?;

        let mut tx = self.tx.begin_write().await?;
        let result = self.create_in(&mut tx, id, title, author_id).await;
        let pr = finish(self.tx.as_ref(), tx, result).await?;

        tracing::info!(
            pr_id = %pr.id,
            author_id = %pr.author_id,
            reviewers = pr.reviewers.len(),
            "Pull request created"
        );
        Ok(pr)
    }

    async fn create_in(
        &self,
        tx: &mut M::Tx,
        id: String,
        title: &str,
        author_id: &str,
    ) -> Result<PullRequest> {
        let author = self.users.get_by_id(tx, author_id).await?;
        let candidates = self
            .users
            .list_active_by_team_except(tx, &author.team_id, std::slice::from_ref(&author.id))
            .await?;

        let selected = self
            .strategy
            .choose_initial_reviewers(candidates, self.settings.max_reviewers);

        let now = self.clock.now();
        let reviewers = selected
            .into_iter()
            .enumerate()
            .map(|(i, user)| ReviewerSlot {
                pr_id: id.clone(),
                slot: (i + 1) as u32,
                user_id: user.id,
                assigned_at: now,
            })
            .collect();

        let pr = PullRequest {
            id,
            title: title.to_string(),
            author_id: author.id,
            status: PrStatus::Open,
            created_at: now,
            merged_at: None,
            reviewers,
        };
        self.prs.create(tx, &pr).await?;
        Ok(pr)
    }

    pub async fn get(&self, id: &str) -> Result<PullRequest> {
        let mut tx = self.tx.begin().await?;
        let result = self.prs.get_by_id(&mut tx, id, false).await;
        finish(self.tx.as_ref(), tx, result).await
    }

    /// Pull requests newest first, optionally filtered by status
    pub async fn list(&self, status: Option<PrStatus>) -> Result<Vec<PullRequest>> {
        let mut tx = self.tx.begin().await?;
        let result = self.prs.list(&mut tx, status).await;
        finish(self.tx.as_ref(), tx, result).await
    }

    /// Replace one reviewer with a freshly drawn team member
    pub async fn reassign(&self, pr_id: &str, old_reviewer_id: &str) -> Result<PullRequest> {
        let mut tx = self.tx.begin_write().await?;
        let result = self.reassign_in(&mut tx, pr_id, old_reviewer_id).await;
        let (pr, new_reviewer) = finish(self.tx.as_ref(), tx, result).await?;

        tracing::info!(
            pr_id = %pr.id,
            from = %old_reviewer_id,
            to = %new_reviewer,
            "Reviewer reassigned"
        );
        Ok(pr)
    }

    async fn reassign_in(
        &self,
        tx: &mut M::Tx,
        pr_id: &str,
        old_reviewer_id: &str,
    ) -> Result<(PullRequest, String)> {
        let mut pr = self.prs.get_by_id(tx, pr_id, true).await?;
        if !pr.is_open() {
            return Err(Error::AlreadyMerged);
        }

        let old_reviewer = self.users.get_by_id(tx, old_reviewer_id).await?;
        let exclude = pr.build_exclusion_list(&old_reviewer.id);
        let candidates = self
            .users
            .list_active_by_team_except(tx, &old_reviewer.team_id, &exclude)
            .await?;
        let replacement = self
            .strategy
            .choose_reassignment(&old_reviewer, &candidates)?;

        let (mut reviewers, replaced) =
            pr.replace_reviewer(&old_reviewer.id, &replacement.id, self.clock.now());
        if !replaced {
            return Err(Error::BadReviewer);
        }
        normalize_reviewer_slots(&mut reviewers);

        self.prs.replace_reviewers(tx, &pr.id, &reviewers).await?;
        pr.reviewers = reviewers;
        Ok((pr, replacement.id))
    }

    /// Merge a pull request; merging a merged pull request is a no-op
    pub async fn merge(&self, pr_id: &str) -> Result<PullRequest> {
        let mut tx = self.tx.begin_write().await?;
        let result = self.merge_in(&mut tx, pr_id).await;
        finish(self.tx.as_ref(), tx, result).await
    }

    async fn merge_in(&self, tx: &mut M::Tx, pr_id: &str) -> Result<PullRequest> {
        let mut pr = self.prs.get_by_id(tx, pr_id, true).await?;
        if pr.status == PrStatus::Merged {
            tracing::debug!(pr_id = %pr.id, "Pull request already merged");
            return Ok(pr);
        }

        let merged_at = self.clock.now();
        self.prs
            .update_status(tx, &pr.id, PrStatus::Merged, Some(merged_at))
            .await?;
        pr.status = PrStatus::Merged;
        pr.merged_at = Some(merged_at);

        tracing::info!(pr_id = %pr.id, "Pull request merged");
        Ok(pr)
    }

    /// Pull requests on which `user_id` holds a reviewer slot
    pub async fn list_assigned(
        &self,
        user_id: &str,
        status: Option<PrStatus>,
    ) -> Result<Vec<PullRequest>> {
        let mut tx = self.tx.begin().await?;
        let result = self.list_assigned_in(&mut tx, user_id, status).await;
        finish(self.tx.as_ref(), tx, result).await
    }

    async fn list_assigned_in(
        &self,
        tx: &mut M::Tx,
        user_id: &str,
        status: Option<PrStatus>,
    ) -> Result<Vec<PullRequest>> {
        self.users.get_by_id(tx, user_id).await?;
        self.prs.list_assigned_to(tx, user_id, status).await
    }
}
