//! Cascade reassignment of a departing reviewer
//!
//! Runs inside the caller's transaction: either every open pull request the
//! user reviews gets a replacement, or the first pull request without an
//! eligible candidate fails the whole operation with
//! [`Error::NoCandidate`](crate::Error::NoCandidate) and nothing is kept.

use std::sync::Arc;

use async_trait::async_trait;

use crate::assignment::AssignmentStrategy;
use crate::error::Result;
use crate::model::{normalize_reviewer_slots, PrStatus, User};
use crate::ports::Clock;
use crate::repos::{PullRequestRepository, UserRepository};

/// Replaces a user on every open pull request they review
#[async_trait]
pub trait ReviewerReassignment<Tx: Send>: Send + Sync {
    /// Returns the number of pull requests that received a new reviewer
    async fn reassign_user_in_open_prs(&self, tx: &mut Tx, team_id: &str, user: &User)
        -> Result<usize>;
}

pub struct ReassignmentService<Tx> {
    prs: Arc<dyn PullRequestRepository<Tx>>,
    users: Arc<dyn UserRepository<Tx>>,
    clock: Arc<dyn Clock>,
    strategy: Arc<dyn AssignmentStrategy>,
}

impl<Tx: Send + 'static> ReassignmentService<Tx> {
    pub fn new(
        prs: Arc<dyn PullRequestRepository<Tx>>,
        users: Arc<dyn UserRepository<Tx>>,
        clock: Arc<dyn Clock>,
        strategy: Arc<dyn AssignmentStrategy>,
    ) -> Self {
        Self {
            prs,
            users,
            clock,
            strategy,
        }
    }
}

#[async_trait]
impl<Tx: Send + 'static> ReviewerReassignment<Tx> for ReassignmentService<Tx> {
    async fn reassign_user_in_open_prs(
        &self,
        tx: &mut Tx,
        team_id: &str,
        user: &User,
    ) -> Result<usize> {
        let open = self
            .prs
            .list_assigned_to(tx, &user.id, Some(PrStatus::Open))
            .await?;
        if open.is_empty() {
            return Ok(0);
        }

        // One pool for the whole cascade; per pull request it is only filtered.
        let base = self
            .users
            .list_active_by_team_except(tx, team_id, std::slice::from_ref(&user.id))
            .await?;

        let mut reassigned = 0;
        for pr in &open {
            let exclude = pr.build_exclusion_list(&user.id);
            let candidates: Vec<User> = base
                .iter()
                .filter(|c| !exclude.contains(&c.id))
                .cloned()
                .collect();

            let replacement = self.strategy.choose_reassignment(user, &candidates)?;

            let (mut slots, _) = pr.replace_reviewer(&user.id, &replacement.id, self.clock.now());
            normalize_reviewer_slots(&mut slots);
            self.prs.replace_reviewers(tx, &pr.id, &slots).await?;

            tracing::debug!(
                pr_id = %pr.id,
                from = %user.id,
                to = %replacement.id,
                "Reviewer replaced"
            );
            reassigned += 1;
        }

        tracing::info!(user_id = %user.id, team_id, reassigned, "Open reviews reassigned");
        Ok(reassigned)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;
    use crate::assignment::RandomAssignment;
    use crate::memory::MemoryStore;
    use crate::ports::{FixedClock, StdRandom, TxManager};
    use crate::service::testing::{fixture, reviewers, slots, t0};
    use crate::Error;

    fn service(store: &Arc<MemoryStore>) -> ReassignmentService<<MemoryStore as TxManager>::Tx> {
        ReassignmentService::new(
            store.clone(),
            store.clone(),
            Arc::new(FixedClock::new(t0())),
            Arc::new(RandomAssignment::new(Arc::new(StdRandom::seeded(3)))),
        )
    }

    #[tokio::test]
    async fn test_replaces_user_on_every_open_pr() {
        let fx = fixture();
        fx.seed_team("t").await;
        for id in ["a", "b", "c", "d", "e"] {
            fx.seed_user(id, "t", true).await;
        }
        fx.seed_pr("pr-1", "a", &["b", "c"]).await;
        fx.seed_pr("pr-2", "c", &["d", "b"]).await;
        fx.seed_pr("pr-3", "a", &["c"]).await;

        let svc = service(&fx.store);
        let b = fx.load_user("b").await;
        let mut tx = fx.store.begin().await.unwrap();
        let count = svc.reassign_user_in_open_prs(&mut tx, "t", &b).await.unwrap();
        fx.store.commit(tx).await.unwrap();
        assert_eq!(count, 2);

        for id in ["pr-1", "pr-2"] {
            let pr = fx.load_pr(id).await;
            let ids = reviewers(&pr);
            assert!(!ids.contains(&"b".to_string()));
            assert!(!ids.contains(&pr.author_id));
            let unique: HashSet<&String> = ids.iter().collect();
            assert_eq!(unique.len(), ids.len());
            assert_eq!(slots(&pr), vec![1, 2]);
        }
        assert_eq!(reviewers(&fx.load_pr("pr-3").await), vec!["c"]);
    }

    #[tokio::test]
    async fn test_merged_prs_are_left_alone() {
        let fx = fixture();
        fx.seed_team("t").await;
        for id in ["a", "b", "c", "d"] {
            fx.seed_user(id, "t", true).await;
        }
        fx.seed_pr("pr-1", "a", &["b", "c"]).await;
        fx.engine.pull_requests.merge("pr-1").await.unwrap();

        let svc = service(&fx.store);
        let b = fx.load_user("b").await;
        let mut tx = fx.store.begin().await.unwrap();
        let count = svc.reassign_user_in_open_prs(&mut tx, "t", &b).await.unwrap();
        fx.store.commit(tx).await.unwrap();

        assert_eq!(count, 0);
        assert_eq!(reviewers(&fx.load_pr("pr-1").await), vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_exclusions_leave_single_candidate() {
        let fx = fixture();
        fx.seed_team("t").await;
        for id in ["a", "b", "c", "d"] {
            fx.seed_user(id, "t", true).await;
        }
        // Author a, other reviewer c: only d is eligible.
        fx.seed_pr("pr-1", "a", &["b", "c"]).await;

        let svc = service(&fx.store);
        let b = fx.load_user("b").await;
        let mut tx = fx.store.begin().await.unwrap();
        svc.reassign_user_in_open_prs(&mut tx, "t", &b).await.unwrap();
        fx.store.commit(tx).await.unwrap();

        assert_eq!(reviewers(&fx.load_pr("pr-1").await), vec!["d", "c"]);
    }

    #[tokio::test]
    async fn test_one_stranded_pr_fails_the_cascade() {
        let fx = fixture();
        fx.seed_team("t").await;
        for id in ["a", "b", "c", "d"] {
            fx.seed_user(id, "t", true).await;
        }
        fx.seed_pr("pr-1", "a", &["b"]).await;
        // Every other active member is already involved here.
        fx.seed_pr("pr-2", "a", &["b", "c", "d"]).await;

        let svc = service(&fx.store);
        let b = fx.load_user("b").await;
        let mut tx = fx.store.begin().await.unwrap();
        let err = svc
            .reassign_user_in_open_prs(&mut tx, "t", &b)
            .await
            .unwrap_err();
        fx.store.rollback(tx).await.unwrap();

        assert!(matches!(err, Error::NoCandidate));
        assert_eq!(reviewers(&fx.load_pr("pr-1").await), vec!["b"]);
        assert_eq!(reviewers(&fx.load_pr("pr-2").await), vec!["b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_inactive_members_are_not_candidates() {
        let fx = fixture();
        fx.seed_team("t").await;
        fx.seed_team("other").await;
        fx.seed_user("a", "t", true).await;
        fx.seed_user("b", "t", true).await;
        fx.seed_user("c", "t", false).await;
        fx.seed_user("x", "other", true).await;
        fx.seed_pr("pr-1", "a", &["b"]).await;

        let svc = service(&fx.store);
        let b = fx.load_user("b").await;
        let mut tx = fx.store.begin().await.unwrap();
        let err = svc
            .reassign_user_in_open_prs(&mut tx, "t", &b)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoCandidate));
    }
}
