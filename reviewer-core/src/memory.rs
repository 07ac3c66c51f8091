//! In-process store implementing every repository contract
//!
//! Two copies of the data exist while a transaction is open: the committed
//! state behind the lock and the transaction's working copy. `begin` takes
//! the lock and clones the committed state, `commit` writes the working copy
//! back and `rollback` (or dropping the handle) throws it away. Holding the
//! lock for the whole transaction serializes writers the way the SQL adapter
//! does.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{Error, Result};
use crate::model::{
    PrStatus, PullRequest, PullRequestStats, ReviewerSlot, Team, User, UserAssignmentStats,
};
use crate::ports::TxManager;
use crate::repos::{PullRequestRepository, TeamRepository, UserRepository};

#[derive(Debug, Clone, Default)]
struct State {
    teams: Vec<Team>,
    users: Vec<User>,
    prs: Vec<PullRequest>,
}

impl State {
    fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    fn pr_mut(&mut self, id: &str) -> Result<&mut PullRequest> {
        self.prs.iter_mut().find(|p| p.id == id).ok_or(Error::NotFound)
    }

    /// Slot list checks the `pr_reviewers` table enforces in SQL
    fn check_slots(&self, pr_id: &str, reviewers: &[ReviewerSlot]) -> Result<()> {
        let mut slots = HashSet::new();
        let mut users = HashSet::new();
        for r in reviewers {
            let valid = r.pr_id == pr_id
                && r.slot >= 1
                && slots.insert(r.slot)
                && users.insert(r.user_id.as_str())
                && self.user(&r.user_id).is_some();
            if !valid {
                return Err(Error::ConstraintViolation);
            }
        }
        Ok(())
    }
}

/// Transaction handle of [`MemoryStore`]
pub struct MemoryTx {
    guard: OwnedMutexGuard<State>,
    working: State,
}

/// Shared in-memory store; clones see the same data
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TxManager for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(MemoryTx { guard, working })
    }

    async fn commit(&self, tx: MemoryTx) -> Result<()> {
        let MemoryTx { mut guard, working } = tx;
        *guard = working;
        Ok(())
    }

    async fn rollback(&self, tx: MemoryTx) -> Result<()> {
        drop(tx);
        Ok(())
    }
}

fn oldest_first<T: Clone>(items: Vec<&T>, created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    let mut out: Vec<T> = items.into_iter().cloned().collect();
    out.sort_by_key(|item| created_at(item));
    out
}

/// Newest first; among equal timestamps the later insert comes first
fn newest_first<'a>(prs: impl DoubleEndedIterator<Item = &'a PullRequest>) -> Vec<PullRequest> {
    let mut out: Vec<PullRequest> = prs.rev().cloned().collect();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out
}

#[async_trait]
impl TeamRepository<MemoryTx> for MemoryStore {
    async fn create(&self, tx: &mut MemoryTx, team: &Team) -> Result<()> {
        let state = &mut tx.working;
        if state
            .teams
            .iter()
            .any(|t| t.id == team.id || t.name == team.name)
        {
            return Err(Error::AlreadyExists);
        }
        state.teams.push(team.clone());
        Ok(())
    }

    async fn get_by_id(&self, tx: &mut MemoryTx, id: &str) -> Result<Team> {
        tx.working
            .teams
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn list(&self, tx: &mut MemoryTx) -> Result<Vec<Team>> {
        Ok(oldest_first(tx.working.teams.iter().collect(), |t| t.created_at))
    }
}

#[async_trait]
impl UserRepository<MemoryTx> for MemoryStore {
    async fn create(&self, tx: &mut MemoryTx, user: &User) -> Result<()> {
        let state = &mut tx.working;
        if state.user(&user.id).is_some() {
            return Err(Error::AlreadyExists);
        }
        if !state.teams.iter().any(|t| t.id == user.team_id) {
            return Err(Error::ConstraintViolation);
        }
        state.users.push(user.clone());
        Ok(())
    }

    async fn get_by_id(&self, tx: &mut MemoryTx, id: &str) -> Result<User> {
        tx.working.user(id).cloned().ok_or(Error::NotFound)
    }

    async fn update(&self, tx: &mut MemoryTx, user: &User) -> Result<()> {
        let stored = tx
            .working
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or(Error::NotFound)?;
        stored.name = user.name.clone();
        stored.is_active = user.is_active;
        Ok(())
    }

    async fn list(
        &self,
        tx: &mut MemoryTx,
        team_id: Option<&str>,
        is_active: Option<bool>,
    ) -> Result<Vec<User>> {
        let matching = tx
            .working
            .users
            .iter()
            .filter(|u| team_id.map_or(true, |t| u.team_id == t))
            .filter(|u| is_active.map_or(true, |a| u.is_active == a))
            .collect();
        Ok(oldest_first(matching, |u| u.created_at))
    }

    async fn list_by_ids(&self, tx: &mut MemoryTx, ids: &[String]) -> Result<Vec<User>> {
        let matching = tx
            .working
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .collect();
        Ok(oldest_first(matching, |u| u.created_at))
    }

    async fn list_active_by_team_except(
        &self,
        tx: &mut MemoryTx,
        team_id: &str,
        exclude: &[String],
    ) -> Result<Vec<User>> {
        let matching = tx
            .working
            .users
            .iter()
            .filter(|u| u.team_id == team_id && u.is_active && !exclude.contains(&u.id))
            .collect();
        Ok(oldest_first(matching, |u| u.created_at))
    }
}

#[async_trait]
impl PullRequestRepository<MemoryTx> for MemoryStore {
    async fn create(&self, tx: &mut MemoryTx, pr: &PullRequest) -> Result<()> {
        let state = &mut tx.working;
        if state.prs.iter().any(|p| p.id == pr.id) {
            return Err(Error::AlreadyExists);
        }
        if state.user(&pr.author_id).is_none() {
            return Err(Error::ConstraintViolation);
        }
        state.check_slots(&pr.id, &pr.reviewers)?;

        let mut pr = pr.clone();
        pr.reviewers.sort_by_key(|r| r.slot);
        state.prs.push(pr);
        Ok(())
    }

    async fn get_by_id(
        &self,
        tx: &mut MemoryTx,
        id: &str,
        _for_update: bool,
    ) -> Result<PullRequest> {
        // The store lock is already exclusive for the whole transaction.
        tx.working
            .prs
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn update_status(
        &self,
        tx: &mut MemoryTx,
        id: &str,
        status: PrStatus,
        merged_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let pr = tx.working.pr_mut(id)?;
        pr.status = status;
        pr.merged_at = merged_at;
        Ok(())
    }

    async fn replace_reviewers(
        &self,
        tx: &mut MemoryTx,
        pr_id: &str,
        reviewers: &[ReviewerSlot],
    ) -> Result<()> {
        tx.working.check_slots(pr_id, reviewers)?;
        let pr = tx.working.pr_mut(pr_id)?;
        pr.reviewers = reviewers.to_vec();
        pr.reviewers.sort_by_key(|r| r.slot);
        Ok(())
    }

    async fn list(&self, tx: &mut MemoryTx, status: Option<PrStatus>) -> Result<Vec<PullRequest>> {
        Ok(newest_first(
            tx.working
                .prs
                .iter()
                .filter(|p| status.map_or(true, |s| p.status == s)),
        ))
    }

    async fn list_assigned_to(
        &self,
        tx: &mut MemoryTx,
        user_id: &str,
        status: Option<PrStatus>,
    ) -> Result<Vec<PullRequest>> {
        Ok(newest_first(tx.working.prs.iter().filter(|p| {
            p.has_reviewer(user_id) && status.map_or(true, |s| p.status == s)
        })))
    }

    async fn stats_by_user(
        &self,
        tx: &mut MemoryTx,
        team_id: Option<&str>,
    ) -> Result<Vec<UserAssignmentStats>> {
        let state = &tx.working;
        let mut stats: Vec<UserAssignmentStats> = state
            .users
            .iter()
            .filter(|u| team_id.map_or(true, |t| u.team_id == t))
            .map(|u| {
                let mut s = UserAssignmentStats {
                    user_id: u.id.clone(),
                    total_assigned: 0,
                    open_assigned: 0,
                    merged_assigned: 0,
                };
                for pr in state.prs.iter().filter(|p| p.has_reviewer(&u.id)) {
                    s.total_assigned += 1;
                    match pr.status {
                        PrStatus::Open => s.open_assigned += 1,
                        PrStatus::Merged => s.merged_assigned += 1,
                    }
                }
                s
            })
            .collect();
        stats.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(stats)
    }

    async fn stats_by_pr(
        &self,
        tx: &mut MemoryTx,
        team_id: Option<&str>,
    ) -> Result<Vec<PullRequestStats>> {
        let state = &tx.working;
        let mut stats: Vec<PullRequestStats> = state
            .prs
            .iter()
            .filter(|p| match team_id {
                Some(team) => state.user(&p.author_id).is_some_and(|a| a.team_id == team),
                None => true,
            })
            .map(|p| PullRequestStats {
                pr_id: p.id.clone(),
                reviewers_count: p.reviewers.len() as u64,
            })
            .collect();
        stats.sort_by(|a, b| a.pr_id.cmp(&b.pr_id));
        Ok(stats)
    }
}
