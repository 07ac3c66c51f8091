//! Reviewer selection strategies
//!
//! A strategy only decides *who* is chosen from a pool it is handed. Who is
//! eligible (team membership, exclusions) is computed by the caller, so
//! strategies never touch persistence.

mod random;

pub use random::RandomAssignment;

use crate::error::Result;
use crate::model::User;

/// Capability contract every selection strategy satisfies
pub trait AssignmentStrategy: Send + Sync {
    /// Pick up to `max` distinct reviewers from `candidates`
    ///
    /// Returns an empty selection when `max` is zero or the pool is empty,
    /// and the whole pool when it has no more than `max` members.
    fn choose_initial_reviewers(&self, candidates: Vec<User>, max: usize) -> Vec<User>;

    /// Pick one replacement for `old_reviewer`
    ///
    /// `candidates` never contains `old_reviewer`. Fails with
    /// [`Error::NoCandidate`](crate::Error::NoCandidate) when it is empty.
    fn choose_reassignment(&self, old_reviewer: &User, candidates: &[User]) -> Result<User>;
}
