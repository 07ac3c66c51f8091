//! Uniform random selection

use std::sync::Arc;

use crate::assignment::AssignmentStrategy;
use crate::error::{Error, Result};
use crate::model::User;
use crate::ports::RandomSource;

/// Every eligible candidate has the same chance of being picked
#[derive(Clone)]
pub struct RandomAssignment {
    rng: Arc<dyn RandomSource>,
}

impl RandomAssignment {
    pub fn new(rng: Arc<dyn RandomSource>) -> Self {
        Self { rng }
    }
}

impl AssignmentStrategy for RandomAssignment {
    fn choose_initial_reviewers(&self, mut candidates: Vec<User>, max: usize) -> Vec<User> {
        if max == 0 || candidates.is_empty() {
            return Vec::new();
        }
        if candidates.len() <= max {
            return candidates;
        }

        // Partial Fisher-Yates: only the first `max` positions are shuffled.
        let len = candidates.len();
        for i in 0..max {
            let j = i + self.rng.intn(len - i);
            candidates.swap(i, j);
        }
        candidates.truncate(max);
        candidates
    }

    fn choose_reassignment(&self, old_reviewer: &User, candidates: &[User]) -> Result<User> {
        if candidates.is_empty() {
            tracing::debug!(old_reviewer = %old_reviewer.id, "No replacement candidate");
            return Err(Error::NoCandidate);
        }
        let idx = self.rng.intn(candidates.len());
        Ok(candidates[idx].clone())
    }
}
