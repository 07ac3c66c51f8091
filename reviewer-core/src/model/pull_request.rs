//! Pull request aggregate and its reviewer slot operations
//!
//! Everything here is pure: the services load a [`PullRequest`], compute a new
//! slot list with these helpers and hand it back to the repository.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Pull request status; `Open -> Merged` is the only transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrStatus {
    Open,
    Merged,
}

impl PrStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrStatus::Open => "OPEN",
            PrStatus::Merged => "MERGED",
        }
    }
}

impl fmt::Display for PrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "OPEN" => Ok(PrStatus::Open),
            "MERGED" => Ok(PrStatus::Merged),
            other => Err(Error::InvalidRequest(format!(
                "unknown pull request status: {}",
                other
            ))),
        }
    }
}

/// One reviewer assignment on a pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerSlot {
    pub pr_id: String,
    /// 1-based position, dense within the pull request
    pub slot: u32,
    pub user_id: String,
    pub assigned_at: DateTime<Utc>,
}

/// A pull request together with the reviewer slots it owns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: String,
    pub title: String,
    pub author_id: String,
    pub status: PrStatus,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub reviewers: Vec<ReviewerSlot>,
}

impl PullRequest {
    /// Check if the pull request still accepts reviewer mutation
    pub fn is_open(&self) -> bool {
        self.status == PrStatus::Open
    }

    /// Check if a user holds any reviewer slot
    pub fn has_reviewer(&self, user_id: &str) -> bool {
        self.reviewers.iter().any(|r| r.user_id == user_id)
    }

    /// Reviewer user identifiers in slot order
    pub fn reviewer_ids(&self) -> Vec<&str> {
        self.reviewers.iter().map(|r| r.user_id.as_str()).collect()
    }

    /// Users that may not replace `target_user_id` on this pull request
    ///
    /// The union of the target itself, the author and every other current
    /// reviewer, without duplicates.
    pub fn build_exclusion_list(&self, target_user_id: &str) -> Vec<String> {
        let mut exclude = vec![target_user_id.to_string()];
        let others = std::iter::once(self.author_id.as_str()).chain(
            self.reviewers
                .iter()
                .map(|r| r.user_id.as_str())
                .filter(|id| *id != target_user_id),
        );
        for id in others {
            if !exclude.iter().any(|e| e == id) {
                exclude.push(id.to_string());
            }
        }
        exclude
    }

    /// Rewrite every slot held by `old_reviewer_id` to `new_reviewer_id`
    ///
    /// Slot numbers are preserved. The flag is `false` when the old reviewer
    /// held no slot, in which case the returned list equals the current one.
    pub fn replace_reviewer(
        &self,
        old_reviewer_id: &str,
        new_reviewer_id: &str,
        assigned_at: DateTime<Utc>,
    ) -> (Vec<ReviewerSlot>, bool) {
        let mut replaced = false;
        let slots = self
            .reviewers
            .iter()
            .map(|r| {
                if r.user_id == old_reviewer_id {
                    replaced = true;
                    ReviewerSlot {
                        pr_id: r.pr_id.clone(),
                        slot: r.slot,
                        user_id: new_reviewer_id.to_string(),
                        assigned_at,
                    }
                } else {
                    r.clone()
                }
            })
            .collect();
        (slots, replaced)
    }
}

/// Renumber slots to a dense `1..=N` sequence in their current order
pub fn normalize_reviewer_slots(slots: &mut [ReviewerSlot]) {
    for (i, slot) in slots.iter_mut().enumerate() {
        slot.slot = (i + 1) as u32;
    }
}
