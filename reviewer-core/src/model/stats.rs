use serde::{Deserialize, Serialize};

/// Review load of a single user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAssignmentStats {
    pub user_id: String,
    pub total_assigned: u64,
    pub open_assigned: u64,
    pub merged_assigned: u64,
}

/// Number of reviewers currently holding slots on a pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestStats {
    pub pr_id: String,
    pub reviewers_count: u64,
}
