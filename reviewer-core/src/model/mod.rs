//! Domain records: teams, users, pull requests and reviewer slots

mod pull_request;
mod stats;
mod team;
mod user;

pub use pull_request::{normalize_reviewer_slots, PrStatus, PullRequest, ReviewerSlot};
pub use stats::{PullRequestStats, UserAssignmentStats};
pub use team::Team;
pub use user::User;
