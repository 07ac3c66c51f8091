use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A team member who can author pull requests and review them
///
/// Users are never physically deleted; deactivation flips `is_active`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub team_id: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
