use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A team owning users; names are unique
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
