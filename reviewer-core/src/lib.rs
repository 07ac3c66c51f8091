//! Reviewer Core - assignment and reassignment engine for code review
//!
//! This crate owns the rules for picking pull request reviewers within a
//! team, replacing them on demand and cascading reassignments when users are
//! deactivated. Storage is reached only through the repository traits in
//! [`repos`] and the transaction boundary in [`ports::TxManager`].

pub mod assignment;
pub mod config;
pub mod error;
pub mod memory;
pub mod model;
pub mod ports;
pub mod repos;
pub mod service;

pub use assignment::{AssignmentStrategy, RandomAssignment};
pub use config::{AssignmentSettings, CliOverrides, Config, DatabaseSettings, IdMode};
pub use error::{Error, ErrorKind, Result};
pub use memory::MemoryStore;
pub use model::{
    PrStatus, PullRequest, PullRequestStats, ReviewerSlot, Team, User, UserAssignmentStats,
};
pub use ports::{Clock, IdGenerator, RandomSource, TxManager};
pub use repos::{PullRequestRepository, TeamRepository, UserRepository};
pub use service::{BulkDeactivation, Dependencies, Engine, UserUpdate};
