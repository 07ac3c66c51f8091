//! Transactional services
//!
//! Each public operation opens exactly one transaction, runs its reads,
//! decisions and writes against that handle, and commits or rolls back as a
//! unit through [`finish`](crate::ports::finish).

mod bulk;
mod pull_request;
mod reassignment;
mod stats;
mod team;
mod user;

use std::sync::Arc;

pub use bulk::{BulkDeactivation, BulkDeactivationService};
pub use pull_request::PullRequestService;
pub use reassignment::{ReassignmentService, ReviewerReassignment};
pub use stats::StatsService;
pub use team::TeamService;
pub use user::{UserService, UserUpdate};

use crate::assignment::{AssignmentStrategy, RandomAssignment};
use crate::config::{AssignmentSettings, IdMode};
use crate::error::{Error, Result};
use crate::ports::{Clock, IdGenerator, StdRandom, SystemClock, TxManager, UuidGenerator};
use crate::repos::{PullRequestRepository, TeamRepository, UserRepository};

/// Collaborators shared by every service
#[derive(Clone)]
pub struct Dependencies {
    pub clock: Arc<dyn Clock>,
    pub ids: Arc<dyn IdGenerator>,
    pub strategy: Arc<dyn AssignmentStrategy>,
    pub settings: AssignmentSettings,
}

impl Dependencies {
    /// Wall clock, random UUIDs and uniform random selection
    pub fn system(settings: AssignmentSettings) -> Self {
        Self {
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidGenerator),
            strategy: Arc::new(RandomAssignment::new(Arc::new(StdRandom::from_entropy()))),
            settings,
        }
    }
}

/// All services wired against one store
pub struct Engine<M: TxManager> {
    pub teams: TeamService<M>,
    pub users: UserService<M>,
    pub bulk: BulkDeactivationService<M>,
    pub pull_requests: PullRequestService<M>,
    pub stats: StatsService<M>,
}

impl<M> Engine<M>
where
    M: TxManager
        + TeamRepository<M::Tx>
        + UserRepository<M::Tx>
        + PullRequestRepository<M::Tx>
        + 'static,
{
    pub fn new(store: Arc<M>, deps: Dependencies) -> Self {
        let teams: Arc<dyn TeamRepository<M::Tx>> = store.clone();
        let users: Arc<dyn UserRepository<M::Tx>> = store.clone();
        let prs: Arc<dyn PullRequestRepository<M::Tx>> = store.clone();

        let reassignment: Arc<dyn ReviewerReassignment<M::Tx>> = Arc::new(
            ReassignmentService::new(
                prs.clone(),
                users.clone(),
                deps.clock.clone(),
                deps.strategy.clone(),
            ),
        );

        Self {
            teams: TeamService::new(
                store.clone(),
                teams.clone(),
                deps.clock.clone(),
                deps.ids.clone(),
                deps.settings.id_mode,
            ),
            users: UserService::new(
                store.clone(),
                users.clone(),
                teams.clone(),
                deps.clock.clone(),
                deps.ids.clone(),
                reassignment.clone(),
                deps.settings.id_mode,
            ),
            bulk: BulkDeactivationService::new(
                store.clone(),
                users.clone(),
                teams,
                reassignment,
            ),
            pull_requests: PullRequestService::new(
                store.clone(),
                prs.clone(),
                users,
                deps.clock,
                deps.ids,
                deps.strategy,
                deps.settings,
            ),
            stats: StatsService::new(store, prs),
        }
    }
}

/// Pick the identifier for a new record according to the deployment's mode
fn resolve_id(mode: IdMode, ids: &dyn IdGenerator, supplied: Option<String>) -> Result<String> {
    match (mode, supplied) {
        (IdMode::Generated, None) => Ok(ids.generate()),
        (IdMode::Generated, Some(_)) => Err(Error::InvalidRequest(
            "identifiers are generated by this deployment".to_string(),
        )),
        (IdMode::External, Some(id)) if !id.trim().is_empty() => Ok(id),
        (IdMode::External, _) => Err(Error::InvalidRequest(
            "an explicit identifier is required".to_string(),
        )),
    }
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}
