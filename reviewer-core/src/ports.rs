//! Collaborators the engine consumes but does not own
//!
//! Time, identifiers, randomness and the transaction boundary are all
//! injected so the services stay deterministic under test.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::Result;

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Set the time returned by subsequent calls
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    /// Move the clock forward
    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Produces identifiers for newly created teams, users and pull requests
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random (v4) UUIDs
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Uniform integer source shared by concurrent operations
///
/// Implementations must be safe to call from several tasks at once; callers
/// never add their own locking.
pub trait RandomSource: Send + Sync {
    /// Uniformly distributed integer in `[0, n)`; `n` must be positive
    fn intn(&self, n: usize) -> usize;
}

/// [`StdRng`] guarded by a mutex
#[derive(Debug)]
pub struct StdRandom {
    rng: Mutex<StdRng>,
}

impl StdRandom {
    /// Seeded from operating system entropy
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic sequence, for tests and reproducible runs
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for StdRandom {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl RandomSource for StdRandom {
    fn intn(&self, n: usize) -> usize {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen_range(0..n)
    }
}

/// Transaction boundary over the backing store
///
/// `Tx` is a scoped handle passed explicitly to every repository call. A
/// handle dropped without [`TxManager::commit`] must leave no visible change.
#[async_trait]
pub trait TxManager: Send + Sync {
    type Tx: Send + 'static;

    async fn begin(&self) -> Result<Self::Tx>;

    /// Begin a transaction that will write
    ///
    /// Stores with a single writer take the write lock here, so concurrent
    /// writers queue instead of failing on lock upgrade.
    async fn begin_write(&self) -> Result<Self::Tx> {
        self.begin().await
    }

    async fn commit(&self, tx: Self::Tx) -> Result<()>;

    async fn rollback(&self, tx: Self::Tx) -> Result<()>;
}

/// Commit `tx` if `result` is `Ok`, roll it back otherwise
///
/// The error of the transaction body wins over a failed rollback, which is
/// only logged.
pub async fn finish<M, T>(manager: &M, tx: M::Tx, result: Result<T>) -> Result<T>
where
    M: TxManager + ?Sized,
    T: Send,
{
    match result {
        Ok(value) => {
            manager.commit(tx).await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = manager.rollback(tx).await {
                tracing::warn!(error = %err, rollback_error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}
