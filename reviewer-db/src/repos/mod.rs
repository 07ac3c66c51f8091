//! Repository implementations over SQLite
//!
//! Every repository trait from `reviewer-core` is implemented on
//! [`SqliteStore`]; the transaction handle is a plain sqlx transaction and
//! queries run on the connection it holds.

mod pull_requests;
mod teams;
mod users;

use async_trait::async_trait;
use sqlx::{Sqlite, SqlitePool, Transaction};

use reviewer_core::TxManager;

use crate::error::translate;

/// Transaction handle used by every repository call
pub type SqliteTx = Transaction<'static, Sqlite>;

/// SQLite-backed store
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TxManager for SqliteStore {
    type Tx = SqliteTx;

    async fn begin(&self) -> reviewer_core::Result<SqliteTx> {
        self.pool.begin().await.map_err(translate)
    }

    async fn begin_write(&self) -> reviewer_core::Result<SqliteTx> {
        // IMMEDIATE takes the write lock up front, waiting on busy_timeout;
        // a deferred transaction upgraded mid-way fails with SQLITE_BUSY.
        self.pool.begin_with("BEGIN IMMEDIATE").await.map_err(translate)
    }

    async fn commit(&self, tx: SqliteTx) -> reviewer_core::Result<()> {
        tx.commit().await.map_err(translate)
    }

    async fn rollback(&self, tx: SqliteTx) -> reviewer_core::Result<()> {
        tx.rollback().await.map_err(translate)
    }
}
