//! Error types for database operations

use sqlx::error::ErrorKind as SqlxErrorKind;
use thiserror::Error;

/// Database error types
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx database error
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for database operations
pub type Result<T> = std::result::Result<T, DbError>;

impl From<DbError> for reviewer_core::Error {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Sqlx(e) => translate(e),
            DbError::Io(e) => reviewer_core::Error::Io(e),
            other => reviewer_core::Error::Storage(other.to_string()),
        }
    }
}

/// Map a driver error onto the engine taxonomy
///
/// Reviewer slot uniqueness is an invariant of the engine, so a unique
/// violation on `pr_reviewers` is a constraint violation rather than a
/// duplicate create.
pub fn translate(err: sqlx::Error) -> reviewer_core::Error {
    if let sqlx::Error::RowNotFound = err {
        return reviewer_core::Error::NotFound;
    }
    if let Some(db) = err.as_database_error() {
        match db.kind() {
            SqlxErrorKind::UniqueViolation if db.message().contains("pr_reviewers") => {
                return reviewer_core::Error::ConstraintViolation;
            }
            SqlxErrorKind::UniqueViolation => return reviewer_core::Error::AlreadyExists,
            SqlxErrorKind::ForeignKeyViolation
            | SqlxErrorKind::CheckViolation
            | SqlxErrorKind::NotNullViolation => {
                return reviewer_core::Error::ConstraintViolation;
            }
            _ => {}
        }
    }
    storage(err)
}

fn storage(err: sqlx::Error) -> reviewer_core::Error {
    tracing::error!(error = %err, "Database operation failed");
    reviewer_core::Error::Storage(err.to_string())
}
