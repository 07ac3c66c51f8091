//! Error types for the reviewer assignment engine

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for engine operations
///
/// Every variant except [`Error::Storage`], [`Error::Config`] and
/// [`Error::Io`] is a caller-facing condition that should be translated
/// verbatim into a protocol-level response.
#[derive(Error, Debug)]
pub enum Error {
    /// Referenced team, user or pull request does not exist
    #[error("not found")]
    NotFound,

    /// Duplicate unique key on create
    #[error("already exists")]
    AlreadyExists,

    /// Mutation attempted on a pull request that is not open
    #[error("already merged")]
    AlreadyMerged,

    /// No eligible replacement reviewer exists in the team
    #[error("no candidate")]
    NoCandidate,

    /// Named reviewer is not assigned to the pull request
    #[error("bad reviewer")]
    BadReviewer,

    /// Malformed request
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid team name")]
    InvalidTeamName,

    #[error("invalid user name")]
    InvalidUserName,

    #[error("invalid pull request title")]
    InvalidPrTitle,

    /// Update request supplies no fields to change
    #[error("no fields to update")]
    EmptyUpdate,

    #[error("empty bulk user IDs")]
    EmptyBulkUserIds,

    /// Bulk target does not belong to the stated team
    #[error("user does not belong to team")]
    CrossTeamDeactivation,

    /// Storage-level invariant violation
    #[error("constraint violation")]
    ConstraintViolation,

    /// Opaque failure from the persistence layer
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stable, caller-facing classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    AlreadyMerged,
    NoCandidate,
    BadReviewer,
    InvalidRequest,
    InvalidTeamName,
    InvalidUserName,
    InvalidPrTitle,
    EmptyUpdate,
    EmptyBulkUserIds,
    CrossTeamDeactivation,
    ConstraintViolation,
    Internal,
}

impl ErrorKind {
    /// Machine-readable code for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::AlreadyMerged => "already_merged",
            ErrorKind::NoCandidate => "no_candidate",
            ErrorKind::BadReviewer => "bad_reviewer",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::InvalidTeamName => "invalid_team_name",
            ErrorKind::InvalidUserName => "invalid_user_name",
            ErrorKind::InvalidPrTitle => "invalid_pr_title",
            ErrorKind::EmptyUpdate => "empty_update",
            ErrorKind::EmptyBulkUserIds => "empty_bulk_user_ids",
            ErrorKind::CrossTeamDeactivation => "cross_team_deactivation",
            ErrorKind::ConstraintViolation => "constraint_violation",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound => ErrorKind::NotFound,
            Error::AlreadyExists => ErrorKind::AlreadyExists,
            Error::AlreadyMerged => ErrorKind::AlreadyMerged,
            Error::NoCandidate => ErrorKind::NoCandidate,
            Error::BadReviewer => ErrorKind::BadReviewer,
            Error::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Error::InvalidTeamName => ErrorKind::InvalidTeamName,
            Error::InvalidUserName => ErrorKind::InvalidUserName,
            Error::InvalidPrTitle => ErrorKind::InvalidPrTitle,
            Error::EmptyUpdate => ErrorKind::EmptyUpdate,
            Error::EmptyBulkUserIds => ErrorKind::EmptyBulkUserIds,
            Error::CrossTeamDeactivation => ErrorKind::CrossTeamDeactivation,
            Error::ConstraintViolation => ErrorKind::ConstraintViolation,
            Error::Storage(_) | Error::Config(_) | Error::Io(_) => ErrorKind::Internal,
        }
    }

    /// Check if this is an opaque internal failure
    pub fn is_internal(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }

    /// Message safe to show a caller; internal details are withheld
    pub fn public_message(&self) -> String {
        if self.is_internal() {
            "internal error".to_string()
        } else {
            self.to_string()
        }
    }
}
