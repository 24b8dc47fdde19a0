//! Common error types for Bandstand

use thiserror::Error;
use uuid::Uuid;

/// Common result type for Bandstand operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared by every Bandstand component
///
/// The first group are the domain outcomes callers are expected to handle
/// (quota, duplicates, state transitions). Storage failures are split into
/// `ServiceUnavailable` (retryable: pool timeout, closed pool, I/O) and
/// `Database` (everything else).
#[derive(Error, Debug)]
pub enum Error {
    /// Member already used every suggestion slot for the period
    #[error("Suggestion quota exceeded for member {member_id} in period {period}")]
    QuotaExceeded { member_id: Uuid, period: String },

    /// A vote record already exists for this (member, song) pair
    #[error("Vote already exists for member {member_id} on song {song_id}")]
    DuplicateVote { member_id: Uuid, song_id: Uuid },

    /// Song is already part of the setlist
    #[error("Song {song_id} is already in setlist {setlist_id}")]
    DuplicateSong { setlist_id: Uuid, song_id: Uuid },

    /// Operation not allowed from the record's current state
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// Setlist was edited since the caller last read it
    #[error("Setlist {setlist_id} changed (expected version {expected}, found {actual})")]
    VersionConflict {
        setlist_id: Uuid,
        expected: i64,
        actual: i64,
    },

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Validation error: {0}")]
    Validation(String),

    /// Storage or external provider could not be reached
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Database operation error
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Stable machine-readable name, used in API error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Error::QuotaExceeded { .. } => "quota_exceeded",
            Error::DuplicateVote { .. } => "duplicate_vote",
            Error::DuplicateSong { .. } => "duplicate_song",
            Error::InvalidStateTransition(_) => "invalid_state_transition",
            Error::VersionConflict { .. } => "version_conflict",
            Error::NotFound(_) => "not_found",
            Error::Validation(_) => "validation_error",
            Error::ServiceUnavailable(_) => "service_unavailable",
            #[cfg(feature = "sqlx")]
            Error::Database(_) => "database_error",
            Error::Io(_) => "io_error",
            Error::Config(_) => "config_error",
        }
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => Error::ServiceUnavailable(err.to_string()),
            sqlx::Error::RowNotFound => Error::NotFound("row".to_string()),
            other => Error::Database(other),
        }
    }
}

/// True when a database error is a UNIQUE / PRIMARY KEY violation
#[cfg(feature = "sqlx")]
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "sqlx")]
    #[test]
    fn test_pool_timeout_is_service_unavailable() {
        let err: Error = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, Error::ServiceUnavailable(_)));
        assert_eq!(err.kind(), "service_unavailable");
    }

    #[cfg(feature = "sqlx")]
    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: Error = sqlx::Error::RowNotFound.into();
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_quota_message_names_period() {
        let err = Error::QuotaExceeded {
            member_id: Uuid::nil(),
            period: "2026-10".to_string(),
        };
        assert!(err.to_string().contains("2026-10"));
        assert_eq!(err.kind(), "quota_exceeded");
    }
}
