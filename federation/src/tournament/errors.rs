//! Tournament error types.

use super::models::{MatchId, MatchStatus, MemberId, ParticipantId, TournamentId, TournamentStatus};
use crate::db::timeouts::TimeoutError;
use thiserror::Error;

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    /// Bad input shape or range
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    #[error("Participant not found: {0}")]
    ParticipantNotFound(ParticipantId),

    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    /// Match transition not permitted from its current status
    #[error("Cannot {action} a match that is {from}")]
    InvalidTransition {
        action: &'static str,
        from: MatchStatus,
    },

    /// Tournament status does not allow the operation
    #[error("Tournament is {status}: {reason}")]
    StateConflict {
        status: TournamentStatus,
        reason: &'static str,
    },

    #[error("Tournament is full: capacity {capacity}")]
    CapacityExceeded { capacity: u32 },

    #[error("Member {member_id} is already registered")]
    AlreadyRegistered { member_id: MemberId },

    /// Roster is frozen once a bracket exists
    #[error("Tournament roster is locked by an existing bracket")]
    TournamentLocked,

    #[error("Insufficient participants: need {needed}, have {current}")]
    InsufficientParticipants { needed: usize, current: usize },

    #[error("Bracket already exists")]
    BracketAlreadyExists,

    #[error("Winner {winner_id} is not a participant of this match")]
    InvalidWinner { winner_id: ParticipantId },

    #[error("Match {0} does not have both participants yet")]
    ParticipantsNotSet(MatchId),

    /// Lock or transaction contention, the whole operation may be retried
    #[error("Operation conflicted with a concurrent update: {0}")]
    Retryable(String),

    /// Broken bracket invariant
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

/// Coarse classification used for status codes and metrics labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Retryable,
    Internal,
}

impl TournamentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TournamentError::Validation(_)
            | TournamentError::InvalidWinner { .. }
            | TournamentError::ParticipantsNotSet(_)
            | TournamentError::InsufficientParticipants { .. } => ErrorKind::Validation,
            TournamentError::TournamentNotFound(_)
            | TournamentError::ParticipantNotFound(_)
            | TournamentError::MatchNotFound(_) => ErrorKind::NotFound,
            TournamentError::InvalidTransition { .. }
            | TournamentError::StateConflict { .. }
            | TournamentError::CapacityExceeded { .. }
            | TournamentError::AlreadyRegistered { .. }
            | TournamentError::TournamentLocked
            | TournamentError::BracketAlreadyExists => ErrorKind::Conflict,
            TournamentError::Retryable(_) => ErrorKind::Retryable,
            TournamentError::Internal(_) | TournamentError::Database(_) => ErrorKind::Internal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Retryable
    }

    /// Get a client-safe error message that doesn't leak storage details
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Database(_) | TournamentError::Internal(_) => {
                "Internal server error".to_string()
            }
            TournamentError::Retryable(_) => {
                "Concurrent update in progress, retry the request".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl From<sqlx::Error> for TournamentError {
    fn from(err: sqlx::Error) -> Self {
        // serialization_failure, deadlock_detected, lock_not_available, query_canceled
        let contention = match &err {
            sqlx::Error::PoolTimedOut => Some("connection pool timed out".to_string()),
            sqlx::Error::Database(db) => match db.code().as_deref() {
                Some("40001" | "40P01" | "55P03" | "57014") => Some(db.message().to_string()),
                _ => None,
            },
            _ => None,
        };

        match contention {
            Some(reason) => TournamentError::Retryable(reason),
            None => TournamentError::Database(err),
        }
    }
}

impl From<TimeoutError> for TournamentError {
    fn from(err: TimeoutError) -> Self {
        TournamentError::Retryable(err.to_string())
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use uuid::Uuid;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            TournamentError::CapacityExceeded { capacity: 4 }.kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            TournamentError::InvalidWinner {
                winner_id: Uuid::new_v4()
            }
            .kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            TournamentError::MatchNotFound(Uuid::new_v4()).kind(),
            ErrorKind::NotFound
        );
        assert!(TournamentError::Retryable("lock".to_string()).is_retryable());
    }

    #[test]
    fn test_client_message_hides_internals() {
        let err = TournamentError::Internal("next match missing at index 7".to_string());
        assert_eq!(err.client_message(), "Internal server error");

        let err = TournamentError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.client_message(), "Internal server error");

        let err = TournamentError::BracketAlreadyExists;
        assert_eq!(err.client_message(), "Bracket already exists");
    }

    #[test]
    fn test_timeout_becomes_retryable() {
        let err: TournamentError = TimeoutError(Duration::from_secs(10)).into();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_pool_timeout_becomes_retryable() {
        let err: TournamentError = sqlx::Error::PoolTimedOut.into();
        assert!(err.is_retryable());

        let err: TournamentError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
