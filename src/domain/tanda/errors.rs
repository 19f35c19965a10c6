//! Lifecycle error types.
//!
//! # Kinds
//!
//! | Kind | Meaning | Examples |
//! |------|---------|----------|
//! | Validation | Caller-facing refusal, nothing appended | WrongAmount, NotOrganizer |
//! | State | Ledger contradicts an assumed invariant | MissingCalendar |
//! | Storage | A port failed | Storage |

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, EventId, TandaId, UserId, ValidationError};

use super::fund_layers::FundLayerError;
use super::replacement::IneligibleReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    State,
    Storage,
}

/// Errors returned by lifecycle commands and queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TandaError {
    #[error("Tanda {0} not found")]
    TandaNotFound(TandaId),

    #[error("No tanda or replacement invite matches code '{0}'")]
    InvalidInviteCode(String),

    #[error("Payment proof {0} not found")]
    ProofNotFound(EventId),

    #[error("Payment proof {0} was already reviewed")]
    ProofAlreadyDecided(EventId),

    #[error("The amount must be exactly ${expected} (received ${actual})")]
    WrongAmount { expected: i64, actual: i64 },

    #[error("User {0} has an unresolved default and cannot take part in new tandas")]
    UserBlocked(UserId),

    #[error("User {0} does not belong to this tanda")]
    NotParticipant(UserId),

    #[error("User {0} already belongs to this tanda")]
    AlreadyParticipant(UserId),

    #[error("Participation of {0} was replaced after a default")]
    ParticipantReplaced(UserId),

    #[error("Only the organizer can do this ({0} is not the organizer)")]
    NotOrganizer(UserId),

    #[error("The tanda is already full")]
    TandaFull,

    #[error("The tanda is not active")]
    TandaNotActive,

    #[error("The tanda is already closed")]
    AlreadyClosed,

    #[error("Cannot {attempted} a tanda in {current} state")]
    InvalidState { current: String, attempted: String },

    #[error("Replacement not allowed: {0}")]
    ReplacementNotAllowed(IneligibleReason),

    #[error("The initial fund is not complete yet")]
    InitialFundIncomplete,

    #[error("User {0} has no unresolved default in this tanda")]
    NoActiveDefault(UserId),

    #[error("Not ready to close: {0}")]
    NotReadyToClose(String),

    #[error("No period is pending payment")]
    NoTargetPeriod,

    #[error("Validation failed: {0}")]
    Validation(ValidationError),

    #[error("Tanda {0} has no calendar")]
    MissingCalendar(TandaId),

    #[error("Inconsistent ledger: {0}")]
    InconsistentLedger(String),

    #[error("Storage failure: {0}")]
    Storage(DomainError),
}

impl TandaError {
    pub fn invalid_state(current: impl ToString, attempted: impl Into<String>) -> Self {
        TandaError::InvalidState {
            current: current.to_string(),
            attempted: attempted.into(),
        }
    }

    pub fn inconsistent(message: impl Into<String>) -> Self {
        TandaError::InconsistentLedger(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TandaError::MissingCalendar(_) | TandaError::InconsistentLedger(_) => ErrorKind::State,
            TandaError::Storage(_) => ErrorKind::Storage,
            _ => ErrorKind::Validation,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            TandaError::TandaNotFound(_) => ErrorCode::TandaNotFound,
            TandaError::InvalidInviteCode(_) => ErrorCode::InvalidInviteCode,
            TandaError::ProofNotFound(_) => ErrorCode::ProofNotFound,
            TandaError::ProofAlreadyDecided(_) => ErrorCode::InvalidStateTransition,
            TandaError::WrongAmount { .. } => ErrorCode::WrongAmount,
            TandaError::UserBlocked(_) => ErrorCode::UserBlocked,
            TandaError::NotParticipant(_) => ErrorCode::NotParticipant,
            TandaError::AlreadyParticipant(_) => ErrorCode::AlreadyParticipant,
            TandaError::ParticipantReplaced(_) => ErrorCode::ParticipantReplaced,
            TandaError::NotOrganizer(_) => ErrorCode::NotOrganizer,
            TandaError::TandaFull => ErrorCode::TandaFull,
            TandaError::TandaNotActive => ErrorCode::TandaNotActive,
            TandaError::AlreadyClosed => ErrorCode::TandaAlreadyClosed,
            TandaError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            TandaError::ReplacementNotAllowed(_) => ErrorCode::ReplacementNotAllowed,
            TandaError::InitialFundIncomplete => ErrorCode::InvalidStateTransition,
            TandaError::NoActiveDefault(_) => ErrorCode::ValidationFailed,
            TandaError::NotReadyToClose(_) => ErrorCode::NotReadyToClose,
            TandaError::NoTargetPeriod => ErrorCode::NoTargetPeriod,
            TandaError::Validation(_) => ErrorCode::ValidationFailed,
            TandaError::MissingCalendar(_) | TandaError::InconsistentLedger(_) => {
                ErrorCode::InconsistentLedger
            }
            TandaError::Storage(e) => e.code,
        }
    }

    /// Caller-facing text. Storage and state details stay in the logs.
    pub fn message(&self) -> String {
        match self.kind() {
            ErrorKind::Validation => self.to_string(),
            ErrorKind::State | ErrorKind::Storage => {
                "Something went wrong on our side. Please try again later.".to_string()
            }
        }
    }
}

impl From<DomainError> for TandaError {
    fn from(err: DomainError) -> Self {
        TandaError::Storage(err)
    }
}

impl From<ValidationError> for TandaError {
    fn from(err: ValidationError) -> Self {
        TandaError::Validation(err)
    }
}

impl From<FundLayerError> for TandaError {
    fn from(err: FundLayerError) -> Self {
        TandaError::InconsistentLedger(err.to_string())
    }
}

impl From<TandaError> for DomainError {
    fn from(err: TandaError) -> Self {
        match err {
            TandaError::Storage(inner) => inner,
            other => DomainError::new(other.code(), other.to_string()),
        }
    }
}
