//! Error types for the domain layer.

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Errors that occur during value object construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' must be between {min} and {max}, got {actual}")]
    OutOfRange {
        field: String,
        min: i64,
        max: i64,
        actual: i64,
    },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField { field: field.into() }
    }

    /// Creates an out of range validation error.
    pub fn out_of_range(field: impl Into<String>, min: i64, max: i64, actual: i64) -> Self {
        ValidationError::OutOfRange {
            field: field.into(),
            min,
            max,
            actual,
        }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Error codes organized by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Validation errors
    ValidationFailed,
    WrongAmount,
    UserBlocked,
    NotParticipant,
    AlreadyParticipant,
    ParticipantReplaced,
    NotOrganizer,
    TandaFull,
    InvalidInviteCode,
    ReplacementNotAllowed,

    // Not found errors
    TandaNotFound,
    ProofNotFound,

    // State errors
    InvalidStateTransition,
    TandaNotActive,
    TandaAlreadyClosed,
    NotReadyToClose,
    NoTargetPeriod,
    InconsistentLedger,

    // Infrastructure errors
    DatabaseError,
    InternalError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::WrongAmount => "WRONG_AMOUNT",
            ErrorCode::UserBlocked => "USER_BLOCKED",
            ErrorCode::NotParticipant => "NOT_PARTICIPANT",
            ErrorCode::AlreadyParticipant => "ALREADY_PARTICIPANT",
            ErrorCode::ParticipantReplaced => "PARTICIPANT_REPLACED",
            ErrorCode::NotOrganizer => "NOT_ORGANIZER",
            ErrorCode::TandaFull => "TANDA_FULL",
            ErrorCode::InvalidInviteCode => "INVALID_INVITE_CODE",
            ErrorCode::ReplacementNotAllowed => "REPLACEMENT_NOT_ALLOWED",
            ErrorCode::TandaNotFound => "TANDA_NOT_FOUND",
            ErrorCode::ProofNotFound => "PROOF_NOT_FOUND",
            ErrorCode::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            ErrorCode::TandaNotActive => "TANDA_NOT_ACTIVE",
            ErrorCode::TandaAlreadyClosed => "TANDA_ALREADY_CLOSED",
            ErrorCode::NotReadyToClose => "NOT_READY_TO_CLOSE",
            ErrorCode::NoTargetPeriod => "NO_TARGET_PERIOD",
            ErrorCode::InconsistentLedger => "INCONSISTENT_LEDGER",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Standard domain error with code, message, and optional details.
///
/// Storage ports report failures with this type; the lifecycle layer wraps
/// it into `TandaError::Storage` without losing the code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
    pub details: HashMap<String, String>,
}

impl DomainError {
    /// Creates a new domain error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Creates a database error from any displayable cause.
    pub fn database(context: &str, cause: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, format!("{}: {}", context, cause))
    }

    /// Creates an internal error for poisoned locks in in-memory adapters.
    pub fn lock_poisoned(what: &str) -> Self {
        Self::new(ErrorCode::InternalError, format!("{} lock poisoned", what))
    }

    /// Adds a detail to the error.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for DomainError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_empty_field_displays_correctly() {
        let err = ValidationError::empty_field("user_id");
        assert_eq!(format!("{}", err), "Field 'user_id' cannot be empty");
    }

    #[test]
    fn validation_error_out_of_range_displays_correctly() {
        let err = ValidationError::out_of_range("participants", 2, 50, 1);
        assert_eq!(
            format!("{}", err),
            "Field 'participants' must be between 2 and 50, got 1"
        );
    }

    #[test]
    fn domain_error_displays_code_and_message() {
        let err = DomainError::new(ErrorCode::TandaNotFound, "Tanda not found");
        assert_eq!(format!("{}", err), "[TANDA_NOT_FOUND] Tanda not found");
    }

    #[test]
    fn database_helper_prefixes_context() {
        let err = DomainError::database("append event", "connection reset");
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, "append event: connection reset");
    }

    #[test]
    fn domain_error_with_detail_adds_detail() {
        let err = DomainError::new(ErrorCode::InternalError, "boom").with_detail("table", "events");
        assert_eq!(err.details.get("table"), Some(&"events".to_string()));
    }
}
