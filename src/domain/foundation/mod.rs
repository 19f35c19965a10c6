//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, the millisecond timestamp and the error types
//! that form the vocabulary of the tanda ledger.

mod errors;
mod ids;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{EventId, TandaId, UserId};
pub use timestamp::Timestamp;
