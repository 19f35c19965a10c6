//! Notifier port - Outbound messages to participants.
//!
//! The messaging transport implements this; the core only hands over the
//! recipient and the rendered text.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, UserId};

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, to: &UserId, message: &str) -> Result<(), DomainError>;
}
