//! ReminderFlagRepository port - Write-once markers for payment reminders.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, TandaId, UserId};
use crate::domain::tanda::{ReminderFlags, ReminderStage};

#[async_trait]
pub trait ReminderFlagRepository: Send + Sync {
    /// Flags for one (tanda, user, round); all unset when no row exists.
    async fn get(
        &self,
        tanda_id: &TandaId,
        user_id: &UserId,
        round: u32,
    ) -> Result<ReminderFlags, DomainError>;

    /// Marks `stage` as sent. Marking twice is a no-op.
    async fn mark(
        &self,
        tanda_id: &TandaId,
        user_id: &UserId,
        round: u32,
        stage: ReminderStage,
    ) -> Result<(), DomainError>;
}
