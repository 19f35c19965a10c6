//! EventStore port - The append-only ledger.
//!
//! Every piece of tanda state is derived from what this store returns, so
//! implementations must never reorder, mutate or drop events.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventId, TandaId, UserId};
use crate::domain::ledger::{EventType, LedgerEvent};

/// Port for the append-only event log.
///
/// Implementations must ensure:
/// - `append` persists the event before returning and propagates storage failures
/// - `append_all` stores the whole batch or none of it
/// - reads return events ordered by `occurred_at`, ties broken by insertion order
/// - event ids are unique
///
/// # Example
///
/// ```ignore
/// let id = store.append(LedgerEvent::new(event, now).for_tanda(tanda_id)).await?;
/// let history = store.by_tanda(&tanda_id).await?;
/// ```
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append one immutable event and return its id.
    async fn append(&self, event: LedgerEvent) -> Result<EventId, DomainError>;

    /// Append a batch atomically, keeping its order. Returns the ids in order.
    async fn append_all(&self, events: Vec<LedgerEvent>) -> Result<Vec<EventId>, DomainError>;

    /// All events carrying `tanda_id`, in ledger order.
    async fn by_tanda(&self, tanda_id: &TandaId) -> Result<Vec<LedgerEvent>, DomainError>;

    /// All events carrying `user_id`, across tandas, in ledger order.
    async fn by_user(&self, user_id: &UserId) -> Result<Vec<LedgerEvent>, DomainError>;

    /// All events of one type. Used for cross-tanda scans only.
    async fn all_of_type(&self, event_type: EventType) -> Result<Vec<LedgerEvent>, DomainError>;
}
