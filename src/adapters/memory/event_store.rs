//! In-memory event store.
//!
//! Used by tests and local runs. Events are kept in insertion order and
//! returned sorted by `occurred_at`; the sort is stable so ties keep the
//! order in which they were appended.

use async_trait::async_trait;
use std::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, EventId, TandaId, UserId};
use crate::domain::ledger::{EventType, LedgerEvent};
use crate::ports::EventStore;

/// In-memory append-only log.
///
/// # Example
///
/// ```ignore
/// let store = Arc::new(InMemoryEventStore::new());
/// store.append(event).await?;
///
/// // Assert in tests
/// assert_eq!(store.count_of(EventType::PoolCovered), 1);
/// ```
pub struct InMemoryEventStore {
    events: RwLock<Vec<LedgerEvent>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
        }
    }

    fn select(&self, keep: impl Fn(&LedgerEvent) -> bool) -> Result<Vec<LedgerEvent>, DomainError> {
        let events = self
            .events
            .read()
            .map_err(|_| DomainError::lock_poisoned("InMemoryEventStore"))?;
        let mut selected: Vec<LedgerEvent> = events.iter().filter(|e| keep(e)).cloned().collect();
        selected.sort_by_key(|e| e.occurred_at);
        Ok(selected)
    }

    // === Test Helpers ===

    /// Every stored event in ledger order. Empty if the lock is poisoned.
    pub fn all(&self) -> Vec<LedgerEvent> {
        self.select(|_| true).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count_of(&self, kind: EventType) -> usize {
        self.events
            .read()
            .map(|e| e.iter().filter(|e| e.is(kind)).count())
            .unwrap_or(0)
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, event: LedgerEvent) -> Result<EventId, DomainError> {
        let mut ids = self.append_all(vec![event]).await?;
        ids.pop()
            .ok_or_else(|| DomainError::new(ErrorCode::InternalError, "Append stored nothing"))
    }

    async fn append_all(&self, batch: Vec<LedgerEvent>) -> Result<Vec<EventId>, DomainError> {
        let mut events = self
            .events
            .write()
            .map_err(|_| DomainError::lock_poisoned("InMemoryEventStore"))?;

        for (i, event) in batch.iter().enumerate() {
            let clash = events.iter().chain(&batch[..i]).any(|e| e.id == event.id);
            if clash {
                return Err(DomainError::new(
                    ErrorCode::ValidationFailed,
                    format!("Event {} already exists", event.id),
                ));
            }
        }

        let ids = batch.iter().map(|e| e.id.clone()).collect();
        events.extend(batch);
        Ok(ids)
    }

    async fn by_tanda(&self, tanda_id: &TandaId) -> Result<Vec<LedgerEvent>, DomainError> {
        self.select(|e| e.tanda_id.as_ref() == Some(tanda_id))
    }

    async fn by_user(&self, user_id: &UserId) -> Result<Vec<LedgerEvent>, DomainError> {
        self.select(|e| e.is_by(user_id))
    }

    async fn all_of_type(&self, event_type: EventType) -> Result<Vec<LedgerEvent>, DomainError> {
        self.select(|e| e.is(event_type))
    }
}
