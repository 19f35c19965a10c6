//! Shared handles every handler and sweep works through.

use mockable::{Clock, DefaultClock};
use std::sync::Arc;

use crate::adapters::{
    InMemoryEventStore, InMemoryFundLayerRepository, InMemoryReminderFlagRepository,
    InMemoryReplacementInviteRepository, TracingNotifier,
};
use crate::domain::foundation::{EventId, TandaId, Timestamp, UserId};
use crate::domain::ledger::{EventType, LedgerEvent};
use crate::domain::tanda::{block_status, BlockStatus, TandaError};
use crate::ports::{
    EventStore, FundLayerRepository, Notifier, ReminderFlagRepository,
    ReplacementInviteRepository,
};

use super::locks::{TandaGuard, TandaLocks};

/// Ports plus clock and lock registry, cheap to clone.
#[derive(Clone)]
pub struct LedgerContext {
    pub events: Arc<dyn EventStore>,
    pub fund_layers: Arc<dyn FundLayerRepository>,
    pub invites: Arc<dyn ReplacementInviteRepository>,
    pub reminder_flags: Arc<dyn ReminderFlagRepository>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    pub locks: Arc<TandaLocks>,
}

impl LedgerContext {
    pub fn new(
        events: Arc<dyn EventStore>,
        fund_layers: Arc<dyn FundLayerRepository>,
        invites: Arc<dyn ReplacementInviteRepository>,
        reminder_flags: Arc<dyn ReminderFlagRepository>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            events,
            fund_layers,
            invites,
            reminder_flags,
            notifier,
            clock,
            locks: Arc::new(TandaLocks::new()),
        }
    }

    /// Fully in-process context with a tracing notifier and the system clock.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryEventStore::new()),
            Arc::new(InMemoryFundLayerRepository::new()),
            Arc::new(InMemoryReplacementInviteRepository::new()),
            Arc::new(InMemoryReminderFlagRepository::new()),
            Arc::new(TracingNotifier),
            Arc::new(DefaultClock),
        )
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn now(&self) -> Timestamp {
        Timestamp::from_datetime(self.clock.utc())
    }

    pub async fn lock(&self, tanda_id: TandaId) -> Result<TandaGuard, TandaError> {
        Ok(self.locks.acquire(tanda_id).await?)
    }

    /// Events of one tanda, which may be empty.
    pub async fn load(&self, tanda_id: &TandaId) -> Result<Vec<LedgerEvent>, TandaError> {
        Ok(self.events.by_tanda(tanda_id).await?)
    }

    /// Events of a tanda that must exist.
    ///
    /// # Errors
    ///
    /// `TandaNotFound` when no `TandaCreated` carries `tanda_id`.
    pub async fn load_existing(&self, tanda_id: &TandaId) -> Result<Vec<LedgerEvent>, TandaError> {
        let events = self.load(tanda_id).await?;
        if !events.iter().any(|e| e.is(EventType::TandaCreated)) {
            return Err(TandaError::TandaNotFound(*tanda_id));
        }
        Ok(events)
    }

    pub async fn append(&self, event: LedgerEvent) -> Result<EventId, TandaError> {
        tracing::debug!(
            event_type = %event.event_type(),
            tanda_id = ?event.tanda_id,
            user_id = ?event.user_id,
            "Appending ledger event"
        );
        Ok(self.events.append(event).await?)
    }

    /// Appends `events` as one atomic batch.
    pub async fn append_all(&self, events: Vec<LedgerEvent>) -> Result<Vec<EventId>, TandaError> {
        tracing::debug!(
            count = events.len(),
            event_types = ?events.iter().map(|e| e.event_type()).collect::<Vec<_>>(),
            "Appending ledger batch"
        );
        Ok(self.events.append_all(events).await?)
    }

    /// Whether `user` has an unresolved default in any tanda.
    pub async fn block_status(&self, user: &UserId) -> Result<BlockStatus, TandaError> {
        let events = self.events.by_user(user).await?;
        Ok(block_status(&events, user))
    }

    /// Sends a message; failures are logged and swallowed.
    pub async fn notify(&self, user: &UserId, message: &str) {
        if let Err(e) = self.notifier.notify(user, message).await {
            tracing::warn!(user_id = %user, error = %e, "Notification failed");
        }
    }
}
