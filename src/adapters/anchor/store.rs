//! Event store decorator that offers every appended event to an anchor.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, EventId, TandaId, UserId};
use crate::domain::ledger::{EventType, LedgerEvent};
use crate::ports::{EventAnchor, EventStore};

/// Wraps an `EventStore` and hands each successful append to an
/// `EventAnchor` on a spawned task.
///
/// The append result never depends on the anchor: the task is not awaited
/// and anchor failures are only logged. Must be used inside a tokio runtime.
pub struct AnchoredEventStore {
    inner: Arc<dyn EventStore>,
    anchor: Arc<dyn EventAnchor>,
}

impl AnchoredEventStore {
    pub fn new(inner: Arc<dyn EventStore>, anchor: Arc<dyn EventAnchor>) -> Self {
        Self { inner, anchor }
    }

    fn offer(&self, event: LedgerEvent) {
        let anchor = Arc::clone(&self.anchor);
        tokio::spawn(async move {
            if let Err(e) = anchor.process_event(&event).await {
                tracing::warn!(
                    event_id = %event.id,
                    event_type = %event.event_type(),
                    error = %e,
                    "Anchoring failed"
                );
            }
        });
    }
}

#[async_trait]
impl EventStore for AnchoredEventStore {
    async fn append(&self, event: LedgerEvent) -> Result<EventId, DomainError> {
        let id = self.inner.append(event.clone()).await?;
        self.offer(event);
        Ok(id)
    }

    async fn append_all(&self, events: Vec<LedgerEvent>) -> Result<Vec<EventId>, DomainError> {
        let ids = self.inner.append_all(events.clone()).await?;
        for event in events {
            self.offer(event);
        }
        Ok(ids)
    }

    async fn by_tanda(&self, tanda_id: &TandaId) -> Result<Vec<LedgerEvent>, DomainError> {
        self.inner.by_tanda(tanda_id).await
    }

    async fn by_user(&self, user_id: &UserId) -> Result<Vec<LedgerEvent>, DomainError> {
        self.inner.by_user(user_id).await
    }

    async fn all_of_type(&self, event_type: EventType) -> Result<Vec<LedgerEvent>, DomainError> {
        self.inner.all_of_type(event_type).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryEventStore;
    use crate::domain::foundation::{ErrorCode, Timestamp};
    use crate::domain::ledger::events::RoundMarker;
    use crate::domain::ledger::TandaEvent;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct ChannelAnchor(mpsc::UnboundedSender<EventId>);

    #[async_trait]
    impl EventAnchor for ChannelAnchor {
        async fn process_event(&self, event: &LedgerEvent) -> Result<(), DomainError> {
            let _ = self.0.send(event.id.clone());
            Ok(())
        }
    }

    struct FailingAnchor;

    #[async_trait]
    impl EventAnchor for FailingAnchor {
        async fn process_event(&self, _event: &LedgerEvent) -> Result<(), DomainError> {
            Err(DomainError::new(ErrorCode::InternalError, "rpc unreachable"))
        }
    }

    fn late() -> LedgerEvent {
        LedgerEvent::new(
            TandaEvent::ContributionLate(RoundMarker { round: 1 }),
            Timestamp::from_millis(1),
        )
        .for_tanda(TandaId::new())
    }

    #[tokio::test]
    async fn appended_events_reach_the_anchor() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let inner = Arc::new(InMemoryEventStore::new());
        let store = AnchoredEventStore::new(inner.clone(), Arc::new(ChannelAnchor(tx)));

        let id = store.append(late()).await.unwrap();

        let seen = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert_eq!(seen, Some(id));
        assert_eq!(inner.len(), 1);
    }

    #[tokio::test]
    async fn every_event_of_a_batch_is_offered() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let store = AnchoredEventStore::new(
            Arc::new(InMemoryEventStore::new()),
            Arc::new(ChannelAnchor(tx)),
        );

        let ids = store.append_all(vec![late(), late()]).await.unwrap();

        let mut seen = Vec::new();
        for _ in 0..2 {
            let id = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .unwrap()
                .unwrap();
            seen.push(id);
        }
        seen.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        let mut expected = ids;
        expected.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn anchor_failure_does_not_fail_append() {
        let inner = Arc::new(InMemoryEventStore::new());
        let store = AnchoredEventStore::new(inner.clone(), Arc::new(FailingAnchor));

        let event = late();
        let tanda = event.tanda_id.unwrap();
        store.append(event).await.unwrap();

        assert_eq!(store.by_tanda(&tanda).await.unwrap().len(), 1);
    }
}
