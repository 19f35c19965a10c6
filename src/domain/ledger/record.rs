//! The persisted ledger record.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{EventId, TandaId, Timestamp, UserId};

use super::{EventType, TandaEvent};

/// One immutable row of the ledger.
///
/// Optional columns are attached with the builder methods:
///
/// ```ignore
/// let event = LedgerEvent::new(TandaEvent::ProofReceived(proof), now)
///     .for_tanda(tanda_id)
///     .by_user(user_id)
///     .with_amount(1000)
///     .with_external_ref("bank-ref-42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub id: EventId,
    pub occurred_at: Timestamp,
    pub user_id: Option<UserId>,
    pub tanda_id: Option<TandaId>,
    pub pool_id: Option<String>,
    pub amount: Option<i64>,
    pub external_ref: Option<String>,
    #[serde(flatten)]
    pub event: TandaEvent,
}

impl LedgerEvent {
    pub fn new(event: TandaEvent, occurred_at: Timestamp) -> Self {
        Self {
            id: EventId::new(),
            occurred_at,
            user_id: None,
            tanda_id: None,
            pool_id: None,
            amount: None,
            external_ref: None,
            event,
        }
    }

    pub fn for_tanda(mut self, tanda_id: TandaId) -> Self {
        self.tanda_id = Some(tanda_id);
        self
    }

    pub fn by_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_amount(mut self, amount: i64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_external_ref(mut self, external_ref: impl Into<String>) -> Self {
        self.external_ref = Some(external_ref.into());
        self
    }

    pub fn with_pool(mut self, pool_id: impl Into<String>) -> Self {
        self.pool_id = Some(pool_id.into());
        self
    }

    pub fn event_type(&self) -> EventType {
        self.event.event_type()
    }

    pub fn round(&self) -> Option<u32> {
        self.event.round()
    }

    pub fn is(&self, kind: EventType) -> bool {
        self.event_type() == kind
    }

    pub fn is_by(&self, user: &UserId) -> bool {
        self.user_id.as_ref() == Some(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ledger::events::ProofReceived;

    #[test]
    fn builder_attaches_optional_columns() {
        let tanda = TandaId::new();
        let user = UserId::new("u1").unwrap();
        let event = LedgerEvent::new(
            TandaEvent::ProofReceived(ProofReceived {
                method: "transfer".to_string(),
            }),
            Timestamp::from_millis(5),
        )
        .for_tanda(tanda)
        .by_user(user.clone())
        .with_amount(1000)
        .with_external_ref("ref-1");

        assert_eq!(event.tanda_id, Some(tanda));
        assert!(event.is_by(&user));
        assert_eq!(event.amount, Some(1000));
        assert_eq!(event.external_ref.as_deref(), Some("ref-1"));
        assert!(event.is(EventType::ProofReceived));
        assert!(event.pool_id.is_none());
    }

    #[test]
    fn serialized_record_is_flat() {
        let event = LedgerEvent::new(
            TandaEvent::ProofReceived(ProofReceived {
                method: "cash".to_string(),
            }),
            Timestamp::from_millis(42),
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ProofReceived");
        assert_eq!(json["occurred_at"], 42);
        assert_eq!(json["payload"]["method"], "cash");

        let back: LedgerEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
