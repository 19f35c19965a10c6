//! Dry-run anchor that computes privacy-preserving digests and logs them.
//!
//! Only a fixed subset of event types is anchored. Each anchored event yields
//! three salted SHA-256 digests:
//!
//! | Digest | Input |
//! |--------|-------|
//! | group | tanda id + salt |
//! | ref | event id + salt |
//! | data | canonical JSON of type, time, hashed user and payload, amount |
//!
//! Raw user ids and payloads never appear in the output.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Mutex;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::ledger::{EventType, LedgerEvent};
use crate::ports::EventAnchor;

/// Anchor label for an event type, or `None` if it is not anchored.
pub fn anchor_type(kind: EventType) -> Option<&'static str> {
    match kind {
        EventType::TandaCreated => Some("TANDA_CREATED"),
        EventType::TandaActivated => Some("TANDA_ACTIVATED"),
        EventType::InitialFundCompleted => Some("INITIAL_FUND_COMPLETED"),
        EventType::DefaultConfirmed => Some("COVERAGE_ACTIVATED"),
        EventType::ReplacementConfirmed => Some("USER_REPLACED"),
        EventType::TandaClosed => Some("TANDA_CLOSED"),
        EventType::RaffleWinnerSelected => Some("RAFFLE_RESULT"),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorRecord {
    pub event_id: String,
    pub anchor_type: &'static str,
    pub group_hash: String,
    pub ref_hash: String,
    pub data_hash: String,
}

#[derive(Serialize)]
struct AnchoredData<'a> {
    #[serde(rename = "type")]
    event_type: &'a str,
    timestamp: i64,
    user_id_hash: Option<String>,
    tanda_id_hash: &'a str,
    amount: Option<i64>,
    payload_hash: String,
}

/// Computes anchor digests without submitting them anywhere.
pub struct DryRunAnchor {
    network: String,
    salt: SecretString,
    log: Mutex<Vec<AnchorRecord>>,
}

impl DryRunAnchor {
    pub fn new(network: impl Into<String>, salt: SecretString) -> Self {
        Self {
            network: network.into(),
            salt,
            log: Mutex::new(Vec::new()),
        }
    }

    /// Digests recorded so far, in processing order.
    pub fn records(&self) -> Vec<AnchorRecord> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    fn salted(&self, value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(value.as_bytes());
        hasher.update(self.salt.expose_secret().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Digests for `event`, or `None` if its type is not anchored.
    pub fn compute(&self, event: &LedgerEvent) -> Result<Option<AnchorRecord>, DomainError> {
        let Some(anchor_type) = anchor_type(event.event_type()) else {
            return Ok(None);
        };

        let tanda = event
            .tanda_id
            .map(|t| t.to_string())
            .unwrap_or_else(|| "no-tanda".to_string());
        let group_hash = self.salted(&tanda);
        let ref_hash = self.salted(event.id.as_str());

        let (_, payload) = event
            .event
            .to_columns()
            .map_err(|e| DomainError::new(ErrorCode::InternalError, e.to_string()))?;
        let data = AnchoredData {
            event_type: event.event_type().as_str(),
            timestamp: event.occurred_at.as_millis(),
            user_id_hash: event.user_id.as_ref().map(|u| self.salted(u.as_str())),
            tanda_id_hash: &group_hash,
            amount: event.amount,
            payload_hash: self.salted(&payload.to_string()),
        };
        let canonical = serde_json::to_string(&data)
            .map_err(|e| DomainError::new(ErrorCode::InternalError, e.to_string()))?;
        let data_hash = hex::encode(Sha256::digest(canonical.as_bytes()));

        Ok(Some(AnchorRecord {
            event_id: event.id.to_string(),
            anchor_type,
            group_hash,
            ref_hash,
            data_hash,
        }))
    }
}

#[async_trait]
impl EventAnchor for DryRunAnchor {
    async fn process_event(&self, event: &LedgerEvent) -> Result<(), DomainError> {
        let Some(record) = self.compute(event)? else {
            return Ok(());
        };

        tracing::info!(
            network = %self.network,
            anchor_type = record.anchor_type,
            group = &record.group_hash[..10],
            data = &record.data_hash[..10],
            "[DRY-RUN] Would anchor event"
        );

        self.log
            .lock()
            .map_err(|_| DomainError::lock_poisoned("DryRunAnchor"))?
            .push(record);
        Ok(())
    }
}
