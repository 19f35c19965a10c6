//! Typed payloads for every ledger fact.
//!
//! `TandaEvent` is adjacently tagged so its JSON form is
//! `{"type": "<EventType>", "payload": {...}}`, which maps one-to-one onto
//! the `type` and `payload` columns of the events table.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::{EventId, Timestamp, UserId, ValidationError};
use crate::domain::tanda::{
    Calendar, LayerMovement, ParticipantRole, PaymentTiming, Periodicity, PoolType, TandaStatus,
    TurnOrderMethod,
};

use super::EventType;

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TandaCreated {
    pub name: String,
    pub organizer_id: UserId,
    pub contribution_amount: i64,
    pub number_of_participants: u32,
    pub periodicity: Periodicity,
    pub duration_months: u32,
    pub pool_type: PoolType,
    pub invite_code: String,
    pub required_initial_fund: i64,
    pub organizer_participates: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantInvited {
    pub role: ParticipantRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaced_user_id: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantConfirmed {
    pub role: ParticipantRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherited_from: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofReceived {
    pub method: String,
}

/// Organizer's verdict on a proof; shared by `PaymentValidated` and `PaymentRejected`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofDecision {
    pub validator: UserId,
    pub proof_event_id: EventId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialFundDeposited {
    pub proof_event_id: EventId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialFundCompleted {
    pub total_collected: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOrderAssigned {
    pub method: TurnOrderMethod,
    pub order: Vec<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarCreated {
    pub schedule: Calendar,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TandaActivated {
    pub status: TandaStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionReceived {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<PaymentTiming>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_event_id: Option<EventId>,
}

/// A periodic payment applied to a round; shared by `PeriodicPaymentRecorded` and `CoverageRepaid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundPayment {
    pub round: u32,
    pub timing: PaymentTiming,
}

/// Facts that only name the round they concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundMarker {
    pub round: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolCovered {
    pub round: u32,
    pub coverage_count: u32,
    pub policy_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegularizationWindowStarted {
    pub round: u32,
    pub ends_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowReminderSent {
    pub round: u32,
    pub day: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionRegularized {
    pub round: u32,
    #[serde(default)]
    pub coverage_repaid: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultReason {
    /// Coverage limit reached before this round.
    LimitExceeded,
    /// Regularization window ran out without repayment.
    WindowExpired,
    /// Fund layers could not absorb the coverage.
    FundExhausted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultConfirmed {
    pub round: u32,
    pub reason: DefaultReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRemoved {
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementCodeCreated {
    pub code: String,
    pub replaced_user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementJoined {
    pub code: String,
    pub replaced_user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementConfirmed {
    pub replaced_user_id: UserId,
}

/// A free-text reason; used by `ReplacementNotAllowed` and `UserUnblocked`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reason {
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryModeStarted {
    pub ends_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserNoteRegistered {
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultReversed {
    pub organizer_id: UserId,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundLayerAllocated {
    pub total: i64,
    pub tiers: [i64; 4],
    pub percentages: [i64; 4],
}

/// Tier movements of one draw or restoration, with the balances that resulted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundLayerMovement {
    pub movements: Vec<LayerMovement>,
    pub balances: [i64; 4],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YieldCalculated {
    pub yield_gross: i64,
    pub yield_net: i64,
    pub losses: i64,
    pub fees: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YieldNotDistributed {
    pub reason: String,
    pub yield_net: i64,
    pub eligible_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaffleDrawn {
    pub seed_hash: String,
    pub eligible_count: usize,
    pub eligibles_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaffleWinnerSelected {
    pub winner_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YieldAwarded {
    pub yield_net: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TandaClosed {
    pub yield_distributed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
}

// ---------------------------------------------------------------------------
// Sum type
// ---------------------------------------------------------------------------

/// A ledger fact with its typed payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum TandaEvent {
    TandaCreated(TandaCreated),
    ParticipantInvited(ParticipantInvited),
    ParticipantConfirmed(ParticipantConfirmed),
    ProofReceived(ProofReceived),
    PaymentValidated(ProofDecision),
    PaymentRejected(ProofDecision),
    InitialFundDeposited(InitialFundDeposited),
    InitialFundCompleted(InitialFundCompleted),
    TurnOrderAssigned(TurnOrderAssigned),
    CalendarCreated(CalendarCreated),
    TandaActivated(TandaActivated),
    ContributionReceived(ContributionReceived),
    PeriodicPaymentRecorded(RoundPayment),
    CoverageRepaid(RoundPayment),
    ContributionLate(RoundMarker),
    PoolCovered(PoolCovered),
    RegularizationWindowStarted(RegularizationWindowStarted),
    WindowReminderSent(WindowReminderSent),
    WindowFinalNoticeSent(RoundMarker),
    ContributionRegularized(ContributionRegularized),
    CoverageRestored(RoundMarker),
    DefaultConfirmed(DefaultConfirmed),
    ParticipantRemoved(ParticipantRemoved),
    ReplacementCodeCreated(ReplacementCodeCreated),
    ReplacementJoined(ReplacementJoined),
    ReplacementConfirmed(ReplacementConfirmed),
    ReplacementNotAllowed(Reason),
    RecoveryModeStarted(RecoveryModeStarted),
    UserNoteRegistered(UserNoteRegistered),
    DefaultReversed(DefaultReversed),
    UserUnblocked(Reason),
    FundLayerAllocated(FundLayerAllocated),
    FundLayerUsed(FundLayerMovement),
    FundLayerRestored(FundLayerMovement),
    YieldCalculated(YieldCalculated),
    YieldNotDistributed(YieldNotDistributed),
    RaffleDrawn(RaffleDrawn),
    RaffleWinnerSelected(RaffleWinnerSelected),
    YieldAwarded(YieldAwarded),
    TandaClosed(TandaClosed),
}

impl TandaEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            TandaEvent::TandaCreated(_) => EventType::TandaCreated,
            TandaEvent::ParticipantInvited(_) => EventType::ParticipantInvited,
            TandaEvent::ParticipantConfirmed(_) => EventType::ParticipantConfirmed,
            TandaEvent::ProofReceived(_) => EventType::ProofReceived,
            TandaEvent::PaymentValidated(_) => EventType::PaymentValidated,
            TandaEvent::PaymentRejected(_) => EventType::PaymentRejected,
            TandaEvent::InitialFundDeposited(_) => EventType::InitialFundDeposited,
            TandaEvent::InitialFundCompleted(_) => EventType::InitialFundCompleted,
            TandaEvent::TurnOrderAssigned(_) => EventType::TurnOrderAssigned,
            TandaEvent::CalendarCreated(_) => EventType::CalendarCreated,
            TandaEvent::TandaActivated(_) => EventType::TandaActivated,
            TandaEvent::ContributionReceived(_) => EventType::ContributionReceived,
            TandaEvent::PeriodicPaymentRecorded(_) => EventType::PeriodicPaymentRecorded,
            TandaEvent::CoverageRepaid(_) => EventType::CoverageRepaid,
            TandaEvent::ContributionLate(_) => EventType::ContributionLate,
            TandaEvent::PoolCovered(_) => EventType::PoolCovered,
            TandaEvent::RegularizationWindowStarted(_) => EventType::RegularizationWindowStarted,
            TandaEvent::WindowReminderSent(_) => EventType::WindowReminderSent,
            TandaEvent::WindowFinalNoticeSent(_) => EventType::WindowFinalNoticeSent,
            TandaEvent::ContributionRegularized(_) => EventType::ContributionRegularized,
            TandaEvent::CoverageRestored(_) => EventType::CoverageRestored,
            TandaEvent::DefaultConfirmed(_) => EventType::DefaultConfirmed,
            TandaEvent::ParticipantRemoved(_) => EventType::ParticipantRemoved,
            TandaEvent::ReplacementCodeCreated(_) => EventType::ReplacementCodeCreated,
            TandaEvent::ReplacementJoined(_) => EventType::ReplacementJoined,
            TandaEvent::ReplacementConfirmed(_) => EventType::ReplacementConfirmed,
            TandaEvent::ReplacementNotAllowed(_) => EventType::ReplacementNotAllowed,
            TandaEvent::RecoveryModeStarted(_) => EventType::RecoveryModeStarted,
            TandaEvent::UserNoteRegistered(_) => EventType::UserNoteRegistered,
            TandaEvent::DefaultReversed(_) => EventType::DefaultReversed,
            TandaEvent::UserUnblocked(_) => EventType::UserUnblocked,
            TandaEvent::FundLayerAllocated(_) => EventType::FundLayerAllocated,
            TandaEvent::FundLayerUsed(_) => EventType::FundLayerUsed,
            TandaEvent::FundLayerRestored(_) => EventType::FundLayerRestored,
            TandaEvent::YieldCalculated(_) => EventType::YieldCalculated,
            TandaEvent::YieldNotDistributed(_) => EventType::YieldNotDistributed,
            TandaEvent::RaffleDrawn(_) => EventType::RaffleDrawn,
            TandaEvent::RaffleWinnerSelected(_) => EventType::RaffleWinnerSelected,
            TandaEvent::YieldAwarded(_) => EventType::YieldAwarded,
            TandaEvent::TandaClosed(_) => EventType::TandaClosed,
        }
    }

    /// Round the fact refers to, for round-scoped facts.
    pub fn round(&self) -> Option<u32> {
        match self {
            TandaEvent::ContributionReceived(p) => p.round,
            TandaEvent::PeriodicPaymentRecorded(p) | TandaEvent::CoverageRepaid(p) => Some(p.round),
            TandaEvent::ContributionLate(p)
            | TandaEvent::WindowFinalNoticeSent(p)
            | TandaEvent::CoverageRestored(p) => Some(p.round),
            TandaEvent::PoolCovered(p) => Some(p.round),
            TandaEvent::RegularizationWindowStarted(p) => Some(p.round),
            TandaEvent::WindowReminderSent(p) => Some(p.round),
            TandaEvent::ContributionRegularized(p) => Some(p.round),
            TandaEvent::DefaultConfirmed(p) => Some(p.round),
            _ => None,
        }
    }

    /// Splits into the persisted `(type, payload)` column pair.
    pub fn to_columns(&self) -> Result<(EventType, Value), ValidationError> {
        let mut tagged = serde_json::to_value(self)
            .map_err(|e| ValidationError::invalid_format("payload", e.to_string()))?;
        let payload = tagged
            .get_mut("payload")
            .map(Value::take)
            .unwrap_or(Value::Null);
        Ok((self.event_type(), payload))
    }

    /// Rebuilds an event from its persisted `(type, payload)` column pair.
    pub fn from_columns(event_type: &str, payload: Value) -> Result<Self, ValidationError> {
        let parsed: EventType = event_type.parse()?;
        let tagged = serde_json::json!({ "type": parsed.as_str(), "payload": payload });
        serde_json::from_value(tagged).map_err(|e| {
            ValidationError::invalid_format("payload", format!("{}: {}", parsed, e))
        })
    }
}
