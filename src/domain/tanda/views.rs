//! Read-model shapes returned by `TandaHistory`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{Timestamp, UserId, ValidationError};
use crate::domain::ledger::EventType;

/// Health of the safety fund derived from coverage and repayment facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FundHealth {
    /// No open coverage and every drawn amount repaid.
    Stable,
    /// At least one coverage still waiting for repayment.
    InUse,
    /// Coverages closed without being fully repaid.
    Recovering,
}

impl FundHealth {
    pub fn label(&self) -> &'static str {
        match self {
            FundHealth::Stable => "Stable",
            FundHealth::InUse => "In use",
            FundHealth::Recovering => "Recovering",
        }
    }
}

impl fmt::Display for FundHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FundHealth::Stable => "STABLE",
            FundHealth::InUse => "IN_USE",
            FundHealth::Recovering => "RECOVERING",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundStatus {
    pub health: FundHealth,
    pub amount: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentPeriod {
    pub round: u32,
    pub total: usize,
    pub deadline: Timestamp,
}

/// Participant counts per payment status plus the most recent notable fact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TandaSummary {
    pub paid: usize,
    pub in_grace: usize,
    pub late: usize,
    pub replaced: usize,
    pub last_notable: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Readiness {
    Ready,
    NotReady(String),
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }
}

/// A regularization window with no closing fact yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenWindow {
    pub user_id: UserId,
    pub round: u32,
    pub started_at: Timestamp,
    pub ends_at: Timestamp,
}

/// Category filter of the ledger view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerCategory {
    Payments,
    Coverages,
    Defaults,
    Users,
}

impl LedgerCategory {
    pub fn includes(&self, kind: EventType) -> bool {
        use EventType::*;
        match self {
            LedgerCategory::Payments => matches!(
                kind,
                PeriodicPaymentRecorded | ContributionReceived | ContributionRegularized
            ),
            LedgerCategory::Coverages => matches!(kind, PoolCovered | CoverageRepaid),
            LedgerCategory::Defaults => matches!(kind, ContributionLate | DefaultConfirmed),
            LedgerCategory::Users => matches!(
                kind,
                ParticipantConfirmed | ParticipantRemoved | ReplacementJoined
            ),
        }
    }
}

impl FromStr for LedgerCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "payments" => Ok(LedgerCategory::Payments),
            "coverages" => Ok(LedgerCategory::Coverages),
            "defaults" => Ok(LedgerCategory::Defaults),
            "users" => Ok(LedgerCategory::Users),
            other => Err(ValidationError::invalid_format(
                "category",
                format!("unknown ledger category '{}'", other),
            )),
        }
    }
}

/// Event types shown in the paginated ledger view.
pub fn is_displayable(kind: EventType) -> bool {
    [
        LedgerCategory::Payments,
        LedgerCategory::Coverages,
        LedgerCategory::Defaults,
        LedgerCategory::Users,
    ]
    .iter()
    .any(|c| c.includes(kind))
        || kind == EventType::TandaActivated
}
