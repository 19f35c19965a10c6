//! Tanda entity, rebuilt from its `TandaCreated` fact plus later lifecycle events.
//!
//! A tanda is never stored as a row; `TandaHistory::tanda` folds the events
//! carrying its id into this view.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{TandaId, Timestamp, UserId, ValidationError};

use super::policy::SHORT_POOL_MAX_MONTHS;

/// Lifecycle status of a tanda.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TandaStatus {
    /// Collecting members and the initial fund.
    Pending,
    /// Calendar assigned, rounds running.
    Active,
    /// Closed after the final round; terminal.
    Closed,
    /// Abandoned before completion; terminal.
    Cancelled,
}

impl TandaStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TandaStatus::Closed | TandaStatus::Cancelled)
    }
}

impl fmt::Display for TandaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TandaStatus::Pending => "PENDING",
            TandaStatus::Active => "ACTIVE",
            TandaStatus::Closed => "CLOSED",
            TandaStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// How often contributions are due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Periodicity {
    Weekly,
    Biweekly,
    Monthly,
}

impl Periodicity {
    /// Days between consecutive due dates.
    pub fn interval_days(&self) -> i64 {
        match self {
            Periodicity::Weekly => 7,
            Periodicity::Biweekly => 14,
            Periodicity::Monthly => 30,
        }
    }
}

impl FromStr for Periodicity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weekly" => Ok(Periodicity::Weekly),
            "biweekly" => Ok(Periodicity::Biweekly),
            "monthly" => Ok(Periodicity::Monthly),
            other => Err(ValidationError::invalid_format(
                "periodicity",
                format!("expected weekly, biweekly or monthly, got '{}'", other),
            )),
        }
    }
}

/// Investment horizon of the safety fund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PoolType {
    Short,
    Long,
}

impl PoolType {
    /// SHORT up to nine months, LONG beyond.
    pub fn for_duration(duration_months: u32) -> Self {
        if duration_months <= SHORT_POOL_MAX_MONTHS {
            PoolType::Short
        } else {
            PoolType::Long
        }
    }
}

/// Role a participant holds in a tanda.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantRole {
    Organizer,
    Member,
    /// Joined through a replacement code, awaiting a validated payment.
    ReplacementPending,
}

/// How the turn order was decided at activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnOrderMethod {
    Random,
    Manual,
}

/// Derived view of a tanda.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tanda {
    pub id: TandaId,
    pub name: String,
    pub organizer_id: UserId,
    pub contribution_amount: i64,
    pub number_of_participants: u32,
    pub periodicity: Periodicity,
    pub duration_months: u32,
    pub pool_type: PoolType,
    pub invite_code: String,
    pub status: TandaStatus,
    pub created_at: Timestamp,
    pub required_initial_fund: i64,
    pub current_participants: u32,
    pub fund_collected: i64,
}

impl Tanda {
    pub fn is_full(&self) -> bool {
        self.current_participants >= self.number_of_participants
    }
}
