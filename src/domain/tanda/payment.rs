//! Payment timing and standing classifications.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::Timestamp;

use super::ScheduleEntry;

/// When a periodic payment arrived relative to its round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentTiming {
    OnTime,
    Grace,
    Late,
}

impl PaymentTiming {
    /// Classifies `now` against a round's due date and grace end (both inclusive).
    pub fn classify(entry: &ScheduleEntry, now: Timestamp) -> Self {
        if !now.is_after(&entry.due_date) {
            PaymentTiming::OnTime
        } else if !now.is_after(&entry.grace_end()) {
            PaymentTiming::Grace
        } else {
            PaymentTiming::Late
        }
    }
}

impl fmt::Display for PaymentTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentTiming::OnTime => "ON_TIME",
            PaymentTiming::Grace => "GRACE",
            PaymentTiming::Late => "LATE",
        };
        f.write_str(s)
    }
}

/// Standing of a participant across all rounds due so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserPaymentStatus {
    Current,
    InGrace,
    Late,
    Replaced,
}

impl UserPaymentStatus {
    pub fn label(&self) -> &'static str {
        match self {
            UserPaymentStatus::Current => "Up to date",
            UserPaymentStatus::InGrace => "Payment pending",
            UserPaymentStatus::Late => "Late (covered by the fund)",
            UserPaymentStatus::Replaced => "Replaced after default",
        }
    }
}

impl fmt::Display for UserPaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UserPaymentStatus::Current => "CURRENT",
            UserPaymentStatus::InGrace => "IN_GRACE",
            UserPaymentStatus::Late => "LATE",
            UserPaymentStatus::Replaced => "REPLACED",
        };
        f.write_str(s)
    }
}

/// Status of a single unpaid past-due round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodStatus {
    Unpaid,
    InGrace,
    Late,
    Covered,
}

/// An unpaid round reported by `TandaHistory::pending_periods`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPeriod {
    pub round: u32,
    pub status: PeriodStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;

    fn entry(due: i64) -> ScheduleEntry {
        ScheduleEntry {
            round: 1,
            user_id: UserId::new("u").unwrap(),
            due_date: Timestamp::from_millis(due),
        }
    }

    #[test]
    fn on_time_up_to_and_including_due_date() {
        let e = entry(1_000_000);
        assert_eq!(PaymentTiming::classify(&e, Timestamp::from_millis(0)), PaymentTiming::OnTime);
        assert_eq!(PaymentTiming::classify(&e, e.due_date), PaymentTiming::OnTime);
    }

    #[test]
    fn grace_until_grace_end() {
        let e = entry(1_000_000);
        assert_eq!(PaymentTiming::classify(&e, e.due_date.add_hours(1)), PaymentTiming::Grace);
        assert_eq!(PaymentTiming::classify(&e, e.grace_end()), PaymentTiming::Grace);
    }

    #[test]
    fn late_after_grace_end() {
        let e = entry(1_000_000);
        assert_eq!(
            PaymentTiming::classify(&e, e.grace_end().add_hours(1)),
            PaymentTiming::Late
        );
    }

    #[test]
    fn statuses_render_wire_names() {
        assert_eq!(UserPaymentStatus::InGrace.to_string(), "IN_GRACE");
        assert_eq!(PaymentTiming::OnTime.to_string(), "ON_TIME");
        assert_eq!(
            serde_json::to_string(&PeriodStatus::Covered).unwrap(),
            "\"COVERED\""
        );
    }
}
