//! Payout calendar generated once at activation.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, UserId};

use super::policy::GRACE_DAYS;
use super::Periodicity;

/// One scheduled round: who receives the payout and when contributions are due.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub round: u32,
    pub user_id: UserId,
    pub due_date: Timestamp,
}

impl ScheduleEntry {
    /// Last instant a payment for this round still counts as in grace.
    pub fn grace_end(&self) -> Timestamp {
        self.due_date.add_days(GRACE_DAYS)
    }
}

/// Ordered rounds `1..=N`, one per participant, with increasing due dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Calendar {
    entries: Vec<ScheduleEntry>,
}

impl Calendar {
    /// Builds the schedule for a turn order.
    ///
    /// Round `k` falls due `k` intervals after `start`.
    pub fn build(order: &[UserId], periodicity: Periodicity, start: Timestamp) -> Self {
        let interval = periodicity.interval_days();
        let entries = order
            .iter()
            .enumerate()
            .map(|(index, user_id)| {
                let offset = interval * (index as i64 + 1);
                ScheduleEntry {
                    round: index as u32 + 1,
                    user_id: user_id.clone(),
                    due_date: start.add_days(offset),
                }
            })
            .collect();
        Self { entries }
    }

    /// Wraps entries read back from a `CalendarCreated` payload.
    pub fn from_entries(entries: Vec<ScheduleEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn round(&self, round: u32) -> Option<&ScheduleEntry> {
        self.entries.iter().find(|e| e.round == round)
    }

    /// The round in which `user` receives the payout.
    pub fn turn_of(&self, user: &UserId) -> Option<&ScheduleEntry> {
        self.entries.iter().find(|e| &e.user_id == user)
    }

    pub fn last(&self) -> Option<&ScheduleEntry> {
        self.entries.last()
    }

    /// Rounds whose due date is strictly before `now`.
    pub fn past_due(&self, now: Timestamp) -> impl Iterator<Item = &ScheduleEntry> {
        self.entries.iter().filter(move |e| e.due_date.is_before(&now))
    }

    /// First round still ahead of `now`, or the last round once all have passed.
    pub fn current(&self, now: Timestamp) -> Option<&ScheduleEntry> {
        self.entries
            .iter()
            .find(|e| e.due_date.is_after(&now))
            .or_else(|| self.entries.last())
    }

    /// Most recent round already due at `now`, or the first round before any is due.
    pub fn latest_due(&self, now: Timestamp) -> Option<&ScheduleEntry> {
        self.entries
            .iter()
            .rev()
            .find(|e| !now.is_before(&e.due_date))
            .or_else(|| self.entries.first())
    }

    /// Invariant check: rounds numbered 1..N with strictly increasing due dates.
    pub fn is_well_formed(&self) -> bool {
        self.entries.iter().enumerate().all(|(i, e)| e.round == i as u32 + 1)
            && self
                .entries
                .windows(2)
                .all(|w| w[0].due_date.is_before(&w[1].due_date))
    }
}
