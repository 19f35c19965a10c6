//! Payment reminder stages around a round's due date.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::Timestamp;

use super::policy::GRACE_DAYS;

/// The four reminder stages of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReminderStage {
    /// One day before the due date.
    E1,
    /// On the due day.
    E2,
    /// First day of grace.
    E3,
    /// Last day of grace.
    E4,
}

impl ReminderStage {
    pub const ALL: [ReminderStage; 4] = [
        ReminderStage::E1,
        ReminderStage::E2,
        ReminderStage::E3,
        ReminderStage::E4,
    ];

    /// Stage whose half-open window `[start, end)` contains `now`, if any.
    pub fn at(due_date: Timestamp, now: Timestamp) -> Option<Self> {
        Self::ALL.into_iter().find(|stage| {
            let (start, end) = stage.window(due_date);
            !now.is_before(&start) && now.is_before(&end)
        })
    }

    fn window(&self, due: Timestamp) -> (Timestamp, Timestamp) {
        match self {
            ReminderStage::E1 => (due.minus_days(1), due),
            ReminderStage::E2 => (due, due.add_days(1)),
            ReminderStage::E3 => (due.add_days(1), due.add_days(2)),
            ReminderStage::E4 => {
                let grace_end = due.add_days(GRACE_DAYS);
                (grace_end.minus_days(1), grace_end)
            }
        }
    }

    /// Text delivered to the participant.
    pub fn message(&self, round: u32, contribution: i64) -> String {
        match self {
            ReminderStage::E1 => format!(
                "Payment reminder: your contribution for period {} is due tomorrow.\nAmount: ${}\n\nReply PAY to pay or STATUS for details.",
                round, contribution
            ),
            ReminderStage::E2 => format!(
                "Your contribution for period {} is due today.\nAmount: ${}\n\nReply PAY to pay now or STATUS for details.",
                round, contribution
            ),
            ReminderStage::E3 => format!(
                "We have not received your payment for period {}.\nPay within the {}-day grace window to keep your standing.\n\nReply PAY or STATUS.",
                round, GRACE_DAYS
            ),
            ReminderStage::E4 => format!(
                "Today is the last grace day for period {}. Unpaid periods then count against your coverage limit.\n\nReply PAY now or STATUS for details.",
                round
            ),
        }
    }
}

impl fmt::Display for ReminderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReminderStage::E1 => "E1",
            ReminderStage::E2 => "E2",
            ReminderStage::E3 => "E3",
            ReminderStage::E4 => "E4",
        };
        f.write_str(s)
    }
}

/// Write-once markers for one (tanda, user, round).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderFlags {
    pub sent_e1: bool,
    pub sent_e2: bool,
    pub sent_e3: bool,
    pub sent_e4: bool,
}

impl ReminderFlags {
    pub fn is_sent(&self, stage: ReminderStage) -> bool {
        match stage {
            ReminderStage::E1 => self.sent_e1,
            ReminderStage::E2 => self.sent_e2,
            ReminderStage::E3 => self.sent_e3,
            ReminderStage::E4 => self.sent_e4,
        }
    }

    pub fn mark(&mut self, stage: ReminderStage) {
        match stage {
            ReminderStage::E1 => self.sent_e1 = true,
            ReminderStage::E2 => self.sent_e2 = true,
            ReminderStage::E3 => self.sent_e3 = true,
            ReminderStage::E4 => self.sent_e4 = true,
        }
    }
}

/// Payment counts for the round currently being collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizerSummary {
    pub round: u32,
    pub unpaid: usize,
    pub in_grace: usize,
    pub late: usize,
}

impl OrganizerSummary {
    pub fn message(&self) -> String {
        format!(
            "Payment summary (period {})\nPending: {}\nIn grace: {}\nLate: {}\n\nReply STATUS for the full panel.",
            self.round, self.unpaid, self.in_grace, self.late
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUE: i64 = 10 * 24 * 60 * 60 * 1000;

    fn due() -> Timestamp {
        Timestamp::from_millis(DUE)
    }

    #[test]
    fn stage_windows_follow_due_date() {
        assert_eq!(ReminderStage::at(due(), due().minus_days(2)), None);
        assert_eq!(ReminderStage::at(due(), due().add_hours(-12)), Some(ReminderStage::E1));
        assert_eq!(ReminderStage::at(due(), due()), Some(ReminderStage::E2));
        assert_eq!(ReminderStage::at(due(), due().add_hours(30)), Some(ReminderStage::E3));
        assert_eq!(ReminderStage::at(due(), due().add_hours(60)), Some(ReminderStage::E4));
        assert_eq!(ReminderStage::at(due(), due().add_days(3)), None);
    }

    #[test]
    fn flags_are_marked_per_stage() {
        let mut flags = ReminderFlags::default();
        assert!(!flags.is_sent(ReminderStage::E3));
        flags.mark(ReminderStage::E3);
        assert!(flags.is_sent(ReminderStage::E3));
        assert!(!flags.is_sent(ReminderStage::E4));
    }

    #[test]
    fn messages_mention_round() {
        assert!(ReminderStage::E2.message(4, 1000).contains("period 4"));
        assert!(ReminderStage::E1.message(1, 250).contains("$250"));
    }
}
