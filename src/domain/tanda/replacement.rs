//! Replacement of a defaulted participant through a single-use code.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::foundation::{TandaId, Timestamp, UserId, ValidationError};

use super::policy::{INVITE_CODE_LEN, REPLACEMENT_CODE_LEN};

/// Lifecycle of a replacement invite. ACTIVE until the joiner's payment is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InviteStatus {
    Active,
    Used,
}

impl InviteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InviteStatus::Active => "ACTIVE",
            InviteStatus::Used => "USED",
        }
    }
}

impl FromStr for InviteStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(InviteStatus::Active),
            "USED" => Ok(InviteStatus::Used),
            other => Err(ValidationError::invalid_format(
                "invite_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

/// A code that lets a newcomer take over a removed participant's slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementInvite {
    pub code: String,
    pub tanda_id: TandaId,
    pub replaced_user_id: UserId,
    pub status: InviteStatus,
    pub used_by_user_id: Option<UserId>,
    pub created_at: Timestamp,
}

impl ReplacementInvite {
    pub fn issue(tanda_id: TandaId, replaced_user_id: UserId, now: Timestamp) -> Self {
        Self {
            code: generate_code(REPLACEMENT_CODE_LEN),
            tanda_id,
            replaced_user_id,
            status: InviteStatus::Active,
            used_by_user_id: None,
            created_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == InviteStatus::Active
    }

    /// Binds the invite to the user who redeemed the code.
    pub fn claim(&mut self, joiner: UserId) {
        self.used_by_user_id = Some(joiner);
    }

    pub fn mark_used(&mut self) {
        self.status = InviteStatus::Used;
    }
}

/// Why an expulsion-and-replacement request cannot proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IneligibleReason {
    NotInDefault,
    NoCalendar,
    TurnNotFound,
    AlreadyReceivedTurn,
}

impl IneligibleReason {
    /// Reason code as recorded in `ReplacementNotAllowed`.
    pub fn code(&self) -> &'static str {
        match self {
            IneligibleReason::NotInDefault => "User not in default",
            IneligibleReason::NoCalendar => "No calendar",
            IneligibleReason::TurnNotFound => "Turn not found",
            IneligibleReason::AlreadyReceivedTurn => "ALREADY_RECEIVED_TURN",
        }
    }
}

impl fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Outcome of `TandaHistory::replacement_eligibility`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplacementEligibility {
    Eligible { turn_date: Timestamp },
    Ineligible(IneligibleReason),
}

impl ReplacementEligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, ReplacementEligibility::Eligible { .. })
    }

    pub fn reason(&self) -> Option<IneligibleReason> {
        match self {
            ReplacementEligibility::Eligible { .. } => None,
            ReplacementEligibility::Ineligible(reason) => Some(*reason),
        }
    }
}

/// Uppercase code cut from a fresh uuid.
pub fn generate_code(len: usize) -> String {
    let raw = Uuid::new_v4().simple().to_string();
    raw[..len.min(raw.len())].to_uppercase()
}

/// Code handed out when a tanda is created.
pub fn generate_invite_code() -> String {
    generate_code(INVITE_CODE_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_are_uppercase_hex_of_requested_length() {
        let code = generate_invite_code();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));

        let code = generate_code(REPLACEMENT_CODE_LEN);
        assert_eq!(code.len(), 8);
    }

    #[test]
    fn issued_invite_is_active_and_unbound() {
        let invite = ReplacementInvite::issue(
            TandaId::new(),
            UserId::new("gone").unwrap(),
            Timestamp::from_millis(0),
        );
        assert!(invite.is_active());
        assert!(invite.used_by_user_id.is_none());
    }

    #[test]
    fn claim_then_use_transitions_invite() {
        let mut invite = ReplacementInvite::issue(
            TandaId::new(),
            UserId::new("gone").unwrap(),
            Timestamp::from_millis(0),
        );
        invite.claim(UserId::new("new").unwrap());
        assert!(invite.is_active());
        invite.mark_used();
        assert_eq!(invite.status, InviteStatus::Used);
        assert_eq!(invite.used_by_user_id.unwrap().as_str(), "new");
    }

    #[test]
    fn status_parses_from_column_value() {
        assert_eq!("USED".parse::<InviteStatus>().unwrap(), InviteStatus::Used);
        assert!("EXPIRED".parse::<InviteStatus>().is_err());
    }

    #[test]
    fn reason_codes_match_recorded_values() {
        assert_eq!(IneligibleReason::AlreadyReceivedTurn.code(), "ALREADY_RECEIVED_TURN");
        assert_eq!(IneligibleReason::NotInDefault.to_string(), "User not in default");
        assert_eq!(
            ReplacementEligibility::Ineligible(IneligibleReason::NoCalendar).reason(),
            Some(IneligibleReason::NoCalendar)
        );
    }
}
