//! Cross-tanda standing of a user.
//!
//! A `DefaultConfirmed` stays unresolved until the same user has a
//! `ContributionRegularized` for that tanda and round, a `DefaultReversed`
//! in that tanda, or a `ParticipantRemoved` in that tanda. Any unresolved
//! default blocks the user from creating or joining tandas.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{TandaId, UserId};
use crate::domain::ledger::{EventType, LedgerEvent, TandaEvent};

/// A confirmed default that nothing has resolved yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedDefault {
    pub tanda_id: TandaId,
    pub round: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockStatus {
    Clear,
    Blocked(UnresolvedDefault),
}

impl BlockStatus {
    pub fn is_blocked(&self) -> bool {
        matches!(self, BlockStatus::Blocked(_))
    }
}

/// Unresolved defaults of `user` within `events`.
///
/// Works on a per-user slice (all tandas) as well as a per-tanda slice.
pub fn unresolved_defaults(events: &[LedgerEvent], user: &UserId) -> Vec<UnresolvedDefault> {
    let mine = || events.iter().filter(move |e| e.is_by(user));

    mine()
        .filter_map(|e| match (&e.event, e.tanda_id) {
            (TandaEvent::DefaultConfirmed(p), Some(tanda_id)) => Some(UnresolvedDefault {
                tanda_id,
                round: p.round,
            }),
            _ => None,
        })
        .filter(|d| {
            !mine().any(|e| {
                e.tanda_id == Some(d.tanda_id)
                    && match e.event_type() {
                        EventType::ContributionRegularized => e.round() == Some(d.round),
                        EventType::DefaultReversed | EventType::ParticipantRemoved => true,
                        _ => false,
                    }
            })
        })
        .collect()
}

pub fn block_status(events: &[LedgerEvent], user: &UserId) -> BlockStatus {
    match unresolved_defaults(events, user).into_iter().next() {
        Some(d) => BlockStatus::Blocked(d),
        None => BlockStatus::Clear,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;
    use crate::domain::ledger::events::{
        ContributionRegularized, DefaultConfirmed, DefaultReversed, ParticipantRemoved,
    };
    use crate::domain::ledger::DefaultReason;

    fn user() -> UserId {
        UserId::new("521555000").unwrap()
    }

    fn on(tanda: TandaId, event: TandaEvent) -> LedgerEvent {
        LedgerEvent::new(event, Timestamp::from_millis(0))
            .for_tanda(tanda)
            .by_user(user())
    }

    fn default_in(tanda: TandaId, round: u32) -> LedgerEvent {
        on(
            tanda,
            TandaEvent::DefaultConfirmed(DefaultConfirmed {
                round,
                reason: DefaultReason::WindowExpired,
            }),
        )
    }

    #[test]
    fn no_defaults_means_clear() {
        assert_eq!(block_status(&[], &user()), BlockStatus::Clear);
    }

    #[test]
    fn open_default_blocks() {
        let tanda = TandaId::new();
        let status = block_status(&[default_in(tanda, 2)], &user());
        assert_eq!(
            status,
            BlockStatus::Blocked(UnresolvedDefault { tanda_id: tanda, round: 2 })
        );
    }

    #[test]
    fn regularization_must_match_round() {
        let tanda = TandaId::new();
        let wrong_round = on(
            tanda,
            TandaEvent::ContributionRegularized(ContributionRegularized {
                round: 1,
                coverage_repaid: true,
            }),
        );
        assert!(block_status(&[default_in(tanda, 2), wrong_round.clone()], &user()).is_blocked());

        let right_round = on(
            tanda,
            TandaEvent::ContributionRegularized(ContributionRegularized {
                round: 2,
                coverage_repaid: true,
            }),
        );
        assert!(!block_status(&[default_in(tanda, 2), right_round], &user()).is_blocked());
    }

    #[test]
    fn reversal_or_removal_resolve_defaults_of_that_tanda_only() {
        let a = TandaId::new();
        let b = TandaId::new();
        let reversed = on(
            a,
            TandaEvent::DefaultReversed(DefaultReversed {
                organizer_id: UserId::new("org").unwrap(),
                reason: "paid in cash".to_string(),
            }),
        );
        let events = vec![default_in(a, 1), default_in(b, 3), reversed];
        assert_eq!(
            unresolved_defaults(&events, &user()),
            vec![UnresolvedDefault { tanda_id: b, round: 3 }]
        );

        let removed = on(
            b,
            TandaEvent::ParticipantRemoved(ParticipantRemoved {
                reason: "DEFAULT".to_string(),
            }),
        );
        let mut events = events;
        events.push(removed);
        assert!(!block_status(&events, &user()).is_blocked());
    }

    #[test]
    fn other_users_events_do_not_resolve() {
        let tanda = TandaId::new();
        let other = LedgerEvent::new(
            TandaEvent::DefaultReversed(DefaultReversed {
                organizer_id: UserId::new("org").unwrap(),
                reason: "x".to_string(),
            }),
            Timestamp::from_millis(0),
        )
        .for_tanda(tanda)
        .by_user(UserId::new("someone-else").unwrap());
        assert!(block_status(&[default_in(tanda, 1), other], &user()).is_blocked());
    }
}
