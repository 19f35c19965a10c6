//! Closed enumeration of ledger event names.
//!
//! The string form is what lands in the `type` column of the events table,
//! so renaming a variant is a data migration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

macro_rules! event_types {
    ($($variant:ident),+ $(,)?) => {
        /// Every kind of fact the ledger can record.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum EventType {
            $($variant),+
        }

        impl EventType {
            /// All event types, in declaration order.
            pub const ALL: &'static [EventType] = &[$(EventType::$variant),+];

            /// Persisted name of the event type.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(EventType::$variant => stringify!($variant)),+
                }
            }
        }

        impl FromStr for EventType {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($variant) => Ok(EventType::$variant),)+
                    other => Err(ValidationError::invalid_format(
                        "event_type",
                        format!("unknown event type '{}'", other),
                    )),
                }
            }
        }
    };
}

event_types!(
    // Creation and membership
    TandaCreated,
    ParticipantInvited,
    ParticipantConfirmed,
    // Initial fund
    ProofReceived,
    PaymentValidated,
    PaymentRejected,
    InitialFundDeposited,
    InitialFundCompleted,
    // Activation
    TurnOrderAssigned,
    CalendarCreated,
    TandaActivated,
    // Periodic payments
    ContributionReceived,
    PeriodicPaymentRecorded,
    CoverageRepaid,
    // Late payments and coverage
    ContributionLate,
    PoolCovered,
    RegularizationWindowStarted,
    WindowReminderSent,
    WindowFinalNoticeSent,
    ContributionRegularized,
    CoverageRestored,
    DefaultConfirmed,
    // Replacement
    ParticipantRemoved,
    ReplacementCodeCreated,
    ReplacementJoined,
    ReplacementConfirmed,
    ReplacementNotAllowed,
    // Post-turn recovery
    RecoveryModeStarted,
    UserNoteRegistered,
    DefaultReversed,
    UserUnblocked,
    // Fund layers
    FundLayerAllocated,
    FundLayerUsed,
    FundLayerRestored,
    // Closure
    YieldCalculated,
    YieldNotDistributed,
    RaffleDrawn,
    RaffleWinnerSelected,
    YieldAwarded,
    TandaClosed,
);

impl EventType {
    /// Event types that settle a round's contribution for a user.
    pub fn settles_round(&self) -> bool {
        matches!(
            self,
            EventType::ContributionReceived
                | EventType::PeriodicPaymentRecorded
                | EventType::ContributionRegularized
        )
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
