//! Tanda module - Rotating savings group rules.
//!
//! - `entity` - the tanda view and its enums
//! - `calendar` - payout schedule built at activation
//! - `payment` - payment timing and standing classifications
//! - `fund_layers` - four-tier safety fund accounting
//! - `raffle` - deterministic closure raffle
//! - `replacement` - replacement invites and eligibility
//! - `reminders` - E1..E4 payment reminder stages
//! - `standing` - cross-tanda default block rule
//! - `projection` - `TandaHistory`, the replay of a tanda's events
//! - `views` - read-model shapes

mod calendar;
mod entity;
mod errors;
mod fund_layers;
mod payment;
pub mod policy;
mod projection;
pub mod raffle;
mod reminders;
mod replacement;
mod standing;
mod views;

pub use calendar::{Calendar, ScheduleEntry};
pub use entity::{ParticipantRole, Periodicity, PoolType, Tanda, TandaStatus, TurnOrderMethod};
pub use errors::{ErrorKind, TandaError};
pub use fund_layers::{FundLayerError, FundLayers, LayerMovement, TIER_COUNT};
pub use payment::{PaymentTiming, PendingPeriod, PeriodStatus, UserPaymentStatus};
pub use projection::TandaHistory;
pub use raffle::{RaffleInput, RaffleOutcome};
pub use reminders::{OrganizerSummary, ReminderFlags, ReminderStage};
pub use replacement::{
    generate_code, generate_invite_code, IneligibleReason, InviteStatus, ReplacementEligibility,
    ReplacementInvite,
};
pub use standing::{block_status, unresolved_defaults, BlockStatus, UnresolvedDefault};
pub use views::{
    is_displayable, CurrentPeriod, FundHealth, FundStatus, LedgerCategory, OpenWindow, Readiness,
    TandaSummary,
};
