//! Lifecycle command handlers.
//!
//! Every handler takes the tanda lock, replays the tanda's events into a
//! `TandaHistory`, decides, and appends. Results carry a `reply()` text that
//! a messaging transport can send back unchanged.

mod assign_turn_order;
mod close_tanda;
mod create_tanda;
mod join_tanda;
mod pay_periodic;
mod record_payment_proof;
mod replace_participant;
mod resolve_default;
mod validate_payment;

pub use assign_turn_order::{AssignTurnOrderCommand, AssignTurnOrderHandler, AssignTurnOrderResult};
pub use close_tanda::{CloseTandaCommand, CloseTandaHandler, CloseTandaResult, ClosureOutcome};
pub use create_tanda::{CreateTandaCommand, CreateTandaHandler, CreateTandaResult};
pub use join_tanda::{JoinTandaCommand, JoinTandaHandler, JoinTandaResult, JoinedAs};
pub use pay_periodic::{PayPeriodicCommand, PayPeriodicHandler, PayPeriodicResult};
pub use record_payment_proof::{
    RecordPaymentProofCommand, RecordPaymentProofHandler, RecordPaymentProofResult,
};
pub use replace_participant::{
    ReplaceParticipantCommand, ReplaceParticipantHandler, ReplaceParticipantResult,
};
pub use resolve_default::{
    DefaultResolution, ResolveDefaultCommand, ResolveDefaultHandler, ResolveDefaultResult,
};
pub use validate_payment::{
    PaymentApplication, ValidatePaymentCommand, ValidatePaymentHandler, ValidatePaymentResult,
};

use crate::domain::foundation::UserId;
use crate::domain::tanda::{TandaError, TandaHistory};

use super::context::LedgerContext;

fn require_organizer(history: &TandaHistory<'_>, user: &UserId) -> Result<(), TandaError> {
    match history.organizer() {
        Some(organizer) if organizer == user => Ok(()),
        _ => Err(TandaError::NotOrganizer(user.clone())),
    }
}

async fn require_unblocked(ctx: &LedgerContext, user: &UserId) -> Result<(), TandaError> {
    if ctx.block_status(user).await?.is_blocked() {
        tracing::info!(user_id = %user, "Blocked user refused");
        return Err(TandaError::UserBlocked(user.clone()));
    }
    Ok(())
}
