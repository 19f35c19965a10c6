//! Scheduler sweeps - Deadline checks that append facts when a threshold
//! is crossed.
//!
//! Each sweep is a plain callable unit: it reads the current time from the
//! context clock, replays every active tanda under that tanda's lock, and
//! appends only what no earlier pass already recorded. Running a sweep twice
//! without the clock moving appends nothing the second time.
//!
//! `SweepRunner` hosts the three sweeps on an interval; callers that bring
//! their own timer can invoke the sweeps directly.

mod late_payments;
mod regularization;
mod reminders;
mod runner;

pub use late_payments::{LatePaymentSweep, LateSweepReport};
pub use regularization::{RegularizationSweep, WindowSweepReport};
pub use reminders::{ReminderSweep, ReminderSweepReport};
pub use runner::{SweepConfig, SweepRunner, SweepSummary};

use std::collections::BTreeSet;

use crate::domain::foundation::TandaId;
use crate::domain::ledger::EventType;
use crate::domain::tanda::TandaError;

use super::context::LedgerContext;

/// Tandas that were activated and not yet closed, in activation order.
pub(crate) async fn active_tandas(ctx: &LedgerContext) -> Result<Vec<TandaId>, TandaError> {
    let closed: BTreeSet<TandaId> = ctx
        .events
        .all_of_type(EventType::TandaClosed)
        .await?
        .iter()
        .filter_map(|e| e.tanda_id)
        .collect();

    let mut seen = BTreeSet::new();
    Ok(ctx
        .events
        .all_of_type(EventType::TandaActivated)
        .await?
        .iter()
        .filter_map(|e| e.tanda_id)
        .filter(|id| !closed.contains(id))
        .filter(|id| seen.insert(*id))
        .collect())
}
