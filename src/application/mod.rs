//! Application layer - Commands, Queries, and Sweeps.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Following CQRS, it separates lifecycle command handlers (write) from
//! query handlers (read). Scheduler sweeps are write-side units driven by
//! the clock instead of a participant.

mod context;
mod coverage;
mod fund_ledger;
pub mod lifecycle;
mod locks;
pub mod queries;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;

pub use context::LedgerContext;
pub use fund_ledger::{DrawOutcome, DrawPlan, FundLedger, PendingDraw, Reconciliation};
pub use locks::{TandaGuard, TandaLocks};
