//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamp, errors)
//! - `ledger` - Event types, typed payloads and the stored ledger record
//! - `tanda` - Lifecycle rules, fund layers, raffle and the replay projection

pub mod foundation;
pub mod ledger;
pub mod tanda;
