//! Tanda Ledger - Event-sourced ledger and lifecycle engine for rotating
//! savings groups.
//!
//! Every fact about a tanda (joins, payments, fund movements, defaults,
//! closure) is an immutable ledger event. State is never stored; it is
//! replayed from the events by the `TandaHistory` projection.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
