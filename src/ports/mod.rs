//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Ledger Ports
//!
//! - `EventStore` - Append-only log, the single source of truth
//! - `EventAnchor` - Best-effort mirror of appended events
//!
//! ## Auxiliary Tables
//!
//! - `FundLayerRepository` - Tier balances kept beside fund-layer events
//! - `ReplacementInviteRepository` - Single-use replacement codes
//! - `ReminderFlagRepository` - Idempotency markers for payment reminders
//!
//! ## Collaborators
//!
//! - `Notifier` - Outbound messages to participants

mod event_anchor;
mod event_store;
mod fund_layer_repository;
mod notifier;
mod reminder_flag_repository;
mod replacement_invite_repository;

pub use event_anchor::EventAnchor;
pub use event_store::EventStore;
pub use fund_layer_repository::FundLayerRepository;
pub use notifier::Notifier;
pub use reminder_flag_repository::ReminderFlagRepository;
pub use replacement_invite_repository::ReplacementInviteRepository;
