//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `memory` - In-process stores for tests and local runs
//! - `postgres` - sqlx-backed stores
//! - `anchor` - Event anchoring side-channel
//! - `notify` - Notifier implementations
//! - `clock` - Settable `mockable::Clock`

pub mod anchor;
pub mod clock;
pub mod memory;
pub mod notify;
pub mod postgres;

pub use anchor::{AnchoredEventStore, DryRunAnchor};
pub use clock::MutableClock;
pub use memory::{
    InMemoryEventStore, InMemoryFundLayerRepository, InMemoryReminderFlagRepository,
    InMemoryReplacementInviteRepository,
};
pub use notify::{RecordingNotifier, TracingNotifier};
