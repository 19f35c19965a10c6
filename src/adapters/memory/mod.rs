//! In-memory adapters for every storage port.
//!
//! Backed by `std::sync::RwLock`; a poisoned lock surfaces as an
//! `InternalError` instead of a panic.

mod event_store;
mod fund_layer_repository;
mod reminder_flag_repository;
mod replacement_invite_repository;

pub use event_store::InMemoryEventStore;
pub use fund_layer_repository::InMemoryFundLayerRepository;
pub use reminder_flag_repository::InMemoryReminderFlagRepository;
pub use replacement_invite_repository::InMemoryReplacementInviteRepository;
