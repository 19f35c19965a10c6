//! Ledger module - The append-only record of tanda facts.
//!
//! - `EventType` - closed set of fact names, persisted as strings
//! - `TandaEvent` - typed payload per fact
//! - `LedgerEvent` - the stored row (id, time, optional columns, event)

mod event_type;
pub mod events;
mod record;

pub use event_type::EventType;
pub use events::{DefaultReason, TandaEvent};
pub use record::LedgerEvent;
