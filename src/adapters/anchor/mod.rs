//! Anchoring side-channel.
//!
//! - `AnchoredEventStore` - Fire-and-forget hook after each append
//! - `DryRunAnchor` - Salted digests for the milestone events, logged only

mod dry_run;
mod store;

pub use dry_run::{anchor_type, AnchorRecord, DryRunAnchor};
pub use store::AnchoredEventStore;
