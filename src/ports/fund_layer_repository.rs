//! FundLayerRepository port - Mutable balance table of the safety fund tiers.
//!
//! The table is a secondary index of the ledger: the lifecycle writes it
//! together with `FundLayerAllocated`/`FundLayerUsed`/`FundLayerRestored`
//! under the tanda lock, and `reconcile` rebuilds it from those events.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, TandaId};
use crate::domain::tanda::FundLayers;

#[async_trait]
pub trait FundLayerRepository: Send + Sync {
    /// Current balances, or `None` if the tanda's layers were never allocated.
    async fn find(&self, tanda_id: &TandaId) -> Result<Option<FundLayers>, DomainError>;

    /// Insert or overwrite the row for `tanda_id`.
    async fn save(&self, tanda_id: &TandaId, layers: &FundLayers) -> Result<(), DomainError>;
}
