//! In-memory fund layer table.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::foundation::{DomainError, TandaId};
use crate::domain::tanda::FundLayers;
use crate::ports::FundLayerRepository;

#[derive(Default)]
pub struct InMemoryFundLayerRepository {
    rows: RwLock<HashMap<TandaId, FundLayers>>,
}

impl InMemoryFundLayerRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FundLayerRepository for InMemoryFundLayerRepository {
    async fn find(&self, tanda_id: &TandaId) -> Result<Option<FundLayers>, DomainError> {
        let rows = self
            .rows
            .read()
            .map_err(|_| DomainError::lock_poisoned("InMemoryFundLayerRepository"))?;
        Ok(rows.get(tanda_id).copied())
    }

    async fn save(&self, tanda_id: &TandaId, layers: &FundLayers) -> Result<(), DomainError> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| DomainError::lock_poisoned("InMemoryFundLayerRepository"))?;
        rows.insert(*tanda_id, *layers);
        Ok(())
    }
}
