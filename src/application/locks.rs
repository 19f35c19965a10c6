//! Per-tanda serialization point.
//!
//! Every read-decide-append sequence on a tanda runs while holding that
//! tanda's lock, so existence checks and fund-layer read-modify-writes
//! cannot interleave.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::foundation::{DomainError, TandaId};

/// Registry of one async mutex per tanda id.
#[derive(Default)]
pub struct TandaLocks {
    locks: Mutex<HashMap<TandaId, Arc<AsyncMutex<()>>>>,
}

/// Held for the duration of one decision on a tanda.
pub type TandaGuard = OwnedMutexGuard<()>;

impl TandaLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other decision holds `tanda_id`.
    ///
    /// Entries that nobody holds or waits on are dropped on the way in, so
    /// the registry only grows with concurrent tandas.
    pub async fn acquire(&self, tanda_id: TandaId) -> Result<TandaGuard, DomainError> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .map_err(|_| DomainError::lock_poisoned("TandaLocks"))?;
            locks.retain(|id, lock| *id == tanda_id || Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(tanda_id).or_default())
        };
        Ok(lock.lock_owned().await)
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }
}
