//! In-memory reminder flags.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::foundation::{DomainError, TandaId, UserId};
use crate::domain::tanda::{ReminderFlags, ReminderStage};
use crate::ports::ReminderFlagRepository;

type FlagKey = (TandaId, UserId, u32);

#[derive(Default)]
pub struct InMemoryReminderFlagRepository {
    flags: RwLock<HashMap<FlagKey, ReminderFlags>>,
}

impl InMemoryReminderFlagRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReminderFlagRepository for InMemoryReminderFlagRepository {
    async fn get(
        &self,
        tanda_id: &TandaId,
        user_id: &UserId,
        round: u32,
    ) -> Result<ReminderFlags, DomainError> {
        let flags = self
            .flags
            .read()
            .map_err(|_| DomainError::lock_poisoned("InMemoryReminderFlagRepository"))?;
        Ok(flags
            .get(&(*tanda_id, user_id.clone(), round))
            .copied()
            .unwrap_or_default())
    }

    async fn mark(
        &self,
        tanda_id: &TandaId,
        user_id: &UserId,
        round: u32,
        stage: ReminderStage,
    ) -> Result<(), DomainError> {
        let mut flags = self
            .flags
            .write()
            .map_err(|_| DomainError::lock_poisoned("InMemoryReminderFlagRepository"))?;
        flags
            .entry((*tanda_id, user_id.clone(), round))
            .or_default()
            .mark(stage);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn flags_are_scoped_per_round() {
        let repo = InMemoryReminderFlagRepository::new();
        let tanda = TandaId::new();
        let user = UserId::new("521333").unwrap();

        repo.mark(&tanda, &user, 1, ReminderStage::E2).await.unwrap();
        repo.mark(&tanda, &user, 1, ReminderStage::E2).await.unwrap();

        let round_one = repo.get(&tanda, &user, 1).await.unwrap();
        assert!(round_one.is_sent(ReminderStage::E2));
        assert!(!round_one.is_sent(ReminderStage::E1));
        assert_eq!(repo.get(&tanda, &user, 2).await.unwrap(), ReminderFlags::default());
    }
}
