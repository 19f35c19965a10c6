//! In-memory replacement invites keyed by code.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, TandaId, UserId};
use crate::domain::tanda::ReplacementInvite;
use crate::ports::ReplacementInviteRepository;

#[derive(Default)]
pub struct InMemoryReplacementInviteRepository {
    invites: RwLock<HashMap<String, ReplacementInvite>>,
}

impl InMemoryReplacementInviteRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lookup by code regardless of status (for test assertions).
    pub fn get(&self, code: &str) -> Option<ReplacementInvite> {
        self.invites.read().ok()?.get(code).cloned()
    }
}

#[async_trait]
impl ReplacementInviteRepository for InMemoryReplacementInviteRepository {
    async fn insert(&self, invite: &ReplacementInvite) -> Result<(), DomainError> {
        let mut invites = self
            .invites
            .write()
            .map_err(|_| DomainError::lock_poisoned("InMemoryReplacementInviteRepository"))?;

        if invites.contains_key(&invite.code) {
            return Err(DomainError::new(
                ErrorCode::ValidationFailed,
                format!("Replacement code {} already exists", invite.code),
            ));
        }
        let duplicate = invites.values().any(|i| {
            i.is_active()
                && i.tanda_id == invite.tanda_id
                && i.replaced_user_id == invite.replaced_user_id
        });
        if invite.is_active() && duplicate {
            return Err(DomainError::new(
                ErrorCode::ValidationFailed,
                format!(
                    "An active replacement code already exists for {}",
                    invite.replaced_user_id
                ),
            ));
        }

        invites.insert(invite.code.clone(), invite.clone());
        Ok(())
    }

    async fn find_active(&self, code: &str) -> Result<Option<ReplacementInvite>, DomainError> {
        let invites = self
            .invites
            .read()
            .map_err(|_| DomainError::lock_poisoned("InMemoryReplacementInviteRepository"))?;
        Ok(invites.get(code).filter(|i| i.is_active()).cloned())
    }

    async fn find_claimed_by(
        &self,
        tanda_id: &TandaId,
        user_id: &UserId,
    ) -> Result<Option<ReplacementInvite>, DomainError> {
        let invites = self
            .invites
            .read()
            .map_err(|_| DomainError::lock_poisoned("InMemoryReplacementInviteRepository"))?;
        Ok(invites
            .values()
            .find(|i| {
                i.is_active()
                    && i.tanda_id == *tanda_id
                    && i.used_by_user_id.as_ref() == Some(user_id)
            })
            .cloned())
    }

    async fn update(&self, invite: &ReplacementInvite) -> Result<(), DomainError> {
        let mut invites = self
            .invites
            .write()
            .map_err(|_| DomainError::lock_poisoned("InMemoryReplacementInviteRepository"))?;
        match invites.get_mut(&invite.code) {
            Some(stored) => {
                *stored = invite.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::InvalidInviteCode,
                format!("Replacement code {} not found", invite.code),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;

    fn invite(tanda: TandaId) -> ReplacementInvite {
        ReplacementInvite::issue(tanda, UserId::new("521111").unwrap(), Timestamp::from_millis(0))
    }

    #[tokio::test]
    async fn one_active_invite_per_replaced_user() {
        let repo = InMemoryReplacementInviteRepository::new();
        let tanda = TandaId::new();
        repo.insert(&invite(tanda)).await.unwrap();

        let err = repo.insert(&invite(tanda)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);

        repo.insert(&invite(TandaId::new())).await.unwrap();
    }

    #[tokio::test]
    async fn claimed_invite_is_found_until_used() {
        let repo = InMemoryReplacementInviteRepository::new();
        let tanda = TandaId::new();
        let joiner = UserId::new("521222").unwrap();
        let mut inv = invite(tanda);
        repo.insert(&inv).await.unwrap();

        inv.claim(joiner.clone());
        repo.update(&inv).await.unwrap();
        assert_eq!(
            repo.find_claimed_by(&tanda, &joiner).await.unwrap().map(|i| i.code),
            Some(inv.code.clone())
        );

        inv.mark_used();
        repo.update(&inv).await.unwrap();
        assert!(repo.find_claimed_by(&tanda, &joiner).await.unwrap().is_none());
        assert!(repo.find_active(&inv.code).await.unwrap().is_none());
        assert!(repo.get(&inv.code).is_some());
    }

    #[tokio::test]
    async fn updating_unknown_code_fails() {
        let repo = InMemoryReplacementInviteRepository::new();
        let err = repo.update(&invite(TandaId::new())).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInviteCode);
    }
}
