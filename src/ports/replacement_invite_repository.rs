//! ReplacementInviteRepository port - Single-use replacement codes.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, TandaId, UserId};
use crate::domain::tanda::ReplacementInvite;

/// Storage for replacement invites keyed by code.
///
/// Implementations must ensure:
/// - `code` is unique
/// - at most one ACTIVE invite exists per (tanda, replaced user); `insert`
///   rejects a second one with `ValidationFailed`
#[async_trait]
pub trait ReplacementInviteRepository: Send + Sync {
    async fn insert(&self, invite: &ReplacementInvite) -> Result<(), DomainError>;

    /// ACTIVE invite for `code`, if any.
    async fn find_active(&self, code: &str) -> Result<Option<ReplacementInvite>, DomainError>;

    /// ACTIVE invite in `tanda_id` claimed by `user_id`, if any.
    async fn find_claimed_by(
        &self,
        tanda_id: &TandaId,
        user_id: &UserId,
    ) -> Result<Option<ReplacementInvite>, DomainError>;

    /// Persist status and claim changes of an existing invite.
    async fn update(&self, invite: &ReplacementInvite) -> Result<(), DomainError>;
}
