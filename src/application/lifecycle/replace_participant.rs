//! ReplaceParticipantHandler - Expels a defaulted participant and issues a
//! single-use code for the newcomer who takes over the seat.

use crate::domain::foundation::{TandaId, Timestamp, UserId};
use crate::domain::ledger::events::{ParticipantRemoved, Reason, ReplacementCodeCreated};
use crate::domain::ledger::{LedgerEvent, TandaEvent};
use crate::domain::tanda::{
    ReplacementEligibility, ReplacementInvite, TandaError, TandaHistory, TandaStatus,
};

use crate::application::context::LedgerContext;

use super::require_organizer;

/// Reason recorded on `ParticipantRemoved` for an expulsion.
const REMOVAL_REASON: &str = "DEFAULT";

#[derive(Debug, Clone)]
pub struct ReplaceParticipantCommand {
    pub tanda_id: TandaId,
    pub organizer_id: UserId,
    pub user_id: UserId,
}

#[derive(Debug, Clone)]
pub struct ReplaceParticipantResult {
    pub replaced_user_id: UserId,
    pub code: String,
    /// Payout date the newcomer inherits.
    pub turn_date: Timestamp,
}

impl ReplaceParticipantResult {
    pub fn reply(&self) -> String {
        format!(
            "{}... was removed from the tanda.\n\nReplacement code: {}\nThe new participant inherits the payout turn of {}. Share the code so they can join.",
            self.replaced_user_id.short(10),
            self.code,
            self.turn_date.day_month()
        )
    }
}

pub struct ReplaceParticipantHandler {
    ctx: LedgerContext,
}

impl ReplaceParticipantHandler {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    /// Whether `user` could be replaced right now. Appends nothing.
    pub async fn eligibility(
        &self,
        tanda_id: TandaId,
        user: &UserId,
    ) -> Result<ReplacementEligibility, TandaError> {
        let events = self.ctx.load_existing(&tanda_id).await?;
        Ok(TandaHistory::new(&events).replacement_eligibility(user, self.ctx.now()))
    }

    /// Expels `user` when eligible.
    ///
    /// # Errors
    ///
    /// `ReplacementNotAllowed` after recording `ReplacementNotAllowed` with
    /// the reason, when the user is not in default or already received
    /// their payout.
    pub async fn handle(
        &self,
        cmd: ReplaceParticipantCommand,
    ) -> Result<ReplaceParticipantResult, TandaError> {
        let tanda_id = cmd.tanda_id;
        let _guard = self.ctx.lock(tanda_id).await?;
        let events = self.ctx.load_existing(&tanda_id).await?;
        let history = TandaHistory::new(&events);

        require_organizer(&history, &cmd.organizer_id)?;
        if history.status() != Some(TandaStatus::Active) {
            return Err(TandaError::TandaNotActive);
        }
        if history.is_removed(&cmd.user_id) {
            return Err(TandaError::ParticipantReplaced(cmd.user_id));
        }
        if !history.is_participant(&cmd.user_id) {
            return Err(TandaError::NotParticipant(cmd.user_id));
        }

        let now = self.ctx.now();
        let turn_date = match history.replacement_eligibility(&cmd.user_id, now) {
            ReplacementEligibility::Eligible { turn_date } => turn_date,
            ReplacementEligibility::Ineligible(reason) => {
                self.ctx
                    .append(
                        LedgerEvent::new(
                            TandaEvent::ReplacementNotAllowed(Reason {
                                reason: reason.code().to_string(),
                            }),
                            now,
                        )
                        .for_tanda(tanda_id)
                        .by_user(cmd.user_id.clone()),
                    )
                    .await?;
                tracing::info!(
                    tanda_id = %tanda_id,
                    user_id = %cmd.user_id,
                    reason = %reason,
                    "Replacement refused"
                );
                return Err(TandaError::ReplacementNotAllowed(reason));
            }
        };

        self.ctx
            .append(
                LedgerEvent::new(
                    TandaEvent::ParticipantRemoved(ParticipantRemoved {
                        reason: REMOVAL_REASON.to_string(),
                    }),
                    now,
                )
                .for_tanda(tanda_id)
                .by_user(cmd.user_id.clone()),
            )
            .await?;

        let invite = ReplacementInvite::issue(tanda_id, cmd.user_id.clone(), now);
        self.ctx.invites.insert(&invite).await?;

        self.ctx
            .append(
                LedgerEvent::new(
                    TandaEvent::ReplacementCodeCreated(ReplacementCodeCreated {
                        code: invite.code.clone(),
                        replaced_user_id: cmd.user_id.clone(),
                    }),
                    now,
                )
                .for_tanda(tanda_id)
                .by_user(cmd.organizer_id.clone()),
            )
            .await?;

        tracing::info!(
            tanda_id = %tanda_id,
            user_id = %cmd.user_id,
            code = %invite.code,
            "Participant removed and replacement code issued"
        );
        self.ctx
            .notify(
                &cmd.user_id,
                "You were removed from the tanda after an unresolved default.",
            )
            .await;

        Ok(ReplaceParticipantResult {
            replaced_user_id: cmd.user_id,
            code: invite.code,
            turn_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{user, Harness};
    use crate::domain::foundation::ErrorCode;
    use crate::domain::ledger::EventType;
    use crate::domain::tanda::IneligibleReason;

    fn expel(tanda_id: TandaId, who: &str) -> ReplaceParticipantCommand {
        ReplaceParticipantCommand {
            tanda_id,
            organizer_id: user("org"),
            user_id: user(who),
        }
    }

    #[tokio::test]
    async fn user_without_default_is_not_replaceable() {
        let h = Harness::new();
        let tanda = h.active_tanda(&["ana", "beto"]).await;
        let handler = ReplaceParticipantHandler::new(h.ctx.clone());

        let err = handler.handle(expel(tanda.id, "beto")).await.unwrap_err();
        assert_eq!(err, TandaError::ReplacementNotAllowed(IneligibleReason::NotInDefault));
        assert_eq!(err.code(), ErrorCode::ReplacementNotAllowed);
        assert_eq!(h.store.count_of(EventType::ReplacementNotAllowed), 1);
        assert_eq!(h.store.count_of(EventType::ParticipantRemoved), 0);
    }

    #[tokio::test]
    async fn defaulted_user_before_turn_is_replaced() {
        let h = Harness::new();
        // ana receives round 1, beto round 2
        let tanda = h.active_tanda(&["ana", "beto"]).await;
        h.default_in(&tanda, "beto", 1).await;

        let handler = ReplaceParticipantHandler::new(h.ctx.clone());
        assert!(handler
            .eligibility(tanda.id, &user("beto"))
            .await
            .unwrap()
            .is_eligible());

        let result = handler.handle(expel(tanda.id, "beto")).await.unwrap();
        assert_eq!(result.code.len(), 8);
        assert!(h.invites.get(&result.code).unwrap().is_active());
        assert_eq!(h.store.count_of(EventType::ParticipantRemoved), 1);
        assert_eq!(h.store.count_of(EventType::ReplacementCodeCreated), 1);

        // Removal resolves the default, so beto is no longer blocked
        assert!(!h.ctx.block_status(&user("beto")).await.unwrap().is_blocked());
    }

    #[tokio::test]
    async fn defaulted_user_after_turn_is_refused() {
        let h = Harness::new();
        let tanda = h.active_tanda(&["ana", "beto"]).await;
        h.clock.advance_days(8);
        h.default_in(&tanda, "ana", 1).await;

        let err = ReplaceParticipantHandler::new(h.ctx.clone())
            .handle(expel(tanda.id, "ana"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TandaError::ReplacementNotAllowed(IneligibleReason::AlreadyReceivedTurn)
        );
    }

    #[tokio::test]
    async fn members_cannot_expel() {
        let h = Harness::new();
        let tanda = h.active_tanda(&["ana", "beto"]).await;
        let mut cmd = expel(tanda.id, "beto");
        cmd.organizer_id = user("ana");

        let err = ReplaceParticipantHandler::new(h.ctx.clone())
            .handle(cmd)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotOrganizer);
    }
}
