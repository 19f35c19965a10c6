//! JoinTandaHandler - Redeems an invite or replacement code.

use crate::domain::foundation::{TandaId, UserId};
use crate::domain::ledger::events::{
    ParticipantConfirmed, ParticipantInvited, ReplacementJoined, TandaCreated,
};
use crate::domain::ledger::{EventType, LedgerEvent, TandaEvent};
use crate::domain::tanda::{
    ParticipantRole, ReplacementInvite, TandaError, TandaHistory, TandaStatus,
};

use crate::application::context::LedgerContext;

use super::require_unblocked;

#[derive(Debug, Clone)]
pub struct JoinTandaCommand {
    pub user_id: UserId,
    /// Tanda invite code or replacement code, case-insensitive.
    pub code: String,
}

/// How the user entered the tanda.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinedAs {
    Member { seated: u32, seats: u32 },
    /// Waiting for a validated payment to take over `replaced_user_id`'s slot.
    Replacement { replaced_user_id: UserId },
}

#[derive(Debug, Clone)]
pub struct JoinTandaResult {
    pub tanda_id: TandaId,
    pub tanda_name: String,
    pub contribution_amount: i64,
    pub joined_as: JoinedAs,
}

impl JoinTandaResult {
    pub fn reply(&self) -> String {
        match &self.joined_as {
            JoinedAs::Member { seated, seats } => format!(
                "You joined \"{}\" ({}/{} participants).\n\nNext step: send your initial fund deposit of ${} and share the proof.",
                self.tanda_name, seated, seats, self.contribution_amount
            ),
            JoinedAs::Replacement { .. } => format!(
                "You joined \"{}\" as a replacement participant.\n\nYour seat is confirmed once the organizer validates your payment of ${}.",
                self.tanda_name, self.contribution_amount
            ),
        }
    }
}

pub struct JoinTandaHandler {
    ctx: LedgerContext,
}

impl JoinTandaHandler {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    pub async fn handle(&self, cmd: JoinTandaCommand) -> Result<JoinTandaResult, TandaError> {
        require_unblocked(&self.ctx, &cmd.user_id).await?;
        let code = cmd.code.trim().to_uppercase();

        // Replacement codes take precedence over tanda invite codes
        if let Some(invite) = self.ctx.invites.find_active(&code).await? {
            return self.join_as_replacement(invite, &cmd.user_id).await;
        }

        let tanda_id = self
            .find_by_invite_code(&code)
            .await?
            .ok_or_else(|| TandaError::InvalidInviteCode(code.clone()))?;
        self.join_as_member(tanda_id, &cmd.user_id).await
    }

    async fn find_by_invite_code(&self, code: &str) -> Result<Option<TandaId>, TandaError> {
        let created = self.ctx.events.all_of_type(EventType::TandaCreated).await?;
        Ok(created.into_iter().find_map(|e| match &e.event {
            TandaEvent::TandaCreated(TandaCreated { invite_code, .. }) if invite_code == code => {
                e.tanda_id
            }
            _ => None,
        }))
    }

    async fn join_as_member(
        &self,
        tanda_id: TandaId,
        user: &UserId,
    ) -> Result<JoinTandaResult, TandaError> {
        let _guard = self.ctx.lock(tanda_id).await?;
        let events = self.ctx.load_existing(&tanda_id).await?;
        let history = TandaHistory::new(&events);
        let tanda = history
            .tanda()
            .ok_or(TandaError::TandaNotFound(tanda_id))?;

        if tanda.status != TandaStatus::Pending {
            return Err(TandaError::invalid_state(tanda.status, "join"));
        }
        if history.is_removed(user) {
            return Err(TandaError::ParticipantReplaced(user.clone()));
        }
        if history.is_participant(user) {
            return Err(TandaError::AlreadyParticipant(user.clone()));
        }
        if tanda.is_full() {
            return Err(TandaError::TandaFull);
        }

        let now = self.ctx.now();
        self.ctx
            .append_all(vec![
                LedgerEvent::new(
                    TandaEvent::ParticipantInvited(ParticipantInvited {
                        role: ParticipantRole::Member,
                        replaced_user_id: None,
                    }),
                    now,
                )
                .for_tanda(tanda_id)
                .by_user(user.clone()),
                LedgerEvent::new(
                    TandaEvent::ParticipantConfirmed(ParticipantConfirmed {
                        role: ParticipantRole::Member,
                        inherited_from: None,
                    }),
                    now,
                )
                .for_tanda(tanda_id)
                .by_user(user.clone()),
            ])
            .await?;

        let seated = tanda.current_participants + 1;
        tracing::info!(tanda_id = %tanda_id, user_id = %user, seated, "Participant joined");
        self.ctx
            .notify(
                &tanda.organizer_id,
                &format!(
                    "{}... joined \"{}\" ({}/{} participants).",
                    user.short(10),
                    tanda.name,
                    seated,
                    tanda.number_of_participants
                ),
            )
            .await;

        Ok(JoinTandaResult {
            tanda_id,
            tanda_name: tanda.name,
            contribution_amount: tanda.contribution_amount,
            joined_as: JoinedAs::Member {
                seated,
                seats: tanda.number_of_participants,
            },
        })
    }

    async fn join_as_replacement(
        &self,
        found: ReplacementInvite,
        user: &UserId,
    ) -> Result<JoinTandaResult, TandaError> {
        let tanda_id = found.tanda_id;
        let _guard = self.ctx.lock(tanda_id).await?;

        // The lookup ran before the lock; only the stored invite counts
        let mut invite = match self.ctx.invites.find_active(&found.code).await? {
            Some(invite) if invite.tanda_id == tanda_id => invite,
            _ => return Err(TandaError::InvalidInviteCode(found.code)),
        };
        if matches!(&invite.used_by_user_id, Some(holder) if holder != user) {
            return Err(TandaError::InvalidInviteCode(invite.code));
        }

        let events = self.ctx.load_existing(&tanda_id).await?;
        let history = TandaHistory::new(&events);
        let tanda = history
            .tanda()
            .ok_or(TandaError::TandaNotFound(tanda_id))?;

        if tanda.status != TandaStatus::Active {
            return Err(TandaError::invalid_state(tanda.status, "join as replacement"));
        }
        if history.is_participant(user) || history.is_removed(user) {
            return Err(TandaError::AlreadyParticipant(user.clone()));
        }

        let replaced = invite.replaced_user_id.clone();
        let result = JoinTandaResult {
            tanda_id,
            tanda_name: tanda.name.clone(),
            contribution_amount: tanda.contribution_amount,
            joined_as: JoinedAs::Replacement {
                replaced_user_id: replaced.clone(),
            },
        };

        // Redeeming the same code twice is a no-op
        if history.pending_replacement(user) == Some(&replaced) {
            return Ok(result);
        }

        // Claim before appending so a concurrent joiner sees the holder
        invite.claim(user.clone());
        self.ctx.invites.update(&invite).await?;

        let now = self.ctx.now();
        self.ctx
            .append_all(vec![
                LedgerEvent::new(
                    TandaEvent::ReplacementJoined(ReplacementJoined {
                        code: invite.code.clone(),
                        replaced_user_id: replaced.clone(),
                    }),
                    now,
                )
                .for_tanda(tanda_id)
                .by_user(user.clone()),
                LedgerEvent::new(
                    TandaEvent::ParticipantInvited(ParticipantInvited {
                        role: ParticipantRole::ReplacementPending,
                        replaced_user_id: Some(replaced.clone()),
                    }),
                    now,
                )
                .for_tanda(tanda_id)
                .by_user(user.clone()),
            ])
            .await?;

        tracing::info!(
            tanda_id = %tanda_id,
            user_id = %user,
            replaced_user_id = %replaced,
            "Replacement joined"
        );
        self.ctx
            .notify(
                &tanda.organizer_id,
                &format!(
                    "{}... joined \"{}\" as replacement for {}.... Validate their payment to confirm the seat.",
                    user.short(10),
                    tanda.name,
                    replaced.short(10)
                ),
            )
            .await;

        Ok(result)
    }
}
