//! ResolveDefaultHandler - Organizer options for a default that cannot be
//! settled by replacement.

use crate::domain::foundation::{TandaId, Timestamp, UserId, ValidationError};
use crate::domain::ledger::events::{
    DefaultReversed, Reason, RecoveryModeStarted, UserNoteRegistered,
};
use crate::domain::ledger::{LedgerEvent, TandaEvent};
use crate::domain::tanda::policy::RECOVERY_MODE_DAYS;
use crate::domain::tanda::{TandaError, TandaHistory};

use crate::application::context::LedgerContext;

use super::require_organizer;

/// Reason recorded on `UserUnblocked` after a manual reversal.
const UNBLOCK_REASON: &str = "DEFAULT_REVERSED";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultResolution {
    /// Gives the user a few more days before further action.
    StartRecovery,
    /// Attaches a free-text note to the user's record.
    RegisterNote(String),
    /// Clears the default and unblocks the user.
    Reverse { reason: String },
}

#[derive(Debug, Clone)]
pub struct ResolveDefaultCommand {
    pub tanda_id: TandaId,
    pub organizer_id: UserId,
    pub user_id: UserId,
    pub resolution: DefaultResolution,
}

#[derive(Debug, Clone)]
pub struct ResolveDefaultResult {
    pub user_id: UserId,
    pub resolution: DefaultResolution,
    /// End of the recovery period, when one was started.
    pub recovery_ends_at: Option<Timestamp>,
}

impl ResolveDefaultResult {
    pub fn reply(&self) -> String {
        let who = format!("{}...", self.user_id.short(10));
        match (&self.resolution, self.recovery_ends_at) {
            (DefaultResolution::StartRecovery, Some(ends)) => format!(
                "Recovery mode started for {} until {}.",
                who,
                ends.day_month()
            ),
            (DefaultResolution::RegisterNote(_), _) => format!("Note registered for {}.", who),
            (DefaultResolution::Reverse { .. }, _) => {
                format!("Default of {} reversed. The user is unblocked.", who)
            }
            (DefaultResolution::StartRecovery, None) => {
                format!("Recovery mode started for {}.", who)
            }
        }
    }
}

pub struct ResolveDefaultHandler {
    ctx: LedgerContext,
}

impl ResolveDefaultHandler {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    pub async fn handle(
        &self,
        cmd: ResolveDefaultCommand,
    ) -> Result<ResolveDefaultResult, TandaError> {
        let tanda_id = cmd.tanda_id;
        let user = &cmd.user_id;
        let _guard = self.ctx.lock(tanda_id).await?;
        let events = self.ctx.load_existing(&tanda_id).await?;
        let history = TandaHistory::new(&events);

        require_organizer(&history, &cmd.organizer_id)?;
        if !history.has_joined(user) {
            return Err(TandaError::NotParticipant(user.clone()));
        }

        let now = self.ctx.now();
        let mut recovery_ends_at = None;
        let appended = match &cmd.resolution {
            DefaultResolution::StartRecovery => {
                if !history.has_active_default(user) {
                    return Err(TandaError::NoActiveDefault(user.clone()));
                }
                let ends_at = now.add_days(RECOVERY_MODE_DAYS);
                recovery_ends_at = Some(ends_at);
                vec![LedgerEvent::new(
                    TandaEvent::RecoveryModeStarted(RecoveryModeStarted { ends_at }),
                    now,
                )]
            }
            DefaultResolution::RegisterNote(note) => {
                let note = note.trim();
                if note.is_empty() {
                    return Err(ValidationError::empty_field("note").into());
                }
                vec![LedgerEvent::new(
                    TandaEvent::UserNoteRegistered(UserNoteRegistered {
                        note: note.to_string(),
                    }),
                    now,
                )]
            }
            DefaultResolution::Reverse { reason } => {
                if !history.has_active_default(user) {
                    return Err(TandaError::NoActiveDefault(user.clone()));
                }
                vec![
                    LedgerEvent::new(
                        TandaEvent::DefaultReversed(DefaultReversed {
                            organizer_id: cmd.organizer_id.clone(),
                            reason: reason.trim().to_string(),
                        }),
                        now,
                    ),
                    LedgerEvent::new(
                        TandaEvent::UserUnblocked(Reason {
                            reason: UNBLOCK_REASON.to_string(),
                        }),
                        now,
                    ),
                ]
            }
        };

        self.ctx
            .append_all(
                appended
                    .into_iter()
                    .map(|e| e.for_tanda(tanda_id).by_user(user.clone()))
                    .collect(),
            )
            .await?;

        tracing::info!(
            tanda_id = %tanda_id,
            user_id = %user,
            resolution = ?cmd.resolution,
            "Default resolution recorded"
        );
        if let DefaultResolution::Reverse { .. } = cmd.resolution {
            self.ctx
                .notify(user, "Your default was reversed by the organizer. You are no longer blocked.")
                .await;
        }

        Ok(ResolveDefaultResult {
            user_id: cmd.user_id,
            resolution: cmd.resolution,
            recovery_ends_at,
        })
    }
}
