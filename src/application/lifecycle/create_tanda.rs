//! CreateTandaHandler - Opens a new tanda in PENDING state.

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::foundation::{EventId, TandaId, UserId, ValidationError};
use crate::domain::ledger::events::{ParticipantConfirmed, ParticipantInvited, TandaCreated};
use crate::domain::ledger::{EventType, LedgerEvent, TandaEvent};
use crate::domain::tanda::policy::{MAX_PARTICIPANTS, MIN_PARTICIPANTS};
use crate::domain::tanda::{
    generate_invite_code, ParticipantRole, Periodicity, PoolType, Tanda, TandaError, TandaHistory,
};

use crate::application::context::LedgerContext;

use super::require_unblocked;

/// Command to create a tanda.
#[derive(Debug, Clone)]
pub struct CreateTandaCommand {
    pub organizer_id: UserId,
    pub name: String,
    pub contribution_amount: i64,
    pub number_of_participants: u32,
    pub periodicity: Periodicity,
    pub duration_months: u32,
    /// Whether the organizer also takes a seat.
    pub organizer_participates: bool,
}

impl CreateTandaCommand {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        if self.contribution_amount <= 0 {
            return Err(ValidationError::out_of_range(
                "contribution_amount",
                1,
                i64::MAX,
                self.contribution_amount,
            ));
        }
        if !(MIN_PARTICIPANTS..=MAX_PARTICIPANTS).contains(&self.number_of_participants) {
            return Err(ValidationError::out_of_range(
                "number_of_participants",
                i64::from(MIN_PARTICIPANTS),
                i64::from(MAX_PARTICIPANTS),
                i64::from(self.number_of_participants),
            ));
        }
        if self.duration_months == 0 {
            return Err(ValidationError::out_of_range(
                "duration_months",
                1,
                i64::from(u32::MAX),
                0,
            ));
        }
        Ok(())
    }
}

/// Result of successful tanda creation.
#[derive(Debug, Clone)]
pub struct CreateTandaResult {
    pub tanda: Tanda,
    /// Id of the `TandaCreated` event.
    pub event_id: EventId,
}

impl CreateTandaResult {
    pub fn reply(&self) -> String {
        format!(
            "Tanda \"{}\" created.\n\nInvite code: {}\nContribution: ${} ({:?})\nParticipants: {}\nInitial fund required: ${}\n\nShare the code so participants can join.",
            self.tanda.name,
            self.tanda.invite_code,
            self.tanda.contribution_amount,
            self.tanda.periodicity,
            self.tanda.number_of_participants,
            self.tanda.required_initial_fund
        )
    }
}

/// Draws from the invite code generator before giving up.
const INVITE_CODE_ATTEMPTS: usize = 16;

type CodeGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Handler for creating tandas.
pub struct CreateTandaHandler {
    ctx: LedgerContext,
    generate_code: CodeGenerator,
}

impl CreateTandaHandler {
    pub fn new(ctx: LedgerContext) -> Self {
        Self {
            ctx,
            generate_code: Arc::new(generate_invite_code),
        }
    }

    pub fn with_code_generator(mut self, generate: impl Fn() -> String + Send + Sync + 'static) -> Self {
        self.generate_code = Arc::new(generate);
        self
    }

    /// A fresh code no existing tanda was created with.
    async fn unused_invite_code(&self) -> Result<String, TandaError> {
        let taken: HashSet<String> = self
            .ctx
            .events
            .all_of_type(EventType::TandaCreated)
            .await?
            .into_iter()
            .filter_map(|e| match e.event {
                TandaEvent::TandaCreated(created) => Some(created.invite_code),
                _ => None,
            })
            .collect();

        for _ in 0..INVITE_CODE_ATTEMPTS {
            let code = (self.generate_code)();
            if !taken.contains(&code) {
                return Ok(code);
            }
            tracing::debug!(code = %code, "Invite code already in use, drawing another");
        }
        Err(TandaError::inconsistent(format!(
            "no unused invite code after {} attempts",
            INVITE_CODE_ATTEMPTS
        )))
    }

    pub async fn handle(&self, cmd: CreateTandaCommand) -> Result<CreateTandaResult, TandaError> {
        // 1. Validate input and standing
        cmd.validate()?;
        require_unblocked(&self.ctx, &cmd.organizer_id).await?;

        // 2. Derive the fixed terms
        let tanda_id = TandaId::new();
        let _guard = self.ctx.lock(tanda_id).await?;
        let now = self.ctx.now();
        let required_initial_fund =
            cmd.contribution_amount * i64::from(cmd.number_of_participants);
        let invite_code = self.unused_invite_code().await?;

        // 3. Append the creation fact
        let created = LedgerEvent::new(
            TandaEvent::TandaCreated(TandaCreated {
                name: cmd.name.trim().to_string(),
                organizer_id: cmd.organizer_id.clone(),
                contribution_amount: cmd.contribution_amount,
                number_of_participants: cmd.number_of_participants,
                periodicity: cmd.periodicity,
                duration_months: cmd.duration_months,
                pool_type: PoolType::for_duration(cmd.duration_months),
                invite_code,
                required_initial_fund,
                organizer_participates: cmd.organizer_participates,
            }),
            now,
        )
        .for_tanda(tanda_id)
        .by_user(cmd.organizer_id.clone())
        .with_amount(cmd.contribution_amount);
        let event_id = self.ctx.append(created).await?;

        // 4. Seat the organizer
        if cmd.organizer_participates {
            self.ctx
                .append_all(vec![
                    LedgerEvent::new(
                        TandaEvent::ParticipantInvited(ParticipantInvited {
                            role: ParticipantRole::Organizer,
                            replaced_user_id: None,
                        }),
                        now,
                    )
                    .for_tanda(tanda_id)
                    .by_user(cmd.organizer_id.clone()),
                    LedgerEvent::new(
                        TandaEvent::ParticipantConfirmed(ParticipantConfirmed {
                            role: ParticipantRole::Organizer,
                            inherited_from: None,
                        }),
                        now,
                    )
                    .for_tanda(tanda_id)
                    .by_user(cmd.organizer_id.clone()),
                ])
                .await?;
        }

        let events = self.ctx.load(&tanda_id).await?;
        let tanda = TandaHistory::new(&events)
            .tanda()
            .ok_or_else(|| TandaError::inconsistent("tanda missing right after creation"))?;

        tracing::info!(
            tanda_id = %tanda_id,
            organizer_id = %cmd.organizer_id,
            participants = cmd.number_of_participants,
            "Tanda created"
        );
        Ok(CreateTandaResult { tanda, event_id })
    }
}
