//! Shared fixtures for handler and sweep tests.

use std::sync::Arc;

use crate::adapters::{
    InMemoryEventStore, InMemoryFundLayerRepository, InMemoryReminderFlagRepository,
    InMemoryReplacementInviteRepository, MutableClock, RecordingNotifier,
};
use crate::domain::foundation::{EventId, TandaId, Timestamp, UserId};
use crate::domain::ledger::events::DefaultConfirmed;
use crate::domain::ledger::{DefaultReason, LedgerEvent, TandaEvent};
use crate::domain::tanda::{Periodicity, Tanda, TandaHistory, TurnOrderMethod};

use super::context::LedgerContext;
use super::lifecycle::{
    AssignTurnOrderCommand, AssignTurnOrderHandler, CreateTandaCommand, CreateTandaHandler,
    JoinTandaCommand, JoinTandaHandler, RecordPaymentProofCommand, RecordPaymentProofHandler,
    ValidatePaymentCommand, ValidatePaymentHandler, ValidatePaymentResult,
};

/// Monday 2026-01-05 12:00 UTC.
pub const START_MILLIS: i64 = 1_767_614_400_000;

pub fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

/// In-memory context with a settable clock and a recording notifier.
///
/// The organizer is always `org` and does not take a seat; contributions
/// are 1000, weekly.
pub struct Harness {
    pub ctx: LedgerContext,
    pub store: Arc<InMemoryEventStore>,
    pub invites: Arc<InMemoryReplacementInviteRepository>,
    pub clock: Arc<MutableClock>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryEventStore::new());
        let invites = Arc::new(InMemoryReplacementInviteRepository::new());
        let clock = Arc::new(MutableClock::at(Timestamp::from_millis(START_MILLIS)));
        let notifier = Arc::new(RecordingNotifier::new());
        let ctx = LedgerContext::new(
            store.clone(),
            Arc::new(InMemoryFundLayerRepository::new()),
            invites.clone(),
            Arc::new(InMemoryReminderFlagRepository::new()),
            notifier.clone(),
            clock.clone(),
        );
        Self {
            ctx,
            store,
            invites,
            clock,
            notifier,
        }
    }

    pub async fn tanda(&self, id: TandaId) -> Tanda {
        let events = self.ctx.load(&id).await.unwrap();
        TandaHistory::new(&events).tanda().unwrap()
    }

    pub async fn create_tanda(&self, participants: u32) -> Tanda {
        CreateTandaHandler::new(self.ctx.clone())
            .handle(CreateTandaCommand {
                organizer_id: user("org"),
                name: "Family".to_string(),
                contribution_amount: 1000,
                number_of_participants: participants,
                periodicity: Periodicity::Weekly,
                duration_months: 2,
                organizer_participates: false,
            })
            .await
            .unwrap()
            .tanda
    }

    pub async fn join(&self, tanda: &Tanda, who: &str) {
        JoinTandaHandler::new(self.ctx.clone())
            .handle(JoinTandaCommand {
                user_id: user(who),
                code: tanda.invite_code.clone(),
            })
            .await
            .unwrap();
    }

    pub async fn proof(&self, tanda: &Tanda, who: &str) -> EventId {
        RecordPaymentProofHandler::new(self.ctx.clone())
            .handle(RecordPaymentProofCommand {
                tanda_id: tanda.id,
                user_id: user(who),
                amount: tanda.contribution_amount,
                reference: format!("ref-{}", who),
                method: "transfer".to_string(),
            })
            .await
            .unwrap()
            .proof_id
    }

    /// Records and accepts a proof of one contribution.
    pub async fn deposit(&self, tanda: &Tanda, who: &str) -> ValidatePaymentResult {
        let proof_id = self.proof(tanda, who).await;
        ValidatePaymentHandler::new(self.ctx.clone())
            .handle(ValidatePaymentCommand {
                tanda_id: tanda.id,
                organizer_id: user("org"),
                proof_id,
                accept: true,
            })
            .await
            .unwrap()
    }

    /// Pending tanda, full, with every seat deposited.
    pub async fn funded_tanda(&self, members: &[&str]) -> Tanda {
        let tanda = self.create_tanda(members.len() as u32).await;
        for who in members {
            self.join(&tanda, who).await;
        }
        for who in members {
            self.deposit(&tanda, who).await;
        }
        self.tanda(tanda.id).await
    }

    /// Active tanda whose payout order is `members` as given.
    pub async fn active_tanda(&self, members: &[&str]) -> Tanda {
        let tanda = self.funded_tanda(members).await;
        AssignTurnOrderHandler::new(self.ctx.clone())
            .handle(AssignTurnOrderCommand {
                tanda_id: tanda.id,
                organizer_id: user("org"),
                method: TurnOrderMethod::Manual,
                manual_order: members.iter().map(|m| user(m)).collect(),
            })
            .await
            .unwrap();
        self.tanda(tanda.id).await
    }

    /// Appends a confirmed default straight into the ledger.
    pub async fn default_in(&self, tanda: &Tanda, who: &str, round: u32) {
        self.ctx
            .append(
                LedgerEvent::new(
                    TandaEvent::DefaultConfirmed(DefaultConfirmed {
                        round,
                        reason: DefaultReason::WindowExpired,
                    }),
                    self.ctx.now(),
                )
                .for_tanda(tanda.id)
                .by_user(user(who)),
            )
            .await
            .unwrap();
    }

    /// Confirmed default for `who` in a tanda nobody else uses.
    pub async fn seed_default(&self, who: &UserId) {
        self.ctx
            .append(
                LedgerEvent::new(
                    TandaEvent::DefaultConfirmed(DefaultConfirmed {
                        round: 1,
                        reason: DefaultReason::LimitExceeded,
                    }),
                    self.ctx.now(),
                )
                .for_tanda(TandaId::new())
                .by_user(who.clone()),
            )
            .await
            .unwrap();
    }
}
