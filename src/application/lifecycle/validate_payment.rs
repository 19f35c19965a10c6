//! ValidatePaymentHandler - Organizer verdict on a payment proof.
//!
//! An accepted proof runs, in order:
//! 1. `PaymentValidated`
//! 2. replacement confirmation when the payer redeemed a replacement code
//! 3. `InitialFundDeposited` before activation, or the round settlement after it
//! 4. `InitialFundCompleted` plus fund layer allocation the first time every
//!    seat has deposited

use crate::domain::foundation::{EventId, TandaId, UserId};
use crate::domain::ledger::events::{
    ContributionReceived, InitialFundCompleted, InitialFundDeposited, ParticipantConfirmed,
    ProofDecision, ReplacementConfirmed,
};
use crate::domain::ledger::{EventType, LedgerEvent, TandaEvent};
use crate::domain::tanda::{
    ParticipantRole, PaymentTiming, TandaError, TandaHistory, TandaStatus,
};

use crate::application::context::LedgerContext;
use crate::application::coverage::{regularize_default, repay_coverage};
use crate::application::fund_ledger::FundLedger;

use super::require_organizer;

#[derive(Debug, Clone)]
pub struct ValidatePaymentCommand {
    pub tanda_id: TandaId,
    pub organizer_id: UserId,
    pub proof_id: EventId,
    pub accept: bool,
}

/// What an accepted or rejected proof turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentApplication {
    Rejected,
    InitialDeposit {
        collected: i64,
        required: i64,
        fund_completed: bool,
    },
    Contribution { round: u32 },
    CoverageRepayment { round: u32 },
    /// Every owed round was already settled.
    Unassigned,
}

#[derive(Debug, Clone)]
pub struct ValidatePaymentResult {
    pub payer: UserId,
    pub amount: i64,
    pub replacement_confirmed: bool,
    pub application: PaymentApplication,
}

impl ValidatePaymentResult {
    pub fn reply(&self) -> String {
        let who = format!("{}...", self.payer.short(10));
        let mut reply = match &self.application {
            PaymentApplication::Rejected => format!("Proof from {} rejected.", who),
            PaymentApplication::InitialDeposit {
                collected,
                required,
                fund_completed: true,
            } => format!(
                "Deposit from {} validated. Initial fund complete: ${} of ${}.\n\nYou can now assign the turn order.",
                who, collected, required
            ),
            PaymentApplication::InitialDeposit {
                collected,
                required,
                ..
            } => format!(
                "Deposit from {} validated. Initial fund: ${} of ${}.",
                who, collected, required
            ),
            PaymentApplication::Contribution { round } => format!(
                "Payment of ${} from {} validated for period {}.",
                self.amount, who, round
            ),
            PaymentApplication::CoverageRepayment { round } => format!(
                "Payment of ${} from {} validated. Coverage of period {} repaid to the fund.",
                self.amount, who, round
            ),
            PaymentApplication::Unassigned => format!(
                "Payment of ${} from {} validated. No period was pending.",
                self.amount, who
            ),
        };
        if self.replacement_confirmed {
            reply.push_str("\nReplacement seat confirmed.");
        }
        reply
    }
}

pub struct ValidatePaymentHandler {
    ctx: LedgerContext,
}

impl ValidatePaymentHandler {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    pub async fn handle(
        &self,
        cmd: ValidatePaymentCommand,
    ) -> Result<ValidatePaymentResult, TandaError> {
        let tanda_id = cmd.tanda_id;
        let _guard = self.ctx.lock(tanda_id).await?;
        let events = self.ctx.load_existing(&tanda_id).await?;
        let history = TandaHistory::new(&events);

        // 1. Authorize and locate the proof
        require_organizer(&history, &cmd.organizer_id)?;
        if history.status() == Some(TandaStatus::Closed) {
            return Err(TandaError::AlreadyClosed);
        }
        let proof = history
            .proof(&cmd.proof_id)
            .ok_or_else(|| TandaError::ProofNotFound(cmd.proof_id.clone()))?;
        if history.proof_decided(&cmd.proof_id) {
            return Err(TandaError::ProofAlreadyDecided(cmd.proof_id.clone()));
        }
        let payer = proof
            .user_id
            .clone()
            .ok_or_else(|| TandaError::inconsistent("payment proof without a payer"))?;
        let amount = proof.amount.unwrap_or_else(|| history.contribution_amount());
        let now = self.ctx.now();
        let decision = ProofDecision {
            validator: cmd.organizer_id.clone(),
            proof_event_id: cmd.proof_id.clone(),
        };

        // 2. Rejection stops here
        if !cmd.accept {
            self.ctx
                .append(
                    LedgerEvent::new(TandaEvent::PaymentRejected(decision), now)
                        .for_tanda(tanda_id)
                        .by_user(payer.clone())
                        .with_amount(amount),
                )
                .await?;
            tracing::info!(tanda_id = %tanda_id, user_id = %payer, proof_id = %cmd.proof_id, "Payment rejected");
            self.ctx
                .notify(
                    &payer,
                    &format!(
                        "Your payment proof of ${} was rejected. Please check the transfer and send it again.",
                        amount
                    ),
                )
                .await;
            return Ok(ValidatePaymentResult {
                payer,
                amount,
                replacement_confirmed: false,
                application: PaymentApplication::Rejected,
            });
        }

        self.ctx
            .append(
                LedgerEvent::new(TandaEvent::PaymentValidated(decision), now)
                    .for_tanda(tanda_id)
                    .by_user(payer.clone())
                    .with_amount(amount),
            )
            .await?;

        // 3. A validated payment seats a pending replacement
        let replacement_confirmed = match history.pending_replacement(&payer) {
            Some(replaced) => {
                self.confirm_replacement(&history, tanda_id, &payer, replaced)
                    .await?
            }
            None => false,
        };

        // 4. Apply the money
        let events = self.ctx.load(&tanda_id).await?;
        let history = TandaHistory::new(&events);
        let application = match history.status() {
            Some(TandaStatus::Pending) => {
                self.deposit(&history, tanda_id, &payer, amount, &cmd.proof_id)
                    .await?
            }
            _ => {
                self.settle(&history, tanda_id, &payer, amount, &cmd.proof_id)
                    .await?
            }
        };

        tracing::info!(
            tanda_id = %tanda_id,
            user_id = %payer,
            proof_id = %cmd.proof_id,
            application = ?application,
            "Payment validated"
        );
        self.ctx
            .notify(
                &payer,
                &format!("Your payment of ${} was validated. Thank you!", amount),
            )
            .await;

        Ok(ValidatePaymentResult {
            payer,
            amount,
            replacement_confirmed,
            application,
        })
    }

    /// Seats `payer` in `replaced`'s slot when the payer still holds the
    /// invite for it. Returns whether the seat was confirmed.
    async fn confirm_replacement(
        &self,
        history: &TandaHistory<'_>,
        tanda_id: TandaId,
        payer: &UserId,
        replaced: &UserId,
    ) -> Result<bool, TandaError> {
        if history.seat_taken_over(replaced) {
            tracing::warn!(tanda_id = %tanda_id, user_id = %payer, replaced_user_id = %replaced, "Replaced seat already filled");
            return Ok(false);
        }
        let mut invite = match self.ctx.invites.find_claimed_by(&tanda_id, payer).await? {
            Some(invite) if invite.replaced_user_id == *replaced => invite,
            _ => {
                tracing::warn!(tanda_id = %tanda_id, user_id = %payer, "Replacement joined without a claimed invite");
                return Ok(false);
            }
        };
        invite.mark_used();
        self.ctx.invites.update(&invite).await?;

        let now = self.ctx.now();
        self.ctx
            .append_all(vec![
                LedgerEvent::new(
                    TandaEvent::ReplacementConfirmed(ReplacementConfirmed {
                        replaced_user_id: replaced.clone(),
                    }),
                    now,
                )
                .for_tanda(tanda_id)
                .by_user(payer.clone()),
                LedgerEvent::new(
                    TandaEvent::ParticipantConfirmed(ParticipantConfirmed {
                        role: ParticipantRole::Member,
                        inherited_from: Some(replaced.clone()),
                    }),
                    now,
                )
                .for_tanda(tanda_id)
                .by_user(payer.clone()),
            ])
            .await?;
        tracing::info!(tanda_id = %tanda_id, user_id = %payer, replaced_user_id = %replaced, "Replacement confirmed");
        Ok(true)
    }

    async fn deposit(
        &self,
        history: &TandaHistory<'_>,
        tanda_id: TandaId,
        payer: &UserId,
        amount: i64,
        proof_id: &EventId,
    ) -> Result<PaymentApplication, TandaError> {
        self.ctx
            .append(
                LedgerEvent::new(
                    TandaEvent::InitialFundDeposited(InitialFundDeposited {
                        proof_event_id: proof_id.clone(),
                    }),
                    self.ctx.now(),
                )
                .for_tanda(tanda_id)
                .by_user(payer.clone())
                .with_amount(amount),
            )
            .await?;

        let events = self.ctx.load(&tanda_id).await?;
        let history_after = TandaHistory::new(&events);
        let collected = history_after.fund_collected();
        let required = history
            .created()
            .map(|(_, c)| c.required_initial_fund)
            .unwrap_or(0);

        let fund_completed = history_after.initial_fund_reached()
            && !history_after.has(EventType::InitialFundCompleted);
        if fund_completed {
            self.ctx
                .append(
                    LedgerEvent::new(
                        TandaEvent::InitialFundCompleted(InitialFundCompleted {
                            total_collected: collected,
                        }),
                        self.ctx.now(),
                    )
                    .for_tanda(tanda_id)
                    .with_amount(collected),
                )
                .await?;
            FundLedger::new(&self.ctx).initialize(tanda_id, required).await?;
            tracing::info!(tanda_id = %tanda_id, collected, required, "Initial fund completed");

            if let Some(organizer) = history.organizer() {
                self.ctx
                    .notify(
                        organizer,
                        &format!(
                            "The initial fund is complete (${}). Assign the turn order to start the tanda.",
                            collected
                        ),
                    )
                    .await;
            }
        }

        Ok(PaymentApplication::InitialDeposit {
            collected,
            required,
            fund_completed,
        })
    }

    async fn settle(
        &self,
        history: &TandaHistory<'_>,
        tanda_id: TandaId,
        payer: &UserId,
        amount: i64,
        proof_id: &EventId,
    ) -> Result<PaymentApplication, TandaError> {
        let now = self.ctx.now();
        let Some(entry) = history.target_period(payer) else {
            self.ctx
                .append(
                    LedgerEvent::new(
                        TandaEvent::ContributionReceived(ContributionReceived {
                            round: None,
                            timing: None,
                            proof_event_id: Some(proof_id.clone()),
                        }),
                        now,
                    )
                    .for_tanda(tanda_id)
                    .by_user(payer.clone())
                    .with_amount(amount),
                )
                .await?;
            return Ok(PaymentApplication::Unassigned);
        };

        let timing = PaymentTiming::classify(&entry, now);
        if history.covered_rounds(payer).contains(&entry.round) {
            repay_coverage(&self.ctx, tanda_id, payer, entry.round, timing, amount).await?;
            return Ok(PaymentApplication::CoverageRepayment { round: entry.round });
        }

        self.ctx
            .append(
                LedgerEvent::new(
                    TandaEvent::ContributionReceived(ContributionReceived {
                        round: Some(entry.round),
                        timing: Some(timing),
                        proof_event_id: Some(proof_id.clone()),
                    }),
                    now,
                )
                .for_tanda(tanda_id)
                .by_user(payer.clone())
                .with_amount(amount),
            )
            .await?;
        if history.has_round_event(EventType::DefaultConfirmed, payer, entry.round) {
            regularize_default(&self.ctx, tanda_id, payer, entry.round, amount).await?;
        }
        Ok(PaymentApplication::Contribution { round: entry.round })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::lifecycle::{
        JoinTandaCommand, JoinTandaHandler, ReplaceParticipantCommand, ReplaceParticipantHandler,
    };
    use crate::application::testing::{user, Harness};
    use crate::domain::foundation::ErrorCode;
    use crate::domain::ledger::events::{ParticipantInvited, ReplacementJoined};
    use crate::domain::tanda::{InviteStatus, Tanda};

    /// beto defaults before his turn and is expelled; returns the code.
    async fn expel_beto(h: &Harness) -> (Tanda, String) {
        let tanda = h.active_tanda(&["ana", "beto"]).await;
        h.default_in(&tanda, "beto", 1).await;
        let code = ReplaceParticipantHandler::new(h.ctx.clone())
            .handle(ReplaceParticipantCommand {
                tanda_id: tanda.id,
                organizer_id: user("org"),
                user_id: user("beto"),
            })
            .await
            .unwrap()
            .code;
        (tanda, code)
    }

    #[tokio::test]
    async fn completes_initial_fund_exactly_once() {
        let h = Harness::new();
        let tanda = h.create_tanda(2).await;
        h.join(&tanda, "ana").await;
        h.join(&tanda, "beto").await;

        let first = h.deposit(&tanda, "ana").await;
        assert_eq!(
            first.application,
            PaymentApplication::InitialDeposit {
                collected: 1000,
                required: 2000,
                fund_completed: false
            }
        );

        let second = h.deposit(&tanda, "beto").await;
        assert_eq!(
            second.application,
            PaymentApplication::InitialDeposit {
                collected: 2000,
                required: 2000,
                fund_completed: true
            }
        );
        assert_eq!(h.store.count_of(EventType::InitialFundCompleted), 1);
        assert_eq!(h.store.count_of(EventType::FundLayerAllocated), 1);

        // A second deposit from the same seat does not complete it again
        h.deposit(&tanda, "ana").await;
        assert_eq!(h.store.count_of(EventType::InitialFundCompleted), 1);
    }

    #[tokio::test]
    async fn rejection_records_verdict_only() {
        let h = Harness::new();
        let tanda = h.create_tanda(2).await;
        h.join(&tanda, "ana").await;
        let proof_id = h.proof(&tanda, "ana").await;

        let result = ValidatePaymentHandler::new(h.ctx.clone())
            .handle(ValidatePaymentCommand {
                tanda_id: tanda.id,
                organizer_id: user("org"),
                proof_id: proof_id.clone(),
                accept: false,
            })
            .await
            .unwrap();

        assert_eq!(result.application, PaymentApplication::Rejected);
        assert_eq!(h.store.count_of(EventType::PaymentRejected), 1);
        assert_eq!(h.store.count_of(EventType::InitialFundDeposited), 0);
        assert_eq!(h.notifier.sent_to(&user("ana")).len(), 1);
    }

    #[tokio::test]
    async fn proof_cannot_be_decided_twice() {
        let h = Harness::new();
        let tanda = h.create_tanda(2).await;
        h.join(&tanda, "ana").await;
        let proof_id = h.proof(&tanda, "ana").await;
        let handler = ValidatePaymentHandler::new(h.ctx.clone());
        let cmd = ValidatePaymentCommand {
            tanda_id: tanda.id,
            organizer_id: user("org"),
            proof_id,
            accept: true,
        };

        handler.handle(cmd.clone()).await.unwrap();
        let err = handler.handle(cmd).await.unwrap_err();
        assert!(matches!(err, TandaError::ProofAlreadyDecided(_)));
    }

    #[tokio::test]
    async fn only_organizer_validates() {
        let h = Harness::new();
        let tanda = h.create_tanda(2).await;
        h.join(&tanda, "ana").await;
        let proof_id = h.proof(&tanda, "ana").await;

        let err = ValidatePaymentHandler::new(h.ctx.clone())
            .handle(ValidatePaymentCommand {
                tanda_id: tanda.id,
                organizer_id: user("ana"),
                proof_id,
                accept: true,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotOrganizer);
    }

    #[tokio::test]
    async fn unknown_proof_is_not_found() {
        let h = Harness::new();
        let tanda = h.create_tanda(2).await;
        let err = ValidatePaymentHandler::new(h.ctx.clone())
            .handle(ValidatePaymentCommand {
                tanda_id: tanda.id,
                organizer_id: user("org"),
                proof_id: EventId::new(),
                accept: true,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ProofNotFound);
    }

    #[tokio::test]
    async fn active_tanda_proof_settles_oldest_round() {
        let h = Harness::new();
        let tanda = h.active_tanda(&["ana", "beto"]).await;

        let result = h.deposit(&tanda, "ana").await;
        assert_eq!(result.application, PaymentApplication::Contribution { round: 1 });
        let result = h.deposit(&tanda, "ana").await;
        assert_eq!(result.application, PaymentApplication::Contribution { round: 2 });
        let result = h.deposit(&tanda, "ana").await;
        assert_eq!(result.application, PaymentApplication::Unassigned);
    }

    #[tokio::test]
    async fn replacement_payment_takes_over_the_seat() {
        let h = Harness::new();
        let (tanda, code) = expel_beto(&h).await;
        JoinTandaHandler::new(h.ctx.clone())
            .handle(JoinTandaCommand {
                user_id: user("dora"),
                code: code.clone(),
            })
            .await
            .unwrap();

        let result = h.deposit(&tanda, "dora").await;
        assert!(result.replacement_confirmed);
        assert!(result.reply().contains("Replacement seat confirmed"));
        assert_eq!(h.invites.get(&code).unwrap().status, InviteStatus::Used);
        assert_eq!(h.store.count_of(EventType::ReplacementConfirmed), 1);

        let events = h.ctx.load(&tanda.id).await.unwrap();
        let history = TandaHistory::new(&events);
        assert_eq!(history.tanda().unwrap().current_participants, 2);
        assert_eq!(history.inherited_from(&user("dora")), Some(&user("beto")));
        let calendar = history.calendar().unwrap();
        assert_eq!(history.turn_of(&calendar, &user("dora")).unwrap().round, 2);
    }

    #[tokio::test]
    async fn replacement_without_claimed_invite_is_not_seated() {
        let h = Harness::new();
        let (tanda, code) = expel_beto(&h).await;

        // Joined in the ledger only; the invite still has no holder
        let now = h.ctx.now();
        h.ctx
            .append_all(vec![
                LedgerEvent::new(
                    TandaEvent::ReplacementJoined(ReplacementJoined {
                        code: code.clone(),
                        replaced_user_id: user("beto"),
                    }),
                    now,
                )
                .for_tanda(tanda.id)
                .by_user(user("mia")),
                LedgerEvent::new(
                    TandaEvent::ParticipantInvited(ParticipantInvited {
                        role: ParticipantRole::ReplacementPending,
                        replaced_user_id: Some(user("beto")),
                    }),
                    now,
                )
                .for_tanda(tanda.id)
                .by_user(user("mia")),
            ])
            .await
            .unwrap();

        let result = h.deposit(&tanda, "mia").await;
        assert!(!result.replacement_confirmed);
        assert_eq!(h.store.count_of(EventType::ReplacementConfirmed), 0);
        assert!(h.invites.get(&code).unwrap().is_active());
    }
}
