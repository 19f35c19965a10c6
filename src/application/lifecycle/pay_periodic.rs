//! PayPeriodicHandler - Applies an exact contribution to the oldest open round.

use crate::domain::foundation::{TandaId, UserId};
use crate::domain::ledger::events::{ContributionReceived, RoundPayment};
use crate::domain::ledger::{EventType, LedgerEvent, TandaEvent};
use crate::domain::tanda::{PaymentTiming, TandaError, TandaHistory, TandaStatus};

use crate::application::context::LedgerContext;
use crate::application::coverage::{regularize_default, repay_coverage};

#[derive(Debug, Clone)]
pub struct PayPeriodicCommand {
    pub tanda_id: TandaId,
    pub user_id: UserId,
    pub amount: i64,
    pub external_ref: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PayPeriodicResult {
    pub round: u32,
    pub timing: PaymentTiming,
    /// The round had been covered by the fund and the payment went back to it.
    pub repaid_coverage: bool,
}

impl PayPeriodicResult {
    pub fn reply(&self) -> String {
        if self.repaid_coverage {
            return format!(
                "Payment received. The fund coverage of period {} is repaid and your standing is restored.",
                self.round
            );
        }
        let when = match self.timing {
            PaymentTiming::OnTime => "on time",
            PaymentTiming::Grace => "within the grace window",
            PaymentTiming::Late => "late",
        };
        format!("Payment for period {} received {}.", self.round, when)
    }
}

pub struct PayPeriodicHandler {
    ctx: LedgerContext,
}

impl PayPeriodicHandler {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    pub async fn handle(&self, cmd: PayPeriodicCommand) -> Result<PayPeriodicResult, TandaError> {
        let tanda_id = cmd.tanda_id;
        let user = &cmd.user_id;
        let _guard = self.ctx.lock(tanda_id).await?;
        let events = self.ctx.load_existing(&tanda_id).await?;
        let history = TandaHistory::new(&events);

        // 1. Guards
        if history.status() != Some(TandaStatus::Active) {
            return Err(TandaError::TandaNotActive);
        }
        if history.is_removed(user) {
            return Err(TandaError::ParticipantReplaced(user.clone()));
        }
        if !history.is_participant(user) {
            return Err(TandaError::NotParticipant(user.clone()));
        }
        let expected = history.contribution_amount();
        if cmd.amount != expected {
            return Err(TandaError::WrongAmount {
                expected,
                actual: cmd.amount,
            });
        }

        // 2. Pick the round and classify
        let entry = history.target_period(user).ok_or(TandaError::NoTargetPeriod)?;
        let now = self.ctx.now();
        let timing = PaymentTiming::classify(&entry, now);

        // 3. Covered rounds are repaid to the fund
        if history.covered_rounds(user).contains(&entry.round) {
            repay_coverage(&self.ctx, tanda_id, user, entry.round, timing, cmd.amount).await?;
            self.tell_organizer(&history, user, entry.round, true).await;
            return Ok(PayPeriodicResult {
                round: entry.round,
                timing,
                repaid_coverage: true,
            });
        }

        let with_ref = |event: LedgerEvent| match &cmd.external_ref {
            Some(r) => event.with_external_ref(r.clone()),
            None => event,
        };
        self.ctx
            .append_all(vec![
                with_ref(
                    LedgerEvent::new(
                        TandaEvent::PeriodicPaymentRecorded(RoundPayment {
                            round: entry.round,
                            timing,
                        }),
                        now,
                    )
                    .for_tanda(tanda_id)
                    .by_user(user.clone())
                    .with_amount(cmd.amount),
                ),
                LedgerEvent::new(
                    TandaEvent::ContributionReceived(ContributionReceived {
                        round: Some(entry.round),
                        timing: Some(timing),
                        proof_event_id: None,
                    }),
                    now,
                )
                .for_tanda(tanda_id)
                .by_user(user.clone())
                .with_amount(cmd.amount),
            ])
            .await?;

        if history.has_round_event(EventType::DefaultConfirmed, user, entry.round) {
            regularize_default(&self.ctx, tanda_id, user, entry.round, cmd.amount).await?;
        }

        tracing::info!(
            tanda_id = %tanda_id,
            user_id = %user,
            round = entry.round,
            timing = %timing,
            "Periodic payment recorded"
        );
        self.tell_organizer(&history, user, entry.round, false).await;

        Ok(PayPeriodicResult {
            round: entry.round,
            timing,
            repaid_coverage: false,
        })
    }

    async fn tell_organizer(
        &self,
        history: &TandaHistory<'_>,
        user: &UserId,
        round: u32,
        repaid: bool,
    ) {
        let Some(organizer) = history.organizer() else {
            return;
        };
        if organizer == user {
            return;
        }
        let what = if repaid { "repaid the coverage of" } else { "paid" };
        self.ctx
            .notify(
                organizer,
                &format!("{}... {} period {}.", user.short(10), what, round),
            )
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{user, Harness};
    use crate::domain::foundation::ErrorCode;

    fn pay(tanda_id: TandaId, who: &str, amount: i64) -> PayPeriodicCommand {
        PayPeriodicCommand {
            tanda_id,
            user_id: user(who),
            amount,
            external_ref: None,
        }
    }

    #[tokio::test]
    async fn on_time_payment_settles_first_round() {
        let h = Harness::new();
        let tanda = h.active_tanda(&["ana", "beto"]).await;

        let result = PayPeriodicHandler::new(h.ctx.clone())
            .handle(pay(tanda.id, "ana", 1000))
            .await
            .unwrap();

        assert_eq!(result.round, 1);
        assert_eq!(result.timing, PaymentTiming::OnTime);
        assert!(!result.repaid_coverage);
        assert_eq!(h.store.count_of(EventType::PeriodicPaymentRecorded), 1);
        assert_eq!(h.store.count_of(EventType::ContributionReceived), 1);
    }

    #[tokio::test]
    async fn timing_follows_due_date_and_grace() {
        let h = Harness::new();
        let tanda = h.active_tanda(&["ana", "beto"]).await;
        let handler = PayPeriodicHandler::new(h.ctx.clone());

        h.clock.advance_days(8);
        let grace = handler.handle(pay(tanda.id, "ana", 1000)).await.unwrap();
        assert_eq!(grace.timing, PaymentTiming::Grace);

        h.clock.advance_days(3);
        let late = handler.handle(pay(tanda.id, "beto", 1000)).await.unwrap();
        assert_eq!(late.round, 1);
        assert_eq!(late.timing, PaymentTiming::Late);
    }

    #[tokio::test]
    async fn rejects_partial_amounts_and_outsiders() {
        let h = Harness::new();
        let tanda = h.active_tanda(&["ana", "beto"]).await;
        let handler = PayPeriodicHandler::new(h.ctx.clone());

        let err = handler.handle(pay(tanda.id, "ana", 999)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::WrongAmount);

        let err = handler.handle(pay(tanda.id, "zoe", 1000)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotParticipant);
    }

    #[tokio::test]
    async fn nothing_left_to_pay() {
        let h = Harness::new();
        let tanda = h.active_tanda(&["ana", "beto"]).await;
        let handler = PayPeriodicHandler::new(h.ctx.clone());

        handler.handle(pay(tanda.id, "ana", 1000)).await.unwrap();
        handler.handle(pay(tanda.id, "ana", 1000)).await.unwrap();
        let err = handler.handle(pay(tanda.id, "ana", 1000)).await.unwrap_err();
        assert_eq!(err, TandaError::NoTargetPeriod);
    }

    #[tokio::test]
    async fn pending_tanda_is_not_active() {
        let h = Harness::new();
        let tanda = h.create_tanda(2).await;
        h.join(&tanda, "ana").await;

        let err = PayPeriodicHandler::new(h.ctx.clone())
            .handle(pay(tanda.id, "ana", 1000))
            .await
            .unwrap_err();
        assert_eq!(err, TandaError::TandaNotActive);
    }
}
