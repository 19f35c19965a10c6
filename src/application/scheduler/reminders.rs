//! ReminderSweep - E1..E4 payment reminders around each round's due date.
//!
//! A stage is sent at most once per (tanda, user, round); the reminder flag
//! table records what went out. Rounds already covered by the fund are left
//! to the regularization sweep, which sends its own notices.

use crate::domain::foundation::TandaId;
use crate::domain::ledger::EventType;
use crate::domain::tanda::{ReminderStage, TandaError, TandaHistory, TandaStatus};

use crate::application::context::LedgerContext;

use super::active_tandas;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderSweepReport {
    pub sent: usize,
    pub failed: usize,
}

pub struct ReminderSweep {
    ctx: LedgerContext,
}

impl ReminderSweep {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    pub async fn run(&self) -> Result<ReminderSweepReport, TandaError> {
        let mut report = ReminderSweepReport::default();
        for tanda_id in active_tandas(&self.ctx).await? {
            match self.sweep_tanda(tanda_id).await {
                Ok(sent) => report.sent += sent,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(tanda_id = %tanda_id, error = %e, "Reminder sweep failed");
                }
            }
        }
        Ok(report)
    }

    async fn sweep_tanda(&self, tanda_id: TandaId) -> Result<usize, TandaError> {
        let _guard = self.ctx.lock(tanda_id).await?;
        let events = self.ctx.load(&tanda_id).await?;
        let history = TandaHistory::new(&events);
        if history.status() != Some(TandaStatus::Active) {
            return Ok(0);
        }
        let calendar = history
            .calendar()
            .ok_or(TandaError::MissingCalendar(tanda_id))?;
        let now = self.ctx.now();
        let contribution = history.contribution_amount();

        let mut sent = 0;
        for user in history.participants() {
            let paid = history.paid_rounds(&user);
            for entry in history.obligations(&calendar, &user) {
                let Some(stage) = ReminderStage::at(entry.due_date, now) else {
                    continue;
                };
                if paid.contains(&entry.round)
                    || history.has_round_event(EventType::PoolCovered, &user, entry.round)
                {
                    continue;
                }
                let flags = self
                    .ctx
                    .reminder_flags
                    .get(&tanda_id, &user, entry.round)
                    .await?;
                if flags.is_sent(stage) {
                    continue;
                }

                self.ctx
                    .notify(&user, &stage.message(entry.round, contribution))
                    .await;
                self.ctx
                    .reminder_flags
                    .mark(&tanda_id, &user, entry.round, stage)
                    .await?;
                tracing::debug!(
                    tanda_id = %tanda_id,
                    user_id = %user,
                    round = entry.round,
                    stage = %stage,
                    "Payment reminder sent"
                );
                sent += 1;
            }
        }
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::lifecycle::{PayPeriodicCommand, PayPeriodicHandler};
    use crate::application::testing::{user, Harness};

    #[tokio::test]
    async fn each_stage_goes_out_once() {
        let h = Harness::new();
        h.active_tanda(&["ana", "beto"]).await;
        let sweep = ReminderSweep::new(h.ctx.clone());

        // Day before round 1 is due
        h.clock.advance_hours(6 * 24 + 12);
        assert_eq!(sweep.run().await.unwrap().sent, 2);
        assert_eq!(sweep.run().await.unwrap().sent, 0);
        assert!(h
            .notifier
            .sent_to(&user("ana"))
            .last()
            .unwrap()
            .contains("due tomorrow"));

        // Due day
        h.clock.advance_hours(12);
        assert_eq!(sweep.run().await.unwrap().sent, 2);
        assert!(h
            .notifier
            .sent_to(&user("beto"))
            .last()
            .unwrap()
            .contains("due today"));
    }

    #[tokio::test]
    async fn paid_rounds_get_no_reminder() {
        let h = Harness::new();
        let tanda = h.active_tanda(&["ana", "beto"]).await;
        PayPeriodicHandler::new(h.ctx.clone())
            .handle(PayPeriodicCommand {
                tanda_id: tanda.id,
                user_id: user("ana"),
                amount: 1000,
                external_ref: None,
            })
            .await
            .unwrap();
        h.clock.advance_hours(6 * 24 + 12);

        assert_eq!(ReminderSweep::new(h.ctx.clone()).run().await.unwrap().sent, 1);
        assert!(h
            .notifier
            .sent_to(&user("ana"))
            .iter()
            .all(|m| !m.contains("due tomorrow")));
    }

    #[tokio::test]
    async fn quiet_between_stages() {
        let h = Harness::new();
        h.active_tanda(&["ana", "beto"]).await;
        h.clock.advance_days(3);

        assert_eq!(ReminderSweep::new(h.ctx.clone()).run().await.unwrap().sent, 0);
    }
}
