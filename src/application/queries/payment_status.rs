//! GetPaymentStatusHandler - One participant's standing and open rounds.

use serde::Serialize;

use crate::domain::foundation::{TandaId, UserId};
use crate::domain::tanda::{
    PendingPeriod, ScheduleEntry, TandaError, TandaHistory, UserPaymentStatus,
};

use crate::application::context::LedgerContext;

#[derive(Debug, Clone)]
pub struct GetPaymentStatusQuery {
    pub tanda_id: TandaId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentStatusView {
    pub status: UserPaymentStatus,
    /// Unpaid rounds already past their due date, oldest first.
    pub pending: Vec<PendingPeriod>,
    /// Round the next payment would settle.
    pub next: Option<ScheduleEntry>,
    pub coverage_count: usize,
}

pub struct GetPaymentStatusHandler {
    ctx: LedgerContext,
}

impl GetPaymentStatusHandler {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    pub async fn handle(
        &self,
        query: GetPaymentStatusQuery,
    ) -> Result<PaymentStatusView, TandaError> {
        let events = self.ctx.load_existing(&query.tanda_id).await?;
        let history = TandaHistory::new(&events);
        let user = &query.user_id;
        if !history.has_joined(user) {
            return Err(TandaError::NotParticipant(user.clone()));
        }

        let now = self.ctx.now();
        let status = history.payment_status(user, now);
        if status == UserPaymentStatus::Replaced {
            return Ok(PaymentStatusView {
                status,
                pending: Vec::new(),
                next: None,
                coverage_count: history.coverage_count(user),
            });
        }
        Ok(PaymentStatusView {
            status,
            pending: history.pending_periods(user, now),
            next: history.target_period(user),
            coverage_count: history.coverage_count(user),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::lifecycle::{PayPeriodicCommand, PayPeriodicHandler};
    use crate::application::testing::{user, Harness};
    use crate::domain::tanda::PeriodStatus;

    fn status_of(tanda_id: TandaId, who: &str) -> GetPaymentStatusQuery {
        GetPaymentStatusQuery {
            tanda_id,
            user_id: user(who),
        }
    }

    #[tokio::test]
    async fn fresh_participant_is_current() {
        let h = Harness::new();
        let tanda = h.active_tanda(&["ana", "beto"]).await;

        let view = GetPaymentStatusHandler::new(h.ctx.clone())
            .handle(status_of(tanda.id, "ana"))
            .await
            .unwrap();
        assert_eq!(view.status, UserPaymentStatus::Current);
        assert!(view.pending.is_empty());
        assert_eq!(view.next.map(|e| e.round), Some(1));
    }

    #[tokio::test]
    async fn missed_round_shows_as_pending() {
        let h = Harness::new();
        let tanda = h.active_tanda(&["ana", "beto"]).await;
        PayPeriodicHandler::new(h.ctx.clone())
            .handle(PayPeriodicCommand {
                tanda_id: tanda.id,
                user_id: user("beto"),
                amount: 1000,
                external_ref: None,
            })
            .await
            .unwrap();
        h.clock.advance_days(9);

        let handler = GetPaymentStatusHandler::new(h.ctx.clone());
        let ana = handler.handle(status_of(tanda.id, "ana")).await.unwrap();
        assert_eq!(ana.status, UserPaymentStatus::InGrace);
        assert_eq!(
            ana.pending,
            vec![PendingPeriod {
                round: 1,
                status: PeriodStatus::InGrace
            }]
        );

        let beto = handler.handle(status_of(tanda.id, "beto")).await.unwrap();
        assert_eq!(beto.status, UserPaymentStatus::Current);
        assert_eq!(beto.next.map(|e| e.round), Some(2));
    }

    #[tokio::test]
    async fn unknown_user_is_refused() {
        let h = Harness::new();
        let tanda = h.active_tanda(&["ana", "beto"]).await;

        let err = GetPaymentStatusHandler::new(h.ctx.clone())
            .handle(status_of(tanda.id, "zoe"))
            .await
            .unwrap_err();
        assert_eq!(err, TandaError::NotParticipant(user("zoe")));
    }
}
