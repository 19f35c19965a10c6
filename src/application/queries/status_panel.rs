//! GetStatusPanelHandler - The STATUS panel, shaped by who is asking.
//!
//! Organizers see the whole group: counts per payment status, the last
//! notable fact and the fund. Members see their own standing and the first
//! period they still owe.

use serde::Serialize;

use crate::domain::foundation::{TandaId, Timestamp, UserId};
use crate::domain::tanda::{
    CurrentPeriod, FundHealth, FundStatus, PendingPeriod, TandaError, TandaHistory, TandaSummary,
    UserPaymentStatus,
};

use crate::application::context::LedgerContext;

#[derive(Debug, Clone)]
pub struct GetStatusPanelQuery {
    pub tanda_id: TandaId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganizerPanel {
    pub name: String,
    pub period: CurrentPeriod,
    pub summary: TandaSummary,
    pub fund: FundStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberPanel {
    pub name: String,
    pub period: CurrentPeriod,
    pub contribution: i64,
    pub status: UserPaymentStatus,
    /// Due date of the next round the member owes, if any.
    pub deadline: Option<Timestamp>,
    pub first_pending: Option<PendingPeriod>,
    pub fund: FundHealth,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum StatusPanel {
    Organizer(OrganizerPanel),
    Member(MemberPanel),
}

impl StatusPanel {
    pub fn render(&self) -> String {
        match self {
            StatusPanel::Organizer(p) => {
                let mut out = format!(
                    "{} - period {}/{}\n\nUp to date: {}\nIn grace: {}\nLate: {}\nReplaced: {}",
                    p.name,
                    p.period.round,
                    p.period.total,
                    p.summary.paid,
                    p.summary.in_grace,
                    p.summary.late,
                    p.summary.replaced
                );
                if let Some(last) = &p.summary.last_notable {
                    out.push_str(&format!("\n\nLast event: {}", last));
                }
                out.push_str(&format!("\n\nFund: {} (${})", p.fund.health.label(), p.fund.amount));
                out
            }
            StatusPanel::Member(p) => {
                let mut out = format!(
                    "{} - period {}/{}\n\nContribution: ${}\nYour status: {}",
                    p.name,
                    p.period.round,
                    p.period.total,
                    p.contribution,
                    p.status.label()
                );
                if let Some(deadline) = p.deadline {
                    out.push_str(&format!("\nNext deadline: {}", deadline.day_month()));
                }
                if let Some(pending) = p.first_pending {
                    out.push_str(&format!("\nPending: period {}", pending.round));
                }
                out.push_str(&format!("\n\nFund: {}", p.fund.label()));
                out
            }
        }
    }
}

pub struct GetStatusPanelHandler {
    ctx: LedgerContext,
}

impl GetStatusPanelHandler {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    /// # Errors
    ///
    /// `TandaNotActive` before a calendar exists, `NotParticipant` for users
    /// who never joined.
    pub async fn handle(&self, query: GetStatusPanelQuery) -> Result<StatusPanel, TandaError> {
        let events = self.ctx.load_existing(&query.tanda_id).await?;
        let history = TandaHistory::new(&events);
        let now = self.ctx.now();

        let period = history
            .current_period(now)
            .ok_or(TandaError::TandaNotActive)?;
        let name = history
            .created()
            .map(|(_, c)| c.name.clone())
            .unwrap_or_default();
        let user = &query.user_id;

        if history.organizer() == Some(user) {
            return Ok(StatusPanel::Organizer(OrganizerPanel {
                name,
                period,
                summary: history.summary(now),
                fund: history.fund_status(),
            }));
        }
        if !history.has_joined(user) {
            return Err(TandaError::NotParticipant(user.clone()));
        }

        let removed = history.is_removed(user);
        Ok(StatusPanel::Member(MemberPanel {
            name,
            period,
            contribution: history.contribution_amount(),
            status: history.payment_status(user, now),
            deadline: (!removed)
                .then(|| history.target_period(user).map(|e| e.due_date))
                .flatten(),
            first_pending: (!removed)
                .then(|| history.pending_periods(user, now).into_iter().next())
                .flatten(),
            fund: history.fund_status().health,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{user, Harness};
    use crate::domain::tanda::PeriodStatus;

    fn panel_for(tanda_id: TandaId, who: &str) -> GetStatusPanelQuery {
        GetStatusPanelQuery {
            tanda_id,
            user_id: user(who),
        }
    }

    #[tokio::test]
    async fn organizer_sees_group_counts() {
        let h = Harness::new();
        let tanda = h.active_tanda(&["ana", "beto"]).await;
        h.clock.advance_days(8);

        let panel = GetStatusPanelHandler::new(h.ctx.clone())
            .handle(panel_for(tanda.id, "org"))
            .await
            .unwrap();
        let StatusPanel::Organizer(p) = &panel else {
            panic!("expected organizer panel, got {:?}", panel);
        };
        assert_eq!(p.period.round, 2);
        assert_eq!(p.period.total, 2);
        assert_eq!(p.summary.in_grace, 2);
        assert_eq!(p.fund.amount, 2000);
        assert!(panel.render().contains("In grace: 2"));
    }

    #[tokio::test]
    async fn member_sees_own_standing() {
        let h = Harness::new();
        let tanda = h.active_tanda(&["ana", "beto"]).await;
        h.clock.advance_days(12);

        let panel = GetStatusPanelHandler::new(h.ctx.clone())
            .handle(panel_for(tanda.id, "ana"))
            .await
            .unwrap();
        let StatusPanel::Member(p) = &panel else {
            panic!("expected member panel, got {:?}", panel);
        };
        assert_eq!(p.status, UserPaymentStatus::Late);
        assert_eq!(
            p.first_pending,
            Some(PendingPeriod {
                round: 1,
                status: PeriodStatus::Late
            })
        );
        assert_eq!(p.contribution, 1000);
        assert!(panel.render().contains("Pending: period 1"));
    }

    #[tokio::test]
    async fn pending_tanda_has_no_panel() {
        let h = Harness::new();
        let tanda = h.create_tanda(2).await;

        let err = GetStatusPanelHandler::new(h.ctx.clone())
            .handle(panel_for(tanda.id, "org"))
            .await
            .unwrap_err();
        assert_eq!(err, TandaError::TandaNotActive);
    }

    #[tokio::test]
    async fn strangers_are_refused() {
        let h = Harness::new();
        let tanda = h.active_tanda(&["ana", "beto"]).await;

        let err = GetStatusPanelHandler::new(h.ctx.clone())
            .handle(panel_for(tanda.id, "zoe"))
            .await
            .unwrap_err();
        assert_eq!(err, TandaError::NotParticipant(user("zoe")));
    }
}
