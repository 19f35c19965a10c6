//! RegularizationSweep - Reminds, warns and finally expires open
//! regularization windows.
//!
//! | Elapsed since coverage | Fact appended |
//! |------------------------|---------------|
//! | 24h to 48h | `WindowReminderSent { day: 2 }` |
//! | 48h until the deadline | `WindowFinalNoticeSent` |
//! | deadline reached | `DefaultConfirmed { window_expired }` |
//!
//! Each fact is appended at most once per window; its presence in the
//! ledger is what makes the next pass skip it.

use crate::domain::foundation::{TandaId, UserId};
use crate::domain::ledger::events::{DefaultConfirmed, RoundMarker, WindowReminderSent};
use crate::domain::ledger::{DefaultReason, EventType, LedgerEvent, TandaEvent};
use crate::domain::tanda::{OpenWindow, TandaError, TandaHistory, TandaStatus};

use crate::application::context::LedgerContext;

use super::active_tandas;

/// Day of the window on which the first reminder goes out.
const REMINDER_DAY: u8 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowSweepReport {
    pub open_windows: usize,
    pub reminders: usize,
    pub final_notices: usize,
    pub expired: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowAction {
    Remind,
    FinalNotice,
    Expire,
}

pub struct RegularizationSweep {
    ctx: LedgerContext,
}

impl RegularizationSweep {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    pub async fn run(&self) -> Result<WindowSweepReport, TandaError> {
        let mut report = WindowSweepReport::default();
        for tanda_id in active_tandas(&self.ctx).await? {
            if let Err(e) = self.sweep_tanda(tanda_id, &mut report).await {
                report.failed += 1;
                tracing::error!(tanda_id = %tanda_id, error = %e, "Regularization sweep failed");
            }
        }
        if report.expired > 0 {
            tracing::info!(expired = report.expired, "Regularization windows expired");
        }
        Ok(report)
    }

    async fn sweep_tanda(
        &self,
        tanda_id: TandaId,
        report: &mut WindowSweepReport,
    ) -> Result<(), TandaError> {
        let _guard = self.ctx.lock(tanda_id).await?;
        let events = self.ctx.load(&tanda_id).await?;
        let history = TandaHistory::new(&events);
        if history.status() != Some(TandaStatus::Active) {
            return Ok(());
        }
        let now = self.ctx.now();

        for window in history.open_windows(None) {
            report.open_windows += 1;
            let elapsed_hours = now.duration_since(&window.started_at).num_hours();
            let action = if !now.is_before(&window.ends_at) {
                Some(WindowAction::Expire)
            } else if elapsed_hours >= 48 {
                (!history.has_round_event(
                    EventType::WindowFinalNoticeSent,
                    &window.user_id,
                    window.round,
                ))
                .then_some(WindowAction::FinalNotice)
            } else if elapsed_hours >= 24 {
                (!history.has_round_event(
                    EventType::WindowReminderSent,
                    &window.user_id,
                    window.round,
                ))
                .then_some(WindowAction::Remind)
            } else {
                None
            };

            let Some(action) = action else {
                continue;
            };
            self.apply(tanda_id, &history, &window, action).await?;
            match action {
                WindowAction::Remind => report.reminders += 1,
                WindowAction::FinalNotice => report.final_notices += 1,
                WindowAction::Expire => report.expired += 1,
            }
        }
        Ok(())
    }

    async fn apply(
        &self,
        tanda_id: TandaId,
        history: &TandaHistory<'_>,
        window: &OpenWindow,
        action: WindowAction,
    ) -> Result<(), TandaError> {
        let round = window.round;
        let user = &window.user_id;
        let contribution = history.contribution_amount();
        let (event, message) = match action {
            WindowAction::Remind => (
                TandaEvent::WindowReminderSent(WindowReminderSent {
                    round,
                    day: REMINDER_DAY,
                }),
                format!(
                    "Reminder: the fund covered your period {} payment. Pay ${} before {} to restore your standing.",
                    round,
                    contribution,
                    window.ends_at.day_month()
                ),
            ),
            WindowAction::FinalNotice => (
                TandaEvent::WindowFinalNoticeSent(RoundMarker { round }),
                format!(
                    "Final notice: your regularization window for period {} closes {}. After that the missed payment becomes a default.",
                    round,
                    window.ends_at.day_month()
                ),
            ),
            WindowAction::Expire => (
                TandaEvent::DefaultConfirmed(DefaultConfirmed {
                    round,
                    reason: DefaultReason::WindowExpired,
                }),
                format!(
                    "Your regularization window for period {} expired. The missed payment is now a confirmed default.",
                    round
                ),
            ),
        };

        self.ctx
            .append(
                LedgerEvent::new(event, self.ctx.now())
                    .for_tanda(tanda_id)
                    .by_user(user.clone()),
            )
            .await?;
        self.ctx.notify(user, &message).await;

        if action == WindowAction::Expire {
            tracing::warn!(tanda_id = %tanda_id, user_id = %user, round, "Regularization window expired");
            self.tell_organizer(history, user, round).await;
        } else {
            tracing::debug!(tanda_id = %tanda_id, user_id = %user, round, action = ?action, "Window notice sent");
        }
        Ok(())
    }

    async fn tell_organizer(&self, history: &TandaHistory<'_>, user: &UserId, round: u32) {
        if let Some(organizer) = history.organizer() {
            self.ctx
                .notify(
                    organizer,
                    &format!(
                        "{}... did not regularize period {}. The default is confirmed.",
                        user.short(10),
                        round
                    ),
                )
                .await;
        }
    }
}
