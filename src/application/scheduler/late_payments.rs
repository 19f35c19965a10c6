//! LatePaymentSweep - Escalates rounds that passed their due date unpaid.
//!
//! Every unpaid past-due round gets exactly one `ContributionLate`. The
//! fund then covers it (`PoolCovered` plus a regularization window) while
//! the user has fewer than two coverages in the tanda; otherwise, or when
//! the fund layers cannot absorb the amount, the round becomes a
//! `DefaultConfirmed`.
//!
//! A round counts as handled once it has `PoolCovered` or
//! `DefaultConfirmed`. A pass that failed after `ContributionLate` is
//! finished by the next one. The coverage facts and `FundLayerUsed` go in
//! one batch, and the layer table is written after it.

use std::collections::BTreeMap;

use crate::domain::foundation::{TandaId, Timestamp, UserId};
use crate::domain::ledger::events::{
    DefaultConfirmed, PoolCovered, RegularizationWindowStarted, RoundMarker,
};
use crate::domain::ledger::{DefaultReason, EventType, LedgerEvent, TandaEvent};
use crate::domain::tanda::policy::{
    COVERAGE_POLICY_VERSION, MAX_COVERAGES_PER_USER, REGULARIZATION_WINDOW_DAYS,
};
use crate::domain::tanda::{ScheduleEntry, TandaError, TandaHistory, TandaStatus};

use crate::application::context::LedgerContext;
use crate::application::fund_ledger::{DrawPlan, FundLedger, PendingDraw};

use super::active_tandas;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LateSweepReport {
    pub tandas: usize,
    pub marked_late: usize,
    pub covered: usize,
    pub defaulted: usize,
    /// Tandas skipped because their pass failed.
    pub failed: usize,
}

impl LateSweepReport {
    fn absorb(&mut self, other: LateSweepReport) {
        self.marked_late += other.marked_late;
        self.covered += other.covered;
        self.defaulted += other.defaulted;
    }
}

pub struct LatePaymentSweep {
    ctx: LedgerContext,
}

impl LatePaymentSweep {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    /// One pass over every active tanda. A failing tanda is logged and
    /// skipped so the others still get their pass.
    pub async fn run(&self) -> Result<LateSweepReport, TandaError> {
        let mut report = LateSweepReport::default();
        for tanda_id in active_tandas(&self.ctx).await? {
            report.tandas += 1;
            match self.sweep_tanda(tanda_id).await {
                Ok(partial) => report.absorb(partial),
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(tanda_id = %tanda_id, error = %e, "Late payment sweep failed");
                }
            }
        }
        if report.marked_late + report.covered + report.defaulted > 0 {
            tracing::info!(
                tandas = report.tandas,
                marked_late = report.marked_late,
                covered = report.covered,
                defaulted = report.defaulted,
                "Late payment sweep escalated rounds"
            );
        }
        Ok(report)
    }

    async fn sweep_tanda(&self, tanda_id: TandaId) -> Result<LateSweepReport, TandaError> {
        let _guard = self.ctx.lock(tanda_id).await?;
        let events = self.ctx.load(&tanda_id).await?;
        let history = TandaHistory::new(&events);
        if history.status() != Some(TandaStatus::Active) {
            return Ok(LateSweepReport::default());
        }
        let calendar = history
            .calendar()
            .ok_or(TandaError::MissingCalendar(tanda_id))?;
        let now = self.ctx.now();
        let fund = FundLedger::new(&self.ctx);

        if let Err(e) = fund.repair(tanda_id, &events).await {
            tracing::warn!(tanda_id = %tanda_id, error = %e, "Fund layer table not repaired before sweep");
        }

        let mut missed: Vec<(UserId, ScheduleEntry, bool)> = Vec::new();
        for user in history.participants() {
            let paid = history.paid_rounds(&user);
            for entry in history.obligations(&calendar, &user) {
                if !entry.due_date.is_before(&now) || paid.contains(&entry.round) {
                    continue;
                }
                let handled = history.has_round_event(EventType::PoolCovered, &user, entry.round)
                    || history.has_round_event(EventType::DefaultConfirmed, &user, entry.round);
                if !handled {
                    let late = history.has_round_event(EventType::ContributionLate, &user, entry.round);
                    missed.push((user.clone(), entry, late));
                }
            }
        }

        let mut report = LateSweepReport::default();
        let mut coverages: BTreeMap<UserId, usize> = BTreeMap::new();
        let contribution = history.contribution_amount();
        let organizer = history.organizer().cloned();

        for (user, entry, already_late) in missed {
            let count = coverages
                .entry(user.clone())
                .or_insert_with(|| history.coverage_count(&user));
            let escalation = Escalation {
                ctx: &self.ctx,
                tanda_id,
                user: &user,
                round: entry.round,
                now,
            };

            if !already_late {
                escalation.mark_late().await?;
                report.marked_late += 1;
            }

            let decision = if *count >= MAX_COVERAGES_PER_USER {
                Err(DefaultReason::LimitExceeded)
            } else {
                match fund.prepare_draw(tanda_id, &user, contribution).await? {
                    DrawPlan::Ready(pending) => Ok(Some(pending)),
                    DrawPlan::Unallocated => Ok(None),
                    DrawPlan::Insufficient { .. } => Err(DefaultReason::FundExhausted),
                }
            };

            match decision {
                Ok(draw) => {
                    let ends_at = escalation.cover(*count + 1, contribution, draw).await?;
                    *count += 1;
                    report.covered += 1;
                    self.ctx
                        .notify(
                            &user,
                            &format!(
                                "The safety fund covered your contribution for period {}.\nPay ${} before {} to restore your standing.",
                                entry.round,
                                contribution,
                                ends_at.day_month()
                            ),
                        )
                        .await;
                }
                Err(reason) => {
                    escalation.confirm_default(reason).await?;
                    report.defaulted += 1;
                    self.ctx
                        .notify(
                            &user,
                            &format!(
                                "Your missed payment for period {} is now a confirmed default. You cannot join or create tandas until it is resolved.",
                                entry.round
                            ),
                        )
                        .await;
                    if let Some(organizer) = &organizer {
                        self.ctx
                            .notify(
                                organizer,
                                &format!(
                                    "{}... defaulted on period {}. Reply REPLACE to review options.",
                                    user.short(10),
                                    entry.round
                                ),
                            )
                            .await;
                    }
                }
            }
        }
        Ok(report)
    }
}

/// Appends the escalation facts of one (user, round).
struct Escalation<'a> {
    ctx: &'a LedgerContext,
    tanda_id: TandaId,
    user: &'a UserId,
    round: u32,
    now: Timestamp,
}

impl Escalation<'_> {
    fn event(&self, event: TandaEvent) -> LedgerEvent {
        LedgerEvent::new(event, self.now)
            .for_tanda(self.tanda_id)
            .by_user(self.user.clone())
    }

    async fn mark_late(&self) -> Result<(), TandaError> {
        self.ctx
            .append(self.event(TandaEvent::ContributionLate(RoundMarker { round: self.round })))
            .await?;
        Ok(())
    }

    /// Records the coverage, opens its window and books the draw in one
    /// batch; returns the window end.
    async fn cover(
        &self,
        coverage_count: usize,
        amount: i64,
        draw: Option<PendingDraw>,
    ) -> Result<Timestamp, TandaError> {
        let ends_at = self.now.add_days(REGULARIZATION_WINDOW_DAYS);
        let facts = vec![
            self.event(TandaEvent::PoolCovered(PoolCovered {
                round: self.round,
                coverage_count: coverage_count as u32,
                policy_version: COVERAGE_POLICY_VERSION.to_string(),
            }))
            .with_amount(amount),
            self.event(TandaEvent::RegularizationWindowStarted(
                RegularizationWindowStarted {
                    round: self.round,
                    ends_at,
                },
            )),
        ];
        match draw {
            Some(pending) => {
                FundLedger::new(self.ctx).commit_draw(pending, facts).await?;
            }
            None => {
                self.ctx.append_all(facts).await?;
            }
        }
        tracing::info!(
            tanda_id = %self.tanda_id,
            user_id = %self.user,
            round = self.round,
            coverage_count,
            "Coverage applied, regularization window opened"
        );
        Ok(ends_at)
    }

    async fn confirm_default(&self, reason: DefaultReason) -> Result<(), TandaError> {
        self.ctx
            .append(self.event(TandaEvent::DefaultConfirmed(DefaultConfirmed {
                round: self.round,
                reason,
            })))
            .await?;
        tracing::warn!(
            tanda_id = %self.tanda_id,
            user_id = %self.user,
            round = self.round,
            reason = ?reason,
            "Default confirmed"
        );
        Ok(())
    }
}
