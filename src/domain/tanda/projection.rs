//! Replay of a tanda's event slice into derived state.
//!
//! `TandaHistory` borrows the ordered events of one tanda and answers every
//! read question by folding over them. Nothing is cached: a fresh history is
//! built from the store for each decision.

use std::collections::BTreeSet;

use crate::domain::foundation::{EventId, Timestamp, UserId};
use crate::domain::ledger::events::TandaCreated;
use crate::domain::ledger::{EventType, LedgerEvent, TandaEvent};

use super::calendar::{Calendar, ScheduleEntry};
use super::fund_layers::{FundLayerError, FundLayers};
use super::payment::{PendingPeriod, PeriodStatus, UserPaymentStatus};
use super::policy::FALLBACK_YIELD_PERCENT;
use super::reminders::OrganizerSummary;
use super::replacement::{IneligibleReason, ReplacementEligibility};
use super::standing::unresolved_defaults;
use super::views::{CurrentPeriod, FundHealth, FundStatus, OpenWindow, Readiness, TandaSummary};
use super::{ParticipantRole, PoolType, Tanda, TandaStatus};

#[derive(Debug, Clone, Copy)]
pub struct TandaHistory<'a> {
    events: &'a [LedgerEvent],
}

impl<'a> TandaHistory<'a> {
    /// Wraps a slice already ordered by time then insertion.
    pub fn new(events: &'a [LedgerEvent]) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &'a [LedgerEvent] {
        self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn of(&self, kind: EventType) -> impl Iterator<Item = &'a LedgerEvent> + 'a {
        self.events.iter().filter(move |e| e.is(kind))
    }

    fn of_user<'u>(
        &self,
        kind: EventType,
        user: &'u UserId,
    ) -> impl Iterator<Item = &'a LedgerEvent> + 'u
    where
        'a: 'u,
    {
        self.events.iter().filter(move |e| e.is(kind) && e.is_by(user))
    }

    pub fn has(&self, kind: EventType) -> bool {
        self.of(kind).next().is_some()
    }

    /// Whether `user` has a `kind` fact for `round`.
    pub fn has_round_event(&self, kind: EventType, user: &UserId, round: u32) -> bool {
        self.of_user(kind, user).any(|e| e.round() == Some(round))
    }

    pub fn last_event_id(&self) -> Option<&'a EventId> {
        self.events.last().map(|e| &e.id)
    }

    // -- tanda -------------------------------------------------------------

    pub fn created(&self) -> Option<(&'a LedgerEvent, &'a TandaCreated)> {
        self.events.iter().find_map(|e| match &e.event {
            TandaEvent::TandaCreated(p) => Some((e, p)),
            _ => None,
        })
    }

    pub fn status(&self) -> Option<TandaStatus> {
        self.created()?;
        let status = if self.has(EventType::TandaClosed) {
            TandaStatus::Closed
        } else if self.has(EventType::TandaActivated) {
            TandaStatus::Active
        } else {
            TandaStatus::Pending
        };
        Some(status)
    }

    /// Rebuilds the tanda view, or `None` when no `TandaCreated` exists.
    pub fn tanda(&self) -> Option<Tanda> {
        let (event, created) = self.created()?;
        let tanda_id = event.tanda_id?;
        Some(Tanda {
            id: tanda_id,
            name: created.name.clone(),
            organizer_id: created.organizer_id.clone(),
            contribution_amount: created.contribution_amount,
            number_of_participants: created.number_of_participants,
            periodicity: created.periodicity,
            duration_months: created.duration_months,
            pool_type: PoolType::for_duration(created.duration_months),
            invite_code: created.invite_code.clone(),
            status: self.status().unwrap_or(TandaStatus::Pending),
            created_at: event.occurred_at,
            required_initial_fund: created.required_initial_fund,
            current_participants: self.participants().len() as u32,
            fund_collected: self.fund_collected(),
        })
    }

    pub fn contribution_amount(&self) -> i64 {
        self.created().map(|(_, c)| c.contribution_amount).unwrap_or(0)
    }

    pub fn organizer(&self) -> Option<&'a UserId> {
        self.created().map(|(_, c)| &c.organizer_id)
    }

    // -- membership ----------------------------------------------------------

    /// Confirmed, non-removed participants in confirmation order.
    pub fn participants(&self) -> Vec<UserId> {
        let mut seen = BTreeSet::new();
        self.of(EventType::ParticipantConfirmed)
            .filter_map(|e| e.user_id.as_ref())
            .filter(|u| !self.is_removed(u))
            .filter(|u| seen.insert((*u).clone()))
            .cloned()
            .collect()
    }

    pub fn is_removed(&self, user: &UserId) -> bool {
        self.of_user(EventType::ParticipantRemoved, user).next().is_some()
    }

    pub fn is_participant(&self, user: &UserId) -> bool {
        !self.is_removed(user) && self.confirmed_at(user).is_some()
    }

    /// Invited or confirmed at some point, removed or not.
    pub fn has_joined(&self, user: &UserId) -> bool {
        self.events.iter().any(|e| {
            e.is_by(user)
                && matches!(
                    e.event_type(),
                    EventType::ParticipantInvited | EventType::ParticipantConfirmed
                )
        })
    }

    fn confirmed_at(&self, user: &UserId) -> Option<Timestamp> {
        self.of_user(EventType::ParticipantConfirmed, user)
            .next()
            .map(|e| e.occurred_at)
    }

    /// Role of `user`. The creator is always the organizer.
    pub fn role(&self, user: &UserId) -> Option<ParticipantRole> {
        if self.organizer() == Some(user) {
            return Some(ParticipantRole::Organizer);
        }
        if self.is_participant(user) {
            return Some(ParticipantRole::Member);
        }
        let pending = self.events.iter().any(|e| {
            e.is_by(user)
                && matches!(&e.event, TandaEvent::ParticipantInvited(p)
                    if p.role == ParticipantRole::ReplacementPending)
        });
        (pending && !self.is_removed(user)).then_some(ParticipantRole::ReplacementPending)
    }

    /// Removed user whose slot `user` inherited through a replacement.
    pub fn inherited_from(&self, user: &UserId) -> Option<&'a UserId> {
        self.of_user(EventType::ParticipantConfirmed, user)
            .find_map(|e| match &e.event {
                TandaEvent::ParticipantConfirmed(p) => p.inherited_from.as_ref(),
                _ => None,
            })
    }

    // -- initial fund ----------------------------------------------------------

    pub fn proof(&self, proof_id: &EventId) -> Option<&'a LedgerEvent> {
        self.of(EventType::ProofReceived).find(|e| &e.id == proof_id)
    }

    pub fn proof_decided(&self, proof_id: &EventId) -> bool {
        self.events.iter().any(|e| match &e.event {
            TandaEvent::PaymentValidated(d) | TandaEvent::PaymentRejected(d) => {
                &d.proof_event_id == proof_id
            }
            _ => false,
        })
    }

    pub fn depositors(&self) -> BTreeSet<UserId> {
        self.of(EventType::InitialFundDeposited)
            .filter_map(|e| e.user_id.clone())
            .collect()
    }

    pub fn fund_collected(&self) -> i64 {
        self.of(EventType::InitialFundDeposited)
            .filter_map(|e| e.amount)
            .sum()
    }

    /// Every seat has made an initial deposit.
    pub fn initial_fund_reached(&self) -> bool {
        match self.created() {
            Some((_, c)) => self.depositors().len() as u64 >= u64::from(c.number_of_participants),
            None => false,
        }
    }

    // -- calendar and payments ---------------------------------------------------

    pub fn calendar(&self) -> Option<Calendar> {
        self.events.iter().find_map(|e| match &e.event {
            TandaEvent::CalendarCreated(p) => Some(p.schedule.clone()),
            _ => None,
        })
    }

    /// Payout turn of `user`, following an inherited slot for replacements.
    pub fn turn_of(&self, calendar: &Calendar, user: &UserId) -> Option<ScheduleEntry> {
        calendar
            .turn_of(user)
            .or_else(|| self.inherited_from(user).and_then(|old| calendar.turn_of(old)))
            .cloned()
    }

    /// Rounds `user` must contribute to: those due after they were confirmed.
    pub fn obligations(&self, calendar: &Calendar, user: &UserId) -> Vec<ScheduleEntry> {
        let Some(joined) = self.confirmed_at(user) else {
            return Vec::new();
        };
        calendar
            .entries()
            .iter()
            .filter(|e| e.due_date.is_after(&joined))
            .cloned()
            .collect()
    }

    /// Rounds settled by a payment-type fact of `user`.
    pub fn paid_rounds(&self, user: &UserId) -> BTreeSet<u32> {
        self.events
            .iter()
            .filter(|e| e.is_by(user) && e.event_type().settles_round())
            .filter_map(LedgerEvent::round)
            .collect()
    }

    pub fn covered_rounds(&self, user: &UserId) -> BTreeSet<u32> {
        self.of_user(EventType::PoolCovered, user)
            .filter_map(LedgerEvent::round)
            .collect()
    }

    pub fn coverage_count(&self, user: &UserId) -> usize {
        self.of_user(EventType::PoolCovered, user).count()
    }

    fn unpaid_past_due(&self, user: &UserId, now: Timestamp) -> Vec<ScheduleEntry> {
        let Some(calendar) = self.calendar() else {
            return Vec::new();
        };
        let paid = self.paid_rounds(user);
        self.obligations(&calendar, user)
            .into_iter()
            .filter(|e| e.due_date.is_before(&now) && !paid.contains(&e.round))
            .collect()
    }

    pub fn payment_status(&self, user: &UserId, now: Timestamp) -> UserPaymentStatus {
        if self.is_removed(user) {
            return UserPaymentStatus::Replaced;
        }
        match self.unpaid_past_due(user, now).first() {
            Some(entry) if now.is_after(&entry.grace_end()) => UserPaymentStatus::Late,
            Some(_) => UserPaymentStatus::InGrace,
            None => UserPaymentStatus::Current,
        }
    }

    pub fn pending_periods(&self, user: &UserId, now: Timestamp) -> Vec<PendingPeriod> {
        let covered = self.covered_rounds(user);
        self.unpaid_past_due(user, now)
            .into_iter()
            .map(|e| {
                let status = if covered.contains(&e.round) {
                    PeriodStatus::Covered
                } else if now.is_after(&e.grace_end()) {
                    PeriodStatus::Late
                } else if now.is_after(&e.due_date) {
                    PeriodStatus::InGrace
                } else {
                    PeriodStatus::Unpaid
                };
                PendingPeriod {
                    round: e.round,
                    status,
                }
            })
            .collect()
    }

    /// Round a new payment from `user` applies to: the oldest unpaid round
    /// owed, past-due rounds first by construction. `None` once every round
    /// is settled.
    pub fn target_period(&self, user: &UserId) -> Option<ScheduleEntry> {
        let calendar = self.calendar()?;
        let paid = self.paid_rounds(user);
        self.obligations(&calendar, user)
            .into_iter()
            .find(|e| !paid.contains(&e.round))
    }

    pub fn current_period(&self, now: Timestamp) -> Option<CurrentPeriod> {
        let calendar = self.calendar()?;
        let entry = calendar.current(now)?;
        Some(CurrentPeriod {
            round: entry.round,
            total: calendar.len(),
            deadline: entry.due_date,
        })
    }

    pub fn summary(&self, now: Timestamp) -> TandaSummary {
        let mut summary = TandaSummary::default();
        let mut seen = BTreeSet::new();
        for user in self
            .of(EventType::ParticipantConfirmed)
            .filter_map(|e| e.user_id.as_ref())
        {
            if !seen.insert(user.clone()) {
                continue;
            }
            match self.payment_status(user, now) {
                UserPaymentStatus::Current => summary.paid += 1,
                UserPaymentStatus::InGrace => summary.in_grace += 1,
                UserPaymentStatus::Late => summary.late += 1,
                UserPaymentStatus::Replaced => summary.replaced += 1,
            }
        }

        summary.last_notable = self.events.iter().rev().find_map(|e| {
            let what = match e.event_type() {
                EventType::PoolCovered => "Coverage applied",
                EventType::ContributionRegularized => "Regularized",
                EventType::DefaultConfirmed => "Default confirmed",
                EventType::ParticipantRemoved => "Replaced",
                _ => return None,
            };
            let who = e
                .user_id
                .as_ref()
                .map(|u| u.short(8))
                .unwrap_or_else(|| "User".to_string());
            Some(format!("{}... -> {}", who, what))
        });
        summary
    }

    /// Who still owes the round being collected: the latest round due, or
    /// round 1 before anything is due.
    pub fn organizer_summary(&self, now: Timestamp) -> Option<OrganizerSummary> {
        let calendar = self.calendar()?;
        let entry = calendar.latest_due(now)?;
        let mut summary = OrganizerSummary {
            round: entry.round,
            unpaid: 0,
            in_grace: 0,
            late: 0,
        };
        for user in self.participants() {
            let owes = self
                .obligations(&calendar, &user)
                .iter()
                .any(|e| e.round == entry.round);
            if !owes || self.paid_rounds(&user).contains(&entry.round) {
                continue;
            }
            if !now.is_after(&entry.due_date) {
                summary.unpaid += 1;
            } else if !now.is_after(&entry.grace_end()) {
                summary.in_grace += 1;
            } else {
                summary.late += 1;
            }
        }
        Some(summary)
    }

    // -- safety fund -------------------------------------------------------------

    pub fn fund_status(&self) -> FundStatus {
        let required = self
            .created()
            .map(|(_, c)| c.required_initial_fund)
            .unwrap_or(0);
        let contribution = self.contribution_amount();
        let covered = self.of(EventType::PoolCovered).count() as i64;
        let repaid = self.of(EventType::CoverageRepaid).count() as i64;
        let amount = required - covered * contribution + repaid * contribution;

        let open = self
            .of(EventType::PoolCovered)
            .filter(|c| {
                let (Some(user), Some(round)) = (c.user_id.as_ref(), c.round()) else {
                    return false;
                };
                !self.has_round_event(EventType::ContributionRegularized, user, round)
            })
            .count();

        let health = if open > 0 {
            FundHealth::InUse
        } else if covered == repaid {
            FundHealth::Stable
        } else {
            FundHealth::Recovering
        };
        FundStatus { health, amount }
    }

    /// Layer balances rebuilt from `FundLayerAllocated`, `FundLayerUsed` and
    /// `FundLayerRestored`. `None` if the layers were never allocated.
    pub fn replay_fund_layers(&self) -> Result<Option<FundLayers>, FundLayerError> {
        let mut layers: Option<FundLayers> = None;
        for e in self.events {
            match (&e.event, layers.as_mut()) {
                (TandaEvent::FundLayerAllocated(p), None) => {
                    layers = Some(FundLayers::from_parts(p.tiers, p.tiers)?);
                }
                (TandaEvent::FundLayerUsed(p), Some(l)) => l.apply(&p.movements, -1)?,
                (TandaEvent::FundLayerRestored(p), Some(l)) => l.apply(&p.movements, 1)?,
                _ => {}
            }
        }
        Ok(layers)
    }

    // -- coverage and regularization -------------------------------------------------

    /// Windows whose round has no `ContributionRegularized` or `DefaultConfirmed` yet.
    pub fn open_windows(&self, user: Option<&UserId>) -> Vec<OpenWindow> {
        self.events
            .iter()
            .filter_map(|e| match (&e.event, e.user_id.as_ref()) {
                (TandaEvent::RegularizationWindowStarted(p), Some(u))
                    if user.map_or(true, |wanted| wanted == u) =>
                {
                    Some(OpenWindow {
                        user_id: u.clone(),
                        round: p.round,
                        started_at: e.occurred_at,
                        ends_at: p.ends_at,
                    })
                }
                _ => None,
            })
            .filter(|w| {
                !self.has_round_event(EventType::ContributionRegularized, &w.user_id, w.round)
                    && !self.has_round_event(EventType::DefaultConfirmed, &w.user_id, w.round)
            })
            .collect()
    }

    pub fn has_active_default(&self, user: &UserId) -> bool {
        !unresolved_defaults(self.events, user).is_empty()
    }

    /// Whether `user` may be expelled and replaced.
    ///
    /// A user whose payout date is already behind `now` counts as paid out.
    pub fn replacement_eligibility(&self, user: &UserId, now: Timestamp) -> ReplacementEligibility {
        if !self.has_active_default(user) {
            return ReplacementEligibility::Ineligible(IneligibleReason::NotInDefault);
        }
        let Some(calendar) = self.calendar() else {
            return ReplacementEligibility::Ineligible(IneligibleReason::NoCalendar);
        };
        let Some(turn) = self.turn_of(&calendar, user) else {
            return ReplacementEligibility::Ineligible(IneligibleReason::TurnNotFound);
        };
        if !now.is_before(&turn.due_date) {
            return ReplacementEligibility::Ineligible(IneligibleReason::AlreadyReceivedTurn);
        }
        ReplacementEligibility::Eligible {
            turn_date: turn.due_date,
        }
    }

    // -- closure --------------------------------------------------------------------

    pub fn readiness(&self, now: Timestamp) -> Readiness {
        let Some(last) = self.calendar().and_then(|c| c.last().cloned()) else {
            return Readiness::NotReady("No calendar has been created yet.".to_string());
        };
        if now.is_before(&last.due_date) {
            let days = now.days_until_ceil(&last.due_date);
            return Readiness::NotReady(format!("{} days left until the last period.", days));
        }
        Readiness::Ready
    }

    /// Unrepaid coverages times the contribution, never negative.
    pub fn losses(&self) -> i64 {
        let covered = self.of(EventType::PoolCovered).count() as i64;
        let repaid = self.of(EventType::CoverageRepaid).count() as i64;
        (covered - repaid).max(0) * self.contribution_amount()
    }

    /// Gross yield from the layers, or a fixed share of the required fund
    /// when the layers were never allocated.
    pub fn gross_yield(&self, layers: Option<&FundLayers>) -> i64 {
        match layers {
            Some(l) => l.real_yield(),
            None => {
                let required = self
                    .created()
                    .map(|(_, c)| c.required_initial_fund)
                    .unwrap_or(0);
                required * FALLBACK_YIELD_PERCENT / 100
            }
        }
    }

    /// Current, non-removed participants, sorted.
    pub fn eligible_for_raffle(&self, now: Timestamp) -> Vec<UserId> {
        let mut eligible: Vec<UserId> = self
            .participants()
            .into_iter()
            .filter(|u| self.payment_status(u, now) == UserPaymentStatus::Current)
            .collect();
        eligible.sort();
        eligible
    }

    // -- replacement ------------------------------------------------------------------

    /// Replaced user for whom `user` joined and is still awaiting confirmation.
    /// Whether someone already took over `replaced`'s seat.
    pub fn seat_taken_over(&self, replaced: &UserId) -> bool {
        self.of(EventType::ParticipantConfirmed).any(|e| match &e.event {
            TandaEvent::ParticipantConfirmed(p) => p.inherited_from.as_ref() == Some(replaced),
            _ => false,
        })
    }

    pub fn pending_replacement(&self, user: &UserId) -> Option<&'a UserId> {
        if self.of_user(EventType::ReplacementConfirmed, user).next().is_some() {
            return None;
        }
        self.of_user(EventType::ReplacementJoined, user)
            .find_map(|e| match &e.event {
                TandaEvent::ReplacementJoined(p) => Some(&p.replaced_user_id),
                _ => None,
            })
    }
}
