//! AssignTurnOrderHandler - Fixes the payout order and activates the tanda.

use std::collections::BTreeSet;

use rand::seq::SliceRandom;

use crate::domain::foundation::{TandaId, UserId, ValidationError};
use crate::domain::ledger::events::{CalendarCreated, TandaActivated, TurnOrderAssigned};
use crate::domain::ledger::{EventType, LedgerEvent, TandaEvent};
use crate::domain::tanda::{Calendar, TandaError, TandaHistory, TandaStatus, TurnOrderMethod};

use crate::application::context::LedgerContext;

use super::require_organizer;

#[derive(Debug, Clone)]
pub struct AssignTurnOrderCommand {
    pub tanda_id: TandaId,
    pub organizer_id: UserId,
    pub method: TurnOrderMethod,
    /// Required for `Manual`, ignored for `Random`.
    pub manual_order: Vec<UserId>,
}

#[derive(Debug, Clone)]
pub struct AssignTurnOrderResult {
    pub tanda_id: TandaId,
    pub calendar: Calendar,
}

impl AssignTurnOrderResult {
    pub fn reply(&self) -> String {
        let lines: Vec<String> = self
            .calendar
            .entries()
            .iter()
            .map(|e| {
                format!(
                    "{}. {}... ({})",
                    e.round,
                    e.user_id.short(10),
                    e.due_date.day_month()
                )
            })
            .collect();
        format!("Tanda started. Payout calendar:\n\n{}", lines.join("\n"))
    }
}

pub struct AssignTurnOrderHandler {
    ctx: LedgerContext,
}

impl AssignTurnOrderHandler {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    pub async fn handle(
        &self,
        cmd: AssignTurnOrderCommand,
    ) -> Result<AssignTurnOrderResult, TandaError> {
        let tanda_id = cmd.tanda_id;
        let _guard = self.ctx.lock(tanda_id).await?;
        let events = self.ctx.load_existing(&tanda_id).await?;
        let history = TandaHistory::new(&events);
        let tanda = history
            .tanda()
            .ok_or(TandaError::TandaNotFound(tanda_id))?;

        require_organizer(&history, &cmd.organizer_id)?;
        if tanda.status != TandaStatus::Pending {
            return Err(TandaError::invalid_state(tanda.status, "assign the turn order of"));
        }
        if !history.has(EventType::InitialFundCompleted) {
            return Err(TandaError::InitialFundIncomplete);
        }

        let participants = history.participants();
        let order = match cmd.method {
            TurnOrderMethod::Random => shuffled(participants),
            TurnOrderMethod::Manual => {
                check_permutation(&participants, &cmd.manual_order)?;
                cmd.manual_order.clone()
            }
        };

        let now = self.ctx.now();
        let calendar = Calendar::build(&order, tanda.periodicity, now);
        self.ctx
            .append_all(vec![
                LedgerEvent::new(
                    TandaEvent::TurnOrderAssigned(TurnOrderAssigned {
                        method: cmd.method,
                        order: order.clone(),
                    }),
                    now,
                )
                .for_tanda(tanda_id)
                .by_user(cmd.organizer_id.clone()),
                LedgerEvent::new(
                    TandaEvent::CalendarCreated(CalendarCreated {
                        schedule: calendar.clone(),
                    }),
                    now,
                )
                .for_tanda(tanda_id),
                LedgerEvent::new(
                    TandaEvent::TandaActivated(TandaActivated {
                        status: TandaStatus::Active,
                    }),
                    now,
                )
                .for_tanda(tanda_id),
            ])
            .await?;

        tracing::info!(
            tanda_id = %tanda_id,
            method = ?cmd.method,
            rounds = calendar.len(),
            "Tanda activated"
        );

        let first_due = calendar.round(1).map(|e| e.due_date.day_month());
        for entry in calendar.entries() {
            let message = format!(
                "\"{}\" has started.\nYour payout turn: period {} ({}).\nFirst contribution of ${} due {}.",
                tanda.name,
                entry.round,
                entry.due_date.day_month(),
                tanda.contribution_amount,
                first_due.as_deref().unwrap_or("-")
            );
            self.ctx.notify(&entry.user_id, &message).await;
        }

        Ok(AssignTurnOrderResult { tanda_id, calendar })
    }
}

fn shuffled(mut participants: Vec<UserId>) -> Vec<UserId> {
    participants.shuffle(&mut rand::thread_rng());
    participants
}

fn check_permutation(participants: &[UserId], order: &[UserId]) -> Result<(), ValidationError> {
    let expected: BTreeSet<&UserId> = participants.iter().collect();
    let given: BTreeSet<&UserId> = order.iter().collect();
    if order.len() != participants.len() || given != expected {
        return Err(ValidationError::invalid_format(
            "manual_order",
            "must list every participant exactly once",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{user, Harness};
    use crate::domain::foundation::ErrorCode;

    #[tokio::test]
    async fn random_order_activates_with_one_round_per_participant() {
        let h = Harness::new();
        let tanda = h.funded_tanda(&["ana", "beto", "carla"]).await;

        let result = AssignTurnOrderHandler::new(h.ctx.clone())
            .handle(AssignTurnOrderCommand {
                tanda_id: tanda.id,
                organizer_id: user("org"),
                method: TurnOrderMethod::Random,
                manual_order: Vec::new(),
            })
            .await
            .unwrap();

        assert_eq!(result.calendar.len(), 3);
        assert!(result.calendar.is_well_formed());
        assert_eq!(h.store.count_of(EventType::TandaActivated), 1);
        assert_eq!(h.store.count_of(EventType::TurnOrderAssigned), 1);
        assert_eq!(h.notifier.sent_to(&user("ana")).len(), 1);
    }

    #[tokio::test]
    async fn manual_order_is_kept_and_spaced_by_periodicity() {
        let h = Harness::new();
        let tanda = h.funded_tanda(&["ana", "beto"]).await;
        let now = h.ctx.now();

        let result = AssignTurnOrderHandler::new(h.ctx.clone())
            .handle(AssignTurnOrderCommand {
                tanda_id: tanda.id,
                organizer_id: user("org"),
                method: TurnOrderMethod::Manual,
                manual_order: vec![user("beto"), user("ana")],
            })
            .await
            .unwrap();

        let entries = result.calendar.entries();
        assert_eq!(entries[0].user_id, user("beto"));
        assert_eq!(entries[0].due_date, now.add_days(7));
        assert_eq!(entries[1].due_date, now.add_days(14));
    }

    #[tokio::test]
    async fn manual_order_must_be_a_permutation() {
        let h = Harness::new();
        let tanda = h.funded_tanda(&["ana", "beto"]).await;

        let err = AssignTurnOrderHandler::new(h.ctx.clone())
            .handle(AssignTurnOrderCommand {
                tanda_id: tanda.id,
                organizer_id: user("org"),
                method: TurnOrderMethod::Manual,
                manual_order: vec![user("ana"), user("ana")],
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationFailed);
    }

    #[tokio::test]
    async fn requires_complete_initial_fund() {
        let h = Harness::new();
        let tanda = h.create_tanda(2).await;
        h.join(&tanda, "ana").await;
        h.join(&tanda, "beto").await;

        let err = AssignTurnOrderHandler::new(h.ctx.clone())
            .handle(AssignTurnOrderCommand {
                tanda_id: tanda.id,
                organizer_id: user("org"),
                method: TurnOrderMethod::Random,
                manual_order: Vec::new(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, TandaError::InitialFundIncomplete);
    }

    #[tokio::test]
    async fn cannot_activate_twice() {
        let h = Harness::new();
        let tanda = h.active_tanda(&["ana", "beto"]).await;

        let err = AssignTurnOrderHandler::new(h.ctx.clone())
            .handle(AssignTurnOrderCommand {
                tanda_id: tanda.id,
                organizer_id: user("org"),
                method: TurnOrderMethod::Random,
                manual_order: Vec::new(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidStateTransition);
    }
}
