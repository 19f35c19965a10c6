//! CloseTandaHandler - Settles the yield and closes a finished tanda.
//!
//! Net yield is the gross yield minus unrepaid coverages. When it is
//! positive and someone is fully current, a deterministic raffle picks the
//! participant who receives it.

use crate::domain::foundation::{TandaId, UserId};
use crate::domain::ledger::events::{
    RaffleDrawn, RaffleWinnerSelected, TandaClosed, YieldAwarded, YieldCalculated,
    YieldNotDistributed,
};
use crate::domain::ledger::{EventType, LedgerEvent, TandaEvent};
use crate::domain::tanda::raffle::{self, RaffleInput};
use crate::domain::tanda::{Readiness, TandaError, TandaHistory};

use crate::application::context::LedgerContext;
use crate::application::fund_ledger::FundLedger;

use super::require_organizer;

#[derive(Debug, Clone)]
pub struct CloseTandaCommand {
    pub tanda_id: TandaId,
    pub organizer_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClosureOutcome {
    NotDistributed { reason: String },
    Awarded { winner: UserId, eligible_count: usize },
}

#[derive(Debug, Clone)]
pub struct CloseTandaResult {
    pub yield_gross: i64,
    pub losses: i64,
    pub yield_net: i64,
    pub outcome: ClosureOutcome,
}

impl CloseTandaResult {
    pub fn reply(&self) -> String {
        match &self.outcome {
            ClosureOutcome::NotDistributed { reason } => format!(
                "Tanda closed.\n\nNet yield: ${}\nNo distribution ({}).",
                self.yield_net,
                reason.replace('_', " ").to_lowercase()
            ),
            ClosureOutcome::Awarded {
                winner,
                eligible_count,
            } => format!(
                "Tanda closed.\n\nNet yield: ${}\nEligible: {}\nRaffle winner: {}...\n\nSee the ledger for details.",
                self.yield_net,
                eligible_count,
                winner.short(10)
            ),
        }
    }
}

pub struct CloseTandaHandler {
    ctx: LedgerContext,
}

impl CloseTandaHandler {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    pub async fn handle(&self, cmd: CloseTandaCommand) -> Result<CloseTandaResult, TandaError> {
        let tanda_id = cmd.tanda_id;
        let _guard = self.ctx.lock(tanda_id).await?;
        let events = self.ctx.load_existing(&tanda_id).await?;
        let history = TandaHistory::new(&events);

        // 1. Guards
        require_organizer(&history, &cmd.organizer_id)?;
        if history.has(EventType::TandaClosed) {
            return Err(TandaError::AlreadyClosed);
        }
        let closed_at = self.ctx.now();
        if let Readiness::NotReady(reason) = history.readiness(closed_at) {
            return Err(TandaError::NotReadyToClose(reason));
        }

        // 2. Yield
        let layers = FundLedger::new(&self.ctx).layers(&tanda_id).await?;
        let yield_gross = history.gross_yield(layers.as_ref());
        let losses = history.losses();
        let fees = 0;
        let yield_net = yield_gross - losses - fees;
        self.ctx
            .append(
                LedgerEvent::new(
                    TandaEvent::YieldCalculated(YieldCalculated {
                        yield_gross,
                        yield_net,
                        losses,
                        fees,
                    }),
                    closed_at,
                )
                .for_tanda(tanda_id)
                .with_amount(yield_net),
            )
            .await?;

        // 3. Distribution
        let eligible = history.eligible_for_raffle(closed_at);
        let eligible_count = eligible.len();
        let drawn = if yield_net > 0 {
            raffle::draw(RaffleInput {
                tanda_id,
                closed_at,
                last_event_id: history.last_event_id(),
                eligible,
            })
        } else {
            None
        };

        let Some(outcome) = drawn else {
            let reason = if yield_net <= 0 {
                "NO_NET_YIELD"
            } else {
                "NO_ELIGIBLE_PARTICIPANTS"
            };
            self.ctx
                .append_all(vec![
                    LedgerEvent::new(
                        TandaEvent::YieldNotDistributed(YieldNotDistributed {
                            reason: reason.to_string(),
                            yield_net,
                            eligible_count,
                        }),
                        closed_at,
                    )
                    .for_tanda(tanda_id),
                    LedgerEvent::new(
                        TandaEvent::TandaClosed(TandaClosed {
                            yield_distributed: false,
                            winner: None,
                            amount: None,
                        }),
                        closed_at,
                    )
                    .for_tanda(tanda_id),
                ])
                .await?;
            tracing::info!(tanda_id = %tanda_id, yield_net, reason, "Tanda closed without distribution");
            return Ok(CloseTandaResult {
                yield_gross,
                losses,
                yield_net,
                outcome: ClosureOutcome::NotDistributed {
                    reason: reason.to_string(),
                },
            });
        };

        let winner = outcome.winner.clone();
        self.ctx
            .append_all(vec![
                LedgerEvent::new(
                    TandaEvent::RaffleDrawn(RaffleDrawn {
                        seed_hash: outcome.seed_hash.clone(),
                        eligible_count,
                        eligibles_hash: outcome.eligibles_hash.clone(),
                    }),
                    closed_at,
                )
                .for_tanda(tanda_id),
                LedgerEvent::new(
                    TandaEvent::RaffleWinnerSelected(RaffleWinnerSelected {
                        winner_index: outcome.winner_index,
                    }),
                    closed_at,
                )
                .for_tanda(tanda_id)
                .by_user(winner.clone()),
                LedgerEvent::new(TandaEvent::YieldAwarded(YieldAwarded { yield_net }), closed_at)
                    .for_tanda(tanda_id)
                    .by_user(winner.clone())
                    .with_amount(yield_net),
                LedgerEvent::new(
                    TandaEvent::TandaClosed(TandaClosed {
                        yield_distributed: true,
                        winner: Some(winner.clone()),
                        amount: Some(yield_net),
                    }),
                    closed_at,
                )
                .for_tanda(tanda_id),
            ])
            .await?;

        tracing::info!(
            tanda_id = %tanda_id,
            yield_net,
            eligible_count,
            winner = %winner,
            seed_hash = %outcome.seed_hash,
            "Tanda closed with raffle"
        );
        self.ctx
            .notify(
                &winner,
                &format!("You won the closing raffle: ${} of fund yield.", yield_net),
            )
            .await;

        Ok(CloseTandaResult {
            yield_gross,
            losses,
            yield_net,
            outcome: ClosureOutcome::Awarded {
                winner,
                eligible_count,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{user, Harness};
    use crate::application::lifecycle::{PayPeriodicCommand, PayPeriodicHandler};
    use crate::domain::foundation::ErrorCode;

    async fn pay_everything(h: &Harness, tanda: TandaId, users: &[&str], rounds: usize) {
        let handler = PayPeriodicHandler::new(h.ctx.clone());
        for who in users {
            for _ in 0..rounds {
                handler
                    .handle(PayPeriodicCommand {
                        tanda_id: tanda,
                        user_id: user(who),
                        amount: 1000,
                        external_ref: None,
                    })
                    .await
                    .unwrap();
            }
        }
    }

    #[tokio::test]
    async fn not_ready_before_last_round() {
        let h = Harness::new();
        let tanda = h.active_tanda(&["ana", "beto"]).await;

        let err = CloseTandaHandler::new(h.ctx.clone())
            .handle(CloseTandaCommand {
                tanda_id: tanda.id,
                organizer_id: user("org"),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotReadyToClose);
        assert!(err.message().contains("14 days"));
    }

    #[tokio::test]
    async fn awards_yield_to_a_current_participant() {
        let h = Harness::new();
        let tanda = h.active_tanda(&["ana", "beto"]).await;
        pay_everything(&h, tanda.id, &["ana", "beto"], 2).await;
        h.clock.advance_days(15);

        let handler = CloseTandaHandler::new(h.ctx.clone());
        let result = handler
            .handle(CloseTandaCommand {
                tanda_id: tanda.id,
                organizer_id: user("org"),
            })
            .await
            .unwrap();

        // Untouched layers of 2000: tier 3 = 700, tier 4 = 200
        assert_eq!(result.yield_gross, 700 * 3 / 100 + 200 * 8 / 100);
        assert_eq!(result.losses, 0);
        match &result.outcome {
            ClosureOutcome::Awarded { winner, eligible_count } => {
                assert_eq!(*eligible_count, 2);
                assert!([user("ana"), user("beto")].contains(winner));
            }
            other => panic!("expected an award, got {:?}", other),
        }
        assert_eq!(h.store.count_of(EventType::RaffleDrawn), 1);
        assert_eq!(h.store.count_of(EventType::TandaClosed), 1);

        let again = handler
            .handle(CloseTandaCommand {
                tanda_id: tanda.id,
                organizer_id: user("org"),
            })
            .await
            .unwrap_err();
        assert_eq!(again, TandaError::AlreadyClosed);
    }

    #[tokio::test]
    async fn nobody_current_means_no_distribution() {
        let h = Harness::new();
        let tanda = h.active_tanda(&["ana", "beto"]).await;
        h.clock.advance_days(15);

        let result = CloseTandaHandler::new(h.ctx.clone())
            .handle(CloseTandaCommand {
                tanda_id: tanda.id,
                organizer_id: user("org"),
            })
            .await
            .unwrap();
        assert_eq!(
            result.outcome,
            ClosureOutcome::NotDistributed {
                reason: "NO_ELIGIBLE_PARTICIPANTS".to_string()
            }
        );
        assert_eq!(h.store.count_of(EventType::YieldNotDistributed), 1);
        assert_eq!(h.store.count_of(EventType::YieldCalculated), 1);
    }
}
