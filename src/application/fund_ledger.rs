//! Fund layer ledger: the tier balance table kept beside its events.
//!
//! Each mutation appends its event first and then writes the table, both
//! under the caller's tanda lock. The events are authoritative; `reconcile`
//! rebuilds the table from them when the two disagree.
//!
//! A draw can be split in two: `prepare_draw` computes the movements
//! against the table, and `commit_draw` appends `FundLayerUsed` in the same
//! batch as the caller's own events before saving the table.

use crate::domain::foundation::{TandaId, UserId};
use crate::domain::ledger::events::{FundLayerAllocated, FundLayerMovement};
use crate::domain::ledger::{LedgerEvent, TandaEvent};
use crate::domain::tanda::policy::FUND_LAYER_PERCENTAGES;
use crate::domain::tanda::{FundLayerError, FundLayers, LayerMovement, TandaError, TandaHistory};

use super::context::LedgerContext;

/// Result of asking the fund to cover a missed contribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawOutcome {
    Drawn(Vec<LayerMovement>),
    /// The tanda's layers were never allocated.
    Unallocated,
    Insufficient { available: i64 },
}

/// Outcome of comparing the balance table with the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    InSync,
    Repaired { was: Option<FundLayers>, now: FundLayers },
    /// The ledger has no `FundLayerAllocated` for the tanda.
    NotAllocated,
}

/// A draw computed against the stored table but not yet written.
#[derive(Debug, Clone)]
pub struct PendingDraw {
    tanda_id: TandaId,
    layers: FundLayers,
    movements: Vec<LayerMovement>,
    event: LedgerEvent,
}

#[derive(Debug, Clone)]
pub enum DrawPlan {
    Ready(PendingDraw),
    Unallocated,
    Insufficient { available: i64 },
}

pub struct FundLedger<'a> {
    ctx: &'a LedgerContext,
}

impl<'a> FundLedger<'a> {
    pub fn new(ctx: &'a LedgerContext) -> Self {
        Self { ctx }
    }

    pub async fn layers(&self, tanda_id: &TandaId) -> Result<Option<FundLayers>, TandaError> {
        Ok(self.ctx.fund_layers.find(tanda_id).await?)
    }

    /// Allocates the layers once. Returns `None` if they already exist.
    pub async fn initialize(
        &self,
        tanda_id: TandaId,
        total: i64,
    ) -> Result<Option<FundLayers>, TandaError> {
        if self.layers(&tanda_id).await?.is_some() {
            return Ok(None);
        }

        let layers = FundLayers::allocate(total);
        let event = LedgerEvent::new(
            TandaEvent::FundLayerAllocated(FundLayerAllocated {
                total,
                tiers: layers.balances(),
                percentages: FUND_LAYER_PERCENTAGES,
            }),
            self.ctx.now(),
        )
        .for_tanda(tanda_id)
        .with_amount(total);
        self.ctx.append(event).await?;
        self.ctx.fund_layers.save(&tanda_id, &layers).await?;

        tracing::info!(tanda_id = %tanda_id, total, tiers = ?layers.balances(), "Fund layers allocated");
        Ok(Some(layers))
    }

    /// Draws `amount` tier 1 first. Nothing is written unless the whole
    /// amount is available.
    pub async fn draw(
        &self,
        tanda_id: TandaId,
        user: &UserId,
        amount: i64,
    ) -> Result<DrawOutcome, TandaError> {
        Ok(match self.prepare_draw(tanda_id, user, amount).await? {
            DrawPlan::Ready(pending) => DrawOutcome::Drawn(self.commit_draw(pending, Vec::new()).await?),
            DrawPlan::Unallocated => DrawOutcome::Unallocated,
            DrawPlan::Insufficient { available } => DrawOutcome::Insufficient { available },
        })
    }

    pub async fn prepare_draw(
        &self,
        tanda_id: TandaId,
        user: &UserId,
        amount: i64,
    ) -> Result<DrawPlan, TandaError> {
        let Some(mut layers) = self.layers(&tanda_id).await? else {
            tracing::warn!(tanda_id = %tanda_id, amount, "Coverage without allocated fund layers");
            return Ok(DrawPlan::Unallocated);
        };

        let movements = match layers.draw(amount) {
            Ok(m) => m,
            Err(FundLayerError::Insufficient { available, .. }) => {
                tracing::warn!(tanda_id = %tanda_id, amount, available, "Fund layers exhausted");
                return Ok(DrawPlan::Insufficient { available });
            }
            Err(e) => return Err(e.into()),
        };

        let event = LedgerEvent::new(
            TandaEvent::FundLayerUsed(FundLayerMovement {
                movements: movements.clone(),
                balances: layers.balances(),
            }),
            self.ctx.now(),
        )
        .for_tanda(tanda_id)
        .by_user(user.clone())
        .with_amount(amount);

        Ok(DrawPlan::Ready(PendingDraw {
            tanda_id,
            layers,
            movements,
            event,
        }))
    }

    /// Appends `leading` followed by `FundLayerUsed` as one batch, then
    /// saves the table. A failed save leaves the table behind the ledger
    /// until the next `reconcile` or `repair`.
    pub async fn commit_draw(
        &self,
        pending: PendingDraw,
        mut leading: Vec<LedgerEvent>,
    ) -> Result<Vec<LayerMovement>, TandaError> {
        let PendingDraw {
            tanda_id,
            layers,
            movements,
            event,
        } = pending;

        leading.push(event);
        self.ctx.append_all(leading).await?;
        self.ctx.fund_layers.save(&tanda_id, &layers).await?;
        Ok(movements)
    }

    /// Credits a repayment tier 4 first. Returns `None` when the layers were
    /// never allocated or nothing was owed to them.
    pub async fn restore(
        &self,
        tanda_id: TandaId,
        user: &UserId,
        amount: i64,
    ) -> Result<Option<Vec<LayerMovement>>, TandaError> {
        let Some(mut layers) = self.layers(&tanda_id).await? else {
            return Ok(None);
        };

        let movements = layers.restore(amount)?;
        if movements.is_empty() {
            return Ok(None);
        }

        let event = LedgerEvent::new(
            TandaEvent::FundLayerRestored(FundLayerMovement {
                movements: movements.clone(),
                balances: layers.balances(),
            }),
            self.ctx.now(),
        )
        .for_tanda(tanda_id)
        .by_user(user.clone())
        .with_amount(amount);
        self.ctx.append(event).await?;
        self.ctx.fund_layers.save(&tanda_id, &layers).await?;

        Ok(Some(movements))
    }

    /// Replays the layer events and overwrites the table if it drifted.
    pub async fn reconcile(&self, tanda_id: TandaId) -> Result<Reconciliation, TandaError> {
        let _guard = self.ctx.lock(tanda_id).await?;
        let events = self.ctx.load(&tanda_id).await?;
        self.repair(tanda_id, &events).await
    }

    /// `reconcile` for a caller that already holds the tanda lock and has
    /// loaded `events`.
    pub async fn repair(
        &self,
        tanda_id: TandaId,
        events: &[LedgerEvent],
    ) -> Result<Reconciliation, TandaError> {
        let replayed = TandaHistory::new(events).replay_fund_layers().map_err(|e| {
            tracing::error!(tanda_id = %tanda_id, error = %e, "Fund layer events do not replay");
            TandaError::from(e)
        })?;

        let Some(expected) = replayed else {
            return Ok(Reconciliation::NotAllocated);
        };
        let stored = self.layers(&tanda_id).await?;
        if stored == Some(expected) {
            return Ok(Reconciliation::InSync);
        }

        tracing::warn!(
            tanda_id = %tanda_id,
            stored = ?stored.map(|l| l.balances()),
            expected = ?expected.balances(),
            "Fund layer table repaired from ledger"
        );
        self.ctx.fund_layers.save(&tanda_id, &expected).await?;
        Ok(Reconciliation::Repaired {
            was: stored,
            now: expected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ledger::events::RoundMarker;
    use crate::domain::ledger::EventType;

    fn user() -> UserId {
        UserId::new("521777").unwrap()
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let ctx = LedgerContext::in_memory();
        let fund = FundLedger::new(&ctx);
        let tanda = TandaId::new();

        let first = fund.initialize(tanda, 10_000).await.unwrap();
        assert_eq!(first.map(|l| l.balances()), Some([2500, 3000, 3500, 1000]));
        assert!(fund.initialize(tanda, 10_000).await.unwrap().is_none());

        let events = ctx.load(&tanda).await.unwrap();
        assert_eq!(events.iter().filter(|e| e.is(EventType::FundLayerAllocated)).count(), 1);
    }

    #[tokio::test]
    async fn draw_and_restore_follow_tier_priority() {
        let ctx = LedgerContext::in_memory();
        let fund = FundLedger::new(&ctx);
        let tanda = TandaId::new();
        fund.initialize(tanda, 10_000).await.unwrap();

        let drawn = fund.draw(tanda, &user(), 3_000).await.unwrap();
        assert_eq!(
            drawn,
            DrawOutcome::Drawn(vec![
                LayerMovement { tier: 1, amount: 2500 },
                LayerMovement { tier: 2, amount: 500 },
            ])
        );

        let restored = fund.restore(tanda, &user(), 2_000).await.unwrap().unwrap();
        assert_eq!(
            restored,
            vec![
                LayerMovement { tier: 2, amount: 500 },
                LayerMovement { tier: 1, amount: 1500 },
            ]
        );
        let layers = fund.layers(&tanda).await.unwrap().unwrap();
        assert_eq!(layers.balances(), [1500, 3000, 3500, 1000]);
    }

    #[tokio::test]
    async fn insufficient_draw_writes_nothing() {
        let ctx = LedgerContext::in_memory();
        let fund = FundLedger::new(&ctx);
        let tanda = TandaId::new();
        fund.initialize(tanda, 1_000).await.unwrap();

        let outcome = fund.draw(tanda, &user(), 5_000).await.unwrap();
        assert_eq!(outcome, DrawOutcome::Insufficient { available: 1_000 });
        assert_eq!(fund.layers(&tanda).await.unwrap().unwrap().total_balance(), 1_000);
        assert_eq!(ctx.load(&tanda).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn committed_draw_lands_with_the_leading_events() {
        let ctx = LedgerContext::in_memory();
        let fund = FundLedger::new(&ctx);
        let tanda = TandaId::new();
        fund.initialize(tanda, 10_000).await.unwrap();

        let DrawPlan::Ready(pending) = fund.prepare_draw(tanda, &user(), 1_000).await.unwrap() else {
            panic!("expected a ready draw");
        };
        assert_eq!(fund.layers(&tanda).await.unwrap().unwrap().total_balance(), 10_000);

        let marker = LedgerEvent::new(
            TandaEvent::ContributionLate(RoundMarker { round: 1 }),
            ctx.now(),
        )
        .for_tanda(tanda);
        fund.commit_draw(pending, vec![marker]).await.unwrap();

        let kinds: Vec<EventType> = ctx.load(&tanda).await.unwrap().iter().map(|e| e.event_type()).collect();
        assert_eq!(
            kinds,
            vec![EventType::FundLayerAllocated, EventType::ContributionLate, EventType::FundLayerUsed]
        );
        assert_eq!(fund.layers(&tanda).await.unwrap().unwrap().total_balance(), 9_000);
    }

    #[tokio::test]
    async fn unallocated_fund_is_reported() {
        let ctx = LedgerContext::in_memory();
        let fund = FundLedger::new(&ctx);
        let tanda = TandaId::new();

        assert_eq!(fund.draw(tanda, &user(), 100).await.unwrap(), DrawOutcome::Unallocated);
        assert!(fund.restore(tanda, &user(), 100).await.unwrap().is_none());
        assert_eq!(fund.reconcile(tanda).await.unwrap(), Reconciliation::NotAllocated);
    }

    #[tokio::test]
    async fn reconcile_repairs_drifted_table() {
        let ctx = LedgerContext::in_memory();
        let fund = FundLedger::new(&ctx);
        let tanda = TandaId::new();
        fund.initialize(tanda, 10_000).await.unwrap();
        fund.draw(tanda, &user(), 1_000).await.unwrap();
        assert_eq!(fund.reconcile(tanda).await.unwrap(), Reconciliation::InSync);

        ctx.fund_layers
            .save(&tanda, &FundLayers::allocate(10_000))
            .await
            .unwrap();

        match fund.reconcile(tanda).await.unwrap() {
            Reconciliation::Repaired { now, .. } => {
                assert_eq!(now.balances(), [1500, 3000, 3500, 1000]);
            }
            other => panic!("expected repair, got {:?}", other),
        }
        assert_eq!(
            fund.layers(&tanda).await.unwrap().unwrap().balances(),
            [1500, 3000, 3500, 1000]
        );
    }
}
