//! GetFundLayerStatusHandler - Tier balances next to what the ledger says
//! they should be.

use serde::Serialize;

use crate::domain::foundation::TandaId;
use crate::domain::tanda::{FundLayers, FundStatus, TandaError, TandaHistory, TIER_COUNT};

use crate::application::context::LedgerContext;
use crate::application::fund_ledger::FundLedger;

#[derive(Debug, Clone)]
pub struct GetFundLayerStatusQuery {
    pub tanda_id: TandaId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayerBalances {
    pub balances: [i64; TIER_COUNT],
    pub initial: [i64; TIER_COUNT],
    pub total: i64,
    pub initial_total: i64,
    pub real_yield: i64,
}

impl From<&FundLayers> for LayerBalances {
    fn from(layers: &FundLayers) -> Self {
        Self {
            balances: layers.balances(),
            initial: layers.initial(),
            total: layers.total_balance(),
            initial_total: layers.initial_total(),
            real_yield: layers.real_yield(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FundLayerStatus {
    /// Stored table, `None` before the initial fund completes.
    pub layers: Option<LayerBalances>,
    pub fund: FundStatus,
    /// Stored table equals the replay of the layer events.
    pub in_sync: bool,
}

impl FundLayerStatus {
    pub fn render(&self) -> String {
        let Some(l) = &self.layers else {
            return format!(
                "Fund layers not allocated yet.\nFund: {} (${})",
                self.fund.health.label(),
                self.fund.amount
            );
        };
        let mut out = String::from("Safety fund layers\n");
        for (i, (balance, initial)) in l.balances.iter().zip(l.initial.iter()).enumerate() {
            out.push_str(&format!("\nTier {}: ${} / ${}", i + 1, balance, initial));
        }
        out.push_str(&format!(
            "\n\nTotal: ${} / ${}\nEstimated yield: ${}\nFund: {}",
            l.total,
            l.initial_total,
            l.real_yield,
            self.fund.health.label()
        ));
        out
    }
}

pub struct GetFundLayerStatusHandler {
    ctx: LedgerContext,
}

impl GetFundLayerStatusHandler {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    pub async fn handle(&self, query: GetFundLayerStatusQuery) -> Result<FundLayerStatus, TandaError> {
        let events = self.ctx.load_existing(&query.tanda_id).await?;
        let history = TandaHistory::new(&events);

        let stored = FundLedger::new(&self.ctx).layers(&query.tanda_id).await?;
        let replayed = history.replay_fund_layers()?;
        let in_sync = stored == replayed;
        if !in_sync {
            tracing::warn!(
                tanda_id = %query.tanda_id,
                stored = ?stored.map(|l| l.balances()),
                replayed = ?replayed.map(|l| l.balances()),
                "Fund layer table disagrees with ledger"
            );
        }

        Ok(FundLayerStatus {
            layers: stored.as_ref().map(LayerBalances::from),
            fund: history.fund_status(),
            in_sync,
        })
    }
}
