//! Four-tier safety fund accounting.
//!
//! Coverage draws from tier 1 upwards; repayments refill from tier 4
//! downwards, never beyond a tier's initial allocation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::policy::{FUND_LAYER_PERCENTAGES, FUND_LAYER_YIELD_BPS};

/// Number of tiers in the safety fund.
pub const TIER_COUNT: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FundLayerError {
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(i64),

    #[error("insufficient fund: requested {requested}, available {available}")]
    Insufficient { requested: i64, available: i64 },

    #[error("tier {tier} balance {balance} outside 0..={initial}")]
    OutOfBounds { tier: u8, balance: i64, initial: i64 },

    #[error("no tier {0}, tiers are 1..=4")]
    UnknownTier(u8),
}

/// Amount moved in or out of one tier (tiers are numbered 1..=4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerMovement {
    pub tier: u8,
    pub amount: i64,
}

/// Current and initial balances of the four tiers of one tanda's fund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundLayers {
    balances: [i64; TIER_COUNT],
    initial: [i64; TIER_COUNT],
}

impl FundLayers {
    /// Splits `total` 25/30/35/10; tier 4 absorbs rounding.
    pub fn allocate(total: i64) -> Self {
        let total = total.max(0);
        let t1 = total * FUND_LAYER_PERCENTAGES[0] / 100;
        let t2 = total * FUND_LAYER_PERCENTAGES[1] / 100;
        let t3 = total * FUND_LAYER_PERCENTAGES[2] / 100;
        let t4 = total - t1 - t2 - t3;
        let tiers = [t1, t2, t3, t4];
        Self {
            balances: tiers,
            initial: tiers,
        }
    }

    /// Rehydrates persisted balances, rejecting rows that break the tier bounds.
    pub fn from_parts(
        balances: [i64; TIER_COUNT],
        initial: [i64; TIER_COUNT],
    ) -> Result<Self, FundLayerError> {
        let layers = Self { balances, initial };
        layers.check_bounds()?;
        Ok(layers)
    }

    pub fn balances(&self) -> [i64; TIER_COUNT] {
        self.balances
    }

    pub fn initial(&self) -> [i64; TIER_COUNT] {
        self.initial
    }

    pub fn total_balance(&self) -> i64 {
        self.balances.iter().sum()
    }

    pub fn initial_total(&self) -> i64 {
        self.initial.iter().sum()
    }

    /// Draws `amount` for a coverage, tier 1 first. All-or-nothing.
    pub fn draw(&mut self, amount: i64) -> Result<Vec<LayerMovement>, FundLayerError> {
        if amount <= 0 {
            return Err(FundLayerError::NonPositiveAmount(amount));
        }
        let available = self.total_balance();
        if available < amount {
            return Err(FundLayerError::Insufficient {
                requested: amount,
                available,
            });
        }

        let mut remaining = amount;
        let mut moved = Vec::new();
        for idx in 0..TIER_COUNT {
            if remaining == 0 {
                break;
            }
            let take = self.balances[idx].min(remaining);
            if take > 0 {
                self.balances[idx] -= take;
                remaining -= take;
                moved.push(LayerMovement {
                    tier: idx as u8 + 1,
                    amount: take,
                });
            }
        }
        Ok(moved)
    }

    /// Credits a repayment, tier 4 first, capped at each tier's allocation.
    ///
    /// Whatever exceeds the total deficit is not credited anywhere.
    pub fn restore(&mut self, amount: i64) -> Result<Vec<LayerMovement>, FundLayerError> {
        if amount <= 0 {
            return Err(FundLayerError::NonPositiveAmount(amount));
        }

        let mut remaining = amount;
        let mut moved = Vec::new();
        for idx in (0..TIER_COUNT).rev() {
            if remaining == 0 {
                break;
            }
            let deficit = self.initial[idx] - self.balances[idx];
            let give = deficit.min(remaining);
            if give > 0 {
                self.balances[idx] += give;
                remaining -= give;
                moved.push(LayerMovement {
                    tier: idx as u8 + 1,
                    amount: give,
                });
            }
        }
        Ok(moved)
    }

    /// Replays movements recorded in the ledger. `sign` is -1 for draws, +1 for restores.
    ///
    /// Leaves the balances untouched when any movement is rejected.
    pub fn apply(&mut self, movements: &[LayerMovement], sign: i64) -> Result<(), FundLayerError> {
        let mut next = *self;
        for m in movements {
            if !(1..=TIER_COUNT).contains(&usize::from(m.tier)) {
                return Err(FundLayerError::UnknownTier(m.tier));
            }
            next.balances[usize::from(m.tier) - 1] += sign * m.amount;
        }
        next.check_bounds()?;
        *self = next;
        Ok(())
    }

    /// Gross yield: average of initial and current balance times each tier's rate.
    ///
    /// Equals `floor(avg3 * 3% + avg4 * 8%)` computed without floats.
    pub fn real_yield(&self) -> i64 {
        let weighted: i64 = (0..TIER_COUNT)
            .map(|idx| (self.initial[idx] + self.balances[idx]) * FUND_LAYER_YIELD_BPS[idx])
            .sum();
        weighted / 20_000
    }

    fn check_bounds(&self) -> Result<(), FundLayerError> {
        for idx in 0..TIER_COUNT {
            let (balance, initial) = (self.balances[idx], self.initial[idx]);
            if balance < 0 || balance > initial {
                return Err(FundLayerError::OutOfBounds {
                    tier: idx as u8 + 1,
                    balance,
                    initial,
                });
            }
        }
        Ok(())
    }
}
