//! Repayment of a fund-covered round.
//!
//! Shared by periodic payments and validated proofs: once a round was
//! covered, any later payment for it goes back to the fund instead of
//! counting as a fresh contribution.

use crate::domain::foundation::{TandaId, UserId};
use crate::domain::ledger::events::{ContributionRegularized, RoundMarker, RoundPayment};
use crate::domain::ledger::{LedgerEvent, TandaEvent};
use crate::domain::tanda::{PaymentTiming, TandaError};

use super::context::LedgerContext;
use super::fund_ledger::FundLedger;

/// Appends the repayment facts for `round` and restores the fund layers.
///
/// Caller holds the tanda lock.
pub async fn repay_coverage(
    ctx: &LedgerContext,
    tanda_id: TandaId,
    user: &UserId,
    round: u32,
    timing: PaymentTiming,
    amount: i64,
) -> Result<(), TandaError> {
    let now = ctx.now();

    ctx.append(
        LedgerEvent::new(
            TandaEvent::CoverageRepaid(RoundPayment { round, timing }),
            now,
        )
        .for_tanda(tanda_id)
        .by_user(user.clone())
        .with_amount(amount),
    )
    .await?;

    ctx.append(
        LedgerEvent::new(
            TandaEvent::ContributionRegularized(ContributionRegularized {
                round,
                coverage_repaid: true,
            }),
            now,
        )
        .for_tanda(tanda_id)
        .by_user(user.clone())
        .with_amount(amount),
    )
    .await?;

    if FundLedger::new(ctx)
        .restore(tanda_id, user, amount)
        .await?
        .is_none()
    {
        tracing::debug!(tanda_id = %tanda_id, user_id = %user, round, "No fund layers to restore");
    }

    ctx.append(
        LedgerEvent::new(TandaEvent::CoverageRestored(RoundMarker { round }), now)
            .for_tanda(tanda_id)
            .by_user(user.clone()),
    )
    .await?;

    tracing::info!(tanda_id = %tanda_id, user_id = %user, round, amount, "Coverage repaid");
    Ok(())
}

/// Marks a defaulted round as settled after a late contribution for it.
///
/// Caller holds the tanda lock and has already appended the contribution.
pub async fn regularize_default(
    ctx: &LedgerContext,
    tanda_id: TandaId,
    user: &UserId,
    round: u32,
    amount: i64,
) -> Result<(), TandaError> {
    ctx.append(
        LedgerEvent::new(
            TandaEvent::ContributionRegularized(ContributionRegularized {
                round,
                coverage_repaid: false,
            }),
            ctx.now(),
        )
        .for_tanda(tanda_id)
        .by_user(user.clone())
        .with_amount(amount),
    )
    .await?;
    tracing::info!(tanda_id = %tanda_id, user_id = %user, round, "Defaulted round regularized");
    Ok(())
}
