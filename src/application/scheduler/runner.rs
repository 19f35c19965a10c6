//! SweepRunner - Hosts the scheduler sweeps on a fixed interval.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `interval` | 60s | Time between passes |
//! | `late_payments` | on | Run `LatePaymentSweep` |
//! | `regularization` | on | Run `RegularizationSweep` |
//! | `reminders` | on | Run `ReminderSweep` |
//!
//! ## Graceful Shutdown
//!
//! The runner listens on a watch channel and finishes the pass in progress
//! before returning. A failing pass is logged; the loop keeps going.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::application::context::LedgerContext;

use super::{
    LatePaymentSweep, LateSweepReport, RegularizationSweep, ReminderSweep, ReminderSweepReport,
    WindowSweepReport,
};

#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub interval: Duration,
    pub late_payments: bool,
    pub regularization: bool,
    pub reminders: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            late_payments: true,
            regularization: true,
            reminders: true,
        }
    }
}

impl SweepConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Reports of one pass; `None` for sweeps that are disabled or failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub late_payments: Option<LateSweepReport>,
    pub regularization: Option<WindowSweepReport>,
    pub reminders: Option<ReminderSweepReport>,
}

pub struct SweepRunner {
    ctx: LedgerContext,
    config: SweepConfig,
}

impl SweepRunner {
    pub fn new(ctx: LedgerContext) -> Self {
        Self::with_config(ctx, SweepConfig::default())
    }

    pub fn with_config(ctx: LedgerContext, config: SweepConfig) -> Self {
        Self { ctx, config }
    }

    /// Runs passes until `shutdown` turns true.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.interval);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        tracing::info!(interval_secs = self.config.interval.as_secs(), "Sweep runner started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Sweep runner stopping");
                        return;
                    }
                }
                _ = interval.tick() => {
                    self.run_once().await;
                }
            }
        }
    }

    /// One pass of every enabled sweep, late payments first so that new
    /// coverages are visible to the window and reminder sweeps.
    pub async fn run_once(&self) -> SweepSummary {
        let mut summary = SweepSummary::default();

        if self.config.late_payments {
            match LatePaymentSweep::new(self.ctx.clone()).run().await {
                Ok(report) => summary.late_payments = Some(report),
                Err(e) => tracing::error!(error = %e, "Late payment sweep could not run"),
            }
        }
        if self.config.regularization {
            match RegularizationSweep::new(self.ctx.clone()).run().await {
                Ok(report) => summary.regularization = Some(report),
                Err(e) => tracing::error!(error = %e, "Regularization sweep could not run"),
            }
        }
        if self.config.reminders {
            match ReminderSweep::new(self.ctx.clone()).run().await {
                Ok(report) => summary.reminders = Some(report),
                Err(e) => tracing::error!(error = %e, "Reminder sweep could not run"),
            }
        }

        tracing::debug!(?summary, "Sweep pass finished");
        summary
    }
}
