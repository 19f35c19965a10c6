//! Service entry-point: loads configuration, connects PostgreSQL and hosts
//! the deadline sweeps until Ctrl-C.

use std::sync::Arc;

use mockable::DefaultClock;
use tokio::sync::watch;
use tracing_subscriber::fmt;

use tanda_ledger::adapters::postgres::{
    run_migrations, PostgresEventStore, PostgresFundLayerRepository,
    PostgresReminderFlagRepository, PostgresReplacementInviteRepository,
};
use tanda_ledger::adapters::{AnchoredEventStore, DryRunAnchor, TracingNotifier};
use tanda_ledger::application::scheduler::SweepRunner;
use tanda_ledger::application::LedgerContext;
use tanda_ledger::config::{AppConfig, LogFormat, LoggingConfig};
use tanda_ledger::ports::EventStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.logging);
    config.validate()?;

    let pool = config.database.pool_options().connect(&config.database.url).await?;
    if config.database.run_migrations {
        run_migrations(&pool).await?;
        tracing::info!("Migrations applied");
    }

    let mut events: Arc<dyn EventStore> = Arc::new(PostgresEventStore::new(pool.clone()));
    if config.anchor.enabled {
        let anchor = DryRunAnchor::new(config.anchor.network.clone(), config.anchor.salt.clone());
        events = Arc::new(AnchoredEventStore::new(events, Arc::new(anchor)));
        tracing::info!(network = %config.anchor.network, "Event anchoring enabled");
    }

    let ctx = LedgerContext::new(
        events,
        Arc::new(PostgresFundLayerRepository::new(pool.clone())),
        Arc::new(PostgresReplacementInviteRepository::new(pool.clone())),
        Arc::new(PostgresReminderFlagRepository::new(pool.clone())),
        Arc::new(TracingNotifier),
        Arc::new(DefaultClock),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = SweepRunner::with_config(ctx, config.sweep_config());
    let sweeps = tokio::spawn(async move { runner.run(shutdown_rx).await });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    shutdown_tx.send(true).ok();
    sweeps.await?;

    pool.close().await;
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let builder = fmt().with_env_filter(logging.env_filter());
    let result = match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
    if let Err(e) = result {
        eprintln!("tracing init failed: {e}");
    }
}
