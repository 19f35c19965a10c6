//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresEventStore` - The append-only ledger
//! - `PostgresFundLayerRepository` - Tier balances, one row per tanda
//! - `PostgresReplacementInviteRepository` - Replacement codes
//! - `PostgresReminderFlagRepository` - Reminder idempotency markers
//!
//! Schema lives in `migrations/` and is applied by [`run_migrations`].

mod event_store;
mod fund_layer_repository;
mod reminder_flag_repository;
mod replacement_invite_repository;

pub use event_store::PostgresEventStore;
pub use fund_layer_repository::PostgresFundLayerRepository;
pub use reminder_flag_repository::PostgresReminderFlagRepository;
pub use replacement_invite_repository::PostgresReplacementInviteRepository;

use sqlx::PgPool;

use crate::domain::foundation::DomainError;

/// Applies the bundled SQL migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DomainError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DomainError::database("run migrations", e))
}
