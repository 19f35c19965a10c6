//! PostgreSQL implementation of EventStore.
//!
//! Rows live in `ledger_events`. `seq` is a `BIGSERIAL` that records
//! insertion order and breaks ties between equal `occurred_at` values.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, EventId, TandaId, Timestamp, UserId};
use crate::domain::ledger::{EventType, LedgerEvent, TandaEvent};
use crate::ports::EventStore;

pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a ledger event.
#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: String,
    event_type: String,
    payload: serde_json::Value,
    occurred_at: i64,
    user_id: Option<String>,
    tanda_id: Option<Uuid>,
    pool_id: Option<String>,
    amount: Option<i64>,
    external_ref: Option<String>,
}

impl TryFrom<EventRow> for LedgerEvent {
    type Error = DomainError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let event = TandaEvent::from_columns(&row.event_type, row.payload).map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid payload for event {}: {}", row.id, e),
            )
        })?;
        let user_id = row
            .user_id
            .map(UserId::new)
            .transpose()
            .map_err(|e| DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e)))?;

        Ok(LedgerEvent {
            id: EventId::from_string(row.id),
            occurred_at: Timestamp::from_millis(row.occurred_at),
            user_id,
            tanda_id: row.tanda_id.map(TandaId::from_uuid),
            pool_id: row.pool_id,
            amount: row.amount,
            external_ref: row.external_ref,
            event,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, event_type, payload, occurred_at, user_id, tanda_id, pool_id, amount, external_ref
    FROM ledger_events
"#;

fn rows_to_events(rows: Vec<EventRow>) -> Result<Vec<LedgerEvent>, DomainError> {
    rows.into_iter().map(LedgerEvent::try_from).collect()
}

async fn insert(conn: &mut PgConnection, event: &LedgerEvent) -> Result<(), DomainError> {
    let (event_type, payload) = event
        .event
        .to_columns()
        .map_err(|e| DomainError::new(ErrorCode::ValidationFailed, e.to_string()))?;

    sqlx::query(
        r#"
        INSERT INTO ledger_events (
            id, event_type, payload, occurred_at, user_id, tanda_id, pool_id, amount, external_ref
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(event.id.as_str())
    .bind(event_type.as_str())
    .bind(&payload)
    .bind(event.occurred_at.as_millis())
    .bind(event.user_id.as_ref().map(|u| u.as_str()))
    .bind(event.tanda_id.map(|t| *t.as_uuid()))
    .bind(&event.pool_id)
    .bind(event.amount)
    .bind(&event.external_ref)
    .execute(conn)
    .await
    .map_err(|e| DomainError::database("append ledger event", e))?;

    Ok(())
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn append(&self, event: LedgerEvent) -> Result<EventId, DomainError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| DomainError::database("acquire connection", e))?;
        insert(&mut conn, &event).await?;
        Ok(event.id)
    }

    async fn append_all(&self, events: Vec<LedgerEvent>) -> Result<Vec<EventId>, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("begin ledger batch", e))?;

        for event in &events {
            insert(&mut tx, event).await?;
        }

        tx.commit()
            .await
            .map_err(|e| DomainError::database("commit ledger batch", e))?;

        Ok(events.into_iter().map(|e| e.id).collect())
    }

    async fn by_tanda(&self, tanda_id: &TandaId) -> Result<Vec<LedgerEvent>, DomainError> {
        let rows: Vec<EventRow> =
            sqlx::query_as(&format!("{} WHERE tanda_id = $1 ORDER BY occurred_at, seq", SELECT_COLUMNS))
                .bind(tanda_id.as_uuid())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DomainError::database("read tanda events", e))?;
        rows_to_events(rows)
    }

    async fn by_user(&self, user_id: &UserId) -> Result<Vec<LedgerEvent>, DomainError> {
        let rows: Vec<EventRow> =
            sqlx::query_as(&format!("{} WHERE user_id = $1 ORDER BY occurred_at, seq", SELECT_COLUMNS))
                .bind(user_id.as_str())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DomainError::database("read user events", e))?;
        rows_to_events(rows)
    }

    async fn all_of_type(&self, event_type: EventType) -> Result<Vec<LedgerEvent>, DomainError> {
        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            "{} WHERE event_type = $1 ORDER BY occurred_at, seq",
            SELECT_COLUMNS
        ))
        .bind(event_type.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("read events by type", e))?;
        rows_to_events(rows)
    }
}
