//! PostgreSQL implementation of ReminderFlagRepository.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, TandaId, UserId};
use crate::domain::tanda::{ReminderFlags, ReminderStage};
use crate::ports::ReminderFlagRepository;

pub struct PostgresReminderFlagRepository {
    pool: PgPool,
}

impl PostgresReminderFlagRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct FlagRow {
    sent_e1: bool,
    sent_e2: bool,
    sent_e3: bool,
    sent_e4: bool,
}

fn stage_column(stage: ReminderStage) -> &'static str {
    match stage {
        ReminderStage::E1 => "sent_e1",
        ReminderStage::E2 => "sent_e2",
        ReminderStage::E3 => "sent_e3",
        ReminderStage::E4 => "sent_e4",
    }
}

#[async_trait]
impl ReminderFlagRepository for PostgresReminderFlagRepository {
    async fn get(
        &self,
        tanda_id: &TandaId,
        user_id: &UserId,
        round: u32,
    ) -> Result<ReminderFlags, DomainError> {
        let row: Option<FlagRow> = sqlx::query_as(
            r#"
            SELECT sent_e1, sent_e2, sent_e3, sent_e4
            FROM reminder_flags
            WHERE tanda_id = $1 AND user_id = $2 AND round = $3
            "#,
        )
        .bind(tanda_id.as_uuid())
        .bind(user_id.as_str())
        .bind(i64::from(round))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("read reminder flags", e))?;

        Ok(row
            .map(|r| ReminderFlags {
                sent_e1: r.sent_e1,
                sent_e2: r.sent_e2,
                sent_e3: r.sent_e3,
                sent_e4: r.sent_e4,
            })
            .unwrap_or_default())
    }

    async fn mark(
        &self,
        tanda_id: &TandaId,
        user_id: &UserId,
        round: u32,
        stage: ReminderStage,
    ) -> Result<(), DomainError> {
        let column = stage_column(stage);
        let sql = format!(
            r#"
            INSERT INTO reminder_flags (tanda_id, user_id, round, {column})
            VALUES ($1, $2, $3, TRUE)
            ON CONFLICT (tanda_id, user_id, round) DO UPDATE SET {column} = TRUE
            "#
        );

        sqlx::query(&sql)
            .bind(tanda_id.as_uuid())
            .bind(user_id.as_str())
            .bind(i64::from(round))
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database("mark reminder flag", e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_stage_has_its_own_column() {
        let columns: std::collections::HashSet<_> =
            ReminderStage::ALL.iter().map(|s| stage_column(*s)).collect();
        assert_eq!(columns.len(), 4);
    }
}
