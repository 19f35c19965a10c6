//! PostgreSQL implementation of FundLayerRepository.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, TandaId};
use crate::domain::tanda::FundLayers;
use crate::ports::FundLayerRepository;

pub struct PostgresFundLayerRepository {
    pool: PgPool,
}

impl PostgresFundLayerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct FundLayerRow {
    tier1_balance: i64,
    tier2_balance: i64,
    tier3_balance: i64,
    tier4_balance: i64,
    tier1_initial: i64,
    tier2_initial: i64,
    tier3_initial: i64,
    tier4_initial: i64,
}

impl TryFrom<FundLayerRow> for FundLayers {
    type Error = DomainError;

    fn try_from(row: FundLayerRow) -> Result<Self, Self::Error> {
        FundLayers::from_parts(
            [row.tier1_balance, row.tier2_balance, row.tier3_balance, row.tier4_balance],
            [row.tier1_initial, row.tier2_initial, row.tier3_initial, row.tier4_initial],
        )
        .map_err(|e| DomainError::new(ErrorCode::DatabaseError, format!("Invalid fund layers: {}", e)))
    }
}

#[async_trait]
impl FundLayerRepository for PostgresFundLayerRepository {
    async fn find(&self, tanda_id: &TandaId) -> Result<Option<FundLayers>, DomainError> {
        let row: Option<FundLayerRow> = sqlx::query_as(
            r#"
            SELECT tier1_balance, tier2_balance, tier3_balance, tier4_balance,
                   tier1_initial, tier2_initial, tier3_initial, tier4_initial
            FROM fund_layers
            WHERE tanda_id = $1
            "#,
        )
        .bind(tanda_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("find fund layers", e))?;

        row.map(FundLayers::try_from).transpose()
    }

    async fn save(&self, tanda_id: &TandaId, layers: &FundLayers) -> Result<(), DomainError> {
        let [b1, b2, b3, b4] = layers.balances();
        let [i1, i2, i3, i4] = layers.initial();

        sqlx::query(
            r#"
            INSERT INTO fund_layers (
                tanda_id, tier1_balance, tier2_balance, tier3_balance, tier4_balance,
                tier1_initial, tier2_initial, tier3_initial, tier4_initial, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())
            ON CONFLICT (tanda_id) DO UPDATE SET
                tier1_balance = EXCLUDED.tier1_balance,
                tier2_balance = EXCLUDED.tier2_balance,
                tier3_balance = EXCLUDED.tier3_balance,
                tier4_balance = EXCLUDED.tier4_balance,
                tier1_initial = EXCLUDED.tier1_initial,
                tier2_initial = EXCLUDED.tier2_initial,
                tier3_initial = EXCLUDED.tier3_initial,
                tier4_initial = EXCLUDED.tier4_initial,
                updated_at = NOW()
            "#,
        )
        .bind(tanda_id.as_uuid())
        .bind(b1)
        .bind(b2)
        .bind(b3)
        .bind(b4)
        .bind(i1)
        .bind(i2)
        .bind(i3)
        .bind(i4)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("save fund layers", e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_row_is_rejected() {
        let row = FundLayerRow {
            tier1_balance: 3000,
            tier2_balance: 0,
            tier3_balance: 0,
            tier4_balance: 0,
            tier1_initial: 2500,
            tier2_initial: 3000,
            tier3_initial: 3500,
            tier4_initial: 1000,
        };
        assert!(FundLayers::try_from(row).is_err());
    }
}
