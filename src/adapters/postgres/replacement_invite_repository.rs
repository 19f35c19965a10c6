//! PostgreSQL implementation of ReplacementInviteRepository.
//!
//! A partial unique index on `(tanda_id, replaced_user_id) WHERE status =
//! 'ACTIVE'` keeps one live code per removed participant.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, TandaId, Timestamp, UserId};
use crate::domain::tanda::{InviteStatus, ReplacementInvite};
use crate::ports::ReplacementInviteRepository;

pub struct PostgresReplacementInviteRepository {
    pool: PgPool,
}

impl PostgresReplacementInviteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InviteRow {
    code: String,
    tanda_id: Uuid,
    replaced_user_id: String,
    status: String,
    used_by_user_id: Option<String>,
    created_at: i64,
}

fn invalid_user(e: impl std::fmt::Display) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Invalid user id: {}", e))
}

impl TryFrom<InviteRow> for ReplacementInvite {
    type Error = DomainError;

    fn try_from(row: InviteRow) -> Result<Self, Self::Error> {
        let status: InviteStatus = row
            .status
            .parse()
            .map_err(|e| DomainError::new(ErrorCode::DatabaseError, format!("Invalid status: {}", e)))?;

        Ok(ReplacementInvite {
            code: row.code,
            tanda_id: TandaId::from_uuid(row.tanda_id),
            replaced_user_id: UserId::new(row.replaced_user_id).map_err(invalid_user)?,
            status,
            used_by_user_id: row
                .used_by_user_id
                .map(UserId::new)
                .transpose()
                .map_err(invalid_user)?,
            created_at: Timestamp::from_millis(row.created_at),
        })
    }
}

#[async_trait]
impl ReplacementInviteRepository for PostgresReplacementInviteRepository {
    async fn insert(&self, invite: &ReplacementInvite) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO replacement_invites (
                code, tanda_id, replaced_user_id, status, used_by_user_id, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&invite.code)
        .bind(invite.tanda_id.as_uuid())
        .bind(invite.replaced_user_id.as_str())
        .bind(invite.status.as_str())
        .bind(invite.used_by_user_id.as_ref().map(|u| u.as_str()))
        .bind(invite.created_at.as_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return DomainError::new(
                        ErrorCode::ValidationFailed,
                        "An active replacement code already exists",
                    );
                }
            }
            DomainError::database("insert replacement invite", e)
        })?;

        Ok(())
    }

    async fn find_active(&self, code: &str) -> Result<Option<ReplacementInvite>, DomainError> {
        let row: Option<InviteRow> = sqlx::query_as(
            r#"
            SELECT code, tanda_id, replaced_user_id, status, used_by_user_id, created_at
            FROM replacement_invites
            WHERE code = $1 AND status = 'ACTIVE'
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("find replacement invite", e))?;

        row.map(ReplacementInvite::try_from).transpose()
    }

    async fn find_claimed_by(
        &self,
        tanda_id: &TandaId,
        user_id: &UserId,
    ) -> Result<Option<ReplacementInvite>, DomainError> {
        let row: Option<InviteRow> = sqlx::query_as(
            r#"
            SELECT code, tanda_id, replaced_user_id, status, used_by_user_id, created_at
            FROM replacement_invites
            WHERE tanda_id = $1 AND used_by_user_id = $2 AND status = 'ACTIVE'
            "#,
        )
        .bind(tanda_id.as_uuid())
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("find claimed replacement invite", e))?;

        row.map(ReplacementInvite::try_from).transpose()
    }

    async fn update(&self, invite: &ReplacementInvite) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE replacement_invites SET
                status = $2,
                used_by_user_id = $3
            WHERE code = $1
            "#,
        )
        .bind(&invite.code)
        .bind(invite.status.as_str())
        .bind(invite.used_by_user_id.as_ref().map(|u| u.as_str()))
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("update replacement invite", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::InvalidInviteCode,
                format!("Replacement code {} not found", invite.code),
            ));
        }

        Ok(())
    }
}
