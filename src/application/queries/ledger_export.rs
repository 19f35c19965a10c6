//! GetLedgerExportHandler - Flat rows of every event, for spreadsheets and audits.

use serde::Serialize;
use serde_json::Value;

use crate::domain::foundation::{EventId, TandaId, UserId};
use crate::domain::ledger::EventType;
use crate::domain::tanda::{TandaError, TandaHistory};

use crate::application::context::LedgerContext;

/// Actor recorded for facts with no user column.
const SYSTEM_ACTOR: &str = "system";

#[derive(Debug, Clone)]
pub struct GetLedgerExportQuery {
    pub tanda_id: TandaId,
    pub requested_by: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub ledger_id: EventId,
    pub group_id: TandaId,
    pub user_id: String,
    pub period_id: Option<u32>,
    pub entry_type: EventType,
    pub amount_units: i64,
    /// RFC 3339, UTC.
    pub timestamp: String,
    pub meta: Value,
}

pub struct GetLedgerExportHandler {
    ctx: LedgerContext,
}

impl GetLedgerExportHandler {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    /// Every event of the tanda in ledger order. Organizer only.
    pub async fn handle(&self, query: GetLedgerExportQuery) -> Result<Vec<ExportRow>, TandaError> {
        let events = self.ctx.load_existing(&query.tanda_id).await?;
        let history = TandaHistory::new(&events);
        if history.organizer() != Some(&query.requested_by) {
            return Err(TandaError::NotOrganizer(query.requested_by));
        }

        events
            .iter()
            .map(|e| -> Result<ExportRow, TandaError> {
                let (entry_type, meta) = e.event.to_columns()?;
                Ok(ExportRow {
                    ledger_id: e.id.clone(),
                    group_id: query.tanda_id,
                    user_id: e
                        .user_id
                        .as_ref()
                        .map(|u| u.as_str().to_string())
                        .unwrap_or_else(|| SYSTEM_ACTOR.to_string()),
                    period_id: e.round(),
                    entry_type,
                    amount_units: e.amount.unwrap_or(0),
                    timestamp: e.occurred_at.as_datetime().to_rfc3339(),
                    meta,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{user, Harness};

    #[tokio::test]
    async fn exports_one_row_per_event() {
        let h = Harness::new();
        let tanda = h.active_tanda(&["ana", "beto"]).await;
        let events = h.ctx.load(&tanda.id).await.unwrap();

        let rows = GetLedgerExportHandler::new(h.ctx.clone())
            .handle(GetLedgerExportQuery {
                tanda_id: tanda.id,
                requested_by: user("org"),
            })
            .await
            .unwrap();
        assert_eq!(rows.len(), events.len());

        let created = &rows[0];
        assert_eq!(created.entry_type, EventType::TandaCreated);
        assert_eq!(created.user_id, "org");
        assert_eq!(created.meta["contribution_amount"], 1000);
        assert!(created.timestamp.starts_with("2026-01-05T12:00:00"));

        let activated = rows
            .iter()
            .find(|r| r.entry_type == EventType::TandaActivated)
            .unwrap();
        assert_eq!(activated.user_id, "system");
        assert_eq!(activated.amount_units, 0);

        let json = serde_json::to_value(created).unwrap();
        assert_eq!(json["entry_type"], "TandaCreated");
        assert_eq!(json["group_id"], serde_json::json!(tanda.id));
    }

    #[tokio::test]
    async fn members_cannot_export() {
        let h = Harness::new();
        let tanda = h.active_tanda(&["ana", "beto"]).await;

        let err = GetLedgerExportHandler::new(h.ctx.clone())
            .handle(GetLedgerExportQuery {
                tanda_id: tanda.id,
                requested_by: user("ana"),
            })
            .await
            .unwrap_err();
        assert_eq!(err, TandaError::NotOrganizer(user("ana")));
    }
}
