//! GetLedgerViewHandler - Paginated, role-filtered ledger, newest first.
//!
//! Organizers see every displayable entry of the tanda; members see only
//! entries recorded against them. Internal bookkeeping facts such as layer
//! movements and reminder markers are never shown.

use serde::Serialize;

use crate::domain::foundation::{EventId, TandaId, Timestamp, UserId};
use crate::domain::ledger::{EventType, LedgerEvent};
use crate::domain::tanda::{is_displayable, LedgerCategory, TandaError, TandaHistory};

use crate::application::context::LedgerContext;

pub const DEFAULT_PAGE_SIZE: usize = 5;

#[derive(Debug, Clone)]
pub struct GetLedgerViewQuery {
    pub tanda_id: TandaId,
    pub viewer: UserId,
    pub category: Option<LedgerCategory>,
    /// Page size; `None` uses `DEFAULT_PAGE_SIZE`.
    pub limit: Option<usize>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerLine {
    pub event_id: EventId,
    pub event_type: EventType,
    pub occurred_at: Timestamp,
    pub user_id: Option<UserId>,
    pub round: Option<u32>,
    pub amount: Option<i64>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerPage {
    pub entries: Vec<LedgerLine>,
    /// Matching entries before pagination.
    pub total: usize,
    pub offset: usize,
    pub has_more: bool,
}

impl LedgerPage {
    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return "No ledger entries yet.".to_string();
        }
        let mut out = self
            .entries
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        if self.has_more {
            out.push_str("\n\nReply MORE to see older entries.");
        }
        out
    }
}

pub struct GetLedgerViewHandler {
    ctx: LedgerContext,
}

impl GetLedgerViewHandler {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    pub async fn handle(&self, query: GetLedgerViewQuery) -> Result<LedgerPage, TandaError> {
        let events = self.ctx.load_existing(&query.tanda_id).await?;
        let history = TandaHistory::new(&events);

        let viewer = &query.viewer;
        let is_organizer = history.organizer() == Some(viewer);
        if !is_organizer && !history.has_joined(viewer) {
            return Err(TandaError::NotParticipant(viewer.clone()));
        }

        let visible: Vec<&LedgerEvent> = events
            .iter()
            .rev()
            .filter(|e| is_displayable(e.event_type()))
            .filter(|e| query.category.map_or(true, |c| c.includes(e.event_type())))
            .filter(|e| is_organizer || e.is_by(viewer))
            .collect();

        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        let total = visible.len();
        let entries = visible
            .into_iter()
            .skip(query.offset)
            .take(limit)
            .map(|e| LedgerLine {
                event_id: e.id.clone(),
                event_type: e.event_type(),
                occurred_at: e.occurred_at,
                user_id: e.user_id.clone(),
                round: e.round(),
                amount: e.amount,
                text: format_line(e, is_organizer),
            })
            .collect();

        Ok(LedgerPage {
            entries,
            total,
            offset: query.offset,
            has_more: query.offset + limit < total,
        })
    }
}

fn label(kind: EventType) -> &'static str {
    match kind {
        EventType::PeriodicPaymentRecorded => "Periodic payment",
        EventType::ContributionReceived => "Payment received",
        EventType::ContributionRegularized => "Payment regularized",
        EventType::PoolCovered => "Coverage applied",
        EventType::CoverageRepaid => "Coverage repaid",
        EventType::ContributionLate => "Marked late",
        EventType::DefaultConfirmed => "Default confirmed",
        EventType::ParticipantRemoved => "User replaced",
        EventType::ParticipantConfirmed => "User joined",
        EventType::ReplacementJoined => "Replacement joined",
        EventType::TandaActivated => "Tanda activated",
        other => other.as_str(),
    }
}

fn format_line(event: &LedgerEvent, with_user: bool) -> String {
    let mut line = format!("• {}", event.occurred_at.day_month());
    if with_user {
        if let Some(user) = &event.user_id {
            line.push_str(&format!(" - {}...", user.short(8)));
        }
    }
    line.push_str(" - ");
    line.push_str(label(event.event_type()));
    if let Some(round) = event.round() {
        line.push_str(&format!(" P{}", round));
    }
    if let Some(amount) = event.amount.filter(|a| *a != 0) {
        line.push_str(&format!(" - ${}", amount));
    }
    line
}
