//! GetOrganizerSummaryHandler - Who still owes the round being collected.

use crate::domain::foundation::{TandaId, UserId};
use crate::domain::tanda::{OrganizerSummary, TandaError, TandaHistory};

use crate::application::context::LedgerContext;

#[derive(Debug, Clone)]
pub struct GetOrganizerSummaryQuery {
    pub tanda_id: TandaId,
    pub organizer_id: UserId,
}

pub struct GetOrganizerSummaryHandler {
    ctx: LedgerContext,
}

impl GetOrganizerSummaryHandler {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    pub async fn handle(
        &self,
        query: GetOrganizerSummaryQuery,
    ) -> Result<OrganizerSummary, TandaError> {
        let events = self.ctx.load_existing(&query.tanda_id).await?;
        let history = TandaHistory::new(&events);
        if history.organizer() != Some(&query.organizer_id) {
            return Err(TandaError::NotOrganizer(query.organizer_id));
        }
        history
            .organizer_summary(self.ctx.now())
            .ok_or(TandaError::TandaNotActive)
    }
}
