//! EventAnchor port - Optional mirror of selected events to an external ledger.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::ledger::LedgerEvent;

/// Hook offered every successfully appended event.
///
/// Failures are logged by the caller and never reach the append path.
#[async_trait]
pub trait EventAnchor: Send + Sync {
    async fn process_event(&self, event: &LedgerEvent) -> Result<(), DomainError>;
}
