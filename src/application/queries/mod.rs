//! Query handlers - Read models replayed from a tanda's events.
//!
//! Queries never append and never take the tanda lock; each one loads the
//! event slice and answers from a fresh `TandaHistory`.

mod fund_layer_status;
mod ledger_export;
mod ledger_view;
mod organizer_summary;
mod payment_status;
mod status_panel;

pub use fund_layer_status::{
    FundLayerStatus, GetFundLayerStatusHandler, GetFundLayerStatusQuery, LayerBalances,
};
pub use ledger_export::{ExportRow, GetLedgerExportHandler, GetLedgerExportQuery};
pub use ledger_view::{
    GetLedgerViewHandler, GetLedgerViewQuery, LedgerLine, LedgerPage, DEFAULT_PAGE_SIZE,
};
pub use organizer_summary::{GetOrganizerSummaryHandler, GetOrganizerSummaryQuery};
pub use payment_status::{GetPaymentStatusHandler, GetPaymentStatusQuery, PaymentStatusView};
pub use status_panel::{
    GetStatusPanelHandler, GetStatusPanelQuery, MemberPanel, OrganizerPanel, StatusPanel,
};
