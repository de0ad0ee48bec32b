//! rendicion-core: expense requests, report drafts and their reconciliation.

pub mod draft;
pub mod error;
pub mod finalize;
pub mod form;
pub mod item_store;
pub mod ledger;
pub mod reconcile;
pub mod request;
pub mod session;
pub mod wizard;

pub use draft::{DraftStore, MemoryDraftStore, Saved};
pub use error::{CoreError, Result};
pub use finalize::{finalize, Incident, ReportFinalizer, ReportUpdate};
pub use form::{has_first_and_last_name, RequestForm, RequestStep, ValidatedRequest, ValidationRules};
pub use item_store::{ExpenseItem, ItemStore, ReceiptGroup};
pub use ledger::{LedgerSummary, RequestLedger};
pub use reconcile::{classify, reconcile, total_of, ReconcileConfig, Reconciliation, VarianceStatus};
pub use request::{
    ExpenseRequest, KnownOrganization, Organization, RequestStatus, SpiritualExperience,
};
pub use session::{ManualEntry, ReportSession, ScanTicket};
pub use wizard::{transition, ReportStep, WizardEvent};
