//! rendicion-ingest: receipt scanning (OCR responses, batch merge) and auditor text parsing.

pub mod error;
pub mod merge;
pub mod parsers;
pub mod types;

pub use error::ScanError;
pub use merge::{merge_batch, ReceiptExtractor, ReconciliationSummary, ScanMerger, UNKNOWN_VENDOR};
pub use parsers::{parse_audit_lines, parse_receipts_json, AuditedLine};
pub use types::{LineItem, ReceiptData, ScanImage, ScanInput};
