pub mod audit_text;
pub mod ocr_response;

pub use audit_text::{parse_audit_lines, AuditedLine};
pub use ocr_response::parse_receipts_json;
