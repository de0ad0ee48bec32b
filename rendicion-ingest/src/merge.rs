//! Scan result merger
//!
//! Turns OCR output for a batch of images into expense items, skipping anything
//! that is not a receipt and receipt numbers that were already recorded. The
//! merger never touches the item store; the caller confirms and commits.

use std::collections::HashSet;

use async_trait::async_trait;
use rendicion_core::{reconcile, ExpenseItem, ReconcileConfig, Reconciliation};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::error::ScanError;
use crate::types::{ReceiptData, ScanImage, ScanInput};

pub const UNKNOWN_VENDOR: &str = "Proveedor desconocido";

/// Reads one receipt image and returns the receipts it contains.
#[async_trait]
pub trait ReceiptExtractor: Send + Sync {
    async fn extract(&self, image: &ScanImage) -> Result<Vec<ReceiptData>, ScanError>;
}

/// Outcome of a scan batch, pending user confirmation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationSummary {
    pub new_items: Vec<ExpenseItem>,
    pub total_scanned: Decimal,
    pub duplicates: usize,
    pub errors: usize,
    pub error_messages: Vec<String>,
}

impl ReconciliationSummary {
    /// Compare what this batch would add against the requested amount.
    pub fn reconcile(&self, requested: Decimal, config: &ReconcileConfig) -> Reconciliation {
        reconcile(&self.new_items, requested, config)
    }

    pub fn is_empty(&self) -> bool {
        self.new_items.is_empty()
    }
}

/// Accumulates one batch. `existing` holds receipt numbers already in the store.
#[derive(Debug)]
pub struct ScanMerger {
    seen: HashSet<String>,
    batch_tag: String,
    next_receipt: usize,
    summary: ReconciliationSummary,
}

impl ScanMerger {
    pub fn new(existing: HashSet<String>, batch_tag: impl Into<String>) -> Self {
        Self {
            seen: existing,
            batch_tag: batch_tag.into(),
            next_receipt: 0,
            summary: ReconciliationSummary::default(),
        }
    }

    /// Merge the records extracted from one image.
    pub fn merge_records(&mut self, file_name: &str, image_ref: &str, records: Vec<ReceiptData>) {
        if records.is_empty() {
            warn!(file = file_name, "no receipt found in image");
            self.push_error(format!("no valid receipt found in {file_name}"));
            return;
        }

        for record in records {
            if !record.is_boleta {
                debug!(file = file_name, vendor = %record.vendor, "skipping non-receipt");
                continue;
            }

            let number = record.receipt_number.trim().to_string();
            if !number.is_empty() && self.seen.contains(&number) {
                warn!(file = file_name, receipt = %number, "duplicate receipt skipped");
                self.summary.duplicates += 1;
                continue;
            }

            match self.materialize(image_ref, &number, record) {
                Ok(()) => {
                    if !number.is_empty() {
                        self.seen.insert(number);
                    }
                }
                Err(e) => self.record_failure(file_name, &e),
            }
        }
    }

    /// Count a per-image failure and keep going.
    pub fn record_failure(&mut self, file_name: &str, err: &ScanError) {
        warn!(file = file_name, error = %err, "receipt scan failed");
        self.push_error(format!("{file_name}: {err}"));
    }

    pub fn summary(&self) -> &ReconciliationSummary {
        &self.summary
    }

    pub fn finish(self) -> ReconciliationSummary {
        self.summary
    }

    fn push_error(&mut self, message: String) {
        self.summary.errors += 1;
        self.summary.error_messages.push(message);
    }

    /// Turn one receipt into items. Lines without a positive amount are
    /// dropped; a receipt left with nothing to add is rejected whole.
    fn materialize(&mut self, image_ref: &str, number: &str, record: ReceiptData) -> Result<(), ScanError> {
        let vendor = match record.vendor.trim() {
            "" => UNKNOWN_VENDOR.to_string(),
            v => v.to_string(),
        };

        let listed = record.line_items.len();
        let mut lines: Vec<(String, Decimal)> = record
            .line_items
            .into_iter()
            .filter(|l| l.amount > Decimal::ZERO)
            .map(|l| (l.description, l.amount))
            .collect();
        if lines.len() < listed {
            warn!(vendor = %vendor, dropped = listed - lines.len(), "dropping lines without a positive amount");
        }
        if lines.is_empty() && record.total > Decimal::ZERO {
            lines.push((vendor.clone(), record.total));
        }
        if lines.is_empty() {
            return Err(ScanError::Malformed(format!(
                "receipt from {vendor} has no positive amount"
            )));
        }

        let total_scanned = lines
            .iter()
            .try_fold(self.summary.total_scanned, |acc, (_, amount)| acc.checked_add(*amount))
            .ok_or_else(|| ScanError::Malformed(format!("amounts on receipt from {vendor} are out of range")))?;

        self.next_receipt += 1;
        let receipt_id = format!("receipt-{}-{}", self.batch_tag, self.next_receipt);
        let receipt_number = (!number.is_empty()).then(|| number.to_string());

        for (idx, (description, amount)) in lines.into_iter().enumerate() {
            self.summary.new_items.push(ExpenseItem {
                id: format!("{receipt_id}-{idx}"),
                description,
                amount,
                receipt_image: Some(image_ref.to_string()),
                receipt_id: Some(receipt_id.clone()),
                vendor: Some(vendor.clone()),
                receipt_number: receipt_number.clone(),
            });
        }
        self.summary.total_scanned = total_scanned;
        Ok(())
    }
}

/// Run every input through the extractor, one at a time in selection order.
///
/// `progress` is called before each input with its 1-based position, the batch
/// size and its file name. Unreadable inputs are counted as errors in place.
pub async fn merge_batch<E, F>(
    extractor: &E,
    inputs: &[ScanInput],
    existing: HashSet<String>,
    batch_tag: &str,
    mut progress: F,
) -> ReconciliationSummary
where
    E: ReceiptExtractor + ?Sized,
    F: FnMut(usize, usize, &str),
{
    let mut merger = ScanMerger::new(existing, batch_tag);
    let count = inputs.len();

    for (i, input) in inputs.iter().enumerate() {
        progress(i + 1, count, input.file_name());

        let image = match input {
            ScanInput::Image(image) => image,
            ScanInput::Unreadable { file_name, error } => {
                merger.record_failure(file_name, error);
                continue;
            }
        };

        if image.bytes.is_empty() {
            merger.record_failure(&image.file_name, &ScanError::Image("file is empty".into()));
            continue;
        }

        match extractor.extract(image).await {
            Ok(records) => merger.merge_records(&image.file_name, &image.reference, records),
            Err(e) => merger.record_failure(&image.file_name, &e),
        }
    }

    merger.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LineItem;
    use rust_decimal_macros::dec;

    fn boleta(number: &str, vendor: &str, total: Decimal) -> ReceiptData {
        ReceiptData {
            receipt_number: number.to_string(),
            vendor: vendor.to_string(),
            date: "2025-06-01".to_string(),
            total,
            is_boleta: true,
            line_items: Vec::new(),
        }
    }

    #[test]
    fn test_line_items_share_one_receipt() {
        let mut rec = boleta("F001-22", "Tottus", dec!(7.50));
        rec.line_items = vec![
            LineItem { description: "PAN".into(), amount: dec!(2.50) },
            LineItem { description: "LECHE".into(), amount: dec!(5.00) },
        ];

        let mut m = ScanMerger::new(HashSet::new(), "t1");
        m.merge_records("a.jpg", "img-a", vec![rec]);
        let s = m.finish();

        assert_eq!(s.new_items.len(), 2);
        assert_eq!(s.new_items[0].receipt_id, s.new_items[1].receipt_id);
        assert_eq!(s.new_items[0].receipt_id.as_deref(), Some("receipt-t1-1"));
        assert_eq!(s.new_items[1].vendor.as_deref(), Some("Tottus"));
        assert_eq!(s.total_scanned, dec!(7.50));
    }

    #[test]
    fn test_record_without_lines_uses_vendor_and_total() {
        let mut m = ScanMerger::new(HashSet::new(), "t1");
        m.merge_records("a.jpg", "img-a", vec![boleta("", "  ", dec!(12))]);
        let s = m.finish();

        assert_eq!(s.new_items.len(), 1);
        assert_eq!(s.new_items[0].description, UNKNOWN_VENDOR);
        assert_eq!(s.new_items[0].amount, dec!(12));
        assert_eq!(s.new_items[0].receipt_number, None);
    }

    #[test]
    fn test_non_receipt_is_silently_skipped() {
        let mut rec = boleta("X-1", "Foto", dec!(3));
        rec.is_boleta = false;

        let mut m = ScanMerger::new(HashSet::new(), "t1");
        m.merge_records("a.jpg", "img-a", vec![rec]);
        let s = m.finish();

        assert!(s.new_items.is_empty());
        assert_eq!(s.errors, 0);
        assert_eq!(s.duplicates, 0);
    }

    #[test]
    fn test_empty_receipt_numbers_are_not_duplicates() {
        let mut m = ScanMerger::new(HashSet::new(), "t1");
        m.merge_records(
            "a.jpg",
            "img-a",
            vec![boleta("", "A", dec!(1)), boleta("", "B", dec!(2))],
        );
        let s = m.finish();
        assert_eq!(s.new_items.len(), 2);
        assert_eq!(s.duplicates, 0);
    }

    #[test]
    fn test_lines_without_amount_are_dropped() {
        let mut rec = boleta("B-1", "Tambo", dec!(0));
        rec.line_items = vec![
            LineItem { description: "GRATIS".into(), amount: dec!(0) },
            LineItem { description: "DESCUENTO".into(), amount: dec!(-2) },
            LineItem { description: "AGUA".into(), amount: dec!(2.50) },
        ];

        let mut m = ScanMerger::new(HashSet::new(), "t1");
        m.merge_records("a.jpg", "img-a", vec![rec]);
        let s = m.finish();

        assert_eq!(s.new_items.len(), 1);
        assert_eq!(s.new_items[0].description, "AGUA");
        assert_eq!(s.total_scanned, dec!(2.50));
    }

    #[test]
    fn test_receipt_with_nothing_positive_is_an_error() {
        let mut rec = boleta("B-2", "Tambo", dec!(0));
        rec.line_items = vec![LineItem { description: "FREE".into(), amount: dec!(0) }];

        let mut m = ScanMerger::new(HashSet::new(), "t1");
        m.merge_records("a.jpg", "img-a", vec![rec]);
        m.merge_records("b.jpg", "img-b", vec![boleta("B-2", "Tambo", dec!(4))]);
        let s = m.finish();

        assert_eq!(s.errors, 1);
        assert!(s.error_messages[0].starts_with("a.jpg: "));
        // the rejected receipt does not block a later good scan of the same number
        assert_eq!(s.duplicates, 0);
        assert_eq!(s.new_items.len(), 1);
        assert_eq!(s.new_items[0].amount, dec!(4));
    }

    #[test]
    fn test_overflowing_amounts_fail_only_that_receipt() {
        let mut huge = boleta("H-1", "X", dec!(0));
        huge.line_items = vec![
            LineItem { description: "A".into(), amount: Decimal::MAX },
            LineItem { description: "B".into(), amount: Decimal::MAX },
        ];

        let mut m = ScanMerger::new(HashSet::new(), "t1");
        m.merge_records("big.jpg", "img-big", vec![huge]);
        m.merge_records("ok.jpg", "img-ok", vec![boleta("K-1", "Y", dec!(3))]);
        let s = m.finish();

        assert_eq!(s.errors, 1);
        assert!(s.error_messages[0].contains("big.jpg"));
        assert_eq!(s.new_items.len(), 1);
        assert_eq!(s.total_scanned, dec!(3));
    }

    #[test]
    fn test_existing_number_counts_as_duplicate() {
        let existing: HashSet<String> = ["001-100".to_string()].into_iter().collect();
        let mut m = ScanMerger::new(existing, "t2");
        m.merge_records("a.jpg", "img-a", vec![boleta(" 001-100 ", "A", dec!(1))]);
        let s = m.finish();
        assert!(s.new_items.is_empty());
        assert_eq!(s.duplicates, 1);
    }
}
