use anyhow::{Context, Result};
use rendicion_core::{reconcile, DraftStore, ExpenseItem, Reconciliation, ReportSession, VarianceStatus};
use rendicion_ingest::{
    merge_batch, ReceiptExtractor, ReconciliationSummary, ScanError, ScanImage, ScanInput,
};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::ocr::GeminiExtractor;
use crate::state::{self, FileDraftStore};

/// Preview what a batch of receipt images would add to a request's report.
pub async fn run(id: &str, images: &[PathBuf], cfg: &Config) -> Result<()> {
    let ledger = state::load_ledger()?;
    let request = ledger
        .find(id)
        .with_context(|| format!("no request with id {id}"))?;

    let draft = FileDraftStore::<ReportSession>::for_report(id)?
        .load()?
        .map(|s| s.draft);
    let (existing_items, known) = match &draft {
        Some(session) => (
            session.store().items().to_vec(),
            session.known_receipt_numbers(),
        ),
        None => (Vec::new(), HashSet::new()),
    };

    let extractor = GeminiExtractor::from_config(&cfg.ocr)?;
    let summary = scan_paths(&extractor, images, known).await;
    print_summary(&summary, cfg);

    let mut all = existing_items;
    all.extend(summary.new_items.iter().cloned());
    let r = reconcile(&all, request.amount, &cfg.reconcile());
    println!();
    print_reconciliation(&r, cfg);
    println!("\n(preview only; add receipts from `rendicion report {id}`)");
    Ok(())
}

/// Read the images and run them through the extractor. Unreadable files are
/// reported as errors in the summary, in the order they were given.
pub async fn scan_paths<E: ReceiptExtractor + ?Sized>(
    extractor: &E,
    paths: &[PathBuf],
    known: HashSet<String>,
) -> ReconciliationSummary {
    let inputs = load_inputs(paths);
    let batch_tag = chrono::Utc::now().timestamp_millis().to_string();
    merge_batch(extractor, &inputs, known, &batch_tag, |i, n, name| {
        println!("Analyzing file {i} of {n}: {name}");
    })
    .await
}

/// One input per path, in selection order.
pub fn load_inputs(paths: &[PathBuf]) -> Vec<ScanInput> {
    paths
        .iter()
        .map(|p| match load_image(p) {
            Ok(img) => ScanInput::Image(img),
            Err(e) => ScanInput::Unreadable {
                file_name: p.display().to_string(),
                error: ScanError::Image(format!("{e:#}")),
            },
        })
        .collect()
}

pub fn load_image(path: &Path) -> Result<ScanImage> {
    let mime_type = mime_for(path)
        .with_context(|| format!("unsupported image type: {}", path.display()))?;
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(ScanImage {
        file_name,
        reference: path.display().to_string(),
        mime_type: mime_type.to_string(),
        bytes,
    })
}

pub fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

pub fn print_items(items: &[ExpenseItem], cfg: &Config) {
    for item in items {
        println!(
            "  - {:<40} {:>12}  {}",
            item.description,
            cfg.money(item.amount),
            item.receipt_number.as_deref().unwrap_or("")
        );
    }
}

pub fn print_summary(summary: &ReconciliationSummary, cfg: &Config) {
    println!("\nNew items: {}", summary.new_items.len());
    print_items(&summary.new_items, cfg);
    println!("Scanned total: {}", cfg.money(summary.total_scanned));
    if summary.duplicates > 0 {
        println!("Duplicates skipped: {}", summary.duplicates);
    }
    if summary.errors > 0 {
        println!("Errors: {}", summary.errors);
        for m in &summary.error_messages {
            println!("  ! {m}");
        }
    }
}

pub fn print_reconciliation(r: &Reconciliation, cfg: &Config) {
    println!("Requested: {}", cfg.money(r.requested));
    println!("Spent:     {}", cfg.money(r.total));
    match r.status {
        VarianceStatus::Exact => println!("Balance:   exact"),
        VarianceStatus::Over => println!("Balance:   {} over the request", cfg.money(r.variance)),
        VarianceStatus::Under => {
            println!("Balance:   {} still to justify", cfg.money(-r.variance))
        }
    }
}
