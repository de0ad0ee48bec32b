use anyhow::{Context, Result};
use rendicion_ingest::{parse_audit_lines, AuditedLine};
use rust_decimal::Decimal;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::config::Config;

pub fn run(text_file: &Path, csv_out: Option<&Path>, cfg: &Config) -> Result<()> {
    let text = fs::read_to_string(text_file)
        .with_context(|| format!("read {}", text_file.display()))?;
    let lines = parse_audit_lines(&text);

    if lines.is_empty() {
        println!("No expense lines found in {}", text_file.display());
        return Ok(());
    }

    for l in &lines {
        println!("{:>3}. {:<50} {:>12}", l.id, l.description, cfg.money(l.amount));
    }
    let total: Decimal = lines.iter().map(|l| l.amount).sum();
    println!("\n{} line(s), total {}", lines.len(), cfg.money(total));

    if let Some(out) = csv_out {
        let file = fs::File::create(out).with_context(|| format!("create {}", out.display()))?;
        write_csv(file, &lines)?;
        println!("Wrote {}", out.display());
    }
    Ok(())
}

/// Amounts are written as text so the printed decimals survive.
pub fn write_csv<W: Write>(out: W, lines: &[AuditedLine]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    wtr.write_record(["id", "description", "amount", "audited", "comments"])?;
    for l in lines {
        let amount = l.amount.to_string();
        let audited = if l.audited { "true" } else { "false" };
        wtr.write_record([
            l.id.as_str(),
            l.description.as_str(),
            amount.as_str(),
            audited,
            l.comments.as_str(),
        ])?;
    }
    wtr.flush().context("flush csv")?;
    Ok(())
}
