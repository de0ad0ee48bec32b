//! Auditor text parser
//!
//! Pulls expense lines out of the plain text of a submitted report so an auditor
//! can tick them off one by one.
//!
//! Expected rows (text extracted from the report PDF):
//!   MAYONESA ALACENA 100G                      4.50
//!   Pasajes ida y vuelta                   1,250.00
//!   SUBTOTAL                                 30.00     <- skipped

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::OnceLock;

/// One expense line under audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditedLine {
    pub id: String,
    pub description: String,
    pub amount: Decimal,
    pub audited: bool,
    pub comments: String,
}

fn line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<desc>.+?)\s+(?P<amt>\d[\d,]*\.\d{2})\s*$").expect("valid line regex")
    })
}

/// Parse report text into audit lines, numbered from 1 in reading order.
pub fn parse_audit_lines(text: &str) -> Vec<AuditedLine> {
    let mut out = Vec::new();
    for line in text.lines() {
        let Some(caps) = line_re().captures(line) else {
            continue;
        };

        let description = caps["desc"].trim().to_string();
        let lower = description.to_lowercase();
        if lower.contains("total") || lower.contains("subtotal") {
            continue;
        }

        let Ok(amount) = Decimal::from_str(&caps["amt"].replace(',', "")) else {
            continue;
        };

        out.push(AuditedLine {
            id: (out.len() + 1).to_string(),
            description,
            amount,
            audited: false,
            comments: String::new(),
        });
    }

    out
}
