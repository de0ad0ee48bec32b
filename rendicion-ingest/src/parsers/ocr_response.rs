//! OCR response parser
//!
//! The receipt reader is asked for a JSON array of receipts. In practice the text
//! comes back in a few shapes:
//!   [ {...}, {...} ]                  (expected)
//!   ```json\n[ ... ]\n```             (fenced)
//!   { ... }                           (single receipt, no array)
//!   (empty)                           (nothing found)

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use crate::error::ScanError;
use crate::types::ReceiptData;

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)^```[A-Za-z]*\s*(?P<body>.*?)\s*```$").expect("valid fence regex")
    })
}

fn strip_fences(text: &str) -> &str {
    let text = text.trim();
    match fence_re().captures(text).and_then(|c| c.name("body")) {
        Some(body) => body.as_str(),
        None => text,
    }
}

/// Parse the text of an OCR response into receipt records.
pub fn parse_receipts_json(text: &str) -> Result<Vec<ReceiptData>, ScanError> {
    let body = strip_fences(text);
    if body.is_empty() {
        return Ok(Vec::new());
    }

    let value: Value =
        serde_json::from_str(body).map_err(|e| ScanError::Malformed(e.to_string()))?;

    let records = match value {
        Value::Array(_) => serde_json::from_value::<Vec<ReceiptData>>(value),
        Value::Object(_) => serde_json::from_value::<ReceiptData>(value).map(|r| vec![r]),
        Value::Null => return Ok(Vec::new()),
        other => {
            return Err(ScanError::Malformed(format!(
                "expected a list of receipts, got {other}"
            )));
        }
    };

    records.map_err(|e| ScanError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parses_array_of_receipts() {
        let text = r#"[
            {"receiptNumber": "001-000306", "vendor": "Bodega Rosita", "date": "2025-03-02",
             "total": 18.5, "isBoleta": true,
             "lineItems": [{"description": "LECHUGA", "amount": 3.5},
                           {"description": "MAYONESA", "amount": 15}]}
        ]"#;
        let out = parse_receipts_json(text).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].receipt_number, "001-000306");
        assert_eq!(out[0].line_items[1].amount, dec!(15));
        assert!(out[0].is_boleta);
    }

    #[test]
    fn test_parses_fenced_single_object() {
        let text = "```json\n{\"receiptNumber\": \"B-1\", \"vendor\": \"Tambo\", \"total\": 4.2, \"isBoleta\": true}\n```";
        let out = parse_receipts_json(text).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].total, dec!(4.2));
        assert!(out[0].line_items.is_empty());
    }

    #[test]
    fn test_empty_and_empty_array_mean_no_receipts() {
        assert!(parse_receipts_json("   ").unwrap().is_empty());
        assert!(parse_receipts_json("[]").unwrap().is_empty());
    }

    #[test]
    fn test_missing_is_boleta_defaults_to_false() {
        let out = parse_receipts_json(r#"[{"vendor": "X"}]"#).unwrap();
        assert!(!out[0].is_boleta);
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = parse_receipts_json("I could not read this image").unwrap_err();
        assert!(matches!(err, ScanError::Malformed(_)));
        assert!(matches!(parse_receipts_json("42"), Err(ScanError::Malformed(_))));
    }
}
