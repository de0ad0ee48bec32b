//! Line-based terminal prompts.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

/// What the user typed at a wizard step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Text(String),
    /// `<` goes back one step.
    Back,
    /// `q` saves the draft and exits.
    Quit,
}

pub fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush().ok();
    let mut s = String::new();
    let n = io::stdin().lock().read_line(&mut s)?;
    if n == 0 {
        bail!("input closed");
    }
    Ok(s.trim().to_string())
}

/// Prompt with a prefilled value shown in brackets; an empty answer keeps it.
pub fn ask(label: &str, current: &str) -> Result<Answer> {
    let line = if current.is_empty() {
        prompt(label)?
    } else {
        prompt(&format!("{label} [{current}]"))?
    };
    Ok(classify(&line, current))
}

pub fn classify(line: &str, current: &str) -> Answer {
    match line {
        "<" => Answer::Back,
        "q" | "Q" => Answer::Quit,
        "" => Answer::Text(current.to_string()),
        other => Answer::Text(other.to_string()),
    }
}

/// Anything but a clear yes declines.
pub fn confirm(label: &str) -> Result<bool> {
    let s = prompt(&format!("{label} [s/n]"))?;
    Ok(parse_yes_no(&s).unwrap_or(false))
}

/// `None` unless the answer is clearly yes or clearly no.
pub fn parse_yes_no(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "s" | "si" | "sí" | "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// "150.75", "1,250.00" or "S/ 20".
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let cleaned: String = s
        .trim()
        .trim_start_matches("S/")
        .trim()
        .chars()
        .filter(|c| *c != ',')
        .collect();
    Decimal::from_str(&cleaned).ok()
}

/// YYYY-MM-DD or DD/MM/YYYY.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_classify_answers() {
        assert_eq!(classify("<", "x"), Answer::Back);
        assert_eq!(classify("q", ""), Answer::Quit);
        assert_eq!(classify("", "Juan Pérez"), Answer::Text("Juan Pérez".into()));
        assert_eq!(classify("Ana", "Juan"), Answer::Text("Ana".into()));
    }

    #[test]
    fn test_parse_amount_formats() {
        assert_eq!(parse_amount("150.75"), Some(dec!(150.75)));
        assert_eq!(parse_amount("1,250.00"), Some(dec!(1250)));
        assert_eq!(parse_amount("S/ 20"), Some(dec!(20)));
        assert_eq!(parse_amount("veinte"), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let d = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(parse_date("2025-06-01"), Some(d));
        assert_eq!(parse_date("01/06/2025"), Some(d));
        assert_eq!(parse_date("junio"), None);
    }

    #[test]
    fn test_yes_no_answers() {
        assert_eq!(parse_yes_no("Sí"), Some(true));
        assert_eq!(parse_yes_no(" s "), Some(true));
        assert_eq!(parse_yes_no("n"), Some(false));
        assert_eq!(parse_yes_no("NO"), Some(false));
        assert_eq!(parse_yes_no("sii"), None);
        assert_eq!(parse_yes_no(""), None);
    }
}
