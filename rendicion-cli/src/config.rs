use anyhow::{Context, Result};
use chrono::NaiveDate;
use chrono_tz::Tz;
use rendicion_core::{ReconcileConfig, ValidationRules};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::state::ensure_rendicion_home;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ocr: OcrSection,
    pub report: ReportSection,
    pub validation: ValidationRules,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSection {
    /// Only "gemini" is supported.
    pub provider: String,
    pub model: String,
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSection {
    pub currency: String,
    pub variance_epsilon: Decimal,
    /// Days after the request date by which the report is due.
    pub due_days: i64,
    /// IANA zone used for "today".
    pub timezone: String,
}

impl Default for OcrSection {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            currency: "PEN".to_string(),
            variance_epsilon: ReconcileConfig::default().epsilon,
            due_days: 14,
            timezone: "America/Lima".to_string(),
        }
    }
}

impl Config {
    pub fn reconcile(&self) -> ReconcileConfig {
        ReconcileConfig {
            epsilon: self.report.variance_epsilon,
        }
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.report
            .timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("invalid [report] timezone {:?}: {e}", self.report.timezone))
    }

    pub fn today(&self) -> Result<NaiveDate> {
        Ok(chrono::Utc::now().with_timezone(&self.timezone()?).date_naive())
    }

    /// "S/ 150.75" for PEN, "USD 150.75" otherwise.
    pub fn money(&self, amount: Decimal) -> String {
        let symbol = match self.report.currency.as_str() {
            "PEN" => "S/",
            other => other,
        };
        format!("{symbol} {:.2}", amount)
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_rendicion_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    parse_config(&s)
}

pub fn parse_config(s: &str) -> Result<Config> {
    toml::from_str(s).context("parse config.toml")
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

pub fn show_config() -> Result<()> {
    let cfg = load_config()?;
    println!("# {}", config_path()?.display());
    print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
    Ok(())
}
