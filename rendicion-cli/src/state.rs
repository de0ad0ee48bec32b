use anyhow::{Context, Result};
use chrono::Utc;
use rendicion_core::{CoreError, DraftStore, RequestLedger, Saved};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::info;

/// `$RENDICION_HOME`, or `~/.rendicion`.
pub fn rendicion_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("RENDICION_HOME") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".rendicion"))
}

pub fn ensure_rendicion_home() -> Result<PathBuf> {
    let dir = rendicion_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn requests_path() -> Result<PathBuf> {
    Ok(ensure_rendicion_home()?.join("requests.json"))
}

pub fn drafts_dir() -> Result<PathBuf> {
    let dir = ensure_rendicion_home()?.join("drafts");
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn load_ledger() -> Result<RequestLedger> {
    read_ledger(&requests_path()?)
}

pub fn save_ledger(ledger: &RequestLedger) -> Result<()> {
    write_ledger(&requests_path()?, ledger)
}

pub fn read_ledger(path: &Path) -> Result<RequestLedger> {
    if !path.exists() {
        return Ok(RequestLedger::new());
    }
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    if s.trim().is_empty() {
        return Ok(RequestLedger::new());
    }
    serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))
}

pub fn write_ledger(path: &Path, ledger: &RequestLedger) -> Result<()> {
    let json = serde_json::to_string_pretty(ledger).context("serialize requests")?;
    write_atomic(path, &json)?;
    info!(path = %path.display(), requests = ledger.len(), "requests saved");
    Ok(())
}

/// New request id: milliseconds since the epoch.
pub fn new_request_id() -> String {
    Utc::now().timestamp_millis().to_string()
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, contents).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("rename to {}", path.display()))?;
    Ok(())
}

/// One draft slot stored as a JSON file.
#[derive(Debug, Clone)]
pub struct FileDraftStore<T> {
    path: PathBuf,
    _draft: PhantomData<T>,
}

impl<T> FileDraftStore<T> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _draft: PhantomData,
        }
    }

    /// Draft of the request being created.
    pub fn for_request_form() -> Result<Self> {
        Ok(Self::new(drafts_dir()?.join("request.json")))
    }

    /// Draft of the report for one request.
    pub fn for_report(request_id: &str) -> Result<Self> {
        Ok(Self::new(drafts_dir()?.join(format!("report-{request_id}.json"))))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn draft_err(path: &Path, e: impl std::fmt::Display) -> CoreError {
    CoreError::Draft(format!("{}: {e}", path.display()))
}

impl<T: Serialize + DeserializeOwned> DraftStore<T> for FileDraftStore<T> {
    fn save(&mut self, draft: &T) -> rendicion_core::Result<()> {
        let saved = Saved {
            draft,
            saved_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&saved).map_err(|e| draft_err(&self.path, e))?;
        write_atomic(&self.path, &json).map_err(|e| draft_err(&self.path, e))
    }

    fn load(&self) -> rendicion_core::Result<Option<Saved<T>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let s = fs::read_to_string(&self.path).map_err(|e| draft_err(&self.path, e))?;
        serde_json::from_str(&s)
            .map(Some)
            .map_err(|e| draft_err(&self.path, e))
    }

    fn clear(&mut self) -> rendicion_core::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(draft_err(&self.path, e)),
        }
    }
}
