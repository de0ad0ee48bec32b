//! Draft handles: save/load/clear of one in-progress form, scoped to its owner.
//!
//! A wizard session owns exactly one handle; nothing here is global.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A saved draft plus the time it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Saved<T> {
    pub draft: T,
    pub saved_at: DateTime<Utc>,
}

pub trait DraftStore<T> {
    fn save(&mut self, draft: &T) -> Result<()>;
    fn load(&self) -> Result<Option<Saved<T>>>;
    fn clear(&mut self) -> Result<()>;
}

/// In-memory draft slot. Used in tests and when no state directory is available.
#[derive(Debug, Clone)]
pub struct MemoryDraftStore<T> {
    slot: Option<Saved<T>>,
}

impl<T> Default for MemoryDraftStore<T> {
    fn default() -> Self {
        Self { slot: None }
    }
}

impl<T> MemoryDraftStore<T> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: Clone> DraftStore<T> for MemoryDraftStore<T> {
    fn save(&mut self, draft: &T) -> Result<()> {
        self.slot = Some(Saved {
            draft: draft.clone(),
            saved_at: Utc::now(),
        });
        Ok(())
    }

    fn load(&self) -> Result<Option<Saved<T>>> {
        Ok(self.slot.clone())
    }

    fn clear(&mut self) -> Result<()> {
        self.slot = None;
        Ok(())
    }
}
