// SPDX-License-Identifier: Apache-2.0

//! Advisory winner history.
//!
//! The payment provider's records remain the source of truth for disputes;
//! this list only exists so an administrator can see past draws.

use crate::draw::DrawResult;
use crate::error::RaffleError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const WINNER_HISTORY_KEY: &str = "raffleWinnerHistory";
pub const DUPLICATE_WINDOW_MS: i64 = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerHistoryEntry {
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub win_percentage: Option<f64>,
}

impl WinnerHistoryEntry {
    #[must_use]
    pub fn from_result(result: &DrawResult, at: DateTime<Utc>) -> Self {
        Self {
            email: result.winner_email.clone(),
            name: result.winner_name.clone(),
            phone: result.winner_phone.clone(),
            timestamp: at,
            ticket_count: Some(result.winner_ticket_count),
            win_percentage: Some(result.win_percentage),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WinnerHistory {
    entries: Vec<WinnerHistoryEntry>,
}

impl WinnerHistory {
    #[must_use]
    pub fn new(entries: Vec<WinnerHistoryEntry>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn entries(&self) -> &[WinnerHistoryEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends `result` unless it repeats the last entry's winner within
    /// [`DUPLICATE_WINDOW_MS`]. Returns whether an entry was appended.
    pub fn record(&mut self, result: &DrawResult, at: DateTime<Utc>) -> bool {
        let candidate = WinnerHistoryEntry::from_result(result, at);
        if let Some(last) = self.entries.last() {
            let gap_ms = (last.timestamp - candidate.timestamp)
                .num_milliseconds()
                .abs();
            if last.email == candidate.email && gap_ms < DUPLICATE_WINDOW_MS {
                return false;
            }
        }
        self.entries.push(candidate);
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

pub trait HistoryStore: Send + Sync {
    fn load(&self) -> Result<WinnerHistory, RaffleError>;
    fn save(&self, history: &WinnerHistory) -> Result<(), RaffleError>;
    fn clear(&self) -> Result<(), RaffleError>;
}

/// Stores the history as a JSON array at `<dir>/raffleWinnerHistory.json`.
#[derive(Debug, Clone)]
pub struct JsonFileHistoryStore {
    path: PathBuf,
}

impl JsonFileHistoryStore {
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{WINNER_HISTORY_KEY}.json")),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStore for JsonFileHistoryStore {
    fn load(&self) -> Result<WinnerHistory, RaffleError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(WinnerHistory::default())
            }
            Err(e) => return Err(RaffleError::storage(format!("history read failed: {e}"))),
        };
        match serde_json::from_slice::<Vec<WinnerHistoryEntry>>(&bytes) {
            Ok(entries) => Ok(WinnerHistory::new(entries)),
            Err(e) => {
                warn!(path = %self.path.display(), "winner history unreadable, starting empty: {e}");
                Ok(WinnerHistory::default())
            }
        }
    }

    fn save(&self, history: &WinnerHistory) -> Result<(), RaffleError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| RaffleError::storage(format!("history dir create failed: {e}")))?;
        }
        let bytes = serde_json::to_vec_pretty(history.entries())
            .map_err(|e| RaffleError::storage(format!("history serialize failed: {e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes)
            .map_err(|e| RaffleError::storage(format!("history write failed: {e}")))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| RaffleError::storage(format!("history rename failed: {e}")))
    }

    fn clear(&self) -> Result<(), RaffleError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RaffleError::storage(format!("history remove failed: {e}"))),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    entries: std::sync::Mutex<Vec<WinnerHistoryEntry>>,
}

impl HistoryStore for MemoryHistoryStore {
    fn load(&self) -> Result<WinnerHistory, RaffleError> {
        let guard = self
            .entries
            .lock()
            .map_err(|_| RaffleError::storage("history lock poisoned"))?;
        Ok(WinnerHistory::new(guard.clone()))
    }

    fn save(&self, history: &WinnerHistory) -> Result<(), RaffleError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|_| RaffleError::storage("history lock poisoned"))?;
        *guard = history.entries().to_vec();
        Ok(())
    }

    fn clear(&self) -> Result<(), RaffleError> {
        self.save(&WinnerHistory::default())
    }
}
