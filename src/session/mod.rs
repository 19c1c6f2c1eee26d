//! Probe history persistence
//!
//! Every sent probe is recorded so a run leaves an auditable trail.
//! Recording is fire-and-forget from the engine's point of view: a
//! failed write is logged and the run carries on.

#![allow(dead_code)]

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::http::{ProbeRequest, ProbeResponse};
use crate::probe::HistorySink;

/// One sent probe (simplified for persistence)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: SystemTime,
    pub method: String,
    pub url: String,
    pub body: Option<String>,
    pub status: Option<u16>,
    pub response_size: Option<usize>,
}

impl HistoryEntry {
    fn from_exchange(request: &ProbeRequest, response: Option<&ProbeResponse>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            method: request.method.clone(),
            url: request.url.clone(),
            body: request.body.clone(),
            status: response.map(|r| r.status),
            response_size: response.map(|r| r.size),
        }
    }
}

/// History data that persists between runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryData {
    /// Version for format compatibility
    pub version: u32,
    /// Timestamp when the history was last saved
    pub saved_at: SystemTime,
    /// Recorded probes, most recent first
    pub entries: Vec<HistoryEntry>,
}

impl Default for HistoryData {
    fn default() -> Self {
        Self {
            version: 1,
            saved_at: SystemTime::now(),
            entries: Vec::new(),
        }
    }
}

impl HistoryData {
    /// Load history from a file
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let file = File::open(path).map_err(|source| SessionError::Open {
            path: path.display().to_string(),
            source,
        })?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| SessionError::Parse(e.to_string()))
    }

    /// Save history to a file
    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SessionError::Write(e.to_string()))?;
        }

        let file = File::create(path).map_err(|e| SessionError::Write(e.to_string()))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self).map_err(|e| SessionError::Write(e.to_string()))
    }

    /// Add an entry, keeping at most `cap` of the most recent.
    pub fn push(&mut self, entry: HistoryEntry, cap: usize) {
        self.entries.insert(0, entry);
        if self.entries.len() > cap {
            self.entries.truncate(cap);
        }
    }
}

/// File-backed history sink. Rewrites the file on every record, so a
/// crash mid-run loses at most the in-flight entry.
pub struct SessionHistory {
    path: PathBuf,
    cap: usize,
    data: Mutex<HistoryData>,
}

impl SessionHistory {
    /// Open an existing history file, or start fresh if it is missing
    /// or unreadable.
    pub fn open(path: PathBuf, cap: usize) -> Self {
        let data = if path.exists() {
            match HistoryData::load(&path) {
                Ok(data) => data,
                Err(e) => {
                    tracing::warn!("Failed to load history: {}, starting fresh", e);
                    HistoryData::default()
                }
            }
        } else {
            HistoryData::default()
        };

        Self {
            path,
            cap,
            data: Mutex::new(data),
        }
    }

    /// Get the default history file path
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("io", "sonda", "sonda")
            .map(|dirs| dirs.data_dir().join("history.json"))
            .unwrap_or_else(|| PathBuf::from("sonda-history.json"))
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.data.lock().entries.clone()
    }
}

impl HistorySink for SessionHistory {
    fn record(
        &self,
        request: &ProbeRequest,
        response: Option<&ProbeResponse>,
    ) -> Result<(), SessionError> {
        let mut data = self.data.lock();
        data.push(HistoryEntry::from_exchange(request, response), self.cap);
        data.saved_at = SystemTime::now();
        data.save(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn probe_exchange(url: &str) -> (ProbeRequest, ProbeResponse) {
        let mut request = ProbeRequest::new("POST", url);
        request.set_body("user=admin&pin=A".to_string());
        (request, ProbeResponse::new(200, "OK", b"welcome".to_vec()))
    }

    #[test]
    fn records_survive_a_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");

        let history = SessionHistory::open(path.clone(), 100);
        let (request, response) = probe_exchange("http://target.local/login");
        history.record(&request, Some(&response)).unwrap();

        let loaded = HistoryData::load(&path).unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.entries.len(), 1);
        assert_eq!(loaded.entries[0].method, "POST");
        assert_eq!(loaded.entries[0].status, Some(200));
        assert_eq!(
            loaded.entries[0].body.as_deref(),
            Some("user=admin&pin=A")
        );
    }

    #[test]
    fn history_is_capped_most_recent_first() {
        let dir = tempdir().unwrap();
        let history = SessionHistory::open(dir.path().join("history.json"), 10);

        for i in 0..15 {
            let (request, response) = probe_exchange(&format!("http://target.local/{}", i));
            history.record(&request, Some(&response)).unwrap();
        }

        let entries = history.entries();
        assert_eq!(entries.len(), 10);
        assert!(entries[0].url.ends_with("/14"));
    }

    #[test]
    fn unreadable_history_starts_fresh() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "not json").unwrap();

        let history = SessionHistory::open(path, 10);
        assert!(history.entries().is_empty());
    }
}
