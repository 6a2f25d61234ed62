//! Dead-letter queue: rolling JSONL files of events that could not be
//! delivered, with filterable listing/replay.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use analytics_types::AnalyticsEventV1;

use crate::errors::AnalyticsError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlqEntry {
    pub event: Value,
    pub error: String,
    pub timestamp: i64,
    #[serde(rename = "retryCount")]
    pub retry_count: u32,
}

/// AND-composed filter over `DlqEntry` fields.
#[derive(Debug, Clone, Default)]
pub struct DlqFilter {
    pub event_id: Option<String>,
    pub event_type: Option<String>,
    pub run_id: Option<String>,
    pub error_contains: Option<String>,
    pub from_timestamp: Option<i64>,
    pub to_timestamp: Option<i64>,
}

impl DlqFilter {
    fn matches(&self, entry: &DlqEntry) -> bool {
        if let Some(id) = &self.event_id {
            if entry.event.get("id").and_then(Value::as_str) != Some(id.as_str()) {
                return false;
            }
        }
        if let Some(t) = &self.event_type {
            if entry.event.get("type").and_then(Value::as_str) != Some(t.as_str()) {
                return false;
            }
        }
        if let Some(r) = &self.run_id {
            if entry.event.get("runId").and_then(Value::as_str) != Some(r.as_str()) {
                return false;
            }
        }
        if let Some(needle) = &self.error_contains {
            if !entry.error.contains(needle.as_str()) {
                return false;
            }
        }
        if let Some(from) = self.from_timestamp {
            if entry.timestamp < from {
                return false;
            }
        }
        if let Some(to) = self.to_timestamp {
            if entry.timestamp > to {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default)]
pub struct DlqStats {
    pub total_files: usize,
    pub total_entries: usize,
}

pub struct DeadLetterQueue {
    root: PathBuf,
}

impl DeadLetterQueue {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Appends one `{event, error, timestamp, retryCount}` line to the
    /// current rolling file, creating `dlq/` on demand.
    pub fn insert(&self, event: &AnalyticsEventV1, error: &str, retry_count: u32) -> Result<(), AnalyticsError> {
        fs::create_dir_all(&self.root).map_err(|e| AnalyticsError::DlqIoError(e.to_string()))?;
        let now = Utc::now();
        let path = self.root.join(format!("dlq-{}.jsonl", now.to_rfc3339()));
        let entry = DlqEntry {
            event: serde_json::to_value(event).expect("event always serializes"),
            error: error.to_string(),
            timestamp: now.timestamp_millis(),
            retry_count,
        };
        self.append_entry(&path, &entry)
    }

    /// Same as `insert` but accepts a raw JSON value, for the "minimal
    /// event" case where validation already failed and no typed
    /// `AnalyticsEventV1` exists.
    pub fn insert_raw(&self, event: Value, error: &str, retry_count: u32) -> Result<(), AnalyticsError> {
        fs::create_dir_all(&self.root).map_err(|e| AnalyticsError::DlqIoError(e.to_string()))?;
        let now = Utc::now();
        let path = self.root.join(format!("dlq-{}.jsonl", now.to_rfc3339()));
        let entry = DlqEntry { event, error: error.to_string(), timestamp: now.timestamp_millis(), retry_count };
        self.append_entry(&path, &entry)
    }

    fn append_entry(&self, path: &Path, entry: &DlqEntry) -> Result<(), AnalyticsError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| AnalyticsError::DlqIoError(e.to_string()))?;
        let mut line = serde_json::to_vec(entry).expect("dlq entry always serializes");
        line.push(b'\n');
        file.write_all(&line).map_err(|e| AnalyticsError::DlqIoError(e.to_string()))
    }

    pub fn list_files(&self) -> Result<Vec<PathBuf>, AnalyticsError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut paths: Vec<PathBuf> = fs::read_dir(&self.root)
            .map_err(|e| AnalyticsError::DlqIoError(e.to_string()))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("jsonl"))
            .collect();
        paths.sort();
        Ok(paths)
    }

    pub fn read_entries(&self, file: &Path, filter: Option<&DlqFilter>) -> Result<Vec<DlqEntry>, AnalyticsError> {
        let f = File::open(file).map_err(|e| AnalyticsError::DlqIoError(e.to_string()))?;
        let reader = BufReader::new(f);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(|e| AnalyticsError::DlqIoError(e.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(entry) = serde_json::from_str::<DlqEntry>(&line) {
                if filter.map(|f| f.matches(&entry)).unwrap_or(true) {
                    entries.push(entry);
                }
            }
        }
        Ok(entries)
    }

    /// Returns the matched events only; does not delete anything.
    pub fn replay(&self, file: &Path, filter: Option<&DlqFilter>) -> Result<Vec<Value>, AnalyticsError> {
        Ok(self.read_entries(file, filter)?.into_iter().map(|e| e.event).collect())
    }

    pub fn remove_file(&self, file: &Path) -> Result<(), AnalyticsError> {
        fs::remove_file(file).map_err(|e| AnalyticsError::DlqIoError(e.to_string()))
    }

    pub fn get_stats(&self) -> Result<DlqStats, AnalyticsError> {
        let files = self.list_files()?;
        let mut total_entries = 0;
        for file in &files {
            total_entries += self.read_entries(file, None)?.len();
        }
        Ok(DlqStats { total_files: files.len(), total_entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics_types::event::{Source, SCHEMA_V1};

    fn sample_event(id: &str, event_type: &str) -> AnalyticsEventV1 {
        AnalyticsEventV1 {
            id: id.to_string(),
            schema: SCHEMA_V1.to_string(),
            event_type: event_type.to_string(),
            ts: "2026-07-31T00:00:00Z".to_string(),
            ingest_ts: "2026-07-31T00:00:00Z".to_string(),
            source: Source { product: "test".to_string(), version: "0.1.0".to_string() },
            run_id: "run-1".to_string(),
            actor: None,
            ctx: None,
            payload: None,
            hash_meta: None,
        }
    }

    #[test]
    fn insert_then_list_then_stats() {
        let dir = tempfile::tempdir().unwrap();
        let dlq = DeadLetterQueue::new(dir.path());
        dlq.insert(&sample_event("1", "a.b"), "sink down", 0).unwrap();
        let files = dlq.list_files().unwrap();
        assert_eq!(files.len(), 1);
        let stats = dlq.get_stats().unwrap();
        assert_eq!(stats.total_files, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[test]
    fn filter_predicates_and_together() {
        let dir = tempfile::tempdir().unwrap();
        let dlq = DeadLetterQueue::new(dir.path());
        dlq.insert(&sample_event("1", "a.b"), "timeout", 0).unwrap();
        dlq.insert(&sample_event("2", "c.d"), "timeout", 0).unwrap();
        let file = &dlq.list_files().unwrap()[0];
        let filter = DlqFilter { event_type: Some("a.b".to_string()), error_contains: Some("time".to_string()), ..Default::default() };
        let entries = dlq.read_entries(file, Some(&filter)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event["id"], "1");
    }

    #[test]
    fn replay_does_not_delete() {
        let dir = tempfile::tempdir().unwrap();
        let dlq = DeadLetterQueue::new(dir.path());
        dlq.insert(&sample_event("1", "a.b"), "err", 0).unwrap();
        let file = dlq.list_files().unwrap().remove(0);
        let replayed = dlq.replay(&file, None).unwrap();
        assert_eq!(replayed.len(), 1);
        assert!(dlq.list_files().unwrap().contains(&file));
    }
}
