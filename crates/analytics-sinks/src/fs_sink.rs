//! Filesystem JSONL sink. Writes batches as newline
//! delimited JSON, rotating by size and pruning by age, with an
//! in-process write-once set for idempotency against replay.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use chrono::Utc;

use analytics_core::sink::{SinkAdapter, WriteReport};
use analytics_core::AnalyticsError;
use analytics_types::AnalyticsEventV1;

#[derive(Debug, Clone)]
pub struct FsSinkConfig {
    pub id: String,
    pub path: PathBuf,
    pub prefix: String,
    pub rotate_size: u64,
    pub retention_days: u64,
}

impl FsSinkConfig {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self { id: id.into(), path: path.into(), prefix: "events".to_string(), rotate_size: 10 * 1024 * 1024, retention_days: 30 }
    }
}

struct State {
    current_file: Option<PathBuf>,
    written_ids: HashSet<String>,
}

pub struct FsSink {
    config: FsSinkConfig,
    state: Mutex<State>,
}

impl FsSink {
    pub fn new(config: FsSinkConfig) -> Self {
        Self { config, state: Mutex::new(State { current_file: None, written_ids: HashSet::new() }) }
    }

    fn current_or_new_path(&self, state: &mut State) -> std::io::Result<PathBuf> {
        if let Some(path) = &state.current_file {
            let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
            if size < self.config.rotate_size {
                return Ok(path.clone());
            }
        }
        let path = self.config.path.join(format!("{}-{}.jsonl", self.config.prefix, Utc::now().to_rfc3339()));
        state.current_file = Some(path.clone());
        Ok(path)
    }

    fn prune_expired(&self) -> std::io::Result<()> {
        if !self.config.path.exists() {
            return Ok(());
        }
        let cutoff = SystemTime::now() - Duration::from_secs(self.config.retention_days * 86_400);
        let prefix = format!("{}-", self.config.prefix);
        for entry in fs::read_dir(&self.config.path)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.starts_with(&prefix) || !name.ends_with(".jsonl") {
                continue;
            }
            if let Ok(metadata) = entry.metadata() {
                if let Ok(modified) = metadata.modified() {
                    if modified < cutoff {
                        let _ = fs::remove_file(entry.path());
                    }
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SinkAdapter for FsSink {
    fn id(&self) -> &str {
        &self.config.id
    }

    async fn init(&self) -> Result<(), AnalyticsError> {
        fs::create_dir_all(&self.config.path)
            .map_err(|e| AnalyticsError::SinkInitFailed { sink_id: self.config.id.clone(), reason: e.to_string() })
    }

    async fn write(&self, events: &[AnalyticsEventV1]) -> Result<WriteReport, AnalyticsError> {
        let mut state = self.state.lock().expect("fs sink mutex poisoned");
        let mut accepted = 0;
        let to_write: Vec<&AnalyticsEventV1> = events.iter().filter(|e| !state.written_ids.contains(&e.id)).collect();

        if !to_write.is_empty() {
            let path = self
                .current_or_new_path(&mut state)
                .map_err(|e| AnalyticsError::SinkWriteFailed { sink_id: self.config.id.clone(), reason: e.to_string() })?;
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| AnalyticsError::SinkWriteFailed { sink_id: self.config.id.clone(), reason: e.to_string() })?;
            for event in &to_write {
                let mut line = serde_json::to_vec(event).expect("event always serializes");
                line.push(b'\n');
                file.write_all(&line)
                    .map_err(|e| AnalyticsError::SinkWriteFailed { sink_id: self.config.id.clone(), reason: e.to_string() })?;
                state.written_ids.insert(event.id.clone());
                accepted += 1;
            }
        }
        drop(state);

        if let Err(e) = self.prune_expired() {
            log::warn!("fs sink {} failed to prune expired files: {e}", self.config.id);
        }

        Ok(WriteReport { sink_id: self.config.id.clone(), accepted, error: None })
    }

    async fn close(&self) -> Result<(), AnalyticsError> {
        Ok(())
    }

    fn retention_sweep(&self) -> Result<(), AnalyticsError> {
        self.prune_expired()
            .map_err(|e| AnalyticsError::SinkWriteFailed { sink_id: self.config.id.clone(), reason: e.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics_types::event::{Source, SCHEMA_V1};

    fn sample_event(id: &str) -> AnalyticsEventV1 {
        AnalyticsEventV1 {
            id: id.to_string(),
            schema: SCHEMA_V1.to_string(),
            event_type: "test.event".to_string(),
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

    #[tokio::test]
    async fn writes_events_as_jsonl_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsSink::new(FsSinkConfig::new("fs", dir.path()));
        sink.init().await.unwrap();
        let events = vec![sample_event("1"), sample_event("2")];
        let report = sink.write(&events).await.unwrap();
        assert_eq!(report.accepted, 2);

        let files: Vec<_> = fs::read_dir(dir.path()).unwrap().filter_map(|e| e.ok()).collect();
        assert_eq!(files.len(), 1);
        let content = fs::read_to_string(files[0].path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: AnalyticsEventV1 = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.id, "1");
    }

    #[tokio::test]
    async fn duplicate_writes_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsSink::new(FsSinkConfig::new("fs", dir.path()));
        sink.init().await.unwrap();
        let event = sample_event("dup");
        sink.write(&[event.clone()]).await.unwrap();
        let report = sink.write(&[event]).await.unwrap();
        assert_eq!(report.accepted, 0);
    }
}
