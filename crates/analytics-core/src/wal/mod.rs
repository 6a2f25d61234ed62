//! Durable write-ahead buffer: persists validated events before they are
//! offered to sinks, and deduplicates re-submissions within the process
//!.

mod dedup;
mod segment;

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use log::warn;

pub use dedup::DedupCache;
pub use segment::{read_index, read_segment, list_segments, IndexEntry, SegmentInfo};
use segment::OpenSegment;

use analytics_types::AnalyticsEventV1;

use crate::errors::AnalyticsError;

/// Result of offering one event to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Accepted,
    Duplicate,
}

#[derive(Debug, Clone)]
pub struct WalBufferConfig {
    pub root: PathBuf,
    pub segment_bytes: u64,
    pub segment_max_age: Duration,
    pub fsync_on_rotate: bool,
    pub dedup_capacity: usize,
}

impl Default for WalBufferConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./.analytics-wal"),
            segment_bytes: 1024 * 1024,
            segment_max_age: Duration::from_secs(60),
            fsync_on_rotate: true,
            dedup_capacity: 10_000,
        }
    }
}

struct Inner {
    current: Option<OpenSegment>,
}

pub struct WalBuffer {
    config: WalBufferConfig,
    dedup: DedupCache,
    inner: Mutex<Inner>,
}

impl WalBuffer {
    pub fn new(config: WalBufferConfig) -> Self {
        let dedup = DedupCache::new(config.dedup_capacity);
        Self { config, dedup, inner: Mutex::new(Inner { current: None }) }
    }

    /// Dedups, rotates the current segment if needed, then appends.
    pub fn append(&self, event: &AnalyticsEventV1) -> Result<AppendOutcome, AnalyticsError> {
        if self.dedup.contains(&event.id) {
            return Ok(AppendOutcome::Duplicate);
        }

        let mut guard = self.inner.lock().expect("wal buffer mutex poisoned");

        if guard.current.is_none() {
            guard.current = Some(OpenSegment::create(&self.config.root, Utc::now().timestamp_millis())?);
        }

        let encoded_len = serde_json::to_vec(event).expect("event always serializes").len() as u64 + 1;
        let should_rotate = {
            let seg = guard.current.as_ref().expect("segment just ensured present");
            let over_size = seg.info.byte_size + encoded_len > self.config.segment_bytes;
            let over_age = seg
                .info
                .first_event_ts
                .map(|first| Utc::now().signed_duration_since(first).to_std().unwrap_or_default() > self.config.segment_max_age)
                .unwrap_or(false);
            over_size || over_age
        };

        if should_rotate {
            if let Some(mut seg) = guard.current.take() {
                if let Err(e) = seg.close(self.config.fsync_on_rotate) {
                    warn!("failed to cleanly close rotating WAL segment: {e}");
                }
            }
            guard.current = Some(OpenSegment::create(&self.config.root, Utc::now().timestamp_millis())?);
        }

        guard.current.as_mut().expect("segment ensured present").append(event)?;
        self.dedup.insert(&event.id);
        Ok(AppendOutcome::Accepted)
    }

    pub fn current_segment(&self) -> Option<SegmentInfo> {
        self.inner.lock().expect("wal buffer mutex poisoned").current.as_ref().map(|s| s.info.clone())
    }

    pub fn list_segments(&self) -> std::io::Result<Vec<PathBuf>> {
        list_segments(&self.config.root)
    }

    pub fn read_segment(&self, data_path: &Path) -> std::io::Result<Vec<AnalyticsEventV1>> {
        let index_path = data_path.with_extension("idx");
        read_segment(data_path, &index_path)
    }

    pub fn clear_dedup_cache(&self) {
        self.dedup.clear();
    }

    pub fn close(&self) -> Result<(), AnalyticsError> {
        let mut guard = self.inner.lock().expect("wal buffer mutex poisoned");
        if let Some(mut seg) = guard.current.take() {
            seg.close(self.config.fsync_on_rotate)?;
        }
        Ok(())
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

    #[test]
    fn duplicate_append_is_suppressed() {
        let dir = tempfile::tempdir().unwrap();
        let buf = WalBuffer::new(WalBufferConfig { root: dir.path().to_path_buf(), ..Default::default() });
        let event = sample_event("11111111-1111-1111-1111-111111111111");
        assert_eq!(buf.append(&event).unwrap(), AppendOutcome::Accepted);
        assert_eq!(buf.append(&event).unwrap(), AppendOutcome::Duplicate);
    }

    #[test]
    fn rotation_on_size_bounds_segment_count() {
        let dir = tempfile::tempdir().unwrap();
        let buf = WalBuffer::new(WalBufferConfig {
            root: dir.path().to_path_buf(),
            segment_bytes: 200,
            fsync_on_rotate: false,
            ..Default::default()
        });
        for i in 0..20 {
            let event = sample_event(&format!("{i:08}-0000-0000-0000-000000000000"));
            buf.append(&event).unwrap();
        }
        buf.close().unwrap();
        let segments = buf.list_segments().unwrap();
        assert!(segments.len() > 1, "expected rotation to produce multiple segments");
    }

    #[test]
    fn read_segment_round_trips_events() {
        let dir = tempfile::tempdir().unwrap();
        let buf = WalBuffer::new(WalBufferConfig { root: dir.path().to_path_buf(), ..Default::default() });
        let event = sample_event("22222222-2222-2222-2222-222222222222");
        buf.append(&event).unwrap();
        buf.close().unwrap();
        let path = buf.list_segments().unwrap().remove(0);
        let events = buf.read_segment(&path).unwrap();
        assert_eq!(events, vec![event]);
    }

    #[test]
    fn index_shorter_than_data_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let buf = WalBuffer::new(WalBufferConfig { root: dir.path().to_path_buf(), ..Default::default() });
        let a = sample_event("33333333-3333-3333-3333-333333333333");
        let b = sample_event("44444444-4444-4444-4444-444444444444");
        buf.append(&a).unwrap();
        buf.append(&b).unwrap();
        buf.close().unwrap();
        let path = buf.list_segments().unwrap().remove(0);
        let idx_path = path.with_extension("idx");
        // Truncate the index to simulate a crash between a data write and its index write.
        let entries = read_index(&idx_path).unwrap();
        let truncated = serde_json::to_vec(&entries[0]).unwrap();
        std::fs::write(&idx_path, &[truncated, b"\n".to_vec()].concat()).unwrap();
        let events = read_segment(&path, &idx_path).unwrap();
        assert_eq!(events, vec![a]);
    }
}
