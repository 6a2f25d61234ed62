//! Per-sink batcher: accumulates events until a size or age threshold is
//! hit, then hands the whole batch to its sink in one call.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use analytics_types::AnalyticsEventV1;

#[derive(Debug, Clone)]
pub struct BatcherConfig {
    pub max_size: usize,
    pub max_age: Duration,
    pub flush_on_close: bool,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self { max_size: 100, max_age: Duration::from_millis(5_000), flush_on_close: true }
    }
}

struct Pending {
    events: Vec<AnalyticsEventV1>,
    oldest_at: Option<Instant>,
}

/// Holds events in add-order; `take_ready` hands back a full batch (and
/// clears state) only once a threshold is crossed, so callers can poll it
/// on a timer without building their own age tracking.
pub struct Batcher {
    config: BatcherConfig,
    pending: Mutex<Pending>,
}

impl Batcher {
    pub fn new(config: BatcherConfig) -> Self {
        Self { config, pending: Mutex::new(Pending { events: Vec::new(), oldest_at: None }) }
    }

    /// Appends one event; returns `Some(batch)` if this push crossed
    /// `maxSize`, draining the pending buffer.
    pub fn add(&self, event: AnalyticsEventV1) -> Option<Vec<AnalyticsEventV1>> {
        let mut pending = self.pending.lock().expect("batcher mutex poisoned");
        if pending.events.is_empty() {
            pending.oldest_at = Some(Instant::now());
        }
        pending.events.push(event);
        if pending.events.len() >= self.config.max_size {
            return Some(Self::drain(&mut pending));
        }
        None
    }

    /// Returns `Some(batch)` if the oldest pending event has aged past
    /// `maxAgeMs`, draining the pending buffer. Intended to be polled.
    pub fn poll_age(&self) -> Option<Vec<AnalyticsEventV1>> {
        let mut pending = self.pending.lock().expect("batcher mutex poisoned");
        let aged_out = pending.oldest_at.map(|t| t.elapsed() >= self.config.max_age).unwrap_or(false);
        if aged_out && !pending.events.is_empty() {
            Some(Self::drain(&mut pending))
        } else {
            None
        }
    }

    fn drain(pending: &mut Pending) -> Vec<AnalyticsEventV1> {
        pending.oldest_at = None;
        std::mem::take(&mut pending.events)
    }

    /// `close`: drains and returns whatever is pending if `flushOnClose`,
    /// else discards it. Idempotent — a second call returns an empty batch.
    pub fn close(&self) -> Vec<AnalyticsEventV1> {
        let mut pending = self.pending.lock().expect("batcher mutex poisoned");
        if self.config.flush_on_close {
            Self::drain(&mut pending)
        } else {
            pending.events.clear();
            pending.oldest_at = None;
            Vec::new()
        }
    }

    pub fn len(&self) -> usize {
        self.pending.lock().expect("batcher mutex poisoned").events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
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
    fn flushes_on_size_threshold_preserving_add_order() {
        let batcher = Batcher::new(BatcherConfig { max_size: 3, ..BatcherConfig::default() });
        assert!(batcher.add(sample_event("1")).is_none());
        assert!(batcher.add(sample_event("2")).is_none());
        let batch = batcher.add(sample_event("3")).unwrap();
        assert_eq!(batch.iter().map(|e| e.id.clone()).collect::<Vec<_>>(), vec!["1", "2", "3"]);
        assert!(batcher.is_empty());
    }

    #[test]
    fn flushes_on_age_threshold() {
        let batcher = Batcher::new(BatcherConfig { max_size: 100, max_age: Duration::from_millis(10), ..BatcherConfig::default() });
        batcher.add(sample_event("1"));
        std::thread::sleep(Duration::from_millis(20));
        let batch = batcher.poll_age().unwrap();
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn close_without_flush_on_close_discards_pending() {
        let batcher = Batcher::new(BatcherConfig { flush_on_close: false, ..BatcherConfig::default() });
        batcher.add(sample_event("1"));
        let drained = batcher.close();
        assert!(drained.is_empty());
        assert!(batcher.close().is_empty());
    }
}
