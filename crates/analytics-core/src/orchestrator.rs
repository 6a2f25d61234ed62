//! The `emit` path: fills defaults, validates, runs
//! middleware, checks backpressure, appends to the buffer, and fans out to
//! sinks fire-and-forget. `emit` never propagates an error to its caller.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use log::{error, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use analytics_types::event::Source;
use analytics_types::AnalyticsEventV1;

use crate::backpressure::BackpressureController;
use crate::batcher::Batcher;
use crate::dlq::DeadLetterQueue;
use crate::middleware::{ChainOutcome, MiddlewareChain};
use crate::metrics::MetricsCollector;
use crate::sink::SinkAdapter;
use crate::wal::{AppendOutcome, WalBuffer};

/// Result handed back to every `emit` caller; never an error type —
/// failures are communicated through `reason`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitResult {
    pub queued: bool,
    pub reason: Option<String>,
}

impl EmitResult {
    fn queued() -> Self {
        Self { queued: true, reason: None }
    }

    fn rejected(reason: impl Into<String>) -> Self {
        Self { queued: false, reason: Some(reason.into()) }
    }
}

pub struct OrchestratorConfig {
    pub enabled: bool,
    pub default_source: Source,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { enabled: true, default_source: Source { product: "unknown".to_string(), version: "0.0.0".to_string() } }
    }
}

pub struct Orchestrator {
    config: OrchestratorConfig,
    buffer: Arc<WalBuffer>,
    middleware: Arc<MiddlewareChain>,
    backpressure: Arc<BackpressureController>,
    dlq: Arc<DeadLetterQueue>,
    metrics: Arc<MetricsCollector>,
    batchers: BTreeMap<String, Arc<Batcher>>,
    sinks: BTreeMap<String, Arc<dyn SinkAdapter>>,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: OrchestratorConfig,
        buffer: Arc<WalBuffer>,
        middleware: Arc<MiddlewareChain>,
        backpressure: Arc<BackpressureController>,
        dlq: Arc<DeadLetterQueue>,
        metrics: Arc<MetricsCollector>,
        batchers: BTreeMap<String, Arc<Batcher>>,
        sinks: BTreeMap<String, Arc<dyn SinkAdapter>>,
    ) -> Self {
        Self { config, buffer, middleware, backpressure, dlq, metrics, batchers, sinks }
    }

    /// Fills defaults, validates, runs the event through middleware,
    /// checks backpressure, and appends to the buffer before dispatching.
    pub async fn emit(&self, mut partial: Value) -> EmitResult {
        if !self.config.enabled {
            return EmitResult::rejected("Analytics disabled");
        }

        self.fill_defaults(&mut partial);

        let event = match analytics_types::validate(&partial) {
            Ok(event) => event,
            Err(violations) => {
                let reasons: Vec<String> = violations.iter().map(|v| v.to_string()).collect();
                return EmitResult::rejected(format!("Validation failed: {}", reasons.join("; ")));
            }
        };

        let roll: f64 = rand::thread_rng().gen_range(0.0..1.0);
        let event = match self.middleware.run(&event, roll) {
            ChainOutcome::Forward(event) => event,
            ChainOutcome::Dropped { .. } => {
                self.metrics.record_event();
                return EmitResult::rejected("Dropped by sampling");
            }
        };

        let depth = self.buffer.current_segment().map(|s| s.event_count).unwrap_or(0);
        self.metrics.set_queue_depth(depth);
        let accept_roll: f64 = rand::thread_rng().gen_range(0.0..1.0);
        if !self.backpressure.should_accept(depth, accept_roll) {
            let level = self.backpressure.level(depth);
            return EmitResult::rejected(format!("Backpressure {}: dropped", level.as_str()));
        }

        let outcome = match self.buffer.append(&event) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("WAL buffer append failed: {e}");
                if let Err(dlq_err) = self.dlq.insert(&event, &e.to_string(), 0) {
                    warn!("failed to record buffer-append failure in DLQ: {dlq_err}");
                }
                return EmitResult::rejected(format!("Internal error: {e}"));
            }
        };
        if outcome == AppendOutcome::Duplicate {
            return EmitResult::rejected("Duplicate event");
        }

        self.metrics.record_event();
        self.dispatch(event);
        EmitResult::queued()
    }

    fn fill_defaults(&self, partial: &mut Value) {
        let Value::Object(map) = partial else { return };
        let now = Utc::now();
        map.entry("id").or_insert_with(|| Value::String(Uuid::now_v7().to_string()));
        map.entry("schema").or_insert_with(|| Value::String(analytics_types::event::SCHEMA_V1.to_string()));
        map.entry("type").or_insert_with(|| Value::String("unknown".to_string()));
        map.entry("ts").or_insert_with(|| Value::String(now.to_rfc3339()));
        map.entry("ingestTs").or_insert_with(|| Value::String(now.to_rfc3339()));
        map.entry("source").or_insert_with(|| {
            serde_json::to_value(&self.config.default_source).expect("source always serializes")
        });
        map.entry("runId").or_insert_with(|| Value::String(format!("run_{}", now.timestamp_millis())));
    }

    /// Fire-and-forget fan-out: adds to every batcher and the router sees
    /// full batches once thresholds trip. Dispatch never blocks `emit`.
    fn dispatch(&self, event: AnalyticsEventV1) {
        for (sink_id, batcher) in &self.batchers {
            if let Some(batch) = batcher.add(event.clone()) {
                self.spawn_write(sink_id.clone(), batch);
            }
        }
    }

    /// Polls every batcher's age threshold and spawns a write for any batch
    /// that aged out. Callers run this on a timer; `emit` never calls it.
    pub fn flush_aged(&self) {
        for (sink_id, batcher) in &self.batchers {
            if let Some(batch) = batcher.poll_age() {
                self.spawn_write(sink_id.clone(), batch);
            }
        }
    }

    /// Runs every sink's retention sweep. Callers run this on a timer,
    /// independently of `flush_aged`.
    pub fn run_retention_sweep(&self) {
        for sink in self.sinks.values() {
            if let Err(e) = sink.retention_sweep() {
                warn!("sink {} retention sweep failed: {e}", sink.id());
            }
        }
    }

    fn spawn_write(&self, sink_id: String, batch: Vec<AnalyticsEventV1>) {
        let sink = self.sinks.get(&sink_id).cloned();
        let dlq = self.dlq.clone();
        let metrics = self.metrics.clone();
        tokio::spawn(async move {
            let Some(sink) = sink else { return };
            let started = Instant::now();
            match sink.write(&batch).await {
                Ok(report) => {
                    metrics.record_batch(&sink_id, report.accepted, true, started.elapsed().as_secs_f64() * 1000.0);
                }
                Err(e) => {
                    metrics.record_batch(&sink_id, 0, false, started.elapsed().as_secs_f64() * 1000.0);
                    warn!("sink {sink_id} failed to write batch, sending to DLQ: {e}");
                    for failed in &batch {
                        if let Err(dlq_err) = dlq.insert(failed, &e.to_string(), 0) {
                            error!("failed to record sink failure in DLQ: {dlq_err}");
                        }
                    }
                }
            }
            if let Some(state) = sink.breaker_state() {
                metrics.record_circuit_breaker_state(&sink_id, state);
            }
        });
    }

    /// Idempotent shutdown: flushes batchers, closes sinks, closes the
    /// buffer.
    pub async fn close(&self) -> Result<(), crate::errors::AnalyticsError> {
        for (sink_id, batcher) in &self.batchers {
            let batch = batcher.close();
            if batch.is_empty() {
                continue;
            }
            if let Some(sink) = self.sinks.get(sink_id) {
                if let Err(e) = sink.write(&batch).await {
                    warn!("failed to flush batcher for sink {sink_id} on close: {e}");
                }
            }
        }
        for sink in self.sinks.values() {
            if let Err(e) = sink.close().await {
                warn!("sink failed to close cleanly: {e}");
            }
        }
        self.buffer.close()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use analytics_sampling::{RedactPolicy, SamplingPolicy};
    use serde_json::json;

    use super::*;
    use crate::batcher::BatcherConfig;
    use crate::middleware::{Enricher, PiiHasher, Redactor, Sampler};
    use crate::sink::WriteReport;
    use crate::wal::WalBufferConfig;

    struct MockSink {
        id: String,
        received: StdMutex<Vec<AnalyticsEventV1>>,
    }

    #[async_trait::async_trait]
    impl SinkAdapter for MockSink {
        fn id(&self) -> &str {
            &self.id
        }

        async fn init(&self) -> Result<(), crate::errors::AnalyticsError> {
            Ok(())
        }

        async fn write(&self, events: &[AnalyticsEventV1]) -> Result<WriteReport, crate::errors::AnalyticsError> {
            self.received.lock().unwrap().extend_from_slice(events);
            Ok(WriteReport { sink_id: self.id.clone(), accepted: events.len(), error: None })
        }

        async fn close(&self) -> Result<(), crate::errors::AnalyticsError> {
            Ok(())
        }
    }

    fn build_orchestrator(dir: &std::path::Path, enabled: bool) -> Orchestrator {
        let buffer = Arc::new(WalBuffer::new(WalBufferConfig { root: dir.join("wal"), ..WalBufferConfig::default() }));
        let middleware = Arc::new(MiddlewareChain::new(
            Redactor::new(RedactPolicy::default()),
            PiiHasher::disabled(),
            Sampler::new(SamplingPolicy::default()),
            Enricher::new("test-cli/0.1.0".to_string(), "workspace".to_string(), None),
        ));
        let backpressure = Arc::new(BackpressureController::new(crate::backpressure::BackpressureConfig::default()).unwrap());
        let dlq = Arc::new(DeadLetterQueue::new(dir.join("dlq")));
        let metrics = Arc::new(MetricsCollector::new());

        let mut batchers = BTreeMap::new();
        batchers.insert("mock".to_string(), Arc::new(Batcher::new(BatcherConfig { max_size: 1, ..BatcherConfig::default() })));
        let mut sinks: BTreeMap<String, Arc<dyn SinkAdapter>> = BTreeMap::new();
        sinks.insert("mock".to_string(), Arc::new(MockSink { id: "mock".to_string(), received: StdMutex::new(Vec::new()) }));

        Orchestrator::new(
            OrchestratorConfig { enabled, ..OrchestratorConfig::default() },
            buffer,
            middleware,
            backpressure,
            dlq,
            metrics,
            batchers,
            sinks,
        )
    }

    #[tokio::test]
    async fn emit_fills_defaults_and_queues() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = build_orchestrator(dir.path(), true);
        let result = orchestrator.emit(json!({"type": "test.event"})).await;
        assert!(result.queued);
        assert!(result.reason.is_none());
    }

    #[tokio::test]
    async fn emit_rejects_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = build_orchestrator(dir.path(), false);
        let result = orchestrator.emit(json!({"type": "test.event"})).await;
        assert!(!result.queued);
        assert_eq!(result.reason.as_deref(), Some("Analytics disabled"));
    }

    #[tokio::test]
    async fn emit_rejects_duplicate_ids() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = build_orchestrator(dir.path(), true);
        let id = uuid::Uuid::now_v7().to_string();
        let first = orchestrator.emit(json!({"id": id, "type": "test.event"})).await;
        let second = orchestrator.emit(json!({"id": id, "type": "test.event"})).await;
        assert!(first.queued);
        assert!(!second.queued);
        assert_eq!(second.reason.as_deref(), Some("Duplicate event"));
    }

    #[tokio::test]
    async fn emit_rejects_invalid_actor_type() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = build_orchestrator(dir.path(), true);
        let result = orchestrator.emit(json!({"type": "test.event", "actor": {"type": "not-a-real-type"}})).await;
        assert!(!result.queued);
        assert!(result.reason.unwrap().starts_with("Validation failed"));
    }

    #[tokio::test]
    async fn close_flushes_pending_batch() {
        let dir = tempfile::tempdir().unwrap();
        let buffer = Arc::new(WalBuffer::new(WalBufferConfig { root: dir.path().join("wal"), ..WalBufferConfig::default() }));
        let middleware = Arc::new(MiddlewareChain::new(
            Redactor::new(RedactPolicy::default()),
            PiiHasher::disabled(),
            Sampler::new(SamplingPolicy::default()),
            Enricher::new("test-cli/0.1.0".to_string(), "workspace".to_string(), None),
        ));
        let backpressure = Arc::new(BackpressureController::new(crate::backpressure::BackpressureConfig::default()).unwrap());
        let dlq = Arc::new(DeadLetterQueue::new(dir.path().join("dlq")));
        let metrics = Arc::new(MetricsCollector::new());

        let mut batchers = BTreeMap::new();
        // max_size of 100 so a single emit never auto-flushes via dispatch.
        batchers.insert("mock".to_string(), Arc::new(Batcher::new(BatcherConfig::default())));
        let mut sinks: BTreeMap<String, Arc<dyn SinkAdapter>> = BTreeMap::new();
        sinks.insert("mock".to_string(), Arc::new(MockSink { id: "mock".to_string(), received: StdMutex::new(Vec::new()) }));

        let orchestrator = Orchestrator::new(
            OrchestratorConfig::default(),
            buffer,
            middleware,
            backpressure,
            dlq,
            metrics,
            batchers,
            sinks,
        );

        let result = orchestrator.emit(json!({"type": "test.event"})).await;
        assert!(result.queued);
        orchestrator.close().await.unwrap();
    }
}
