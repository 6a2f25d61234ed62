//! Top-level wiring: turns a resolved `AnalyticsConfig` into a running
//! pipeline — buffer, middleware chain, backpressure controller, DLQ,
//! metrics collector, sinks (built through `analytics_config::registry`),
//! one batcher per sink, and the orchestrator that ties them together.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use analytics_config::{AnalyticsConfig, ConfigError};
use analytics_core::{
    BackpressureController, Batcher, BatcherConfig, DeadLetterQueue, EmitResult, Enricher,
    MetricsCollector, MetricsSnapshot, MiddlewareChain, Orchestrator, OrchestratorConfig,
    PiiHasher, Redactor, Sampler, SinkAdapter, WalBuffer,
};

pub struct AnalyticsPipeline {
    orchestrator: Orchestrator,
    metrics: Arc<MetricsCollector>,
    dlq: Arc<DeadLetterQueue>,
    closed: AtomicBool,
}

impl AnalyticsPipeline {
    pub fn from_config(config: AnalyticsConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let buffer = Arc::new(WalBuffer::new(config.buffer.to_core(config.root.join("wal"), config.dedup_capacity)));
        let dlq = Arc::new(DeadLetterQueue::new(config.root.join("dlq")));
        let metrics = Arc::new(MetricsCollector::new());

        let backpressure = Arc::new(
            BackpressureController::new(config.backpressure.to_core())
                .map_err(|e| ConfigError::Invalid(e.to_string()))?,
        );

        let salt = std::env::var(&config.pii.hash.salt_env).ok();
        let pepper = std::env::var("KB_ANALYTICS_PEPPER").ok();
        let pii_hasher = if config.pii.hash.enabled {
            PiiHasher::new(salt, pepper, config.pii.hash.salt_id.clone(), config.pii.hash.rotate_after_days, config.pii.resolved_paths())
        } else {
            PiiHasher::disabled()
        };

        let repo_root = config.middleware.enrich.repo_root.clone().or_else(|| config.middleware.enrich.git.then(|| std::env::current_dir().ok()).flatten());
        let workspace = if config.middleware.enrich.workspace {
            std::env::current_dir().map(|p| p.display().to_string()).unwrap_or_default()
        } else {
            String::new()
        };

        let middleware = Arc::new(MiddlewareChain::new(
            Redactor::new(config.middleware.redact.to_policy()),
            pii_hasher,
            Sampler::new(config.middleware.sampling.to_policy()),
            Enricher::new(config.middleware.enrich.cli_version.clone(), workspace, repo_root.as_deref()),
        ));

        let mut sinks: BTreeMap<String, Arc<dyn SinkAdapter>> = BTreeMap::new();
        let mut batchers: BTreeMap<String, Arc<Batcher>> = BTreeMap::new();
        for sink_config in &config.sinks {
            let sink = analytics_config::build_sink(sink_config).map_err(|e| ConfigError::Invalid(e.to_string()))?;
            let id = sink_config.id();
            batchers.insert(id.clone(), Arc::new(Batcher::new(BatcherConfig::default())));
            sinks.insert(id, sink);
        }

        let orchestrator = Orchestrator::new(
            OrchestratorConfig { enabled: config.enabled, ..OrchestratorConfig::default() },
            buffer,
            middleware,
            backpressure,
            dlq.clone(),
            metrics.clone(),
            batchers,
            sinks,
        );

        Ok(Self { orchestrator, metrics, dlq, closed: AtomicBool::new(false) })
    }

    pub async fn emit(&self, partial: Value) -> EmitResult {
        self.orchestrator.emit(partial).await
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn dlq(&self) -> &DeadLetterQueue {
        &self.dlq
    }

    fn flush_aged(&self) {
        self.orchestrator.flush_aged();
    }

    /// Runs every sink's retention sweep once, immediately. The background
    /// loop in `run_retention_sweep_loop` calls this on a timer; callers
    /// that want an on-demand sweep (e.g. a CLI subcommand) can call it
    /// directly.
    pub fn run_retention_sweep(&self) {
        self.orchestrator.run_retention_sweep();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Idempotent: a second call after the first is a no-op.
    pub async fn shutdown(&self) -> Result<(), analytics_core::AnalyticsError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.orchestrator.close().await
    }
}

/// Background age-flush loop: periodically polls every batcher the pipeline
/// was given, writing any batch whose oldest event has aged past its
/// threshold. `AnalyticsPipeline` itself never spawns this — callers choose
/// whether they want a background flusher running.
pub async fn run_age_flush_loop(pipeline: Arc<AnalyticsPipeline>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        if pipeline.is_closed() {
            return;
        }
        pipeline.flush_aged();
    }
}

/// Background retention-sweep loop: periodically asks every sink to drop
/// whatever it retains past its configured window (expired WAL-backed rows,
/// partition tables past `retentionDays`, and so on). Sinks with nothing to
/// retain no-op. Runs independently of `run_age_flush_loop` since retention
/// windows are measured in days, not seconds.
pub async fn run_retention_sweep_loop(pipeline: Arc<AnalyticsPipeline>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        if pipeline.is_closed() {
            return;
        }
        pipeline.run_retention_sweep();
    }
}
