//! Core analytics pipeline engine: WAL buffer, middleware chain,
//! backpressure, batching, dead-letter queue, metrics, and the
//! orchestrator tying them together.

pub mod backpressure;
pub mod batcher;
pub mod dlq;
pub mod errors;
pub mod metrics;
pub mod middleware;
pub mod orchestrator;
pub mod sink;
pub mod wal;

pub use backpressure::{BackpressureConfig, BackpressureController, Level};
pub use batcher::{Batcher, BatcherConfig};
pub use dlq::{DeadLetterQueue, DlqEntry, DlqFilter, DlqStats};
pub use errors::AnalyticsError;
pub use metrics::{MetricsCollector, MetricsSnapshot, Percentiles};
pub use middleware::{ChainOutcome, Enricher, MiddlewareChain, PiiHasher, PiiPath, Redactor, Sampler};
pub use orchestrator::{EmitResult, Orchestrator, OrchestratorConfig};
pub use sink::{SinkAdapter, WriteReport};
pub use wal::{AppendOutcome, WalBuffer, WalBufferConfig};
