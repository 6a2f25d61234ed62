//! Common sink adapter contract. Concrete adapters
//! (filesystem, HTTP, object storage, embedded SQL) live in
//! `analytics-sinks` and `analytics-sql`; this crate only defines the
//! trait they all implement so the router and orchestrator can stay
//! adapter-agnostic.

use async_trait::async_trait;

use analytics_types::AnalyticsEventV1;

use crate::errors::AnalyticsError;

/// Outcome of one `write` call against a sink, as reported up to the
/// router and metrics collector.
#[derive(Debug, Clone)]
pub struct WriteReport {
    pub sink_id: String,
    pub accepted: usize,
    pub error: Option<String>,
}

#[async_trait]
pub trait SinkAdapter: Send + Sync {
    fn id(&self) -> &str;

    async fn init(&self) -> Result<(), AnalyticsError>;

    async fn write(&self, events: &[AnalyticsEventV1]) -> Result<WriteReport, AnalyticsError>;

    async fn close(&self) -> Result<(), AnalyticsError>;

    /// Always the event `id` unless an adapter documents otherwise;
    /// overridable per adapter.
    fn idempotency_key(&self, event: &AnalyticsEventV1) -> String {
        event.id.clone()
    }

    /// Current circuit-breaker state name (`"closed"`/`"open"`/`"half-open"`),
    /// for adapters that own one. `None` for adapters with no breaker.
    fn breaker_state(&self) -> Option<&'static str> {
        None
    }

    /// Drops or deletes whatever this adapter retains past its configured
    /// window. A no-op for adapters with nothing to retain.
    fn retention_sweep(&self) -> Result<(), AnalyticsError> {
        Ok(())
    }
}
