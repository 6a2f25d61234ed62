//! Router: holds every registered sink and fans a batch out to all of them
//! concurrently. Individual sink failures are logged
//! and never propagate to other sinks.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::warn;

use analytics_core::sink::{SinkAdapter, WriteReport};
use analytics_core::AnalyticsError;
use analytics_types::AnalyticsEventV1;

pub struct Router {
    sinks: BTreeMap<String, Arc<dyn SinkAdapter>>,
}

impl Router {
    pub fn new() -> Self {
        Self { sinks: BTreeMap::new() }
    }

    pub fn register(&mut self, sink: Arc<dyn SinkAdapter>) {
        self.sinks.insert(sink.id().to_string(), sink);
    }

    pub fn sink_ids(&self) -> Vec<String> {
        self.sinks.keys().cloned().collect()
    }

    /// Invokes every registered adapter concurrently with the same events,
    /// collecting results; a failing sink does not affect the others.
    pub async fn route(&self, events: &[AnalyticsEventV1]) -> Vec<Result<WriteReport, AnalyticsError>> {
        let futures = self.sinks.values().map(|sink| async move { sink.write(events).await });
        let results = futures::future::join_all(futures).await;
        for (id, result) in self.sinks.keys().zip(&results) {
            if let Err(e) = result {
                warn!("sink {id} failed during route: {e}");
            }
        }
        results
    }

    /// Closes every adapter in parallel and clears the registry. Idempotent.
    pub async fn close(&mut self) {
        let futures = self.sinks.values().map(|sink| async move { sink.close().await });
        let results = futures::future::join_all(futures).await;
        for (id, result) in self.sinks.keys().zip(&results) {
            if let Err(e) = result {
                warn!("sink {id} failed to close cleanly: {e}");
            }
        }
        self.sinks.clear();
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
