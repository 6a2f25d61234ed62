//! Small closed registry mapping a `SinkConfig` tag to its adapter
//! constructor — the only place in this crate
//! that matches on a sink's type tag.

use std::sync::Arc;

use analytics_core::{AnalyticsError, SinkAdapter};
use analytics_sinks::{FsSink, FsSinkConfig, HttpAuth, HttpMethod, HttpSink, HttpSinkConfig, ObjectStoreSink, ObjectStoreSinkConfig};
use analytics_sql::{SqlSink, SqlSinkConfig};

use crate::sink::SinkConfig;

pub fn build_sink(config: &SinkConfig) -> Result<Arc<dyn SinkAdapter>, AnalyticsError> {
    let id = config.id();
    match config {
        SinkConfig::Fs(c) => {
            let mut sink_config = FsSinkConfig::new(id, c.path.clone());
            sink_config.prefix = c.prefix.clone();
            sink_config.rotate_size = c.rotate_size;
            sink_config.retention_days = c.retention_days as u64;
            Ok(Arc::new(FsSink::new(sink_config)))
        }
        SinkConfig::Http(c) => {
            let mut sink_config = HttpSinkConfig::new(id, c.url.clone());
            sink_config.method = match c.method {
                crate::sink::HttpMethod::Post => HttpMethod::Post,
                crate::sink::HttpMethod::Put => HttpMethod::Put,
            };
            sink_config.headers = c.headers.clone();
            sink_config.auth = c.auth.as_ref().map(|a| match a {
                crate::sink::HttpAuth::Bearer(t) => HttpAuth::Bearer(t.clone()),
                crate::sink::HttpAuth::Basic { user, pass } => HttpAuth::Basic { user: user.clone(), pass: pass.clone() },
                crate::sink::HttpAuth::ApiKey(k) => HttpAuth::ApiKey(k.clone()),
            });
            sink_config.timeout = std::time::Duration::from_millis(c.timeout_ms);
            sink_config.idempotency_header = c.idempotency_header.clone();
            sink_config.retry = c.retry.to_sink_config();
            sink_config.breaker = c.breaker.to_sink_config();
            Ok(Arc::new(HttpSink::new(sink_config)))
        }
        SinkConfig::S3(c) => {
            let mut sink_config = ObjectStoreSinkConfig::new(id, c.bucket.clone());
            sink_config.region = c.region.clone();
            sink_config.key_prefix = c.key_prefix.clone();
            if c.access_key_id.is_some() {
                sink_config.access_key_id = c.access_key_id.clone();
            }
            if c.secret_access_key.is_some() {
                sink_config.secret_access_key = c.secret_access_key.clone();
            }
            sink_config.endpoint = c.endpoint.clone();
            sink_config.idempotency_metadata_key = c.idempotency_metadata_key.clone();
            sink_config.key_strategy = match c.key_strategy {
                crate::sink::ObjectKeyStrategy::Literal => analytics_sinks::ObjectKeyStrategy::Literal,
                crate::sink::ObjectKeyStrategy::Hashed => analytics_sinks::ObjectKeyStrategy::Hashed,
            };
            Ok(Arc::new(ObjectStoreSink::new(sink_config)?))
        }
        SinkConfig::Sqlite(c) => {
            let mut sink_config = SqlSinkConfig::new(id, c.path.clone());
            sink_config.partition_by_day = c.partition_by_day;
            sink_config.retention_days = c.retention_days;
            Ok(Arc::new(SqlSink::new(sink_config)?))
        }
    }
}
