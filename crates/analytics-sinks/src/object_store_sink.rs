//! Object-storage sink, built on the `object_store`
//! crate so the same adapter works against S3 and S3-compatible endpoints.

use std::sync::Arc;
use std::sync::Mutex;
use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, AttributeValue, Attributes, ObjectStore, PutOptions, PutPayload};

use analytics_core::sink::{SinkAdapter, WriteReport};
use analytics_core::AnalyticsError;
use analytics_types::AnalyticsEventV1;

/// The object key historically concatenates up to 50 raw characters of
/// joined event IDs, an arbitrary mid-UUID truncation. `Literal` preserves
/// that; `Hashed` is the collision-resistant alternative, selectable per
/// sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKeyStrategy {
    Literal,
    Hashed,
}

#[derive(Debug, Clone)]
pub struct ObjectStoreSinkConfig {
    pub id: String,
    pub bucket: String,
    pub region: String,
    pub key_prefix: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub endpoint: Option<String>,
    pub idempotency_metadata_key: String,
    pub key_strategy: ObjectKeyStrategy,
}

impl ObjectStoreSinkConfig {
    pub fn new(id: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            bucket: bucket.into(),
            region: "us-east-1".to_string(),
            key_prefix: "events/".to_string(),
            access_key_id: std::env::var("ACCESS_KEY_ID").ok(),
            secret_access_key: std::env::var("SECRET_ACCESS_KEY").ok(),
            endpoint: None,
            idempotency_metadata_key: "idempotency-key".to_string(),
            key_strategy: ObjectKeyStrategy::Literal,
        }
    }
}

pub struct ObjectStoreSink {
    config: ObjectStoreSinkConfig,
    store: Arc<dyn ObjectStore>,
    seen_keys: Mutex<HashSet<String>>,
}

impl ObjectStoreSink {
    pub fn new(config: ObjectStoreSinkConfig) -> Result<Self, AnalyticsError> {
        let mut builder = AmazonS3Builder::new().with_bucket_name(&config.bucket).with_region(&config.region);
        if let Some(key) = &config.access_key_id {
            builder = builder.with_access_key_id(key);
        }
        if let Some(secret) = &config.secret_access_key {
            builder = builder.with_secret_access_key(secret);
        }
        if let Some(endpoint) = &config.endpoint {
            builder = builder.with_endpoint(endpoint).with_allow_http(true);
        }
        let store = builder
            .build()
            .map_err(|e| AnalyticsError::SinkInitFailed { sink_id: config.id.clone(), reason: e.to_string() })?;
        Ok(Self { config, store: Arc::new(store), seen_keys: Mutex::new(HashSet::new()) })
    }

    fn object_key(&self, events: &[AnalyticsEventV1]) -> String {
        let sanitized_ts = Utc::now().to_rfc3339().replace(':', "-");
        let joined_ids = events.iter().map(|e| e.id.as_str()).collect::<Vec<_>>().join("-");
        let id_part = match self.config.key_strategy {
            ObjectKeyStrategy::Literal => joined_ids.chars().take(50).collect::<String>(),
            ObjectKeyStrategy::Hashed => analytics_types::hashing::hash_str(&joined_ids),
        };
        format!("{}{}-{}.jsonl", self.config.key_prefix, sanitized_ts, id_part)
    }
}

#[async_trait]
impl SinkAdapter for ObjectStoreSink {
    fn id(&self) -> &str {
        &self.config.id
    }

    async fn init(&self) -> Result<(), AnalyticsError> {
        Ok(())
    }

    async fn write(&self, events: &[AnalyticsEventV1]) -> Result<WriteReport, AnalyticsError> {
        if events.is_empty() {
            return Ok(WriteReport { sink_id: self.config.id.clone(), accepted: 0, error: None });
        }

        let key = self.object_key(events);
        {
            let seen = self.seen_keys.lock().expect("object store sink mutex poisoned");
            if seen.contains(&key) {
                return Ok(WriteReport { sink_id: self.config.id.clone(), accepted: 0, error: None });
            }
        }

        let mut body = Vec::new();
        for event in events {
            let mut line = serde_json::to_vec(event).expect("event always serializes");
            line.push(b'\n');
            body.extend(line);
        }

        let idempotency_value = events[0].id.clone();
        let path = ObjectPath::from(key.clone());
        let attributes = Attributes::from_iter([
            (Attribute::Metadata(self.config.idempotency_metadata_key.clone().into()), AttributeValue::from(idempotency_value)),
            (Attribute::ContentType, AttributeValue::from("application/jsonl")),
        ]);
        self.store
            .put_opts(&path, PutPayload::from(body), PutOptions { attributes, ..Default::default() })
            .await
            .map_err(|e| AnalyticsError::SinkWriteFailed { sink_id: self.config.id.clone(), reason: e.to_string() })?;

        self.seen_keys.lock().expect("object store sink mutex poisoned").insert(key);
        Ok(WriteReport { sink_id: self.config.id.clone(), accepted: events.len(), error: None })
    }

    async fn close(&self) -> Result<(), AnalyticsError> {
        Ok(())
    }

    fn idempotency_key(&self, event: &AnalyticsEventV1) -> String {
        event.id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_strategy_truncates_at_fifty_chars() {
        let config = ObjectStoreSinkConfig::new("s3", "bucket");
        let sink = ObjectStoreSink {
            config,
            store: Arc::new(object_store::memory::InMemory::new()),
            seen_keys: Mutex::new(HashSet::new()),
        };
        let ids: Vec<String> = (0..5).map(|i| format!("{i:08}-0000-0000-0000-000000000000")).collect();
        let events: Vec<AnalyticsEventV1> = ids
            .iter()
            .map(|id| AnalyticsEventV1 {
                id: id.clone(),
                schema: analytics_types::event::SCHEMA_V1.to_string(),
                event_type: "t".to_string(),
                ts: "2026-07-31T00:00:00Z".to_string(),
                ingest_ts: "2026-07-31T00:00:00Z".to_string(),
                source: analytics_types::event::Source { product: "t".to_string(), version: "0".to_string() },
                run_id: "run".to_string(),
                actor: None,
                ctx: None,
                payload: None,
                hash_meta: None,
            })
            .collect();
        let key = sink.object_key(&events);
        let id_part = key.rsplit('-').collect::<Vec<_>>();
        let _ = id_part;
        assert!(key.starts_with("events/"));
        assert!(key.ends_with(".jsonl"));
    }

    fn sample_event(id: &str) -> AnalyticsEventV1 {
        AnalyticsEventV1 {
            id: id.to_string(),
            schema: analytics_types::event::SCHEMA_V1.to_string(),
            event_type: "t".to_string(),
            ts: "2026-07-31T00:00:00Z".to_string(),
            ingest_ts: "2026-07-31T00:00:00Z".to_string(),
            source: analytics_types::event::Source { product: "t".to_string(), version: "0".to_string() },
            run_id: "run".to_string(),
            actor: None,
            ctx: None,
            payload: None,
            hash_meta: None,
        }
    }

    #[tokio::test]
    async fn write_sets_idempotency_metadata_and_content_type() {
        let config = ObjectStoreSinkConfig::new("s3", "bucket");
        let metadata_key = config.idempotency_metadata_key.clone();
        let sink = ObjectStoreSink {
            config,
            store: Arc::new(object_store::memory::InMemory::new()),
            seen_keys: Mutex::new(HashSet::new()),
        };
        let events = vec![sample_event("11111111-0000-0000-0000-000000000000"), sample_event("22222222-0000-0000-0000-000000000000")];

        let report = sink.write(&events).await.unwrap();
        assert_eq!(report.accepted, 2);

        let key = sink.object_key(&events);
        let path = ObjectPath::from(key);
        let result = sink.store.get(&path).await.unwrap();
        let attrs = &result.attributes;
        assert_eq!(
            attrs.get(&Attribute::Metadata(metadata_key.into())),
            Some(&AttributeValue::from(events[0].id.clone()))
        );
        assert_eq!(attrs.get(&Attribute::ContentType), Some(&AttributeValue::from("application/jsonl")));
    }
}
