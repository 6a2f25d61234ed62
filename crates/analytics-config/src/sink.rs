//! Dynamic per-sink configuration, reimplemented as a tagged sum instead of
//! runtime dispatch on a string discriminator.
//! `SinkConfig::type_tag` is the only place that still spells the
//! `fs|http|s3|sqlite` strings out, and `registry::build_sink` is the only
//! place that matches on them.

use crate::breaker::BreakerConfig;
use crate::retry::RetryConfig;

#[derive(Debug, Clone)]
pub struct FsSinkConfig {
    pub id: Option<String>,
    pub path: std::path::PathBuf,
    pub prefix: String,
    pub rotate_size: u64,
    pub retention_days: u32,
}

impl FsSinkConfig {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { id: None, path: path.into(), prefix: "events".to_string(), rotate_size: 10 * 1024 * 1024, retention_days: 30 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Post,
    Put,
}

#[derive(Debug, Clone)]
pub enum HttpAuth {
    Bearer(String),
    Basic { user: String, pass: String },
    ApiKey(String),
}

#[derive(Debug, Clone)]
pub struct HttpSinkConfig {
    pub id: Option<String>,
    pub url: String,
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub auth: Option<HttpAuth>,
    pub timeout_ms: u64,
    pub idempotency_header: String,
    pub retry: RetryConfig,
    pub breaker: BreakerConfig,
}

impl HttpSinkConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: None,
            url: url.into(),
            method: HttpMethod::Post,
            headers: Vec::new(),
            auth: None,
            timeout_ms: 5_000,
            idempotency_header: "Idempotency-Key".to_string(),
            retry: RetryConfig::default(),
            breaker: BreakerConfig::default(),
        }
    }
}

/// The object-storage key historically truncates an arbitrary mid-UUID
/// point: `Literal` preserves that behavior, `Hashed` is the configurable,
/// collision-resistant alternative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKeyStrategy {
    Literal,
    Hashed,
}

#[derive(Debug, Clone)]
pub struct ObjectSinkConfig {
    pub id: Option<String>,
    pub bucket: String,
    pub region: String,
    pub key_prefix: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub endpoint: Option<String>,
    pub idempotency_metadata_key: String,
    pub key_strategy: ObjectKeyStrategy,
}

impl ObjectSinkConfig {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            id: None,
            bucket: bucket.into(),
            region: "us-east-1".to_string(),
            key_prefix: "events/".to_string(),
            access_key_id: None,
            secret_access_key: None,
            endpoint: None,
            idempotency_metadata_key: "idempotency-key".to_string(),
            key_strategy: ObjectKeyStrategy::Literal,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SqliteSinkConfig {
    pub id: Option<String>,
    pub path: std::path::PathBuf,
    pub partition_by_day: bool,
    pub retention_days: u32,
}

impl SqliteSinkConfig {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { id: None, path: path.into(), partition_by_day: true, retention_days: 30 }
    }
}

#[derive(Debug, Clone)]
pub enum SinkConfig {
    Fs(FsSinkConfig),
    Http(HttpSinkConfig),
    S3(ObjectSinkConfig),
    Sqlite(SqliteSinkConfig),
}

impl SinkConfig {
    pub fn type_tag(&self) -> &'static str {
        match self {
            SinkConfig::Fs(_) => "fs",
            SinkConfig::Http(_) => "http",
            SinkConfig::S3(_) => "s3",
            SinkConfig::Sqlite(_) => "sqlite",
        }
    }

    /// Every sink gets an id; an absent explicit `id` falls back to its
    /// type tag, which is unique as long as a config does not register two
    /// sinks of the same type without distinct ids (validated at build time).
    pub fn id(&self) -> String {
        let explicit = match self {
            SinkConfig::Fs(c) => &c.id,
            SinkConfig::Http(c) => &c.id,
            SinkConfig::S3(c) => &c.id,
            SinkConfig::Sqlite(c) => &c.id,
        };
        explicit.clone().unwrap_or_else(|| self.type_tag().to_string())
    }
}
