//! HTTP sink: POSTs a batch as one JSON array body,
//! retrying through `RetryConfig` and guarded by a `CircuitBreaker`.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;

use analytics_core::sink::{SinkAdapter, WriteReport};
use analytics_core::AnalyticsError;
use analytics_types::AnalyticsEventV1;

use crate::breaker::{BreakerConfig, CircuitBreaker};
use crate::retry::{with_retry, RetryConfig};

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
    pub id: String,
    pub url: String,
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub auth: Option<HttpAuth>,
    pub timeout: Duration,
    pub idempotency_header: String,
    pub retry: RetryConfig,
    pub breaker: BreakerConfig,
}

impl HttpSinkConfig {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            method: HttpMethod::Post,
            headers: Vec::new(),
            auth: None,
            timeout: Duration::from_millis(5_000),
            idempotency_header: "Idempotency-Key".to_string(),
            retry: RetryConfig::default(),
            breaker: BreakerConfig::default(),
        }
    }
}

pub struct HttpSink {
    config: HttpSinkConfig,
    client: Client,
    breaker: CircuitBreaker,
}

impl HttpSink {
    pub fn new(config: HttpSinkConfig) -> Self {
        let client = Client::builder().timeout(config.timeout).build().expect("reqwest client config is static and valid");
        let breaker = CircuitBreaker::new(config.breaker.clone());
        Self { config, client, breaker }
    }

    fn idempotency_value(events: &[AnalyticsEventV1]) -> String {
        events.first().map(|e| e.id.clone()).unwrap_or_else(|| format!("batch_{}", chrono::Utc::now().timestamp_millis()))
    }

    async fn send_once(&self, events: &[AnalyticsEventV1]) -> Result<(), AnalyticsError> {
        let mut builder = match self.config.method {
            HttpMethod::Post => self.client.post(&self.config.url),
            HttpMethod::Put => self.client.put(&self.config.url),
        };
        builder = builder.header("Content-Type", "application/json");
        builder = builder.header(self.config.idempotency_header.as_str(), Self::idempotency_value(events));
        for (k, v) in &self.config.headers {
            builder = builder.header(k.as_str(), v.as_str());
        }
        builder = match &self.config.auth {
            Some(HttpAuth::Bearer(token)) => builder.header("Authorization", format!("Bearer {token}")),
            Some(HttpAuth::Basic { user, pass }) => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{user}:{pass}"));
                builder.header("Authorization", format!("Basic {encoded}"))
            }
            Some(HttpAuth::ApiKey(key)) => builder.header("X-API-Key", key.clone()),
            None => builder,
        };

        let response = builder
            .json(events)
            .send()
            .await
            .map_err(|e| AnalyticsError::SinkWriteFailed { sink_id: self.config.id.clone(), reason: e.to_string() })?;

        let status = response.status();
        if status.as_u16() >= 200 && status.as_u16() < 300 {
            Ok(())
        } else {
            Err(AnalyticsError::SinkWriteFailed { sink_id: self.config.id.clone(), reason: format!("HTTP status {status}") })
        }
    }
}

#[async_trait]
impl SinkAdapter for HttpSink {
    fn id(&self) -> &str {
        &self.config.id
    }

    async fn init(&self) -> Result<(), AnalyticsError> {
        Ok(())
    }

    async fn write(&self, events: &[AnalyticsEventV1]) -> Result<WriteReport, AnalyticsError> {
        if self.breaker.should_fail_fast() {
            return Err(AnalyticsError::CircuitBreakerOpen { sink_id: self.config.id.clone() });
        }

        let result = with_retry(&self.config.retry, || self.send_once(events)).await;

        match result {
            Ok(()) => {
                self.breaker.record_success();
                Ok(WriteReport { sink_id: self.config.id.clone(), accepted: events.len(), error: None })
            }
            Err(e) => {
                self.breaker.record_failure();
                Err(e)
            }
        }
    }

    async fn close(&self) -> Result<(), AnalyticsError> {
        Ok(())
    }

    fn breaker_state(&self) -> Option<&'static str> {
        Some(self.breaker.state().as_str())
    }
}
