//! Retry policy knobs as plain config, converted into
//! `analytics_sinks::RetryConfig` at sink-construction time.

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub initial_ms: u64,
    pub max_ms: u64,
    pub factor: f64,
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { initial_ms: 100, max_ms: 10_000, factor: 2.0, jitter: 0.1 }
    }
}

impl RetryConfig {
    pub fn to_sink_config(&self) -> analytics_sinks::RetryConfig {
        analytics_sinks::RetryConfig { initial_ms: self.initial_ms, max_ms: self.max_ms, factor: self.factor, jitter: self.jitter }
    }
}
