//! Circuit-breaker knobs as plain config, converted into
//! `analytics_sinks::BreakerConfig` at sink-construction time.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BreakerConfig {
    pub failures: u32,
    pub window_ms: u64,
    pub half_open_every_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self { failures: 5, window_ms: 60_000, half_open_every_ms: 30_000 }
    }
}

impl BreakerConfig {
    pub fn to_sink_config(&self) -> analytics_sinks::BreakerConfig {
        analytics_sinks::BreakerConfig {
            failures: self.failures,
            window: Duration::from_millis(self.window_ms),
            half_open_every: Duration::from_millis(self.half_open_every_ms),
        }
    }
}
