//! `backpressure: {high, critical, sampling:{high, critical}}`.

#[derive(Debug, Clone)]
pub struct BackpressureConfig {
    pub high: u64,
    pub critical: u64,
    pub sampling_high: f64,
    pub sampling_critical: f64,
}

impl Default for BackpressureConfig {
    fn default() -> Self {
        Self { high: 20_000, critical: 50_000, sampling_high: 0.5, sampling_critical: 0.1 }
    }
}

impl BackpressureConfig {
    pub fn to_core(&self) -> analytics_core::BackpressureConfig {
        analytics_core::BackpressureConfig {
            high: self.high,
            critical: self.critical,
            sampling_high: self.sampling_high,
            sampling_critical: self.sampling_critical,
        }
    }
}
