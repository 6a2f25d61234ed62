//! `AnalyticsConfig`: the single resolved value the core pipeline is
//! handed at initialization. Assembled by `ConfigBuilder` applying, in
//! order, (1) hardcoded defaults, (2) environment variable overrides, (3)
//! caller-supplied overrides — in that precedence. Uses the same
//! `once_cell::Lazy` + `std::env::var` + `dotenvy::dotenv()` shape as
//! `analytics_sql::config`, rather than a layered config-file loader.

use std::env;
use std::path::PathBuf;

use dotenvy::dotenv;
use once_cell::sync::Lazy;
use thiserror::Error;

use crate::backpressure::BackpressureConfig;
use crate::buffer::BufferConfig;
use crate::middleware::MiddlewareConfig;
use crate::pii::PiiConfig;
use crate::retention::RetentionConfig;
use crate::sink::SinkConfig;

static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv();
});

/// Loads `.env` (once, process-wide) the first time any config is built.
/// Safe to call redundantly.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    pub enabled: bool,
    pub root: PathBuf,
    pub dedup_capacity: usize,
    pub buffer: BufferConfig,
    pub backpressure: BackpressureConfig,
    pub sinks: Vec<SinkConfig>,
    pub pii: PiiConfig,
    pub middleware: MiddlewareConfig,
    pub retention: RetentionConfig,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            root: PathBuf::from("./.analytics"),
            dedup_capacity: 10_000,
            buffer: BufferConfig::default(),
            backpressure: BackpressureConfig::default(),
            sinks: Vec::new(),
            pii: PiiConfig::default(),
            middleware: MiddlewareConfig::default(),
            retention: RetentionConfig::default(),
        }
    }
}

impl AnalyticsConfig {
    /// `high < critical` is a hard `ConfigInvalid` error at config time
    ///, plus the structural checks a resolved config must
    /// satisfy before anything is constructed from it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backpressure.high >= self.backpressure.critical {
            return Err(ConfigError::Invalid(format!(
                "backpressure.high ({}) must be < backpressure.critical ({})",
                self.backpressure.high, self.backpressure.critical
            )));
        }
        let mut seen_ids = std::collections::HashSet::new();
        for sink in &self.sinks {
            if !seen_ids.insert(sink.id()) {
                return Err(ConfigError::Invalid(format!("duplicate sink id \"{}\"", sink.id())));
            }
        }
        Ok(())
    }
}

/// Caller-supplied overrides: every field is optional, and any field left
/// `None` falls through to whatever the builder already resolved from
/// defaults-then-environment.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsConfigOverrides {
    pub enabled: Option<bool>,
    pub root: Option<PathBuf>,
    pub dedup_capacity: Option<usize>,
    pub buffer: Option<BufferConfig>,
    pub backpressure: Option<BackpressureConfig>,
    pub sinks: Option<Vec<SinkConfig>>,
    pub pii: Option<PiiConfig>,
    pub middleware: Option<MiddlewareConfig>,
    pub retention: Option<RetentionConfig>,
}

pub struct ConfigBuilder {
    config: AnalyticsConfig,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self { config: AnalyticsConfig::default() }
    }

    /// Applies the `KB_ANALYTICS_*` environment variables on top of the
    /// hardcoded defaults. Unset variables leave the current value untouched.
    pub fn apply_env(mut self) -> Self {
        init_dotenv();
        let c = &mut self.config;

        if let Ok(v) = env::var("KB_ANALYTICS_ENABLED") {
            c.enabled = parse_bool(&v, c.enabled);
        }
        if let Some(v) = env_u64("KB_ANALYTICS_BUFFER_SEGMENT_BYTES") {
            c.buffer.segment_bytes = v;
        }
        if let Some(v) = env_u64("KB_ANALYTICS_BUFFER_SEGMENT_MAX_AGE_MS") {
            c.buffer.segment_max_age_ms = v;
        }
        if let Some(v) = env_u64("KB_ANALYTICS_BACKPRESSURE_HIGH") {
            c.backpressure.high = v;
        }
        if let Some(v) = env_u64("KB_ANALYTICS_BACKPRESSURE_CRITICAL") {
            c.backpressure.critical = v;
        }
        if let Ok(v) = env::var("KB_ANALYTICS_PII_ENABLED") {
            c.pii.hash.enabled = parse_bool(&v, c.pii.hash.enabled);
        }
        if let Ok(v) = env::var("KB_ANALYTICS_PII_SALT_ID") {
            c.pii.hash.salt_id = Some(v);
        }
        // `KB_ANALYTICS_SALT` / `KB_ANALYTICS_PEPPER` are read directly by
        // the pipeline at middleware-construction time, not stored here —
        // the salt/pepper are secret material, not config to be cloned
        // around or logged.
        self
    }

    /// Caller-supplied overrides win over everything applied so far
    ///.
    pub fn apply_overrides(mut self, overrides: AnalyticsConfigOverrides) -> Self {
        let c = &mut self.config;
        if let Some(v) = overrides.enabled {
            c.enabled = v;
        }
        if let Some(v) = overrides.root {
            c.root = v;
        }
        if let Some(v) = overrides.dedup_capacity {
            c.dedup_capacity = v;
        }
        if let Some(v) = overrides.buffer {
            c.buffer = v;
        }
        if let Some(v) = overrides.backpressure {
            c.backpressure = v;
        }
        if let Some(v) = overrides.sinks {
            c.sinks = v;
        }
        if let Some(v) = overrides.pii {
            c.pii = v;
        }
        if let Some(v) = overrides.middleware {
            c.middleware = v;
        }
        if let Some(v) = overrides.retention {
            c.retention = v;
        }
        self
    }

    pub fn build(self) -> Result<AnalyticsConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

fn parse_bool(v: &str, default: bool) -> bool {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        let config = ConfigBuilder::new().build().unwrap();
        assert!(config.enabled);
    }

    #[test]
    fn rejects_inverted_backpressure_thresholds() {
        let overrides = AnalyticsConfigOverrides {
            backpressure: Some(BackpressureConfig { high: 100, critical: 50, sampling_high: 0.5, sampling_critical: 0.1 }),
            ..Default::default()
        };
        let result = ConfigBuilder::new().apply_overrides(overrides).build();
        assert!(result.is_err());
    }

    #[test]
    fn overrides_win_over_defaults() {
        let overrides = AnalyticsConfigOverrides { enabled: Some(false), ..Default::default() };
        let config = ConfigBuilder::new().apply_overrides(overrides).build().unwrap();
        assert!(!config.enabled);
    }

    #[test]
    fn rejects_duplicate_sink_ids() {
        let overrides = AnalyticsConfigOverrides {
            sinks: Some(vec![
                SinkConfig::Fs(crate::sink::FsSinkConfig::new("/tmp/a")),
                SinkConfig::Fs(crate::sink::FsSinkConfig::new("/tmp/b")),
            ]),
            ..Default::default()
        };
        let result = ConfigBuilder::new().apply_overrides(overrides).build();
        assert!(result.is_err());
    }
}
