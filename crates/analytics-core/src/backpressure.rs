//! Backpressure controller: derives an accept/drop decision from observed
//! queue depth.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;

use crate::errors::AnalyticsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Normal,
    High,
    Critical,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Normal => "normal",
            Level::High => "high",
            Level::Critical => "critical",
        }
    }
}

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
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.high >= self.critical {
            return Err(AnalyticsError::ConfigInvalid(format!(
                "backpressure.high ({}) must be < backpressure.critical ({})",
                self.high, self.critical
            )));
        }
        Ok(())
    }
}

pub struct BackpressureController {
    config: BackpressureConfig,
    drop_count: AtomicU64,
}

impl BackpressureController {
    pub fn new(config: BackpressureConfig) -> Result<Self, AnalyticsError> {
        config.validate()?;
        Ok(Self { config, drop_count: AtomicU64::new(0) })
    }

    fn level_for(&self, depth: u64) -> (Level, f64, bool) {
        if depth >= self.config.critical {
            (Level::Critical, self.config.sampling_critical, true)
        } else if depth >= self.config.high {
            (Level::High, self.config.sampling_high, false)
        } else {
            (Level::Normal, 1.0, false)
        }
    }

    pub fn level(&self, depth: u64) -> Level {
        self.level_for(depth).0
    }

    /// If paused, reject; else reject with probability
    /// `1 - sampling`; the `roll` is supplied by the caller so tests can
    /// exercise both branches deterministically.
    pub fn should_accept(&self, depth: u64, roll: f64) -> bool {
        let (_, sampling, should_pause) = self.level_for(depth);
        if should_pause {
            self.drop_count.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        if roll >= sampling {
            self.drop_count.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        true
    }

    pub fn should_accept_random(&self, depth: u64) -> bool {
        let roll: f64 = rand::thread_rng().gen_range(0.0..1.0);
        self.should_accept(depth, roll)
    }

    pub fn drop_count(&self) -> u64 {
        self.drop_count.load(Ordering::Relaxed)
    }
}
