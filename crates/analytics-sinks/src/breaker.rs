//! Three-state circuit breaker. The
//! `open -> half-open` transition is performed by a single method,
//! `current_state`, so a reader and a writer can never observe it
//! differently — avoiding a split-brain race between the two.

use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half-open",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BreakerConfig {
    pub failures: u32,
    pub window: Duration,
    pub half_open_every: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self { failures: 5, window: Duration::from_millis(60_000), half_open_every: Duration::from_millis(30_000) }
    }
}

struct Raw {
    state: BreakerState,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
    half_open_attempts: u32,
}

pub struct CircuitBreaker {
    config: BreakerConfig,
    raw: Mutex<Raw>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            raw: Mutex::new(Raw { state: BreakerState::Closed, consecutive_failures: 0, last_failure_at: None, half_open_attempts: 0 }),
        }
    }

    /// The single place `open -> half-open` happens, applied on every read
    /// and every mutation so both paths see the same state.
    fn current_state(raw: &mut Raw, half_open_every: Duration) -> BreakerState {
        if raw.state == BreakerState::Open {
            if let Some(last_failure) = raw.last_failure_at {
                if last_failure.elapsed() >= half_open_every {
                    raw.state = BreakerState::HalfOpen;
                }
            }
        }
        raw.state
    }

    pub fn state(&self) -> BreakerState {
        let mut raw = self.raw.lock().expect("breaker mutex poisoned");
        Self::current_state(&mut raw, self.config.half_open_every)
    }

    /// `true` if a caller should skip the transport entirely and fail
    /// fast, without spending a retry attempt.
    pub fn should_fail_fast(&self) -> bool {
        self.state() == BreakerState::Open
    }

    pub fn record_success(&self) {
        let mut raw = self.raw.lock().expect("breaker mutex poisoned");
        Self::current_state(&mut raw, self.config.half_open_every);
        raw.state = BreakerState::Closed;
        raw.consecutive_failures = 0;
        raw.half_open_attempts = 0;
    }

    pub fn record_failure(&self) {
        let mut raw = self.raw.lock().expect("breaker mutex poisoned");
        let state = Self::current_state(&mut raw, self.config.half_open_every);
        match state {
            BreakerState::HalfOpen => {
                raw.state = BreakerState::Open;
                raw.last_failure_at = Some(Instant::now());
                raw.half_open_attempts += 1;
            }
            _ => {
                raw.consecutive_failures += 1;
                if raw.consecutive_failures >= self.config.failures {
                    raw.state = BreakerState::Open;
                    raw.last_failure_at = Some(Instant::now());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold_consecutive_failures() {
        let breaker = CircuitBreaker::new(BreakerConfig { failures: 2, ..BreakerConfig::default() });
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
    }

    #[test]
    fn success_resets_failure_counter() {
        let breaker = CircuitBreaker::new(BreakerConfig { failures: 2, ..BreakerConfig::default() });
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn transitions_to_half_open_after_cooldown() {
        let breaker = CircuitBreaker::new(BreakerConfig {
            failures: 1,
            half_open_every: Duration::from_millis(10),
            ..BreakerConfig::default()
        });
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
    }

    #[test]
    fn half_open_failure_reopens_and_counts_attempt() {
        let breaker = CircuitBreaker::new(BreakerConfig {
            failures: 1,
            half_open_every: Duration::from_millis(10),
            ..BreakerConfig::default()
        });
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
    }
}
