//! Retry policy shared by every sink adapter: bounded
//! exponential backoff with jitter, consulted around a fallible async
//! operation.

use std::time::Duration;

use rand::Rng;

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
    /// Max attempts such that the cumulative un-jittered delay stays
    /// bounded by `maxMs`.
    pub fn max_attempts(&self) -> u32 {
        let mut attempts = 1;
        let mut delay = self.initial_ms as f64;
        let mut total = 0.0;
        while total < self.max_ms as f64 && attempts < 64 {
            total += delay.min(self.max_ms as f64);
            delay *= self.factor;
            attempts += 1;
        }
        attempts
    }

    /// Delay before attempt `k` (1-indexed retry count), exponential in
    /// `k` with jitter applied via the supplied `[-1, 1]` roll.
    pub fn delay_for(&self, k: u32, jitter_roll: f64) -> Duration {
        let base = (self.initial_ms as f64) * self.factor.powi(k as i32 - 1);
        let capped = base.min(self.max_ms as f64);
        let jitter_amount = capped * self.jitter * jitter_roll;
        let with_jitter = (capped + jitter_amount).max(0.0).min(self.max_ms as f64);
        Duration::from_millis(with_jitter as u64)
    }

    pub fn delay_for_random(&self, k: u32) -> Duration {
        let roll = rand::thread_rng().gen_range(-1.0..1.0);
        self.delay_for(k, roll)
    }
}

/// Runs `op` up to `max_attempts()` times, sleeping between attempts per
/// `delay_for`. Returns the last error if every attempt fails.
pub async fn with_retry<T, E, F, Fut>(config: &RetryConfig, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let max_attempts = config.max_attempts();
    let mut last_err = None;
    for attempt in 1..=max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                last_err = Some(e);
                if attempt < max_attempts {
                    tokio::time::sleep(config.delay_for_random(attempt)).await;
                }
            }
        }
    }
    Err(last_err.expect("at least one attempt always runs"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_attempts_stays_bounded_by_max_ms() {
        let config = RetryConfig { initial_ms: 100, max_ms: 10_000, factor: 2.0, jitter: 0.0 };
        let attempts = config.max_attempts();
        assert!(attempts >= 1 && attempts < 20);
    }

    #[test]
    fn delay_is_never_negative_and_respects_cap() {
        let config = RetryConfig::default();
        let d = config.delay_for(10, -1.0);
        assert!(d.as_millis() <= config.max_ms as u128);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let config = RetryConfig { initial_ms: 1, max_ms: 5, factor: 2.0, jitter: 0.0 };
        let mut calls = 0;
        let result: Result<i32, &str> = with_retry(&config, || {
            calls += 1;
            let attempt = calls;
            async move { if attempt < 2 { Err("fail") } else { Ok(42) } }
        })
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls, 2);
    }
}
