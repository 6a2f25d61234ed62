//! analytics-sampling: deterministic, auditable policies for the `redact`
//! and `sample` stages of the middleware chain.
//!
//! Each policy produces not just a verdict but a `rationale` — a small
//! structured record of *why* that verdict was reached — so callers can
//! attach it to metrics or logs without re-deriving it. `params_hash` lets
//! two pipeline instances confirm they are running identical policy
//! configuration without comparing the full config struct.

use std::collections::{BTreeMap, HashSet};

use analytics_types::hashing::{hash_str, to_canonical_json};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Default redaction key set, compared case-insensitively.
pub fn default_redaction_keys() -> HashSet<String> {
    [
        "token",
        "apiKey",
        "authorization",
        "password",
        "secret",
        "privateKey",
        "accessToken",
        "refreshToken",
    ]
    .iter()
    .map(|s| s.to_lowercase())
    .collect()
}

/// Decides which object keys get redacted. Keys are matched
/// case-insensitively, matching on the lowercase name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactPolicy {
    keys: HashSet<String>,
}

impl Default for RedactPolicy {
    fn default() -> Self {
        Self { keys: default_redaction_keys() }
    }
}

impl RedactPolicy {
    pub fn new(keys: impl IntoIterator<Item = String>) -> Self {
        Self { keys: keys.into_iter().map(|k| k.to_lowercase()).collect() }
    }

    pub fn should_redact(&self, key: &str) -> bool {
        self.keys.contains(&key.to_lowercase())
    }

    pub fn params_hash(&self) -> String {
        let mut sorted: Vec<&String> = self.keys.iter().collect();
        sorted.sort();
        hash_str(&to_canonical_json(&json!({ "keys": sorted })))
    }
}

/// Per-event-type sampling rate map plus a default rate.
/// A rate of `0` always drops, `1` always keeps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingPolicy {
    pub default_rate: f64,
    pub by_event: BTreeMap<String, f64>,
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self { default_rate: 1.0, by_event: BTreeMap::new() }
    }
}

/// Outcome of applying a `SamplingPolicy` to one event, with the rationale
/// needed to explain the decision after the fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleDecision {
    pub kept: bool,
    pub rate_applied: f64,
    pub policy_id: &'static str,
}

impl SamplingPolicy {
    pub fn rate_for(&self, event_type: &str) -> f64 {
        self.by_event.get(event_type).copied().unwrap_or(self.default_rate).clamp(0.0, 1.0)
    }

    /// Decides deterministically given an externally supplied `roll` in
    /// `[0, 1)` — callers in production draw `roll` from an RNG; tests pass
    /// fixed values to exercise both branches deterministically.
    pub fn decide(&self, event_type: &str, roll: f64) -> SampleDecision {
        let rate = self.rate_for(event_type);
        let kept = if rate >= 1.0 {
            true
        } else if rate <= 0.0 {
            false
        } else {
            roll < rate
        };
        SampleDecision { kept, rate_applied: rate, policy_id: "rate_map_v1" }
    }

    pub fn decide_random(&self, event_type: &str) -> SampleDecision {
        use rand::Rng;
        let roll: f64 = rand::thread_rng().gen_range(0.0..1.0);
        self.decide(event_type, roll)
    }

    pub fn params_hash(&self) -> String {
        let v = json!({ "default_rate": self.default_rate, "by_event": self.by_event });
        hash_str(&to_canonical_json(&v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rate_always_drops() {
        let mut p = SamplingPolicy::default();
        p.by_event.insert("noisy.event".into(), 0.0);
        let d = p.decide("noisy.event", 0.0);
        assert!(!d.kept);
    }

    #[test]
    fn rate_one_always_keeps() {
        let p = SamplingPolicy { default_rate: 1.0, by_event: BTreeMap::new() };
        let d = p.decide("anything", 0.9999);
        assert!(d.kept);
    }

    #[test]
    fn decision_is_a_pure_function_of_the_roll() {
        let mut p = SamplingPolicy::default();
        p.by_event.insert("t".into(), 0.5);
        assert!(p.decide("t", 0.1).kept);
        assert!(!p.decide("t", 0.9).kept);
    }

    #[test]
    fn redact_policy_matches_case_insensitively() {
        let p = RedactPolicy::default();
        assert!(p.should_redact("Authorization"));
        assert!(p.should_redact("apiKey"));
        assert!(!p.should_redact("username"));
    }

    #[test]
    fn params_hash_is_stable_across_instances() {
        let a = RedactPolicy::default();
        let b = RedactPolicy::default();
        assert_eq!(a.params_hash(), b.params_hash());
    }
}
