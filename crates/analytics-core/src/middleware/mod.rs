//! The middleware chain: strict order redact → hash-PII → sample → enrich
//!. Each stage takes ownership of an already-cloned
//! event and returns either a transformed event or a drop decision — the
//! caller's original event is never mutated.

mod enrich;
mod pii_hash;
mod redact;
mod sample;

pub use enrich::Enricher;
pub use pii_hash::{PiiHasher, PiiPath};
pub use redact::Redactor;
pub use sample::Sampler;

use analytics_types::AnalyticsEventV1;

/// Outcome of running one event through the full chain.
pub enum ChainOutcome {
    Forward(AnalyticsEventV1),
    Dropped { event_type: String, rate_applied: f64 },
}

pub struct MiddlewareChain {
    redactor: Redactor,
    pii_hasher: PiiHasher,
    sampler: Sampler,
    enricher: Enricher,
}

impl MiddlewareChain {
    pub fn new(redactor: Redactor, pii_hasher: PiiHasher, sampler: Sampler, enricher: Enricher) -> Self {
        Self { redactor, pii_hasher, sampler, enricher }
    }

    /// Runs one event through redact → hash-PII → sample → enrich, in that
    /// fixed order.
    pub fn run(&self, event: &AnalyticsEventV1, sample_roll: f64) -> ChainOutcome {
        let event = self.redactor.apply(event);
        let event = self.pii_hasher.apply(&event);

        let decision = self.sampler.decide(&event, sample_roll);
        if !decision.kept {
            return ChainOutcome::Dropped { event_type: event.event_type.clone(), rate_applied: decision.rate_applied };
        }

        let event = self.enricher.apply(&event);
        ChainOutcome::Forward(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics_sampling::{RedactPolicy, SamplingPolicy};
    use analytics_types::event::{Source, SCHEMA_V1};
    use std::collections::BTreeMap;
    use analytics_types::event::CtxValue;

    fn sample_event() -> AnalyticsEventV1 {
        let mut ctx = BTreeMap::new();
        ctx.insert("token".to_string(), CtxValue::String("sekrit".to_string()));
        AnalyticsEventV1 {
            id: "11111111-1111-1111-1111-111111111111".to_string(),
            schema: SCHEMA_V1.to_string(),
            event_type: "test.event".to_string(),
            ts: "2026-07-31T00:00:00Z".to_string(),
            ingest_ts: "2026-07-31T00:00:00Z".to_string(),
            source: Source { product: "test".to_string(), version: "0.1.0".to_string() },
            run_id: "run-1".to_string(),
            actor: None,
            ctx: Some(ctx),
            payload: None,
            hash_meta: None,
        }
    }

    #[test]
    fn chain_runs_in_fixed_order_and_does_not_mutate_input() {
        let original = sample_event();
        let chain = MiddlewareChain::new(
            Redactor::new(RedactPolicy::default()),
            PiiHasher::disabled(),
            Sampler::new(SamplingPolicy::default()),
            Enricher::new("test-cli/0.1.0".to_string(), "workspace".to_string(), None),
        );
        let outcome = chain.run(&original, 0.0);
        match outcome {
            ChainOutcome::Forward(out) => {
                assert_eq!(out.ctx.as_ref().unwrap().get("token"), Some(&CtxValue::String("****".to_string())));
                assert_eq!(original.ctx.as_ref().unwrap().get("token"), Some(&CtxValue::String("sekrit".to_string())));
            }
            ChainOutcome::Dropped { .. } => panic!("expected event to be forwarded"),
        }
    }

    #[test]
    fn zero_rate_drops_before_enrichment() {
        let mut policy = SamplingPolicy::default();
        policy.by_event.insert("test.event".to_string(), 0.0);
        let chain = MiddlewareChain::new(
            Redactor::new(RedactPolicy::default()),
            PiiHasher::disabled(),
            Sampler::new(policy),
            Enricher::new("test-cli/0.1.0".to_string(), "workspace".to_string(), None),
        );
        let outcome = chain.run(&sample_event(), 0.9);
        assert!(matches!(outcome, ChainOutcome::Dropped { .. }));
    }
}
