//! Sample stage: thin wrapper handing the event off to `analytics_sampling`
//! and translating its verdict into the chain's drop/forward shape
//!.

use analytics_sampling::{SampleDecision, SamplingPolicy};
use analytics_types::AnalyticsEventV1;

pub struct Sampler {
    policy: SamplingPolicy,
}

impl Sampler {
    pub fn new(policy: SamplingPolicy) -> Self {
        Self { policy }
    }

    pub fn decide(&self, event: &AnalyticsEventV1, roll: f64) -> SampleDecision {
        self.policy.decide(&event.event_type, roll)
    }
}
