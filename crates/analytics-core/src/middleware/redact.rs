//! Redact stage: recursively walks `payload`, `ctx`, `actor` and blanks any
//! object key whose lowercase name is in the configured redaction set
//!.

use analytics_sampling::RedactPolicy;
use analytics_types::event::CtxValue;
use analytics_types::AnalyticsEventV1;
use serde_json::Value;

pub struct Redactor {
    policy: RedactPolicy,
}

impl Redactor {
    pub fn new(policy: RedactPolicy) -> Self {
        Self { policy }
    }

    pub fn apply(&self, event: &AnalyticsEventV1) -> AnalyticsEventV1 {
        let mut out = event.clone();

        if let Some(ctx) = out.ctx.as_mut() {
            for (k, v) in ctx.iter_mut() {
                if self.policy.should_redact(k) {
                    *v = CtxValue::String("****".to_string());
                }
            }
        }

        if let Some(payload) = out.payload.as_mut() {
            self.redact_value(payload);
        }

        if let Some(actor) = out.actor.take() {
            let mut value = serde_json::to_value(&actor).expect("actor always serializes");
            self.redact_value(&mut value);
            out.actor = serde_json::from_value(value).ok();
        }

        out
    }

    /// Walks a JSON value, redacting matching object keys in place. Does
    /// not descend into a subtree whose key was just redacted.
    fn redact_value(&self, value: &mut Value) {
        match value {
            Value::Object(map) => {
                for (k, v) in map.iter_mut() {
                    if self.policy.should_redact(k) {
                        *v = Value::String("****".to_string());
                    } else {
                        self.redact_value(v);
                    }
                }
            }
            Value::Array(items) => {
                for item in items.iter_mut() {
                    self.redact_value(item);
                }
            }
            _ => {}
        }
    }
}
