//! PII hash stage: replaces configured JSON paths with an
//! `HMAC-SHA256(salt, salt ":" [pepper ":"] value)` hex digest and stamps
//! `hashMeta`.

use chrono::{Datelike, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use analytics_types::AnalyticsEventV1;

type HmacSha256 = Hmac<Sha256>;

/// One `ctx.<key>` or `actor.id` style path this stage will hash when the
/// value is present and non-empty. Only these two root surfaces are
/// supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PiiPath {
    ActorId,
    CtxKey(&'static str),
}

pub struct PiiHasher {
    enabled: bool,
    salt: Option<String>,
    pepper: Option<String>,
    salt_id: Option<String>,
    rotate_after_days: i64,
    paths: Vec<PiiPath>,
}

impl PiiHasher {
    pub fn disabled() -> Self {
        Self { enabled: false, salt: None, pepper: None, salt_id: None, rotate_after_days: 90, paths: Vec::new() }
    }

    pub fn new(salt: Option<String>, pepper: Option<String>, salt_id: Option<String>, rotate_after_days: i64, paths: Vec<PiiPath>) -> Self {
        Self { enabled: true, salt, pepper, salt_id, rotate_after_days, paths }
    }

    /// `true` when the embedded `saltId` month is older than
    /// `rotateAfterDays` and a caller should mint a new salt.
    pub fn rotation_due(&self, salt_id: &str) -> bool {
        let Some(month_str) = salt_id.strip_prefix("default-") else { return false };
        let Ok(naive) = chrono::NaiveDate::parse_from_str(&format!("{month_str}-01"), "%Y-%m-%d") else { return false };
        let age_days = (Utc::now().date_naive() - naive).num_days();
        age_days > self.rotate_after_days
    }

    fn effective_salt_id(&self) -> String {
        self.salt_id.clone().unwrap_or_else(|| {
            let now = Utc::now();
            format!("default-{:04}-{:02}", now.year(), now.month())
        })
    }

    fn digest(&self, salt: &str, value: &str) -> String {
        let message = match &self.pepper {
            Some(pepper) => format!("{salt}:{pepper}:{value}"),
            None => format!("{salt}:{value}"),
        };
        let mut mac = HmacSha256::new_from_slice(salt.as_bytes()).expect("HMAC accepts any key length");
        mac.update(message.as_bytes());
        let bytes = mac.finalize().into_bytes();
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    pub fn apply(&self, event: &AnalyticsEventV1) -> AnalyticsEventV1 {
        let mut out = event.clone();
        let Some(salt) = self.salt.as_ref().filter(|_| self.enabled) else { return out };

        let mut hashed_any = false;

        for path in &self.paths {
            match path {
                PiiPath::ActorId => {
                    if let Some(actor) = out.actor.as_mut() {
                        if let Some(id) = actor.id.as_ref().filter(|v| !v.is_empty()) {
                            actor.id = Some(self.digest(salt, id));
                            hashed_any = true;
                        }
                    }
                }
                PiiPath::CtxKey(key) => {
                    if let Some(ctx) = out.ctx.as_mut() {
                        if let Some(analytics_types::event::CtxValue::String(value)) = ctx.get(*key).cloned() {
                            if !value.is_empty() {
                                ctx.insert(key.to_string(), analytics_types::event::CtxValue::String(self.digest(salt, &value)));
                                hashed_any = true;
                            }
                        }
                    }
                }
            }
        }

        if hashed_any {
            out.hash_meta = Some(analytics_types::event::HashMeta::hmac_sha256(self.effective_salt_id()));
        }

        out
    }
}
