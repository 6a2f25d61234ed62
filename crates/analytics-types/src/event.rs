//! `AnalyticsEventV1`: the `kb.v1` canonical event shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Schema literal every event must carry. Non-goal: schema evolution beyond
/// this shape.
pub const SCHEMA_V1: &str = "kb.v1";

/// Scalar JSON value allowed inside `ctx`. Deliberately narrower than
/// `serde_json::Value`: `ctx` may not carry nested objects or arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CtxValue {
    String(String),
    Number(serde_json::Number),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorType {
    User,
    Agent,
    Ci,
}

impl ActorType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(ActorType::User),
            "agent" => Some(ActorType::Agent),
            "ci" => Some(ActorType::Ci),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    #[serde(rename = "type")]
    pub actor_type: ActorType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub product: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashMeta {
    pub algo: String,
    #[serde(rename = "saltId")]
    pub salt_id: String,
}

impl HashMeta {
    pub const ALGO_HMAC_SHA256: &'static str = "hmac-sha256";

    pub fn hmac_sha256(salt_id: impl Into<String>) -> Self {
        Self { algo: Self::ALGO_HMAC_SHA256.to_string(), salt_id: salt_id.into() }
    }
}

/// The canonical analytics event. Optional fields are `None` rather than
/// absent-vs-null ambiguity at the Rust type level (the wire/JSON
/// representation omits `None` fields entirely via `skip_serializing_if`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEventV1 {
    pub id: String,
    pub schema: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub ts: String,
    #[serde(rename = "ingestTs")]
    pub ingest_ts: String,
    pub source: Source,
    #[serde(rename = "runId")]
    pub run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<Actor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ctx: Option<BTreeMap<String, CtxValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(rename = "hashMeta", skip_serializing_if = "Option::is_none")]
    pub hash_meta: Option<HashMeta>,
}

impl AnalyticsEventV1 {
    /// Inserts a ctx value only if the key is not already present — the
    /// enrich stage never overwrites existing `ctx` fields.
    pub fn ctx_entry_or_insert(&mut self, key: &str, value: CtxValue) {
        let ctx = self.ctx.get_or_insert_with(BTreeMap::new);
        ctx.entry(key.to_string()).or_insert(value);
    }

    pub fn ctx_get(&self, key: &str) -> Option<&CtxValue> {
        self.ctx.as_ref().and_then(|c| c.get(key))
    }
}

/// Well-known `ctx` keys populated by enrichment.
pub mod well_known_ctx_keys {
    pub const REPO: &str = "repo";
    pub const BRANCH: &str = "branch";
    pub const COMMIT: &str = "commit";
    pub const WORKSPACE: &str = "workspace";
    pub const HOSTNAME: &str = "hostname";
    pub const CLI_VERSION: &str = "cliVersion";
}
