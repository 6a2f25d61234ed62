//! `pii: {hash:{enabled, saltEnv, saltId, rotateAfterDays}, fields:[path]}`
//!. Salt material itself is read from the environment
//! variable named by `salt_env`, never stored in this struct, so config
//! values stay safe to log.

#[derive(Debug, Clone)]
pub struct PiiHashConfig {
    pub enabled: bool,
    pub salt_env: String,
    pub salt_id: Option<String>,
    pub rotate_after_days: i64,
}

impl Default for PiiHashConfig {
    fn default() -> Self {
        Self { enabled: false, salt_env: "KB_ANALYTICS_SALT".to_string(), salt_id: None, rotate_after_days: 90 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PiiConfig {
    pub hash: PiiHashConfig,
    pub fields: Vec<String>,
}

impl PiiConfig {
    /// Resolves the configured `fields` paths (`"actor.id"`, `"ctx.<key>"`)
    /// into the middleware chain's `PiiPath` enum, skipping any path this
    /// implementation does not recognize.
    pub fn resolved_paths(&self) -> Vec<analytics_core::PiiPath> {
        self.fields
            .iter()
            .filter_map(|path| match path.as_str() {
                "actor.id" => Some(analytics_core::PiiPath::ActorId),
                other => other.strip_prefix("ctx.").map(|key| analytics_core::PiiPath::CtxKey(leak_key(key))),
            })
            .collect()
    }
}

/// `PiiPath::CtxKey` takes a `&'static str`; the well-known ctx keys this
/// crate actually routes through here are a small fixed set, so leaking is
/// a one-time, bounded cost per process, not a growth path.
fn leak_key(key: &str) -> &'static str {
    match key {
        "repo" => analytics_types::event::well_known_ctx_keys::REPO,
        "branch" => analytics_types::event::well_known_ctx_keys::BRANCH,
        "commit" => analytics_types::event::well_known_ctx_keys::COMMIT,
        "workspace" => analytics_types::event::well_known_ctx_keys::WORKSPACE,
        "hostname" => analytics_types::event::well_known_ctx_keys::HOSTNAME,
        "cliVersion" => analytics_types::event::well_known_ctx_keys::CLI_VERSION,
        other => Box::leak(other.to_string().into_boxed_str()),
    }
}
