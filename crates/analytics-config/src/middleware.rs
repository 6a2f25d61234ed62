//! `middleware: {redact:{keys}, sampling:{default, byEvent}, enrich:{git,host,cli,workspace}}`
//!.

use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct RedactConfig {
    pub keys: Vec<String>,
}

impl Default for RedactConfig {
    fn default() -> Self {
        Self { keys: analytics_sampling::default_redaction_keys().into_iter().collect() }
    }
}

impl RedactConfig {
    pub fn to_policy(&self) -> analytics_sampling::RedactPolicy {
        analytics_sampling::RedactPolicy::new(self.keys.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SamplingConfig {
    pub default_rate: f64,
    pub by_event: BTreeMap<String, f64>,
}

impl SamplingConfig {
    pub fn to_policy(&self) -> analytics_sampling::SamplingPolicy {
        let default_rate = if self.default_rate == 0.0 && self.by_event.is_empty() { 1.0 } else { self.default_rate };
        analytics_sampling::SamplingPolicy { default_rate, by_event: self.by_event.clone() }
    }
}

#[derive(Debug, Clone)]
pub struct EnrichConfig {
    pub git: bool,
    pub host: bool,
    pub cli: bool,
    pub workspace: bool,
    pub cli_version: String,
    pub repo_root: Option<std::path::PathBuf>,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            git: true,
            host: true,
            cli: true,
            workspace: true,
            cli_version: env!("CARGO_PKG_VERSION").to_string(),
            repo_root: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MiddlewareConfig {
    pub redact: RedactConfig,
    pub sampling: SamplingConfig,
    pub enrich: EnrichConfig,
}
