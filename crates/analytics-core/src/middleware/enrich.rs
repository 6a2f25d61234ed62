//! Enrich stage: fills well-known `ctx` keys without ever overwriting a
//! value the caller (or an earlier stage) already set.
//! Git and hostname lookups happen once at construction; `apply` only ever
//! reads the cached values.

use std::path::Path;
use std::process::Command;

use analytics_types::event::{well_known_ctx_keys, CtxValue};
use analytics_types::AnalyticsEventV1;

#[derive(Debug, Clone, Default)]
struct GitInfo {
    repo: Option<String>,
    branch: Option<String>,
    commit: Option<String>,
}

pub struct Enricher {
    cli_version: String,
    workspace: String,
    hostname: String,
    git: GitInfo,
}

impl Enricher {
    /// `repo_root`: pass `Some(path)` when the caller knows it is running
    /// inside a git repository; `None` skips the git lookup entirely.
    pub fn new(cli_version: String, workspace: String, repo_root: Option<&Path>) -> Self {
        let git = repo_root.map(Self::lookup_git).unwrap_or_default();
        Self { cli_version, workspace, hostname: Self::lookup_hostname(), git }
    }

    fn lookup_hostname() -> String {
        if let Ok(h) = std::env::var("HOSTNAME") {
            if !h.is_empty() {
                return h;
            }
        }
        Command::new("hostname")
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn lookup_git(root: &Path) -> GitInfo {
        let run = |args: &[&str]| -> Option<String> {
            Command::new("git")
                .args(args)
                .current_dir(root)
                .output()
                .ok()
                .filter(|o| o.status.success())
                .and_then(|o| String::from_utf8(o.stdout).ok())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        GitInfo {
            repo: run(&["rev-parse", "--show-toplevel"]),
            branch: run(&["rev-parse", "--abbrev-ref", "HEAD"]),
            commit: run(&["rev-parse", "HEAD"]),
        }
    }

    pub fn apply(&self, event: &AnalyticsEventV1) -> AnalyticsEventV1 {
        let mut out = event.clone();

        out.ctx_entry_or_insert(well_known_ctx_keys::HOSTNAME, CtxValue::String(self.hostname.clone()));
        out.ctx_entry_or_insert(well_known_ctx_keys::WORKSPACE, CtxValue::String(self.workspace.clone()));
        out.ctx_entry_or_insert(well_known_ctx_keys::CLI_VERSION, CtxValue::String(self.cli_version.clone()));

        if let Some(repo) = &self.git.repo {
            out.ctx_entry_or_insert(well_known_ctx_keys::REPO, CtxValue::String(repo.clone()));
        }
        if let Some(branch) = &self.git.branch {
            out.ctx_entry_or_insert(well_known_ctx_keys::BRANCH, CtxValue::String(branch.clone()));
        }
        if let Some(commit) = &self.git.commit {
            out.ctx_entry_or_insert(well_known_ctx_keys::COMMIT, CtxValue::String(commit.clone()));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics_types::event::{Source, SCHEMA_V1};
    use std::collections::BTreeMap;

    fn sample_event() -> AnalyticsEventV1 {
        AnalyticsEventV1 {
            id: "11111111-1111-1111-1111-111111111111".to_string(),
            schema: SCHEMA_V1.to_string(),
            event_type: "test.event".to_string(),
            ts: "2026-07-31T00:00:00Z".to_string(),
            ingest_ts: "2026-07-31T00:00:00Z".to_string(),
            source: Source { product: "test".to_string(), version: "0.1.0".to_string() },
            run_id: "run-1".to_string(),
            actor: None,
            ctx: None,
            payload: None,
            hash_meta: None,
        }
    }

    #[test]
    fn fills_well_known_keys_without_git() {
        let enricher = Enricher::new("cli/1.0".to_string(), "/tmp/ws".to_string(), None);
        let out = enricher.apply(&sample_event());
        let ctx = out.ctx.unwrap();
        assert_eq!(ctx.get(well_known_ctx_keys::CLI_VERSION), Some(&CtxValue::String("cli/1.0".to_string())));
        assert_eq!(ctx.get(well_known_ctx_keys::WORKSPACE), Some(&CtxValue::String("/tmp/ws".to_string())));
        assert!(ctx.get(well_known_ctx_keys::REPO).is_none());
    }

    #[test]
    fn never_overwrites_existing_ctx_fields() {
        let enricher = Enricher::new("cli/1.0".to_string(), "/tmp/ws".to_string(), None);
        let mut event = sample_event();
        let mut ctx = BTreeMap::new();
        ctx.insert(well_known_ctx_keys::WORKSPACE.to_string(), CtxValue::String("caller-set".to_string()));
        event.ctx = Some(ctx);
        let out = enricher.apply(&event);
        assert_eq!(
            out.ctx.unwrap().get(well_known_ctx_keys::WORKSPACE),
            Some(&CtxValue::String("caller-set".to_string()))
        );
    }
}
