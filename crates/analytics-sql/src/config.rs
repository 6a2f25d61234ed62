//! Loads the embedded-SQL sink's connection settings from environment
//! variables, same `.env`-then-`std::env::var` pattern used throughout
//! this pipeline's configuration surface.

use std::env;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv();
});

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub path: String,
    pub min_connections: u32,
    pub max_connections: u32,
    pub partition_by_day: bool,
    pub retention_days: u32,
}

impl DbConfig {
    pub fn from_env(default_path: &str) -> Self {
        Lazy::force(&DOTENV_LOADED);
        let path = env::var("KB_ANALYTICS_SQLITE_PATH").unwrap_or_else(|_| default_path.to_string());
        let min_connections = env::var("KB_ANALYTICS_SQLITE_MIN_CONNECTIONS").ok().and_then(|v| v.parse().ok()).unwrap_or(1);
        let max_connections = env::var("KB_ANALYTICS_SQLITE_MAX_CONNECTIONS").ok().and_then(|v| v.parse().ok()).unwrap_or(4);
        let partition_by_day = env::var("KB_ANALYTICS_SQLITE_PARTITION_BY_DAY").ok().map(|v| v != "false").unwrap_or(true);
        let retention_days = env::var("KB_ANALYTICS_SQLITE_RETENTION_DAYS").ok().and_then(|v| v.parse().ok()).unwrap_or(30);
        Self { path, min_connections, max_connections, partition_by_day, retention_days }
    }
}

pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}
