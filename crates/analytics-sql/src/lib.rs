//! Embedded-SQL sink: a SQLite-backed `SinkAdapter` with optional daily
//! partitioning and retention.

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod schema;
pub mod sink;

pub use config::{init_dotenv, DbConfig};
pub use error::PersistenceError;
pub use pool::{build_pool, ensure_daily_partition, SqlitePool};
pub use sink::{SqlSink, SqlSinkConfig};
