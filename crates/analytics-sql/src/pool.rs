//! r2d2-pooled SQLite connections, WAL journal mode, and daily partition
//! table creation.

use std::path::Path;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{self, ConnectionManager};
use diesel::sqlite::SqliteConnection;

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;
use crate::schema::EVENTS_COLUMNS_DDL;

pub type SqlitePool = r2d2::Pool<ConnectionManager<SqliteConnection>>;

pub fn build_pool(path: &Path, min_size: u32, max_size: u32) -> Result<SqlitePool, PersistenceError> {
    let validated_min = min_size.max(1);
    let validated_max = max_size.max(validated_min);
    let manager = ConnectionManager::<SqliteConnection>::new(path.to_string_lossy());
    let pool = r2d2::Pool::builder()
        .min_idle(Some(validated_min))
        .max_size(validated_max)
        .build(manager)
        .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;

    let mut conn = pool.get().map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
    run_pending_migrations(&mut conn)?;
    Ok(pool)
}

/// Creates `events_YYYY_MM_DD` with the same columns and indices as
/// `events`, if it does not already exist.
pub fn ensure_daily_partition(conn: &mut SqliteConnection, date: &str) -> Result<String, PersistenceError> {
    let table_name = format!("events_{}", date.replace('-', "_"));
    let ddl = format!("CREATE TABLE IF NOT EXISTS {table_name} ({EVENTS_COLUMNS_DDL})");
    conn.batch_execute(&ddl).map_err(|e| PersistenceError::Unknown(format!("create partition {table_name}: {e}")))?;
    for column in crate::schema::EVENTS_INDEX_COLUMNS {
        let index_ddl = format!("CREATE INDEX IF NOT EXISTS idx_{table_name}_{column} ON {table_name} ({column})");
        conn.batch_execute(&index_ddl)
            .map_err(|e| PersistenceError::Unknown(format!("create partition index {table_name}.{column}: {e}")))?;
    }
    Ok(table_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_pool_runs_migrations_and_allows_partition_creation() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("events.sqlite3");
        let pool = build_pool(&db_path, 1, 2).unwrap();
        let mut conn = pool.get().unwrap();
        let table_name = ensure_daily_partition(&mut conn, "2026-07-31").unwrap();
        assert_eq!(table_name, "events_2026_07_31");
    }
}
