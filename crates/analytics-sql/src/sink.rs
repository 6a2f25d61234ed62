//! Embedded-SQL sink adapter: writes a batch inside
//! one transaction with `INSERT OR IGNORE`, which is what makes replay of
//! an already-stored event id a no-op rather than a duplicate row.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;

use analytics_core::sink::{SinkAdapter, WriteReport};
use analytics_core::AnalyticsError;
use analytics_types::event::{ActorType, CtxValue};
use analytics_types::AnalyticsEventV1;

use crate::pool::{build_pool, ensure_daily_partition, SqlitePool};
use crate::schema::events;

#[derive(Debug, Clone)]
pub struct SqlSinkConfig {
    pub id: String,
    pub path: PathBuf,
    pub partition_by_day: bool,
    pub retention_days: u32,
}

impl SqlSinkConfig {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self { id: id.into(), path: path.into(), partition_by_day: true, retention_days: 30 }
    }
}

#[derive(Insertable)]
#[diesel(table_name = events)]
struct NewEventRow {
    id: String,
    schema: String,
    event_type: String,
    ts: String,
    ingest_ts: String,
    source_product: String,
    source_version: String,
    run_id: String,
    actor_type: Option<String>,
    actor_id: Option<String>,
    actor_name: Option<String>,
    ctx_repo: Option<String>,
    ctx_branch: Option<String>,
    ctx_commit: Option<String>,
    ctx_workspace: Option<String>,
    payload: Option<String>,
    hash_meta_algo: Option<String>,
    hash_meta_salt_id: Option<String>,
    created_at: String,
}

fn ctx_string(event: &AnalyticsEventV1, key: &str) -> Option<String> {
    match event.ctx_get(key) {
        Some(CtxValue::String(s)) => Some(s.clone()),
        _ => None,
    }
}

fn to_row(event: &AnalyticsEventV1) -> NewEventRow {
    NewEventRow {
        id: event.id.clone(),
        schema: event.schema.clone(),
        event_type: event.event_type.clone(),
        ts: event.ts.clone(),
        ingest_ts: event.ingest_ts.clone(),
        source_product: event.source.product.clone(),
        source_version: event.source.version.clone(),
        run_id: event.run_id.clone(),
        actor_type: event.actor.as_ref().map(|a| match a.actor_type {
            ActorType::User => "user".to_string(),
            ActorType::Agent => "agent".to_string(),
            ActorType::Ci => "ci".to_string(),
        }),
        actor_id: event.actor.as_ref().and_then(|a| a.id.clone()),
        actor_name: event.actor.as_ref().and_then(|a| a.name.clone()),
        ctx_repo: ctx_string(event, "repo"),
        ctx_branch: ctx_string(event, "branch"),
        ctx_commit: ctx_string(event, "commit"),
        ctx_workspace: ctx_string(event, "workspace"),
        payload: event.payload.as_ref().map(|p| p.to_string()),
        hash_meta_algo: event.hash_meta.as_ref().map(|h| h.algo.clone()),
        hash_meta_salt_id: event.hash_meta.as_ref().map(|h| h.salt_id.clone()),
        created_at: Utc::now().to_rfc3339(),
    }
}

pub struct SqlSink {
    config: SqlSinkConfig,
    pool: SqlitePool,
}

impl SqlSink {
    pub fn new(config: SqlSinkConfig) -> Result<Self, AnalyticsError> {
        let pool = build_pool(&config.path, 1, 4)
            .map_err(|e| AnalyticsError::SinkInitFailed { sink_id: config.id.clone(), reason: e.to_string() })?;
        Ok(Self { config, pool })
    }

    /// Drops partitions older than `retentionDays` and deletes expired rows
    /// from the main `events` table.
    pub fn apply_retention(&self) -> Result<(), AnalyticsError> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| AnalyticsError::SinkWriteFailed { sink_id: self.config.id.clone(), reason: e.to_string() })?;
        let cutoff = Utc::now() - chrono::Duration::days(self.config.retention_days as i64);

        if self.config.partition_by_day {
            let tables: Vec<String> = diesel::sql_query("SELECT name FROM sqlite_master WHERE type='table' AND name LIKE 'events_%'")
                .load::<PartitionName>(&mut conn)
                .map_err(|e| AnalyticsError::SinkWriteFailed { sink_id: self.config.id.clone(), reason: e.to_string() })?
                .into_iter()
                .map(|p| p.name)
                .collect();
            for table in tables {
                if let Some(date_str) = table.strip_prefix("events_") {
                    if let Ok(date) = chrono::NaiveDate::parse_from_str(date_str, "%Y_%m_%d") {
                        if date < cutoff.date_naive() {
                            let drop_ddl = format!("DROP TABLE IF EXISTS {table}");
                            conn.batch_execute(&drop_ddl).map_err(|e| AnalyticsError::SinkWriteFailed {
                                sink_id: self.config.id.clone(),
                                reason: e.to_string(),
                            })?;
                        }
                    }
                }
            }
        }

        let cutoff_str = cutoff.to_rfc3339();
        diesel::delete(events::table.filter(events::created_at.lt(cutoff_str)))
            .execute(&mut conn)
            .map_err(|e| AnalyticsError::SinkWriteFailed { sink_id: self.config.id.clone(), reason: e.to_string() })?;
        Ok(())
    }
}

#[derive(diesel::QueryableByName)]
struct PartitionName {
    #[diesel(sql_type = diesel::sql_types::Text)]
    name: String,
}

#[async_trait]
impl SinkAdapter for SqlSink {
    fn id(&self) -> &str {
        &self.config.id
    }

    async fn init(&self) -> Result<(), AnalyticsError> {
        Ok(())
    }

    async fn write(&self, events_batch: &[AnalyticsEventV1]) -> Result<WriteReport, AnalyticsError> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| AnalyticsError::SinkWriteFailed { sink_id: self.config.id.clone(), reason: e.to_string() })?;

        let partition_table = if self.config.partition_by_day {
            let today = Utc::now().format("%Y-%m-%d").to_string();
            Some(
                ensure_daily_partition(&mut conn, &today)
                    .map_err(|e| AnalyticsError::SinkWriteFailed { sink_id: self.config.id.clone(), reason: e.to_string() })?,
            )
        } else {
            None
        };

        let rows: Vec<NewEventRow> = events_batch.iter().map(to_row).collect();
        let accepted = conn
            .transaction::<usize, diesel::result::Error, _>(|tx_conn| {
                let accepted = diesel::insert_or_ignore_into(events::table).values(&rows).execute(tx_conn)?;
                if let Some(table) = &partition_table {
                    for row in &rows {
                        insert_row_into_partition(tx_conn, table, row)?;
                    }
                }
                Ok(accepted)
            })
            .map_err(|e| AnalyticsError::SinkWriteFailed { sink_id: self.config.id.clone(), reason: e.to_string() })?;

        Ok(WriteReport { sink_id: self.config.id.clone(), accepted, error: None })
    }

    async fn close(&self) -> Result<(), AnalyticsError> {
        Ok(())
    }

    fn retention_sweep(&self) -> Result<(), AnalyticsError> {
        self.apply_retention()
    }
}

/// Inserts one row into a daily partition table. Diesel's `table!` macro
/// can't target a dynamic table name, so this binds the same columns as
/// `events` by hand via `sql_query`.
fn insert_row_into_partition(
    conn: &mut diesel::sqlite::SqliteConnection,
    table: &str,
    row: &NewEventRow,
) -> diesel::result::QueryResult<usize> {
    use diesel::sql_types::{Nullable, Text};

    let sql = format!(
        "INSERT OR IGNORE INTO {table} \
         (id, schema, type, ts, ingestTs, source_product, source_version, runId, \
          actor_type, actor_id, actor_name, ctx_repo, ctx_branch, ctx_commit, ctx_workspace, \
          payload, hash_meta_algo, hash_meta_salt_id, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    );
    diesel::sql_query(sql)
        .bind::<Text, _>(&row.id)
        .bind::<Text, _>(&row.schema)
        .bind::<Text, _>(&row.event_type)
        .bind::<Text, _>(&row.ts)
        .bind::<Text, _>(&row.ingest_ts)
        .bind::<Text, _>(&row.source_product)
        .bind::<Text, _>(&row.source_version)
        .bind::<Text, _>(&row.run_id)
        .bind::<Nullable<Text>, _>(&row.actor_type)
        .bind::<Nullable<Text>, _>(&row.actor_id)
        .bind::<Nullable<Text>, _>(&row.actor_name)
        .bind::<Nullable<Text>, _>(&row.ctx_repo)
        .bind::<Nullable<Text>, _>(&row.ctx_branch)
        .bind::<Nullable<Text>, _>(&row.ctx_commit)
        .bind::<Nullable<Text>, _>(&row.ctx_workspace)
        .bind::<Nullable<Text>, _>(&row.payload)
        .bind::<Nullable<Text>, _>(&row.hash_meta_algo)
        .bind::<Nullable<Text>, _>(&row.hash_meta_salt_id)
        .bind::<Text, _>(&row.created_at)
        .execute(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics_types::event::{Source, SCHEMA_V1};

    fn sample_event(id: &str) -> AnalyticsEventV1 {
        AnalyticsEventV1 {
            id: id.to_string(),
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

    #[tokio::test]
    async fn insert_or_ignore_deduplicates_same_id() {
        let dir = tempfile::tempdir().unwrap();
        let sink = SqlSink::new(SqlSinkConfig::new("sqlite", dir.path().join("events.sqlite3"))).unwrap();
        let event = sample_event("row-1");
        let first = sink.write(&[event.clone()]).await.unwrap();
        assert_eq!(first.accepted, 1);
        let second = sink.write(&[event]).await.unwrap();
        assert_eq!(second.accepted, 0);
    }

    #[derive(diesel::QueryableByName)]
    struct CountRow {
        #[diesel(sql_type = diesel::sql_types::BigInt)]
        count: i64,
    }

    #[tokio::test]
    async fn partitioned_write_lands_in_the_daily_partition_table() {
        let dir = tempfile::tempdir().unwrap();
        let sink = SqlSink::new(SqlSinkConfig::new("sqlite", dir.path().join("events.sqlite3"))).unwrap();
        let report = sink.write(&[sample_event("row-partition-1")]).await.unwrap();
        assert_eq!(report.accepted, 1);

        let table = format!("events_{}", Utc::now().format("%Y_%m_%d"));
        let mut conn = sink.pool.get().unwrap();
        let rows: Vec<CountRow> = diesel::sql_query(format!("SELECT COUNT(*) as count FROM {table}")).load(&mut conn).unwrap();
        assert_eq!(rows[0].count, 1);
    }

    #[tokio::test]
    async fn apply_retention_drops_partitions_older_than_the_window() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SqlSinkConfig::new("sqlite", dir.path().join("events.sqlite3"));
        config.retention_days = 30;
        let sink = SqlSink::new(config).unwrap();
        sink.write(&[sample_event("row-recent")]).await.unwrap();

        {
            let mut conn = sink.pool.get().unwrap();
            crate::pool::ensure_daily_partition(&mut conn, "2020-01-01").unwrap();
        }

        sink.apply_retention().unwrap();

        let mut conn = sink.pool.get().unwrap();
        let remaining: Vec<PartitionName> =
            diesel::sql_query("SELECT name FROM sqlite_master WHERE type='table' AND name LIKE 'events_%'")
                .load(&mut conn)
                .unwrap();
        assert!(remaining.iter().all(|p| p.name != "events_2020_01_01"));
    }
}
