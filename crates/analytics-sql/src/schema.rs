//! Diesel schema for the embedded-SQL sink. The
//! `events` table and every `events_YYYY_MM_DD` daily partition share this
//! shape; partition tables are created with raw SQL in `pool.rs` since
//! their names are dynamic and Diesel's `table!` macro needs a fixed name.

diesel::table! {
    events (id) {
        id -> Text,
        schema -> Text,
        #[sql_name = "type"]
        event_type -> Text,
        ts -> Text,
        #[sql_name = "ingestTs"]
        ingest_ts -> Text,
        source_product -> Text,
        source_version -> Text,
        #[sql_name = "runId"]
        run_id -> Text,
        actor_type -> Nullable<Text>,
        actor_id -> Nullable<Text>,
        actor_name -> Nullable<Text>,
        ctx_repo -> Nullable<Text>,
        ctx_branch -> Nullable<Text>,
        ctx_commit -> Nullable<Text>,
        ctx_workspace -> Nullable<Text>,
        payload -> Nullable<Text>,
        hash_meta_algo -> Nullable<Text>,
        hash_meta_salt_id -> Nullable<Text>,
        created_at -> Text,
    }
}

/// Column list shared by `events` and every daily partition, spelled out
/// once so `pool.rs`'s raw `CREATE TABLE` for partitions cannot drift from
/// this `table!` definition.
pub const EVENTS_COLUMNS_DDL: &str = r#"
    id TEXT PRIMARY KEY,
    schema TEXT NOT NULL,
    type TEXT NOT NULL,
    ts TEXT NOT NULL,
    ingestTs TEXT NOT NULL,
    source_product TEXT NOT NULL,
    source_version TEXT NOT NULL,
    runId TEXT NOT NULL,
    actor_type TEXT,
    actor_id TEXT,
    actor_name TEXT,
    ctx_repo TEXT,
    ctx_branch TEXT,
    ctx_commit TEXT,
    ctx_workspace TEXT,
    payload TEXT,
    hash_meta_algo TEXT,
    hash_meta_salt_id TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
"#;

pub const EVENTS_INDEX_COLUMNS: [&str; 4] = ["type", "ts", "runId", "created_at"];
