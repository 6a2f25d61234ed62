//! `retention: {wal:{days}, out:{days}}`. `wal` bounds how
//! long closed WAL segments are kept by the retention/compaction external
//! collaborator; `out` is the
//! default each sink's own `retentionDays` falls back to when a sink
//! config does not override it.

#[derive(Debug, Clone)]
pub struct RetentionConfig {
    pub wal_days: u32,
    pub out_days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self { wal_days: 30, out_days: 30 }
    }
}
