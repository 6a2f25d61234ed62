//! `buffer: {segmentBytes, segmentMaxAgeMs, fsyncOnRotate}`.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BufferConfig {
    pub segment_bytes: u64,
    pub segment_max_age_ms: u64,
    pub fsync_on_rotate: bool,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self { segment_bytes: 1024 * 1024, segment_max_age_ms: 60_000, fsync_on_rotate: true }
    }
}

impl BufferConfig {
    pub fn to_core(&self, root: std::path::PathBuf, dedup_capacity: usize) -> analytics_core::WalBufferConfig {
        analytics_core::WalBufferConfig {
            root,
            segment_bytes: self.segment_bytes,
            segment_max_age: Duration::from_millis(self.segment_max_age_ms),
            fsync_on_rotate: self.fsync_on_rotate,
            dedup_capacity,
        }
    }
}
