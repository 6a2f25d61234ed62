//! On-disk shape of one WAL segment: a JSONL data file and an append-only
//! sidecar index.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use analytics_types::AnalyticsEventV1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    #[serde(rename = "eventId")]
    pub event_id: String,
    pub offset: u64,
    pub size: u64,
}

/// Metadata about the currently-open (or a closed) segment, suitable for
/// handing to read-side collaborators.
#[derive(Debug, Clone)]
pub struct SegmentInfo {
    pub data_path: PathBuf,
    pub index_path: PathBuf,
    pub opened_at: DateTime<Utc>,
    pub first_event_ts: Option<DateTime<Utc>>,
    pub event_count: u64,
    pub byte_size: u64,
}

pub(crate) struct OpenSegment {
    pub info: SegmentInfo,
    data_file: File,
    index_file: File,
}

impl OpenSegment {
    pub(crate) fn create(root: &Path, epoch_ms: i64) -> std::io::Result<Self> {
        fs::create_dir_all(root)?;
        let data_path = root.join(format!("segment-{epoch_ms}.jsonl"));
        let index_path = root.join(format!("segment-{epoch_ms}.idx"));
        let data_file = OpenOptions::new().create(true).append(true).open(&data_path)?;
        let index_file = OpenOptions::new().create(true).append(true).open(&index_path)?;
        Ok(Self {
            info: SegmentInfo {
                data_path,
                index_path,
                opened_at: Utc::now(),
                first_event_ts: None,
                event_count: 0,
                byte_size: 0,
            },
            data_file,
            index_file,
        })
    }

    /// Appends one event line plus its index entry. The data write and the
    /// index write are two separate syscalls; if the process dies between
    /// them, `readSegment` must tolerate an index that is a strict prefix
    /// of the data.
    pub(crate) fn append(&mut self, event: &AnalyticsEventV1) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(event).expect("event always serializes");
        line.push(b'\n');
        let offset = self.info.byte_size;
        let size = line.len() as u64;
        self.data_file.write_all(&line)?;
        self.data_file.flush()?;

        let entry = IndexEntry { event_id: event.id.clone(), offset, size };
        let mut idx_line = serde_json::to_vec(&entry).expect("index entry always serializes");
        idx_line.push(b'\n');
        self.index_file.write_all(&idx_line)?;
        self.index_file.flush()?;

        self.info.byte_size += size;
        self.info.event_count += 1;
        if self.info.first_event_ts.is_none() {
            self.info.first_event_ts = Some(Utc::now());
        }
        Ok(())
    }

    pub(crate) fn close(&mut self, fsync: bool) -> std::io::Result<()> {
        if fsync {
            self.data_file.sync_all()?;
            self.index_file.sync_all()?;
        }
        Ok(())
    }
}

/// Reads every event from a closed (or still-open) segment's data file,
/// clamping to however many lines the index actually covers — tolerating
/// an index shorter than the data after a partial-write crash.
pub fn read_segment(data_path: &Path, index_path: &Path) -> std::io::Result<Vec<AnalyticsEventV1>> {
    let index_entries = read_index(index_path)?;
    let file = File::open(data_path)?;
    let reader = BufReader::new(file);
    let mut events = Vec::with_capacity(index_entries.len());
    for (i, line) in reader.lines().enumerate() {
        if i >= index_entries.len() {
            break;
        }
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if let Ok(event) = serde_json::from_str::<AnalyticsEventV1>(&line) {
            events.push(event);
        }
    }
    Ok(events)
}

pub fn read_index(index_path: &Path) -> std::io::Result<Vec<IndexEntry>> {
    if !index_path.exists() {
        return Ok(Vec::new());
    }
    let file = File::open(index_path)?;
    let reader = BufReader::new(file);
    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if let Ok(entry) = serde_json::from_str::<IndexEntry>(&line) {
            entries.push(entry);
        }
    }
    Ok(entries)
}

pub fn list_segments(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    if !root.exists() {
        return Ok(Vec::new());
    }
    let mut paths: Vec<PathBuf> = fs::read_dir(root)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("jsonl"))
        .collect();
    paths.sort();
    Ok(paths)
}
