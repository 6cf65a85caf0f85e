use std::path::PathBuf;

use logfile::{Event, KeyExtent, LogFileKey, LogFileValue, Mutation, MutationKind};
use recoverylog::{write_sorted_file, ResolvedSortedLog};
use tempfile::TempDir;

pub fn open(tablet_id: i64) -> (LogFileKey, LogFileValue) {
    (LogFileKey::new(Event::Open, tablet_id, 0), LogFileValue::default())
}

pub fn define_tablet(tablet_id: i64, seq: u64, extent: KeyExtent) -> (LogFileKey, LogFileValue) {
    (
        LogFileKey::define_tablet(tablet_id, seq, extent),
        LogFileValue::default(),
    )
}

pub fn compaction_start(tablet_id: i64, seq: u64, filename: &str) -> (LogFileKey, LogFileValue) {
    (
        LogFileKey::compaction_start(tablet_id, seq, filename),
        LogFileValue::default(),
    )
}

pub fn compaction_finish(tablet_id: i64, seq: u64) -> (LogFileKey, LogFileValue) {
    (LogFileKey::new(Event::CompactionFinish, tablet_id, seq), LogFileValue::default())
}

pub fn mutation(tablet_id: i64, seq: u64, row: &str) -> (LogFileKey, LogFileValue) {
    let key = LogFileKey::new(Event::Mutation, tablet_id, seq);
    let value = LogFileValue {
        mutations: vec![Mutation {
            row: row.as_bytes().to_vec(),
            column: b"cf:cq".to_vec(),
            kind: MutationKind::Put(row.as_bytes().to_vec()),
        }],
    };
    (key, value)
}

pub fn extent_a() -> KeyExtent {
    KeyExtent::new(7, None, None)
}

pub fn extent_b() -> KeyExtent {
    KeyExtent::new(8, None, None)
}

/// Writes `entries` (in any order) as a single sorted file inside a fresh
/// directory, sorted into the total order `write_sorted_file` requires. The
/// `TempDir` handle must outlive the returned `ResolvedSortedLog`.
pub fn build_dir(mut entries: Vec<(LogFileKey, LogFileValue)>) -> (TempDir, ResolvedSortedLog) {
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    let dir = tempfile::tempdir().unwrap();
    let path: PathBuf = dir.path().join("0001.rlog");
    write_sorted_file(&path, &entries).unwrap();
    let resolved = ResolvedSortedLog::from_dir(dir.path()).unwrap();
    (dir, resolved)
}
