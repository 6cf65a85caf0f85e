//! K-way merge over every file across a set of [`ResolvedSortedLog`]
//! directories, plus the [`DeduplicatingIterator`] adapter.
//!
//! Mirrors the teacher crate's SSTable merge iterator: a pull-based min-heap
//! of reader cursors, each cursor caching one peeked entry; advancing the
//! output advances the head cursor and re-sifts. Here the heap is keyed by
//! the full [`LogFileKey`] total order instead of a single byte key, and
//! de-duplication is a separate pass rather than a seq-based tiebreak, since
//! `seq` already participates in the ordering key itself.

use logfile::{KeyRange, LogFileKey, LogFileValue};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::capabilities::Capabilities;
use crate::errors::RecoveryLogError;
use crate::reader::SortedLogReader;
use crate::resolved_log::ResolvedSortedLog;

/// Common shape of anything that yields recovery log entries in order, so
/// [`DeduplicatingIterator`] can wrap either a [`MergingRecoveryIterator`] or
/// (in tests) a single [`SortedLogReader`] directly.
pub trait RecoveryEntries {
    fn next_entry(&mut self) -> Result<Option<(LogFileKey, LogFileValue)>, RecoveryLogError>;
}

impl RecoveryEntries for SortedLogReader {
    fn next_entry(&mut self) -> Result<Option<(LogFileKey, LogFileValue)>, RecoveryLogError> {
        self.next()
    }
}

struct HeapEntry {
    key: LogFileKey,
    value: LogFileValue,
    /// Index into `MergingRecoveryIterator::readers`.
    source: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.source == other.source
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the smallest key surfaces
        // first. Tie-break on source index for a deterministic, stable
        // result when two sources offer equal keys.
        other.key.cmp(&self.key).then_with(|| other.source.cmp(&self.source))
    }
}

/// Merges every file across a set of recovery log directories into one
/// ordered stream over `[start, end]`. Keys are monotonically non-decreasing
/// but a key may repeat across multiple entries — see
/// [`DeduplicatingIterator`].
pub struct MergingRecoveryIterator {
    readers: Vec<SortedLogReader>,
    heap: BinaryHeap<HeapEntry>,
}

impl MergingRecoveryIterator {
    /// Constructs the merge over `dirs`.
    ///
    /// If `validate_first_key` is set, each directory with at least one
    /// child must have `OPEN` as its very first decoded entry — callers
    /// should set this only for the outermost scan of a recovery, per
    /// §4.3's "exactly once per recovery" contract; repeat scans against the
    /// same directories should pass `false`.
    ///
    /// Every file across every directory is opened and seeked to `range`;
    /// a file yielding nothing in range is closed immediately rather than
    /// retained. If any step fails partway through, already-opened readers
    /// are released via `Drop` before the error propagates — no explicit
    /// cleanup call is needed by the caller.
    pub fn new(
        dirs: &[ResolvedSortedLog],
        range: Option<KeyRange>,
        validate_first_key: bool,
        caps: &Capabilities,
    ) -> Result<Self, RecoveryLogError> {
        if validate_first_key {
            for dir in dirs {
                let Some(first_file) = dir.children().first() else {
                    continue;
                };
                let mut probe = SortedLogReader::open(first_file, caps)?;
                let first = probe.next()?;
                probe.close();
                match first {
                    Some((key, _)) if key.event == logfile::Event::Open => {}
                    _ => {
                        return Err(RecoveryLogError::MissingOpenEvent {
                            dir: dir.dir().display().to_string(),
                        })
                    }
                }
            }
        }

        let mut readers = Vec::new();
        let mut heap = BinaryHeap::new();

        for dir in dirs {
            for file in dir.children() {
                let mut reader = SortedLogReader::open(file, caps)?;
                reader.seek(range.as_ref())?;
                match reader.next()? {
                    Some((key, value)) => {
                        let source = readers.len();
                        readers.push(reader);
                        heap.push(HeapEntry { key, value, source });
                    }
                    None => reader.close(),
                }
            }
        }

        Ok(Self { readers, heap })
    }

    /// Returns the next entry in sorted order, or `None` once every source is
    /// exhausted.
    pub fn next(&mut self) -> Result<Option<(LogFileKey, LogFileValue)>, RecoveryLogError> {
        let Some(top) = self.heap.pop() else {
            return Ok(None);
        };

        match self.readers[top.source].next()? {
            Some((key, value)) => {
                self.heap.push(HeapEntry {
                    key,
                    value,
                    source: top.source,
                });
            }
            None => self.readers[top.source].close(),
        }

        Ok(Some((top.key, top.value)))
    }

    /// Releases every underlying reader exactly once. Also called on drop.
    pub fn close(&mut self) {
        for r in &mut self.readers {
            r.close();
        }
    }
}

impl RecoveryEntries for MergingRecoveryIterator {
    fn next_entry(&mut self) -> Result<Option<(LogFileKey, LogFileValue)>, RecoveryLogError> {
        self.next()
    }
}

impl Drop for MergingRecoveryIterator {
    fn drop(&mut self) {
        self.close();
    }
}

/// Collapses any run of entries sharing the same key down to the first one
/// in the run, per §4.3. Wraps any [`RecoveryEntries`] source.
pub struct DeduplicatingIterator<I: RecoveryEntries> {
    inner: I,
    pending: Option<(LogFileKey, LogFileValue)>,
}

impl<I: RecoveryEntries> DeduplicatingIterator<I> {
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            pending: None,
        }
    }
}

impl<I: RecoveryEntries> RecoveryEntries for DeduplicatingIterator<I> {
    fn next_entry(&mut self) -> Result<Option<(LogFileKey, LogFileValue)>, RecoveryLogError> {
        let first = match self.pending.take() {
            Some(entry) => entry,
            None => match self.inner.next_entry()? {
                Some(entry) => entry,
                None => return Ok(None),
            },
        };

        loop {
            match self.inner.next_entry()? {
                Some(next) if next.0 == first.0 => continue,
                Some(next) => {
                    self.pending = Some(next);
                    break;
                }
                None => break,
            }
        }

        Ok(Some(first))
    }
}
