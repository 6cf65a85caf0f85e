//! Sorted recovery log files: on-disk format, a lazy range-seekable reader,
//! and a k-way merge across every file produced for a tablet's recovery.
//!
//! This crate owns the boundary between the `logfile` codec and the
//! `recovery` crate's playback phases. It never looks inside a
//! [`logfile::Mutation`] — only the key/value pair as a unit.

pub mod capabilities;
pub mod errors;
pub mod format;
pub mod merge;
pub mod reader;
pub mod resolved_log;
pub mod writer;

pub use capabilities::{CacheProvider, Capabilities, Crypto, FileLenCache, NoopCrypto};
pub use errors::RecoveryLogError;
pub use format::{read_footer, write_footer, Footer, FOOTER_BYTES, RECOVERY_LOG_MAGIC};
pub use merge::{DeduplicatingIterator, MergingRecoveryIterator, RecoveryEntries};
pub use reader::SortedLogReader;
pub use resolved_log::ResolvedSortedLog;
pub use writer::{write_sorted_file, RecoveryLogWriteError};
