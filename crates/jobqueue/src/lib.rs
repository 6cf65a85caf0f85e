//! Per-resource-group compaction job queues: bounded by weight, ordered by
//! priority, with generation-based staleness eviction driven by full
//! metadata scans and asynchronous consumer wakeups.
//!
//! Shares the storage engine's concurrency model with the `recovery` crate
//! (§1) but is otherwise independent of it — this crate never touches a
//! recovery log.

pub mod job;
pub mod queue;
pub mod set;

pub use job::{
    level_of, CompactionJob, CompactionKind, DataLevel, FileCountWeigher, ResourceGroupId,
    Weigher, DATA_LEVEL_COUNT,
};
pub use set::{CompactionJobQueueSet, DEFAULT_MAX_WEIGHT};
