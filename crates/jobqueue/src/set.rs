//! [`CompactionJobQueueSet`]: one bounded priority queue per resource group,
//! with generation-based staleness eviction driven by full metadata scans.
//!
//! Per §9's "concurrent-map compute atomicity" strategy, per-group state is
//! guarded by `DashMap`'s own per-shard locking rather than a single global
//! mutex: `entry(group)` acquires exclusive access to just that group's
//! queue for the duration of an add/evict/poll, so two producers touching
//! different groups never contend.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use logfile::KeyExtent;

use crate::job::{level_of, CompactionJob, DataLevel, FileCountWeigher, ResourceGroupId, Weigher, DATA_LEVEL_COUNT};
use crate::queue::GroupQueue;

/// Default per-queue weight bound, used until [`CompactionJobQueueSet::reset_max_size`]
/// is called. Implementation-chosen per §6 ("default: implementation-chosen;
/// must be positive").
pub const DEFAULT_MAX_WEIGHT: u64 = 1_000;

/// The set of per-resource-group compaction job queues.
///
/// One instance is shared across the metadata-scan producer threads and the
/// worker consumer threads of a single tablet server (§5).
pub struct CompactionJobQueueSet {
    groups: DashMap<ResourceGroupId, GroupQueue>,
    generations: [AtomicU64; DATA_LEVEL_COUNT],
    max_weight: AtomicU64,
    weigher: Box<dyn Weigher>,
}

impl Default for CompactionJobQueueSet {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WEIGHT, Box::new(FileCountWeigher))
    }
}

impl CompactionJobQueueSet {
    #[must_use]
    pub fn new(max_weight: u64, weigher: Box<dyn Weigher>) -> Self {
        Self {
            groups: DashMap::new(),
            generations: Default::default(),
            max_weight: AtomicU64::new(max_weight),
            weigher,
        }
    }

    /// Increments `level`'s generation counter. Every job `add`ed for this
    /// level from now until the matching [`end_full_scan`](Self::end_full_scan)
    /// is tagged with the new generation; anything still tagged with an
    /// older one when the scan ends is stale.
    pub fn begin_full_scan(&self, level: DataLevel) -> u64 {
        self.generations[level as usize].fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Routes each of `jobs` to the queue for its resource group, tagging it
    /// with the current generation for `level_of(extent.table_id)`.
    pub fn add(&self, extent: &KeyExtent, jobs: Vec<CompactionJob>) {
        let level = level_of(extent.table_id);
        let generation = self.generations[level as usize].load(Ordering::SeqCst);
        let max_weight = self.max_weight.load(Ordering::SeqCst);

        for job in jobs {
            let weight = self.weigher.weigh(&job);
            let mut entry = self.groups.entry(job.resource_group.clone()).or_default();
            entry.add(job, level, generation, weight, max_weight);
        }
    }

    /// Removes every entry tagged with a generation strictly less than
    /// `level`'s current generation, across every group.
    pub fn end_full_scan(&self, level: DataLevel) {
        let current = self.generations[level as usize].load(Ordering::SeqCst);
        for mut entry in self.groups.iter_mut() {
            entry.evict_stale(level, current);
        }
    }

    /// Non-blocking dequeue of the highest-priority job for `group`, or
    /// `None` if empty.
    pub fn poll(&self, group: &ResourceGroupId) -> Option<CompactionJob> {
        self.groups.get_mut(group).and_then(|mut q| q.poll())
    }

    /// Returns a job for `group` as soon as one is available: immediately if
    /// one is already queued, otherwise when the next `add` supplies one.
    /// Never blocks the calling thread.
    pub async fn get_async(&self, group: &ResourceGroupId) -> CompactionJob {
        let (tx, rx) = tokio::sync::oneshot::channel();
        {
            let mut entry = self.groups.entry(group.clone()).or_default();
            entry.poll_or_register(tx);
        }
        // The sender is only ever dropped after a successful send (queue.rs
        // always re-queues a job it failed to hand to a waiter), so this
        // channel is cancel-safe: an abandoned `get_async` just drops `rx`,
        // and `add` silently treats a dead waiter as "try the next one".
        rx.await.expect("GroupQueue never drops a waiter without sending")
    }

    /// Applies `max_weight` as the new bound for every existing queue,
    /// evicting lowest-priority entries from any queue that is now over the
    /// new bound.
    pub fn reset_max_size(&self, max_weight: u64) {
        self.max_weight.store(max_weight, Ordering::SeqCst);
        for mut entry in self.groups.iter_mut() {
            entry.resize(max_weight);
        }
    }

    /// Number of distinct resource groups with at least one ever-touched
    /// queue (including currently-empty ones).
    #[must_use]
    pub fn get_queue_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of jobs currently queued for `group`.
    #[must_use]
    pub fn get_queued_job_count(&self, group: &ResourceGroupId) -> usize {
        self.groups.get(group).map_or(0, |q| q.len())
    }

    /// Number of jobs ever rejected from `group`'s queue for exceeding the
    /// weight bound at insertion time.
    #[must_use]
    pub fn get_rejected_job_count(&self, group: &ResourceGroupId) -> u64 {
        self.groups.get(group).map_or(0, |q| q.rejected())
    }
}
