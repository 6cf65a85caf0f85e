use std::cmp::Reverse;
use std::collections::VecDeque;

use tokio::sync::oneshot;

use crate::job::{CompactionJob, DataLevel};

pub(crate) struct QueuedJob {
    pub job: CompactionJob,
    pub level: DataLevel,
    pub generation: u64,
    pub weight: u64,
    /// Monotonic insertion counter; breaks priority ties in FIFO order.
    pub seq: u64,
}

/// Ranks an entry for both dequeue order and eviction order: higher
/// priority first, earlier insertion wins ties. The maximum by this key is
/// the next job a consumer should see; the minimum is the first candidate
/// for eviction under weight pressure.
fn rank(e: &QueuedJob) -> (i64, Reverse<u64>) {
    (e.job.priority, Reverse(e.seq))
}

/// One resource group's queue: entries plus pending `getAsync` waiters.
///
/// A plain `Vec` rather than a binary heap — group queues are expected to
/// stay small (bounded by weight), so a linear scan to find the max (poll)
/// or min (eviction) entry is simpler than maintaining a heap that also
/// needs efficient arbitrary removal for generation sweeps.
#[derive(Default)]
pub(crate) struct GroupQueue {
    entries: Vec<QueuedJob>,
    pub total_weight: u64,
    waiters: VecDeque<oneshot::Sender<CompactionJob>>,
    rejected: u64,
    next_seq: u64,
}

impl GroupQueue {
    /// Inserts `job`, first trying to hand it directly to a waiting
    /// consumer. If accepted by a waiter, never touches the weight bound.
    /// Otherwise queues it and evicts the lowest-priority entries (possibly
    /// including the one just inserted) until the bound is satisfied.
    pub fn add(&mut self, job: CompactionJob, level: DataLevel, generation: u64, weight: u64, max_weight: u64) {
        let mut job = job;
        while let Some(tx) = self.waiters.pop_front() {
            match tx.send(job) {
                Ok(()) => return,
                Err(returned) => job = returned,
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(QueuedJob {
            job,
            level,
            generation,
            weight,
            seq,
        });
        self.total_weight += weight;

        self.evict_to_fit(max_weight);
    }

    fn evict_to_fit(&mut self, max_weight: u64) {
        while self.total_weight > max_weight {
            let Some((idx, _)) = self
                .entries
                .iter()
                .enumerate()
                .min_by_key(|(_, e)| rank(e))
            else {
                break;
            };
            let evicted = self.entries.remove(idx);
            self.total_weight -= evicted.weight;
            self.rejected += 1;
        }
    }

    /// Removes and returns the highest-priority entry, if any.
    pub fn poll(&mut self) -> Option<CompactionJob> {
        let idx = self
            .entries
            .iter()
            .enumerate()
            .max_by_key(|(_, e)| rank(e))
            .map(|(idx, _)| idx)?;
        let entry = self.entries.remove(idx);
        self.total_weight -= entry.weight;
        Some(entry.job)
    }

    /// Registers a waiter to be completed by the next `add` if no job is
    /// already queued; returns the immediate job otherwise.
    pub fn poll_or_register(&mut self, tx: oneshot::Sender<CompactionJob>) {
        if let Some(job) = self.poll() {
            // The receiver may already be gone if the caller raced a
            // cancellation between registering and this call; ignore, the
            // job is simply lost to this attempt and must be re-added by
            // the caller in that case. In practice `getAsync` calls this
            // synchronously right after finding the queue empty, so the
            // race window is effectively nonexistent.
            let _ = tx.send(job);
            return;
        }
        self.waiters.push_back(tx);
    }

    /// Evicts every entry tagged with `level` and a generation strictly
    /// less than `current_generation`.
    pub fn evict_stale(&mut self, level: DataLevel, current_generation: u64) {
        let mut removed_weight = 0u64;
        self.entries.retain(|e| {
            let stale = e.level == level && e.generation < current_generation;
            if stale {
                removed_weight += e.weight;
            }
            !stale
        });
        self.total_weight -= removed_weight;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    pub fn resize(&mut self, max_weight: u64) {
        self.evict_to_fit(max_weight);
    }
}
