//! The tablet recovery algorithm: four phases driven by
//! [`TabletRecoveryEngine::recover`].
//!
//! Phase C (`find_recovery_seq`) deserves a note on an ambiguity §3/§4.4
//! leave unresolved: `LogFileKey`'s total order sorts primarily by `event`,
//! so within one tablet id's compaction history every COMPACTION_START
//! record sorts before every COMPACTION_FINISH record in the raw scan
//! order, regardless of which finished which. `find_recovery_seq` collects
//! the START and FINISH sub-streams separately (each internally
//! seq-ascending, which the total order guarantees for free) and then
//! reconstructs the chronological interleaving with a two-pointer merge by
//! `seq` — the same `seq` counter both classes draw from for a given
//! tabletId (§3). Walking that merged sequence enforces §4.4's invariants
//! exactly as its `lastStart`/`lastFinish` prose describes, including "two
//! COMPACTION_FINISH events must not appear consecutively with no
//! intervening START", which a naive positional pairing of the two
//! sub-streams can silently miss whenever start/finish counts happen to
//! match but adjacency doesn't.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use logfile::{Event, KeyExtent, LogFileKey, LogFileValue, Mutation, INVALID_TABLET_ID};
use recoverylog::{
    Capabilities, DeduplicatingIterator, MergingRecoveryIterator, RecoveryEntries,
    ResolvedSortedLog,
};

use crate::errors::RecoveryError;

/// Sink the engine delivers replayed mutations to during Phase D.
pub trait MutationReceiver {
    fn receive(&mut self, mutation: Mutation);
}

impl MutationReceiver for Vec<Mutation> {
    fn receive(&mut self, mutation: Mutation) {
        self.push(mutation);
    }
}

/// Phase A: the maximum tabletId across `dirs` whose DEFINE_TABLET events
/// name `extent` (or, for the root extent, the legacy old-root extent).
/// Returns [`INVALID_TABLET_ID`] if none match.
pub fn find_max_tablet_id(
    extent: &KeyExtent,
    dirs: &[ResolvedSortedLog],
    validate_first_key: bool,
    caps: &Capabilities,
) -> Result<i64, RecoveryError> {
    let range = logfile::to_range(
        Some(LogFileKey::new(Event::DefineTablet, i64::MIN, 0)),
        Some(LogFileKey::new(Event::DefineTablet, i64::MAX, u64::MAX)),
    );
    let mut it = MergingRecoveryIterator::new(dirs, Some(range), validate_first_key, caps)?;

    let old_root = KeyExtent::old_root_extent();
    let mut max_id = INVALID_TABLET_ID;

    while let Some((key, _)) = it.next()? {
        let candidate = key.tablet.as_ref().ok_or_else(|| {
            RecoveryError::invariant(key.tablet_id, key.seq, key.event, "DEFINE_TABLET missing tablet extent")
        })?;

        let matches = candidate == extent || (extent.is_root() && *candidate == old_root);
        if !matches {
            continue;
        }

        if key.tablet_id < 0 {
            return Err(RecoveryError::invariant(
                key.tablet_id,
                key.seq,
                key.event,
                "DEFINE_TABLET carries a negative tabletId",
            ));
        }
        if key.tablet_id > max_id {
            max_id = key.tablet_id;
        }
    }

    Ok(max_id)
}

/// Phase B: runs Phase A against each directory individually, then returns
/// the tabletId and directory group with the largest observed id. Opens one
/// directory's index at a time.
pub fn find_logs_that_define_tablet(
    extent: &KeyExtent,
    dirs: &[ResolvedSortedLog],
    caps: &Capabilities,
) -> Result<(i64, Vec<ResolvedSortedLog>), RecoveryError> {
    let mut groups: HashMap<i64, Vec<ResolvedSortedLog>> = HashMap::new();
    let mut best_id = INVALID_TABLET_ID;

    for dir in dirs {
        let id = find_max_tablet_id(extent, std::slice::from_ref(dir), true, caps)?;
        if id < 0 {
            continue;
        }
        groups.entry(id).or_default().push(dir.clone());
        if id > best_id {
            best_id = id;
        }
    }

    if best_id < 0 {
        return Ok((INVALID_TABLET_ID, Vec::new()));
    }
    Ok((best_id, groups.remove(&best_id).unwrap_or_default()))
}

struct CompactionRecord {
    seq: u64,
    filename: Option<String>,
}

fn scan_compaction_class(
    logs: &[ResolvedSortedLog],
    event: Event,
    tablet_id: i64,
    caps: &Capabilities,
) -> Result<Vec<CompactionRecord>, RecoveryError> {
    let range = logfile::to_range(
        Some(LogFileKey::new(event, tablet_id, 0)),
        Some(LogFileKey::new(event, tablet_id, u64::MAX)),
    );
    let merged = MergingRecoveryIterator::new(logs, Some(range), false, caps)?;
    let mut deduped = DeduplicatingIterator::new(merged);

    let mut out: Vec<CompactionRecord> = Vec::new();
    while let Some((key, _)) = deduped.next_entry()? {
        if key.tablet_id != tablet_id {
            return Err(RecoveryError::invariant(
                key.tablet_id,
                key.seq,
                key.event,
                "compaction scan yielded an entry for a different tabletId",
            ));
        }
        if let Some(prev) = out.last() {
            if key.seq < prev.seq {
                return Err(RecoveryError::invariant(
                    key.tablet_id,
                    key.seq,
                    key.event,
                    "seq decreased within a compaction-event scan",
                ));
            }
        }
        out.push(CompactionRecord {
            seq: key.seq,
            filename: key.filename.clone(),
        });
    }
    Ok(out)
}

/// Compares the last two path components of `a` and `b`, per §4.4's "file in
/// metadata" rule. The file name component must always match; the parent
/// directory component is compared too when both sides have one, but a bare
/// file name (no parent component, as metadata sometimes records) matches on
/// file name alone rather than being rejected outright.
fn path_suffix_matches(a: &str, b: &str) -> bool {
    fn parts(s: &str) -> (Option<String>, Option<String>) {
        let path = Path::new(s);
        let file = path
            .file_name()
            .and_then(|f| f.to_str())
            .map(|s| s.to_string());
        let parent = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|f| f.to_str())
            .map(|s| s.to_string());
        (parent, file)
    }
    let (parent_a, file_a) = parts(a);
    let (parent_b, file_b) = parts(b);
    if file_a.is_none() || file_a != file_b {
        return false;
    }
    match (parent_a, parent_b) {
        (Some(x), Some(y)) => x == y,
        _ => true,
    }
}

/// Phase C: the recovery sequence number mutation playback must resume
/// from, for `tabletId` across the (already Phase-B-narrowed) `logs`.
///
/// `starts` and `finishes` are each already seq-ascending on their own (the
/// total order guarantees that per event class); a two-pointer merge by
/// `seq` reconstructs the chronological interleaving and is itself
/// seq-ascending for free, so the walk below needs only track the most
/// recent unmatched START (`pending_start`) to enforce every invariant
/// §4.4 requires: a FINISH with no `pending_start` is an unmatched FINISH
/// (equivalently, two FINISH events with no intervening START), and a
/// FINISH whose seq doesn't exceed its `pending_start`'s seq is rejected
/// too.
pub fn find_recovery_seq(
    logs: &[ResolvedSortedLog],
    tablet_files: &HashSet<String>,
    tablet_id: i64,
    caps: &Capabilities,
) -> Result<u64, RecoveryError> {
    let starts = scan_compaction_class(logs, Event::CompactionStart, tablet_id, caps)?;
    let finishes = scan_compaction_class(logs, Event::CompactionFinish, tablet_id, caps)?;

    let mut pending_start: Option<&CompactionRecord> = None;
    let mut last_finish: Option<u64> = None;
    let (mut si, mut fi) = (0usize, 0usize);

    while si < starts.len() || fi < finishes.len() {
        let take_start = match (starts.get(si), finishes.get(fi)) {
            (Some(s), Some(f)) => s.seq <= f.seq,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => unreachable!(),
        };

        if take_start {
            pending_start = Some(&starts[si]);
            si += 1;
            continue;
        }

        let finish = &finishes[fi];
        let Some(start) = pending_start else {
            return Err(RecoveryError::invariant(
                tablet_id,
                finish.seq,
                Event::CompactionFinish,
                "COMPACTION_FINISH with no intervening COMPACTION_START",
            ));
        };
        if finish.seq <= start.seq {
            return Err(RecoveryError::invariant(
                tablet_id,
                finish.seq,
                Event::CompactionFinish,
                format!(
                    "COMPACTION_FINISH seq {} does not exceed its paired COMPACTION_START seq {}",
                    finish.seq, start.seq
                ),
            ));
        }
        last_finish = Some(finish.seq);
        pending_start = None;
        fi += 1;
    }

    if let Some(start) = pending_start {
        if let Some(filename) = &start.filename {
            if tablet_files.iter().any(|f| path_suffix_matches(f, filename)) {
                return Ok(start.seq);
            }
        }
    }

    // lastFinish - 1, reproduced verbatim per §4.4's documented rule; see
    // SPEC_FULL.md's open-question note for why the decrement isn't
    // second-guessed here.
    Ok(last_finish.map(|f| f.saturating_sub(1)).unwrap_or(0))
}

/// Phase D: delivers every mutation in `[MUTATION tabletId recoverySeq,
/// MANY_MUTATIONS tabletId +inf]` to `receiver`, in order.
///
/// The range's lower bound fixes `event=MUTATION` and the upper bound fixes
/// `event=MANY_MUTATIONS`, both at `tabletId`; because `LogFileKey`'s total
/// order compares `event` ahead of `tabletId` (§3), every key whose event is
/// `MUTATION` or `MANY_MUTATIONS` falls inside `[start, end]` regardless of
/// *which* tabletId it carries — a recovery log is a per-server WAL and
/// ordinarily interleaves many tablets' mutations. Records for other
/// tabletIds are therefore expected here and are skipped rather than
/// treated as corruption; only entries for `tablet_id` are delivered, which
/// is what §8 property 3 requires of the delivered stream.
pub fn playback_mutations<R: MutationReceiver>(
    logs: &[ResolvedSortedLog],
    tablet_id: i64,
    recovery_seq: u64,
    receiver: &mut R,
    caps: &Capabilities,
) -> Result<(), RecoveryError> {
    let range = logfile::to_range(
        Some(LogFileKey::new(Event::Mutation, tablet_id, recovery_seq)),
        Some(LogFileKey::new(Event::ManyMutations, tablet_id, u64::MAX)),
    );
    let merged = MergingRecoveryIterator::new(logs, Some(range), false, caps)?;
    let mut deduped = DeduplicatingIterator::new(merged);

    while let Some((key, value)) = deduped.next_entry()? {
        if key.tablet_id != tablet_id {
            continue;
        }
        match key.event {
            Event::Mutation | Event::ManyMutations => {
                deliver(&value, receiver);
            }
            other => {
                return Err(RecoveryError::invariant(
                    tablet_id,
                    key.seq,
                    other,
                    "unexpected event kind in the mutation playback range",
                ));
            }
        }
    }
    Ok(())
}

fn deliver<R: MutationReceiver>(value: &LogFileValue, receiver: &mut R) {
    for m in &value.mutations {
        receiver.receive(m.clone());
    }
}

/// Drives a single tablet's recovery: log-set narrowing, recovery-sequence
/// computation, and mutation playback.
#[derive(Default)]
pub struct TabletRecoveryEngine {
    caps: Capabilities,
}

impl TabletRecoveryEngine {
    pub fn new(caps: Capabilities) -> Self {
        Self { caps }
    }

    /// True iff any supplied directory defines `extent` under a tabletId.
    pub fn needs_recovery(
        &self,
        extent: &KeyExtent,
        dirs: &[ResolvedSortedLog],
    ) -> Result<bool, RecoveryError> {
        let (tablet_id, _) = find_logs_that_define_tablet(extent, dirs, &self.caps)?;
        Ok(tablet_id >= 0)
    }

    /// Runs Phases B, C, and D for `extent`. If the tablet is absent from
    /// `dirs`, logs and returns successfully without touching `receiver`.
    pub fn recover<R: MutationReceiver>(
        &self,
        extent: &KeyExtent,
        dirs: &[ResolvedSortedLog],
        tablet_files: &HashSet<String>,
        receiver: &mut R,
    ) -> Result<(), RecoveryError> {
        let (tablet_id, narrowed) = find_logs_that_define_tablet(extent, dirs, &self.caps)?;
        if tablet_id < 0 {
            log::info!("extent {extent:?} not present in any recovery log; no replay needed");
            return Ok(());
        }

        let recovery_seq = find_recovery_seq(&narrowed, tablet_files, tablet_id, &self.caps)?;
        log::info!("recovering tabletId {tablet_id} for extent {extent:?} from seq {recovery_seq}");

        playback_mutations(&narrowed, tablet_id, recovery_seq, receiver, &self.caps).map_err(|e| {
            log::error!("recovery aborted for extent {extent:?} tabletId {tablet_id}: {e}");
            e
        })
    }
}
