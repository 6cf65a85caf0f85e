use std::collections::HashSet;

use logfile::KeyExtent;
use recoverylog::Capabilities;

use crate::engine::{find_logs_that_define_tablet, find_recovery_seq};
use crate::tests::helpers::*;
use crate::RecoveryError;

/// Phase B selects the directory group with the largest observed tabletId
/// and discards directories that only ever saw an older, superseded load.
#[test]
fn phase_b_selects_latest_tablet_id_group() {
    let (_g1, old_dir) = build_dir(vec![open(0), define_tablet(5, 1, extent_a())]);
    let (_g2, new_dir) = build_dir(vec![open(0), define_tablet(9, 1, extent_a())]);

    let caps = Capabilities::default();
    let (tablet_id, narrowed) =
        find_logs_that_define_tablet(&extent_a(), &[old_dir, new_dir.clone()], &caps).unwrap();

    assert_eq!(tablet_id, 9);
    assert_eq!(narrowed.len(), 1);
    assert_eq!(narrowed[0].dir(), new_dir.dir());
}

#[test]
fn phase_b_returns_invalid_when_tablet_absent() {
    let (_g, dir) = build_dir(vec![open(0), define_tablet(5, 1, KeyExtent::new(99, None, None))]);
    let caps = Capabilities::default();
    let (tablet_id, narrowed) = find_logs_that_define_tablet(&extent_a(), &[dir], &caps).unwrap();
    assert_eq!(tablet_id, -1);
    assert!(narrowed.is_empty());
}

/// A COMPACTION_FINISH with no matching COMPACTION_START is an invariant
/// violation (§4.4, adapted per the bucketing note in engine.rs).
#[test]
fn phase_c_rejects_unmatched_finish() {
    let (_g, dir) = build_dir(vec![
        open(0),
        define_tablet(5, 1, extent_a()),
        compaction_finish(5, 2),
    ]);

    let caps = Capabilities::default();
    let err = find_recovery_seq(&[dir], &HashSet::new(), 5, &caps).unwrap_err();
    assert!(matches!(err, RecoveryError::Invariant { .. }));
}

/// Two COMPACTION_FINISH events with no intervening COMPACTION_START must be
/// rejected even when the overall start/finish *counts* match — a count-only
/// check would miss `S(1), S(2), F(3), F(4)`, where chronologically (by seq)
/// the second FINISH has no START between it and the first FINISH.
#[test]
fn phase_c_rejects_two_finishes_with_no_intervening_start_despite_matching_counts() {
    let (_g, dir) = build_dir(vec![
        open(0),
        define_tablet(5, 1, extent_a()),
        compaction_start(5, 2, "f1"),
        compaction_start(5, 3, "f2"),
        compaction_finish(5, 4),
        compaction_finish(5, 5),
    ]);

    let caps = Capabilities::default();
    let err = find_recovery_seq(&[dir], &HashSet::new(), 5, &caps).unwrap_err();
    assert!(matches!(err, RecoveryError::Invariant { .. }));
}

/// The "file in metadata" rule compares only the last two path components.
#[test]
fn phase_c_file_in_metadata_matches_on_suffix_only() {
    let (_g, dir) = build_dir(vec![
        open(0),
        define_tablet(5, 1, extent_a()),
        compaction_start(5, 2, "/volumes/v1/tables/7/t-000/f1.rf"),
    ]);

    let mut tablet_files = HashSet::new();
    tablet_files.insert("/completely/different/root/t-000/f1.rf".to_string());

    let caps = Capabilities::default();
    let seq = find_recovery_seq(&[dir], &tablet_files, 5, &caps).unwrap();
    assert_eq!(seq, 2);
}
