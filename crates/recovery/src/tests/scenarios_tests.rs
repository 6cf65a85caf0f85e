use std::collections::HashSet;

use recoverylog::Capabilities;

use crate::tests::helpers::*;
use crate::{RecoveryError, TabletRecoveryEngine};

fn rows_of(mutations: &[logfile::Mutation]) -> Vec<String> {
    mutations
        .iter()
        .map(|m| String::from_utf8(m.row.clone()).unwrap())
        .collect()
}

/// S1 — single-log single-tablet happy path: compaction finishes cleanly,
/// only the mutation after the finish is replayed.
#[test]
fn s1_single_log_happy_path() {
    let (_guard, dir) = build_dir(vec![
        open(0),
        define_tablet(5, 1, extent_a()),
        mutation(5, 2, "m1"),
        compaction_start(5, 3, "f1"),
        compaction_finish(5, 4),
        mutation(5, 5, "m2"),
    ]);

    let engine = TabletRecoveryEngine::new(Capabilities::default());
    assert!(engine.needs_recovery(&extent_a(), &[dir.clone()]).unwrap());

    let mut received = Vec::new();
    engine
        .recover(&extent_a(), &[dir], &HashSet::new(), &mut received)
        .unwrap();
    assert_eq!(rows_of(&received), vec!["m2"]);
}

/// S2 — start without finish, but the compaction's output file is already
/// recorded in tablet metadata: treat the start as finished.
#[test]
fn s2_start_without_finish_file_in_metadata() {
    let (_guard, dir) = build_dir(vec![
        open(0),
        define_tablet(5, 1, extent_a()),
        mutation(5, 2, "m1"),
        compaction_start(5, 3, "f1"),
        mutation(5, 5, "m2"),
    ]);

    let mut tablet_files = HashSet::new();
    tablet_files.insert("somedir/f1".to_string());

    let engine = TabletRecoveryEngine::new(Capabilities::default());
    let mut received = Vec::new();
    engine
        .recover(&extent_a(), &[dir], &tablet_files, &mut received)
        .unwrap();
    assert_eq!(rows_of(&received), vec!["m2"]);
}

/// S3 — start without finish and the file is absent from metadata: replay
/// resumes from zero, delivering every mutation.
#[test]
fn s3_start_without_finish_file_absent() {
    let (_guard, dir) = build_dir(vec![
        open(0),
        define_tablet(5, 1, extent_a()),
        mutation(5, 2, "m1"),
        compaction_start(5, 3, "f1"),
        mutation(5, 5, "m2"),
    ]);

    let engine = TabletRecoveryEngine::new(Capabilities::default());
    let mut received = Vec::new();
    engine
        .recover(&extent_a(), &[dir], &HashSet::new(), &mut received)
        .unwrap();
    assert_eq!(rows_of(&received), vec!["m1", "m2"]);
}

/// S4 — a tablet reloaded on the same server gets a fresh, higher tabletId;
/// only the latest load-instance's mutations are delivered.
#[test]
fn s4_tablet_reload_uses_latest_tablet_id() {
    let (_guard, dir) = build_dir(vec![
        open(0),
        define_tablet(5, 1, extent_a()),
        mutation(5, 2, "stale"),
        define_tablet(9, 3, extent_a()),
        mutation(9, 4, "fresh"),
    ]);

    let engine = TabletRecoveryEngine::new(Capabilities::default());
    let mut received = Vec::new();
    engine
        .recover(&extent_a(), &[dir], &HashSet::new(), &mut received)
        .unwrap();
    assert_eq!(rows_of(&received), vec!["fresh"]);
}

/// S5 — a log whose first entry isn't OPEN fails recovery outright.
#[test]
fn s5_corrupt_first_entry_rejected() {
    let (_guard, dir) = build_dir(vec![define_tablet(5, 1, extent_a()), mutation(5, 2, "m1")]);

    let engine = TabletRecoveryEngine::new(Capabilities::default());
    let err = engine
        .needs_recovery(&extent_a(), &[dir])
        .expect_err("missing OPEN event must be rejected");
    assert!(matches!(err, RecoveryError::Corrupt(_)));
}

/// A recovery log is a per-server WAL and ordinarily interleaves mutations
/// for several tablets. Because the playback range's bounds span the
/// MUTATION→MANY_MUTATIONS event boundary, records belonging to a different
/// tabletId fall inside that range too (§3's `event`-first total order) and
/// must be skipped rather than delivered or treated as corruption — only
/// mutations for the recovered tabletId may reach the receiver (§8
/// property 3).
#[test]
fn playback_skips_other_tablets_sharing_the_log() {
    let (_guard, dir) = build_dir(vec![
        open(0),
        define_tablet(9, 1, extent_a()),
        mutation(9, 2, "keep"),
        define_tablet(20, 1, extent_b()),
        mutation(20, 3, "other-tablet"),
    ]);

    let engine = TabletRecoveryEngine::new(Capabilities::default());
    let mut received = Vec::new();
    engine
        .recover(&extent_a(), &[dir], &HashSet::new(), &mut received)
        .unwrap();
    assert_eq!(rows_of(&received), vec!["keep"]);
}

/// Idempotence (§8 property 5): running `recover` twice against the same
/// inputs delivers the same mutation sequence.
#[test]
fn recover_is_idempotent() {
    let (_guard, dir) = build_dir(vec![
        open(0),
        define_tablet(5, 1, extent_a()),
        mutation(5, 2, "m1"),
        compaction_start(5, 3, "f1"),
        compaction_finish(5, 4),
        mutation(5, 5, "m2"),
    ]);

    let engine = TabletRecoveryEngine::new(Capabilities::default());

    let mut first = Vec::new();
    engine
        .recover(&extent_a(), &[dir.clone()], &HashSet::new(), &mut first)
        .unwrap();

    let mut second = Vec::new();
    engine
        .recover(&extent_a(), &[dir], &HashSet::new(), &mut second)
        .unwrap();

    assert_eq!(rows_of(&first), rows_of(&second));
}
