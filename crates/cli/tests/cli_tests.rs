use assert_cmd::Command;
use logfile::{Event, KeyExtent, LogFileKey, LogFileValue, Mutation, MutationKind};
use predicates::prelude::*;

fn bin() -> Command {
    Command::cargo_bin("cli").unwrap()
}

fn build_log_dir(dir: &std::path::Path) {
    let extent = KeyExtent::new(5, None, None);
    let entries = vec![
        (LogFileKey::new(Event::Open, 0, 0), LogFileValue::default()),
        (
            LogFileKey::define_tablet(7, 1, extent),
            LogFileValue::default(),
        ),
        (
            LogFileKey::new(Event::Mutation, 7, 2),
            LogFileValue {
                mutations: vec![Mutation {
                    row: b"r1".to_vec(),
                    column: b"cf:cq".to_vec(),
                    kind: MutationKind::Put(b"v1".to_vec()),
                }],
            },
        ),
    ];
    recoverylog::write_sorted_file(dir.join("0001.rlog"), &entries).unwrap();
}

#[test]
fn demo_replays_one_mutation() {
    bin()
        .arg("demo")
        .assert()
        .success()
        .stdout(predicate::str::contains("replayed 1 mutation(s)"))
        .stdout(predicate::str::contains("fresh"));
}

#[test]
fn queue_demo_dequeues_highest_priority_first() {
    let assert = bin().arg("queue-demo").assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let first = stdout.find("priority=5").expect("priority 5 present");
    let second = stdout.find("priority=1").expect("priority 1 present");
    assert!(first < second, "priority=5 job must dequeue before priority=1");
}

#[test]
fn needs_recovery_true_for_defined_tablet() {
    let dir = tempfile::tempdir().unwrap();
    build_log_dir(dir.path());

    bin()
        .args(["needs-recovery", "--table-id", "5", "--dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("true"));
}

#[test]
fn needs_recovery_false_for_absent_tablet() {
    let dir = tempfile::tempdir().unwrap();
    build_log_dir(dir.path());

    bin()
        .args(["needs-recovery", "--table-id", "999", "--dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("false"));
}

#[test]
fn recover_prints_delivered_mutation() {
    let dir = tempfile::tempdir().unwrap();
    build_log_dir(dir.path());

    bin()
        .args(["recover", "--table-id", "5", "--dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("v1"))
        .stdout(predicate::str::contains("(1 mutations)"));
}
