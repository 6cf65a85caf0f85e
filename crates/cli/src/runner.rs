//! Thin glue between the CLI's argument parsing and the recovery core: turn
//! flags into [`KeyExtent`]/[`ResolvedSortedLog`] values, drive
//! [`TabletRecoveryEngine`], and format the result for stdout. Kept
//! separate from `main.rs` so the argument-parsing frontend can change
//! without touching the logic it drives.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use logfile::{KeyExtent, Mutation, MutationKind};
use recoverylog::{Capabilities, ResolvedSortedLog};
use recovery::TabletRecoveryEngine;

/// Builds the [`KeyExtent`] identified by a tablet's table id and row
/// bounds, as supplied on the command line. An empty bound means +∞/−∞,
/// matching `KeyExtent`'s `None` convention (§3).
pub fn build_extent(table_id: u64, end_row: Option<&str>, prev_end_row: Option<&str>) -> KeyExtent {
    KeyExtent::new(
        table_id,
        end_row.map(|s| s.as_bytes().to_vec()),
        prev_end_row.map(|s| s.as_bytes().to_vec()),
    )
}

/// Resolves every `--dir` argument into a [`ResolvedSortedLog`], sorted by
/// filename within each directory.
pub fn load_dirs(paths: &[PathBuf]) -> Result<Vec<ResolvedSortedLog>> {
    paths
        .iter()
        .map(|p| {
            ResolvedSortedLog::from_dir(p)
                .with_context(|| format!("opening recovery log directory {}", p.display()))
        })
        .collect()
}

/// Runs `needsRecovery` for `extent` against `dirs`.
pub fn run_needs_recovery(extent: &KeyExtent, dirs: &[ResolvedSortedLog]) -> Result<bool> {
    let engine = TabletRecoveryEngine::new(Capabilities::default());
    Ok(engine.needs_recovery(extent, dirs)?)
}

/// Runs `recover` for `extent` against `dirs`, collecting every delivered
/// mutation in order.
pub fn run_recover(
    extent: &KeyExtent,
    dirs: &[ResolvedSortedLog],
    tablet_files: &HashSet<String>,
) -> Result<Vec<Mutation>> {
    let engine = TabletRecoveryEngine::new(Capabilities::default());
    let mut received = Vec::new();
    engine.recover(extent, dirs, tablet_files, &mut received)?;
    Ok(received)
}

/// Renders a mutation the way `SCAN`/replay output is typically shown:
/// `row\tcolumn\t<value|DELETE>`.
pub fn format_mutation(m: &Mutation) -> String {
    let row = String::from_utf8_lossy(&m.row);
    let column = String::from_utf8_lossy(&m.column);
    match &m.kind {
        MutationKind::Put(v) => format!("{row}\t{column}\t{}", String::from_utf8_lossy(v)),
        MutationKind::Delete => format!("{row}\t{column}\tDELETE"),
    }
}

/// Builds a small synthetic recovery log directory under `dir`, reproducing
/// §8 scenario S1 (a compaction that finishes cleanly, followed by one more
/// mutation), and returns the extent it defines. Exists so `cli demo` can
/// exercise the whole stack without a real sorter or real WAL (§1
/// Non-goals) standing in the way.
pub fn write_demo_log(dir: &Path) -> Result<KeyExtent> {
    use logfile::{Event, LogFileKey, LogFileValue};

    let extent = KeyExtent::new(5, None, None);
    let entries = vec![
        (LogFileKey::new(Event::Open, 0, 0), LogFileValue::default()),
        (
            LogFileKey::define_tablet(7, 1, extent.clone()),
            LogFileValue::default(),
        ),
        (
            LogFileKey::new(Event::Mutation, 7, 2),
            LogFileValue {
                mutations: vec![Mutation {
                    row: b"row-a".to_vec(),
                    column: b"cf:cq".to_vec(),
                    kind: MutationKind::Put(b"stale".to_vec()),
                }],
            },
        ),
        (
            LogFileKey::compaction_start(7, 3, "compacted-1.rlog"),
            LogFileValue::default(),
        ),
        (
            LogFileKey::new(Event::CompactionFinish, 7, 4),
            LogFileValue::default(),
        ),
        (
            LogFileKey::new(Event::Mutation, 7, 5),
            LogFileValue {
                mutations: vec![Mutation {
                    row: b"row-b".to_vec(),
                    column: b"cf:cq".to_vec(),
                    kind: MutationKind::Put(b"fresh".to_vec()),
                }],
            },
        ),
    ];

    recoverylog::write_sorted_file(dir.join("0001.rlog"), &entries)?;
    Ok(extent)
}
