use std::path::{Path, PathBuf};

/// A directory containing an ordered set of sorted files that together form
/// one write-ahead log for a server-epoch.
///
/// File boundaries within a directory are a physical concern only — the
/// logical ordering across all of a directory's children, and across
/// directories, is established by [`crate::merge::MergingRecoveryIterator`].
#[derive(Debug, Clone)]
pub struct ResolvedSortedLog {
    dir: PathBuf,
    children: Vec<PathBuf>,
}

impl ResolvedSortedLog {
    pub fn new(dir: PathBuf, children: Vec<PathBuf>) -> Self {
        Self { dir, children }
    }

    /// Convenience constructor: resolves every regular file directly inside
    /// `dir`, sorted by filename, as this log's children.
    pub fn from_dir(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        let mut children: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        children.sort();
        Ok(Self { dir, children })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn children(&self) -> &[PathBuf] {
        &self.children
    }
}
