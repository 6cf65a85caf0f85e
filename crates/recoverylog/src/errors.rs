use logfile::LogFileError;
use std::io;
use thiserror::Error;

/// Errors raised while reading or merging recovery log sorted files.
///
/// Mirrors §7's taxonomy at the granularity this crate owns: `Io` surfaces
/// unchanged as `RecoveryIoError`, `Corrupt` / `MissingOpenEvent` surface as
/// `CorruptLogError`. The `recovery` crate (Phases A–D) re-wraps these into
/// its own error enum rather than inventing a parallel hierarchy.
#[derive(Debug, Error)]
pub enum RecoveryLogError {
    /// Underlying filesystem failure. Retryable by the caller.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A stored key or value could not be decoded.
    #[error("corrupt recovery log entry: {0}")]
    Corrupt(#[from] LogFileError),

    /// A directory's first entry was not `OPEN` while `validate_first_key`
    /// was requested.
    #[error("recovery log directory {dir} does not begin with an OPEN event")]
    MissingOpenEvent { dir: String },
}
