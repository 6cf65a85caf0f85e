use logfile::{Event, LogFileError};
use recoverylog::RecoveryLogError;
use thiserror::Error;

/// Errors raised by [`crate::engine::TabletRecoveryEngine`].
///
/// `Io` and `Corrupt` pass through unchanged from the `recoverylog` layer;
/// `Invariant` is raised only by Phases A–D themselves, when the data they
/// scan violates one of §4.4's required properties — always a writer bug or
/// on-disk corruption, never something this tablet's recovery can repair
/// locally.
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt recovery log: {0}")]
    Corrupt(#[from] LogFileError),

    #[error("recovery invariant violated for tablet {tablet_id} at seq {seq} ({event:?}): {detail}")]
    Invariant {
        tablet_id: i64,
        seq: u64,
        event: Event,
        detail: String,
    },
}

impl From<RecoveryLogError> for RecoveryError {
    fn from(e: RecoveryLogError) -> Self {
        match e {
            RecoveryLogError::Io(io) => RecoveryError::Io(io),
            RecoveryLogError::Corrupt(c) => RecoveryError::Corrupt(c),
            RecoveryLogError::MissingOpenEvent { dir } => RecoveryError::Corrupt(
                LogFileError::CorruptLogEntry(format!("{dir} does not begin with an OPEN event")),
            ),
        }
    }
}

impl RecoveryError {
    pub(crate) fn invariant(
        tablet_id: i64,
        seq: u64,
        event: Event,
        detail: impl Into<String>,
    ) -> Self {
        RecoveryError::Invariant {
            tablet_id,
            seq,
            event,
            detail: detail.into(),
        }
    }
}
