//! The tablet recovery algorithm built on top of `logfile` and
//! `recoverylog`: tabletId discovery, log-set narrowing, recovery-sequence
//! computation, and mutation playback.

pub mod engine;
pub mod errors;

pub use engine::{
    find_logs_that_define_tablet, find_max_tablet_id, find_recovery_seq, playback_mutations,
    MutationReceiver, TabletRecoveryEngine,
};
pub use errors::RecoveryError;
