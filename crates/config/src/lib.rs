//! # config — recovery core configuration
//!
//! The handful of options the tablet recovery core and compaction job queue
//! set recognize (§6 of the spec), read from environment variables with
//! typed defaults — the same `env_or`-style convention the `cli` crate's
//! original `RIPTIDE_*` settings used, generalized to a `RECOVERY_*`
//! namespace.
//!
//! ```text
//! RECOVERY_QUEUE_MAX_WEIGHT      total weight permitted per priority queue (default: 1000)
//! RECOVERY_VALIDATE_FIRST_KEY    require OPEN as a recovery log's first entry (default: true)
//! ```
//!
//! A missing variable silently defaults. A malformed one also defaults, but
//! logs a warning — config loading never panics and never fails a caller's
//! startup over a bad environment.

use std::str::FromStr;

/// `RECOVERY_QUEUE_MAX_WEIGHT` default: total permitted weight per priority
/// queue. Implementation-chosen per §6; must be positive.
pub const DEFAULT_MAX_WEIGHT: u64 = 1_000;

/// `RECOVERY_VALIDATE_FIRST_KEY` default: require `OPEN` as the first entry
/// of a recovery log. `false` is only for diagnostic replay (§6).
pub const DEFAULT_VALIDATE_FIRST_KEY: bool = true;

/// `recovery.queue.*` options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    pub max_weight: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_weight: DEFAULT_MAX_WEIGHT,
        }
    }
}

/// `recovery.*` options recognized by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryConfig {
    pub queue: QueueConfig,
    pub validate_first_key: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            queue: QueueConfig::default(),
            validate_first_key: DEFAULT_VALIDATE_FIRST_KEY,
        }
    }
}

impl RecoveryConfig {
    /// Reads every recognized `RECOVERY_*` variable from the process
    /// environment, falling back field-by-field to its default.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            queue: QueueConfig {
                max_weight: env_parsed("RECOVERY_QUEUE_MAX_WEIGHT", DEFAULT_MAX_WEIGHT),
            },
            validate_first_key: env_parsed("RECOVERY_VALIDATE_FIRST_KEY", DEFAULT_VALIDATE_FIRST_KEY),
        }
    }

    /// `max_weight` must be positive (§6); a misconfigured environment is
    /// surfaced here rather than panicking deep inside the queue set.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.queue.max_weight > 0
    }
}

fn env_parsed<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Err(_) => default,
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("{key}={raw:?} is not valid, using default");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialize tests that touch
    // them so they don't observe each other's mutations.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn defaults_when_unset() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var("RECOVERY_QUEUE_MAX_WEIGHT");
        std::env::remove_var("RECOVERY_VALIDATE_FIRST_KEY");

        let cfg = RecoveryConfig::from_env();
        assert_eq!(cfg.queue.max_weight, DEFAULT_MAX_WEIGHT);
        assert_eq!(cfg.validate_first_key, DEFAULT_VALIDATE_FIRST_KEY);
    }

    #[test]
    fn reads_well_formed_values() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("RECOVERY_QUEUE_MAX_WEIGHT", "2000");
        std::env::set_var("RECOVERY_VALIDATE_FIRST_KEY", "false");

        let cfg = RecoveryConfig::from_env();
        assert_eq!(cfg.queue.max_weight, 2000);
        assert!(!cfg.validate_first_key);

        std::env::remove_var("RECOVERY_QUEUE_MAX_WEIGHT");
        std::env::remove_var("RECOVERY_VALIDATE_FIRST_KEY");
    }

    #[test]
    fn malformed_value_falls_back_to_default() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("RECOVERY_QUEUE_MAX_WEIGHT", "not-a-number");

        let cfg = RecoveryConfig::from_env();
        assert_eq!(cfg.queue.max_weight, DEFAULT_MAX_WEIGHT);

        std::env::remove_var("RECOVERY_QUEUE_MAX_WEIGHT");
    }

    #[test]
    fn zero_max_weight_is_invalid() {
        let cfg = RecoveryConfig {
            queue: QueueConfig { max_weight: 0 },
            validate_first_key: true,
        };
        assert!(!cfg.is_valid());
    }
}
