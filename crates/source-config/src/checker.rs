//! Task status checker policy (`checker` section).

use crate::duration::Duration;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_BACKOFF_ROLLBACK: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_BACKOFF_MIN: Duration = Duration::from_secs(1);
pub const DEFAULT_BACKOFF_JITTER: bool = true;
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;

/// Auto-resume policy for paused tasks on this source.
///
/// Only `check-enable`, `backoff-rollback` and `backoff-max` are exposed in
/// config files. The remaining knobs are internal tuning and are reset to
/// their defaults by [`CheckerConfig::adjust`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct CheckerConfig {
    pub check_enable: bool,
    pub backoff_rollback: Duration,
    pub backoff_max: Duration,

    #[serde(skip)]
    pub check_interval: Duration,
    #[serde(skip)]
    pub backoff_min: Duration,
    #[serde(skip)]
    pub backoff_jitter: bool,
    #[serde(skip)]
    pub backoff_factor: f64,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            check_enable: true,
            backoff_rollback: DEFAULT_BACKOFF_ROLLBACK,
            backoff_max: DEFAULT_BACKOFF_MAX,
            check_interval: DEFAULT_CHECK_INTERVAL,
            backoff_min: DEFAULT_BACKOFF_MIN,
            backoff_jitter: DEFAULT_BACKOFF_JITTER,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
        }
    }
}

impl CheckerConfig {
    pub fn adjust(&mut self) {
        self.check_interval = DEFAULT_CHECK_INTERVAL;
        self.backoff_min = DEFAULT_BACKOFF_MIN;
        self.backoff_jitter = DEFAULT_BACKOFF_JITTER;
        self.backoff_factor = DEFAULT_BACKOFF_FACTOR;
    }
}
