//! Configuration types.

use std::time::Duration;

/// Classifier client configuration.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Hard deadline for one classification call.
    pub timeout: Duration,
    /// Issue text is truncated to this many characters at classification time.
    pub issue_max_chars: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            issue_max_chars: 100,
        }
    }
}

/// Outbound request budget for the ledger client.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Fixed rate window.
    pub window: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(100),
        }
    }
}

/// Follow-up scheduler instance configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Minutes between sweeps. The first sweep fires immediately on start.
    pub interval_minutes: u64,
    /// An open ticket is stale once `last_updated` is older than this.
    pub stale_threshold_hours: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 30,
            stale_threshold_hours: 2,
        }
    }
}
