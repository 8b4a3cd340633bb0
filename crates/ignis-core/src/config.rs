//! Execution tuning knobs.

use std::time::Duration;

use ignis_types::env_utils::env_var_or;

/// How many futures run in parallel by default.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;
/// Receipt poll cadence in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
/// Confirmation wait budget per transaction in milliseconds.
pub const DEFAULT_TX_TIMEOUT_MS: u64 = 30_000;
/// Block depth a transaction needs before it counts as confirmed.
pub const DEFAULT_CONFIRMATIONS: u64 = 1;

/// Tunables for one engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionConfig {
    /// Upper bound on concurrently executing futures.
    pub max_concurrency: usize,
    /// Delay between receipt polls.
    pub poll_interval: Duration,
    /// How long to wait for a confirmation before declaring a timeout.
    pub confirmation_timeout: Duration,
    /// Confirmations required by backends that track block depth.
    pub required_confirmations: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            confirmation_timeout: Duration::from_millis(DEFAULT_TX_TIMEOUT_MS),
            required_confirmations: DEFAULT_CONFIRMATIONS,
        }
    }
}

impl ExecutionConfig {
    /// Defaults overridden by `IGNIS_MAX_CONCURRENCY`, `IGNIS_POLL_INTERVAL_MS`,
    /// `IGNIS_TX_TIMEOUT_MS` and `IGNIS_CONFIRMATIONS`.
    pub fn from_env() -> Self {
        ExecutionConfig {
            max_concurrency: env_var_or("IGNIS_MAX_CONCURRENCY", DEFAULT_MAX_CONCURRENCY).max(1),
            poll_interval: Duration::from_millis(env_var_or(
                "IGNIS_POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL_MS,
            )),
            confirmation_timeout: Duration::from_millis(env_var_or(
                "IGNIS_TX_TIMEOUT_MS",
                DEFAULT_TX_TIMEOUT_MS,
            )),
            required_confirmations: env_var_or("IGNIS_CONFIRMATIONS", DEFAULT_CONFIRMATIONS),
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_confirmation_timeout(mut self, confirmation_timeout: Duration) -> Self {
        self.confirmation_timeout = confirmation_timeout;
        self
    }

    pub fn with_required_confirmations(mut self, required_confirmations: u64) -> Self {
        self.required_confirmations = required_confirmations;
        self
    }
}
