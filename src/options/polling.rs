use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use web_time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Polling", inline)]
#[serde(default)]
/// Fetch cadence and result handling.
pub struct PollingOptions {
    /// Milliseconds between vehicle position fetches.
    #[schemars(title = "Interval (ms)", range(min = 250, max = 60000))]
    pub interval_ms: u64,
    /// Per-request HTTP timeout in milliseconds.
    #[schemars(title = "Fetch Timeout (ms)", range(min = 100, max = 60000))]
    pub fetch_timeout_ms: u64,
    /// Ignore snapshots older than the last applied one.
    #[schemars(title = "Discard Stale Snapshots")]
    pub discard_stale: bool,
}

impl PollingOptions {
    /// Time between vehicle position fetches.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Per-request timeout.
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl Default for PollingOptions {
    fn default() -> Self {
        Self {
            interval_ms: 3000,
            fetch_timeout_ms: 10_000,
            discard_stale: true,
        }
    }
}
