use web_time::{Duration, Instant};

use super::{FetchRequest, FetchScope};

/// Default time between vehicle position fetches.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Decides when a fetch is due and what it covers.
///
/// The first poll is always a full fetch. After that an entity-only fetch is
/// issued once per interval, and a full fetch whenever a refresh was
/// requested. Cycle numbers start at 1 and increase by one per request.
#[derive(Debug, Clone)]
pub struct PollCadence {
    interval: Duration,
    last_poll: Option<Instant>,
    refresh_requested: bool,
    last_cycle: u64,
}

impl PollCadence {
    /// Cadence firing every `interval`.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_poll: None,
            refresh_requested: false,
            last_cycle: 0,
        }
    }

    /// Time between entity fetches.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Change the interval. Takes effect from the last poll.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Cycle number of the most recent request, 0 before the first.
    #[must_use]
    pub fn last_cycle(&self) -> u64 {
        self.last_cycle
    }

    /// Ask for a full fetch on the next poll.
    pub fn request_refresh(&mut self) {
        self.refresh_requested = true;
    }

    /// Whether a full fetch is pending.
    #[must_use]
    pub fn refresh_pending(&self) -> bool {
        self.refresh_requested || self.last_poll.is_none()
    }

    /// Time left until the next entity fetch is due.
    #[must_use]
    pub fn until_next(&self, now: Instant) -> Duration {
        if self.refresh_pending() {
            return Duration::ZERO;
        }
        self.last_poll.map_or(Duration::ZERO, |last| {
            self.interval.saturating_sub(now.saturating_duration_since(last))
        })
    }

    /// The request due at `now`, if any.
    pub fn poll(&mut self, now: Instant) -> Option<FetchRequest> {
        let scope = if self.refresh_pending() {
            FetchScope::Full
        } else {
            let last = self.last_poll?;
            if now.saturating_duration_since(last) < self.interval {
                return None;
            }
            FetchScope::EntitiesOnly
        };

        self.refresh_requested = false;
        self.last_poll = Some(now);
        self.last_cycle += 1;
        Some(FetchRequest {
            cycle: self.last_cycle,
            scope,
        })
    }
}

impl Default for PollCadence {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}
