//! Polling: when to fetch, and where fetches run.
//!
//! [`PollCadence`] decides which [`FetchRequest`] is due. A
//! [`FetchExecutor`] runs requests against a [`TransitFeed`] and hands back
//! the latest outcome of each kind. [`InlineExecutor`] fetches inside
//! `submit`; [`FetchWorker`] fetches on a background thread so frames keep
//! advancing while a request is in flight.

mod cadence;
mod worker;

pub use cadence::{PollCadence, DEFAULT_POLL_INTERVAL};
pub use worker::FetchWorker;

use crate::feed::{FeedError, RouteDef, Snapshot, StaticMarker, TransitFeed};

/// What a request fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchScope {
    /// Vehicle positions only.
    EntitiesOnly,
    /// Routes and stations, then vehicle positions.
    Full,
}

/// One polling cycle's fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    /// Monotonically increasing cycle number.
    pub cycle: u64,
    /// What to fetch.
    pub scope: FetchScope,
}

impl FetchRequest {
    /// Whether routes and stations are fetched too.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.scope == FetchScope::Full
    }
}

/// Result of a vehicle position fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotOutcome {
    /// A complete snapshot.
    Ready(Snapshot),
    /// The fetch failed; nothing is to be applied for this cycle.
    Failed {
        /// Cycle whose fetch failed.
        cycle: u64,
        /// Why.
        error: FeedError,
    },
}

impl SnapshotOutcome {
    /// Cycle this outcome belongs to.
    #[must_use]
    pub fn cycle(&self) -> u64 {
        match self {
            Self::Ready(snapshot) => snapshot.cycle,
            Self::Failed { cycle, .. } => *cycle,
        }
    }
}

/// Result of a static data fetch. Each part fails independently.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticOutcome {
    /// Cycle that requested the fetch.
    pub cycle: u64,
    /// Metro lines.
    pub routes: Result<Vec<RouteDef>, FeedError>,
    /// Stations.
    pub markers: Result<Vec<StaticMarker>, FeedError>,
}

/// Run `request` against `feed`. Static data is fetched first for full
/// requests.
pub fn run_fetch<F: TransitFeed + ?Sized>(
    feed: &mut F,
    request: FetchRequest,
) -> (Option<StaticOutcome>, SnapshotOutcome) {
    let statics = request.is_full().then(|| StaticOutcome {
        cycle: request.cycle,
        routes: feed.fetch_routes(),
        markers: feed.fetch_markers(),
    });
    let snapshot = match feed.fetch_entity_snapshot() {
        Ok(entities) => {
            SnapshotOutcome::Ready(Snapshot::new(request.cycle, entities))
        }
        Err(error) => SnapshotOutcome::Failed {
            cycle: request.cycle,
            error,
        },
    };
    (statics, snapshot)
}

/// Runs fetch requests and hands back their outcomes.
///
/// Only the latest outcome of each kind is kept; an unread older outcome is
/// replaced by a newer one.
///
/// A full request's static outcome must become visible no later than its
/// snapshot outcome: once [`try_recv_snapshot`](Self::try_recv_snapshot)
/// returns cycle `n`, [`try_recv_statics`](Self::try_recv_statics) returns
/// the statics of cycle `n` or a newer one, unless they were already taken.
pub trait FetchExecutor {
    /// Queue `request`. Never blocks on I/O for background executors.
    fn submit(&mut self, request: FetchRequest);

    /// Take the latest static outcome, if a new one arrived.
    fn try_recv_statics(&mut self) -> Option<StaticOutcome>;

    /// Take the latest snapshot outcome, if a new one arrived.
    fn try_recv_snapshot(&mut self) -> Option<SnapshotOutcome>;
}

/// Executor that fetches synchronously inside [`FetchExecutor::submit`].
#[derive(Debug)]
pub struct InlineExecutor<F> {
    feed: F,
    statics: Option<StaticOutcome>,
    snapshot: Option<SnapshotOutcome>,
}

impl<F: TransitFeed> InlineExecutor<F> {
    /// Wrap `feed`.
    pub fn new(feed: F) -> Self {
        Self {
            feed,
            statics: None,
            snapshot: None,
        }
    }

    /// The wrapped feed.
    pub fn feed(&self) -> &F {
        &self.feed
    }

    /// The wrapped feed, mutably.
    pub fn feed_mut(&mut self) -> &mut F {
        &mut self.feed
    }
}

impl<F: TransitFeed> FetchExecutor for InlineExecutor<F> {
    fn submit(&mut self, request: FetchRequest) {
        let (statics, snapshot) = run_fetch(&mut self.feed, request);
        if statics.is_some() {
            self.statics = statics;
        }
        self.snapshot = Some(snapshot);
    }

    fn try_recv_statics(&mut self) -> Option<StaticOutcome> {
        self.statics.take()
    }

    fn try_recv_snapshot(&mut self) -> Option<SnapshotOutcome> {
        self.snapshot.take()
    }
}

impl<E: FetchExecutor + ?Sized> FetchExecutor for Box<E> {
    fn submit(&mut self, request: FetchRequest) {
        (**self).submit(request);
    }

    fn try_recv_statics(&mut self) -> Option<StaticOutcome> {
        (**self).try_recv_statics()
    }

    fn try_recv_snapshot(&mut self) -> Option<SnapshotOutcome> {
        (**self).try_recv_snapshot()
    }
}
