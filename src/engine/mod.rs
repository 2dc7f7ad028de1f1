//! The live map engine.
//!
//! [`LiveMap`] owns the surface, the proxy registry, the animator and the
//! static layer, and ties them to a polling cadence and a fetch executor.
//! Everything that touches the registry or the surface happens inside
//! [`LiveMap::tick`], one cooperative turn at a time.

mod accessors;
mod sync;

use web_time::Instant;

use crate::animation::Animator;
use crate::error::LiveMapError;
use crate::feed::FeedError;
use crate::options::Options;
use crate::poll::{FetchExecutor, FetchRequest, PollCadence, SnapshotOutcome};
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::registry::ProxyRegistry;
use crate::statics::StaticLayer;
use crate::surface::VisualSurface;

/// What happened to a snapshot handed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotDisposition {
    /// Reconciled into the registry.
    Applied(ReconcileReport),
    /// The fetch failed; rendered state left untouched.
    Skipped(FeedError),
    /// Older than the last applied snapshot; ignored.
    Stale {
        /// Cycle of the discarded snapshot.
        cycle: u64,
    },
}

/// Outcome of one [`LiveMap::tick`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TickSummary {
    /// Request submitted this turn.
    pub submitted: Option<FetchRequest>,
    /// Whether a static outcome was processed.
    pub statics_received: bool,
    /// What happened to a snapshot received this turn.
    pub snapshot: Option<SnapshotDisposition>,
    /// Animations still in flight after the frame advanced.
    pub animating: usize,
}

/// Running totals since construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LiveMapStats {
    /// Requests submitted.
    pub cycles_requested: u64,
    /// Snapshots reconciled.
    pub snapshots_applied: u64,
    /// Snapshot fetches that failed.
    pub snapshots_failed: u64,
    /// Snapshots discarded as stale.
    pub snapshots_stale: u64,
    /// Static fetches with at least one part applied.
    pub statics_applied: u64,
    /// Static fetch parts that failed.
    pub statics_failed: u64,
    /// Frames advanced.
    pub frames: u64,
}

/// Live vehicle map over a [`VisualSurface`], fed through a
/// [`FetchExecutor`].
///
/// # Frame loop
///
/// Call [`tick`](Self::tick) once per frame. It submits due fetches, applies
/// whatever results have arrived (static data first, then the snapshot),
/// and advances every in-flight animation by one frame.
///
/// # Failure handling
///
/// A failed or unavailable fetch is logged and skipped; the registry and
/// surface keep their last good state until a later cycle succeeds.
pub struct LiveMap<S, E> {
    options: Options,
    surface: S,
    executor: E,
    registry: ProxyRegistry,
    animator: Animator,
    reconciler: Reconciler,
    statics: StaticLayer,
    cadence: PollCadence,
    last_snapshot_cycle: Option<u64>,
    last_static_cycle: Option<u64>,
    stats: LiveMapStats,
}

impl<S: VisualSurface, E: FetchExecutor> LiveMap<S, E> {
    /// Build an engine from `options`. Routes listed in
    /// `display.hidden_routes` start hidden.
    ///
    /// # Errors
    ///
    /// Returns [`LiveMapError::InvalidOptions`] if `options` fail
    /// validation.
    pub fn new(
        options: Options,
        mut surface: S,
        executor: E,
    ) -> Result<Self, LiveMapError> {
        options.validate()?;

        let mut statics = StaticLayer::new();
        for route_id in &options.display.hidden_routes {
            statics.set_route_visible(route_id, false, &mut surface);
        }

        Ok(Self {
            animator: Animator::from_options(&options.animation),
            reconciler: Reconciler::new(
                &options.display.default_vehicle_color,
            ),
            cadence: PollCadence::new(options.polling.interval()),
            registry: ProxyRegistry::new(),
            last_snapshot_cycle: None,
            last_static_cycle: None,
            stats: LiveMapStats::default(),
            options,
            surface,
            executor,
            statics,
        })
    }

    /// Run one cooperative turn at `now`.
    pub fn tick(&mut self, now: Instant) -> TickSummary {
        let mut summary = TickSummary::default();

        if let Some(request) = self.cadence.poll(now) {
            log::debug!(
                "cycle {}: requesting {:?}",
                request.cycle,
                request.scope
            );
            self.executor.submit(request);
            self.stats.cycles_requested += 1;
            summary.submitted = Some(request);
        }

        // Snapshot side is read first. Executors publish a cycle's statics
        // no later than its snapshot, so this read order never sees a full
        // cycle's vehicles without its routes.
        let snapshot = self.executor.try_recv_snapshot();

        if let Some(outcome) = self.executor.try_recv_statics() {
            let _ = self.apply_statics(outcome);
            summary.statics_received = true;
        }

        if let Some(outcome) = snapshot {
            summary.snapshot = Some(match outcome {
                SnapshotOutcome::Ready(snapshot) => {
                    self.apply_snapshot(&snapshot)
                }
                SnapshotOutcome::Failed { cycle, error } => {
                    self.skip_cycle(cycle, error)
                }
            });
        }

        summary.animating =
            self.animator.tick(&mut self.registry, &mut self.surface);
        self.stats.frames += 1;
        summary
    }

    /// Fetch routes, stations and vehicles on the next tick.
    pub fn request_refresh(&mut self) {
        self.cadence.request_refresh();
    }

    /// Show or hide a route's line and vehicles.
    pub fn set_route_visible(&mut self, route_id: &str, visible: bool) {
        self.statics
            .set_route_visible(route_id, visible, &mut self.surface);
    }

    /// Turn smooth motion on or off. Turning it off snaps in-flight
    /// animations to their targets.
    pub fn set_animations_enabled(&mut self, enabled: bool) {
        self.animator.set_enabled(enabled);
        if !enabled {
            let _ =
                self.animator.skip_all(&mut self.registry, &mut self.surface);
        }
    }

    fn skip_cycle(
        &mut self,
        cycle: u64,
        error: FeedError,
    ) -> SnapshotDisposition {
        if error.is_unavailable() {
            log::info!("cycle {cycle}: {error}, keeping last state");
        } else {
            log::warn!("cycle {cycle}: {error}, keeping last state");
        }
        self.stats.snapshots_failed += 1;
        SnapshotDisposition::Skipped(error)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::thread;

    use web_time::Duration;

    use super::*;
    use crate::animation::DEFAULT_DURATION_FRAMES;
    use crate::feed::scripted::ScriptedFeed;
    use crate::feed::{
        EntityRecord, RouteDef, Snapshot, StaticMarker, TransitFeed,
    };
    use crate::geo::Position;
    use crate::poll::{
        run_fetch, FetchScope, FetchWorker, InlineExecutor, StaticOutcome,
    };
    use crate::surface::MemorySurface;

    type TestMap = LiveMap<MemorySurface, InlineExecutor<ScriptedFeed>>;

    const A: Position = Position::new(4.90, 52.36);
    const B: Position = Position::new(4.91, 52.37);
    const INTERVAL: Duration = Duration::from_secs(3);
    const FRAME: Duration = Duration::from_millis(16);

    fn train(id: &str, position: Position) -> EntityRecord {
        EntityRecord::new(id, "50", position)
    }

    fn line_50() -> RouteDef {
        RouteDef {
            id: "50".to_owned(),
            name: "50".to_owned(),
            color: "FF4500".to_owned(),
            route_id: "50".to_owned(),
            shape: vec![[4.90, 52.36], [4.91, 52.37]],
            stations: Vec::new(),
        }
    }

    fn map_with(feed: ScriptedFeed, options: Options) -> TestMap {
        LiveMap::new(options, MemorySurface::new(), InlineExecutor::new(feed))
            .unwrap()
    }

    fn map(feed: ScriptedFeed) -> TestMap {
        map_with(feed, Options::default())
    }

    fn shown(map: &TestMap, id: &str) -> Position {
        let handle = map.registry().get(id).unwrap().handle();
        map.surface().position(handle).unwrap()
    }

    #[test]
    fn train_glides_then_leaves() {
        let mut feed = ScriptedFeed::default();
        feed.push(vec![train("T1", A)]);
        feed.push(vec![train("T1", B)]);
        feed.push(Vec::new());
        let mut map = map(feed);
        let t0 = Instant::now();

        let summary = map.tick(t0);
        assert_eq!(summary.submitted.unwrap().scope, FetchScope::Full);
        assert!(matches!(
            summary.snapshot,
            Some(SnapshotDisposition::Applied(ReconcileReport {
                created: 1,
                ..
            }))
        ));
        assert_eq!(shown(&map, "T1"), A);

        // No fetch is due between polls.
        assert!(map.tick(t0 + FRAME).submitted.is_none());

        let t1 = t0 + INTERVAL;
        let summary = map.tick(t1);
        assert_eq!(summary.submitted.unwrap().scope, FetchScope::EntitiesOnly);
        assert_eq!(summary.animating, 1);
        for _ in 1..DEFAULT_DURATION_FRAMES - 1 {
            assert_eq!(map.tick(t1).animating, 1);
        }
        assert_ne!(shown(&map, "T1"), B);
        assert_eq!(map.tick(t1).animating, 0);
        let at_end = shown(&map, "T1");
        assert_eq!(at_end.longitude.to_bits(), B.longitude.to_bits());
        assert_eq!(at_end.latitude.to_bits(), B.latitude.to_bits());

        let summary = map.tick(t0 + INTERVAL * 2);
        assert!(matches!(
            summary.snapshot,
            Some(SnapshotDisposition::Applied(ReconcileReport {
                removed: 1,
                ..
            }))
        ));
        assert_eq!(map.vehicle_count(), 0);
        assert!(map.surface().is_empty());
    }

    #[test]
    fn outage_keeps_last_state() {
        let mut feed = ScriptedFeed::default();
        feed.push(vec![train("T1", A), train("T2", B)]);
        feed.push_outage();
        let mut map = map(feed);
        let t0 = Instant::now();
        let _ = map.tick(t0);
        let before: Vec<_> = map
            .surface()
            .proxies()
            .map(|(h, p)| (h, p.position))
            .collect();

        let summary = map.tick(t0 + INTERVAL);
        assert!(matches!(
            summary.snapshot,
            Some(SnapshotDisposition::Skipped(FeedError::Unavailable(_)))
        ));
        assert_eq!(map.vehicle_count(), 2);
        for (handle, position) in before {
            assert_eq!(map.surface().position(handle), Some(position));
        }
        assert_eq!(map.stats().snapshots_failed, 1);
        assert_eq!(map.last_snapshot_cycle(), Some(1));
    }

    #[test]
    fn stale_snapshot_is_discarded() {
        let mut map = map(ScriptedFeed::default());
        let _ = map.apply_snapshot(&Snapshot::new(5, vec![train("T1", A)]));

        let late = Snapshot::new(4, vec![train("T1", B), train("T2", B)]);
        assert_eq!(
            map.apply_snapshot(&late),
            SnapshotDisposition::Stale { cycle: 4 }
        );
        assert_eq!(map.vehicle_count(), 1);
        assert_eq!(map.registry().get("T1").unwrap().target(), A);
        assert_eq!(map.stats().snapshots_stale, 1);
    }

    #[test]
    fn stale_guard_can_be_disabled() {
        let mut options = Options::default();
        options.polling.discard_stale = false;
        let mut map = map_with(ScriptedFeed::default(), options);
        let _ = map.apply_snapshot(&Snapshot::new(5, vec![train("T1", A)]));
        let late = Snapshot::new(4, vec![train("T1", B)]);
        assert!(matches!(
            map.apply_snapshot(&late),
            SnapshotDisposition::Applied(_)
        ));
        assert_eq!(map.registry().get("T1").unwrap().target(), B);
        assert_eq!(map.last_snapshot_cycle(), Some(5));
    }

    #[test]
    fn refresh_fetches_statics_again() {
        let mut feed = ScriptedFeed::default();
        feed.routes = vec![line_50()];
        let mut map = map(feed);
        let t0 = Instant::now();
        let summary = map.tick(t0);
        assert!(summary.statics_received);
        assert_eq!(map.statics().route_count(), 1);

        map.request_refresh();
        let summary = map.tick(t0 + FRAME);
        assert_eq!(summary.submitted.unwrap().scope, FetchScope::Full);
        assert_eq!(map.executor().feed().static_calls, 2);
        assert_eq!(map.stats().statics_applied, 2);
    }

    #[test]
    fn static_failure_keeps_previous_routes() {
        let mut feed = ScriptedFeed::default();
        feed.routes = vec![line_50()];
        let mut map = map(feed);
        let t0 = Instant::now();
        let _ = map.tick(t0);
        let handle = map.statics().route_handle("50").unwrap();

        map.executor_mut().feed_mut().static_error =
            Some(FeedError::Timeout);
        map.request_refresh();
        let summary = map.tick(t0 + FRAME);
        assert!(summary.statics_received);
        assert_eq!(map.statics().route_handle("50"), Some(handle));
        assert!(map.surface().get(handle).is_some());
        assert_eq!(map.stats().statics_failed, 2);
    }

    #[test]
    fn vehicles_take_line_colors() {
        let mut feed = ScriptedFeed::default();
        feed.routes = vec![line_50()];
        feed.push(vec![train("T1", A)]);
        let mut map = map(feed);
        let _ = map.tick(Instant::now());
        assert_eq!(map.registry().get("T1").unwrap().spec().color, "FF4500");
    }

    #[test]
    fn hidden_routes_hide_new_vehicles() {
        let mut feed = ScriptedFeed::default();
        feed.push(vec![train("T1", A), EntityRecord::new("T9", "51", B)]);
        let mut options = Options::default();
        options.display.hidden_routes = vec!["50".to_owned()];
        let mut map = map_with(feed, options);
        let _ = map.tick(Instant::now());

        let hidden = map.registry().get("T1").unwrap().handle();
        assert!(!map.surface().get(hidden).unwrap().visible);
        assert_eq!(map.surface().visible_count(), 1);

        map.set_route_visible("50", true);
        assert_eq!(map.surface().visible_count(), 2);
    }

    #[test]
    fn disabling_animation_snaps_to_target() {
        let mut feed = ScriptedFeed::default();
        feed.push(vec![train("T1", A)]);
        feed.push(vec![train("T1", B)]);
        let mut map = map(feed);
        let t0 = Instant::now();
        let _ = map.tick(t0);
        let _ = map.tick(t0 + INTERVAL);
        assert_eq!(map.animating_count(), 1);

        map.set_animations_enabled(false);
        assert_eq!(map.animating_count(), 0);
        assert_eq!(shown(&map, "T1"), B);
    }

    #[test]
    fn invalid_options_are_rejected() {
        let mut options = Options::default();
        options.animation.frame_rate = 0;
        let result = LiveMap::new(
            options,
            MemorySurface::new(),
            InlineExecutor::new(ScriptedFeed::default()),
        );
        assert!(matches!(result, Err(LiveMapError::InvalidOptions(_))));
    }

    /// Holds each fetch back until the snapshot side is read, like a worker
    /// that finishes between the engine's two reads.
    struct LatePublisher {
        feed: ScriptedFeed,
        pending: Option<(Option<StaticOutcome>, SnapshotOutcome)>,
        statics: Option<StaticOutcome>,
    }

    impl FetchExecutor for LatePublisher {
        fn submit(&mut self, request: FetchRequest) {
            self.pending = Some(run_fetch(&mut self.feed, request));
        }

        fn try_recv_statics(&mut self) -> Option<StaticOutcome> {
            self.statics.take()
        }

        fn try_recv_snapshot(&mut self) -> Option<SnapshotOutcome> {
            let (statics, snapshot) = self.pending.take()?;
            if statics.is_some() {
                self.statics = statics;
            }
            Some(snapshot)
        }
    }

    #[test]
    fn late_statics_still_color_the_first_vehicles() {
        let mut feed = ScriptedFeed::default();
        feed.routes = vec![line_50()];
        feed.push(vec![train("T1", A)]);
        let executor = LatePublisher {
            feed,
            pending: None,
            statics: None,
        };
        let mut map =
            LiveMap::new(Options::default(), MemorySurface::new(), executor)
                .unwrap();

        let summary = map.tick(Instant::now());
        assert!(summary.statics_received);
        assert!(matches!(
            summary.snapshot,
            Some(SnapshotDisposition::Applied(_))
        ));
        assert_eq!(map.registry().get("T1").unwrap().spec().color, "FF4500");
    }

    /// Scripted feed whose `block_on`-th snapshot fetch waits for the gate.
    struct GatedFeed {
        inner: ScriptedFeed,
        gate: mpsc::Receiver<()>,
        block_on: usize,
    }

    impl TransitFeed for GatedFeed {
        fn name(&self) -> &str {
            "gated"
        }

        fn fetch_routes(&mut self) -> Result<Vec<RouteDef>, FeedError> {
            self.inner.fetch_routes()
        }

        fn fetch_markers(&mut self) -> Result<Vec<StaticMarker>, FeedError> {
            self.inner.fetch_markers()
        }

        fn fetch_entity_snapshot(
            &mut self,
        ) -> Result<Vec<EntityRecord>, FeedError> {
            if self.inner.snapshot_calls + 1 == self.block_on {
                // Bounded so a failing test cannot hang the worker join.
                let _ = self.gate.recv_timeout(Duration::from_secs(5));
            }
            self.inner.fetch_entity_snapshot()
        }
    }

    fn tick_until_snapshot<E: FetchExecutor>(
        map: &mut LiveMap<MemorySurface, E>,
        now: Instant,
    ) -> SnapshotDisposition {
        for _ in 0..1000 {
            if let Some(disposition) = map.tick(now).snapshot {
                return disposition;
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!("no snapshot from worker");
    }

    #[test]
    fn frames_advance_while_a_fetch_is_blocked() {
        let (release, gate) = mpsc::channel();
        let mut inner = ScriptedFeed::default();
        inner.push(vec![train("T1", A)]);
        inner.push(vec![train("T1", B)]);
        inner.push(vec![train("T1", B)]);
        let feed = GatedFeed {
            inner,
            gate,
            block_on: 3,
        };
        let mut options = Options::default();
        options.animation.duration_frames = 10;
        let worker = FetchWorker::spawn(feed).unwrap();
        let mut map =
            LiveMap::new(options, MemorySurface::new(), worker).unwrap();
        let t0 = Instant::now();

        assert!(matches!(
            tick_until_snapshot(&mut map, t0),
            SnapshotDisposition::Applied(ReconcileReport { created: 1, .. })
        ));
        assert!(matches!(
            tick_until_snapshot(&mut map, t0 + INTERVAL),
            SnapshotDisposition::Applied(ReconcileReport { moved: 1, .. })
        ));
        assert_eq!(map.animating_count(), 1);

        // Third cycle: the worker sits in the gated fetch from here on.
        let summary = map.tick(t0 + INTERVAL * 2);
        assert!(summary.submitted.is_some());
        let mut frames = 1;
        let mut animating = summary.animating;
        while animating > 0 && frames < 20 {
            let summary = map.tick(t0 + INTERVAL * 2);
            assert!(summary.snapshot.is_none());
            animating = summary.animating;
            frames += 1;
        }
        assert_eq!(animating, 0);
        let handle = map.registry().get("T1").unwrap().handle();
        let shown = map.surface().position(handle).unwrap();
        assert_eq!(shown.longitude.to_bits(), B.longitude.to_bits());
        assert_eq!(shown.latitude.to_bits(), B.latitude.to_bits());
        assert_eq!(map.stats().snapshots_applied, 2);

        release.send(()).unwrap();
    }
}
