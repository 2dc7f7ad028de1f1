//! Snapshot reconciliation.
//!
//! Diffs an incoming snapshot against the [`ProxyRegistry`] and turns the
//! difference into the smallest set of surface operations: new identities get
//! a proxy at their reported position, moved identities get an animation
//! toward their new position, and identities missing from the snapshot are
//! detached.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::animation::{AnimateOutcome, Animator};
use crate::error::LiveMapError;
use crate::feed::EntityRecord;
use crate::geo::Position;
use crate::registry::ProxyRegistry;
use crate::surface::{VisualSpec, VisualSurface};

/// Color used for vehicles whose route has no known color.
pub const DEFAULT_VEHICLE_COLOR: &str = "FF0000";

/// Counts produced by one [`Reconciler::reconcile`] pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileReport {
    /// Identities seen for the first time.
    pub created: usize,
    /// Known identities whose position changed.
    pub moved: usize,
    /// Known identities reported at their committed position.
    pub unchanged: usize,
    /// Identities detached because the snapshot no longer lists them.
    pub removed: usize,
    /// Records rejected as malformed or duplicate.
    pub dropped: usize,
    /// Known identities whose styling changed.
    pub restyled: usize,
    /// Animations started.
    pub scheduled: usize,
    /// Started animations that replaced one in flight.
    pub superseded: usize,
}

impl ReconcileReport {
    /// Whether the pass changed the set of proxies or any target.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.created + self.moved + self.removed + self.restyled > 0
    }
}

/// Turns entity snapshots into registry and surface changes.
#[derive(Debug, Clone)]
pub struct Reconciler {
    /// Route key → hex color.
    route_colors: FxHashMap<String, String>,
    default_color: String,
}

impl Reconciler {
    /// Reconciler that colors every vehicle with `default_color` until route
    /// colors are known.
    #[must_use]
    pub fn new(default_color: &str) -> Self {
        Self {
            route_colors: FxHashMap::default(),
            default_color: default_color.to_owned(),
        }
    }

    /// Replace the route color table.
    pub fn set_route_colors(&mut self, colors: FxHashMap<String, String>) {
        self.route_colors = colors;
    }

    /// Color for vehicles on `route_id`.
    #[must_use]
    pub fn color_for(&self, route_id: &str) -> &str {
        self.route_colors
            .get(route_id)
            .map_or(self.default_color.as_str(), String::as_str)
    }

    /// Styling for a record's proxy.
    #[must_use]
    pub fn spec_for(&self, record: &EntityRecord) -> VisualSpec {
        VisualSpec::vehicle(
            &record.route_id,
            record.label(),
            self.color_for(&record.route_id),
            record.bearing.filter(|b| b.is_finite()),
        )
    }

    /// Bring `registry` and `surface` in line with `records`.
    ///
    /// Malformed records and repeated identities are dropped one by one; the
    /// rest of the snapshot is still applied. After the call, the registered
    /// identities are exactly the valid identities of `records`.
    pub fn reconcile<S: VisualSurface + ?Sized>(
        &self,
        registry: &mut ProxyRegistry,
        animator: &mut Animator,
        surface: &mut S,
        records: &[EntityRecord],
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let mut seen: FxHashSet<&str> = FxHashSet::default();

        for record in records {
            let position = match validate(record) {
                Ok(position) => position,
                Err(e) => {
                    log::warn!("dropping record {:?}: {e}", record.id);
                    report.dropped += 1;
                    continue;
                }
            };
            if !seen.insert(record.id.as_str()) {
                log::warn!("dropping duplicate record for {}", record.id);
                report.dropped += 1;
                continue;
            }
            self.apply_record(
                registry,
                animator,
                surface,
                record,
                position,
                &mut report,
            );
        }

        let absent: Vec<String> = registry
            .identities()
            .into_iter()
            .filter(|id| !seen.contains(id))
            .map(str::to_owned)
            .collect();
        for id in absent {
            if registry.remove(&id, surface).is_some() {
                report.removed += 1;
            }
        }

        log::debug!(
            "reconciled {} records: +{} ~{} -{} (dropped {})",
            records.len(),
            report.created,
            report.moved,
            report.removed,
            report.dropped,
        );
        report
    }

    fn apply_record<S: VisualSurface + ?Sized>(
        &self,
        registry: &mut ProxyRegistry,
        animator: &mut Animator,
        surface: &mut S,
        record: &EntityRecord,
        position: Position,
        report: &mut ReconcileReport,
    ) {
        let spec = self.spec_for(record);

        let Some(entry) = registry.get_mut(&record.id) else {
            match registry.upsert(&record.id, position, spec, surface) {
                Ok(_) => report.created += 1,
                Err(e) => {
                    log::error!("dropping {}: {e}", record.id);
                    report.dropped += 1;
                }
            }
            return;
        };

        if entry.spec != spec {
            surface.restyle_proxy(entry.handle, &spec);
            entry.spec = spec;
            report.restyled += 1;
        }

        if entry.target == position {
            report.unchanged += 1;
            return;
        }

        let from = entry.target;
        entry.target = position;
        report.moved += 1;
        match animator.animate(entry, from, position) {
            AnimateOutcome::Scheduled => report.scheduled += 1,
            AnimateOutcome::Superseded => {
                report.scheduled += 1;
                report.superseded += 1;
            }
            AnimateOutcome::NoOp => {}
        }
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(DEFAULT_VEHICLE_COLOR)
    }
}

fn validate(record: &EntityRecord) -> Result<Position, LiveMapError> {
    if record.id.is_empty() {
        return Err(LiveMapError::MissingIdentity);
    }
    record.position()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::DEFAULT_DURATION_FRAMES;
    use crate::surface::{MemorySurface, SurfaceEvent};

    struct Harness {
        reconciler: Reconciler,
        registry: ProxyRegistry,
        animator: Animator,
        surface: MemorySurface,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                reconciler: Reconciler::default(),
                registry: ProxyRegistry::new(),
                animator: Animator::default(),
                surface: MemorySurface::new(),
            }
        }

        fn apply(&mut self, records: &[EntityRecord]) -> ReconcileReport {
            self.reconciler.reconcile(
                &mut self.registry,
                &mut self.animator,
                &mut self.surface,
                records,
            )
        }

        fn frames(&mut self, n: u32) {
            for _ in 0..n {
                let _ =
                    self.animator.tick(&mut self.registry, &mut self.surface);
            }
        }

        fn shown(&self, id: &str) -> Position {
            let handle = self.registry.get(id).unwrap().handle();
            self.surface.position(handle).unwrap()
        }
    }

    fn train(id: &str, lon: f64, lat: f64) -> EntityRecord {
        EntityRecord::new(id, "50", Position::new(lon, lat))
    }

    #[test]
    fn train_lifecycle() {
        let mut h = Harness::new();

        let report = h.apply(&[train("T1", 4.90, 52.36)]);
        assert_eq!(report.created, 1);
        assert_eq!(report.scheduled, 0);
        assert_eq!(h.shown("T1"), Position::new(4.90, 52.36));

        let report = h.apply(&[train("T1", 4.91, 52.37)]);
        assert_eq!(report.moved, 1);
        assert_eq!(report.scheduled, 1);

        h.frames(DEFAULT_DURATION_FRAMES - 1);
        assert_ne!(h.shown("T1"), Position::new(4.91, 52.37));
        h.frames(1);
        let shown = h.shown("T1");
        assert_eq!(shown.longitude.to_bits(), 4.91_f64.to_bits());
        assert_eq!(shown.latitude.to_bits(), 52.37_f64.to_bits());

        let handle = h.registry.get("T1").unwrap().handle();
        let report = h.apply(&[]);
        assert_eq!(report.removed, 1);
        assert!(h.registry.is_empty());
        assert!(h.surface.is_empty());
        assert_eq!(
            h.surface.events().last(),
            Some(&SurfaceEvent::Detached(handle))
        );
    }

    #[test]
    fn same_snapshot_twice_is_stable() {
        let mut h = Harness::new();
        let snapshot = [train("A", 4.90, 52.36), train("B", 4.95, 52.30)];
        let _ = h.apply(&snapshot);
        let _ = h.surface.take_events();

        let report = h.apply(&snapshot);
        assert_eq!(report.unchanged, 2);
        assert_eq!(report.scheduled, 0);
        assert!(!report.has_changes());
        assert!(h.surface.events().is_empty());
    }

    #[test]
    fn registry_tracks_latest_snapshot() {
        let mut h = Harness::new();
        let snapshots = [
            vec![train("A", 1.0, 1.0), train("B", 2.0, 2.0)],
            vec![train("B", 2.5, 2.0), train("C", 3.0, 3.0)],
            vec![train("D", 4.0, 4.0)],
            vec![],
        ];
        for snapshot in &snapshots {
            let _ = h.apply(snapshot);
            let expected: Vec<&str> =
                snapshot.iter().map(|r| r.id.as_str()).collect();
            let actual: Vec<&str> =
                h.registry.identities().into_iter().collect();
            assert_eq!(actual, expected);
            assert_eq!(h.surface.len(), snapshot.len());
        }
    }

    #[test]
    fn creation_order_does_not_matter() {
        let a = train("A", 4.90, 52.36);
        let b = train("B", 4.95, 52.30);

        let mut forward = Harness::new();
        let _ = forward.apply(&[a.clone(), b.clone()]);
        let mut reverse = Harness::new();
        let _ = reverse.apply(&[b, a]);

        for h in [&forward, &reverse] {
            assert_eq!(h.registry.len(), 2);
            assert_eq!(h.shown("A"), Position::new(4.90, 52.36));
            assert_eq!(h.shown("B"), Position::new(4.95, 52.30));
            assert!(!h.registry.get("A").unwrap().is_animating());
        }
    }

    #[test]
    fn mixed_snapshot_order_does_not_matter() {
        let start = [
            train("A", 1.0, 1.0),
            train("B", 2.0, 2.0),
            train("C", 3.0, 3.0),
            train("D", 4.0, 4.0),
            train("G", 5.0, 5.0),
        ];
        let in_flight = [
            train("A", 1.2, 1.0),
            train("B", 2.0, 2.0),
            train("C", 3.0, 3.0),
            train("D", 4.0, 4.0),
            train("G", 5.0, 5.0),
        ];
        // A is superseded mid-flight, G starts moving, B stays put, E is
        // new, C and D are gone.
        let mixed = vec![
            train("A", 1.5, 1.0),
            train("B", 2.0, 2.0),
            train("E", 6.0, 6.0),
            train("G", 5.5, 5.0),
        ];
        let mut reversed = mixed.clone();
        reversed.reverse();

        let run = |records: &[EntityRecord]| {
            let mut h = Harness::new();
            let _ = h.apply(&start);
            let _ = h.apply(&in_flight);
            h.frames(5);
            let _ = h.surface.take_events();
            let report = h.apply(records);
            let detached: Vec<SurfaceEvent> = h
                .surface
                .events()
                .iter()
                .filter(|e| matches!(e, SurfaceEvent::Detached(_)))
                .cloned()
                .collect();
            (report, h, detached)
        };
        let (forward_report, forward, forward_detached) = run(&mixed);
        let (reverse_report, reverse, reverse_detached) = run(&reversed);

        assert_eq!(forward_report, reverse_report);
        assert_eq!(forward_report.created, 1);
        assert_eq!(forward_report.moved, 2);
        assert_eq!(forward_report.unchanged, 1);
        assert_eq!(forward_report.removed, 2);
        assert_eq!(forward_report.scheduled, 2);
        assert_eq!(forward_report.superseded, 1);
        assert_eq!(forward_detached.len(), 2);
        assert_eq!(forward_detached, reverse_detached);

        for id in ["A", "B", "E", "G"] {
            let f = forward.registry.get(id).unwrap();
            let r = reverse.registry.get(id).unwrap();
            assert_eq!(f.animation(), r.animation(), "{id}");
            assert_eq!(f.target(), r.target(), "{id}");
        }
        assert!(forward.registry.get("A").unwrap().is_animating());
        assert!(forward.registry.get("G").unwrap().is_animating());
        assert!(!forward.registry.get("B").unwrap().is_animating());
    }

    #[test]
    fn move_mid_flight_restarts_from_shown_position() {
        let mut h = Harness::new();
        let _ = h.apply(&[train("T1", 4.90, 52.36)]);
        let _ = h.apply(&[train("T1", 4.91, 52.37)]);
        h.frames(25);
        let at_cancel = h.shown("T1");

        let report = h.apply(&[train("T1", 4.93, 52.35)]);
        assert_eq!(report.superseded, 1);

        let entry = h.registry.get("T1").unwrap();
        assert_eq!(entry.target(), Position::new(4.93, 52.35));
        let transition = entry.animation().transition().unwrap();
        assert_eq!(transition.from(), at_cancel);
        assert_eq!(transition.to(), Position::new(4.93, 52.35));
    }

    #[test]
    fn malformed_and_duplicate_records_are_dropped() {
        let mut h = Harness::new();
        let missing_lat = EntityRecord {
            id: "X".to_owned(),
            longitude: Some(4.9),
            ..EntityRecord::default()
        };
        let records = [
            train("A", 4.90, 52.36),
            train("", 4.90, 52.36),
            missing_lat,
            train("B", f64::NAN, 52.0),
            train("C", 200.0, 52.0),
            train("A", 5.00, 52.00),
        ];
        let report = h.apply(&records);
        assert_eq!(report.created, 1);
        assert_eq!(report.dropped, 5);
        assert_eq!(h.shown("A"), Position::new(4.90, 52.36));
        assert_eq!(h.registry.len(), 1);
    }

    #[test]
    fn metadata_change_restyles_without_moving() {
        let mut h = Harness::new();
        let mut record = train("T1", 4.90, 52.36);
        record.bearing = Some(90.0);
        let _ = h.apply(std::slice::from_ref(&record));
        let _ = h.surface.take_events();

        record.bearing = Some(180.0);
        let report = h.apply(std::slice::from_ref(&record));
        assert_eq!(report.restyled, 1);
        assert_eq!(report.scheduled, 0);
        let handle = h.registry.get("T1").unwrap().handle();
        assert_eq!(h.surface.events(), &[SurfaceEvent::Restyled(handle)]);
    }

    #[test]
    fn vehicles_take_their_route_color() {
        let mut h = Harness::new();
        let mut colors = FxHashMap::default();
        drop(colors.insert("50".to_owned(), "32CD32".to_owned()));
        h.reconciler.set_route_colors(colors);
        let _ = h.apply(&[
            train("A", 4.90, 52.36),
            EntityRecord::new("B", "99", Position::new(4.9, 52.3)),
        ]);
        assert_eq!(h.registry.get("A").unwrap().spec().color, "32CD32");
        assert_eq!(
            h.registry.get("B").unwrap().spec().color,
            DEFAULT_VEHICLE_COLOR
        );
    }
}
