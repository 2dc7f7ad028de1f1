//! Applying fetched data to the registry, static layer and surface.

use super::{LiveMap, SnapshotDisposition};
use crate::feed::Snapshot;
use crate::poll::{FetchExecutor, StaticOutcome};
use crate::surface::VisualSurface;

impl<S: VisualSurface, E: FetchExecutor> LiveMap<S, E> {
    /// Reconcile `snapshot` into the registry.
    ///
    /// With `polling.discard_stale` set, a snapshot whose cycle is not newer
    /// than the last applied one is ignored.
    pub fn apply_snapshot(
        &mut self,
        snapshot: &Snapshot,
    ) -> SnapshotDisposition {
        if self.is_stale(self.last_snapshot_cycle, snapshot.cycle) {
            log::debug!("cycle {}: stale snapshot discarded", snapshot.cycle);
            self.stats.snapshots_stale += 1;
            return SnapshotDisposition::Stale {
                cycle: snapshot.cycle,
            };
        }

        let report = self.reconciler.reconcile(
            &mut self.registry,
            &mut self.animator,
            &mut self.surface,
            &snapshot.entities,
        );
        if report.created > 0 {
            self.statics.reapply_hidden(&mut self.surface);
        }

        self.last_snapshot_cycle = Some(
            self.last_snapshot_cycle
                .map_or(snapshot.cycle, |last| last.max(snapshot.cycle)),
        );
        self.stats.snapshots_applied += 1;
        log::debug!(
            "cycle {}: {} vehicles, {} animating",
            snapshot.cycle,
            self.registry.len(),
            self.registry.animating_count()
        );
        SnapshotDisposition::Applied(report)
    }

    /// Apply fetched routes and stations. A part that failed to fetch keeps
    /// what is already on the surface. Returns whether anything was applied.
    pub fn apply_statics(&mut self, outcome: StaticOutcome) -> bool {
        if self.is_stale(self.last_static_cycle, outcome.cycle) {
            log::debug!("cycle {}: stale static data discarded", outcome.cycle);
            return false;
        }
        self.last_static_cycle = Some(outcome.cycle);

        let mut applied = false;
        match outcome.routes {
            Ok(routes) => {
                let _ = self.statics.apply_routes(&routes, &mut self.surface);
                self.reconciler.set_route_colors(self.statics.route_colors());
                applied = true;
            }
            Err(e) => {
                log::warn!("cycle {}: routes unavailable: {e}", outcome.cycle);
                self.stats.statics_failed += 1;
            }
        }
        // Stations are colored from the route table, so they go second.
        match outcome.markers {
            Ok(markers) => {
                let _ = self.statics.apply_markers(&markers, &mut self.surface);
                applied = true;
            }
            Err(e) => {
                log::warn!(
                    "cycle {}: stations unavailable: {e}",
                    outcome.cycle
                );
                self.stats.statics_failed += 1;
            }
        }

        if applied {
            self.stats.statics_applied += 1;
        }
        applied
    }

    fn is_stale(&self, last: Option<u64>, cycle: u64) -> bool {
        self.options.polling.discard_stale
            && last.is_some_and(|last| cycle <= last)
    }
}
