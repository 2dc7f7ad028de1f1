//! Read-only queries and component access for [`LiveMap`].

use super::{LiveMap, LiveMapStats};
use crate::animation::Animator;
use crate::options::Options;
use crate::poll::PollCadence;
use crate::registry::ProxyRegistry;
use crate::statics::StaticLayer;

// ── Components ──

impl<S, E> LiveMap<S, E> {
    /// Options the engine was built with.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The rendering surface.
    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// The fetch executor.
    #[must_use]
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// The fetch executor, mutably. Used to reach the feed behind an inline
    /// executor.
    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    /// Vehicle proxies by identity.
    #[must_use]
    pub fn registry(&self) -> &ProxyRegistry {
        &self.registry
    }

    /// Route lines and station markers.
    #[must_use]
    pub fn statics(&self) -> &StaticLayer {
        &self.statics
    }

    /// The animator.
    #[must_use]
    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    /// The polling cadence.
    #[must_use]
    pub fn cadence(&self) -> &PollCadence {
        &self.cadence
    }
}

// ── Queries ──

impl<S, E> LiveMap<S, E> {
    /// Running totals.
    #[must_use]
    pub fn stats(&self) -> LiveMapStats {
        self.stats
    }

    /// Cycle of the last applied snapshot.
    #[must_use]
    pub fn last_snapshot_cycle(&self) -> Option<u64> {
        self.last_snapshot_cycle
    }

    /// Number of vehicles on the map.
    #[must_use]
    pub fn vehicle_count(&self) -> usize {
        self.registry.len()
    }

    /// Number of vehicles currently moving.
    #[must_use]
    pub fn animating_count(&self) -> usize {
        self.registry.animating_count()
    }

    /// Tear down into the surface and executor.
    pub fn into_parts(self) -> (S, E) {
        (self.surface, self.executor)
    }
}
