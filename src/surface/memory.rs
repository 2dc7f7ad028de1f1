use rustc_hash::{FxHashMap, FxHashSet};

use super::{ProxyHandle, VisualSpec, VisualSurface};
use crate::geo::Position;

/// State of one proxy held by a [`MemorySurface`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyRecord {
    /// Last position committed to the proxy.
    pub position: Position,
    /// Current styling.
    pub spec: VisualSpec,
    /// Whether the proxy's route layer is shown.
    pub visible: bool,
}

/// One call received by a [`MemorySurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// A proxy was attached.
    Attached(ProxyHandle, Position),
    /// A proxy was moved.
    Moved(ProxyHandle, Position),
    /// A proxy was restyled.
    Restyled(ProxyHandle),
    /// A proxy was detached.
    Detached(ProxyHandle),
    /// A route layer was shown or hidden.
    RouteVisibility {
        /// Route the toggle applied to.
        route_id: String,
        /// New visibility.
        visible: bool,
    },
}

/// In-memory surface that records the scene and, optionally, every call.
#[derive(Debug)]
pub struct MemorySurface {
    proxies: FxHashMap<ProxyHandle, ProxyRecord>,
    hidden_routes: FxHashSet<String>,
    next_handle: u64,
    events: Vec<SurfaceEvent>,
    record_events: bool,
}

impl MemorySurface {
    /// Empty surface that records events.
    #[must_use]
    pub fn new() -> Self {
        Self {
            proxies: FxHashMap::default(),
            hidden_routes: FxHashSet::default(),
            next_handle: 1,
            events: Vec::new(),
            record_events: true,
        }
    }

    /// Empty surface that keeps only the scene, not the call log. Suited to
    /// long-running loops.
    #[must_use]
    pub fn without_event_log() -> Self {
        Self {
            record_events: false,
            ..Self::new()
        }
    }

    /// Number of live proxies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    /// Whether no proxies are attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Number of live proxies whose route layer is shown.
    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.proxies.values().filter(|p| p.visible).count()
    }

    /// Look up a live proxy.
    #[must_use]
    pub fn get(&self, handle: ProxyHandle) -> Option<&ProxyRecord> {
        self.proxies.get(&handle)
    }

    /// Last committed position of a live proxy.
    #[must_use]
    pub fn position(&self, handle: ProxyHandle) -> Option<Position> {
        self.proxies.get(&handle).map(|p| p.position)
    }

    /// All live proxies.
    pub fn proxies(
        &self,
    ) -> impl Iterator<Item = (ProxyHandle, &ProxyRecord)> + '_ {
        self.proxies.iter().map(|(h, p)| (*h, p))
    }

    /// Recorded calls, oldest first.
    #[must_use]
    pub fn events(&self) -> &[SurfaceEvent] {
        &self.events
    }

    /// Drain the recorded calls.
    pub fn take_events(&mut self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut self.events)
    }

    /// Number of recorded `Moved` events.
    #[must_use]
    pub fn move_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SurfaceEvent::Moved(..)))
            .count()
    }

    fn record(&mut self, event: SurfaceEvent) {
        if self.record_events {
            self.events.push(event);
        }
    }

    fn is_hidden(&self, spec: &VisualSpec) -> bool {
        spec.route_id
            .as_ref()
            .is_some_and(|r| self.hidden_routes.contains(r))
    }
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self::new()
    }
}

impl VisualSurface for MemorySurface {
    fn attach_proxy(
        &mut self,
        position: Position,
        spec: &VisualSpec,
    ) -> ProxyHandle {
        let handle = ProxyHandle(self.next_handle);
        self.next_handle += 1;
        let visible = !self.is_hidden(spec);
        drop(self.proxies.insert(
            handle,
            ProxyRecord {
                position,
                spec: spec.clone(),
                visible,
            },
        ));
        self.record(SurfaceEvent::Attached(handle, position));
        handle
    }

    fn set_proxy_position(&mut self, handle: ProxyHandle, position: Position) {
        let Some(proxy) = self.proxies.get_mut(&handle) else {
            log::warn!("move of detached proxy {handle}");
            return;
        };
        proxy.position = position;
        self.record(SurfaceEvent::Moved(handle, position));
    }

    fn detach_proxy(&mut self, handle: ProxyHandle) {
        if self.proxies.remove(&handle).is_none() {
            log::warn!("detach of unknown proxy {handle}");
            return;
        }
        self.record(SurfaceEvent::Detached(handle));
    }

    fn restyle_proxy(&mut self, handle: ProxyHandle, spec: &VisualSpec) {
        let hidden = self.is_hidden(spec);
        let Some(proxy) = self.proxies.get_mut(&handle) else {
            log::warn!("restyle of detached proxy {handle}");
            return;
        };
        proxy.spec = spec.clone();
        proxy.visible = !hidden;
        self.record(SurfaceEvent::Restyled(handle));
    }

    fn set_route_visible(&mut self, route_id: &str, visible: bool) {
        if visible {
            let _ = self.hidden_routes.remove(route_id);
        } else {
            let _ = self.hidden_routes.insert(route_id.to_owned());
        }
        for proxy in self.proxies.values_mut() {
            if proxy.spec.on_route(route_id) {
                proxy.visible = visible;
            }
        }
        self.record(SurfaceEvent::RouteVisibility {
            route_id: route_id.to_owned(),
            visible,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(route: &str) -> VisualSpec {
        VisualSpec::vehicle(route, "T", "FFFFFF", None)
    }

    #[test]
    fn handles_are_unique() {
        let mut surface = MemorySurface::new();
        let a = surface.attach_proxy(Position::new(0.0, 0.0), &spec("50"));
        let b = surface.attach_proxy(Position::new(0.0, 0.0), &spec("50"));
        assert_ne!(a, b);
        assert_eq!(surface.len(), 2);
    }

    #[test]
    fn route_visibility_applies_to_existing_and_new_proxies() {
        let mut surface = MemorySurface::new();
        let a = surface.attach_proxy(Position::new(0.0, 0.0), &spec("50"));
        let b = surface.attach_proxy(Position::new(0.0, 0.0), &spec("51"));
        surface.set_route_visible("50", false);
        assert!(!surface.get(a).unwrap().visible);
        assert!(surface.get(b).unwrap().visible);

        let c = surface.attach_proxy(Position::new(1.0, 1.0), &spec("50"));
        assert!(!surface.get(c).unwrap().visible);
        assert_eq!(surface.visible_count(), 1);

        surface.set_route_visible("50", true);
        assert_eq!(surface.visible_count(), 3);
    }

    #[test]
    fn detach_and_move_are_recorded() {
        let mut surface = MemorySurface::new();
        let a = surface.attach_proxy(Position::new(0.0, 0.0), &spec("50"));
        surface.set_proxy_position(a, Position::new(1.0, 1.0));
        surface.detach_proxy(a);
        assert!(surface.is_empty());
        assert_eq!(surface.move_count(), 1);
        assert_eq!(surface.events().last(), Some(&SurfaceEvent::Detached(a)));
    }

    #[test]
    fn without_event_log_keeps_scene_only() {
        let mut surface = MemorySurface::without_event_log();
        let a = surface.attach_proxy(Position::new(0.0, 0.0), &spec("50"));
        surface.set_proxy_position(a, Position::new(2.0, 2.0));
        assert!(surface.events().is_empty());
        assert_eq!(surface.position(a), Some(Position::new(2.0, 2.0)));
    }
}
