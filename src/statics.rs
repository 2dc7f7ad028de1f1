//! Route lines and station markers.
//!
//! Static proxies change only on a full refresh. Each kind is kept in its own
//! id-keyed table and synced the same way vehicles are: new ids attach,
//! changed ids restyle or move in place, missing ids detach.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::feed::{RouteDef, StaticMarker};
use crate::geo::Position;
use crate::surface::{ProxyHandle, ProxyKind, VisualSpec, VisualSurface};

/// Marker color when a station has no line color.
const STATION_COLOR: &str = "FFFFFF";

/// Counts produced by one static sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StaticReport {
    /// Proxies attached.
    pub attached: usize,
    /// Proxies restyled or moved.
    pub updated: usize,
    /// Proxies detached.
    pub detached: usize,
    /// Definitions rejected as malformed or duplicate.
    pub dropped: usize,
}

#[derive(Debug, Clone, PartialEq)]
struct StaticProxy {
    handle: ProxyHandle,
    position: Position,
    spec: VisualSpec,
}

/// Attached route lines and station markers plus route visibility.
#[derive(Debug, Default)]
pub struct StaticLayer {
    routes: FxHashMap<String, StaticProxy>,
    markers: FxHashMap<String, StaticProxy>,
    /// Route key → hex color, from the last route sync.
    colors: FxHashMap<String, String>,
    hidden: FxHashSet<String>,
}

impl StaticLayer {
    /// Empty layer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of attached route lines.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Number of attached station markers.
    #[must_use]
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Handle of the line drawn for route `id`.
    #[must_use]
    pub fn route_handle(&self, id: &str) -> Option<ProxyHandle> {
        self.routes.get(id).map(|p| p.handle)
    }

    /// Handle of the marker for station `id`.
    #[must_use]
    pub fn marker_handle(&self, id: &str) -> Option<ProxyHandle> {
        self.markers.get(id).map(|p| p.handle)
    }

    /// Route key → color table for coloring vehicles. Keyed by both the
    /// GTFS route id and the line id.
    #[must_use]
    pub fn route_colors(&self) -> FxHashMap<String, String> {
        self.colors.clone()
    }

    /// Whether `route_id` is currently hidden.
    #[must_use]
    pub fn is_hidden(&self, route_id: &str) -> bool {
        self.hidden.contains(route_id)
    }

    /// Hidden route ids, ordered.
    #[must_use]
    pub fn hidden_routes(&self) -> Vec<&str> {
        let mut hidden: Vec<&str> =
            self.hidden.iter().map(String::as_str).collect();
        hidden.sort_unstable();
        hidden
    }

    /// Sync route lines with `routes`. Routes without an id or without a
    /// single valid vertex are dropped.
    pub fn apply_routes<S: VisualSurface + ?Sized>(
        &mut self,
        routes: &[RouteDef],
        surface: &mut S,
    ) -> StaticReport {
        let mut colors = FxHashMap::default();
        let mut wanted = Vec::with_capacity(routes.len());
        let mut dropped = 0;

        for route in routes {
            let path = route.path();
            let Some(&first) = path.first() else {
                log::warn!("dropping route {:?}: no valid geometry", route.id);
                dropped += 1;
                continue;
            };
            if !route.color.is_empty() {
                for key in [route.id.as_str(), route.key()] {
                    drop(colors.insert(key.to_owned(), route.color.clone()));
                }
            }
            let spec = VisualSpec {
                kind: ProxyKind::RouteLine { path },
                route_id: Some(route.key().to_owned()),
                label: route.name.clone(),
                color: route.color.clone(),
            };
            wanted.push((route.id.as_str(), first, spec));
        }

        let mut report = sync(&mut self.routes, wanted, surface);
        report.dropped += dropped;
        self.colors = colors;
        if report.attached > 0 {
            self.reapply_hidden(surface);
        }
        log::debug!(
            "routes: {} attached, {} updated, {} detached",
            report.attached,
            report.updated,
            report.detached
        );
        report
    }

    /// Sync station markers with `markers`. Markers without an id or with an
    /// invalid position are dropped.
    pub fn apply_markers<S: VisualSurface + ?Sized>(
        &mut self,
        markers: &[StaticMarker],
        surface: &mut S,
    ) -> StaticReport {
        let mut wanted = Vec::with_capacity(markers.len());
        let mut dropped = 0;

        for marker in markers {
            let position = match marker.position() {
                Ok(position) => position,
                Err(e) => {
                    log::warn!("dropping station {:?}: {e}", marker.id);
                    dropped += 1;
                    continue;
                }
            };
            let color = marker
                .routes
                .first()
                .and_then(|r| self.colors.get(r))
                .map_or(STATION_COLOR, String::as_str);
            let spec = VisualSpec {
                kind: ProxyKind::Station,
                route_id: None,
                label: marker.name.clone(),
                color: color.to_owned(),
            };
            wanted.push((marker.id.as_str(), position, spec));
        }

        let mut report = sync(&mut self.markers, wanted, surface);
        report.dropped += dropped;
        log::debug!(
            "stations: {} attached, {} updated, {} detached",
            report.attached,
            report.updated,
            report.detached
        );
        report
    }

    /// Show or hide a route's line and vehicles.
    pub fn set_route_visible<S: VisualSurface + ?Sized>(
        &mut self,
        route_id: &str,
        visible: bool,
        surface: &mut S,
    ) {
        let changed = if visible {
            self.hidden.remove(route_id)
        } else {
            self.hidden.insert(route_id.to_owned())
        };
        if changed {
            log::info!(
                "route {route_id} {}",
                if visible { "shown" } else { "hidden" }
            );
        }
        surface.set_route_visible(route_id, visible);
    }

    /// Push every hidden route to the surface again, so proxies attached
    /// since the toggle are hidden too.
    pub fn reapply_hidden<S: VisualSurface + ?Sized>(&self, surface: &mut S) {
        for route_id in self.hidden_routes() {
            surface.set_route_visible(route_id, false);
        }
    }

    /// Detach every static proxy.
    pub fn clear<S: VisualSurface + ?Sized>(&mut self, surface: &mut S) {
        for (_, proxy) in self.routes.drain().chain(self.markers.drain()) {
            surface.detach_proxy(proxy.handle);
        }
        self.colors.clear();
    }
}

/// Bring `table` in line with `wanted`. The first definition of an id wins.
fn sync<S: VisualSurface + ?Sized>(
    table: &mut FxHashMap<String, StaticProxy>,
    wanted: Vec<(&str, Position, VisualSpec)>,
    surface: &mut S,
) -> StaticReport {
    let mut report = StaticReport::default();
    let mut seen: FxHashSet<String> = FxHashSet::default();

    for (id, position, spec) in wanted {
        if id.is_empty() || !seen.insert(id.to_owned()) {
            report.dropped += 1;
            continue;
        }
        match table.get_mut(id) {
            Some(proxy) => {
                let mut touched = false;
                if proxy.spec != spec {
                    surface.restyle_proxy(proxy.handle, &spec);
                    proxy.spec = spec;
                    touched = true;
                }
                if proxy.position != position {
                    surface.set_proxy_position(proxy.handle, position);
                    proxy.position = position;
                    touched = true;
                }
                if touched {
                    report.updated += 1;
                }
            }
            None => {
                let handle = surface.attach_proxy(position, &spec);
                drop(table.insert(
                    id.to_owned(),
                    StaticProxy {
                        handle,
                        position,
                        spec,
                    },
                ));
                report.attached += 1;
            }
        }
    }

    let mut absent: Vec<String> = table
        .keys()
        .filter(|id| !seen.contains(*id))
        .cloned()
        .collect();
    absent.sort_unstable();
    for id in absent {
        if let Some(proxy) = table.remove(&id) {
            surface.detach_proxy(proxy.handle);
            report.detached += 1;
        }
    }
    report
}
