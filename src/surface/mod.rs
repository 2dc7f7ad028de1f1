//! Rendering surface abstraction.
//!
//! The engine never talks to a map library directly. Anything that can
//! attach, move, restyle and detach markers implements [`VisualSurface`];
//! [`MemorySurface`] keeps the scene in memory for tests and headless runs.

mod memory;

use std::fmt;

pub use memory::{MemorySurface, ProxyRecord, SurfaceEvent};

use crate::geo::Position;

/// Opaque handle to a proxy attached to a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProxyHandle(pub u64);

impl fmt::Display for ProxyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a proxy depicts.
#[derive(Debug, Clone, PartialEq)]
pub enum ProxyKind {
    /// A moving vehicle.
    Vehicle {
        /// Heading in degrees, when the feed reports one.
        bearing: Option<f64>,
    },
    /// A station marker.
    Station,
    /// A drawn route line.
    RouteLine {
        /// Line geometry.
        path: Vec<Position>,
    },
}

/// Everything a surface needs to draw a proxy besides its position.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualSpec {
    /// What the proxy depicts.
    pub kind: ProxyKind,
    /// Route association, used for layer visibility.
    pub route_id: Option<String>,
    /// Display label.
    pub label: String,
    /// Hex color without the leading `#`.
    pub color: String,
}

impl VisualSpec {
    /// Spec for a vehicle proxy.
    #[must_use]
    pub fn vehicle(
        route_id: &str,
        label: &str,
        color: &str,
        bearing: Option<f64>,
    ) -> Self {
        Self {
            kind: ProxyKind::Vehicle { bearing },
            route_id: (!route_id.is_empty()).then(|| route_id.to_owned()),
            label: label.to_owned(),
            color: color.to_owned(),
        }
    }

    /// Whether this proxy belongs to `route_id`.
    #[must_use]
    pub fn on_route(&self, route_id: &str) -> bool {
        self.route_id.as_deref() == Some(route_id)
    }
}

/// A surface that visual proxies can be attached to.
///
/// All calls happen on the engine's single execution context.
pub trait VisualSurface {
    /// Attach a new proxy at `position` and return its handle. Handles must
    /// be unique among live proxies.
    fn attach_proxy(
        &mut self,
        position: Position,
        spec: &VisualSpec,
    ) -> ProxyHandle;

    /// Move a live proxy.
    fn set_proxy_position(&mut self, handle: ProxyHandle, position: Position);

    /// Remove a proxy from the surface.
    fn detach_proxy(&mut self, handle: ProxyHandle);

    /// Replace a live proxy's styling without moving it.
    fn restyle_proxy(&mut self, handle: ProxyHandle, spec: &VisualSpec);

    /// Show or hide every proxy associated with `route_id`.
    fn set_route_visible(&mut self, route_id: &str, visible: bool);
}

impl<S: VisualSurface + ?Sized> VisualSurface for &mut S {
    fn attach_proxy(
        &mut self,
        position: Position,
        spec: &VisualSpec,
    ) -> ProxyHandle {
        (**self).attach_proxy(position, spec)
    }

    fn set_proxy_position(&mut self, handle: ProxyHandle, position: Position) {
        (**self).set_proxy_position(handle, position);
    }

    fn detach_proxy(&mut self, handle: ProxyHandle) {
        (**self).detach_proxy(handle);
    }

    fn restyle_proxy(&mut self, handle: ProxyHandle, spec: &VisualSpec) {
        (**self).restyle_proxy(handle, spec);
    }

    fn set_route_visible(&mut self, route_id: &str, visible: bool) {
        (**self).set_route_visible(route_id, visible);
    }
}
