//! Proxy registry: the sole owner of vehicle proxies.
//!
//! Maps each entity identity to the proxy attached for it, the committed
//! target position, the position last written to the proxy, and the
//! entry's animation state. Proxies are attached and detached only through
//! [`ProxyRegistry::upsert`] and [`ProxyRegistry::remove`]; mutable access to
//! entries never leaves the crate.

use std::collections::BTreeSet;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::animation::AnimationState;
use crate::error::LiveMapError;
use crate::feed::EntityId;
use crate::geo::Position;
use crate::surface::{ProxyHandle, VisualSpec, VisualSurface};

/// One registered entity.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntry {
    pub(crate) id: EntityId,
    pub(crate) handle: ProxyHandle,
    /// Last committed target; what the next snapshot is diffed against.
    pub(crate) target: Position,
    /// Last position written to the proxy.
    pub(crate) displayed: Position,
    pub(crate) animation: AnimationState,
    pub(crate) spec: VisualSpec,
}

impl RegistryEntry {
    /// Entity identity.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Handle of the attached proxy.
    #[must_use]
    pub fn handle(&self) -> ProxyHandle {
        self.handle
    }

    /// Committed target position (the latest snapshot position).
    #[must_use]
    pub fn target(&self) -> Position {
        self.target
    }

    /// Position currently shown on the surface.
    #[must_use]
    pub fn displayed(&self) -> Position {
        self.displayed
    }

    /// Current animation state.
    #[must_use]
    pub fn animation(&self) -> &AnimationState {
        &self.animation
    }

    /// Whether a transition is in flight.
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.animation.is_animating()
    }

    /// Current styling.
    #[must_use]
    pub fn spec(&self) -> &VisualSpec {
        &self.spec
    }
}

/// Identity → entry map with exclusive proxy ownership.
#[derive(Debug, Default)]
pub struct ProxyRegistry {
    entries: FxHashMap<EntityId, RegistryEntry>,
    handles: FxHashSet<ProxyHandle>,
}

impl ProxyRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&RegistryEntry> {
        self.entries.get(id)
    }

    /// Whether `id` is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// All registered identities, ordered.
    #[must_use]
    pub fn identities(&self) -> BTreeSet<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Iterate entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry> + '_ {
        self.entries.values()
    }

    /// Number of entries with a transition in flight.
    #[must_use]
    pub fn animating_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_animating()).count()
    }

    /// Register `id`, attaching a proxy at `initial`, or return the existing
    /// entry unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`LiveMapError::DuplicateProxyHandle`] if the surface hands
    /// out a handle that another entry already owns. Nothing is registered
    /// in that case.
    pub fn upsert<S: VisualSurface + ?Sized>(
        &mut self,
        id: &str,
        initial: Position,
        spec: VisualSpec,
        surface: &mut S,
    ) -> Result<&mut RegistryEntry, LiveMapError> {
        if !self.entries.contains_key(id) {
            let handle = surface.attach_proxy(initial, &spec);
            if !self.handles.insert(handle) {
                return Err(LiveMapError::DuplicateProxyHandle(handle.0));
            }
            log::trace!("attached {id} as {handle}");
            drop(self.entries.insert(
                id.to_owned(),
                RegistryEntry {
                    id: id.to_owned(),
                    handle,
                    target: initial,
                    displayed: initial,
                    animation: AnimationState::Idle,
                    spec,
                },
            ));
        }
        self.entries
            .get_mut(id)
            .ok_or(LiveMapError::MissingIdentity)
    }

    /// Detach the proxy for `id` and forget the entry. No-op if absent.
    pub fn remove<S: VisualSurface + ?Sized>(
        &mut self,
        id: &str,
        surface: &mut S,
    ) -> Option<RegistryEntry> {
        let entry = self.entries.remove(id)?;
        surface.detach_proxy(entry.handle);
        let _ = self.handles.remove(&entry.handle);
        log::trace!("detached {id} ({})", entry.handle);
        Some(entry)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut RegistryEntry> {
        self.entries.get_mut(id)
    }

    pub(crate) fn entries_mut(
        &mut self,
    ) -> impl Iterator<Item = &mut RegistryEntry> + '_ {
        self.entries.values_mut()
    }
}
