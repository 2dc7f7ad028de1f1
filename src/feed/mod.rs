//! Data sources for routes, stations, and live vehicle positions.
//!
//! The engine only sees the [`TransitFeed`] trait. Two implementations ship
//! with the crate: [`SimulatedFeed`] (always available) and `HttpFeed`
//! (feature `http`) which speaks the transit backend's JSON endpoints.

#[cfg(feature = "http")]
mod http;
mod simulated;
mod types;

use std::fmt;

#[cfg(feature = "http")]
pub use http::HttpFeed;
pub use simulated::{SimulatedFeed, SimulationParams};
pub use types::{EntityId, EntityRecord, RouteDef, Snapshot, StaticMarker};

/// Why a fetch produced no data.
///
/// Every variant means "skip this cycle": the engine leaves the rendered
/// state untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// The source explicitly reported that data is temporarily unavailable.
    Unavailable(String),
    /// The request exceeded its time budget.
    Timeout,
    /// Connection-level failure.
    Transport(String),
    /// Non-success HTTP status other than 503.
    Status(u16),
    /// The payload could not be decoded.
    Decode(String),
}

impl FeedError {
    /// Whether the source itself signalled a temporary outage.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(reason) => {
                write!(f, "temporarily unavailable: {reason}")
            }
            Self::Timeout => write!(f, "request timed out"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Status(code) => write!(f, "unexpected HTTP status {code}"),
            Self::Decode(msg) => write!(f, "decode error: {msg}"),
        }
    }
}

impl std::error::Error for FeedError {}

/// Source of transit data.
///
/// Methods take `&mut self` so that stateful sources (simulations, scripted
/// test feeds) can advance between calls.
pub trait TransitFeed {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    /// Static route definitions.
    ///
    /// # Errors
    ///
    /// Any [`FeedError`]; the caller keeps the routes it already has.
    fn fetch_routes(&mut self) -> Result<Vec<RouteDef>, FeedError>;

    /// Static station markers.
    ///
    /// # Errors
    ///
    /// Any [`FeedError`]; the caller keeps the markers it already has.
    fn fetch_markers(&mut self) -> Result<Vec<StaticMarker>, FeedError>;

    /// The live vehicle snapshot.
    ///
    /// # Errors
    ///
    /// [`FeedError::Unavailable`] when the source has no current data, or
    /// any other failure. Neither is an empty snapshot.
    fn fetch_entity_snapshot(
        &mut self,
    ) -> Result<Vec<EntityRecord>, FeedError>;
}

impl<T: TransitFeed + ?Sized> TransitFeed for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch_routes(&mut self) -> Result<Vec<RouteDef>, FeedError> {
        (**self).fetch_routes()
    }

    fn fetch_markers(&mut self) -> Result<Vec<StaticMarker>, FeedError> {
        (**self).fetch_markers()
    }

    fn fetch_entity_snapshot(
        &mut self,
    ) -> Result<Vec<EntityRecord>, FeedError> {
        (**self).fetch_entity_snapshot()
    }
}
