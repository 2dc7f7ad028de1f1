use serde::{Deserialize, Serialize};

use crate::error::LiveMapError;
use crate::geo::Position;

/// Stable key correlating an entity across snapshots.
pub type EntityId = String;

/// One live vehicle as reported by the position feed.
///
/// Coordinates are optional so that a record with a missing field still
/// deserializes and can be dropped on its own instead of failing the whole
/// payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Entity identity. Empty when the upstream omitted it.
    #[serde(default)]
    pub id: EntityId,
    /// Route the vehicle is running on.
    #[serde(default)]
    pub route_id: String,
    /// Degrees north.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Degrees east.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Heading in degrees clockwise from north.
    #[serde(default)]
    pub bearing: Option<f64>,
    /// Speed in km/h.
    #[serde(default)]
    pub speed: Option<f64>,
    /// Vehicle stop status (e.g. `IN_TRANSIT_TO`).
    #[serde(default)]
    pub status: Option<String>,
    /// Unix timestamp (seconds) of the measurement.
    #[serde(default)]
    pub timestamp: i64,
    /// Operator vehicle number.
    #[serde(default)]
    pub vehicle_id: String,
    /// GTFS trip the vehicle is serving.
    #[serde(default)]
    pub trip_id: Option<String>,
}

impl EntityRecord {
    /// Minimal record at a position.
    #[must_use]
    pub fn new(
        id: impl Into<EntityId>,
        route_id: impl Into<String>,
        position: Position,
    ) -> Self {
        Self {
            id: id.into(),
            route_id: route_id.into(),
            latitude: Some(position.latitude),
            longitude: Some(position.longitude),
            ..Self::default()
        }
    }

    /// Validated position of this record.
    ///
    /// # Errors
    ///
    /// Returns [`LiveMapError::InvalidPosition`] when a coordinate is
    /// missing, non-finite, or out of range.
    pub fn position(&self) -> Result<Position, LiveMapError> {
        Position::from_optional(self.longitude, self.latitude)
    }

    /// Text shown next to the vehicle: the operator number when known.
    #[must_use]
    pub fn label(&self) -> &str {
        if self.vehicle_id.is_empty() {
            &self.id
        } else {
            &self.vehicle_id
        }
    }
}

/// A static metro station.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StaticMarker {
    /// Stop identifier.
    #[serde(default)]
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Degrees north.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Degrees east.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Routes serving this station.
    #[serde(default)]
    pub routes: Vec<String>,
}

impl StaticMarker {
    /// Validated position of this station.
    ///
    /// # Errors
    ///
    /// Returns [`LiveMapError::InvalidPosition`] for missing or out-of-range
    /// coordinates.
    pub fn position(&self) -> Result<Position, LiveMapError> {
        Position::from_optional(self.longitude, self.latitude)
    }
}

/// A metro line with its drawn geometry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RouteDef {
    /// Line identifier.
    #[serde(default)]
    pub id: String,
    /// Public line name (e.g. "52").
    #[serde(default)]
    pub name: String,
    /// Hex color without the leading `#`.
    #[serde(default)]
    pub color: String,
    /// GTFS route id.
    #[serde(default)]
    pub route_id: String,
    /// Path geometry as `[longitude, latitude]` pairs.
    #[serde(default)]
    pub shape: Vec<[f64; 2]>,
    /// Stations served by this line.
    #[serde(default)]
    pub stations: Vec<StaticMarker>,
}

impl RouteDef {
    /// Path geometry with invalid vertices dropped.
    #[must_use]
    pub fn path(&self) -> Vec<Position> {
        self.shape
            .iter()
            .filter_map(|&[lon, lat]| Position::validated(lon, lat).ok())
            .collect()
    }

    /// Identity under which vehicles reference this line.
    #[must_use]
    pub fn key(&self) -> &str {
        if self.route_id.is_empty() {
            &self.id
        } else {
            &self.route_id
        }
    }
}

/// One polling cycle's complete set of vehicle records.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    /// Polling cycle that requested this snapshot.
    pub cycle: u64,
    /// Records in feed order.
    pub entities: Vec<EntityRecord>,
}

impl Snapshot {
    /// Wrap records fetched for `cycle`.
    #[must_use]
    pub fn new(cycle: u64, entities: Vec<EntityRecord>) -> Self {
        Self { cycle, entities }
    }
}
