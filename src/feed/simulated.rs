//! In-process stand-in for the transit backend.
//!
//! Reproduces the backend's mock network (Amsterdam metro lines 50–54 drawn
//! as rings around the city centre, 23 named stations, five trains per line)
//! and moves each train along its line between polls. Outages and trains
//! leaving service can be injected at configurable rates.

use std::f64::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashSet;
use web_time::{SystemTime, UNIX_EPOCH};

use super::{EntityRecord, FeedError, RouteDef, StaticMarker, TransitFeed};
use crate::geo::Position;

/// Amsterdam Centraal area.
const CENTER: Position = Position::new(4.9041, 52.3676);

/// Line names with their operator colors.
const LINES: [(&str, &str); 5] = [
    ("50", "FF4500"),
    ("51", "32CD32"),
    ("52", "1E90FF"),
    ("53", "FFD700"),
    ("54", "9932CC"),
];

const STATION_NAMES: [&str; 23] = [
    "Centraal Station",
    "Nieuwmarkt",
    "Waterlooplein",
    "Weesperplein",
    "Amstel",
    "Spaklerweg",
    "Van der Madeweg",
    "Duivendrecht",
    "Strandvliet",
    "Bijlmer ArenA",
    "Bullewijk",
    "Holendrecht",
    "Reigersbos",
    "Gein",
    "Zuid",
    "RAI",
    "Overamstel",
    "Europaplein",
    "De Pijp",
    "Vijzelgracht",
    "Rokin",
    "Noorderpark",
    "Noord",
];

const SHAPE_POINTS: usize = 20;
const TRAINS_PER_LINE: usize = 5;

/// Tunables for [`SimulatedFeed`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    /// RNG seed; equal seeds produce equal runs.
    pub seed: u64,
    /// Probability in [0, 1] that a snapshot fetch reports unavailability.
    pub outage_rate: f64,
    /// Probability in [0, 1] that a train toggles in/out of service per
    /// poll.
    pub churn_rate: f64,
    /// Fraction of a full loop a train covers per poll.
    pub step: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            seed: 0x6d65_7472,
            outage_rate: 0.0,
            churn_rate: 0.0,
            step: 0.01,
        }
    }
}

#[derive(Debug, Clone)]
struct SimTrain {
    id: String,
    line: usize,
    index: usize,
    /// Position along the closed ring, in [0, 1).
    phase: f64,
}

/// Deterministic simulated network.
#[derive(Debug)]
pub struct SimulatedFeed {
    params: SimulationParams,
    rng: StdRng,
    shapes: Vec<Vec<Position>>,
    trains: Vec<SimTrain>,
    out_of_service: FxHashSet<String>,
}

impl SimulatedFeed {
    /// Build the network. Rates are clamped into [0, 1].
    #[must_use]
    pub fn new(params: SimulationParams) -> Self {
        let params = SimulationParams {
            outage_rate: params.outage_rate.clamp(0.0, 1.0),
            churn_rate: params.churn_rate.clamp(0.0, 1.0),
            ..params
        };
        let shapes = LINES
            .iter()
            .map(|(name, _)| line_shape(line_number(name)))
            .collect();
        let trains = (0..LINES.len())
            .flat_map(|line| {
                (0..TRAINS_PER_LINE).map(move |index| SimTrain {
                    id: format!("train_{}_{index}", LINES[line].0),
                    line,
                    index,
                    phase: index as f64 / TRAINS_PER_LINE as f64,
                })
            })
            .collect();

        Self {
            params,
            rng: StdRng::seed_from_u64(params.seed),
            shapes,
            trains,
            out_of_service: FxHashSet::default(),
        }
    }

    /// Number of trains the network can field.
    #[must_use]
    pub fn fleet_size(&self) -> usize {
        self.trains.len()
    }

    fn advance(&mut self) {
        for train in &mut self.trains {
            let jitter = self.rng.random_range(0.5..1.5);
            train.phase = (train.phase + self.params.step * jitter).fract();
        }
        if self.params.churn_rate > 0.0 {
            for train in &self.trains {
                if !self.rng.random_bool(self.params.churn_rate) {
                    continue;
                }
                if !self.out_of_service.remove(&train.id) {
                    let _ = self.out_of_service.insert(train.id.clone());
                }
            }
        }
    }

    fn record_for(&self, train: &SimTrain, timestamp: i64) -> EntityRecord {
        let shape = &self.shapes[train.line];
        let here = sample_ring(shape, train.phase);
        let ahead = sample_ring(shape, (train.phase + 0.001).fract());
        let (line_name, _) = LINES[train.line];

        EntityRecord {
            bearing: Some(bearing_degrees(here, ahead)),
            speed: Some(35.0),
            status: Some("IN_TRANSIT_TO".to_owned()),
            timestamp,
            vehicle_id: format!("GVB_{line_name}_{}", train.index),
            trip_id: Some(format!("trip_{line_name}_{}", train.index)),
            ..EntityRecord::new(train.id.clone(), line_name, here)
        }
    }

    fn stations() -> Vec<StaticMarker> {
        STATION_NAMES
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let angle = i as f64 / STATION_NAMES.len() as f64 * TAU;
                let pos = ring_point((i % 5) as u32, angle);
                StaticMarker {
                    id: format!("station_{i}"),
                    name: (*name).to_owned(),
                    latitude: Some(pos.latitude),
                    longitude: Some(pos.longitude),
                    routes: station_routes(i),
                }
            })
            .collect()
    }
}

impl Default for SimulatedFeed {
    fn default() -> Self {
        Self::new(SimulationParams::default())
    }
}

impl TransitFeed for SimulatedFeed {
    fn name(&self) -> &str {
        "simulated"
    }

    fn fetch_routes(&mut self) -> Result<Vec<RouteDef>, FeedError> {
        let stations = Self::stations();
        Ok(LINES
            .iter()
            .zip(&self.shapes)
            .map(|((name, color), shape)| RouteDef {
                id: (*name).to_owned(),
                name: (*name).to_owned(),
                color: (*color).to_owned(),
                route_id: (*name).to_owned(),
                shape: shape
                    .iter()
                    .map(|p| [p.longitude, p.latitude])
                    .collect(),
                stations: stations
                    .iter()
                    .filter(|s| s.routes.iter().any(|r| r == name))
                    .cloned()
                    .collect(),
            })
            .collect())
    }

    fn fetch_markers(&mut self) -> Result<Vec<StaticMarker>, FeedError> {
        Ok(Self::stations())
    }

    fn fetch_entity_snapshot(
        &mut self,
    ) -> Result<Vec<EntityRecord>, FeedError> {
        if self.params.outage_rate > 0.0
            && self.rng.random_bool(self.params.outage_rate)
        {
            return Err(FeedError::Unavailable(
                "simulated outage".to_owned(),
            ));
        }

        self.advance();
        let timestamp = unix_now();
        Ok(self
            .trains
            .iter()
            .filter(|t| !self.out_of_service.contains(&t.id))
            .map(|t| self.record_for(t, timestamp))
            .collect())
    }
}

fn line_number(name: &str) -> u32 {
    name.parse().unwrap_or(50)
}

/// Point on the ring of the given size class at `angle` radians.
fn ring_point(class: u32, angle: f64) -> Position {
    let radius = 0.01 + f64::from(class % 5) * 0.002;
    Position::new(
        CENTER.longitude + radius * angle.cos(),
        CENTER.latitude + radius * 1.5 * angle.sin(),
    )
}

fn line_shape(number: u32) -> Vec<Position> {
    (0..SHAPE_POINTS)
        .map(|i| ring_point(number, i as f64 / SHAPE_POINTS as f64 * TAU))
        .collect()
}

/// Lines 50/51 serve the first ten stations, 52/53 the middle stretch,
/// 54 the tail.
fn station_routes(index: usize) -> Vec<String> {
    let mut routes = Vec::new();
    if index < 10 {
        routes.extend(["50".to_owned(), "51".to_owned()]);
    }
    if (5..15).contains(&index) {
        routes.extend(["52".to_owned(), "53".to_owned()]);
    }
    if index >= 10 {
        routes.push("54".to_owned());
    }
    routes
}

fn sample_ring(shape: &[Position], phase: f64) -> Position {
    let n = shape.len();
    if n == 0 {
        return CENTER;
    }
    let scaled = phase.rem_euclid(1.0) * n as f64;
    let i = (scaled.floor() as usize).min(n - 1);
    shape[i].lerp(shape[(i + 1) % n], scaled - i as f64)
}

fn bearing_degrees(from: Position, to: Position) -> f64 {
    let d_lon = to.longitude - from.longitude;
    let d_lat = to.latitude - from.latitude;
    d_lon.atan2(d_lat).to_degrees().rem_euclid(360.0)
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_matches_mock_backend() {
        let mut feed = SimulatedFeed::default();
        let routes = feed.fetch_routes().unwrap();
        assert_eq!(routes.len(), 5);
        assert!(routes.iter().all(|r| r.shape.len() == SHAPE_POINTS));
        assert_eq!(routes[2].color, "1E90FF");

        let markers = feed.fetch_markers().unwrap();
        assert_eq!(markers.len(), 23);
        assert_eq!(markers[0].routes, vec!["50", "51"]);
        assert_eq!(markers[22].routes, vec!["54"]);
    }

    #[test]
    fn trains_move_between_polls() {
        let mut feed = SimulatedFeed::default();
        let first = feed.fetch_entity_snapshot().unwrap();
        let second = feed.fetch_entity_snapshot().unwrap();
        assert_eq!(first.len(), feed.fleet_size());
        assert_eq!(first[0].id, second[0].id);
        let (before, after) = (first[0].position(), second[0].position());
        assert_ne!(before.unwrap(), after.unwrap());
        assert!(first.iter().all(|r| r.position().is_ok()));
    }

    #[test]
    fn full_outage_rate_always_unavailable() {
        let mut feed = SimulatedFeed::new(SimulationParams {
            outage_rate: 1.0,
            ..SimulationParams::default()
        });
        for _ in 0..5 {
            assert!(feed.fetch_entity_snapshot().unwrap_err().is_unavailable());
        }
    }

    #[test]
    fn equal_seeds_equal_runs() {
        let params = SimulationParams {
            churn_rate: 0.3,
            ..SimulationParams::default()
        };
        let mut a = SimulatedFeed::new(params);
        let mut b = SimulatedFeed::new(params);
        for _ in 0..3 {
            let ids_a: Vec<_> = a
                .fetch_entity_snapshot()
                .unwrap()
                .into_iter()
                .map(|r| (r.id, r.longitude))
                .collect();
            let ids_b: Vec<_> = b
                .fetch_entity_snapshot()
                .unwrap()
                .into_iter()
                .map(|r| (r.id, r.longitude))
                .collect();
            assert_eq!(ids_a, ids_b);
        }
    }
}
