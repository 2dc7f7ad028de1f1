use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::feed::SimulationParams;

/// Where vehicle and network data come from.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum FeedSource {
    /// The transit backend's JSON API.
    #[default]
    Http,
    /// Built-in simulated network.
    Simulated,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Feed", inline)]
#[serde(default)]
/// Data source selection and simulation tunables.
pub struct FeedOptions {
    /// Data source.
    #[schemars(title = "Source")]
    pub source: FeedSource,
    /// Backend base URL, without a trailing slash.
    #[schemars(title = "Backend URL")]
    pub base_url: String,
    /// Simulated feed: probability that a snapshot is unavailable.
    #[schemars(
        title = "Outage Rate",
        range(min = 0.0, max = 1.0),
        extend("step" = 0.01)
    )]
    pub outage_rate: f64,
    /// Simulated feed: probability that a train enters or leaves service.
    #[schemars(
        title = "Churn Rate",
        range(min = 0.0, max = 1.0),
        extend("step" = 0.01)
    )]
    pub churn_rate: f64,
    /// Simulated feed: RNG seed.
    #[schemars(skip)]
    pub seed: u64,
}

impl FeedOptions {
    /// Simulation parameters derived from these options.
    #[must_use]
    pub fn simulation(&self) -> SimulationParams {
        SimulationParams {
            seed: self.seed,
            outage_rate: self.outage_rate,
            churn_rate: self.churn_rate,
            ..SimulationParams::default()
        }
    }
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            source: FeedSource::Http,
            base_url: "http://localhost:8000".to_owned(),
            outage_rate: 0.0,
            churn_rate: 0.0,
            seed: SimulationParams::default().seed,
        }
    }
}
