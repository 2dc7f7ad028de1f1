use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::reconcile::DEFAULT_VEHICLE_COLOR;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Display", inline)]
#[serde(default)]
/// Map layer toggles and fallback styling.
pub struct DisplayOptions {
    /// Vehicle color for routes with no known color (hex, no `#`).
    #[schemars(title = "Default Vehicle Color")]
    pub default_vehicle_color: String,
    /// Route ids hidden at startup.
    #[schemars(title = "Hidden Routes")]
    pub hidden_routes: Vec<String>,
}

impl DisplayOptions {
    /// Whether `route_id` starts hidden.
    #[must_use]
    pub fn starts_hidden(&self, route_id: &str) -> bool {
        self.hidden_routes.iter().any(|r| r == route_id)
    }
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            default_vehicle_color: DEFAULT_VEHICLE_COLOR.to_owned(),
            hidden_routes: Vec::new(),
        }
    }
}
