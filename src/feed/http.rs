//! Blocking HTTP client for the transit backend.

use std::time::Duration;

use serde::de::DeserializeOwned;

use super::{EntityRecord, FeedError, RouteDef, StaticMarker, TransitFeed};

const ROUTES_PATH: &str = "/api/metro-lines";
const MARKERS_PATH: &str = "/api/stations";
const POSITIONS_PATH: &str = "/api/train-positions";

/// Feed backed by the backend's JSON endpoints.
///
/// Every request is bounded by the agent-wide timeout so a stalled backend
/// cannot hold the fetch worker indefinitely.
pub struct HttpFeed {
    agent: ureq::Agent,
    base_url: String,
}

impl HttpFeed {
    /// Client for `base_url` (e.g. `http://localhost:8000`).
    #[must_use]
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: config.into(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, FeedError> {
        let url = format!("{}{path}", self.base_url);
        let body = self
            .agent
            .get(&url)
            .call()
            .map_err(map_ureq_error)?
            .into_body()
            .read_to_string()
            .map_err(map_ureq_error)?;
        serde_json::from_str(&body)
            .map_err(|e| FeedError::Decode(e.to_string()))
    }
}

impl std::fmt::Debug for HttpFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFeed")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl TransitFeed for HttpFeed {
    fn name(&self) -> &str {
        &self.base_url
    }

    fn fetch_routes(&mut self) -> Result<Vec<RouteDef>, FeedError> {
        self.get_json(ROUTES_PATH)
    }

    fn fetch_markers(&mut self) -> Result<Vec<StaticMarker>, FeedError> {
        self.get_json(MARKERS_PATH)
    }

    fn fetch_entity_snapshot(
        &mut self,
    ) -> Result<Vec<EntityRecord>, FeedError> {
        self.get_json(POSITIONS_PATH)
    }
}

/// 503 is the backend's "temporarily unavailable" signal.
fn map_ureq_error(e: ureq::Error) -> FeedError {
    match e {
        ureq::Error::StatusCode(503) => {
            FeedError::Unavailable("HTTP 503".to_owned())
        }
        ureq::Error::StatusCode(code) => FeedError::Status(code),
        ureq::Error::Timeout(_) => FeedError::Timeout,
        other => FeedError::Transport(other.to_string()),
    }
}
