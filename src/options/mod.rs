//! Runtime configuration with TOML preset support.
//!
//! All tweakable settings (animation, polling cadence, data source, display
//! toggles) are consolidated here. Options serialize to/from TOML; presets
//! live as `*.toml` files in `presets/`.

mod animation;
mod display;
mod feed;
mod polling;

use std::path::Path;

pub use animation::AnimationOptions;
pub use display::DisplayOptions;
pub use feed::{FeedOptions, FeedSource};
pub use polling::PollingOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::LiveMapError;

/// Top-level options container. All sub-structs use `#[serde(default)]` so
/// partial TOML files (e.g. only overriding `[polling]`) work correctly.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct Options {
    /// Vehicle motion.
    pub animation: AnimationOptions,
    /// Fetch cadence.
    pub polling: PollingOptions,
    /// Data source.
    pub feed: FeedOptions,
    /// Layer toggles and fallback styling.
    pub display: DisplayOptions,
}

impl Options {
    /// Generate JSON Schema describing the options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Options)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns [`LiveMapError::Io`] if the file cannot be read,
    /// [`LiveMapError::OptionsParse`] if it is not valid TOML for these
    /// options, and [`LiveMapError::InvalidOptions`] if it parses but
    /// fails [`Options::validate`].
    pub fn load(path: &Path) -> Result<Self, LiveMapError> {
        let content =
            std::fs::read_to_string(path).map_err(LiveMapError::Io)?;
        let options: Self = toml::from_str(&content)
            .map_err(|e| LiveMapError::OptionsParse(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// Returns [`LiveMapError::OptionsParse`] on serialization failure and
    /// [`LiveMapError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), LiveMapError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| LiveMapError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(LiveMapError::Io)?;
        }
        std::fs::write(path, content).map_err(LiveMapError::Io)
    }

    /// List available preset names (TOML file stems) in a directory.
    #[must_use]
    pub fn list_presets(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) =
                        path.file_stem().and_then(|s| s.to_str())
                    {
                        names.push(stem.to_owned());
                    }
                }
            }
        }
        names.sort();
        names
    }

    /// Reject values the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`LiveMapError::InvalidOptions`] naming the first offending
    /// field.
    pub fn validate(&self) -> Result<(), LiveMapError> {
        let invalid = |msg: &str| Err(LiveMapError::InvalidOptions(msg.into()));
        if self.polling.interval_ms == 0 {
            return invalid("polling.interval_ms must be positive");
        }
        if self.polling.fetch_timeout_ms == 0 {
            return invalid("polling.fetch_timeout_ms must be positive");
        }
        if self.animation.duration_frames == 0 {
            return invalid("animation.duration_frames must be positive");
        }
        if self.animation.frame_rate == 0 {
            return invalid("animation.frame_rate must be positive");
        }
        if !(0.0..=1.0).contains(&self.feed.outage_rate) {
            return invalid("feed.outage_rate must be within [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.feed.churn_rate) {
            return invalid("feed.churn_rate must be within [0, 1]");
        }
        if self.feed.source == FeedSource::Http
            && self.feed.base_url.trim().is_empty()
        {
            return invalid("feed.base_url is required for the http source");
        }
        Ok(())
    }
}
