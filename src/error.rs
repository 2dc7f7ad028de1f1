//! Crate-level error types.

use std::fmt;

/// Errors produced by the metro-live crate.
#[derive(Debug)]
pub enum LiveMapError {
    /// An entity record arrived without an identity.
    MissingIdentity,
    /// A coordinate pair was missing, non-finite, or out of range.
    InvalidPosition {
        /// Longitude as reported (NaN when absent).
        longitude: f64,
        /// Latitude as reported (NaN when absent).
        latitude: f64,
    },
    /// The surface handed out a proxy handle that another entry already
    /// owns.
    DuplicateProxyHandle(u64),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// Failed to spawn the fetch worker thread.
    ThreadSpawn(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
    /// Options parsed but hold unusable values.
    InvalidOptions(String),
}

impl fmt::Display for LiveMapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingIdentity => write!(f, "entity record has no id"),
            Self::InvalidPosition {
                longitude,
                latitude,
            } => {
                write!(f, "invalid position ({longitude}, {latitude})")
            }
            Self::DuplicateProxyHandle(handle) => {
                write!(f, "proxy handle {handle} is already registered")
            }
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::ThreadSpawn(e) => {
                write!(f, "failed to spawn thread: {e}")
            }
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
            Self::InvalidOptions(msg) => write!(f, "invalid options: {msg}"),
        }
    }
}

impl std::error::Error for LiveMapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) | Self::ThreadSpawn(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LiveMapError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
