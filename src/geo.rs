//! Geographic positions.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::error::LiveMapError;

/// A (longitude, latitude) pair in degrees.
///
/// Values are taken as given by the upstream feed; [`Position::validated`]
/// only checks that they are finite and inside the geographic ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Degrees east, in [-180, 180].
    pub longitude: f64,
    /// Degrees north, in [-90, 90].
    pub latitude: f64,
}

impl Position {
    /// Construct without validation.
    #[must_use]
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Construct a position, rejecting non-finite or out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns [`LiveMapError::InvalidPosition`] when either coordinate is
    /// NaN, infinite, or outside its geographic range.
    pub fn validated(
        longitude: f64,
        latitude: f64,
    ) -> Result<Self, LiveMapError> {
        let lon_ok =
            longitude.is_finite() && (-180.0..=180.0).contains(&longitude);
        let lat_ok =
            latitude.is_finite() && (-90.0..=90.0).contains(&latitude);
        if lon_ok && lat_ok {
            Ok(Self::new(longitude, latitude))
        } else {
            Err(LiveMapError::InvalidPosition {
                longitude,
                latitude,
            })
        }
    }

    /// Validate optional coordinates, treating a missing one as NaN.
    ///
    /// # Errors
    ///
    /// Same as [`Position::validated`].
    pub fn from_optional(
        longitude: Option<f64>,
        latitude: Option<f64>,
    ) -> Result<Self, LiveMapError> {
        Self::validated(
            longitude.unwrap_or(f64::NAN),
            latitude.unwrap_or(f64::NAN),
        )
    }

    /// Linear interpolation toward `to` by factor `t`.
    #[must_use]
    pub fn lerp(self, to: Self, t: f64) -> Self {
        DVec2::from(self).lerp(DVec2::from(to), t).into()
    }
}

impl From<Position> for DVec2 {
    fn from(p: Position) -> Self {
        Self::new(p.longitude, p.latitude)
    }
}

impl From<DVec2> for Position {
    fn from(v: DVec2) -> Self {
        Self::new(v.x, v.y)
    }
}

impl From<[f64; 2]> for Position {
    fn from([longitude, latitude]: [f64; 2]) -> Self {
        Self::new(longitude, latitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validated_accepts_amsterdam() {
        let p = Position::validated(4.9041, 52.3676).unwrap();
        assert_eq!(p, Position::new(4.9041, 52.3676));
    }

    #[test]
    fn validated_rejects_out_of_range_and_non_finite() {
        assert!(Position::validated(181.0, 0.0).is_err());
        assert!(Position::validated(0.0, -90.5).is_err());
        assert!(Position::validated(f64::NAN, 0.0).is_err());
        assert!(Position::validated(0.0, f64::INFINITY).is_err());
        assert!(Position::from_optional(Some(4.9), None).is_err());
    }

    #[test]
    fn lerp_midpoint() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(2.0, 4.0);
        let mid = a.lerp(b, 0.5);
        assert!((mid.longitude - 1.0).abs() < 1e-12);
        assert!((mid.latitude - 2.0).abs() < 1e-12);
    }
}
