//! Easing functions for animation interpolation.
//!
//! Remaps linear frame progress onto a perceptually smooth curve. All
//! variants map 0 to 0 and 1 to 1 and are monotonic on [0, 1].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Easing function variants for animation curves.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum EasingFunction {
    /// Linear interpolation (no easing).
    Linear,
    /// Quadratic ease-in (slow start, fast end).
    QuadraticIn,
    /// Quadratic ease-out (fast start, slow end).
    QuadraticOut,
    /// Quadratic ease-in-out: accelerate through the first half, decelerate
    /// through the second.
    #[default]
    QuadraticInOut,
}

impl EasingFunction {
    /// Evaluate the easing function at time t.
    ///
    /// Input t is clamped to [0.0, 1.0].
    /// Returns the eased value, also in [0.0, 1.0].
    #[inline]
    #[must_use]
    pub fn evaluate(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);

        match self {
            Self::Linear => t,
            Self::QuadraticIn => t * t,
            Self::QuadraticOut => {
                let omt = 1.0 - t;
                1.0 - omt * omt
            }
            Self::QuadraticInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    let u = -2.0 * t + 2.0;
                    1.0 - u * u / 2.0
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [EasingFunction; 4] = [
        EasingFunction::Linear,
        EasingFunction::QuadraticIn,
        EasingFunction::QuadraticOut,
        EasingFunction::QuadraticInOut,
    ];

    #[test]
    fn test_endpoints_are_exact() {
        for easing in ALL {
            assert_eq!(easing.evaluate(0.0), 0.0, "{easing:?} at 0");
            assert_eq!(easing.evaluate(1.0), 1.0, "{easing:?} at 1");
        }
    }

    #[test]
    fn test_in_out_shape() {
        let f = EasingFunction::QuadraticInOut;
        assert_eq!(f.evaluate(0.25), 0.125); // 2 * 0.25²
        assert_eq!(f.evaluate(0.5), 0.5);
        assert_eq!(f.evaluate(0.75), 0.875); // 1 - 0.5² / 2
    }

    #[test]
    fn test_monotonic() {
        for easing in ALL {
            let mut prev = 0.0;
            for i in 0..=120 {
                let v = easing.evaluate(f64::from(i) / 120.0);
                assert!(v >= prev, "{easing:?} decreased at step {i}");
                prev = v;
            }
        }
    }

    #[test]
    fn test_input_clamping() {
        let f = EasingFunction::QuadraticInOut;
        assert_eq!(f.evaluate(-0.5), 0.0);
        assert_eq!(f.evaluate(1.5), 1.0);
    }

    #[test]
    fn test_quadratic_in_out_variants() {
        assert_eq!(EasingFunction::QuadraticIn.evaluate(0.5), 0.25);
        assert_eq!(EasingFunction::QuadraticOut.evaluate(0.5), 0.75);
    }

    #[test]
    fn test_default_is_in_out() {
        assert_eq!(EasingFunction::default(), EasingFunction::QuadraticInOut);
    }
}
