//! Progress easing for keyframe transitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Easing curve applied once to transition progress.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Easing {
    /// No easing.
    #[default]
    Linear,
    /// Quadratic ease-in-out.
    Gentle,
}

impl Easing {
    /// Evaluate the curve at `t`, clamped to `[0, 1]`.
    #[inline]
    pub fn evaluate(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::Gentle => {
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

    #[test]
    fn endpoints_are_fixed() {
        for easing in [Easing::Linear, Easing::Gentle] {
            assert_eq!(easing.evaluate(0.0), 0.0);
            assert!((easing.evaluate(1.0) - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn gentle_is_symmetric_ease_in_out() {
        let gentle = Easing::Gentle;
        assert!((gentle.evaluate(0.25) - 0.125).abs() < 1e-6);
        assert!((gentle.evaluate(0.5) - 0.5).abs() < 1e-6);
        assert!((gentle.evaluate(0.75) - 0.875).abs() < 1e-6);
    }

    #[test]
    fn input_is_clamped() {
        assert_eq!(Easing::Linear.evaluate(-0.5), 0.0);
        assert_eq!(Easing::Gentle.evaluate(1.5), 1.0);
    }
}
