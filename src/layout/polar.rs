//! Polar coordinate helpers shared by the layout calculator and the
//! interpolator.

use std::f32::consts::{PI, TAU};

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Angular step used when sampling arcs of radial link routes.
const ARC_STEP: f32 = PI / 36.0;

/// A point in the layout's polar frame. `angle` is in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PolarPoint {
    /// Distance from the layout origin (the root).
    #[serde(rename = "r")]
    pub radius: f32,
    /// Angle in radians.
    #[serde(rename = "theta")]
    pub angle: f32,
}

impl PolarPoint {
    /// Polar point from radius and angle (radians).
    pub const fn new(radius: f32, angle: f32) -> Self {
        Self { radius, angle }
    }

    /// Polar form of a point on the z = 0 plane.
    pub fn from_cartesian(position: Vec3) -> Self {
        Self {
            radius: position.truncate().length(),
            angle: position.y.atan2(position.x),
        }
    }

    /// Cartesian position on the z = 0 plane.
    #[inline]
    pub fn to_cartesian(self) -> Vec3 {
        let (sin, cos) = self.angle.sin_cos();
        Vec3::new(self.radius * cos, self.radius * sin, 0.0)
    }

    /// Blend towards `other`: radius linearly, angle along the shortest
    /// signed arc.
    #[inline]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            radius: self.radius + (other.radius - self.radius) * t,
            angle: self.angle + shortest_angle_delta(self.angle, other.angle) * t,
        }
    }
}

/// Signed angular distance from `from` to `to`, in `(-π, π]`.
///
/// Picks the smaller of `Δθ` and `Δθ − sign(Δθ)·2π`.
#[inline]
pub fn shortest_angle_delta(from: f32, to: f32) -> f32 {
    let delta = (to - from).rem_euclid(TAU);
    if delta > PI {
        delta - TAU
    } else {
        delta
    }
}

/// Radial link route: an arc at the source radius from the source angle to
/// the target angle, then a straight radial segment out to the target.
///
/// Always derived from polar endpoints so that blended endpoints give a
/// clean route instead of a swept chord.
pub fn radial_link_path(source: PolarPoint, target: PolarPoint) -> Vec<Vec3> {
    let delta = shortest_angle_delta(source.angle, target.angle);
    let steps = (delta.abs() / ARC_STEP).ceil().max(1.0) as usize;

    let mut path = Vec::with_capacity(steps + 2);
    path.push(source.to_cartesian());
    for i in 1..=steps {
        let angle = source.angle + delta * (i as f32 / steps as f32);
        path.push(PolarPoint::new(source.radius, angle).to_cartesian());
    }
    path.push(PolarPoint::new(target.radius, source.angle + delta).to_cartesian());
    path
}

/// Total Euclidean length of a polyline.
pub fn path_length(path: &[Vec3]) -> f32 {
    path.windows(2).map(|w| w[0].distance(w[1])).sum()
}
