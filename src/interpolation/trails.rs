//! Motion trails: short polylines behind moving leaves and labels.

use glam::Vec3;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::{Blender, ElementKind};
use crate::layout::{Layout, NodeId, PolarPoint, SplitSet};

/// Displacement below which a sampled trail counts as stationary.
const MIN_TRAIL_LENGTH: f32 = 1e-3;

/// Trail sampling parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailOptions {
    /// Sub-frames sampled behind the current one.
    pub length: usize,
    /// Progress between consecutive sub-frames.
    pub step: f32,
}

impl Default for TrailOptions {
    fn default() -> Self {
        Self {
            length: 6,
            step: 0.04,
        }
    }
}

/// Recent path of one moving element, oldest point first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionTrail {
    /// Element id.
    pub id: NodeId,
    /// Leaf node or label.
    pub element: ElementKind,
    /// Leaf split indices, for styling.
    pub splits: SplitSet,
    /// Sampled positions, oldest first.
    pub points: Vec<Vec3>,
    /// Per-point alpha in `(0, 1]`, newest point 1.
    pub alphas: Vec<f32>,
}

/// Age-based alpha: 1 for the current sample, fading linearly with age.
fn age_alpha(age: usize, length: usize) -> f32 {
    1.0 - age as f32 / (length + 1) as f32
}

fn sample(
    blender: &Blender<'_>,
    from: PolarPoint,
    to: PolarPoint,
    t: f32,
    options: TrailOptions,
) -> Option<(Vec<Vec3>, Vec<f32>)> {
    let mut points = Vec::with_capacity(options.length + 1);
    let mut alphas = Vec::with_capacity(options.length + 1);
    for age in (0..=options.length).rev() {
        let ti = t - age as f32 * options.step;
        if ti < 0.0 {
            continue;
        }
        points.push(blender.at(ti).polar(from, to).to_cartesian());
        alphas.push(age_alpha(age, options.length));
    }
    let travelled: f32 = points.windows(2).map(|w| w[0].distance(w[1])).sum();
    (points.len() >= 2 && travelled > MIN_TRAIL_LENGTH).then_some((points, alphas))
}

/// Trails for every matched, moving leaf and label at raw progress `t`.
pub(super) fn build_trails(
    from: &Layout,
    to: &Layout,
    t: f32,
    blender: &Blender<'_>,
    options: TrailOptions,
) -> Vec<MotionTrail> {
    let mut trails = Vec::new();

    let to_leaves: FxHashMap<&NodeId, _> =
        to.leaves().map(|n| (&n.id, n)).collect();
    for node in from.leaves() {
        let Some(target) = to_leaves.get(&node.id) else {
            continue;
        };
        if !blender.moves(&node.split_indices) {
            continue;
        }
        if let Some((points, alphas)) = sample(blender, node.polar, target.polar, t, options) {
            trails.push(MotionTrail {
                id: node.id.clone(),
                element: ElementKind::Node,
                splits: node.split_indices.clone(),
                points,
                alphas,
            });
        }
    }

    let to_labels: FxHashMap<&NodeId, _> =
        to.labels.iter().map(|l| (&l.id, l)).collect();
    for label in &from.labels {
        let Some(target) = to_labels.get(&label.id) else {
            continue;
        };
        if !blender.moves(&label.leaf_splits) {
            continue;
        }
        if let Some((points, alphas)) = sample(blender, label.polar, target.polar, t, options) {
            trails.push(MotionTrail {
                id: label.id.clone(),
                element: ElementKind::Label,
                splits: label.leaf_splits.clone(),
                points,
                alphas,
            });
        }
    }

    trails
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_fades_with_age() {
        assert_eq!(age_alpha(0, 4), 1.0);
        assert!((age_alpha(4, 4) - 0.2).abs() < 1e-6);
        assert!(age_alpha(1, 4) > age_alpha(2, 4));
    }
}
