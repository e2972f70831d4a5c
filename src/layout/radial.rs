//! Default radial layout calculator.
//!
//! Leaves are spread evenly over the configured angular span, internal
//! nodes sit at the midpoint of their first and last child, and radii are
//! cumulative (transformed) branch lengths scaled to `max_radius`. The root
//! is pinned to the layout rotation so that consecutive keyframes share a
//! root frame.

use std::f32::consts::TAU;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::polar::{radial_link_path, PolarPoint};
use super::{
    Extension, Label, Layout, Link, LinkPolar, Node, NodeId, NodeKind,
    SplitSet, TextAnchor,
};
use crate::error::MovieError;
use crate::keyframes::TreeData;

/// Computes a keyframe layout from a tree. Runs inside the layout worker.
pub trait LayoutCalculator: Send + Sync {
    /// Lay out `tree` with `options`.
    ///
    /// # Errors
    ///
    /// Returns [`MovieError::Layout`] when the tree cannot be laid out.
    fn calculate(
        &self,
        tree: &TreeData,
        options: &LayoutOptions,
    ) -> Result<Layout, MovieError>;
}

/// How branch lengths map to radial distance.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum BranchTransformation {
    /// Use lengths as given.
    #[default]
    None,
    /// `ln(1 + length)`.
    Log,
    /// `sqrt(length)`.
    Sqrt,
    /// Every branch has unit length (cladogram).
    Ignore,
}

impl BranchTransformation {
    /// Transformed length; negative inputs clamp to zero.
    pub fn apply(self, length: f64) -> f64 {
        let length = length.max(0.0);
        match self {
            Self::None => length,
            Self::Log => length.ln_1p(),
            Self::Sqrt => length.sqrt(),
            Self::Ignore => 1.0,
        }
    }
}

/// Radial distances of labels and extension ends past the outermost leaf.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LabelOffsets {
    /// Label anchor offset.
    pub label: f32,
    /// Extension end offset.
    pub extension: f32,
}

impl Default for LabelOffsets {
    fn default() -> Self {
        Self {
            label: 20.0,
            extension: 10.0,
        }
    }
}

/// Layout parameters; travel with every worker job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
#[schemars(title = "Layout", inline)]
pub struct LayoutOptions {
    /// Branch length transform.
    #[schemars(title = "Branch Transformation")]
    pub branch_transformation: BranchTransformation,
    /// Angular span used by leaves, in degrees.
    #[schemars(title = "Layout Angle")]
    pub layout_angle_degrees: f32,
    /// Rotation of the whole layout, in degrees.
    #[schemars(title = "Rotation")]
    pub layout_rotation_degrees: f32,
    /// Label and extension offsets.
    #[schemars(skip)]
    pub label_offsets: LabelOffsets,
    /// Radius of the outermost leaf.
    #[schemars(title = "Radius")]
    pub max_radius: f32,
    /// Marker radius of leaves.
    #[schemars(skip)]
    pub leaf_radius: f32,
    /// Marker radius of internal nodes.
    #[schemars(skip)]
    pub internal_radius: f32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            branch_transformation: BranchTransformation::None,
            layout_angle_degrees: 360.0,
            layout_rotation_degrees: 0.0,
            label_offsets: LabelOffsets::default(),
            max_radius: 400.0,
            leaf_radius: 3.0,
            internal_radius: 2.0,
        }
    }
}

/// Radial ("circular") phylogram layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct RadialLayout;

impl LayoutCalculator for RadialLayout {
    fn calculate(
        &self,
        tree: &TreeData,
        options: &LayoutOptions,
    ) -> Result<Layout, MovieError> {
        if tree.is_leaf() {
            return Err(MovieError::layout("tree root has no children"));
        }
        let tree = if tree.has_split_indices() {
            tree.clone()
        } else {
            tree.with_derived_splits()
        };

        let leaf_count = tree.leaf_count();
        let span = options.layout_angle_degrees.clamp(1.0, 360.0).to_radians();
        let step = if span >= TAU - f32::EPSILON || leaf_count < 2 {
            span / leaf_count.max(1) as f32
        } else {
            span / (leaf_count - 1) as f32
        };

        let mut builder = Builder {
            options,
            rotation: options.layout_rotation_degrees.to_radians(),
            step,
            next_leaf: 0,
            placed: Vec::new(),
        };
        let _ = builder.place(&tree, None, 0.0, 0)?;

        let max_raw = builder
            .placed
            .iter()
            .map(|p| p.raw_radius)
            .fold(0.0_f64, f64::max);
        let scale = if max_raw > 0.0 {
            f64::from(options.max_radius) / max_raw
        } else {
            1.0
        };

        Ok(builder.finish(scale))
    }
}

/// A node after angular placement, before radial scaling.
struct Placed {
    splits: SplitSet,
    parent: Option<usize>,
    raw_radius: f64,
    angle: f32,
    kind: NodeKind,
    depth: u32,
}

struct Builder<'a> {
    options: &'a LayoutOptions,
    rotation: f32,
    step: f32,
    next_leaf: usize,
    placed: Vec<Placed>,
}

impl Builder<'_> {
    /// Pre-order placement; returns the node's angle.
    fn place(
        &mut self,
        node: &TreeData,
        parent: Option<usize>,
        parent_raw: f64,
        depth: u32,
    ) -> Result<f32, MovieError> {
        let splits = node.split_indices.clone().unwrap_or_default();
        if splits.is_empty() {
            return Err(MovieError::layout(format!(
                "node at depth {depth} has no split indices"
            )));
        }
        let raw_radius = if parent.is_none() {
            0.0
        } else {
            parent_raw
                + self
                    .options
                    .branch_transformation
                    .apply(node.branch_length())
        };
        let kind = if parent.is_none() {
            NodeKind::Root
        } else if node.is_leaf() {
            NodeKind::Leaf {
                name: node.name.clone().unwrap_or_else(|| splits.key()),
            }
        } else {
            NodeKind::Internal
        };

        let idx = self.placed.len();
        self.placed.push(Placed {
            splits,
            parent,
            raw_radius,
            angle: 0.0,
            kind,
            depth,
        });

        let angle = if node.is_leaf() {
            let a = self.rotation + self.step * self.next_leaf as f32;
            self.next_leaf += 1;
            a
        } else {
            let mut first = None;
            let mut last = 0.0;
            for child in &node.children {
                let a = self.place(child, Some(idx), raw_radius, depth + 1)?;
                if first.is_none() {
                    first = Some(a);
                }
                last = a;
            }
            if parent.is_none() {
                self.rotation
            } else {
                (first.unwrap_or(last) + last) / 2.0
            }
        };
        self.placed[idx].angle = angle;
        Ok(angle)
    }

    fn finish(self, scale: f64) -> Layout {
        let options = self.options;
        let label_radius = options.max_radius + options.label_offsets.label;
        let extension_radius =
            options.max_radius + options.label_offsets.extension;

        let nodes: Vec<Node> = self
            .placed
            .iter()
            .map(|p| {
                let polar =
                    PolarPoint::new((p.raw_radius * scale) as f32, p.angle);
                Node {
                    id: NodeId::from_splits(&p.splits),
                    split_indices: p.splits.clone(),
                    position: polar.to_cartesian(),
                    polar,
                    radius: if p.kind.is_leaf() {
                        options.leaf_radius
                    } else {
                        options.internal_radius
                    },
                    kind: p.kind.clone(),
                    depth: p.depth,
                    opacity: 1.0,
                }
            })
            .collect();

        let mut links = Vec::with_capacity(nodes.len().saturating_sub(1));
        let mut labels = Vec::new();
        let mut extensions = Vec::new();
        for (p, node) in self.placed.iter().zip(&nodes) {
            if let Some(parent_idx) = p.parent {
                let parent = &nodes[parent_idx];
                let polar_data = LinkPolar {
                    source: parent.polar,
                    target: node.polar,
                };
                links.push(Link {
                    id: node.id.clone(),
                    source: parent.id.clone(),
                    target: node.id.clone(),
                    source_splits: parent.split_indices.clone(),
                    target_splits: node.split_indices.clone(),
                    target_is_leaf: node.is_leaf(),
                    path: radial_link_path(polar_data.source, polar_data.target),
                    polar_data,
                    opacity: 1.0,
                });
            }
            if let NodeKind::Leaf { name } = &node.kind {
                let label_polar = PolarPoint::new(label_radius, node.angle());
                let (text_anchor, rotation) =
                    TextAnchor::for_angle(node.angle());
                labels.push(Label {
                    id: node.id.clone(),
                    leaf: node.id.clone(),
                    leaf_splits: node.split_indices.clone(),
                    text: name.clone(),
                    position: label_polar.to_cartesian(),
                    polar: label_polar,
                    rotation,
                    text_anchor,
                    opacity: 1.0,
                });
                let polar_data = LinkPolar {
                    source: node.polar,
                    target: PolarPoint::new(extension_radius, node.angle()),
                };
                extensions.push(Extension {
                    id: node.id.clone(),
                    leaf: node.id.clone(),
                    leaf_splits: node.split_indices.clone(),
                    path: vec![
                        polar_data.source.to_cartesian(),
                        polar_data.target.to_cartesian(),
                    ],
                    polar_data,
                    opacity: 1.0,
                });
            }
        }

        Layout {
            nodes,
            links,
            labels,
            extensions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> TreeData {
        TreeData::internal(
            0.0,
            vec![
                TreeData::internal(
                    1.0,
                    vec![TreeData::leaf("A", 1.0), TreeData::leaf("B", 3.0)],
                ),
                TreeData::leaf("C", 2.0),
                TreeData::leaf("D", 1.0),
            ],
        )
    }

    #[test]
    fn root_sits_at_origin_with_pinned_angle() {
        let options = LayoutOptions {
            layout_rotation_degrees: 90.0,
            ..LayoutOptions::default()
        };
        let layout = RadialLayout.calculate(&sample_tree(), &options).unwrap();
        let root = layout.root().unwrap();
        assert_eq!(root.polar_radius(), 0.0);
        assert!((root.angle() - 90f32.to_radians()).abs() < 1e-6);
        assert_eq!(root.id.as_str(), "0-1-2-3");
    }

    #[test]
    fn element_counts_match_topology() {
        let layout = RadialLayout
            .calculate(&sample_tree(), &LayoutOptions::default())
            .unwrap();
        assert_eq!(layout.nodes.len(), 6);
        assert_eq!(layout.links.len(), 5);
        assert_eq!(layout.labels.len(), 4);
        assert_eq!(layout.extensions.len(), 4);
        assert!(layout.links.iter().all(|l| l.id == l.target));
    }

    #[test]
    fn outermost_leaf_reaches_max_radius() {
        let options = LayoutOptions::default();
        let layout = RadialLayout.calculate(&sample_tree(), &options).unwrap();
        // Deepest leaf: B at 1 + 3 = 4 raw units.
        assert!((layout.max_radius() - options.max_radius).abs() < 1e-3);
        let b = layout
            .leaves()
            .find(|n| n.kind.leaf_name() == Some("B"))
            .unwrap();
        assert!((b.polar_radius() - options.max_radius).abs() < 1e-3);
    }

    #[test]
    fn ignore_transformation_gives_cladogram() {
        let options = LayoutOptions {
            branch_transformation: BranchTransformation::Ignore,
            ..LayoutOptions::default()
        };
        let layout = RadialLayout.calculate(&sample_tree(), &options).unwrap();
        let c = layout
            .leaves()
            .find(|n| n.kind.leaf_name() == Some("C"))
            .unwrap();
        assert!((c.polar_radius() - options.max_radius / 2.0).abs() < 1e-3);
    }

    #[test]
    fn labels_sit_past_leaves() {
        let options = LayoutOptions::default();
        let layout = RadialLayout.calculate(&sample_tree(), &options).unwrap();
        for label in &layout.labels {
            assert!(
                (label.polar.radius
                    - (options.max_radius + options.label_offsets.label))
                    .abs()
                    < 1e-3
            );
        }
    }

    #[test]
    fn bare_leaf_is_rejected() {
        let err = RadialLayout
            .calculate(&TreeData::leaf("A", 1.0), &LayoutOptions::default())
            .unwrap_err();
        assert!(matches!(err, MovieError::Layout(_)));
    }

    #[test]
    fn transformations() {
        assert_eq!(BranchTransformation::None.apply(4.0), 4.0);
        assert_eq!(BranchTransformation::Sqrt.apply(4.0), 2.0);
        assert_eq!(BranchTransformation::Ignore.apply(4.0), 1.0);
        assert!((BranchTransformation::Log.apply(0.0)).abs() < 1e-12);
        assert_eq!(BranchTransformation::None.apply(-1.0), 0.0);
    }
}
