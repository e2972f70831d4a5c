//! Keyframe layout data model.
//!
//! A [`Layout`] is the geometry of one keyframe: nodes, links, labels and
//! leaf-to-label extensions. Elements are keyed by a stable [`NodeId`]
//! derived from their sorted split indices, so two layouts of different
//! trees can be matched element by element. Links, labels and extensions
//! refer to nodes by id (an arena, not back-pointers) and carry the split
//! sets the style resolver needs.

pub mod cache;
pub mod polar;
pub mod radial;
pub mod worker;

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

pub use cache::LayoutCache;
pub use polar::{path_length, radial_link_path, shortest_angle_delta, PolarPoint};
pub use radial::{
    BranchTransformation, LabelOffsets, LayoutCalculator, LayoutOptions,
    RadialLayout,
};

/// Sorted, de-duplicated set of leaf split indices.
///
/// Identifies a node (the leaves beneath it), a jumping subtree, an s-edge
/// or a cover atom.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize,
    Deserialize,
)]
#[serde(from = "Vec<u32>", into = "Vec<u32>")]
pub struct SplitSet(Vec<u32>);

impl SplitSet {
    /// Build from any index collection; sorts and removes duplicates.
    pub fn new(indices: impl IntoIterator<Item = u32>) -> Self {
        let mut v: Vec<u32> = indices.into_iter().collect();
        v.sort_unstable();
        v.dedup();
        Self(v)
    }

    /// Sorted indices.
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// Number of indices.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set has no indices.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `idx` is in the set.
    pub fn contains(&self, idx: u32) -> bool {
        self.0.binary_search(&idx).is_ok()
    }

    /// Whether every index of `self` is in `other`. The empty set is a
    /// subset of nothing here, so degenerate elements never count as
    /// members of a subtree.
    pub fn is_subset_of(&self, other: &Self) -> bool {
        if self.0.is_empty() || self.0.len() > other.0.len() {
            return false;
        }
        let mut rest = other.0.iter();
        self.0.iter().all(|a| rest.any(|b| b == a))
    }

    /// Whether the two sets share at least one index.
    pub fn intersects(&self, other: &Self) -> bool {
        let (mut i, mut j) = (0, 0);
        while i < self.0.len() && j < other.0.len() {
            match self.0[i].cmp(&other.0[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => return true,
            }
        }
        false
    }

    /// Union of two sets.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self::new(self.0.iter().chain(other.0.iter()).copied())
    }

    /// Stable string key (`"1-2-3"`).
    pub fn key(&self) -> String {
        let parts: Vec<String> = self.0.iter().map(u32::to_string).collect();
        parts.join("-")
    }
}

impl From<Vec<u32>> for SplitSet {
    fn from(v: Vec<u32>) -> Self {
        Self::new(v)
    }
}

impl From<SplitSet> for Vec<u32> {
    fn from(s: SplitSet) -> Self {
        s.0
    }
}

impl FromIterator<u32> for SplitSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Stable element key derived from sorted split indices.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Id of the node spanning `splits`.
    pub fn from_splits(splits: &SplitSet) -> Self {
        Self(splits.key())
    }

    /// Raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What kind of tree node an element is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeKind {
    /// The tree root; sits at the layout origin.
    Root,
    /// Any non-root internal node.
    Internal,
    /// A taxon.
    Leaf {
        /// Taxon name.
        name: String,
    },
}

impl NodeKind {
    /// Whether this is a leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf { .. })
    }

    /// Taxon name for leaves.
    pub fn leaf_name(&self) -> Option<&str> {
        match self {
            Self::Leaf { name } => Some(name),
            _ => None,
        }
    }
}

/// A positioned tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Stable key (sorted split indices joined by `-`).
    pub id: NodeId,
    /// Leaves beneath this node.
    pub split_indices: SplitSet,
    /// Cartesian position.
    pub position: Vec3,
    /// Polar position (radius from root, angle).
    pub polar: PolarPoint,
    /// Marker radius in layout units.
    pub radius: f32,
    /// Root, internal or leaf.
    #[serde(flatten)]
    pub kind: NodeKind,
    /// Edges from the root.
    pub depth: u32,
    /// Fade factor; 1.0 in computed layouts.
    pub opacity: f32,
}

impl Node {
    /// Distance from the root.
    pub fn polar_radius(&self) -> f32 {
        self.polar.radius
    }

    /// Polar angle in radians.
    pub fn angle(&self) -> f32 {
        self.polar.angle
    }

    /// Whether this node is a leaf.
    pub fn is_leaf(&self) -> bool {
        self.kind.is_leaf()
    }
}

/// Polar endpoints of a link or extension.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LinkPolar {
    /// Source (parent side) endpoint.
    pub source: PolarPoint,
    /// Target (child side) endpoint.
    pub target: PolarPoint,
}

impl LinkPolar {
    /// Blend both endpoints.
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            source: self.source.lerp(other.source, t),
            target: self.target.lerp(other.target, t),
        }
    }
}

/// A branch from a parent node to a child node. `id` equals the target id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    /// Same as `target`.
    pub id: NodeId,
    /// Parent node id.
    pub source: NodeId,
    /// Child node id.
    pub target: NodeId,
    /// Split indices of the parent.
    pub source_splits: SplitSet,
    /// Split indices of the child; membership tests use these.
    pub target_splits: SplitSet,
    /// Whether the child is a leaf.
    pub target_is_leaf: bool,
    /// Routed polyline.
    pub path: Vec<Vec3>,
    /// Polar endpoints the path was routed from.
    pub polar_data: LinkPolar,
    /// Fade factor; 1.0 in computed layouts.
    pub opacity: f32,
}

/// Horizontal anchoring of a label relative to its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAnchor {
    /// Text starts at the position (right half of the circle).
    Start,
    /// Text ends at the position (left half, flipped).
    End,
}

impl TextAnchor {
    /// Anchor and rotation (degrees) for text placed at `angle` radians,
    /// flipping the left half so text never reads upside down.
    pub fn for_angle(angle: f32) -> (Self, f32) {
        let degrees = angle.to_degrees().rem_euclid(360.0);
        if degrees > 90.0 && degrees < 270.0 {
            (Self::End, degrees - 180.0)
        } else {
            (Self::Start, degrees)
        }
    }
}

/// A taxon label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    /// Same as the leaf id.
    pub id: NodeId,
    /// Leaf node id.
    pub leaf: NodeId,
    /// Leaf split indices.
    pub leaf_splits: SplitSet,
    /// Text to draw.
    pub text: String,
    /// Cartesian anchor position.
    pub position: Vec3,
    /// Polar anchor position.
    pub polar: PolarPoint,
    /// Text rotation in degrees.
    pub rotation: f32,
    /// Horizontal anchoring.
    pub text_anchor: TextAnchor,
    /// Fade factor; 1.0 in computed layouts.
    pub opacity: f32,
}

/// Line from a leaf tip out to its label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    /// Same as the leaf id.
    pub id: NodeId,
    /// Leaf node id.
    pub leaf: NodeId,
    /// Leaf split indices.
    pub leaf_splits: SplitSet,
    /// Two-point path: leaf tip, label side.
    pub path: Vec<Vec3>,
    /// Polar endpoints (source = leaf tip, target = label side).
    pub polar_data: LinkPolar,
    /// Fade factor; 1.0 in computed layouts.
    pub opacity: f32,
}

/// Geometry of one keyframe.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Layout {
    /// Nodes in pre-order (root first).
    pub nodes: Vec<Node>,
    /// One link per non-root node.
    pub links: Vec<Link>,
    /// One label per leaf.
    pub labels: Vec<Label>,
    /// One extension per leaf.
    pub extensions: Vec<Extension>,
}

impl Layout {
    /// The root node, if present.
    pub fn root(&self) -> Option<&Node> {
        self.nodes
            .iter()
            .find(|n| matches!(n.kind, NodeKind::Root))
    }

    /// Node by id (linear scan).
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// Leaf nodes.
    pub fn leaves(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.is_leaf())
    }

    /// Largest polar radius over nodes.
    pub fn max_radius(&self) -> f32 {
        self.nodes
            .iter()
            .map(Node::polar_radius)
            .fold(0.0, f32::max)
    }

    /// Whether the layout has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
