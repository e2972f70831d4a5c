//! Renderer-facing layer descriptors.
//!
//! One [`LayerDescriptor`] per element family, in render order. Accessor
//! results are resolved up front so each item carries its final color,
//! width and geometry; the renderer only has to draw. Descriptor ids are
//! stable across frames and `update_triggers` hold scalars only, so a
//! renderer can diff a frame against the previous one in constant time per
//! layer.

pub mod factory;
pub mod picking;

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::Vec3;
use serde::Serialize;

pub use factory::LayerFactory;
pub use picking::{pick, PickTarget};

use crate::layout::{NodeId, TextAnchor};
use crate::style::Rgba;

/// Link halo layer.
pub const LINK_OUTLINES: &str = "phylo-link-outlines";
/// Branch layer.
pub const LINKS: &str = "phylo-links";
/// Leaf-to-label line layer.
pub const EXTENSIONS: &str = "phylo-extensions";
/// Node marker layer.
pub const NODES: &str = "phylo-nodes";
/// Motion trail layer.
pub const MOTION_TRAILS: &str = "phylo-motion-trails";
/// Taxon label layer.
pub const LABELS: &str = "phylo-labels";
/// Jump connector layer.
pub const CONNECTORS: &str = "phylo-connectors";

/// Layer ids, bottom to top.
pub const RENDER_ORDER: [&str; 7] = [
    LINK_OUTLINES,
    LINKS,
    EXTENSIONS,
    NODES,
    MOTION_TRAILS,
    LABELS,
    CONNECTORS,
];

/// Primitive a layer draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LayerKind {
    /// Wide, translucent paths under other paths.
    PathOutline,
    /// Polylines.
    Path,
    /// Circles.
    Scatter,
    /// Text.
    Text,
}

/// One polyline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathItem {
    /// Element id.
    pub id: NodeId,
    /// Vertices.
    pub path: Vec<Vec3>,
    /// Stroke color.
    pub color: Rgba,
    /// Stroke width in pixels.
    pub width: f32,
    /// `[dash, gap]`, `None` for solid.
    pub dash_array: Option<[f32; 2]>,
}

/// One circle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointItem {
    /// Element id.
    pub id: NodeId,
    /// Center.
    pub position: Vec3,
    /// Fill color.
    pub fill: Rgba,
    /// Border color.
    pub border: Rgba,
    /// Radius in pixels.
    pub radius: f32,
}

/// One text run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextItem {
    /// Element id.
    pub id: NodeId,
    /// Text.
    pub text: String,
    /// Anchor position.
    pub position: Vec3,
    /// Rotation in degrees.
    pub angle: f32,
    /// Horizontal anchoring.
    pub text_anchor: TextAnchor,
    /// Text color.
    pub color: Rgba,
    /// Pixel height.
    pub size: f32,
}

/// Resolved items of one layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "items", rename_all = "camelCase")]
pub enum LayerData {
    /// For path and outline layers.
    Paths(Vec<PathItem>),
    /// For scatter layers.
    Points(Vec<PointItem>),
    /// For text layers.
    Texts(Vec<TextItem>),
}

impl LayerData {
    /// Number of items.
    pub fn len(&self) -> usize {
        match self {
            Self::Paths(v) => v.len(),
            Self::Points(v) => v.len(),
            Self::Texts(v) => v.len(),
        }
    }

    /// Whether there are no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A scalar update trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TriggerValue {
    /// Numeric trigger (versions, sizes, opacities).
    Number(f64),
    /// Textual trigger (hovered id).
    Text(String),
}

impl From<f32> for TriggerValue {
    fn from(v: f32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<u64> for TriggerValue {
    fn from(v: u64) -> Self {
        Self::Number(v as f64)
    }
}

impl From<&str> for TriggerValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

/// Named scalar triggers of one layer.
pub type UpdateTriggers = BTreeMap<&'static str, TriggerValue>;

/// One renderer layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDescriptor {
    /// Primitive.
    pub kind: LayerKind,
    /// Stable id, one of [`RENDER_ORDER`].
    pub id: &'static str,
    /// Whether the layer draws at all.
    pub visible: bool,
    /// Whether the layer takes part in hit testing.
    pub pickable: bool,
    /// Resolved items; shared with the previous frame when unchanged.
    pub data: Arc<LayerData>,
    /// Scalar triggers.
    pub update_triggers: UpdateTriggers,
}

impl LayerDescriptor {
    /// Whether `other` shares this descriptor's data allocation.
    pub fn shares_data_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

/// Every layer of one frame, in render order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct LayerSet {
    layers: Vec<LayerDescriptor>,
}

impl LayerSet {
    /// Layer by id.
    pub fn get(&self, id: &str) -> Option<&LayerDescriptor> {
        self.layers.iter().find(|l| l.id == id)
    }

    /// Layers bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &LayerDescriptor> {
        self.layers.iter()
    }

    /// Layer ids bottom to top.
    pub fn ids(&self) -> Vec<&'static str> {
        self.layers.iter().map(|l| l.id).collect()
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether the set has no layers.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// How one layer differs from the previous frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LayerChange {
    /// No previous descriptor.
    Created,
    /// Geometry or membership changed.
    Data,
    /// Same geometry, restyled.
    Style,
    /// Only the visible flag flipped.
    Visibility,
    /// Reused as is.
    Unchanged,
}

/// Per-layer changes of one build.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LayerChanges {
    entries: Vec<(&'static str, LayerChange)>,
}

impl LayerChanges {
    fn push(&mut self, id: &'static str, change: LayerChange) {
        self.entries.push((id, change));
    }

    /// Change of one layer.
    pub fn get(&self, id: &str) -> Option<LayerChange> {
        self.entries.iter().find(|(i, _)| *i == id).map(|(_, c)| *c)
    }

    /// Ids of layers that need re-uploading.
    pub fn changed(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries
            .iter()
            .filter(|(_, c)| *c != LayerChange::Unchanged)
            .map(|(id, _)| *id)
    }

    /// Whether nothing changed.
    pub fn is_unchanged(&self) -> bool {
        self.changed().next().is_none()
    }
}
