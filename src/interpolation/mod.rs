//! Keyframe-to-keyframe interpolation.
//!
//! [`interpolate`] blends two layouts into a [`Frame`]. Elements are matched
//! by [`NodeId`]; matched pairs are blended in polar space (radius
//! linearly, angle along the shortest arc) and rebuilt in Cartesian space.
//! Link and extension paths are re-routed from the blended endpoints rather
//! than blended vertex by vertex.
//!
//! With root-drift compensation on, the root's angular change is subtracted
//! from every blended angle so the tree is drawn in the root's own frame.
//!
//! The function is pure: no logging, no shared state, no mutation of its
//! inputs. Invariant violations are reported through
//! [`Frame::diagnostics`] and the offending element is left out.

pub mod easing;
pub mod trails;

use glam::Vec3;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

pub use easing::Easing;
pub use trails::{MotionTrail, TrailOptions};

use crate::layout::{
    radial_link_path, shortest_angle_delta, Extension, Label, Layout, Link,
    LinkPolar, Node, NodeId, NodeKind, PolarPoint, SplitSet, TextAnchor,
};

/// Frame-independent interpolation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationOptions {
    /// Easing applied to progress.
    pub easing: Easing,
    /// Leaves allowed to move; everything else stays at its source
    /// position. `None` animates everything.
    pub moving_subtree: Option<SplitSet>,
    /// Subtract the root's angular drift from every angle.
    pub root_drift_compensation: bool,
    /// Emit motion trails with these parameters.
    pub motion_trails: Option<TrailOptions>,
}

impl Default for InterpolationOptions {
    fn default() -> Self {
        Self {
            easing: Easing::Linear,
            moving_subtree: None,
            root_drift_compensation: true,
            motion_trails: None,
        }
    }
}

/// Element family, for diagnostics and trails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// Tree node.
    Node,
    /// Branch.
    Link,
    /// Taxon label.
    Label,
    /// Leaf-to-label line.
    Extension,
}

/// An invariant violation found while interpolating. The element was
/// skipped for this frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// Offending element family.
    pub element: ElementKind,
    /// Offending element id.
    pub id: NodeId,
    /// What was wrong.
    pub message: String,
}

impl Diagnostic {
    fn empty_splits(element: ElementKind, id: &NodeId) -> Self {
        Self {
            element,
            id: id.clone(),
            message: "non-root element has no split indices".to_owned(),
        }
    }
}

/// A matched leaf that has left its source position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Displacement {
    /// Leaf id.
    pub id: NodeId,
    /// Leaf split indices.
    pub splits: SplitSet,
    /// Position in the source layout.
    pub origin: Vec3,
    /// Interpolated position.
    pub current: Vec3,
}

/// One interpolated frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    /// Blended geometry.
    pub layout: Layout,
    /// Eased progress the frame was built at.
    pub progress: f32,
    /// Motion trails, when requested.
    pub trails: Vec<MotionTrail>,
    /// Leaves away from their source position.
    pub displacements: Vec<Displacement>,
    /// Skipped elements.
    pub diagnostics: Vec<Diagnostic>,
}

impl Frame {
    /// A still frame showing `layout` as is.
    pub fn still(layout: Layout) -> Self {
        Self {
            layout,
            ..Self::default()
        }
    }

    /// Whether anything is moving in this frame.
    pub fn has_motion(&self) -> bool {
        !self.trails.is_empty() || !self.displacements.is_empty()
    }
}

/// Progress-independent blending state shared by every element.
pub(crate) struct Blender<'a> {
    easing: Easing,
    root_delta: f32,
    moving: Option<&'a SplitSet>,
}

/// Blending state at one progress value.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Blend {
    eased: f32,
    drift: f32,
}

impl<'a> Blender<'a> {
    fn new(from: &Layout, to: &Layout, options: &'a InterpolationOptions) -> Self {
        let root_delta = match (options.root_drift_compensation, from.root(), to.root()) {
            (true, Some(a), Some(b)) => shortest_angle_delta(a.angle(), b.angle()),
            _ => 0.0,
        };
        Self {
            easing: options.easing,
            root_delta,
            moving: options.moving_subtree.as_ref(),
        }
    }

    pub(crate) fn at(&self, t: f32) -> Blend {
        let eased = self.easing.evaluate(t);
        Blend {
            eased,
            drift: eased * self.root_delta,
        }
    }

    /// Whether an element with `splits` animates.
    pub(crate) fn moves(&self, splits: &SplitSet) -> bool {
        self.moving
            .map_or(true, |m| splits.is_empty() || splits.intersects(m))
    }
}

impl Blend {
    pub(crate) fn polar(self, from: PolarPoint, to: PolarPoint) -> PolarPoint {
        let p = from.lerp(to, self.eased);
        PolarPoint::new(p.radius, p.angle - self.drift)
    }

    fn link(self, from: LinkPolar, to: LinkPolar) -> LinkPolar {
        LinkPolar {
            source: self.polar(from.source, to.source),
            target: self.polar(from.target, to.target),
        }
    }

    fn scalar(self, from: f32, to: f32) -> f32 {
        from + (to - from) * self.eased
    }

    /// Whether the target side wins discrete attributes.
    fn past_half(self) -> bool {
        self.eased >= 0.5
    }
}

/// Blend `from` into `to` at progress `t` (clamped to `[0, 1]`).
pub fn interpolate(
    from: &Layout,
    to: &Layout,
    t: f32,
    options: &InterpolationOptions,
) -> Frame {
    let t = t.clamp(0.0, 1.0);
    let blender = Blender::new(from, to, options);
    let blend = blender.at(t);
    let mut diagnostics = Vec::new();

    let (nodes, displacements) = blend_nodes(from, to, &blender, blend, &mut diagnostics);
    let links = blend_links(from, to, &blender, blend, &mut diagnostics);
    let labels = blend_labels(from, to, &blender, blend, &mut diagnostics);
    let extensions = blend_extensions(from, to, &blender, blend, &mut diagnostics);

    let trails = match options.motion_trails {
        Some(trail_options) if t > 0.0 => {
            trails::build_trails(from, to, t, &blender, trail_options)
        }
        _ => Vec::new(),
    };

    Frame {
        layout: Layout {
            nodes,
            links,
            labels,
            extensions,
        },
        progress: blend.eased,
        trails,
        displacements,
        diagnostics,
    }
}

/// Matched pairs in `from` order, then `to`-only elements in `to` order.
enum Pairing<'a, T> {
    Both(&'a T, &'a T),
    FromOnly(&'a T),
    ToOnly(&'a T),
}

fn pair_up<'a, T>(
    from: &'a [T],
    to: &'a [T],
    id: impl Fn(&T) -> &NodeId,
) -> Vec<Pairing<'a, T>> {
    let to_by_id: FxHashMap<&NodeId, &T> = to.iter().map(|e| (id(e), e)).collect();
    let from_ids: FxHashMap<&NodeId, ()> = from.iter().map(|e| (id(e), ())).collect();
    let mut pairs: Vec<Pairing<'a, T>> = from
        .iter()
        .map(|a| match to_by_id.get(id(a)) {
            Some(b) => Pairing::Both(a, b),
            None => Pairing::FromOnly(a),
        })
        .collect();
    pairs.extend(
        to.iter()
            .filter(|b| !from_ids.contains_key(id(b)))
            .map(Pairing::ToOnly),
    );
    pairs
}

fn fade(opacity: f32, factor: f32) -> f32 {
    opacity * factor
}

fn blend_nodes(
    from: &Layout,
    to: &Layout,
    blender: &Blender<'_>,
    blend: Blend,
    diagnostics: &mut Vec<Diagnostic>,
) -> (Vec<Node>, Vec<Displacement>) {
    let mut nodes = Vec::with_capacity(from.nodes.len().max(to.nodes.len()));
    let mut displacements = Vec::new();
    for pairing in pair_up(&from.nodes, &to.nodes, |n| &n.id) {
        let node = match pairing {
            Pairing::Both(a, b) => {
                if is_degenerate(a) {
                    diagnostics.push(Diagnostic::empty_splits(ElementKind::Node, &a.id));
                    continue;
                }
                if !blender.moves(&a.split_indices) {
                    a.clone()
                } else {
                    let polar = blend.polar(a.polar, b.polar);
                    let position = polar.to_cartesian();
                    let side = if blend.past_half() { b } else { a };
                    if a.is_leaf() && position.distance(a.position) > f32::EPSILON {
                        displacements.push(Displacement {
                            id: a.id.clone(),
                            splits: a.split_indices.clone(),
                            origin: a.position,
                            current: position,
                        });
                    }
                    Node {
                        id: a.id.clone(),
                        split_indices: a.split_indices.clone(),
                        position,
                        polar,
                        radius: blend.scalar(a.radius, b.radius),
                        kind: side.kind.clone(),
                        depth: side.depth,
                        opacity: blend.scalar(a.opacity, b.opacity),
                    }
                }
            }
            Pairing::FromOnly(a) => {
                if is_degenerate(a) {
                    diagnostics.push(Diagnostic::empty_splits(ElementKind::Node, &a.id));
                    continue;
                }
                Node {
                    opacity: fade(a.opacity, 1.0 - blend.eased),
                    ..a.clone()
                }
            }
            Pairing::ToOnly(b) => {
                if is_degenerate(b) {
                    diagnostics.push(Diagnostic::empty_splits(ElementKind::Node, &b.id));
                    continue;
                }
                Node {
                    opacity: fade(b.opacity, blend.eased),
                    ..b.clone()
                }
            }
        };
        nodes.push(node);
    }
    (nodes, displacements)
}

/// A non-root node without split indices.
fn is_degenerate(node: &Node) -> bool {
    node.split_indices.is_empty() && !matches!(node.kind, NodeKind::Root)
}

fn blend_links(
    from: &Layout,
    to: &Layout,
    blender: &Blender<'_>,
    blend: Blend,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Link> {
    let mut links = Vec::with_capacity(from.links.len().max(to.links.len()));
    for pairing in pair_up(&from.links, &to.links, |l| &l.id) {
        let (link, opacity) = match pairing {
            Pairing::Both(a, b) => {
                let target_moves = blender.moves(&a.target_splits);
                if !target_moves && !blender.moves(&a.source_splits) {
                    (a, a.opacity)
                } else if !target_moves {
                    // Pinned child under a moving parent: reroute from the
                    // parent's blended position.
                    let polar_data = LinkPolar {
                        source: blend.polar(a.polar_data.source, b.polar_data.source),
                        target: a.polar_data.target,
                    };
                    links.push(Link {
                        path: radial_link_path(polar_data.source, polar_data.target),
                        polar_data,
                        ..a.clone()
                    });
                    continue;
                } else {
                    if a.target_splits.is_empty() {
                        diagnostics.push(Diagnostic::empty_splits(ElementKind::Link, &a.id));
                        continue;
                    }
                    let polar_data = blend.link(a.polar_data, b.polar_data);
                    let side = if blend.past_half() { b } else { a };
                    links.push(Link {
                        id: a.id.clone(),
                        source: side.source.clone(),
                        target: a.target.clone(),
                        source_splits: side.source_splits.clone(),
                        target_splits: a.target_splits.clone(),
                        target_is_leaf: a.target_is_leaf,
                        path: radial_link_path(polar_data.source, polar_data.target),
                        polar_data,
                        opacity: blend.scalar(a.opacity, b.opacity),
                    });
                    continue;
                }
            }
            Pairing::FromOnly(a) => (a, fade(a.opacity, 1.0 - blend.eased)),
            Pairing::ToOnly(b) => (b, fade(b.opacity, blend.eased)),
        };
        if link.target_splits.is_empty() {
            diagnostics.push(Diagnostic::empty_splits(ElementKind::Link, &link.id));
            continue;
        }
        links.push(Link {
            opacity,
            ..link.clone()
        });
    }
    links
}

fn blend_labels(
    from: &Layout,
    to: &Layout,
    blender: &Blender<'_>,
    blend: Blend,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Label> {
    let mut labels = Vec::with_capacity(from.labels.len().max(to.labels.len()));
    for pairing in pair_up(&from.labels, &to.labels, |l| &l.id) {
        let (label, opacity) = match pairing {
            Pairing::Both(a, b) if blender.moves(&a.leaf_splits) && !a.leaf_splits.is_empty() => {
                let polar = blend.polar(a.polar, b.polar);
                let (text_anchor, rotation) = TextAnchor::for_angle(polar.angle);
                labels.push(Label {
                    id: a.id.clone(),
                    leaf: a.leaf.clone(),
                    leaf_splits: a.leaf_splits.clone(),
                    text: b.text.clone(),
                    position: polar.to_cartesian(),
                    polar,
                    rotation,
                    text_anchor,
                    opacity: blend.scalar(a.opacity, b.opacity),
                });
                continue;
            }
            Pairing::Both(a, _) => (a, a.opacity),
            Pairing::FromOnly(a) => (a, fade(a.opacity, 1.0 - blend.eased)),
            Pairing::ToOnly(b) => (b, fade(b.opacity, blend.eased)),
        };
        if label.leaf_splits.is_empty() {
            diagnostics.push(Diagnostic::empty_splits(ElementKind::Label, &label.id));
            continue;
        }
        labels.push(Label {
            opacity,
            ..label.clone()
        });
    }
    labels
}

fn blend_extensions(
    from: &Layout,
    to: &Layout,
    blender: &Blender<'_>,
    blend: Blend,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Extension> {
    let mut extensions = Vec::with_capacity(from.extensions.len().max(to.extensions.len()));
    for pairing in pair_up(&from.extensions, &to.extensions, |e| &e.id) {
        let (extension, opacity) = match pairing {
            Pairing::Both(a, b) if blender.moves(&a.leaf_splits) && !a.leaf_splits.is_empty() => {
                let polar_data = blend.link(a.polar_data, b.polar_data);
                extensions.push(Extension {
                    id: a.id.clone(),
                    leaf: a.leaf.clone(),
                    leaf_splits: a.leaf_splits.clone(),
                    path: vec![
                        polar_data.source.to_cartesian(),
                        polar_data.target.to_cartesian(),
                    ],
                    polar_data,
                    opacity: blend.scalar(a.opacity, b.opacity),
                });
                continue;
            }
            Pairing::Both(a, _) => (a, a.opacity),
            Pairing::FromOnly(a) => (a, fade(a.opacity, 1.0 - blend.eased)),
            Pairing::ToOnly(b) => (b, fade(b.opacity, blend.eased)),
        };
        if extension.leaf_splits.is_empty() {
            diagnostics.push(Diagnostic::empty_splits(ElementKind::Extension, &extension.id));
            continue;
        }
        extensions.push(Extension {
            opacity,
            ..extension.clone()
        });
    }
    extensions
}
