//! Frame → [`LayerSet`] with per-layer reuse.
//!
//! Each family is fingerprinted from its geometry (ids, paths, positions,
//! opacities). When the fingerprint and the scalar triggers match the
//! previous frame, the previous descriptor is cloned and only its
//! `visible` flag is patched; the data `Arc` is shared, so the renderer
//! sees the same allocation and can skip the upload.

use rustc_hash::FxHashMap;

use super::{
    LayerChange, LayerChanges, LayerData, LayerDescriptor, LayerKind, LayerSet,
    PathItem, PointItem, TextItem, TriggerValue, UpdateTriggers, CONNECTORS,
    EXTENSIONS, LABELS, LINKS, LINK_OUTLINES, MOTION_TRAILS, NODES,
};
use crate::interpolation::Frame;
use crate::layout::NodeId;
use crate::style::{LayerStyleResolver, RenderStateCache};
use crate::util::hash::{fingerprint_paths, fingerprint_points};

/// Connector dash pattern.
const CONNECTOR_DASH: [f32; 2] = [4.0, 4.0];
/// Trail dot size relative to the smallest node marker.
const TRAIL_DOT_SCALE: f32 = 1.5;

/// Everything about a layer except its data.
struct Draft {
    id: &'static str,
    kind: LayerKind,
    pickable: bool,
    visible: bool,
    fingerprint: u64,
    update_triggers: UpdateTriggers,
}

struct Previous {
    descriptor: LayerDescriptor,
    fingerprint: u64,
}

/// Builds layer descriptors and diffs them against the previous frame.
#[derive(Default)]
pub struct LayerFactory {
    styles: LayerStyleResolver,
    previous: FxHashMap<&'static str, Previous>,
}

impl LayerFactory {
    /// Factory with no previous frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the previous frame; the next build reports every layer as
    /// created.
    pub fn reset(&mut self) {
        self.previous.clear();
    }

    /// Build every layer for `frame` in render order.
    pub fn build(
        &mut self,
        frame: &Frame,
        cache: &RenderStateCache,
    ) -> (LayerSet, LayerChanges) {
        let mut layers = Vec::with_capacity(super::RENDER_ORDER.len());
        let mut changes = LayerChanges::default();
        let layout = &frame.layout;
        let styles = self.styles;

        let links_fp = fingerprint_paths(
            layout
                .links
                .iter()
                .map(|l| (l.id.as_str(), l.path.as_slice(), [l.opacity])),
        );
        let hovered = hovered_trigger(cache);

        // -- outlines ------------------------------------------------------
        let draft = Draft {
            id: LINK_OUTLINES,
            kind: LayerKind::PathOutline,
            pickable: false,
            visible: styles.outline_layer_visible(cache),
            fingerprint: links_fp,
            update_triggers: triggers(&[
                ("colorVersion", cache.color_version.into()),
                ("strokeWidth", cache.stroke_width.into()),
                ("pulseOpacity", cache.pulse_opacity.into()),
                ("hovered", hovered.clone()),
            ]),
        };
        self.emit(&mut layers, &mut changes, draft, || {
            LayerData::Paths(
                layout
                    .links
                    .iter()
                    .filter_map(|link| {
                        let color = styles.link_outline_color(link, cache)?;
                        Some(PathItem {
                            id: link.id.clone(),
                            path: link.path.clone(),
                            color,
                            width: styles.link_outline_width(link, cache),
                            dash_array: None,
                        })
                    })
                    .collect(),
            )
        });

        // -- links ---------------------------------------------------------
        let draft = Draft {
            id: LINKS,
            kind: LayerKind::Path,
            pickable: true,
            visible: true,
            fingerprint: links_fp,
            update_triggers: triggers(&[
                ("colorVersion", cache.color_version.into()),
                ("strokeWidth", cache.stroke_width.into()),
                ("pulseOpacity", cache.pulse_opacity.into()),
                ("hovered", hovered.clone()),
            ]),
        };
        self.emit(&mut layers, &mut changes, draft, || {
            LayerData::Paths(
                layout
                    .links
                    .iter()
                    .map(|link| PathItem {
                        id: link.id.clone(),
                        path: link.path.clone(),
                        color: styles.link_color(link, cache),
                        width: styles.link_width(link, cache),
                        dash_array: styles.link_dash_array(link, cache),
                    })
                    .collect(),
            )
        });

        // -- extensions ----------------------------------------------------
        let draft = Draft {
            id: EXTENSIONS,
            kind: LayerKind::Path,
            pickable: false,
            visible: true,
            fingerprint: fingerprint_paths(
                layout
                    .extensions
                    .iter()
                    .map(|e| (e.id.as_str(), e.path.as_slice(), [e.opacity])),
            ),
            update_triggers: triggers(&[
                ("colorVersion", cache.color_version.into()),
                ("strokeWidth", cache.stroke_width.into()),
                ("pulseOpacity", cache.pulse_opacity.into()),
            ]),
        };
        self.emit(&mut layers, &mut changes, draft, || {
            LayerData::Paths(
                layout
                    .extensions
                    .iter()
                    .map(|ext| PathItem {
                        id: ext.id.clone(),
                        path: ext.path.clone(),
                        color: styles.extension_color(ext, cache),
                        width: styles.extension_width(ext, cache),
                        dash_array: None,
                    })
                    .collect(),
            )
        });

        // -- nodes ---------------------------------------------------------
        let draft = Draft {
            id: NODES,
            kind: LayerKind::Scatter,
            pickable: true,
            visible: true,
            fingerprint: fingerprint_points(
                layout
                    .nodes
                    .iter()
                    .map(|n| (n.id.as_str(), n.position, [n.opacity, n.radius])),
            ),
            update_triggers: triggers(&[
                ("colorVersion", cache.color_version.into()),
                ("nodeSize", cache.node_size.into()),
                ("pulseOpacity", cache.pulse_opacity.into()),
                ("hovered", hovered.clone()),
            ]),
        };
        self.emit(&mut layers, &mut changes, draft, || {
            LayerData::Points(
                layout
                    .nodes
                    .iter()
                    .map(|node| PointItem {
                        id: node.id.clone(),
                        position: node.position,
                        fill: styles.node_color(node, cache),
                        border: styles.node_border_color(node, cache),
                        radius: styles.node_radius(node, cache),
                    })
                    .collect(),
            )
        });

        // -- trails --------------------------------------------------------
        let draft = Draft {
            id: MOTION_TRAILS,
            kind: LayerKind::Scatter,
            pickable: false,
            visible: !frame.trails.is_empty(),
            fingerprint: fingerprint_paths(
                frame
                    .trails
                    .iter()
                    .map(|t| (t.id.as_str(), t.points.as_slice(), [t.points.len() as f32])),
            ),
            update_triggers: triggers(&[
                ("colorVersion", cache.color_version.into()),
                ("nodeSize", cache.node_size.into()),
                ("pulseOpacity", cache.pulse_opacity.into()),
            ]),
        };
        self.emit(&mut layers, &mut changes, draft, || {
            let dot = cache.min_node_radius.max(1.0) * TRAIL_DOT_SCALE * cache.node_size;
            LayerData::Points(
                frame
                    .trails
                    .iter()
                    .flat_map(|trail| {
                        trail.points.iter().zip(&trail.alphas).enumerate().map(
                            move |(i, (point, alpha))| {
                                let color = styles.trail_color(trail, *alpha, cache);
                                PointItem {
                                    id: NodeId::from(format!("{}@{i}", trail.id).as_str()),
                                    position: *point,
                                    fill: color,
                                    border: color,
                                    radius: dot * alpha,
                                }
                            },
                        )
                    })
                    .collect(),
            )
        });

        // -- labels --------------------------------------------------------
        let draft = Draft {
            id: LABELS,
            kind: LayerKind::Text,
            pickable: false,
            visible: true,
            fingerprint: fingerprint_points(
                layout
                    .labels
                    .iter()
                    .map(|l| (l.id.as_str(), l.position, [l.opacity, l.rotation])),
            ),
            update_triggers: triggers(&[
                ("colorVersion", cache.color_version.into()),
                ("fontSize", cache.font_size.into()),
                ("pulseOpacity", cache.pulse_opacity.into()),
                ("hovered", hovered),
            ]),
        };
        self.emit(&mut layers, &mut changes, draft, || {
            LayerData::Texts(
                layout
                    .labels
                    .iter()
                    .map(|label| TextItem {
                        id: label.id.clone(),
                        text: label.text.clone(),
                        position: label.position,
                        angle: label.rotation,
                        text_anchor: label.text_anchor,
                        color: styles.label_color(label, cache),
                        size: styles.label_size(label, cache),
                    })
                    .collect(),
            )
        });

        // -- connectors ----------------------------------------------------
        let manager = cache.color_manager.as_deref();
        let jumping: Vec<_> = frame
            .displacements
            .iter()
            .filter(|d| manager.is_some_and(|m| m.is_in_marked_subtree(&d.splits)))
            .collect();
        let mid_transition = frame.progress > 0.0 && frame.progress < 1.0;
        let draft = Draft {
            id: CONNECTORS,
            kind: LayerKind::Path,
            pickable: false,
            visible: mid_transition && !jumping.is_empty(),
            fingerprint: fingerprint_points(
                jumping
                    .iter()
                    .map(|d| (d.id.as_str(), d.current, d.origin.to_array())),
            ),
            update_triggers: triggers(&[
                ("colorVersion", cache.color_version.into()),
                ("strokeWidth", cache.stroke_width.into()),
            ]),
        };
        self.emit(&mut layers, &mut changes, draft, || {
            let color = styles.connector_color(cache);
            LayerData::Paths(
                jumping
                    .iter()
                    .map(|d| PathItem {
                        id: d.id.clone(),
                        path: vec![d.origin, d.current],
                        color,
                        width: cache.stroke_width,
                        dash_array: Some(CONNECTOR_DASH),
                    })
                    .collect(),
            )
        });

        (LayerSet { layers }, changes)
    }

    /// Reuse the previous descriptor when nothing but visibility changed,
    /// otherwise build fresh data.
    fn emit(
        &mut self,
        layers: &mut Vec<LayerDescriptor>,
        changes: &mut LayerChanges,
        draft: Draft,
        build: impl FnOnce() -> LayerData,
    ) {
        let (descriptor, change) = match self.previous.get(draft.id) {
            Some(prev)
                if prev.fingerprint == draft.fingerprint
                    && prev.descriptor.update_triggers == draft.update_triggers =>
            {
                let mut descriptor = prev.descriptor.clone();
                if descriptor.visible == draft.visible {
                    (descriptor, LayerChange::Unchanged)
                } else {
                    descriptor.visible = draft.visible;
                    (descriptor, LayerChange::Visibility)
                }
            }
            prev => {
                let change = match prev {
                    None => LayerChange::Created,
                    Some(p) if p.fingerprint == draft.fingerprint => LayerChange::Style,
                    Some(_) => LayerChange::Data,
                };
                let descriptor = LayerDescriptor {
                    kind: draft.kind,
                    id: draft.id,
                    visible: draft.visible,
                    pickable: draft.pickable,
                    data: build().into(),
                    update_triggers: draft.update_triggers,
                };
                (descriptor, change)
            }
        };
        changes.push(draft.id, change);
        let _ = self.previous.insert(
            draft.id,
            Previous {
                descriptor: descriptor.clone(),
                fingerprint: draft.fingerprint,
            },
        );
        layers.push(descriptor);
    }
}

fn triggers(entries: &[(&'static str, TriggerValue)]) -> UpdateTriggers {
    entries.iter().cloned().collect()
}

fn hovered_trigger(cache: &RenderStateCache) -> TriggerValue {
    cache
        .hovered
        .as_ref()
        .map_or_else(|| TriggerValue::from(""), |id| TriggerValue::from(id.as_str()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::interpolation::{interpolate, InterpolationOptions};
    use crate::keyframes::TreeData;
    use crate::layers::RENDER_ORDER;
    use crate::layout::{Layout, LayoutCalculator, LayoutOptions, RadialLayout, SplitSet};
    use crate::options::{ColorOptions, Options};
    use crate::style::{ColorManager, HighlightSets};

    fn layout(c_length: f64) -> Layout {
        let tree = TreeData::internal(
            0.0,
            vec![
                TreeData::internal(1.0, vec![TreeData::leaf("A", 1.0), TreeData::leaf("B", 1.0)]),
                TreeData::leaf("C", c_length),
            ],
        );
        RadialLayout.calculate(&tree, &LayoutOptions::default()).unwrap()
    }

    fn cache(sets: HighlightSets, version: u64) -> RenderStateCache {
        pulsed(sets, version, 1.0)
    }

    fn pulsed(sets: HighlightSets, version: u64, pulse: f32) -> RenderStateCache {
        let manager = ColorManager::new(&ColorOptions::default(), &[], false).with_highlights(sets);
        RenderStateCache::new(&Options::default(), Some(Arc::new(manager)), version, pulse)
    }

    fn triggers_are_scalar(set: &LayerSet) -> bool {
        set.iter().all(|layer| {
            layer.update_triggers.values().all(|v| {
                let json = serde_json::to_value(v).unwrap();
                json.is_number() || json.is_string()
            })
        })
    }

    #[test]
    fn layers_come_out_in_render_order() {
        let mut factory = LayerFactory::new();
        let frame = Frame::still(layout(2.0));
        let (set, changes) = factory.build(&frame, &cache(HighlightSets::default(), 0));
        assert_eq!(set.ids(), RENDER_ORDER.to_vec());
        assert!(triggers_are_scalar(&set));
        assert_eq!(changes.get(LINKS), Some(LayerChange::Created));
        let pickable: Vec<_> = set.iter().filter(|l| l.pickable).map(|l| l.id).collect();
        assert_eq!(pickable, vec![LINKS, NODES]);
    }

    #[test]
    fn outline_visibility_follows_highlights() {
        let mut factory = LayerFactory::new();
        let frame = Frame::still(layout(2.0));

        let (set, _) = factory.build(&frame, &cache(HighlightSets::default(), 0));
        assert!(!set.get(LINK_OUTLINES).unwrap().visible);

        let marked = HighlightSets {
            marked: vec![SplitSet::new([0])],
            ..HighlightSets::default()
        };
        let (set, _) = factory.build(&frame, &cache(marked, 1));
        let outlines = set.get(LINK_OUTLINES).unwrap();
        assert!(outlines.visible);
        assert_eq!(outlines.data.len(), 1);

        let active = HighlightSets {
            active_edges: vec![SplitSet::new([0, 1])],
            ..HighlightSets::default()
        };
        let (set, _) = factory.build(&frame, &cache(active, 2));
        assert!(set.get(LINK_OUTLINES).unwrap().visible);
    }

    #[test]
    fn unchanged_frame_reuses_data() {
        let mut factory = LayerFactory::new();
        let frame = Frame::still(layout(2.0));
        let (first, _) = factory.build(&frame, &cache(HighlightSets::default(), 3));
        let (second, changes) = factory.build(&frame, &cache(HighlightSets::default(), 3));
        assert!(changes.is_unchanged());
        for (a, b) in first.iter().zip(second.iter()) {
            assert!(a.shares_data_with(b), "{} was rebuilt", a.id);
        }
    }

    #[test]
    fn style_change_rebuilds_without_geometry_change() {
        let mut factory = LayerFactory::new();
        let frame = Frame::still(layout(2.0));
        let _ = factory.build(&frame, &cache(HighlightSets::default(), 3));
        let (_, changes) = factory.build(&frame, &cache(HighlightSets::default(), 4));
        assert_eq!(changes.get(LINKS), Some(LayerChange::Style));
        assert_eq!(changes.get(NODES), Some(LayerChange::Style));
    }

    #[test]
    fn motion_changes_geometry_and_shows_trails() {
        let mut factory = LayerFactory::new();
        let from = layout(2.0);
        let to = layout(0.5);
        let options = InterpolationOptions {
            motion_trails: Some(Default::default()),
            ..InterpolationOptions::default()
        };
        let c = cache(HighlightSets::default(), 0);
        let (set, _) = factory.build(&interpolate(&from, &to, 0.0, &options), &c);
        assert!(!set.get(MOTION_TRAILS).unwrap().visible);
        let (set, changes) = factory.build(&interpolate(&from, &to, 0.5, &options), &c);
        assert_eq!(changes.get(NODES), Some(LayerChange::Data));
        assert!(set.get(MOTION_TRAILS).unwrap().visible);
    }

    #[test]
    fn connectors_track_marked_leaves_mid_transition() {
        let mut factory = LayerFactory::new();
        let from = layout(2.0);
        let to = layout(0.5);
        let frame = interpolate(&from, &to, 0.5, &InterpolationOptions::default());
        assert!(!frame.displacements.is_empty());
        let marked = HighlightSets {
            marked: frame.displacements.iter().map(|d| d.splits.clone()).collect(),
            ..HighlightSets::default()
        };
        let (set, _) = factory.build(&frame, &cache(marked, 1));
        let connectors = set.get(CONNECTORS).unwrap();
        assert!(connectors.visible);
        assert_eq!(connectors.data.len(), frame.displacements.len());

        let (set, _) = factory.build(&frame, &cache(HighlightSets::default(), 2));
        assert!(!set.get(CONNECTORS).unwrap().visible);
    }

    #[test]
    fn hovering_a_marked_link_restyles_its_outline() {
        let mut factory = LayerFactory::new();
        let frame = Frame::still(layout(2.0));
        let marked = HighlightSets {
            marked: vec![SplitSet::new([0])],
            ..HighlightSets::default()
        };
        let link = frame
            .layout
            .links
            .iter()
            .find(|l| l.target_splits == SplitSet::new([0]))
            .unwrap();
        let (set, _) = factory.build(&frame, &cache(marked.clone(), 1));
        let LayerData::Paths(before) = &*set.get(LINK_OUTLINES).unwrap().data else {
            unreachable!("outlines are paths");
        };
        assert_eq!(before[0].color, [16, 185, 129, 128]);

        let hovered = cache(marked, 1).with_hover(Some(link.id.clone()));
        let (set, changes) = factory.build(&frame, &hovered);
        assert_eq!(changes.get(LINKS), Some(LayerChange::Style));
        assert_eq!(changes.get(LINK_OUTLINES), Some(LayerChange::Style));
        let LayerData::Paths(after) = &*set.get(LINK_OUTLINES).unwrap().data else {
            unreachable!("outlines are paths");
        };
        assert_eq!(after[0].id, link.id);
        assert_eq!(after[0].color, [0, 200, 220, 75]);
    }

    #[test]
    fn pulse_restyles_trails_below_an_active_edge() {
        let mut factory = LayerFactory::new();
        let options = InterpolationOptions {
            motion_trails: Some(Default::default()),
            ..InterpolationOptions::default()
        };
        let frame = interpolate(&layout(2.0), &layout(0.5), 0.5, &options);
        assert!(!frame.trails.is_empty());
        let active = HighlightSets {
            active_edges: vec![SplitSet::new([0, 1, 2])],
            ..HighlightSets::default()
        };
        let (bright, _) = factory.build(&frame, &pulsed(active.clone(), 1, 1.0));
        let (dim, changes) = factory.build(&frame, &pulsed(active, 1, 0.4));
        assert_eq!(changes.get(MOTION_TRAILS), Some(LayerChange::Style));
        assert_eq!(changes.get(EXTENSIONS), Some(LayerChange::Style));
        assert!(!bright
            .get(MOTION_TRAILS)
            .unwrap()
            .shares_data_with(dim.get(MOTION_TRAILS).unwrap()));
        let (LayerData::Points(bright), LayerData::Points(dim)) = (
            &*bright.get(MOTION_TRAILS).unwrap().data,
            &*dim.get(MOTION_TRAILS).unwrap().data,
        ) else {
            unreachable!("trails are points");
        };
        let newest = |items: &[PointItem]| items.last().unwrap().fill[3];
        assert!(newest(dim) < newest(bright));
    }
}
