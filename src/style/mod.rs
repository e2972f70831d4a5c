//! Per-element visual attributes.
//!
//! [`LayerStyleResolver`] is a set of pure accessors over an element and a
//! [`RenderStateCache`]. The cache is built once per frame; every accessor
//! reads highlight membership from the cache's [`ColorManager`] snapshot
//! and nothing else, so styles track the visible tree even while the
//! timeline's nominal index lags behind a scrub.
//!
//! Without a color manager every accessor returns neutral defaults.

pub mod color;
pub mod color_manager;

use std::sync::Arc;

pub use color::{boost_alpha, darken, parse_css_color, scale_alpha, Rgba};
pub use color_manager::{ColorChannel, ColorManager, HighlightSets};

use crate::interpolation::MotionTrail;
use crate::layout::{path_length, Extension, Label, Link, Node, NodeId, SplitSet};
use crate::options::Options;

/// Width multiplier for highlighted links.
const HIGHLIGHT_WIDTH_SCALE: f32 = 1.5;
/// Extra outline width around highlighted links.
const OUTLINE_EXTRA_WIDTH: f32 = 6.0;
/// Outline alpha relative to its link.
const OUTLINE_ALPHA: f32 = 0.5;
/// Node radius multiplier for marked nodes.
const MARKED_NODE_SCALE: f32 = 1.6;
/// Node radius multiplier for other highlighted nodes.
const HIGHLIGHT_NODE_SCALE: f32 = 1.3;
/// Border darkening of highlighted nodes.
const BORDER_DARKEN: f32 = 0.7;
/// Alpha boost for history members.
const HISTORY_ALPHA_BOOST: f32 = 1.3;
/// Label scale for marked labels.
const MARKED_LABEL_SCALE: f32 = 1.2;
/// Label scale for history labels.
const HISTORY_LABEL_SCALE: f32 = 1.1;
/// Extension width multipliers: marked, history, plain.
const EXTENSION_SCALES: (f32, f32, f32) = (3.0, 2.6, 0.5);
/// Active-edge dash: length divisor and clamp range.
const DASH_DIVISOR: f32 = 6.0 * 1.5;
const DASH_RANGE: (f32, f32) = (4.0, 20.0);
/// Upcoming-edge dots: length divisor, clamp range, gap ratio.
const DOT_DIVISOR: f32 = 30.0;
const DOT_RANGE: (f32, f32) = (2.0, 6.0);
const DOT_GAP_RATIO: f32 = 3.5;

/// Neutral link color when no color manager is present.
pub const NEUTRAL_LINK: Rgba = [128, 128, 128, 255];
/// Neutral node color when no color manager is present.
pub const NEUTRAL_NODE: Rgba = [128, 128, 128, 255];
/// Neutral label color when no color manager is present.
pub const NEUTRAL_LABEL: Rgba = [40, 40, 40, 255];
/// Node border when not highlighted.
pub const NEUTRAL_BORDER: Rgba = [40, 40, 40, 255];
/// Hover highlight.
pub const HOVER_CYAN: Rgba = [0, 200, 220, 150];

/// Snapshot of everything styling reads, taken once per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderStateCache {
    /// Highlight state and taxa colors.
    pub color_manager: Option<Arc<ColorManager>>,
    /// Dim links outside active change edges.
    pub dimming_enabled: bool,
    /// Alpha multiplier for change-edge dimming.
    pub dimming_opacity: f32,
    /// Dim elements outside marked subtrees.
    pub subtree_dimming_enabled: bool,
    /// Alpha multiplier for subtree dimming.
    pub subtree_dimming_opacity: f32,
    /// Color marked subtrees.
    pub marked_subtrees_enabled: bool,
    /// Current pulse alpha multiplier.
    pub pulse_opacity: f32,
    /// Dash active change edges.
    pub dashing_enabled: bool,
    /// Dot upcoming change edges.
    pub upcoming_changes_enabled: bool,
    /// High-contrast palette in use.
    pub high_contrast_highlighting_enabled: bool,
    /// Alpha multiplier for links and extensions.
    pub link_connection_opacity: f32,
    /// Color manager version.
    pub color_version: u64,
    /// Base link width.
    pub stroke_width: f32,
    /// Label pixel height.
    pub font_size: f32,
    /// Node radius multiplier.
    pub node_size: f32,
    /// Smallest marker radius.
    pub min_node_radius: f32,
    /// Element under the pointer.
    pub hovered: Option<NodeId>,
}

impl RenderStateCache {
    /// Snapshot the options and color manager for one frame.
    pub fn new(
        options: &Options,
        color_manager: Option<Arc<ColorManager>>,
        color_version: u64,
        pulse_opacity: f32,
    ) -> Self {
        let h = &options.highlight;
        let d = &options.display;
        Self {
            color_manager,
            dimming_enabled: h.dimming_enabled,
            dimming_opacity: h.dimming_opacity,
            subtree_dimming_enabled: h.subtree_dimming_enabled,
            subtree_dimming_opacity: h.subtree_dimming_opacity,
            marked_subtrees_enabled: h.marked_subtrees_enabled,
            pulse_opacity,
            dashing_enabled: h.dashing_enabled,
            upcoming_changes_enabled: h.upcoming_changes_enabled,
            high_contrast_highlighting_enabled: h.high_contrast_highlighting_enabled,
            link_connection_opacity: d.link_connection_opacity,
            color_version,
            stroke_width: d.stroke_width,
            font_size: d.font_size,
            node_size: d.node_size,
            min_node_radius: d.min_node_radius,
            hovered: None,
        }
    }

    /// Same snapshot with a hovered element.
    #[must_use]
    pub fn with_hover(mut self, hovered: Option<NodeId>) -> Self {
        self.hovered = hovered;
        self
    }

    /// Marked jumping subtrees, read from the color manager only.
    pub fn marked_subtree_data(&self) -> &[SplitSet] {
        self.color_manager
            .as_deref()
            .map_or(&[], ColorManager::shared_marked_jumping_subtrees)
    }

    /// Whether anything warrants the outline layer.
    pub fn has_highlights(&self) -> bool {
        self.color_manager.as_deref().is_some_and(|m| {
            m.has_active_change_edges() || !m.shared_marked_jumping_subtrees().is_empty()
        })
    }

    fn is_hovered(&self, id: &NodeId) -> bool {
        self.hovered.as_ref() == Some(id)
    }
}

/// Highlight membership of one element.
#[derive(Debug, Clone, Copy, Default)]
struct Membership {
    marked: bool,
    downstream: bool,
    history: bool,
}

impl Membership {
    fn of(manager: &ColorManager, splits: &SplitSet) -> Self {
        Self {
            marked: manager.is_in_marked_subtree(splits),
            downstream: manager.is_downstream_of_active_edge(splits),
            history: manager.is_in_history(splits),
        }
    }

    /// Marked (colored or not) or below an active change edge.
    fn highlighted(self) -> bool {
        self.marked || self.downstream
    }

    /// Both dimming systems, multiplicatively.
    fn dimming(self, manager: &ColorManager, cache: &RenderStateCache) -> f32 {
        let mut factor = 1.0;
        if cache.dimming_enabled && manager.has_active_change_edges() && !self.downstream {
            factor *= cache.dimming_opacity;
        }
        if cache.subtree_dimming_enabled
            && !manager.shared_marked_jumping_subtrees().is_empty()
            && !self.marked
        {
            factor *= cache.subtree_dimming_opacity;
        }
        factor
    }

    /// Highlight color (marked first, then change edge) with pulse.
    fn highlight_color(self, manager: &ColorManager, cache: &RenderStateCache) -> Option<Rgba> {
        if self.marked && cache.marked_subtrees_enabled {
            Some(manager.marked_color())
        } else if self.downstream {
            Some(scale_alpha(manager.change_edge_color(), cache.pulse_opacity))
        } else {
            None
        }
    }
}

/// Pure style accessors.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayerStyleResolver;

impl LayerStyleResolver {
    // -- links -------------------------------------------------------------

    /// Branch color after highlighting, dimming and global opacity.
    pub fn link_color(&self, link: &Link, cache: &RenderStateCache) -> Rgba {
        let Some(manager) = cache.color_manager.as_deref() else {
            return scale_alpha(NEUTRAL_LINK, link.opacity * cache.link_connection_opacity);
        };
        if cache.is_hovered(&link.id) {
            return manager.hover_color();
        }
        let m = Membership::of(manager, &link.target_splits);
        let upcoming = cache.upcoming_changes_enabled && manager.is_upcoming_edge(link);
        let base = m
            .highlight_color(manager, cache)
            .or_else(|| upcoming.then_some(manager.upcoming_color()))
            .unwrap_or_else(|| manager.branch_color(link));
        scale_alpha(
            base,
            m.dimming(manager, cache) * cache.link_connection_opacity * link.opacity,
        )
    }

    /// Branch width; highlighted links are wider.
    pub fn link_width(&self, link: &Link, cache: &RenderStateCache) -> f32 {
        match cache.color_manager.as_deref() {
            Some(manager) if Membership::of(manager, &link.target_splits).highlighted() => {
                cache.stroke_width * HIGHLIGHT_WIDTH_SCALE
            }
            _ => cache.stroke_width,
        }
    }

    /// Dash pattern: length-proportional dashes on the active change edge,
    /// sparse dots on upcoming ones, `None` for solid.
    pub fn link_dash_array(&self, link: &Link, cache: &RenderStateCache) -> Option<[f32; 2]> {
        let manager = cache.color_manager.as_deref()?;
        let length = path_length(&link.path);
        if cache.dashing_enabled && manager.is_active_edge(link) {
            let d = (length / DASH_DIVISOR).clamp(DASH_RANGE.0, DASH_RANGE.1);
            Some([d, d / 2.0])
        } else if cache.upcoming_changes_enabled && manager.is_upcoming_edge(link) {
            let dot = (length / DOT_DIVISOR).clamp(DOT_RANGE.0, DOT_RANGE.1);
            Some([dot, dot * DOT_GAP_RATIO])
        } else {
            None
        }
    }

    /// Whether the link gets a halo.
    pub fn link_is_highlighted(&self, link: &Link, cache: &RenderStateCache) -> bool {
        cache
            .color_manager
            .as_deref()
            .is_some_and(|m| Membership::of(m, &link.target_splits).highlighted())
    }

    /// Halo color: the link color at half its alpha. `None` when the link
    /// is not highlighted.
    pub fn link_outline_color(&self, link: &Link, cache: &RenderStateCache) -> Option<Rgba> {
        if !self.link_is_highlighted(link, cache) {
            return None;
        }
        Some(scale_alpha(self.link_color(link, cache), OUTLINE_ALPHA))
    }

    /// Halo width.
    pub fn link_outline_width(&self, link: &Link, cache: &RenderStateCache) -> f32 {
        self.link_width(link, cache) + OUTLINE_EXTRA_WIDTH
    }

    /// Whether the outline layer has anything to draw.
    pub fn outline_layer_visible(&self, cache: &RenderStateCache) -> bool {
        cache.has_highlights()
    }

    // -- nodes -------------------------------------------------------------

    /// Node fill.
    pub fn node_color(&self, node: &Node, cache: &RenderStateCache) -> Rgba {
        let Some(manager) = cache.color_manager.as_deref() else {
            return scale_alpha(NEUTRAL_NODE, node.opacity);
        };
        if cache.is_hovered(&node.id) {
            return manager.hover_color();
        }
        let m = Membership::of(manager, &node.split_indices);
        let mut color = m
            .highlight_color(manager, cache)
            .unwrap_or_else(|| manager.node_color(node));
        if m.history {
            color = boost_alpha(color, HISTORY_ALPHA_BOOST);
        }
        scale_alpha(color, m.dimming(manager, cache) * node.opacity)
    }

    /// Node border: darker fill when highlighted, neutral otherwise.
    pub fn node_border_color(&self, node: &Node, cache: &RenderStateCache) -> Rgba {
        let Some(manager) = cache.color_manager.as_deref() else {
            return NEUTRAL_BORDER;
        };
        if Membership::of(manager, &node.split_indices).highlighted() {
            darken(self.node_color(node, cache), BORDER_DARKEN)
        } else {
            manager.neutral_border()
        }
    }

    /// Marker radius in pixels.
    pub fn node_radius(&self, node: &Node, cache: &RenderStateCache) -> f32 {
        let base = node.radius.max(cache.min_node_radius) * cache.node_size;
        let Some(manager) = cache.color_manager.as_deref() else {
            return base;
        };
        let m = Membership::of(manager, &node.split_indices);
        if m.marked && cache.marked_subtrees_enabled {
            base * MARKED_NODE_SCALE
        } else if m.highlighted() {
            base * HIGHLIGHT_NODE_SCALE
        } else {
            base
        }
    }

    // -- labels ------------------------------------------------------------

    /// Label text color.
    pub fn label_color(&self, label: &Label, cache: &RenderStateCache) -> Rgba {
        let Some(manager) = cache.color_manager.as_deref() else {
            return scale_alpha(NEUTRAL_LABEL, label.opacity);
        };
        if cache.is_hovered(&label.id) {
            return manager.hover_color();
        }
        let m = Membership::of(manager, &label.leaf_splits);
        let mut color = m
            .highlight_color(manager, cache)
            .unwrap_or_else(|| manager.label_color(label));
        if m.history {
            color = boost_alpha(color, HISTORY_ALPHA_BOOST);
        }
        scale_alpha(color, m.dimming(manager, cache) * label.opacity)
    }

    /// Label pixel height.
    pub fn label_size(&self, label: &Label, cache: &RenderStateCache) -> f32 {
        let Some(manager) = cache.color_manager.as_deref() else {
            return cache.font_size;
        };
        let m = Membership::of(manager, &label.leaf_splits);
        if m.marked && cache.marked_subtrees_enabled {
            cache.font_size * MARKED_LABEL_SCALE
        } else if m.history {
            cache.font_size * HISTORY_LABEL_SCALE
        } else {
            cache.font_size
        }
    }

    // -- extensions --------------------------------------------------------

    /// Extension color: follows the leaf, times the global link opacity.
    pub fn extension_color(&self, extension: &Extension, cache: &RenderStateCache) -> Rgba {
        let Some(manager) = cache.color_manager.as_deref() else {
            return scale_alpha(
                NEUTRAL_LINK,
                extension.opacity * cache.link_connection_opacity,
            );
        };
        let m = Membership::of(manager, &extension.leaf_splits);
        let mut color = m
            .highlight_color(manager, cache)
            .unwrap_or_else(|| manager.splits_color(&extension.leaf_splits));
        if m.history {
            color = boost_alpha(color, HISTORY_ALPHA_BOOST);
        }
        scale_alpha(
            color,
            m.dimming(manager, cache) * cache.link_connection_opacity * extension.opacity,
        )
    }

    /// Extension width. Marked wins over history; no compounding.
    pub fn extension_width(&self, extension: &Extension, cache: &RenderStateCache) -> f32 {
        let (marked, history, plain) = EXTENSION_SCALES;
        let Some(manager) = cache.color_manager.as_deref() else {
            return cache.stroke_width * plain;
        };
        let m = Membership::of(manager, &extension.leaf_splits);
        let scale = if m.marked {
            marked
        } else if m.history {
            history
        } else {
            plain
        };
        cache.stroke_width * scale
    }

    // -- trails and connectors ---------------------------------------------

    /// Color of one trail point.
    pub fn trail_color(&self, trail: &MotionTrail, alpha: f32, cache: &RenderStateCache) -> Rgba {
        let Some(manager) = cache.color_manager.as_deref() else {
            return scale_alpha(NEUTRAL_NODE, alpha);
        };
        let m = Membership::of(manager, &trail.splits);
        let color = m
            .highlight_color(manager, cache)
            .unwrap_or_else(|| manager.splits_color(&trail.splits));
        scale_alpha(color, alpha)
    }

    /// Jump connector color.
    pub fn connector_color(&self, cache: &RenderStateCache) -> Rgba {
        cache
            .color_manager
            .as_deref()
            .map_or(NEUTRAL_LINK, ColorManager::marked_color)
    }

    /// Hover highlight color.
    pub fn hover_color(&self, cache: &RenderStateCache) -> Rgba {
        cache
            .color_manager
            .as_deref()
            .map_or(HOVER_CYAN, ColorManager::hover_color)
    }
}
