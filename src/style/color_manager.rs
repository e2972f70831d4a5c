//! Highlight state and taxa coloring.
//!
//! The [`ColorManager`] is the single source of truth for what is
//! highlighted in the visible frame: the marked jumping subtrees, the
//! active and upcoming change edges and the recent history. The controller
//! writes it right before styling a frame; the style resolver only reads
//! it. Snapshots are shared through a [`ColorChannel`], which bumps a
//! version number on every change so layers can diff on a scalar.

use std::sync::{mpsc, Arc};

use rustc_hash::{FxHashMap, FxHashSet};

use super::color::{parse_css_color, Rgba};
use crate::layout::{Label, Link, Node, SplitSet};
use crate::options::ColorOptions;

/// Highlight sets for the visible frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HighlightSets {
    /// Jumping subtrees of the current transition.
    pub marked: Vec<SplitSet>,
    /// Change edges active in the current transition.
    pub active_edges: Vec<SplitSet>,
    /// Change edges of the next transition.
    pub upcoming_edges: Vec<SplitSet>,
    /// Jumping subtrees of recent transitions.
    pub history: Vec<SplitSet>,
}

/// Base colors resolved once from the options.
#[derive(Debug, Clone, PartialEq)]
struct Palette {
    by_leaf_index: FxHashMap<u32, Rgba>,
    by_name: FxHashMap<String, Rgba>,
    default_branch: Rgba,
    default_node: Rgba,
    label: Rgba,
    marked: Rgba,
    change_edge: Rgba,
    upcoming: Rgba,
    neutral_border: Rgba,
    hover: Rgba,
}

/// Taxa colors plus the current highlight sets.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorManager {
    palette: Arc<Palette>,
    sets: HighlightSets,
    marked_leaves: FxHashSet<u32>,
}

impl ColorManager {
    /// Manager over `colors`. `taxa[i]` is the taxon with split index `i`;
    /// unparsable taxa colors are ignored with a warning.
    pub fn new(colors: &ColorOptions, taxa: &[String], high_contrast: bool) -> Self {
        let mut by_name = FxHashMap::default();
        for (name, css) in &colors.taxa_colors {
            match parse_css_color(css) {
                Some(rgba) => drop(by_name.insert(name.clone(), rgba)),
                None => log::warn!("ignoring unparsable color '{css}' for taxon '{name}'"),
            }
        }
        let by_leaf_index = taxa
            .iter()
            .enumerate()
            .filter_map(|(i, name)| {
                let idx = u32::try_from(i).ok()?;
                by_name.get(name).map(|c| (idx, *c))
            })
            .collect();
        let (marked, change_edge) = colors.highlight_pair(high_contrast);
        Self {
            palette: Arc::new(Palette {
                by_leaf_index,
                by_name,
                default_branch: colors.default_branch,
                default_node: colors.default_node,
                label: colors.label,
                marked,
                change_edge,
                upcoming: colors.upcoming,
                neutral_border: colors.neutral_border,
                hover: colors.hover,
            }),
            sets: HighlightSets::default(),
            marked_leaves: FxHashSet::default(),
        }
    }

    /// Copy with `sets` as the highlight state. Shares the palette.
    #[must_use]
    pub fn with_highlights(&self, sets: HighlightSets) -> Self {
        let marked_leaves = sets
            .marked
            .iter()
            .flat_map(|s| s.as_slice().iter().copied())
            .collect();
        Self {
            palette: Arc::clone(&self.palette),
            sets,
            marked_leaves,
        }
    }

    /// Current highlight sets.
    pub fn highlights(&self) -> &HighlightSets {
        &self.sets
    }

    /// Jumping subtrees marked in the visible frame.
    pub fn shared_marked_jumping_subtrees(&self) -> &[SplitSet] {
        &self.sets.marked
    }

    /// Whether the visible transition has change edges.
    pub fn has_active_change_edges(&self) -> bool {
        !self.sets.active_edges.is_empty()
    }

    // -- membership --------------------------------------------------------

    /// Whether `splits` lie inside some marked subtree.
    pub fn is_in_marked_subtree(&self, splits: &SplitSet) -> bool {
        // Quick reject on the union before the per-subtree subset test.
        if splits.is_empty()
            || !splits.as_slice().iter().all(|i| self.marked_leaves.contains(i))
        {
            return false;
        }
        self.sets.marked.iter().any(|m| splits.is_subset_of(m))
    }

    /// Whether `splits` lie below some active change edge.
    pub fn is_downstream_of_active_edge(&self, splits: &SplitSet) -> bool {
        self.sets
            .active_edges
            .iter()
            .any(|e| splits.is_subset_of(e))
    }

    /// Whether `splits` lie inside a recent jumping subtree.
    pub fn is_in_history(&self, splits: &SplitSet) -> bool {
        self.sets.history.iter().any(|h| splits.is_subset_of(h))
    }

    /// Whether the link is an active change edge itself.
    pub fn is_active_edge(&self, link: &Link) -> bool {
        self.sets.active_edges.contains(&link.target_splits)
    }

    /// Whether the link is a change edge of the next transition.
    pub fn is_upcoming_edge(&self, link: &Link) -> bool {
        self.sets.upcoming_edges.contains(&link.target_splits)
    }

    /// Link inside a marked subtree.
    pub fn is_link_in_marked_subtree(&self, link: &Link) -> bool {
        self.is_in_marked_subtree(&link.target_splits)
    }

    /// Node inside a marked subtree.
    pub fn is_node_in_marked_subtree(&self, node: &Node) -> bool {
        self.is_in_marked_subtree(&node.split_indices)
    }

    /// Link below an active change edge.
    pub fn is_downstream_of_any_active_change_edge(&self, link: &Link) -> bool {
        self.is_downstream_of_active_edge(&link.target_splits)
    }

    /// Node below an active change edge.
    pub fn is_node_downstream_of_any_active_change_edge(&self, node: &Node) -> bool {
        self.is_downstream_of_active_edge(&node.split_indices)
    }

    // -- colors ------------------------------------------------------------

    /// Shared taxa color of every leaf in `splits`, if they agree.
    fn taxa_color(&self, splits: &SplitSet) -> Option<Rgba> {
        let mut colors = splits
            .as_slice()
            .iter()
            .map(|i| self.palette.by_leaf_index.get(i).copied());
        let first = colors.next()??;
        colors.all(|c| c == Some(first)).then_some(first)
    }

    /// Base branch color from the taxa map.
    pub fn branch_color(&self, link: &Link) -> Rgba {
        self.taxa_color(&link.target_splits)
            .unwrap_or(self.palette.default_branch)
    }

    /// Branch color with highlight precedence: marked (when enabled), then
    /// active change edge, then base.
    pub fn branch_color_with_highlights(&self, link: &Link, marked_enabled: bool) -> Rgba {
        if marked_enabled && self.is_link_in_marked_subtree(link) {
            self.palette.marked
        } else if self.is_downstream_of_any_active_change_edge(link) {
            self.palette.change_edge
        } else {
            self.branch_color(link)
        }
    }

    /// Base node color: the taxon color of a leaf, or the shared color of
    /// an internal node's leaves.
    pub fn node_color(&self, node: &Node) -> Rgba {
        node.kind
            .leaf_name()
            .and_then(|n| self.palette.by_name.get(n).copied())
            .or_else(|| self.taxa_color(&node.split_indices))
            .unwrap_or(self.palette.default_node)
    }

    /// Base label color.
    pub fn label_color(&self, label: &Label) -> Rgba {
        self.palette
            .by_name
            .get(&label.text)
            .copied()
            .or_else(|| self.taxa_color(&label.leaf_splits))
            .unwrap_or(self.palette.label)
    }

    /// Base color of any element given its splits.
    pub fn splits_color(&self, splits: &SplitSet) -> Rgba {
        self.taxa_color(splits).unwrap_or(self.palette.default_node)
    }

    /// Jumping-subtree highlight.
    pub fn marked_color(&self) -> Rgba {
        self.palette.marked
    }

    /// Change-edge highlight.
    pub fn change_edge_color(&self) -> Rgba {
        self.palette.change_edge
    }

    /// Upcoming change-edge color.
    pub fn upcoming_color(&self) -> Rgba {
        self.palette.upcoming
    }

    /// Border of non-highlighted nodes.
    pub fn neutral_border(&self) -> Rgba {
        self.palette.neutral_border
    }

    /// Hover highlight.
    pub fn hover_color(&self) -> Rgba {
        self.palette.hover
    }
}

/// Publishes [`ColorManager`] snapshots and versions them.
pub struct ColorChannel {
    current: Arc<ColorManager>,
    version: u64,
    subscribers: Vec<mpsc::Sender<u64>>,
}

impl ColorChannel {
    /// Channel starting at `initial`, version 0.
    pub fn new(initial: ColorManager) -> Self {
        Self {
            current: Arc::new(initial),
            version: 0,
            subscribers: Vec::new(),
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<ColorManager> {
        Arc::clone(&self.current)
    }

    /// Bumped on every effective publish.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Receive the new version after every effective publish.
    pub fn subscribe(&mut self) -> mpsc::Receiver<u64> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Replace the snapshot. Identical snapshots are ignored; returns
    /// whether the version changed.
    pub fn publish(&mut self, manager: ColorManager) -> bool {
        if *self.current == manager {
            return false;
        }
        self.current = Arc::new(manager);
        self.version += 1;
        let version = self.version;
        self.subscribers.retain(|tx| tx.send(version).is_ok());
        true
    }

    /// Bump the version without changing the snapshot, for style inputs
    /// that live outside the manager (display and highlight options).
    pub fn touch(&mut self) -> u64 {
        self.version += 1;
        let version = self.version;
        self.subscribers.retain(|tx| tx.send(version).is_ok());
        version
    }

    /// Publish new highlight sets on top of the current palette.
    pub fn publish_highlights(&mut self, sets: HighlightSets) -> bool {
        if self.current.sets == sets {
            return false;
        }
        let next = self.current.with_highlights(sets);
        self.publish(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{LinkPolar, NodeId};

    fn link(splits: &[u32]) -> Link {
        let target_splits = SplitSet::new(splits.iter().copied());
        Link {
            id: NodeId::from_splits(&target_splits),
            source: NodeId::from("root"),
            target: NodeId::from_splits(&target_splits),
            source_splits: SplitSet::new(0..10),
            target_splits,
            target_is_leaf: splits.len() == 1,
            path: Vec::new(),
            polar_data: LinkPolar::default(),
            opacity: 1.0,
        }
    }

    fn manager() -> ColorManager {
        let mut colors = ColorOptions::default();
        let _ = colors.taxa_colors.insert("A".to_owned(), "#ff0000".to_owned());
        let _ = colors.taxa_colors.insert("B".to_owned(), "#ff0000".to_owned());
        let _ = colors.taxa_colors.insert("C".to_owned(), "#0000ff".to_owned());
        let taxa = ["A", "B", "C"].map(str::to_owned);
        ColorManager::new(&colors, &taxa, false)
    }

    #[test]
    fn taxa_colors_resolve_by_split_index() {
        let m = manager();
        assert_eq!(m.branch_color(&link(&[0])), [255, 0, 0, 255]);
        assert_eq!(m.branch_color(&link(&[0, 1])), [255, 0, 0, 255]);
        // Mixed colors fall back to the default.
        assert_eq!(
            m.branch_color(&link(&[1, 2])),
            ColorOptions::default().default_branch
        );
    }

    #[test]
    fn highlight_precedence() {
        let m = manager().with_highlights(HighlightSets {
            marked: vec![SplitSet::new([0])],
            active_edges: vec![SplitSet::new([0, 1])],
            ..HighlightSets::default()
        });
        assert_eq!(m.branch_color_with_highlights(&link(&[0]), true), m.marked_color());
        assert_eq!(
            m.branch_color_with_highlights(&link(&[0]), false),
            m.change_edge_color()
        );
        assert_eq!(
            m.branch_color_with_highlights(&link(&[1]), true),
            m.change_edge_color()
        );
        assert_eq!(m.branch_color_with_highlights(&link(&[2]), true), [0, 0, 255, 255]);
        assert!(m.is_active_edge(&link(&[0, 1])));
        assert!(!m.is_active_edge(&link(&[0])));
    }

    #[test]
    fn marked_membership_requires_subset() {
        let m = manager().with_highlights(HighlightSets {
            marked: vec![SplitSet::new([50, 51, 52])],
            ..HighlightSets::default()
        });
        assert!(m.is_in_marked_subtree(&SplitSet::new([50])));
        assert!(m.is_in_marked_subtree(&SplitSet::new([51, 52])));
        assert!(!m.is_in_marked_subtree(&SplitSet::new([1])));
        assert!(!m.is_in_marked_subtree(&SplitSet::new([50, 53])));
        assert!(!m.is_in_marked_subtree(&SplitSet::default()));
    }

    #[test]
    fn channel_versions_only_on_change() {
        let mut channel = ColorChannel::new(manager());
        let rx = channel.subscribe();
        let sets = HighlightSets {
            marked: vec![SplitSet::new([1])],
            ..HighlightSets::default()
        };
        assert!(channel.publish_highlights(sets.clone()));
        assert!(!channel.publish_highlights(sets));
        assert_eq!(channel.version(), 1);
        assert_eq!(rx.try_recv().ok(), Some(1));
        assert!(rx.try_recv().is_err());
        assert_eq!(
            channel.snapshot().shared_marked_jumping_subtrees(),
            &[SplitSet::new([1])]
        );
    }
}
