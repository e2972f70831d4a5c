//! Backend movie payload.
//!
//! [`MovieData`] mirrors the JSON the tree-processing backend returns and
//! converts it into a validated [`KeyframeStore`]. Optional arrays may be
//! missing; once present, per-transition arrays must have exactly one
//! entry per transition and per-tree arrays one entry per tree.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::metadata::{Cover, Distances, MsaWindow, TransitionMetadata, TransitionRecord};
use super::{KeyframeStore, TreeData};
use crate::error::MovieError;
use crate::layout::SplitSet;
use crate::resolver::TransitionIndexResolver;

/// Stage of the s-edge interpolation a tree belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TreePhase {
    /// An input tree.
    Original,
    /// Branch lengths shrinking toward the collapse.
    DownPhase,
    /// Collapsed consensus.
    CollapsePhase,
    /// Leaves reordered on the collapsed tree.
    ReorderPhase,
    /// Branch lengths growing back before the snap.
    PreSnapPhase,
    /// Snapped to the reference topology.
    SnapPhase,
    /// Not recognized.
    Unknown,
}

impl TreePhase {
    /// Phase from a tree name. Checks run in a fixed order.
    pub fn from_name(name: &str) -> Self {
        if name.starts_with('T') {
            Self::Original
        } else if name.contains("_down_") {
            Self::DownPhase
        } else if name.starts_with('C') && !name.contains("_reorder") {
            Self::CollapsePhase
        } else if name.contains("_reorder") {
            Self::ReorderPhase
        } else if name.contains("_up_") {
            Self::PreSnapPhase
        } else if name.contains("_ref_") {
            Self::SnapPhase
        } else {
            Self::Unknown
        }
    }
}

/// Parse an s-edge tracker string such as `"(1,3,5)"`.
///
/// Empty or malformed input yields `None`.
pub fn parse_s_edge_tracker(tracker: &str) -> Option<SplitSet> {
    let inner = tracker.trim().trim_start_matches('(').trim_end_matches(')');
    if inner.trim().is_empty() {
        return None;
    }
    inner
        .split(',')
        .map(|part| part.trim().parse::<u32>().ok())
        .collect::<Option<Vec<u32>>>()
        .map(SplitSet::from)
}

/// Per-tree metadata emitted by the backend.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeMetadata {
    /// Tree name.
    pub tree_name: Option<String>,
    /// Index of the input tree this one derives from.
    pub source_tree_index: Option<usize>,
    /// Pair key such as `pair_0_1`.
    pub tree_pair_key: Option<String>,
    /// Active s-edge, as `"(1,2,3)"`.
    pub s_edge_tracker: Option<String>,
    /// Step within the pair.
    pub step_in_pair: Option<usize>,
    /// Interpolation phase; derived from the name when absent.
    pub phase: Option<TreePhase>,
}

impl TreeMetadata {
    /// Explicit phase, else one derived from the tree name.
    pub fn resolved_phase(&self) -> TreePhase {
        self.phase.unwrap_or_else(|| {
            self.tree_name
                .as_deref()
                .map_or(TreePhase::Unknown, TreePhase::from_name)
        })
    }
}

/// Alignment window parameters as sent by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MsaParams {
    /// Columns per window.
    pub window_size: usize,
    /// Columns between windows.
    pub step_size: usize,
}

impl Default for MsaParams {
    fn default() -> Self {
        Self {
            window_size: 1,
            step_size: 1,
        }
    }
}

/// The backend payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MovieData {
    /// Trees in sequence order.
    #[serde(alias = "interpolated_trees")]
    pub tree_list: Vec<TreeData>,
    /// Tree names; taken from `tree_metadata` when empty.
    pub tree_names: Vec<String>,
    /// Per-tree metadata.
    pub tree_metadata: Vec<TreeMetadata>,
    /// RF distance per transition.
    pub rfd_list: Vec<f64>,
    /// Weighted RF distance per transition.
    #[serde(alias = "weighted_robinson_foulds_distance_list")]
    pub wrfd_list: Vec<f64>,
    /// Taxon order of the first tree.
    pub sorted_leaves: Vec<String>,
    /// Jumping subtrees per transition.
    #[serde(alias = "to_be_highlighted")]
    pub highlighted_elements: Vec<Vec<SplitSet>>,
    /// Active s-edge per tree (`null` where none).
    pub lattice_edge_tracking: Vec<Option<SplitSet>>,
    /// Active change edges per transition; derived from tracking when empty.
    pub s_edges: Vec<Vec<SplitSet>>,
    /// Cover atoms per transition.
    pub covers: Vec<Cover>,
    /// Alignment window.
    pub msa: MsaParams,
}

impl MovieData {
    /// Parse a JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`MovieError::MovieLoad`] on malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, MovieError> {
        serde_json::from_str(json).map_err(|e| MovieError::movie_load(e.to_string()))
    }

    /// Read and parse a JSON payload from disk.
    ///
    /// # Errors
    ///
    /// Returns [`MovieError::Io`] if the file cannot be read, or
    /// [`MovieError::MovieLoad`] on malformed JSON.
    pub fn from_path(path: &Path) -> Result<Self, MovieError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Tree names, falling back to the metadata names.
    fn resolved_names(&self) -> Result<Vec<String>, MovieError> {
        if !self.tree_names.is_empty() {
            return Ok(self.tree_names.clone());
        }
        self.tree_metadata
            .iter()
            .enumerate()
            .map(|(i, m)| {
                m.tree_name
                    .clone()
                    .ok_or_else(|| MovieError::movie_load(format!("tree {i} has no name")))
            })
            .collect()
    }

    /// Phase of every tree.
    pub fn phases(&self) -> Vec<TreePhase> {
        if self.tree_metadata.is_empty() {
            return self.tree_names.iter().map(|n| TreePhase::from_name(n)).collect();
        }
        self.tree_metadata.iter().map(TreeMetadata::resolved_phase).collect()
    }

    /// Active s-edge per tree, from `lattice_edge_tracking` or the
    /// metadata tracker strings.
    fn tracked_s_edges(&self, tree_count: usize) -> Result<Vec<Option<SplitSet>>, MovieError> {
        if !self.lattice_edge_tracking.is_empty() {
            check_len("lattice_edge_tracking", self.lattice_edge_tracking.len(), tree_count)?;
            return Ok(self.lattice_edge_tracking.clone());
        }
        if !self.tree_metadata.is_empty() {
            check_len("tree_metadata", self.tree_metadata.len(), tree_count)?;
            return Ok(self
                .tree_metadata
                .iter()
                .map(|m| m.s_edge_tracker.as_deref().and_then(parse_s_edge_tracker))
                .collect());
        }
        Ok(vec![None; tree_count])
    }

    /// Validate and convert into a [`KeyframeStore`].
    ///
    /// # Errors
    ///
    /// Returns [`MovieError::MovieLoad`] when arrays have the wrong length
    /// or names are missing, and [`MovieError::Validation`] when the
    /// sequence itself is invalid.
    pub fn into_store(self) -> Result<KeyframeStore, MovieError> {
        let names = self.resolved_names()?;
        let tree_count = self.tree_list.len();
        check_len("tree_names", names.len(), tree_count)?;

        let resolver = TransitionIndexResolver::new(&names, 0);
        let full = resolver.full_tree_indices();
        let transitions = full.len().saturating_sub(1);

        for (label, len) in [
            ("highlighted_elements", self.highlighted_elements.len()),
            ("s_edges", self.s_edges.len()),
            ("covers", self.covers.len()),
        ] {
            if len != 0 {
                check_len(label, len, transitions)?;
            }
        }

        let s_edges = if self.s_edges.is_empty() {
            let tracked = self.tracked_s_edges(tree_count)?;
            (0..transitions)
                .map(|k| collect_segment_edges(&tracked, full[k], full[k + 1]))
                .collect()
        } else {
            self.s_edges.clone()
        };

        let records: Vec<TransitionRecord> = (0..transitions)
            .map(|k| TransitionRecord {
                jumping_taxa: self.highlighted_elements.get(k).cloned().unwrap_or_default(),
                s_edges: s_edges.get(k).cloned().unwrap_or_default(),
                cover: self.covers.get(k).cloned().unwrap_or_default(),
            })
            .collect();

        let missing_jumps = records.iter().filter(|r| r.jumping_taxa.is_empty()).count();
        if missing_jumps > 0 && !self.highlighted_elements.is_empty() {
            log::warn!("{missing_jumps} of {transitions} transitions have no jumping subtrees");
        }

        let msa = MsaWindow {
            size: self.msa.window_size,
            step: self.msa.step_size,
        };
        let distances = Distances {
            rfd: self.rfd_list,
            w_rfd: self.wrfd_list,
        };
        let store = KeyframeStore::new(self.tree_list, names, TransitionMetadata::new(records))?
            .with_distances(distances)
            .map_err(|e| MovieError::movie_load(e.to_string()))?
            .with_msa_window(msa)
            .with_sorted_leaves(self.sorted_leaves);
        Ok(store)
    }
}

fn check_len(label: &str, got: usize, expected: usize) -> Result<(), MovieError> {
    if got == expected {
        Ok(())
    } else {
        Err(MovieError::movie_load(format!(
            "{label} has {got} entries, expected {expected}"
        )))
    }
}

/// Distinct tracked edges of the trees in `[start, end)`, in order of
/// first appearance.
fn collect_segment_edges(
    tracked: &[Option<SplitSet>],
    start: usize,
    end: usize,
) -> Vec<SplitSet> {
    let mut edges: Vec<SplitSet> = Vec::new();
    for edge in tracked.get(start..end).unwrap_or(&[]).iter().flatten() {
        if !edges.contains(edge) {
            edges.push(edge.clone());
        }
    }
    edges
}
