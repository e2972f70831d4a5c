//! Per-transition metadata: jumping subtrees, s-edges, cover atoms,
//! distances and the MSA window.
//!
//! Built once at load time. Index `k` addresses the transition
//! `(T_k, T_{k+1})`.

use serde::{Deserialize, Serialize};

use crate::layout::SplitSet;

/// Cover-set atoms of the source (`t1`) and target (`t2`) trees.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Cover {
    /// Atoms in the source tree.
    pub t1: Vec<SplitSet>,
    /// Atoms in the target tree.
    pub t2: Vec<SplitSet>,
}

impl Cover {
    /// Union of every atom on both sides: the leaves that move.
    pub fn moving_set(&self) -> SplitSet {
        self.t1
            .iter()
            .chain(&self.t2)
            .fold(SplitSet::default(), |acc, s| acc.union(s))
    }

    /// Whether both sides are empty.
    pub fn is_empty(&self) -> bool {
        self.t1.is_empty() && self.t2.is_empty()
    }
}

/// Highlight data for one transition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionRecord {
    /// Jumping subtrees to mark, as split-index sets.
    pub jumping_taxa: Vec<SplitSet>,
    /// Active change edges in the source tree.
    pub s_edges: Vec<SplitSet>,
    /// Cover atoms for subtree-only motion.
    pub cover: Cover,
}

/// Metadata for every transition of a movie.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionMetadata {
    records: Vec<TransitionRecord>,
}

impl TransitionMetadata {
    /// Wrap per-transition records.
    pub fn new(records: Vec<TransitionRecord>) -> Self {
        Self { records }
    }

    /// Number of transitions.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there are no transitions.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record for transition `k`.
    pub fn get(&self, k: usize) -> Option<&TransitionRecord> {
        self.records.get(k)
    }

    /// Jumping subtrees of transition `k`; empty out of range.
    pub fn jumping_taxa(&self, k: usize) -> &[SplitSet] {
        self.records.get(k).map_or(&[], |r| &r.jumping_taxa)
    }

    /// Active change edges of transition `k`; empty out of range.
    pub fn s_edges(&self, k: usize) -> &[SplitSet] {
        self.records.get(k).map_or(&[], |r| &r.s_edges)
    }

    /// Cover atoms of transition `k`.
    pub fn cover(&self, k: usize) -> Option<&Cover> {
        self.records.get(k).map(|r| &r.cover)
    }

    /// Records in transition order.
    pub fn iter(&self) -> std::slice::Iter<'_, TransitionRecord> {
        self.records.iter()
    }
}

/// Robinson-Foulds distances per transition, forwarded to charts.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Distances {
    /// Unweighted RF distance.
    pub rfd: Vec<f64>,
    /// Weighted RF distance.
    pub w_rfd: Vec<f64>,
}

impl Distances {
    /// `(rfd, w_rfd)` at distance index `d`.
    pub fn at(&self, d: usize) -> (Option<f64>, Option<f64>) {
        (self.rfd.get(d).copied(), self.w_rfd.get(d).copied())
    }
}

/// Sliding alignment window parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MsaWindow {
    /// Columns per window.
    pub size: usize,
    /// Columns between consecutive windows.
    pub step: usize,
}

impl Default for MsaWindow {
    fn default() -> Self {
        Self { size: 1, step: 1 }
    }
}

impl MsaWindow {
    /// 1-based inclusive alignment columns of the window for full tree
    /// `tree_index`.
    pub fn columns(&self, tree_index: usize) -> (usize, usize) {
        let start = tree_index * self.step + 1;
        (start, start + self.size.saturating_sub(1))
    }
}
