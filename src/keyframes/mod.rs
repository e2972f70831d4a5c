//! Immutable keyframe sequence and its per-transition metadata.
//!
//! A [`KeyframeStore`] is built once at load time and validated there, so
//! nothing downstream has to cope with missing or mismatched arrays.

pub mod metadata;
pub mod movie;
pub mod tree;

use std::sync::Arc;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::MovieError;
use crate::resolver::TransitionIndexResolver;

pub use metadata::{Cover, Distances, MsaWindow, TransitionMetadata, TransitionRecord};
pub use movie::{parse_s_edge_tracker, MovieData, TreePhase};
pub use tree::TreeData;

/// Kind of a sequence entry, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TreeKind {
    /// Full input tree.
    #[serde(rename = "T")]
    Full,
    /// Pre-baked intermediate between two full trees.
    #[serde(rename = "IT")]
    Intermediate,
    /// Consensus tree.
    #[serde(rename = "C")]
    Consensus,
    /// Anything else.
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl TreeKind {
    /// Classify a tree name.
    ///
    /// `IT…` is checked first so that `IT3` is not taken for a full tree.
    pub fn classify(name: &str) -> Self {
        if name.starts_with("IT") {
            Self::Intermediate
        } else if is_consensus_name(name) {
            Self::Consensus
        } else if ends_with_t_number(name) {
            Self::Full
        } else {
            Self::Unknown
        }
    }
}

/// `C_<digits>` or `[Cc]onsensus[_-]?<digits>`.
fn is_consensus_name(name: &str) -> bool {
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if let Some(rest) = name.strip_prefix("C_") {
        return all_digits(rest);
    }
    let rest = name
        .strip_prefix("Consensus")
        .or_else(|| name.strip_prefix("consensus"));
    match rest {
        Some(rest) => {
            let rest = rest
                .strip_prefix('_')
                .or_else(|| rest.strip_prefix('-'))
                .unwrap_or(rest);
            all_digits(rest)
        }
        None => false,
    }
}

/// `…T<digits>` at the end of the name.
fn ends_with_t_number(name: &str) -> bool {
    let stem = name.trim_end_matches(|c: char| c.is_ascii_digit());
    stem.len() < name.len() && stem.ends_with('T')
}

/// One sequence entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Unique name.
    pub name: String,
    /// Classified kind.
    #[serde(rename = "type")]
    pub kind: TreeKind,
}

impl TreeEntry {
    /// Entry for `name`, classified.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let kind = TreeKind::classify(&name);
        Self { name, kind }
    }
}

/// Ordered, immutable movie: trees, names, transition metadata.
#[derive(Debug, Clone)]
pub struct KeyframeStore {
    entries: Vec<TreeEntry>,
    trees: Vec<Arc<TreeData>>,
    metadata: TransitionMetadata,
    distances: Distances,
    msa: MsaWindow,
    sorted_leaves: Vec<String>,
    resolver: TransitionIndexResolver,
}

impl KeyframeStore {
    /// Build and validate a store.
    ///
    /// # Errors
    ///
    /// Returns [`MovieError::Validation`] when names are duplicated, when
    /// tree and name counts differ, when the sequence is empty, or when
    /// the metadata does not have one record per full-tree transition.
    pub fn new(
        trees: Vec<TreeData>,
        names: Vec<String>,
        metadata: TransitionMetadata,
    ) -> Result<Self, MovieError> {
        if trees.is_empty() {
            return Err(MovieError::validation("movie has no trees"));
        }
        if trees.len() != names.len() {
            return Err(MovieError::validation(format!(
                "{} trees but {} names",
                trees.len(),
                names.len()
            )));
        }
        let mut seen = FxHashSet::default();
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(MovieError::validation(format!(
                    "duplicate tree name '{name}'"
                )));
            }
        }

        let entries: Vec<TreeEntry> = names.into_iter().map(TreeEntry::new).collect();
        let full_trees = entries
            .iter()
            .filter(|e| e.kind == TreeKind::Full)
            .count();
        let expected = full_trees.saturating_sub(1);
        if metadata.len() != expected {
            return Err(MovieError::validation(format!(
                "{full_trees} full trees need {expected} transition records, got {}",
                metadata.len()
            )));
        }

        let resolver = TransitionIndexResolver::new(
            &entries.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
            metadata.len(),
        );
        log::info!(
            "keyframe store: {} trees ({full_trees} full), {} transitions",
            entries.len(),
            metadata.len()
        );

        Ok(Self {
            entries,
            trees: trees.into_iter().map(Arc::new).collect(),
            metadata,
            distances: Distances::default(),
            msa: MsaWindow::default(),
            sorted_leaves: Vec::new(),
            resolver,
        })
    }

    /// Attach distance arrays.
    ///
    /// # Errors
    ///
    /// Returns [`MovieError::Validation`] when a non-empty array does not
    /// have one value per transition.
    pub fn with_distances(mut self, distances: Distances) -> Result<Self, MovieError> {
        let n = self.num_transitions();
        for (label, len) in [("rfd", distances.rfd.len()), ("w_rfd", distances.w_rfd.len())] {
            if len != 0 && len != n {
                return Err(MovieError::validation(format!(
                    "{label} has {len} values for {n} transitions"
                )));
            }
        }
        self.distances = distances;
        Ok(self)
    }

    /// Attach MSA window parameters.
    #[must_use]
    pub fn with_msa_window(mut self, msa: MsaWindow) -> Self {
        self.msa = msa;
        self
    }

    /// Attach the taxon order of the first tree.
    #[must_use]
    pub fn with_sorted_leaves(mut self, leaves: Vec<String>) -> Self {
        self.sorted_leaves = leaves;
        self
    }

    /// Taxon names by split index: the sorted leaves when given, else the
    /// leaf order of the first tree.
    pub fn taxa(&self) -> Vec<String> {
        if !self.sorted_leaves.is_empty() {
            return self.sorted_leaves.clone();
        }
        self.trees.first().map(|t| t.leaf_names()).unwrap_or_default()
    }

    /// Number of sequence entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false` for a validated store.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `p`.
    pub fn entry(&self, p: usize) -> Option<&TreeEntry> {
        self.entries.get(p)
    }

    /// All entries in order.
    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    /// Tree at `p`, shared.
    pub fn tree(&self, p: usize) -> Option<Arc<TreeData>> {
        self.trees.get(p).cloned()
    }

    /// Per-transition metadata.
    pub fn metadata(&self) -> &TransitionMetadata {
        &self.metadata
    }

    /// Number of transitions.
    pub fn num_transitions(&self) -> usize {
        self.metadata.len()
    }

    /// Distance arrays.
    pub fn distances(&self) -> &Distances {
        &self.distances
    }

    /// MSA window parameters.
    pub fn msa_window(&self) -> MsaWindow {
        self.msa
    }

    /// Taxon order of the first tree.
    pub fn sorted_leaves(&self) -> &[String] {
        &self.sorted_leaves
    }

    /// Index resolver for this sequence.
    pub fn resolver(&self) -> &TransitionIndexResolver {
        &self.resolver
    }
}
