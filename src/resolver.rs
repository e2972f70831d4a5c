//! Sequence position to index-space mapping.
//!
//! A movie interleaves full trees (`T`), pre-baked intermediates (`IT`) and
//! consensus trees (`C`). The resolver maps a sequence position onto the
//! three other index spaces the viewer needs:
//!
//! - the **highlight index** addressing per-transition metadata
//!   (`jumping_taxa`, `s_edges`, `covers`),
//! - the **distance index** addressing `rfd` / `w_rfd`,
//! - the **full-tree index** (position among the `T` entries).
//!
//! Typed-position lists are built lazily on first use and dropped whenever
//! the underlying names change. Every lookup is total: out-of-range input
//! yields `None` or `false`.

use std::cell::OnceCell;

use crate::keyframes::TreeKind;

/// Pure mapping from sequence positions to transition indices.
#[derive(Debug, Clone, Default)]
pub struct TransitionIndexResolver {
    kinds: Vec<TreeKind>,
    num_transitions: usize,
    full_tree_indices: OnceCell<Vec<usize>>,
    consensus_tree_indices: OnceCell<Vec<usize>>,
}

impl TransitionIndexResolver {
    /// Resolver over `names` with `num_transitions` metadata entries.
    pub fn new<S: AsRef<str>>(names: &[S], num_transitions: usize) -> Self {
        Self {
            kinds: names.iter().map(|n| TreeKind::classify(n.as_ref())).collect(),
            num_transitions,
            full_tree_indices: OnceCell::new(),
            consensus_tree_indices: OnceCell::new(),
        }
    }

    /// Replace the sequence. Invalidates both typed-index caches.
    pub fn set_tree_names<S: AsRef<str>>(&mut self, names: &[S]) {
        self.kinds = names.iter().map(|n| TreeKind::classify(n.as_ref())).collect();
        self.invalidate();
    }

    /// Replace the transition count.
    pub fn set_num_transitions(&mut self, num_transitions: usize) {
        self.num_transitions = num_transitions;
    }

    fn invalidate(&mut self) {
        drop(self.full_tree_indices.take());
        drop(self.consensus_tree_indices.take());
    }

    /// Sequence length.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Whether the sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Number of transitions with metadata.
    pub fn num_transitions(&self) -> usize {
        self.num_transitions
    }

    /// Kind of the entry at `p`.
    pub fn kind(&self, p: usize) -> Option<TreeKind> {
        self.kinds.get(p).copied()
    }

    /// Whether `p` is a full tree.
    pub fn is_full_tree(&self, p: usize) -> bool {
        self.kind(p) == Some(TreeKind::Full)
    }

    /// Whether `p` is a consensus tree.
    pub fn is_consensus_tree(&self, p: usize) -> bool {
        self.kind(p) == Some(TreeKind::Consensus)
    }

    /// Sorted positions of full trees.
    pub fn full_tree_indices(&self) -> &[usize] {
        self.full_tree_indices
            .get_or_init(|| self.positions_of(TreeKind::Full))
    }

    /// Sorted positions of consensus trees.
    pub fn consensus_tree_indices(&self) -> &[usize] {
        self.consensus_tree_indices
            .get_or_init(|| self.positions_of(TreeKind::Consensus))
    }

    fn positions_of(&self, kind: TreeKind) -> Vec<usize> {
        self.kinds
            .iter()
            .enumerate()
            .filter(|(_, k)| **k == kind)
            .map(|(i, _)| i)
            .collect()
    }

    /// Index into per-transition metadata for position `p`.
    ///
    /// The segment `[T_k, T_{k+1})` uses transition `k`. The final full
    /// tree stays on the last transition.
    pub fn highlighting_index(&self, p: usize) -> Option<usize> {
        if p >= self.len() {
            return None;
        }
        let k = last_at_or_before(self.full_tree_indices(), p)?;
        if k < self.num_transitions {
            Some(k)
        } else if p + 1 == self.len() && self.is_full_tree(p) && self.num_transitions > 0 {
            Some(self.num_transitions - 1)
        } else {
            None
        }
    }

    /// Index into the distance arrays for position `p`.
    ///
    /// A full tree `T_k` reports the distance that led to it (`k - 1`,
    /// floored at 0); anything else reports the transition in progress.
    pub fn distance_index(&self, p: usize) -> Option<usize> {
        if p >= self.len() {
            return None;
        }
        let fti = self.full_tree_indices();
        if self.is_full_tree(p) {
            let k = fti.binary_search(&p).ok()?;
            return Some(k.saturating_sub(1));
        }
        Some(last_at_or_before(fti, p).unwrap_or(0))
    }

    /// Representative sequence position for distance index `d`: the target
    /// full tree of transition `d`.
    pub fn tree_index_for_distance_index(&self, d: usize) -> Option<usize> {
        self.full_tree_indices().get(d + 1).copied()
    }

    /// Position among the full trees of the full tree at `p`.
    pub fn full_tree_number(&self, p: usize) -> Option<usize> {
        self.full_tree_indices().binary_search(&p).ok()
    }

    /// First full tree strictly after `p`.
    pub fn next_full_tree_sequence_index(&self, p: usize) -> Option<usize> {
        first_after(self.full_tree_indices(), p)
    }

    /// Last full tree strictly before `p`.
    pub fn previous_full_tree_sequence_index(&self, p: usize) -> Option<usize> {
        last_before(self.full_tree_indices(), p)
    }

    /// First consensus tree strictly after `p`.
    pub fn next_consensus_tree_sequence_index(&self, p: usize) -> Option<usize> {
        first_after(self.consensus_tree_indices(), p)
    }

    /// Last consensus tree strictly before `p`.
    pub fn previous_consensus_tree_sequence_index(&self, p: usize) -> Option<usize> {
        last_before(self.consensus_tree_indices(), p)
    }
}

/// Index `k` of the greatest `sorted[k] <= p`.
fn last_at_or_before(sorted: &[usize], p: usize) -> Option<usize> {
    sorted.partition_point(|&i| i <= p).checked_sub(1)
}

fn first_after(sorted: &[usize], p: usize) -> Option<usize> {
    sorted.get(sorted.partition_point(|&i| i <= p)).copied()
}

fn last_before(sorted: &[usize], p: usize) -> Option<usize> {
    let k = sorted.partition_point(|&i| i < p).checked_sub(1)?;
    sorted.get(k).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s1() -> TransitionIndexResolver {
        TransitionIndexResolver::new(&["T0", "IT1", "IT2", "T1", "IT3", "T2"], 2)
    }

    #[test]
    fn highlighting_index_per_segment() {
        let r = s1();
        let got: Vec<Option<usize>> = (0..6).map(|p| r.highlighting_index(p)).collect();
        assert_eq!(
            got,
            vec![Some(0), Some(0), Some(0), Some(1), Some(1), Some(1)]
        );
    }

    #[test]
    fn distance_index_labels_arrivals() {
        let r = s1();
        assert_eq!(r.distance_index(0), Some(0));
        assert_eq!(r.distance_index(3), Some(0));
        assert_eq!(r.distance_index(5), Some(1));
        assert_eq!(r.distance_index(1), Some(0));
        assert_eq!(r.distance_index(4), Some(1));
    }

    #[test]
    fn tree_index_for_distance() {
        let r = s1();
        assert_eq!(r.tree_index_for_distance_index(0), Some(3));
        assert_eq!(r.tree_index_for_distance_index(1), Some(5));
        assert_eq!(r.tree_index_for_distance_index(2), None);
    }

    #[test]
    fn out_of_range_is_total() {
        let r = s1();
        assert_eq!(r.highlighting_index(6), None);
        assert_eq!(r.distance_index(99), None);
        assert!(!r.is_full_tree(99));
        assert!(!r.is_consensus_tree(99));
    }

    #[test]
    fn highlighting_index_stays_in_range() {
        let r = TransitionIndexResolver::new(
            &["T0", "IT1", "T1", "C_1", "T2", "T3", "IT2"],
            2,
        );
        for p in 0..r.len() + 2 {
            if let Some(h) = r.highlighting_index(p) {
                assert!(h < r.num_transitions(), "p={p} h={h}");
            }
        }
        // Transitions 2 and 3 carry no metadata.
        assert_eq!(r.highlighting_index(4), None);
        assert_eq!(r.highlighting_index(5), None);
    }

    #[test]
    fn navigation() {
        let r = TransitionIndexResolver::new(
            &["T0", "IT1", "C_1", "T1", "consensus-2", "T2"],
            2,
        );
        assert_eq!(r.consensus_tree_indices(), &[2, 4]);
        assert_eq!(r.next_full_tree_sequence_index(0), Some(3));
        assert_eq!(r.previous_full_tree_sequence_index(3), Some(0));
        assert_eq!(r.previous_full_tree_sequence_index(0), None);
        assert_eq!(r.next_consensus_tree_sequence_index(2), Some(4));
        assert_eq!(r.previous_consensus_tree_sequence_index(4), Some(2));
        assert_eq!(r.full_tree_number(5), Some(2));
    }

    #[test]
    fn renaming_invalidates_caches() {
        let mut r = s1();
        assert_eq!(r.full_tree_indices(), &[0, 3, 5]);
        r.set_tree_names(&["T0", "T1"]);
        assert_eq!(r.full_tree_indices(), &[0, 1]);
        assert!(r.consensus_tree_indices().is_empty());
    }
}
