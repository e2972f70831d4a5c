//! Keyframe-index keyed cache of computed layouts.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::Layout;

/// Computed layouts keyed by keyframe index.
///
/// Main-thread only; the worker never touches it. Entries survive until
/// [`invalidate`](Self::invalidate) (topology, branch-length or
/// layout-angle change).
#[derive(Debug, Default)]
pub struct LayoutCache {
    entries: FxHashMap<usize, Arc<Layout>>,
    generation: u64,
}

impl LayoutCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Layout for keyframe `k`, if cached.
    pub fn get(&self, k: usize) -> Option<Arc<Layout>> {
        self.entries.get(&k).cloned()
    }

    /// Whether keyframe `k` is cached.
    pub fn has(&self, k: usize) -> bool {
        self.entries.contains_key(&k)
    }

    /// Store the layout for keyframe `k`, replacing any previous entry.
    pub fn set(&mut self, k: usize, layout: Arc<Layout>) {
        drop(self.entries.insert(k, layout));
    }

    /// Drop every entry. Bumps the generation so that callers can discard
    /// results computed against the old options.
    pub fn invalidate(&mut self) {
        self.entries.clear();
        self.generation += 1;
        log::debug!("layout cache invalidated (generation {})", self.generation);
    }

    /// Incremented on every invalidation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of cached layouts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent cached keyframe at or before `k`.
    pub fn nearest_at_or_before(&self, k: usize) -> Option<usize> {
        self.entries.keys().copied().filter(|&i| i <= k).max()
    }
}
