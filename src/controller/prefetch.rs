//! In-flight layout job bookkeeping.
//!
//! Jobs are keyed by keyframe index, so a repeated request for an index
//! that is already in flight is a no-op. Moving the playhead cancels
//! speculative jobs outside the horizon: their results are still cached
//! when they arrive but do not wake the frame loop. Invalidating the cache
//! marks every in-flight job stale and its result is dropped.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::layout::worker::{LayoutOutcome, LayoutResponse};
use crate::layout::Layout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobState {
    /// Inside the horizon; the frame loop waits on it.
    Wanted,
    /// Left the horizon; result accepted quietly.
    Cancelled,
    /// Computed against invalidated options; result dropped.
    Stale,
}

/// What to do with a worker response.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Store the layout. `wake` is false for cancelled jobs.
    Accepted {
        /// Keyframe index.
        index: usize,
        /// Computed layout.
        layout: Arc<Layout>,
        /// Whether the frame loop should redraw for it.
        wake: bool,
    },
    /// The job failed; the index may be retried unless `gave_up`.
    Failed {
        /// Keyframe index.
        index: usize,
        /// Failures so far for this index.
        attempts: u32,
        /// Whether the retry budget is exhausted.
        gave_up: bool,
        /// Worker error text.
        error: String,
    },
    /// Stale or unknown job; nothing to do.
    Discarded,
}

/// Prefetch window and in-flight set.
#[derive(Debug, Clone)]
pub struct PrefetchPlan {
    inflight: FxHashMap<usize, JobState>,
    failures: FxHashMap<usize, u32>,
    horizon: usize,
    ahead: usize,
    max_failures: u32,
}

impl PrefetchPlan {
    /// Plan keeping jobs within `horizon` keyframes of the playhead and
    /// prefetching `ahead` keyframes past the target pair.
    pub fn new(horizon: usize, ahead: usize, max_failures: u32) -> Self {
        Self {
            inflight: FxHashMap::default(),
            failures: FxHashMap::default(),
            horizon,
            ahead,
            max_failures,
        }
    }

    /// Change the window sizes; in-flight jobs are kept.
    pub fn configure(&mut self, horizon: usize, ahead: usize, max_failures: u32) {
        self.horizon = horizon;
        self.ahead = ahead;
        self.max_failures = max_failures;
    }

    /// Keyframes the frame at `(k0, k1)` wants, most urgent first.
    pub fn wanted(&self, k0: usize, k1: usize, len: usize) -> Vec<usize> {
        // Lookahead stops at the last keyframe.
        let ahead = k1.saturating_add(1)..k1.saturating_add(self.ahead).saturating_add(1).min(len);
        let mut out = Vec::with_capacity(2 + ahead.len());
        for k in [k0, k1].into_iter().chain(ahead) {
            if k < len && !out.contains(&k) {
                out.push(k);
            }
        }
        out
    }

    /// Whether `k` should be submitted now.
    pub fn should_request(&self, k: usize, cached: bool) -> bool {
        !cached && !self.inflight.contains_key(&k) && !self.has_given_up(k)
    }

    /// Record a submitted job.
    pub fn mark_requested(&mut self, k: usize) {
        let _ = self.inflight.insert(k, JobState::Wanted);
    }

    /// Forget a job that could not be submitted.
    pub fn forget(&mut self, k: usize) {
        let _ = self.inflight.remove(&k);
    }

    /// Cancel jobs farther than the horizon from `center`; jobs back inside
    /// it are wanted again. Returns how many were cancelled.
    pub fn retarget(&mut self, center: usize) -> usize {
        let mut cancelled = 0;
        for (&k, state) in &mut self.inflight {
            let inside = k.abs_diff(center) <= self.horizon;
            match (*state, inside) {
                (JobState::Wanted, false) => {
                    *state = JobState::Cancelled;
                    cancelled += 1;
                }
                (JobState::Cancelled, true) => *state = JobState::Wanted,
                _ => {}
            }
        }
        if cancelled > 0 {
            log::debug!("cancelled {cancelled} prefetch jobs outside {center}±{}", self.horizon);
        }
        cancelled
    }

    /// Mark everything in flight stale and reset failure counts.
    pub fn invalidate(&mut self) {
        for state in self.inflight.values_mut() {
            *state = JobState::Stale;
        }
        self.failures.clear();
    }

    /// Decide what to do with a worker response.
    pub fn resolve(&mut self, response: LayoutResponse) -> Resolution {
        let index = response.job_id;
        let Some(state) = self.inflight.remove(&index) else {
            log::debug!("ignoring response for unknown job {index}");
            return Resolution::Discarded;
        };
        if state == JobState::Stale {
            log::debug!("dropping stale layout for keyframe {index}");
            return Resolution::Discarded;
        }
        match response.outcome {
            LayoutOutcome::Success { result } => {
                let _ = self.failures.remove(&index);
                Resolution::Accepted {
                    index,
                    layout: result.layout,
                    wake: state == JobState::Wanted,
                }
            }
            LayoutOutcome::Error { error } => {
                let attempts = self.failures.entry(index).or_insert(0);
                *attempts += 1;
                Resolution::Failed {
                    index,
                    attempts: *attempts,
                    gave_up: *attempts >= self.max_failures,
                    error,
                }
            }
        }
    }

    /// Whether `k` is in flight.
    pub fn is_inflight(&self, k: usize) -> bool {
        self.inflight.contains_key(&k)
    }

    /// Number of jobs in flight.
    pub fn inflight_len(&self) -> usize {
        self.inflight.len()
    }

    /// Failures recorded for `k`.
    pub fn failures(&self, k: usize) -> u32 {
        self.failures.get(&k).copied().unwrap_or(0)
    }

    /// Whether `k` has failed too often to retry.
    pub fn has_given_up(&self, k: usize) -> bool {
        self.failures(k) >= self.max_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::worker::{LayoutExtent, LayoutResult};

    fn ok(k: usize) -> LayoutResponse {
        LayoutResponse {
            job_id: k,
            outcome: LayoutOutcome::Success {
                result: LayoutResult {
                    layout: Arc::new(Layout::default()),
                    layer_data: LayoutExtent::default(),
                },
            },
        }
    }

    fn err(k: usize) -> LayoutResponse {
        LayoutResponse {
            job_id: k,
            outcome: LayoutOutcome::Error {
                error: "boom".to_owned(),
            },
        }
    }

    #[test]
    fn wanted_is_pair_then_lookahead() {
        let plan = PrefetchPlan::new(4, 2, 3);
        assert_eq!(plan.wanted(2, 3, 10), vec![2, 3, 4, 5]);
        assert_eq!(plan.wanted(9, 9, 10), vec![9]);
        assert_eq!(plan.wanted(7, 8, 10), vec![7, 8, 9]);
    }

    #[test]
    fn unbounded_lookahead_stops_at_the_last_keyframe() {
        let plan = PrefetchPlan::new(4, usize::MAX, 3);
        assert_eq!(plan.wanted(2, 3, 6), vec![2, 3, 4, 5]);
        assert_eq!(plan.wanted(usize::MAX, usize::MAX, 6), Vec::<usize>::new());
        let plan = PrefetchPlan::new(4, 0, 3);
        assert_eq!(plan.wanted(2, 3, 6), vec![2, 3]);
    }

    #[test]
    fn inflight_jobs_are_deduplicated() {
        let mut plan = PrefetchPlan::new(4, 2, 3);
        assert!(plan.should_request(1, false));
        plan.mark_requested(1);
        assert!(!plan.should_request(1, false));
        assert!(!plan.should_request(2, true));
    }

    #[test]
    fn cancelled_results_do_not_wake() {
        let mut plan = PrefetchPlan::new(4, 2, 3);
        plan.mark_requested(10);
        assert_eq!(plan.retarget(0), 1);
        let resolution = plan.resolve(ok(10));
        assert!(matches!(
            resolution,
            Resolution::Accepted { index: 10, wake: false, .. }
        ));
    }

    #[test]
    fn stale_results_are_dropped() {
        let mut plan = PrefetchPlan::new(4, 2, 3);
        plan.mark_requested(3);
        plan.invalidate();
        assert!(!plan.should_request(3, false));
        assert_eq!(plan.resolve(ok(3)), Resolution::Discarded);
        assert!(plan.should_request(3, false));
    }

    #[test]
    fn failures_allow_retry_until_budget() {
        let mut plan = PrefetchPlan::new(4, 2, 2);
        plan.mark_requested(5);
        assert!(matches!(
            plan.resolve(err(5)),
            Resolution::Failed { attempts: 1, gave_up: false, .. }
        ));
        assert!(plan.should_request(5, false));
        plan.mark_requested(5);
        assert!(matches!(
            plan.resolve(err(5)),
            Resolution::Failed { attempts: 2, gave_up: true, .. }
        ));
        assert!(!plan.should_request(5, false));
    }

    #[test]
    fn unknown_jobs_are_discarded() {
        let mut plan = PrefetchPlan::new(4, 2, 3);
        assert_eq!(plan.resolve(ok(7)), Resolution::Discarded);
    }
}
