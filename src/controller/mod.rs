//! Timeline ownership and frame dispatch.
//!
//! [`AnimationController::tick`] is the whole frame loop. The host calls it
//! from its animation-frame callback; each call
//!
//! 1. drains finished layout jobs into the [`LayoutCache`],
//! 2. advances playback,
//! 3. requests the keyframe pair and the prefetch window from the worker,
//! 4. publishes the highlight sets for the visible position to the
//!    [`ColorChannel`],
//! 5. interpolates, styles and builds layers, and hands them to the
//!    [`LayerSink`],
//! 6. asks the [`FrameScheduler`] for another frame when something is
//!    still moving.
//!
//! Everything runs on the caller's thread. The layout worker is the only
//! other thread and is reached through a [`LayoutTransport`].

mod options;
pub mod prefetch;
pub mod timeline;

use web_time::Instant;

pub use prefetch::{PrefetchPlan, Resolution};
pub use timeline::{Direction, FramePair, Timeline};

use crate::interpolation::{interpolate, Frame, InterpolationOptions, TrailOptions};
use crate::keyframes::KeyframeStore;
use crate::layers::{pick, LayerChanges, LayerFactory, LayerSet, PickTarget};
use crate::layout::worker::{LayoutRequest, LayoutTransport};
use crate::layout::{LayoutCache, NodeId, SplitSet};
use crate::options::Options;
use crate::style::{ColorChannel, ColorManager, HighlightSets, RenderStateCache};
use crate::util::frame_timing::FrameTiming;

/// Opaque id of a scheduled animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Host hook for animation-frame callbacks.
pub trait FrameScheduler {
    /// Ask for one callback into [`AnimationController::tick`].
    fn request_frame(&mut self) -> FrameHandle;

    /// Drop a pending callback.
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Receives the layers of every published frame.
pub trait LayerSink {
    /// Draw `layers`; `changes` says which ones differ from the last call.
    fn publish(&mut self, layers: &LayerSet, changes: &LayerChanges);
}

/// Drives the movie.
pub struct AnimationController<T, S, K> {
    store: KeyframeStore,
    options: Options,
    timeline: Timeline,
    cache: LayoutCache,
    prefetch: PrefetchPlan,
    transport: T,
    scheduler: S,
    sink: K,
    colors: ColorChannel,
    factory: LayerFactory,
    frame_request: Option<FrameHandle>,
    last_frame: Option<Frame>,
    hovered: Option<NodeId>,
    started: Option<Instant>,
    timing: FrameTiming,
}

impl<T, S, K> AnimationController<T, S, K>
where
    T: LayoutTransport,
    S: FrameScheduler,
    K: LayerSink,
{
    /// Controller at keyframe 0, stopped. Schedules a first frame.
    pub fn new(
        store: KeyframeStore,
        options: Options,
        transport: T,
        scheduler: S,
        sink: K,
    ) -> Self {
        let manager = ColorManager::new(
            &options.colors,
            &store.taxa(),
            options.highlight.high_contrast_highlighting_enabled,
        );
        let playback = &options.playback;
        let prefetch = PrefetchPlan::new(
            playback.prefetch_horizon,
            playback.prefetch_ahead,
            playback.max_worker_failures,
        );
        log::info!("animation controller over {} keyframes", store.len());
        let mut controller = Self {
            timeline: Timeline::new(store.len()),
            store,
            options,
            cache: LayoutCache::new(),
            prefetch,
            transport,
            scheduler,
            sink,
            colors: ColorChannel::new(manager),
            factory: LayerFactory::new(),
            frame_request: None,
            last_frame: None,
            hovered: None,
            started: None,
            timing: FrameTiming::default(),
        };
        controller.schedule();
        controller
    }

    // -- accessors ---------------------------------------------------------

    /// The movie.
    pub fn store(&self) -> &KeyframeStore {
        &self.store
    }

    /// Current options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Playhead.
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Current position in `[0, N-1]`.
    pub fn position(&self) -> f32 {
        self.timeline.position()
    }

    /// Whether playback is running.
    pub fn is_playing(&self) -> bool {
        self.timeline.is_playing()
    }

    /// Computed layouts.
    pub fn cache(&self) -> &LayoutCache {
        &self.cache
    }

    /// In-flight jobs.
    pub fn prefetch(&self) -> &PrefetchPlan {
        &self.prefetch
    }

    /// Current color manager snapshot.
    pub fn color_manager(&self) -> std::sync::Arc<ColorManager> {
        self.colors.snapshot()
    }

    /// Color version of the current snapshot.
    pub fn color_version(&self) -> u64 {
        self.colors.version()
    }

    /// Receive the color version after every change.
    pub fn subscribe_colors(&mut self) -> std::sync::mpsc::Receiver<u64> {
        self.colors.subscribe()
    }

    /// Last published frame.
    pub fn last_frame(&self) -> Option<&Frame> {
        self.last_frame.as_ref()
    }

    /// Whether a frame callback is pending.
    pub fn has_pending_frame(&self) -> bool {
        self.frame_request.is_some()
    }

    /// Published-frame pacing.
    pub fn frame_timing(&self) -> &FrameTiming {
        &self.timing
    }

    /// Layout transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Frame scheduler.
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Layer sink.
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Mutable layer sink.
    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    // -- playback ----------------------------------------------------------

    /// Start playing.
    pub fn play(&mut self) {
        self.timeline.play();
        if self.timeline.is_playing() {
            log::info!("playback started at {}", self.timeline.position());
            self.schedule();
        }
    }

    /// Freeze playback, cancel the pending frame and keep the position.
    pub fn stop(&mut self) {
        self.timeline.pause();
        if let Some(handle) = self.frame_request.take() {
            self.scheduler.cancel_frame(handle);
        }
        log::info!("playback stopped at {}", self.timeline.position());
    }

    /// Toggle between [`play`](Self::play) and [`stop`](Self::stop).
    pub fn toggle_play(&mut self) {
        if self.timeline.is_playing() {
            self.stop();
        } else {
            self.play();
        }
    }

    /// Jump to `position` (clamped). Prefetch jobs that left the horizon
    /// are cancelled.
    pub fn seek(&mut self, position: f32) {
        let p = self.timeline.seek(position);
        let _ = self.prefetch.retarget(p.floor() as usize);
        self.schedule();
    }

    /// Set the playback direction.
    pub fn set_direction(&mut self, direction: Direction) {
        self.timeline.set_direction(direction);
    }

    /// Set the speed factor (clamped to a small positive minimum).
    pub fn set_factor(&mut self, factor: f32) {
        if factor.is_finite() {
            self.options.playback.factor = factor.max(f32::EPSILON);
        }
    }

    /// Seek to the next full tree, if any.
    pub fn next_full_tree(&mut self) {
        let p = self.timeline.pair().k0;
        if let Some(next) = self.store.resolver().next_full_tree_sequence_index(p) {
            self.seek(next as f32);
        }
    }

    /// Seek to the previous full tree, if any. From a fractional position
    /// this lands on the full tree at or before it.
    pub fn previous_full_tree(&mut self) {
        let FramePair { k0, t, .. } = self.timeline.pair();
        let resolver = self.store.resolver();
        let target = if t > 0.0 && resolver.is_full_tree(k0) {
            Some(k0)
        } else {
            resolver.previous_full_tree_sequence_index(k0)
        };
        if let Some(prev) = target {
            self.seek(prev as f32);
        }
    }

    // -- interaction -------------------------------------------------------

    /// Element under `point` in the last published frame.
    pub fn pick(&self, point: glam::Vec3, tolerance: f32) -> Option<PickTarget> {
        self.last_frame.as_ref().and_then(|f| pick(f, point, tolerance))
    }

    /// Set the hovered element; redraws when it changed.
    pub fn set_hovered(&mut self, hovered: Option<NodeId>) {
        if self.hovered != hovered {
            self.hovered = hovered;
            self.schedule();
        }
    }

    // -- frame loop --------------------------------------------------------

    /// One frame. Returns whether layers were published.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.frame_request = None;
        let started = *self.started.get_or_insert(now);
        let mut wake = self.drain_worker();

        let playback = &self.options.playback;
        if self
            .timeline
            .advance(now, playback.interval_ms(), playback.continuous)
        {
            let _ = self.prefetch.retarget(self.timeline.pair().k0);
        }
        let pair = self.timeline.pair();
        self.request_layouts(pair);

        let highlight = self.highlight_index(pair);
        let sets = self.highlight_sets(highlight);
        if self.colors.publish_highlights(sets) {
            log::debug!("highlights for transition {highlight:?} (v{})", self.colors.version());
        }

        let waiting = self.waiting_for(pair);
        let published = match self.compose(pair, highlight) {
            Some(frame) => {
                let manager = self.colors.snapshot();
                let pulse = if manager.has_active_change_edges() {
                    let elapsed = now.saturating_duration_since(started).as_secs_f64() * 1000.0;
                    self.options.highlight.pulse_opacity(elapsed)
                } else {
                    1.0
                };
                let cache = RenderStateCache::new(
                    &self.options,
                    Some(manager),
                    self.colors.version(),
                    pulse,
                )
                .with_hover(self.hovered.clone());
                let (layers, changes) = self.factory.build(&frame, &cache);
                self.sink.publish(&layers, &changes);
                self.timing.record(now);
                self.last_frame = Some(frame);
                true
            }
            None => false,
        };

        let pulsing = self.options.highlight.pulse_enabled
            && self.colors.snapshot().has_active_change_edges();
        wake |= waiting;
        if self.timeline.is_playing() || wake || pulsing {
            self.schedule();
        }
        published
    }

    /// Pull every finished job off the transport. Returns whether any of
    /// them should wake the loop.
    fn drain_worker(&mut self) -> bool {
        let mut wake = false;
        while let Some(response) = self.transport.try_recv() {
            match self.prefetch.resolve(response) {
                Resolution::Accepted { index, layout, wake: w } => {
                    log::debug!("cached layout for keyframe {index}");
                    self.cache.set(index, layout);
                    wake |= w;
                }
                Resolution::Failed { index, attempts, gave_up, error } => {
                    if gave_up {
                        log::warn!(
                            "layout for keyframe {index} gave up after {attempts} failures: {error}"
                        );
                    } else {
                        log::warn!(
                            "layout for keyframe {index} failed (attempt {attempts}): {error}"
                        );
                    }
                }
                Resolution::Discarded => {}
            }
        }
        wake
    }

    /// Submit jobs for the pair and the lookahead window.
    fn request_layouts(&mut self, pair: FramePair) {
        for k in self.prefetch.wanted(pair.k0, pair.k1, self.store.len()) {
            if !self.prefetch.should_request(k, self.cache.has(k)) {
                continue;
            }
            let Some(tree) = self.store.tree(k) else {
                continue;
            };
            let request = LayoutRequest::calculate(k, tree, self.options.layout.clone());
            match self.transport.submit(request) {
                Ok(()) => {
                    log::debug!("requested layout for keyframe {k}");
                    self.prefetch.mark_requested(k);
                }
                Err(e) => {
                    log::error!("layout worker unavailable: {e}");
                    self.prefetch.forget(k);
                    return;
                }
            }
        }
    }

    /// Whether the pair is still being computed.
    fn waiting_for(&self, pair: FramePair) -> bool {
        [pair.k0, pair.k1]
            .iter()
            .any(|&k| !self.cache.has(k) && self.prefetch.is_inflight(k))
    }

    /// Transition whose highlights the visible tree shows.
    fn highlight_index(&self, pair: FramePair) -> Option<usize> {
        self.store.resolver().highlighting_index(pair.k0)
    }

    /// Marked, active, upcoming and history sets for transition `h`.
    fn highlight_sets(&self, h: Option<usize>) -> HighlightSets {
        let Some(h) = h else {
            return HighlightSets::default();
        };
        let meta = self.store.metadata();
        let depth = self.options.highlight.history_depth;
        let history = (h.saturating_sub(depth)..h)
            .flat_map(|k| meta.jumping_taxa(k).iter().cloned())
            .collect();
        HighlightSets {
            marked: meta.jumping_taxa(h).to_vec(),
            active_edges: meta.s_edges(h).to_vec(),
            upcoming_edges: meta.s_edges(h + 1).to_vec(),
            history,
        }
    }

    /// Interpolated frame for the pair, or the best fallback.
    fn compose(&self, pair: FramePair, highlight: Option<usize>) -> Option<Frame> {
        let (Some(from), Some(to)) = (self.cache.get(pair.k0), self.cache.get(pair.k1)) else {
            return self.fallback_frame(pair);
        };
        let playback = &self.options.playback;
        let moving_subtree = if playback.subtree_only_motion {
            highlight
                .and_then(|h| self.store.metadata().cover(h))
                .map(|c| c.moving_set())
                .filter(|s: &SplitSet| !s.is_empty())
        } else {
            None
        };
        let options = InterpolationOptions {
            easing: playback.easing,
            moving_subtree,
            root_drift_compensation: !playback.rigid_rotation,
            motion_trails: playback.motion_trails.then_some(TrailOptions {
                length: playback.trail_length,
                step: playback.trail_step,
            }),
        };
        let frame = interpolate(&from, &to, pair.t, &options);
        for d in &frame.diagnostics {
            log::warn!("skipped {:?} {}: {}", d.element, d.id, d.message);
        }
        Some(frame)
    }

    /// Last good frame, else the nearest cached keyframe before `k0`.
    fn fallback_frame(&self, pair: FramePair) -> Option<Frame> {
        if let Some(frame) = &self.last_frame {
            return Some(frame.clone());
        }
        let k = self.cache.nearest_at_or_before(pair.k1)?;
        self.cache.get(k).map(|l| Frame::still((*l).clone()))
    }

    fn schedule(&mut self) {
        if self.frame_request.is_none() {
            self.frame_request = Some(self.scheduler.request_frame());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::MovieError;
    use crate::keyframes::{TransitionMetadata, TransitionRecord, TreeData};
    use crate::layers::RENDER_ORDER;
    use crate::layout::worker::InlineLayoutWorker;
    use crate::layout::{Layout, LayoutCalculator, LayoutOptions, RadialLayout};

    #[derive(Default)]
    struct Scheduler {
        next: u64,
        requested: Vec<FrameHandle>,
        cancelled: Vec<FrameHandle>,
    }

    impl FrameScheduler for Scheduler {
        fn request_frame(&mut self) -> FrameHandle {
            self.next += 1;
            let handle = FrameHandle(self.next);
            self.requested.push(handle);
            handle
        }

        fn cancel_frame(&mut self, handle: FrameHandle) {
            self.cancelled.push(handle);
        }
    }

    #[derive(Default)]
    struct Sink {
        frames: Vec<LayerSet>,
        changes: Vec<LayerChanges>,
    }

    impl LayerSink for Sink {
        fn publish(&mut self, layers: &LayerSet, changes: &LayerChanges) {
            self.frames.push(layers.clone());
            self.changes.push(changes.clone());
        }
    }

    struct Failing;

    impl LayoutCalculator for Failing {
        fn calculate(&self, _: &TreeData, _: &LayoutOptions) -> Result<Layout, MovieError> {
            Err(MovieError::layout("unreachable tree"))
        }
    }

    type Controller = AnimationController<InlineLayoutWorker, Scheduler, Sink>;

    fn tree(c_length: f64) -> TreeData {
        TreeData::internal(
            0.0,
            vec![
                TreeData::internal(
                    0.5,
                    vec![TreeData::leaf("A", 1.0), TreeData::leaf("B", 1.0)],
                ),
                TreeData::leaf("C", c_length),
            ],
        )
    }

    fn record(marked: u32) -> TransitionRecord {
        TransitionRecord {
            jumping_taxa: vec![SplitSet::new([marked])],
            s_edges: vec![SplitSet::new([0, 1])],
            ..TransitionRecord::default()
        }
    }

    fn store() -> KeyframeStore {
        let names = ["T0", "IT1", "T1", "IT2", "T2"];
        KeyframeStore::new(
            (0..names.len()).map(|i| tree(0.5 + i as f64 * 0.25)).collect(),
            names.iter().map(|s| (*s).to_owned()).collect(),
            TransitionMetadata::new(vec![record(2), record(0)]),
        )
        .unwrap()
    }

    fn controller_with(calculator: Arc<dyn LayoutCalculator>, options: Options) -> Controller {
        AnimationController::new(
            store(),
            options,
            InlineLayoutWorker::new(calculator),
            Scheduler::default(),
            Sink::default(),
        )
    }

    fn controller() -> Controller {
        controller_with(Arc::new(RadialLayout), Options::default())
    }

    #[test]
    fn first_tick_requests_then_publishes() {
        let mut c = controller();
        assert_eq!(c.scheduler().requested, vec![FrameHandle(1)]);
        let now = Instant::now();
        assert!(!c.tick(now));
        assert!(c.prefetch().is_inflight(0));
        assert!(c.has_pending_frame());
        assert!(c.tick(now));
        assert_eq!(c.sink().frames.len(), 1);
        assert_eq!(c.sink().frames[0].ids(), RENDER_ORDER);
        assert!(c.cache().has(0) && c.cache().has(1));
        assert!(c.last_frame().is_some());
        assert_eq!(c.frame_timing().frames(), 1);
    }

    #[test]
    fn stop_cancels_the_pending_frame_and_keeps_position() {
        let mut c = controller();
        c.seek(1.5);
        c.play();
        assert!(c.is_playing());
        c.stop();
        assert!(!c.is_playing());
        assert!(!c.has_pending_frame());
        assert_eq!(c.scheduler().cancelled, vec![FrameHandle(1)]);
        assert_eq!(c.position(), 1.5);
    }

    #[test]
    fn seek_clamps_and_full_tree_navigation() {
        let mut c = controller();
        c.seek(9.0);
        assert_eq!(c.position(), 4.0);
        c.previous_full_tree();
        assert_eq!(c.position(), 2.0);
        c.seek(2.5);
        c.previous_full_tree();
        assert_eq!(c.position(), 2.0);
        c.next_full_tree();
        assert_eq!(c.position(), 4.0);
    }

    #[test]
    fn highlights_follow_the_visible_transition() {
        let mut c = controller();
        let now = Instant::now();
        let _ = c.tick(now);
        assert_eq!(c.color_manager().highlights().marked, vec![SplitSet::new([2])]);
        assert!(c.color_manager().highlights().history.is_empty());

        c.seek(3.0);
        let _ = c.tick(now);
        let manager = c.color_manager();
        assert_eq!(manager.highlights().marked, vec![SplitSet::new([0])]);
        assert_eq!(manager.highlights().history, vec![SplitSet::new([2])]);
        assert_eq!(manager.highlights().active_edges, vec![SplitSet::new([0, 1])]);

        c.seek(4.0);
        let _ = c.tick(now);
        assert_eq!(c.color_manager().highlights().marked, vec![SplitSet::new([0])]);
    }

    #[test]
    fn worker_failures_retry_then_give_up() {
        let mut options = Options::default();
        options.playback.max_worker_failures = 2;
        let mut c = controller_with(Arc::new(Failing), options);
        let now = Instant::now();
        for _ in 0..4 {
            assert!(!c.tick(now));
        }
        assert!(c.prefetch().has_given_up(0));
        assert_eq!(c.prefetch().failures(0), 2);
        assert!(!c.prefetch().is_inflight(0));
        assert!(c.sink().frames.is_empty());
    }

    #[test]
    fn layout_option_change_invalidates_and_falls_back() {
        let mut c = controller();
        let now = Instant::now();
        let _ = c.tick(now);
        assert!(c.tick(now));
        let generation = c.cache().generation();

        let mut layout = c.options().layout.clone();
        layout.max_radius *= 2.0;
        c.set_layout_options(layout);
        assert!(c.cache().is_empty());
        assert!(c.cache().generation() > generation);

        assert!(c.tick(now));
        assert!(c.tick(now));
        assert!(c.cache().has(0));
    }

    #[test]
    fn unchanged_frames_reuse_layers() {
        let mut options = Options::default();
        options.highlight.pulse_enabled = false;
        let mut c = controller_with(Arc::new(RadialLayout), options);
        let now = Instant::now();
        let _ = c.tick(now);
        assert!(c.tick(now));
        assert!(c.tick(now));
        assert!(c.sink().changes[1].is_unchanged());
    }

    #[test]
    fn display_change_bumps_color_version() {
        let mut c = controller();
        let rx = c.subscribe_colors();
        let before = c.color_version();
        let mut display = c.options().display.clone();
        display.stroke_width += 1.0;
        c.set_display_options(display);
        assert_eq!(c.color_version(), before + 1);
        assert_eq!(rx.try_recv().ok(), Some(before + 1));
    }

    #[test]
    fn presets_round_trip() {
        let dir = std::env::temp_dir()
            .join(format!("phylo-movie-controller-presets-{}", std::process::id()));
        let mut c = controller();
        let mut highlight = c.options().highlight.clone();
        highlight.dimming_enabled = true;
        c.set_highlight_options(highlight);
        assert!(c.save_preset("dimmed", &dir));

        let mut other = controller();
        assert!(other.load_preset("dimmed", &dir));
        assert!(other.options().highlight.dimming_enabled);
        assert!(!other.load_preset("missing", &dir));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_store_resets_playback() {
        let mut c = controller();
        let now = Instant::now();
        let _ = c.tick(now);
        let _ = c.tick(now);
        c.seek(3.0);
        c.load_store(store());
        assert_eq!(c.position(), 0.0);
        assert!(c.cache().is_empty());
        assert!(c.last_frame().is_none());
    }
}
