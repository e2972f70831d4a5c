//! Options methods for AnimationController

use std::path::Path;

use super::{AnimationController, FrameScheduler, LayerSink, Timeline};
use crate::keyframes::KeyframeStore;
use crate::layout::worker::LayoutTransport;
use crate::layout::LayoutOptions;
use crate::options::{ColorOptions, DisplayOptions, HighlightOptions, Options, PlaybackOptions};
use crate::style::ColorManager;

impl<T, S, K> AnimationController<T, S, K>
where
    T: LayoutTransport,
    S: FrameScheduler,
    K: LayerSink,
{
    /// Replace options and apply every change.
    pub fn set_options(&mut self, new: Options) {
        let Options {
            display,
            highlight,
            colors,
            layout,
            playback,
        } = new;
        self.set_playback_options(playback);
        self.set_layout_options(layout);
        self.options.colors = colors;
        self.options.highlight = highlight;
        self.options.display = display;
        self.rebuild_colors();
    }

    /// Sizes and global opacity. Bumps the color version.
    pub fn set_display_options(&mut self, display: DisplayOptions) {
        if self.options.display != display {
            self.options.display = display;
            let _ = self.colors.touch();
            self.schedule();
        }
    }

    /// Highlighting toggles. Switching the palette rebuilds the color
    /// manager; everything else bumps the color version.
    pub fn set_highlight_options(&mut self, highlight: HighlightOptions) {
        if self.options.highlight == highlight {
            return;
        }
        let palette_changed = self.options.highlight.high_contrast_highlighting_enabled
            != highlight.high_contrast_highlighting_enabled;
        self.options.highlight = highlight;
        if palette_changed {
            self.rebuild_colors();
        } else {
            let _ = self.colors.touch();
            self.schedule();
        }
    }

    /// Palette and taxa colors.
    pub fn set_color_options(&mut self, colors: ColorOptions) {
        if self.options.colors != colors {
            self.options.colors = colors;
            self.rebuild_colors();
        }
    }

    /// Layout parameters. Any change invalidates every cached layout and
    /// every in-flight job.
    pub fn set_layout_options(&mut self, layout: LayoutOptions) {
        if self.options.layout == layout {
            return;
        }
        self.options.layout = layout;
        self.cache.invalidate();
        self.prefetch.invalidate();
        log::info!("layout options changed, recomputing layouts");
        self.schedule();
    }

    /// Playback, motion and prefetch settings.
    pub fn set_playback_options(&mut self, playback: PlaybackOptions) {
        self.prefetch.configure(
            playback.prefetch_horizon,
            playback.prefetch_ahead,
            playback.max_worker_failures,
        );
        self.options.playback = playback;
        self.schedule();
    }

    /// Replace the movie. Resets the timeline, the cache and the layers.
    pub fn load_store(&mut self, store: KeyframeStore) {
        if self.timeline.is_playing() {
            self.stop();
        }
        log::info!("loading movie with {} keyframes", store.len());
        self.timeline = Timeline::new(store.len());
        self.store = store;
        self.cache.invalidate();
        self.prefetch.invalidate();
        self.factory.reset();
        self.last_frame = None;
        self.hovered = None;
        self.rebuild_colors();
    }

    /// Load a named preset from `presets_dir`. Returns true on success.
    pub fn load_preset(&mut self, name: &str, presets_dir: &Path) -> bool {
        let path = presets_dir.join(format!("{name}.toml"));
        match Options::load(&path) {
            Ok(opts) => {
                log::info!("Loaded preset '{name}'");
                self.set_options(opts);
                true
            }
            Err(e) => {
                log::error!("Failed to load preset '{name}': {e}");
                false
            }
        }
    }

    /// Save the current options as a named preset. Returns true on success.
    pub fn save_preset(&self, name: &str, presets_dir: &Path) -> bool {
        let path = presets_dir.join(format!("{name}.toml"));
        match self.options.save(&path) {
            Ok(()) => {
                log::info!("Saved preset '{name}'");
                true
            }
            Err(e) => {
                log::error!("Failed to save preset '{name}': {e}");
                false
            }
        }
    }

    /// New color manager from the current options, keeping the highlight
    /// sets.
    fn rebuild_colors(&mut self) {
        let sets = self.colors.snapshot().highlights().clone();
        let manager = ColorManager::new(
            &self.options.colors,
            &self.store.taxa(),
            self.options.highlight.high_contrast_highlighting_enabled,
        )
        .with_highlights(sets);
        if !self.colors.publish(manager) {
            let _ = self.colors.touch();
        }
        self.schedule();
    }
}
