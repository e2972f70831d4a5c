//! Playhead over `[0, N-1]`.

use web_time::Instant;

/// Playback direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Toward the last keyframe.
    #[default]
    Forward,
    /// Toward the first keyframe.
    Backward,
}

impl Direction {
    fn sign(self) -> f32 {
        match self {
            Self::Forward => 1.0,
            Self::Backward => -1.0,
        }
    }
}

/// The keyframe pair and local progress at a playhead position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramePair {
    /// Lower keyframe.
    pub k0: usize,
    /// Upper keyframe (`k0 + 1`, clamped to the last).
    pub k1: usize,
    /// Progress from `k0` to `k1` in `[0, 1)`.
    pub t: f32,
}

/// Scrub/play state.
#[derive(Debug, Clone)]
pub struct Timeline {
    position: f32,
    len: usize,
    playing: bool,
    direction: Direction,
    last_frame_time: Option<Instant>,
}

impl Timeline {
    /// Stopped timeline over `len` keyframes, at the first one.
    pub fn new(len: usize) -> Self {
        Self {
            position: 0.0,
            len,
            playing: false,
            direction: Direction::Forward,
            last_frame_time: None,
        }
    }

    /// Current position.
    pub fn position(&self) -> f32 {
        self.position
    }

    /// Number of keyframes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether there are no keyframes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether playback is running.
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Current direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Last valid position.
    pub fn max_position(&self) -> f32 {
        self.len.saturating_sub(1) as f32
    }

    /// Jump to `position`, clamped. Non-finite input is ignored. Returns the
    /// clamped position.
    pub fn seek(&mut self, position: f32) -> f32 {
        if position.is_finite() {
            self.position = position.clamp(0.0, self.max_position());
        }
        self.position
    }

    /// Start playing in the current direction. At the far end, playback
    /// restarts from the near end.
    pub fn play(&mut self) {
        if self.len < 2 {
            return;
        }
        if self.at_end() {
            self.position = match self.direction {
                Direction::Forward => 0.0,
                Direction::Backward => self.max_position(),
            };
        }
        self.playing = true;
        self.last_frame_time = None;
    }

    /// Stop playing; the position is kept.
    pub fn pause(&mut self) {
        self.playing = false;
        self.last_frame_time = None;
    }

    /// Set the direction of travel.
    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    fn at_end(&self) -> bool {
        match self.direction {
            Direction::Forward => self.position >= self.max_position(),
            Direction::Backward => self.position <= 0.0,
        }
    }

    /// Advance playback to `now`. Discrete mode steps one keyframe once
    /// `interval_ms` has passed; continuous mode moves by `dt / interval`.
    /// Stops at either end. Returns whether the position changed.
    pub fn advance(&mut self, now: Instant, interval_ms: f32, continuous: bool) -> bool {
        if !self.playing {
            return false;
        }
        let Some(last) = self.last_frame_time else {
            self.last_frame_time = Some(now);
            return false;
        };
        let dt_ms = now.saturating_duration_since(last).as_secs_f32() * 1000.0;
        let interval = interval_ms.max(f32::EPSILON);
        let step = if continuous {
            dt_ms / interval
        } else if dt_ms >= interval {
            1.0
        } else {
            return false;
        };
        self.last_frame_time = Some(now);
        let before = self.position;
        self.position = (self.position + self.direction.sign() * step)
            .clamp(0.0, self.max_position());
        if self.at_end() {
            self.playing = false;
            log::info!("playback reached keyframe {}", self.position);
        }
        self.position != before
    }

    /// Keyframe pair at the current position.
    pub fn pair(&self) -> FramePair {
        let last = self.len.saturating_sub(1);
        let k0 = (self.position.floor() as usize).min(last);
        let k1 = (k0 + 1).min(last);
        let t = if k1 == k0 { 0.0 } else { self.position - k0 as f32 };
        FramePair { k0, k1, t }
    }
}

#[cfg(test)]
mod tests {
    use web_time::Duration;

    use super::*;

    #[test]
    fn pair_splits_position() {
        let mut tl = Timeline::new(5);
        let _ = tl.seek(2.25);
        assert_eq!(tl.pair(), FramePair { k0: 2, k1: 3, t: 0.25 });
        let _ = tl.seek(4.0);
        assert_eq!(tl.pair(), FramePair { k0: 4, k1: 4, t: 0.0 });
    }

    #[test]
    fn seek_clamps() {
        let mut tl = Timeline::new(3);
        assert_eq!(tl.seek(-1.0), 0.0);
        assert_eq!(tl.seek(7.5), 2.0);
        assert_eq!(tl.seek(f32::NAN), 2.0);
    }

    #[test]
    fn discrete_playback_steps_per_interval_and_stops() {
        let t0 = Instant::now();
        let mut tl = Timeline::new(3);
        tl.play();
        assert!(!tl.advance(t0, 100.0, false));
        assert!(!tl.advance(t0 + Duration::from_millis(50), 100.0, false));
        assert!(tl.advance(t0 + Duration::from_millis(100), 100.0, false));
        assert_eq!(tl.position(), 1.0);
        assert!(tl.advance(t0 + Duration::from_millis(200), 100.0, false));
        assert_eq!(tl.position(), 2.0);
        assert!(!tl.is_playing());
    }

    #[test]
    fn continuous_playback_moves_fractionally() {
        let t0 = Instant::now();
        let mut tl = Timeline::new(4);
        tl.play();
        let _ = tl.advance(t0, 1000.0, true);
        assert!(tl.advance(t0 + Duration::from_millis(250), 1000.0, true));
        assert!((tl.position() - 0.25).abs() < 1e-4);
    }

    #[test]
    fn backward_playback_and_restart() {
        let t0 = Instant::now();
        let mut tl = Timeline::new(3);
        tl.set_direction(Direction::Backward);
        tl.play();
        assert_eq!(tl.position(), 2.0);
        let _ = tl.advance(t0, 10.0, false);
        let _ = tl.advance(t0 + Duration::from_millis(10), 10.0, false);
        assert_eq!(tl.position(), 1.0);
        tl.pause();
        assert!(!tl.advance(t0 + Duration::from_millis(100), 10.0, false));
        assert_eq!(tl.position(), 1.0);
    }
}
