use web_time::Instant;

/// Smoothed FPS over published frames.
///
/// Driven by the timestamps the host hands to the controller rather than
/// the wall clock, so the numbers are reproducible in tests.
#[derive(Debug, Clone)]
pub struct FrameTiming {
    /// Last published frame
    last_frame: Option<Instant>,
    /// Smoothed FPS using exponential moving average
    smoothed_fps: f32,
    /// Smoothing factor (lower = smoother, 0.0-1.0)
    smoothing: f32,
    /// Frames recorded so far
    frames: u64,
}

impl Default for FrameTiming {
    fn default() -> Self {
        Self {
            last_frame: None,
            smoothed_fps: 60.0,
            smoothing: 0.05,
            frames: 0,
        }
    }
}

impl FrameTiming {
    /// Record a published frame at `now`.
    pub fn record(&mut self, now: Instant) {
        if let Some(last) = self.last_frame {
            let frame_time = now.saturating_duration_since(last).as_secs_f32();
            if frame_time > 0.0 {
                let instant_fps = 1.0 / frame_time;
                // Exponential moving average for smooth display
                self.smoothed_fps = self.smoothed_fps * (1.0 - self.smoothing)
                    + instant_fps * self.smoothing;
            }
        }
        self.last_frame = Some(now);
        self.frames += 1;
    }

    /// Get the current FPS (smoothed)
    pub fn fps(&self) -> f32 {
        self.smoothed_fps
    }

    /// Frames recorded since creation.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use web_time::Duration;

    use super::*;

    #[test]
    fn fps_moves_toward_frame_rate() {
        let t0 = Instant::now();
        let mut timing = FrameTiming::default();
        for i in 0..200 {
            timing.record(t0 + Duration::from_millis(i * 10));
        }
        assert_eq!(timing.frames(), 200);
        assert!((timing.fps() - 100.0).abs() < 5.0);
    }

    #[test]
    fn repeated_timestamp_keeps_the_average() {
        let t0 = Instant::now();
        let mut timing = FrameTiming::default();
        timing.record(t0);
        timing.record(t0);
        assert_eq!(timing.frames(), 2);
        assert!((timing.fps() - 60.0).abs() < f32::EPSILON);
    }
}
