//! Frame rate limiting.
//!
//! `requestAnimationFrame` fires once per display refresh. [`FrameThrottle`]
//! decides which of those callbacks actually render, so that a loop can be
//! capped below the refresh rate of the display.

/// Tolerance applied when comparing elapsed time against the time step.
///
/// Animation frame timestamps jitter by a fraction of a millisecond; without
/// this a 60 FPS cap on a 60 Hz display would drop every other frame.
const FRAME_SLACK_MS: f64 = 1.0;

/// Timing information handed to the render callback of an accepted frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTiming {
    /// Timestamp of the frame in milliseconds, as passed by the browser.
    pub timestamp: f64,
    /// Milliseconds since the previous accepted frame (`0` for the first one).
    pub delta: f64,
    /// Frames per second derived from `delta` (`0` for the first frame).
    pub fps: f64,
    /// Zero-based index of the accepted frame.
    pub frame: u64,
}

/// Counters kept by a running frame loop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames the render callback was invoked for.
    pub rendered: u64,
    /// Frames where the render callback reported a change.
    pub presented: u64,
    /// Animation frames dropped by the throttle.
    pub skipped: u64,
}

impl FrameStats {
    /// Records the outcome of a single animation frame.
    pub fn record(&mut self, rendered: bool, changed: bool) {
        if !rendered {
            self.skipped += 1;
            return;
        }
        self.rendered += 1;
        if changed {
            self.presented += 1;
        }
    }
}

/// Rate limiter for animation frame callbacks.
#[derive(Debug, Clone)]
pub struct FrameThrottle {
    /// Requested cap, `None` when uncapped.
    max_fps: Option<f64>,
    /// Minimum milliseconds between two accepted frames.
    time_step: f64,
    /// Reference time of the last accepted frame.
    last: Option<f64>,
    /// Timestamp of the last accepted frame, used for the reported delta.
    last_timestamp: Option<f64>,
    /// Number of accepted frames.
    frame: u64,
}

impl Default for FrameThrottle {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl FrameThrottle {
    /// Constructs a new [`FrameThrottle`].
    ///
    /// A `max_fps` that is zero, negative or not finite disables the cap.
    pub fn new(max_fps: f64) -> Self {
        let mut throttle = Self {
            max_fps: None,
            time_step: 0.0,
            last: None,
            last_timestamp: None,
            frame: 0,
        };
        throttle.set_max_fps(max_fps);
        throttle
    }

    /// Changes the cap without resetting the frame counter.
    pub fn set_max_fps(&mut self, max_fps: f64) {
        if max_fps.is_finite() && max_fps > 0.0 {
            self.max_fps = Some(max_fps);
            self.time_step = 1000.0 / max_fps;
        } else {
            self.max_fps = None;
            self.time_step = 0.0;
        }
    }

    /// Returns the cap, or `None` when uncapped.
    pub fn max_fps(&self) -> Option<f64> {
        self.max_fps
    }

    /// Returns the minimum time between accepted frames, in milliseconds.
    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// Returns the number of accepted frames.
    pub fn frames(&self) -> u64 {
        self.frame
    }

    /// Forgets the last accepted frame, so the next tick is accepted.
    pub fn reset(&mut self) {
        self.last = None;
        self.last_timestamp = None;
        self.frame = 0;
    }

    /// Decides whether the frame at `now` (milliseconds) should render.
    pub fn tick(&mut self, now: f64) -> Option<FrameTiming> {
        if let Some(last) = self.last {
            let elapsed = now - last;
            if elapsed + FRAME_SLACK_MS < self.time_step {
                return None;
            }
            // Carry the overshoot so the cadence does not drift.
            self.last = Some(if self.time_step > 0.0 && elapsed >= self.time_step {
                now - elapsed % self.time_step
            } else {
                now
            });
        } else {
            self.last = Some(now);
        }

        let delta = self.last_timestamp.map_or(0.0, |previous| now - previous);
        let fps = if delta > 0.0 { 1000.0 / delta } else { 0.0 };
        self.last_timestamp = Some(now);

        let timing = FrameTiming {
            timestamp: now,
            delta,
            fps,
            frame: self.frame,
        };
        self.frame += 1;
        Some(timing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_frame_is_accepted() {
        let mut throttle = FrameThrottle::new(30.0);
        let timing = throttle.tick(1234.0).expect("first frame");
        assert_eq!(timing.frame, 0);
        assert_eq!(timing.delta, 0.0);
        assert_eq!(timing.fps, 0.0);
    }

    #[test]
    fn test_frames_below_time_step_are_skipped() {
        let mut throttle = FrameThrottle::new(30.0);
        assert!(throttle.tick(0.0).is_some());
        assert!(throttle.tick(16.7).is_none());
        let timing = throttle.tick(33.4).expect("second frame");
        assert_eq!(timing.frame, 1);
        assert!((timing.fps - 1000.0 / 33.4).abs() < 1e-9);
    }

    #[test]
    fn test_refresh_jitter_is_tolerated() {
        // 60 Hz display with a 60 FPS cap: timestamps slightly under the step.
        let mut throttle = FrameThrottle::new(60.0);
        let accepted = (0..60)
            .map(|i| i as f64 * 16.6)
            .filter(|&now| throttle.tick(now).is_some())
            .count();
        assert_eq!(accepted, 60);
    }

    #[test]
    fn test_cap_halves_refresh_rate() {
        let mut throttle = FrameThrottle::new(30.0);
        let accepted = (0..120)
            .map(|i| i as f64 * (1000.0 / 60.0))
            .filter(|&now| throttle.tick(now).is_some())
            .count();
        assert_eq!(accepted, 60);
    }

    #[test]
    fn test_uncapped() {
        for max_fps in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let mut throttle = FrameThrottle::new(max_fps);
            assert_eq!(throttle.max_fps(), None);
            assert_eq!(throttle.time_step(), 0.0);
            assert!(throttle.tick(1.0).is_some());
            assert!(throttle.tick(1.0).is_some());
            assert!(throttle.tick(1.5).is_some());
        }
    }

    #[test]
    fn test_set_max_fps_and_reset() {
        let mut throttle = FrameThrottle::new(10.0);
        assert_eq!(throttle.time_step(), 100.0);
        throttle.tick(0.0);
        throttle.set_max_fps(50.0);
        assert_eq!(throttle.max_fps(), Some(50.0));
        assert!(throttle.tick(20.0).is_some());
        assert_eq!(throttle.frames(), 2);

        throttle.reset();
        assert_eq!(throttle.frames(), 0);
        assert_eq!(throttle.tick(21.0).map(|t| t.frame), Some(0));
    }

    #[test]
    fn test_stats_record() {
        let mut stats = FrameStats::default();
        stats.record(true, true);
        stats.record(true, false);
        stats.record(false, false);
        stats.record(false, true);
        assert_eq!(
            stats,
            FrameStats {
                rendered: 2,
                presented: 1,
                skipped: 2,
            }
        );
    }
}
