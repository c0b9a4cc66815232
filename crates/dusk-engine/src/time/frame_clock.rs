use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Trailing window used for the rolling delta average (1s of frames at 60fps).
const MAX_DELTA_SAMPLES: usize = 60;

/// Upper clamp for a single frame delta, in seconds (~15fps).
///
/// Keeps simulation steps sane after a debugger pause, a minimized window or
/// a long stall.
const MAX_FRAME_DELTA: f64 = 0.0666;

/// Frame clock driving per-frame delta measurement, a rolling delta average
/// and once-per-second FPS sampling.
///
/// Negative deltas (monotonic clock anomalies) clamp to zero; runaway deltas
/// clamp to [`MAX_FRAME_DELTA`].
#[derive(Debug, Clone)]
pub struct FrameClock {
    started: Instant,
    last: Instant,
    delta: f64,
    history: VecDeque<f64>,
    average: f64,
    fps: u32,
    frames: u32,
    accumulator: f64,
}

impl FrameClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            last: now,
            delta: 0.0,
            history: VecDeque::with_capacity(MAX_DELTA_SAMPLES),
            average: 0.0,
            fps: 0,
            frames: 0,
            accumulator: 0.0,
        }
    }

    /// Re-captures the baseline for the next `step()` and discards all
    /// accumulated samples. Called once before a loop starts.
    pub fn reset(&mut self) {
        self.last = Instant::now();
        self.delta = 0.0;
        self.history.clear();
        self.average = 0.0;
        self.fps = 0;
        self.frames = 0;
        self.accumulator = 0.0;
    }

    /// Advances the clock and returns the elapsed time since the previous
    /// `step()`, in seconds.
    pub fn step(&mut self) -> f64 {
        let now = Instant::now();
        // saturating_duration_since clamps clock anomalies to a zero delta.
        let dt = now
            .saturating_duration_since(self.last)
            .as_secs_f64()
            .min(MAX_FRAME_DELTA);
        self.last = now;
        self.record(dt);
        dt
    }

    /// Folds one delta sample into the rolling average and FPS accumulator.
    fn record(&mut self, dt: f64) {
        self.delta = dt;

        self.history.push_back(dt);
        if self.history.len() > MAX_DELTA_SAMPLES {
            self.history.pop_front();
        }
        self.average = self.history.iter().sum::<f64>() / self.history.len() as f64;

        self.frames += 1;
        self.accumulator += dt;
        if self.accumulator >= 1.0 {
            self.fps = self.frames;
            self.frames = 0;
            // Carry the fractional remainder forward so sampling windows
            // do not drift.
            self.accumulator -= 1.0;
        }
    }

    /// Delta of the most recent `step()`, in seconds.
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Arithmetic mean over the trailing [`MAX_DELTA_SAMPLES`] deltas.
    pub fn average_delta(&self) -> f64 {
        self.average
    }

    /// Frame count of the most recently completed one-second window.
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Seconds elapsed since this clock was created.
    pub fn time_since_start(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Pauses the current thread. Negative input is a no-op.
    ///
    /// This blocks the whole loop; graphics will not draw and events will not
    /// be delivered while sleeping.
    pub fn sleep(seconds: f64) {
        if seconds <= 0.0 {
            return;
        }
        std::thread::sleep(Duration::from_secs_f64(seconds));
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIXTIETH: f64 = 1.0 / 60.0;

    #[test]
    fn rolling_average_reflects_trailing_window_only() {
        let mut clock = FrameClock::new();
        // 10 outliers followed by 60 steady samples; the outliers must be
        // evicted from the 60-slot window.
        for _ in 0..10 {
            clock.record(0.05);
        }
        for _ in 0..60 {
            clock.record(SIXTIETH);
        }
        assert!((clock.average_delta() - SIXTIETH).abs() < 1e-9);
    }

    #[test]
    fn rolling_average_partial_window() {
        let mut clock = FrameClock::new();
        clock.record(0.01);
        clock.record(0.03);
        assert!((clock.average_delta() - 0.02).abs() < 1e-9);
    }

    #[test]
    fn fps_publishes_on_full_second() {
        let mut clock = FrameClock::new();
        // 1/64 is exact in binary, so 64 samples sum to exactly 1.0.
        for _ in 0..63 {
            clock.record(1.0 / 64.0);
        }
        assert_eq!(clock.fps(), 0, "no full second elapsed yet");
        clock.record(1.0 / 64.0);
        assert_eq!(clock.fps(), 64);
        assert_eq!(clock.frames, 0);
        assert_eq!(clock.accumulator, 0.0);
    }

    #[test]
    fn fps_carries_fractional_remainder() {
        let mut clock = FrameClock::new();
        // 0.6s consumed, then one 0.5s sample crosses the window with 0.1s
        // spilling over into the next one.
        for _ in 0..3 {
            clock.record(0.2);
        }
        clock.record(0.5);
        assert_eq!(clock.fps(), 4);
        assert!((clock.accumulator - 0.1).abs() < 1e-9);
        assert_eq!(clock.frames, 0);
    }

    #[test]
    fn step_clamps_runaway_delta() {
        let mut clock = FrameClock::new();
        clock.last = Instant::now() - Duration::from_secs(5);
        let dt = clock.step();
        assert!(dt <= MAX_FRAME_DELTA);
    }

    #[test]
    fn reset_discards_samples() {
        let mut clock = FrameClock::new();
        for _ in 0..70 {
            clock.record(SIXTIETH);
        }
        clock.reset();
        assert_eq!(clock.fps(), 0);
        assert_eq!(clock.average_delta(), 0.0);
        assert_eq!(clock.delta(), 0.0);
    }

    #[test]
    fn sleep_negative_is_noop() {
        FrameClock::sleep(-1.0);
    }
}
