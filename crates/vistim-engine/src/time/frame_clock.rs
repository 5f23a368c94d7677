use std::time::{Duration, Instant};

/// Timing of one presented frame.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous tick, clamped.
    pub dt: f32,
    pub now: Instant,
    /// Time since the clock started or was last reset.
    pub elapsed: Duration,
    pub frame_index: u64,
    /// Ticks whose unclamped interval exceeded the dropped-frame threshold
    /// since the clock started.
    pub late_frames: u64,
}

/// Per-loop frame clock.
///
/// Stimulus code cares about missed refreshes, so besides the clamped delta
/// the clock counts intervals longer than `late_threshold`.
#[derive(Debug, Clone)]
pub struct FrameClock {
    start: Instant,
    last: Instant,
    frame_index: u64,
    late_frames: u64,
    dt_max: Duration,
    late_threshold: Duration,
}

impl FrameClock {
    /// Clock with a 250 ms delta clamp and a 1.5 × 60 Hz late threshold.
    pub fn new() -> Self {
        Self::with_limits(Duration::from_millis(250), Duration::from_micros(25_000))
    }

    pub fn with_limits(dt_max: Duration, late_threshold: Duration) -> Self {
        let now = Instant::now();
        Self { start: now, last: now, frame_index: 0, late_frames: 0, dt_max, late_threshold }
    }

    /// Restarts the interval baseline, e.g. after the surface was
    /// reconfigured or the window was occluded.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> FrameTime {
        let raw = now.saturating_duration_since(self.last);
        if self.frame_index > 0 && raw > self.late_threshold {
            self.late_frames += 1;
        }
        self.last = now;

        let ft = FrameTime {
            dt: raw.min(self.dt_max).as_secs_f32(),
            now,
            elapsed: now.saturating_duration_since(self.start),
            frame_index: self.frame_index,
            late_frames: self.late_frames,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
