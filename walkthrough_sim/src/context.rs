//! Fixed-step virtual clock for deterministic playback.

/// Virtual clock that advances one frame at a time.
///
/// Time is derived from the tick count, so long runs do not accumulate
/// floating-point drift.
#[derive(Debug, Clone)]
pub struct SimClock {
    /// Frames per second
    fps: u32,

    /// Frames advanced so far
    ticks: u64,
}

impl SimClock {
    /// Creates a clock at `fps` frames per second (at least 1).
    pub fn new(fps: u32) -> Self {
        Self {
            fps: fps.max(1),
            ticks: 0,
        }
    }

    /// Seconds per frame.
    pub fn dt(&self) -> f64 {
        1.0 / self.fps as f64
    }

    /// Advances one frame and returns its dt.
    pub fn advance(&mut self) -> f64 {
        self.ticks += 1;
        self.dt()
    }

    /// Virtual time in seconds.
    pub fn now(&self) -> f64 {
        self.ticks as f64 / self.fps as f64
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }
}
