//! Linear parameter ramp
//!
//! Time-driven interpolation sampled once per tick. The ramp itself knows
//! nothing about channels; the scheduler's fade task applies its value.

/// A linear interpolation from `from` to `to` over `duration` seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearRamp {
    from: f32,
    to: f32,
    duration: f32,
    elapsed: f32,
}

impl LinearRamp {
    /// Create a new ramp
    ///
    /// Negative or NaN durations are treated as zero, which makes the ramp
    /// complete immediately at `to`.
    pub fn new(from: f32, to: f32, duration: f32) -> Self {
        let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
        Self {
            from,
            to,
            duration,
            elapsed: 0.0,
        }
    }

    /// Advance by `dt` seconds and return the sampled value
    pub fn advance(&mut self, dt: f32) -> f32 {
        self.elapsed += dt.max(0.0);
        self.value()
    }

    /// Current value without advancing
    pub fn value(&self) -> f32 {
        if self.is_complete() {
            return self.to;
        }
        let t = self.elapsed / self.duration;
        self.from + (self.to - self.from) * t
    }

    /// True once the elapsed time has reached the duration
    pub fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Target value
    pub fn end_value(&self) -> f32 {
        self.to
    }

    /// Configured duration in seconds
    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Seconds elapsed so far
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }
}
