//! Time-proportioning PWM for the heater SSR.
//!
//! A solid-state relay switching mains cannot be driven at kHz rates; the
//! duty scalar is instead spread over a fixed 250 ms window: on for
//! `duty%` of the window, off for the rest. Duty 0 never fires the SSR
//! and duty 100 holds it on continuously.

/// Window-based on/off pattern generator.
#[derive(Debug, Clone, Copy)]
pub struct SlowPwm {
    period_ms: u64,
    duty: f32,
    window_start_ms: u64,
}

impl SlowPwm {
    pub fn new(period_ms: u64) -> Self {
        Self {
            period_ms,
            duty: 0.0,
            window_start_ms: 0,
        }
    }

    /// Command a new duty cycle, clamped to [0, 100].
    pub fn set_duty(&mut self, duty: f32) {
        self.duty = duty.clamp(0.0, 100.0);
    }

    pub fn duty(&self) -> f32 {
        self.duty
    }

    /// Output level at `now_ms`. Call from the cooperative loop; the
    /// window re-anchors itself whenever a full period has elapsed.
    pub fn level(&mut self, now_ms: u64) -> bool {
        let mut elapsed = now_ms.wrapping_sub(self.window_start_ms);
        if elapsed >= self.period_ms {
            // Skip whole windows if the loop stalled.
            self.window_start_ms = now_ms - elapsed % self.period_ms;
            elapsed = now_ms.wrapping_sub(self.window_start_ms);
        }
        let on_ms = (self.period_ms as f32 * self.duty / 100.0) as u64;
        elapsed < on_ms
    }
}
