//! PID controller for heater duty-cycle regulation.
//!
//! Discrete positional PID closing on the envelope-generated setpoint.
//! Direct acting: more output raises the measured variable. The sample
//! period is enforced by the caller's time gate, so `compute` takes an
//! explicit `dt`.

/// Controller operating mode.
///
/// In `Manual` the output is frozen and no state accumulates; switching
/// back to `Automatic` re-initialises the internal state so the loop
/// restarts without a kick from stale history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PidMode {
    Manual,
    Automatic,
}

/// PID controller for oven temperature regulation.
pub struct PidController {
    kp: f64,
    ki: f64,
    kd: f64,
    setpoint: f64,
    integral: f64,
    prev_error: f64,
    output_min: f64,
    output_max: f64,
    mode: PidMode,
    last_output: f64,
}

impl PidController {
    pub fn new(kp: f64, ki: f64, kd: f64, setpoint: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            setpoint,
            integral: 0.0,
            prev_error: 0.0,
            output_min: 0.0,
            output_max: 100.0,
            mode: PidMode::Manual,
            last_output: 0.0,
        }
    }

    /// Set output limits
    pub fn set_limits(&mut self, min: f64, max: f64) {
        self.output_min = min;
        self.output_max = max;
    }

    /// Replace the tunings. Takes effect on the next `compute`.
    pub fn set_tunings(&mut self, kp: f64, ki: f64, kd: f64) {
        self.kp = kp;
        self.ki = ki;
        self.kd = kd;
    }

    /// Update setpoint
    pub fn set_setpoint(&mut self, setpoint: f64) {
        self.setpoint = setpoint;
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    /// Change mode. The Manual→Automatic edge resets the accumulated state.
    pub fn set_mode(&mut self, mode: PidMode) {
        if self.mode == PidMode::Manual && mode == PidMode::Automatic {
            self.reset();
        }
        self.mode = mode;
    }

    /// Last computed (or frozen) output.
    pub fn output(&self) -> f64 {
        self.last_output
    }

    /// Compute PID output given current measurement
    pub fn compute(&mut self, measurement: f64, dt: f64) -> f64 {
        if self.mode == PidMode::Manual {
            return self.last_output;
        }

        let error = self.setpoint - measurement;

        // Proportional
        let p = self.kp * error;

        // Integral (with anti-windup)
        self.integral += error * dt;
        let i = self.ki * self.integral;

        // Derivative
        let derivative = if dt > 0.0 {
            (error - self.prev_error) / dt
        } else {
            0.0
        };
        let d = self.kd * derivative;

        self.prev_error = error;

        // Clamp output
        let output = (p + i + d).clamp(self.output_min, self.output_max);

        // Anti-windup: if output is saturated, stop integrating
        if output >= self.output_max || output <= self.output_min {
            self.integral -= error * dt;
        }

        self.last_output = output;
        output
    }

    /// Force the frozen output (Manual mode only has an effect on reads).
    pub fn force_output(&mut self, output: f64) {
        self.last_output = output.clamp(self.output_min, self.output_max);
    }

    /// Reset controller state
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn automatic(kp: f64, ki: f64, kd: f64, setpoint: f64) -> PidController {
        let mut pid = PidController::new(kp, ki, kd, setpoint);
        pid.set_mode(PidMode::Automatic);
        pid
    }

    #[test]
    fn zero_error_zero_output() {
        let mut pid = automatic(1.0, 0.0, 0.0, 50.0);
        let out = pid.compute(50.0, 1.0);
        assert!((out - 0.0).abs() < 0.001);
    }

    #[test]
    fn proportional_response() {
        let mut pid = automatic(2.0, 0.0, 0.0, 100.0);
        pid.set_limits(0.0, 200.0);
        let out = pid.compute(90.0, 1.0);
        assert!((out - 20.0).abs() < 0.001);
    }

    #[test]
    fn integral_accumulates() {
        let mut pid = automatic(0.0, 1.0, 0.0, 100.0);
        pid.set_limits(0.0, 200.0);
        let o1 = pid.compute(90.0, 1.0);
        let o2 = pid.compute(90.0, 1.0);
        assert!(o2 > o1, "integral should accumulate: {o2} > {o1}");
    }

    #[test]
    fn derivative_responds_to_change() {
        let mut pid = automatic(0.0, 0.0, 1.0, 100.0);
        pid.set_limits(-200.0, 200.0);
        let _ = pid.compute(90.0, 1.0);
        let o2 = pid.compute(95.0, 1.0);
        assert!(
            o2 < 0.0,
            "derivative should be negative when error decreases"
        );
    }

    #[test]
    fn output_clamped_to_limits() {
        let mut pid = automatic(100.0, 0.0, 0.0, 1000.0);
        let out = pid.compute(0.0, 1.0);
        assert!((out - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn output_clamped_to_min() {
        let mut pid = automatic(100.0, 0.0, 0.0, 0.0);
        let out = pid.compute(1000.0, 1.0);
        assert!((out - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn manual_mode_freezes_output() {
        let mut pid = automatic(2.0, 0.0, 0.0, 100.0);
        let out = pid.compute(90.0, 1.0);
        pid.set_mode(PidMode::Manual);
        assert_eq!(pid.compute(0.0, 1.0), out, "manual must not recompute");
    }

    #[test]
    fn manual_to_automatic_reinitialises() {
        let mut pid = automatic(0.0, 1.0, 0.0, 100.0);
        pid.set_limits(0.0, 200.0);
        pid.compute(50.0, 1.0);
        pid.compute(50.0, 1.0);
        pid.set_mode(PidMode::Manual);
        pid.set_mode(PidMode::Automatic);
        let out = pid.compute(100.0, 1.0);
        assert!(
            (out - 0.0).abs() < 0.001,
            "integral must be cleared on the manual→automatic edge, got {out}"
        );
    }

    #[test]
    fn force_output_respects_limits() {
        let mut pid = PidController::new(1.0, 0.0, 0.0, 0.0);
        pid.force_output(250.0);
        assert_eq!(pid.output(), 100.0);
        pid.force_output(-5.0);
        assert_eq!(pid.output(), 0.0);
    }

    #[test]
    fn zero_dt_no_derivative_explosion() {
        let mut pid = automatic(0.0, 0.0, 10.0, 100.0);
        pid.set_limits(-1000.0, 1000.0);
        let out = pid.compute(50.0, 0.0);
        assert!(out.is_finite());
    }
}
