//! System configuration parameters
//!
//! All tunable parameters for the oven controller core. Values can be
//! overridden by the host before the controller is constructed; tunings
//! take effect at the next process start, never mid-run.

use serde::{Deserialize, Serialize};

/// Absolute maximum magnitude for a phase temperature slope (degC/s).
pub const MAX_SLOPE: f64 = 100.0;

/// Capacity of the inline phase buffer owned by the active profile.
pub const MAX_PHASES: usize = 16;

/// Maximum number of chars in a phase name (excluding the NUL).
pub const PHASE_NAME_LEN: usize = 10;

/// Maximum number of chars in a profile name (excluding the NUL).
pub const PROFILE_NAME_LEN: usize = 19;

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- PID ---
    /// Proportional gain
    pub pid_kp: f64,
    /// Integral gain
    pub pid_ki: f64,
    /// Derivative gain
    pub pid_kd: f64,
    /// PID sample period (milliseconds)
    pub pid_sample_ms: u64,

    // --- Envelope ---
    /// Profile envelope sampling period (milliseconds)
    pub profile_sampling_ms: u64,

    // --- Reporting ---
    /// Idle temperature snapshot period (milliseconds)
    pub idle_log_ms: u64,

    // --- Sensor ---
    /// Raw probe sampling period (milliseconds). The averaging window is
    /// [`crate::sensors::temperature::AVERAGING_SAMPLES`] samples wide.
    pub temp_sampling_ms: u64,

    // --- Heater ---
    /// SSR duty-cycle window (milliseconds)
    pub heater_period_ms: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // PID
            pid_kp: 300.0,
            pid_ki: 0.05,
            pid_kd: 250.0,
            pid_sample_ms: 250,

            // Envelope
            profile_sampling_ms: 50, // 20 Hz

            // Reporting
            idle_log_ms: 500,

            // Sensor
            temp_sampling_ms: 10, // 100 Hz

            // Heater
            heater_period_ms: 250,
        }
    }
}
