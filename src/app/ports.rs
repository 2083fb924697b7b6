//! Port traits — the seam between the control core and the hardware.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ OvenController (domain)
//! ```
//!
//! Driven adapters (clock, thermocouple, SSR, byte store, event sinks)
//! implement these traits. The [`OvenController`](super::service::OvenController)
//! and the console consume them via generics, so the control core never
//! touches hardware directly. Concrete drivers (LCD, keypad, ADC, serial
//! transport) live entirely on the adapter side of this seam.

use crate::app::events::OvenEvent;
use crate::error::StoreError;

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond time source.
///
/// Values are non-decreasing and must not wrap for the duration of any
/// plausible run. A host target maps this to the system monotonic clock;
/// a constrained target widens its tick counter.
pub trait ClockPort {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Smoothed oven temperature in degC.
///
/// Implementations apply a moving-average filter of at least 100 samples
/// drawn at 10 ms intervals or faster (see [`crate::sensors`]). Returned
/// values are never NaN and reading has no side effects on the process.
pub trait SensorPort {
    fn read(&mut self) -> f32;
}

// ───────────────────────────────────────────────────────────────
// Heater port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Heater duty-cycle command, clamped by callers to [0.0, 100.0].
///
/// The adapter converts the scalar into an on/off pattern over a fixed
/// 250 ms window (see [`crate::drivers::slow_pwm`]). Idempotent and cheap;
/// the controller calls it on every PID computation.
pub trait HeaterPort {
    fn set_duty(&mut self, duty: f32);
}

// ───────────────────────────────────────────────────────────────
// Digital input port
// ───────────────────────────────────────────────────────────────

/// Raw digital input access for the console's `i <pin>` monitor.
pub trait DigitalInputPort {
    /// Current level of `pin`, or `None` if the pin does not exist.
    fn read_pin(&mut self, pin: u8) -> Option<bool>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → host console)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`OvenEvent`]s through this port. Adapters
/// decide where they go (serial console, log, test buffer). One event maps
/// to one bracketed wire record and records are never interleaved.
pub trait EventSink {
    fn emit(&mut self, event: &OvenEvent);
}

// ───────────────────────────────────────────────────────────────
// Non-volatile memory port (driven adapter: domain ↔ EEPROM/flash)
// ───────────────────────────────────────────────────────────────

/// Byte-addressed persistent memory backing the profile catalog.
///
/// The [`ProfileStore`](crate::store::ProfileStore) performs all layout
/// work; implementations only move bytes. Writes smaller than the device's
/// native page are expected to be supported (EEPROM-style semantics).
pub trait NvMemory {
    /// Total capacity in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fill `buf` from `offset`. Fails with [`StoreError::OutOfBounds`]
    /// if the range does not fit.
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StoreError>;

    /// Write `data` at `offset`. Same bounds rule as [`NvMemory::read`].
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StoreError>;
}
