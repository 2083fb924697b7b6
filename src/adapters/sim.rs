//! Simulation adapters for the host target.
//!
//! These implement every port against plain memory and a first-order
//! thermal model, so the full controller stack runs (and is tested)
//! without any oven attached.

use crate::app::events::OvenEvent;
use crate::app::ports::{ClockPort, DigitalInputPort, EventSink, HeaterPort, NvMemory, SensorPort};
use crate::config::SystemConfig;
use crate::drivers::SlowPwm;
use crate::error::StoreError;
use crate::sensors::{RawProbe, TemperatureFilter};

// ───────────────────────────────────────────────────────────────
// Clock
// ───────────────────────────────────────────────────────────────

/// Manually advanced millisecond clock.
#[derive(Debug, Default)]
pub struct SimClock {
    now: u64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, ms: u64) {
        self.now += ms;
    }
}

impl ClockPort for SimClock {
    fn now_ms(&self) -> u64 {
        self.now
    }
}

// ───────────────────────────────────────────────────────────────
// Thermal plant
// ───────────────────────────────────────────────────────────────

/// First-order oven model: full heater power raises the chamber at
/// `heat_rate` degC/s while losses pull it toward ambient.
#[derive(Debug, Clone, Copy)]
pub struct SimPlant {
    temp: f32,
    ambient: f32,
    heat_rate: f32,
    loss_rate: f32,
}

impl SimPlant {
    pub fn new(start_temp: f32) -> Self {
        Self {
            temp: start_temp,
            ambient: 25.0,
            heat_rate: 4.0,  // degC/s at full power
            loss_rate: 0.01, // fraction of (temp - ambient) lost per second
        }
    }

    /// Advance the model by `dt_secs` with the heater element on or off.
    pub fn step(&mut self, dt_secs: f32, heating: bool) {
        let gain = if heating { self.heat_rate } else { 0.0 };
        let loss = self.loss_rate * (self.temp - self.ambient);
        self.temp += (gain - loss) * dt_secs;
    }

    pub fn temp(&self) -> f32 {
        self.temp
    }
}

impl RawProbe for SimPlant {
    fn sample(&mut self) -> f32 {
        self.temp
    }
}

// ───────────────────────────────────────────────────────────────
// Simulated oven: plant + SSR pattern + smoothing filter
// ───────────────────────────────────────────────────────────────

/// Complete simulated oven implementing the sensor and heater ports.
///
/// The commanded duty drives a [`SlowPwm`] window, the window level heats
/// the plant, and the plant is sampled through the production smoothing
/// filter — the same signal path the hardware adapter has.
pub struct SimOven {
    plant: SimPlant,
    filter: TemperatureFilter,
    pwm: SlowPwm,
    last_step_ms: u64,
}

impl SimOven {
    pub fn new(config: &SystemConfig, start_temp: f32) -> Self {
        let mut plant = SimPlant::new(start_temp);
        let mut filter = TemperatureFilter::new(config);
        filter.prime(&mut plant);
        Self {
            plant,
            filter,
            pwm: SlowPwm::new(config.heater_period_ms),
            last_step_ms: 0,
        }
    }

    /// Advance the simulation to `now_ms`.
    pub fn step_to(&mut self, now_ms: u64) {
        let dt_ms = now_ms.saturating_sub(self.last_step_ms);
        self.last_step_ms = now_ms;
        let heating = self.pwm.level(now_ms);
        self.plant.step(dt_ms as f32 / 1000.0, heating);
        self.filter.pump(now_ms, &mut self.plant);
    }

    pub fn plant_temp(&self) -> f32 {
        self.plant.temp()
    }
}

impl SensorPort for SimOven {
    fn read(&mut self) -> f32 {
        self.filter.read()
    }
}

impl HeaterPort for SimOven {
    fn set_duty(&mut self, duty: f32) {
        self.pwm.set_duty(duty);
    }
}

// ───────────────────────────────────────────────────────────────
// In-memory non-volatile store
// ───────────────────────────────────────────────────────────────

/// RAM-backed [`NvMemory`], zero-filled like a blank EEPROM part.
pub struct MemStore {
    data: Vec<u8>,
}

impl MemStore {
    pub fn new(len: usize) -> Self {
        Self {
            data: vec![0; len],
        }
    }
}

impl NvMemory for MemStore {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StoreError> {
        let end = offset.checked_add(buf.len()).ok_or(StoreError::OutOfBounds)?;
        if end > self.data.len() {
            return Err(StoreError::OutOfBounds);
        }
        buf.copy_from_slice(&self.data[offset..end]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StoreError> {
        let end = offset.checked_add(data.len()).ok_or(StoreError::OutOfBounds)?;
        if end > self.data.len() {
            return Err(StoreError::OutOfBounds);
        }
        self.data[offset..end].copy_from_slice(data);
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Digital inputs
// ───────────────────────────────────────────────────────────────

/// Bank of 16 settable digital inputs for the console monitor.
#[derive(Debug, Default)]
pub struct SimInputs {
    pins: [bool; 16],
}

impl SimInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pin(&mut self, pin: u8, level: bool) {
        if let Some(slot) = self.pins.get_mut(pin as usize) {
            *slot = level;
        }
    }
}

impl DigitalInputPort for SimInputs {
    fn read_pin(&mut self, pin: u8) -> Option<bool> {
        self.pins.get(pin as usize).copied()
    }
}

// ───────────────────────────────────────────────────────────────
// Event sinks
// ───────────────────────────────────────────────────────────────

/// Collects events for assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<OvenEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count events matching a predicate.
    pub fn count(&self, pred: impl Fn(&OvenEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &OvenEvent) {
        self.events.push(event.clone());
    }
}

/// Writes each event as one wire line on stdout.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl EventSink for StdoutSink {
    fn emit(&mut self, event: &OvenEvent) {
        println!("{}", event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plant_heats_under_power_and_cools_without() {
        let mut plant = SimPlant::new(25.0);
        for _ in 0..100 {
            plant.step(0.1, true);
        }
        let hot = plant.temp();
        assert!(hot > 40.0, "plant should heat, got {hot}");

        for _ in 0..100 {
            plant.step(0.1, false);
        }
        assert!(plant.temp() < hot, "plant should cool with heater off");
    }

    #[test]
    fn sim_oven_tracks_duty() {
        let config = SystemConfig::default();
        let mut oven = SimOven::new(&config, 25.0);
        oven.set_duty(100.0);
        for now in (0..60_000).step_by(10) {
            oven.step_to(now);
        }
        assert!(oven.read() > 100.0, "full duty should heat well past 100");
    }

    #[test]
    fn mem_store_bounds() {
        let mut mem = MemStore::new(16);
        assert!(mem.write(12, &[1, 2, 3, 4]).is_ok());
        assert_eq!(mem.write(14, &[0; 4]), Err(StoreError::OutOfBounds));
        let mut buf = [0u8; 4];
        mem.read(12, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
        assert_eq!(mem.read(16, &mut buf), Err(StoreError::OutOfBounds));
    }

    #[test]
    fn sim_inputs_report_unknown_pins() {
        let mut inputs = SimInputs::new();
        inputs.set_pin(3, true);
        assert_eq!(inputs.read_pin(3), Some(true));
        assert_eq!(inputs.read_pin(99), None);
    }
}
