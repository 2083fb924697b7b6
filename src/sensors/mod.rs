//! Sensor conditioning. The raw probe (thermocouple amplifier behind an
//! ADC) is an external driver; this module owns the smoothing contract the
//! controller relies on.

pub mod temperature;

pub use temperature::{RawProbe, RunningAverage, TemperatureFilter};
