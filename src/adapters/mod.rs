//! Adapters — implementations of the port traits for concrete targets.
//!
//! Only the simulation target is built here; hardware adapters (thermocouple
//! ADC, SSR pin, EEPROM part, serial transport) live with their board
//! support crates and implement the same traits.

pub mod sim;
