//! Application core: the controller service, its command/event boundary,
//! and the port traits adapters implement.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
