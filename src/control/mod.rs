//! Closed-loop control: the PID inner loop and the profile envelope
//! generator that drives its setpoint.

pub mod envelope;
pub mod pid;
