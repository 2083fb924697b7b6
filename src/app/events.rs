//! Outbound controller events and their wire encoding.
//!
//! The [`OvenController`](super::service::OvenController) emits these
//! through the [`EventSink`](super::ports::EventSink) port. Each event
//! renders as a single bracketed record via `Display`; the transport
//! adapter frames records as lines.

use core::fmt;

use crate::profile::PhaseName;

/// Structured events emitted by the controller core.
#[derive(Debug, Clone, PartialEq)]
pub enum OvenEvent {
    /// The running flag changed.
    OvenState { on: bool },

    /// A phase started. Carries the *configured* slope and duration,
    /// not the derived effective slope.
    PhaseStarted {
        name: PhaseName,
        end_temp: f64,
        slope: f64,
        duration: i32,
    },

    /// One PID computation: process elapsed ms, measured temperature,
    /// current effective slope, current setpoint, duty output.
    PidSample {
        process_ms: u64,
        temp: f64,
        slope: f64,
        setpoint: f64,
        output: f64,
    },

    /// The active profile changed. Index is the catalog index, or -1
    /// for an unsaved draft or no profile.
    ProfileActivated { index: i32 },

    /// Idle temperature snapshot (every 500 ms while not running).
    TempSnapshot {
        now_ms: u64,
        process_start_ms: u64,
        temp: f64,
    },

    /// A monitored digital input changed level.
    InputTransition { pin: u8, level: bool },
}

impl fmt::Display for OvenEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OvenState { on } => {
                write!(f, "oven[on={}]", u8::from(*on))
            }
            Self::PhaseStarted {
                name,
                end_temp,
                slope,
                duration,
            } => {
                write!(
                    f,
                    "phase[nam=\"{}\",end={:.2},m={:.2},t={}]",
                    name, end_temp, slope, duration
                )
            }
            Self::PidSample {
                process_ms,
                temp,
                slope,
                setpoint,
                output,
            } => {
                write!(
                    f,
                    "pid[pdt={},tmp={:.2},slp={:.2},spt={:.2},out={:.2}]",
                    process_ms, temp, slope, setpoint, output
                )
            }
            Self::ProfileActivated { index } => {
                write!(f, "profile[idx={}]", index)
            }
            Self::TempSnapshot {
                now_ms,
                process_start_ms,
                temp,
            } => {
                write!(f, "temp[st={},lpt={},tmp={:.2}]", now_ms, process_start_ms, temp)
            }
            Self::InputTransition { pin, level } => {
                write!(f, "in[{}]={};", pin, u8::from(*level))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ascii_name;

    #[test]
    fn oven_state_wire_format() {
        assert_eq!(OvenEvent::OvenState { on: true }.to_string(), "oven[on=1]");
        assert_eq!(OvenEvent::OvenState { on: false }.to_string(), "oven[on=0]");
    }

    #[test]
    fn phase_wire_format() {
        let e = OvenEvent::PhaseStarted {
            name: ascii_name("Heating"),
            end_temp: 50.0,
            slope: 2.0,
            duration: -1,
        };
        assert_eq!(e.to_string(), "phase[nam=\"Heating\",end=50.00,m=2.00,t=-1]");
    }

    #[test]
    fn pid_wire_format() {
        let e = OvenEvent::PidSample {
            process_ms: 1250,
            temp: 25.5,
            slope: 2.0,
            setpoint: 27.5,
            output: 100.0,
        };
        assert_eq!(
            e.to_string(),
            "pid[pdt=1250,tmp=25.50,slp=2.00,spt=27.50,out=100.00]"
        );
    }

    #[test]
    fn input_wire_format() {
        let e = OvenEvent::InputTransition { pin: 7, level: true };
        assert_eq!(e.to_string(), "in[7]=1;");
    }
}
