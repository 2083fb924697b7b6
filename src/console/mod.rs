//! Line-oriented command console.
//!
//! Transport-decoupled: the host feeds complete lines into
//! [`Console::handle_line`] and gets a typed [`Outcome`] back; asynchronous
//! events flow through the [`EventSink`] port as everywhere else. Framing,
//! serial I/O and prompts stay on the adapter side.
//!
//! Every failed command maps to a single `CONSOLEERROR[<code>]` reply; no
//! command failure changes controller or store state.

use core::fmt::Write as _;

use log::debug;

use crate::app::commands::Command;
use crate::app::events::OvenEvent;
use crate::app::ports::{
    ClockPort, DigitalInputPort, EventSink, HeaterPort, NvMemory, SensorPort,
};
use crate::app::service::OvenController;
use crate::error::{ConsoleError, ProfileError, StoreError};
use crate::profile::{Phase, Profile};
use crate::store::ProfileStore;

/// Bytes shown by one `e d` dump.
const DUMP_LEN: usize = 64;

const HELP: &str = "\
?                        this help
i <pin>                  stream digital input transitions until next input
p cur                    active profile index
p ls                     list profile names
p sel <idx>              activate profile (stops controller)
p get <idx>              dump profile
p nw <name> <n>          new N-phase draft profile, made active
p ph <i> <name> <end> <slope> <dur>   set draft phase
p sav                    append active profile to the catalog
p on                     start controller
p off                    stop controller
e inf                    store info
e fmt                    reformat store, install defaults
e d <off>                dump 64 bytes at offset
rst                      soft reset";

/// Result of dispatching one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Response text, possibly multi-line. Empty for blank input.
    Reply(String),
    /// `rst` received: no response, the host loop performs a soft reset.
    Reset,
}

// ───────────────────────────────────────────────────────────────
// Console
// ───────────────────────────────────────────────────────────────

struct Monitor {
    pin: u8,
    last: bool,
}

/// Command dispatcher plus the digital-input monitor state.
pub struct Console {
    monitor: Option<Monitor>,
}

impl Console {
    pub fn new() -> Self {
        Self { monitor: None }
    }

    /// Dispatch one input line against the controller and the store.
    pub fn handle_line<M: NvMemory>(
        &mut self,
        line: &str,
        ctl: &mut OvenController,
        store: &mut ProfileStore<M>,
        clock: &impl ClockPort,
        hw: &mut (impl SensorPort + HeaterPort),
        inputs: &mut impl DigitalInputPort,
        sink: &mut impl EventSink,
    ) -> Outcome {
        // Any new input ends a running input monitor.
        self.monitor = None;

        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            return Outcome::Reply(String::new());
        }
        debug!("console: {:?}", tokens);

        let cmd = match parse(&tokens) {
            Ok(cmd) => cmd,
            Err(e) => return error_reply(e),
        };
        if cmd == Command::Reset {
            return Outcome::Reset;
        }

        match self.dispatch(cmd, ctl, store, clock, hw, inputs, sink) {
            Ok(reply) => Outcome::Reply(reply),
            Err(e) => error_reply(e),
        }
    }

    /// Poll the input monitor; emits `in[N]=V;` on every level change.
    /// Call from the cooperative loop alongside `tick`.
    pub fn poll(&mut self, inputs: &mut impl DigitalInputPort, sink: &mut impl EventSink) {
        let Some(mon) = self.monitor.as_mut() else {
            return;
        };
        if let Some(level) = inputs.read_pin(mon.pin) {
            if level != mon.last {
                mon.last = level;
                sink.emit(&OvenEvent::InputTransition {
                    pin: mon.pin,
                    level,
                });
            }
        }
    }

    /// True while an `i <pin>` monitor is streaming.
    pub fn monitoring(&self) -> bool {
        self.monitor.is_some()
    }

    // ── Command execution ─────────────────────────────────────

    fn dispatch<M: NvMemory>(
        &mut self,
        cmd: Command,
        ctl: &mut OvenController,
        store: &mut ProfileStore<M>,
        clock: &impl ClockPort,
        hw: &mut (impl SensorPort + HeaterPort),
        inputs: &mut impl DigitalInputPort,
        sink: &mut impl EventSink,
    ) -> Result<String, ConsoleError> {
        match cmd {
            Command::Help => Ok(HELP.to_string()),

            Command::MonitorInput { pin } => {
                let level = inputs.read_pin(pin).ok_or(ConsoleError::ArgOutOfRange)?;
                self.monitor = Some(Monitor { pin, last: level });
                Ok(OvenEvent::InputTransition { pin, level }.to_string())
            }

            Command::ProfileCurrent => Ok(ctl.active_index_i32().to_string()),

            Command::ProfileList => {
                let mut out = String::new();
                let mut index = 0;
                while let Some((header, _)) = store.load_header(index) {
                    if index > 0 {
                        out.push('\n');
                    }
                    out.push_str(header.name.as_str());
                    index += 1;
                }
                Ok(out)
            }

            Command::ProfileSelect { index } => {
                let profile = store.load_profile(index).ok_or(ConsoleError::ArgOutOfRange)?;
                profile
                    .validate()
                    .map_err(|_| ConsoleError::ArgInvalidOpt)?;
                ctl.activate(profile, Some(index), hw, sink);
                Ok("ok".to_string())
            }

            Command::ProfileGet { index } => {
                let profile = store.load_profile(index).ok_or(ConsoleError::ArgOutOfRange)?;
                let mut out = format!(
                    "profile[idx={},nam=\"{}\",pha={}]",
                    index,
                    profile.name,
                    profile.phases.len()
                );
                for phase in &profile.phases {
                    // Same record shape the controller emits at phase start.
                    let record = OvenEvent::PhaseStarted {
                        name: phase.name.clone(),
                        end_temp: phase.end_temp,
                        slope: phase.slope,
                        duration: phase.duration,
                    };
                    let _ = write!(out, "\n{}", record);
                }
                Ok(out)
            }

            Command::ProfileNew { name, count } => {
                let draft = Profile::draft(name.as_str(), count).map_err(|e| match e {
                    ProfileError::TooManyPhases => ConsoleError::NoMemory,
                    _ => ConsoleError::ArgOutOfRange,
                })?;
                ctl.activate(draft, None, hw, sink);
                Ok("ok".to_string())
            }

            Command::ProfileSetPhase { index, phase } => {
                if ctl.running() || ctl.active_profile().is_none() {
                    return Err(ConsoleError::ArgInvalidOpt);
                }
                phase.validate().map_err(|e| match e {
                    ProfileError::SlopeOutOfRange => ConsoleError::ArgOutOfRange,
                    _ => ConsoleError::ArgInvalidOpt,
                })?;
                if !ctl.edit_phase(index, phase) {
                    return Err(ConsoleError::ArgOutOfRange);
                }
                Ok("ok".to_string())
            }

            Command::ProfileSave => {
                if ctl.running() {
                    return Err(ConsoleError::ArgInvalidOpt);
                }
                let profile = ctl.active_profile().ok_or(ConsoleError::ArgInvalidOpt)?;
                profile
                    .validate()
                    .map_err(|_| ConsoleError::ArgInvalidOpt)?;
                store.append(profile).map_err(store_error)?;
                let index = store.count() - 1;
                ctl.assign_catalog_index(index);
                sink.emit(&OvenEvent::ProfileActivated {
                    index: index as i32,
                });
                Ok("ok".to_string())
            }

            Command::Start => {
                if ctl.start(clock, hw, sink) {
                    Ok("ok".to_string())
                } else {
                    Err(ConsoleError::ArgInvalidOpt)
                }
            }

            Command::Stop => {
                ctl.stop(hw, sink);
                Ok("ok".to_string())
            }

            Command::StoreInfo => {
                let info = store.info();
                let free = info.free_start.map_or(-1, |f| f as i64);
                Ok(format!(
                    "eeprom[sigOk={},len={},freestart={}]",
                    u8::from(info.sig_ok),
                    info.len,
                    free
                ))
            }

            Command::StoreFormat => {
                if ctl.running() {
                    return Err(ConsoleError::ArgInvalidOpt);
                }
                store.format().map_err(store_error)?;
                store.register_defaults().map_err(store_error)?;
                Ok("ok".to_string())
            }

            Command::StoreDump { offset } => {
                if offset >= store.len() {
                    return Err(ConsoleError::ArgOutOfRange);
                }
                let n = DUMP_LEN.min(store.len() - offset);
                let mut buf = [0u8; DUMP_LEN];
                store
                    .read_raw(offset, &mut buf[..n])
                    .map_err(store_error)?;
                Ok(hex_dump(offset, &buf[..n]))
            }

            // Handled in handle_line before dispatch.
            Command::Reset => Ok(String::new()),
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// Parsing
// ───────────────────────────────────────────────────────────────

fn parse(tokens: &[&str]) -> Result<Command, ConsoleError> {
    match tokens[0] {
        "?" => {
            expect_args(tokens, 1)?;
            Ok(Command::Help)
        }
        "i" => {
            expect_args(tokens, 2)?;
            Ok(Command::MonitorInput {
                pin: int_arg(tokens[1])?,
            })
        }
        "p" => parse_profile(tokens),
        "e" => parse_store(tokens),
        "rst" => {
            expect_args(tokens, 1)?;
            Ok(Command::Reset)
        }
        _ => Err(ConsoleError::ArgInvalidOpt),
    }
}

fn parse_profile(tokens: &[&str]) -> Result<Command, ConsoleError> {
    match tokens.get(1).copied() {
        Some("cur") => {
            expect_args(tokens, 2)?;
            Ok(Command::ProfileCurrent)
        }
        Some("ls") => {
            expect_args(tokens, 2)?;
            Ok(Command::ProfileList)
        }
        Some("sel") => {
            expect_args(tokens, 3)?;
            Ok(Command::ProfileSelect {
                index: int_arg(tokens[2])?,
            })
        }
        Some("get") => {
            expect_args(tokens, 3)?;
            Ok(Command::ProfileGet {
                index: int_arg(tokens[2])?,
            })
        }
        Some("nw") => {
            expect_args(tokens, 4)?;
            let mut name = heapless::String::new();
            name.push_str(tokens[2])
                .map_err(|_| ConsoleError::ArgOutOfRange)?;
            Ok(Command::ProfileNew {
                name,
                count: int_arg(tokens[3])?,
            })
        }
        Some("ph") => {
            expect_args(tokens, 7)?;
            let phase = Phase::new(
                tokens[3],
                float_arg(tokens[4])?,
                float_arg(tokens[5])?,
                int_arg(tokens[6])?,
            );
            Ok(Command::ProfileSetPhase {
                index: int_arg(tokens[2])?,
                phase,
            })
        }
        Some("sav") => {
            expect_args(tokens, 2)?;
            Ok(Command::ProfileSave)
        }
        Some("on") => {
            expect_args(tokens, 2)?;
            Ok(Command::Start)
        }
        Some("off") => {
            expect_args(tokens, 2)?;
            Ok(Command::Stop)
        }
        Some(_) => Err(ConsoleError::ArgInvalidOpt),
        None => Err(ConsoleError::ArgsCount),
    }
}

fn parse_store(tokens: &[&str]) -> Result<Command, ConsoleError> {
    match tokens.get(1).copied() {
        Some("inf") => {
            expect_args(tokens, 2)?;
            Ok(Command::StoreInfo)
        }
        Some("fmt") => {
            expect_args(tokens, 2)?;
            Ok(Command::StoreFormat)
        }
        Some("d") => {
            expect_args(tokens, 3)?;
            Ok(Command::StoreDump {
                offset: int_arg(tokens[2])?,
            })
        }
        Some(_) => Err(ConsoleError::ArgInvalidOpt),
        None => Err(ConsoleError::ArgsCount),
    }
}

fn expect_args(tokens: &[&str], n: usize) -> Result<(), ConsoleError> {
    if tokens.len() == n {
        Ok(())
    } else {
        Err(ConsoleError::ArgsCount)
    }
}

fn int_arg<T: core::str::FromStr>(token: &str) -> Result<T, ConsoleError> {
    token.parse().map_err(|_| ConsoleError::ArgInvalidOpt)
}

fn float_arg(token: &str) -> Result<f64, ConsoleError> {
    let value: f64 = token.parse().map_err(|_| ConsoleError::ArgInvalidOpt)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConsoleError::ArgInvalidOpt)
    }
}

fn error_reply(e: ConsoleError) -> Outcome {
    Outcome::Reply(format!("CONSOLEERROR[{}]", e.code()))
}

fn store_error(e: StoreError) -> ConsoleError {
    match e {
        StoreError::Full => ConsoleError::NoMemory,
        _ => ConsoleError::ArgInvalidOpt,
    }
}

/// 16-bytes-per-row hex dump with offset prefixes.
fn hex_dump(offset: usize, bytes: &[u8]) -> String {
    let mut out = String::new();
    for (row, chunk) in bytes.chunks(16).enumerate() {
        if row > 0 {
            out.push('\n');
        }
        let _ = write!(out, "{:04X}:", offset + row * 16);
        for b in chunk {
            let _ = write!(out, " {:02X}", b);
        }
    }
    out
}
