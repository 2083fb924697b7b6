//! Oven controller service — the domain core.
//!
//! [`OvenController`] owns the run state machine, the envelope generator
//! and the PID loop. All I/O flows through port traits injected at call
//! sites, making the whole service testable with mock adapters.
//!
//! ```text
//!  ClockPort ───▶ ┌─────────────────────────────┐ ───▶ EventSink
//!  SensorPort ──▶ │       OvenController        │
//!  HeaterPort ◀── │  phases · envelope · PID    │
//!                 └─────────────────────────────┘
//! ```
//!
//! `tick` is called as often as the host scheduler allows; all time-based
//! work is paced internally by comparing `now_ms()` against last-action
//! timestamps (50 ms envelope, 250 ms PID, 500 ms idle snapshot). There
//! are no suspension points.

use log::{info, warn};

use crate::app::events::OvenEvent;
use crate::app::ports::{ClockPort, EventSink, HeaterPort, SensorPort};
use crate::config::SystemConfig;
use crate::control::envelope::Envelope;
use crate::control::pid::{PidController, PidMode};
use crate::profile::{Phase, Profile};

// ───────────────────────────────────────────────────────────────
// Run state
// ───────────────────────────────────────────────────────────────

/// Phase state machine states.
///
/// `Running` carries the zero-based index into the active phase list;
/// while running the index is always within bounds by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No process active. Entered at boot and by `stop`/`set_profile`.
    Idle,
    /// Executing the given phase of the active profile.
    Running { phase: usize },
    /// The final phase terminated; heater off, awaiting a new start.
    Completed,
}

// ───────────────────────────────────────────────────────────────
// OvenController
// ───────────────────────────────────────────────────────────────

/// The profile-driven temperature control engine.
pub struct OvenController {
    config: SystemConfig,
    pid: PidController,
    state: RunState,
    /// Exclusively owned phase list for the duration of an activation;
    /// never aliases the store.
    active: Option<Profile>,
    /// Catalog index of the active profile; `None` for an unsaved draft.
    active_index: Option<usize>,
    envelope: Option<Envelope>,
    process_start_ms: u64,
    phase_start_ms: u64,
    last_envelope_ms: u64,
    last_pid_ms: u64,
    last_idle_log_ms: u64,
    pid_input: f64,
    pid_output: f64,
}

impl OvenController {
    /// Construct the controller. Does not start anything; the PID begins
    /// in manual with zero output.
    pub fn new(config: SystemConfig) -> Self {
        let mut pid = PidController::new(config.pid_kp, config.pid_ki, config.pid_kd, 0.0);
        pid.set_limits(0.0, 100.0);
        Self {
            config,
            pid,
            state: RunState::Idle,
            active: None,
            active_index: None,
            envelope: None,
            process_start_ms: 0,
            phase_start_ms: 0,
            last_envelope_ms: 0,
            last_pid_ms: 0,
            last_idle_log_ms: 0,
            pid_input: 0.0,
            pid_output: 0.0,
        }
    }

    // ── Profile management ────────────────────────────────────

    /// Replace the active profile. Stops any running process first.
    /// `index` is the catalog index, or `None` for an unsaved draft.
    pub fn activate(
        &mut self,
        profile: Profile,
        index: Option<usize>,
        heater: &mut impl HeaterPort,
        sink: &mut impl EventSink,
    ) {
        self.stop(heater, sink);
        self.active = Some(profile);
        self.active_index = index;
        sink.emit(&OvenEvent::ProfileActivated {
            index: self.active_index_i32(),
        });
    }

    /// Drop the active profile. Equivalent to `stop` plus forgetting the
    /// phase list.
    pub fn clear_profile(&mut self, heater: &mut impl HeaterPort, sink: &mut impl EventSink) {
        self.stop(heater, sink);
        self.active = None;
        self.active_index = None;
        sink.emit(&OvenEvent::ProfileActivated { index: -1 });
    }

    /// Record the catalog index a just-saved draft landed on. Called by
    /// the console after a successful append; the phase list itself is
    /// unchanged.
    pub fn assign_catalog_index(&mut self, index: usize) {
        if self.active.is_some() {
            self.active_index = Some(index);
        }
    }

    /// Overwrite a phase of the active (draft) profile. Returns `false`
    /// when there is no such phase. Rejected while running: the run state
    /// owns the phase list for the duration of the process.
    pub fn edit_phase(&mut self, index: usize, phase: Phase) -> bool {
        if self.running() {
            return false;
        }
        match self.active.as_mut().and_then(|p| p.phases.get_mut(index)) {
            Some(slot) => {
                *slot = phase;
                true
            }
            None => false,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Start executing the active profile from its first phase.
    ///
    /// Returns `true` if the controller is running on return. A start with
    /// no active profile, or with one that fails validation, returns
    /// `false` and changes nothing; a start while already running is a
    /// successful no-op.
    pub fn start(
        &mut self,
        clock: &impl ClockPort,
        hw: &mut (impl SensorPort + HeaterPort),
        sink: &mut impl EventSink,
    ) -> bool {
        if self.running() {
            return true;
        }
        let valid = match &self.active {
            Some(profile) => profile.validate(),
            None => {
                warn!("start refused: no active profile");
                return false;
            }
        };
        if let Err(e) = valid {
            warn!("start refused: {}", e);
            return false;
        }

        // Tunings are applied here, never mid-run.
        self.pid
            .set_tunings(self.config.pid_kp, self.config.pid_ki, self.config.pid_kd);

        let now = clock.now_ms();
        self.process_start_ms = now;
        self.last_pid_ms = now;
        self.start_phase(0, clock, hw, sink);

        if self.running() {
            sink.emit(&OvenEvent::OvenState { on: true });
            info!("process started");
        }
        self.running()
    }

    /// Stop the current process. Synchronous: by the time this returns the
    /// heater duty is zero and the PID is in manual.
    pub fn stop(&mut self, heater: &mut impl HeaterPort, sink: &mut impl EventSink) {
        self.pid.set_mode(PidMode::Manual);
        self.pid.force_output(0.0);
        heater.set_duty(0.0);
        self.pid_output = 0.0;
        self.state = RunState::Idle;
        self.envelope = None;
        sink.emit(&OvenEvent::OvenState { on: false });
    }

    /// Update the PID tunings used by the next `start`.
    pub fn set_tunings(&mut self, kp: f64, ki: f64, kd: f64) {
        self.config.pid_kp = kp;
        self.config.pid_ki = ki;
        self.config.pid_kd = kd;
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one cooperative cycle: sensor → envelope → PID → heater.
    pub fn tick(
        &mut self,
        clock: &impl ClockPort,
        hw: &mut (impl SensorPort + HeaterPort),
        sink: &mut impl EventSink,
    ) {
        let now = clock.now_ms();

        let RunState::Running { phase: index } = self.state else {
            // Idle temperature reporting.
            if now.wrapping_sub(self.last_idle_log_ms) >= self.config.idle_log_ms {
                self.last_idle_log_ms = now;
                sink.emit(&OvenEvent::TempSnapshot {
                    now_ms: now,
                    process_start_ms: self.process_start_ms,
                    temp: f64::from(hw.read()),
                });
            }
            return;
        };

        let input = f64::from(hw.read());
        self.pid_input = input;

        // Envelope sampling gate.
        if now.wrapping_sub(self.last_envelope_ms) >= self.config.profile_sampling_ms {
            self.last_envelope_ms = now;
            let elapsed_secs = now.saturating_sub(self.phase_start_ms) as f64 / 1000.0;
            if let Some(env) = self.envelope.as_mut() {
                let setpoint = env.advance(elapsed_secs);
                self.pid.set_setpoint(setpoint);
            }

            // Terminators are only evaluated in hold mode, after the
            // envelope has reached the phase endpoint.
            let holding = self.envelope.is_some_and(|e| e.holding());
            if holding && self.phase_terminated(index, now, input) {
                self.start_phase(index + 1, clock, hw, sink);
            }
        }

        // PID sampling gate. The phase advance above may have completed
        // the process, in which case the loop is already shut down.
        if self.running() && now.wrapping_sub(self.last_pid_ms) >= self.config.pid_sample_ms {
            self.last_pid_ms = now;
            let dt = self.config.pid_sample_ms as f64 / 1000.0;
            let output = self.pid.compute(input, dt);
            self.pid_output = output;
            hw.set_duty(output as f32);
            sink.emit(&OvenEvent::PidSample {
                process_ms: now.saturating_sub(self.process_start_ms),
                temp: input,
                slope: self.envelope.map_or(0.0, |e| e.effective_slope()),
                setpoint: self.pid.setpoint(),
                output,
            });
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn running(&self) -> bool {
        matches!(self.state, RunState::Running { .. })
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Index of the executing phase, while running.
    pub fn current_phase_index(&self) -> Option<usize> {
        match self.state {
            RunState::Running { phase } => Some(phase),
            _ => None,
        }
    }

    /// Parameters of the executing phase, while running.
    pub fn current_phase(&self) -> Option<&Phase> {
        let index = self.current_phase_index()?;
        self.active.as_ref()?.phases.get(index)
    }

    pub fn active_profile(&self) -> Option<&Profile> {
        self.active.as_ref()
    }

    /// Catalog index of the active profile; -1 for a draft or none.
    pub fn active_index_i32(&self) -> i32 {
        match (&self.active, self.active_index) {
            (Some(_), Some(i)) => i as i32,
            _ => -1,
        }
    }

    /// Current envelope setpoint the PID regulates toward.
    pub fn setpoint(&self) -> f64 {
        self.pid.setpoint()
    }

    pub fn pid_input(&self) -> f64 {
        self.pid_input
    }

    pub fn pid_output(&self) -> f64 {
        self.pid_output
    }

    /// Elapsed ms since process start; 0 while not running.
    pub fn process_duration_ms(&self, clock: &impl ClockPort) -> u64 {
        if self.running() {
            clock.now_ms().saturating_sub(self.process_start_ms)
        } else {
            0
        }
    }

    /// Elapsed ms since the current phase started; 0 while not running.
    pub fn phase_duration_ms(&self, clock: &impl ClockPort) -> u64 {
        if self.running() {
            clock.now_ms().saturating_sub(self.phase_start_ms)
        } else {
            0
        }
    }

    // ── Internal ──────────────────────────────────────────────

    /// Enter phase `index`, or complete the process when the list is
    /// exhausted.
    fn start_phase(
        &mut self,
        index: usize,
        clock: &impl ClockPort,
        hw: &mut (impl SensorPort + HeaterPort),
        sink: &mut impl EventSink,
    ) {
        let phase = match &self.active {
            Some(profile) => match profile.phases.get(index) {
                Some(phase) => phase.clone(),
                None => {
                    // End of process.
                    self.state = RunState::Completed;
                    self.envelope = None;
                    self.pid.set_mode(PidMode::Manual);
                    self.pid.force_output(0.0);
                    self.pid_output = 0.0;
                    hw.set_duty(0.0);
                    sink.emit(&OvenEvent::OvenState { on: false });
                    info!("process complete after {} phases", index);
                    return;
                }
            },
            None => {
                self.state = RunState::Idle;
                return;
            }
        };

        let start_temp = f64::from(hw.read());
        let envelope = Envelope::begin(&phase, start_temp);
        self.pid.set_setpoint(start_temp);
        self.pid.set_mode(PidMode::Automatic);

        let now = clock.now_ms();
        self.phase_start_ms = now;
        self.last_envelope_ms = now;
        self.envelope = Some(envelope);
        self.state = RunState::Running { phase: index };

        info!(
            "phase {} \"{}\": start {:.2} degC, end {:.2} degC, slope {:.3} degC/s",
            index,
            phase.name,
            start_temp,
            phase.end_temp,
            envelope.effective_slope()
        );
        sink.emit(&OvenEvent::PhaseStarted {
            name: phase.name.clone(),
            end_temp: phase.end_temp,
            slope: phase.slope,
            duration: phase.duration,
        });
    }

    /// Hold-mode phase terminator (see the state machine table).
    fn phase_terminated(&self, index: usize, now: u64, input: f64) -> bool {
        let Some(phase) = self.active.as_ref().and_then(|p| p.phases.get(index)) else {
            return false;
        };
        let Some(env) = &self.envelope else {
            return false;
        };

        if phase.duration > 0 {
            now.saturating_sub(self.phase_start_ms) / 1000 >= phase.duration as u64
        } else if phase.duration == 0 {
            if env.ascent() {
                input >= phase.end_temp
            } else {
                input <= phase.end_temp
            }
        } else {
            // Negative duration: hold indefinitely.
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{Phase, PhaseList};

    struct TestClock(u64);
    impl ClockPort for TestClock {
        fn now_ms(&self) -> u64 {
            self.0
        }
    }

    struct TestHw {
        temp: f32,
        duties: Vec<f32>,
    }
    impl TestHw {
        fn new(temp: f32) -> Self {
            Self {
                temp,
                duties: Vec::new(),
            }
        }
    }
    impl SensorPort for TestHw {
        fn read(&mut self) -> f32 {
            self.temp
        }
    }
    impl HeaterPort for TestHw {
        fn set_duty(&mut self, duty: f32) {
            self.duties.push(duty);
        }
    }

    struct TestSink(Vec<OvenEvent>);
    impl EventSink for TestSink {
        fn emit(&mut self, event: &OvenEvent) {
            self.0.push(event.clone());
        }
    }

    fn ramp_profile() -> Profile {
        let mut phases = PhaseList::new();
        let _ = phases.push(Phase::new("R", 100.0, 2.0, 0));
        Profile::new("ramp", phases)
    }

    #[test]
    fn start_without_profile_is_a_nop() {
        let mut ctl = OvenController::new(SystemConfig::default());
        let clock = TestClock(0);
        let mut hw = TestHw::new(25.0);
        let mut sink = TestSink(Vec::new());

        assert!(!ctl.start(&clock, &mut hw, &mut sink));
        assert!(!ctl.running());
        assert!(!sink.0.contains(&OvenEvent::OvenState { on: true }));
    }

    #[test]
    fn start_enters_phase_zero_and_reports() {
        let mut ctl = OvenController::new(SystemConfig::default());
        let clock = TestClock(0);
        let mut hw = TestHw::new(25.0);
        let mut sink = TestSink(Vec::new());

        ctl.activate(ramp_profile(), Some(0), &mut hw, &mut sink);
        assert!(ctl.start(&clock, &mut hw, &mut sink));
        assert!(ctl.running());
        assert_eq!(ctl.current_phase_index(), Some(0));
        assert_eq!(ctl.current_phase().map(|p| p.name.as_str()), Some("R"));
        assert_eq!(ctl.setpoint(), 25.0);
        assert!(sink.0.contains(&OvenEvent::OvenState { on: true }));
    }

    #[test]
    fn clearing_the_phase_list_acts_as_stop() {
        let mut ctl = OvenController::new(SystemConfig::default());
        let clock = TestClock(0);
        let mut hw = TestHw::new(25.0);
        let mut sink = TestSink(Vec::new());

        ctl.activate(ramp_profile(), Some(0), &mut hw, &mut sink);
        ctl.start(&clock, &mut hw, &mut sink);
        hw.duties.clear();
        ctl.clear_profile(&mut hw, &mut sink);

        assert_eq!(ctl.state(), RunState::Idle);
        assert!(ctl.active_profile().is_none());
        assert_eq!(ctl.active_index_i32(), -1);
        assert_eq!(hw.duties.last().copied(), Some(0.0));
        assert!(sink.0.contains(&OvenEvent::ProfileActivated { index: -1 }));
    }

    #[test]
    fn start_refuses_invalid_draft() {
        let mut ctl = OvenController::new(SystemConfig::default());
        let clock = TestClock(0);
        let mut hw = TestHw::new(25.0);
        let mut sink = TestSink(Vec::new());

        let draft = Profile::draft("d", 2).unwrap();
        ctl.activate(draft, None, &mut hw, &mut sink);
        assert!(!ctl.start(&clock, &mut hw, &mut sink));
    }

    #[test]
    fn stop_zeroes_duty_and_state() {
        let mut ctl = OvenController::new(SystemConfig::default());
        let clock = TestClock(0);
        let mut hw = TestHw::new(25.0);
        let mut sink = TestSink(Vec::new());

        ctl.activate(ramp_profile(), Some(0), &mut hw, &mut sink);
        ctl.start(&clock, &mut hw, &mut sink);
        hw.duties.clear();
        ctl.stop(&mut hw, &mut sink);

        assert_eq!(ctl.state(), RunState::Idle);
        assert_eq!(hw.duties.last().copied(), Some(0.0));
        assert_eq!(ctl.pid_output(), 0.0);
    }

    #[test]
    fn activate_stops_a_running_process() {
        let mut ctl = OvenController::new(SystemConfig::default());
        let clock = TestClock(0);
        let mut hw = TestHw::new(25.0);
        let mut sink = TestSink(Vec::new());

        ctl.activate(ramp_profile(), Some(0), &mut hw, &mut sink);
        ctl.start(&clock, &mut hw, &mut sink);
        ctl.activate(ramp_profile(), Some(1), &mut hw, &mut sink);

        assert!(!ctl.running());
        assert_eq!(ctl.active_index_i32(), 1);
        assert!(sink.0.contains(&OvenEvent::ProfileActivated { index: 1 }));
    }

    #[test]
    fn edit_phase_rejected_while_running() {
        let mut ctl = OvenController::new(SystemConfig::default());
        let clock = TestClock(0);
        let mut hw = TestHw::new(25.0);
        let mut sink = TestSink(Vec::new());

        ctl.activate(ramp_profile(), None, &mut hw, &mut sink);
        assert!(ctl.edit_phase(0, Phase::new("X", 60.0, 1.0, 0)));
        ctl.start(&clock, &mut hw, &mut sink);
        assert!(!ctl.edit_phase(0, Phase::new("Y", 70.0, 1.0, 0)));
    }

    #[test]
    fn durations_report_zero_when_idle() {
        let ctl = OvenController::new(SystemConfig::default());
        let clock = TestClock(5000);
        assert_eq!(ctl.process_duration_ms(&clock), 0);
        assert_eq!(ctl.phase_duration_ms(&clock), 0);
    }
}
