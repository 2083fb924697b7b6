//! Profile and phase value types.
//!
//! A profile is an ordered list of phases plus a display name. Phase lists
//! live in a fixed-capacity inline buffer owned by whoever holds the
//! profile; catalog entries in the store are immutable once written and
//! never alias this memory.

use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

use crate::config::{MAX_PHASES, MAX_SLOPE, PHASE_NAME_LEN, PROFILE_NAME_LEN};
use crate::error::ProfileError;

/// Short phase label, at most [`PHASE_NAME_LEN`] chars.
pub type PhaseName = String<PHASE_NAME_LEN>;

/// Profile display name, at most [`PROFILE_NAME_LEN`] chars.
pub type ProfileName = String<PROFILE_NAME_LEN>;

/// Inline phase buffer.
pub type PhaseList = Vec<Phase, MAX_PHASES>;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// A single segment of a thermal profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    /// User readable label shown in status output.
    pub name: PhaseName,
    /// Final phase temperature in degC.
    pub end_temp: f64,
    /// Requested setpoint slope in degC/s. Zero requests a hold; the
    /// envelope generator derives the effective slope at phase start.
    pub slope: f64,
    /// Phase duration in seconds: `> 0` fixed length, `0` ends when
    /// `end_temp` is reached, `< 0` holds indefinitely.
    pub duration: i32,
}

impl Phase {
    pub fn new(name: &str, end_temp: f64, slope: f64, duration: i32) -> Self {
        Self {
            name: ascii_name(name),
            end_temp,
            slope,
            duration,
        }
    }

    /// Zero-initialised phase used when creating a draft profile.
    /// Invalid until the host assigns it a name.
    pub fn blank() -> Self {
        Self {
            name: PhaseName::new(),
            end_temp: 0.0,
            slope: 0.0,
            duration: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.name.is_empty() || !self.name.is_ascii() {
            return Err(ProfileError::BadPhaseName);
        }
        if !(self.slope.abs() <= MAX_SLOPE) {
            return Err(ProfileError::SlopeOutOfRange);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// Ordered sequence of phases with a display name.
///
/// Profiles are value types; an entry in the catalog is identified by its
/// zero-based index, not by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: ProfileName,
    pub phases: PhaseList,
}

impl Profile {
    pub fn new(name: &str, phases: PhaseList) -> Self {
        Self {
            name: ascii_name(name),
            phases,
        }
    }

    /// Draft profile with `count` blank phases, to be filled in by the host.
    pub fn draft(name: &str, count: usize) -> Result<Self, ProfileError> {
        if count < 1 {
            return Err(ProfileError::NoPhases);
        }
        if count > MAX_PHASES {
            return Err(ProfileError::TooManyPhases);
        }
        let mut phases = PhaseList::new();
        for _ in 0..count {
            // Cannot fail: count was bounds-checked above.
            let _ = phases.push(Phase::blank());
        }
        Ok(Self {
            name: ascii_name(name),
            phases,
        })
    }

    /// Validate the whole profile: non-empty name, at least one phase,
    /// every phase individually valid.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.name.is_empty() || !self.name.is_ascii() {
            return Err(ProfileError::EmptyName);
        }
        if self.phases.is_empty() {
            return Err(ProfileError::NoPhases);
        }
        for phase in &self.phases {
            phase.validate()?;
        }
        Ok(())
    }

    pub fn first_phase(&self) -> Option<&Phase> {
        self.phases.first()
    }
}

// ---------------------------------------------------------------------------
// Default catalog
// ---------------------------------------------------------------------------

/// The two profiles installed on a freshly formatted store.
pub fn default_profiles() -> [Profile; 2] {
    let mut oven = PhaseList::new();
    let _ = oven.push(Phase::new("Heating", 50.0, 2.0, 0));
    let _ = oven.push(Phase::new("Hot", 50.0, 0.0, -1));

    let mut reflow = PhaseList::new();
    let _ = reflow.push(Phase::new("Preheat-1", 50.0, 0.0, 0));
    let _ = reflow.push(Phase::new("Preheat-2", 150.0, 0.0, 0));
    let _ = reflow.push(Phase::new("Soak-1", 200.0, 0.0, 100));
    let _ = reflow.push(Phase::new("Soak-2", 217.0, 0.0, 0));
    let _ = reflow.push(Phase::new("Reflow-1", 245.0, 0.0, 20));
    let _ = reflow.push(Phase::new("Reflow-2", 217.0, 0.0, 20));
    let _ = reflow.push(Phase::new("Cooling", 100.0, -3.0, 0));
    let _ = reflow.push(Phase::new("Done(HOT)", 50.0, -10.0, 0));

    [
        Profile::new("Oven Controller", oven),
        Profile::new("PbFree - Reflow", reflow),
    ]
}

/// Build a bounded ASCII name from arbitrary input: non-ASCII code points
/// and anything past the capacity are dropped.
pub fn ascii_name<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for c in s.chars() {
        if !c.is_ascii() || c.is_ascii_control() {
            continue;
        }
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        for profile in default_profiles() {
            profile.validate().unwrap();
        }
    }

    #[test]
    fn default_catalog_shape() {
        let [oven, reflow] = default_profiles();
        assert_eq!(oven.name.as_str(), "Oven Controller");
        assert_eq!(oven.phases.len(), 2);
        assert_eq!(oven.phases[1].duration, -1);
        assert_eq!(reflow.name.as_str(), "PbFree - Reflow");
        assert_eq!(reflow.phases.len(), 8);
        assert_eq!(reflow.phases[6].slope, -3.0);
    }

    #[test]
    fn empty_name_rejected() {
        let mut phases = PhaseList::new();
        let _ = phases.push(Phase::new("R", 100.0, 2.0, 0));
        let profile = Profile::new("", phases);
        assert_eq!(profile.validate(), Err(ProfileError::EmptyName));
    }

    #[test]
    fn zero_phases_rejected() {
        let profile = Profile::new("empty", PhaseList::new());
        assert_eq!(profile.validate(), Err(ProfileError::NoPhases));
    }

    #[test]
    fn excessive_slope_rejected() {
        let mut phases = PhaseList::new();
        let _ = phases.push(Phase::new("fast", 100.0, MAX_SLOPE + 1.0, 0));
        let profile = Profile::new("p", phases);
        assert_eq!(profile.validate(), Err(ProfileError::SlopeOutOfRange));
    }

    #[test]
    fn nan_slope_rejected() {
        let phase = Phase::new("x", 100.0, f64::NAN, 0);
        assert_eq!(phase.validate(), Err(ProfileError::SlopeOutOfRange));
    }

    #[test]
    fn blank_phase_invalid_until_named() {
        let mut phase = Phase::blank();
        assert_eq!(phase.validate(), Err(ProfileError::BadPhaseName));
        phase.name = ascii_name("Soak");
        phase.validate().unwrap();
    }

    #[test]
    fn first_phase_is_returned_unchanged() {
        let [oven, _] = default_profiles();
        let first = oven.first_phase().unwrap();
        assert_eq!(first.name.as_str(), "Heating");
        assert_eq!(first.slope, 2.0);
        assert!(Profile::new("empty", PhaseList::new()).first_phase().is_none());
    }

    #[test]
    fn draft_bounds() {
        assert!(Profile::draft("d", 0).is_err());
        assert!(Profile::draft("d", MAX_PHASES + 1).is_err());
        let draft = Profile::draft("d", 3).unwrap();
        assert_eq!(draft.phases.len(), 3);
    }

    #[test]
    fn ascii_name_truncates_and_filters() {
        let name: PhaseName = ascii_name("Preheat-stage-one");
        assert_eq!(name.as_str(), "Preheat-st");
        let name: PhaseName = ascii_name("hot\u{fe0f}!");
        assert_eq!(name.as_str(), "hot!");
    }
}
