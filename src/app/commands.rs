//! Inbound commands to the controller core.
//!
//! These represent actions requested by the outside world (serial console,
//! local keypad, host tool). The [`Console`](crate::console::Console)
//! parses wire lines into this enum and dispatches them against the
//! controller and the profile store.

use crate::profile::Phase;

/// Commands that external adapters can send into the controller core.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `?` — print the command summary.
    Help,

    /// `i <pin>` — stream digital-input transitions until the next input.
    MonitorInput { pin: u8 },

    /// `p cur` — report the active profile's catalog index.
    ProfileCurrent,

    /// `p ls` — list catalog profile names.
    ProfileList,

    /// `p sel <idx>` — activate a catalog profile (stops the controller).
    ProfileSelect { index: usize },

    /// `p get <idx>` — dump a catalog profile with its phases.
    ProfileGet { index: usize },

    /// `p nw <name> <n>` — create a zero-initialised draft and activate it.
    ProfileNew { name: heapless::String<32>, count: usize },

    /// `p ph <i> <name> <end> <slope> <dur>` — overwrite draft phase `i`.
    ProfileSetPhase { index: usize, phase: Phase },

    /// `p sav` — append the active profile to the catalog.
    ProfileSave,

    /// `p on` — start the controller on the active profile.
    Start,

    /// `p off` — stop the controller.
    Stop,

    /// `e inf` — report store signature, length and free offset.
    StoreInfo,

    /// `e fmt` — reformat the store and register the default catalog.
    StoreFormat,

    /// `e d <off>` — hex dump of 64 bytes starting at `off`.
    StoreDump { offset: usize },

    /// `rst` — soft reset (handled by the host loop, no response).
    Reset,
}
