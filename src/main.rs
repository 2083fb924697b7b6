//! Host simulator — runs the controller core against a simulated oven.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  Adapters (outer ring)                   │
//! │   SimClock   SimOven (Sensor+Heater)   MemStore          │
//! │   SimInputs  StdoutSink (wire events)                    │
//! │  ─────────────── Port Trait Boundary ────────────────    │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │   OvenController · ProfileStore · Console          │  │
//! │  └────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Boots a blank store (consenting to the reformat), activates a catalog
//! profile and runs the process to completion in simulated time, printing
//! every wire event. Usage: `reflowctl [profile-index] [max-sim-seconds]`.

use anyhow::{anyhow, Result};
use log::info;

use reflowctl::adapters::sim::{MemStore, SimClock, SimInputs, SimOven, StdoutSink};
use reflowctl::app::ports::ClockPort;
use reflowctl::app::service::{OvenController, RunState};
use reflowctl::config::SystemConfig;
use reflowctl::console::{Console, Outcome};
use reflowctl::store::{BootStatus, ProfileStore};

/// Simulated EEPROM capacity, matching the original part.
const STORE_LEN: usize = 1024;

/// Simulation step, well under every controller gate.
const STEP_MS: u64 = 10;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let profile_index: usize = match args.next() {
        Some(arg) => arg.parse().map_err(|_| anyhow!("bad profile index: {arg}"))?,
        None => 1,
    };
    let max_sim_secs: u64 = match args.next() {
        Some(arg) => arg.parse().map_err(|_| anyhow!("bad duration: {arg}"))?,
        None => 900,
    };

    // ── 1. Boot the profile store ─────────────────────────────
    let mut store = ProfileStore::new(MemStore::new(STORE_LEN));
    let status = store
        .initialize(true)
        .map_err(|e| anyhow!("store init failed: {e}"))?;
    match status {
        BootStatus::Ready => info!("store signature valid, {} profiles", store.count()),
        BootStatus::Formatted => info!("store formatted, defaults installed"),
        BootStatus::Unformatted => info!("store left unformatted, no profiles"),
    }

    // ── 2. Wire the controller to the simulated oven ──────────
    let config = SystemConfig::default();
    let mut ctl = OvenController::new(config.clone());
    let mut oven = SimOven::new(&config, 25.0);
    let mut clock = SimClock::new();
    let mut inputs = SimInputs::new();
    let mut console = Console::new();
    let mut sink = StdoutSink;

    // ── 3. Host session: select a profile and start ───────────
    for line in [
        "e inf".to_string(),
        "p ls".to_string(),
        format!("p sel {profile_index}"),
        "p on".to_string(),
    ] {
        println!("> {line}");
        match console.handle_line(
            &line, &mut ctl, &mut store, &clock, &mut oven, &mut inputs, &mut sink,
        ) {
            Outcome::Reply(reply) => {
                if !reply.is_empty() {
                    println!("{reply}");
                }
            }
            Outcome::Reset => return Ok(()),
        }
    }
    if !ctl.running() {
        return Err(anyhow!("controller did not start"));
    }

    // ── 4. Cooperative loop in simulated time ─────────────────
    let deadline_ms = max_sim_secs * 1000;
    loop {
        clock.advance(STEP_MS);
        let now = clock.now_ms();
        oven.step_to(now);
        ctl.tick(&clock, &mut oven, &mut sink);
        console.poll(&mut inputs, &mut sink);

        if ctl.state() == RunState::Completed {
            info!(
                "process complete after {:.1} s, oven at {:.1} degC",
                now as f64 / 1000.0,
                oven.plant_temp()
            );
            break;
        }
        if now >= deadline_ms {
            info!("simulation cap reached, stopping");
            println!("> p off");
            let _ = console.handle_line(
                "p off", &mut ctl, &mut store, &clock, &mut oven, &mut inputs, &mut sink,
            );
            break;
        }
    }

    Ok(())
}
