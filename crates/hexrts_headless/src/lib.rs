//! Headless scenario runner for determinism checks and CI.
//!
//! Runs the hex RTS simulation without any presentation layer:
//!
//! - **Runs**: load a RON scenario, simulate N ticks, stream JSON lines
//!   with tick, hash and balances to stdout
//! - **Verification**: run the same scenario on several threads and
//!   require identical snapshots
//! - **Replays**: record the command stream and check that a replay lands
//!   on the recorded hash
//! - **Validation**: cross-check data files before a run
//!
//! # Example
//!
//! ```bash
//! # Run a scenario, reporting every 60 ticks
//! cargo run -p hexrts_headless -- run --scenario scenarios/duel.ron --ticks 600 --every 60
//!
//! # Verify determinism across 8 parallel runs
//! cargo run -p hexrts_headless -- verify --scenario scenarios/economy.ron --ticks 2000 --runs 8
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod runner;
pub mod scenario;
pub mod validate;

pub use runner::{
    load_log, replay_log, run_scenario, save_log, verify_scenario, RunOptions, RunOutcome, TickReport,
    VerifyReport,
};
pub use scenario::{Scenario, ScenarioError};
pub use validate::{validate_data, validate_data_file, validate_scenario, ValidationReport};
