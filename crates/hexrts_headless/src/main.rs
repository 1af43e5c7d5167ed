//! Headless hex RTS runner.
//!
//! # Usage
//!
//! ```bash
//! # Run a scenario and stream JSON reports
//! cargo run -p hexrts_headless -- run --scenario scenarios/duel.ron --ticks 600
//!
//! # Record the command log while running, then replay it
//! cargo run -p hexrts_headless -- run --scenario scenarios/duel.ron --record duel.log
//! cargo run -p hexrts_headless -- replay --scenario scenarios/duel.ron --log duel.log
//!
//! # Check determinism
//! cargo run -p hexrts_headless -- verify --scenario scenarios/economy.ron --runs 8
//!
//! # Check a data file
//! cargo run -p hexrts_headless -- validate scenarios/data.ron
//! ```
//!
//! Reports go to stdout as JSON lines; logs go to stderr. Set `RUST_LOG`
//! to override the log filter.

use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hexrts_headless::{
    load_log, replay_log, run_scenario, save_log, validate_data_file, validate_scenario, verify_scenario,
    RunOptions, Scenario,
};

#[derive(Parser)]
#[command(name = "hexrts_headless")]
#[command(about = "Headless hex RTS runner for determinism checks and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and print JSON tick reports
    Run {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: PathBuf,

        /// Number of ticks to simulate
        #[arg(short, long, default_value = "600")]
        ticks: u64,

        /// Report every K ticks (0 = final tick only)
        #[arg(short, long, default_value = "60")]
        every: u64,

        /// Save the command log to this file
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Run a scenario several times in parallel and compare snapshots
    Verify {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: PathBuf,

        /// Number of ticks per run
        #[arg(short, long, default_value = "600")]
        ticks: u64,

        /// Number of parallel runs
        #[arg(short, long, default_value = "4")]
        runs: usize,
    },

    /// Parse and cross-check a data file
    Validate {
        /// GameData RON file
        path: PathBuf,
    },

    /// Replay a recorded command log and compare the final hash
    Replay {
        /// Scenario the log was recorded on
        #[arg(short, long)]
        scenario: PathBuf,

        /// Command log written by `run --record`
        #[arg(short, long)]
        log: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries reports
    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            ticks,
            every,
            record,
        } => cmd_run(&scenario, ticks, every, record),
        Commands::Verify {
            scenario,
            ticks,
            runs,
        } => cmd_verify(&scenario, ticks, runs),
        Commands::Validate { path } => cmd_validate(&path),
        Commands::Replay { scenario, log } => cmd_replay(&scenario, &log),
    }
}

fn load_scenario(path: &Path) -> Scenario {
    match Scenario::load(path) {
        Ok(scenario) => scenario,
        Err(e) => {
            tracing::error!(error = %e, path = %path.display(), "Failed to load scenario");
            eprintln!("FATAL: Cannot load scenario '{}': {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

/// Run a scenario and stream reports to stdout
fn cmd_run(path: &Path, ticks: u64, every: u64, record: Option<PathBuf>) {
    let scenario = load_scenario(path);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let options = RunOptions {
        ticks,
        report_every: every,
    };

    let outcome = match run_scenario(&scenario, options, &mut out) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("FATAL: Run failed: {e}");
            std::process::exit(1);
        }
    };

    if let Some(record_path) = record {
        if let Err(e) = save_log(&outcome.log, &record_path) {
            eprintln!("FATAL: Failed to save command log: {e}");
            std::process::exit(1);
        }
        tracing::info!(path = %record_path.display(), commands = outcome.log.command_count(), "Command log saved");
    }

    eprintln!(
        "Ran '{}' for {} ticks, final hash {}",
        scenario.name, outcome.final_tick, outcome.final_hash
    );
}

/// Check determinism across parallel runs
fn cmd_verify(path: &Path, ticks: u64, runs: usize) {
    let scenario = load_scenario(path);

    eprintln!("Verifying '{}': {} runs of {} ticks", scenario.name, runs, ticks);
    match verify_scenario(&scenario, ticks, runs) {
        Ok(report) => {
            eprintln!("PASS: all {} runs ended with hash {}", report.runs, report.hash);
        }
        Err(e) => {
            eprintln!("FAIL: {e}");
            std::process::exit(1);
        }
    }
}

/// Check a data file, or a scenario's placements
fn cmd_validate(path: &Path) {
    let is_scenario = std::fs::read_to_string(path)
        .map(|text| {
            text.lines()
                .map(str::trim)
                .find(|line| !line.is_empty() && !line.starts_with("//"))
                .is_some_and(|line| line.starts_with("Scenario"))
        })
        .unwrap_or(false);

    let report = if is_scenario {
        Ok(validate_scenario(&load_scenario(path)))
    } else {
        validate_data_file(path)
    };

    match report {
        Ok(report) if report.is_valid() => {
            eprintln!(
                "OK: {} units, {} buildings",
                report.units, report.buildings
            );
        }
        Ok(report) => {
            for problem in &report.problems {
                eprintln!("  - {problem}");
            }
            eprintln!("FAIL: {} problem(s) in '{}'", report.problems.len(), path.display());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    }
}

/// Replay a command log and compare hashes
fn cmd_replay(scenario_path: &Path, log_path: &Path) {
    let scenario = load_scenario(scenario_path);
    let log = match load_log(log_path) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("FATAL: Cannot load command log '{}': {}", log_path.display(), e);
            std::process::exit(1);
        }
    };

    match replay_log(&scenario, &log) {
        Ok(hash) => {
            eprintln!(
                "PASS: replayed {} commands to tick {}, hash {}",
                log.command_count(),
                log.final_tick,
                hash
            );
        }
        Err(e) => {
            eprintln!("FAIL: {e}");
            std::process::exit(1);
        }
    }
}
