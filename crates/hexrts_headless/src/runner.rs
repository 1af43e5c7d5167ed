//! Scenario execution: JSON-lines runs, parallel determinism checks and
//! command log replays.

use std::io::Write;
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use hexrts_core::components::{EntityId, PlayerId};
use hexrts_core::ledger::UNBOUNDED;
use hexrts_core::replay::CommandLog;
use hexrts_core::simulation::{Simulation, TickEvents};

use crate::scenario::{Scenario, ScenarioError};

/// One player's balance of one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Player id.
    pub player: PlayerId,
    /// Resource name.
    pub resource: String,
    /// Current amount.
    pub amount: i32,
    /// Cap, if one is set.
    pub cap: Option<i32>,
}

/// One JSON line of `run` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Number of ticks run so far.
    pub tick: u64,
    /// State hash after that tick.
    pub hash: u64,
    /// Entities in storage, including the not yet reaped dead.
    pub entities: usize,
    /// Every ledger entry.
    pub balances: Vec<Balance>,
    /// Commands executed since the previous report.
    pub commands_executed: usize,
    /// Entities that died since the previous report.
    pub deaths: Vec<EntityId>,
    /// Units produced since the previous report.
    pub spawned: Vec<EntityId>,
}

impl TickReport {
    fn capture(sim: &Simulation, pending: &mut PendingEvents) -> Self {
        let balances = sim
            .ledger()
            .balances()
            .map(|(player, resource, amount, cap)| Balance {
                player,
                resource: resource.to_string(),
                amount,
                cap: (cap != UNBOUNDED).then_some(cap),
            })
            .collect();
        let pending = std::mem::take(pending);
        Self {
            tick: sim.tick_count(),
            hash: sim.state_hash(),
            entities: sim.entities().len(),
            balances,
            commands_executed: pending.commands_executed,
            deaths: pending.deaths,
            spawned: pending.spawned,
        }
    }
}

#[derive(Debug, Default)]
struct PendingEvents {
    commands_executed: usize,
    deaths: Vec<EntityId>,
    spawned: Vec<EntityId>,
}

impl PendingEvents {
    fn absorb(&mut self, events: TickEvents) {
        self.commands_executed += events.commands_executed;
        self.deaths.extend(events.deaths);
        self.spawned.extend(events.spawned);
    }
}

/// How long to run and how often to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Ticks to simulate.
    pub ticks: u64,
    /// Write a report every this many ticks (0 = final tick only).
    pub report_every: u64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            ticks: 600,
            report_every: 60,
        }
    }
}

/// Result of [`run_scenario`].
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Final tick count.
    pub final_tick: u64,
    /// Final state hash.
    pub final_hash: u64,
    /// Lines written.
    pub reports_written: usize,
    /// Every scheduled command plus the end state, ready to save.
    pub log: CommandLog,
}

/// Run a scenario, writing one JSON [`TickReport`] per line to `out`.
///
/// A report is written every `report_every` ticks and always after the
/// last tick.
///
/// # Errors
///
/// Returns an error if the scenario cannot be built or `out` fails.
pub fn run_scenario<W: Write>(
    scenario: &Scenario,
    options: RunOptions,
    out: &mut W,
) -> Result<RunOutcome, ScenarioError> {
    let mut sim = scenario.build_world()?;
    let mut log = CommandLog::new(scenario.name.clone());
    for command in scenario.scheduled_commands() {
        if sim.schedule(command.clone()) {
            log.record(command);
        } else {
            tracing::warn!(scenario = %scenario.name, tick = command.execution_tick, "Scripted command rejected");
        }
    }

    tracing::info!(
        scenario = %scenario.name,
        ticks = options.ticks,
        commands = log.command_count(),
        "Starting run"
    );

    let mut pending = PendingEvents::default();
    let mut reports_written = 0;
    for _ in 0..options.ticks {
        pending.absorb(sim.tick());
        let ran = sim.tick_count();
        let due = options.report_every > 0 && ran % options.report_every == 0;
        if due || ran == options.ticks {
            let report = TickReport::capture(&sim, &mut pending);
            serde_json::to_writer(&mut *out, &report)?;
            writeln!(out)?;
            reports_written += 1;
        }
    }
    out.flush()?;

    log.finalize(&sim);
    tracing::info!(
        final_tick = log.final_tick,
        final_hash = log.final_hash,
        "Run complete"
    );

    Ok(RunOutcome {
        final_tick: log.final_tick,
        final_hash: log.final_hash,
        reports_written,
        log,
    })
}

/// Outcome of a passed [`verify_scenario`] check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Copies run.
    pub runs: usize,
    /// Ticks per copy.
    pub ticks: u64,
    /// Shared final hash.
    pub hash: u64,
}

/// Run `runs` copies of a scenario in parallel and require byte-identical
/// final snapshots.
///
/// # Errors
///
/// [`ScenarioError::Diverged`] if any copy differs from the first, or the
/// build error of the first copy that failed to build.
pub fn verify_scenario(scenario: &Scenario, ticks: u64, runs: usize) -> Result<VerifyReport, ScenarioError> {
    let results: Vec<Result<(u64, Vec<u8>), ScenarioError>> = (0..runs)
        .into_par_iter()
        .map(|_| {
            let mut sim = scenario.build()?;
            for _ in 0..ticks {
                sim.tick();
            }
            Ok((sim.state_hash(), sim.snapshot_bytes()?))
        })
        .collect();

    let mut results = results.into_iter();
    let Some(first) = results.next() else {
        return Err(ScenarioError::Diverged("no runs requested".into()));
    };
    let (hash, snapshot) = first?;
    for (index, result) in results.enumerate() {
        let (other_hash, other_snapshot) = result?;
        if other_hash != hash || other_snapshot != snapshot {
            tracing::error!(run = index + 1, hash, other_hash, "Run diverged");
            return Err(ScenarioError::Diverged(format!(
                "run {} ended with hash {other_hash}, run 0 with {hash}",
                index + 1
            )));
        }
    }

    tracing::info!(runs, ticks, hash, "All runs match");
    Ok(VerifyReport { runs, ticks, hash })
}

/// Replay a recorded log against a fresh build of `scenario`.
///
/// # Errors
///
/// Returns [`ScenarioError::Game`] wrapping a desync, or a build error.
pub fn replay_log(scenario: &Scenario, log: &CommandLog) -> Result<u64, ScenarioError> {
    if log.scenario_id != scenario.name {
        tracing::warn!(
            log = %log.scenario_id,
            scenario = %scenario.name,
            "Command log was recorded on a different scenario"
        );
    }
    let mut sim = scenario.build_world()?;
    Ok(log.replay(&mut sim)?)
}

/// Write a command log to disk.
///
/// # Errors
///
/// Returns an error if encoding or writing fails.
pub fn save_log(log: &CommandLog, path: &Path) -> Result<(), ScenarioError> {
    std::fs::write(path, log.to_bytes()?)?;
    Ok(())
}

/// Read a command log written by [`save_log`].
///
/// # Errors
///
/// Returns an error if the file is missing or not a valid log.
pub fn load_log(path: &Path) -> Result<CommandLog, ScenarioError> {
    if !path.exists() {
        return Err(ScenarioError::FileNotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    Ok(CommandLog::from_bytes(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{DataSource, MapShape, ResourcePlacement, ScriptedCommand, UnitPlacement};
    use hexrts_core::command::CommandKind;
    use hexrts_core::data::GameData;
    use hexrts_core::hex::CubeCoord;
    use hexrts_test_utils::fixtures::{self, TEST_DATA_RON};

    fn duel() -> Scenario {
        let data = GameData::from_ron_str(TEST_DATA_RON, "fixtures").unwrap();
        Scenario {
            name: "duel".into(),
            map: MapShape::Hexagon { radius: 8 },
            data: DataSource::Inline(data),
            players: vec![
                fixtures::player_setup(fixtures::PLAYER_A, 20),
                fixtures::player_setup(fixtures::PLAYER_B, 20),
            ],
            resource_nodes: vec![ResourcePlacement {
                coord: CubeCoord::axial(0, 4),
                resource_type: fixtures::MINERAL.into(),
                amount: 300,
                amount_per_gather_tick: 5,
            }],
            units: vec![
                UnitPlacement {
                    owner: fixtures::PLAYER_A,
                    unit_type: "marine".into(),
                    coord: CubeCoord::axial(-4, 0),
                    count: 3,
                },
                UnitPlacement {
                    owner: fixtures::PLAYER_B,
                    unit_type: "marine".into(),
                    coord: CubeCoord::axial(4, 0),
                    count: 3,
                },
            ],
            commands: vec![
                ScriptedCommand {
                    tick: 0,
                    player: fixtures::PLAYER_A,
                    actors: vec![2, 3, 4],
                    kind: CommandKind::AttackPosition(CubeCoord::axial(4, 0)),
                },
                ScriptedCommand {
                    tick: 0,
                    player: fixtures::PLAYER_B,
                    actors: vec![5, 6, 7],
                    kind: CommandKind::AttackPosition(CubeCoord::axial(-4, 0)),
                },
            ],
            ..Scenario::default()
        }
    }

    fn run_to_lines(scenario: &Scenario, options: RunOptions) -> (RunOutcome, Vec<TickReport>) {
        let mut out = Vec::new();
        let outcome = run_scenario(scenario, options, &mut out).unwrap();
        let reports = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        (outcome, reports)
    }

    #[test]
    fn test_run_writes_report_lines() {
        let (outcome, reports) = run_to_lines(
            &duel(),
            RunOptions {
                ticks: 25,
                report_every: 10,
            },
        );

        assert_eq!(outcome.reports_written, 3);
        let ticks: Vec<u64> = reports.iter().map(|r| r.tick).collect();
        assert_eq!(ticks, vec![10, 20, 25]);
        assert_eq!(reports[0].commands_executed, 2);
        assert_eq!(reports.last().unwrap().hash, outcome.final_hash);

        let minerals = reports[0]
            .balances
            .iter()
            .find(|b| b.player == fixtures::PLAYER_A && b.resource == fixtures::MINERAL)
            .unwrap();
        assert_eq!(minerals.amount, 1000);
        assert_eq!(minerals.cap, None);
    }

    #[test]
    fn test_final_only_report() {
        let (outcome, reports) = run_to_lines(
            &duel(),
            RunOptions {
                ticks: 30,
                report_every: 0,
            },
        );
        assert_eq!(outcome.final_tick, 30);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].tick, 30);
    }

    #[test]
    fn test_deaths_are_reported_once() {
        let (_, reports) = run_to_lines(
            &duel(),
            RunOptions {
                ticks: 400,
                report_every: 50,
            },
        );
        let mut deaths: Vec<EntityId> = reports.iter().flat_map(|r| r.deaths.clone()).collect();
        assert!(!deaths.is_empty());
        let total = deaths.len();
        deaths.sort_unstable();
        deaths.dedup();
        assert_eq!(deaths.len(), total);
    }

    #[test]
    fn test_verify_passes_for_deterministic_scenario() {
        let report = verify_scenario(&duel(), 200, 4).unwrap();
        assert_eq!(report.runs, 4);

        let mut sim = duel().build().unwrap();
        for _ in 0..200 {
            sim.tick();
        }
        assert_eq!(report.hash, sim.state_hash());
    }

    #[test]
    fn test_verify_rejects_zero_runs() {
        assert!(matches!(
            verify_scenario(&duel(), 10, 0),
            Err(ScenarioError::Diverged(_))
        ));
    }

    #[test]
    fn test_recorded_log_replays() {
        let scenario = duel();
        let (outcome, _) = run_to_lines(
            &scenario,
            RunOptions {
                ticks: 120,
                report_every: 0,
            },
        );
        assert_eq!(outcome.log.command_count(), 2);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("duel.log");
        save_log(&outcome.log, &path).unwrap();
        let loaded = load_log(&path).unwrap();
        assert_eq!(loaded, outcome.log);

        assert_eq!(replay_log(&scenario, &loaded).unwrap(), outcome.final_hash);
    }

    #[test]
    fn test_replay_on_changed_scenario_desyncs() {
        let scenario = duel();
        let (outcome, _) = run_to_lines(
            &scenario,
            RunOptions {
                ticks: 120,
                report_every: 0,
            },
        );

        let mut changed = scenario;
        changed.units[1].count = 2;
        let err = replay_log(&changed, &outcome.log).unwrap_err();
        assert!(matches!(
            err,
            ScenarioError::Game(hexrts_core::error::GameError::DesyncDetected { .. })
        ));
    }
}
