//! Command logs for replaying and verifying games.
//!
//! A log holds every command a game scheduled plus the tick and state hash
//! it ended on. Replaying the log against an identically set-up
//! [`Simulation`] must land on the same hash; anything else is a desync.

use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::error::{GameError, Result};
use crate::simulation::Simulation;

/// Log format version for compatibility.
pub const COMMAND_LOG_VERSION: u32 = 1;

/// Ordered command stream with the expected outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLog {
    /// Format version.
    pub version: u32,
    /// Scenario the log was recorded on.
    pub scenario_id: String,
    /// Commands in scheduling order.
    pub commands: Vec<Command>,
    /// Tick count when recording stopped.
    pub final_tick: u64,
    /// [`Simulation::state_hash`] when recording stopped.
    pub final_hash: u64,
}

impl CommandLog {
    /// Empty log for a scenario.
    #[must_use]
    pub fn new(scenario_id: impl Into<String>) -> Self {
        Self {
            version: COMMAND_LOG_VERSION,
            scenario_id: scenario_id.into(),
            commands: Vec::new(),
            final_tick: 0,
            final_hash: 0,
        }
    }

    /// Append a command.
    pub fn record(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Store the end state.
    pub fn finalize(&mut self, sim: &Simulation) {
        self.final_tick = sim.tick_count();
        self.final_hash = sim.state_hash();
    }

    /// Commands scheduled for `tick`.
    pub fn commands_at_tick(&self, tick: u64) -> impl Iterator<Item = &Command> {
        self.commands
            .iter()
            .filter(move |c| c.execution_tick == tick)
    }

    /// Number of recorded commands.
    #[must_use]
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    /// Encode with bincode.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize command log: {e}")))
    }

    /// Decode bytes written by [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] for undecodable bytes or a
    /// version mismatch.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let log: Self = bincode::deserialize(bytes)
            .map_err(|e| GameError::InvalidState(format!("Failed to deserialize command log: {e}")))?;
        if log.version != COMMAND_LOG_VERSION {
            return Err(GameError::InvalidState(format!(
                "Command log version mismatch: expected {COMMAND_LOG_VERSION}, got {}",
                log.version
            )));
        }
        Ok(log)
    }

    /// Schedule every command on `sim`, run it to the final tick and
    /// compare hashes. `sim` must be freshly set up the same way as the
    /// recorded game.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidState`] if a command cannot be scheduled,
    /// [`GameError::DesyncDetected`] if the final hash differs.
    pub fn replay(&self, sim: &mut Simulation) -> Result<u64> {
        for command in &self.commands {
            if !sim.schedule(command.clone()) {
                return Err(GameError::InvalidState(format!(
                    "Command for tick {} cannot be scheduled at tick {}",
                    command.execution_tick,
                    sim.tick_count()
                )));
            }
        }
        while sim.tick_count() < self.final_tick {
            sim.tick();
        }
        let hash = sim.state_hash();
        if hash != self.final_hash {
            return Err(GameError::DesyncDetected {
                tick: self.final_tick,
                local_hash: hash,
                remote_hash: self.final_hash,
            });
        }
        tracing::debug!(scenario = %self.scenario_id, hash, "Replay verified");
        Ok(hash)
    }
}
