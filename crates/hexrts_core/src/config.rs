//! Simulation configuration.

use serde::{Deserialize, Serialize};

use crate::components::PlayerId;
use crate::error::{GameError, Result};

/// Default simulation rate.
pub const DEFAULT_TICKS_PER_SECOND: u32 = 20;

/// Highest rate whose tick interval is still at least one nanosecond.
pub const MAX_TICKS_PER_SECOND: u32 = 1_000_000_000;

/// Movement points needed to cross one tile.
pub const DEFAULT_MOVE_POINTS_PER_TILE: i32 = 1000;

/// How commands scheduled for the same tick are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CommandOrdering {
    /// Enqueue order.
    #[default]
    Receipt,
    /// Stable sort by issuing player, then enqueue order.
    PlayerThenReceipt,
}

/// Tunables for one simulation.
///
/// # Example RON
///
/// ```ron
/// SimConfig(
///     ticks_per_second: 20,
///     input_delay_ticks: 2,
///     command_ordering: PlayerThenReceipt,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Fixed tick rate.
    pub ticks_per_second: u32,
    /// Ticks between issuing and executing a command.
    pub input_delay_ticks: u64,
    /// Ticks between AI controller updates.
    pub ai_update_interval_ticks: u64,
    /// Movement points needed to enter a tile.
    pub move_points_per_tile: i32,
    /// Path request queue budget per frame (0 = unlimited).
    pub max_path_requests_per_frame: usize,
    /// Tie-break for commands sharing a tick.
    pub command_ordering: CommandOrdering,
    /// Ledger resource used for supply.
    pub supply_resource: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: DEFAULT_TICKS_PER_SECOND,
            input_delay_ticks: 0,
            ai_update_interval_ticks: 10,
            move_points_per_tile: DEFAULT_MOVE_POINTS_PER_TILE,
            max_path_requests_per_frame: 1,
            command_ordering: CommandOrdering::Receipt,
            supply_resource: "Supply".to_string(),
        }
    }
}

impl SimConfig {
    /// Reject values the simulation cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        check_tick_rate(self.ticks_per_second)?;
        if self.move_points_per_tile <= 0 {
            return Err(GameError::InvalidConfig("move_points_per_tile must be positive".into()));
        }
        if self.ai_update_interval_ticks == 0 {
            return Err(GameError::InvalidConfig(
                "ai_update_interval_ticks must be positive".into(),
            ));
        }
        if self.supply_resource.is_empty() {
            return Err(GameError::InvalidConfig("supply_resource must not be empty".into()));
        }
        Ok(())
    }

    /// Copy with every invalid field replaced by its default, logging each fix.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if let Err(err) = check_tick_rate(self.ticks_per_second) {
            tracing::error!(%err, default = defaults.ticks_per_second, "Invalid tick rate, using default");
            self.ticks_per_second = defaults.ticks_per_second;
        }
        if self.move_points_per_tile <= 0 {
            tracing::error!(
                value = self.move_points_per_tile,
                "move_points_per_tile must be positive, using default"
            );
            self.move_points_per_tile = defaults.move_points_per_tile;
        }
        if self.ai_update_interval_ticks == 0 {
            tracing::error!("ai_update_interval_ticks is 0, using default");
            self.ai_update_interval_ticks = defaults.ai_update_interval_ticks;
        }
        if self.supply_resource.is_empty() {
            tracing::error!("supply_resource is empty, using default");
            self.supply_resource = defaults.supply_resource;
        }
        self
    }
}

/// Tick rate must give a non-zero interval: `1..=MAX_TICKS_PER_SECOND`.
///
/// # Errors
///
/// Returns [`GameError::InvalidConfig`] for a zero or too-high rate.
pub fn check_tick_rate(ticks_per_second: u32) -> Result<()> {
    if ticks_per_second == 0 {
        return Err(GameError::InvalidConfig("ticks_per_second must be positive".into()));
    }
    if ticks_per_second > MAX_TICKS_PER_SECOND {
        return Err(GameError::InvalidConfig(format!(
            "ticks_per_second {ticks_per_second} exceeds {MAX_TICKS_PER_SECOND}"
        )));
    }
    Ok(())
}

/// Starting balance for one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartingResource {
    /// Resource name.
    pub resource: String,
    /// Starting amount.
    pub amount: i32,
    /// Cap; 0 or less means unbounded.
    #[serde(default)]
    pub cap: i32,
}

/// Starting state for one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSetup {
    /// Player id.
    pub id: PlayerId,
    /// Starting balances.
    #[serde(default)]
    pub resources: Vec<StartingResource>,
}
