//! Player commands and the tick-keyed scheduler.
//!
//! Commands are plain data. They are queued for an execution tick and
//! dispatched by [`Simulation::tick`](crate::simulation::Simulation::tick)
//! before any entity steps, so every entity sees the same tick's orders.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, PlayerId};
use crate::config::CommandOrdering;
use crate::hex::CubeCoord;

/// What a command asks its actors to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandKind {
    /// Move in formation around a tile.
    Move(CubeCoord),
    /// Drop the current order.
    Stop,
    /// Stay put, firing at anything in range.
    HoldPosition,
    /// Walk back and forth between the current tile and a target.
    Patrol(CubeCoord),
    /// Attack one entity.
    AttackUnit(EntityId),
    /// Attack-move to a tile.
    AttackPosition(CubeCoord),
    /// Workers harvest a resource node.
    GatherResource(EntityId),
    /// Workers carry their load to the nearest drop-off, optionally of one
    /// building type.
    ReturnResource(Option<String>),
    /// Place a building and have the workers construct it.
    BuildBuilding {
        /// Building definition id.
        building_type: String,
        /// Centre tile.
        coord: CubeCoord,
    },
    /// Queue units in the acting buildings.
    ProduceUnit {
        /// Unit definition id.
        unit_type: String,
        /// How many to queue per building.
        quantity: u32,
    },
    /// Cancel the newest production item in the acting buildings.
    CancelProduction,
    /// Set where produced units gather.
    SetRallyPoint(CubeCoord),
    /// Special ability. Accepted but not simulated.
    Ability {
        /// Ability id.
        ability_id: String,
        /// Optional unit target.
        target_unit: Option<EntityId>,
        /// Optional tile target.
        target_coord: Option<CubeCoord>,
    },
}

/// A command from one player to a set of their entities.
///
/// # Example RON
///
/// ```ron
/// Command(
///     issuing_player: 1,
///     actors: [3, 4],
///     execution_tick: 10,
///     kind: Move((2, -1, -1)),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Player who issued it.
    pub issuing_player: PlayerId,
    /// Entities that carry it out. Dead or missing ids are skipped.
    pub actors: Vec<EntityId>,
    /// Tick on which it runs.
    pub execution_tick: u64,
    /// What to do.
    pub kind: CommandKind,
}

impl Command {
    /// Build a command.
    #[must_use]
    pub fn new(issuing_player: PlayerId, actors: Vec<EntityId>, execution_tick: u64, kind: CommandKind) -> Self {
        Self {
            issuing_player,
            actors,
            execution_tick,
            kind,
        }
    }
}

/// Commands bucketed by execution tick.
#[derive(Debug, Clone, Default)]
pub struct CommandScheduler {
    buckets: BTreeMap<u64, Vec<(u64, Command)>>,
    next_seq: u64,
    last_executed: Option<u64>,
}

impl CommandScheduler {
    /// Empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a command for its execution tick.
    ///
    /// Returns `false` (and drops the command) if that tick has already run.
    pub fn enqueue(&mut self, command: Command) -> bool {
        if self.last_executed.is_some_and(|last| command.execution_tick <= last) {
            tracing::warn!(
                execution_tick = command.execution_tick,
                last_executed = ?self.last_executed,
                player = command.issuing_player,
                "Rejecting command scheduled in the past"
            );
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.buckets
            .entry(command.execution_tick)
            .or_default()
            .push((seq, command));
        true
    }

    /// Remove and return every command due at `tick`, in dispatch order.
    ///
    /// Buckets for earlier ticks that were never drained are dropped with a
    /// warning.
    pub fn take_due(&mut self, tick: u64, ordering: CommandOrdering) -> Vec<Command> {
        let mut later = self.buckets.split_off(&tick);
        for (stale_tick, stale) in std::mem::take(&mut self.buckets) {
            tracing::warn!(stale_tick, count = stale.len(), "Dropping commands for a skipped tick");
        }
        let mut due = later.remove(&tick).unwrap_or_default();
        self.buckets = later;
        self.last_executed = Some(tick);

        if ordering == CommandOrdering::PlayerThenReceipt {
            due.sort_by_key(|(seq, command)| (command.issuing_player, *seq));
        }
        due.into_iter().map(|(_, command)| command).collect()
    }

    /// Number of queued commands.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Nothing queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Earliest tick with queued commands.
    #[must_use]
    pub fn next_due_tick(&self) -> Option<u64> {
        self.buckets.keys().next().copied()
    }

    /// Most recent tick drained by [`take_due`](Self::take_due).
    #[must_use]
    pub const fn last_executed(&self) -> Option<u64> {
        self.last_executed
    }
}
