//! Per-entity state shared by units, workers, buildings and resource nodes.
//!
//! Everything here is plain data. Behaviour lives in [`unit`](crate::unit),
//! [`worker`](crate::worker) and [`building`](crate::building).

use serde::{Deserialize, Serialize};

use crate::hex::CubeCoord;

/// Unique, monotonically assigned entity identifier.
pub type EntityId = u64;

/// Player identifier.
pub type PlayerId = u64;

/// Owner of map features such as resource nodes. Never an enemy.
pub const NEUTRAL_PLAYER: PlayerId = u64::MAX;

/// Why an entity is doing what it does. Set by commands or by the entity's
/// own transitions; persists across ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Purpose {
    /// No standing order.
    #[default]
    Idle,
    /// Walk to a tile, then go idle.
    MoveToPosition(CubeCoord),
    /// Chase and attack one entity until it dies.
    AttackUnit(EntityId),
    /// Walk to a tile, engaging the first enemy seen near it.
    AttackPosition(CubeCoord),
    /// Stay put and shoot whatever comes into range.
    Hold,
    /// Walk back and forth between two tiles.
    Patrol {
        /// Where the patrol started.
        origin: CubeCoord,
        /// Current leg destination.
        target: CubeCoord,
    },
    /// Harvest a resource node.
    Gather(EntityId),
    /// Carry the current load to a drop-off building.
    ReturnResource {
        /// Chosen drop-off, resolved lazily when `None`.
        drop_off: Option<EntityId>,
    },
    /// Work on an unfinished building.
    Build(EntityId),
    /// Terminal.
    Dead,
}

/// What an entity mechanically does this tick. Recomputed from [`Purpose`]
/// every step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Action {
    /// Nothing.
    #[default]
    Idle,
    /// Following `path`.
    Moving,
    /// Attacking `attack_target`.
    Attacking,
    /// Pulling resources from an adjacent node.
    Gathering,
    /// Advancing construction of an adjacent building.
    Building,
    /// Terminal.
    Dead,
}

/// Hit points. `0 <= current <= max` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Health {
    current: i32,
    max: i32,
}

impl Health {
    /// Full health. A non-positive `max` is raised to 1.
    #[must_use]
    pub fn new(max: i32) -> Self {
        let max = max.max(1);
        Self { current: max, max }
    }

    /// Current hit points.
    #[must_use]
    pub const fn current(&self) -> i32 {
        self.current
    }

    /// Maximum hit points.
    #[must_use]
    pub const fn max(&self) -> i32 {
        self.max
    }

    /// `current == 0`.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.current == 0
    }

    /// Set current hit points, clamped to `0..=max`.
    pub fn set(&mut self, value: i32) {
        self.current = value.clamp(0, self.max);
    }

    /// Subtract damage, flooring at zero. Returns `true` if this hit emptied it.
    pub fn apply_damage(&mut self, amount: i32) -> bool {
        if self.current == 0 || amount <= 0 {
            return false;
        }
        self.current = self.current.saturating_sub(amount).max(0);
        self.current == 0
    }
}

/// Combat and movement numbers copied from the entity's data definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct UnitStats {
    /// Movement points gained per tick.
    pub move_points_per_tick: i32,
    /// Damage per attack.
    pub attack_damage: i32,
    /// Attack range in tiles.
    pub attack_range: i32,
    /// Ticks between attacks.
    pub attack_cooldown_ticks: i32,
    /// Vision range in tiles.
    pub vision_range: i32,
}

/// Path being followed, with the movement-point accumulator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PathFollower {
    waypoints: Vec<CubeCoord>,
    cursor: usize,
    accumulated_points: i32,
}

impl PathFollower {
    /// Replace the current path. Unspent points carry over to the new one.
    pub fn set(&mut self, waypoints: Vec<CubeCoord>) {
        self.waypoints = waypoints;
        self.cursor = 0;
    }

    /// Drop the current path and any unspent points.
    pub fn clear(&mut self) {
        self.waypoints.clear();
        self.cursor = 0;
        self.accumulated_points = 0;
    }

    /// `true` when there is no path left to follow.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cursor >= self.waypoints.len()
    }

    /// Final waypoint of the active path.
    #[must_use]
    pub fn destination(&self) -> Option<CubeCoord> {
        if self.is_empty() {
            None
        } else {
            self.waypoints.last().copied()
        }
    }

    /// Next waypoint to enter.
    #[must_use]
    pub fn next_waypoint(&self) -> Option<CubeCoord> {
        self.waypoints.get(self.cursor).copied()
    }

    /// Waypoints not yet reached.
    #[must_use]
    pub fn remaining(&self) -> &[CubeCoord] {
        self.waypoints.get(self.cursor..).unwrap_or_default()
    }

    /// Cursor into the waypoint list.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Unspent movement points.
    #[must_use]
    pub const fn accumulated_points(&self) -> i32 {
        self.accumulated_points
    }

    pub(crate) fn add_points(&mut self, points: i32) {
        self.accumulated_points = self.accumulated_points.saturating_add(points);
    }

    /// Spend `cost` points and step the cursor. Returns `false` when short.
    pub(crate) fn try_advance(&mut self, cost: i32) -> bool {
        if self.accumulated_points < cost || self.is_empty() {
            return false;
        }
        self.accumulated_points -= cost;
        self.cursor += 1;
        if self.is_empty() {
            self.clear();
        }
        true
    }
}
