//! # Hex RTS Core
//!
//! Deterministic simulation core for a hex-grid real-time strategy game.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No file or network IO
//! - No randomness
//! - Integer simulation state (fixed-point only for presentation positions)
//!
//! Given the same grid, data, configuration and command stream, two runs
//! produce identical [`Simulation::state_hash`](simulation::Simulation::state_hash)
//! values on every tick. That is what lockstep play, replays and the
//! headless verifier rely on.
//!
//! ## Crate Structure
//!
//! - [`hex`] - Cube coordinates and the tile grid
//! - [`pathfinding`] - A* over the grid plus a budgeted request queue
//! - [`formation`] - Slot assignment for group moves
//! - [`entity`] - Entities, their purpose/action state and storage
//! - [`worker`] - Gathering and construction state
//! - [`building`] - Construction progress and production queues
//! - [`ledger`] - Per-player resource balances and caps
//! - [`command`] - Player commands and the tick-keyed scheduler
//! - [`clock`] - Fixed-step tick clock
//! - [`simulation`] - The tick pipeline
//! - [`game_loop`] - Clock-driven driver with AI hooks
//! - [`replay`] - Command logs for replay and desync checks

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod building;
pub mod clock;
pub mod command;
pub mod components;
pub mod config;
pub mod data;
pub mod economy;
pub mod entity;
pub mod error;
pub mod formation;
pub mod game_loop;
pub mod hex;
pub mod ledger;
pub mod math;
pub mod pathfinding;
pub mod replay;
pub mod simulation;
pub mod worker;

mod production;
mod unit;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::building::{Building, ConstructionOutcome};
    pub use crate::clock::TickClock;
    pub use crate::command::{Command, CommandKind, CommandScheduler};
    pub use crate::components::*;
    pub use crate::config::{CommandOrdering, PlayerSetup, SimConfig, StartingResource};
    pub use crate::data::{BuildingData, DataRegistry, GameData, UnitData, WorkerData};
    pub use crate::economy::ResourceNode;
    pub use crate::entity::{Entity, EntityKind, EntityStorage};
    pub use crate::error::{GameError, Result};
    pub use crate::game_loop::{AiController, GameLoop};
    pub use crate::hex::{CubeCoord, HexGrid, HexOrientation, Tile};
    pub use crate::ledger::{LedgerEvent, ResourceCost, ResourceLedger};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::replay::CommandLog;
    pub use crate::simulation::{Simulation, TickEvents};
    pub use crate::worker::WorkerState;
}
