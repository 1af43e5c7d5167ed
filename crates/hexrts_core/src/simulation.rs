//! Core simulation loop.
//!
//! [`Simulation`] owns the grid, the data registry, the resource ledger,
//! every entity and the command scheduler, and advances them one fixed
//! tick at a time.
//!
//! # Tick order
//!
//! 1. Reap entities that died on the previous tick
//! 2. Dispatch commands scheduled for this tick
//! 3. Step every entity in ascending id order (units spawned mid-tick
//!    wait for the next tick)
//! 4. Collect ledger events, then advance the tick counter
//!
//! # Determinism
//!
//! - Integer movement points and damage; fixed-point only for presentation
//! - No randomness
//! - Entities, ledger entries and command buckets all iterate in key order
//!
//! # Example
//!
//! ```
//! use hexrts_core::command::CommandKind;
//! use hexrts_core::config::SimConfig;
//! use hexrts_core::data::{DataRegistry, UnitData};
//! use hexrts_core::hex::{CubeCoord, HexGrid, HexOrientation};
//! use hexrts_core::simulation::Simulation;
//!
//! let mut registry = DataRegistry::new();
//! registry.register_unit(UnitData {
//!     id: "scout".into(),
//!     move_points_per_tick: 1000,
//!     ..UnitData::default()
//! });
//! let grid = HexGrid::hexagon(4, HexOrientation::PointyTop);
//! let mut sim = Simulation::new(grid, registry, SimConfig::default());
//!
//! let scout = sim.create_unit("scout", 1, CubeCoord::ORIGIN)?;
//! sim.issue(1, vec![scout], CommandKind::Move(CubeCoord::axial(2, 0)));
//! sim.tick();
//! sim.tick();
//! assert_eq!(sim.entity(scout).map(|e| e.coord), Some(CubeCoord::axial(2, 0)));
//! # Ok::<(), hexrts_core::error::GameError>(())
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::command::{Command, CommandKind, CommandScheduler};
use crate::components::{EntityId, PlayerId};
use crate::config::{PlayerSetup, SimConfig};
use crate::data::DataRegistry;
use crate::economy::ResourceNode;
use crate::entity::{Entity, EntityKind, EntityStorage};
use crate::error::{GameError, Result};
use crate::formation;
use crate::hex::{CubeCoord, HexGrid};
use crate::ledger::{LedgerEvent, ResourceLedger};
use crate::unit::{self, StepContext};

/// One hit landed during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageEvent {
    /// Entity that attacked.
    pub attacker: EntityId,
    /// Entity that was hit.
    pub target: EntityId,
    /// Damage dealt.
    pub amount: i32,
}

/// A unit leaving a production building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductionComplete {
    /// Producing building.
    pub building: EntityId,
    /// The new unit.
    pub unit: EntityId,
    /// Its definition id.
    pub unit_type: String,
}

/// Everything observable that happened during one tick.
///
/// The game layer uses these for effects, sounds and UI; the simulation
/// never reads them back.
#[derive(Debug, Clone, Default)]
pub struct TickEvents {
    /// Tick these events belong to.
    pub tick: u64,
    /// Commands dispatched this tick.
    pub commands_executed: usize,
    /// Hits landed.
    pub damage: Vec<DamageEvent>,
    /// Entities killed this tick. They are removed at the start of the next.
    pub deaths: Vec<EntityId>,
    /// Entities removed this tick after dying on the previous one.
    pub reaped: Vec<EntityId>,
    /// Entities created by production.
    pub spawned: Vec<EntityId>,
    /// Production completions.
    pub production_complete: Vec<ProductionComplete>,
    /// Buildings that finished construction.
    pub buildings_completed: Vec<EntityId>,
    /// Balance and cap changes.
    pub ledger: Vec<LedgerEvent>,
}

#[derive(Serialize)]
struct Snapshot<'a> {
    tick: u64,
    entities: &'a EntityStorage,
    ledger: &'a ResourceLedger,
}

/// The core game simulation.
#[derive(Debug, Clone)]
pub struct Simulation {
    tick: u64,
    config: SimConfig,
    grid: HexGrid,
    registry: DataRegistry,
    ledger: ResourceLedger,
    entities: EntityStorage,
    scheduler: CommandScheduler,
}

impl Simulation {
    /// New simulation at tick 0.
    ///
    /// Invalid config fields are replaced by defaults (logged); registry
    /// cross-reference problems are logged as warnings.
    #[must_use]
    pub fn new(grid: HexGrid, registry: DataRegistry, config: SimConfig) -> Self {
        for problem in registry.validate() {
            tracing::warn!(%problem, "Data registry problem");
        }
        Self {
            tick: 0,
            config: config.sanitized(),
            grid,
            registry,
            ledger: ResourceLedger::new(),
            entities: EntityStorage::new(),
            scheduler: CommandScheduler::new(),
        }
    }

    /// Like [`new`](Self::new) but refuses an invalid config.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] if `config` does not validate.
    pub fn try_new(grid: HexGrid, registry: DataRegistry, config: SimConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(grid, registry, config))
    }

    /// Seed a player's starting balances and caps.
    pub fn setup_player(&mut self, setup: &PlayerSetup) {
        for res in &setup.resources {
            self.ledger
                .set_starting(setup.id, &res.resource, res.amount, res.cap);
        }
    }

    /// Next tick to run.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The map.
    #[must_use]
    pub const fn grid(&self) -> &HexGrid {
        &self.grid
    }

    /// Mutable map, for scenario setup.
    pub fn grid_mut(&mut self) -> &mut HexGrid {
        &mut self.grid
    }

    /// Unit and building definitions.
    #[must_use]
    pub const fn registry(&self) -> &DataRegistry {
        &self.registry
    }

    /// Resource balances.
    #[must_use]
    pub const fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    /// Mutable resource balances.
    pub fn ledger_mut(&mut self) -> &mut ResourceLedger {
        &mut self.ledger
    }

    /// All entities.
    #[must_use]
    pub const fn entities(&self) -> &EntityStorage {
        &self.entities
    }

    /// Entity by id.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Mutable entity by id.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    /// Pending commands.
    #[must_use]
    pub const fn scheduler(&self) -> &CommandScheduler {
        &self.scheduler
    }

    /// Nearest living enemy of `owner` within `range` of `origin`.
    #[must_use]
    pub fn find_nearest_enemy(&self, owner: PlayerId, origin: CubeCoord, range: i32) -> Option<EntityId> {
        self.entities.nearest_enemy(owner, origin, range)
    }

    // --- factories ---

    /// Create a unit from its definition. Charges neither cost nor supply.
    ///
    /// # Errors
    ///
    /// [`GameError::UnknownUnitType`] or [`GameError::InvalidCoordinate`].
    pub fn create_unit(&mut self, type_id: &str, owner: PlayerId, coord: CubeCoord) -> Result<EntityId> {
        let data = self.registry.require_unit(type_id)?;
        if !self.grid.is_valid(coord) {
            return Err(GameError::InvalidCoordinate(coord));
        }
        let entity = Entity::from_unit_data(owner, data, coord, self.grid.cube_to_world(coord));
        let id = self.entities.insert(entity);
        tracing::debug!(id, type_id, owner, %coord, "Created unit");
        Ok(id)
    }

    /// Place a neutral resource node, blocking its tile.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidCoordinate`] or [`GameError::PlacementBlocked`].
    pub fn spawn_resource_node(&mut self, node: ResourceNode, coord: CubeCoord) -> Result<EntityId> {
        self.check_placement(coord)?;
        let entity = Entity::from_resource_node(node, coord, self.grid.cube_to_world(coord));
        self.grid.set_walkable(coord, false);
        Ok(self.entities.insert(entity))
    }

    /// Charge the cost, place an unfinished building and send `workers` to
    /// build it. Workers that are missing, dead or not owned by `owner` are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Unknown type, blocked or invalid tile, or insufficient resources.
    /// Nothing is charged or placed on error.
    pub fn start_placing_building(
        &mut self,
        type_id: &str,
        coord: CubeCoord,
        owner: PlayerId,
        workers: &[EntityId],
    ) -> Result<EntityId> {
        let data = self.registry.require_building(type_id)?;
        self.check_placement(coord)?;
        self.ledger.charge(owner, &data.creation_cost)?;

        let entity = Entity::from_building_data(owner, data, coord, self.grid.cube_to_world(coord));
        self.grid.set_occupancy(&[coord], false);
        let id = self.entities.insert(entity);

        for &worker_id in workers {
            match self.entities.get_mut(worker_id) {
                Some(worker) if worker.is_alive() && worker.owner == owner => worker.order_build(id),
                _ => tracing::debug!(worker = worker_id, "Skipping unavailable builder"),
            }
        }
        tracing::info!(id, type_id, owner, %coord, "Building placed");
        Ok(id)
    }

    /// Place a finished building for free. Raises the supply cap at once.
    ///
    /// # Errors
    ///
    /// Unknown type, or blocked or invalid tile.
    pub fn place_constructed_building(&mut self, type_id: &str, coord: CubeCoord, owner: PlayerId) -> Result<EntityId> {
        let data = self.registry.require_building(type_id)?;
        self.check_placement(coord)?;

        let mut entity = Entity::from_building_data(owner, data, coord, self.grid.cube_to_world(coord));
        let Entity { health, kind, .. } = &mut entity;
        if let EntityKind::Building(building) = kind {
            building.finish(health);
            if building.grant_supply() {
                self.ledger
                    .adjust_cap(owner, &self.config.supply_resource, building.supply_provided());
            }
        }
        self.grid.set_occupancy(&[coord], false);
        Ok(self.entities.insert(entity))
    }

    fn check_placement(&self, coord: CubeCoord) -> Result<()> {
        if !self.grid.is_valid(coord) {
            return Err(GameError::InvalidCoordinate(coord));
        }
        let occupied = self
            .entities
            .iter()
            .any(|e| e.is_alive() && e.coord == coord);
        if !self.grid.is_walkable(coord) || occupied {
            return Err(GameError::PlacementBlocked(coord));
        }
        Ok(())
    }

    // --- production ---

    /// Queue one unit: checks the building, reserves supply and charges the
    /// creation cost.
    ///
    /// # Errors
    ///
    /// [`GameError::EntityNotFound`] for a missing or dead building,
    /// [`GameError::ProductionRejected`], [`GameError::UnknownUnitType`] or
    /// [`GameError::InsufficientResources`] (supply included). Nothing
    /// changes on error.
    pub fn enqueue_production(&mut self, building_id: EntityId, unit_type: &str) -> Result<()> {
        let entity = self
            .entities
            .get_alive(building_id)
            .ok_or(GameError::EntityNotFound(building_id))?;
        let owner = entity.owner;
        entity
            .building()
            .ok_or_else(|| GameError::ProductionRejected(format!("entity {building_id} is not a building")))?
            .check_enqueue(unit_type)?;
        let data = self.registry.require_unit(unit_type)?;

        let supply = self.config.supply_resource.as_str();
        let supply_cost = data.supply_cost.max(0);
        if supply_cost > 0 {
            let used = self.ledger.amount(owner, supply);
            let cap = self.ledger.cap(owner, supply);
            if used.saturating_add(supply_cost) > cap {
                return Err(GameError::InsufficientResources {
                    resource: supply.to_string(),
                    required: supply_cost,
                    available: cap - used,
                });
            }
        }
        self.ledger.charge(owner, &data.creation_cost)?;
        if supply_cost > 0 {
            self.ledger.add(owner, supply, supply_cost);
        }

        if let Some(building) = self
            .entities
            .get_mut(building_id)
            .and_then(Entity::building_mut)
        {
            building.push_queue(unit_type.to_string());
        }
        tracing::debug!(building = building_id, unit_type, "Production queued");
        Ok(())
    }

    /// Cancel the newest production item, refunding cost and supply.
    ///
    /// Returns the cancelled unit type, or `None` if nothing was queued.
    ///
    /// # Errors
    ///
    /// [`GameError::EntityNotFound`] for a missing or dead building,
    /// [`GameError::InvalidState`] if the entity is not a building.
    pub fn cancel_production(&mut self, building_id: EntityId) -> Result<Option<String>> {
        let entity = self
            .entities
            .get_mut(building_id)
            .filter(|e| e.is_alive())
            .ok_or(GameError::EntityNotFound(building_id))?;
        let owner = entity.owner;
        let building = entity
            .building_mut()
            .ok_or_else(|| GameError::InvalidState(format!("entity {building_id} is not a building")))?;
        let Some(unit_type) = building.cancel_latest() else {
            return Ok(None);
        };

        if let Some(data) = self.registry.unit(&unit_type) {
            self.ledger.refund(owner, &data.creation_cost);
            let supply = self.config.supply_resource.as_str();
            let release = data.supply_cost.max(0).min(self.ledger.amount(owner, supply));
            self.ledger.try_consume(owner, supply, release);
        }
        tracing::debug!(building = building_id, %unit_type, "Production cancelled");
        Ok(Some(unit_type))
    }

    // --- commands ---

    /// Queue a command for its own execution tick.
    ///
    /// Returns `false` if that tick has already run.
    pub fn schedule(&mut self, command: Command) -> bool {
        self.scheduler.enqueue(command)
    }

    /// Queue a command for the next tick plus the configured input delay.
    pub fn issue(&mut self, player: PlayerId, actors: Vec<EntityId>, kind: CommandKind) -> bool {
        let execution_tick = self.tick + self.config.input_delay_ticks;
        self.schedule(Command::new(player, actors, execution_tick, kind))
    }

    fn dispatch(&mut self, command: Command) {
        let Command {
            issuing_player: player,
            actors,
            kind,
            ..
        } = command;
        let actors: Vec<EntityId> = actors
            .into_iter()
            .filter(|&id| match self.entities.get_alive(id) {
                Some(e) if e.owner == player => true,
                Some(_) => {
                    tracing::warn!(id, player, "Ignoring actor not owned by issuing player");
                    false
                }
                None => false,
            })
            .collect();
        if actors.is_empty() {
            tracing::debug!(tick = self.tick, player, ?kind, "Command has no valid actors");
            return;
        }
        tracing::debug!(tick = self.tick, player, actors = actors.len(), ?kind, "Dispatching command");

        match kind {
            CommandKind::Move(target) => self.dispatch_move(&actors, target),
            CommandKind::Stop => self.for_each_unit(&actors, Entity::order_stop),
            CommandKind::HoldPosition => self.for_each_unit(&actors, Entity::order_hold),
            CommandKind::Patrol(target) => {
                if !self.grid.is_walkable(target) {
                    tracing::warn!(%target, "Patrol target not walkable");
                    return;
                }
                self.for_each_unit(&actors, |e| e.order_patrol(target));
            }
            CommandKind::AttackUnit(target) => {
                if !self.entities.get(target).is_some_and(|e| e.is_enemy_of(player)) {
                    tracing::warn!(target, player, "Attack target is not a live enemy");
                    return;
                }
                self.for_each_unit(&actors, |e| {
                    if e.id != target {
                        e.order_attack_unit(target);
                    }
                });
            }
            CommandKind::AttackPosition(target) => {
                if !self.grid.is_walkable(target) {
                    tracing::warn!(%target, "Attack-move target not walkable");
                    return;
                }
                self.for_each_unit(&actors, |e| e.order_attack_position(target));
            }
            CommandKind::GatherResource(node) => {
                let valid = self
                    .entities
                    .get_alive(node)
                    .and_then(Entity::resource_node)
                    .is_some_and(|n| !n.is_depleted());
                if !valid {
                    tracing::warn!(node, "Gather target is not an available resource node");
                    return;
                }
                self.for_each_unit(&actors, |e| e.order_gather(node));
            }
            CommandKind::ReturnResource(building_type) => {
                for &id in &actors {
                    let Some(coord) = self.entities.get(id).filter(|e| e.worker().is_some()).map(|e| e.coord) else {
                        continue;
                    };
                    let drop_off = self.entities.nearest_drop_off(player, coord, building_type.as_deref());
                    if drop_off.is_none() && building_type.is_some() {
                        tracing::warn!(worker = id, ?building_type, "No drop-off of the requested type");
                        continue;
                    }
                    if let Some(worker) = self.entities.get_mut(id) {
                        worker.order_return(drop_off);
                    }
                }
            }
            CommandKind::BuildBuilding { building_type, coord } => {
                let builders: Vec<EntityId> = actors
                    .iter()
                    .copied()
                    .filter(|&id| {
                        self.entities
                            .get(id)
                            .and_then(|e| self.registry.unit(&e.type_id))
                            .is_some_and(|u| u.can_build(&building_type))
                    })
                    .collect();
                if builders.is_empty() {
                    tracing::warn!(%building_type, "No actor can build this");
                    return;
                }
                if let Err(err) = self.start_placing_building(&building_type, coord, player, &builders) {
                    tracing::warn!(%err, %building_type, %coord, "Build command rejected");
                }
            }
            CommandKind::ProduceUnit { unit_type, quantity } => {
                for &id in &actors {
                    for _ in 0..quantity {
                        if let Err(err) = self.enqueue_production(id, &unit_type) {
                            tracing::warn!(%err, building = id, %unit_type, "Production rejected");
                            break;
                        }
                    }
                }
            }
            CommandKind::CancelProduction => {
                for &id in &actors {
                    if let Err(err) = self.cancel_production(id) {
                        tracing::debug!(%err, id, "Cancel skipped");
                    }
                }
            }
            CommandKind::SetRallyPoint(coord) => {
                if !self.grid.is_valid(coord) {
                    tracing::warn!(%coord, "Rally point off the map");
                    return;
                }
                for &id in &actors {
                    if let Some(building) = self.entities.get_mut(id).and_then(Entity::building_mut) {
                        building.set_rally_point(coord);
                    }
                }
            }
            CommandKind::Ability { ability_id, .. } => {
                tracing::warn!(%ability_id, "Abilities are not simulated, ignoring");
            }
        }
    }

    fn dispatch_move(&mut self, actors: &[EntityId], target: CubeCoord) {
        let units: Vec<EntityId> = actors
            .iter()
            .copied()
            .filter(|&id| self.entities.get(id).is_some_and(Entity::is_unit))
            .collect();
        if units.is_empty() {
            return;
        }
        let slots = formation::positions(target, units.len(), &self.grid);
        let target_walkable = self.grid.is_walkable(target);
        for (id, slot) in units.into_iter().zip(slots) {
            let Some(entity) = self.entities.get_mut(id) else {
                continue;
            };
            let destination = if self.grid.is_walkable(slot) {
                slot
            } else if target_walkable {
                target
            } else {
                entity.coord
            };
            entity.order_move(destination);
        }
    }

    fn for_each_unit(&mut self, actors: &[EntityId], mut order: impl FnMut(&mut Entity)) {
        for &id in actors {
            if let Some(entity) = self.entities.get_mut(id).filter(|e| e.is_unit()) {
                order(entity);
            }
        }
    }

    // --- tick ---

    /// Advance the simulation by one tick.
    pub fn tick(&mut self) -> TickEvents {
        let tick = self.tick;
        let mut events = TickEvents {
            tick,
            ..TickEvents::default()
        };

        self.reap_dead(&mut events);

        let due = self.scheduler.take_due(tick, self.config.command_ordering);
        events.commands_executed = due.len();
        for command in due {
            self.dispatch(command);
        }

        for id in self.entities.sorted_ids() {
            let Some(mut entity) = self.entities.remove(id) else {
                continue;
            };
            let mut ctx = StepContext {
                grid: &mut self.grid,
                ledger: &mut self.ledger,
                entities: &mut self.entities,
                registry: &self.registry,
                config: &self.config,
                events: &mut events,
                tick,
            };
            unit::step(&mut entity, &mut ctx);
            self.entities.restore(entity);
        }

        events.ledger = self.ledger.drain_events();

        #[cfg(feature = "debug-validation")]
        self.check_invariants();

        self.tick += 1;

        #[cfg(debug_assertions)]
        tracing::debug!(tick, hash = self.state_hash(), "Tick complete");

        events
    }

    fn reap_dead(&mut self, events: &mut TickEvents) {
        let dead: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|e| e.is_dead())
            .map(|e| e.id)
            .collect();
        for id in dead {
            self.entities.remove(id);
            events.reaped.push(id);
        }
    }

    // --- determinism ---

    /// Hash of the simulation-relevant state.
    ///
    /// Two simulations fed the same setup and commands hash identically
    /// after every tick.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.tick.hash(&mut hasher);
        self.entities.len().hash(&mut hasher);
        for entity in self.entities.iter() {
            entity.hash_state(&mut hasher);
        }
        for (player, resource, amount, cap) in self.ledger.balances() {
            player.hash(&mut hasher);
            resource.hash(&mut hasher);
            amount.hash(&mut hasher);
            cap.hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Serialized tick, entities and ledger, for byte-level comparison.
    ///
    /// Not a save format.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] if serialization fails.
    pub fn snapshot_bytes(&self) -> Result<Vec<u8>> {
        let snapshot = Snapshot {
            tick: self.tick,
            entities: &self.entities,
            ledger: &self.ledger,
        };
        bincode::serialize(&snapshot)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize snapshot: {e}")))
    }

    /// Check entity and ledger invariants. Returns one message per violation.
    #[must_use]
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for entity in self.entities.iter() {
            let health = entity.health;
            if health.current() < 0 || health.current() > health.max() {
                problems.push(format!("entity {}: health {} outside 0..={}", entity.id, health.current(), health.max()));
            }
            if entity.resource_node().is_none() && entity.is_dead() != health.is_depleted() {
                problems.push(format!(
                    "entity {}: dead={} but health={}",
                    entity.id,
                    entity.is_dead(),
                    health.current()
                ));
            }
            if !self.grid.is_valid(entity.coord) {
                problems.push(format!("entity {}: off-grid at {}", entity.id, entity.coord));
            }
            if let Some(building) = entity.building() {
                if building.is_constructed()
                    && building.construction_progress_ticks() < building.creation_time_ticks()
                {
                    problems.push(format!("building {}: constructed before threshold", entity.id));
                }
            }
            if let Some(worker) = entity.worker() {
                if worker.carried < 0 || worker.carried > worker.max_carry_capacity {
                    problems.push(format!("worker {}: carrying {}", entity.id, worker.carried));
                }
            }
        }
        for (player, resource, amount, cap) in self.ledger.balances() {
            if amount < 0 || amount > cap {
                problems.push(format!("player {player}: {resource} {amount} outside 0..={cap}"));
            }
        }
        problems
    }

    #[cfg(feature = "debug-validation")]
    fn check_invariants(&self) {
        let problems = self.invariant_violations();
        for problem in &problems {
            tracing::error!(tick = self.tick, %problem, "Invariant violated");
        }
        debug_assert!(problems.is_empty(), "invariants violated at tick {}", self.tick);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Action, Purpose};
    use crate::config::StartingResource;
    use crate::data::{BuildingData, UnitData, WorkerData};
    use crate::hex::HexOrientation;
    use crate::ledger::ResourceCost;

    fn registry() -> DataRegistry {
        let mut registry = DataRegistry::new();
        registry.register_unit(UnitData {
            id: "marine".into(),
            max_health: 25,
            move_points_per_tick: 1000,
            creation_cost: vec![ResourceCost::new("Mineral", 50)],
            creation_time_ticks: 3,
            supply_cost: 1,
            ..UnitData::default()
        });
        registry.register_unit(UnitData {
            id: "worker".into(),
            move_points_per_tick: 1000,
            worker: Some(WorkerData {
                buildable_building_ids: vec!["depot".into()],
                ..WorkerData::default()
            }),
            ..UnitData::default()
        });
        registry.register_building(BuildingData {
            id: "depot".into(),
            creation_cost: vec![ResourceCost::new("Mineral", 100)],
            creation_time_ticks: 40,
            acts_as_resource_drop_off: true,
            supply_provided: 5,
            ..BuildingData::default()
        });
        registry.register_building(BuildingData {
            id: "barracks".into(),
            can_produce_units: true,
            producible_unit_ids: vec!["marine".into()],
            production_queue_size: 2,
            ..BuildingData::default()
        });
        registry
    }

    fn sim() -> Simulation {
        let mut sim = Simulation::new(
            HexGrid::hexagon(6, HexOrientation::PointyTop),
            registry(),
            SimConfig::default(),
        );
        sim.setup_player(&PlayerSetup {
            id: 1,
            resources: vec![
                StartingResource {
                    resource: "Mineral".into(),
                    amount: 500,
                    cap: 0,
                },
                StartingResource {
                    resource: "Supply".into(),
                    amount: 0,
                    cap: 2,
                },
            ],
        });
        sim
    }

    #[test]
    fn test_tick_increments() {
        let mut sim = sim();
        assert_eq!(sim.tick_count(), 0);
        assert_eq!(sim.tick().tick, 0);
        assert_eq!(sim.tick().tick, 1);
        assert_eq!(sim.tick_count(), 2);
    }

    #[test]
    fn test_create_unit_rejects_unknown() {
        let mut sim = sim();
        assert!(matches!(
            sim.create_unit("tank", 1, CubeCoord::ORIGIN),
            Err(GameError::UnknownUnitType(_))
        ));
        assert!(matches!(
            sim.create_unit("marine", 1, CubeCoord::axial(50, 0)),
            Err(GameError::InvalidCoordinate(_))
        ));
        assert_eq!(sim.create_unit("marine", 1, CubeCoord::ORIGIN).unwrap(), 1);
    }

    #[test]
    fn test_placement_charges_and_blocks() {
        let mut sim = sim();
        let site = CubeCoord::axial(2, 0);
        let id = sim.start_placing_building("depot", site, 1, &[]).unwrap();
        assert_eq!(sim.ledger().amount(1, "Mineral"), 400);
        assert!(!sim.grid().is_walkable(site));
        assert!(matches!(
            sim.start_placing_building("depot", site, 1, &[]),
            Err(GameError::PlacementBlocked(_))
        ));
        let entity = sim.entity(id).unwrap();
        assert_eq!(entity.health.current(), 1);
    }

    #[test]
    fn test_placement_failure_charges_nothing() {
        let mut sim = sim();
        sim.ledger_mut().set_starting(1, "Mineral", 99, 0);
        assert!(matches!(
            sim.start_placing_building("depot", CubeCoord::ORIGIN, 1, &[]),
            Err(GameError::InsufficientResources { .. })
        ));
        assert_eq!(sim.ledger().amount(1, "Mineral"), 99);
        assert!(sim.grid().is_walkable(CubeCoord::ORIGIN));
        assert!(sim.entities().is_empty());
    }

    #[test]
    fn test_constructed_building_raises_supply_cap() {
        let mut sim = sim();
        sim.place_constructed_building("depot", CubeCoord::ORIGIN, 1).unwrap();
        assert_eq!(sim.ledger().cap(1, "Supply"), 7);
    }

    #[test]
    fn test_enqueue_reserves_supply_and_cancel_refunds() {
        let mut sim = sim();
        let barracks = sim
            .place_constructed_building("barracks", CubeCoord::ORIGIN, 1)
            .unwrap();
        sim.enqueue_production(barracks, "marine").unwrap();
        sim.enqueue_production(barracks, "marine").unwrap();
        assert_eq!(sim.ledger().amount(1, "Mineral"), 400);
        assert_eq!(sim.ledger().amount(1, "Supply"), 2);

        // Queue is full and supply is capped; either way nothing is charged.
        assert!(sim.enqueue_production(barracks, "marine").is_err());
        assert_eq!(sim.ledger().amount(1, "Mineral"), 400);

        assert_eq!(sim.cancel_production(barracks).unwrap(), Some("marine".into()));
        assert_eq!(sim.ledger().amount(1, "Mineral"), 450);
        assert_eq!(sim.ledger().amount(1, "Supply"), 1);
    }

    #[test]
    fn test_production_spawns_and_rallies() {
        let mut sim = sim();
        let barracks = sim
            .place_constructed_building("barracks", CubeCoord::ORIGIN, 1)
            .unwrap();
        let rally = CubeCoord::axial(0, 3);
        sim.issue(1, vec![barracks], CommandKind::SetRallyPoint(rally));
        sim.issue(
            1,
            vec![barracks],
            CommandKind::ProduceUnit {
                unit_type: "marine".into(),
                quantity: 1,
            },
        );

        // Tick 0 dequeues, ticks 1..=3 progress.
        let mut spawned = Vec::new();
        for _ in 0..4 {
            spawned.extend(sim.tick().spawned);
        }
        assert_eq!(spawned.len(), 1);
        let unit = sim.entity(spawned[0]).unwrap();
        assert_eq!(unit.coord.distance(CubeCoord::ORIGIN), 1);
        assert_eq!(unit.purpose, Purpose::MoveToPosition(rally));
        assert_eq!(unit.supply_held, 1);
    }

    #[test]
    fn test_unit_death_releases_supply() {
        let mut sim = sim();
        let barracks = sim
            .place_constructed_building("barracks", CubeCoord::ORIGIN, 1)
            .unwrap();
        sim.enqueue_production(barracks, "marine").unwrap();
        let spawned: Vec<EntityId> = (0..4).flat_map(|_| sim.tick().spawned).collect();
        assert_eq!(sim.ledger().amount(1, "Supply"), 1);

        let unit = spawned[0];
        let mut grid = sim.grid.clone();
        let entity = sim.entities.get_mut(unit).unwrap();
        assert!(entity.take_damage(1000));
        entity.on_death(&mut grid, &mut sim.ledger, "Supply", |_| 1);
        assert_eq!(sim.ledger().amount(1, "Supply"), 0);

        let events = sim.tick();
        assert_eq!(events.reaped, vec![unit]);
        assert!(sim.entity(unit).is_none());
    }

    #[test]
    fn test_dead_resource_node_frees_its_tile() {
        let mut sim = sim();
        let coord = CubeCoord::axial(1, 0);
        let node = sim
            .spawn_resource_node(ResourceNode::new("Mineral", 100, 5), coord)
            .unwrap();
        assert!(!sim.grid().is_walkable(coord));

        let entity = sim.entities.get_mut(node).unwrap();
        assert!(entity.take_damage(1));
        entity.on_death(&mut sim.grid, &mut sim.ledger, "Supply", |_| 0);
        assert!(sim.grid().is_walkable(coord));

        assert_eq!(sim.tick().reaped, vec![node]);
        let marine = sim.create_unit("marine", 1, CubeCoord::ORIGIN).unwrap();
        sim.issue(1, vec![marine], CommandKind::Move(coord));
        sim.tick();
        assert_eq!(sim.entity(marine).unwrap().coord, coord);
    }

    #[test]
    fn test_attack_on_resource_node_is_rejected() {
        let mut sim = sim();
        let node = sim
            .spawn_resource_node(ResourceNode::new("Mineral", 100, 5), CubeCoord::axial(1, 0))
            .unwrap();
        let marine = sim.create_unit("marine", 1, CubeCoord::ORIGIN).unwrap();
        sim.issue(1, vec![marine], CommandKind::AttackUnit(node));
        for _ in 0..3 {
            assert!(sim.tick().damage.is_empty());
        }
        assert!(sim.entity(node).is_some_and(Entity::is_alive));
        assert_eq!(sim.entity(marine).unwrap().purpose, Purpose::Idle);
        assert!(!sim.grid().is_walkable(CubeCoord::axial(1, 0)));
    }

    #[test]
    fn test_commands_skip_foreign_and_dead_actors() {
        let mut sim = sim();
        let mine = sim.create_unit("marine", 1, CubeCoord::ORIGIN).unwrap();
        let theirs = sim.create_unit("marine", 2, CubeCoord::axial(1, 0)).unwrap();
        sim.issue(1, vec![mine, theirs, 99], CommandKind::HoldPosition);
        sim.tick();
        assert_eq!(sim.entity(mine).unwrap().purpose, Purpose::Hold);
        assert_eq!(sim.entity(theirs).unwrap().purpose, Purpose::Idle);
    }

    #[test]
    fn test_stop_clears_everything() {
        let mut sim = sim();
        let unit = sim.create_unit("marine", 1, CubeCoord::ORIGIN).unwrap();
        sim.issue(1, vec![unit], CommandKind::Move(CubeCoord::axial(5, 0)));
        sim.tick();
        assert_eq!(sim.entity(unit).unwrap().action, Action::Moving);
        sim.issue(1, vec![unit], CommandKind::Stop);
        sim.tick();
        let entity = sim.entity(unit).unwrap();
        assert_eq!(entity.purpose, Purpose::Idle);
        assert_eq!(entity.action, Action::Idle);
        assert!(entity.path.is_empty());
    }

    #[test]
    fn test_input_delay() {
        let mut sim = Simulation::new(
            HexGrid::hexagon(3, HexOrientation::PointyTop),
            registry(),
            SimConfig {
                input_delay_ticks: 2,
                ..SimConfig::default()
            },
        );
        let unit = sim.create_unit("marine", 1, CubeCoord::ORIGIN).unwrap();
        sim.issue(1, vec![unit], CommandKind::Move(CubeCoord::axial(1, 0)));
        assert_eq!(sim.scheduler().next_due_tick(), Some(2));
        sim.tick();
        sim.tick();
        assert_eq!(sim.entity(unit).unwrap().coord, CubeCoord::ORIGIN);
        sim.tick();
        assert_eq!(sim.entity(unit).unwrap().coord, CubeCoord::axial(1, 0));
    }

    #[test]
    fn test_snapshot_and_hash_ignore_selection() {
        let mut sim = sim();
        let unit = sim.create_unit("marine", 1, CubeCoord::ORIGIN).unwrap();
        let hash = sim.state_hash();
        let bytes = sim.snapshot_bytes().unwrap();
        sim.entity_mut(unit).unwrap().select();
        assert_eq!(sim.state_hash(), hash);
        assert_eq!(sim.snapshot_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_no_invariant_violations_after_ticks() {
        let mut sim = sim();
        let a = sim.create_unit("marine", 1, CubeCoord::ORIGIN).unwrap();
        let b = sim.create_unit("marine", 2, CubeCoord::axial(3, 0)).unwrap();
        sim.issue(1, vec![a], CommandKind::AttackUnit(b));
        for _ in 0..100 {
            sim.tick();
            assert!(sim.invariant_violations().is_empty());
        }
    }

    #[test]
    fn test_try_new_rejects_bad_config() {
        let result = Simulation::try_new(
            HexGrid::hexagon(1, HexOrientation::PointyTop),
            DataRegistry::new(),
            SimConfig {
                move_points_per_tile: 0,
                ..SimConfig::default()
            },
        );
        assert!(matches!(result, Err(GameError::InvalidConfig(_))));
    }
}
