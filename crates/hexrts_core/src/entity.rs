//! Entities and their storage.
//!
//! Every simulated object is an [`Entity`]: the shared base (owner, health,
//! position, path, purpose/action) plus an [`EntityKind`] payload for the
//! subtype-specific state.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::building::Building;
use crate::components::{
    Action, EntityId, Health, PathFollower, PlayerId, Purpose, UnitStats, NEUTRAL_PLAYER,
};
use crate::data::{BuildingData, UnitData};
use crate::economy::ResourceNode;
use crate::hex::{CubeCoord, HexGrid};
use crate::ledger::ResourceLedger;
use crate::math::{Fixed, Vec2Fixed};
use crate::worker::WorkerState;

/// Subtype payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Plain combat unit.
    Unit,
    /// Unit that gathers and builds.
    Worker(WorkerState),
    /// Structure.
    Building(Building),
    /// Neutral resource deposit.
    ResourceNode(ResourceNode),
}

/// World positions for presentation-layer interpolation.
///
/// Not part of simulation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderState {
    /// Position at the end of the previous step.
    pub previous: Vec2Fixed,
    /// Position at the end of the latest step.
    pub current: Vec2Fixed,
}

/// A simulated object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique id, assigned by [`EntityStorage::insert`].
    pub id: EntityId,
    /// Owning player.
    pub owner: PlayerId,
    /// Data definition id.
    pub type_id: String,
    /// Hit points.
    pub health: Health,
    /// Combat and movement numbers.
    pub stats: UnitStats,
    /// Current tile.
    pub coord: CubeCoord,
    /// Active path.
    pub path: PathFollower,
    /// Standing intent.
    pub purpose: Purpose,
    /// This tick's behaviour.
    pub action: Action,
    /// Entity being attacked, if any.
    pub attack_target: Option<EntityId>,
    /// Ticks until the next attack is allowed.
    pub attack_cooldown: i32,
    /// Supply held by this entity, released on death.
    pub supply_held: i32,
    /// Subtype state.
    pub kind: EntityKind,
    #[serde(skip)]
    render: RenderState,
    #[serde(skip)]
    selected: bool,
}

impl Entity {
    fn base(owner: PlayerId, type_id: &str, max_health: i32, coord: CubeCoord, world: Vec2Fixed, kind: EntityKind) -> Self {
        Self {
            id: 0,
            owner,
            type_id: type_id.to_string(),
            health: Health::new(max_health),
            stats: UnitStats::default(),
            coord,
            path: PathFollower::default(),
            purpose: Purpose::Idle,
            action: Action::Idle,
            attack_target: None,
            attack_cooldown: 0,
            supply_held: 0,
            kind,
            render: RenderState {
                previous: world,
                current: world,
            },
            selected: false,
        }
    }

    /// Unit (or worker) built from its definition. Supply is not charged here.
    #[must_use]
    pub fn from_unit_data(owner: PlayerId, data: &UnitData, coord: CubeCoord, world: Vec2Fixed) -> Self {
        let kind = match &data.worker {
            Some(worker) => EntityKind::Worker(WorkerState::from_data(worker)),
            None => EntityKind::Unit,
        };
        let mut entity = Self::base(owner, &data.id, data.max_health, coord, world, kind);
        entity.stats = UnitStats {
            move_points_per_tick: data.move_points_per_tick,
            attack_damage: data.attack_damage,
            attack_range: data.attack_range,
            attack_cooldown_ticks: data.attack_cooldown_ticks,
            vision_range: data.vision_range,
        };
        entity
    }

    /// Unfinished building with 1 hit point.
    #[must_use]
    pub fn from_building_data(owner: PlayerId, data: &BuildingData, coord: CubeCoord, world: Vec2Fixed) -> Self {
        let building = Building::from_data(data, coord);
        let mut entity = Self::base(owner, &data.id, data.max_health, coord, world, EntityKind::Building(building));
        entity.health.set(1);
        entity.stats.vision_range = data.vision_range;
        entity
    }

    /// Neutral resource node.
    #[must_use]
    pub fn from_resource_node(node: ResourceNode, coord: CubeCoord, world: Vec2Fixed) -> Self {
        let type_id = node.resource_type.clone();
        Self::base(NEUTRAL_PLAYER, &type_id, 1, coord, world, EntityKind::ResourceNode(node))
    }

    /// Not dead.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.action != Action::Dead
    }

    /// Dead and waiting to be reaped.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.action == Action::Dead
    }

    /// Plain unit or worker.
    #[must_use]
    pub const fn is_unit(&self) -> bool {
        matches!(self.kind, EntityKind::Unit | EntityKind::Worker(_))
    }

    /// Worker state, if this is a worker.
    #[must_use]
    pub const fn worker(&self) -> Option<&WorkerState> {
        match &self.kind {
            EntityKind::Worker(w) => Some(w),
            _ => None,
        }
    }

    /// Mutable worker state.
    pub fn worker_mut(&mut self) -> Option<&mut WorkerState> {
        match &mut self.kind {
            EntityKind::Worker(w) => Some(w),
            _ => None,
        }
    }

    /// Building state, if this is a building.
    #[must_use]
    pub const fn building(&self) -> Option<&Building> {
        match &self.kind {
            EntityKind::Building(b) => Some(b),
            _ => None,
        }
    }

    /// Mutable building state.
    pub fn building_mut(&mut self) -> Option<&mut Building> {
        match &mut self.kind {
            EntityKind::Building(b) => Some(b),
            _ => None,
        }
    }

    /// Resource node state, if this is a node.
    #[must_use]
    pub const fn resource_node(&self) -> Option<&ResourceNode> {
        match &self.kind {
            EntityKind::ResourceNode(n) => Some(n),
            _ => None,
        }
    }

    /// Mutable resource node state.
    pub fn resource_node_mut(&mut self) -> Option<&mut ResourceNode> {
        match &mut self.kind {
            EntityKind::ResourceNode(n) => Some(n),
            _ => None,
        }
    }

    /// Living, finished drop-off building owned by `player`.
    #[must_use]
    pub fn is_drop_off_for(&self, player: PlayerId) -> bool {
        self.owner == player
            && self.is_alive()
            && self
                .building()
                .is_some_and(|b| b.is_constructed() && b.is_resource_drop_off())
    }

    /// Whether `other_owner` would treat this entity as an enemy target.
    #[must_use]
    pub fn is_enemy_of(&self, other_owner: PlayerId) -> bool {
        self.is_alive()
            && self.owner != other_owner
            && self.owner != NEUTRAL_PLAYER
            && self.resource_node().is_none()
    }

    /// Subtract hit points. Returns `true` only on the hit that kills.
    ///
    /// The kill sets both layers to `Dead`; the caller runs
    /// [`on_death`](Self::on_death) afterwards.
    pub fn take_damage(&mut self, amount: i32) -> bool {
        if self.is_dead() {
            return false;
        }
        if !self.health.apply_damage(amount) {
            return false;
        }
        self.action = Action::Dead;
        self.purpose = Purpose::Dead;
        self.attack_target = None;
        self.path.clear();
        true
    }

    /// Release what the entity held.
    ///
    /// A building gives back its supply cap, its footprint and the supply
    /// reserved by its production queue (`supply_of` maps a unit type to its
    /// supply cost). A unit gives back the supply it occupied. A resource
    /// node frees its tile.
    pub fn on_death(
        &mut self,
        grid: &mut HexGrid,
        ledger: &mut ResourceLedger,
        supply_resource: &str,
        supply_of: impl Fn(&str) -> i32,
    ) {
        let owner = self.owner;
        match &mut self.kind {
            EntityKind::Building(building) => {
                if building.revoke_supply() {
                    ledger.adjust_cap(owner, supply_resource, -building.supply_provided());
                }
                grid.set_occupancy(building.footprint(), true);

                let reserved: i32 = building
                    .clear_production()
                    .iter()
                    .map(|unit_id| supply_of(unit_id).max(0))
                    .sum();
                let release = reserved.min(ledger.amount(owner, supply_resource));
                ledger.try_consume(owner, supply_resource, release);
            }
            EntityKind::Unit | EntityKind::Worker(_) => {
                let release = self.supply_held.min(ledger.amount(owner, supply_resource));
                ledger.try_consume(owner, supply_resource, release);
            }
            EntityKind::ResourceNode(_) => {
                grid.set_walkable(self.coord, true);
            }
        }
        self.supply_held = 0;
    }

    /// Feed the simulation-relevant fields into `state`.
    ///
    /// Render and selection state are left out.
    pub fn hash_state<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.owner.hash(state);
        self.type_id.hash(state);
        self.health.hash(state);
        self.coord.hash(state);
        self.path.hash(state);
        self.purpose.hash(state);
        self.action.hash(state);
        self.attack_target.hash(state);
        self.attack_cooldown.hash(state);
        self.supply_held.hash(state);
        self.kind.hash(state);
    }

    /// Interpolated world position between the last two steps.
    #[must_use]
    pub fn interpolated_position(&self, factor: Fixed) -> Vec2Fixed {
        self.render.previous.lerp(self.render.current, factor)
    }

    /// Presentation positions.
    #[must_use]
    pub const fn render_state(&self) -> RenderState {
        self.render
    }

    pub(crate) fn begin_render_step(&mut self) {
        self.render.previous = self.render.current;
    }

    pub(crate) fn end_render_step(&mut self, grid: &HexGrid) {
        self.render.current = grid.cube_to_world(self.coord);
    }

    /// Mark as selected.
    pub fn select(&mut self) {
        self.selected = true;
    }

    /// Clear selection.
    pub fn deselect(&mut self) {
        self.selected = false;
    }

    /// Selection flag.
    #[must_use]
    pub const fn is_selected(&self) -> bool {
        self.selected
    }

    // --- orders ---

    /// Walk to `target`.
    pub fn order_move(&mut self, target: CubeCoord) {
        self.purpose = Purpose::MoveToPosition(target);
        self.attack_target = None;
    }

    /// Drop everything.
    pub fn order_stop(&mut self) {
        self.purpose = Purpose::Idle;
        self.action = Action::Idle;
        self.attack_target = None;
        self.path.clear();
    }

    /// Hold position.
    pub fn order_hold(&mut self) {
        self.purpose = Purpose::Hold;
        self.attack_target = None;
        self.path.clear();
    }

    /// Patrol between the current tile and `target`.
    pub fn order_patrol(&mut self, target: CubeCoord) {
        self.purpose = Purpose::Patrol {
            origin: self.coord,
            target,
        };
        self.attack_target = None;
    }

    /// Attack one entity.
    pub fn order_attack_unit(&mut self, target: EntityId) {
        self.purpose = Purpose::AttackUnit(target);
        self.attack_target = Some(target);
        self.path.clear();
    }

    /// Attack-move to a tile.
    pub fn order_attack_position(&mut self, target: CubeCoord) {
        self.purpose = Purpose::AttackPosition(target);
        self.attack_target = None;
        self.path.clear();
    }
}

/// Storage for all entities.
///
/// A `BTreeMap` keeps iteration in id order, which is the stepping order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityStorage {
    entities: BTreeMap<EntityId, Entity>,
    next_id: EntityId,
}

impl Default for EntityStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStorage {
    /// Empty storage. Ids start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Assign the next id to `entity` and store it.
    pub fn insert(&mut self, mut entity: Entity) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        entity.id = id;
        self.entities.insert(id, entity);
        id
    }

    /// Remove by id.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    /// Put back an entity taken with [`remove`](Self::remove), keeping its id.
    pub(crate) fn restore(&mut self, entity: Entity) {
        self.entities.insert(entity.id, entity);
    }

    /// Entity by id.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Mutable entity by id.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Living entity by id.
    #[must_use]
    pub fn get_alive(&self, id: EntityId) -> Option<&Entity> {
        self.get(id).filter(|e| e.is_alive())
    }

    /// Whether `id` is stored.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Number of stored entities, dead ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// No entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Ids in ascending order.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    /// Entities in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Mutable entities in id order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    /// Nearest living enemy of `owner` within `range` of `origin`.
    ///
    /// Ties go to the lower id.
    #[must_use]
    pub fn nearest_enemy(&self, owner: PlayerId, origin: CubeCoord, range: i32) -> Option<EntityId> {
        self.iter()
            .filter(|e| e.is_enemy_of(owner))
            .map(|e| (e.coord.distance(origin), e.id))
            .filter(|(d, _)| *d <= range)
            .min()
            .map(|(_, id)| id)
    }

    /// Nearest drop-off building of `owner`, optionally of one building type.
    ///
    /// Linear scan with no caching; ties go to the lower id.
    #[must_use]
    pub fn nearest_drop_off(&self, owner: PlayerId, from: CubeCoord, type_id: Option<&str>) -> Option<EntityId> {
        self.iter()
            .filter(|e| e.is_drop_off_for(owner))
            .filter(|e| type_id.map_or(true, |t| e.type_id == t))
            .map(|e| (e.coord.distance(from), e.id))
            .min()
            .map(|(_, id)| id)
    }
}
