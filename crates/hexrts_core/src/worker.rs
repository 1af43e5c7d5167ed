//! Worker behaviour: gathering, returning loads and construction.

use serde::{Deserialize, Serialize};

use crate::building::ConstructionOutcome;
use crate::components::{Action, EntityId, Purpose};
use crate::data::WorkerData;
use crate::entity::{Entity, EntityKind};
use crate::unit::{approach, go_idle, Flow, StepContext};

/// Worker-specific entity state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerState {
    /// Most carried per trip.
    pub max_carry_capacity: i32,
    /// Ticks per construction work action.
    pub ticks_per_work_action: i32,
    /// Construction progress added per work action.
    pub build_power_per_action: i32,
    /// Amount currently carried.
    pub carried: i32,
    /// Resource type of the load.
    pub carried_type: Option<String>,
    /// Last node gathered from; resumed after a deposit.
    pub gather_node: Option<EntityId>,
    work_progress_ticks: i32,
}

impl WorkerState {
    /// Empty-handed worker.
    #[must_use]
    pub fn from_data(data: &WorkerData) -> Self {
        Self {
            max_carry_capacity: data.max_carry_capacity.max(1),
            ticks_per_work_action: data.ticks_per_work_action.max(1),
            build_power_per_action: data.build_power_per_action.max(0),
            carried: 0,
            carried_type: None,
            gather_node: None,
            work_progress_ticks: 0,
        }
    }

    /// Carrying a full load.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.carried >= self.max_carry_capacity
    }

    /// Ticks spent toward the next construction work action.
    #[must_use]
    pub const fn work_progress_ticks(&self) -> i32 {
        self.work_progress_ticks
    }

    /// Put `amount` of `resource` in the hands.
    ///
    /// A different resource type replaces the load rather than mixing.
    fn load(&mut self, resource: &str, amount: i32) {
        match self.carried_type.as_deref() {
            Some(current) if current != resource => {
                tracing::warn!(
                    dropped = self.carried,
                    dropped_type = current,
                    picked_up = resource,
                    "Gathered a different resource, dropping the current load"
                );
                self.carried = amount;
            }
            _ => self.carried += amount,
        }
        self.carried_type = Some(resource.to_string());
    }

    fn unload(&mut self) -> Option<(String, i32)> {
        let resource = self.carried_type.take()?;
        let amount = std::mem::take(&mut self.carried);
        Some((resource, amount))
    }
}

impl Entity {
    /// Harvest `node`. Non-workers ignore the order.
    pub fn order_gather(&mut self, node: EntityId) {
        let Some(worker) = self.worker_mut() else {
            return;
        };
        worker.gather_node = Some(node);
        self.purpose = Purpose::Gather(node);
        self.attack_target = None;
    }

    /// Carry the load to `drop_off`, or to the nearest drop-off when `None`.
    pub fn order_return(&mut self, drop_off: Option<EntityId>) {
        if self.worker().is_none() {
            return;
        }
        self.purpose = Purpose::ReturnResource { drop_off };
        self.attack_target = None;
    }

    /// Construct `building`.
    pub fn order_build(&mut self, building: EntityId) {
        let Some(worker) = self.worker_mut() else {
            return;
        };
        worker.work_progress_ticks = 0;
        self.purpose = Purpose::Build(building);
        self.attack_target = None;
    }
}

pub(crate) fn resolve_purpose(entity: &mut Entity, ctx: &mut StepContext<'_>) -> Flow {
    let purpose = entity.purpose;
    match purpose {
        Purpose::Gather(node) => resolve_gather(entity, ctx, node),
        Purpose::ReturnResource { drop_off } => resolve_return(entity, ctx, drop_off),
        Purpose::Build(building) => resolve_build(entity, ctx, building),
        _ => Flow::Settled,
    }
}

fn resolve_gather(entity: &mut Entity, ctx: &mut StepContext<'_>, node_id: EntityId) -> Flow {
    let node_coord = ctx
        .entities
        .get_alive(node_id)
        .filter(|e| e.resource_node().is_some_and(|n| !n.is_depleted()))
        .map(|e| e.coord);
    let Some(worker) = entity.worker_mut() else {
        return Flow::Settled;
    };
    worker.gather_node = Some(node_id);

    let Some(node_coord) = node_coord else {
        worker.gather_node = None;
        if worker.carried > 0 {
            entity.purpose = Purpose::ReturnResource { drop_off: None };
            return Flow::Reevaluate;
        }
        go_idle(entity);
        return Flow::Settled;
    };
    if worker.is_full() {
        entity.purpose = Purpose::ReturnResource { drop_off: None };
        return Flow::Reevaluate;
    }

    if entity.coord.distance(node_coord) <= 1 {
        entity.path.clear();
        entity.action = Action::Gathering;
    } else if approach(entity, ctx.grid, node_coord) {
        entity.action = Action::Moving;
    } else {
        tracing::debug!(entity = entity.id, node = node_id, "Resource node unreachable");
        go_idle(entity);
    }
    Flow::Settled
}

fn resolve_return(entity: &mut Entity, ctx: &mut StepContext<'_>, drop_off: Option<EntityId>) -> Flow {
    let carried = entity.worker().map_or(0, |w| w.carried);
    if carried <= 0 {
        return resume_gathering(entity, ctx);
    }

    let explicit = drop_off.filter(|id| {
        ctx.entities
            .get(*id)
            .is_some_and(|b| b.is_drop_off_for(entity.owner))
    });
    let Some(drop_id) = explicit.or_else(|| ctx.entities.nearest_drop_off(entity.owner, entity.coord, None))
    else {
        tracing::warn!(entity = entity.id, owner = entity.owner, "No drop-off available");
        go_idle(entity);
        return Flow::Settled;
    };
    entity.purpose = Purpose::ReturnResource {
        drop_off: Some(drop_id),
    };
    let Some(drop_coord) = ctx.entities.get(drop_id).map(|b| b.coord) else {
        return Flow::Settled;
    };

    if entity.coord.distance(drop_coord) <= 1 {
        entity.path.clear();
        if let Some((resource, amount)) = entity.worker_mut().and_then(WorkerState::unload) {
            ctx.ledger.add(entity.owner, &resource, amount);
            tracing::debug!(entity = entity.id, %resource, amount, "Deposited load");
        }
        return resume_gathering(entity, ctx);
    }
    if approach(entity, ctx.grid, drop_coord) {
        entity.action = Action::Moving;
    } else {
        tracing::debug!(entity = entity.id, drop_off = drop_id, "Drop-off unreachable");
        go_idle(entity);
    }
    Flow::Settled
}

/// Back to the remembered node if it still has resources, else idle.
fn resume_gathering(entity: &mut Entity, ctx: &StepContext<'_>) -> Flow {
    let node = entity
        .worker()
        .and_then(|w| w.gather_node)
        .filter(|id| {
            ctx.entities
                .get_alive(*id)
                .and_then(Entity::resource_node)
                .is_some_and(|n| !n.is_depleted())
        });
    match node {
        Some(node) => {
            entity.purpose = Purpose::Gather(node);
            Flow::Reevaluate
        }
        None => {
            go_idle(entity);
            Flow::Settled
        }
    }
}

fn resolve_build(entity: &mut Entity, ctx: &mut StepContext<'_>, building_id: EntityId) -> Flow {
    let site = ctx
        .entities
        .get_alive(building_id)
        .filter(|e| e.owner == entity.owner)
        .filter(|e| e.building().is_some_and(|b| !b.is_constructed()))
        .map(|e| e.coord);
    let Some(site) = site else {
        go_idle(entity);
        return Flow::Settled;
    };
    if entity.coord.distance(site) <= 1 {
        entity.path.clear();
        entity.action = Action::Building;
    } else if approach(entity, ctx.grid, site) {
        entity.action = Action::Moving;
    } else {
        tracing::debug!(entity = entity.id, building = building_id, "Build site unreachable");
        go_idle(entity);
    }
    Flow::Settled
}

pub(crate) fn execute_action(entity: &mut Entity, ctx: &mut StepContext<'_>) {
    match (entity.action, entity.purpose) {
        (Action::Gathering, Purpose::Gather(node)) => gather(entity, ctx, node),
        (Action::Building, Purpose::Build(building)) => build(entity, ctx, building),
        _ => {}
    }
}

fn gather(entity: &mut Entity, ctx: &mut StepContext<'_>, node_id: EntityId) {
    let Some(worker) = entity.worker_mut() else {
        return;
    };
    let room = worker.max_carry_capacity - worker.carried;
    let Some(node) = ctx
        .entities
        .get_mut(node_id)
        .and_then(Entity::resource_node_mut)
    else {
        return;
    };
    let taken = node.gather(node.amount_per_gather_tick.min(room));
    if taken > 0 {
        worker.load(&node.resource_type, taken);
    }
    if worker.is_full() {
        entity.purpose = Purpose::ReturnResource { drop_off: None };
    }
}

fn build(entity: &mut Entity, ctx: &mut StepContext<'_>, building_id: EntityId) {
    let Some(worker) = entity.worker_mut() else {
        return;
    };
    worker.work_progress_ticks += 1;
    if worker.work_progress_ticks < worker.ticks_per_work_action {
        return;
    }
    worker.work_progress_ticks = 0;
    let power = worker.build_power_per_action;

    let Some(target) = ctx.entities.get_mut(building_id) else {
        return;
    };
    let Entity {
        owner,
        health,
        kind: EntityKind::Building(building),
        ..
    } = target
    else {
        return;
    };
    if building.advance_construction(power, health) != ConstructionOutcome::Completed {
        return;
    }
    if building.grant_supply() {
        ctx.ledger
            .adjust_cap(*owner, &ctx.config.supply_resource, building.supply_provided());
    }
    ctx.events.buildings_completed.push(building_id);
    tracing::info!(building = building_id, builder = entity.id, tick = ctx.tick, "Construction complete");
    go_idle(entity);
}
