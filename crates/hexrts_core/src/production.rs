//! Building production: advancing the queue and spawning finished units.
//!
//! Costs and supply are charged when a unit is queued (see
//! [`Simulation::enqueue_production`](crate::simulation::Simulation::enqueue_production)),
//! so completion here only has to place the unit.

use crate::entity::Entity;
use crate::simulation::ProductionComplete;
use crate::unit::StepContext;

/// One production tick for a building entity.
pub(crate) fn step(entity: &mut Entity, ctx: &mut StepContext<'_>) {
    let building_id = entity.id;
    let owner = entity.owner;
    let center = entity.coord;
    let registry = ctx.registry;
    let Some(building) = entity.building_mut() else {
        return;
    };
    let Some(unit_type) =
        building.tick_production(|id| registry.unit(id).map_or(1, |u| u.creation_time_ticks))
    else {
        return;
    };
    let Some(data) = registry.unit(&unit_type) else {
        tracing::warn!(building = building_id, unit = %unit_type, "Finished unit has no definition, discarding");
        return;
    };
    let Some(spawn) = ctx.grid.first_walkable_neighbor(center) else {
        tracing::warn!(building = building_id, unit = %unit_type, "No free tile to spawn on, retrying");
        building.retry_completion(unit_type, data.creation_time_ticks);
        return;
    };
    let rally = building.rally_point(center, ctx.grid);

    let mut unit = Entity::from_unit_data(owner, data, spawn, ctx.grid.cube_to_world(spawn));
    unit.supply_held = data.supply_cost.max(0);
    if rally != spawn {
        unit.order_move(rally);
    }
    let unit_id = ctx.entities.insert(unit);

    ctx.events.spawned.push(unit_id);
    ctx.events.production_complete.push(ProductionComplete {
        building: building_id,
        unit: unit_id,
        unit_type: unit_type.clone(),
    });
    tracing::info!(building = building_id, unit = unit_id, %unit_type, tick = ctx.tick, "Unit produced");
}
