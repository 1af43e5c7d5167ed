//! Per-tick entity behaviour: purpose resolution, movement and combat.
//!
//! A step runs in three stages. The attack cooldown drains, the purpose is
//! turned into an action (the purpose itself may be rewritten along the
//! way, e.g. a dead attack target drops the unit back to idle), and then
//! the action is carried out. Gather, return and build purposes belong to
//! [`worker`](crate::worker); building production to
//! [`production`](crate::production).

use crate::components::{Action, EntityId, Purpose};
use crate::config::SimConfig;
use crate::data::DataRegistry;
use crate::entity::{Entity, EntityStorage};
use crate::hex::{CubeCoord, HexGrid};
use crate::ledger::ResourceLedger;
use crate::pathfinding;
use crate::simulation::{DamageEvent, TickEvents};
use crate::{production, worker};

/// Purpose rewrites allowed in one step before the entity is idled.
const MAX_TRANSITIONS_PER_STEP: usize = 4;

/// Everything an entity may touch while it steps.
///
/// The stepping entity itself is held outside `entities` for the duration.
pub(crate) struct StepContext<'a> {
    pub grid: &'a mut HexGrid,
    pub ledger: &'a mut ResourceLedger,
    pub entities: &'a mut EntityStorage,
    pub registry: &'a DataRegistry,
    pub config: &'a SimConfig,
    pub events: &'a mut TickEvents,
    pub tick: u64,
}

/// Outcome of one purpose resolution pass.
pub(crate) enum Flow {
    /// Action chosen.
    Settled,
    /// Purpose changed; resolve again.
    Reevaluate,
}

/// Advance one entity by one tick.
pub(crate) fn step(entity: &mut Entity, ctx: &mut StepContext<'_>) {
    entity.begin_render_step();
    if entity.is_dead() {
        return;
    }
    if entity.attack_cooldown > 0 {
        entity.attack_cooldown -= 1;
    }

    if entity.building().is_some() {
        production::step(entity, ctx);
    } else if entity.is_unit() {
        determine_action(entity, ctx);
        execute_action(entity, ctx);
    }

    entity.end_render_step(ctx.grid);
}

fn determine_action(entity: &mut Entity, ctx: &mut StepContext<'_>) {
    for _ in 0..MAX_TRANSITIONS_PER_STEP {
        if let Flow::Settled = resolve_purpose(entity, ctx) {
            return;
        }
    }
    tracing::warn!(entity = entity.id, purpose = ?entity.purpose, "Purpose did not settle, idling");
    go_idle(entity);
}

fn resolve_purpose(entity: &mut Entity, ctx: &mut StepContext<'_>) -> Flow {
    let purpose = entity.purpose;
    match purpose {
        Purpose::Idle => {
            entity.action = Action::Idle;
            entity.path.clear();
            Flow::Settled
        }
        Purpose::Dead => {
            entity.action = Action::Dead;
            Flow::Settled
        }
        Purpose::MoveToPosition(target) => {
            if entity.coord == target {
                go_idle(entity);
            } else if ensure_path(entity, ctx.grid, target) {
                entity.action = Action::Moving;
            } else {
                tracing::debug!(entity = entity.id, %target, "Move target unreachable");
                go_idle(entity);
            }
            Flow::Settled
        }
        Purpose::AttackUnit(target_id) => resolve_attack_unit(entity, ctx, target_id),
        Purpose::AttackPosition(target) => resolve_attack_position(entity, ctx, target),
        Purpose::Hold => {
            resolve_hold(entity, ctx);
            Flow::Settled
        }
        Purpose::Patrol { origin, target } => resolve_patrol(entity, ctx, origin, target),
        Purpose::Gather(_) | Purpose::ReturnResource { .. } | Purpose::Build(_) => {
            if entity.worker().is_some() {
                worker::resolve_purpose(entity, ctx)
            } else {
                tracing::warn!(entity = entity.id, purpose = ?entity.purpose, "Worker purpose on non-worker");
                go_idle(entity);
                Flow::Settled
            }
        }
    }
}

fn resolve_attack_unit(entity: &mut Entity, ctx: &mut StepContext<'_>, target_id: EntityId) -> Flow {
    let Some(target_coord) = ctx.entities.get_alive(target_id).map(|t| t.coord) else {
        tracing::debug!(entity = entity.id, target = target_id, "Attack target gone");
        go_idle(entity);
        return Flow::Settled;
    };
    entity.attack_target = Some(target_id);
    if entity.coord.distance(target_coord) <= entity.stats.attack_range {
        entity.path.clear();
        entity.action = Action::Attacking;
    } else if approach(entity, ctx.grid, target_coord) {
        entity.action = Action::Moving;
    } else {
        tracing::debug!(entity = entity.id, target = target_id, "Attack target unreachable");
        go_idle(entity);
    }
    Flow::Settled
}

fn resolve_attack_position(entity: &mut Entity, ctx: &mut StepContext<'_>, target: CubeCoord) -> Flow {
    if let Some(enemy) = ctx
        .entities
        .nearest_enemy(entity.owner, target, entity.stats.vision_range)
    {
        entity.purpose = Purpose::AttackUnit(enemy);
        entity.attack_target = Some(enemy);
        return Flow::Reevaluate;
    }
    if entity.coord == target {
        go_idle(entity);
    } else if ensure_path(entity, ctx.grid, target) {
        entity.action = Action::Moving;
    } else {
        go_idle(entity);
    }
    Flow::Settled
}

/// Rooted: attack the nearest visible enemy only if it is already in range.
fn resolve_hold(entity: &mut Entity, ctx: &StepContext<'_>) {
    entity.path.clear();
    let in_range = ctx
        .entities
        .nearest_enemy(entity.owner, entity.coord, entity.stats.vision_range)
        .filter(|id| {
            ctx.entities
                .get(*id)
                .is_some_and(|t| t.coord.distance(entity.coord) <= entity.stats.attack_range)
        });
    entity.attack_target = in_range;
    entity.action = if in_range.is_some() {
        Action::Attacking
    } else {
        Action::Idle
    };
}

fn resolve_patrol(entity: &mut Entity, ctx: &mut StepContext<'_>, origin: CubeCoord, target: CubeCoord) -> Flow {
    if origin == target {
        entity.path.clear();
        entity.action = Action::Idle;
        return Flow::Settled;
    }
    if entity.coord == target {
        entity.purpose = Purpose::Patrol {
            origin: target,
            target: origin,
        };
        return Flow::Reevaluate;
    }
    if ensure_path(entity, ctx.grid, target) {
        entity.action = Action::Moving;
    } else {
        tracing::debug!(entity = entity.id, %target, "Patrol leg unreachable");
        go_idle(entity);
    }
    Flow::Settled
}

fn execute_action(entity: &mut Entity, ctx: &mut StepContext<'_>) {
    let action = entity.action;
    match action {
        Action::Idle | Action::Dead => {}
        Action::Moving => move_along_path(entity, ctx.grid, ctx.config),
        Action::Attacking => attack(entity, ctx),
        Action::Gathering | Action::Building => worker::execute_action(entity, ctx),
    }
}

/// Spend this tick's movement points on the path.
///
/// Entering a tile costs `move_points_per_tile` times the tile's movement
/// cost. Unspent points stay in the accumulator for the next tick.
fn move_along_path(entity: &mut Entity, grid: &HexGrid, config: &SimConfig) {
    entity.path.add_points(entity.stats.move_points_per_tick);
    while let Some(next) = entity.path.next_waypoint() {
        let Some(tile) = grid.tile_at(next).filter(|t| t.walkable) else {
            tracing::debug!(entity = entity.id, %next, "Next waypoint blocked");
            go_idle(entity);
            return;
        };
        let cost = config.move_points_per_tile.saturating_mul(tile.movement_cost);
        if !entity.path.try_advance(cost) {
            break;
        }
        entity.coord = next;
    }
}

fn attack(entity: &mut Entity, ctx: &mut StepContext<'_>) {
    let Some(target_id) = entity.attack_target else {
        entity.action = Action::Idle;
        return;
    };
    let Some(target_coord) = ctx.entities.get_alive(target_id).map(|t| t.coord) else {
        entity.attack_target = None;
        entity.action = Action::Idle;
        return;
    };
    if entity.coord.distance(target_coord) > entity.stats.attack_range {
        if entity.purpose != Purpose::Hold {
            approach(entity, ctx.grid, target_coord);
        }
        return;
    }
    if entity.attack_cooldown > 0 {
        return;
    }
    if apply_damage(ctx, entity.id, target_id, entity.stats.attack_damage) {
        entity.attack_target = None;
    }
    entity.attack_cooldown = entity.stats.attack_cooldown_ticks;
}

/// Damage `target_id`, running death bookkeeping on the killing blow.
///
/// Returns `true` if this hit killed the target.
pub(crate) fn apply_damage(ctx: &mut StepContext<'_>, attacker: EntityId, target_id: EntityId, amount: i32) -> bool {
    let Some(target) = ctx.entities.get_mut(target_id) else {
        return false;
    };
    ctx.events.damage.push(DamageEvent {
        attacker,
        target: target_id,
        amount,
    });
    if !target.take_damage(amount) {
        return false;
    }
    let registry = ctx.registry;
    target.on_death(ctx.grid, ctx.ledger, &ctx.config.supply_resource, |unit_id| {
        registry.unit(unit_id).map_or(0, |data| data.supply_cost)
    });
    ctx.events.deaths.push(target_id);
    tracing::info!(entity = target_id, killer = attacker, tick = ctx.tick, "Entity died");
    true
}

/// Purpose and action back to idle, path and target dropped.
pub(crate) fn go_idle(entity: &mut Entity) {
    entity.purpose = Purpose::Idle;
    entity.action = Action::Idle;
    entity.attack_target = None;
    entity.path.clear();
}

/// Keep the current path if it already ends at `destination`, else search
/// a new one. Returns `false` when no path exists.
pub(crate) fn ensure_path(entity: &mut Entity, grid: &HexGrid, destination: CubeCoord) -> bool {
    if entity.path.destination() == Some(destination) {
        return true;
    }
    let path = pathfinding::find_path(grid, entity.coord, destination);
    if path.is_empty() {
        entity.path.clear();
        return false;
    }
    entity.path.set(path);
    true
}

/// Path toward `target`: the tile itself if walkable, otherwise its
/// walkable neighbour closest to the entity.
pub(crate) fn approach(entity: &mut Entity, grid: &HexGrid, target: CubeCoord) -> bool {
    let destination = if grid.is_walkable(target) {
        Some(target)
    } else {
        grid.nearest_walkable_adjacent(target, entity.coord)
    };
    match destination {
        Some(dest) if dest != entity.coord => ensure_path(entity, grid, dest),
        _ => false,
    }
}
