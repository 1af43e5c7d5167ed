//! Test fixtures and helpers.
//!
//! Pre-built registries, grids and game states for consistent testing.
//! Every fixture is deterministic: calling it twice yields simulations with
//! identical state hashes.

use fixed::types::I32F32;
use hexrts_core::command::CommandKind;
use hexrts_core::components::{EntityId, PlayerId};
use hexrts_core::config::{PlayerSetup, SimConfig, StartingResource};
use hexrts_core::data::{DataRegistry, GameData};
use hexrts_core::economy::ResourceNode;
use hexrts_core::formation;
use hexrts_core::hex::{CubeCoord, HexGrid, HexOrientation};
use hexrts_core::simulation::Simulation;

/// First test player.
pub const PLAYER_A: PlayerId = 1;
/// Second test player.
pub const PLAYER_B: PlayerId = 2;
/// Primary resource.
pub const MINERAL: &str = "Mineral";
/// Supply resource name used by [`SimConfig::default`].
pub const SUPPLY: &str = "Supply";

/// Unit and building definitions shared by the fixtures.
pub const TEST_DATA_RON: &str = r#"
GameData(
    units: [
        (
            id: "worker",
            max_health: 40,
            move_points_per_tick: 250,
            attack_damage: 3,
            creation_cost: [(resource: "Mineral", amount: 50)],
            creation_time_ticks: 40,
            supply_cost: 1,
            worker: Some((
                max_carry_capacity: 10,
                ticks_per_work_action: 5,
                build_power_per_action: 10,
                buildable_building_ids: ["depot", "barracks"],
            )),
        ),
        (
            id: "marine",
            max_health: 40,
            move_points_per_tick: 250,
            attack_damage: 6,
            attack_range: 3,
            attack_cooldown_ticks: 10,
            vision_range: 6,
            creation_cost: [(resource: "Mineral", amount: 50)],
            creation_time_ticks: 60,
            supply_cost: 1,
        ),
        (
            id: "scout",
            max_health: 20,
            move_points_per_tick: 1000,
            attack_damage: 0,
            vision_range: 8,
        ),
    ],
    buildings: [
        (
            id: "depot",
            max_health: 1000,
            creation_cost: [(resource: "Mineral", amount: 100)],
            creation_time_ticks: 100,
            can_produce_units: true,
            producible_unit_ids: ["worker"],
            acts_as_resource_drop_off: true,
            supply_provided: 10,
        ),
        (
            id: "barracks",
            max_health: 800,
            creation_cost: [(resource: "Mineral", amount: 150)],
            creation_time_ticks: 120,
            can_produce_units: true,
            producible_unit_ids: ["marine"],
        ),
    ],
)
"#;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Registry parsed from [`TEST_DATA_RON`].
///
/// # Panics
///
/// Panics if the embedded RON is malformed.
#[must_use]
pub fn test_registry() -> DataRegistry {
    let data = GameData::from_ron_str(TEST_DATA_RON, "fixtures").expect("fixture data parses");
    DataRegistry::from_game_data(data)
}

/// Hexagonal pointy-top grid.
#[must_use]
pub fn test_grid(radius: u32) -> HexGrid {
    HexGrid::hexagon(radius, HexOrientation::PointyTop)
}

/// Starting state: 1000 minerals and a supply cap of `supply_cap`.
#[must_use]
pub fn player_setup(id: PlayerId, supply_cap: i32) -> PlayerSetup {
    PlayerSetup {
        id,
        resources: vec![
            StartingResource {
                resource: MINERAL.into(),
                amount: 1000,
                cap: 0,
            },
            StartingResource {
                resource: SUPPLY.into(),
                amount: 0,
                cap: supply_cap,
            },
        ],
    }
}

/// Empty map of `radius` with both test players set up.
#[must_use]
pub fn sandbox(radius: u32) -> Simulation {
    let mut sim = Simulation::new(test_grid(radius), test_registry(), SimConfig::default());
    sim.setup_player(&player_setup(PLAYER_A, 20));
    sim.setup_player(&player_setup(PLAYER_B, 20));
    sim
}

/// Spawn `count` units of `unit_type` on free tiles around `center`.
///
/// # Panics
///
/// Panics if the type is unknown or the map is too small.
pub fn spawn_group(
    sim: &mut Simulation,
    unit_type: &str,
    owner: PlayerId,
    center: CubeCoord,
    count: usize,
) -> Vec<EntityId> {
    formation::positions(center, count, sim.grid())
        .into_iter()
        .map(|coord| {
            sim.create_unit(unit_type, owner, coord)
                .expect("fixture unit spawns")
        })
        .collect()
}

/// Handles into the [`economy`] fixture.
#[derive(Debug, Clone)]
pub struct EconomyFixture {
    /// Player A's finished depot.
    pub depot: EntityId,
    /// Player A's workers.
    pub workers: Vec<EntityId>,
    /// Mineral node.
    pub node: EntityId,
}

/// Player A with a depot, `workers` workers and a 500-mineral node five
/// tiles away. No orders are issued.
///
/// # Panics
///
/// Panics if fixture placement fails.
pub fn economy(workers: usize) -> (Simulation, EconomyFixture) {
    let mut sim = sandbox(8);
    let depot = sim
        .place_constructed_building("depot", CubeCoord::axial(-3, 0), PLAYER_A)
        .expect("depot placed");
    let node = sim
        .spawn_resource_node(ResourceNode::new(MINERAL, 500, 5), CubeCoord::axial(2, 0))
        .expect("node placed");
    let workers = spawn_group(&mut sim, "worker", PLAYER_A, CubeCoord::axial(-1, 0), workers);
    (sim, EconomyFixture { depot, workers, node })
}

/// Two marine lines of `per_side` attack-moving into each other.
#[must_use]
pub fn skirmish(per_side: usize) -> Simulation {
    let mut sim = sandbox(10);
    let west = CubeCoord::axial(-5, 0);
    let east = CubeCoord::axial(5, 0);
    let a = spawn_group(&mut sim, "marine", PLAYER_A, west, per_side);
    let b = spawn_group(&mut sim, "marine", PLAYER_B, east, per_side);
    sim.issue(PLAYER_A, a, CommandKind::AttackPosition(east));
    sim.issue(PLAYER_B, b, CommandKind::AttackPosition(west));
    sim
}

/// Economy, construction, production and combat running at once.
///
/// Player A gathers with three workers, builds a barracks and queues
/// workers at its depot; player B sends marines at the gatherers.
///
/// # Panics
///
/// Panics if fixture placement fails.
#[must_use]
pub fn mixed_match() -> Simulation {
    let (mut sim, fx) = economy(4);
    let (builder, gatherers) = fx.workers.split_first().expect("four workers");
    sim.issue(PLAYER_A, gatherers.to_vec(), CommandKind::GatherResource(fx.node));
    sim.issue(
        PLAYER_A,
        vec![*builder],
        CommandKind::BuildBuilding {
            building_type: "barracks".into(),
            coord: CubeCoord::axial(-3, 3),
        },
    );
    sim.issue(
        PLAYER_A,
        vec![fx.depot],
        CommandKind::ProduceUnit {
            unit_type: "worker".into(),
            quantity: 2,
        },
    );
    let raiders = spawn_group(&mut sim, "marine", PLAYER_B, CubeCoord::axial(6, -3), 3);
    sim.issue(PLAYER_B, raiders, CommandKind::AttackPosition(CubeCoord::axial(1, 0)));
    sim
}
