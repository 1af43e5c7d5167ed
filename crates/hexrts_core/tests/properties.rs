//! Property tests for the grid, pathfinding, formations, ledger and
//! construction.

use std::collections::HashSet;

use hexrts_core::building::{Building, ConstructionOutcome};
use hexrts_core::components::Health;
use hexrts_core::data::BuildingData;
use hexrts_core::formation;
use hexrts_core::hex::{CubeCoord, HexGrid, HexOrientation};
use hexrts_core::ledger::ResourceLedger;
use hexrts_core::pathfinding::{find_path, iteration_cap};
use hexrts_test_utils::determinism::verify_simulation_determinism;
use hexrts_test_utils::fixtures;
use hexrts_test_utils::strategies::{arb_blocked_grid, arb_command_script, arb_coord, arb_ledger_op, LedgerOp};
use proptest::prelude::*;

/// Tiles reachable from `start` by breadth-first flood fill.
fn reachable(grid: &HexGrid, start: CubeCoord) -> HashSet<CubeCoord> {
    let mut seen = HashSet::from([start]);
    let mut frontier = vec![start];
    while let Some(coord) = frontier.pop() {
        for tile in grid.neighbors(coord) {
            if tile.walkable && seen.insert(tile.coord) {
                frontier.push(tile.coord);
            }
        }
    }
    seen
}

proptest! {
    #[test]
    fn prop_path_steps_are_walkable_neighbours(
        grid in arb_blocked_grid(6, 40),
        goal in arb_coord(6),
    ) {
        let start = CubeCoord::ORIGIN;
        let path = find_path(&grid, start, goal);
        let connected = grid.is_walkable(goal) && reachable(&grid, start).contains(&goal);

        if goal == start || !connected {
            prop_assert!(path.is_empty());
        } else {
            prop_assert_eq!(path.last().copied(), Some(goal));
            let mut previous = start;
            for step in &path {
                prop_assert_eq!(previous.distance(*step), 1);
                prop_assert!(grid.is_walkable(*step));
                previous = *step;
            }
        }
    }

    #[test]
    fn prop_ring_is_exact_and_unique(
        center in arb_coord(4),
        radius in 1u32..6,
    ) {
        let grid = HexGrid::hexagon(5, HexOrientation::FlatTop);
        let ring = grid.ring(center, radius);
        let unique: HashSet<_> = ring.iter().copied().collect();
        prop_assert_eq!(unique.len(), ring.len());
        prop_assert!(ring.len() <= 6 * radius as usize);
        for coord in &ring {
            prop_assert!(grid.is_valid(*coord));
            prop_assert_eq!(center.distance(*coord), i32::try_from(radius).unwrap());
        }
    }

    #[test]
    fn prop_formation_returns_one_slot_per_agent(
        grid in arb_blocked_grid(3, 30),
        target in arb_coord(5),
        agents in 0usize..60,
    ) {
        let slots = formation::positions(target, agents, &grid);
        prop_assert_eq!(slots.len(), agents);
        if agents > 0 && grid.is_walkable(target) {
            prop_assert_eq!(slots[0], target);
        }
    }

    #[test]
    fn prop_consume_then_add_restores(start in 0i32..10_000, n in 0i32..10_000) {
        let mut ledger = ResourceLedger::new();
        ledger.set_starting(1, "Mineral", start, 0);
        if ledger.try_consume(1, "Mineral", n) {
            ledger.add(1, "Mineral", n);
        }
        prop_assert_eq!(ledger.amount(1, "Mineral"), start);
    }

    #[test]
    fn prop_amount_never_exceeds_cap(ops in proptest::collection::vec(arb_ledger_op(), 0..60)) {
        let mut ledger = ResourceLedger::new();
        ledger.set_starting(1, "Gas", 100, 200);
        for op in ops {
            match op {
                LedgerOp::Add(n) => { ledger.add(1, "Gas", n); }
                LedgerOp::Consume(n) => { ledger.try_consume(1, "Gas", n); }
                LedgerOp::SetCap(cap) => { ledger.update_cap(1, "Gas", cap); }
            }
            let amount = ledger.amount(1, "Gas");
            prop_assert!(amount >= 0);
            // Lowering the cap leaves the amount alone; only adds clamp.
            if let LedgerOp::Add(n) = op {
                if n > 0 {
                    prop_assert!(amount <= ledger.cap(1, "Gas"));
                }
            }
        }
    }

    #[test]
    fn prop_construction_is_monotonic(
        creation_time in 1i32..500,
        powers in proptest::collection::vec(-20i32..80, 1..40),
    ) {
        let data = BuildingData {
            id: "tower".into(),
            creation_time_ticks: creation_time,
            ..BuildingData::default()
        };
        let mut building = Building::from_data(&data, CubeCoord::ORIGIN);
        let mut health = Health::new(data.max_health);
        health.set(1);

        let mut previous = 0;
        let mut completions = 0;
        for power in powers {
            let outcome = building.advance_construction(power, &mut health);
            prop_assert!(building.construction_progress_ticks() >= previous);
            previous = building.construction_progress_ticks();
            if outcome == ConstructionOutcome::Completed {
                completions += 1;
            }
            if completions > 0 {
                prop_assert!(building.is_constructed());
            }
        }
        prop_assert!(completions <= 1);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_scripted_games_are_deterministic(script in arb_command_script(7, 12)) {
        let setup = || {
            let mut sim = fixtures::sandbox(8);
            let units = fixtures::spawn_group(&mut sim, "marine", fixtures::PLAYER_A, CubeCoord::axial(-3, 0), 3);
            fixtures::spawn_group(&mut sim, "marine", fixtures::PLAYER_B, CubeCoord::axial(3, 0), 3);
            for (tick, kind) in &script {
                sim.schedule(hexrts_core::command::Command::new(
                    fixtures::PLAYER_A,
                    units.clone(),
                    *tick,
                    kind.clone(),
                ));
            }
            sim
        };
        prop_assert!(verify_simulation_determinism(setup, 80));
    }
}

#[test]
fn test_enclosed_goal_has_no_path() {
    let mut grid = HexGrid::hexagon(10, HexOrientation::PointyTop);
    let goal = CubeCoord::axial(6, -2);
    let wall = grid.ring(goal, 1);
    for coord in wall {
        grid.set_walkable(coord, false);
    }
    assert!(iteration_cap(&grid) > grid.tile_count());
    assert!(find_path(&grid, CubeCoord::ORIGIN, goal).is_empty());
}
