//! Proptest strategies for property-based testing.
//!
//! These strategies generate random but reproducible inputs: coordinates,
//! blocked-tile layouts, commands and ledger operations.

use proptest::prelude::*;

use hexrts_core::command::CommandKind;
use hexrts_core::components::EntityId;
use hexrts_core::hex::{CubeCoord, HexGrid, HexOrientation};

/// Any coordinate within `radius` of the origin.
pub fn arb_coord(radius: i32) -> impl Strategy<Value = CubeCoord> {
    (-radius..=radius, -radius..=radius)
        .prop_filter("inside hexagon", move |&(q, r)| (q + r).abs() <= radius)
        .prop_map(|(q, r)| CubeCoord::axial(q, r))
}

/// Hexagonal grid of `radius` with up to `max_blocked` unwalkable tiles.
///
/// The origin is always left walkable.
pub fn arb_blocked_grid(radius: u32, max_blocked: usize) -> impl Strategy<Value = HexGrid> {
    #[allow(clippy::cast_possible_wrap)]
    let r = radius as i32;
    proptest::collection::vec(arb_coord(r), 0..=max_blocked).prop_map(move |blocked| {
        let mut grid = HexGrid::hexagon(radius, HexOrientation::PointyTop);
        for coord in blocked.into_iter().filter(|c| *c != CubeCoord::ORIGIN) {
            grid.set_walkable(coord, false);
        }
        grid
    })
}

/// Movement cost between 1 and 5.
pub fn arb_movement_cost() -> impl Strategy<Value = i32> {
    1i32..=5
}

/// Movement-style command targeting a coordinate within `radius`.
pub fn arb_movement_command(radius: i32) -> impl Strategy<Value = CommandKind> {
    prop_oneof![
        arb_coord(radius).prop_map(CommandKind::Move),
        arb_coord(radius).prop_map(CommandKind::AttackPosition),
        arb_coord(radius).prop_map(CommandKind::Patrol),
        Just(CommandKind::Stop),
        Just(CommandKind::HoldPosition),
    ]
}

/// Command aimed at one of `targets`, or a movement command.
pub fn arb_command(radius: i32, targets: Vec<EntityId>) -> impl Strategy<Value = CommandKind> {
    let targets = if targets.is_empty() { vec![0] } else { targets };
    prop_oneof![
        3 => arb_movement_command(radius),
        1 => proptest::sample::select(targets).prop_map(CommandKind::AttackUnit),
    ]
}

/// Command sequence as `(tick offset, command)` pairs.
pub fn arb_command_script(radius: i32, max_len: usize) -> impl Strategy<Value = Vec<(u64, CommandKind)>> {
    proptest::collection::vec((0u64..40, arb_movement_command(radius)), 0..max_len)
}

/// One ledger mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOp {
    /// Add the amount.
    Add(i32),
    /// Try to consume the amount.
    Consume(i32),
    /// Set a new cap.
    SetCap(i32),
}

/// Random ledger operation, including non-positive amounts.
pub fn arb_ledger_op() -> impl Strategy<Value = LedgerOp> {
    prop_oneof![
        (-50i32..500).prop_map(LedgerOp::Add),
        (-50i32..500).prop_map(LedgerOp::Consume),
        (-10i32..1000).prop_map(LedgerOp::SetCap),
    ]
}
