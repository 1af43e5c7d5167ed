//! Group destination spreading.
//!
//! One target tile becomes one destination per agent: the target itself,
//! then the walkable tiles of ring 1, ring 2 and so on around it.

use std::collections::HashSet;

use crate::hex::{CubeCoord, HexGrid};

/// Ring expansions attempted before giving up, for `agent_count` agents.
#[must_use]
pub const fn safety_bound(agent_count: usize) -> usize {
    agent_count * 5 + 10
}

/// Compute one destination per agent, in agent order.
///
/// Always returns exactly `agent_count` coordinates. When the target is
/// invalid or blocked every agent receives the target; when the map runs
/// out of free tiles the remaining agents share the last assigned tile.
#[must_use]
pub fn positions(target: CubeCoord, agent_count: usize, grid: &HexGrid) -> Vec<CubeCoord> {
    if agent_count == 0 {
        return Vec::new();
    }
    if !grid.is_walkable(target) {
        tracing::warn!(%target, agent_count, "Formation target is invalid or unwalkable");
        return vec![target; agent_count];
    }
    if agent_count == 1 {
        return vec![target];
    }

    let mut assigned = Vec::with_capacity(agent_count);
    let mut used = HashSet::with_capacity(agent_count);
    assigned.push(target);
    used.insert(target);

    let bound = safety_bound(agent_count);
    let mut radius = 1u32;
    let mut iterations = 0usize;
    while assigned.len() < agent_count && iterations < bound {
        iterations += 1;
        let ring = grid.ring(target, radius);
        if ring.is_empty() && radius as usize > agent_count {
            break;
        }
        for coord in ring {
            if grid.is_walkable(coord) && used.insert(coord) {
                assigned.push(coord);
                if assigned.len() == agent_count {
                    break;
                }
            }
        }
        radius += 1;
    }

    if assigned.len() < agent_count {
        tracing::warn!(
            %target,
            agent_count,
            found = assigned.len(),
            "Not enough free tiles for formation"
        );
        let fill = assigned.last().copied().unwrap_or(target);
        assigned.resize(agent_count, fill);
    }
    assigned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex::{HexOrientation, DIRECTIONS};

    #[test]
    fn test_empty_and_single() {
        let grid = HexGrid::hexagon(2, HexOrientation::PointyTop);
        assert!(positions(CubeCoord::ORIGIN, 0, &grid).is_empty());
        assert_eq!(positions(CubeCoord::ORIGIN, 1, &grid), vec![CubeCoord::ORIGIN]);
    }

    #[test]
    fn test_first_ring_order() {
        let grid = HexGrid::hexagon(3, HexOrientation::PointyTop);
        let result = positions(CubeCoord::ORIGIN, 3, &grid);
        assert_eq!(result[0], CubeCoord::ORIGIN);
        // Ring 1 starts at direction 4 and walks direction 0 next.
        assert_eq!(result[1], DIRECTIONS[4]);
        assert_eq!(result[2], DIRECTIONS[4] + DIRECTIONS[0]);
    }

    #[test]
    fn test_spills_into_second_ring() {
        let grid = HexGrid::hexagon(3, HexOrientation::PointyTop);
        let result = positions(CubeCoord::ORIGIN, 9, &grid);
        assert_eq!(result.len(), 9);
        let unique: HashSet<_> = result.iter().collect();
        assert_eq!(unique.len(), 9);
        assert_eq!(result.iter().filter(|c| c.distance(CubeCoord::ORIGIN) == 2).count(), 2);
    }

    #[test]
    fn test_skips_blocked_tiles() {
        let mut grid = HexGrid::hexagon(3, HexOrientation::PointyTop);
        grid.set_walkable(DIRECTIONS[4], false);
        let result = positions(CubeCoord::ORIGIN, 2, &grid);
        assert_eq!(result[1], DIRECTIONS[4] + DIRECTIONS[0]);
    }

    #[test]
    fn test_blocked_target_gives_target_to_all() {
        let mut grid = HexGrid::hexagon(2, HexOrientation::PointyTop);
        grid.set_walkable(CubeCoord::ORIGIN, false);
        assert_eq!(positions(CubeCoord::ORIGIN, 4, &grid), vec![CubeCoord::ORIGIN; 4]);
        let off_map = CubeCoord::axial(10, 0);
        assert_eq!(positions(off_map, 2, &grid), vec![off_map; 2]);
    }

    #[test]
    fn test_crowded_map_repeats_last() {
        let grid = HexGrid::hexagon(1, HexOrientation::PointyTop);
        let result = positions(CubeCoord::ORIGIN, 10, &grid);
        assert_eq!(result.len(), 10);
        let last_unique = result[6];
        assert!(result[7..].iter().all(|c| *c == last_unique));
    }
}
