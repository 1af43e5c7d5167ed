//! Hexagonal grid addressed by cube coordinates.
//!
//! Tiles are generated once from an offset (column, row) rectangle and
//! keyed by [`CubeCoord`]. Walkability is the only tile property the
//! simulation mutates after generation (building placement and removal).
//!
//! # Direction table
//!
//! [`DIRECTIONS`] has a fixed order that `neighbors`, `ring` and the
//! formation solver all rely on. Rings start at `center + DIRECTIONS[4] * radius`.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::{
    Fixed, Vec2Fixed, ONE_THIRD, SQRT_3, SQRT_3_OVER_2, SQRT_3_OVER_3, THREE_HALVES, TWO_THIRDS,
};

/// Cube coordinate of a hex tile. Always satisfies `q + r + s == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "(i32, i32, i32)", into = "(i32, i32, i32)")]
pub struct CubeCoord {
    q: i32,
    r: i32,
    s: i32,
}

/// The six cube directions, in the order every grid walk uses.
pub const DIRECTIONS: [CubeCoord; 6] = [
    CubeCoord::axial(1, 0),
    CubeCoord::axial(1, -1),
    CubeCoord::axial(0, -1),
    CubeCoord::axial(-1, 0),
    CubeCoord::axial(-1, 1),
    CubeCoord::axial(0, 1),
];

/// Index into [`DIRECTIONS`] where ring walks begin.
pub const RING_START_DIRECTION: usize = 4;

impl CubeCoord {
    /// The origin tile.
    pub const ORIGIN: Self = Self::axial(0, 0);

    /// Build from axial `(q, r)`; `s` is derived.
    #[must_use]
    pub const fn axial(q: i32, r: i32) -> Self {
        Self { q, r, s: -q - r }
    }

    /// Build from all three components.
    ///
    /// Returns `None` when `q + r + s != 0`.
    #[must_use]
    pub const fn new(q: i32, r: i32, s: i32) -> Option<Self> {
        if q + r + s == 0 {
            Some(Self { q, r, s })
        } else {
            None
        }
    }

    /// Q component.
    #[must_use]
    pub const fn q(self) -> i32 {
        self.q
    }

    /// R component.
    #[must_use]
    pub const fn r(self) -> i32 {
        self.r
    }

    /// S component.
    #[must_use]
    pub const fn s(self) -> i32 {
        self.s
    }

    /// Grid distance: `(|dq| + |dr| + |ds|) / 2`.
    #[must_use]
    pub const fn distance(self, other: Self) -> i32 {
        ((self.q - other.q).abs() + (self.r - other.r).abs() + (self.s - other.s).abs()) / 2
    }

    /// Neighbouring coordinate in `direction` (taken modulo 6).
    #[must_use]
    pub fn neighbor(self, direction: usize) -> Self {
        self + DIRECTIONS[direction % 6]
    }

    /// Every coordinate at exactly `radius` from `self`, ignoring any grid.
    ///
    /// Radius 0 yields only `self`.
    #[must_use]
    pub fn ring(self, radius: u32) -> Vec<Self> {
        if radius == 0 {
            return vec![self];
        }
        let steps = radius as i32;
        let mut results = Vec::with_capacity(6 * radius as usize);
        let mut current = self + DIRECTIONS[RING_START_DIRECTION] * steps;
        for side in 0..6 {
            for _ in 0..radius {
                results.push(current);
                current = current.neighbor(side);
            }
        }
        results
    }
}

impl fmt::Display for CubeCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.q, self.r, self.s)
    }
}

impl TryFrom<(i32, i32, i32)> for CubeCoord {
    type Error = String;

    fn try_from((q, r, s): (i32, i32, i32)) -> Result<Self, Self::Error> {
        Self::new(q, r, s).ok_or_else(|| format!("cube coordinate ({q}, {r}, {s}) does not sum to 0"))
    }
}

impl From<CubeCoord> for (i32, i32, i32) {
    fn from(c: CubeCoord) -> Self {
        (c.q, c.r, c.s)
    }
}

impl std::ops::Add for CubeCoord {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::axial(self.q + rhs.q, self.r + rhs.r)
    }
}

impl std::ops::Sub for CubeCoord {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::axial(self.q - rhs.q, self.r - rhs.r)
    }
}

impl std::ops::Mul<i32> for CubeCoord {
    type Output = Self;

    fn mul(self, rhs: i32) -> Self::Output {
        Self::axial(self.q * rhs, self.r * rhs)
    }
}

/// Hex layout used for offset and world conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HexOrientation {
    /// Pointy side up; rows are offset ("odd-r").
    #[default]
    PointyTop,
    /// Flat side up; columns are offset ("odd-q").
    FlatTop,
}

impl HexOrientation {
    /// Convert an offset `(col, row)` to cube coordinates.
    #[must_use]
    pub const fn offset_to_cube(self, col: i32, row: i32) -> CubeCoord {
        match self {
            Self::PointyTop => CubeCoord::axial(col - (row - (row & 1)) / 2, row),
            Self::FlatTop => CubeCoord::axial(col, row - (col - (col & 1)) / 2),
        }
    }

    /// Convert cube coordinates back to offset `(col, row)`.
    #[must_use]
    pub const fn cube_to_offset(self, coord: CubeCoord) -> (i32, i32) {
        match self {
            Self::PointyTop => (coord.q + (coord.r - (coord.r & 1)) / 2, coord.r),
            Self::FlatTop => (coord.q, coord.r + (coord.q - (coord.q & 1)) / 2),
        }
    }
}

/// A single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    /// Address of the tile.
    pub coord: CubeCoord,
    /// Centre of the tile in world space.
    pub world_position: Vec2Fixed,
    /// Whether units may enter the tile.
    pub walkable: bool,
    /// Cost of entering the tile (always at least 1).
    pub movement_cost: i32,
}

/// Tile storage plus neighbour, ring and coordinate-conversion queries.
#[derive(Debug, Clone)]
pub struct HexGrid {
    tiles: HashMap<CubeCoord, Tile>,
    /// Generation order, for deterministic enumeration.
    order: Vec<CubeCoord>,
    orientation: HexOrientation,
    hex_size: Fixed,
}

impl HexGrid {
    /// Generate a `width` x `height` offset rectangle of walkable, cost-1 tiles.
    #[must_use]
    pub fn new(width: u32, height: u32, orientation: HexOrientation) -> Self {
        let mut coords = Vec::with_capacity(width as usize * height as usize);
        for row in 0..height as i32 {
            for col in 0..width as i32 {
                coords.push(orientation.offset_to_cube(col, row));
            }
        }
        Self::from_coords(coords, orientation)
    }

    /// Generate a hexagon-shaped map of `radius` around the origin.
    #[must_use]
    pub fn hexagon(radius: u32, orientation: HexOrientation) -> Self {
        let coords = (0..=radius).flat_map(|r| CubeCoord::ORIGIN.ring(r));
        Self::from_coords(coords, orientation)
    }

    /// Build a grid from an explicit coordinate list. Duplicates are ignored.
    pub fn from_coords(coords: impl IntoIterator<Item = CubeCoord>, orientation: HexOrientation) -> Self {
        let mut grid = Self {
            tiles: HashMap::new(),
            order: Vec::new(),
            orientation,
            hex_size: Fixed::from_num(1),
        };
        for coord in coords {
            if grid.tiles.contains_key(&coord) {
                continue;
            }
            let world_position = grid.cube_to_world(coord);
            grid.tiles.insert(
                coord,
                Tile {
                    coord,
                    world_position,
                    walkable: true,
                    movement_cost: 1,
                },
            );
            grid.order.push(coord);
        }
        grid
    }

    /// Set the hex size used for world conversions and refresh tile positions.
    #[must_use]
    pub fn with_hex_size(mut self, hex_size: Fixed) -> Self {
        self.hex_size = hex_size;
        for coord in self.order.clone() {
            let world = self.cube_to_world(coord);
            if let Some(tile) = self.tiles.get_mut(&coord) {
                tile.world_position = world;
            }
        }
        self
    }

    /// Layout orientation.
    #[must_use]
    pub const fn orientation(&self) -> HexOrientation {
        self.orientation
    }

    /// World-space size of one hex.
    #[must_use]
    pub const fn hex_size(&self) -> Fixed {
        self.hex_size
    }

    /// Number of tiles.
    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.order.len()
    }

    /// All coordinates in generation order.
    pub fn coords(&self) -> impl Iterator<Item = CubeCoord> + '_ {
        self.order.iter().copied()
    }

    /// Tile at `coord`, if it exists.
    #[must_use]
    pub fn tile_at(&self, coord: CubeCoord) -> Option<&Tile> {
        self.tiles.get(&coord)
    }

    /// Whether `coord` addresses a tile on this grid.
    #[must_use]
    pub fn is_valid(&self, coord: CubeCoord) -> bool {
        self.tiles.contains_key(&coord)
    }

    /// Whether `coord` exists and is walkable.
    #[must_use]
    pub fn is_walkable(&self, coord: CubeCoord) -> bool {
        self.tiles.get(&coord).is_some_and(|t| t.walkable)
    }

    /// Change walkability of one tile. Returns `false` if the tile is missing.
    pub fn set_walkable(&mut self, coord: CubeCoord, walkable: bool) -> bool {
        match self.tiles.get_mut(&coord) {
            Some(tile) => {
                tile.walkable = walkable;
                true
            }
            None => false,
        }
    }

    /// Change the entry cost of one tile (clamped to at least 1).
    pub fn set_movement_cost(&mut self, coord: CubeCoord, cost: i32) -> bool {
        match self.tiles.get_mut(&coord) {
            Some(tile) => {
                tile.movement_cost = cost.max(1);
                true
            }
            None => false,
        }
    }

    /// Mark every tile of a footprint walkable or blocked.
    ///
    /// Missing tiles in the footprint are skipped.
    pub fn set_occupancy(&mut self, footprint: &[CubeCoord], walkable: bool) {
        for &coord in footprint {
            self.set_walkable(coord, walkable);
        }
    }

    /// Existing neighbour tiles of `coord`, in direction order.
    #[must_use]
    pub fn neighbors(&self, coord: CubeCoord) -> Vec<&Tile> {
        DIRECTIONS
            .iter()
            .filter_map(|&d| self.tiles.get(&(coord + d)))
            .collect()
    }

    /// Coordinate of the neighbour in `direction`, whether or not it exists.
    #[must_use]
    pub fn neighbor_coord(&self, coord: CubeCoord, direction: usize) -> CubeCoord {
        coord.neighbor(direction)
    }

    /// Tiles at exactly `radius` from `center` that exist on this grid.
    ///
    /// Walks the ring from direction 4 around the six sides. Steps that
    /// fall off the map are skipped, so rings at the map edge are partial.
    #[must_use]
    pub fn ring(&self, center: CubeCoord, radius: u32) -> Vec<CubeCoord> {
        center
            .ring(radius)
            .into_iter()
            .filter(|c| self.is_valid(*c))
            .collect()
    }

    /// Grid distance between two coordinates.
    #[must_use]
    pub const fn distance(a: CubeCoord, b: CubeCoord) -> i32 {
        a.distance(b)
    }

    /// Walkable neighbour of `target` closest to `from`, or `None`.
    ///
    /// Ties keep the first neighbour in direction order.
    #[must_use]
    pub fn nearest_walkable_adjacent(&self, target: CubeCoord, from: CubeCoord) -> Option<CubeCoord> {
        let mut best: Option<(i32, CubeCoord)> = None;
        for tile in self.neighbors(target) {
            if !tile.walkable {
                continue;
            }
            let d = tile.coord.distance(from);
            if best.map_or(true, |(bd, _)| d < bd) {
                best = Some((d, tile.coord));
            }
        }
        best.map(|(_, c)| c)
    }

    /// First walkable neighbour of `coord` in direction order.
    #[must_use]
    pub fn first_walkable_neighbor(&self, coord: CubeCoord) -> Option<CubeCoord> {
        self.neighbors(coord)
            .into_iter()
            .find(|t| t.walkable)
            .map(|t| t.coord)
    }

    /// World-space centre of a cube coordinate.
    #[must_use]
    pub fn cube_to_world(&self, coord: CubeCoord) -> Vec2Fixed {
        let q = Fixed::from_num(coord.q);
        let r = Fixed::from_num(coord.r);
        let (x, y) = match self.orientation {
            HexOrientation::PointyTop => (SQRT_3 * q + SQRT_3_OVER_2 * r, THREE_HALVES * r),
            HexOrientation::FlatTop => (THREE_HALVES * q, SQRT_3_OVER_2 * q + SQRT_3 * r),
        };
        Vec2Fixed::new(x * self.hex_size, y * self.hex_size)
    }

    /// Cube coordinate containing a world-space point.
    #[must_use]
    pub fn world_to_cube(&self, world: Vec2Fixed) -> CubeCoord {
        let (fq, fr) = match self.orientation {
            HexOrientation::PointyTop => (
                (SQRT_3_OVER_3 * world.x - ONE_THIRD * world.y) / self.hex_size,
                (TWO_THIRDS * world.y) / self.hex_size,
            ),
            HexOrientation::FlatTop => (
                (TWO_THIRDS * world.x) / self.hex_size,
                (SQRT_3_OVER_3 * world.y - ONE_THIRD * world.x) / self.hex_size,
            ),
        };
        cube_round(fq, fr, -fq - fr)
    }
}

/// Round fractional cube coordinates to the nearest hex.
fn cube_round(fq: Fixed, fr: Fixed, fs: Fixed) -> CubeCoord {
    let mut q = fq.round();
    let mut r = fr.round();
    let s = fs.round();

    let q_diff = (q - fq).abs();
    let r_diff = (r - fr).abs();
    let s_diff = (s - fs).abs();

    if q_diff > r_diff && q_diff > s_diff {
        q = -r - s;
    } else if r_diff > s_diff {
        r = -q - s;
    }
    CubeCoord::axial(q.to_num::<i32>(), r.to_num::<i32>())
}
