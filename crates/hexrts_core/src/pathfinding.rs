//! A* pathfinding over the hex grid.
//!
//! [`find_path`] is synchronous and is what the simulation uses from inside
//! a tick. [`PathRequestQueue`] spreads lookups requested outside the tick
//! (UI hover, placement previews) across frames; it is never driven by
//! [`Simulation::tick`](crate::simulation::Simulation::tick).

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use std::fmt;

use crate::hex::{CubeCoord, HexGrid};

/// A node in the A* open set priority queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct OpenNode {
    coord: CubeCoord,
    /// g + h
    f_cost: i32,
    h_cost: i32,
    /// Insertion sequence; earlier pushes win remaining ties.
    seq: u64,
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap, so compare reversed for min-f, then min-h.
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| other.h_cost.cmp(&self.h_cost))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Upper bound on node expansions for one search on `grid`.
#[must_use]
pub fn iteration_cap(grid: &HexGrid) -> usize {
    grid.tile_count().saturating_mul(2).max(1)
}

/// Find a path from `start` to `goal`.
///
/// The returned sequence excludes `start` and ends with `goal`. An empty
/// sequence means no movement is possible: `start == goal`, either end is
/// missing or unwalkable, the regions are disconnected, or the search hit
/// [`iteration_cap`].
#[must_use]
pub fn find_path(grid: &HexGrid, start: CubeCoord, goal: CubeCoord) -> Vec<CubeCoord> {
    if start == goal {
        return Vec::new();
    }
    if !grid.is_walkable(start) || !grid.is_walkable(goal) {
        tracing::debug!(%start, %goal, "Path endpoints not walkable");
        return Vec::new();
    }

    let cap = iteration_cap(grid);
    let mut open_set: BinaryHeap<OpenNode> = BinaryHeap::new();
    let mut came_from: HashMap<CubeCoord, CubeCoord> = HashMap::new();
    let mut g_cost: HashMap<CubeCoord, i32> = HashMap::new();
    let mut closed: HashSet<CubeCoord> = HashSet::new();
    let mut seq = 0u64;

    let start_h = start.distance(goal);
    g_cost.insert(start, 0);
    open_set.push(OpenNode {
        coord: start,
        f_cost: start_h,
        h_cost: start_h,
        seq,
    });

    let mut expansions = 0usize;
    while let Some(current) = open_set.pop() {
        if current.coord == goal {
            return reconstruct_path(&came_from, start, goal);
        }
        if !closed.insert(current.coord) {
            // Stale entry for an already-expanded tile.
            continue;
        }

        expansions += 1;
        if expansions > cap {
            tracing::debug!(%start, %goal, cap, "Path search hit iteration cap");
            return Vec::new();
        }

        let current_g = g_cost.get(&current.coord).copied().unwrap_or(i32::MAX);
        for tile in grid.neighbors(current.coord) {
            if !tile.walkable || closed.contains(&tile.coord) {
                continue;
            }
            let tentative_g = current_g.saturating_add(tile.movement_cost);
            let known_g = g_cost.get(&tile.coord).copied().unwrap_or(i32::MAX);
            if tentative_g < known_g {
                came_from.insert(tile.coord, current.coord);
                g_cost.insert(tile.coord, tentative_g);
                let h = tile.coord.distance(goal);
                seq += 1;
                open_set.push(OpenNode {
                    coord: tile.coord,
                    f_cost: tentative_g.saturating_add(h),
                    h_cost: h,
                    seq,
                });
            }
        }
    }

    tracing::debug!(%start, %goal, "No path found");
    Vec::new()
}

fn reconstruct_path(
    came_from: &HashMap<CubeCoord, CubeCoord>,
    start: CubeCoord,
    goal: CubeCoord,
) -> Vec<CubeCoord> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(&prev) = came_from.get(&current) {
        if prev == start {
            break;
        }
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Sum of entry costs along a path returned by [`find_path`].
#[must_use]
pub fn path_cost(grid: &HexGrid, path: &[CubeCoord]) -> i32 {
    path.iter()
        .filter_map(|c| grid.tile_at(*c))
        .map(|t| t.movement_cost)
        .sum()
}

/// Handle returned by [`PathRequestQueue::request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathTicket(u64);

impl PathTicket {
    /// Raw ticket number.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

/// Outcome of a queued path request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResult {
    /// Ticket of the originating request.
    pub ticket: PathTicket,
    /// Path excluding start, ending at goal. Empty on failure.
    pub path: Vec<CubeCoord>,
    /// `true` if the goal is reachable (including `start == goal`).
    pub success: bool,
}

/// Callback invoked when a queued path result is delivered.
pub type PathCallback = Box<dyn FnOnce(PathResult)>;

struct PendingRequest {
    ticket: PathTicket,
    start: CubeCoord,
    goal: CubeCoord,
    callback: PathCallback,
}

/// Frame-distributed path lookups for non-simulation callers.
///
/// Results computed in one [`process_frame`](Self::process_frame) call are
/// delivered at the start of the next one.
pub struct PathRequestQueue {
    pending: VecDeque<PendingRequest>,
    ready: Vec<(PathResult, PathCallback)>,
    next_ticket: u64,
    /// 0 means unlimited.
    max_requests_per_frame: usize,
}

impl PathRequestQueue {
    /// Create a queue computing at most `max_requests_per_frame` searches per
    /// frame (0 = unlimited).
    #[must_use]
    pub fn new(max_requests_per_frame: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            ready: Vec::new(),
            next_ticket: 1,
            max_requests_per_frame,
        }
    }

    /// Queue a lookup. `callback` runs during a later `process_frame`.
    pub fn request(
        &mut self,
        start: CubeCoord,
        goal: CubeCoord,
        callback: impl FnOnce(PathResult) + 'static,
    ) -> PathTicket {
        let ticket = PathTicket(self.next_ticket);
        self.next_ticket += 1;
        self.pending.push_back(PendingRequest {
            ticket,
            start,
            goal,
            callback: Box::new(callback),
        });
        ticket
    }

    /// Drop a request that has not been computed yet.
    pub fn cancel(&mut self, ticket: PathTicket) -> bool {
        let before = self.pending.len();
        self.pending.retain(|r| r.ticket != ticket);
        before != self.pending.len()
    }

    /// Deliver last frame's results, then compute this frame's batch.
    ///
    /// Returns the number of callbacks invoked.
    pub fn process_frame(&mut self, grid: &HexGrid) -> usize {
        let delivered = self.ready.len();
        for (result, callback) in self.ready.drain(..) {
            callback(result);
        }

        let budget = if self.max_requests_per_frame == 0 {
            self.pending.len()
        } else {
            self.max_requests_per_frame.min(self.pending.len())
        };
        for _ in 0..budget {
            let Some(request) = self.pending.pop_front() else {
                break;
            };
            let path = find_path(grid, request.start, request.goal);
            let success = !path.is_empty() || request.start == request.goal;
            self.ready.push((
                PathResult {
                    ticket: request.ticket,
                    path,
                    success,
                },
                request.callback,
            ));
        }
        delivered
    }

    /// Requests not yet computed.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Results computed but not yet delivered.
    #[must_use]
    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }
}

impl fmt::Debug for PathRequestQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathRequestQueue")
            .field("pending", &self.pending.len())
            .field("ready", &self.ready.len())
            .field("next_ticket", &self.next_ticket)
            .field("max_requests_per_frame", &self.max_requests_per_frame)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex::HexOrientation;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn grid(radius: u32) -> HexGrid {
        HexGrid::hexagon(radius, HexOrientation::PointyTop)
    }

    #[test]
    fn test_simple_path() {
        let grid = grid(4);
        let goal = CubeCoord::axial(3, 0);
        let path = find_path(&grid, CubeCoord::ORIGIN, goal);
        assert_eq!(path.len(), 3);
        assert_eq!(path.last(), Some(&goal));
        assert!(!path.contains(&CubeCoord::ORIGIN));
    }

    #[test]
    fn test_single_step() {
        let grid = grid(2);
        let goal = CubeCoord::axial(1, 0);
        assert_eq!(find_path(&grid, CubeCoord::ORIGIN, goal), vec![goal]);
    }

    #[test]
    fn test_path_to_same_cell() {
        let grid = grid(2);
        assert!(find_path(&grid, CubeCoord::ORIGIN, CubeCoord::ORIGIN).is_empty());
    }

    #[test]
    fn test_path_around_obstacle() {
        let mut grid = grid(4);
        grid.set_walkable(CubeCoord::axial(1, 0), false);
        grid.set_walkable(CubeCoord::axial(1, -1), false);
        let goal = CubeCoord::axial(2, 0);
        let path = find_path(&grid, CubeCoord::ORIGIN, goal);
        assert_eq!(path.last(), Some(&goal));
        assert!(path.iter().all(|c| grid.is_walkable(*c)));
        let mut prev = CubeCoord::ORIGIN;
        for step in &path {
            assert_eq!(prev.distance(*step), 1);
            prev = *step;
        }
    }

    #[test]
    fn test_no_path_exists() {
        let mut grid = grid(4);
        let goal = CubeCoord::axial(2, 0);
        for tile in goal.ring(1) {
            grid.set_walkable(tile, false);
        }
        assert!(find_path(&grid, CubeCoord::ORIGIN, goal).is_empty());
    }

    #[test]
    fn test_blocked_goal_and_start() {
        let mut grid = grid(3);
        grid.set_walkable(CubeCoord::axial(2, 0), false);
        assert!(find_path(&grid, CubeCoord::ORIGIN, CubeCoord::axial(2, 0)).is_empty());
        assert!(find_path(&grid, CubeCoord::axial(2, 0), CubeCoord::ORIGIN).is_empty());
        assert!(find_path(&grid, CubeCoord::ORIGIN, CubeCoord::axial(9, 0)).is_empty());
    }

    #[test]
    fn test_prefers_cheaper_tiles() {
        let mut grid = grid(3);
        // Direct route through (1,0) is expensive.
        grid.set_movement_cost(CubeCoord::axial(1, 0), 10);
        let goal = CubeCoord::axial(2, 0);
        let path = find_path(&grid, CubeCoord::ORIGIN, goal);
        assert!(!path.contains(&CubeCoord::axial(1, 0)));
        assert_eq!(path_cost(&grid, &path), 3);
    }

    #[test]
    fn test_determinism() {
        let grid = grid(6);
        let goal = CubeCoord::axial(-4, 5);
        let first = find_path(&grid, CubeCoord::axial(3, -2), goal);
        for _ in 0..10 {
            assert_eq!(find_path(&grid, CubeCoord::axial(3, -2), goal), first);
        }
    }

    #[test]
    fn test_iteration_cap_scales_with_grid() {
        assert_eq!(iteration_cap(&grid(1)), 14);
    }

    #[test]
    fn test_queue_delivers_next_frame() {
        let grid = grid(3);
        let mut queue = PathRequestQueue::new(1);
        let results: Rc<RefCell<Vec<PathResult>>> = Rc::default();

        let sink = Rc::clone(&results);
        let first = queue.request(CubeCoord::ORIGIN, CubeCoord::axial(2, 0), move |r| {
            sink.borrow_mut().push(r);
        });
        let sink = Rc::clone(&results);
        let second = queue.request(CubeCoord::ORIGIN, CubeCoord::ORIGIN, move |r| {
            sink.borrow_mut().push(r);
        });

        assert_eq!(queue.process_frame(&grid), 0);
        assert!(results.borrow().is_empty());
        assert_eq!(queue.pending_len(), 1);
        assert_eq!(queue.ready_len(), 1);

        assert_eq!(queue.process_frame(&grid), 1);
        assert_eq!(results.borrow()[0].ticket, first);
        assert!(results.borrow()[0].success);

        assert_eq!(queue.process_frame(&grid), 1);
        let r = &results.borrow()[1];
        assert_eq!(r.ticket, second);
        assert!(r.success);
        assert!(r.path.is_empty());
    }

    #[test]
    fn test_queue_unlimited_and_cancel() {
        let mut grid = grid(3);
        grid.set_walkable(CubeCoord::axial(2, 0), false);
        let mut queue = PathRequestQueue::new(0);
        let failures = Rc::new(RefCell::new(0));
        let cancelled = queue.request(CubeCoord::ORIGIN, CubeCoord::axial(1, 0), |_| {});
        for _ in 0..3 {
            let f = Rc::clone(&failures);
            queue.request(CubeCoord::ORIGIN, CubeCoord::axial(2, 0), move |r| {
                if !r.success {
                    *f.borrow_mut() += 1;
                }
            });
        }
        assert!(queue.cancel(cancelled));
        assert!(!queue.cancel(cancelled));
        queue.process_frame(&grid);
        assert_eq!(queue.pending_len(), 0);
        assert_eq!(queue.process_frame(&grid), 3);
        assert_eq!(*failures.borrow(), 3);
    }
}
