//! Building state: construction progress and the production queue.
//!
//! Ledger and grid side effects (supply cap, footprint occupancy, spawning)
//! are applied by [`Simulation`](crate::simulation::Simulation); this module
//! only tracks the building's own counters.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::components::Health;
use crate::data::BuildingData;
use crate::error::{GameError, Result};
use crate::hex::{CubeCoord, HexGrid};

/// Result of one [`Building::advance_construction`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructionOutcome {
    /// Still under construction.
    InProgress,
    /// This call finished construction.
    Completed,
    /// Construction had already finished; nothing changed.
    AlreadyComplete,
}

/// Building-specific entity state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Building {
    is_constructed: bool,
    construction_progress_ticks: i32,
    creation_time_ticks: i32,
    can_produce_units: bool,
    producible_unit_ids: Vec<String>,
    queue_size: usize,
    queue: VecDeque<String>,
    producing: Option<String>,
    production_progress_ticks: i32,
    supply_provided: i32,
    is_resource_drop_off: bool,
    rally_point: Option<CubeCoord>,
    footprint: Vec<CubeCoord>,
    /// Set while the owner's supply cap includes `supply_provided`.
    supply_granted: bool,
}

impl Building {
    /// Unfinished building occupying the single tile `center`.
    #[must_use]
    pub fn from_data(data: &BuildingData, center: CubeCoord) -> Self {
        Self {
            is_constructed: false,
            construction_progress_ticks: 0,
            creation_time_ticks: data.creation_time_ticks.max(1),
            can_produce_units: data.can_produce_units,
            producible_unit_ids: data.producible_unit_ids.clone(),
            queue_size: data.production_queue_size,
            queue: VecDeque::new(),
            producing: None,
            production_progress_ticks: 0,
            supply_provided: data.supply_provided.max(0),
            is_resource_drop_off: data.acts_as_resource_drop_off,
            rally_point: None,
            footprint: vec![center],
            supply_granted: false,
        }
    }

    /// Whether construction has finished. Never reverts.
    #[must_use]
    pub const fn is_constructed(&self) -> bool {
        self.is_constructed
    }

    /// Accumulated construction progress.
    #[must_use]
    pub const fn construction_progress_ticks(&self) -> i32 {
        self.construction_progress_ticks
    }

    /// Progress needed to finish.
    #[must_use]
    pub const fn creation_time_ticks(&self) -> i32 {
        self.creation_time_ticks
    }

    /// Whether workers may deposit here.
    #[must_use]
    pub const fn is_resource_drop_off(&self) -> bool {
        self.is_resource_drop_off
    }

    /// Supply cap granted when complete.
    #[must_use]
    pub const fn supply_provided(&self) -> i32 {
        self.supply_provided
    }

    /// Tiles this building blocks.
    #[must_use]
    pub fn footprint(&self) -> &[CubeCoord] {
        &self.footprint
    }

    /// Add `power` progress and scale health with it.
    ///
    /// Health tracks `max(1, floor(max * progress / creation_time))` until the
    /// threshold, then jumps to full.
    pub fn advance_construction(&mut self, power: i32, health: &mut Health) -> ConstructionOutcome {
        if self.is_constructed {
            return ConstructionOutcome::AlreadyComplete;
        }
        self.construction_progress_ticks = self
            .construction_progress_ticks
            .saturating_add(power.max(0));
        if self.construction_progress_ticks >= self.creation_time_ticks {
            self.finish(health);
            return ConstructionOutcome::Completed;
        }
        let scaled = i64::from(health.max()) * i64::from(self.construction_progress_ticks)
            / i64::from(self.creation_time_ticks);
        health.set(i32::try_from(scaled).unwrap_or(i32::MAX).max(1));
        ConstructionOutcome::InProgress
    }

    /// Finish construction immediately.
    pub fn finish(&mut self, health: &mut Health) {
        self.is_constructed = true;
        self.construction_progress_ticks = self.creation_time_ticks;
        health.set(health.max());
    }

    /// Record that the owner's supply cap was raised. Returns `false` if it
    /// already was, or if the building provides none.
    pub fn grant_supply(&mut self) -> bool {
        if self.supply_granted || self.supply_provided == 0 {
            return false;
        }
        self.supply_granted = true;
        true
    }

    /// Withdraw a previous grant. Returns `true` exactly once per grant.
    pub fn revoke_supply(&mut self) -> bool {
        std::mem::replace(&mut self.supply_granted, false)
    }

    /// Check whether `unit_id` could be queued right now.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::ProductionRejected`] when the building is
    /// unfinished, cannot produce, does not list the unit, or has a full queue.
    pub fn check_enqueue(&self, unit_id: &str) -> Result<()> {
        if !self.is_constructed {
            return Err(GameError::ProductionRejected("building is not constructed".into()));
        }
        if !self.can_produce_units {
            return Err(GameError::ProductionRejected("building cannot produce units".into()));
        }
        if !self.producible_unit_ids.iter().any(|u| u == unit_id) {
            return Err(GameError::ProductionRejected(format!("'{unit_id}' is not producible here")));
        }
        if self.queue.len() >= self.queue_size {
            return Err(GameError::ProductionRejected("production queue is full".into()));
        }
        Ok(())
    }

    /// Append to the queue without checks. Call [`check_enqueue`](Self::check_enqueue) first.
    pub(crate) fn push_queue(&mut self, unit_id: String) {
        self.queue.push_back(unit_id);
    }

    /// Remove the newest queued unit, or the one in progress if the queue is empty.
    pub fn cancel_latest(&mut self) -> Option<String> {
        if let Some(unit_id) = self.queue.pop_back() {
            return Some(unit_id);
        }
        self.production_progress_ticks = 0;
        self.producing.take()
    }

    /// Empty the queue and the producing slot, returning every dropped unit id.
    pub(crate) fn clear_production(&mut self) -> Vec<String> {
        self.production_progress_ticks = 0;
        self.producing.take().into_iter().chain(self.queue.drain(..)).collect()
    }

    /// Advance production by one tick.
    ///
    /// With nothing in progress the next queued unit starts at progress 0.
    /// Otherwise progress grows by one and the unit id is returned once it
    /// reaches `time_of(unit_id)`.
    pub fn tick_production(&mut self, time_of: impl Fn(&str) -> i32) -> Option<String> {
        if !self.is_constructed || !self.can_produce_units {
            return None;
        }
        if self.producing.is_none() {
            if let Some(next) = self.queue.pop_front() {
                self.producing = Some(next);
                self.production_progress_ticks = 0;
            }
            return None;
        }
        self.production_progress_ticks += 1;
        let required = self.producing.as_deref().map_or(1, |id| time_of(id).max(1));
        if self.production_progress_ticks >= required {
            self.production_progress_ticks = 0;
            return self.producing.take();
        }
        None
    }

    /// Put a finished unit back in the producing slot so completion is
    /// retried on the next tick.
    pub(crate) fn retry_completion(&mut self, unit_id: String, required_ticks: i32) {
        self.producing = Some(unit_id);
        self.production_progress_ticks = (required_ticks - 1).max(0);
    }

    /// Units waiting to start, oldest first.
    #[must_use]
    pub fn queue(&self) -> &VecDeque<String> {
        &self.queue
    }

    /// Unit currently being produced.
    #[must_use]
    pub fn producing(&self) -> Option<&str> {
        self.producing.as_deref()
    }

    /// Progress on the unit in production.
    #[must_use]
    pub const fn production_progress_ticks(&self) -> i32 {
        self.production_progress_ticks
    }

    /// Where produced units are sent: the stored rally point, else the first
    /// walkable neighbour, else the building's own tile.
    #[must_use]
    pub fn rally_point(&self, center: CubeCoord, grid: &HexGrid) -> CubeCoord {
        self.rally_point
            .or_else(|| grid.first_walkable_neighbor(center))
            .unwrap_or(center)
    }

    /// Store a rally point.
    pub fn set_rally_point(&mut self, coord: CubeCoord) {
        self.rally_point = Some(coord);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex::HexOrientation;

    fn barracks() -> BuildingData {
        BuildingData {
            id: "barracks".into(),
            max_health: 1000,
            creation_time_ticks: 100,
            can_produce_units: true,
            producible_unit_ids: vec!["marine".into()],
            production_queue_size: 2,
            supply_provided: 8,
            ..BuildingData::default()
        }
    }

    #[test]
    fn test_construction_scales_health() {
        let mut building = Building::from_data(&barracks(), CubeCoord::ORIGIN);
        let mut health = Health::new(1000);
        health.set(1);

        assert_eq!(building.advance_construction(20, &mut health), ConstructionOutcome::InProgress);
        assert_eq!(health.current(), 200);
        assert_eq!(building.advance_construction(0, &mut health), ConstructionOutcome::InProgress);
        assert_eq!(building.construction_progress_ticks(), 20);

        assert_eq!(building.advance_construction(90, &mut health), ConstructionOutcome::Completed);
        assert!(building.is_constructed());
        assert_eq!(building.construction_progress_ticks(), 100);
        assert_eq!(health.current(), 1000);
        assert_eq!(
            building.advance_construction(20, &mut health),
            ConstructionOutcome::AlreadyComplete
        );
    }

    #[test]
    fn test_health_floor_of_one() {
        let data = BuildingData {
            max_health: 10,
            creation_time_ticks: 1000,
            ..BuildingData::default()
        };
        let mut building = Building::from_data(&data, CubeCoord::ORIGIN);
        let mut health = Health::new(10);
        building.advance_construction(1, &mut health);
        assert_eq!(health.current(), 1);
    }

    #[test]
    fn test_enqueue_rules() {
        let mut building = Building::from_data(&barracks(), CubeCoord::ORIGIN);
        let mut health = Health::new(1000);
        assert!(building.check_enqueue("marine").is_err());
        building.finish(&mut health);
        assert!(building.check_enqueue("marine").is_ok());
        assert!(building.check_enqueue("tank").is_err());
        building.push_queue("marine".into());
        building.push_queue("marine".into());
        assert!(matches!(
            building.check_enqueue("marine"),
            Err(GameError::ProductionRejected(_))
        ));
    }

    #[test]
    fn test_production_cycle() {
        let mut building = Building::from_data(&barracks(), CubeCoord::ORIGIN);
        building.finish(&mut Health::new(1000));
        building.push_queue("marine".into());

        assert_eq!(building.tick_production(|_| 3), None);
        assert_eq!(building.producing(), Some("marine"));
        assert_eq!(building.tick_production(|_| 3), None);
        assert_eq!(building.tick_production(|_| 3), None);
        assert_eq!(building.tick_production(|_| 3), Some("marine".to_string()));
        assert_eq!(building.producing(), None);
        assert_eq!(building.tick_production(|_| 3), None);
    }

    #[test]
    fn test_retry_completion_finishes_next_tick() {
        let mut building = Building::from_data(&barracks(), CubeCoord::ORIGIN);
        building.finish(&mut Health::new(1000));
        building.retry_completion("marine".into(), 5);
        assert_eq!(building.tick_production(|_| 5), Some("marine".to_string()));
    }

    #[test]
    fn test_cancel_latest() {
        let mut building = Building::from_data(&barracks(), CubeCoord::ORIGIN);
        building.finish(&mut Health::new(1000));
        building.push_queue("a".into());
        building.tick_production(|_| 10);
        building.push_queue("b".into());
        assert_eq!(building.cancel_latest(), Some("b".into()));
        assert_eq!(building.cancel_latest(), Some("a".into()));
        assert_eq!(building.cancel_latest(), None);
    }

    #[test]
    fn test_supply_grant_once() {
        let mut building = Building::from_data(&barracks(), CubeCoord::ORIGIN);
        assert!(building.grant_supply());
        assert!(!building.grant_supply());
        assert!(building.revoke_supply());
        assert!(!building.revoke_supply());
    }

    #[test]
    fn test_rally_point_fallbacks() {
        let mut grid = HexGrid::hexagon(1, HexOrientation::PointyTop);
        let mut building = Building::from_data(&barracks(), CubeCoord::ORIGIN);
        let first = grid.first_walkable_neighbor(CubeCoord::ORIGIN).unwrap();
        assert_eq!(building.rally_point(CubeCoord::ORIGIN, &grid), first);

        for coord in CubeCoord::ORIGIN.ring(1) {
            grid.set_walkable(coord, false);
        }
        assert_eq!(building.rally_point(CubeCoord::ORIGIN, &grid), CubeCoord::ORIGIN);

        building.set_rally_point(CubeCoord::axial(1, 0));
        assert_eq!(building.rally_point(CubeCoord::ORIGIN, &grid), CubeCoord::axial(1, 0));
    }
}
