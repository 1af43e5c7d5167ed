//! Unit type definitions.

use serde::{Deserialize, Serialize};

use crate::ledger::ResourceCost;

/// Worker-only parameters.
///
/// # Example RON
///
/// ```ron
/// WorkerData(
///     max_carry_capacity: 50,
///     ticks_per_work_action: 20,
///     build_power_per_action: 20,
///     buildable_building_ids: ["barracks", "depot"],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerData {
    /// Maximum resources carried per trip.
    pub max_carry_capacity: i32,
    /// Ticks between construction work actions.
    pub ticks_per_work_action: i32,
    /// Construction progress added per work action.
    pub build_power_per_action: i32,
    /// Building ids this worker may construct.
    pub buildable_building_ids: Vec<String>,
}

impl Default for WorkerData {
    fn default() -> Self {
        Self {
            max_carry_capacity: 50,
            ticks_per_work_action: 20,
            build_power_per_action: 20,
            buildable_building_ids: Vec::new(),
        }
    }
}

/// Data-driven unit definition.
///
/// Every field except `id` has a default, so a RON entry only needs to
/// list what differs.
///
/// # Example RON
///
/// ```ron
/// UnitData(
///     id: "marine",
///     max_health: 40,
///     move_points_per_tick: 250,
///     attack_damage: 6,
///     attack_range: 3,
///     creation_cost: [(resource: "Mineral", amount: 50)],
///     supply_cost: 1,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitData {
    /// Unique identifier.
    pub id: String,
    /// Maximum health.
    pub max_health: i32,
    /// Movement points per tick (1000 crosses one standard tile).
    pub move_points_per_tick: i32,
    /// Damage per attack.
    pub attack_damage: i32,
    /// Attack range in tiles.
    pub attack_range: i32,
    /// Ticks between attacks.
    pub attack_cooldown_ticks: i32,
    /// Vision range in tiles.
    pub vision_range: i32,
    /// Cost to produce.
    pub creation_cost: Vec<ResourceCost>,
    /// Production time in ticks.
    pub creation_time_ticks: i32,
    /// Supply consumed while alive.
    pub supply_cost: i32,
    /// Present for gatherer/builder units.
    pub worker: Option<WorkerData>,
}

impl Default for UnitData {
    fn default() -> Self {
        Self {
            id: String::new(),
            max_health: 100,
            move_points_per_tick: 200,
            attack_damage: 10,
            attack_range: 1,
            attack_cooldown_ticks: 20,
            vision_range: 5,
            creation_cost: Vec::new(),
            creation_time_ticks: 100,
            supply_cost: 0,
            worker: None,
        }
    }
}

impl UnitData {
    /// Whether units of this type gather and build.
    #[must_use]
    pub const fn is_worker(&self) -> bool {
        self.worker.is_some()
    }

    /// Whether this type may construct `building_id`.
    #[must_use]
    pub fn can_build(&self, building_id: &str) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|w| w.buildable_building_ids.iter().any(|b| b == building_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_ron() {
        let unit: UnitData = ron::from_str(r#"(id: "grunt")"#).unwrap();
        assert_eq!(unit.id, "grunt");
        assert_eq!(unit.max_health, 100);
        assert_eq!(unit.move_points_per_tick, 200);
        assert_eq!(unit.attack_cooldown_ticks, 20);
        assert_eq!(unit.vision_range, 5);
        assert!(!unit.is_worker());
    }

    #[test]
    fn test_worker_block() {
        let unit: UnitData = ron::from_str(
            r#"(id: "worker", worker: Some((buildable_building_ids: ["depot"])))"#,
        )
        .unwrap();
        let worker = unit.worker.as_ref().unwrap();
        assert_eq!(worker.max_carry_capacity, 50);
        assert_eq!(worker.ticks_per_work_action, 20);
        assert!(unit.can_build("depot"));
        assert!(!unit.can_build("barracks"));
    }
}
