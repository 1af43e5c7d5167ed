//! Building type definitions.

use serde::{Deserialize, Serialize};

use crate::ledger::ResourceCost;

/// Data-driven building definition.
///
/// # Example RON
///
/// ```ron
/// BuildingData(
///     id: "command_center",
///     max_health: 1500,
///     creation_time_ticks: 400,
///     can_produce_units: true,
///     producible_unit_ids: ["worker"],
///     acts_as_resource_drop_off: true,
///     supply_provided: 10,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildingData {
    /// Unique identifier.
    pub id: String,
    /// Maximum health once complete.
    pub max_health: i32,
    /// Construction cost.
    pub creation_cost: Vec<ResourceCost>,
    /// Construction progress needed to complete.
    pub creation_time_ticks: i32,
    /// Whether this building has a production queue.
    pub can_produce_units: bool,
    /// Unit ids this building may produce.
    pub producible_unit_ids: Vec<String>,
    /// Maximum queued (not yet started) units.
    pub production_queue_size: usize,
    /// Whether workers may deposit resources here.
    pub acts_as_resource_drop_off: bool,
    /// Supply cap granted while standing and complete.
    pub supply_provided: i32,
    /// Vision range in tiles.
    pub vision_range: i32,
}

impl Default for BuildingData {
    fn default() -> Self {
        Self {
            id: String::new(),
            max_health: 500,
            creation_cost: Vec::new(),
            creation_time_ticks: 100,
            can_produce_units: false,
            producible_unit_ids: Vec::new(),
            production_queue_size: 5,
            acts_as_resource_drop_off: false,
            supply_provided: 0,
            vision_range: 5,
        }
    }
}

impl BuildingData {
    /// Whether `unit_id` is in the producible list.
    #[must_use]
    pub fn can_produce(&self, unit_id: &str) -> bool {
        self.can_produce_units && self.producible_unit_ids.iter().any(|u| u == unit_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_produce_requires_flag() {
        let mut data = BuildingData {
            id: "barracks".into(),
            producible_unit_ids: vec!["marine".into()],
            ..BuildingData::default()
        };
        assert!(!data.can_produce("marine"));
        data.can_produce_units = true;
        assert!(data.can_produce("marine"));
        assert!(!data.can_produce("tank"));
    }

    #[test]
    fn test_queue_size_default() {
        let data: BuildingData = ron::from_str(r#"(id: "depot")"#).unwrap();
        assert_eq!(data.production_queue_size, 5);
        assert!(!data.acts_as_resource_drop_off);
    }
}
