//! Data-driven unit and building definitions.
//!
//! Definitions deserialize from RON. This module does no file IO: callers
//! read the text and hand it to [`GameData::from_ron_str`].

mod building_data;
mod unit_data;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use building_data::BuildingData;
pub use unit_data::{UnitData, WorkerData};

use crate::error::{GameError, Result};

/// Every definition for one game, as stored in a single RON file.
///
/// # Example RON
///
/// ```ron
/// GameData(
///     units: [(id: "worker", worker: Some(()))],
///     buildings: [(id: "depot", acts_as_resource_drop_off: true)],
/// )
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameData {
    /// Unit definitions.
    pub units: Vec<UnitData>,
    /// Building definitions.
    pub buildings: Vec<BuildingData>,
}

impl GameData {
    /// Parse from RON text. `origin` names the source in errors.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParseError`] if the text is not valid.
    pub fn from_ron_str(text: &str, origin: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| GameError::DataParseError {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }
}

/// Lookup table of definitions; the factory's source of truth.
#[derive(Debug, Clone, Default)]
pub struct DataRegistry {
    units: BTreeMap<String, UnitData>,
    buildings: BTreeMap<String, BuildingData>,
}

impl DataRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from parsed data. Later duplicates replace earlier ones.
    #[must_use]
    pub fn from_game_data(data: GameData) -> Self {
        let mut registry = Self::new();
        for unit in data.units {
            registry.register_unit(unit);
        }
        for building in data.buildings {
            registry.register_building(building);
        }
        registry
    }

    /// Add or replace a unit definition.
    pub fn register_unit(&mut self, unit: UnitData) {
        if self.units.contains_key(&unit.id) {
            tracing::warn!(id = %unit.id, "Replacing duplicate unit definition");
        }
        self.units.insert(unit.id.clone(), unit);
    }

    /// Add or replace a building definition.
    pub fn register_building(&mut self, building: BuildingData) {
        if self.buildings.contains_key(&building.id) {
            tracing::warn!(id = %building.id, "Replacing duplicate building definition");
        }
        self.buildings.insert(building.id.clone(), building);
    }

    /// Unit definition by id.
    #[must_use]
    pub fn unit(&self, id: &str) -> Option<&UnitData> {
        self.units.get(id)
    }

    /// Building definition by id.
    #[must_use]
    pub fn building(&self, id: &str) -> Option<&BuildingData> {
        self.buildings.get(id)
    }

    /// Unit definition by id.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownUnitType`] if the id is not registered.
    pub fn require_unit(&self, id: &str) -> Result<&UnitData> {
        self.unit(id)
            .ok_or_else(|| GameError::UnknownUnitType(id.to_string()))
    }

    /// Building definition by id.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownBuildingType`] if the id is not registered.
    pub fn require_building(&self, id: &str) -> Result<&BuildingData> {
        self.building(id)
            .ok_or_else(|| GameError::UnknownBuildingType(id.to_string()))
    }

    /// All unit definitions, sorted by id.
    pub fn units(&self) -> impl Iterator<Item = &UnitData> {
        self.units.values()
    }

    /// All building definitions, sorted by id.
    pub fn buildings(&self) -> impl Iterator<Item = &BuildingData> {
        self.buildings.values()
    }

    /// Cross-reference check. Returns one message per problem found.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for unit in self.units.values() {
            if unit.max_health <= 0 {
                problems.push(format!("unit '{}': max_health must be positive", unit.id));
            }
            if unit.creation_time_ticks <= 0 {
                problems.push(format!("unit '{}': creation_time_ticks must be positive", unit.id));
            }
            if let Some(worker) = &unit.worker {
                if worker.ticks_per_work_action <= 0 {
                    problems.push(format!(
                        "unit '{}': ticks_per_work_action must be positive",
                        unit.id
                    ));
                }
                for id in &worker.buildable_building_ids {
                    if !self.buildings.contains_key(id) {
                        problems.push(format!("unit '{}': unknown buildable building '{id}'", unit.id));
                    }
                }
            }
        }
        for building in self.buildings.values() {
            if building.max_health <= 0 {
                problems.push(format!("building '{}': max_health must be positive", building.id));
            }
            if building.creation_time_ticks <= 0 {
                problems.push(format!(
                    "building '{}': creation_time_ticks must be positive",
                    building.id
                ));
            }
            for id in &building.producible_unit_ids {
                if !self.units.contains_key(id) {
                    problems.push(format!("building '{}': unknown producible unit '{id}'", building.id));
                }
            }
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"GameData(
        units: [
            (id: "worker", worker: Some((buildable_building_ids: ["depot"]))),
            (id: "marine", attack_damage: 6),
        ],
        buildings: [
            (id: "depot", acts_as_resource_drop_off: true, supply_provided: 8),
            (id: "barracks", can_produce_units: true, producible_unit_ids: ["marine", "ghost"]),
        ],
    )"#;

    #[test]
    fn test_parse_and_lookup() {
        let data = GameData::from_ron_str(SAMPLE, "sample").unwrap();
        let registry = DataRegistry::from_game_data(data);
        assert_eq!(registry.require_unit("marine").unwrap().attack_damage, 6);
        assert!(registry.require_building("depot").unwrap().acts_as_resource_drop_off);
        assert!(matches!(
            registry.require_unit("tank"),
            Err(GameError::UnknownUnitType(id)) if id == "tank"
        ));
        let ids: Vec<_> = registry.units().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["marine", "worker"]);
    }

    #[test]
    fn test_parse_error_names_origin() {
        let err = GameData::from_ron_str("GameData(units: 5)", "bad.ron").unwrap_err();
        assert!(matches!(err, GameError::DataParseError { path, .. } if path == "bad.ron"));
    }

    #[test]
    fn test_validate_reports_dangling_ids() {
        let registry = DataRegistry::from_game_data(GameData::from_ron_str(SAMPLE, "sample").unwrap());
        let problems = registry.validate();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("ghost"));
    }
}
