//! Static checks for data files and scenarios.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use hexrts_core::data::{DataRegistry, GameData};

use crate::scenario::{DataSource, Scenario, ScenarioError};

/// Problems found in one data file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Unit definitions read.
    pub units: usize,
    /// Building definitions read.
    pub buildings: usize,
    /// One message per problem.
    pub problems: Vec<String>,
}

impl ValidationReport {
    /// No problems found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Cross-check a set of definitions.
///
/// On top of the registry's own checks this catches ids defined twice
/// (the registry keeps only the last), negative costs and production
/// lists on buildings that cannot produce.
#[must_use]
pub fn validate_data(data: &GameData) -> ValidationReport {
    let mut problems = Vec::new();

    let mut seen = BTreeSet::new();
    for unit in &data.units {
        if !seen.insert(unit.id.as_str()) {
            problems.push(format!("unit '{}' is defined more than once", unit.id));
        }
        if unit.creation_cost.iter().any(|c| c.amount < 0) {
            problems.push(format!("unit '{}': negative creation cost", unit.id));
        }
        if unit.supply_cost < 0 {
            problems.push(format!("unit '{}': negative supply cost", unit.id));
        }
    }

    seen.clear();
    for building in &data.buildings {
        if !seen.insert(building.id.as_str()) {
            problems.push(format!("building '{}' is defined more than once", building.id));
        }
        if building.creation_cost.iter().any(|c| c.amount < 0) {
            problems.push(format!("building '{}': negative creation cost", building.id));
        }
        if !building.can_produce_units && !building.producible_unit_ids.is_empty() {
            problems.push(format!(
                "building '{}': lists producible units but cannot produce",
                building.id
            ));
        }
    }

    let registry = DataRegistry::from_game_data(data.clone());
    problems.extend(registry.validate());

    ValidationReport {
        units: data.units.len(),
        buildings: data.buildings.len(),
        problems,
    }
}

/// Load and check a `GameData` RON file.
///
/// # Errors
///
/// Returns an error if the file is missing or fails to parse. Semantic
/// problems go into the report instead.
pub fn validate_data_file(path: &Path) -> Result<ValidationReport, ScenarioError> {
    if !path.exists() {
        return Err(ScenarioError::FileNotFound(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path)?;
    let data = GameData::from_ron_str(&text, &path.display().to_string())?;
    let report = validate_data(&data);
    tracing::info!(
        path = %path.display(),
        units = report.units,
        buildings = report.buildings,
        problems = report.problems.len(),
        "Validated data file"
    );
    Ok(report)
}

/// Check a scenario's placements against its data.
///
/// Reports unknown unit and building types and placements owned by
/// players with no setup entry. Includes the data problems too.
#[must_use]
pub fn validate_scenario(scenario: &Scenario) -> ValidationReport {
    let DataSource::Inline(data) = &scenario.data else {
        return ValidationReport {
            problems: vec!["data file has not been resolved".into()],
            ..ValidationReport::default()
        };
    };
    let mut report = validate_data(data);
    let registry = DataRegistry::from_game_data(data.clone());
    let players: BTreeSet<_> = scenario.players.iter().map(|p| p.id).collect();

    for placement in &scenario.buildings {
        if registry.building(&placement.building_type).is_none() {
            report
                .problems
                .push(format!("placement at {}: unknown building '{}'", placement.coord, placement.building_type));
        }
        if !players.contains(&placement.owner) {
            report
                .problems
                .push(format!("placement at {}: player {} has no setup", placement.coord, placement.owner));
        }
    }
    for placement in &scenario.units {
        if registry.unit(&placement.unit_type).is_none() {
            report
                .problems
                .push(format!("placement at {}: unknown unit '{}'", placement.coord, placement.unit_type));
        }
        if !players.contains(&placement.owner) {
            report
                .problems
                .push(format!("placement at {}: player {} has no setup", placement.coord, placement.owner));
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::UnitPlacement;
    use hexrts_core::hex::CubeCoord;
    use hexrts_test_utils::fixtures::TEST_DATA_RON;

    #[test]
    fn test_fixture_data_is_valid() {
        let data = GameData::from_ron_str(TEST_DATA_RON, "fixtures").unwrap();
        let report = validate_data(&data);
        assert!(report.is_valid(), "{:?}", report.problems);
        assert_eq!(report.units, 3);
        assert_eq!(report.buildings, 2);
    }

    #[test]
    fn test_reports_every_problem() {
        let data = GameData::from_ron_str(
            r#"GameData(
                units: [
                    (id: "worker", worker: Some((buildable_building_ids: ["castle"]))),
                    (id: "worker", creation_time_ticks: 0),
                ],
                buildings: [
                    (id: "hut", producible_unit_ids: ["worker"]),
                    (id: "gate", can_produce_units: true, producible_unit_ids: ["ghost"],
                     creation_cost: [(resource: "Mineral", amount: -5)]),
                ],
            )"#,
            "bad",
        )
        .unwrap();

        let problems = validate_data(&data).problems;
        let has = |needle: &str| problems.iter().any(|p| p.contains(needle));
        assert!(has("'worker' is defined more than once"));
        assert!(has("'hut': lists producible units"));
        assert!(has("'gate': negative creation cost"));
        assert!(has("unknown producible unit 'ghost'"));
        assert!(has("creation_time_ticks must be positive"));
    }

    #[test]
    fn test_data_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.ron");
        std::fs::write(&path, "GameData(units: 5)").unwrap();
        assert!(matches!(validate_data_file(&path), Err(ScenarioError::Game(_))));
        assert!(matches!(
            validate_data_file(&dir.path().join("nope.ron")),
            Err(ScenarioError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_scenario_placements_checked() {
        let data = GameData::from_ron_str(TEST_DATA_RON, "fixtures").unwrap();
        let scenario = Scenario {
            data: DataSource::Inline(data),
            units: vec![UnitPlacement {
                owner: 9,
                unit_type: "dragon".into(),
                coord: CubeCoord::ORIGIN,
                count: 1,
            }],
            ..Scenario::default()
        };
        let report = validate_scenario(&scenario);
        assert_eq!(report.problems.len(), 2);
    }
}
