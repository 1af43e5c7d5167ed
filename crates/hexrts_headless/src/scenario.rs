//! Scenario definitions for headless runs.
//!
//! A scenario describes a complete starting position: the map, the data
//! definitions, players and their balances, pre-placed entities and a
//! scripted command list. Scenarios are loaded from RON files.
//!
//! # Entity ids
//!
//! Scripted commands address entities by id. Ids are handed out from 1 in
//! placement order: every entry of `buildings`, then `resource_nodes`, then
//! `units` (a unit entry with `count: 3` takes three consecutive ids).
//!
//! # Example RON
//!
//! ```ron
//! Scenario(
//!     name: "duel",
//!     map: Hexagon(radius: 8),
//!     data: File("data.ron"),
//!     players: [(id: 1, resources: [(resource: "Mineral", amount: 500)])],
//!     units: [(owner: 1, unit_type: "marine", coord: (0, 0, 0), count: 2)],
//!     commands: [(tick: 5, player: 1, actors: [1, 2], kind: Move((3, 0, -3)))],
//! )
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use hexrts_core::command::{Command, CommandKind};
use hexrts_core::components::{EntityId, PlayerId};
use hexrts_core::config::{PlayerSetup, SimConfig};
use hexrts_core::data::{DataRegistry, GameData};
use hexrts_core::economy::ResourceNode;
use hexrts_core::error::GameError;
use hexrts_core::formation;
use hexrts_core::hex::{CubeCoord, HexGrid, HexOrientation};
use hexrts_core::simulation::Simulation;

/// Errors from loading, building or running a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// Scenario file not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(PathBuf),
    /// Filesystem or output error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// RON parse error.
    #[error("Failed to parse RON: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// JSON encoding error.
    #[error("Failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The simulation refused the scenario.
    #[error(transparent)]
    Game(#[from] GameError),
    /// Data still points at a file; load the scenario from disk to resolve it.
    #[error("Data file '{0}' has not been resolved")]
    UnresolvedData(String),
    /// Determinism check failed.
    #[error("Runs diverged: {0}")]
    Diverged(String),
}

/// Map shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapShape {
    /// Hexagon of the given radius around the origin.
    Hexagon {
        /// Distance from the centre to the edge, in tiles.
        radius: u32,
    },
    /// Offset-coordinate rectangle.
    Rectangle {
        /// Columns.
        width: u32,
        /// Rows.
        height: u32,
    },
}

impl Default for MapShape {
    fn default() -> Self {
        Self::Hexagon { radius: 10 }
    }
}

/// Where the unit and building definitions come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    /// Definitions written into the scenario.
    Inline(GameData),
    /// Path to a `GameData` RON file, relative to the scenario file.
    File(String),
}

impl Default for DataSource {
    fn default() -> Self {
        Self::Inline(GameData::default())
    }
}

/// Tile with a non-default movement cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainCost {
    /// Tile.
    pub coord: CubeCoord,
    /// Movement cost multiplier.
    pub cost: i32,
}

/// Pre-placed, already finished building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingPlacement {
    /// Owning player.
    pub owner: PlayerId,
    /// Building definition id.
    pub building_type: String,
    /// Tile.
    pub coord: CubeCoord,
}

/// Pre-placed resource node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePlacement {
    /// Tile.
    pub coord: CubeCoord,
    /// Resource name.
    #[serde(default = "default_resource_type")]
    pub resource_type: String,
    /// Starting amount.
    pub amount: i32,
    /// Most a worker pulls per gather tick.
    #[serde(default = "default_amount_per_tick")]
    pub amount_per_gather_tick: i32,
}

fn default_resource_type() -> String {
    ResourceNode::default().resource_type
}

fn default_amount_per_tick() -> i32 {
    ResourceNode::default().amount_per_gather_tick
}

/// A group of identical units placed in formation around a tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPlacement {
    /// Owning player.
    pub owner: PlayerId,
    /// Unit definition id.
    pub unit_type: String,
    /// Centre tile.
    pub coord: CubeCoord,
    /// How many to place.
    #[serde(default = "default_count")]
    pub count: usize,
}

const fn default_count() -> usize {
    1
}

/// A command injected at a fixed tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedCommand {
    /// Execution tick.
    pub tick: u64,
    /// Issuing player.
    pub player: PlayerId,
    /// Acting entity ids.
    #[serde(default)]
    pub actors: Vec<EntityId>,
    /// What to do.
    pub kind: CommandKind,
}

impl ScriptedCommand {
    /// Convert to a core command.
    #[must_use]
    pub fn to_command(&self) -> Command {
        Command::new(self.player, self.actors.clone(), self.tick, self.kind.clone())
    }
}

/// A complete headless scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Scenario name, used as the command log id.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Map shape.
    pub map: MapShape,
    /// Hex orientation.
    pub orientation: HexOrientation,
    /// Unwalkable tiles.
    pub blocked: Vec<CubeCoord>,
    /// Tiles with a movement cost other than 1.
    pub terrain: Vec<TerrainCost>,
    /// Unit and building definitions.
    pub data: DataSource,
    /// Simulation tunables.
    pub config: SimConfig,
    /// Players and their starting balances.
    pub players: Vec<PlayerSetup>,
    /// Finished buildings at tick 0.
    pub buildings: Vec<BuildingPlacement>,
    /// Resource nodes at tick 0.
    pub resource_nodes: Vec<ResourcePlacement>,
    /// Units at tick 0.
    pub units: Vec<UnitPlacement>,
    /// Scripted commands.
    pub commands: Vec<ScriptedCommand>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "unnamed".to_string(),
            description: String::new(),
            map: MapShape::default(),
            orientation: HexOrientation::default(),
            blocked: Vec::new(),
            terrain: Vec::new(),
            data: DataSource::default(),
            config: SimConfig::default(),
            players: Vec::new(),
            buildings: Vec::new(),
            resource_nodes: Vec::new(),
            units: Vec::new(),
            commands: Vec::new(),
        }
    }
}

impl Scenario {
    /// Load a scenario file and resolve its data file.
    ///
    /// # Errors
    ///
    /// Returns an error if either file is missing or fails to parse.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let mut scenario = Self::from_ron_str(&content)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        scenario.resolve_data(base)?;
        tracing::info!(name = %scenario.name, path = %path.display(), "Loaded scenario");
        Ok(scenario)
    }

    /// Parse a scenario from RON text. A `File` data source is left as is.
    ///
    /// # Errors
    ///
    /// Returns an error if the RON is malformed.
    pub fn from_ron_str(content: &str) -> Result<Self, ScenarioError> {
        Ok(ron::from_str(content)?)
    }

    /// Replace a `File` data source with the parsed file, read relative to
    /// `base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data file is missing or fails to parse.
    pub fn resolve_data(&mut self, base: &Path) -> Result<(), ScenarioError> {
        if let DataSource::File(relative) = &self.data {
            let path = base.join(relative);
            if !path.exists() {
                return Err(ScenarioError::FileNotFound(path));
            }
            let text = std::fs::read_to_string(&path)?;
            let data = GameData::from_ron_str(&text, &path.display().to_string())?;
            self.data = DataSource::Inline(data);
        }
        Ok(())
    }

    /// Scripted commands as core commands, in file order.
    #[must_use]
    pub fn scheduled_commands(&self) -> Vec<Command> {
        self.commands.iter().map(ScriptedCommand::to_command).collect()
    }

    fn grid(&self) -> HexGrid {
        let mut grid = match self.map {
            MapShape::Hexagon { radius } => HexGrid::hexagon(radius, self.orientation),
            MapShape::Rectangle { width, height } => HexGrid::new(width, height, self.orientation),
        };
        for coord in &self.blocked {
            if !grid.set_walkable(*coord, false) {
                tracing::warn!(%coord, "Blocked tile is off the map");
            }
        }
        for terrain in &self.terrain {
            if !grid.set_movement_cost(terrain.coord, terrain.cost) {
                tracing::warn!(coord = %terrain.coord, "Terrain tile is off the map");
            }
        }
        grid
    }

    /// Set up the map, players and starting entities, without scheduling
    /// the scripted commands.
    ///
    /// # Errors
    ///
    /// Returns an error for an unresolved data file, an invalid config or
    /// a placement the simulation rejects.
    pub fn build_world(&self) -> Result<Simulation, ScenarioError> {
        let data = match &self.data {
            DataSource::Inline(data) => data.clone(),
            DataSource::File(path) => return Err(ScenarioError::UnresolvedData(path.clone())),
        };

        let registry = DataRegistry::from_game_data(data);
        let mut sim = Simulation::try_new(self.grid(), registry, self.config.clone())?;
        for player in &self.players {
            sim.setup_player(player);
        }

        for placement in &self.buildings {
            sim.place_constructed_building(&placement.building_type, placement.coord, placement.owner)?;
        }
        for placement in &self.resource_nodes {
            let node = ResourceNode::new(
                placement.resource_type.clone(),
                placement.amount,
                placement.amount_per_gather_tick,
            );
            sim.spawn_resource_node(node, placement.coord)?;
        }
        for placement in &self.units {
            let slots = formation::positions(placement.coord, placement.count, sim.grid());
            for coord in slots {
                sim.create_unit(&placement.unit_type, placement.owner, coord)?;
            }
        }

        tracing::debug!(
            name = %self.name,
            entities = sim.entities().len(),
            "Scenario world built"
        );
        Ok(sim)
    }

    /// Set up the world and schedule every scripted command.
    ///
    /// # Errors
    ///
    /// As [`build_world`](Self::build_world); scripted commands that the
    /// scheduler rejects are logged and skipped.
    pub fn build(&self) -> Result<Simulation, ScenarioError> {
        let mut sim = self.build_world()?;
        for command in self.scheduled_commands() {
            if !sim.schedule(command) {
                tracing::warn!(scenario = %self.name, "Scripted command rejected");
            }
        }
        Ok(sim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexrts_test_utils::fixtures::{self, TEST_DATA_RON};

    fn inline_scenario() -> Scenario {
        let data = GameData::from_ron_str(TEST_DATA_RON, "fixtures").unwrap();
        Scenario {
            name: "test".into(),
            map: MapShape::Hexagon { radius: 6 },
            data: DataSource::Inline(data),
            players: vec![fixtures::player_setup(fixtures::PLAYER_A, 20)],
            buildings: vec![BuildingPlacement {
                owner: fixtures::PLAYER_A,
                building_type: "depot".into(),
                coord: CubeCoord::axial(-3, 0),
            }],
            resource_nodes: vec![ResourcePlacement {
                coord: CubeCoord::axial(3, 0),
                resource_type: fixtures::MINERAL.into(),
                amount: 200,
                amount_per_gather_tick: 5,
            }],
            units: vec![UnitPlacement {
                owner: fixtures::PLAYER_A,
                unit_type: "worker".into(),
                coord: CubeCoord::ORIGIN,
                count: 3,
            }],
            ..Scenario::default()
        }
    }

    #[test]
    fn test_parse_minimal_scenario() {
        let scenario = Scenario::from_ron_str(
            r#"Scenario(
                name: "tiny",
                map: Rectangle(width: 8, height: 6),
                data: File("data.ron"),
                blocked: [(1, 1, -2)],
                commands: [(tick: 3, player: 1, actors: [1], kind: Stop)],
            )"#,
        )
        .unwrap();

        assert_eq!(scenario.name, "tiny");
        assert_eq!(scenario.map, MapShape::Rectangle { width: 8, height: 6 });
        assert_eq!(scenario.data, DataSource::File("data.ron".into()));
        assert_eq!(scenario.blocked, vec![CubeCoord::axial(1, 1)]);
        assert_eq!(scenario.commands[0].kind, CommandKind::Stop);
        assert_eq!(scenario.config, SimConfig::default());
    }

    #[test]
    fn test_unresolved_data_is_rejected() {
        let scenario = Scenario {
            data: DataSource::File("missing.ron".into()),
            ..Scenario::default()
        };
        assert!(matches!(
            scenario.build_world(),
            Err(ScenarioError::UnresolvedData(_))
        ));
    }

    #[test]
    fn test_ids_follow_placement_order() {
        let sim = inline_scenario().build_world().unwrap();

        assert!(sim.entity(1).unwrap().building().is_some());
        assert!(sim.entity(2).unwrap().resource_node().is_some());
        for id in 3..=5 {
            assert!(sim.entity(id).unwrap().worker().is_some());
        }
        assert_eq!(sim.entities().len(), 5);
        // Pre-placed depot grants its supply immediately.
        assert_eq!(sim.ledger().cap(fixtures::PLAYER_A, fixtures::SUPPLY), 30);
    }

    #[test]
    fn test_build_schedules_commands() {
        let mut scenario = inline_scenario();
        scenario.commands.push(ScriptedCommand {
            tick: 4,
            player: fixtures::PLAYER_A,
            actors: vec![3, 4, 5],
            kind: CommandKind::GatherResource(2),
        });

        assert_eq!(scenario.build_world().unwrap().scheduler().pending_len(), 0);
        let sim = scenario.build().unwrap();
        assert_eq!(sim.scheduler().pending_len(), 1);
        assert_eq!(sim.scheduler().next_due_tick(), Some(4));
    }

    #[test]
    fn test_blocked_placement_fails() {
        let mut scenario = inline_scenario();
        scenario.blocked.push(CubeCoord::axial(-3, 0));
        assert!(matches!(
            scenario.build_world(),
            Err(ScenarioError::Game(GameError::PlacementBlocked(_)))
        ));
    }

    #[test]
    fn test_load_resolves_data_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data.ron"), TEST_DATA_RON).unwrap();
        let path = dir.path().join("scenario.ron");
        std::fs::write(
            &path,
            r#"Scenario(
                name: "from_disk",
                map: Hexagon(radius: 4),
                data: File("data.ron"),
                units: [(owner: 1, unit_type: "scout", coord: (0, 0, 0))],
            )"#,
        )
        .unwrap();

        let scenario = Scenario::load(&path).unwrap();
        assert!(matches!(scenario.data, DataSource::Inline(_)));
        let sim = scenario.build().unwrap();
        assert_eq!(sim.entity(1).unwrap().type_id, "scout");
    }

    #[test]
    fn test_missing_file() {
        let err = Scenario::load(Path::new("/nonexistent/scenario.ron")).unwrap_err();
        assert!(matches!(err, ScenarioError::FileNotFound(_)));
    }
}
