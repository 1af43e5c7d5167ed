//! Error types for the game simulation.

use thiserror::Error;

use crate::hex::CubeCoord;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all game simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Invalid entity reference.
    #[error("Entity not found: {0}")]
    EntityNotFound(u64),

    /// Unit data id not present in the registry.
    #[error("Unknown unit type: {0}")]
    UnknownUnitType(String),

    /// Building data id not present in the registry.
    #[error("Unknown building type: {0}")]
    UnknownBuildingType(String),

    /// Coordinate does not address a tile on the grid.
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(CubeCoord),

    /// Building footprint overlaps an invalid or unwalkable tile.
    #[error("Cannot place building at {0}")]
    PlacementBlocked(CubeCoord),

    /// Insufficient resources.
    #[error("Insufficient resources: need {required} {resource}, have {available}")]
    InsufficientResources {
        /// Resource name.
        resource: String,
        /// Amount required.
        required: i32,
        /// Amount available.
        available: i32,
    },

    /// A production request was refused by the building.
    #[error("Production rejected: {0}")]
    ProductionRejected(String),

    /// Startup configuration is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Two runs that should match produced different state.
    #[error("Desync detected at tick {tick}: local hash {local_hash}, remote hash {remote_hash}")]
    DesyncDetected {
        /// Tick where desync occurred.
        tick: u64,
        /// Local simulation hash.
        local_hash: u64,
        /// Remote simulation hash.
        remote_hash: u64,
    },
}
