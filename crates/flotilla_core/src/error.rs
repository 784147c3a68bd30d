//! Error types for the tactics simulation.
//!
//! Only genuine defects and rejected requests are errors. A search that
//! never reaches its goal, a step refused because a tile filled up, or a
//! state with no target to chase are ordinary outcomes and are returned as
//! values by the modules that produce them.

use thiserror::Error;

use crate::tiles::{TileCoord, TileId};
use crate::units::UnitId;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all simulation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    /// The tile graph references a tile that does not exist.
    #[error("Corrupt tile graph: {tile:?} lists missing neighbor {neighbor:?}")]
    CorruptGraph {
        /// Tile whose adjacency list is broken.
        tile: TileId,
        /// Neighbor entry that resolves to nothing.
        neighbor: TileId,
    },

    /// Tile identifier outside the graph.
    #[error("Unknown tile: {0:?}")]
    UnknownTile(TileId),

    /// Grid coordinate outside the board.
    #[error("No tile at coordinate {0}")]
    NoTileAt(TileCoord),

    /// Unit identifier not in the roster.
    #[error("Unknown unit: {0:?}")]
    UnknownUnit(UnitId),

    /// Scenario data failed validation.
    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    /// Player input that cannot be applied right now.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A round was requested while another one is still running.
    #[error("Round {0} is still in progress")]
    RoundInProgress(u32),

    /// A movement was requested while another one is still stepping.
    #[error("Unit {0:?} is still moving")]
    MovementInFlight(UnitId),

    /// Player input arrived outside the player's turn.
    #[error("It is not the player's turn")]
    NotPlayersTurn,

    /// Invalid game state (serialization, replay mismatch, etc.).
    #[error("Invalid game state: {0}")]
    InvalidState(String),
}
