//! Per-unit starting data.

use serde::{Deserialize, Serialize};

use crate::factions::Faction;
use crate::fsm::StateKind;
use crate::tiles::TileCoord;

/// Starting definition of one unit.
///
/// # Example RON
///
/// ```ron
/// UnitData(
///     name: "Raider",
///     faction: Enemy,
///     tile: (4, 4),
///     health: 1,
///     movement: 3,
///     start_state: Idle,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitData {
    /// Display name.
    pub name: String,

    /// Side the unit fights for.
    pub faction: Faction,

    /// Starting grid coordinate `(x, y)`.
    pub tile: (u32, u32),

    /// Starting hit points.
    #[serde(default = "default_health")]
    pub health: u32,

    /// Movement budget per turn.
    #[serde(default = "default_movement")]
    pub movement: u32,

    /// State the FSM enters at spawn. Ignored for the player.
    #[serde(default)]
    pub start_state: StateKind,
}

const fn default_health() -> u32 {
    1
}

const fn default_movement() -> u32 {
    3
}

impl UnitData {
    /// Starting coordinate as a [`TileCoord`].
    #[must_use]
    pub fn coord(&self) -> TileCoord {
        TileCoord::from(self.tile)
    }
}
