//! The board: tile graph plus the units standing on it.
//!
//! Every occupancy change goes through here so that a unit's
//! `current_tile` and the tile's occupant flag always agree.

use crate::error::{GameError, Result};
use crate::math::Vec2Fixed;
use crate::tiles::{TileGraph, TileId};
use crate::units::{Unit, UnitId, UnitRoster, UnitSpawnParams};

/// Tile graph and unit roster.
#[derive(Debug, Clone, Default)]
pub struct Board {
    graph: TileGraph,
    units: UnitRoster,
}

impl Board {
    /// Wrap a fully linked tile graph.
    #[must_use]
    pub fn new(graph: TileGraph) -> Self {
        Self {
            graph,
            units: UnitRoster::new(),
        }
    }

    /// The tile graph.
    #[must_use]
    pub const fn graph(&self) -> &TileGraph {
        &self.graph
    }

    /// The unit roster.
    #[must_use]
    pub const fn units(&self) -> &UnitRoster {
        &self.units
    }

    /// Split borrow used by search sessions that read units while
    /// writing tile scratch state.
    pub(crate) fn split_mut(&mut self) -> (&mut TileGraph, &mut UnitRoster) {
        (&mut self.graph, &mut self.units)
    }

    pub(crate) fn units_mut(&mut self) -> &mut UnitRoster {
        &mut self.units
    }

    /// Register a unit on its starting tile.
    ///
    /// A unit without a valid, free starting tile means the scenario is
    /// corrupt; it is reported instead of being placed somewhere else.
    pub fn spawn(&mut self, params: UnitSpawnParams) -> Result<UnitId> {
        let tile = params.tile;
        let Some(existing) = self.graph.get(tile) else {
            tracing::error!(unit = %params.name, ?tile, "Unit spawned without a valid tile");
            return Err(GameError::InvalidScenario(format!(
                "unit '{}' has no valid starting tile ({tile:?})",
                params.name
            )));
        };
        if existing.is_occupied() {
            tracing::error!(unit = %params.name, tile = existing.name(), "Starting tile already held");
            return Err(GameError::InvalidScenario(format!(
                "unit '{}' starts on occupied {}",
                params.name,
                existing.name()
            )));
        }

        let id = self.units.register(params);
        self.graph.set_occupant(id, None, tile)?;
        Ok(id)
    }

    /// Look up a unit.
    pub fn unit(&self, id: UnitId) -> Result<&Unit> {
        self.units.unit(id)
    }

    /// World position of a unit.
    pub fn position_of(&self, id: UnitId) -> Result<Vec2Fixed> {
        let tile = self.units.unit(id)?.current_tile();
        Ok(self.graph.tile(tile)?.position())
    }

    /// Move a unit onto `to`, vacating its old tile.
    ///
    /// Returns `Ok(false)` when `to` is held by someone else; nothing
    /// changes in that case.
    pub fn relocate(&mut self, id: UnitId, to: TileId) -> Result<bool> {
        let from = self.units.unit(id)?.current_tile();
        if !self.graph.set_occupant(id, Some(from), to)? {
            return Ok(false);
        }
        self.units.unit_mut(id)?.set_current_tile(to);
        Ok(true)
    }

    /// Remove a unit from active play and free its tile.
    pub fn eliminate(&mut self, id: UnitId) -> Result<()> {
        let unit = self.units.unit_mut(id)?;
        let tile = unit.current_tile();
        unit.deactivate();
        self.graph.vacate(id, tile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factions::Faction;
    use crate::fsm::StateKind;
    use crate::tiles::TileCoord;

    fn board() -> Board {
        let graph = TileGraph::with_tiles(
            (0..3).map(|x| (TileCoord::new(x, 0), Vec2Fixed::from_world(x as i32 * 3, 0))),
        )
        .unwrap();
        Board::new(graph)
    }

    fn spawn(faction: Faction, tile: u32) -> UnitSpawnParams {
        UnitSpawnParams {
            name: "u".into(),
            faction,
            tile: TileId(tile),
            health: 1,
            movement: 2,
            start_state: StateKind::Idle,
        }
    }

    #[test]
    fn test_spawn_occupies_tile() {
        let mut board = board();
        let id = board.spawn(spawn(Faction::Player, 1)).unwrap();
        assert_eq!(board.graph().tile(TileId(1)).unwrap().occupant(), Some(id));
        assert_eq!(board.position_of(id).unwrap(), Vec2Fixed::from_world(3, 0));
    }

    #[test]
    fn test_spawn_rejects_missing_or_taken_tile() {
        let mut board = board();
        assert!(matches!(
            board.spawn(spawn(Faction::Ally, 9)),
            Err(GameError::InvalidScenario(_))
        ));
        board.spawn(spawn(Faction::Ally, 0)).unwrap();
        assert!(matches!(
            board.spawn(spawn(Faction::Enemy, 0)),
            Err(GameError::InvalidScenario(_))
        ));
        assert_eq!(board.units().len(), 1);
    }

    #[test]
    fn test_relocate_keeps_unit_and_tile_in_sync() {
        let mut board = board();
        let id = board.spawn(spawn(Faction::Ally, 0)).unwrap();
        assert!(board.relocate(id, TileId(2)).unwrap());
        assert_eq!(board.unit(id).unwrap().current_tile(), TileId(2));
        assert!(!board.graph().is_occupied(TileId(0)));
        assert!(board.graph().is_occupied(TileId(2)));
    }

    #[test]
    fn test_relocate_onto_occupied_is_refused() {
        let mut board = board();
        let a = board.spawn(spawn(Faction::Ally, 0)).unwrap();
        let b = board.spawn(spawn(Faction::Enemy, 1)).unwrap();
        assert!(!board.relocate(a, TileId(1)).unwrap());
        assert_eq!(board.unit(a).unwrap().current_tile(), TileId(0));
        assert_eq!(board.graph().tile(TileId(1)).unwrap().occupant(), Some(b));
    }

    #[test]
    fn test_eliminate_frees_tile() {
        let mut board = board();
        let id = board.spawn(spawn(Faction::Enemy, 2)).unwrap();
        board.eliminate(id).unwrap();
        assert!(!board.unit(id).unwrap().is_active());
        assert!(!board.graph().is_occupied(TileId(2)));
    }
}
