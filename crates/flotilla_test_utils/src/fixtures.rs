//! Board and scenario fixtures.
//!
//! Helpers here panic on bad input instead of returning errors; they are
//! meant for tests, where a broken fixture should fail loudly.

use flotilla_core::board::Board;
use flotilla_core::data::{GridData, PacingData, RulesData, ScenarioData, UnitData};
use flotilla_core::factions::Faction;
use flotilla_core::fsm::StateKind;
use flotilla_core::host::GridIndex;
use flotilla_core::math::Fixed;
use flotilla_core::tiles::{TileCoord, TileGraph, TileId};
use flotilla_core::units::{UnitId, UnitSpawnParams};

/// Distance between neighboring tile centers in every fixture grid.
pub const SPACING: i32 = 3;

/// Neighbor radius that links diagonals as well as orthogonals.
pub const DIAGONAL_RADIUS: i32 = 5;

/// Grid index with the fixture spacing.
///
/// # Panics
///
/// Panics if either dimension is zero.
#[must_use]
pub fn grid_index(width: u32, height: u32) -> GridIndex {
    GridIndex::new(width, height, Fixed::from_num(SPACING)).expect("fixture grid must be non-empty")
}

fn graph_with_radius(width: u32, height: u32, radius: i32) -> TileGraph {
    grid_index(width, height)
        .build_graph(Fixed::from_num(radius))
        .expect("fixture graph must build")
}

fn board_with_radius(width: u32, height: u32, radius: i32) -> (Board, GridIndex) {
    (
        Board::new(graph_with_radius(width, height, radius)),
        grid_index(width, height),
    )
}

/// Bare graph where every tile links to its eight surrounding tiles.
#[must_use]
pub fn open_graph(width: u32, height: u32) -> TileGraph {
    graph_with_radius(width, height, DIAGONAL_RADIUS)
}

/// Bare graph where tiles only link up, down, left and right.
#[must_use]
pub fn orthogonal_graph(width: u32, height: u32) -> TileGraph {
    graph_with_radius(width, height, SPACING)
}

/// Empty board where every tile links to its eight surrounding tiles.
#[must_use]
pub fn open_board(width: u32, height: u32) -> (Board, GridIndex) {
    board_with_radius(width, height, DIAGONAL_RADIUS)
}

/// Empty board where tiles only link up, down, left and right.
#[must_use]
pub fn orthogonal_board(width: u32, height: u32) -> (Board, GridIndex) {
    board_with_radius(width, height, SPACING)
}

/// Tile id at `(x, y)`.
///
/// # Panics
///
/// Panics if the coordinate is off the board.
#[must_use]
pub fn tile_at(board: &Board, (x, y): (u32, u32)) -> TileId {
    board
        .graph()
        .at(TileCoord::new(x, y))
        .unwrap_or_else(|| panic!("no tile at ({x}, {y})"))
}

/// Place a one-hit-point unit at `(x, y)` in its default idle state.
///
/// # Panics
///
/// Panics if the tile is missing or taken.
pub fn spawn(board: &mut Board, faction: Faction, at: (u32, u32), movement: u32) -> UnitId {
    let tile = tile_at(board, at);
    board
        .spawn(UnitSpawnParams {
            name: format!("{} {}-{}", faction.display_name(), at.0, at.1),
            faction,
            tile,
            health: 1,
            movement,
            start_state: StateKind::Idle,
        })
        .expect("fixture spawn must succeed")
}

/// Fluent builder for [`ScenarioData`].
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    data: ScenarioData,
}

impl ScenarioBuilder {
    /// Empty scenario on a `width` x `height` grid with instant pacing.
    #[must_use]
    pub fn new(name: &str, width: u32, height: u32) -> Self {
        Self {
            data: ScenarioData {
                name: name.to_string(),
                description: String::new(),
                grid: GridData::new(width, height),
                rules: RulesData::default(),
                pacing: PacingData::instant(),
                seed: 0,
                units: Vec::new(),
            },
        }
    }

    /// Set the random seed.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.data.seed = seed;
        self
    }

    /// Replace the rules.
    #[must_use]
    pub fn rules(mut self, rules: RulesData) -> Self {
        self.data.rules = rules;
        self
    }

    /// Replace the pacing.
    #[must_use]
    pub fn pacing(mut self, pacing: PacingData) -> Self {
        self.data.pacing = pacing;
        self
    }

    /// Add a unit with default health, movement and start state.
    #[must_use]
    pub fn unit(self, name: &str, faction: Faction, tile: (u32, u32)) -> Self {
        self.unit_with(UnitData {
            name: name.to_string(),
            faction,
            tile,
            health: 1,
            movement: 3,
            start_state: StateKind::Idle,
        })
    }

    /// Add a fully specified unit.
    #[must_use]
    pub fn unit_with(mut self, unit: UnitData) -> Self {
        self.data.units.push(unit);
        self
    }

    /// Finish without validating.
    #[must_use]
    pub fn build(self) -> ScenarioData {
        self.data
    }
}

/// Player against a single enemy in opposite corners of a 6x6 grid.
#[must_use]
pub fn duel() -> ScenarioData {
    ScenarioBuilder::new("duel", 6, 6)
        .seed(1)
        .unit("Commander", Faction::Player, (0, 0))
        .unit("Raider", Faction::Enemy, (5, 5))
        .build()
}

/// A small battle with allies escorting the player against three enemies.
#[must_use]
pub fn skirmish() -> ScenarioData {
    let sturdy = |name: &str, faction, tile| UnitData {
        name: name.to_string(),
        faction,
        tile,
        health: 2,
        movement: 3,
        start_state: StateKind::Idle,
    };
    ScenarioBuilder::new("skirmish", 8, 8)
        .seed(42)
        .unit_with(sturdy("Commander", Faction::Player, (0, 0)))
        .unit("Wing Alpha", Faction::Ally, (1, 0))
        .unit("Wing Beta", Faction::Ally, (0, 1))
        .unit_with(sturdy("Raider", Faction::Enemy, (7, 7)))
        .unit("Reaver", Faction::Enemy, (6, 7))
        .unit("Marauder", Faction::Enemy, (7, 4))
        .build()
}
