//! Tile graph: static adjacency plus per-tile search scratch state.
//!
//! Tiles live in an arena and refer to each other by [`TileId`]. Adjacency
//! is assigned once when the board is built and never changes afterwards;
//! at runtime only occupancy and the [`NavScratch`] fields are written.
//!
//! The scratch fields are only meaningful between a search and the cleanup
//! that ends its session (see [`crate::pathfinding::SearchSession`]). Any
//! tile the current search has not labeled has `parent == None`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{Fixed, Vec2Fixed};
use crate::units::UnitId;

/// Index of a tile inside its [`TileGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(pub u32);

impl TileId {
    /// Arena index of this tile.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Grid coordinate of a tile. Unique per board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
}

impl TileCoord {
    /// Create a coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.x, self.y)
    }
}

impl From<(u32, u32)> for TileCoord {
    fn from((x, y): (u32, u32)) -> Self {
        Self::new(x, y)
    }
}

/// Transient pathfinding state stored on each tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NavScratch {
    /// Tile this one was reached from in the current search.
    pub parent: Option<TileId>,
    /// Cost of the edge from the parent (uniform on a grid).
    pub neighbor_cost: Fixed,
    /// Distance to the goal, negated for inverted searches.
    pub goal_cost: Fixed,
    /// Faction-based attraction/repulsion perturbation.
    pub cost_modifier: Fixed,
    /// `neighbor_cost + goal_cost + cost_modifier`.
    pub total_cost: Fixed,
}

impl NavScratch {
    /// Recompute `total_cost` from its parts.
    pub fn update_total(&mut self) {
        self.total_cost = self
            .neighbor_cost
            .saturating_add(self.goal_cost)
            .saturating_add(self.cost_modifier);
    }

    /// Whether every field still holds its default.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

/// A node of the navigation graph.
#[derive(Debug, Clone)]
pub struct Tile {
    id: TileId,
    coord: TileCoord,
    name: String,
    position: Vec2Fixed,
    neighbors: Vec<TileId>,
    occupant: Option<UnitId>,
    nav: NavScratch,
}

impl Tile {
    fn new(id: TileId, coord: TileCoord, position: Vec2Fixed) -> Self {
        Self {
            id,
            coord,
            name: format!("Tile {coord}"),
            position,
            neighbors: Vec::new(),
            occupant: None,
            nav: NavScratch::default(),
        }
    }

    /// Arena id.
    #[must_use]
    pub const fn id(&self) -> TileId {
        self.id
    }

    /// Grid coordinate.
    #[must_use]
    pub const fn coord(&self) -> TileCoord {
        self.coord
    }

    /// Unique display name, `Tile [x,y]`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// World-space position of the tile center.
    #[must_use]
    pub const fn position(&self) -> Vec2Fixed {
        self.position
    }

    /// Adjacent tiles in discovery order.
    #[must_use]
    pub fn neighbors(&self) -> &[TileId] {
        &self.neighbors
    }

    /// Unit standing on this tile, if any.
    #[must_use]
    pub const fn occupant(&self) -> Option<UnitId> {
        self.occupant
    }

    /// Whether a unit stands on this tile.
    #[must_use]
    pub const fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }

    /// Current search scratch state.
    #[must_use]
    pub const fn nav(&self) -> &NavScratch {
        &self.nav
    }

    pub(crate) fn nav_mut(&mut self) -> &mut NavScratch {
        &mut self.nav
    }
}

impl PartialEq for Tile {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Tile {}

/// Arena of tiles with coordinate lookup.
#[derive(Debug, Clone, Default)]
pub struct TileGraph {
    tiles: Vec<Tile>,
    by_coord: BTreeMap<TileCoord, TileId>,
}

impl TileGraph {
    /// Create a graph from tile coordinates and positions, without adjacency.
    ///
    /// Duplicate coordinates are rejected.
    pub fn with_tiles<I>(tiles: I) -> Result<Self>
    where
        I: IntoIterator<Item = (TileCoord, Vec2Fixed)>,
    {
        let mut graph = Self::default();
        for (coord, position) in tiles {
            if graph.by_coord.contains_key(&coord) {
                return Err(GameError::InvalidScenario(format!(
                    "duplicate tile coordinate {coord}"
                )));
            }
            let id = TileId(graph.tiles.len() as u32);
            graph.tiles.push(Tile::new(id, coord, position));
            graph.by_coord.insert(coord, id);
        }
        Ok(graph)
    }

    /// Number of tiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether the graph has no tiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Look up a tile.
    #[must_use]
    pub fn get(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(id.index())
    }

    pub(crate) fn get_mut(&mut self, id: TileId) -> Option<&mut Tile> {
        self.tiles.get_mut(id.index())
    }

    /// Look up a tile, turning a miss into [`GameError::UnknownTile`].
    pub fn tile(&self, id: TileId) -> Result<&Tile> {
        self.get(id).ok_or(GameError::UnknownTile(id))
    }

    /// Find the tile at a grid coordinate.
    #[must_use]
    pub fn at(&self, coord: TileCoord) -> Option<TileId> {
        self.by_coord.get(&coord).copied()
    }

    /// Iterate over all tiles in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Neighbors of a tile in discovery order.
    pub fn neighbors(&self, id: TileId) -> Result<&[TileId]> {
        Ok(self.tile(id)?.neighbors())
    }

    /// Whether a unit stands on the tile. Unknown tiles count as blocked.
    #[must_use]
    pub fn is_occupied(&self, id: TileId) -> bool {
        self.get(id).map_or(true, Tile::is_occupied)
    }

    /// Assign the adjacency list of a tile as reported by the host.
    ///
    /// Entries are stored as given; [`TileGraph::validate`] and the search
    /// engine report entries that point nowhere.
    pub fn set_neighbors(&mut self, id: TileId, neighbors: Vec<TileId>) -> Result<()> {
        let tile = self.get_mut(id).ok_or(GameError::UnknownTile(id))?;
        tile.neighbors = neighbors;
        Ok(())
    }

    /// Check every adjacency entry resolves to a tile.
    pub fn validate(&self) -> Result<()> {
        for tile in &self.tiles {
            for &neighbor in &tile.neighbors {
                if self.get(neighbor).is_none() {
                    tracing::error!(tile = tile.name(), ?neighbor, "Tile lists a missing neighbor");
                    return Err(GameError::CorruptGraph {
                        tile: tile.id,
                        neighbor,
                    });
                }
            }
        }
        Ok(())
    }

    /// Move `unit` from `from` onto `to`.
    ///
    /// Returns `Ok(false)` without changing anything when `to` is held by a
    /// different unit. On success the old tile is vacated and the new one
    /// marked occupied.
    pub fn set_occupant(&mut self, unit: UnitId, from: Option<TileId>, to: TileId) -> Result<bool> {
        match self.tile(to)?.occupant {
            Some(other) if other != unit => return Ok(false),
            _ => {}
        }

        if let Some(from) = from {
            let old = self.get_mut(from).ok_or(GameError::UnknownTile(from))?;
            if old.occupant == Some(unit) {
                old.occupant = None;
            }
        }

        if let Some(tile) = self.get_mut(to) {
            tile.occupant = Some(unit);
        }
        Ok(true)
    }

    /// Clear the occupancy of a tile held by `unit`.
    pub fn vacate(&mut self, unit: UnitId, id: TileId) -> Result<()> {
        let tile = self.get_mut(id).ok_or(GameError::UnknownTile(id))?;
        if tile.occupant == Some(unit) {
            tile.occupant = None;
        }
        Ok(())
    }

    /// Whether every tile's scratch state is at its defaults.
    #[must_use]
    pub fn is_scratch_clean(&self) -> bool {
        self.tiles.iter().all(|t| t.nav.is_clean())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: u32) -> TileGraph {
        let mut graph = TileGraph::with_tiles(
            (0..n).map(|x| (TileCoord::new(x, 0), Vec2Fixed::from_world(x as i32, 0))),
        )
        .unwrap();
        for x in 0..n {
            let mut adj = Vec::new();
            if x > 0 {
                adj.push(TileId(x - 1));
            }
            if x + 1 < n {
                adj.push(TileId(x + 1));
            }
            graph.set_neighbors(TileId(x), adj).unwrap();
        }
        graph
    }

    #[test]
    fn test_tile_names_follow_coordinates() {
        let graph = line(3);
        assert_eq!(graph.tile(TileId(2)).unwrap().name(), "Tile [2,0]");
        assert_eq!(graph.at(TileCoord::new(1, 0)), Some(TileId(1)));
        assert_eq!(graph.at(TileCoord::new(9, 9)), None);
    }

    #[test]
    fn test_tiles_compare_by_name() {
        let a = line(2);
        let b = line(2);
        assert_eq!(a.tile(TileId(1)).unwrap(), b.tile(TileId(1)).unwrap());
        assert_ne!(a.tile(TileId(0)).unwrap(), a.tile(TileId(1)).unwrap());
    }

    #[test]
    fn test_duplicate_coordinates_rejected() {
        let result = TileGraph::with_tiles([
            (TileCoord::new(0, 0), Vec2Fixed::ZERO),
            (TileCoord::new(0, 0), Vec2Fixed::from_world(1, 0)),
        ]);
        assert!(matches!(result, Err(GameError::InvalidScenario(_))));
    }

    #[test]
    fn test_set_occupant_moves_flag() {
        let mut graph = line(3);
        let unit = UnitId(7);
        assert!(graph.set_occupant(unit, None, TileId(0)).unwrap());
        assert!(graph.is_occupied(TileId(0)));

        assert!(graph.set_occupant(unit, Some(TileId(0)), TileId(1)).unwrap());
        assert!(!graph.is_occupied(TileId(0)));
        assert_eq!(graph.tile(TileId(1)).unwrap().occupant(), Some(unit));
    }

    #[test]
    fn test_set_occupant_refuses_held_tile() {
        let mut graph = line(3);
        graph.set_occupant(UnitId(1), None, TileId(1)).unwrap();
        graph.set_occupant(UnitId(2), None, TileId(0)).unwrap();

        assert!(!graph.set_occupant(UnitId(2), Some(TileId(0)), TileId(1)).unwrap());
        assert_eq!(graph.tile(TileId(0)).unwrap().occupant(), Some(UnitId(2)));
        assert_eq!(graph.tile(TileId(1)).unwrap().occupant(), Some(UnitId(1)));
    }

    #[test]
    fn test_validate_reports_dangling_neighbor() {
        let mut graph = line(2);
        graph.set_neighbors(TileId(0), vec![TileId(1), TileId(5)]).unwrap();
        assert_eq!(
            graph.validate(),
            Err(GameError::CorruptGraph {
                tile: TileId(0),
                neighbor: TileId(5)
            })
        );
    }

    #[test]
    fn test_unknown_tile_counts_as_occupied() {
        let graph = line(1);
        assert!(graph.is_occupied(TileId(3)));
    }

    #[test]
    fn test_nav_scratch_total() {
        let mut nav = NavScratch {
            neighbor_cost: Fixed::ONE,
            goal_cost: Fixed::from_num(-4),
            cost_modifier: Fixed::from_num(2),
            ..NavScratch::default()
        };
        nav.update_total();
        assert_eq!(nav.total_cost, Fixed::from_num(-1));
        assert!(!nav.is_clean());
        assert!(NavScratch::default().is_clean());
    }
}
