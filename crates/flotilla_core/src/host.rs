//! Spatial queries the simulation needs from its host.
//!
//! The core never walks the world on its own; neighbor discovery, modifier
//! application and detection all go through a [`SpatialQuery`]. The
//! default host is [`GridIndex`], which knows the square layout of the
//! board and only inspects the cells a radius can reach. [`ScanQuery`]
//! works on any graph by testing every tile.

use std::fmt::Debug;

use crate::board::Board;
use crate::error::{GameError, Result};
use crate::math::{Fixed, Vec2Fixed};
use crate::rules::MAX_WORLD_EXTENT;
use crate::tiles::{TileCoord, TileGraph, TileId};
use crate::units::{Unit, UnitId};

/// Radius queries over tiles and units.
pub trait SpatialQuery: Debug + Send + Sync {
    /// Tiles whose center lies within `radius` of `position`, ascending id.
    fn tiles_in_radius(&self, graph: &TileGraph, position: Vec2Fixed, radius: Fixed) -> Vec<TileId>;

    /// Active units standing within `radius` of `position` that pass
    /// `filter`, in registration order.
    fn units_in_radius(
        &self,
        board: &Board,
        position: Vec2Fixed,
        radius: Fixed,
        filter: &dyn Fn(&Unit) -> bool,
    ) -> Vec<UnitId> {
        let mut found: Vec<UnitId> = self
            .tiles_in_radius(board.graph(), position, radius)
            .into_iter()
            .filter_map(|id| board.graph().get(id).and_then(|t| t.occupant()))
            .filter(|&id| {
                board
                    .units()
                    .get(id)
                    .is_some_and(|u| u.is_active() && filter(u))
            })
            .collect();
        found.sort_unstable();
        found
    }

    /// Tiles within `radius` of `tile`, excluding the tile itself.
    fn neighbors_of(&self, graph: &TileGraph, tile: TileId, radius: Fixed) -> Result<Vec<TileId>> {
        let position = graph.tile(tile)?.position();
        Ok(self
            .tiles_in_radius(graph, position, radius)
            .into_iter()
            .filter(|&id| id != tile)
            .collect())
    }

    /// Assign every tile its neighbors. Run once when the board is built.
    fn link_neighbors(&self, graph: &mut TileGraph, radius: Fixed) -> Result<()> {
        for index in 0..graph.len() {
            let id = TileId(index as u32);
            let neighbors = self.neighbors_of(graph, id, radius)?;
            graph.set_neighbors(id, neighbors)?;
        }
        Ok(())
    }
}

/// Linear scan over every tile. Works on any graph shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanQuery;

impl SpatialQuery for ScanQuery {
    fn tiles_in_radius(&self, graph: &TileGraph, position: Vec2Fixed, radius: Fixed) -> Vec<TileId> {
        graph
            .iter()
            .filter(|t| position.within(t.position(), radius))
            .map(|t| t.id())
            .collect()
    }
}

/// Square grid layout: tile `(x, y)` sits at `(x * spacing, y * spacing)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridIndex {
    width: u32,
    height: u32,
    spacing: Fixed,
}

impl GridIndex {
    /// Create a layout. Dimensions and spacing must be positive and the
    /// board may span at most [`MAX_WORLD_EXTENT`] world units.
    pub fn new(width: u32, height: u32, spacing: Fixed) -> Result<Self> {
        if width == 0 || height == 0 || spacing <= Fixed::ZERO {
            return Err(GameError::InvalidScenario(format!(
                "invalid grid {width}x{height} with spacing {spacing}"
            )));
        }
        let limit = Fixed::from_num(MAX_WORLD_EXTENT);
        let extent = Fixed::checked_from_num(width.max(height) - 1)
            .and_then(|cells| cells.checked_mul(spacing));
        if spacing > limit || !extent.is_some_and(|e| e <= limit) {
            return Err(GameError::InvalidScenario(format!(
                "grid {width}x{height} with spacing {spacing} exceeds {MAX_WORLD_EXTENT} world units"
            )));
        }
        Ok(Self {
            width,
            height,
            spacing,
        })
    }

    /// Columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// World position of a coordinate.
    #[must_use]
    pub fn position_of(&self, coord: TileCoord) -> Vec2Fixed {
        Vec2Fixed::new(
            Fixed::saturating_from_num(coord.x).saturating_mul(self.spacing),
            Fixed::saturating_from_num(coord.y).saturating_mul(self.spacing),
        )
    }

    /// Build the tile graph in row-major order and link neighbors
    /// within `neighbor_radius`.
    pub fn build_graph(&self, neighbor_radius: Fixed) -> Result<TileGraph> {
        let coords = (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| TileCoord::new(x, y)));
        let mut graph = TileGraph::with_tiles(coords.map(|c| (c, self.position_of(c))))?;
        self.link_neighbors(&mut graph, neighbor_radius)?;
        Ok(graph)
    }

    /// Inclusive cell range covering `[center - radius, center + radius]`
    /// on one axis, clamped to `0..len`.
    fn axis_range(&self, center: Fixed, radius: Fixed, len: u32) -> Option<(u32, u32)> {
        let lo = center
            .saturating_sub(radius)
            .saturating_div(self.spacing)
            .saturating_ceil();
        let hi = center
            .saturating_add(radius)
            .saturating_div(self.spacing)
            .floor();
        let lo = lo.to_num::<i64>().max(0);
        let hi = hi.to_num::<i64>().min(i64::from(len) - 1);
        (lo <= hi).then(|| (lo as u32, hi as u32))
    }
}

impl SpatialQuery for GridIndex {
    fn tiles_in_radius(&self, graph: &TileGraph, position: Vec2Fixed, radius: Fixed) -> Vec<TileId> {
        let (Some((x0, x1)), Some((y0, y1))) = (
            self.axis_range(position.x, radius, self.width),
            self.axis_range(position.y, radius, self.height),
        ) else {
            return Vec::new();
        };

        let mut found = Vec::new();
        for y in y0..=y1 {
            for x in x0..=x1 {
                let Some(id) = graph.at(TileCoord::new(x, y)) else {
                    continue;
                };
                if graph
                    .get(id)
                    .is_some_and(|t| position.within(t.position(), radius))
                {
                    found.push(id);
                }
            }
        }
        found.sort_unstable();
        found
    }
}
