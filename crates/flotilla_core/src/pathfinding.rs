//! Least-cost-first search over the tile graph.
//!
//! The search labels tiles in place: every tile it reaches gets a parent
//! pointer and cost breakdown in its [`NavScratch`](crate::tiles::NavScratch).
//! All of that happens inside a [`SearchSession`], which records each tile
//! it writes and resets them when it is dropped, so no labels survive into
//! the next unit's search.
//!
//! Costs are not accumulated along the path. A tile's priority is its
//! uniform edge cost plus its straight-line distance to the goal plus the
//! faction modifier, which makes this a best-first search rather than a
//! shortest-path one. Goal distances are negated for flee searches, so
//! priorities can be negative.
//!
//! All calculations use fixed-point math for deterministic results.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use crate::board::Board;
use crate::error::{GameError, Result};
use crate::factions::compute_modifier;
use crate::host::SpatialQuery;
use crate::math::{Fixed, Vec2Fixed};
use crate::rules::Rules;
use crate::tiles::{NavScratch, TileGraph, TileId};
use crate::units::{Unit, UnitId, UnitRoster};

/// How a search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The goal was popped; its parent chain leads back to the start.
    Reached,
    /// The frontier ran dry first. Not an error.
    Exhausted,
}

/// Total costs of the tiles a search labeled, kept after cleanup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CostSnapshot {
    totals: BTreeMap<TileId, Fixed>,
}

impl CostSnapshot {
    /// Total cost of a labeled tile.
    #[must_use]
    pub fn total(&self, tile: TileId) -> Option<Fixed> {
        self.totals.get(&tile).copied()
    }

    /// Whether the search labeled `tile`.
    #[must_use]
    pub fn contains(&self, tile: TileId) -> bool {
        self.totals.contains_key(&tile)
    }

    /// Number of labeled tiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.totals.len()
    }

    /// Whether nothing was labeled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}

/// Everything movement needs from a finished search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// How the search ended.
    pub outcome: SearchOutcome,
    /// Start to goal, inclusive. Empty unless the goal was reached.
    pub path: Vec<TileId>,
    /// Labeled tiles and their totals.
    pub costs: CostSnapshot,
}

/// Frontier entry for the priority queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueueEntry {
    cost: Fixed,
    seq: u32,
    tile: TileId,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on cost; earlier insertion wins ties.
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Search configuration: where and how strongly faction modifiers apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchEngine {
    anchor: Vec2Fixed,
    modifier_radius: Fixed,
    modifier_magnitude: Fixed,
}

impl SearchEngine {
    /// Create an engine whose modifiers cover `modifier_radius` around
    /// `anchor`.
    #[must_use]
    pub const fn new(anchor: Vec2Fixed, modifier_radius: Fixed, modifier_magnitude: Fixed) -> Self {
        Self {
            anchor,
            modifier_radius,
            modifier_magnitude,
        }
    }

    /// Engine configured from game rules.
    #[must_use]
    pub const fn from_rules(rules: &Rules) -> Self {
        Self::new(
            rules.modifier_anchor,
            rules.modifier_radius,
            rules.modifier_magnitude,
        )
    }

    /// Open a session on `graph`.
    ///
    /// The graph stays borrowed until the session ends, so two searches can
    /// never overlap.
    pub fn session<'g>(&self, graph: &'g mut TileGraph) -> SearchSession<'g> {
        SearchSession {
            engine: *self,
            graph,
            dirty: BTreeSet::new(),
        }
    }

    /// Run one full cycle for `actor`: modifiers, search, snapshot, cleanup.
    pub fn plan(
        &self,
        board: &mut Board,
        query: &dyn SpatialQuery,
        actor: UnitId,
        goal: TileId,
        invert: bool,
    ) -> Result<SearchResult> {
        let (graph, units) = board.split_mut();
        let units: &UnitRoster = units;
        let unit = units.unit(actor)?;

        let mut session = self.session(graph);
        session.apply_modifiers(query, units, unit);
        let outcome = session.search(unit.current_tile(), goal, invert)?;
        let path = match outcome {
            SearchOutcome::Reached => session.reconstruct_path(goal),
            SearchOutcome::Exhausted => Vec::new(),
        };
        let costs = session.snapshot();
        tracing::debug!(
            unit = unit.name(),
            ?goal,
            invert,
            ?outcome,
            labeled = costs.len(),
            "Search finished"
        );
        Ok(SearchResult {
            outcome,
            path,
            costs,
        })
    }
}

/// A scoped search over borrowed tiles. Cleans up on drop.
#[derive(Debug)]
pub struct SearchSession<'g> {
    engine: SearchEngine,
    graph: &'g mut TileGraph,
    dirty: BTreeSet<TileId>,
}

impl SearchSession<'_> {
    /// The graph as the session currently sees it.
    #[must_use]
    pub fn graph(&self) -> &TileGraph {
        &*self.graph
    }

    /// Tiles written so far, ascending.
    pub fn dirty_tiles(&self) -> impl Iterator<Item = TileId> + '_ {
        self.dirty.iter().copied()
    }

    fn scratch_mut(&mut self, id: TileId) -> Option<&mut NavScratch> {
        let tile = self.graph.get_mut(id)?;
        self.dirty.insert(id);
        Some(tile.nav_mut())
    }

    /// Write faction modifiers for `actor`.
    ///
    /// Each other active unit overwrites the modifier on every tile within
    /// the engine radius of its anchor, so the last unit in registration
    /// order decides the final value. Returns the number of tiles covered.
    pub fn apply_modifiers(&mut self, query: &dyn SpatialQuery, units: &UnitRoster, actor: &Unit) -> usize {
        let covered =
            query.tiles_in_radius(&*self.graph, self.engine.anchor, self.engine.modifier_radius);
        let mut applied = false;
        for other in units.active().filter(|u| u.id() != actor.id()) {
            let modifier = compute_modifier(
                actor.faction(),
                other.faction(),
                self.engine.modifier_magnitude,
            );
            for &id in &covered {
                if let Some(nav) = self.scratch_mut(id) {
                    nav.cost_modifier = modifier;
                    nav.update_total();
                }
            }
            applied = true;
        }
        if applied {
            covered.len()
        } else {
            0
        }
    }

    /// Search from `start` toward `goal`, or away from it when `invert`.
    ///
    /// Occupied tiles never enter the frontier and the start is never
    /// relabeled. A neighbor id that resolves to no tile is a corrupt graph
    /// and aborts the search with an error.
    pub fn search(&mut self, start: TileId, goal: TileId, invert: bool) -> Result<SearchOutcome> {
        let start_cost = self.graph.tile(start)?.nav().total_cost;
        let goal_position = self.graph.tile(goal)?.position();

        let mut open = BinaryHeap::new();
        let mut seq = 0_u32;
        open.push(QueueEntry {
            cost: start_cost,
            seq,
            tile: start,
        });

        while let Some(current) = open.pop() {
            if current.tile == goal {
                return Ok(SearchOutcome::Reached);
            }

            let neighbors = self.graph.neighbors(current.tile)?.to_vec();
            for neighbor in neighbors {
                let Some(tile) = self.graph.get(neighbor) else {
                    tracing::error!(
                        tile = ?current.tile,
                        ?neighbor,
                        "Search hit a neighbor entry with no tile"
                    );
                    return Err(GameError::CorruptGraph {
                        tile: current.tile,
                        neighbor,
                    });
                };
                if neighbor == start || tile.nav().parent.is_some() || tile.is_occupied() {
                    continue;
                }

                let distance = tile.position().distance(goal_position);
                let goal_cost = if invert { -distance } else { distance };
                let Some(nav) = self.scratch_mut(neighbor) else {
                    continue;
                };
                nav.parent = Some(current.tile);
                nav.neighbor_cost = Fixed::ONE;
                nav.goal_cost = goal_cost;
                nav.update_total();
                let cost = nav.total_cost;

                seq += 1;
                open.push(QueueEntry {
                    cost,
                    seq,
                    tile: neighbor,
                });
            }
        }

        Ok(SearchOutcome::Exhausted)
    }

    /// Follow parent links back from `goal`, returned start-first.
    ///
    /// A tile with no parent yields just itself; an unknown tile yields an
    /// empty path. The walk is bounded by the tile count.
    #[must_use]
    pub fn reconstruct_path(&self, goal: TileId) -> Vec<TileId> {
        let Some(mut tile) = self.graph.get(goal) else {
            return Vec::new();
        };
        let mut path = vec![goal];
        while let Some(parent) = tile.nav().parent {
            if path.len() > self.graph.len() {
                tracing::error!(?goal, "Parent chain loops; path truncated");
                break;
            }
            let Some(next) = self.graph.get(parent) else {
                break;
            };
            path.push(parent);
            tile = next;
        }
        path.reverse();
        path
    }

    /// Totals of every tile the search labeled.
    #[must_use]
    pub fn snapshot(&self) -> CostSnapshot {
        let totals = self
            .dirty
            .iter()
            .filter_map(|&id| {
                let nav = self.graph.get(id)?.nav();
                nav.parent.map(|_| (id, nav.total_cost))
            })
            .collect();
        CostSnapshot { totals }
    }

    /// Reset every written tile to default scratch state.
    ///
    /// Safe to call more than once; dropping the session calls it too.
    pub fn cleanup(&mut self) {
        for id in std::mem::take(&mut self.dirty) {
            if let Some(tile) = self.graph.get_mut(id) {
                *tile.nav_mut() = NavScratch::default();
            }
        }
        #[cfg(feature = "debug-validation")]
        debug_assert!(
            self.graph.is_scratch_clean(),
            "search scratch left outside the dirty set"
        );
    }
}

impl Drop for SearchSession<'_> {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{GridIndex, ScanQuery};
    use crate::tiles::TileCoord;
    use crate::units::UnitId;

    fn grid(w: u32, h: u32) -> TileGraph {
        GridIndex::new(w, h, Fixed::from_num(3))
            .unwrap()
            .build_graph(Fixed::from_num(5))
            .unwrap()
    }

    fn engine() -> SearchEngine {
        SearchEngine::from_rules(&Rules::default())
    }

    fn at(graph: &TileGraph, x: u32, y: u32) -> TileId {
        graph.at(TileCoord::new(x, y)).unwrap()
    }

    #[test]
    fn test_queue_pops_lowest_cost_then_oldest() {
        let mut heap = BinaryHeap::new();
        for (cost, seq) in [(3, 0), (-1, 1), (-1, 2), (2, 3)] {
            heap.push(QueueEntry {
                cost: Fixed::from_num(cost),
                seq,
                tile: TileId(seq),
            });
        }
        let order: Vec<u32> = std::iter::from_fn(|| heap.pop().map(|e| e.seq)).collect();
        assert_eq!(order, vec![1, 2, 3, 0]);
    }

    #[test]
    fn test_search_reaches_corner() {
        let mut graph = grid(3, 3);
        let (start, goal) = (at(&graph, 1, 1), at(&graph, 2, 2));
        let mut session = engine().session(&mut graph);
        assert_eq!(session.search(start, goal, false).unwrap(), SearchOutcome::Reached);
        assert_eq!(session.reconstruct_path(goal), vec![start, goal]);
    }

    #[test]
    fn test_search_to_self_is_trivial() {
        let mut graph = grid(2, 2);
        let start = at(&graph, 0, 0);
        let mut session = engine().session(&mut graph);
        assert_eq!(session.search(start, start, false).unwrap(), SearchOutcome::Reached);
        assert_eq!(session.reconstruct_path(start), vec![start]);
        assert_eq!(session.dirty_tiles().count(), 0);
    }

    #[test]
    fn test_occupied_wall_blocks_goal() {
        let mut graph = grid(3, 3);
        for y in 0..3 {
            let id = at(&graph, 1, y);
            graph.set_occupant(UnitId(y), None, id).unwrap();
        }
        let (start, goal) = (at(&graph, 0, 1), at(&graph, 2, 1));
        let mut session = engine().session(&mut graph);
        assert_eq!(session.search(start, goal, false).unwrap(), SearchOutcome::Exhausted);
        assert_eq!(session.reconstruct_path(goal), vec![goal]);
        for y in 0..3 {
            let wall = session.graph().tile(at(session.graph(), 1, y)).unwrap();
            assert!(wall.nav().parent.is_none());
        }
    }

    #[test]
    fn test_start_is_never_relabeled() {
        let mut graph = grid(3, 3);
        let (start, goal) = (at(&graph, 0, 0), at(&graph, 2, 2));
        let mut session = engine().session(&mut graph);
        session.search(start, goal, false).unwrap();
        assert!(session.graph().tile(start).unwrap().nav().parent.is_none());
        assert_eq!(session.reconstruct_path(goal).first(), Some(&start));
    }

    #[test]
    fn test_inverted_goal_costs_are_negative() {
        let mut graph = grid(4, 1);
        let (start, threat) = (at(&graph, 1, 0), at(&graph, 0, 0));
        let mut session = engine().session(&mut graph);
        session.search(start, threat, true).unwrap();
        let far = session.graph().tile(at(session.graph(), 2, 0)).unwrap();
        assert_eq!(far.nav().goal_cost, Fixed::from_num(-6));
        let near = session.graph().tile(threat).unwrap();
        assert!(near.nav().goal_cost > far.nav().goal_cost);
    }

    #[test]
    fn test_dangling_neighbor_is_reported() {
        let mut graph = grid(2, 1);
        graph.set_neighbors(TileId(0), vec![TileId(1), TileId(42)]).unwrap();
        let mut session = engine().session(&mut graph);
        assert_eq!(
            session.search(TileId(0), TileId(1), false),
            Err(GameError::CorruptGraph {
                tile: TileId(0),
                neighbor: TileId(42)
            })
        );
    }

    #[test]
    fn test_cleanup_is_idempotent_and_scoped() {
        let mut graph = grid(5, 5);
        let (start, goal) = (at(&graph, 0, 0), at(&graph, 4, 4));
        {
            let mut session = engine().session(&mut graph);
            session.search(start, goal, false).unwrap();
            let dirty: BTreeSet<_> = session.dirty_tiles().collect();
            assert!(!dirty.is_empty());
            for tile in session.graph().iter() {
                if !dirty.contains(&tile.id()) {
                    assert!(tile.nav().is_clean(), "{} touched", tile.name());
                }
            }
            session.cleanup();
            session.cleanup();
            assert!(session.graph().is_scratch_clean());
            assert_eq!(session.dirty_tiles().count(), 0);
        }
        assert!(graph.is_scratch_clean());
    }

    #[test]
    fn test_drop_cleans_up_after_early_return() {
        fn search_then_bail(graph: &mut TileGraph) -> Result<()> {
            let mut session = engine().session(graph);
            session.search(TileId(0), TileId(3), false)?;
            Err(GameError::InvalidState("bail".into()))
        }
        let mut graph = grid(2, 2);
        assert!(search_then_bail(&mut graph).is_err());
        assert!(graph.is_scratch_clean());
    }

    #[test]
    fn test_modifiers_follow_last_unit_and_anchor() {
        use crate::factions::Faction;
        use crate::fsm::StateKind;
        use crate::units::UnitSpawnParams;

        let index = GridIndex::new(6, 1, Fixed::from_num(3)).unwrap();
        let mut board = Board::new(index.build_graph(Fixed::from_num(5)).unwrap());
        let spawn = |faction, x| UnitSpawnParams {
            name: format!("{x}"),
            faction,
            tile: TileId(x),
            health: 1,
            movement: 1,
            start_state: StateKind::Idle,
        };
        let ally = board.spawn(spawn(Faction::Ally, 5)).unwrap();
        board.spawn(spawn(Faction::Player, 4)).unwrap();
        board.spawn(spawn(Faction::Enemy, 3)).unwrap();

        // Anchor (0,0), radius 10: tiles x=0..=3 (world 0..9).
        let engine = engine();
        let (graph, units) = board.split_mut();
        let units: &UnitRoster = units;
        let mut session = engine.session(graph);
        let covered = session.apply_modifiers(&ScanQuery, units, units.unit(ally).unwrap());
        assert_eq!(covered, 4);
        for x in 0..6 {
            let nav = *session.graph().tile(TileId(x)).unwrap().nav();
            let expected = if x <= 3 { Fixed::ONE } else { Fixed::ZERO };
            assert_eq!(nav.cost_modifier, expected, "tile {x}");
            assert_eq!(nav.total_cost, expected);
        }
    }

    #[test]
    fn test_plan_leaves_graph_clean() {
        use crate::factions::Faction;
        use crate::fsm::StateKind;
        use crate::units::UnitSpawnParams;

        let index = GridIndex::new(4, 4, Fixed::from_num(3)).unwrap();
        let mut board = Board::new(index.build_graph(Fixed::from_num(5)).unwrap());
        let player = board
            .spawn(UnitSpawnParams {
                name: "p".into(),
                faction: Faction::Player,
                tile: TileId(0),
                health: 1,
                movement: 3,
                start_state: StateKind::Idle,
            })
            .unwrap();
        let result = engine()
            .plan(&mut board, &index, player, TileId(15), false)
            .unwrap();
        assert_eq!(result.outcome, SearchOutcome::Reached);
        assert_eq!(result.path.first(), Some(&TileId(0)));
        assert_eq!(result.path.last(), Some(&TileId(15)));
        assert!(result.costs.contains(TileId(15)));
        assert!(board.graph().is_scratch_clean());
    }
}
