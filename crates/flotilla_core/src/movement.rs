//! Movement executor.
//!
//! A [`MoveOrder`] is turned into a [`MovementTask`] by [`begin`], which
//! runs any search the policy needs and keeps only the owned result; the
//! search session is already cleaned up when the task exists. The task
//! then performs one step per [`MovementTask::poll`], so the caller decides
//! how far apart steps are in time.
//!
//! Every attempted step costs one point of the unit's budget, whether it
//! lands or is refused because the target tile is taken.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::error::Result;
use crate::host::SpatialQuery;
use crate::pathfinding::{CostSnapshot, SearchEngine, SearchOutcome};
use crate::tiles::TileId;
use crate::units::UnitId;

/// How a unit moves this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovePolicy {
    /// Follow the reconstructed path to the goal.
    FollowPath,
    /// Each step, take the free labeled neighbor with the lowest total.
    GreedyToward,
    /// Same as [`MovePolicy::GreedyToward`] over an inverted search.
    GreedyAway,
    /// One random neighbor.
    RandomStep,
    /// One random neighbor per point of budget.
    RandomWalk,
}

/// A request to move one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOrder {
    /// Unit to move.
    pub unit: UnitId,
    /// Policy to use.
    pub policy: MovePolicy,
    /// Goal tile for search-based policies.
    pub goal: Option<TileId>,
}

impl MoveOrder {
    /// Create an order.
    #[must_use]
    pub const fn new(unit: UnitId, policy: MovePolicy, goal: Option<TileId>) -> Self {
        Self { unit, policy, goal }
    }
}

/// What one step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepEvent {
    /// The unit moved.
    Moved {
        /// Unit that moved.
        unit: UnitId,
        /// Tile it left.
        from: TileId,
        /// Tile it entered.
        to: TileId,
    },
    /// The target tile was occupied; the unit stayed put.
    Refused {
        /// Unit that tried to move.
        unit: UnitId,
        /// Tile it tried to enter.
        target: TileId,
    },
    /// No candidate tile existed for this step.
    Stalled {
        /// Unit that could not move.
        unit: UnitId,
    },
}

/// Result of polling a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// One step was attempted.
    Stepped(StepEvent),
    /// The task has no steps left.
    Finished,
}

#[derive(Debug, Clone)]
enum Plan {
    Path { path: Vec<TileId>, next: usize },
    Greedy { costs: CostSnapshot },
    Random,
}

/// An in-flight movement.
#[derive(Debug, Clone)]
pub struct MovementTask {
    order: MoveOrder,
    plan: Plan,
    steps_left: u32,
}

/// Plan a movement for `order`.
///
/// Search-based policies run their search here and release the graph
/// before returning. An order without a goal, or a path search that never
/// reached its goal, yields a task with no steps.
pub fn begin(
    order: MoveOrder,
    board: &mut Board,
    engine: &SearchEngine,
    query: &dyn SpatialQuery,
) -> Result<MovementTask> {
    let budget = board.unit(order.unit)?.movement();

    let (plan, steps) = match (order.policy, order.goal) {
        (MovePolicy::FollowPath, Some(goal)) => {
            let result = engine.plan(board, query, order.unit, goal, false)?;
            let steps = match result.outcome {
                SearchOutcome::Reached => {
                    budget.min(result.path.len().saturating_sub(1) as u32)
                }
                SearchOutcome::Exhausted => 0,
            };
            (
                Plan::Path {
                    path: result.path,
                    next: 1,
                },
                steps,
            )
        }
        (MovePolicy::GreedyToward | MovePolicy::GreedyAway, Some(goal)) => {
            let invert = order.policy == MovePolicy::GreedyAway;
            let result = engine.plan(board, query, order.unit, goal, invert)?;
            (Plan::Greedy { costs: result.costs }, budget)
        }
        (MovePolicy::RandomStep, _) => (Plan::Random, budget.min(1)),
        (MovePolicy::RandomWalk, _) => (Plan::Random, budget),
        (_, None) => {
            tracing::debug!(unit = ?order.unit, policy = ?order.policy, "Order without goal");
            (Plan::Random, 0)
        }
    };

    tracing::debug!(unit = ?order.unit, policy = ?order.policy, steps, "Movement planned");
    Ok(MovementTask {
        order,
        plan,
        steps_left: steps,
    })
}

impl MovementTask {
    /// The order this task carries out.
    #[must_use]
    pub const fn order(&self) -> &MoveOrder {
        &self.order
    }

    /// Unit being moved.
    #[must_use]
    pub const fn unit(&self) -> UnitId {
        self.order.unit
    }

    /// Steps still to attempt.
    #[must_use]
    pub const fn steps_left(&self) -> u32 {
        self.steps_left
    }

    /// Whether no steps remain.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.steps_left == 0
    }

    /// Attempt one step.
    pub fn poll(&mut self, board: &mut Board, rng: &mut ChaCha8Rng) -> Result<StepStatus> {
        let unit = self.order.unit;
        if self.steps_left == 0 || !board.unit(unit)?.is_active() {
            self.steps_left = 0;
            return Ok(StepStatus::Finished);
        }
        self.steps_left -= 1;

        let from = board.unit(unit)?.current_tile();
        let target = self.next_target(board, from, rng)?;
        board.units_mut().unit_mut(unit)?.consume_step();

        let event = match target {
            None => StepEvent::Stalled { unit },
            Some(to) => {
                if board.relocate(unit, to)? {
                    StepEvent::Moved { unit, from, to }
                } else {
                    StepEvent::Refused { unit, target: to }
                }
            }
        };
        tracing::debug!(?event, steps_left = self.steps_left, "Movement step");
        Ok(StepStatus::Stepped(event))
    }

    /// Run every remaining step at once.
    pub fn run_to_completion(
        &mut self,
        board: &mut Board,
        rng: &mut ChaCha8Rng,
    ) -> Result<Vec<StepEvent>> {
        let mut events = Vec::new();
        while let StepStatus::Stepped(event) = self.poll(board, rng)? {
            events.push(event);
        }
        Ok(events)
    }

    fn next_target(
        &mut self,
        board: &Board,
        from: TileId,
        rng: &mut ChaCha8Rng,
    ) -> Result<Option<TileId>> {
        let graph = board.graph();
        match &mut self.plan {
            Plan::Path { path, next } => {
                let target = path.get(*next).copied();
                *next += 1;
                Ok(target)
            }
            Plan::Greedy { costs } => {
                // Strict comparison keeps the first neighbor on ties.
                let mut best: Option<(TileId, _)> = None;
                for &id in graph.neighbors(from)? {
                    let Some(total) = costs.total(id) else {
                        continue;
                    };
                    if graph.is_occupied(id) {
                        continue;
                    }
                    if best.map_or(true, |(_, b)| total < b) {
                        best = Some((id, total));
                    }
                }
                Ok(best.map(|(id, _)| id))
            }
            Plan::Random => {
                let neighbors = graph.neighbors(from)?;
                if neighbors.is_empty() {
                    return Ok(None);
                }
                Ok(Some(neighbors[rng.gen_range(0..neighbors.len())]))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factions::Faction;
    use crate::fsm::StateKind;
    use crate::host::GridIndex;
    use crate::math::Fixed;
    use crate::rules::Rules;
    use crate::tiles::TileCoord;
    use crate::units::UnitSpawnParams;
    use rand::SeedableRng;

    struct World {
        board: Board,
        index: GridIndex,
        engine: SearchEngine,
        rng: ChaCha8Rng,
    }

    impl World {
        fn new(w: u32, h: u32) -> Self {
            let index = GridIndex::new(w, h, Fixed::from_num(3)).unwrap();
            Self {
                board: Board::new(index.build_graph(Fixed::from_num(5)).unwrap()),
                index,
                engine: SearchEngine::from_rules(&Rules::default()),
                rng: ChaCha8Rng::seed_from_u64(7),
            }
        }

        fn tile(&self, x: u32, y: u32) -> TileId {
            self.board.graph().at(TileCoord::new(x, y)).unwrap()
        }

        fn spawn(&mut self, faction: Faction, x: u32, y: u32, movement: u32) -> UnitId {
            let tile = self.tile(x, y);
            self.board
                .spawn(UnitSpawnParams {
                    name: format!("{faction:?}"),
                    faction,
                    tile,
                    health: 1,
                    movement,
                    start_state: StateKind::Idle,
                })
                .unwrap()
        }

        fn run(&mut self, order: MoveOrder) -> Vec<StepEvent> {
            let mut task = begin(order, &mut self.board, &self.engine, &self.index).unwrap();
            assert!(self.board.graph().is_scratch_clean());
            task.run_to_completion(&mut self.board, &mut self.rng).unwrap()
        }

        fn at(&self, unit: UnitId) -> TileId {
            self.board.unit(unit).unwrap().current_tile()
        }
    }

    #[test]
    fn test_follow_path_moves_full_budget_toward_corner() {
        let mut world = World::new(5, 5);
        let unit = world.spawn(Faction::Player, 0, 0, 2);
        let goal = world.tile(4, 4);
        let events = world.run(MoveOrder::new(unit, MovePolicy::FollowPath, Some(goal)));
        assert_eq!(events.len(), 2);
        assert_eq!(world.at(unit), world.tile(2, 2));
        assert_eq!(world.board.unit(unit).unwrap().movement(), 0);
    }

    #[test]
    fn test_follow_path_stops_at_short_path() {
        let mut world = World::new(3, 3);
        let unit = world.spawn(Faction::Player, 1, 1, 3);
        let goal = world.tile(2, 2);
        let events = world.run(MoveOrder::new(unit, MovePolicy::FollowPath, Some(goal)));
        assert_eq!(events.len(), 1);
        assert_eq!(world.at(unit), goal);
        assert_eq!(world.board.unit(unit).unwrap().movement(), 2);
    }

    #[test]
    fn test_follow_path_to_unreachable_goal_does_nothing() {
        let mut world = World::new(3, 1);
        let unit = world.spawn(Faction::Player, 0, 0, 3);
        world.spawn(Faction::Enemy, 1, 0, 1);
        let goal = world.tile(2, 0);
        let events = world.run(MoveOrder::new(unit, MovePolicy::FollowPath, Some(goal)));
        assert!(events.is_empty());
        assert_eq!(world.board.unit(unit).unwrap().movement(), 3);
    }

    #[test]
    fn test_path_step_onto_newly_occupied_tile_is_refused() {
        let mut world = World::new(4, 1);
        let unit = world.spawn(Faction::Player, 0, 0, 3);
        let goal = world.tile(3, 0);
        let mut task = begin(
            MoveOrder::new(unit, MovePolicy::FollowPath, Some(goal)),
            &mut world.board,
            &world.engine,
            &world.index,
        )
        .unwrap();
        assert_eq!(task.steps_left(), 3);

        // Someone steps into the path after planning.
        world.spawn(Faction::Ally, 1, 0, 1);
        let first = task.poll(&mut world.board, &mut world.rng).unwrap();
        assert_eq!(
            first,
            StepStatus::Stepped(StepEvent::Refused {
                unit,
                target: world.tile(1, 0)
            })
        );
        assert_eq!(world.board.unit(unit).unwrap().movement(), 2);
        assert_eq!(world.at(unit), world.tile(0, 0));
    }

    #[test]
    fn test_greedy_toward_closes_on_occupied_target() {
        let mut world = World::new(6, 1);
        let target = world.spawn(Faction::Player, 0, 0, 1);
        let enemy = world.spawn(Faction::Enemy, 5, 0, 2);
        let goal = world.at(target);
        world.run(MoveOrder::new(enemy, MovePolicy::GreedyToward, Some(goal)));
        assert_eq!(world.at(enemy), world.tile(3, 0));
    }

    #[test]
    fn test_greedy_away_flees() {
        let mut world = World::new(6, 1);
        let threat = world.spawn(Faction::Player, 0, 0, 1);
        let enemy = world.spawn(Faction::Enemy, 2, 0, 2);
        let goal = world.at(threat);
        world.run(MoveOrder::new(enemy, MovePolicy::GreedyAway, Some(goal)));
        assert_eq!(world.at(enemy), world.tile(4, 0));
    }

    #[test]
    fn test_greedy_stalls_when_boxed_in() {
        let mut world = World::new(3, 1);
        let unit = world.spawn(Faction::Enemy, 0, 0, 2);
        world.spawn(Faction::Player, 1, 0, 1);
        let goal = world.tile(2, 0);
        let events = world.run(MoveOrder::new(unit, MovePolicy::GreedyToward, Some(goal)));
        assert_eq!(events, vec![StepEvent::Stalled { unit }; 2]);
        assert_eq!(world.board.unit(unit).unwrap().movement(), 0);
    }

    #[test]
    fn test_random_step_takes_one_step() {
        let mut world = World::new(3, 3);
        let unit = world.spawn(Faction::Ally, 1, 1, 3);
        let events = world.run(MoveOrder::new(unit, MovePolicy::RandomStep, None));
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], StepEvent::Moved { .. }));
        assert_eq!(world.board.unit(unit).unwrap().movement(), 2);
        assert_ne!(world.at(unit), world.tile(1, 1));
    }

    #[test]
    fn test_random_walk_spends_whole_budget() {
        let mut world = World::new(4, 4);
        let unit = world.spawn(Faction::Ally, 0, 0, 4);
        let events = world.run(MoveOrder::new(unit, MovePolicy::RandomWalk, None));
        assert_eq!(events.len(), 4);
        assert_eq!(world.board.unit(unit).unwrap().movement(), 0);
    }

    #[test]
    fn test_search_order_without_goal_has_no_steps() {
        let mut world = World::new(2, 2);
        let unit = world.spawn(Faction::Ally, 0, 0, 2);
        let task = begin(
            MoveOrder::new(unit, MovePolicy::GreedyToward, None),
            &mut world.board,
            &world.engine,
            &world.index,
        )
        .unwrap();
        assert!(task.is_finished());
    }

    #[test]
    fn test_same_seed_same_walk() {
        let walk = || {
            let mut world = World::new(5, 5);
            let unit = world.spawn(Faction::Ally, 2, 2, 6);
            world.run(MoveOrder::new(unit, MovePolicy::RandomWalk, None))
        };
        assert_eq!(walk(), walk());
    }
}
