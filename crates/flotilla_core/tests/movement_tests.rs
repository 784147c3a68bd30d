//! Movement executor: budget accounting and the small-grid walkthrough.

use flotilla_core::factions::Faction;
use flotilla_core::movement::{self, MoveOrder, MovePolicy, StepEvent};
use flotilla_core::pathfinding::SearchEngine;
use flotilla_core::rules::Rules;
use flotilla_test_utils::fixtures::{open_board, orthogonal_board, spawn, tile_at};
use flotilla_test_utils::proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const POLICIES: [MovePolicy; 5] = [
    MovePolicy::FollowPath,
    MovePolicy::GreedyToward,
    MovePolicy::GreedyAway,
    MovePolicy::RandomStep,
    MovePolicy::RandomWalk,
];

proptest! {
    #[test]
    fn prop_budget_drops_by_attempted_steps(
        policy in 0usize..POLICIES.len(),
        budget in 0u32..6,
        mover in (0u32..5, 0u32..5),
        other in (0u32..5, 0u32..5),
        goal in (0u32..5, 0u32..5),
        seed in any::<u64>(),
    ) {
        prop_assume!(mover != other);
        let (mut board, index) = open_board(5, 5);
        let unit = spawn(&mut board, Faction::Ally, mover, budget);
        spawn(&mut board, Faction::Enemy, other, 1);
        let goal = tile_at(&board, goal);

        let engine = SearchEngine::from_rules(&Rules::default());
        let order = MoveOrder::new(unit, POLICIES[policy], Some(goal));
        let mut task = movement::begin(order, &mut board, &engine, &index).unwrap();
        prop_assert!(board.graph().is_scratch_clean());

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let events = task.run_to_completion(&mut board, &mut rng).unwrap();
        let attempted = events.len() as u32;
        prop_assert!(attempted <= budget);
        prop_assert_eq!(board.unit(unit).unwrap().movement(), budget - attempted);
        prop_assert!(task.is_finished());
    }
}

#[test]
fn test_center_to_corner_on_three_by_three() {
    let (mut board, index) = orthogonal_board(3, 3);
    let unit = spawn(&mut board, Faction::Player, (1, 1), 2);
    let center = tile_at(&board, (1, 1));
    let corner = tile_at(&board, (2, 2));

    let engine = SearchEngine::from_rules(&Rules::default());
    let order = MoveOrder::new(unit, MovePolicy::FollowPath, Some(corner));
    let mut task = movement::begin(order, &mut board, &engine, &index).unwrap();
    assert_eq!(task.steps_left(), 2);

    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let events = task.run_to_completion(&mut board, &mut rng).unwrap();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| matches!(e, StepEvent::Moved { .. })));

    let moved = board.unit(unit).unwrap();
    assert_eq!(moved.current_tile(), corner);
    assert_eq!(moved.movement(), 0);
    assert!(!board.graph().is_occupied(center));
    assert_eq!(board.graph().tile(corner).unwrap().occupant(), Some(unit));
    for tile in board.graph().iter() {
        assert_eq!(tile.nav().parent, None, "{} kept a parent", tile.name());
    }
}

#[test]
fn test_greedy_step_takes_diagonal_first() {
    let (mut board, index) = open_board(3, 3);
    let unit = spawn(&mut board, Faction::Player, (1, 1), 2);
    let center = tile_at(&board, (1, 1));
    let corner = tile_at(&board, (2, 2));

    let engine = SearchEngine::from_rules(&Rules::default());
    let order = MoveOrder::new(unit, MovePolicy::GreedyToward, Some(corner));
    let mut task = movement::begin(order, &mut board, &engine, &index).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let events = task.run_to_completion(&mut board, &mut rng).unwrap();

    assert_eq!(events.len(), 2);
    assert_eq!(
        events[0],
        StepEvent::Moved {
            unit,
            from: center,
            to: corner
        }
    );
    assert_eq!(board.unit(unit).unwrap().movement(), 0);
}

#[test]
fn test_path_to_occupied_goal_spends_nothing() {
    let (mut board, index) = open_board(4, 4);
    let unit = spawn(&mut board, Faction::Ally, (0, 0), 3);
    spawn(&mut board, Faction::Enemy, (3, 3), 1);

    let engine = SearchEngine::from_rules(&Rules::default());
    let goal = tile_at(&board, (3, 3));
    let order = MoveOrder::new(unit, MovePolicy::FollowPath, Some(goal));
    let mut task = movement::begin(order, &mut board, &engine, &index).unwrap();
    assert!(task.is_finished());

    let mut rng = ChaCha8Rng::seed_from_u64(0);
    assert!(task.run_to_completion(&mut board, &mut rng).unwrap().is_empty());
    assert_eq!(board.unit(unit).unwrap().movement(), 3);
}
