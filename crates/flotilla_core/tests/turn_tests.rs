//! Rounds, game end and determinism through the public simulation API.

use flotilla_core::data::{PacingData, UnitData};
use flotilla_core::error::GameError;
use flotilla_core::factions::Faction;
use flotilla_core::fsm::StateKind;
use flotilla_core::replay::Replay;
use flotilla_core::scheduler::{RoundPhase, TurnScheduler};
use flotilla_core::simulation::{GameState, PlayerInput, Simulation};
use flotilla_core::tiles::TileCoord;
use flotilla_test_utils::determinism::{
    load, passive_step, run_parallel_simulations, verify_simulation_determinism,
};
use flotilla_test_utils::fixtures::{duel, open_board, skirmish, spawn, ScenarioBuilder};

fn still(name: &str, faction: Faction, tile: (u32, u32)) -> UnitData {
    UnitData {
        name: name.to_string(),
        faction,
        tile,
        health: 1,
        movement: 0,
        start_state: StateKind::Idle,
    }
}

#[test]
fn test_round_start_is_not_reentrant() {
    let mut sim = load(&duel());
    assert_eq!(sim.tick().round_started, Some(1));
    assert!(matches!(sim.start_round(), Err(GameError::RoundInProgress(1))));
    assert_eq!(sim.scheduler().round(), 1);
    assert_eq!(sim.scheduler().phase(), RoundPhase::PlayerTurn);
}

#[test]
fn test_scheduler_refuses_second_round_directly() {
    let (mut board, _) = open_board(3, 3);
    let player = spawn(&mut board, Faction::Player, (0, 0), 1);
    spawn(&mut board, Faction::Enemy, (2, 2), 1);

    let mut scheduler = TurnScheduler::new(PacingData::default());
    assert_eq!(scheduler.start_round(&mut board, player).unwrap(), 1);
    assert!(scheduler.start_round(&mut board, player).is_err());
    assert_eq!(scheduler.round(), 1);
    assert_eq!(scheduler.queue().len(), 1);
}

#[test]
fn test_ai_waits_for_player_end_turn() {
    let mut sim = load(&skirmish());
    sim.tick();
    for _ in 0..50 {
        let events = sim.tick();
        assert!(events.turns_started.is_empty());
    }
    assert!(sim.is_player_turn());

    sim.apply_input(PlayerInput::EndTurn).unwrap();
    let mut started = Vec::new();
    while sim.scheduler().is_round_in_progress() {
        started.extend(sim.tick().turns_started);
    }
    let ai: Vec<_> = sim
        .board()
        .units()
        .iter()
        .filter(|u| u.faction().is_ai())
        .map(|u| u.id())
        .collect();
    assert_eq!(started, ai);
}

#[test]
fn test_player_move_follows_selection() {
    let mut sim = load(&duel());
    sim.tick();
    sim.apply_input(PlayerInput::SelectTile(TileCoord::new(2, 0))).unwrap();
    sim.apply_input(PlayerInput::SubmitMove).unwrap();
    assert!(matches!(
        sim.apply_input(PlayerInput::SubmitMove),
        Err(GameError::MovementInFlight(_))
    ));
    while sim.scheduler().movement_in_flight() {
        sim.tick();
    }
    let player = sim.board().unit(sim.player()).unwrap();
    assert_eq!(
        player.current_tile(),
        sim.board().graph().at(TileCoord::new(2, 0)).unwrap()
    );
    assert_eq!(player.movement(), 1);
}

#[test]
fn test_input_outside_player_turn_is_rejected() {
    let mut sim = load(&duel());
    assert!(matches!(
        sim.apply_input(PlayerInput::EndTurn),
        Err(GameError::NotPlayersTurn)
    ));
    assert!(sim
        .apply_input(PlayerInput::SelectTile(TileCoord::new(40, 40)))
        .is_err());
}

#[test]
fn test_ally_strike_wins_the_game() {
    let scenario = ScenarioBuilder::new("strike", 6, 6)
        .unit("Commander", Faction::Player, (0, 5))
        .unit_with(still("Wing", Faction::Ally, (1, 0)))
        .unit_with(still("Raider", Faction::Enemy, (2, 0)))
        .build();
    let mut sim = load(&scenario);

    let mut over = None;
    for _ in 0..20 {
        if sim.is_player_turn() {
            sim.apply_input(PlayerInput::EndTurn).unwrap();
        }
        let events = sim.tick();
        if let Some(state) = events.game_over {
            assert_eq!(events.attacks.len(), 1);
            assert!(events.attacks[0].eliminated);
            over = Some(state);
            break;
        }
    }
    assert_eq!(over, Some(GameState::Win));
    assert!(!sim.scheduler().is_round_in_progress());
    assert!(sim.tick().is_empty());
}

#[test]
fn test_enemy_strike_loses_the_game() {
    let scenario = ScenarioBuilder::new("ambush", 4, 4)
        .unit("Commander", Faction::Player, (0, 0))
        .unit_with(still("Raider", Faction::Enemy, (1, 1)))
        .build();
    let mut sim = load(&scenario);
    for _ in 0..20 {
        passive_step(&mut sim);
    }
    assert_eq!(sim.game_state(), GameState::Loss);
    assert!(!sim.board().unit(sim.player()).unwrap().is_active());
}

#[test]
fn test_lone_enemy_switches_to_retreat() {
    let mut sim = load(&duel());
    let mut transitions = Vec::new();
    for _ in 0..10 {
        if sim.is_player_turn() {
            sim.apply_input(PlayerInput::EndTurn).unwrap();
        }
        transitions.extend(sim.tick().transitions);
    }
    assert_eq!(transitions.len(), 1);
    assert_eq!(transitions[0].from, StateKind::Idle);
    assert_eq!(transitions[0].to, StateKind::Retreating);
}

#[test]
fn test_no_enemies_is_an_immediate_win() {
    let scenario = ScenarioBuilder::new("quiet", 3, 3)
        .unit("Commander", Faction::Player, (0, 0))
        .unit("Wing", Faction::Ally, (2, 2))
        .build();
    let mut sim = load(&scenario);
    sim.tick();
    assert_eq!(sim.tick().game_over, Some(GameState::Win));
}

#[test]
fn test_skirmish_is_deterministic() {
    assert!(verify_simulation_determinism(&skirmish(), 500));
    run_parallel_simulations(&skirmish(), 3, 300).assert_deterministic();
}

#[test]
fn test_recorded_skirmish_replays() {
    let scenario = skirmish();
    let mut sim = load(&scenario);
    let mut replay = Replay::new(scenario);
    let mut record = |sim: &mut Simulation, input| {
        replay.record_input(sim.current_tick(), input);
        let _ = sim.apply_input(input);
    };

    for _ in 0..300 {
        if sim.is_player_turn() && !sim.scheduler().movement_in_flight() {
            record(&mut sim, PlayerInput::SelectTile(TileCoord::new(3, 3)));
            record(&mut sim, PlayerInput::SubmitMove);
            record(&mut sim, PlayerInput::EndTurn);
        }
        sim.tick();
    }
    replay.finalize(sim.current_tick(), sim.state_hash());

    let restored = Replay::from_bytes(&replay.to_bytes().unwrap()).unwrap();
    assert!(restored.verify().unwrap().matches());
}
