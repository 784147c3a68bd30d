//! Core simulation loop.
//!
//! The simulation runs at a fixed tick rate. Each tick either starts a
//! round or lets the [`TurnScheduler`] do one piece of work; player input
//! arrives between ticks through [`Simulation::apply_input`].
//!
//! # Determinism
//!
//! - No floating-point math (uses fixed-point via [`Fixed`](crate::math::Fixed))
//! - Random steps come from a `ChaCha8Rng` seeded by the scenario
//! - Units and tiles are always visited in id order
//! - Same scenario and inputs always produce the same [`Simulation::state_hash`]
//!
//! # Example
//!
//! ```
//! use flotilla_core::data::ScenarioData;
//! use flotilla_core::simulation::{PlayerInput, Simulation};
//! use flotilla_core::tiles::TileCoord;
//!
//! let scenario = ScenarioData::from_ron_str(r#"
//!     ScenarioData(
//!         name: "doc",
//!         grid: GridData(width: 4, height: 4),
//!         units: [
//!             UnitData(name: "Commander", faction: Player, tile: (0, 0)),
//!             UnitData(name: "Raider", faction: Enemy, tile: (3, 3)),
//!         ],
//!     )
//! "#).unwrap();
//!
//! let mut sim = Simulation::from_scenario(&scenario).unwrap();
//! let events = sim.tick();
//! assert_eq!(events.round_started, Some(1));
//!
//! sim.apply_input(PlayerInput::SelectTile(TileCoord::new(1, 1))).unwrap();
//! sim.apply_input(PlayerInput::SubmitMove).unwrap();
//! sim.apply_input(PlayerInput::EndTurn).unwrap();
//! sim.tick();
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::combat::AttackEvent;
use crate::data::ScenarioData;
use crate::error::{GameError, Result};
use crate::factions::Faction;
use crate::fsm::StateTransition;
use crate::host::{GridIndex, SpatialQuery};
use crate::math::Fixed;
use crate::movement::{self, MoveOrder, MovePolicy, StepEvent};
use crate::pathfinding::SearchEngine;
use crate::rules::Rules;
use crate::scheduler::{RoundPhase, TurnScheduler, TurnWorld};
use crate::tiles::{TileCoord, TileId};
use crate::units::{UnitId, UnitSpawnParams};

/// Ticks per second for the simulation.
pub const TICK_RATE: u32 = 20;

/// Duration of one tick in milliseconds.
pub const TICK_DURATION_MS: u32 = 1000 / TICK_RATE;

/// Whether the game is still being played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameState {
    /// Rounds keep running.
    Playing,
    /// Every enemy was eliminated.
    Win,
    /// The player was eliminated.
    Loss,
}

/// Input from the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerInput {
    /// Pick the goal tile for the next move.
    SelectTile(TileCoord),
    /// Move toward the selected tile with the remaining budget.
    SubmitMove,
    /// Finish the player's turn.
    EndTurn,
}

/// Events generated during a simulation tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Round that started this tick.
    pub round_started: Option<u32>,
    /// Round that completed this tick.
    pub round_completed: Option<u32>,
    /// AI units whose turn started.
    pub turns_started: Vec<UnitId>,
    /// State changes picked at turn start.
    pub transitions: Vec<StateTransition>,
    /// Movement steps attempted.
    pub steps: Vec<StepEvent>,
    /// Strikes that landed.
    pub attacks: Vec<AttackEvent>,
    /// Set on the tick the game ended.
    pub game_over: Option<GameState>,
    /// Problems hit during the tick. The tick still completes.
    pub errors: Vec<String>,
}

impl TickEvents {
    /// Whether nothing happened this tick.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// The simulation state.
#[derive(Debug)]
pub struct Simulation {
    name: String,
    tick: u64,
    state: GameState,
    board: Board,
    scheduler: TurnScheduler,
    engine: SearchEngine,
    rules: Rules,
    query: Box<dyn SpatialQuery>,
    rng: ChaCha8Rng,
    player: UnitId,
    selected: Option<TileId>,
}

impl Simulation {
    /// Build a simulation from a validated scenario.
    pub fn from_scenario(scenario: &ScenarioData) -> Result<Self> {
        scenario.validate()?;
        let rules = Rules::from(&scenario.rules);
        let spacing = Fixed::checked_from_num(scenario.grid.spacing).ok_or_else(|| {
            GameError::InvalidScenario(format!(
                "grid spacing {} is out of range",
                scenario.grid.spacing
            ))
        })?;
        let index = GridIndex::new(scenario.grid.width, scenario.grid.height, spacing)?;
        let graph = index.build_graph(rules.neighbor_radius)?;
        graph.validate()?;
        let mut board = Board::new(graph);

        let mut player = None;
        for unit in &scenario.units {
            let coord = unit.coord();
            let tile = board.graph().at(coord).ok_or_else(|| {
                tracing::error!(unit = %unit.name, %coord, "Unit has no starting tile");
                GameError::NoTileAt(coord)
            })?;
            let id = board.spawn(UnitSpawnParams {
                name: unit.name.clone(),
                faction: unit.faction,
                tile,
                health: unit.health,
                movement: unit.movement,
                start_state: unit.start_state,
            })?;
            if unit.faction == Faction::Player {
                player = Some(id);
            }
        }
        let player = player
            .ok_or_else(|| GameError::InvalidScenario("scenario has no player unit".into()))?;

        tracing::info!(
            scenario = %scenario.name,
            tiles = board.graph().len(),
            units = board.units().len(),
            seed = scenario.seed,
            "Simulation created"
        );

        Ok(Self {
            name: scenario.name.clone(),
            tick: 0,
            state: GameState::Playing,
            board,
            scheduler: TurnScheduler::new(scenario.pacing),
            engine: SearchEngine::from_rules(&rules),
            rules,
            query: Box::new(index),
            rng: ChaCha8Rng::seed_from_u64(scenario.seed),
            player,
            selected: None,
        })
    }

    /// Scenario name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the current simulation tick.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Whether the game is still running.
    #[must_use]
    pub const fn game_state(&self) -> GameState {
        self.state
    }

    /// The board.
    #[must_use]
    pub const fn board(&self) -> &Board {
        &self.board
    }

    /// The turn scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &TurnScheduler {
        &self.scheduler
    }

    /// Game rules in effect.
    #[must_use]
    pub const fn rules(&self) -> &Rules {
        &self.rules
    }

    /// The player's unit.
    #[must_use]
    pub const fn player(&self) -> UnitId {
        self.player
    }

    /// Tile the player last selected.
    #[must_use]
    pub const fn selected(&self) -> Option<TileId> {
        self.selected
    }

    /// Whether the player may act right now.
    #[must_use]
    pub fn is_player_turn(&self) -> bool {
        self.state == GameState::Playing && self.scheduler.phase() == RoundPhase::PlayerTurn
    }

    /// Start a round. Fails while one is already running.
    pub fn start_round(&mut self) -> Result<u32> {
        if self.state != GameState::Playing {
            return Err(GameError::InvalidState(format!(
                "game is over ({:?})",
                self.state
            )));
        }
        self.scheduler.start_round(&mut self.board, self.player)
    }

    /// Advance the simulation by one tick.
    pub fn tick(&mut self) -> TickEvents {
        self.tick += 1;
        let mut events = TickEvents::default();
        if self.state != GameState::Playing {
            return events;
        }

        if !self.scheduler.is_round_in_progress() {
            match self.start_round() {
                Ok(round) => events.round_started = Some(round),
                Err(e) => events.errors.push(e.to_string()),
            }
            return events;
        }

        let result = {
            let mut world = TurnWorld {
                board: &mut self.board,
                engine: &self.engine,
                query: self.query.as_ref(),
                rules: &self.rules,
                rng: &mut self.rng,
                player: self.player,
            };
            self.scheduler.advance(&mut world, &mut events)
        };
        if let Err(e) = result {
            tracing::error!(tick = self.tick, error = %e, "Turn step failed; skipping");
            events.errors.push(e.to_string());
            self.scheduler.skip_current(&mut self.board);
        }

        self.check_game_over(&mut events);
        events
    }

    fn check_game_over(&mut self, events: &mut TickEvents) {
        let units = self.board.units();
        let player_alive = units.get(self.player).is_some_and(|u| u.is_active());
        let state = if !player_alive {
            GameState::Loss
        } else if units.count_active(Faction::Enemy) == 0 {
            GameState::Win
        } else {
            return;
        };

        self.state = state;
        events.game_over = Some(state);
        self.scheduler.abort_round(&mut self.board);
        tracing::info!(tick = self.tick, ?state, "Game over");
    }

    /// Apply one player input.
    ///
    /// Rejected inputs leave the simulation unchanged and come back as
    /// errors for the host to report.
    pub fn apply_input(&mut self, input: PlayerInput) -> Result<()> {
        let result = self.try_apply_input(input);
        if let Err(e) = &result {
            tracing::warn!(?input, error = %e, "Input rejected");
        }
        result
    }

    fn try_apply_input(&mut self, input: PlayerInput) -> Result<()> {
        match input {
            PlayerInput::SelectTile(coord) => {
                let tile = self.board.graph().at(coord).ok_or_else(|| {
                    GameError::InvalidInput(format!("no tile at {coord}"))
                })?;
                self.selected = Some(tile);
                tracing::debug!(%coord, "Tile selected");
                Ok(())
            }
            PlayerInput::SubmitMove => {
                if !self.is_player_turn() {
                    return Err(GameError::NotPlayersTurn);
                }
                if self.scheduler.movement_in_flight() {
                    return Err(GameError::MovementInFlight(self.player));
                }
                let goal = self
                    .selected
                    .ok_or_else(|| GameError::InvalidInput("no tile selected".into()))?;
                let order = MoveOrder::new(self.player, MovePolicy::FollowPath, Some(goal));
                let task = movement::begin(order, &mut self.board, &self.engine, self.query.as_ref())?;
                self.board.units_mut().unit_mut(self.player)?.set_goal(Some(goal));
                self.scheduler.set_player_movement(task)
            }
            PlayerInput::EndTurn => {
                if !self.is_player_turn() {
                    return Err(GameError::NotPlayersTurn);
                }
                self.scheduler.request_end_turn()
            }
        }
    }

    /// Compute a hash of the current simulation state.
    ///
    /// Covers tick, game state, round progress, every unit and every
    /// tile's occupant. Equal hashes across runs mean the runs agree.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.state.hash(&mut hasher);
        self.scheduler.round().hash(&mut hasher);
        self.scheduler.phase().hash(&mut hasher);

        for unit in self.board.units().iter() {
            unit.id().hash(&mut hasher);
            unit.current_tile().hash(&mut hasher);
            unit.goal_tile().hash(&mut hasher);
            unit.hp().hash(&mut hasher);
            unit.movement().hash(&mut hasher);
            unit.is_active().hash(&mut hasher);
            unit.is_its_turn().hash(&mut hasher);
            unit.fsm().hash(&mut hasher);
        }

        for tile in self.board.graph().iter() {
            tile.occupant().hash(&mut hasher);
        }

        hasher.finish()
    }
}
