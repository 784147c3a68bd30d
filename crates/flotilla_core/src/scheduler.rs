//! Round-robin turn scheduler.
//!
//! A round is the player's turn followed by one turn per AI unit in
//! registration order. The scheduler is a plain state machine advanced
//! once per simulation tick: each call does at most one unit of work (one
//! movement step, one unit's decision, one phase change) and then waits
//! out the configured pacing delay. Only one round and one movement can be
//! in flight at a time.

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::combat::resolve_attack;
use crate::data::PacingData;
use crate::error::{GameError, Result};
use crate::fsm::{AiContext, StateTransition};
use crate::host::SpatialQuery;
use crate::movement::{self, MovementTask, StepStatus};
use crate::pathfinding::SearchEngine;
use crate::rules::Rules;
use crate::simulation::TickEvents;
use crate::units::UnitId;

/// Where the current round stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum RoundPhase {
    /// No round in progress.
    #[default]
    Idle,
    /// Waiting for the player to move and end the turn.
    PlayerTurn,
    /// About to start the AI unit at `index` in the round's queue.
    UnitTurn {
        /// Position in the round's unit queue.
        index: usize,
    },
    /// The AI unit at `index` is moving.
    UnitMoving {
        /// Position in the round's unit queue.
        index: usize,
    },
    /// All units acted; waiting out the round delay.
    RoundEnding,
}

/// Mutable world access for one scheduler step.
pub(crate) struct TurnWorld<'a> {
    pub board: &'a mut Board,
    pub engine: &'a SearchEngine,
    pub query: &'a dyn SpatialQuery,
    pub rules: &'a Rules,
    pub rng: &'a mut ChaCha8Rng,
    pub player: UnitId,
}

/// Sequences turns within rounds.
#[derive(Debug, Clone)]
pub struct TurnScheduler {
    pacing: PacingData,
    phase: RoundPhase,
    round: u32,
    queue: Vec<UnitId>,
    wait: u32,
    movement: Option<MovementTask>,
    end_turn_requested: bool,
}

impl TurnScheduler {
    /// Create an idle scheduler.
    #[must_use]
    pub fn new(pacing: PacingData) -> Self {
        Self {
            pacing,
            phase: RoundPhase::Idle,
            round: 0,
            queue: Vec::new(),
            wait: 0,
            movement: None,
            end_turn_requested: false,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Number of the current (or last) round. Zero before the first.
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.round
    }

    /// Whether a round is running.
    #[must_use]
    pub fn is_round_in_progress(&self) -> bool {
        self.phase != RoundPhase::Idle
    }

    /// Whether a movement task is in flight.
    #[must_use]
    pub const fn movement_in_flight(&self) -> bool {
        self.movement.is_some()
    }

    /// Ticks left before the next piece of work.
    #[must_use]
    pub const fn wait(&self) -> u32 {
        self.wait
    }

    /// AI units queued for this round, in turn order.
    #[must_use]
    pub fn queue(&self) -> &[UnitId] {
        &self.queue
    }

    /// Begin a new round and hand control to the player.
    ///
    /// Refused with [`GameError::RoundInProgress`] while a round is running.
    pub fn start_round(&mut self, board: &mut Board, player: UnitId) -> Result<u32> {
        if self.is_round_in_progress() {
            tracing::warn!(round = self.round, "Round start refused; round in progress");
            return Err(GameError::RoundInProgress(self.round));
        }

        self.round += 1;
        self.queue = board
            .units()
            .active()
            .filter(|u| u.faction().is_ai())
            .map(|u| u.id())
            .collect();
        self.wait = 0;
        self.movement = None;
        self.end_turn_requested = false;
        self.phase = RoundPhase::PlayerTurn;
        board.units_mut().unit_mut(player)?.start_turn();

        tracing::info!(round = self.round, ai_units = self.queue.len(), "Round started");
        Ok(self.round)
    }

    /// Hand the player's movement to the scheduler.
    pub(crate) fn set_player_movement(&mut self, task: MovementTask) -> Result<()> {
        if self.phase != RoundPhase::PlayerTurn {
            return Err(GameError::NotPlayersTurn);
        }
        if self.movement.is_some() {
            return Err(GameError::MovementInFlight(task.unit()));
        }
        self.movement = Some(task);
        Ok(())
    }

    /// Note that the player wants to end the turn. Honored once the
    /// player's movement has finished.
    pub(crate) fn request_end_turn(&mut self) -> Result<()> {
        if self.phase != RoundPhase::PlayerTurn {
            return Err(GameError::NotPlayersTurn);
        }
        self.end_turn_requested = true;
        Ok(())
    }

    /// Do one tick of work.
    pub(crate) fn advance(&mut self, world: &mut TurnWorld<'_>, events: &mut TickEvents) -> Result<()> {
        if self.wait > 0 {
            self.wait -= 1;
            return Ok(());
        }

        match self.phase {
            RoundPhase::Idle => {}
            RoundPhase::PlayerTurn => self.advance_player(world, events)?,
            RoundPhase::UnitTurn { index } => self.start_unit(index, world, events)?,
            RoundPhase::UnitMoving { index } => {
                if !self.step_movement(world, events)? {
                    self.finish_unit(index, world, events)?;
                }
            }
            RoundPhase::RoundEnding => {
                self.phase = RoundPhase::Idle;
                events.round_completed = Some(self.round);
                tracing::info!(round = self.round, "Round complete");
            }
        }
        Ok(())
    }

    fn advance_player(&mut self, world: &mut TurnWorld<'_>, events: &mut TickEvents) -> Result<()> {
        if self.movement.is_some() {
            self.step_movement(world, events)?;
            return Ok(());
        }
        if self.end_turn_requested {
            self.end_turn_requested = false;
            world.board.units_mut().unit_mut(world.player)?.end_turn();
            self.phase = RoundPhase::UnitTurn { index: 0 };
            tracing::debug!(round = self.round, "Player turn ended");
        }
        Ok(())
    }

    /// Poll the in-flight movement once. Returns whether a step happened.
    fn step_movement(&mut self, world: &mut TurnWorld<'_>, events: &mut TickEvents) -> Result<bool> {
        let Some(task) = self.movement.as_mut() else {
            return Ok(false);
        };
        match task.poll(world.board, world.rng)? {
            StepStatus::Stepped(event) => {
                events.steps.push(event);
                self.wait = self.pacing.step_ticks;
                Ok(true)
            }
            StepStatus::Finished => {
                self.movement = None;
                Ok(false)
            }
        }
    }

    fn start_unit(
        &mut self,
        index: usize,
        world: &mut TurnWorld<'_>,
        events: &mut TickEvents,
    ) -> Result<()> {
        let Some(&id) = self.queue.get(index) else {
            self.phase = RoundPhase::RoundEnding;
            self.wait = self.pacing.round_ticks;
            return Ok(());
        };
        if !world.board.unit(id)?.is_active() {
            self.phase = RoundPhase::UnitTurn { index: index + 1 };
            return Ok(());
        }

        world.board.units_mut().unit_mut(id)?.start_turn();
        events.turns_started.push(id);

        let unit = world.board.unit(id)?.clone();
        let mut fsm = *unit.fsm();
        let before = fsm.current();
        let ctx = AiContext {
            board: &*world.board,
            query: world.query,
            rules: world.rules,
            player: Some(world.player),
        };

        let evaluation = fsm.evaluate(&unit, &ctx);
        if fsm.current() != before {
            events.transitions.push(StateTransition {
                unit: id,
                from: before,
                to: fsm.current(),
            });
            tracing::debug!(
                unit = unit.name(),
                from = before.label(),
                to = fsm.current().label(),
                "State changed"
            );
        }

        let goal = evaluation.and_then(|e| e.goal);
        let unit = {
            let stored = world.board.units_mut().unit_mut(id)?;
            stored.set_goal(goal);
            stored.clone()
        };
        let ctx = AiContext {
            board: &*world.board,
            query: world.query,
            rules: world.rules,
            player: Some(world.player),
        };
        let order = fsm.tick(&unit, &ctx);

        let stored = world.board.units_mut().unit_mut(id)?;
        stored.fsm = fsm;
        if let Some(goal) = order.and_then(|o| o.goal) {
            stored.set_goal(Some(goal));
        }

        match order {
            Some(order) => {
                let task = movement::begin(order, world.board, world.engine, world.query)?;
                self.movement = Some(task);
                self.phase = RoundPhase::UnitMoving { index };
            }
            None => self.finish_unit(index, world, events)?,
        }
        Ok(())
    }

    fn finish_unit(
        &mut self,
        index: usize,
        world: &mut TurnWorld<'_>,
        events: &mut TickEvents,
    ) -> Result<()> {
        self.movement = None;
        self.phase = RoundPhase::UnitTurn { index: index + 1 };
        self.wait = self.pacing.unit_ticks;

        let Some(&id) = self.queue.get(index) else {
            return Ok(());
        };
        world.board.units_mut().unit_mut(id)?.end_turn();
        if let Some(attack) = resolve_attack(world.board, world.query, world.rules, id)? {
            events.attacks.push(attack);
        }
        Ok(())
    }

    /// Drop whatever the current turn was doing and move on.
    ///
    /// Used after an error so one broken turn does not stall the round.
    pub(crate) fn skip_current(&mut self, board: &mut Board) {
        self.movement = None;
        match self.phase {
            RoundPhase::UnitTurn { index } | RoundPhase::UnitMoving { index } => {
                if let Some(&id) = self.queue.get(index) {
                    if let Some(unit) = board.units_mut().get_mut(id) {
                        unit.end_turn();
                    }
                }
                self.phase = RoundPhase::UnitTurn { index: index + 1 };
            }
            RoundPhase::Idle | RoundPhase::PlayerTurn | RoundPhase::RoundEnding => {}
        }
    }

    /// End the round immediately, e.g. because the game is over.
    pub(crate) fn abort_round(&mut self, board: &mut Board) {
        for &id in &self.queue {
            if let Some(unit) = board.units_mut().get_mut(id) {
                unit.end_turn();
            }
        }
        self.movement = None;
        self.end_turn_requested = false;
        self.wait = 0;
        self.phase = RoundPhase::Idle;
    }
}
