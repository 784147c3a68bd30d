//! Per-unit finite-state machine.
//!
//! The state set is closed: [`StateKind`] is the whole of it, and the two
//! capabilities a state needs are split into traits. [`EvaluateState`]
//! is implemented per [`Faction`] and picks the state at turn start;
//! [`UpdateState`] is implemented per [`StateKind`] and turns the active
//! state into exactly one movement order.
//!
//! States carry no per-unit data, so a [`StateMachine`] is a small `Copy`
//! value living on its unit. Nothing here touches the board mutably; the
//! orders produced are handed to the movement executor by the scheduler.

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::factions::Faction;
use crate::host::SpatialQuery;
use crate::movement::{MoveOrder, MovePolicy};
use crate::rules::Rules;
use crate::tiles::TileId;
use crate::units::{Unit, UnitId};

/// The states a unit can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StateKind {
    /// Fidget with one random step.
    #[default]
    Idle,
    /// Close in on a target.
    Attacking,
    /// Move away from a target.
    Retreating,
}

impl StateKind {
    /// Upper-case label used in logs and protocol output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Attacking => "ATTACKING",
            Self::Retreating => "RETREATING",
        }
    }
}

/// Bookkeeping for the enter/update/exit cycle of the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExecutionState {
    /// No state has been entered yet.
    #[default]
    Null,
    /// Entered and waiting for its update.
    Active,
    /// Updated and exited; nothing runs until the next evaluation.
    Completed,
}

/// Read-only view of the world handed to evaluation and update.
#[derive(Debug, Clone, Copy)]
pub struct AiContext<'a> {
    /// Board state.
    pub board: &'a Board,
    /// Radius queries.
    pub query: &'a dyn SpatialQuery,
    /// Detection and other distances.
    pub rules: &'a Rules,
    /// The player's unit, if still registered.
    pub player: Option<UnitId>,
}

/// Result of evaluating a unit at turn start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    /// State to enter.
    pub state: StateKind,
    /// Goal chosen during evaluation, if any.
    pub goal: Option<TileId>,
}

/// A state change observed at turn start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    /// Unit that was evaluated.
    pub unit: UnitId,
    /// State before evaluation.
    pub from: StateKind,
    /// State after evaluation.
    pub to: StateKind,
}

/// Picks a state from world observations.
pub trait EvaluateState {
    /// Decide the state for `unit`, or `None` when the unit is not driven
    /// by automatic evaluation.
    fn evaluate_state(&self, unit: &Unit, ctx: &AiContext<'_>) -> Option<Evaluation>;
}

/// Runs the active state once.
pub trait UpdateState {
    /// Produce this turn's movement order and exit the state.
    fn update_state(
        self,
        fsm: &mut StateMachine,
        unit: &Unit,
        ctx: &AiContext<'_>,
    ) -> Option<MoveOrder>;
}

impl EvaluateState for Faction {
    fn evaluate_state(&self, unit: &Unit, ctx: &AiContext<'_>) -> Option<Evaluation> {
        match self {
            Self::Player => None,
            Self::Ally => Some(evaluate_ally(unit, ctx)),
            Self::Enemy => Some(evaluate_enemy(ctx)),
        }
    }
}

/// ATTACKING the nearest enemy inside the detection radius, else IDLE.
fn evaluate_ally(unit: &Unit, ctx: &AiContext<'_>) -> Evaluation {
    let idle = Evaluation {
        state: StateKind::Idle,
        goal: None,
    };
    let Ok(origin) = ctx.board.position_of(unit.id()) else {
        return idle;
    };

    let detected = ctx.query.units_in_radius(
        ctx.board,
        origin,
        ctx.rules.detection_radius,
        &|other| other.id() != unit.id() && other.faction() == Faction::Enemy,
    );

    // Registration order breaks distance ties.
    let nearest = detected
        .into_iter()
        .filter_map(|id| {
            let distance = ctx.board.position_of(id).ok()?.distance_squared(origin);
            let tile = ctx.board.unit(id).ok()?.current_tile();
            Some((distance, id, tile))
        })
        .min_by_key(|&(distance, id, _)| (distance, id));

    match nearest {
        Some((_, _, tile)) => Evaluation {
            state: StateKind::Attacking,
            goal: Some(tile),
        },
        None => idle,
    }
}

/// The last enemy standing retreats; otherwise enemies attack.
fn evaluate_enemy(ctx: &AiContext<'_>) -> Evaluation {
    let state = if ctx.board.units().count_active(Faction::Enemy) == 1 {
        StateKind::Retreating
    } else {
        StateKind::Attacking
    };
    Evaluation { state, goal: None }
}

/// Tile of the unit this one should move relative to.
///
/// Units hostile to the player go for the player. Everyone else goes for
/// the first active enemy in registration order, which need not be the
/// nearest one evaluation detected.
#[must_use]
pub fn target_tile(unit: &Unit, ctx: &AiContext<'_>) -> Option<TileId> {
    if unit.faction().is_hostile_to(Faction::Player) {
        let player = ctx.board.unit(ctx.player?).ok()?;
        return player.is_active().then(|| player.current_tile());
    }
    ctx.board
        .units()
        .active_of(Faction::Enemy)
        .find(|u| u.id() != unit.id())
        .map(Unit::current_tile)
}

impl UpdateState for StateKind {
    fn update_state(
        self,
        fsm: &mut StateMachine,
        unit: &Unit,
        ctx: &AiContext<'_>,
    ) -> Option<MoveOrder> {
        let order = match self {
            Self::Idle => Some(MoveOrder::new(unit.id(), MovePolicy::RandomStep, None)),
            Self::Attacking => target_tile(unit, ctx)
                .map(|goal| MoveOrder::new(unit.id(), MovePolicy::GreedyToward, Some(goal))),
            Self::Retreating => target_tile(unit, ctx)
                .map(|goal| MoveOrder::new(unit.id(), MovePolicy::GreedyAway, Some(goal))),
        };
        if order.is_none() {
            tracing::debug!(unit = unit.name(), state = self.label(), "No target this turn");
        }
        fsm.exit_state();
        order
    }
}

/// One unit's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateMachine {
    current: StateKind,
    execution: ExecutionState,
}

impl StateMachine {
    /// Create a machine and enter `start`.
    #[must_use]
    pub fn new(start: StateKind) -> Self {
        let mut fsm = Self {
            current: start,
            execution: ExecutionState::Null,
        };
        fsm.enter_state(start);
        fsm
    }

    /// Active state.
    #[must_use]
    pub const fn current(&self) -> StateKind {
        self.current
    }

    /// Where the active state is in its cycle.
    #[must_use]
    pub const fn execution(&self) -> ExecutionState {
        self.execution
    }

    /// Switch to `state` and arm it for one update.
    pub fn enter_state(&mut self, state: StateKind) {
        self.current = state;
        self.execution = ExecutionState::Active;
    }

    /// Mark the active state as finished.
    pub fn exit_state(&mut self) {
        self.execution = ExecutionState::Completed;
    }

    /// Run the faction's evaluation and enter the chosen state.
    ///
    /// Returns the evaluation so the caller can record its goal.
    pub fn evaluate(&mut self, unit: &Unit, ctx: &AiContext<'_>) -> Option<Evaluation> {
        let evaluation = unit.faction().evaluate_state(unit, ctx)?;
        self.enter_state(evaluation.state);
        Some(evaluation)
    }

    /// Run the active state's update once.
    ///
    /// Does nothing unless a state was entered since the last update.
    pub fn tick(&mut self, unit: &Unit, ctx: &AiContext<'_>) -> Option<MoveOrder> {
        if self.execution != ExecutionState::Active {
            return None;
        }
        let state = self.current;
        state.update_state(self, unit, ctx)
    }
}
