//! Units and the roster that owns them.
//!
//! Units are registered once at scenario load and keep their [`UnitId`]
//! for the whole game. Eliminated units stay in the roster, inactive, so
//! registration order and ids never shift; they are never reactivated.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::factions::Faction;
use crate::fsm::{StateKind, StateMachine};
use crate::tiles::TileId;

/// Registration index of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

/// Parameters for registering a unit.
#[derive(Debug, Clone)]
pub struct UnitSpawnParams {
    /// Display name.
    pub name: String,
    /// Side the unit fights for.
    pub faction: Faction,
    /// Starting tile. Must exist and be free.
    pub tile: TileId,
    /// Starting hit points.
    pub health: u32,
    /// Movement budget restored at the start of every turn.
    pub movement: u32,
    /// State the FSM enters at spawn.
    pub start_state: StateKind,
}

/// A unit on the board.
#[derive(Debug, Clone)]
pub struct Unit {
    id: UnitId,
    name: String,
    faction: Faction,
    hp: u32,
    max_movement: u32,
    movement: u32,
    current_tile: TileId,
    goal_tile: Option<TileId>,
    is_its_turn: bool,
    active: bool,
    pub(crate) fsm: StateMachine,
}

impl Unit {
    /// Registration id.
    #[must_use]
    pub const fn id(&self) -> UnitId {
        self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Faction.
    #[must_use]
    pub const fn faction(&self) -> Faction {
        self.faction
    }

    /// Remaining hit points.
    #[must_use]
    pub const fn hp(&self) -> u32 {
        self.hp
    }

    /// Movement left this turn.
    #[must_use]
    pub const fn movement(&self) -> u32 {
        self.movement
    }

    /// Movement restored at turn start.
    #[must_use]
    pub const fn max_movement(&self) -> u32 {
        self.max_movement
    }

    /// Tile the unit stands on.
    #[must_use]
    pub const fn current_tile(&self) -> TileId {
        self.current_tile
    }

    /// Tile the unit is heading for, if any.
    #[must_use]
    pub const fn goal_tile(&self) -> Option<TileId> {
        self.goal_tile
    }

    /// Whether the unit is currently acting.
    #[must_use]
    pub const fn is_its_turn(&self) -> bool {
        self.is_its_turn
    }

    /// Whether the unit is still in play.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// The unit's state machine.
    #[must_use]
    pub const fn fsm(&self) -> &StateMachine {
        &self.fsm
    }

    pub(crate) fn set_goal(&mut self, goal: Option<TileId>) {
        self.goal_tile = goal;
    }

    pub(crate) fn set_current_tile(&mut self, tile: TileId) {
        self.current_tile = tile;
    }

    /// Restore the movement budget and flag the turn as started.
    pub(crate) fn start_turn(&mut self) {
        self.is_its_turn = true;
        self.movement = self.max_movement;
    }

    pub(crate) fn end_turn(&mut self) {
        self.is_its_turn = false;
    }

    /// Spend one point of movement. Never goes below zero.
    pub(crate) fn consume_step(&mut self) {
        self.movement = self.movement.saturating_sub(1);
    }

    /// Apply damage and report whether the unit is now at zero.
    pub(crate) fn take_damage(&mut self, damage: u32) -> bool {
        self.hp = self.hp.saturating_sub(damage);
        self.hp == 0
    }

    pub(crate) fn deactivate(&mut self) {
        self.active = false;
        self.is_its_turn = false;
    }
}

/// All units in registration order.
#[derive(Debug, Clone, Default)]
pub struct UnitRoster {
    units: Vec<Unit>,
}

impl UnitRoster {
    /// Create an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit. Tile validation is the board's job.
    pub(crate) fn register(&mut self, params: UnitSpawnParams) -> UnitId {
        let id = UnitId(self.units.len() as u32);
        self.units.push(Unit {
            id,
            name: params.name,
            faction: params.faction,
            hp: params.health,
            max_movement: params.movement,
            movement: params.movement,
            current_tile: params.tile,
            goal_tile: None,
            is_its_turn: false,
            active: true,
            fsm: StateMachine::new(params.start_state),
        });
        id
    }

    /// Number of registered units, active or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether no unit was registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Look up a unit.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id.0 as usize)
    }

    pub(crate) fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(id.0 as usize)
    }

    /// Look up a unit, turning a miss into [`GameError::UnknownUnit`].
    pub fn unit(&self, id: UnitId) -> Result<&Unit> {
        self.get(id).ok_or(GameError::UnknownUnit(id))
    }

    pub(crate) fn unit_mut(&mut self, id: UnitId) -> Result<&mut Unit> {
        self.get_mut(id).ok_or(GameError::UnknownUnit(id))
    }

    /// All units in registration order, including eliminated ones.
    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter()
    }

    /// Units still in play, in registration order.
    pub fn active(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter().filter(|u| u.active)
    }

    /// Active units of one faction, in registration order.
    pub fn active_of(&self, faction: Faction) -> impl Iterator<Item = &Unit> {
        self.active().filter(move |u| u.faction == faction)
    }

    /// Count active units of one faction.
    #[must_use]
    pub fn count_active(&self, faction: Faction) -> usize {
        self.active_of(faction).count()
    }
}
