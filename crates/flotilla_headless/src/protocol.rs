//! JSON protocol for headless game communication.
//!
//! The headless runner communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Player commands
//! **Output (stdout):** Responses, tick events and state snapshots
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready",...}`
//! 2. Controller sends commands as JSON lines
//! 3. `tick` outputs an `events` line for every tick where something
//!    happened, then a `state` line
//! 4. On game end, outputs `{"type":"game_over","result":"Win"|"Loss",...}`
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","scenario":"skirmish","tick":0}
//! -> {"cmd":"tick"}
//! <- {"type":"events","tick":1,"events":{"round_started":1,...}}
//! <- {"type":"state","tick":1,"round":1,...}
//! -> {"cmd":"select","x":2,"y":1}
//! <- {"type":"ack","cmd":"select"}
//! -> {"cmd":"move"}
//! <- {"type":"ack","cmd":"move"}
//! -> {"cmd":"end_turn"}
//! <- {"type":"ack","cmd":"end_turn"}
//! -> {"cmd":"tick","count":40}
//! ```

use serde::{Deserialize, Serialize};

use flotilla_core::factions::Faction;
use flotilla_core::scheduler::RoundPhase;
use flotilla_core::simulation::{GameState, PlayerInput, Simulation, TickEvents};
use flotilla_core::tiles::TileCoord;

/// Protocol version reported in `ready`.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Input Commands (controller -> runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Select the goal tile for the player's next move.
    Select {
        /// Column.
        x: u32,
        /// Row.
        y: u32,
    },
    /// Move the player toward the selected tile.
    Move,
    /// End the player's turn.
    EndTurn,
    /// Report the current state without advancing time.
    Query,
    /// Advance the simulation by `count` ticks (default 1).
    Tick {
        /// Number of ticks.
        #[serde(default = "default_tick_count")]
        count: u32,
    },
    /// Stop the session.
    Quit,
}

fn default_tick_count() -> u32 {
    1
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Command name for acknowledgments.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Select { .. } => "select",
            Self::Move => "move",
            Self::EndTurn => "end_turn",
            Self::Query => "query",
            Self::Tick { .. } => "tick",
            Self::Quit => "quit",
        }
    }

    /// The player input this command stands for, if it is one.
    #[must_use]
    pub const fn player_input(&self) -> Option<PlayerInput> {
        match *self {
            Self::Select { x, y } => Some(PlayerInput::SelectTile(TileCoord::new(x, y))),
            Self::Move => Some(PlayerInput::SubmitMove),
            Self::EndTurn => Some(PlayerInput::EndTurn),
            Self::Query | Self::Tick { .. } | Self::Quit => None,
        }
    }
}

// ============================================================================
// Output Responses (runner -> controller)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready {
        /// Protocol version.
        version: String,
        /// Loaded scenario.
        scenario: String,
        /// Current tick.
        tick: u64,
    },
    /// Command accepted.
    Ack {
        /// Command name.
        cmd: String,
    },
    /// Command rejected or unreadable.
    Error {
        /// What went wrong.
        message: String,
        /// Command name, when the line parsed.
        cmd: Option<String>,
    },
    /// Snapshot of the game.
    State(StateSnapshot),
    /// Everything that happened during one tick.
    Events {
        /// Tick the events belong to.
        tick: u64,
        /// The events.
        events: TickEvents,
    },
    /// The game ended.
    GameOver {
        /// Outcome.
        result: GameState,
        /// Tick the game ended on.
        tick: u64,
        /// Round the game ended in.
        round: u32,
    },
}

impl Response {
    /// Create a ready response.
    #[must_use]
    pub fn ready(sim: &Simulation) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            scenario: sim.name().to_string(),
            tick: sim.current_tick(),
        }
    }

    /// Create an acknowledgment.
    #[must_use]
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Serialize to JSON line (with newline).
    #[must_use]
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

// ============================================================================
// State Types
// ============================================================================

/// Board snapshot sent in `state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Current tick.
    pub tick: u64,
    /// Current round, 0 before the first one.
    pub round: u32,
    /// Scheduler phase.
    pub phase: RoundPhase,
    /// Whether the game is still on.
    pub game_state: GameState,
    /// Whether player input is accepted right now.
    pub player_turn: bool,
    /// Selected goal tile.
    pub selected: Option<(u32, u32)>,
    /// Every registered unit.
    pub units: Vec<UnitState>,
    /// State hash for determinism checks.
    pub hash: u64,
}

/// One unit in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitState {
    /// Registration id.
    pub id: u32,
    /// Display name.
    pub name: String,
    /// Side.
    pub faction: Faction,
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
    /// Hit points.
    pub hp: u32,
    /// Movement left this turn.
    pub movement: u32,
    /// FSM state label.
    pub state: String,
    /// Still in play.
    pub active: bool,
}

impl StateSnapshot {
    /// Capture the simulation as it is now.
    #[must_use]
    pub fn capture(sim: &Simulation) -> Self {
        let graph = sim.board().graph();
        let coord_of = |tile| graph.get(tile).map(|t| t.coord());

        let units = sim
            .board()
            .units()
            .iter()
            .map(|unit| {
                let (x, y) = coord_of(unit.current_tile()).map_or((0, 0), |c| (c.x, c.y));
                UnitState {
                    id: unit.id().0,
                    name: unit.name().to_string(),
                    faction: unit.faction(),
                    x,
                    y,
                    hp: unit.hp(),
                    movement: unit.movement(),
                    state: unit.fsm().current().label().to_string(),
                    active: unit.is_active(),
                }
            })
            .collect();

        Self {
            tick: sim.current_tick(),
            round: sim.scheduler().round(),
            phase: sim.scheduler().phase(),
            game_state: sim.game_state(),
            player_turn: sim.is_player_turn(),
            selected: sim.selected().and_then(coord_of).map(|c| (c.x, c.y)),
            units,
            hash: sim.state_hash(),
        }
    }
}
