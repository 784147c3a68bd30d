//! # Flotilla Core
//!
//! Deterministic simulation core for a turn-based tactics game.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO (apart from replay files)
//! - No system randomness (seeded `ChaCha8Rng` only)
//! - No floating-point math (uses fixed-point)
//!
//! This separation enables:
//! - Headless hosts and batch runs
//! - Replay verification
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`tiles`] - Tile graph and per-tile search scratch state
//! - [`pathfinding`] - Priority search with scoped cleanup
//! - [`factions`] - Faction modifier and hostility tables
//! - [`movement`] - Paced movement executor
//! - [`fsm`] - Per-unit state machine
//! - [`scheduler`] - Round-robin turn scheduler
//! - [`simulation`] - Tick loop, input and hashing
//! - [`host`] - Spatial queries supplied by the host
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod board;
pub mod combat;
pub mod data;
pub mod error;
pub mod factions;
pub mod fsm;
pub mod host;
pub mod math;
pub mod movement;
pub mod pathfinding;
pub mod replay;
pub mod rules;
pub mod scheduler;
pub mod simulation;
pub mod tiles;
pub mod units;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::board::Board;
    pub use crate::combat::AttackEvent;
    pub use crate::data::{GridData, PacingData, RulesData, ScenarioData, UnitData};
    pub use crate::error::{GameError, Result};
    pub use crate::factions::{compute_modifier, Faction};
    pub use crate::fsm::{EvaluateState, ExecutionState, StateKind, StateMachine, UpdateState};
    pub use crate::host::{GridIndex, ScanQuery, SpatialQuery};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::movement::{MoveOrder, MovePolicy, MovementTask, StepEvent, StepStatus};
    pub use crate::pathfinding::{SearchEngine, SearchOutcome, SearchResult, SearchSession};
    pub use crate::replay::Replay;
    pub use crate::rules::Rules;
    pub use crate::scheduler::{RoundPhase, TurnScheduler};
    pub use crate::simulation::{GameState, PlayerInput, Simulation, TickEvents};
    pub use crate::tiles::{TileCoord, TileGraph, TileId};
    pub use crate::units::{Unit, UnitId};
}
