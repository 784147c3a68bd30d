//! Headless game runner for scripted play and CI verification.
//!
//! This crate provides a headless game runner that can be controlled via
//! JSON commands on stdin, with game state output on stdout. This enables:
//!
//! - **Scripted play**: A controller drives the player without graphics
//! - **Batch runs**: Many seeds played in parallel with a scripted player
//! - **Replay verification**: Check that replays produce identical results
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from controller (select, move, end_turn, tick, etc.)
//! - **stdout**: State updates and responses (JSON)
//! - **stderr**: Debug logs (human-readable)
//!
//! See [`protocol`] module for the full command/response format.
//!
//! # Example
//!
//! ```bash
//! # Run interactively
//! echo '{"cmd":"tick","count":60}' | cargo run -p flotilla_headless
//!
//! # Run a scenario file
//! cargo run -p flotilla_headless -- run --scenario scenarios/crossing.ron
//!
//! # Verify a recording
//! cargo run -p flotilla_headless -- replay --file game.replay
//! ```

pub mod ascii;
pub mod batch;
pub mod protocol;
pub mod runner;
pub mod scenario;
pub mod strategies;

pub use ascii::{render_board, AsciiConfig};
pub use batch::{run_batch, BatchConfig, BatchResults, BatchSummary, GameMetrics};
pub use protocol::{Command, Response};
pub use runner::{HeadlessConfig, HeadlessRunner};
pub use scenario::Scenario;
pub use strategies::{PlayerDriver, PlayerStrategy};
