//! Replay system for recording and playing back games.
//!
//! A replay stores the scenario and the stream of player inputs with the
//! tick they were applied before. Since the simulation is deterministic,
//! that is enough to recreate the whole game and check its final hash.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::data::ScenarioData;
use crate::error::{GameError, Result};
use crate::simulation::{PlayerInput, Simulation};

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// A single input record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayInput {
    /// Simulation tick at which the input was applied (before ticking).
    pub tick: u64,
    /// The input.
    pub input: PlayerInput,
}

/// Complete replay data structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replay {
    /// Replay format version.
    pub version: u32,
    /// Scenario the game was played on, seed included.
    pub scenario: ScenarioData,
    /// Inputs in application order.
    pub inputs: Vec<ReplayInput>,
    /// Tick when recording stopped.
    pub final_tick: u64,
    /// State hash when recording stopped.
    pub final_hash: u64,
}

/// Outcome of re-running a replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayCheck {
    /// Hash stored in the replay.
    pub expected: u64,
    /// Hash produced by re-running it.
    pub actual: u64,
}

impl ReplayCheck {
    /// Whether the re-run matched.
    #[must_use]
    pub const fn matches(&self) -> bool {
        self.expected == self.actual
    }
}

impl Replay {
    /// Start recording a game on `scenario`.
    #[must_use]
    pub fn new(scenario: ScenarioData) -> Self {
        Self {
            version: REPLAY_VERSION,
            scenario,
            inputs: Vec::new(),
            final_tick: 0,
            final_hash: 0,
        }
    }

    /// Record an input applied at `tick`.
    pub fn record_input(&mut self, tick: u64, input: PlayerInput) {
        self.inputs.push(ReplayInput { tick, input });
    }

    /// Finalize the replay with end-game state.
    pub fn finalize(&mut self, final_tick: u64, final_hash: u64) {
        self.final_tick = final_tick;
        self.final_hash = final_hash;
    }

    /// Encode with bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize replay: {e}")))
    }

    /// Decode with bincode and check the version.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let replay: Self = bincode::deserialize(bytes)
            .map_err(|e| GameError::InvalidState(format!("Failed to deserialize replay: {e}")))?;

        if replay.version != REPLAY_VERSION {
            return Err(GameError::InvalidState(format!(
                "Replay version mismatch: expected {}, got {}",
                REPLAY_VERSION, replay.version
            )));
        }
        Ok(replay)
    }

    /// Save the replay to a file.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| GameError::InvalidState(format!("Failed to write replay file: {e}")))
    }

    /// Load a replay from a file.
    ///
    /// # Errors
    /// Returns an error if file reading, deserialization or the version
    /// check fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| GameError::InvalidState(format!("Failed to read replay file: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Inputs recorded for one tick, in order.
    pub fn inputs_at_tick(&self, tick: u64) -> impl Iterator<Item = &ReplayInput> {
        self.inputs.iter().filter(move |r| r.tick == tick)
    }

    /// Re-run the game up to the final tick.
    ///
    /// Inputs that were rejected when recorded are rejected again and
    /// ignored the same way.
    pub fn play(&self) -> Result<Simulation> {
        let mut sim = Simulation::from_scenario(&self.scenario)?;
        let mut pending = self.inputs.iter().peekable();

        loop {
            while let Some(record) = pending.next_if(|r| r.tick <= sim.current_tick()) {
                let _ = sim.apply_input(record.input);
            }
            if sim.current_tick() >= self.final_tick {
                break;
            }
            sim.tick();
        }
        Ok(sim)
    }

    /// Re-run the game and compare its final hash.
    pub fn verify(&self) -> Result<ReplayCheck> {
        let sim = self.play()?;
        Ok(ReplayCheck {
            expected: self.final_hash,
            actual: sim.state_hash(),
        })
    }

    /// Get the total duration of the replay in ticks.
    #[must_use]
    pub const fn duration(&self) -> u64 {
        self.final_tick
    }

    /// Get the total number of inputs in the replay.
    #[must_use]
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }
}
