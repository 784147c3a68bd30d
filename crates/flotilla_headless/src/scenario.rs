//! Scenario loading.
//!
//! Scenarios are RON files holding a [`ScenarioData`]. A few are built in
//! so the binary works without any files.

use std::path::Path;

use thiserror::Error;

use flotilla_core::data::{GridData, PacingData, RulesData, ScenarioData, UnitData};
use flotilla_core::error::GameError;
use flotilla_core::factions::Faction;
use flotilla_core::fsm::StateKind;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Parsed but unusable.
    #[error("Invalid scenario: {0}")]
    Invalid(#[from] GameError),
}

/// Names accepted by [`Scenario::resolve`] without a file.
pub const BUILTIN_SCENARIOS: [&str; 2] = ["skirmish", "duel"];

/// A validated scenario ready to build a simulation from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    data: ScenarioData,
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let scenario = Self::from_ron_str(&contents)?;
        tracing::info!(path = %path.display(), name = %scenario.name(), "Scenario loaded");
        Ok(scenario)
    }

    /// Parse and validate RON text.
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let data: ScenarioData = ron::from_str(ron)?;
        Self::from_data(data)
    }

    /// Wrap scenario data after validating it.
    pub fn from_data(data: ScenarioData) -> Result<Self, ScenarioError> {
        data.validate()?;
        Ok(Self { data })
    }

    /// A built-in scenario by name, or a RON file path.
    pub fn resolve(name_or_path: &str) -> Result<Self, ScenarioError> {
        match name_or_path {
            "skirmish" => Ok(Self::skirmish()),
            "duel" => Ok(Self::duel()),
            path => Self::load(path),
        }
    }

    /// The player with two escorts against three raiders on a 10x8 grid.
    #[must_use]
    pub fn skirmish() -> Self {
        let unit = |name: &str, faction, tile, health, movement| UnitData {
            name: name.to_string(),
            faction,
            tile,
            health,
            movement,
            start_state: StateKind::Idle,
        };
        Self {
            data: ScenarioData {
                name: "skirmish".to_string(),
                description: "Escort the commander through three raiders".to_string(),
                grid: GridData::new(10, 8),
                rules: RulesData::default(),
                pacing: PacingData::default(),
                seed: 7,
                units: vec![
                    unit("Commander", Faction::Player, (1, 4), 3, 3),
                    unit("Wing Alpha", Faction::Ally, (1, 3), 2, 3),
                    unit("Wing Beta", Faction::Ally, (2, 5), 2, 3),
                    unit("Raider", Faction::Enemy, (8, 1), 2, 3),
                    unit("Reaver", Faction::Enemy, (9, 4), 1, 4),
                    unit("Marauder", Faction::Enemy, (8, 6), 2, 2),
                ],
            },
        }
    }

    /// The player against one raider on a 6x6 grid.
    #[must_use]
    pub fn duel() -> Self {
        let unit = |name: &str, faction, tile| UnitData {
            name: name.to_string(),
            faction,
            tile,
            health: 2,
            movement: 3,
            start_state: StateKind::Idle,
        };
        Self {
            data: ScenarioData {
                name: "duel".to_string(),
                description: "One raider, one commander".to_string(),
                grid: GridData::new(6, 6),
                rules: RulesData::default(),
                pacing: PacingData::default(),
                seed: 1,
                units: vec![
                    unit("Commander", Faction::Player, (0, 0)),
                    unit("Raider", Faction::Enemy, (5, 5)),
                ],
            },
        }
    }

    /// Scenario name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.data.name
    }

    /// The scenario data.
    #[must_use]
    pub const fn data(&self) -> &ScenarioData {
        &self.data
    }

    /// Take the scenario data.
    #[must_use]
    pub fn into_data(self) -> ScenarioData {
        self.data
    }

    /// Same scenario with another seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.data.seed = seed;
        self
    }

    /// Same scenario with no pacing delays.
    #[must_use]
    pub fn instant(mut self) -> Self {
        self.data.pacing = PacingData::instant();
        self
    }
}
