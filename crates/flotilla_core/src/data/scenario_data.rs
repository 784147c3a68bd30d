//! Complete scenario definition.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::rules_data::{PacingData, RulesData};
use super::unit_data::UnitData;
use crate::error::{GameError, Result};
use crate::factions::Faction;
use crate::rules::MAX_WORLD_EXTENT;

/// Square grid dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridData {
    /// Columns.
    pub width: u32,
    /// Rows.
    pub height: u32,
    /// World units between adjacent tile centers.
    #[serde(default = "default_spacing")]
    pub spacing: u32,
}

const fn default_spacing() -> u32 {
    3
}

impl GridData {
    /// Grid of the given size with the default spacing.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            spacing: default_spacing(),
        }
    }

    /// Whether `(x, y)` lies on the grid.
    #[must_use]
    pub const fn contains(&self, (x, y): (u32, u32)) -> bool {
        x < self.width && y < self.height
    }
}

/// A playable scenario.
///
/// # Example RON
///
/// ```ron
/// ScenarioData(
///     name: "duel",
///     description: "One raider against the player",
///     grid: GridData(width: 5, height: 5),
///     seed: 7,
///     units: [
///         UnitData(name: "Commander", faction: Player, tile: (0, 0)),
///         UnitData(name: "Raider", faction: Enemy, tile: (4, 4)),
///     ],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioData {
    /// Scenario name.
    pub name: String,

    /// Free-form description.
    #[serde(default)]
    pub description: String,

    /// Board layout.
    pub grid: GridData,

    /// Rule distances.
    #[serde(default)]
    pub rules: RulesData,

    /// Delays between steps, units and rounds.
    #[serde(default)]
    pub pacing: PacingData,

    /// Seed for the random steps of idle units.
    #[serde(default)]
    pub seed: u64,

    /// Units in registration order.
    pub units: Vec<UnitData>,
}

impl ScenarioData {
    /// Parse a scenario from RON text and validate it.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let scenario: Self = ron::from_str(text)
            .map_err(|e| GameError::InvalidScenario(format!("RON parse error: {e}")))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Serialize to pretty RON.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize scenario: {e}")))
    }

    /// Check the scenario can be loaded.
    ///
    /// Requires a non-empty grid no wider than [`MAX_WORLD_EXTENT`], rule
    /// distances inside that limit, exactly one player, and every unit on
    /// a distinct tile inside the grid.
    pub fn validate(&self) -> Result<()> {
        if self.grid.width == 0 || self.grid.height == 0 {
            return Err(GameError::InvalidScenario("grid must not be empty".into()));
        }
        if self.grid.spacing == 0 {
            return Err(GameError::InvalidScenario(
                "grid spacing must be positive".into(),
            ));
        }
        let extent = u64::from(self.grid.width.max(self.grid.height) - 1)
            * u64::from(self.grid.spacing);
        let limit = u64::from(MAX_WORLD_EXTENT.unsigned_abs());
        if u64::from(self.grid.spacing) > limit || extent > limit {
            return Err(GameError::InvalidScenario(format!(
                "grid spans {extent} world units with spacing {}, limit is {limit}",
                self.grid.spacing
            )));
        }
        let rules = &self.rules;
        if [
            rules.neighbor_radius,
            rules.modifier_radius,
            rules.detection_radius,
            rules.attack_radius,
        ]
        .iter()
        .any(|r| !(0..=MAX_WORLD_EXTENT).contains(r))
        {
            return Err(GameError::InvalidScenario(format!(
                "rule radii must lie in 0..={MAX_WORLD_EXTENT}"
            )));
        }
        let (ax, ay) = rules.modifier_anchor;
        if [ax, ay, rules.modifier_magnitude]
            .iter()
            .any(|v| v.unsigned_abs() > MAX_WORLD_EXTENT.unsigned_abs())
        {
            return Err(GameError::InvalidScenario(format!(
                "modifier anchor and magnitude must lie within {MAX_WORLD_EXTENT}"
            )));
        }

        let players = self
            .units
            .iter()
            .filter(|u| u.faction == Faction::Player)
            .count();
        if players != 1 {
            return Err(GameError::InvalidScenario(format!(
                "expected exactly one player unit, found {players}"
            )));
        }

        let mut taken = BTreeSet::new();
        for unit in &self.units {
            if !self.grid.contains(unit.tile) {
                return Err(GameError::InvalidScenario(format!(
                    "unit '{}' starts outside the grid at {}",
                    unit.name,
                    unit.coord()
                )));
            }
            if !taken.insert(unit.tile) {
                return Err(GameError::InvalidScenario(format!(
                    "unit '{}' shares starting tile {}",
                    unit.name,
                    unit.coord()
                )));
            }
        }
        Ok(())
    }

    /// The player's unit definition.
    #[must_use]
    pub fn player(&self) -> Option<&UnitData> {
        self.units.iter().find(|u| u.faction == Faction::Player)
    }
}
