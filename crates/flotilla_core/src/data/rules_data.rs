//! Rule distances and pacing as they appear in scenario files.

use serde::{Deserialize, Serialize};

use crate::rules::{
    DEFAULT_ATTACK_DAMAGE, DEFAULT_ATTACK_RADIUS, DEFAULT_DETECTION_RADIUS,
    DEFAULT_MODIFIER_RADIUS, DEFAULT_NEIGHBOR_RADIUS,
};

/// Distances in integer world units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesData {
    /// Neighbor discovery radius.
    pub neighbor_radius: i32,
    /// Blanket cost-modifier radius.
    pub modifier_radius: i32,
    /// World position the modifier radius is measured from.
    pub modifier_anchor: (i32, i32),
    /// Absolute modifier value.
    pub modifier_magnitude: i32,
    /// Ally enemy-detection radius.
    pub detection_radius: i32,
    /// End-of-turn attack radius.
    pub attack_radius: i32,
    /// Damage per strike.
    pub attack_damage: u32,
}

impl Default for RulesData {
    fn default() -> Self {
        Self {
            neighbor_radius: DEFAULT_NEIGHBOR_RADIUS,
            modifier_radius: DEFAULT_MODIFIER_RADIUS,
            modifier_anchor: (0, 0),
            modifier_magnitude: 1,
            detection_radius: DEFAULT_DETECTION_RADIUS,
            attack_radius: DEFAULT_ATTACK_RADIUS,
            attack_damage: DEFAULT_ATTACK_DAMAGE,
        }
    }
}

/// Delays in simulation ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingData {
    /// Ticks between two movement steps.
    pub step_ticks: u32,
    /// Ticks after an AI unit finishes before the next one starts.
    pub unit_ticks: u32,
    /// Ticks after the last unit before the round completes.
    pub round_ticks: u32,
}

impl Default for PacingData {
    fn default() -> Self {
        Self {
            step_ticks: 20,
            unit_ticks: 20,
            round_ticks: 20,
        }
    }
}

impl PacingData {
    /// Pacing with no delays at all. Useful for tests and batch runs.
    #[must_use]
    pub const fn instant() -> Self {
        Self {
            step_ticks: 0,
            unit_ticks: 0,
            round_ticks: 0,
        }
    }
}
