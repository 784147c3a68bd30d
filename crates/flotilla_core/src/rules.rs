//! Runtime game rules in fixed-point form.
//!
//! Scenario files carry integer world units ([`RulesData`]); the
//! simulation works on [`Rules`], converted once at load.

use crate::data::RulesData;
use crate::math::{Fixed, Vec2Fixed};

/// Radius used for one-time neighbor discovery.
pub const DEFAULT_NEIGHBOR_RADIUS: i32 = 5;
/// Radius of the blanket cost modifier.
pub const DEFAULT_MODIFIER_RADIUS: i32 = 10;
/// Radius within which allies notice enemies.
pub const DEFAULT_DETECTION_RADIUS: i32 = 15;
/// Radius of the end-of-turn strike.
pub const DEFAULT_ATTACK_RADIUS: i32 = 5;
/// Damage dealt by one strike.
pub const DEFAULT_ATTACK_DAMAGE: u32 = 1;
/// Largest world distance a scenario may span or name.
///
/// Squared distances across a board this wide still fit in [`Fixed`].
pub const MAX_WORLD_EXTENT: i32 = 16_384;

/// Tunable distances and magnitudes used by the AI and combat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rules {
    /// Neighbor discovery radius.
    pub neighbor_radius: Fixed,
    /// Radius around [`Rules::modifier_anchor`] that receives cost modifiers.
    pub modifier_radius: Fixed,
    /// Fixed point the modifier radius is measured from.
    pub modifier_anchor: Vec2Fixed,
    /// Absolute value written by one modifier application.
    pub modifier_magnitude: Fixed,
    /// Ally enemy-detection radius.
    pub detection_radius: Fixed,
    /// End-of-turn attack radius.
    pub attack_radius: Fixed,
    /// Damage per strike.
    pub attack_damage: u32,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            neighbor_radius: Fixed::from_num(DEFAULT_NEIGHBOR_RADIUS),
            modifier_radius: Fixed::from_num(DEFAULT_MODIFIER_RADIUS),
            modifier_anchor: Vec2Fixed::ZERO,
            modifier_magnitude: Fixed::ONE,
            detection_radius: Fixed::from_num(DEFAULT_DETECTION_RADIUS),
            attack_radius: Fixed::from_num(DEFAULT_ATTACK_RADIUS),
            attack_damage: DEFAULT_ATTACK_DAMAGE,
        }
    }
}

impl From<&RulesData> for Rules {
    fn from(data: &RulesData) -> Self {
        Self {
            neighbor_radius: Fixed::from_num(data.neighbor_radius),
            modifier_radius: Fixed::from_num(data.modifier_radius),
            modifier_anchor: Vec2Fixed::from_world(data.modifier_anchor.0, data.modifier_anchor.1),
            modifier_magnitude: Fixed::from_num(data.modifier_magnitude),
            detection_radius: Fixed::from_num(data.detection_radius),
            attack_radius: Fixed::from_num(data.attack_radius),
            attack_damage: data.attack_damage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_data_matches_default_rules() {
        assert_eq!(Rules::from(&RulesData::default()), Rules::default());
    }

    #[test]
    fn test_conversion_uses_world_units() {
        let data = RulesData {
            modifier_anchor: (6, -3),
            detection_radius: 9,
            ..RulesData::default()
        };
        let rules = Rules::from(&data);
        assert_eq!(rules.modifier_anchor, Vec2Fixed::from_world(6, -3));
        assert_eq!(rules.detection_radius, Fixed::from_num(9));
    }
}
