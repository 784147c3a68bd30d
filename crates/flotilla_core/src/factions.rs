//! Faction definitions and the fixed lookup tables that drive them.
//!
//! Both tables are indexed by `(self, other)` and are plain data so they
//! can be audited at a glance. Rows are the acting unit, columns the unit
//! it is looking at, in `PLAYER, ALLY, ENEMY` order.

use serde::{Deserialize, Serialize};

use crate::math::Fixed;

/// Side a unit fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Faction {
    /// The human-controlled unit.
    Player,
    /// AI units fighting alongside the player.
    Ally,
    /// AI units hostile to the player and allies.
    Enemy,
}

/// Attraction (-1) or repulsion (+1) applied as a cost perturbation.
const MODIFIER_TABLE: [[i8; 3]; 3] = [
    // Player: always takes the unmodified shortest path.
    [0, 0, 0],
    // Ally: seeks the player and other allies, avoids enemies.
    [-1, -1, 1],
    // Enemy: seeks the player and other enemies, avoids allies.
    [-1, 1, -1],
];

/// Whether the row faction will strike the column faction.
const HOSTILITY_TABLE: [[bool; 3]; 3] = [
    // Player attacks were cut from the design.
    [false, false, false],
    // Ally: hostile to enemies only.
    [false, false, true],
    // Enemy: hostile to the player and allies.
    [true, true, false],
];

impl Faction {
    /// All factions in table order.
    pub const ALL: [Self; 3] = [Self::Player, Self::Ally, Self::Enemy];

    #[inline]
    const fn index(self) -> usize {
        match self {
            Self::Player => 0,
            Self::Ally => 1,
            Self::Enemy => 2,
        }
    }

    /// Sign of the cost modifier this faction feels toward `other`.
    ///
    /// Negative pulls paths toward the other unit, positive pushes them away.
    #[must_use]
    pub const fn modifier_sign(self, other: Self) -> i8 {
        MODIFIER_TABLE[self.index()][other.index()]
    }

    /// Whether units of this faction attack units of `other`.
    #[must_use]
    pub const fn is_hostile_to(self, other: Self) -> bool {
        HOSTILITY_TABLE[self.index()][other.index()]
    }

    /// Whether this faction is driven by the AI state machine.
    #[must_use]
    pub const fn is_ai(self) -> bool {
        !matches!(self, Self::Player)
    }

    /// Get the display name for this faction.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Player => "Player",
            Self::Ally => "Ally",
            Self::Enemy => "Enemy",
        }
    }
}

/// Compute the cost modifier `actor` applies because of `other`.
///
/// `magnitude` is the flat value written to every affected tile.
#[must_use]
pub fn compute_modifier(actor: Faction, other: Faction, magnitude: Fixed) -> Fixed {
    Fixed::from_num(actor.modifier_sign(other)).saturating_mul(magnitude)
}
