//! End-of-turn strikes.
//!
//! After an AI unit's movement completes it looks around once. The first
//! hostile unit in range, in registration order, takes a fixed amount of
//! damage. A unit brought to zero hit points leaves play and the attacker
//! takes its tile.

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::error::Result;
use crate::host::SpatialQuery;
use crate::rules::Rules;
use crate::tiles::TileId;
use crate::units::UnitId;

/// A strike that landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackEvent {
    /// Striking unit.
    pub attacker: UnitId,
    /// Unit struck.
    pub target: UnitId,
    /// Damage dealt.
    pub damage: u32,
    /// Whether the target was eliminated.
    pub eliminated: bool,
    /// Tile the attacker moved onto after an elimination.
    pub captured: Option<TileId>,
}

/// Let `attacker` strike the first hostile unit within the attack radius.
///
/// Returns `None` when nothing hostile is in range.
pub fn resolve_attack(
    board: &mut Board,
    query: &dyn SpatialQuery,
    rules: &Rules,
    attacker: UnitId,
) -> Result<Option<AttackEvent>> {
    let unit = board.unit(attacker)?;
    if !unit.is_active() {
        return Ok(None);
    }
    let faction = unit.faction();
    let origin = board.position_of(attacker)?;

    let in_range = query.units_in_radius(board, origin, rules.attack_radius, &|other| {
        other.id() != attacker && faction.is_hostile_to(other.faction())
    });
    let Some(&target) = in_range.first() else {
        return Ok(None);
    };

    let victim = board.units_mut().unit_mut(target)?;
    let eliminated = victim.take_damage(rules.attack_damage);
    let victim_tile = victim.current_tile();

    let mut captured = None;
    if eliminated {
        board.eliminate(target)?;
        if board.relocate(attacker, victim_tile)? {
            captured = Some(victim_tile);
        }
        tracing::info!(?attacker, ?target, "Unit eliminated");
    } else {
        tracing::debug!(?attacker, ?target, damage = rules.attack_damage, "Strike landed");
    }

    Ok(Some(AttackEvent {
        attacker,
        target,
        damage: rules.attack_damage,
        eliminated,
        captured,
    }))
}
