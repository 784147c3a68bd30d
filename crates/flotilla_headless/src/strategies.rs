//! Scripted player strategies for unattended runs.
//!
//! Batch runs and determinism checks need a player that acts without a
//! controller attached. A [`PlayerDriver`] applies a strategy's inputs
//! whenever the simulation is waiting on the player.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use flotilla_core::factions::Faction;
use flotilla_core::simulation::{PlayerInput, Simulation};
use flotilla_core::tiles::TileCoord;

/// How the scripted player behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStrategy {
    /// End every turn without moving.
    #[default]
    Passive,
    /// Move next to the closest enemy every turn, then end the turn.
    Advance,
}

/// Applies a strategy's inputs and remembers what it already did this round.
#[derive(Debug, Clone)]
pub struct PlayerDriver {
    strategy: PlayerStrategy,
    moved_in_round: Option<u32>,
}

impl PlayerDriver {
    /// Create a driver for `strategy`.
    #[must_use]
    pub const fn new(strategy: PlayerStrategy) -> Self {
        Self {
            strategy,
            moved_in_round: None,
        }
    }

    /// The strategy being played.
    #[must_use]
    pub const fn strategy(&self) -> PlayerStrategy {
        self.strategy
    }

    /// Apply this tick's inputs, if the player is up.
    ///
    /// Returns every input applied, in order, so callers can record them.
    /// Inputs the simulation rejects are still returned.
    pub fn drive(&mut self, sim: &mut Simulation) -> Vec<PlayerInput> {
        if !sim.is_player_turn() || sim.scheduler().movement_in_flight() {
            return Vec::new();
        }

        let round = sim.scheduler().round();
        let mut inputs = Vec::new();
        if self.strategy == PlayerStrategy::Advance && self.moved_in_round != Some(round) {
            self.moved_in_round = Some(round);
            if let Some(coord) = approach_tile(sim) {
                inputs.push(PlayerInput::SelectTile(coord));
                inputs.push(PlayerInput::SubmitMove);
            }
        }
        if inputs.is_empty() {
            inputs.push(PlayerInput::EndTurn);
        }

        for &input in &inputs {
            // Rejections are logged by the simulation.
            let _ = sim.apply_input(input);
        }
        inputs
    }
}

/// A free tile next to the closest active enemy, closest to the player.
fn approach_tile(sim: &Simulation) -> Option<TileCoord> {
    let board = sim.board();
    let graph = board.graph();
    let origin = board.position_of(sim.player()).ok()?;

    let enemy = board
        .units()
        .active_of(Faction::Enemy)
        .filter_map(|u| {
            let distance = board.position_of(u.id()).ok()?.distance_squared(origin);
            Some((distance, u.id(), u.current_tile()))
        })
        .min_by_key(|&(distance, id, _)| (distance, id))?;

    graph
        .neighbors(enemy.2)
        .ok()?
        .iter()
        .filter_map(|&id| graph.get(id))
        .filter(|tile| !tile.is_occupied())
        .min_by_key(|tile| (tile.position().distance_squared(origin), tile.id()))
        .map(|tile| tile.coord())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_test_utils::fixtures::duel;

    #[test]
    fn test_passive_only_ends_turns() {
        let mut sim = Simulation::from_scenario(&duel()).unwrap();
        let mut driver = PlayerDriver::new(PlayerStrategy::Passive);
        assert!(driver.drive(&mut sim).is_empty());

        sim.tick();
        assert_eq!(driver.drive(&mut sim), vec![PlayerInput::EndTurn]);
    }

    #[test]
    fn test_advance_moves_once_per_round() {
        let mut sim = Simulation::from_scenario(&duel()).unwrap();
        let mut driver = PlayerDriver::new(PlayerStrategy::Advance);
        sim.tick();

        let inputs = driver.drive(&mut sim);
        assert_eq!(inputs.len(), 2);
        assert!(matches!(inputs[0], PlayerInput::SelectTile(_)));
        assert_eq!(inputs[1], PlayerInput::SubmitMove);
        assert!(sim.scheduler().movement_in_flight());
        assert!(driver.drive(&mut sim).is_empty());

        while sim.scheduler().movement_in_flight() {
            sim.tick();
        }
        assert_eq!(driver.drive(&mut sim), vec![PlayerInput::EndTurn]);
    }

    #[test]
    fn test_approach_tile_is_next_to_enemy() {
        let mut sim = Simulation::from_scenario(&duel()).unwrap();
        sim.tick();
        let coord = approach_tile(&sim).unwrap();
        assert_eq!(coord, TileCoord::new(4, 4));
    }
}
