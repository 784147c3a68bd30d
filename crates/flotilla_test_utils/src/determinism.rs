//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation produces identical
//! results given identical scenarios and inputs.
//!
//! # Testing Strategy
//!
//! Replays and batch comparisons depend on every run of a scenario ending
//! in the same state. Sources of non-determinism include:
//!
//! - **Floating-point math**: we use fixed-point arithmetic via
//!   [`flotilla_core::math::Fixed`] throughout.
//! - **HashMap iteration order**: units and tiles are always visited in id
//!   order, and search scratch is tracked in ordered sets.
//! - **System randomness**: idle wandering draws from a `ChaCha8Rng`
//!   seeded by the scenario.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use flotilla_core::data::ScenarioData;
use flotilla_core::simulation::{PlayerInput, Simulation};

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine multiple times and compare the final hashes.
///
/// * `runs` - Number of times to run
/// * `ticks` - Number of steps per run
/// * `setup` - Creates the initial state
/// * `step` - Advances the state by one tick
/// * `hash` - Computes the state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();
        for _ in 0..ticks {
            step(&mut state);
        }
        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    if !is_deterministic {
        tracing::warn!(?hashes, ticks, "Runs diverged");
    }

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// One tick of a player who never moves: end the turn whenever asked,
/// then tick.
pub fn passive_step(sim: &mut Simulation) {
    if sim.is_player_turn() {
        if let Err(e) = sim.apply_input(PlayerInput::EndTurn) {
            tracing::debug!(tick = sim.current_tick(), error = %e, "Passive end turn rejected");
        }
    }
    sim.tick();
}

/// Build a simulation from `scenario`.
///
/// # Panics
///
/// Panics if the scenario does not load.
#[must_use]
pub fn load(scenario: &ScenarioData) -> Simulation {
    Simulation::from_scenario(scenario).expect("scenario must load")
}

/// Run `scenario` twice with a passive player and compare final hashes.
#[must_use]
pub fn verify_simulation_determinism(scenario: &ScenarioData, num_ticks: u64) -> bool {
    verify_determinism(2, num_ticks, || load(scenario), passive_step, Simulation::state_hash)
        .is_deterministic
}

/// Run the scenario on `num_sims` threads at once and collect final hashes.
///
/// Catches non-determinism that only shows up under thread scheduling or
/// memory layout differences.
pub fn run_parallel_simulations(
    scenario: &ScenarioData,
    num_sims: usize,
    num_ticks: u64,
) -> DeterminismResult {
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = load(scenario);
                    for _ in 0..num_ticks {
                        passive_step(&mut sim);
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two runs tick by tick and report the first tick they differ.
///
/// `None` if they never diverge.
#[must_use]
pub fn find_first_divergence(scenario: &ScenarioData, num_ticks: u64) -> Option<u64> {
    let mut sim1 = load(scenario);
    let mut sim2 = load(scenario);

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        passive_step(&mut sim1);
        passive_step(&mut sim2);

        if sim1.state_hash() != sim2.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{duel, skirmish};
    use crate::strategies::arb_scenario;
    use proptest::prelude::*;

    #[test]
    fn test_skirmish_is_deterministic() {
        assert!(verify_simulation_determinism(&skirmish(), 300));
    }

    #[test]
    fn test_duel_never_diverges() {
        assert_eq!(find_first_divergence(&duel(), 200), None);
    }

    #[test]
    fn test_parallel_skirmishes_match() {
        run_parallel_simulations(&skirmish(), 4, 200).assert_deterministic();
    }

    #[test]
    fn test_passive_player_lets_rounds_finish() {
        let mut sim = load(&duel());
        for _ in 0..100 {
            passive_step(&mut sim);
        }
        assert!(sim.scheduler().round() >= 2, "stuck in round {}", sim.scheduler().round());
    }

    #[test]
    fn test_compute_hash_stable() {
        assert_eq!(compute_hash(&(1_u32, "a")), compute_hash(&(1_u32, "a")));
        assert_ne!(compute_hash(&1_u32), compute_hash(&2_u32));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        /// Any generated scenario replays to the same hash.
        #[test]
        fn prop_generated_scenarios_are_deterministic(scenario in arb_scenario()) {
            let result = verify_determinism(
                2,
                120,
                || load(&scenario),
                passive_step,
                Simulation::state_hash,
            );
            prop_assert!(result.is_deterministic, "{:?}", result.hashes);
        }
    }
}
