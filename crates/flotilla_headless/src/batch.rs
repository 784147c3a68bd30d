//! Batch game runner.
//!
//! Plays many seeds of one scenario in parallel using rayon, with a
//! scripted player, and aggregates how the games went.

use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use flotilla_core::error::GameError;
use flotilla_core::movement::StepEvent;
use flotilla_core::simulation::{GameState, Simulation};

use crate::scenario::{Scenario, ScenarioError};
use crate::strategies::{PlayerDriver, PlayerStrategy};

/// Configuration for a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Built-in scenario name or RON path
    pub scenario: String,
    /// Number of games to run
    pub game_count: u32,
    /// Maximum parallel games (0 = use rayon default)
    pub parallel_games: u32,
    /// Seed of the first game; game `i` uses `seed_start + i`
    pub seed_start: u64,
    /// Maximum ticks per game (0 = unlimited)
    pub max_ticks: u64,
    /// How the scripted player plays
    pub strategy: PlayerStrategy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario: "skirmish".to_string(),
            game_count: 100,
            parallel_games: 0,
            seed_start: 0,
            max_ticks: 20_000,
            strategy: PlayerStrategy::Advance,
        }
    }
}

impl BatchConfig {
    /// Create config for a specific scenario
    #[must_use]
    pub fn new(scenario: &str, game_count: u32) -> Self {
        Self {
            scenario: scenario.to_string(),
            game_count,
            ..Default::default()
        }
    }

    /// Set seed start
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set the player strategy
    #[must_use]
    pub const fn with_strategy(mut self, strategy: PlayerStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the tick cap
    #[must_use]
    pub const fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }
}

/// How one game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Every enemy was eliminated.
    Win,
    /// The player was eliminated.
    Loss,
    /// The tick cap was hit first.
    Timeout,
}

/// Counters collected from one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMetrics {
    /// Position in the batch
    pub game_index: u32,
    /// Seed the game ran with
    pub seed: u64,
    /// How it ended
    pub outcome: Outcome,
    /// Ticks simulated
    pub duration_ticks: u64,
    /// Rounds started
    pub rounds: u32,
    /// Steps that moved a unit
    pub moves: u32,
    /// Steps refused by an occupied tile
    pub refused_steps: u32,
    /// Strikes landed
    pub attacks: u32,
    /// Units eliminated
    pub eliminations: u32,
    /// Inputs the scripted player sent
    pub player_inputs: u32,
    /// Turn steps that failed and were skipped
    pub errors: u32,
    /// State hash at the end
    pub final_state_hash: u64,
}

/// Aggregate over a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Total games played.
    pub total_games: u32,
    /// Games the player won.
    pub wins: u32,
    /// Games the player lost.
    pub losses: u32,
    /// Games stopped by the tick cap.
    pub timeouts: u32,
    /// Wins over total games.
    pub win_rate: f64,
    /// Average game duration in ticks.
    pub avg_duration_ticks: f64,
    /// Shortest game.
    pub min_duration_ticks: u64,
    /// Longest game.
    pub max_duration_ticks: u64,
    /// Average rounds per game.
    pub avg_rounds: f64,
    /// Average strikes per game.
    pub avg_attacks: f64,
}

impl BatchSummary {
    /// Calculate summary from a list of game metrics.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn from_games(games: &[GameMetrics]) -> Self {
        if games.is_empty() {
            return Self::default();
        }

        let count = |outcome| games.iter().filter(|g| g.outcome == outcome).count() as u32;
        let total = games.len() as f64;
        let wins = count(Outcome::Win);

        Self {
            total_games: games.len() as u32,
            wins,
            losses: count(Outcome::Loss),
            timeouts: count(Outcome::Timeout),
            win_rate: f64::from(wins) / total,
            avg_duration_ticks: games.iter().map(|g| g.duration_ticks as f64).sum::<f64>() / total,
            min_duration_ticks: games.iter().map(|g| g.duration_ticks).min().unwrap_or(0),
            max_duration_ticks: games.iter().map(|g| g.duration_ticks).max().unwrap_or(0),
            avg_rounds: games.iter().map(|g| f64::from(g.rounds)).sum::<f64>() / total,
            avg_attacks: games.iter().map(|g| f64::from(g.attacks)).sum::<f64>() / total,
        }
    }
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Individual game metrics
    pub games: Vec<GameMetrics>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Error during batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    /// Game index
    pub game_index: u32,
    /// Seed used
    pub seed: u64,
    /// Error message
    pub message: String,
}

/// Play one seed of `scenario` to the end or the tick cap.
pub fn run_single_game(
    scenario: &Scenario,
    game_index: u32,
    seed: u64,
    max_ticks: u64,
    strategy: PlayerStrategy,
) -> Result<GameMetrics, GameError> {
    let data = scenario.clone().with_seed(seed).instant().into_data();
    let mut sim = Simulation::from_scenario(&data)?;
    let mut driver = PlayerDriver::new(strategy);

    let mut metrics = GameMetrics {
        game_index,
        seed,
        outcome: Outcome::Timeout,
        duration_ticks: 0,
        rounds: 0,
        moves: 0,
        refused_steps: 0,
        attacks: 0,
        eliminations: 0,
        player_inputs: 0,
        errors: 0,
        final_state_hash: 0,
    };

    while max_ticks == 0 || sim.current_tick() < max_ticks {
        metrics.player_inputs += count(driver.drive(&mut sim).len());
        let events = sim.tick();

        metrics.rounds += u32::from(events.round_started.is_some());
        for step in &events.steps {
            match step {
                StepEvent::Moved { .. } => metrics.moves += 1,
                StepEvent::Refused { .. } => metrics.refused_steps += 1,
                StepEvent::Stalled { .. } => {}
            }
        }
        metrics.attacks += count(events.attacks.len());
        metrics.eliminations += count(events.attacks.iter().filter(|a| a.eliminated).count());
        metrics.errors += count(events.errors.len());

        match events.game_over {
            Some(GameState::Win) => metrics.outcome = Outcome::Win,
            Some(GameState::Loss) => metrics.outcome = Outcome::Loss,
            Some(GameState::Playing) | None => continue,
        }
        break;
    }

    metrics.duration_ticks = sim.current_tick();
    metrics.final_state_hash = sim.state_hash();
    debug!(
        game = game_index,
        seed,
        outcome = ?metrics.outcome,
        ticks = metrics.duration_ticks,
        "Game finished"
    );
    Ok(metrics)
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Run a batch of games
pub fn run_batch(config: BatchConfig) -> Result<BatchResults, ScenarioError> {
    let scenario = Scenario::resolve(&config.scenario)?;
    let start = Instant::now();

    info!(
        games = config.game_count,
        scenario = %config.scenario,
        strategy = ?config.strategy,
        "Starting batch run"
    );

    let play_all = || -> Vec<Result<GameMetrics, BatchError>> {
        (0..config.game_count)
            .into_par_iter()
            .map(|i| {
                let seed = config.seed_start.wrapping_add(u64::from(i));
                run_single_game(&scenario, i, seed, config.max_ticks, config.strategy).map_err(|e| {
                    warn!(game = i, seed, error = %e, "Game failed");
                    BatchError {
                        game_index: i,
                        seed,
                        message: e.to_string(),
                    }
                })
            })
            .collect()
    };

    let results = if config.parallel_games > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_games as usize)
            .build()
        {
            Ok(pool) => pool.install(play_all),
            Err(e) => {
                warn!(error = %e, "Could not build thread pool; using the global one");
                play_all()
            }
        }
    } else {
        play_all()
    };

    let (games, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let games: Vec<GameMetrics> = games.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        games = games.len(),
        errors = errors.len(),
        win_rate = summary.win_rate,
        seconds = duration_seconds,
        "Batch complete"
    );

    Ok(BatchResults {
        config,
        games,
        summary,
        duration_seconds,
        errors,
    })
}

/// Run the same seed `runs` times and check every run ends on the same hash.
pub fn verify_determinism(
    scenario: &Scenario,
    seed: u64,
    runs: u32,
    max_ticks: u64,
    strategy: PlayerStrategy,
) -> Result<bool, GameError> {
    let hashes = (0..runs)
        .into_par_iter()
        .map(|i| run_single_game(scenario, i, seed, max_ticks, strategy).map(|m| m.final_state_hash))
        .collect::<Result<Vec<_>, _>>()?;

    let deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    if !deterministic {
        warn!(seed, ?hashes, "Runs diverged");
    }
    Ok(deterministic)
}
