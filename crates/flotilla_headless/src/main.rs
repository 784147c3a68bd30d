//! Headless tactics runner.
//!
//! This binary runs the game without graphics, controlled via JSON on stdin/stdout.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin
//! cargo run -p flotilla_headless
//!
//! # Play a scenario file and record the session
//! cargo run -p flotilla_headless -- run --scenario scenarios/crossing.ron --record game.replay
//!
//! # Run a batch of seeds with a scripted player
//! cargo run -p flotilla_headless -- batch --scenario skirmish --count 500 --output results/
//!
//! # Check a recording
//! cargo run -p flotilla_headless -- replay --file game.replay
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use flotilla_core::replay::Replay;
use flotilla_core::simulation::Simulation;
use flotilla_headless::{
    ascii::{render_board, AsciiConfig},
    batch::{run_batch, verify_determinism, BatchConfig},
    runner::{HeadlessConfig, HeadlessRunner},
    scenario::Scenario,
    strategies::PlayerStrategy,
};

#[derive(Parser)]
#[command(name = "flotilla_headless")]
#[command(about = "Headless turn-based tactics runner")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one game driven by stdin commands
    Run {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "skirmish")]
        scenario: String,

        /// Sleep one tick length per simulated tick
        #[arg(long)]
        realtime: bool,

        /// Write a replay of the session to this file
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Run a batch of seeds with a scripted player
    Batch {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "skirmish")]
        scenario: String,

        /// Number of games to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel games (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Starting random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Scripted player behavior
        #[arg(long, value_enum, default_value_t = PlayerStrategy::Advance)]
        strategy: PlayerStrategy,

        /// Tick cap per game (0 = unlimited)
        #[arg(long, default_value = "20000")]
        max_ticks: u64,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },

    /// Verify determinism by running same seed multiple times
    Verify {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "skirmish")]
        scenario: String,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },

    /// Re-run a recorded game and check its final hash
    Replay {
        /// Replay file path
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Print a scenario's starting board
    Render {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "skirmish")]
        scenario: String,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the protocol.
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(true),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();

    let result = match cli.command.unwrap_or(Commands::Run {
        scenario: "skirmish".to_string(),
        realtime: false,
        record: None,
    }) {
        Commands::Run {
            scenario,
            realtime,
            record,
        } => cmd_run(&scenario, HeadlessConfig { realtime, record }),
        Commands::Batch {
            scenario,
            count,
            parallel,
            seed,
            strategy,
            max_ticks,
            output,
        } => cmd_batch(
            BatchConfig {
                scenario,
                game_count: count,
                parallel_games: parallel,
                seed_start: seed,
                max_ticks,
                strategy,
            },
            &output,
        ),
        Commands::Verify {
            scenario,
            seed,
            runs,
        } => cmd_verify(&scenario, seed, runs),
        Commands::Replay { file } => cmd_replay(&file),
        Commands::Render { scenario, no_color } => cmd_render(&scenario, !no_color),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("FAIL: {message}");
            ExitCode::FAILURE
        }
    }
}

/// Play one interactive game
fn cmd_run(scenario: &str, config: HeadlessConfig) -> Result<(), String> {
    let scenario = Scenario::resolve(scenario).map_err(|e| e.to_string())?;
    tracing::info!(scenario = %scenario.name(), realtime = config.realtime, "Starting interactive session");

    let mut runner = HeadlessRunner::new(&scenario, config).map_err(|e| e.to_string())?;
    runner
        .run(io::stdin().lock(), io::stdout().lock())
        .map_err(|e| format!("I/O error: {e}"))
}

/// Run a batch of games
fn cmd_batch(config: BatchConfig, output: &std::path::Path) -> Result<(), String> {
    let results = run_batch(config).map_err(|e| e.to_string())?;

    let results_path = output.join("batch_results.json");
    results
        .save(&results_path)
        .map_err(|e| format!("failed to save results to {}: {e}", results_path.display()))?;

    let summary = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Games played: {}", summary.total_games);
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!(
        "Wins {} / Losses {} / Timeouts {}  ({:.1}% win rate)",
        summary.wins,
        summary.losses,
        summary.timeouts,
        summary.win_rate * 100.0
    );
    eprintln!(
        "Ticks: avg {:.0}, min {}, max {}",
        summary.avg_duration_ticks, summary.min_duration_ticks, summary.max_duration_ticks
    );

    if !results.errors.is_empty() {
        eprintln!("\nGAME FAILURES:");
        for error in results.errors.iter().take(10) {
            eprintln!("  Game {} (seed {}): {}", error.game_index, error.seed, error.message);
        }
        if results.errors.len() > 10 {
            eprintln!("  ... and {} more failures", results.errors.len() - 10);
        }
    }

    eprintln!("\nResults saved to: {}", results_path.display());
    Ok(())
}

/// Verify determinism of one seed
fn cmd_verify(scenario: &str, seed: u64, runs: u32) -> Result<(), String> {
    let scenario = Scenario::resolve(scenario).map_err(|e| e.to_string())?;
    tracing::info!(scenario = %scenario.name(), seed, runs, "Verifying determinism");

    let defaults = BatchConfig::default();
    if verify_determinism(&scenario, seed, runs, defaults.max_ticks, defaults.strategy)
        .map_err(|e| e.to_string())?
    {
        eprintln!("PASS: All {runs} runs produced identical results");
        Ok(())
    } else {
        Err("non-determinism detected".to_string())
    }
}

/// Re-run a recorded game
fn cmd_replay(file: &std::path::Path) -> Result<(), String> {
    let replay = Replay::load(file).map_err(|e| format!("failed to load replay: {e}"))?;

    eprintln!("Loaded replay:");
    eprintln!("  Scenario: {}", replay.scenario.name);
    eprintln!("  Seed: {}", replay.scenario.seed);
    eprintln!("  Inputs: {}", replay.input_count());
    eprintln!("  Duration: {} ticks", replay.duration());

    let sim = replay.play().map_err(|e| e.to_string())?;
    eprintln!("  Expected hash: {:016x}", replay.final_hash);
    eprintln!("  Actual hash:   {:016x}", sim.state_hash());
    eprintln!("  Result: {:?} after round {}", sim.game_state(), sim.scheduler().round());

    if sim.state_hash() == replay.final_hash {
        eprintln!("PASS: Replay verification successful");
        Ok(())
    } else {
        Err("replay produced a different hash".to_string())
    }
}

/// Print a scenario's starting board
fn cmd_render(scenario: &str, use_color: bool) -> Result<(), String> {
    let scenario = Scenario::resolve(scenario).map_err(|e| e.to_string())?;
    let sim = Simulation::from_scenario(scenario.data()).map_err(|e| e.to_string())?;

    println!("{}", scenario.data().description);
    print!(
        "{}",
        render_board(
            sim.board(),
            AsciiConfig {
                show_legend: true,
                use_color,
            }
        )
    );
    Ok(())
}
