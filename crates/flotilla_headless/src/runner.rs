//! Headless game runner implementation.
//!
//! Reads JSON commands line by line, drives the simulation and writes one
//! JSON response per line.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use flotilla_core::error::GameError;
use flotilla_core::replay::Replay;
use flotilla_core::simulation::{GameState, Simulation, TICK_DURATION_MS};

use crate::protocol::{Command, Response, StateSnapshot};
use crate::scenario::Scenario;

/// Most ticks one `tick` command may run.
pub const MAX_TICKS_PER_COMMAND: u32 = 10_000;

/// Headless runner configuration.
#[derive(Debug, Clone, Default)]
pub struct HeadlessConfig {
    /// Sleep one tick length between ticks instead of running flat out.
    pub realtime: bool,
    /// Write a replay of the session here on exit.
    pub record: Option<PathBuf>,
}

/// Drives one game from protocol commands.
#[derive(Debug)]
pub struct HeadlessRunner {
    sim: Simulation,
    replay: Replay,
    config: HeadlessConfig,
    finished: bool,
}

impl HeadlessRunner {
    /// Create a runner for `scenario`.
    pub fn new(scenario: &Scenario, config: HeadlessConfig) -> Result<Self, GameError> {
        let sim = Simulation::from_scenario(scenario.data())?;
        Ok(Self {
            sim,
            replay: Replay::new(scenario.data().clone()),
            config,
            finished: false,
        })
    }

    /// The simulation being driven.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Inputs recorded so far.
    #[must_use]
    pub const fn replay(&self) -> &Replay {
        &self.replay
    }

    /// Whether `quit` was received.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Handle one command and return the responses in output order.
    pub fn handle(&mut self, cmd: Command) -> Vec<Response> {
        let name = cmd.name();

        if let Some(input) = cmd.player_input() {
            let tick = self.sim.current_tick();
            let result = self.sim.apply_input(input);
            // Rejected inputs are recorded too so replays reject them again.
            self.replay.record_input(tick, input);
            return vec![match result {
                Ok(()) => Response::ack(name),
                Err(e) => Response::error(e.to_string(), Some(name)),
            }];
        }

        match cmd {
            Command::Query => vec![Response::State(StateSnapshot::capture(&self.sim))],
            Command::Tick { count } => self.advance(count),
            Command::Quit => {
                self.finished = true;
                vec![Response::ack(name)]
            }
            Command::Select { .. } | Command::Move | Command::EndTurn => Vec::new(),
        }
    }

    /// Tick up to `count` times, stopping early when the game ends.
    ///
    /// `count` is clamped to [`MAX_TICKS_PER_COMMAND`].
    fn advance(&mut self, count: u32) -> Vec<Response> {
        let mut responses = Vec::new();
        if count > MAX_TICKS_PER_COMMAND {
            tracing::warn!(count, limit = MAX_TICKS_PER_COMMAND, "Tick count clamped");
        }

        for _ in 0..count.min(MAX_TICKS_PER_COMMAND) {
            if self.sim.game_state() != GameState::Playing {
                break;
            }
            let events = self.sim.tick();
            let tick = self.sim.current_tick();
            let game_over = events.game_over;

            if !events.is_empty() {
                responses.push(Response::Events { tick, events });
            }
            if let Some(result) = game_over {
                responses.push(Response::GameOver {
                    result,
                    tick,
                    round: self.sim.scheduler().round(),
                });
            }
            if self.config.realtime {
                thread::sleep(Duration::from_millis(u64::from(TICK_DURATION_MS)));
            }
        }

        responses.push(Response::State(StateSnapshot::capture(&self.sim)));
        responses
    }

    /// Run the command loop until `quit` or end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        write_response(&mut output, &Response::ready(&self.sim))?;

        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let responses = match Command::from_json(line) {
                Ok(cmd) => {
                    tracing::debug!(cmd = cmd.name(), tick = self.sim.current_tick(), "Command");
                    self.handle(cmd)
                }
                Err(e) => vec![Response::error(format!("Parse error: {e}"), None)],
            };
            for response in &responses {
                write_response(&mut output, response)?;
            }
            if self.finished {
                break;
            }
        }

        self.save_recording();
        Ok(())
    }

    /// Finalize the replay and write it if recording was requested.
    fn save_recording(&mut self) {
        self.replay
            .finalize(self.sim.current_tick(), self.sim.state_hash());
        let Some(path) = &self.config.record else {
            return;
        };
        match self.replay.save(path) {
            Ok(()) => tracing::info!(
                path = %path.display(),
                inputs = self.replay.input_count(),
                ticks = self.replay.duration(),
                "Replay saved"
            ),
            Err(e) => tracing::error!(path = %path.display(), error = %e, "Failed to save replay"),
        }
    }
}

fn write_response<W: Write>(output: &mut W, response: &Response) -> io::Result<()> {
    output.write_all(response.to_json_line().as_bytes())?;
    output.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_core::factions::Faction;
    use flotilla_core::tiles::TileCoord;

    fn runner() -> HeadlessRunner {
        HeadlessRunner::new(&Scenario::duel().instant(), HeadlessConfig::default()).unwrap()
    }

    fn session(runner: &mut HeadlessRunner, lines: &[&str]) -> Vec<Response> {
        let input = lines.join("\n");
        let mut output = Vec::new();
        runner.run(input.as_bytes(), &mut output).unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_ready_comes_first() {
        let responses = session(&mut runner(), &[]);
        assert!(matches!(&responses[0], Response::Ready { scenario, .. } if scenario == "duel"));
    }

    #[test]
    fn test_input_before_round_is_an_error() {
        let responses = runner().handle(Command::EndTurn);
        assert!(matches!(
            &responses[0],
            Response::Error { cmd: Some(cmd), .. } if cmd == "end_turn"
        ));
    }

    #[test]
    fn test_tick_reports_events_then_state() {
        let responses = runner().handle(Command::Tick { count: 1 });
        assert_eq!(responses.len(), 2);
        assert!(matches!(&responses[0], Response::Events { tick: 1, events } if events.round_started == Some(1)));
        assert!(matches!(&responses[1], Response::State(s) if s.player_turn));
    }

    #[test]
    fn test_tick_stops_at_game_over() {
        let mut data = Scenario::duel().instant().into_data();
        data.units.retain(|u| u.faction != Faction::Enemy);
        let scenario = Scenario::from_data(data).unwrap();
        let mut runner = HeadlessRunner::new(&scenario, HeadlessConfig::default()).unwrap();

        let responses = runner.handle(Command::Tick { count: 50 });
        let over = responses
            .iter()
            .position(|r| matches!(r, Response::GameOver { .. }))
            .unwrap();
        assert_eq!(over, responses.len() - 2);
        assert!(matches!(responses.last(), Some(Response::State(_))));
        assert!(runner.simulation().current_tick() < 50);
        assert_ne!(runner.simulation().game_state(), GameState::Playing);
    }

    #[test]
    fn test_tick_count_is_clamped() {
        let mut runner = runner();
        // The player never ends the turn, so the game cannot finish.
        runner.handle(Command::Tick { count: u32::MAX });
        assert_eq!(
            runner.simulation().current_tick(),
            u64::from(MAX_TICKS_PER_COMMAND)
        );
    }

    #[test]
    fn test_scripted_move() {
        let mut runner = runner();
        let responses = session(
            &mut runner,
            &[
                r#"{"cmd":"tick"}"#,
                r#"{"cmd":"select","x":2,"y":2}"#,
                r#"{"cmd":"move"}"#,
                r#"{"cmd":"tick","count":5}"#,
                r#"{"cmd":"quit"}"#,
                r#"{"cmd":"query"}"#,
            ],
        );

        assert!(responses.contains(&Response::ack("select")));
        assert!(responses.contains(&Response::ack("move")));
        assert_eq!(responses.last(), Some(&Response::ack("quit")));

        let sim = runner.simulation();
        let player = sim.board().unit(sim.player()).unwrap();
        assert_eq!(
            player.current_tile(),
            sim.board().graph().at(TileCoord::new(2, 2)).unwrap()
        );
        assert_eq!(runner.replay().input_count(), 2);
    }

    #[test]
    fn test_bad_line_reports_parse_error() {
        let responses = session(&mut runner(), &["{nope"]);
        assert!(matches!(
            &responses[1],
            Response::Error { message, cmd: None } if message.starts_with("Parse error")
        ));
    }

    #[test]
    fn test_session_recording_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.replay");
        let config = HeadlessConfig {
            realtime: false,
            record: Some(path.clone()),
        };
        let mut runner = HeadlessRunner::new(&Scenario::duel().instant(), config).unwrap();
        session(
            &mut runner,
            &[
                r#"{"cmd":"tick"}"#,
                r#"{"cmd":"select","x":1,"y":1}"#,
                r#"{"cmd":"move"}"#,
                r#"{"cmd":"end_turn"}"#,
                r#"{"cmd":"tick","count":30}"#,
            ],
        );

        let replay = Replay::load(&path).unwrap();
        assert_eq!(replay.input_count(), 3);
        assert!(replay.verify().unwrap().matches());
    }
}
