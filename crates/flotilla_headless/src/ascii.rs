//! ASCII board renderer for terminal review.

use std::fmt::Write as _;

use flotilla_core::board::Board;
use flotilla_core::factions::Faction;

/// ASCII rendering configuration.
#[derive(Debug, Clone, Copy)]
pub struct AsciiConfig {
    /// Print unit counts under the board.
    pub show_legend: bool,
    /// Use colored output (ANSI).
    pub use_color: bool,
}

impl Default for AsciiConfig {
    fn default() -> Self {
        Self {
            show_legend: true,
            use_color: true,
        }
    }
}

/// ANSI color codes.
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BLUE: &str = "\x1b[34m";
    pub const GREEN: &str = "\x1b[32m";
    pub const RED: &str = "\x1b[31m";
    pub const GRAY: &str = "\x1b[90m";
}

const fn glyph(faction: Faction) -> char {
    match faction {
        Faction::Player => 'P',
        Faction::Ally => 'A',
        Faction::Enemy => 'E',
    }
}

const fn faction_color(faction: Faction) -> &'static str {
    match faction {
        Faction::Player => colors::BLUE,
        Faction::Ally => colors::GREEN,
        Faction::Enemy => colors::RED,
    }
}

/// Render the board row by row, row 0 at the top.
///
/// Empty tiles are `.`, occupied tiles show their occupant's faction.
#[must_use]
pub fn render_board(board: &Board, config: AsciiConfig) -> String {
    let graph = board.graph();
    let width = graph.iter().map(|t| t.coord().x + 1).max().unwrap_or(0);
    let height = graph.iter().map(|t| t.coord().y + 1).max().unwrap_or(0);

    let mut cells = vec![vec![None; width as usize]; height as usize];
    for tile in graph.iter() {
        let coord = tile.coord();
        let faction = tile
            .occupant()
            .and_then(|id| board.units().get(id))
            .map(|u| u.faction());
        cells[coord.y as usize][coord.x as usize] = Some(faction);
    }

    let mut out = String::new();
    for row in &cells {
        for cell in row {
            match cell {
                Some(Some(faction)) if config.use_color => {
                    let _ = write!(
                        out,
                        "{}{}{}",
                        faction_color(*faction),
                        glyph(*faction),
                        colors::RESET
                    );
                }
                Some(Some(faction)) => out.push(glyph(*faction)),
                Some(None) if config.use_color => {
                    let _ = write!(out, "{}.{}", colors::GRAY, colors::RESET);
                }
                Some(None) => out.push('.'),
                None => out.push(' '),
            }
        }
        out.push('\n');
    }

    if config.show_legend {
        let units = board.units();
        let _ = writeln!(
            out,
            "P player  A allies {}  E enemies {}",
            units.count_active(Faction::Ally),
            units.count_active(Faction::Enemy)
        );
    }
    out
}
