//! Data structures for scenario configuration.
//!
//! This module contains pure data structures that describe a scenario:
//! the grid, the units and their stats, rule distances and pacing. All
//! structs are designed to be deserialized from RON files.
//!
//! **Note:** This module contains no IO - it only defines data types and
//! parses strings. Reading files is handled by `flotilla_headless`.

mod rules_data;
mod scenario_data;
mod unit_data;

pub use rules_data::{PacingData, RulesData};
pub use scenario_data::{GridData, ScenarioData};
pub use unit_data::UnitData;
