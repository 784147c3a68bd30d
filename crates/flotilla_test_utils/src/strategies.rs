//! Proptest strategies for boards, searches and scenarios.
//!
//! These generate random but reproducible inputs for property-based tests.

use flotilla_core::data::{GridData, PacingData, RulesData, ScenarioData, UnitData};
use flotilla_core::factions::Faction;
use flotilla_core::fsm::StateKind;
use flotilla_core::math::Fixed;
use proptest::prelude::*;

/// Any faction.
pub fn arb_faction() -> impl Strategy<Value = Faction> {
    prop_oneof![Just(Faction::Player), Just(Faction::Ally), Just(Faction::Enemy)]
}

/// A faction driven by the AI.
pub fn arb_ai_faction() -> impl Strategy<Value = Faction> {
    prop_oneof![Just(Faction::Ally), Just(Faction::Enemy)]
}

/// Any starting state.
pub fn arb_start_state() -> impl Strategy<Value = StateKind> {
    prop_oneof![
        Just(StateKind::Idle),
        Just(StateKind::Attacking),
        Just(StateKind::Retreating),
    ]
}

/// Grid dimensions from 2x2 up to 12x12.
pub fn arb_grid_size() -> impl Strategy<Value = (u32, u32)> {
    (2u32..=12, 2u32..=12)
}

/// A grid plus a start and goal coordinate on it.
pub fn arb_search_case() -> impl Strategy<Value = ((u32, u32), (u32, u32), (u32, u32))> {
    arb_grid_size().prop_flat_map(|(w, h)| (Just((w, h)), (0..w, 0..h), (0..w, 0..h)))
}

/// A radius in world units, from one tile spacing to a few.
pub fn arb_radius() -> impl Strategy<Value = Fixed> {
    (3i32..=15).prop_map(Fixed::from_num)
}

/// A valid scenario: one player and up to seven AI units on distinct
/// tiles, with instant pacing.
pub fn arb_scenario() -> impl Strategy<Value = ScenarioData> {
    (3u32..=8, 3u32..=8)
        .prop_flat_map(|(w, h)| {
            let coords: Vec<(u32, u32)> =
                (0..h).flat_map(|y| (0..w).map(move |x| (x, y))).collect();
            let max = coords.len().min(8);
            (
                Just((w, h)),
                proptest::sample::subsequence(coords, 2..=max).prop_shuffle(),
                proptest::collection::vec((arb_ai_faction(), 1u32..=3, arb_start_state()), max),
                any::<u64>(),
            )
        })
        .prop_map(|((w, h), tiles, traits, seed)| {
            let units = tiles
                .into_iter()
                .zip(traits)
                .enumerate()
                .map(|(i, (tile, (faction, movement, start_state)))| {
                    let faction = if i == 0 { Faction::Player } else { faction };
                    UnitData {
                        name: format!("{} {i}", faction.display_name()),
                        faction,
                        tile,
                        health: 1,
                        movement,
                        start_state,
                    }
                })
                .collect();
            ScenarioData {
                name: "generated".to_string(),
                description: String::new(),
                grid: GridData::new(w, h),
                rules: RulesData::default(),
                pacing: PacingData::instant(),
                seed,
                units,
            }
        })
}
