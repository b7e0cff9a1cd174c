//! Test fixtures and helpers.
//!
//! Pre-built configs and matches for consistent testing.

use fixed::types::I32F32;
use lane_core::data::Controllers;
use lane_core::prelude::*;

/// Frame delta used by the fixture drivers, in milliseconds.
pub const FRAME_MS: u64 = 16;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Zone-local or battlefield position from integers.
#[must_use]
pub fn pos(x: i32, y: i32) -> Vec2Fixed {
    Vec2Fixed::from_ints(x, y)
}

/// Default rules with both sides driven by the caller.
#[must_use]
pub fn human_vs_human() -> GameConfig {
    let mut config = GameConfig::default();
    config.controllers = Controllers {
        player: Controller::Human,
        ai: Controller::Human,
    };
    config
}

/// Default rules with both sides computer controlled.
#[must_use]
pub fn ai_vs_ai(seed: u64, player: StrategyKind, ai: StrategyKind) -> GameConfig {
    GameConfig::default().with_seed(seed).ai_vs_ai(player, ai)
}

/// A started AI-vs-AI match.
#[must_use]
pub fn ai_match(seed: u64) -> Simulation {
    let mut sim = Simulation::new(ai_vs_ai(seed, StrategyKind::Balanced, StrategyKind::Aggressive));
    sim.start();
    sim
}

/// A human-vs-human match with the given tier-1 templates placed.
///
/// # Panics
///
/// Panics if a placement is rejected.
#[must_use]
pub fn match_with(config: GameConfig, placements: &[(Side, Archetype, i32, i32)]) -> Simulation {
    let mut sim = Simulation::new(config);
    for &(side, archetype, x, y) in placements {
        let key = UnitKey::new(archetype, 1);
        if let Err(error) = sim.place_unit(side, key, pos(x, y)) {
            panic!("fixture placement {side:?} {key} at ({x}, {y}) rejected: {error}");
        }
    }
    sim
}

/// Tick until the phase changes or `max_ms` of frames have passed.
/// Returns every event seen.
pub fn run_until_phase_change(sim: &mut Simulation, max_ms: u64) -> Vec<SimEvent> {
    let start = sim.phase();
    let mut events = Vec::new();
    let mut elapsed = 0;
    while elapsed < max_ms && sim.phase() == start {
        events.extend(sim.tick(FRAME_MS).events);
        elapsed += FRAME_MS;
    }
    events
}

/// Tick for `ms` milliseconds of frames. Returns every event seen.
pub fn run_for(sim: &mut Simulation, ms: u64) -> Vec<SimEvent> {
    let mut events = Vec::new();
    for _ in 0..ms / FRAME_MS {
        events.extend(sim.tick(FRAME_MS).events);
    }
    events
}
