//! Single-match headless runner.
//!
//! Drives one AI-vs-AI [`Simulation`] with fixed frame deltas until a core
//! falls or a limit is hit, collecting metrics along the way.

use lane_core::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::metrics::{EndReason, MatchMetrics, MetricsCollector};

/// When to stop a match that has not been decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLimits {
    /// Stop once this many rounds have settled.
    pub max_rounds: u32,
    /// Stop once this much game time has elapsed.
    pub max_game_ms: u64,
    /// Frame delta fed to every tick.
    pub frame_ms: u64,
    /// Game speed multiplier.
    pub speed: u32,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            max_rounds: 50,
            max_game_ms: 60 * 60 * 1000,
            frame_ms: 16,
            speed: 1,
        }
    }
}

/// Set up a started match for the given config and catalog.
#[must_use]
pub fn prepare(config: GameConfig, catalog: UnitCatalog, limits: &RunLimits) -> Simulation {
    let mut sim = Simulation::with_catalog(config, catalog);
    sim.set_speed(limits.speed);
    sim.start();
    sim
}

/// Run a prepared match to its end or a limit.
pub fn run_to_end(sim: &mut Simulation, limits: &RunLimits) -> MatchMetrics {
    let mut collector = MetricsCollector::new();
    let frame_ms = limits.frame_ms.max(1);

    let end_reason = loop {
        if sim.is_game_over() {
            break EndReason::GameOver;
        }
        if sim.round() >= limits.max_rounds {
            break EndReason::RoundLimit;
        }
        if sim.game_time() >= limits.max_game_ms {
            break EndReason::TimeLimit;
        }

        let round = sim.round();
        let events = sim.tick(frame_ms);
        collector.observe(sim, &events.events);
        if sim.round() != round {
            debug!(
                round = sim.round(),
                player_health = sim.side(Side::Player).health,
                ai_health = sim.side(Side::Ai).health,
                "Round settled"
            );
        }
    };

    let metrics = collector.finish(sim, end_reason);
    info!(
        seed = metrics.seed,
        rounds = metrics.rounds,
        game_time_ms = metrics.game_time_ms,
        winner = ?metrics.winner,
        end = ?metrics.end_reason,
        "Match finished"
    );
    metrics
}

/// Run one match from scratch.
pub fn run_match(config: GameConfig, catalog: UnitCatalog, limits: &RunLimits) -> MatchMetrics {
    let mut sim = prepare(config, catalog, limits);
    run_to_end(&mut sim, limits)
}

/// Run the same match `runs` times and return each final state hash.
pub fn replay_hashes(
    config: &GameConfig,
    catalog: &UnitCatalog,
    limits: &RunLimits,
    runs: usize,
) -> Vec<u64> {
    (0..runs)
        .map(|_| run_match(config.clone(), catalog.clone(), limits).final_state_hash)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lane_test_utils::fixtures::ai_vs_ai;

    fn short() -> RunLimits {
        RunLimits {
            max_rounds: 3,
            max_game_ms: 10 * 60 * 1000,
            frame_ms: 50,
            speed: 1,
        }
    }

    #[test]
    fn test_round_limit_stops_the_match() {
        let config = ai_vs_ai(4, StrategyKind::Balanced, StrategyKind::Scripted);
        let metrics = run_match(config, UnitCatalog::default(), &short());
        assert_eq!(metrics.end_reason, EndReason::RoundLimit);
        assert_eq!(metrics.rounds, 3);
        assert_eq!(metrics.winner, None);
        assert_eq!(metrics.player_strategy, Some(StrategyKind::Balanced));
        assert_eq!(metrics.ai_strategy, Some(StrategyKind::Scripted));
        assert!(metrics.player.total_placed() > 0);
        assert!(metrics.ai.total_placed() > 0);
    }

    #[test]
    fn test_time_limit_stops_the_match() {
        let config = ai_vs_ai(4, StrategyKind::Random, StrategyKind::Random);
        let limits = RunLimits {
            max_game_ms: 5_000,
            ..short()
        };
        let metrics = run_match(config, UnitCatalog::default(), &limits);
        assert_eq!(metrics.end_reason, EndReason::TimeLimit);
        assert_eq!(metrics.rounds, 0);
        assert!(metrics.game_time_ms >= 5_000);
    }

    #[test]
    fn test_speed_covers_game_time_in_fewer_frames() {
        let config = ai_vs_ai(4, StrategyKind::Random, StrategyKind::Random);
        let limits = RunLimits {
            max_game_ms: 4_000,
            speed: 4,
            ..short()
        };
        let mut sim = prepare(config, UnitCatalog::default(), &limits);
        assert_eq!(sim.speed(), 4);
        let metrics = run_to_end(&mut sim, &limits);
        // 20 frames of 50 ms at 4x.
        assert_eq!(metrics.game_time_ms, 4_000);
        assert!(sim.wall_clock() <= 1_000);
    }

    #[test]
    fn test_lopsided_match_is_decided() {
        let mut config = ai_vs_ai(8, StrategyKind::Balanced, StrategyKind::Aggressive);
        config.starting_health = 1;
        config.controllers.player = Controller::Human;
        let limits = RunLimits {
            max_rounds: 20,
            ..short()
        };
        let metrics = run_match(config, UnitCatalog::default(), &limits);
        assert_eq!(metrics.end_reason, EndReason::GameOver);
        assert_eq!(metrics.winner, Some(Side::Ai));
        assert_eq!(metrics.player.final_health, 0);
        assert!(metrics.ai.breaches >= 1);
    }

    #[test]
    fn test_replays_agree() {
        let config = ai_vs_ai(21, StrategyKind::Scripted, StrategyKind::Aggressive);
        let hashes = replay_hashes(&config, &UnitCatalog::default(), &short(), 2);
        assert_eq!(hashes.len(), 2);
        assert_eq!(hashes[0], hashes[1]);
    }
}
