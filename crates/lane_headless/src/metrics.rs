//! Match metrics collection for balance analysis.
//!
//! A [`MetricsCollector`] watches the events a match emits and turns them
//! into a [`MatchMetrics`] record; a [`BatchSummary`] aggregates many of
//! those records.

use std::collections::{BTreeMap, HashMap};

use lane_core::prelude::*;
use serde::{Deserialize, Serialize};

/// Why a headless match stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndReason {
    /// A core fell.
    GameOver,
    /// The round limit was reached first.
    RoundLimit,
    /// The game-time limit was reached first.
    TimeLimit,
}

/// Per-side numbers for one match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideMetrics {
    /// Templates bought, by archetype.
    pub units_placed: BTreeMap<Archetype, u32>,
    /// Battle units this side lost.
    pub units_lost: u32,
    /// Enemy units this side killed.
    pub kills: u32,
    /// Total hp removed from enemies.
    pub damage_dealt: u64,
    /// Total hp restored to allies.
    pub healing_done: u64,
    /// Units that reached the enemy base.
    pub breaches: u32,
    /// Gold spent on units.
    pub gold_spent_on_units: u32,
    /// Gold credited over the match.
    pub gold_earned: u32,
    /// Core health at the end.
    pub final_health: u32,
    /// Highest unlocked tier at the end.
    pub highest_tier: u8,
    /// Archetype upgrades bought or granted.
    pub upgrades: u32,
    /// Economy levels bought.
    pub economy_level: u32,
}

impl SideMetrics {
    /// Templates bought over the match.
    #[must_use]
    pub fn total_placed(&self) -> u32 {
        self.units_placed.values().sum()
    }

    /// Kills per unit lost; kills alone when nothing was lost.
    #[must_use]
    pub fn kd_ratio(&self) -> f64 {
        if self.units_lost == 0 {
            f64::from(self.kills)
        } else {
            f64::from(self.kills) / f64::from(self.units_lost)
        }
    }
}

/// Complete metrics for a single match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchMetrics {
    /// Seed the match ran with.
    pub seed: u64,
    /// Player-side strategy, if computer controlled.
    pub player_strategy: Option<StrategyKind>,
    /// AI-side strategy, if computer controlled.
    pub ai_strategy: Option<StrategyKind>,
    /// Rounds settled.
    pub rounds: u32,
    /// Game time simulated.
    pub game_time_ms: u64,
    /// Winner; `None` for a draw or an unfinished match.
    pub winner: Option<Side>,
    /// Why the match stopped.
    pub end_reason: EndReason,
    /// Left side.
    pub player: SideMetrics,
    /// Right side.
    pub ai: SideMetrics,
    /// Final state hash for determinism checks.
    pub final_state_hash: u64,
}

impl MatchMetrics {
    /// Metrics for one side.
    #[must_use]
    pub const fn side(&self, side: Side) -> &SideMetrics {
        match side {
            Side::Player => &self.player,
            Side::Ai => &self.ai,
        }
    }

    /// Whether a core fell.
    #[must_use]
    pub fn is_decided(&self) -> bool {
        self.end_reason == EndReason::GameOver
    }
}

fn strategy(controller: Controller) -> Option<StrategyKind> {
    match controller {
        Controller::Human => None,
        Controller::Computer(kind) => Some(kind),
    }
}

/// Builds [`MatchMetrics`] from the events of a running match.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    owners: HashMap<UnitId, Side>,
    player: SideMetrics,
    ai: SideMetrics,
}

impl MetricsCollector {
    /// Empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn side_mut(&mut self, side: Side) -> &mut SideMetrics {
        match side {
            Side::Player => &mut self.player,
            Side::Ai => &mut self.ai,
        }
    }

    /// Record one tick's events.
    ///
    /// Damage and heals name units rather than sides, so the collector
    /// learns unit owners from the simulation after every tick. Units that
    /// spawn and vanish inside one tick are attributed to no one.
    pub fn observe(&mut self, sim: &Simulation, events: &[SimEvent]) {
        for unit in sim.units() {
            self.owners.insert(unit.id, unit.side);
        }

        for event in events {
            match *event {
                SimEvent::UnitPlaced { side, key, cost, .. } => {
                    let metrics = self.side_mut(side);
                    *metrics.units_placed.entry(key.archetype).or_default() += 1;
                    metrics.gold_spent_on_units += cost;
                }
                SimEvent::UnitDamaged {
                    attacker, amount, ..
                } => {
                    if let Some(side) = self.owners.get(&attacker).copied() {
                        self.side_mut(side).damage_dealt += u64::from(amount);
                    }
                }
                SimEvent::UnitHealed { healer, amount, .. } => {
                    if let Some(side) = self.owners.get(&healer).copied() {
                        self.side_mut(side).healing_done += u64::from(amount);
                    }
                }
                SimEvent::UnitKilled {
                    victim, victim_side, ..
                } => {
                    self.side_mut(victim_side).units_lost += 1;
                    self.side_mut(victim_side.opponent()).kills += 1;
                    self.owners.remove(&victim);
                }
                SimEvent::BaseBreached { attacker, unit, .. } => {
                    self.side_mut(attacker).breaches += 1;
                    self.owners.remove(&unit);
                }
                SimEvent::ArchetypeUpgraded { side, .. } => {
                    self.side_mut(side).upgrades += 1;
                }
                _ => {}
            }
        }
    }

    /// Close the record with the final match state.
    #[must_use]
    pub fn finish(mut self, sim: &Simulation, end_reason: EndReason) -> MatchMetrics {
        for side in Side::ALL {
            let state = sim.side(side).clone();
            let metrics = self.side_mut(side);
            metrics.gold_earned = state.gold_earned;
            metrics.final_health = state.health;
            metrics.highest_tier = state.highest_tier();
            metrics.economy_level = state.economy_level;
        }

        let controllers = sim.config().controllers;
        MatchMetrics {
            seed: sim.config().seed,
            player_strategy: strategy(controllers.player),
            ai_strategy: strategy(controllers.ai),
            rounds: sim.round(),
            game_time_ms: sim.game_time(),
            winner: sim.outcome().flatten(),
            end_reason,
            player: self.player,
            ai: self.ai,
            final_state_hash: sim.state_hash(),
        }
    }
}

// ============================================================================
// Batch summary
// ============================================================================

/// Aggregate numbers over many matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Matches summarized.
    pub matches: u32,
    /// Player-side wins.
    pub player_wins: u32,
    /// AI-side wins.
    pub ai_wins: u32,
    /// Both cores fell on the same tick.
    pub draws: u32,
    /// Matches stopped by a limit.
    pub unfinished: u32,
    /// Player wins over decided matches.
    pub player_win_rate: f64,
    /// Mean rounds per match.
    pub avg_rounds: f64,
    /// Mean game time per match.
    pub avg_game_time_ms: f64,
    /// Templates bought across all matches, by archetype.
    pub placements: BTreeMap<Archetype, u32>,
    /// Player-side kills over all matches.
    pub player_kills: u64,
    /// AI-side kills over all matches.
    pub ai_kills: u64,
}

impl BatchSummary {
    /// Summarize a set of matches.
    #[must_use]
    pub fn from_matches(matches: &[MatchMetrics]) -> Self {
        let mut summary = Self {
            matches: matches.len() as u32,
            ..Self::default()
        };
        if matches.is_empty() {
            return summary;
        }

        let mut total_rounds = 0u64;
        let mut total_time = 0u64;
        for m in matches {
            match m.winner {
                _ if !m.is_decided() => summary.unfinished += 1,
                Some(Side::Player) => summary.player_wins += 1,
                Some(Side::Ai) => summary.ai_wins += 1,
                None => summary.draws += 1,
            }
            total_rounds += u64::from(m.rounds);
            total_time += m.game_time_ms;
            summary.player_kills += u64::from(m.player.kills);
            summary.ai_kills += u64::from(m.ai.kills);
            for side in [&m.player, &m.ai] {
                for (archetype, count) in &side.units_placed {
                    *summary.placements.entry(*archetype).or_default() += count;
                }
            }
        }

        let n = matches.len() as f64;
        summary.avg_rounds = total_rounds as f64 / n;
        summary.avg_game_time_ms = total_time as f64 / n;
        let decided = summary.player_wins + summary.ai_wins + summary.draws;
        if decided > 0 {
            summary.player_win_rate = f64::from(summary.player_wins) / f64::from(decided);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lane_test_utils::fixtures::{human_vs_human, match_with, FRAME_MS};

    fn record(winner: Option<Side>, end_reason: EndReason, rounds: u32) -> MatchMetrics {
        MatchMetrics {
            seed: 0,
            player_strategy: None,
            ai_strategy: None,
            rounds,
            game_time_ms: u64::from(rounds) * 1000,
            winner,
            end_reason,
            player: SideMetrics::default(),
            ai: SideMetrics::default(),
            final_state_hash: 0,
        }
    }

    #[test]
    fn test_kd_ratio() {
        let mut side = SideMetrics::default();
        side.kills = 6;
        assert!((side.kd_ratio() - 6.0).abs() < f64::EPSILON);
        side.units_lost = 3;
        assert!((side.kd_ratio() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summary_counts_outcomes() {
        let summary = BatchSummary::from_matches(&[
            record(Some(Side::Player), EndReason::GameOver, 4),
            record(Some(Side::Ai), EndReason::GameOver, 6),
            record(Some(Side::Player), EndReason::GameOver, 8),
            record(None, EndReason::RoundLimit, 10),
            record(None, EndReason::GameOver, 2),
        ]);
        assert_eq!(summary.matches, 5);
        assert_eq!(summary.player_wins, 2);
        assert_eq!(summary.ai_wins, 1);
        assert_eq!(summary.draws, 1);
        assert_eq!(summary.unfinished, 1);
        assert!((summary.player_win_rate - 0.5).abs() < f64::EPSILON);
        assert!((summary.avg_rounds - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_summary() {
        let summary = BatchSummary::from_matches(&[]);
        assert_eq!(summary, BatchSummary::default());
    }

    #[test]
    fn test_collector_attributes_a_fought_round() {
        let mut sim = match_with(
            human_vs_human(),
            &[
                (Side::Player, Archetype::Melee, 150, 100),
                (Side::Player, Archetype::Melee, 150, 150),
                (Side::Ai, Archetype::Melee, 50, 100),
            ],
        );
        let mut collector = MetricsCollector::new();
        // Placements happened before the collector existed.
        assert_eq!(sim.units().len(), 3);

        while sim.round() < 1 {
            let events = sim.tick(FRAME_MS);
            collector.observe(&sim, &events.events);
        }
        let metrics = collector.finish(&sim, EndReason::RoundLimit);

        assert_eq!(metrics.rounds, 1);
        assert_eq!(metrics.winner, None);
        assert!(metrics.player.damage_dealt > 0);
        assert_eq!(metrics.player.kills, metrics.ai.units_lost);
        assert_eq!(metrics.ai.kills, metrics.player.units_lost);
        assert_eq!(metrics.final_state_hash, sim.state_hash());
    }

    #[test]
    fn test_collector_counts_placements() {
        let sim = match_with(human_vs_human(), &[]);
        let mut collector = MetricsCollector::new();
        collector.observe(
            &sim,
            &[SimEvent::UnitPlaced {
                unit: UnitId(1),
                side: Side::Ai,
                key: UnitKey::new(Archetype::Ranged, 1),
                cost: 20,
            }],
        );
        let metrics = collector.finish(&sim, EndReason::TimeLimit);
        assert_eq!(metrics.ai.units_placed.get(&Archetype::Ranged), Some(&1));
        assert_eq!(metrics.ai.gold_spent_on_units, 20);
        assert_eq!(metrics.ai.total_placed(), 1);
        assert_eq!(metrics.player.total_placed(), 0);
    }
}
