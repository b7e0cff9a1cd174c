//! Batch match runner for balance testing.
//!
//! Runs many seeded matches in parallel using rayon and aggregates their
//! metrics into a [`BatchSummary`].

use std::path::Path;
use std::time::Instant;

use lane_core::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config_loader::{write_json, Result};
use crate::metrics::{BatchSummary, MatchMetrics};
use crate::runner::{run_match, RunLimits};

/// Configuration for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of matches to run.
    pub match_count: u32,
    /// Seed of the first match; later matches count up from it.
    pub seed_start: u64,
    /// Maximum parallel matches (0 = rayon default).
    pub parallel: usize,
    /// Player-side strategy.
    pub player: StrategyKind,
    /// AI-side strategy.
    pub ai: StrategyKind,
    /// Per-match limits.
    pub limits: RunLimits,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            match_count: 100,
            seed_start: 0,
            parallel: 0,
            player: StrategyKind::Balanced,
            ai: StrategyKind::Balanced,
            limits: RunLimits::default(),
        }
    }
}

impl BatchConfig {
    /// Batch of `match_count` matches between two strategies.
    pub fn new(match_count: u32, player: StrategyKind, ai: StrategyKind) -> Self {
        Self {
            match_count,
            player,
            ai,
            ..Default::default()
        }
    }

    /// Set the first seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set per-match limits.
    pub fn with_limits(mut self, limits: RunLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Seeds in run order.
    pub fn seeds(&self) -> impl Iterator<Item = u64> {
        let start = self.seed_start;
        (0..u64::from(self.match_count)).map(move |i| start.wrapping_add(i))
    }
}

/// Results from a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used.
    pub config: BatchConfig,
    /// Per-match metrics, in seed order.
    pub matches: Vec<MatchMetrics>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Wall time spent.
    pub duration_seconds: f64,
}

impl BatchResults {
    /// Save results as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }
}

/// Run every match in the batch.
///
/// `base` supplies everything but the seed and controllers, which the
/// batch sets per match.
pub fn run_batch(
    config: BatchConfig,
    base: &GameConfig,
    catalog: &UnitCatalog,
) -> Result<BatchResults> {
    let start = Instant::now();
    info!(
        matches = config.match_count,
        seed_start = config.seed_start,
        player = ?config.player,
        ai = ?config.ai,
        parallel = config.parallel,
        "Starting batch"
    );

    let seeds: Vec<u64> = config.seeds().collect();
    let play = |seed: u64| {
        let game = base.clone().with_seed(seed).ai_vs_ai(config.player, config.ai);
        run_match(game, catalog.clone(), &config.limits)
    };

    let matches: Vec<MatchMetrics> = if config.parallel == 0 {
        seeds.par_iter().map(|&seed| play(seed)).collect()
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel)
            .build()?;
        pool.install(|| seeds.par_iter().map(|&seed| play(seed)).collect())
    };

    let summary = BatchSummary::from_matches(&matches);
    if summary.unfinished > 0 {
        warn!(
            unfinished = summary.unfinished,
            "Some matches hit a limit before a core fell"
        );
    }

    let duration_seconds = start.elapsed().as_secs_f64();
    info!(
        player_wins = summary.player_wins,
        ai_wins = summary.ai_wins,
        draws = summary.draws,
        duration_secs = format!("{duration_seconds:.1}"),
        "Batch complete"
    );

    Ok(BatchResults {
        config,
        matches,
        summary,
        duration_seconds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_batch(parallel: usize) -> BatchConfig {
        BatchConfig {
            parallel,
            ..BatchConfig::new(4, StrategyKind::Aggressive, StrategyKind::Scripted)
                .with_seed(30)
                .with_limits(RunLimits {
                    max_rounds: 2,
                    frame_ms: 50,
                    ..RunLimits::default()
                })
        }
    }

    #[test]
    fn test_seeds_count_up() {
        let config = BatchConfig::new(3, StrategyKind::Random, StrategyKind::Random).with_seed(7);
        assert_eq!(config.seeds().collect::<Vec<_>>(), vec![7, 8, 9]);
    }

    #[test]
    fn test_batch_runs_every_seed_in_order() {
        let results =
            run_batch(small_batch(2), &GameConfig::default(), &UnitCatalog::default()).unwrap();
        assert_eq!(results.matches.len(), 4);
        let seeds: Vec<u64> = results.matches.iter().map(|m| m.seed).collect();
        assert_eq!(seeds, vec![30, 31, 32, 33]);
        assert_eq!(results.summary.matches, 4);
        assert!(results
            .matches
            .iter()
            .all(|m| m.ai_strategy == Some(StrategyKind::Scripted)));
    }

    #[test]
    fn test_pool_size_does_not_change_results() {
        let base = GameConfig::default();
        let catalog = UnitCatalog::default();
        let serial = run_batch(small_batch(1), &base, &catalog).unwrap();
        let pooled = run_batch(small_batch(0), &base, &catalog).unwrap();
        assert_eq!(serial.matches, pooled.matches);
    }

    #[test]
    fn test_results_save_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch_results.json");
        let config = BatchConfig {
            match_count: 1,
            ..small_batch(1)
        };
        run_batch(config, &GameConfig::default(), &UnitCatalog::default())
            .unwrap()
            .save(&path)
            .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["summary"]["matches"], 1);
        assert_eq!(value["matches"][0]["seed"], 30);
    }
}
