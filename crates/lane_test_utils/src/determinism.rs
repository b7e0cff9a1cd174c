//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a match produces identical results
//! given identical inputs.
//!
//! # Testing Strategy
//!
//! Sources of non-determinism the simulation guards against:
//!
//! - **Floating-point math**: all positions, speeds and multipliers use
//!   [`lane_core::math::Fixed`].
//! - **Iteration order**: units live in a vector sorted by id and are
//!   always processed in that order.
//! - **Randomness**: AI decisions and unstuck nudges draw from one seeded
//!   RNG per match.
//! - **Frame timing**: the caller supplies every frame delta, so replaying
//!   the same deltas replays the match.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use lane_core::simulation::Simulation;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic match).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs agreed, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance the state by one tick
/// * `hash` - Function to compute the state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S, u64),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();
        for tick in 0..ticks {
            step(&mut state, tick);
        }
        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a match twice with the same frame deltas and compare final hashes.
///
/// `frame_ms` maps the tick index to that frame's delta, so uneven frame
/// timing can be replayed exactly.
pub fn verify_simulation_determinism<F, D>(setup_fn: F, frame_ms: D, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
    D: Fn(u64) -> u64,
{
    verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |sim, tick| {
            sim.tick(frame_ms(tick));
        },
        Simulation::state_hash,
    )
    .is_deterministic
}

/// Run N matches on scoped threads and collect the final hashes.
///
/// # Panics
///
/// Panics if a worker thread panicked.
pub fn run_parallel_simulations<F>(
    setup_fn: F,
    num_sims: usize,
    num_ticks: u64,
    frame_ms: u64,
) -> DeterminismResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        sim.tick(frame_ms);
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two runs tick by tick and report the first tick whose hashes
/// differ, or `None` when they never do.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64, frame_ms: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        sim1.tick(frame_ms);
        sim2.tick(frame_ms);

        if sim1.state_hash() != sim2.state_hash() {
            tracing::warn!(tick, round = sim1.round(), "Simulations diverged");
            return Some(tick);
        }
    }

    None
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for simulation inputs.
pub mod strategies {
    use lane_core::prelude::*;
    use proptest::prelude::*;

    /// Any seed.
    pub fn arb_seed() -> impl Strategy<Value = u64> {
        any::<u64>()
    }

    /// Any purchasing strategy.
    pub fn arb_strategy() -> impl Strategy<Value = StrategyKind> {
        prop::sample::select(StrategyKind::ALL.to_vec())
    }

    /// Any archetype.
    pub fn arb_archetype() -> impl Strategy<Value = Archetype> {
        prop::sample::select(Archetype::ALL.to_vec())
    }

    /// Any difficulty.
    pub fn arb_difficulty() -> impl Strategy<Value = Difficulty> {
        prop::sample::select(vec![Difficulty::Easy, Difficulty::Normal, Difficulty::Hard])
    }

    /// Integer point inside the default 200 × 270 build zone.
    pub fn arb_zone_position() -> impl Strategy<Value = Vec2Fixed> {
        (0i32..=200, 0i32..=270).prop_map(|(x, y)| Vec2Fixed::from_ints(x, y))
    }

    /// Integer point anywhere on the default 800 × 270 battlefield lane.
    pub fn arb_lane_position() -> impl Strategy<Value = Vec2Fixed> {
        (0i32..=800, 10i32..=260).prop_map(|(x, y)| Vec2Fixed::from_ints(x, y))
    }

    /// Frame delta, including stalls longer than the clamp.
    pub fn arb_frame_delta() -> impl Strategy<Value = u64> {
        prop_oneof![8 => 1u64..=50, 1 => 50u64..=5_000]
    }

    /// Damage values from chip hits to overkill.
    pub fn arb_damage() -> impl Strategy<Value = u32> {
        0u32..=1_000
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{ai_match, FRAME_MS};

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 10, || 0u64, |n, tick| *n += tick, |n| *n);
        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![45, 45, 45]);
        assert_eq!(result.unique_hashes().len(), 1);
    }

    #[test]
    #[should_panic(expected = "non-deterministic")]
    fn test_assert_reports_divergence() {
        DeterminismResult {
            is_deterministic: false,
            hashes: vec![1, 2],
            ticks: 5,
        }
        .assert_deterministic();
    }

    #[test]
    fn test_ai_match_is_deterministic() {
        assert!(verify_simulation_determinism(
            || ai_match(42),
            |tick| 10 + tick % 23,
            2_000
        ));
    }

    #[test]
    fn test_parallel_matches_agree() {
        run_parallel_simulations(|| ai_match(7), 4, 1_000, FRAME_MS).assert_deterministic();
    }

    #[test]
    fn test_no_divergence() {
        assert_eq!(find_first_divergence(|| ai_match(3), 500, FRAME_MS), None);
    }

    #[test]
    fn test_compute_hash_is_stable() {
        assert_eq!(compute_hash(&(1u32, "lane")), compute_hash(&(1u32, "lane")));
        assert_ne!(compute_hash(&1u32), compute_hash(&2u32));
    }
}
