//! Seeded randomness for the simulation.
//!
//! The only random inputs are AI purchase decisions, AI placement spots and
//! the nudge given to stuck units. All of them draw from one [`GameRng`]
//! owned by the world, so a seed fully determines a match.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::math::{Fixed, Vec2Fixed};

/// Deterministic random source.
#[derive(Debug, Clone)]
pub struct GameRng {
    rng: StdRng,
    seed: u64,
}

impl GameRng {
    /// Create a generator from a seed.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Seed this generator was created with.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// `true` with probability `per_mille / 1000`.
    pub fn chance_per_mille(&mut self, per_mille: u32) -> bool {
        if per_mille == 0 {
            return false;
        }
        self.rng.random_range(0..1000u32) < per_mille
    }

    /// Uniform index in `0..len`. `len` must be non-zero.
    pub fn index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.rng.random_range(0..len)
    }

    /// Uniform fixed-point value in `[low, high)`; returns `low` for empty ranges.
    pub fn fixed_in(&mut self, low: Fixed, high: Fixed) -> Fixed {
        if high <= low {
            return low;
        }
        Fixed::from_bits(self.rng.random_range(low.to_bits()..high.to_bits()))
    }

    /// Uniformly distributed unit vector.
    ///
    /// Rejection-samples the unit disc so the direction has no bias toward
    /// the square's corners.
    pub fn unit_vector(&mut self) -> Vec2Fixed {
        let one = Fixed::ONE;
        loop {
            let candidate = Vec2Fixed::new(self.fixed_in(-one, one), self.fixed_in(-one, one));
            let len_sq = candidate.dot(candidate);
            // Reject the corners and near-zero vectors that normalize badly.
            if len_sq <= one && len_sq > one / 64 {
                return candidate.normalize();
            }
        }
    }
}
