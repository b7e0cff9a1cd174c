//! Per-side gold, core health and income formulas.
//!
//! Income sources:
//! - passive income from a time bucket during the build phase
//! - kill bounties scaled by the victim's rank
//! - a round bonus that grows every round
//! - bonus gold attached to free tier unlocks
//!
//! The AI side's income is scaled by its income percent (difficulty plus
//! any ramp); the player's stays at 100.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::components::{ArchetypeMap, Side};
use crate::data::GameConfig;
use crate::error::{GameError, Result};
use crate::math::{percent, round_to_u32, Fixed};

/// Economy and core state of one side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SideState {
    /// Which side this is.
    pub side: Side,
    /// Core health; the side loses at zero.
    pub health: u32,
    /// Spendable gold.
    pub gold: u32,
    /// Units that reached this side's base or survived a battle against it.
    pub lives_lost: u32,
    /// Purchased economy levels.
    pub economy_level: u32,
    /// Tiers this side may buy.
    pub unlocked_tiers: BTreeSet<u8>,
    /// Upgrade level per archetype.
    pub upgrade_levels: ArchetypeMap<u32>,
    /// Income multiplier in percent.
    pub income_percent: u32,
    /// Gold credited over the match.
    pub gold_earned: u32,
    /// Gold spent over the match.
    pub gold_spent: u32,
    passive_bucket_ms: u64,
}

impl SideState {
    /// Fresh side state from the config.
    #[must_use]
    pub fn new(side: Side, config: &GameConfig) -> Self {
        let income_percent = match side {
            Side::Player => 100,
            Side::Ai => config.difficulty.income_percent(),
        };
        Self {
            side,
            health: config.starting_health,
            gold: config.starting_gold,
            lives_lost: 0,
            economy_level: 0,
            unlocked_tiers: BTreeSet::from([1]),
            upgrade_levels: ArchetypeMap::splat(0),
            income_percent,
            gold_earned: 0,
            gold_spent: 0,
            passive_bucket_ms: 0,
        }
    }

    /// Deduct `cost` or fail without changing anything.
    pub fn spend(&mut self, cost: u32) -> Result<()> {
        if self.gold < cost {
            return Err(GameError::InsufficientGold {
                side: self.side,
                required: cost,
                available: self.gold,
            });
        }
        self.gold -= cost;
        self.gold_spent = self.gold_spent.saturating_add(cost);
        Ok(())
    }

    /// Credit gold.
    pub fn earn(&mut self, amount: u32) {
        self.gold = self.gold.saturating_add(amount);
        self.gold_earned = self.gold_earned.saturating_add(amount);
    }

    /// Apply this side's income multiplier to a base amount.
    #[must_use]
    pub fn scaled_income(&self, amount: u32) -> u32 {
        if self.income_percent == 100 {
            return amount;
        }
        round_to_u32(Fixed::from_num(amount) * percent(self.income_percent))
    }

    /// Credit a base amount after the income multiplier. Returns the credit.
    pub fn earn_scaled(&mut self, amount: u32) -> u32 {
        let credited = self.scaled_income(amount);
        self.earn(credited);
        credited
    }

    /// Lose core health to an enemy unit. Returns the health left.
    pub fn lose_life(&mut self, damage: u32) -> u32 {
        self.health = self.health.saturating_sub(damage);
        self.lives_lost += 1;
        self.health
    }

    /// Whether the core has fallen.
    #[must_use]
    pub const fn is_defeated(&self) -> bool {
        self.health == 0
    }

    /// Whether a tier may be bought.
    #[must_use]
    pub fn has_tier(&self, tier: u8) -> bool {
        self.unlocked_tiers.contains(&tier)
    }

    /// Highest unlocked tier.
    #[must_use]
    pub fn highest_tier(&self) -> u8 {
        self.unlocked_tiers.last().copied().unwrap_or(1)
    }

    /// Accumulate passive-income time and pay once per full interval in
    /// the bucket, keeping the remainder. Returns the gold credited.
    pub fn accrue_passive(&mut self, dt_ms: u64, config: &GameConfig) -> u32 {
        let interval = config.passive_gold_interval_ms;
        if interval == 0 {
            return 0;
        }
        self.passive_bucket_ms += dt_ms;

        let tier_bonus = u32::try_from(self.unlocked_tiers.len().saturating_sub(1)).unwrap_or(0);
        let base = config.passive_gold_amount + self.economy_level + tier_bonus;
        let mut paid = 0;
        while self.passive_bucket_ms >= interval {
            self.passive_bucket_ms -= interval;
            paid += self.earn_scaled(base);
        }
        paid
    }
}

/// Both sides' state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sides {
    /// Left side.
    pub player: SideState,
    /// Right side.
    pub ai: SideState,
}

impl Sides {
    /// Fresh state for both sides.
    #[must_use]
    pub fn new(config: &GameConfig) -> Self {
        Self {
            player: SideState::new(Side::Player, config),
            ai: SideState::new(Side::Ai, config),
        }
    }

    /// State of a side.
    #[must_use]
    pub const fn get(&self, side: Side) -> &SideState {
        match side {
            Side::Player => &self.player,
            Side::Ai => &self.ai,
        }
    }

    /// Mutable state of a side.
    pub fn get_mut(&mut self, side: Side) -> &mut SideState {
        match side {
            Side::Player => &mut self.player,
            Side::Ai => &mut self.ai,
        }
    }

    /// The side left standing, if exactly one core has fallen.
    ///
    /// `Some(None)` means both fell in the same tick.
    #[must_use]
    pub fn outcome(&self) -> Option<Option<Side>> {
        match (self.player.is_defeated(), self.ai.is_defeated()) {
            (false, false) => None,
            (true, false) => Some(Some(Side::Ai)),
            (false, true) => Some(Some(Side::Player)),
            (true, true) => Some(None),
        }
    }
}

// ============================================================================
// Formulas
// ============================================================================

/// Bounty for killing a unit of the given rank, before income scaling.
#[must_use]
pub const fn kill_bounty(config: &GameConfig, victim_rank: u32) -> u32 {
    config.kill_gold_base + victim_rank * config.kill_gold_per_tier
}

/// Round bonus for reaching `round`, before income scaling.
#[must_use]
pub const fn round_bonus(config: &GameConfig, round: u32) -> u32 {
    config.round_gold_base + round * config.round_gold_per_round
}

/// Price of the next economy level.
#[must_use]
pub const fn economy_upgrade_cost(config: &GameConfig, level: u32) -> u32 {
    config.economy_upgrade_base_cost + level * config.economy_upgrade_cost_per_level
}

/// Buy one economy level. Returns the new level.
pub fn upgrade_economy(state: &mut SideState, config: &GameConfig) -> Result<u32> {
    state.spend(economy_upgrade_cost(config, state.economy_level))?;
    state.economy_level += 1;
    Ok(state.economy_level)
}
