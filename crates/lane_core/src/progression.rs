//! Unit strength progression.
//!
//! A [`Progression`] turns a [`UnitDefinition`] plus the owning side's state
//! into [`ResolvedStats`], prices units and upgrades, and applies automatic
//! round-based advancement. The rest of the simulation only ever sees the
//! resolved stats.
//!
//! Two models exist:
//! - [`TierProgression`]: higher-tier definitions unlock over time or by
//!   purchase.
//! - [`LevelProgression`]: only tier-1 definitions, with per-archetype
//!   upgrade levels that compound multipliers.

use std::fmt;

use crate::components::{Archetype, Side};
use crate::data::{
    ComebackRule, GameConfig, LevelRules, ProgressionMode, StatScale, TierRules, UnitDefinition,
    UpgradeConfig,
};
use crate::economy::{SideState, Sides};
use crate::error::{GameError, Result};
use crate::events::{GoldSource, SimEvent};
use crate::math::{percent, round_to_u32, Fixed};

/// Healer and caster target counts never exceed this.
pub const MAX_TARGETS_CAP: u32 = 5;

/// Stats a unit is constructed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedStats {
    /// Starting and maximum hp.
    pub max_hp: u32,
    /// Damage per activation.
    pub damage: u32,
    /// Heal per target per activation.
    pub heal_amount: u32,
    /// Caster splash targets or healer heal targets.
    pub max_targets: u32,
    /// Units a projectile may hit before despawning.
    pub pierce_limit: u32,
    /// Reach in pixels.
    pub attack_range: Fixed,
    /// Milliseconds between activations.
    pub attack_cooldown_ms: u64,
    /// Pixels per second.
    pub speed: Fixed,
    /// Splash radius in pixels.
    pub aoe_radius: Fixed,
    /// Definition tier.
    pub tier: u8,
    /// Archetype upgrade level at construction.
    pub level: u32,
    /// Strength rank used for kill bounties.
    pub rank: u32,
}

/// Compounding multipliers from upgrade levels.
#[derive(Debug, Clone, Copy)]
struct LevelMultipliers {
    hp: Fixed,
    damage: Fixed,
    cooldown: Fixed,
    aoe: Fixed,
}

impl LevelMultipliers {
    const IDENTITY: Self = Self {
        hp: Fixed::ONE,
        damage: Fixed::ONE,
        cooldown: Fixed::ONE,
        aoe: Fixed::ONE,
    };

    fn at_level(upgrades: &UpgradeConfig, level: u32) -> Self {
        Self {
            hp: compound(upgrades.hp_percent, level),
            damage: compound(upgrades.damage_percent, level),
            cooldown: compound(upgrades.cooldown_percent, level)
                .max(percent(upgrades.min_cooldown_percent)),
            aoe: compound(upgrades.aoe_percent, level).min(percent(upgrades.max_aoe_percent)),
        }
    }
}

/// `(percent / 100) ^ level`.
fn compound(percent_per_level: u32, level: u32) -> Fixed {
    let factor = percent(percent_per_level);
    (0..level).fold(Fixed::ONE, |acc, _| acc.saturating_mul(factor))
}

fn scale3(a: u32, b: u32, c: u32) -> Fixed {
    percent(a) * percent(b) * percent(c)
}

/// `1 + lives_lost * p%` under a stat-boost comeback rule.
fn comeback_factor(rule: ComebackRule, side: &SideState) -> Fixed {
    match rule {
        ComebackRule::StatBoost { percent_per_life } => {
            Fixed::ONE + percent(percent_per_life) * Fixed::from_num(side.lives_lost)
        }
        ComebackRule::Disabled | ComebackRule::LevelMilestone { .. } => Fixed::ONE,
    }
}

/// Apply balance, level and comeback multipliers to a definition.
fn resolve_base(
    def: &UnitDefinition,
    config: &GameConfig,
    side: &SideState,
    levels: LevelMultipliers,
) -> ResolvedStats {
    let balance = &config.balance;
    let tier: StatScale = balance.tier(def.tier());
    let arch = balance.archetypes.get(def.archetype());
    let global = balance.global;
    let comeback = comeback_factor(config.mode.comeback, side);

    let of = |value: u32| Fixed::from_num(value);

    let hp = of(def.hp) * scale3(tier.hp, arch.hp, global.hp) * levels.hp * comeback;
    let damage = of(def.damage)
        * scale3(tier.damage, arch.damage, global.damage)
        * levels.damage
        * comeback;
    let speed = of(def.speed) * scale3(tier.speed, arch.speed, global.speed);
    let range = of(def.attack_range) * scale3(tier.range, arch.range, global.range);
    let cooldown = of(def.attack_cooldown_ms)
        * scale3(tier.cooldown, arch.cooldown, global.cooldown)
        * levels.cooldown;

    ResolvedStats {
        max_hp: round_to_u32(hp).max(1),
        damage: round_to_u32(damage),
        heal_amount: round_to_u32(of(def.heal_amount) * levels.damage),
        max_targets: 1,
        pierce_limit: 1,
        attack_range: of(round_to_u32(range)),
        attack_cooldown_ms: u64::from(round_to_u32(cooldown)),
        speed: of(round_to_u32(speed)),
        aoe_radius: of(round_to_u32(of(def.aoe_radius) * levels.aoe)),
        tier: def.tier(),
        level: 0,
        rank: 1,
    }
}

/// Strategy interface for unit progression.
pub trait Progression: fmt::Debug + Send + Sync {
    /// Short model name for logs and errors.
    fn name(&self) -> &'static str;

    /// Stats for a new unit of `def` owned by `side`.
    fn resolve(&self, def: &UnitDefinition, side: &SideState, config: &GameConfig)
        -> ResolvedStats;

    /// Fail if `side` may not buy `def` right now.
    fn check_available(&self, def: &UnitDefinition, side: &SideState) -> Result<()>;

    /// Gold price of `def` for `side`.
    fn unit_cost(&self, def: &UnitDefinition, side: &SideState) -> u32;

    /// Price of unlocking `tier`, if this model sells tiers.
    fn unlock_cost(&self, _tier: u8) -> Option<u32> {
        None
    }

    /// Buy `tier` for `side`. Returns the gold paid.
    fn unlock_tier(&self, _side: &mut SideState, _tier: u8, _max_tier: u8) -> Result<u32> {
        Err(GameError::UnsupportedByProgression {
            action: "tier unlock",
            model: self.name(),
        })
    }

    /// Price of the next upgrade of `archetype`, if this model sells upgrades.
    fn upgrade_cost(&self, _side: &SideState, _archetype: Archetype) -> Option<u32> {
        None
    }

    /// Buy one level of `archetype` for `side`. Returns the new level.
    fn upgrade(&self, _side: &mut SideState, _archetype: Archetype) -> Result<u32> {
        Err(GameError::UnsupportedByProgression {
            action: "archetype upgrade",
            model: self.name(),
        })
    }

    /// Automatic advancement after `round` begins.
    fn on_round_advanced(&self, round: u32, sides: &mut Sides, max_tier: u8, events: &mut Vec<SimEvent>);

    /// Catch-up handling after `side` lost a life.
    fn on_life_lost(&self, _side: &mut SideState, _rule: ComebackRule, _events: &mut Vec<SimEvent>) {}
}

/// Build the progression selected by the config.
#[must_use]
pub fn progression_for(mode: &ProgressionMode) -> Box<dyn Progression> {
    match mode {
        ProgressionMode::Tiered(rules) => Box::new(TierProgression::new(rules.clone())),
        ProgressionMode::Leveled(rules) => Box::new(LevelProgression::new(*rules)),
    }
}

// ============================================================================
// Tier progression
// ============================================================================

/// Tier-unlock progression.
#[derive(Debug, Clone)]
pub struct TierProgression {
    rules: TierRules,
}

impl TierProgression {
    /// Create from rules.
    #[must_use]
    pub const fn new(rules: TierRules) -> Self {
        Self { rules }
    }

    fn grant(side: &mut SideState, tier: u8, events: &mut Vec<SimEvent>) {
        side.unlocked_tiers.insert(tier);
        tracing::info!(side = ?side.side, tier, "Tier unlocked by round progress");
        events.push(SimEvent::TierUnlocked {
            side: side.side,
            tier,
            purchased: false,
        });
    }
}

impl Progression for TierProgression {
    fn name(&self) -> &'static str {
        "tiered"
    }

    fn resolve(&self, def: &UnitDefinition, side: &SideState, config: &GameConfig) -> ResolvedStats {
        let mut stats = resolve_base(def, config, side, LevelMultipliers::IDENTITY);
        let tier = u32::from(def.tier());
        stats.rank = tier;
        match def.archetype() {
            Archetype::Caster => stats.max_targets = tier + 1,
            Archetype::Healer => stats.max_targets = def.max_targets.min(MAX_TARGETS_CAP),
            Archetype::Ranged => stats.pierce_limit = tier + 1,
            Archetype::Melee => {}
        }
        stats
    }

    fn check_available(&self, def: &UnitDefinition, side: &SideState) -> Result<()> {
        if side.has_tier(def.tier()) {
            Ok(())
        } else {
            Err(GameError::TierLocked {
                side: side.side,
                tier: def.tier(),
            })
        }
    }

    fn unit_cost(&self, def: &UnitDefinition, _side: &SideState) -> u32 {
        def.cost
    }

    fn unlock_cost(&self, tier: u8) -> Option<u32> {
        let index = usize::from(tier).checked_sub(2)?;
        self.rules.unlock_costs.get(index).copied()
    }

    fn unlock_tier(&self, side: &mut SideState, tier: u8, max_tier: u8) -> Result<u32> {
        if side.has_tier(tier) {
            return Err(GameError::AlreadyUnlocked(tier));
        }
        let cost = self
            .unlock_cost(tier)
            .filter(|_| tier <= max_tier)
            .ok_or_else(|| GameError::UnknownUnit(format!("tier {tier}")))?;
        if !side.has_tier(tier - 1) {
            return Err(GameError::TierLocked {
                side: side.side,
                tier: tier - 1,
            });
        }
        side.spend(cost)?;
        side.unlocked_tiers.insert(tier);
        tracing::info!(side = ?side.side, tier, cost, "Tier purchased");
        Ok(cost)
    }

    fn on_round_advanced(&self, round: u32, sides: &mut Sides, max_tier: u8, events: &mut Vec<SimEvent>) {
        let every = self.rules.auto_unlock_every_rounds;
        if every == 0 {
            return;
        }
        for tier in 2..=max_tier {
            let steps = u32::from(tier - 1);
            if round < steps * every {
                continue;
            }
            for side in Side::ALL {
                let state = sides.get_mut(side);
                if state.has_tier(tier) {
                    continue;
                }
                Self::grant(state, tier, events);
                let bonus = self.rules.unlock_bonus_gold * steps;
                if bonus > 0 {
                    state.earn(bonus);
                    events.push(SimEvent::GoldAwarded {
                        side,
                        amount: bonus,
                        source: GoldSource::TierUnlock,
                    });
                }
            }
        }
    }
}

// ============================================================================
// Level progression
// ============================================================================

/// Per-archetype upgrade-level progression.
#[derive(Debug, Clone, Copy)]
pub struct LevelProgression {
    rules: LevelRules,
}

impl LevelProgression {
    /// Create from rules.
    #[must_use]
    pub const fn new(rules: LevelRules) -> Self {
        Self { rules }
    }

    fn raise_all(side: &mut SideState, events: &mut Vec<SimEvent>) {
        for archetype in Archetype::ALL {
            let level = side.upgrade_levels.get_mut(archetype);
            *level += 1;
            events.push(SimEvent::ArchetypeUpgraded {
                side: side.side,
                archetype,
                level: *level,
            });
        }
    }
}

impl Progression for LevelProgression {
    fn name(&self) -> &'static str {
        "leveled"
    }

    fn resolve(&self, def: &UnitDefinition, side: &SideState, config: &GameConfig) -> ResolvedStats {
        let level = side.upgrade_levels.get(def.archetype());
        let multipliers = LevelMultipliers::at_level(&config.upgrades, level);
        let mut stats = resolve_base(def, config, side, multipliers);
        let milestones = level / 5;
        stats.level = level;
        stats.rank = 1 + milestones;
        match def.archetype() {
            Archetype::Caster => stats.max_targets = (2 + milestones).min(MAX_TARGETS_CAP),
            Archetype::Healer => {
                stats.max_targets = (def.max_targets + milestones).min(MAX_TARGETS_CAP);
            }
            Archetype::Ranged => stats.pierce_limit = 1 + milestones.min(2),
            Archetype::Melee => {}
        }
        stats
    }

    fn check_available(&self, def: &UnitDefinition, side: &SideState) -> Result<()> {
        if def.tier() == 1 {
            Ok(())
        } else {
            Err(GameError::TierLocked {
                side: side.side,
                tier: def.tier(),
            })
        }
    }

    fn unit_cost(&self, def: &UnitDefinition, side: &SideState) -> u32 {
        def.cost + side.upgrade_levels.get(def.archetype()) * self.rules.unit_cost_per_level
    }

    fn upgrade_cost(&self, side: &SideState, archetype: Archetype) -> Option<u32> {
        let level = side.upgrade_levels.get(archetype);
        Some(self.rules.upgrade_cost_base + level * self.rules.upgrade_cost_per_level)
    }

    fn upgrade(&self, side: &mut SideState, archetype: Archetype) -> Result<u32> {
        let cost = self.upgrade_cost(side, archetype).unwrap_or(0);
        side.spend(cost)?;
        let level = side.upgrade_levels.get_mut(archetype);
        *level += 1;
        Ok(*level)
    }

    fn on_round_advanced(&self, round: u32, sides: &mut Sides, _max_tier: u8, events: &mut Vec<SimEvent>) {
        let every = self.rules.auto_upgrade_every_rounds;
        if every == 0 || round == 0 || round % every != 0 {
            return;
        }
        tracing::info!(round, "Automatic upgrade for both sides");
        for side in Side::ALL {
            Self::raise_all(sides.get_mut(side), events);
        }
    }

    fn on_life_lost(&self, side: &mut SideState, rule: ComebackRule, events: &mut Vec<SimEvent>) {
        let ComebackRule::LevelMilestone { every } = rule else {
            return;
        };
        if every > 0 && side.lives_lost % every == 0 {
            tracing::info!(side = ?side.side, lives_lost = side.lives_lost, "Comeback milestone");
            Self::raise_all(side, events);
        }
    }
}
