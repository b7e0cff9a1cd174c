//! Computer-controlled purchasing.
//!
//! A computer side gets one decision every `ai.decision_interval_ms` of game
//! time during the build phase. A decision first rolls against the
//! strategy's chance (which grows with the round), then may buy a tier or an
//! upgrade, then picks a unit and a free spot for it. The result is a list
//! of [`Purchase`]s that the simulation applies through the same validated
//! paths a human uses.

use std::fmt;

use crate::components::{Archetype, ArchetypeMap, Placement, Side, UnitKey};
use crate::data::{Difficulty, GameConfig, StrategyKind, UnitCatalog};
use crate::economy::SideState;
use crate::math::{Fixed, Vec2Fixed};
use crate::progression::Progression;
use crate::rng::GameRng;
use crate::unit::Unit;
use crate::world::World;

/// One action a computer side wants to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purchase {
    /// Buy the next tier.
    UnlockTier(u8),
    /// Buy one level of an archetype.
    Upgrade(Archetype),
    /// Buy a unit and place it at a zone-local position.
    Place {
        /// Unit definition.
        key: UnitKey,
        /// Zone-local spot.
        position: Vec2Fixed,
    },
}

/// A unit the side can buy right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offer {
    /// Unit definition.
    pub key: UnitKey,
    /// Price for this side.
    pub cost: u32,
}

/// Everything a strategy looks at when picking a unit.
#[derive(Debug, Clone)]
pub struct Shop {
    /// Affordable, available units, highest tier first.
    pub offers: Vec<Offer>,
    /// Live templates per archetype.
    pub composition: ArchetypeMap<u32>,
    /// Highest tier the side may buy.
    pub highest_tier: u8,
    /// Current round.
    pub round: u32,
}

impl Shop {
    fn total(&self) -> u32 {
        self.composition.iter().map(|(_, n)| n).sum()
    }

    fn best_of(&self, archetype: Archetype) -> Option<UnitKey> {
        self.offers
            .iter()
            .find(|o| o.key.archetype == archetype)
            .map(|o| o.key)
    }
}

/// Purchasing personality of a computer side.
pub trait PurchaseStrategy: fmt::Debug + Send + Sync {
    /// Which strategy this is.
    fn kind(&self) -> StrategyKind;

    /// Per-decision chance before the round bonus, per mille.
    fn base_chance_per_mille(&self, difficulty: Difficulty) -> u32;

    /// Whether to spend `cost` of the side's `gold` on a tier or upgrade.
    fn wants_investment(&self, gold: u32, cost: u32, difficulty: Difficulty, rng: &mut GameRng)
        -> bool;

    /// Unit to buy, if any.
    fn choose(&self, shop: &Shop, rng: &mut GameRng) -> Option<UnitKey>;
}

/// Static strategy instance for a kind.
#[must_use]
pub fn strategy_for(kind: StrategyKind) -> &'static dyn PurchaseStrategy {
    match kind {
        StrategyKind::Balanced => &BalancedStrategy,
        StrategyKind::Aggressive => &AggressiveStrategy,
        StrategyKind::Random => &RandomStrategy,
        StrategyKind::Scripted => &ScriptedStrategy,
    }
}

/// `gold >= cost * percent / 100` without rounding.
fn affords_with_margin(gold: u32, cost: u32, percent: u32) -> bool {
    u64::from(gold) * 100 >= u64::from(cost) * u64::from(percent)
}

/// First `percent` of `offers` (at least one), by count rounded up.
fn top_share(offers: &[Offer], percent: usize) -> &[Offer] {
    let take = (offers.len() * percent).div_ceil(100).max(1);
    &offers[..take.min(offers.len())]
}

// ============================================================================
// Strategies
// ============================================================================

/// Keeps a target composition and buys the highest tier of whatever is
/// most lacking.
#[derive(Debug)]
pub struct BalancedStrategy;

impl BalancedStrategy {
    /// Target shares in percent.
    const TARGET: [(Archetype, u32); 4] = [
        (Archetype::Melee, 40),
        (Archetype::Ranged, 35),
        (Archetype::Caster, 15),
        (Archetype::Healer, 10),
    ];
}

impl PurchaseStrategy for BalancedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Balanced
    }

    fn base_chance_per_mille(&self, difficulty: Difficulty) -> u32 {
        match difficulty {
            Difficulty::Easy => 75,
            Difficulty::Normal => 150,
            Difficulty::Hard => 225,
        }
    }

    fn wants_investment(&self, gold: u32, cost: u32, difficulty: Difficulty, _rng: &mut GameRng) -> bool {
        let margin = if difficulty == Difficulty::Hard { 110 } else { 130 };
        affords_with_margin(gold, cost, margin)
    }

    fn choose(&self, shop: &Shop, _rng: &mut GameRng) -> Option<UnitKey> {
        let total = i64::from(shop.total().max(1));
        // deficit = target% - 100 * count / total, compared scaled by total
        let needed = Self::TARGET
            .iter()
            .map(|&(archetype, target)| {
                let have = i64::from(shop.composition.get(archetype));
                (archetype, i64::from(target) * total - 100 * have)
            })
            .fold(None, |best: Option<(Archetype, i64)>, (archetype, deficit)| match best {
                Some((_, top)) if top >= deficit => best,
                _ => Some((archetype, deficit)),
            })
            .map(|(archetype, _)| archetype)?;

        shop.best_of(needed)
            .or_else(|| shop.offers.first().map(|o| o.key))
    }
}

/// Goes for the strongest unit it can afford.
#[derive(Debug)]
pub struct AggressiveStrategy;

impl PurchaseStrategy for AggressiveStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Aggressive
    }

    fn base_chance_per_mille(&self, _difficulty: Difficulty) -> u32 {
        300
    }

    fn wants_investment(&self, gold: u32, cost: u32, _difficulty: Difficulty, _rng: &mut GameRng) -> bool {
        affords_with_margin(gold, cost, 110)
    }

    fn choose(&self, shop: &Shop, rng: &mut GameRng) -> Option<UnitKey> {
        let first = shop.offers.first()?;
        if rng.chance_per_mille(900) {
            return Some(first.key);
        }
        let top = top_share(&shop.offers, 30);
        Some(top[rng.index(top.len())].key)
    }
}

/// Mostly high-tier picks with the occasional wildcard.
#[derive(Debug)]
pub struct RandomStrategy;

impl PurchaseStrategy for RandomStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Random
    }

    fn base_chance_per_mille(&self, _difficulty: Difficulty) -> u32 {
        150
    }

    fn wants_investment(&self, gold: u32, cost: u32, _difficulty: Difficulty, rng: &mut GameRng) -> bool {
        gold >= cost && rng.chance_per_mille(700)
    }

    fn choose(&self, shop: &Shop, rng: &mut GameRng) -> Option<UnitKey> {
        if shop.offers.is_empty() {
            return None;
        }
        let pool = if rng.chance_per_mille(800) {
            top_share(&shop.offers, 20)
        } else {
            &shop.offers[..]
        };
        Some(pool[rng.index(pool.len())].key)
    }
}

/// Round-banded composition script at the highest unlocked tier.
#[derive(Debug)]
pub struct ScriptedStrategy;

impl ScriptedStrategy {
    /// Roll melee / ranged / caster with per-mille cut-offs.
    fn roll(rng: &mut GameRng, melee: u32, ranged: u32) -> Archetype {
        let roll = u32::try_from(rng.index(1000)).unwrap_or(0);
        if roll < melee {
            Archetype::Melee
        } else if roll < melee + ranged {
            Archetype::Ranged
        } else {
            Archetype::Caster
        }
    }

    fn desired(shop: &Shop, rng: &mut GameRng) -> Archetype {
        match shop.round {
            0..=3 if shop.total() == 0 => {
                if rng.chance_per_mille(500) {
                    Archetype::Melee
                } else {
                    Archetype::Ranged
                }
            }
            0..=3 => Self::roll(rng, 400, 400),
            4..=6 => Self::roll(rng, 450, 400),
            7..=10 => Self::roll(rng, 350, 450),
            _ => {
                let total = shop.total();
                let below = |archetype: Archetype, percent: u32| {
                    total == 0 || shop.composition.get(archetype) * 100 < total * percent
                };
                if below(Archetype::Melee, 25) {
                    Archetype::Melee
                } else if below(Archetype::Ranged, 45) {
                    Archetype::Ranged
                } else if below(Archetype::Caster, 15) {
                    Archetype::Caster
                } else {
                    Self::roll(rng, 300, 500)
                }
            }
        }
    }
}

impl PurchaseStrategy for ScriptedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Scripted
    }

    fn base_chance_per_mille(&self, _difficulty: Difficulty) -> u32 {
        225
    }

    fn wants_investment(&self, gold: u32, cost: u32, _difficulty: Difficulty, _rng: &mut GameRng) -> bool {
        affords_with_margin(gold, cost, 130)
    }

    fn choose(&self, shop: &Shop, rng: &mut GameRng) -> Option<UnitKey> {
        let archetype = Self::desired(shop, rng);
        shop.offers
            .iter()
            .find(|o| o.key.archetype == archetype && o.key.tier == shop.highest_tier)
            .map(|o| o.key)
    }
}

// ============================================================================
// Planning
// ============================================================================

/// Units `side` can afford with `budget`, highest tier first.
fn build_shop(
    catalog: &UnitCatalog,
    progression: &dyn Progression,
    state: &SideState,
    templates: &[&Unit],
    budget: u32,
    round: u32,
) -> Shop {
    let mut offers: Vec<Offer> = catalog
        .iter()
        .filter(|def| progression.check_available(def, state).is_ok())
        .map(|def| Offer {
            key: def.key,
            cost: progression.unit_cost(def, state),
        })
        .filter(|offer| offer.cost <= budget)
        .collect();
    offers.sort_by(|a, b| b.key.tier.cmp(&a.key.tier));

    let mut composition = ArchetypeMap::splat(0);
    for template in templates {
        *composition.get_mut(template.archetype()) += 1;
    }

    Shop {
        offers,
        composition,
        highest_tier: state.highest_tier(),
        round,
    }
}

/// Zone-local x band for an archetype: melee at the front, ranged in the
/// middle, casters and healers at the back.
fn depth_band(config: &GameConfig, side: Side, archetype: Archetype) -> (Fixed, Fixed) {
    let width = Fixed::from_num(config.battlefield.zone_width);
    let margin = Fixed::from_num(config.ai.placement_margin);
    let third = width / 3;
    let (back, middle, front) = (
        (margin, third),
        (third, third * 2),
        (third * 2, width - margin),
    );
    let band = match archetype {
        Archetype::Melee => front,
        Archetype::Ranged => middle,
        Archetype::Caster | Archetype::Healer => back,
    };
    match side {
        Side::Player => band,
        // The AI zone is mirrored: its front is the low-x edge.
        Side::Ai => (width - band.1, width - band.0),
    }
}

/// Random free spot in the archetype's band, or `None` after the configured
/// number of attempts.
pub fn find_spot(
    config: &GameConfig,
    side: Side,
    archetype: Archetype,
    templates: &[&Unit],
    rng: &mut GameRng,
) -> Option<Vec2Fixed> {
    let (x_min, x_max) = depth_band(config, side, archetype);
    let margin = Fixed::from_num(config.ai.placement_margin);
    let y_max = Fixed::from_num(config.battlefield.zone_height) - margin;
    let spacing = Fixed::from_num(config.min_unit_distance);

    (0..config.ai.placement_attempts).find_map(|_| {
        let spot = Vec2Fixed::new(rng.fixed_in(x_min, x_max), rng.fixed_in(margin, y_max));
        templates
            .iter()
            .all(|t| t.position.distance_squared(spot) >= spacing * spacing)
            .then_some(spot)
    })
}

/// Decide what the computer-controlled `side` buys this decision.
pub fn plan_purchases(
    strategy: &dyn PurchaseStrategy,
    side: Side,
    world: &mut World,
    config: &GameConfig,
    catalog: &UnitCatalog,
    progression: &dyn Progression,
    round: u32,
) -> Vec<Purchase> {
    let chance = (strategy.base_chance_per_mille(config.difficulty)
        + round * config.ai.chance_per_round_per_mille)
        .min(config.ai.max_chance_per_mille);
    if !world.rng.chance_per_mille(chance) {
        return Vec::new();
    }

    let mut plan = Vec::new();
    let state = world.sides.get(side);
    let mut budget = state.gold;

    let next_tier = state.highest_tier() + 1;
    if next_tier <= catalog.max_tier() {
        if let Some(cost) = progression.unlock_cost(next_tier) {
            if strategy.wants_investment(budget, cost, config.difficulty, &mut world.rng) {
                plan.push(Purchase::UnlockTier(next_tier));
                budget -= cost;
            }
        }
    }

    if round > 0 {
        let weakest = Archetype::ALL
            .into_iter()
            .min_by_key(|&a| state.upgrade_levels.get(a));
        let priced = weakest.and_then(|a| progression.upgrade_cost(state, a).map(|c| (a, c)));
        if let Some((archetype, cost)) = priced {
            if strategy.wants_investment(budget, cost, config.difficulty, &mut world.rng) {
                plan.push(Purchase::Upgrade(archetype));
                budget -= cost;
            }
        }
    }

    let templates: Vec<&Unit> = world
        .units
        .iter()
        .filter(|u| u.side == side && u.is_alive() && u.placement == Placement::BuildZone)
        .collect();
    if templates.len() >= config.max_units_per_zone {
        return plan;
    }
    let shop = build_shop(catalog, progression, state, &templates, budget, round);
    let Some(key) = strategy.choose(&shop, &mut world.rng) else {
        return plan;
    };
    if let Some(position) = find_spot(config, side, key.archetype, &templates, &mut world.rng) {
        plan.push(Purchase::Place { key, position });
    }
    plan
}
