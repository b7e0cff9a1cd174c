//! Per-archetype decision making.
//!
//! Every battle unit asks its behavior for a [`Decision`] once per tick. The
//! behavior only reads the [`BattleContext`]; the battle orchestrator applies
//! the returned action through the movement and combat systems.
//!
//! All hostile behaviors share one skeleton:
//! 1. no candidates: advance down the lane
//! 2. drop the cached target if it died, left the candidate list or is
//!    invulnerable
//! 3. otherwise acquire the closest valid candidate
//! 4. in range: act; out of range: close the distance

use std::fmt;

use crate::components::{Archetype, UnitId};
use crate::context::BattleContext;
use crate::systems::combat::find_closest;
use crate::unit::Unit;

/// How a hostile unit delivers damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strike {
    /// Direct hit on the target.
    Melee,
    /// Fire a piercing projectile at the target.
    Projectile,
    /// Area damage centered on the target.
    Blast,
}

/// What a unit wants to do this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Lane movement toward the enemy base.
    Advance,
    /// 2D movement toward a unit.
    Pursue(UnitId),
    /// Attack a unit in range.
    Strike(Strike, UnitId),
    /// Heal around an ally in range.
    Heal(UnitId),
}

/// A behavior's output for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Target to cache on the unit.
    pub target: Option<UnitId>,
    /// Action to apply.
    pub action: Action,
}

impl Decision {
    /// Advance with no target.
    #[must_use]
    pub const fn advance() -> Self {
        Self {
            target: None,
            action: Action::Advance,
        }
    }
}

/// Decision strategy for one archetype.
pub trait Behavior: fmt::Debug + Sync {
    /// Decide what `unit` does this tick.
    fn decide(&self, unit: &Unit, ctx: &BattleContext<'_>) -> Decision;
}

/// Static behavior instance for an archetype.
#[must_use]
pub fn behavior_for(archetype: Archetype) -> &'static dyn Behavior {
    match archetype {
        Archetype::Melee => &MeleeBehavior,
        Archetype::Ranged => &RangedBehavior,
        Archetype::Caster => &CasterBehavior,
        Archetype::Healer => &HealerBehavior,
    }
}

fn in_range(unit: &Unit, other: &Unit) -> bool {
    let range = unit.stats.attack_range;
    unit.position.distance_squared(other.position) <= range * range
}

/// Shared skeleton for damage dealers.
fn hostile_decision(unit: &Unit, ctx: &BattleContext<'_>, strike: Strike) -> Decision {
    let now = ctx.now();
    let mut enemies = ctx.enemies_of(unit.side).peekable();
    if enemies.peek().is_none() {
        return Decision::advance();
    }

    let targetable: Vec<&Unit> = enemies.filter(|e| !e.is_invulnerable(now)).collect();
    let cached = unit
        .target
        .and_then(|id| targetable.iter().copied().find(|e| e.id == id));
    let Some(target) = cached.or_else(|| find_closest(unit.position, targetable.iter().copied()))
    else {
        return Decision::advance();
    };

    let action = if in_range(unit, target) {
        Action::Strike(strike, target.id)
    } else {
        Action::Pursue(target.id)
    };
    Decision {
        target: Some(target.id),
        action,
    }
}

/// Closes to melee range and hits one enemy.
#[derive(Debug)]
pub struct MeleeBehavior;

impl Behavior for MeleeBehavior {
    fn decide(&self, unit: &Unit, ctx: &BattleContext<'_>) -> Decision {
        hostile_decision(unit, ctx, Strike::Melee)
    }
}

/// Fires projectiles at the closest enemy once in range.
#[derive(Debug)]
pub struct RangedBehavior;

impl Behavior for RangedBehavior {
    fn decide(&self, unit: &Unit, ctx: &BattleContext<'_>) -> Decision {
        hostile_decision(unit, ctx, Strike::Projectile)
    }
}

/// Blasts an area around the closest enemy once in range.
#[derive(Debug)]
pub struct CasterBehavior;

impl Behavior for CasterBehavior {
    fn decide(&self, unit: &Unit, ctx: &BattleContext<'_>) -> Decision {
        hostile_decision(unit, ctx, Strike::Blast)
    }
}

/// Follows the nearest wounded ally and heals when in range.
#[derive(Debug)]
pub struct HealerBehavior;

impl Behavior for HealerBehavior {
    fn decide(&self, unit: &Unit, ctx: &BattleContext<'_>) -> Decision {
        let wounded: Vec<&Unit> = ctx
            .allies_of(unit.side)
            .filter(|a| a.id != unit.id && a.is_wounded())
            .collect();

        let cached = unit
            .target
            .and_then(|id| wounded.iter().copied().find(|a| a.id == id));
        let Some(target) = cached.or_else(|| find_closest(unit.position, wounded.iter().copied()))
        else {
            return Decision::advance();
        };

        let action = if in_range(unit, target) {
            Action::Heal(target.id)
        } else {
            Action::Pursue(target.id)
        };
        Decision {
            target: Some(target.id),
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Side;
    use crate::data::Battlefield;
    use crate::test_support::unit_at;

    fn decide(units: &[Unit], index: usize, now: u64) -> Decision {
        let field = Battlefield::default();
        let ctx = BattleContext::new(units, &field, now);
        units[index].behavior().decide(&units[index], &ctx)
    }

    #[test]
    fn test_no_enemies_advances() {
        let units = vec![unit_at(1, Side::Player, Archetype::Melee, 100, 100)];
        assert_eq!(decide(&units, 0, 0), Decision::advance());
    }

    #[test]
    fn test_melee_pursues_then_strikes() {
        let mut units = vec![
            unit_at(1, Side::Player, Archetype::Melee, 100, 100),
            unit_at(2, Side::Ai, Archetype::Melee, 300, 100),
        ];
        let decision = decide(&units, 0, 0);
        assert_eq!(decision.action, Action::Pursue(UnitId(2)));
        assert_eq!(decision.target, Some(UnitId(2)));

        units[1].position = units[0].position;
        assert_eq!(decide(&units, 0, 0).action, Action::Strike(Strike::Melee, UnitId(2)));
    }

    #[test]
    fn test_ranged_picks_closest_in_range() {
        let units = vec![
            unit_at(1, Side::Player, Archetype::Ranged, 100, 100),
            unit_at(2, Side::Ai, Archetype::Melee, 400, 100),
            unit_at(3, Side::Ai, Archetype::Melee, 200, 100),
        ];
        let decision = decide(&units, 0, 0);
        // 100 px away, range 120
        assert_eq!(decision.action, Action::Strike(Strike::Projectile, UnitId(3)));
    }

    #[test]
    fn test_dead_cached_target_is_replaced() {
        let mut units = vec![
            unit_at(1, Side::Player, Archetype::Caster, 100, 100),
            unit_at(2, Side::Ai, Archetype::Melee, 150, 100),
            unit_at(3, Side::Ai, Archetype::Melee, 200, 100),
        ];
        units[0].target = Some(UnitId(2));
        units[1].remove();
        let decision = decide(&units, 0, 0);
        assert_eq!(decision.target, Some(UnitId(3)));
    }

    #[test]
    fn test_invulnerable_enemies_are_not_targeted() {
        let mut units = vec![
            unit_at(1, Side::Player, Archetype::Melee, 100, 100),
            Unit::battle(
                UnitId(2),
                crate::components::UnitKey::new(Archetype::Melee, 1),
                Side::Ai,
                crate::test_support::melee_stats(),
                crate::math::Vec2Fixed::from_ints(110, 100),
                1000,
                500,
            ),
        ];
        units[0].target = Some(UnitId(2));
        let decision = decide(&units, 0, 1200);
        assert_eq!(decision, Decision::advance());

        let decision = decide(&units, 0, 1500);
        assert_eq!(decision.target, Some(UnitId(2)));
    }

    #[test]
    fn test_healer_targets_wounded_ally() {
        let mut units = vec![
            unit_at(1, Side::Player, Archetype::Healer, 100, 100),
            unit_at(2, Side::Player, Archetype::Melee, 300, 100),
            unit_at(3, Side::Player, Archetype::Melee, 150, 100),
        ];
        assert_eq!(decide(&units, 0, 0), Decision::advance());

        units[1].hp -= 10;
        assert_eq!(decide(&units, 0, 0).action, Action::Pursue(UnitId(2)));

        units[2].hp -= 10;
        assert_eq!(decide(&units, 0, 0).action, Action::Heal(UnitId(3)));
    }
}
