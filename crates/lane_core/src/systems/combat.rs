//! Damage, healing and kill rewards.
//!
//! Every activation checks the attacker's cooldown first and records the
//! attack exactly once. All hp changes to battle units go through
//! [`deal_damage`], which is the only place kill gold is paid, so a unit
//! caught by several overlapping hits still pays out once.

use std::cmp::Ordering;

use crate::components::{Side, UnitId};
use crate::data::GameConfig;
use crate::economy::kill_bounty;
use crate::events::{GoldSource, SimEvent};
use crate::math::{Fixed, Vec2Fixed};
use crate::projectile::Projectile;
use crate::unit::{DamageOutcome, Unit};
use crate::world::World;

/// Closest unit to `from`. Ties keep the first candidate seen.
pub fn find_closest<'a>(
    from: Vec2Fixed,
    candidates: impl IntoIterator<Item = &'a Unit>,
) -> Option<&'a Unit> {
    let mut best: Option<(&Unit, Fixed)> = None;
    for candidate in candidates {
        let distance = from.distance_squared(candidate.position);
        if best.map_or(true, |(_, closest)| distance < closest) {
            best = Some((candidate, distance));
        }
    }
    best.map(|(unit, _)| unit)
}

/// Apply damage to `world.units[victim]` on behalf of `attacker`.
///
/// Inactive and invulnerable victims are ignored. On the kill transition the
/// victim's opponent is paid the bounty for the victim's rank, scaled by that
/// side's income multiplier.
pub fn deal_damage(
    world: &mut World,
    config: &GameConfig,
    attacker: UnitId,
    victim: usize,
    amount: u32,
) -> DamageOutcome {
    let now = world.game_time;
    let unit = &mut world.units[victim];
    if !unit.is_active() || unit.is_invulnerable(now) {
        return DamageOutcome::default();
    }

    let outcome = unit.take_damage(amount);
    let (victim_id, victim_side, remaining_hp, rank) = (unit.id, unit.side, unit.hp, unit.stats.rank);
    if outcome.dealt > 0 {
        world.events.push(SimEvent::UnitDamaged {
            attacker,
            target: victim_id,
            amount: outcome.dealt,
            remaining_hp,
        });
    }

    if outcome.killed {
        let killer_side = victim_side.opponent();
        let bounty = world
            .sides
            .get_mut(killer_side)
            .earn_scaled(kill_bounty(config, rank));
        tracing::debug!(
            killer = %attacker,
            victim = %victim_id,
            bounty,
            "Unit killed"
        );
        world.events.push(SimEvent::UnitKilled {
            killer: attacker,
            victim: victim_id,
            victim_side,
        });
        world.events.push(SimEvent::GoldAwarded {
            side: killer_side,
            amount: bounty,
            source: GoldSource::Kill,
        });
    }
    outcome
}

/// Indices of active, hittable enemies of `side` within `radius` of
/// `center`, nearest first. Equal distances keep registry order.
fn enemies_within(world: &World, side: Side, center: Vec2Fixed, radius: Fixed) -> Vec<usize> {
    let now = world.game_time;
    let radius_sq = radius * radius;
    let mut found: Vec<(usize, Fixed)> = world
        .units
        .iter()
        .enumerate()
        .filter(|(_, u)| u.side != side && u.is_active() && !u.is_invulnerable(now))
        .map(|(i, u)| (i, center.distance_squared(u.position)))
        .filter(|(_, d)| *d <= radius_sq)
        .collect();
    found.sort_by_key(|(_, d)| *d);
    found.into_iter().map(|(i, _)| i).collect()
}

/// Resolve a target id to a hittable registry index.
fn hittable(world: &World, target: UnitId) -> Option<usize> {
    let index = world.index_of(target)?;
    let unit = &world.units[index];
    (unit.is_active() && !unit.is_invulnerable(world.game_time)).then_some(index)
}

/// Melee hit on `target`, splashing when the attacker has an AOE radius.
/// Returns whether the attack fired.
pub fn melee_strike(world: &mut World, config: &GameConfig, attacker: usize, target: UnitId) -> bool {
    let now = world.game_time;
    if !world.units[attacker].can_attack(now) {
        return false;
    }
    let Some(target_index) = hittable(world, target) else {
        return false;
    };

    let unit = &world.units[attacker];
    let (id, side, damage, aoe) = (unit.id, unit.side, unit.stats.damage, unit.stats.aoe_radius);
    let victims = if aoe > Fixed::ZERO {
        enemies_within(world, side, world.units[target_index].position, aoe)
    } else {
        vec![target_index]
    };

    world.units[attacker].attack(now);
    for victim in victims {
        deal_damage(world, config, id, victim, damage);
    }
    true
}

/// Fire a projectile at `target`'s current position.
pub fn ranged_strike(world: &mut World, config: &GameConfig, attacker: usize, target: UnitId) -> bool {
    let now = world.game_time;
    if !world.units[attacker].can_attack(now) {
        return false;
    }
    let Some(target_index) = hittable(world, target) else {
        return false;
    };

    let aim = world.units[target_index].position;
    let id = world.next_projectile_id();
    let unit = &mut world.units[attacker];
    unit.attack(now);
    let projectile = Projectile::new(
        id,
        unit.side,
        unit.id,
        unit.position,
        aim,
        unit.stats.damage,
        unit.stats.pierce_limit,
        &config.projectile,
    );
    world.events.push(SimEvent::ProjectileFired {
        projectile: id,
        source: projectile.source,
        owner: projectile.owner,
    });
    world.projectiles.push(projectile);
    true
}

/// Area damage around `target`: up to `max_targets` enemies within the
/// attacker's AOE radius, nearest first.
pub fn caster_strike(world: &mut World, config: &GameConfig, attacker: usize, target: UnitId) -> bool {
    let now = world.game_time;
    if !world.units[attacker].can_attack(now) {
        return false;
    }
    let Some(target_index) = hittable(world, target) else {
        return false;
    };

    let unit = &world.units[attacker];
    let (id, side, damage) = (unit.id, unit.side, unit.stats.damage);
    let max_targets = unit.stats.max_targets as usize;
    let center = world.units[target_index].position;
    let victims = enemies_within(world, side, center, unit.stats.aoe_radius);

    world.units[attacker].attack(now);
    for victim in victims.into_iter().take(max_targets) {
        deal_damage(world, config, id, victim, damage);
    }
    true
}

/// Lower hp fraction first, compared without division.
fn by_hp_fraction(a: &Unit, b: &Unit) -> Ordering {
    let left = u64::from(a.hp) * u64::from(b.stats.max_hp);
    let right = u64::from(b.hp) * u64::from(a.stats.max_hp);
    left.cmp(&right)
}

/// Heal up to `max_targets` wounded allies within range of the healer,
/// most injured first. Does nothing (and keeps the cooldown) when nobody
/// in range needs healing.
pub fn heal_allies(world: &mut World, healer: usize) -> bool {
    let now = world.game_time;
    let unit = &world.units[healer];
    if !unit.can_attack(now) {
        return false;
    }
    let (id, side, pos) = (unit.id, unit.side, unit.position);
    let (range, amount) = (unit.stats.attack_range, unit.stats.heal_amount);
    let max_targets = unit.stats.max_targets as usize;

    let mut patients: Vec<(usize, Fixed)> = world
        .units
        .iter()
        .enumerate()
        .filter(|(_, u)| u.id != id && u.side == side && u.is_active() && u.is_wounded())
        .map(|(i, u)| (i, pos.distance_squared(u.position)))
        .filter(|(_, d)| *d <= range * range)
        .collect();
    if patients.is_empty() {
        return false;
    }
    patients.sort_by(|(a, da), (b, db)| {
        by_hp_fraction(&world.units[*a], &world.units[*b]).then(da.cmp(db))
    });
    patients.truncate(max_targets);

    world.units[healer].attack(now);
    for (index, _) in patients {
        let target = &mut world.units[index];
        let healed = target.heal(amount);
        if healed > 0 {
            world.events.push(SimEvent::UnitHealed {
                healer: id,
                target: target.id,
                amount: healed,
            });
        }
    }
    true
}
