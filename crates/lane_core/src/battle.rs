//! Battle-phase orchestration.
//!
//! # Per-tick order
//!
//! 1. every active battle unit, in id order: decide, act, breach check,
//!    stuck check
//! 2. projectiles fly and resolve hits
//! 3. dead units and spent projectiles are removed in one pass

use crate::behavior::{Action, Strike};
use crate::context::BattleContext;
use crate::data::GameConfig;
use crate::events::SimEvent;
use crate::progression::Progression;
use crate::systems::combat::{caster_strike, heal_allies, melee_strike, ranged_strike};
use crate::systems::movement::{advance, is_blocked, pursue, MoveRules};
use crate::systems::projectiles::update_projectiles;
use crate::world::World;

/// Run one battle tick of `dt_ms` game milliseconds.
pub fn run_battle_tick(
    world: &mut World,
    config: &GameConfig,
    progression: &dyn Progression,
    dt_ms: u64,
) {
    let rules = MoveRules::from_config(config);
    let field = &config.battlefield;
    let now = world.game_time;

    for index in 0..world.units.len() {
        if !world.units[index].is_active() {
            continue;
        }

        let decision = {
            let ctx = BattleContext::new(&world.units, field, now);
            let unit = &world.units[index];
            unit.behavior().decide(unit, &ctx)
        };
        world.units[index].target = decision.target;
        apply_action(world, config, index, decision.action, dt_ms, rules);

        if check_breach(world, config, progression, index) {
            continue;
        }

        if world.units[index].check_if_stuck(now, &config.stuck) {
            unstick(world, config, index, rules);
        }
    }

    update_projectiles(world, config, dt_ms);
    world.remove_dead();
}

/// Nudge a stuck unit unless the nudge lands within the collision radius
/// of an ally. A blocked unit keeps its stuck count and retries at the
/// next sample. Returns whether the unit moved.
fn unstick(world: &mut World, config: &GameConfig, index: usize, rules: MoveRules) -> bool {
    let candidate =
        world.units[index].unstuck_position(&mut world.rng, &config.stuck, &config.battlefield);
    let id = world.units[index].id;
    if is_blocked(&world.units, index, candidate, rules.collision_radius) {
        tracing::debug!(unit = %id, "Unstuck nudge blocked by allies");
        return false;
    }
    world.units[index].apply_unstuck(candidate);
    tracing::debug!(unit = %id, "Unstuck nudge");
    world.events.push(SimEvent::UnitUnstuck { unit: id });
    true
}

fn apply_action(
    world: &mut World,
    config: &GameConfig,
    index: usize,
    action: Action,
    dt_ms: u64,
    rules: MoveRules,
) {
    let field = &config.battlefield;
    match action {
        Action::Advance => {
            advance(&mut world.units, index, dt_ms, rules, field);
        }
        Action::Pursue(target) => {
            if let Some(position) = world.unit(target).map(|t| t.position) {
                pursue(&mut world.units, index, position, dt_ms, rules, field);
            }
        }
        Action::Strike(Strike::Melee, target) => {
            melee_strike(world, config, index, target);
        }
        Action::Strike(Strike::Projectile, target) => {
            ranged_strike(world, config, index, target);
        }
        Action::Strike(Strike::Blast, target) => {
            caster_strike(world, config, index, target);
        }
        Action::Heal(_) => {
            heal_allies(world, index);
        }
    }
}

/// Remove a unit that reached the enemy base and charge the defender.
/// Returns whether the unit breached.
fn check_breach(
    world: &mut World,
    config: &GameConfig,
    progression: &dyn Progression,
    index: usize,
) -> bool {
    let unit = &mut world.units[index];
    if !unit.is_active() || !config.battlefield.breaches(unit.side, unit.position) {
        return false;
    }
    unit.remove();
    let (id, attacker) = (unit.id, unit.side);

    let defender = world.sides.get_mut(attacker.opponent());
    let remaining_health = defender.lose_life(config.base_damage_to_core);
    progression.on_life_lost(defender, config.mode.comeback, &mut world.events);
    tracing::info!(unit = %id, ?attacker, remaining_health, "Base breached");
    world.events.push(SimEvent::BaseBreached {
        unit: id,
        attacker,
        remaining_health,
    });
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Archetype, Side, UnitId};
    use crate::data::GameMode;
    use crate::math::Vec2Fixed;
    use crate::progression::progression_for;
    use crate::test_support::unit_at;
    use crate::unit::Unit;

    fn setup(config: &GameConfig, units: Vec<Unit>) -> World {
        let mut world = World::new(config);
        for unit in units {
            world.spawn(unit);
        }
        world
    }

    fn tick(world: &mut World, config: &GameConfig, progression: &dyn Progression) {
        run_battle_tick(world, config, progression, 100);
        world.game_time += 100;
    }

    #[test]
    fn test_unstick_moves_a_free_unit() {
        let config = GameConfig::default();
        let mut world = setup(&config, vec![unit_at(1, Side::Player, Archetype::Melee, 100, 100)]);
        let rules = MoveRules::from_config(&config);

        assert!(unstick(&mut world, &config, 0, rules));
        let moved = world.units[0].position.distance(Vec2Fixed::from_ints(100, 100));
        assert!((moved - crate::math::Fixed::from_num(30)).abs() < crate::math::Fixed::ONE / 100);
        assert_eq!(world.events, vec![SimEvent::UnitUnstuck { unit: UnitId(1) }]);
    }

    #[test]
    fn test_unstick_never_lands_on_an_ally() {
        let config = GameConfig::default();
        let rules = MoveRules::from_config(&config);
        // Allies on a 10 px grid filling the ring 20..=40 px around the
        // stuck unit, so every 30 px nudge ends within 8 px of one.
        let mut units = vec![unit_at(1, Side::Player, Archetype::Melee, 100, 100)];
        let mut id = 2;
        for dx in (-40..=40).step_by(10) {
            for dy in (-40..=40).step_by(10) {
                let d_sq = dx * dx + dy * dy;
                if (400..=1600).contains(&d_sq) {
                    units.push(unit_at(id, Side::Player, Archetype::Melee, 100 + dx, 100 + dy));
                    id += 1;
                }
            }
        }

        for seed in 0..20 {
            let mut world = setup(&config, units.clone());
            world.rng = crate::rng::GameRng::from_seed(seed);
            assert!(!unstick(&mut world, &config, 0, rules));
            assert_eq!(world.units[0].position, Vec2Fixed::from_ints(100, 100));
            assert!(world.events.is_empty());
        }
    }

    #[test]
    fn test_breach_scenario() {
        let config = GameConfig::default();
        let progression = progression_for(&config.mode.progression);
        let mut world = setup(&config, vec![unit_at(1, Side::Player, Archetype::Melee, 785, 100)]);

        tick(&mut world, &config, progression.as_ref());

        assert!(world.units.is_empty());
        assert_eq!(world.sides.ai.health, 99);
        assert_eq!(world.sides.ai.lives_lost, 1);
        assert_eq!(world.sides.player.gold, 50);
        assert!(world
            .events
            .iter()
            .any(|e| matches!(e, SimEvent::BaseBreached { attacker: Side::Player, .. })));
        assert!(!world.events.iter().any(|e| matches!(e, SimEvent::UnitKilled { .. })));
    }

    #[test]
    fn test_breach_triggers_level_milestone() {
        let mut config = GameConfig::default().with_mode(GameMode::leveled());
        config.mode.comeback = crate::data::ComebackRule::LevelMilestone { every: 1 };
        let progression = progression_for(&config.mode.progression);
        let mut world = setup(&config, vec![unit_at(1, Side::Ai, Archetype::Melee, 15, 100)]);

        tick(&mut world, &config, progression.as_ref());

        assert_eq!(world.sides.player.lives_lost, 1);
        assert_eq!(world.sides.player.upgrade_levels.get(Archetype::Ranged), 1);
        assert_eq!(world.sides.ai.upgrade_levels.get(Archetype::Ranged), 0);
    }

    #[test]
    fn test_melee_duel_to_the_death() {
        let config = GameConfig::default();
        let progression = progression_for(&config.mode.progression);
        let mut world = setup(
            &config,
            vec![
                unit_at(1, Side::Player, Archetype::Melee, 300, 100),
                unit_at(2, Side::Ai, Archetype::Melee, 400, 100),
            ],
        );
        world.units[1].hp = 20;

        for _ in 0..50 {
            tick(&mut world, &config, progression.as_ref());
        }

        assert_eq!(world.units.len(), 1);
        assert_eq!(world.units[0].id, UnitId(1));
        let kills: Vec<_> = world
            .events
            .iter()
            .filter(|e| matches!(e, SimEvent::UnitKilled { .. }))
            .collect();
        assert_eq!(kills.len(), 1);
    }

    #[test]
    fn test_targets_follow_kills() {
        let config = GameConfig::default();
        let progression = progression_for(&config.mode.progression);
        let mut world = setup(
            &config,
            vec![
                unit_at(1, Side::Player, Archetype::Melee, 300, 100),
                unit_at(2, Side::Ai, Archetype::Melee, 310, 100),
                unit_at(3, Side::Ai, Archetype::Melee, 360, 100),
            ],
        );
        world.units[1].hp = 1;

        tick(&mut world, &config, progression.as_ref());
        assert!(world.unit(UnitId(2)).is_none());

        tick(&mut world, &config, progression.as_ref());
        assert_eq!(world.unit(UnitId(1)).and_then(|u| u.target), Some(UnitId(3)));
    }

    #[test]
    fn test_templates_are_ignored() {
        let config = GameConfig::default();
        let progression = progression_for(&config.mode.progression);
        let stats = crate::test_support::melee_stats();
        let template = Unit::template(
            UnitId(1),
            crate::components::UnitKey::new(Archetype::Melee, 1),
            Side::Player,
            stats,
            Vec2Fixed::from_ints(100, 100),
            0,
            40_000,
        );
        let mut world = setup(&config, vec![template, unit_at(2, Side::Ai, Archetype::Melee, 100, 100)]);

        tick(&mut world, &config, progression.as_ref());
        assert_eq!(world.units[0].position, Vec2Fixed::from_ints(100, 100));
        assert_eq!(world.units[0].hp, 100);
    }
}
