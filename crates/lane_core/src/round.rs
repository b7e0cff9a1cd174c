//! Round transitions: deployment, settlement and between-round income.

use crate::components::{Placement, Side};
use crate::data::{GameConfig, UnitCatalog};
use crate::economy::round_bonus;
use crate::events::{GoldSource, SimEvent};
use crate::progression::Progression;
use crate::unit::Unit;
use crate::world::World;

/// Survivors counted when a battle ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Settlement {
    /// Player units still standing.
    pub player_survivors: u32,
    /// AI units still standing.
    pub ai_survivors: u32,
}

/// Spawn a battle unit for every live template. Returns the number spawned.
///
/// Templates stay in their build zones for the next round. Battle units are
/// resolved again from the catalog so stats reflect the side's current
/// progression.
pub fn deploy(
    world: &mut World,
    config: &GameConfig,
    catalog: &UnitCatalog,
    progression: &dyn Progression,
) -> usize {
    let field = &config.battlefield;
    let now = world.game_time;
    let templates: Vec<_> = world
        .units
        .iter()
        .filter(|u| u.is_alive() && u.placement == Placement::BuildZone)
        .map(|u| (u.key, u.side, u.position, u.stats))
        .collect();

    for &(key, side, local, template_stats) in &templates {
        let stats = catalog.get(key).map_or(template_stats, |def| {
            progression.resolve(def, world.sides.get(side), config)
        });
        let id = world.next_unit_id();
        let position = field.deploy_position(side, local);
        world.spawn(Unit::battle(id, key, side, stats, position, now, config.invulnerability_ms));
    }
    templates.len()
}

/// Whether the battle has nothing left to resolve.
#[must_use]
pub fn battle_is_over(world: &World) -> bool {
    world.projectiles.is_empty() && !world.units.iter().any(Unit::is_active)
}

/// End the battle: survivors damage the opposing core, then the
/// battlefield is cleared.
pub fn settle(world: &mut World, config: &GameConfig, progression: &dyn Progression) -> Settlement {
    let mut settlement = Settlement::default();
    let survivors: Vec<Side> = world
        .units
        .iter()
        .filter(|u| u.is_active())
        .map(|u| u.side)
        .collect();

    for side in survivors {
        match side {
            Side::Player => settlement.player_survivors += 1,
            Side::Ai => settlement.ai_survivors += 1,
        }
        let defender = world.sides.get_mut(side.opponent());
        defender.lose_life(config.base_damage_to_core);
        progression.on_life_lost(defender, config.mode.comeback, &mut world.events);
    }

    world.clear_battlefield();
    settlement
}

/// Pay the round bonus, run automatic progression and step the AI income
/// ramp after the round counter moved to `round`.
pub fn advance_round(
    world: &mut World,
    config: &GameConfig,
    progression: &dyn Progression,
    round: u32,
    max_tier: u8,
) {
    let bonus = round_bonus(config, round);
    for side in Side::ALL {
        let amount = world.sides.get_mut(side).earn_scaled(bonus);
        world.events.push(SimEvent::GoldAwarded {
            side,
            amount,
            source: GoldSource::Round,
        });
    }

    progression.on_round_advanced(round, &mut world.sides, max_tier, &mut world.events);

    if let Some(ramp) = config.ai.income_ramp {
        if ramp.every_rounds > 0 && round % ramp.every_rounds == 0 {
            let ai = &mut world.sides.ai;
            ai.income_percent += ramp.percent;
            tracing::debug!(round, income_percent = ai.income_percent, "AI income ramp");
        }
    }
}

/// Remove build-zone templates whose lifetime ran out.
pub fn expire_templates(world: &mut World) {
    let wall_now = world.wall_clock;
    for unit in &mut world.units {
        if unit.is_alive() && unit.is_expired(wall_now) {
            unit.remove();
            world.events.push(SimEvent::UnitExpired {
                unit: unit.id,
                side: unit.side,
            });
        }
    }
}
