//! Projectile flight and swept hit detection.

use crate::data::GameConfig;
use crate::events::SimEvent;
use crate::math::{segment_distance_squared, step_distance, Fixed};
use crate::systems::combat::deal_damage;
use crate::world::World;

/// Advance every projectile by `dt_ms` and resolve its hits.
///
/// The whole flight segment of this tick is tested, so a fast projectile
/// cannot skip over a unit between frames. Units along the segment are hit
/// in the order the projectile reaches them, until the pierce limit is used
/// up. Spent projectiles are dropped from the world.
pub fn update_projectiles(world: &mut World, config: &GameConfig, dt_ms: u64) {
    let mut projectiles = std::mem::take(&mut world.projectiles);
    let now = world.game_time;
    let radius = Fixed::from_num(config.projectile.hit_radius);
    let radius_sq = radius * radius;

    for projectile in &mut projectiles {
        if !projectile.is_active() {
            continue;
        }
        let direction = projectile.heading();
        let start = projectile.position;
        let end = start + direction.scale(step_distance(projectile.speed, dt_ms));
        projectile.position = end;
        projectile.age_ms += dt_ms;

        let mut struck: Vec<(usize, Fixed)> = world
            .units
            .iter()
            .enumerate()
            .filter(|(_, u)| {
                u.side != projectile.owner
                    && u.is_active()
                    && !u.is_invulnerable(now)
                    && !projectile.hit.contains(&u.id)
            })
            .filter(|(_, u)| segment_distance_squared(start, end, u.position) < radius_sq)
            .map(|(i, u)| (i, start.distance_squared(u.position)))
            .collect();
        struck.sort_by_key(|(_, d)| *d);

        for (index, _) in struck {
            if !projectile.is_active() {
                break;
            }
            let target = world.units[index].id;
            if !projectile.register_hit(target) {
                continue;
            }
            world.events.push(SimEvent::ProjectileHit {
                projectile: projectile.id,
                target,
                damage: projectile.damage,
            });
            deal_damage(world, config, projectile.source, index, projectile.damage);
        }

        projectile.check_limits(&config.projectile);
        if let Some(reason) = projectile.expired {
            tracing::trace!(projectile = projectile.id.0, ?reason, "Projectile expired");
            world.events.push(SimEvent::ProjectileExpired {
                projectile: projectile.id,
                reason,
            });
        }
    }

    projectiles.retain(|p| p.is_active());
    world.projectiles = projectiles;
}
