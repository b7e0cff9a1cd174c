//! Lane and pursuit movement with same-side collision avoidance.
//!
//! Movement never pushes units apart; it only refuses steps that would end
//! too close to an ally. Each mode tries a fixed list of candidate
//! positions and takes the first one that is free:
//!
//! | Mode    | Candidates                                   |
//! |---------|----------------------------------------------|
//! | lane    | full step, reduced step                      |
//! | pursuit | full step, reduced step, X-only, Y-only      |
//!
//! Enemies never block. y is clamped to the lane band, x is left alone so a
//! unit can walk into the enemy base.

use crate::data::{Battlefield, GameConfig};
use crate::math::{percent, Fixed, Vec2Fixed};
use crate::unit::Unit;

/// Collision parameters pulled from the config once per tick.
#[derive(Debug, Clone, Copy)]
pub struct MoveRules {
    /// Allies closer than this block a candidate position.
    pub collision_radius: Fixed,
    /// Fraction of the full step tried when the full step is blocked.
    pub reduced_step: Fixed,
}

impl MoveRules {
    /// Rules from the match config.
    #[must_use]
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            collision_radius: Fixed::from_num(config.collision_radius),
            reduced_step: percent(config.reduced_step_percent),
        }
    }
}

/// Whether moving `units[mover]` to `candidate` would put it within the
/// collision radius of an active ally.
#[must_use]
pub fn is_blocked(units: &[Unit], mover: usize, candidate: Vec2Fixed, radius: Fixed) -> bool {
    let side = units[mover].side;
    let radius_sq = radius * radius;
    units.iter().enumerate().any(|(i, other)| {
        i != mover
            && other.side == side
            && other.is_active()
            && other.position.distance_squared(candidate) < radius_sq
    })
}

/// Move to the first free candidate. Returns whether the unit moved.
fn take_first_free(
    units: &mut [Unit],
    mover: usize,
    candidates: &[Vec2Fixed],
    rules: MoveRules,
    field: &Battlefield,
) -> bool {
    let current = units[mover].position;
    let free = candidates
        .iter()
        .map(|c| Vec2Fixed::new(c.x, field.clamp_lane_y(c.y)))
        .filter(|c| *c != current)
        .find(|c| !is_blocked(units, mover, *c, rules.collision_radius));

    match free {
        Some(position) => {
            units[mover].position = position;
            true
        }
        None => false,
    }
}

/// Horizontal step toward the enemy base.
pub fn advance(
    units: &mut [Unit],
    mover: usize,
    dt_ms: u64,
    rules: MoveRules,
    field: &Battlefield,
) -> bool {
    let unit = &units[mover];
    let step = unit.step(dt_ms) * unit.side.direction();
    let pos = unit.position;

    let candidates = [
        Vec2Fixed::new(pos.x + step, pos.y),
        Vec2Fixed::new(pos.x + step * rules.reduced_step, pos.y),
    ];
    take_first_free(units, mover, &candidates, rules, field)
}

/// 2D step toward `target`, never overshooting it.
pub fn pursue(
    units: &mut [Unit],
    mover: usize,
    target: Vec2Fixed,
    dt_ms: u64,
    rules: MoveRules,
    field: &Battlefield,
) -> bool {
    let unit = &units[mover];
    let pos = unit.position;
    let offset = target - pos;
    let distance = offset.length();
    if distance == Fixed::ZERO {
        return false;
    }
    let step = unit.step(dt_ms).min(distance);
    let delta = offset.normalize().scale(step);

    let candidates = [
        pos + delta,
        pos + delta.scale(rules.reduced_step),
        Vec2Fixed::new(pos.x + delta.x, pos.y),
        Vec2Fixed::new(pos.x, pos.y + delta.y),
    ];
    take_first_free(units, mover, &candidates, rules, field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Archetype, Side};
    use crate::test_support::unit_at;

    fn rules() -> MoveRules {
        MoveRules::from_config(&GameConfig::default())
    }

    fn x_of(unit: &Unit) -> f64 {
        unit.position.x.to_num::<f64>()
    }

    #[test]
    fn test_lane_full_step() {
        let field = Battlefield::default();
        let mut units = vec![
            unit_at(1, Side::Player, Archetype::Melee, 100, 100),
            unit_at(2, Side::Ai, Archetype::Melee, 600, 100),
        ];
        assert!(advance(&mut units, 0, 100, rules(), &field));
        assert!(advance(&mut units, 1, 100, rules(), &field));
        // 120 px/s for 100 ms
        assert_eq!(units[0].position, Vec2Fixed::from_ints(112, 100));
        assert_eq!(units[1].position, Vec2Fixed::from_ints(588, 100));
    }

    #[test]
    fn test_lane_falls_back_to_reduced_step() {
        let field = Battlefield::default();
        let mut units = vec![
            unit_at(1, Side::Player, Archetype::Melee, 100, 100),
            unit_at(2, Side::Player, Archetype::Melee, 118, 100),
        ];
        assert!(advance(&mut units, 0, 100, rules(), &field));
        assert!((x_of(&units[0]) - 103.6).abs() < 1e-6);
    }

    #[test]
    fn test_lane_stays_when_both_steps_blocked() {
        let field = Battlefield::default();
        let mut units = vec![
            unit_at(1, Side::Player, Archetype::Melee, 100, 100),
            unit_at(2, Side::Player, Archetype::Melee, 110, 100),
        ];
        assert!(!advance(&mut units, 0, 100, rules(), &field));
        assert_eq!(units[0].position, Vec2Fixed::from_ints(100, 100));
    }

    #[test]
    fn test_enemies_and_dead_allies_never_block() {
        let field = Battlefield::default();
        let mut units = vec![
            unit_at(1, Side::Player, Archetype::Melee, 100, 100),
            unit_at(2, Side::Ai, Archetype::Melee, 112, 100),
            unit_at(3, Side::Player, Archetype::Melee, 113, 100),
        ];
        units[2].remove();
        assert!(advance(&mut units, 0, 100, rules(), &field));
        assert_eq!(units[0].position, Vec2Fixed::from_ints(112, 100));
    }

    #[test]
    fn test_pursuit_axis_fallback_keeps_separation() {
        let field = Battlefield::default();
        let mut units = vec![
            unit_at(1, Side::Player, Archetype::Melee, 100, 100),
            unit_at(2, Side::Player, Archetype::Melee, 107, 103),
        ];
        let target = Vec2Fixed::from_ints(200, 200);
        assert!(pursue(&mut units, 0, target, 100, rules(), &field));

        // Full, reduced and X-only are blocked; Y-only is free.
        assert_eq!(units[0].position.x, Fixed::from_num(100));
        assert!(units[0].position.y > Fixed::from_num(100));
        let gap = units[0].position.distance(units[1].position);
        assert!(gap >= Fixed::from_num(8));
    }

    #[test]
    fn test_pursuit_does_not_overshoot() {
        let field = Battlefield::default();
        let mut units = vec![unit_at(1, Side::Player, Archetype::Melee, 100, 100)];
        let target = Vec2Fixed::from_ints(105, 100);
        assert!(pursue(&mut units, 0, target, 100, rules(), &field));
        assert_eq!(units[0].position, target);
        assert!(!pursue(&mut units, 0, target, 100, rules(), &field));
    }

    #[test]
    fn test_pursuit_clamps_to_lane() {
        let field = Battlefield::default();
        let mut units = vec![unit_at(1, Side::Player, Archetype::Melee, 100, 12)];
        assert!(pursue(&mut units, 0, Vec2Fixed::from_ints(100, 0), 100, rules(), &field));
        assert_eq!(units[0].position.y, Fixed::from_num(field.lane_min_y));
    }
}
