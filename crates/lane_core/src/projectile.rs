//! Piercing projectiles fired by ranged units.

use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use crate::components::{ProjectileId, Side, UnitId};
use crate::data::ProjectileConfig;
use crate::events::ExpiryReason;
use crate::math::{Fixed, Vec2Fixed};

/// A projectile in flight.
///
/// The flight direction is fixed on the first update, from the spawn point
/// toward the aim point. After that the projectile flies straight and hits
/// anything of the opposing side it passes close to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projectile {
    /// Unique id.
    pub id: ProjectileId,
    /// Side that fired.
    pub owner: Side,
    /// Unit that fired; credited with kills.
    pub source: UnitId,
    /// Current position.
    pub position: Vec2Fixed,
    /// Where the projectile was fired from.
    pub spawn_position: Vec2Fixed,
    /// Point the projectile was aimed at.
    pub aim: Vec2Fixed,
    /// Unit-length flight direction, set on the first update.
    pub direction: Option<Vec2Fixed>,
    /// Pixels per second.
    pub speed: Fixed,
    /// Damage per hit.
    pub damage: u32,
    /// Hits allowed before the projectile is spent.
    pub pierce_limit: u32,
    /// Units already hit; never hit twice.
    pub hit: BTreeSet<UnitId>,
    /// Game milliseconds in flight.
    pub age_ms: u64,
    /// Set once the projectile should be removed.
    pub expired: Option<ExpiryReason>,
}

impl Projectile {
    /// A projectile fired by `source` from `position` toward `aim`.
    #[must_use]
    pub fn new(
        id: ProjectileId,
        owner: Side,
        source: UnitId,
        position: Vec2Fixed,
        aim: Vec2Fixed,
        damage: u32,
        pierce_limit: u32,
        config: &ProjectileConfig,
    ) -> Self {
        Self {
            id,
            owner,
            source,
            position,
            spawn_position: position,
            aim,
            direction: None,
            speed: Fixed::from_num(config.speed),
            damage,
            pierce_limit: pierce_limit.max(1),
            hit: BTreeSet::new(),
            age_ms: 0,
            expired: None,
        }
    }

    /// Flight direction, locking it in on first use.
    ///
    /// A projectile aimed at its own spawn point flies straight down the
    /// lane toward the enemy base.
    pub fn heading(&mut self) -> Vec2Fixed {
        if let Some(direction) = self.direction {
            return direction;
        }
        let towards = self.aim - self.spawn_position;
        let direction = if towards == Vec2Fixed::ZERO {
            Vec2Fixed::new(self.owner.direction(), Fixed::ZERO)
        } else {
            towards.normalize()
        };
        self.direction = Some(direction);
        direction
    }

    /// Record a hit on `target`. Returns `false` if it was already hit.
    pub fn register_hit(&mut self, target: UnitId) -> bool {
        if !self.hit.insert(target) {
            return false;
        }
        if self.hits() >= self.pierce_limit {
            self.expired = Some(ExpiryReason::PierceLimit);
        }
        true
    }

    /// Number of distinct units hit.
    #[must_use]
    pub fn hits(&self) -> u32 {
        u32::try_from(self.hit.len()).unwrap_or(u32::MAX)
    }

    /// Whether the projectile is still flying.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.expired.is_none()
    }

    /// Expire on age or travel distance. Pierce expiry takes precedence.
    pub fn check_limits(&mut self, config: &ProjectileConfig) {
        if self.expired.is_some() {
            return;
        }
        let max_distance = Fixed::from_num(config.max_distance);
        if self.age_ms >= config.max_age_ms {
            self.expired = Some(ExpiryReason::MaxAge);
        } else if self.spawn_position.distance_squared(self.position) > max_distance * max_distance {
            self.expired = Some(ExpiryReason::MaxDistance);
        }
    }

    /// Feed the deterministic parts of this projectile into a hasher.
    pub fn hash_state<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.source.hash(state);
        self.position.hash(state);
        self.hit.hash(state);
        self.age_ms.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projectile(aim: Vec2Fixed, pierce: u32) -> Projectile {
        Projectile::new(
            ProjectileId(1),
            Side::Player,
            UnitId(1),
            Vec2Fixed::from_ints(100, 100),
            aim,
            10,
            pierce,
            &ProjectileConfig::default(),
        )
    }

    #[test]
    fn test_heading_is_locked_on_first_use() {
        let mut p = projectile(Vec2Fixed::from_ints(200, 100), 1);
        assert_eq!(p.heading(), Vec2Fixed::from_ints(1, 0));
        p.aim = Vec2Fixed::from_ints(100, 300);
        assert_eq!(p.heading(), Vec2Fixed::from_ints(1, 0));
    }

    #[test]
    fn test_degenerate_aim_flies_down_the_lane() {
        let mut p = projectile(Vec2Fixed::from_ints(100, 100), 1);
        assert_eq!(p.heading(), Vec2Fixed::from_ints(1, 0));
    }

    #[test]
    fn test_pierce_limit() {
        let mut p = projectile(Vec2Fixed::from_ints(200, 100), 2);
        assert!(p.register_hit(UnitId(5)));
        assert!(!p.register_hit(UnitId(5)));
        assert!(p.is_active());
        assert!(p.register_hit(UnitId(6)));
        assert_eq!(p.expired, Some(ExpiryReason::PierceLimit));
    }

    #[test]
    fn test_age_and_distance_limits() {
        let config = ProjectileConfig::default();
        let mut p = projectile(Vec2Fixed::from_ints(200, 100), 1);
        p.age_ms = 4999;
        p.check_limits(&config);
        assert!(p.is_active());
        p.age_ms = 5000;
        p.check_limits(&config);
        assert_eq!(p.expired, Some(ExpiryReason::MaxAge));

        let mut far = projectile(Vec2Fixed::from_ints(200, 100), 1);
        far.position = Vec2Fixed::from_ints(900, 100);
        far.check_limits(&config);
        assert!(far.is_active());
        far.position = Vec2Fixed::from_ints(901, 100);
        far.check_limits(&config);
        assert_eq!(far.expired, Some(ExpiryReason::MaxDistance));
    }
}
