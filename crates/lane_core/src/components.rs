//! Identity and classification types shared by every system.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::math::Fixed;

/// Unique identifier for units. Issued monotonically by the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId(pub u64);

/// Unique identifier for projectiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectileId(pub u64);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u{}", self.0)
    }
}

// ============================================================================
// Sides
// ============================================================================

/// One of the two combatants.
///
/// The player's base sits at the left edge (x = 0) and the AI's at the
/// right edge, so player units advance toward +x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Left side, usually human controlled.
    Player,
    /// Right side, computer controlled unless running AI vs AI.
    Ai,
}

impl Side {
    /// Both sides in a fixed order.
    pub const ALL: [Side; 2] = [Side::Player, Side::Ai];

    /// The other side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Side::Player => Side::Ai,
            Side::Ai => Side::Player,
        }
    }

    /// Sign of lane travel along x: +1 for the player, -1 for the AI.
    #[must_use]
    pub fn direction(self) -> Fixed {
        match self {
            Side::Player => Fixed::ONE,
            Side::Ai => -Fixed::ONE,
        }
    }
}

// ============================================================================
// Archetypes
// ============================================================================

/// Behavior class of a unit. Closed set; dispatch is resolved at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Archetype {
    /// Close-range single-target fighter.
    Melee,
    /// Fires piercing projectiles.
    Ranged,
    /// Area damage around its target.
    Caster,
    /// Restores allied hp.
    Healer,
}

impl Archetype {
    /// All archetypes in declaration order.
    pub const ALL: [Archetype; 4] = [
        Archetype::Melee,
        Archetype::Ranged,
        Archetype::Caster,
        Archetype::Healer,
    ];

    /// Lowercase name used in unit ids ("melee", "ranged", ...).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Archetype::Melee => "melee",
            Archetype::Ranged => "ranged",
            Archetype::Caster => "caster",
            Archetype::Healer => "healer",
        }
    }

    const fn index(self) -> usize {
        match self {
            Archetype::Melee => 0,
            Archetype::Ranged => 1,
            Archetype::Caster => 2,
            Archetype::Healer => 3,
        }
    }
}

impl FromStr for Archetype {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Archetype::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| GameError::UnknownUnit(s.to_string()))
    }
}

/// A value per archetype, stored densely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ArchetypeMap<T> {
    values: [T; 4],
}

impl<T: Copy> ArchetypeMap<T> {
    /// Same value for every archetype.
    #[must_use]
    pub fn splat(value: T) -> Self {
        Self { values: [value; 4] }
    }

    /// Value for an archetype.
    #[must_use]
    pub fn get(&self, archetype: Archetype) -> T {
        self.values[archetype.index()]
    }

    /// Replace the value for an archetype.
    pub fn set(&mut self, archetype: Archetype, value: T) {
        self.values[archetype.index()] = value;
    }

    /// Mutable access to the value for an archetype.
    pub fn get_mut(&mut self, archetype: Archetype) -> &mut T {
        &mut self.values[archetype.index()]
    }

    /// Iterate `(archetype, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Archetype, T)> + '_ {
        Archetype::ALL.into_iter().map(|a| (a, self.get(a)))
    }
}

// ============================================================================
// Unit keys
// ============================================================================

/// Lookup key for a unit definition: archetype plus tier.
///
/// Displays and parses as `"<archetype><tier>"`, e.g. `"ranged2"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitKey {
    /// Archetype of the definition.
    pub archetype: Archetype,
    /// Tier, starting at 1.
    pub tier: u8,
}

impl UnitKey {
    /// Create a key.
    #[must_use]
    pub const fn new(archetype: Archetype, tier: u8) -> Self {
        Self { archetype, tier }
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.archetype.name(), self.tier)
    }
}

impl FromStr for UnitKey {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let split = s
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| GameError::UnknownUnit(s.to_string()))?;
        let (name, tier) = s.split_at(split);
        let archetype = name.parse::<Archetype>()?;
        let tier = tier
            .parse::<u8>()
            .map_err(|_| GameError::UnknownUnit(s.to_string()))?;
        Ok(Self { archetype, tier })
    }
}

/// Where a unit currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Placement {
    /// Template waiting in a build zone; inert and subject to expiry.
    BuildZone,
    /// Active combatant on the shared battlefield.
    Battlefield,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_opponent_and_direction() {
        assert_eq!(Side::Player.opponent(), Side::Ai);
        assert_eq!(Side::Ai.opponent(), Side::Player);
        assert!(Side::Player.direction() > Fixed::ZERO);
        assert!(Side::Ai.direction() < Fixed::ZERO);
    }

    #[test]
    fn test_unit_key_parse_and_display() {
        let key: UnitKey = "caster3".parse().unwrap();
        assert_eq!(key, UnitKey::new(Archetype::Caster, 3));
        assert_eq!(key.to_string(), "caster3");

        assert!("wizard1".parse::<UnitKey>().is_err());
        assert!("melee".parse::<UnitKey>().is_err());
    }

    #[test]
    fn test_archetype_map() {
        let mut levels = ArchetypeMap::splat(0u32);
        *levels.get_mut(Archetype::Healer) += 2;
        levels.set(Archetype::Melee, 1);
        assert_eq!(levels.get(Archetype::Healer), 2);
        assert_eq!(levels.get(Archetype::Melee), 1);
        assert_eq!(levels.iter().map(|(_, v)| v).sum::<u32>(), 3);
    }
}
