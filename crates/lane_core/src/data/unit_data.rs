//! Unit definitions for data-driven unit stats.

use serde::{Deserialize, Serialize};

use crate::components::{Archetype, UnitKey};
use crate::error::{GameError, Result};

/// Base stats of one purchasable unit type.
///
/// Distances are whole pixels and durations whole milliseconds; the
/// progression layer turns them into resolved fixed-point stats.
///
/// # Example RON
///
/// ```ron
/// UnitDefinition(
///     key: (archetype: Ranged, tier: 1),
///     name: "Archer",
///     cost: 15,
///     hp: 60,
///     damage: 28,
///     attack_range: 120,
///     attack_cooldown_ms: 1500,
///     speed: 105,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDefinition {
    /// Archetype and tier.
    pub key: UnitKey,
    /// Display name.
    pub name: String,
    /// Gold cost to place.
    pub cost: u32,
    /// Maximum hp before modifiers.
    pub hp: u32,
    /// Damage per activation.
    #[serde(default)]
    pub damage: u32,
    /// Hp restored per target (healers only).
    #[serde(default)]
    pub heal_amount: u32,
    /// Allies healed per activation (healers only).
    #[serde(default = "default_max_targets")]
    pub max_targets: u32,
    /// Attack or heal reach in pixels.
    pub attack_range: u32,
    /// Milliseconds between activations.
    pub attack_cooldown_ms: u32,
    /// Movement speed in pixels per second.
    pub speed: u32,
    /// Area radius in pixels; 0 for single-target units.
    #[serde(default)]
    pub aoe_radius: u32,
}

fn default_max_targets() -> u32 {
    1
}

impl UnitDefinition {
    /// Archetype shortcut.
    #[must_use]
    pub const fn archetype(&self) -> Archetype {
        self.key.archetype
    }

    /// Tier shortcut.
    #[must_use]
    pub const fn tier(&self) -> u8 {
        self.key.tier
    }
}

/// All unit definitions available to a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitCatalog {
    /// Definitions in shop order.
    pub units: Vec<UnitDefinition>,
}

impl UnitCatalog {
    /// Parse a catalog from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let catalog: Self = ron::from_str(text).map_err(|e| GameError::ConfigParse {
            what: "unit catalog",
            message: e.to_string(),
        })?;
        tracing::debug!(units = catalog.units.len(), "Loaded unit catalog");
        Ok(catalog)
    }

    /// Look up a definition by key.
    #[must_use]
    pub fn get(&self, key: UnitKey) -> Option<&UnitDefinition> {
        self.units.iter().find(|def| def.key == key)
    }

    /// Look up a definition or fail with [`GameError::UnknownUnit`].
    pub fn require(&self, key: UnitKey) -> Result<&UnitDefinition> {
        self.get(key)
            .ok_or_else(|| GameError::UnknownUnit(key.to_string()))
    }

    /// Iterate definitions in shop order.
    pub fn iter(&self) -> impl Iterator<Item = &UnitDefinition> {
        self.units.iter()
    }

    /// Highest tier present in the catalog.
    #[must_use]
    pub fn max_tier(&self) -> u8 {
        self.units.iter().map(UnitDefinition::tier).max().unwrap_or(1)
    }
}

impl Default for UnitCatalog {
    /// Three tiers of each archetype.
    fn default() -> Self {
        use Archetype::{Caster, Healer, Melee, Ranged};

        let def = |archetype, tier, name: &str, stats: [u32; 9]| {
            let [cost, hp, damage, heal_amount, max_targets, range, cooldown, speed, aoe] = stats;
            UnitDefinition {
                key: UnitKey::new(archetype, tier),
                name: name.to_string(),
                cost,
                hp,
                damage,
                heal_amount,
                max_targets,
                attack_range: range,
                attack_cooldown_ms: cooldown,
                speed,
                aoe_radius: aoe,
            }
        };

        // [cost, hp, damage, heal, targets, range, cooldown, speed, aoe]
        Self {
            units: vec![
                def(Melee, 1, "Swordsman", [15, 100, 15, 0, 1, 35, 1000, 120, 0]),
                def(Ranged, 1, "Archer", [15, 60, 28, 0, 1, 120, 1500, 105, 0]),
                def(Caster, 1, "Apprentice", [20, 50, 35, 0, 1, 140, 2000, 82, 40]),
                def(Healer, 1, "Acolyte", [20, 70, 0, 15, 2, 100, 1500, 90, 0]),
                def(Melee, 2, "Knight", [30, 200, 35, 0, 1, 40, 900, 135, 0]),
                def(Ranged, 2, "Crossbowman", [40, 120, 56, 0, 1, 150, 1300, 120, 0]),
                def(Caster, 2, "Mage", [50, 100, 60, 0, 1, 170, 1800, 105, 50]),
                def(Healer, 2, "Cleric", [45, 140, 0, 30, 3, 120, 1400, 100, 0]),
                def(Melee, 3, "Champion", [80, 400, 70, 0, 1, 45, 800, 150, 0]),
                def(Ranged, 3, "Marksman", [100, 250, 112, 0, 1, 180, 1100, 135, 0]),
                def(Caster, 3, "Archmage", [120, 200, 100, 0, 1, 200, 1600, 120, 60]),
                def(Healer, 3, "High Priest", [110, 280, 0, 55, 4, 140, 1200, 110, 0]),
            ],
        }
    }
}
