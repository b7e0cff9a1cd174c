//! Events emitted by the simulation.
//!
//! The core never plays sounds or draws effects. It records what happened
//! and the embedding application reacts to the records after each tick.

use serde::{Deserialize, Serialize};

use crate::components::{Archetype, ProjectileId, Side, UnitId, UnitKey};

/// Why a projectile left the battlefield without a final hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpiryReason {
    /// Hit as many units as it may pierce.
    PierceLimit,
    /// Flew longer than its lifetime.
    MaxAge,
    /// Flew farther than its range.
    MaxDistance,
}

/// Where a gold award came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GoldSource {
    /// Periodic income.
    Passive,
    /// Bounty for a kill.
    Kill,
    /// Bonus for completing a round.
    Round,
    /// Bonus attached to a free tier unlock.
    TierUnlock,
}

/// A single simulation event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimEvent {
    /// A template was placed into a build zone.
    UnitPlaced {
        /// New template.
        unit: UnitId,
        /// Owner.
        side: Side,
        /// Definition placed.
        key: UnitKey,
        /// Gold paid.
        cost: u32,
    },
    /// A build-zone template outlived its lifetime.
    UnitExpired {
        /// Removed template.
        unit: UnitId,
        /// Owner.
        side: Side,
    },
    /// Templates were cloned onto the battlefield.
    BattleStarted {
        /// Round being fought.
        round: u32,
        /// Number of battle units spawned.
        deployed: usize,
    },
    /// Damage was dealt to a unit.
    UnitDamaged {
        /// Unit responsible.
        attacker: UnitId,
        /// Unit that received damage.
        target: UnitId,
        /// Hp removed.
        amount: u32,
        /// Hp left afterwards.
        remaining_hp: u32,
    },
    /// A healer restored hp.
    UnitHealed {
        /// Healer.
        healer: UnitId,
        /// Ally healed.
        target: UnitId,
        /// Hp restored.
        amount: u32,
    },
    /// A unit's hp reached zero.
    UnitKilled {
        /// Unit responsible for the kill.
        killer: UnitId,
        /// Unit that died.
        victim: UnitId,
        /// Side the victim fought for.
        victim_side: Side,
    },
    /// A ranged unit fired.
    ProjectileFired {
        /// New projectile.
        projectile: ProjectileId,
        /// Firing unit.
        source: UnitId,
        /// Firing side.
        owner: Side,
    },
    /// A projectile struck a unit.
    ProjectileHit {
        /// Projectile.
        projectile: ProjectileId,
        /// Unit struck.
        target: UnitId,
        /// Damage dealt.
        damage: u32,
    },
    /// A projectile was removed.
    ProjectileExpired {
        /// Projectile.
        projectile: ProjectileId,
        /// Removal cause.
        reason: ExpiryReason,
    },
    /// A unit reached the enemy base.
    BaseBreached {
        /// Unit that got through (removed).
        unit: UnitId,
        /// Side that scored.
        attacker: Side,
        /// Core health left on the defending side.
        remaining_health: u32,
    },
    /// A stuck unit was nudged.
    UnitUnstuck {
        /// Nudged unit.
        unit: UnitId,
    },
    /// Gold was credited to a side.
    GoldAwarded {
        /// Receiving side.
        side: Side,
        /// Amount credited.
        amount: u32,
        /// Reason.
        source: GoldSource,
    },
    /// A tier became available to a side.
    TierUnlocked {
        /// Side.
        side: Side,
        /// Tier unlocked.
        tier: u8,
        /// Bought with gold rather than granted by round progress.
        purchased: bool,
    },
    /// An archetype gained an upgrade level.
    ArchetypeUpgraded {
        /// Side.
        side: Side,
        /// Archetype upgraded.
        archetype: Archetype,
        /// New level.
        level: u32,
    },
    /// A side bought an economy level.
    EconomyUpgraded {
        /// Side.
        side: Side,
        /// New level.
        level: u32,
    },
    /// A battle ended and the survivors were scored.
    RoundSettled {
        /// Round that ended.
        round: u32,
        /// Surviving player units.
        player_survivors: u32,
        /// Surviving AI units.
        ai_survivors: u32,
    },
    /// A core reached zero health.
    GameOver {
        /// Winning side; `None` when both cores fell together.
        winner: Option<Side>,
    },
}
