//! Error types for the battle simulation.
//!
//! Every player or AI action that can be refused returns one of these.
//! A refused action never mutates state.

use thiserror::Error;

use crate::components::{Archetype, Side};
use crate::simulation::Phase;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all rejected simulation actions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// Not enough gold for the purchase.
    #[error("{side:?} needs {required} gold, has {available}")]
    InsufficientGold {
        /// Side attempting the purchase.
        side: Side,
        /// Gold required.
        required: u32,
        /// Gold available.
        available: u32,
    },

    /// Another unit in the zone is closer than the minimum spacing.
    #[error("Placement too close to an existing unit (min distance {min_distance})")]
    PlacementTooClose {
        /// Minimum allowed distance between templates.
        min_distance: u32,
    },

    /// Position lies outside the build zone.
    #[error("Placement outside the build zone")]
    OutOfZone,

    /// The build zone already holds the maximum number of units.
    #[error("Build zone full ({limit} units)")]
    ZoneFull {
        /// Configured unit cap.
        limit: usize,
    },

    /// The unit's tier has not been unlocked for this side.
    #[error("Tier {tier} is locked for {side:?}")]
    TierLocked {
        /// Side attempting the action.
        side: Side,
        /// Requested tier.
        tier: u8,
    },

    /// The tier is already unlocked.
    #[error("Tier {0} already unlocked")]
    AlreadyUnlocked(u8),

    /// No definition matches the lookup key.
    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    /// No unit type has been selected for placement.
    #[error("No unit type selected")]
    NothingSelected,

    /// The action is not allowed in the current phase.
    #[error("Action not allowed during {0:?}")]
    WrongPhase(Phase),

    /// Upgrades are locked until the first round completes.
    #[error("Upgrades unavailable before round 1")]
    UpgradesLocked,

    /// The active progression model has no such action.
    #[error("{action} is not supported by the {model} progression")]
    UnsupportedByProgression {
        /// Attempted action.
        action: &'static str,
        /// Active progression model.
        model: &'static str,
    },

    /// Upgrade requested for an archetype with no purchasable definition.
    #[error("No upgradable definition for {0:?}")]
    NotUpgradable(Archetype),

    /// The match has ended.
    #[error("Game is over")]
    GameOver,

    /// Data file parsing error.
    #[error("Failed to parse {what}: {message}")]
    ConfigParse {
        /// What was being parsed.
        what: &'static str,
        /// Parser message.
        message: String,
    },
}
