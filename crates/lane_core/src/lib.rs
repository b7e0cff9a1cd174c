//! # Lane Core
//!
//! Deterministic battle simulation for a two-sided lane autobattler.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness (one seeded RNG per match)
//! - No floating-point math (uses fixed-point)
//!
//! A match alternates between a build phase, where each side buys unit
//! templates into its build zone, and a battle phase, where the templates
//! are cloned onto the lane and fight on their own. Units that survive or
//! reach the enemy base cost the opposing core health.
//!
//! ## Crate Structure
//!
//! - [`simulation`] - Match state machine and player actions
//! - [`world`] - Unit and projectile registry
//! - [`unit`] - Unit state, cooldowns, lifetimes and stuck detection
//! - [`behavior`] - Per-archetype decision making
//! - [`systems`] - Movement, combat and projectile systems
//! - [`battle`] / [`round`] - Battle tick and round transitions
//! - [`progression`] - Tier and level progression models
//! - [`ai`] - Computer-controlled purchasing
//! - [`data`] - RON-loadable configuration and unit catalog

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod battle;
pub mod behavior;
pub mod components;
pub mod context;
pub mod data;
pub mod economy;
pub mod error;
pub mod events;
pub mod math;
pub mod progression;
pub mod projectile;
pub mod rng;
pub mod round;
pub mod simulation;
pub mod systems;
pub mod unit;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::ai::{Purchase, PurchaseStrategy};
    pub use crate::components::*;
    pub use crate::data::{
        ComebackRule, Controller, Difficulty, EndBehavior, GameConfig, GameMode, ProgressionMode,
        StrategyKind, UnitCatalog, UnitDefinition,
    };
    pub use crate::economy::SideState;
    pub use crate::error::{GameError, Result};
    pub use crate::events::{ExpiryReason, GoldSource, SimEvent};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::progression::{Progression, ResolvedStats};
    pub use crate::projectile::Projectile;
    pub use crate::simulation::{Phase, Simulation, TickEvents};
    pub use crate::unit::Unit;
    pub use crate::world::World;
}
