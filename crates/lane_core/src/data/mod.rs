//! Data structures for match configuration and unit definitions.
//!
//! All structs are designed to be deserialized from RON text.
//!
//! **Note:** This module contains no IO - it only defines data types.
//! File loading is handled by `lane_headless`.

mod config_data;
mod unit_data;

pub use config_data::{
    AiConfig, BalanceTable, Battlefield, ComebackRule, Controller, Controllers, Difficulty,
    EndBehavior, GameConfig, GameMode, IncomeRamp, LevelRules, ProgressionMode, ProjectileConfig,
    StatScale, StrategyKind, StuckConfig, TierRules, UpgradeConfig,
};
pub use unit_data::{UnitCatalog, UnitDefinition};
