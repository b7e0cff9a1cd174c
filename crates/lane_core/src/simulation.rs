//! Match state machine.
//!
//! [`Simulation`] owns the [`World`] and drives it frame by frame. The
//! embedding application calls [`Simulation::tick`] with the raw frame delta
//! and submits player actions between ticks.
//!
//! # Clocks
//!
//! - **Game time** advances by the clamped delta times the speed multiplier,
//!   and only while the match is started, unpaused and not over. Cooldowns,
//!   invulnerability, phase timers and AI cadence all read it.
//! - **Wall clock** advances by the clamped delta on every tick, paused or
//!   not. Build-zone template lifetimes read it, minus the time each
//!   template spent paused.
//!
//! # Determinism
//!
//! Given the same config, the same seed and the same sequence of deltas and
//! actions, two simulations produce identical [`Simulation::state_hash`]
//! values after every tick.
//!
//! # Example
//!
//! ```
//! use lane_core::prelude::*;
//!
//! let mut sim = Simulation::new(GameConfig::default());
//! let key = UnitKey::new(Archetype::Melee, 1);
//! sim.place_unit(Side::Player, key, Vec2Fixed::from_ints(100, 100)).unwrap();
//! assert!(sim.is_started());
//!
//! let events = sim.tick(16);
//! assert_eq!(sim.phase(), Phase::Build);
//! assert!(events.events.is_empty());
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::ai::{plan_purchases, strategy_for, Purchase};
use crate::battle::run_battle_tick;
use crate::components::{Archetype, Placement, Side, UnitId, UnitKey};
use crate::data::{Controller, EndBehavior, GameConfig, UnitCatalog};
use crate::economy::{self, SideState};
use crate::error::{GameError, Result};
use crate::events::{GoldSource, SimEvent};
use crate::math::{Fixed, Vec2Fixed};
use crate::progression::{progression_for, Progression};
use crate::projectile::Projectile;
use crate::round::{advance_round, battle_is_over, deploy, expire_templates, settle};
use crate::unit::Unit;
use crate::world::World;

/// Current stage of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Placement and purchasing; no fighting.
    Build,
    /// Deployed units fight; no placement.
    Battle,
    /// The match ended; ticks do nothing.
    Finished,
}

/// Events produced by a single [`Simulation::tick`], in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickEvents {
    /// Everything that happened this tick.
    pub events: Vec<SimEvent>,
}

impl TickEvents {
    /// Whether nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Kills reported this tick.
    pub fn kills(&self) -> impl Iterator<Item = (UnitId, UnitId)> + '_ {
        self.events.iter().filter_map(|e| match e {
            SimEvent::UnitKilled { killer, victim, .. } => Some((*killer, *victim)),
            _ => None,
        })
    }
}

/// A complete 1-vs-1 lane match.
///
/// # Tick order
///
/// 1. clamp the frame delta, advance the wall clock
/// 2. stop here when paused, finished or not started
/// 3. advance game time by `delta × speed`
/// 4. **Build**: passive income, template expiry, computer purchases,
///    countdown, then deployment when the countdown ends
/// 5. **Battle**: [`run_battle_tick`], game-over check, countdown, then
///    settlement and the next round when the battle is over
/// 6. hand the tick's events to the caller
#[derive(Debug)]
pub struct Simulation {
    config: GameConfig,
    catalog: UnitCatalog,
    progression: Box<dyn Progression>,
    world: World,
    round: u32,
    phase: Phase,
    remaining_ms: u64,
    paused: bool,
    started: bool,
    speed: u32,
    selected: Option<UnitKey>,
    show_target_lines: bool,
    outcome: Option<Option<Side>>,
    ai_bucket_ms: u64,
}

impl Simulation {
    /// New match with the built-in unit catalog.
    #[must_use]
    pub fn new(config: GameConfig) -> Self {
        Self::with_catalog(config, UnitCatalog::default())
    }

    /// New match with a custom unit catalog.
    #[must_use]
    pub fn with_catalog(config: GameConfig, catalog: UnitCatalog) -> Self {
        let progression = progression_for(&config.mode.progression);
        let world = World::new(&config);
        let remaining_ms = config.build_phase_ms;
        tracing::debug!(
            seed = config.seed,
            progression = progression.name(),
            "Simulation created"
        );
        Self {
            config,
            catalog,
            progression,
            world,
            round: 0,
            phase: Phase::Build,
            remaining_ms,
            paused: false,
            started: false,
            speed: 1,
            selected: None,
            show_target_lines: false,
            outcome: None,
            ai_bucket_ms: 0,
        }
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Advance the match by one frame of `raw_dt_ms` milliseconds.
    pub fn tick(&mut self, raw_dt_ms: u64) -> TickEvents {
        let dt = raw_dt_ms.min(self.config.max_frame_delta_ms);
        self.world.wall_clock += dt;

        if self.paused || !self.started || self.phase == Phase::Finished {
            return self.drain_events();
        }

        let game_dt = dt * u64::from(self.speed);
        self.world.game_time += game_dt;

        match self.phase {
            Phase::Build => self.build_tick(game_dt),
            Phase::Battle => self.battle_tick(game_dt),
            Phase::Finished => {}
        }

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::trace!(game_time = self.world.game_time, state_hash = hash, "Simulation state hash");
        }

        self.drain_events()
    }

    fn drain_events(&mut self) -> TickEvents {
        TickEvents {
            events: std::mem::take(&mut self.world.events),
        }
    }

    fn build_tick(&mut self, game_dt: u64) {
        for side in Side::ALL {
            let amount = self.world.sides.get_mut(side).accrue_passive(game_dt, &self.config);
            if amount > 0 {
                self.world.events.push(SimEvent::GoldAwarded {
                    side,
                    amount,
                    source: GoldSource::Passive,
                });
            }
        }

        expire_templates(&mut self.world);
        self.world.remove_dead();

        let interval = self.config.ai.decision_interval_ms;
        if interval > 0 {
            self.ai_bucket_ms += game_dt;
            while self.ai_bucket_ms >= interval {
                self.ai_bucket_ms -= interval;
                self.run_computer_decisions();
            }
        }

        self.remaining_ms = self.remaining_ms.saturating_sub(game_dt);
        if self.remaining_ms == 0 {
            self.start_battle();
        }
    }

    fn battle_tick(&mut self, game_dt: u64) {
        run_battle_tick(&mut self.world, &self.config, self.progression.as_ref(), game_dt);
        if self.check_game_over() {
            return;
        }

        self.remaining_ms = self.remaining_ms.saturating_sub(game_dt);
        if self.remaining_ms == 0 || battle_is_over(&self.world) {
            self.end_battle();
        }
    }

    fn start_battle(&mut self) {
        let deployed = deploy(
            &mut self.world,
            &self.config,
            &self.catalog,
            self.progression.as_ref(),
        );
        self.phase = Phase::Battle;
        self.remaining_ms = self.config.battle_phase_ms;
        tracing::info!(round = self.round, deployed, "Battle started");
        self.world.events.push(SimEvent::BattleStarted {
            round: self.round,
            deployed,
        });
    }

    fn end_battle(&mut self) {
        let settlement = settle(&mut self.world, &self.config, self.progression.as_ref());
        tracing::info!(
            round = self.round,
            player_survivors = settlement.player_survivors,
            ai_survivors = settlement.ai_survivors,
            "Round settled"
        );
        self.world.events.push(SimEvent::RoundSettled {
            round: self.round,
            player_survivors: settlement.player_survivors,
            ai_survivors: settlement.ai_survivors,
        });
        if self.check_game_over() {
            return;
        }

        self.round += 1;
        advance_round(
            &mut self.world,
            &self.config,
            self.progression.as_ref(),
            self.round,
            self.catalog.max_tier(),
        );
        for side in Side::ALL {
            self.refresh_templates(side, None);
        }
        self.phase = Phase::Build;
        self.remaining_ms = self.config.build_phase_ms;
    }

    /// Stop the match if a core has fallen. Returns whether it stopped.
    fn check_game_over(&mut self) -> bool {
        if self.config.mode.infinite || self.outcome.is_some() {
            return self.outcome.is_some();
        }
        let Some(winner) = self.world.sides.outcome() else {
            return false;
        };

        self.outcome = Some(winner);
        tracing::info!(?winner, round = self.round, "Game over");
        self.world.events.push(SimEvent::GameOver { winner });
        match self.config.mode.end {
            EndBehavior::Terminal => self.phase = Phase::Finished,
            EndBehavior::FreezeForRestart => self.pause(),
        }
        true
    }

    fn run_computer_decisions(&mut self) {
        for side in Side::ALL {
            let Controller::Computer(kind) = self.config.controllers.get(side) else {
                continue;
            };
            let plan = plan_purchases(
                strategy_for(kind),
                side,
                &mut self.world,
                &self.config,
                &self.catalog,
                self.progression.as_ref(),
                self.round,
            );
            for purchase in plan {
                if let Err(error) = self.apply_purchase(side, purchase) {
                    tracing::debug!(?side, ?purchase, %error, "Computer purchase rejected");
                }
            }
        }
    }

    fn apply_purchase(&mut self, side: Side, purchase: Purchase) -> Result<()> {
        match purchase {
            Purchase::UnlockTier(tier) => self.unlock_tier(side, tier).map(drop),
            Purchase::Upgrade(archetype) => self.upgrade_archetype(side, archetype).map(drop),
            Purchase::Place { key, position } => self.place_unit(side, key, position).map(drop),
        }
    }

    /// Re-resolve a side's templates after its progression changed.
    fn refresh_templates(&mut self, side: Side, archetype: Option<Archetype>) {
        let state = self.world.sides.get(side);
        for unit in &mut self.world.units {
            if unit.side != side
                || unit.placement != Placement::BuildZone
                || archetype.is_some_and(|a| a != unit.archetype())
            {
                continue;
            }
            if let Some(def) = self.catalog.get(unit.key) {
                unit.rescale(self.progression.resolve(def, state, &self.config));
            }
        }
    }

    // ========================================================================
    // Player actions
    // ========================================================================

    fn ensure_running(&self) -> Result<()> {
        if self.outcome.is_some() {
            return Err(GameError::GameOver);
        }
        Ok(())
    }

    fn log_rejection<T>(action: &'static str, side: Side, result: Result<T>) -> Result<T> {
        if let Err(error) = &result {
            tracing::debug!(action, ?side, %error, "Action rejected");
        }
        result
    }

    /// Buy a unit and put its template at zone-local `position`.
    ///
    /// The first successful placement starts the match clock.
    pub fn place_unit(&mut self, side: Side, key: UnitKey, position: Vec2Fixed) -> Result<UnitId> {
        let result = self.try_place(side, key, position);
        Self::log_rejection("place", side, result)
    }

    fn try_place(&mut self, side: Side, key: UnitKey, position: Vec2Fixed) -> Result<UnitId> {
        self.ensure_running()?;
        if self.phase != Phase::Build {
            return Err(GameError::WrongPhase(self.phase));
        }
        let def = self.catalog.require(key)?;
        let state = self.world.sides.get(side);
        self.progression.check_available(def, state)?;

        let cost = self.progression.unit_cost(def, state);
        if state.gold < cost {
            return Err(GameError::InsufficientGold {
                side,
                required: cost,
                available: state.gold,
            });
        }
        if self.world.count_templates(side) >= self.config.max_units_per_zone {
            return Err(GameError::ZoneFull {
                limit: self.config.max_units_per_zone,
            });
        }
        let spacing = Fixed::from_num(self.config.min_unit_distance);
        if self
            .world
            .templates(side)
            .any(|t| t.position.distance_squared(position) < spacing * spacing)
        {
            return Err(GameError::PlacementTooClose {
                min_distance: self.config.min_unit_distance,
            });
        }
        if !self.config.battlefield.zone_contains(position) {
            return Err(GameError::OutOfZone);
        }

        let stats = self.progression.resolve(def, state, &self.config);
        self.world.sides.get_mut(side).spend(cost)?;

        let id = self.world.next_unit_id();
        let mut template = Unit::template(
            id,
            key,
            side,
            stats,
            position,
            self.world.wall_clock,
            self.config.template_ttl_ms,
        );
        if self.paused {
            template.begin_pause(self.world.wall_clock);
        }
        self.world.spawn(template);
        self.world.events.push(SimEvent::UnitPlaced { unit: id, side, key, cost });
        tracing::debug!(unit = %id, ?side, %key, cost, "Unit placed");

        if !self.started {
            self.start();
        }
        Ok(id)
    }

    /// Choose the unit type the player places next; `None` clears it.
    pub fn select_unit_type(&mut self, key: Option<UnitKey>) -> Result<()> {
        if let Some(key) = key {
            Self::log_rejection("select", Side::Player, self.catalog.require(key).map(drop))?;
        }
        self.selected = key;
        Ok(())
    }

    /// Place the selected unit type for the player.
    pub fn place_selected(&mut self, position: Vec2Fixed) -> Result<UnitId> {
        let key = Self::log_rejection(
            "place",
            Side::Player,
            self.selected.ok_or(GameError::NothingSelected),
        )?;
        self.place_unit(Side::Player, key, position)
    }

    /// Buy a tier with gold. Returns the price paid.
    pub fn unlock_tier(&mut self, side: Side, tier: u8) -> Result<u32> {
        let result = self.ensure_running().and_then(|()| {
            self.progression.unlock_tier(
                self.world.sides.get_mut(side),
                tier,
                self.catalog.max_tier(),
            )
        });
        let cost = Self::log_rejection("unlock", side, result)?;
        tracing::info!(?side, tier, cost, "Tier unlocked");
        self.world.events.push(SimEvent::TierUnlocked {
            side,
            tier,
            purchased: true,
        });
        Ok(cost)
    }

    /// Buy one level of `archetype`. Returns the new level.
    ///
    /// Templates of that archetype already in the zone are re-resolved and
    /// keep their hp fraction.
    pub fn upgrade_archetype(&mut self, side: Side, archetype: Archetype) -> Result<u32> {
        let result = self.try_upgrade(side, archetype);
        let level = Self::log_rejection("upgrade", side, result)?;
        self.refresh_templates(side, Some(archetype));
        tracing::info!(?side, ?archetype, level, "Archetype upgraded");
        self.world.events.push(SimEvent::ArchetypeUpgraded {
            side,
            archetype,
            level,
        });
        Ok(level)
    }

    fn try_upgrade(&mut self, side: Side, archetype: Archetype) -> Result<u32> {
        self.ensure_running()?;
        if self
            .progression
            .upgrade_cost(self.world.sides.get(side), archetype)
            .is_none()
        {
            return Err(GameError::UnsupportedByProgression {
                action: "archetype upgrade",
                model: self.progression.name(),
            });
        }
        if self.round == 0 {
            return Err(GameError::UpgradesLocked);
        }
        self.progression.upgrade(self.world.sides.get_mut(side), archetype)
    }

    /// Buy one economy level. Returns the new level.
    pub fn upgrade_economy(&mut self, side: Side) -> Result<u32> {
        let result = self
            .ensure_running()
            .and_then(|()| economy::upgrade_economy(self.world.sides.get_mut(side), &self.config));
        let level = Self::log_rejection("economy", side, result)?;
        self.world.events.push(SimEvent::EconomyUpgraded { side, level });
        Ok(level)
    }

    // ========================================================================
    // Controls
    // ========================================================================

    /// Freeze all timers.
    pub fn pause(&mut self) {
        if self.paused {
            return;
        }
        self.paused = true;
        let now = self.world.wall_clock;
        for unit in &mut self.world.units {
            unit.begin_pause(now);
        }
        tracing::debug!(wall_clock = now, "Paused");
    }

    /// Unfreeze timers. A match frozen by game over stays frozen.
    pub fn resume(&mut self) {
        if !self.paused || self.outcome.is_some() {
            return;
        }
        self.paused = false;
        let now = self.world.wall_clock;
        for unit in &mut self.world.units {
            unit.end_pause(now);
        }
        tracing::debug!(wall_clock = now, "Resumed");
    }

    /// Flip between paused and running.
    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Set the game-speed multiplier, clamped to `1..=max_game_speed`.
    /// Returns the speed in effect.
    pub fn set_speed(&mut self, speed: u32) -> u32 {
        let clamped = speed.clamp(1, self.config.max_game_speed.max(1));
        if clamped != speed {
            tracing::warn!(requested = speed, applied = clamped, "Game speed clamped");
        }
        self.speed = clamped;
        clamped
    }

    /// Start the match clock without placing a unit.
    pub fn start(&mut self) {
        if !self.started {
            self.started = true;
            tracing::info!(seed = self.config.seed, "Match started");
        }
    }

    /// Reset to a fresh match with the same config and seed.
    ///
    /// Speed and the target-line toggle carry over.
    pub fn restart(&mut self) {
        self.world = World::new(&self.config);
        self.round = 0;
        self.phase = Phase::Build;
        self.remaining_ms = self.config.build_phase_ms;
        self.paused = false;
        self.started = false;
        self.selected = None;
        self.outcome = None;
        self.ai_bucket_ms = 0;
        tracing::info!(seed = self.config.seed, "Match restarted");
    }

    /// Turn target lines on or off.
    pub fn set_show_target_lines(&mut self, show: bool) {
        self.show_target_lines = show;
    }

    /// `(unit, target)` position pairs for every battle unit with a live
    /// target. Empty while target lines are off.
    #[must_use]
    pub fn target_lines(&self) -> Vec<(Vec2Fixed, Vec2Fixed)> {
        if !self.show_target_lines {
            return Vec::new();
        }
        self.world
            .units
            .iter()
            .filter(|u| u.is_active())
            .filter_map(|u| {
                let target = self.world.unit(u.target?)?;
                target.is_active().then_some((u.position, target.position))
            })
            .collect()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Match configuration.
    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Unit definitions.
    #[must_use]
    pub const fn catalog(&self) -> &UnitCatalog {
        &self.catalog
    }

    /// Full world state.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// All live units, templates and battle units, in id order.
    #[must_use]
    pub fn units(&self) -> &[Unit] {
        &self.world.units
    }

    /// Projectiles in flight.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.world.projectiles
    }

    /// State of one side.
    #[must_use]
    pub const fn side(&self, side: Side) -> &SideState {
        self.world.sides.get(side)
    }

    /// Round counter; 0 until the first battle has been settled.
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.round
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Game milliseconds left in the current phase.
    #[must_use]
    pub const fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    /// Whether timers are frozen.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether the match clock has started.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.started
    }

    /// Speed multiplier.
    #[must_use]
    pub const fn speed(&self) -> u32 {
        self.speed
    }

    /// Unit type the player has selected.
    #[must_use]
    pub const fn selected(&self) -> Option<UnitKey> {
        self.selected
    }

    /// Whether target lines are on.
    #[must_use]
    pub const fn shows_target_lines(&self) -> bool {
        self.show_target_lines
    }

    /// `Some(winner)` once the match is decided; the winner is `None` for a
    /// draw.
    #[must_use]
    pub const fn outcome(&self) -> Option<Option<Side>> {
        self.outcome
    }

    /// Whether a core has fallen.
    #[must_use]
    pub const fn is_game_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// Game clock in milliseconds.
    #[must_use]
    pub const fn game_time(&self) -> u64 {
        self.world.game_time
    }

    /// Wall clock in milliseconds.
    #[must_use]
    pub const fn wall_clock(&self) -> u64 {
        self.world.wall_clock
    }

    /// Price of a unit for `side`, or `None` for an unknown key.
    #[must_use]
    pub fn unit_cost(&self, side: Side, key: UnitKey) -> Option<u32> {
        let def = self.catalog.get(key)?;
        Some(self.progression.unit_cost(def, self.world.sides.get(side)))
    }

    /// Price of the next archetype level, if the progression sells them.
    #[must_use]
    pub fn upgrade_cost(&self, side: Side, archetype: Archetype) -> Option<u32> {
        self.progression
            .upgrade_cost(self.world.sides.get(side), archetype)
    }

    /// Price of a tier, if the progression sells them.
    #[must_use]
    pub fn unlock_cost(&self, tier: u8) -> Option<u32> {
        self.progression.unlock_cost(tier)
    }

    /// Price of the side's next economy level.
    #[must_use]
    pub const fn economy_upgrade_cost(&self, side: Side) -> u32 {
        economy::economy_upgrade_cost(&self.config, self.world.sides.get(side).economy_level)
    }

    /// Hash of everything that determines future behavior.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.round.hash(&mut hasher);
        self.phase.hash(&mut hasher);
        self.remaining_ms.hash(&mut hasher);
        self.ai_bucket_ms.hash(&mut hasher);
        self.outcome.hash(&mut hasher);
        self.world.hash_state(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{GameMode, StrategyKind};

    fn human_vs_human() -> GameConfig {
        let mut config = GameConfig::default();
        config.controllers.ai = Controller::Human;
        config
    }

    fn melee() -> UnitKey {
        UnitKey::new(Archetype::Melee, 1)
    }

    fn run(sim: &mut Simulation, ms: u64) -> Vec<SimEvent> {
        let mut events = Vec::new();
        for _ in 0..ms / 100 {
            events.extend(sim.tick(100).events);
        }
        events
    }

    #[test]
    fn test_clock_waits_for_first_placement() {
        let mut sim = Simulation::new(human_vs_human());
        sim.tick(100);
        assert_eq!(sim.game_time(), 0);
        assert_eq!(sim.wall_clock(), 100);
        assert_eq!(sim.remaining_ms(), 10_000);

        sim.place_unit(Side::Player, melee(), Vec2Fixed::from_ints(100, 100))
            .unwrap();
        assert!(sim.is_started());
        sim.tick(100);
        assert_eq!(sim.game_time(), 100);
        assert_eq!(sim.remaining_ms(), 9_900);
    }

    #[test]
    fn test_frame_delta_is_clamped() {
        let mut sim = Simulation::new(human_vs_human());
        sim.start();
        sim.tick(5_000);
        assert_eq!(sim.game_time(), 100);
        assert_eq!(sim.wall_clock(), 100);
    }

    #[test]
    fn test_speed_scales_game_time_only() {
        let mut sim = Simulation::new(human_vs_human());
        sim.start();
        assert_eq!(sim.set_speed(4), 4);
        sim.tick(50);
        assert_eq!(sim.game_time(), 200);
        assert_eq!(sim.wall_clock(), 50);

        assert_eq!(sim.set_speed(0), 1);
        assert_eq!(sim.set_speed(99), 10);
    }

    #[test]
    fn test_passive_gold_consistent_across_speeds() {
        // (speed, frame ms, frames) covering 9000 ms of game time each.
        for (speed, frame, frames) in [(1, 100, 90), (3, 100, 30), (2, 45, 100), (10, 9, 100)] {
            let mut sim = Simulation::new(human_vs_human());
            sim.start();
            sim.set_speed(speed);
            let mut passive = 0;
            for _ in 0..frames {
                for event in sim.tick(frame).events {
                    if let SimEvent::GoldAwarded {
                        side: Side::Player,
                        amount,
                        source: GoldSource::Passive,
                    } = event
                    {
                        passive += amount;
                    }
                }
            }
            assert_eq!(sim.game_time(), 9_000, "speed {speed}");
            assert_eq!(passive, 9, "speed {speed}, frame {frame} ms");
        }
    }

    #[test]
    fn test_phase_cycle() {
        let mut sim = Simulation::new(human_vs_human());
        sim.place_unit(Side::Player, melee(), Vec2Fixed::from_ints(100, 100))
            .unwrap();

        let events = run(&mut sim, 10_000);
        assert_eq!(sim.phase(), Phase::Battle);
        assert!(events.contains(&SimEvent::BattleStarted {
            round: 0,
            deployed: 1
        }));
        // Ten passive payouts on top of the 50 starting gold, minus 15.
        assert_eq!(sim.side(Side::Player).gold, 45);
        assert_eq!(sim.units().len(), 2);

        assert_eq!(
            sim.place_unit(Side::Player, melee(), Vec2Fixed::from_ints(50, 50)),
            Err(GameError::WrongPhase(Phase::Battle))
        );

        // Nothing opposes the lone unit, so it walks to the AI base.
        let mut events = Vec::new();
        for _ in 0..80 {
            events.extend(sim.tick(100).events);
            if sim.phase() == Phase::Build {
                break;
            }
        }
        assert!(events
            .iter()
            .any(|e| matches!(e, SimEvent::BaseBreached { attacker: Side::Player, .. })));
        assert!(events.iter().any(|e| matches!(e, SimEvent::RoundSettled { round: 0, .. })));
        assert_eq!(sim.phase(), Phase::Build);
        assert_eq!(sim.round(), 1);
        assert_eq!(sim.side(Side::Ai).health, 99);
        assert_eq!(sim.remaining_ms(), 10_000);
    }

    #[test]
    fn test_placement_rejections_leave_state_untouched() {
        let mut sim = Simulation::new(human_vs_human());
        let before = sim.state_hash();

        let unknown = UnitKey::new(Archetype::Melee, 9);
        assert!(matches!(
            sim.place_unit(Side::Player, unknown, Vec2Fixed::from_ints(100, 100)),
            Err(GameError::UnknownUnit(_))
        ));
        assert!(matches!(
            sim.place_unit(
                Side::Player,
                UnitKey::new(Archetype::Ranged, 2),
                Vec2Fixed::from_ints(100, 100)
            ),
            Err(GameError::TierLocked { tier: 2, .. })
        ));
        assert_eq!(
            sim.place_unit(Side::Player, melee(), Vec2Fixed::from_ints(500, 100)),
            Err(GameError::OutOfZone)
        );
        assert_eq!(sim.state_hash(), before);
        assert!(!sim.is_started());

        sim.place_unit(Side::Player, melee(), Vec2Fixed::from_ints(100, 100))
            .unwrap();
        assert_eq!(
            sim.place_unit(Side::Player, melee(), Vec2Fixed::from_ints(110, 110)),
            Err(GameError::PlacementTooClose { min_distance: 25 })
        );
        sim.place_unit(Side::Player, melee(), Vec2Fixed::from_ints(100, 125))
            .unwrap();
        sim.place_unit(Side::Player, melee(), Vec2Fixed::from_ints(100, 150))
            .unwrap();
        // 50 - 3 × 15 = 5 gold left.
        assert!(matches!(
            sim.place_unit(Side::Player, melee(), Vec2Fixed::from_ints(100, 175)),
            Err(GameError::InsufficientGold { required: 15, available: 5, .. })
        ));
        assert_eq!(sim.world().count_templates(Side::Player), 3);
    }

    #[test]
    fn test_zone_cap() {
        let mut config = human_vs_human();
        config.max_units_per_zone = 1;
        let mut sim = Simulation::new(config);
        sim.place_unit(Side::Ai, melee(), Vec2Fixed::from_ints(100, 100))
            .unwrap();
        assert_eq!(
            sim.place_unit(Side::Ai, melee(), Vec2Fixed::from_ints(10, 10)),
            Err(GameError::ZoneFull { limit: 1 })
        );
        // The cap is per zone.
        assert!(sim
            .place_unit(Side::Player, melee(), Vec2Fixed::from_ints(10, 10))
            .is_ok());
    }

    #[test]
    fn test_selection() {
        let mut sim = Simulation::new(human_vs_human());
        assert_eq!(
            sim.place_selected(Vec2Fixed::from_ints(100, 100)),
            Err(GameError::NothingSelected)
        );
        assert!(sim
            .select_unit_type(Some(UnitKey::new(Archetype::Healer, 7)))
            .is_err());
        sim.select_unit_type(Some(melee())).unwrap();
        assert_eq!(sim.selected(), Some(melee()));
        assert!(sim.place_selected(Vec2Fixed::from_ints(100, 100)).is_ok());
    }

    #[test]
    fn test_pause_freezes_everything_but_the_wall_clock() {
        let mut sim = Simulation::new(human_vs_human());
        let id = sim
            .place_unit(Side::Player, melee(), Vec2Fixed::from_ints(100, 100))
            .unwrap();
        run(&mut sim, 1_000);
        let ttl = |sim: &Simulation| {
            sim.world()
                .unit(id)
                .map(|u| u.ttl_remaining(sim.wall_clock()))
        };
        let before = (ttl(&sim), sim.game_time(), sim.remaining_ms());

        sim.pause();
        run(&mut sim, 60_000);
        sim.toggle_pause();
        assert!(!sim.is_paused());

        assert_eq!((ttl(&sim), sim.game_time(), sim.remaining_ms()), before);
        assert_eq!(before.0, Some(39_000));
    }

    #[test]
    fn test_templates_expire_on_wall_clock() {
        let mut config = human_vs_human();
        config.build_phase_ms = 1_000_000;
        let mut sim = Simulation::new(config);
        sim.set_speed(10);
        sim.place_unit(Side::Player, melee(), Vec2Fixed::from_ints(100, 100))
            .unwrap();

        // Game time runs ten times faster; the template still lives 40 s.
        let events = run(&mut sim, 39_900);
        assert_eq!(sim.world().count_templates(Side::Player), 1);
        assert!(!events.iter().any(|e| matches!(e, SimEvent::UnitExpired { .. })));
        let events = run(&mut sim, 100);
        assert_eq!(sim.world().count_templates(Side::Player), 0);
        assert!(events.iter().any(|e| matches!(e, SimEvent::UnitExpired { .. })));
    }

    #[test]
    fn test_upgrades_need_a_finished_round() {
        let config = human_vs_human().with_mode(GameMode::leveled());
        let mut sim = Simulation::new(config);
        sim.start();
        assert_eq!(
            sim.upgrade_archetype(Side::Player, Archetype::Melee),
            Err(GameError::UpgradesLocked)
        );

        run(&mut sim, 10_000);
        run(&mut sim, 100);
        assert_eq!(sim.round(), 1);
        let gold = sim.side(Side::Player).gold;
        let cost = sim.upgrade_cost(Side::Player, Archetype::Melee).unwrap();
        assert_eq!(sim.upgrade_archetype(Side::Player, Archetype::Melee), Ok(1));
        assert_eq!(sim.side(Side::Player).gold, gold - cost);
        assert_eq!(
            sim.unit_cost(Side::Player, melee()),
            Some(15 + 2),
            "unit cost grows with level"
        );
    }

    #[test]
    fn test_tier_model_has_no_archetype_upgrades() {
        let mut sim = Simulation::new(human_vs_human());
        assert!(matches!(
            sim.upgrade_archetype(Side::Player, Archetype::Melee),
            Err(GameError::UnsupportedByProgression { .. })
        ));
        assert_eq!(sim.upgrade_cost(Side::Player, Archetype::Melee), None);
    }

    #[test]
    fn test_unlock_and_economy_purchases() {
        let mut config = human_vs_human();
        config.starting_gold = 200;
        let mut sim = Simulation::new(config);

        assert!(matches!(
            sim.unlock_tier(Side::Player, 3),
            Err(GameError::TierLocked { .. })
        ));
        assert_eq!(sim.unlock_tier(Side::Player, 2), Ok(80));
        assert_eq!(sim.unlock_tier(Side::Player, 2), Err(GameError::AlreadyUnlocked(2)));
        assert_eq!(sim.economy_upgrade_cost(Side::Player), 50);
        assert_eq!(sim.upgrade_economy(Side::Player), Ok(1));
        assert_eq!(sim.economy_upgrade_cost(Side::Player), 75);
        assert_eq!(sim.side(Side::Player).gold, 70);
    }

    #[test]
    fn test_game_over_is_terminal() {
        let mut config = human_vs_human();
        config.starting_health = 1;
        let mut sim = Simulation::new(config);
        sim.place_unit(Side::Player, melee(), Vec2Fixed::from_ints(100, 100))
            .unwrap();

        let events = run(&mut sim, 20_000);
        assert!(events.contains(&SimEvent::GameOver {
            winner: Some(Side::Player)
        }));
        assert_eq!(sim.phase(), Phase::Finished);
        assert_eq!(sim.outcome(), Some(Some(Side::Player)));

        let hash = sim.state_hash();
        assert!(sim.tick(100).is_empty());
        assert_eq!(sim.state_hash(), hash);
        assert_eq!(sim.upgrade_economy(Side::Player), Err(GameError::GameOver));
    }

    #[test]
    fn test_freeze_for_restart() {
        let mut config = human_vs_human();
        config.starting_health = 1;
        config.mode.end = EndBehavior::FreezeForRestart;
        let mut sim = Simulation::new(config);
        sim.place_unit(Side::Player, melee(), Vec2Fixed::from_ints(100, 100))
            .unwrap();
        run(&mut sim, 20_000);

        assert!(sim.is_game_over());
        assert!(sim.is_paused());
        assert_eq!(sim.phase(), Phase::Battle);
        sim.resume();
        assert!(sim.is_paused());

        sim.restart();
        assert!(!sim.is_game_over());
        assert!(!sim.is_paused());
        assert_eq!(sim.side(Side::Ai).health, 1);
        assert!(sim.units().is_empty());
        assert_eq!(sim.state_hash(), Simulation::new(sim.config().clone()).state_hash());
    }

    #[test]
    fn test_infinite_mode_never_ends() {
        let mut config = human_vs_human();
        config.starting_health = 1;
        config.mode.infinite = true;
        let mut sim = Simulation::new(config);
        sim.place_unit(Side::Player, melee(), Vec2Fixed::from_ints(100, 100))
            .unwrap();
        run(&mut sim, 20_000);
        assert!(!sim.is_game_over());
        assert_eq!(sim.side(Side::Ai).health, 0);
        assert_ne!(sim.phase(), Phase::Finished);
    }

    #[test]
    fn test_target_lines_follow_toggle() {
        let mut sim = Simulation::new(human_vs_human());
        sim.place_unit(Side::Player, melee(), Vec2Fixed::from_ints(100, 100))
            .unwrap();
        sim.place_unit(Side::Ai, melee(), Vec2Fixed::from_ints(100, 100))
            .unwrap();
        // Past the spawn grace window, before the two meet.
        run(&mut sim, 11_000);
        assert_eq!(sim.phase(), Phase::Battle);
        assert!(sim.target_lines().is_empty());

        sim.set_show_target_lines(true);
        assert!(sim.shows_target_lines());
        let lines = sim.target_lines();
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_computer_sides_buy_units() {
        let config = GameConfig::default()
            .with_seed(7)
            .ai_vs_ai(StrategyKind::Aggressive, StrategyKind::Balanced);
        let mut sim = Simulation::new(config);
        sim.start();
        let events = run(&mut sim, 9_900);
        for side in Side::ALL {
            assert!(
                events
                    .iter()
                    .any(|e| matches!(e, SimEvent::UnitPlaced { side: s, .. } if *s == side)),
                "{side:?} placed nothing"
            );
        }
    }
}
