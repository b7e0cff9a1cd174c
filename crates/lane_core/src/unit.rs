//! The unit entity: resolved stats plus lifecycle state.
//!
//! A unit is either an inert build-zone template (subject to expiry) or an
//! active battle unit. Templates are never moved onto the battlefield;
//! deployment constructs a fresh battle unit from the same definition.
//!
//! Two clocks are involved:
//! - the **game clock** (scaled by speed, frozen while paused) drives
//!   cooldowns, invulnerability and stuck sampling;
//! - the **wall clock** (raw frame time) drives template expiry, minus the
//!   time spent paused.

use std::hash::{Hash, Hasher};

use crate::behavior::{behavior_for, Behavior};
use crate::components::{Archetype, Placement, Side, UnitId, UnitKey};
use crate::data::{Battlefield, StuckConfig};
use crate::math::{step_distance, Fixed, Vec2Fixed};
use crate::progression::ResolvedStats;
use crate::rng::GameRng;

/// Result of applying damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DamageOutcome {
    /// Hp actually removed.
    pub dealt: u32,
    /// This hit took the unit from alive to dead.
    pub killed: bool,
}

/// Movement sampling for stuck detection.
#[derive(Debug, Clone, Copy, Default)]
struct StuckTracker {
    last_position: Option<Vec2Fixed>,
    last_sample: u64,
    counter: u32,
}

/// A unit in a build zone or on the battlefield.
#[derive(Debug, Clone)]
pub struct Unit {
    /// Unique id.
    pub id: UnitId,
    /// Owner.
    pub side: Side,
    /// Definition this unit was built from.
    pub key: UnitKey,
    /// Build zone or battlefield.
    pub placement: Placement,
    /// Zone-local position for templates, battlefield position otherwise.
    pub position: Vec2Fixed,
    /// Current hp, always within `0..=stats.max_hp`.
    pub hp: u32,
    /// Stats resolved at construction.
    pub stats: ResolvedStats,
    /// Wall-clock creation time.
    pub created_at: u64,
    /// Game time the unit entered the battlefield; `None` for templates.
    pub spawn_time: Option<u64>,
    /// Template lifetime in wall-clock milliseconds.
    pub expiration_ms: u64,
    /// Game time of the last attack or heal; `None` if it never acted.
    pub last_attack_time: Option<u64>,
    /// Cached target, revalidated every tick.
    pub target: Option<UnitId>,
    /// Set once when hp reaches zero; never cleared.
    pub is_dead: bool,
    invulnerable_until: Option<u64>,
    paused_ms: u64,
    pause_started: Option<u64>,
    stuck: StuckTracker,
    behavior: &'static dyn Behavior,
}

impl Unit {
    fn with_placement(
        id: UnitId,
        key: UnitKey,
        side: Side,
        stats: ResolvedStats,
        position: Vec2Fixed,
        placement: Placement,
    ) -> Self {
        Self {
            id,
            side,
            key,
            placement,
            position,
            hp: stats.max_hp,
            stats,
            created_at: 0,
            spawn_time: None,
            expiration_ms: 0,
            last_attack_time: None,
            target: None,
            is_dead: false,
            invulnerable_until: None,
            paused_ms: 0,
            pause_started: None,
            stuck: StuckTracker::default(),
            behavior: behavior_for(key.archetype),
        }
    }

    /// A build-zone template at zone-local `position`.
    #[must_use]
    pub fn template(
        id: UnitId,
        key: UnitKey,
        side: Side,
        stats: ResolvedStats,
        position: Vec2Fixed,
        wall_now: u64,
        ttl_ms: u64,
    ) -> Self {
        let mut unit = Self::with_placement(id, key, side, stats, position, Placement::BuildZone);
        unit.created_at = wall_now;
        unit.expiration_ms = ttl_ms;
        unit
    }

    /// A battle unit spawned at `position` at game time `now`.
    #[must_use]
    pub fn battle(
        id: UnitId,
        key: UnitKey,
        side: Side,
        stats: ResolvedStats,
        position: Vec2Fixed,
        now: u64,
        invulnerability_ms: u64,
    ) -> Self {
        let mut unit = Self::with_placement(id, key, side, stats, position, Placement::Battlefield);
        unit.spawn_time = Some(now);
        unit.invulnerable_until = Some(now + invulnerability_ms);
        unit.stuck.last_sample = now;
        unit
    }

    /// Archetype shortcut.
    #[must_use]
    pub const fn archetype(&self) -> Archetype {
        self.key.archetype
    }

    /// Strategy resolved at construction.
    #[must_use]
    pub fn behavior(&self) -> &'static dyn Behavior {
        self.behavior
    }

    /// Not dead.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !self.is_dead
    }

    /// Alive and on the battlefield.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.is_dead && self.placement == Placement::Battlefield
    }

    /// On the battlefield, dead or alive.
    #[must_use]
    pub fn is_battle_unit(&self) -> bool {
        self.placement == Placement::Battlefield
    }

    /// Below maximum hp and alive.
    #[must_use]
    pub fn is_wounded(&self) -> bool {
        self.is_alive() && self.hp < self.stats.max_hp
    }

    // ========================================================================
    // Health
    // ========================================================================

    /// Subtract hp. Damage to a dead unit does nothing.
    pub fn take_damage(&mut self, amount: u32) -> DamageOutcome {
        if self.is_dead {
            return DamageOutcome::default();
        }
        let dealt = amount.min(self.hp);
        self.hp -= dealt;
        let killed = self.hp == 0;
        if killed {
            self.is_dead = true;
        }
        DamageOutcome { dealt, killed }
    }

    /// Add hp up to the maximum. Returns the hp restored.
    pub fn heal(&mut self, amount: u32) -> u32 {
        if self.is_dead {
            return 0;
        }
        let healed = amount.min(self.stats.max_hp - self.hp);
        self.hp += healed;
        healed
    }

    /// Remove the unit without a killer (base breach, settlement).
    pub fn remove(&mut self) {
        self.hp = 0;
        self.is_dead = true;
    }

    /// Replace stats, keeping the same hp fraction.
    pub fn rescale(&mut self, stats: ResolvedStats) {
        let fraction_hp =
            u64::from(self.hp) * u64::from(stats.max_hp) / u64::from(self.stats.max_hp.max(1));
        self.hp = u32::try_from(fraction_hp)
            .unwrap_or(stats.max_hp)
            .min(stats.max_hp);
        if self.is_alive() {
            self.hp = self.hp.max(1);
        }
        self.stats = stats;
    }

    // ========================================================================
    // Combat timing
    // ========================================================================

    /// Cooldown elapsed (or never attacked).
    #[must_use]
    pub fn can_attack(&self, now: u64) -> bool {
        self.last_attack_time
            .map_or(true, |last| now.saturating_sub(last) >= self.stats.attack_cooldown_ms)
    }

    /// Record an attack at `now`.
    pub fn attack(&mut self, now: u64) {
        self.last_attack_time = Some(now);
    }

    /// Within the post-spawn grace window. Templates are never invulnerable.
    #[must_use]
    pub fn is_invulnerable(&self, now: u64) -> bool {
        self.invulnerable_until.is_some_and(|until| now < until)
    }

    // ========================================================================
    // Expiry
    // ========================================================================

    /// Wall-clock milliseconds of lifetime used, excluding pauses.
    #[must_use]
    pub fn age_ms(&self, wall_now: u64) -> u64 {
        let end = self.pause_started.unwrap_or(wall_now);
        end.saturating_sub(self.created_at)
            .saturating_sub(self.paused_ms)
    }

    /// Template lifetime left.
    #[must_use]
    pub fn ttl_remaining(&self, wall_now: u64) -> u64 {
        self.expiration_ms.saturating_sub(self.age_ms(wall_now))
    }

    /// Template lifetime used up.
    #[must_use]
    pub fn is_expired(&self, wall_now: u64) -> bool {
        self.placement == Placement::BuildZone && self.ttl_remaining(wall_now) == 0
    }

    /// Start excluding wall-clock time from the lifetime.
    pub fn begin_pause(&mut self, wall_now: u64) {
        if self.pause_started.is_none() {
            self.pause_started = Some(wall_now);
        }
    }

    /// Stop excluding wall-clock time.
    pub fn end_pause(&mut self, wall_now: u64) {
        if let Some(start) = self.pause_started.take() {
            self.paused_ms += wall_now.saturating_sub(start);
        }
    }

    // ========================================================================
    // Stuck handling
    // ========================================================================

    /// Sample movement and report whether the unit has been stationary for
    /// enough consecutive samples. Units that attacked recently are busy,
    /// not stuck.
    pub fn check_if_stuck(&mut self, now: u64, config: &StuckConfig) -> bool {
        if self
            .last_attack_time
            .is_some_and(|last| now.saturating_sub(last) < config.attack_grace_ms)
        {
            self.stuck.counter = 0;
            self.stuck.last_position = Some(self.position);
            self.stuck.last_sample = now;
            return false;
        }

        let Some(last_position) = self.stuck.last_position else {
            self.stuck.last_position = Some(self.position);
            self.stuck.last_sample = now;
            return false;
        };

        if now.saturating_sub(self.stuck.last_sample) < config.sample_interval_ms {
            return false;
        }

        let min_move = Fixed::from_num(config.min_movement);
        if last_position.distance_squared(self.position) < min_move * min_move {
            self.stuck.counter += 1;
        } else {
            self.stuck.counter = 0;
        }
        self.stuck.last_position = Some(self.position);
        self.stuck.last_sample = now;

        self.stuck.counter >= config.samples
    }

    /// Nudge target `nudge_distance` away in a random direction, y kept
    /// inside the lane band.
    #[must_use]
    pub fn unstuck_position(
        &self,
        rng: &mut GameRng,
        config: &StuckConfig,
        field: &Battlefield,
    ) -> Vec2Fixed {
        let nudge = rng.unit_vector().scale(Fixed::from_num(config.nudge_distance));
        let moved = self.position + nudge;
        Vec2Fixed::new(moved.x, field.clamp_lane_y(moved.y))
    }

    /// Move to a nudge target and restart stuck sampling from there.
    pub fn apply_unstuck(&mut self, position: Vec2Fixed) {
        self.position = position;
        self.stuck.counter = 0;
        self.stuck.last_position = Some(self.position);
    }

    /// Distance this unit covers in `dt_ms`.
    #[must_use]
    pub fn step(&self, dt_ms: u64) -> Fixed {
        step_distance(self.stats.speed, dt_ms)
    }

    /// Feed the deterministic parts of this unit into a hasher.
    pub fn hash_state<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.side.hash(state);
        self.key.hash(state);
        self.position.hash(state);
        self.hp.hash(state);
        self.is_dead.hash(state);
        self.last_attack_time.hash(state);
        self.target.hash(state);
    }
}
