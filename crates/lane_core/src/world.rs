//! Mutable match state shared by every system.

use std::hash::{Hash, Hasher};

use crate::components::{Placement, ProjectileId, Side, UnitId};
use crate::data::GameConfig;
use crate::economy::Sides;
use crate::events::SimEvent;
use crate::projectile::Projectile;
use crate::rng::GameRng;
use crate::unit::Unit;

/// Unit and projectile registries plus both sides' economies.
///
/// Units are kept in ascending id order (ids are allocated monotonically
/// and units are only ever appended), which is also the processing order.
#[derive(Debug, Clone)]
pub struct World {
    /// Templates and battle units.
    pub units: Vec<Unit>,
    /// Projectiles in flight.
    pub projectiles: Vec<Projectile>,
    /// Gold, core health and progression state.
    pub sides: Sides,
    /// Scaled simulation clock in milliseconds.
    pub game_time: u64,
    /// Unscaled frame clock in milliseconds.
    pub wall_clock: u64,
    /// Seeded random source.
    pub rng: GameRng,
    /// Events emitted since the last drain.
    pub events: Vec<SimEvent>,
    next_unit: u64,
    next_projectile: u64,
}

impl World {
    /// Empty world for a fresh match.
    #[must_use]
    pub fn new(config: &GameConfig) -> Self {
        Self {
            units: Vec::new(),
            projectiles: Vec::new(),
            sides: Sides::new(config),
            game_time: 0,
            wall_clock: 0,
            rng: GameRng::from_seed(config.seed),
            events: Vec::new(),
            next_unit: 1,
            next_projectile: 1,
        }
    }

    /// Allocate a unit id.
    pub fn next_unit_id(&mut self) -> UnitId {
        let id = UnitId(self.next_unit);
        self.next_unit += 1;
        id
    }

    /// Allocate a projectile id.
    pub fn next_projectile_id(&mut self) -> ProjectileId {
        let id = ProjectileId(self.next_projectile);
        self.next_projectile += 1;
        id
    }

    /// Add a unit. Its id must come from [`Self::next_unit_id`].
    pub fn spawn(&mut self, unit: Unit) {
        debug_assert!(self.units.last().map_or(true, |last| last.id < unit.id));
        self.units.push(unit);
    }

    /// Registry index of a unit.
    #[must_use]
    pub fn index_of(&self, id: UnitId) -> Option<usize> {
        self.units.binary_search_by_key(&id, |u| u.id).ok()
    }

    /// Unit by id, dead or alive.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.index_of(id).map(|i| &self.units[i])
    }

    /// Mutable unit by id.
    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.index_of(id).map(move |i| &mut self.units[i])
    }

    /// Live templates in a side's build zone.
    pub fn templates(&self, side: Side) -> impl Iterator<Item = &Unit> + '_ {
        self.units
            .iter()
            .filter(move |u| u.side == side && u.is_alive() && u.placement == Placement::BuildZone)
    }

    /// Live template count for a side.
    #[must_use]
    pub fn count_templates(&self, side: Side) -> usize {
        self.templates(side).count()
    }

    /// Active battle units of a side.
    pub fn battle_units(&self, side: Side) -> impl Iterator<Item = &Unit> + '_ {
        self.units
            .iter()
            .filter(move |u| u.side == side && u.is_active())
    }

    /// Drop dead units and spent projectiles from the registries.
    pub fn remove_dead(&mut self) -> usize {
        let before = self.units.len();
        self.units.retain(Unit::is_alive);
        self.projectiles.retain(Projectile::is_active);
        before - self.units.len()
    }

    /// Remove every battle unit and projectile; templates stay.
    pub fn clear_battlefield(&mut self) {
        self.units.retain(|u| !u.is_battle_unit());
        self.projectiles.clear();
    }

    /// Hash everything that determines future behavior.
    pub fn hash_state<H: Hasher>(&self, state: &mut H) {
        self.game_time.hash(state);
        self.sides.hash(state);
        self.units.len().hash(state);
        for unit in &self.units {
            unit.hash_state(state);
        }
        self.projectiles.len().hash(state);
        for projectile in &self.projectiles {
            projectile.hash_state(state);
        }
    }
}
