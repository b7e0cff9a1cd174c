//! Read-only query façade handed to behaviors each tick.

use crate::components::{Side, UnitId};
use crate::data::Battlefield;
use crate::unit::Unit;

/// Snapshot view over the unit registry for one decision.
///
/// Only active (alive, on-battlefield) units are ever returned.
#[derive(Debug, Clone, Copy)]
pub struct BattleContext<'a> {
    units: &'a [Unit],
    field: &'a Battlefield,
    now: u64,
}

impl<'a> BattleContext<'a> {
    /// Create a view at game time `now`.
    #[must_use]
    pub const fn new(units: &'a [Unit], field: &'a Battlefield, now: u64) -> Self {
        Self { units, field, now }
    }

    /// Current game time.
    #[must_use]
    pub const fn now(&self) -> u64 {
        self.now
    }

    /// Battlefield geometry.
    #[must_use]
    pub const fn field(&self) -> &'a Battlefield {
        self.field
    }

    /// All active battle units.
    pub fn battle_units(&self) -> impl Iterator<Item = &'a Unit> + 'a {
        self.units.iter().filter(|u| u.is_active())
    }

    /// Active units fighting against `side`.
    pub fn enemies_of(&self, side: Side) -> impl Iterator<Item = &'a Unit> + 'a {
        self.battle_units().filter(move |u| u.side != side)
    }

    /// Active units fighting for `side`.
    pub fn allies_of(&self, side: Side) -> impl Iterator<Item = &'a Unit> + 'a {
        self.battle_units().filter(move |u| u.side == side)
    }

    /// Active unit by id.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&'a Unit> {
        self.battle_units().find(|u| u.id == id)
    }
}
