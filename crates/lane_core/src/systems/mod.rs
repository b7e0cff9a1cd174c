//! Simulation systems.
//!
//! Systems are free functions over the [`World`](crate::world::World) or a
//! unit slice. They hold no state of their own and use fixed-point math
//! throughout so a seed fully determines a match.

pub mod combat;
pub mod movement;
pub mod projectiles;
