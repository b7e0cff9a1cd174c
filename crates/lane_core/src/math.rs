//! Fixed-point math utilities for deterministic simulation.
//!
//! Positions, speeds and ranges are fixed-point so that two runs with the
//! same seed and the same frame deltas produce bit-identical battles.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Fixed-point 2D vector. `x` runs along the lane, `y` across it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from whole-pixel coordinates.
    #[must_use]
    pub fn from_ints(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        fixed_sqrt(self.distance_squared(other))
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x * other.x + self.y * other.y
    }

    /// Vector length.
    #[must_use]
    pub fn length(self) -> Fixed {
        fixed_sqrt(self.dot(self))
    }

    /// Multiply both components by a scalar.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Normalize vector using fixed-point math. Zero stays zero.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == Fixed::ZERO {
            return Self::ZERO;
        }

        Self::new(self.x / len, self.y / len)
    }
}

/// Computes the square root of a fixed-point number using binary search.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::ONE { value } else { Fixed::ONE };

    // 64 halvings exhaust the I32F32 resolution for any representable input.
    for _ in 0..64 {
        let mid = low + (high - low) / 2;
        if mid == low {
            break;
        }
        if mid.saturating_mul(mid) <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

/// Closest point to `point` on the segment `start..end`.
#[must_use]
pub fn closest_point_on_segment(start: Vec2Fixed, end: Vec2Fixed, point: Vec2Fixed) -> Vec2Fixed {
    let seg = end - start;
    let len_sq = seg.dot(seg);
    if len_sq == Fixed::ZERO {
        return start;
    }

    let t = ((point - start).dot(seg) / len_sq).clamp(Fixed::ZERO, Fixed::ONE);
    start + seg.scale(t)
}

/// Squared distance from `point` to the segment `start..end`.
#[must_use]
pub fn segment_distance_squared(start: Vec2Fixed, end: Vec2Fixed, point: Vec2Fixed) -> Fixed {
    closest_point_on_segment(start, end, point).distance_squared(point)
}

/// `percent / 100` as a fixed-point multiplier.
#[must_use]
pub fn percent(value: u32) -> Fixed {
    Fixed::from_num(value) / 100
}

/// Round a non-negative fixed-point value to the nearest integer.
///
/// Negative inputs clamp to zero, halves round up.
#[must_use]
pub fn round_to_u32(value: Fixed) -> u32 {
    if value <= Fixed::ZERO {
        return 0;
    }
    value.saturating_add(Fixed::from_bits(1 << 31)).floor().saturating_to_num::<u32>()
}

/// Distance covered at `speed` pixels per second over `dt_ms` milliseconds.
#[must_use]
pub fn step_distance(speed: Fixed, dt_ms: u64) -> Fixed {
    speed * Fixed::from_num(dt_ms) / 1000
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}
