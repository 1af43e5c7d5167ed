//! Fixed-point math utilities for deterministic simulation.
//!
//! Simulation state never holds floating-point values. World-space
//! positions (used by the presentation layer for interpolation) are
//! computed from cube coordinates with fixed-point arithmetic so that
//! two peers derive bit-identical positions.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// `sqrt(3)` as raw `I32F32` bits.
pub const SQRT_3: Fixed = Fixed::from_bits(7_439_101_574);

/// `sqrt(3) / 2` as raw `I32F32` bits.
pub const SQRT_3_OVER_2: Fixed = Fixed::from_bits(3_719_550_787);

/// `sqrt(3) / 3` as raw `I32F32` bits.
pub const SQRT_3_OVER_3: Fixed = Fixed::from_bits(2_479_700_525);

/// `1 / 3` as raw `I32F32` bits.
pub const ONE_THIRD: Fixed = Fixed::from_bits(1_431_655_765);

/// `2 / 3` as raw `I32F32` bits.
pub const TWO_THIRDS: Fixed = Fixed::from_bits(2_863_311_531);

/// `3 / 2`.
pub const THREE_HALVES: Fixed = Fixed::from_bits(3 << 31);

/// Fixed-point 2D vector in world space (x to the right, y "forward").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde for [`Fixed`] as raw `i64` bits, so values round-trip exactly.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Write the raw bits.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Read the raw bits.
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

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Linearly interpolate between two vectors.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}
