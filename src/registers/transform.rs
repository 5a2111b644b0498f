//! Value transforms: raw fact value -> integer register value
//!
//! Encoding is `transform -> rounding policy -> saturate to register width`.
//! Every step is a pure function of its input.

use serde::{Deserialize, Serialize};

/// Integer value held by one register
pub type RegisterValue = i64;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "factor", rename_all = "snake_case")]
pub enum Transform {
    Identity,
    Scale(f64),
}

impl Transform {
    /// `Scale(1.0)` collapses to `Identity`
    pub fn from_factor(factor: Option<f64>) -> Self {
        match factor {
            None => Transform::Identity,
            Some(f) if f == 1.0 => Transform::Identity,
            Some(f) => Transform::Scale(f),
        }
    }

    pub fn apply(self, raw: f64) -> f64 {
        match self {
            Transform::Identity => raw,
            Transform::Scale(factor) => raw * factor,
        }
    }

    pub fn factor(self) -> f64 {
        match self {
            Transform::Identity => 1.0,
            Transform::Scale(factor) => factor,
        }
    }
}

/// How a fractional value becomes an integer register value
///
/// `Truncate` rounds toward zero (`8.55 -> 8`, `-8.55 -> -8`), which is what
/// plain integer casts do. `HalfEven` rounds to nearest with ties to even
/// (`85.5 -> 86`, `84.5 -> 84`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingPolicy {
    #[default]
    Truncate,
    HalfEven,
}

impl RoundingPolicy {
    pub fn round(self, value: f64) -> f64 {
        match self {
            RoundingPolicy::Truncate => value.trunc(),
            RoundingPolicy::HalfEven => value.round_ties_even(),
        }
    }
}

/// Signed two's-complement register width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterWidth {
    bits: u8,
}

impl RegisterWidth {
    pub const MIN_BITS: u8 = 2;
    pub const MAX_BITS: u8 = 32;

    pub fn new(bits: u8) -> Option<Self> {
        (Self::MIN_BITS..=Self::MAX_BITS)
            .contains(&bits)
            .then_some(Self { bits })
    }

    pub fn bits(self) -> u8 {
        self.bits
    }

    pub fn min(self) -> RegisterValue {
        -(1i64 << (self.bits - 1))
    }

    pub fn max(self) -> RegisterValue {
        (1i64 << (self.bits - 1)) - 1
    }

    pub fn contains(self, value: RegisterValue) -> bool {
        (self.min()..=self.max()).contains(&value)
    }

    /// Clamp an already-rounded value into range
    pub fn saturate(self, value: f64) -> RegisterValue {
        if value <= self.min() as f64 {
            self.min()
        } else if value >= self.max() as f64 {
            self.max()
        } else {
            value as RegisterValue
        }
    }
}

impl Default for RegisterWidth {
    fn default() -> Self {
        Self { bits: 16 }
    }
}

/// Encodes raw fact values into register values
#[derive(Debug, Clone, Copy)]
pub struct ValueEncoder {
    pub rounding: RoundingPolicy,
    pub width: RegisterWidth,
    /// Written for missing facts and non-finite values
    pub default_value: RegisterValue,
}

impl ValueEncoder {
    pub fn encode(&self, transform: Transform, raw: Option<f64>) -> RegisterValue {
        let Some(raw) = raw else {
            return self.default_value;
        };

        let scaled = transform.apply(raw);
        if !scaled.is_finite() {
            return self.default_value;
        }

        self.width.saturate(self.rounding.round(scaled))
    }
}

impl Default for ValueEncoder {
    fn default() -> Self {
        Self {
            rounding: RoundingPolicy::Truncate,
            width: RegisterWidth::default(),
            default_value: 0,
        }
    }
}
