use serde::{Deserialize, Serialize};

/// Attribute channels a vertex may carry beyond its planar position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Semantics {
    Z,
    M,
}

impl Semantics {
    const fn bit(self) -> u8 {
        match self {
            Semantics::Z => 0b01,
            Semantics::M => 0b10,
        }
    }

    pub fn default_value(self) -> f64 {
        match self {
            Semantics::Z => 0.0,
            Semantics::M => f64::NAN,
        }
    }
}

/// Which attribute channels a geometry's vertices carry.
///
/// The key space is a two-bit set, so descriptions are plain values and
/// compare by bits; the four layouts are available as constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct VertexDescription {
    bits: u8,
}

impl VertexDescription {
    pub const XY: Self = Self { bits: 0 };
    pub const XYZ: Self = Self { bits: 0b01 };
    pub const XYM: Self = Self { bits: 0b10 };
    pub const XYZM: Self = Self { bits: 0b11 };

    pub fn has(&self, semantics: Semantics) -> bool {
        self.bits & semantics.bit() != 0
    }

    pub fn with(self, semantics: Semantics) -> Self {
        Self {
            bits: self.bits | semantics.bit(),
        }
    }

    pub fn without(self, semantics: Semantics) -> Self {
        Self {
            bits: self.bits & !semantics.bit(),
        }
    }

    /// Union of the channels of both descriptions.
    pub fn merge(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Number of f64 components per vertex, position included.
    pub fn component_count(&self) -> usize {
        2 + self.bits.count_ones() as usize
    }

    pub fn semantics(&self) -> impl Iterator<Item = Semantics> + '_ {
        [Semantics::Z, Semantics::M]
            .into_iter()
            .filter(move |s| self.has(*s))
    }
}
