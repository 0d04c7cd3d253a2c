//! The DE-9IM relation matrix and pattern matching.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{KernelError, KernelResult};
use crate::topology::classify::Location;

/// Dimension value of an empty intersection.
pub const EMPTY: i8 = -1;

const LOCATIONS: [Location; 3] = [Location::Interior, Location::Boundary, Location::Exterior];

/// Intersection dimensions between the interior, boundary and exterior of
/// two geometries. Rows belong to the first geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationMatrix {
    cells: [[i8; 3]; 3],
}

impl Default for RelationMatrix {
    fn default() -> Self {
        Self {
            cells: [[EMPTY; 3]; 3],
        }
    }
}

impl RelationMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, a: Location, b: Location) -> i8 {
        self.cells[a.index()][b.index()]
    }

    /// Raise a cell to `dimension` if it is lower.
    pub fn set_max(&mut self, a: Location, b: Location, dimension: i8) {
        let cell = &mut self.cells[a.index()][b.index()];
        *cell = (*cell).max(dimension);
    }

    pub fn transpose(&self) -> Self {
        let mut out = Self::default();
        for a in LOCATIONS {
            for b in LOCATIONS {
                out.cells[b.index()][a.index()] = self.get(a, b);
            }
        }
        out
    }

    /// Check that `pattern` has nine characters from `012TF*`.
    pub fn validate_pattern(pattern: &str) -> KernelResult<()> {
        let count = pattern.chars().count();
        if count != 9 {
            return Err(KernelError::invalid_argument(format!(
                "relation pattern must have 9 characters, got {count}"
            )));
        }
        let invalid = pattern
            .chars()
            .find(|c| !matches!(c.to_ascii_uppercase(), '0'..='2' | 'T' | 'F' | '*'));
        match invalid {
            Some(c) => Err(KernelError::invalid_argument(format!(
                "relation pattern contains invalid character {c:?}"
            ))),
            None => Ok(()),
        }
    }

    pub fn matches(&self, pattern: &str) -> KernelResult<bool> {
        Self::validate_pattern(pattern)?;
        Ok(self
            .cells
            .iter()
            .flatten()
            .zip(pattern.chars())
            .all(|(&dim, c)| cell_matches(dim, c)))
    }

    fn is(&self, a: Location, b: Location) -> bool {
        self.get(a, b) != EMPTY
    }

    pub fn is_disjoint(&self) -> bool {
        use Location::{Boundary, Interior};
        !self.is(Interior, Interior)
            && !self.is(Interior, Boundary)
            && !self.is(Boundary, Interior)
            && !self.is(Boundary, Boundary)
    }

    pub fn intersects(&self) -> bool {
        !self.is_disjoint()
    }

    pub fn touches(&self) -> bool {
        use Location::{Boundary, Interior};
        !self.is(Interior, Interior)
            && (self.is(Interior, Boundary)
                || self.is(Boundary, Interior)
                || self.is(Boundary, Boundary))
    }

    /// Requires the operand dimensions, as the crossing rule depends on them.
    pub fn crosses(&self, dim_a: i32, dim_b: i32) -> bool {
        use Location::{Exterior, Interior};
        match dim_a.cmp(&dim_b) {
            Ordering::Less => self.is(Interior, Interior) && self.is(Interior, Exterior),
            Ordering::Greater => self.is(Interior, Interior) && self.is(Exterior, Interior),
            Ordering::Equal => dim_a == 1 && self.get(Interior, Interior) == 0,
        }
    }

    pub fn within(&self) -> bool {
        use Location::{Boundary, Exterior, Interior};
        self.is(Interior, Interior) && !self.is(Interior, Exterior) && !self.is(Boundary, Exterior)
    }

    pub fn contains(&self) -> bool {
        self.transpose().within()
    }

    pub fn overlaps(&self, dim_a: i32, dim_b: i32) -> bool {
        use Location::{Exterior, Interior};
        if dim_a != dim_b {
            return false;
        }
        let interiors = match dim_a {
            1 => self.get(Interior, Interior) == 1,
            _ => self.is(Interior, Interior),
        };
        interiors && self.is(Interior, Exterior) && self.is(Exterior, Interior)
    }

    pub fn equals(&self) -> bool {
        use Location::{Boundary, Exterior, Interior};
        self.is(Interior, Interior)
            && !self.is(Interior, Exterior)
            && !self.is(Boundary, Exterior)
            && !self.is(Exterior, Interior)
            && !self.is(Exterior, Boundary)
    }
}

fn cell_matches(dim: i8, c: char) -> bool {
    match c.to_ascii_uppercase() {
        '*' => true,
        'T' => dim >= 0,
        'F' => dim == EMPTY,
        d => d.to_digit(10).is_some_and(|d| i8::try_from(d) == Ok(dim)),
    }
}

impl fmt::Display for RelationMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &dim in self.cells.iter().flatten() {
            match dim {
                EMPTY => f.write_str("F")?,
                d => write!(f, "{d}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Location::{Boundary, Exterior, Interior};

    /// Two overlapping squares.
    fn overlapping() -> RelationMatrix {
        let mut m = RelationMatrix::new();
        for a in LOCATIONS {
            for b in LOCATIONS {
                let dim = if a == Boundary && b == Boundary {
                    0
                } else if a == Boundary || b == Boundary {
                    1
                } else {
                    2
                };
                m.set_max(a, b, dim);
            }
        }
        m
    }

    #[test]
    fn test_display_and_match() {
        let m = overlapping();
        assert_eq!(m.to_string(), "212101212");
        assert!(m.matches("T*T***T**").unwrap());
        assert!(m.matches("2121f1212").is_ok_and(|ok| !ok));
        assert!(m.matches("t********").unwrap());
        assert!(m.overlaps(2, 2));
        assert!(!m.within());
        assert!(m.intersects());
    }

    #[test]
    fn test_pattern_validation() {
        assert!(RelationMatrix::validate_pattern("T*F**F***").is_ok());
        assert!(RelationMatrix::validate_pattern("T*F**F**").is_err());
        assert!(RelationMatrix::validate_pattern("T*F**F**X").is_err());
        assert!(RelationMatrix::new().matches("3********").is_err());
    }

    #[test]
    fn test_set_max_keeps_highest() {
        let mut m = RelationMatrix::new();
        m.set_max(Interior, Exterior, 1);
        m.set_max(Interior, Exterior, 0);
        assert_eq!(m.get(Interior, Exterior), 1);
        assert_eq!(m.transpose().get(Exterior, Interior), 1);
        assert!(m.is_disjoint());
    }

    #[test]
    fn test_within_and_contains() {
        let mut m = RelationMatrix::new();
        m.set_max(Interior, Interior, 2);
        m.set_max(Exterior, Interior, 2);
        m.set_max(Exterior, Boundary, 1);
        m.set_max(Exterior, Exterior, 2);
        assert!(m.within());
        assert!(!m.contains());
        assert!(m.transpose().contains());
        assert!(!m.equals());
    }
}
