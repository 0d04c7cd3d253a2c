use serde::{Deserialize, Serialize};

/// The parts of a spatial reference the kernel consumes.
///
/// Only the well-known id and the xy tolerance are carried; projection
/// metadata and its text forms live outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialReference {
    pub wkid: Option<i32>,
    pub xy_tolerance: f64,
}

impl SpatialReference {
    pub fn new(wkid: i32, xy_tolerance: f64) -> Self {
        Self {
            wkid: Some(wkid),
            xy_tolerance,
        }
    }

    /// A reference without an id that only supplies a tolerance.
    pub fn with_tolerance(xy_tolerance: f64) -> Self {
        Self {
            wkid: None,
            xy_tolerance,
        }
    }
}
