//! Planar geometry kernel: noding, topology, overlay and relate.
//!
//! Geometries are loaded into an [`topology::EditShape`], noded with the
//! crack-and-cluster loop in [`noding`], turned into a
//! [`topology::TopoGraph`], and read back out by the operators in
//! [`operators`]. Operators are created from an explicit
//! [`operators::OperatorContext`] and exchange geometries through the
//! pull-based [`cursor::GeometryCursor`] protocol.

pub mod accel;
pub mod config;
pub mod cursor;
pub mod error;
pub mod geometry;
pub mod noding;
pub mod operators;
pub mod progress;
pub mod tolerance;
pub mod topology;

// Re-export the types most callers need at crate root.
pub use config::{AccelerationDegree, KernelConfig};
pub use cursor::{GeometryCursor, SimpleGeometryCursor};
pub use error::{KernelError, KernelResult};
pub use geometry::{Envelope2D, Geometry, GeometryType, Point2d, SpatialReference};
pub use operators::{Operator, OperatorContext, OperatorKind, RelationMatrix};
pub use progress::ProgressTracker;
