//! Shared planar structures: the multi-geometry edit shape and the
//! topology graph built from it after noding.

pub mod classify;
pub mod edit_shape;
pub mod topo_graph;

pub use classify::Location;
pub use edit_shape::{EditEdge, EditShape, EditShapeAudit, GeometryId, PathId, VertexId};
pub use topo_graph::{TopoEdge, TopoFace, TopoGraph, TopoNode, MAX_OPERANDS, UNBOUNDED_FACE};
