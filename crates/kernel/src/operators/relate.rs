//! DE-9IM relate.
//!
//! The matrix normally comes from a joint overlay of both operands: every
//! face, edge and node of the topology graph is located against each operand
//! and raises the matching cell to its dimension. Two shortcuts avoid the
//! overlay. Operands whose envelopes are apart get the analytic disjoint
//! matrix. When both operands have cached accelerators and their boundaries
//! stay apart, each ring or path lies wholly inside or outside the other
//! operand, and the matrix follows from one point location per component.

use std::sync::Arc;

use tracing::{debug, instrument};

use super::boundary::odd_endpoints;
use super::overlay::overlay_graph;
use super::relation_matrix::RelationMatrix;
use crate::accel::{self, AcceleratorCache, Accelerators, RasterHit};
use crate::config::KernelConfig;
use crate::error::KernelResult;
use crate::geometry::segment::segment_distance;
use crate::geometry::{Envelope2D, Geometry, MultiPath, Point2d, SpatialReference};
use crate::noding::NodingMode;
use crate::progress::{ProgressTicker, ProgressTracker};
use crate::tolerance::operation_tolerance;
use crate::topology::classify::Location::{self, Boundary, Exterior, Interior};

#[derive(Debug, Clone)]
pub struct RelateOperator {
    config: KernelConfig,
    cache: Arc<AcceleratorCache>,
}

impl RelateOperator {
    pub fn new(config: KernelConfig, cache: Arc<AcceleratorCache>) -> Self {
        Self { config, cache }
    }

    /// Whether the relation matrix of `a` and `b` matches `pattern`.
    pub fn execute(
        &self,
        a: &Geometry,
        b: &Geometry,
        sr: Option<&SpatialReference>,
        pattern: &str,
        tracker: Option<&dyn ProgressTracker>,
    ) -> KernelResult<bool> {
        RelationMatrix::validate_pattern(pattern)?;
        self.relation_matrix(a, b, sr, tracker)?.matches(pattern)
    }

    #[instrument(skip_all, fields(a = ?a.geometry_type(), b = ?b.geometry_type()))]
    pub fn relation_matrix(
        &self,
        a: &Geometry,
        b: &Geometry,
        sr: Option<&SpatialReference>,
        tracker: Option<&dyn ProgressTracker>,
    ) -> KernelResult<RelationMatrix> {
        let tol = operation_tolerance(sr, [a, b]);
        if a.is_empty()
            || b.is_empty()
            || a.envelope_2d().distance_to_envelope(&b.envelope_2d()) > tol
        {
            debug!("operands disjoint by envelope");
            return Ok(disjoint_matrix(a, b));
        }
        if let (Some(acc_a), Some(acc_b)) =
            (accel::lookup(&self.cache, a), accel::lookup(&self.cache, b))
        {
            if let Some(m) = self.accelerated_matrix(a, &acc_a, b, &acc_b, tol, tracker)? {
                debug!(matrix = %m, "relate answered from accelerators");
                return Ok(m);
            }
        }
        let mode = NodingMode::AllIntersections;
        let graph = overlay_graph(&[a, b], tol, mode, &self.config, tracker)?;
        let mut m = RelationMatrix::new();
        for (f, face) in graph.faces().iter().enumerate() {
            if face.area > 0.0 {
                m.set_max(graph.face_location(f, 0), graph.face_location(f, 1), 2);
            }
        }
        for e in 0..graph.edges().len() {
            m.set_max(graph.edge_location(e, 0), graph.edge_location(e, 1), 1);
        }
        for n in 0..graph.nodes().len() {
            m.set_max(graph.node_location(n, 0), graph.node_location(n, 1), 0);
        }
        debug!(matrix = %m, "relate answered from overlay");
        Ok(m)
    }

    /// `None` when the boundaries interact and the overlay is needed.
    fn accelerated_matrix(
        &self,
        a: &Geometry,
        acc_a: &Accelerators,
        b: &Geometry,
        acc_b: &Accelerators,
        tol: f64,
        tracker: Option<&dyn ProgressTracker>,
    ) -> KernelResult<Option<RelationMatrix>> {
        let (Some(tree_a), Some(tree_b)) = (&acc_a.quad_tree, &acc_b.quad_tree) else {
            return Ok(None);
        };
        let mut ticker = ProgressTicker::new(self.config.progress_interval, -1);
        for i in 0..tree_a.segment_count() {
            let (a0, a1) = tree_a.segment(i);
            let query = Envelope2D::from_segment(&a0, &a1).inflated(tol, tol);
            for (b0, b1) in tree_b.segments_in(query) {
                ticker.tick(tracker, 1)?;
                if segment_distance(&a0, &a1, &b0, &b1) <= tol {
                    return Ok(None);
                }
            }
        }
        let (Some(mp_a), Some(mp_b)) = (a.as_multi_path(), b.as_multi_path()) else {
            return Ok(None);
        };
        Ok(match (a.dimension(), b.dimension()) {
            (2, 2) => Some(polygon_polygon(mp_a, acc_a, mp_b, acc_b)),
            (1, 2) => Some(line_polygon(mp_a, mp_b, acc_b)),
            (2, 1) => Some(line_polygon(mp_b, mp_a, acc_a).transpose()),
            _ => Some(disjoint_matrix(a, b)),
        })
    }
}

/// Matrix of two geometries that share no point.
fn disjoint_matrix(a: &Geometry, b: &Geometry) -> RelationMatrix {
    let mut m = RelationMatrix::new();
    m.set_max(Exterior, Exterior, 2);
    if !a.is_empty() {
        m.set_max(Interior, Exterior, a.dimension() as i8);
        if let Some(d) = boundary_dimension(a) {
            m.set_max(Boundary, Exterior, d);
        }
    }
    if !b.is_empty() {
        m.set_max(Exterior, Interior, b.dimension() as i8);
        if let Some(d) = boundary_dimension(b) {
            m.set_max(Exterior, Boundary, d);
        }
    }
    m
}

fn boundary_dimension(g: &Geometry) -> Option<i8> {
    match g {
        Geometry::Polygon(_) | Geometry::Envelope(_) if !g.is_empty() => Some(1),
        Geometry::Polyline(mp) if !odd_endpoints(mp).is_empty() => Some(0),
        _ => None,
    }
}

/// Point in `polygon`, answered by its raster where the cell is decisive.
fn inside(p: &Point2d, polygon: &MultiPath, acc: &Accelerators) -> bool {
    match acc.raster.as_ref().map(|r| r.query_point(p)) {
        Some(RasterHit::Inside) => true,
        Some(RasterHit::Outside) => false,
        _ => polygon.contains_point(p),
    }
}

/// Which components of `parts` fall inside and outside `polygon`.
fn component_sides(parts: &MultiPath, polygon: &MultiPath, acc: &Accelerators) -> (bool, bool) {
    let (mut any_in, mut any_out) = (false, false);
    for path in &parts.paths {
        let Some(v) = path.vertices.first() else {
            continue;
        };
        if inside(&v.xy, polygon, acc) {
            any_in = true;
        } else {
            any_out = true;
        }
    }
    (any_in, any_out)
}

fn set_if(m: &mut RelationMatrix, condition: bool, a: Location, b: Location, dim: i8) {
    if condition {
        m.set_max(a, b, dim);
    }
}

fn polygon_polygon(
    a: &MultiPath,
    acc_a: &Accelerators,
    b: &MultiPath,
    acc_b: &Accelerators,
) -> RelationMatrix {
    let (a_in, a_out) = component_sides(a, b, acc_b);
    let (b_in, b_out) = component_sides(b, a, acc_a);
    let mut m = RelationMatrix::new();
    set_if(&mut m, a_in || b_in, Interior, Interior, 2);
    set_if(&mut m, a_out || b_in, Interior, Exterior, 2);
    set_if(&mut m, b_out || a_in, Exterior, Interior, 2);
    set_if(&mut m, b_in, Interior, Boundary, 1);
    set_if(&mut m, a_in, Boundary, Interior, 1);
    set_if(&mut m, a_out, Boundary, Exterior, 1);
    set_if(&mut m, b_out, Exterior, Boundary, 1);
    m.set_max(Exterior, Exterior, 2);
    m
}

fn line_polygon(line: &MultiPath, polygon: &MultiPath, acc: &Accelerators) -> RelationMatrix {
    let (l_in, l_out) = component_sides(line, polygon, acc);
    let mut m = RelationMatrix::new();
    set_if(&mut m, l_in, Interior, Interior, 1);
    set_if(&mut m, l_out, Interior, Exterior, 1);
    for v in odd_endpoints(line) {
        let location = if inside(&v.xy, polygon, acc) { Interior } else { Exterior };
        m.set_max(Boundary, location, 0);
    }
    m.set_max(Exterior, Interior, 2);
    m.set_max(Exterior, Boundary, 1);
    m.set_max(Exterior, Exterior, 2);
    m
}
