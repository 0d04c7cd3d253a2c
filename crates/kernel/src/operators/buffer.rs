//! Buffer: the set of points within a signed distance of a geometry.
//!
//! The boundary is covered by a band of pieces: one rectangle per segment,
//! a join wedge on the open side of every vertex and caps at polyline ends.
//! Positive distances add the band to the geometry, negative distances
//! subtract it from a polygon.

use std::f64::consts::{PI, TAU};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::overlay::{difference_pair, empty_of_dimension, union_all};
use super::union::UnionCursor;
use super::MapCursor;
use crate::config::KernelConfig;
use crate::cursor::GeometryCursor;
use crate::error::{KernelError, KernelResult};
use crate::geometry::{
    Geometry, GeometryType, MultiPath, Path, Point2d, SpatialReference, VertexDescription,
};
use crate::progress::ProgressTracker;
use crate::tolerance::tolerance_from_geometry;

/// Shape of the corner where two offset segments meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    Round,
    Bevel,
    Miter,
    Square,
}

/// Shape of the band at the two ends of an open path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapType {
    Round,
    Square,
    Butt,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferParams {
    pub join: JoinType,
    pub cap: CapType,
    /// Longest miter allowed, as a multiple of the distance; longer miters
    /// fall back to a bevel.
    pub miter_limit: f64,
    /// Largest gap between a true arc and its chords; 0 lets
    /// `max_vertices_in_full_circle` alone decide.
    pub max_deviation: f64,
    pub max_vertices_in_full_circle: usize,
    /// Pipe all buffered outputs into one union.
    pub union_result: bool,
}

impl Default for BufferParams {
    fn default() -> Self {
        Self {
            join: JoinType::Round,
            cap: CapType::Round,
            miter_limit: 10.0,
            max_deviation: 0.0,
            max_vertices_in_full_circle: 96,
            union_result: false,
        }
    }
}

impl BufferParams {
    pub fn validate(&self) -> KernelResult<()> {
        if !(self.miter_limit >= 1.0) {
            return Err(KernelError::invalid_argument("miter_limit must be at least 1"));
        }
        if !(self.max_deviation >= 0.0) {
            return Err(KernelError::invalid_argument("max_deviation must be non-negative"));
        }
        if self.max_vertices_in_full_circle < 8 {
            return Err(KernelError::invalid_argument(
                "max_vertices_in_full_circle must be at least 8",
            ));
        }
        Ok(())
    }

    /// Chord count for a full circle of radius `r`.
    pub(crate) fn circle_segments(&self, r: f64) -> usize {
        let max = self.max_vertices_in_full_circle;
        if self.max_deviation <= 0.0 || self.max_deviation >= r {
            return max;
        }
        let half_angle = (1.0 - self.max_deviation / r).acos();
        let n = (PI / half_angle).ceil();
        if n.is_finite() {
            (n as usize).clamp(8, max)
        } else {
            max
        }
    }
}

// ─── Piece construction ──────────────────────────────────────────────────────

/// Points of an arc around `center` from direction `n1` to `n2` (unit
/// vectors) the short way round, both ends included.
pub(crate) fn arc_points(
    center: Point2d,
    n1: Point2d,
    n2: Point2d,
    r: f64,
    step: f64,
) -> Vec<Point2d> {
    let a1 = n1.y.atan2(n1.x);
    let mut delta = n2.y.atan2(n2.x) - a1;
    if delta > PI {
        delta -= TAU;
    } else if delta < -PI {
        delta += TAU;
    }
    let count = ((delta.abs() / step).ceil() as usize).max(1);
    let mut points = Vec::with_capacity(count + 1);
    points.push(center + n1 * r);
    for k in 1..count {
        let a = a1 + delta * k as f64 / count as f64;
        points.push(center + Point2d::new(a.cos(), a.sin()) * r);
    }
    points.push(center + n2 * r);
    points
}

pub(crate) fn circle_ring(center: Point2d, r: f64, segments: usize) -> Vec<Point2d> {
    (0..segments)
        .map(|k| {
            let a = TAU * k as f64 / segments as f64;
            center + Point2d::new(a.cos(), a.sin()) * r
        })
        .collect()
}

/// Drop points within `tol` of the previously kept one; for rings also the
/// closing duplicate.
pub(crate) fn dedup_points(points: &[Point2d], tol: f64, closed: bool) -> Vec<Point2d> {
    let mut out: Vec<Point2d> = Vec::with_capacity(points.len());
    for p in points {
        if p.is_nan() {
            continue;
        }
        match out.last() {
            Some(last) if last.distance_to(p) <= tol => {}
            _ => out.push(*p),
        }
    }
    if closed {
        while out.len() > 1 && out[0].distance_to(&out[out.len() - 1]) <= tol {
            out.pop();
        }
    }
    out
}

/// Where the band around a vertex with incoming direction `u` and outgoing
/// direction `v` is left open, if anywhere: the side normals `(n1, n2)`.
pub(crate) fn open_side(u: Point2d, v: Point2d) -> Option<(Point2d, Point2d)> {
    let turn = u.cross(&v);
    if turn.abs() <= 1e-12 && u.dot(&v) > 0.0 {
        return None;
    }
    let (n1, n2) = if turn > 0.0 {
        (-u.left_normal(), -v.left_normal())
    } else {
        (u.left_normal(), v.left_normal())
    };
    Some((n1, n2))
}

struct PieceBuilder<'p> {
    params: &'p BufferParams,
    r: f64,
    step: f64,
    pieces: Vec<Geometry>,
}

impl<'p> PieceBuilder<'p> {
    fn new(params: &'p BufferParams, r: f64) -> Self {
        Self {
            params,
            r,
            step: TAU / params.circle_segments(r) as f64,
            pieces: Vec::new(),
        }
    }

    fn push_ring(&mut self, ring: Vec<Point2d>) {
        if ring.len() >= 3 {
            let path = Path::from_points(&ring);
            self.pieces
                .push(Geometry::Polygon(MultiPath::new(VertexDescription::XY, vec![path])));
        }
    }

    fn disk(&mut self, center: Point2d) {
        let segments = self.params.circle_segments(self.r);
        self.push_ring(circle_ring(center, self.r, segments));
    }

    fn strip(&mut self, a: Point2d, b: Point2d) {
        let Some(u) = (b - a).normalized() else {
            return;
        };
        let n = u.left_normal() * self.r;
        self.push_ring(vec![a - n, b - n, b + n, a + n]);
    }

    fn join(&mut self, p: Point2d, u: Point2d, v: Point2d) {
        let Some((n1, n2)) = open_side(u, v) else {
            return;
        };
        let r = self.r;
        let reversal = u.dot(&v) < 0.0 && u.cross(&v).abs() <= 1e-12;
        if reversal {
            match self.params.join {
                JoinType::Round => self.disk(p),
                JoinType::Square | JoinType::Miter => {
                    let n = u.left_normal() * r;
                    self.push_ring(vec![p - n, p - n + u * r, p + n + u * r, p + n]);
                }
                JoinType::Bevel => {}
            }
            return;
        }
        let (p1, p2) = (p + n1 * r, p + n2 * r);
        match self.params.join {
            JoinType::Round => {
                let mut ring = vec![p];
                ring.extend(arc_points(p, n1, n2, r, self.step));
                self.push_ring(ring);
            }
            JoinType::Bevel => self.push_ring(vec![p, p1, p2]),
            JoinType::Miter => {
                let bisector = n1 + n2;
                let cos_half = bisector.length() / 2.0;
                match bisector.normalized() {
                    Some(dir) if cos_half > 0.0 && 1.0 / cos_half <= self.params.miter_limit => {
                        self.push_ring(vec![p, p1, p + dir * (r / cos_half), p2]);
                    }
                    _ => self.push_ring(vec![p, p1, p2]),
                }
            }
            JoinType::Square => self.push_ring(vec![p, p1, p1 + u * r, p2 - v * r, p2]),
        }
    }

    fn cap(&mut self, end: Point2d, outward: Point2d) {
        let r = self.r;
        match self.params.cap {
            CapType::Round => self.disk(end),
            CapType::Square => {
                let n = outward.left_normal() * r;
                let ahead = outward * r;
                self.push_ring(vec![end - n, end - n + ahead, end + n + ahead, end + n]);
            }
            CapType::Butt => {}
        }
    }

    fn lone_point(&mut self, p: Point2d) {
        let r = self.r;
        match self.params.cap {
            CapType::Round => self.disk(p),
            CapType::Square => self.push_ring(vec![
                Point2d::new(p.x - r, p.y - r),
                Point2d::new(p.x + r, p.y - r),
                Point2d::new(p.x + r, p.y + r),
                Point2d::new(p.x - r, p.y + r),
            ]),
            CapType::Butt => {}
        }
    }

    fn path(&mut self, points: &[Point2d], closed: bool) {
        let n = points.len();
        if n == 1 {
            self.lone_point(points[0]);
            return;
        }
        let seg_count = if closed { n } else { n - 1 };
        let dirs: Vec<Option<Point2d>> = (0..seg_count)
            .map(|i| (points[(i + 1) % n] - points[i]).normalized())
            .collect();
        for i in 0..seg_count {
            self.strip(points[i], points[(i + 1) % n]);
        }
        let joins = if closed { 0..n } else { 1..n - 1 };
        for i in joins {
            let incoming = dirs[(i + seg_count - 1) % seg_count];
            if let (Some(u), Some(v)) = (incoming, dirs[i % seg_count]) {
                self.join(points[i], u, v);
            }
        }
        if !closed {
            if let Some(u) = dirs[0] {
                self.cap(points[0], -u);
            }
            if let Some(v) = dirs[seg_count - 1] {
                self.cap(points[n - 1], v);
            }
        }
    }
}

// ─── Operator ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct BufferOperator {
    config: KernelConfig,
}

impl BufferOperator {
    pub fn new(config: KernelConfig) -> Self {
        Self { config }
    }

    /// Buffer every input. Input `i` uses `distances[i]`, or the last
    /// distance once the list runs out.
    pub fn execute<'a>(
        &'a self,
        inputs: Box<dyn GeometryCursor + 'a>,
        sr: Option<SpatialReference>,
        distances: &[f64],
        params: BufferParams,
        tracker: Option<&'a dyn ProgressTracker>,
    ) -> KernelResult<Box<dyn GeometryCursor + 'a>> {
        if distances.is_empty() {
            return Err(KernelError::invalid_argument("at least one buffer distance is required"));
        }
        if distances.iter().any(|d| !d.is_finite()) {
            return Err(KernelError::invalid_argument("buffer distances must be finite"));
        }
        params.validate()?;
        let distances = distances.to_vec();
        let buffered = MapCursor::new(inputs, tracker, move |i, g| {
            let d = distances[i.min(distances.len() - 1)];
            self.buffer_geometry(&g, d, sr.as_ref(), &params, tracker)
        });
        if params.union_result {
            return Ok(Box::new(UnionCursor::new(
                Box::new(buffered),
                self.config.clone(),
                sr,
                tracker,
            )));
        }
        Ok(Box::new(buffered))
    }

    /// Buffer one geometry by a signed distance.
    #[instrument(
        skip(self, geometry, sr, params, tracker),
        fields(kind = ?geometry.geometry_type())
    )]
    pub fn buffer_geometry(
        &self,
        geometry: &Geometry,
        distance: f64,
        sr: Option<&SpatialReference>,
        params: &BufferParams,
        tracker: Option<&dyn ProgressTracker>,
    ) -> KernelResult<Geometry> {
        let description = geometry.description();
        let empty = || Geometry::empty(GeometryType::Polygon, description);
        if !distance.is_finite() {
            return Err(KernelError::invalid_argument("buffer distance must be finite"));
        }
        if geometry.is_empty() {
            return Ok(empty());
        }
        let area_like = geometry.dimension() == 2;
        if distance == 0.0 {
            return Ok(if area_like { geometry.to_multi_path_form() } else { empty() });
        }
        if distance < 0.0 && !area_like {
            return Ok(empty());
        }

        let r = distance.abs();
        let env = geometry.envelope_2d().inflated(r, r);
        let tol = tolerance_from_geometry(sr, &env, true);
        let mut builder = PieceBuilder::new(params, r);
        let source = geometry.to_multi_path_form();
        match &source {
            Geometry::Point(p) => {
                if let Some(xy) = p.xy() {
                    builder.disk(xy);
                }
            }
            Geometry::MultiPoint(mp) => {
                for v in &mp.points {
                    builder.disk(v.xy);
                }
            }
            Geometry::Polyline(mp) | Geometry::Polygon(mp) => {
                let closed = area_like;
                for path in &mp.paths {
                    let points = dedup_points(&path.points().collect::<Vec<_>>(), tol, closed);
                    if !points.is_empty() {
                        builder.path(&points, closed);
                    }
                }
            }
            Geometry::Envelope(_) => {}
        }
        let pieces = builder.pieces;
        debug!(pieces = pieces.len(), distance, "buffer band built");

        let result = if area_like {
            let refs: Vec<&Geometry> = pieces.iter().collect();
            let band = union_all(&refs, tol, &self.config, tracker)?;
            if distance > 0.0 {
                union_all(&[&source, &band], tol, &self.config, tracker)?
            } else {
                difference_pair(&source, &band, tol, &self.config, tracker)?
            }
        } else {
            let refs: Vec<&Geometry> = pieces.iter().collect();
            union_all(&refs, tol, &self.config, tracker)?
        };
        Ok(match result {
            Geometry::Polygon(_) => result,
            _ => empty_of_dimension(2, description),
        })
    }
}
