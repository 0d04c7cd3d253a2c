//! Convex hull by Andrew's monotone chain.

use tracing::{debug, instrument};

use super::MapCursor;
use crate::cursor::GeometryCursor;
use crate::error::KernelResult;
use crate::geometry::segment::orientation;
use crate::geometry::{
    Geometry, GeometryType, MultiPath, Path, Point, Point2d, Vertex, VertexDescription,
};
use crate::progress::{check_progress, ProgressTracker};

#[derive(Debug, Clone, Default)]
pub struct ConvexHullOperator;

impl ConvexHullOperator {
    pub fn new() -> Self {
        Self
    }

    /// One hull per input, or with `merge` a single hull of every input
    /// (reported with id 0).
    pub fn execute<'a>(
        &'a self,
        inputs: Box<dyn GeometryCursor + 'a>,
        merge: bool,
        tracker: Option<&'a dyn ProgressTracker>,
    ) -> Box<dyn GeometryCursor + 'a> {
        if merge {
            Box::new(MergedHullCursor {
                input: inputs,
                tracker,
                points: Vec::new(),
                description: VertexDescription::XY,
                seen: 0,
                done: false,
                current: -1,
            })
        } else {
            Box::new(MapCursor::new(inputs, tracker, move |_, g| Ok(self.hull_geometry(&g))))
        }
    }

    #[instrument(skip_all, fields(kind = ?geometry.geometry_type()))]
    pub fn hull_geometry(&self, geometry: &Geometry) -> Geometry {
        if geometry.is_empty() {
            return geometry.clone();
        }
        if let Geometry::Point(_) = geometry {
            return geometry.clone();
        }
        let points: Vec<Point2d> = geometry.vertices().iter().map(|v| v.xy).collect();
        hull_of(points, geometry.description())
    }
}

/// Hull of a point set; collapses to a point or a two-point polyline when
/// the input is degenerate.
fn hull_of(mut points: Vec<Point2d>, description: VertexDescription) -> Geometry {
    points.retain(|p| !p.is_nan());
    points.sort_by(|a, b| a.lex_cmp(b));
    points.dedup_by(|a, b| a.bits() == b.bits());
    match points.len() {
        0 => return Geometry::empty(GeometryType::Polygon, description),
        1 => {
            return Geometry::Point(Point {
                description,
                vertex: Some(Vertex::from_xy(points[0])),
            })
        }
        _ => {}
    }
    let mut lower = half_hull(points.iter());
    let mut upper = half_hull(points.iter().rev());
    lower.pop();
    upper.pop();
    lower.append(&mut upper);
    debug!(hull_vertices = lower.len(), "hull built");
    if lower.len() < 3 {
        let first = points[0];
        let last = points[points.len() - 1];
        let path = Path::from_points(&[first, last]);
        return Geometry::Polyline(MultiPath::new(description, vec![path]));
    }
    Geometry::Polygon(MultiPath::new(description, vec![Path::from_points(&lower)]))
}

/// Chain that keeps only left turns.
fn half_hull<'p>(points: impl Iterator<Item = &'p Point2d>) -> Vec<Point2d> {
    let mut chain: Vec<Point2d> = Vec::new();
    for p in points {
        while let [.., a, b] = chain.as_slice() {
            if orientation(a, b, p) > 0.0 {
                break;
            }
            chain.pop();
        }
        chain.push(*p);
    }
    chain
}

struct MergedHullCursor<'a> {
    input: Box<dyn GeometryCursor + 'a>,
    tracker: Option<&'a dyn ProgressTracker>,
    points: Vec<Point2d>,
    description: VertexDescription,
    seen: i32,
    done: bool,
    current: i64,
}

impl GeometryCursor for MergedHullCursor<'_> {
    fn next(&mut self) -> KernelResult<Option<Geometry>> {
        if self.done {
            return Ok(None);
        }
        while let Some(g) = self.input.next()? {
            self.seen += 1;
            if let Err(err) = check_progress(self.tracker, self.seen, -1) {
                self.done = true;
                return Err(err);
            }
            self.description = self.description.merge(g.description());
            self.points.extend(g.vertices().iter().map(|v| v.xy));
        }
        if self.input.is_pending() {
            return Ok(None);
        }
        self.done = true;
        self.current = 0;
        let points = std::mem::take(&mut self.points);
        Ok(Some(hull_of(points, self.description)))
    }

    fn current_id(&self) -> i64 {
        self.current
    }

    fn is_pending(&self) -> bool {
        !self.done
    }
}
