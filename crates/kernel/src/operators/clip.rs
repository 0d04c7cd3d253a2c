//! Clip: cut every input to an axis-aligned rectangle.
//!
//! Each input is clipped on its own. Polylines are cut segment by segment;
//! polygon rings are clipped plane by plane and then noded against
//! themselves, so doubled edges along the rectangle cancel out.

use tracing::{debug, instrument};

use super::simplify::simplify_polygon;
use super::MapCursor;
use crate::config::KernelConfig;
use crate::cursor::GeometryCursor;
use crate::error::KernelResult;
use crate::geometry::segment::clip_to_envelope;
use crate::geometry::{
    Envelope2D, EnvelopeGeometry, Geometry, MultiPath, MultiPoint, Path, Point, SpatialReference,
    Vertex,
};
use crate::progress::ProgressTracker;
use crate::tolerance::tolerance_from_geometry;

#[derive(Debug, Clone)]
pub struct ClipOperator {
    config: KernelConfig,
}

impl ClipOperator {
    pub fn new(config: KernelConfig) -> Self {
        Self { config }
    }

    pub fn execute<'a>(
        &'a self,
        inputs: Box<dyn GeometryCursor + 'a>,
        envelope: Envelope2D,
        sr: Option<SpatialReference>,
        tracker: Option<&'a dyn ProgressTracker>,
    ) -> Box<dyn GeometryCursor + 'a> {
        Box::new(MapCursor::new(inputs, tracker, move |_, g| {
            self.clip_geometry(&g, &envelope, sr.as_ref(), tracker)
        }))
    }

    #[instrument(skip_all, fields(kind = ?geometry.geometry_type()))]
    pub fn clip_geometry(
        &self,
        geometry: &Geometry,
        envelope: &Envelope2D,
        sr: Option<&SpatialReference>,
        tracker: Option<&dyn ProgressTracker>,
    ) -> KernelResult<Geometry> {
        let description = geometry.description();
        let extent = geometry.envelope_2d();
        if geometry.is_empty() || envelope.is_empty() || !extent.intersects(envelope) {
            return Ok(Geometry::empty(geometry.geometry_type(), description));
        }
        if envelope.contains(&extent) {
            return Ok(geometry.clone());
        }
        let tol = tolerance_from_geometry(sr, &extent.union(envelope), true);
        let keep = envelope.inflated(tol, tol);
        Ok(match geometry {
            Geometry::Point(p) => match p.xy() {
                Some(xy) if keep.contains_point(&xy) => geometry.clone(),
                _ => Geometry::Point(Point {
                    description,
                    vertex: None,
                }),
            },
            Geometry::MultiPoint(mp) => Geometry::MultiPoint(MultiPoint::new(
                description,
                mp.points.iter().filter(|v| keep.contains_point(&v.xy)).copied().collect(),
            )),
            Geometry::Envelope(e) => Geometry::Envelope(EnvelopeGeometry {
                description,
                rect: e.rect.intersection(envelope),
            }),
            Geometry::Polyline(mp) => {
                Geometry::Polyline(MultiPath::new(description, clip_polyline(mp, envelope)))
            }
            Geometry::Polygon(mp) => {
                let rings: Vec<Path> = mp
                    .paths
                    .iter()
                    .map(|ring| Path::new(clip_ring(&ring.vertices, envelope)))
                    .filter(|ring| ring.len() >= 3)
                    .collect();
                debug!(rings = rings.len(), "rings clipped");
                if rings.is_empty() {
                    Geometry::empty(geometry.geometry_type(), description)
                } else {
                    let clipped = Geometry::Polygon(MultiPath::new(description, rings));
                    Geometry::Polygon(simplify_polygon(&clipped, tol, &self.config, tracker)?)
                }
            }
        })
    }
}

/// Liang-Barsky per segment; consecutive kept pieces that meet are joined.
fn clip_polyline(mp: &MultiPath, envelope: &Envelope2D) -> Vec<Path> {
    let mut out = Vec::new();
    for path in &mp.paths {
        let mut run: Vec<Vertex> = Vec::new();
        for pair in path.vertices.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            match clip_to_envelope(&a.xy, &b.xy, envelope) {
                Some((t0, t1)) if t1 > t0 => {
                    let start = if t0 == 0.0 { *a } else { a.interpolate(b, t0) };
                    let end = if t1 == 1.0 { *b } else { a.interpolate(b, t1) };
                    let joins = run.last().is_some_and(|last| last.xy.bits() == start.xy.bits());
                    if !joins {
                        flush(&mut run, &mut out);
                        run.push(start);
                    }
                    run.push(end);
                    if t1 < 1.0 {
                        flush(&mut run, &mut out);
                    }
                }
                _ => flush(&mut run, &mut out),
            }
        }
        flush(&mut run, &mut out);
    }
    out
}

fn flush(run: &mut Vec<Vertex>, out: &mut Vec<Path>) {
    if run.len() >= 2 {
        out.push(Path::new(std::mem::take(run)));
    } else {
        run.clear();
    }
}

/// Sutherland-Hodgman against the four sides of `envelope`.
fn clip_ring(ring: &[Vertex], envelope: &Envelope2D) -> Vec<Vertex> {
    // Each plane: signed distance, positive inside.
    let planes: [&dyn Fn(&Vertex) -> f64; 4] = [
        &|v: &Vertex| v.xy.x - envelope.xmin,
        &|v: &Vertex| envelope.xmax - v.xy.x,
        &|v: &Vertex| v.xy.y - envelope.ymin,
        &|v: &Vertex| envelope.ymax - v.xy.y,
    ];
    let mut current = ring.to_vec();
    for inside in planes {
        if current.is_empty() {
            break;
        }
        let mut next = Vec::with_capacity(current.len() + 4);
        let n = current.len();
        for i in 0..n {
            let a = &current[i];
            let b = &current[(i + 1) % n];
            let (da, db) = (inside(a), inside(b));
            if da >= 0.0 {
                next.push(*a);
            }
            if (da >= 0.0) != (db >= 0.0) {
                let t = da / (da - db);
                next.push(a.interpolate(b, t));
            }
        }
        current = next;
    }
    current
}
