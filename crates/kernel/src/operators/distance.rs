//! Minimum planar distance between two geometries.

use tracing::{debug, instrument};

use crate::error::KernelResult;
use crate::geometry::segment::segment_distance;
use crate::geometry::{Envelope2D, Geometry, MultiPath, Point2d, SpatialReference};
use crate::progress::{ProgressTicker, ProgressTracker};
use crate::tolerance::tolerance_from_geometry;

/// Segment pairs examined between tracker polls.
const PAIRS_PER_POLL: usize = 4096;

#[derive(Debug, Clone, Default)]
pub struct DistanceOperator;

impl DistanceOperator {
    pub fn new() -> Self {
        Self
    }

    /// Zero when the geometries intersect or one contains the other, NaN when
    /// either is empty. Distances within the operation tolerance snap to zero.
    #[instrument(skip_all, fields(a = ?a.geometry_type(), b = ?b.geometry_type()))]
    pub fn execute(
        &self,
        a: &Geometry,
        b: &Geometry,
        sr: Option<&SpatialReference>,
        tracker: Option<&dyn ProgressTracker>,
    ) -> KernelResult<f64> {
        if a.is_empty() || b.is_empty() {
            return Ok(f64::NAN);
        }
        let a = a.to_multi_path_form();
        let b = b.to_multi_path_form();
        if contains_any_vertex(&a, &b) || contains_any_vertex(&b, &a) {
            return Ok(0.0);
        }
        let pieces_a = pieces(&a);
        let pieces_b = pieces(&b);
        let mut ticker = ProgressTicker::new(PAIRS_PER_POLL, -1);
        let mut best = f64::INFINITY;
        let mut pruned = 0usize;
        for (a0, a1) in &pieces_a {
            let env_a = Envelope2D::from_segment(a0, a1);
            for (b0, b1) in &pieces_b {
                ticker.tick(tracker, 1)?;
                if env_a.distance_to_envelope(&Envelope2D::from_segment(b0, b1)) >= best {
                    pruned += 1;
                    continue;
                }
                best = best.min(segment_distance(a0, a1, b0, b1));
                if best == 0.0 {
                    return Ok(0.0);
                }
            }
        }
        debug!(pruned, best, "distance computed");
        let env = a.envelope_2d().union(&b.envelope_2d());
        if best <= tolerance_from_geometry(sr, &env, false) {
            return Ok(0.0);
        }
        Ok(best)
    }
}

/// Segments of paths and rings; lone points become zero-length pieces.
fn pieces(geometry: &Geometry) -> Vec<(Point2d, Point2d)> {
    match geometry {
        Geometry::Polyline(mp) => path_pieces(mp, false),
        Geometry::Polygon(mp) => path_pieces(mp, true),
        other => other.vertices().iter().map(|v| (v.xy, v.xy)).collect(),
    }
}

fn path_pieces(mp: &MultiPath, closed: bool) -> Vec<(Point2d, Point2d)> {
    let mut out = Vec::new();
    for path in &mp.paths {
        match path.len() {
            0 => {}
            1 => {
                let p = path.vertices[0].xy;
                out.push((p, p));
            }
            _ => out.extend(path.segments(closed)),
        }
    }
    out
}

/// True when `area` is a polygon holding one of `other`'s vertices.
fn contains_any_vertex(area: &Geometry, other: &Geometry) -> bool {
    let Geometry::Polygon(mp) = area else {
        return false;
    };
    let env = mp.envelope();
    other
        .vertices()
        .iter()
        .any(|v| env.contains_point(&v.xy) && mp.contains_point(&v.xy))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Geometry {
        Geometry::polygon(&[vec![
            (x0, y0),
            (x0 + size, y0),
            (x0 + size, y0 + size),
            (x0, y0 + size),
        ]])
    }

    #[test]
    fn test_separated_squares() {
        let d = DistanceOperator::new()
            .execute(&square(0.0, 0.0, 1.0), &square(4.0, 5.0, 1.0), None, None)
            .unwrap();
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_contained_point_is_zero() {
        let op = DistanceOperator::new();
        let d = op.execute(&square(0.0, 0.0, 4.0), &Geometry::point(1.0, 1.0), None, None);
        assert_eq!(d.unwrap(), 0.0);
        let line = Geometry::polyline(&[vec![(-1.0, 2.0), (5.0, 2.0)]]);
        assert_eq!(op.execute(&line, &square(0.0, 0.0, 4.0), None, None).unwrap(), 0.0);
    }

    #[test]
    fn test_point_to_line_and_empty() {
        let op = DistanceOperator::new();
        let line = Geometry::polyline(&[vec![(0.0, 0.0), (10.0, 0.0)]]);
        let d = op.execute(&line, &Geometry::point(3.0, 2.0), None, None).unwrap();
        assert!((d - 2.0).abs() < 1e-12);
        let empty = Geometry::multi_point(&[]);
        assert!(op.execute(&line, &empty, None, None).unwrap().is_nan());
    }

    #[test]
    fn test_cancellation_during_pair_scan() {
        let many: Vec<(f64, f64)> = (0..200).map(|i| (i as f64, 100.0)).collect();
        let far = Geometry::multi_point(&many);
        let others: Vec<(f64, f64)> = (0..200).map(|i| (i as f64, 0.0)).collect();
        let near = Geometry::multi_point(&others);
        let refuse = |_step: i32, _total: i32| false;
        let err = DistanceOperator::new().execute(&far, &near, None, Some(&refuse));
        assert!(err.unwrap_err().is_cancellation());
    }
}
