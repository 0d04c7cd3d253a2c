//! Topological boundary of a geometry.

use std::collections::HashMap;

use tracing::instrument;

use super::MapCursor;
use crate::cursor::GeometryCursor;
use crate::error::KernelResult;
use crate::geometry::{Geometry, GeometryType, MultiPath, MultiPoint, Path, Vertex};
use crate::progress::ProgressTracker;

#[derive(Debug, Clone, Default)]
pub struct BoundaryOperator;

impl BoundaryOperator {
    pub fn new() -> Self {
        Self
    }

    pub fn execute<'a>(
        &'a self,
        inputs: Box<dyn GeometryCursor + 'a>,
        tracker: Option<&'a dyn ProgressTracker>,
    ) -> Box<dyn GeometryCursor + 'a> {
        Box::new(MapCursor::new(inputs, tracker, move |_, g| {
            self.boundary_geometry(&g)
        }))
    }

    /// Polygons give their rings as closed polylines, polylines give the
    /// endpoints that occur an odd number of times, points give nothing.
    #[instrument(skip_all, fields(kind = ?geometry.geometry_type()))]
    pub fn boundary_geometry(&self, geometry: &Geometry) -> KernelResult<Geometry> {
        let description = geometry.description();
        Ok(match geometry {
            Geometry::Point(_) | Geometry::MultiPoint(_) => {
                Geometry::empty(GeometryType::MultiPoint, description)
            }
            Geometry::Envelope(_) | Geometry::Polygon(_) => {
                let Geometry::Polygon(mp) = geometry.to_multi_path_form() else {
                    return Ok(Geometry::empty(GeometryType::Polyline, description));
                };
                let rings = mp
                    .paths
                    .into_iter()
                    .filter(|ring| ring.len() >= 2)
                    .map(close_ring)
                    .collect();
                Geometry::Polyline(MultiPath::new(description, rings))
            }
            Geometry::Polyline(mp) => {
                Geometry::MultiPoint(MultiPoint::new(description, odd_endpoints(mp)))
            }
        })
    }
}

fn close_ring(ring: Path) -> Path {
    let mut vertices = ring.vertices;
    if let Some(first) = vertices.first().copied() {
        vertices.push(first);
    }
    Path::new(vertices)
}

/// Mod-2 rule over path endpoints; order of first appearance is kept.
pub(crate) fn odd_endpoints(mp: &MultiPath) -> Vec<Vertex> {
    let mut counts: HashMap<(u64, u64), (usize, Vertex)> = HashMap::new();
    let mut order = Vec::new();
    for path in &mp.paths {
        let (Some(first), Some(last)) = (path.vertices.first(), path.vertices.last()) else {
            continue;
        };
        for v in [first, last] {
            let entry = counts.entry(v.xy.bits()).or_insert_with(|| {
                order.push(v.xy.bits());
                (0, *v)
            });
            entry.0 += 1;
        }
    }
    order
        .into_iter()
        .filter_map(|key| counts.get(&key).filter(|(n, _)| n % 2 == 1).map(|(_, v)| *v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polygon_boundary_is_closed_rings() {
        let sq = Geometry::polygon(&[vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]]);
        let b = BoundaryOperator::new().boundary_geometry(&sq).unwrap();
        assert_eq!(b.geometry_type(), GeometryType::Polyline);
        assert_eq!(b.point_count(), 5);
        assert!((b.length() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_polyline_endpoints_mod_two() {
        let lines = Geometry::polyline(&[
            vec![(0.0, 0.0), (1.0, 0.0)],
            vec![(1.0, 0.0), (2.0, 0.0)],
            vec![(5.0, 5.0), (6.0, 5.0), (5.0, 6.0), (5.0, 5.0)],
        ]);
        let b = BoundaryOperator::new().boundary_geometry(&lines).unwrap();
        let Geometry::MultiPoint(mp) = b else {
            panic!("expected multipoint");
        };
        let xs: Vec<f64> = mp.points.iter().map(|v| v.xy.x).collect();
        assert_eq!(xs, vec![0.0, 2.0]);
    }

    #[test]
    fn test_points_have_empty_boundary() {
        let b = BoundaryOperator::new()
            .boundary_geometry(&Geometry::multi_point(&[(0.0, 0.0)]))
            .unwrap();
        assert!(b.is_empty());
        let e = BoundaryOperator::new()
            .boundary_geometry(&Geometry::envelope(0.0, 0.0, 2.0, 1.0))
            .unwrap();
        assert!((e.length() - 6.0).abs() < 1e-12);
    }
}
