//! Densify: insert vertices so that no segment exceeds a length.

use tracing::instrument;

use super::MapCursor;
use crate::cursor::GeometryCursor;
use crate::error::{KernelError, KernelResult};
use crate::geometry::{Geometry, MultiPath, Path};
use crate::progress::ProgressTracker;

#[derive(Debug, Clone, Default)]
pub struct DensifyOperator;

impl DensifyOperator {
    pub fn new() -> Self {
        Self
    }

    pub fn execute<'a>(
        &'a self,
        inputs: Box<dyn GeometryCursor + 'a>,
        max_length: f64,
        tracker: Option<&'a dyn ProgressTracker>,
    ) -> KernelResult<Box<dyn GeometryCursor + 'a>> {
        check_length(max_length)?;
        Ok(Box::new(MapCursor::new(inputs, tracker, move |_, g| {
            self.densify_geometry(&g, max_length)
        })))
    }

    /// Envelopes come back as densified polygons; points are unchanged.
    #[instrument(skip(self, geometry), fields(kind = ?geometry.geometry_type()))]
    pub fn densify_geometry(&self, geometry: &Geometry, max_length: f64) -> KernelResult<Geometry> {
        check_length(max_length)?;
        Ok(match geometry.to_multi_path_form() {
            Geometry::Polyline(mp) => Geometry::Polyline(densify_paths(&mp, max_length, false)),
            Geometry::Polygon(mp) => Geometry::Polygon(densify_paths(&mp, max_length, true)),
            other => other,
        })
    }
}

fn check_length(max_length: f64) -> KernelResult<()> {
    if max_length.is_nan() || max_length <= 0.0 {
        return Err(KernelError::invalid_argument(format!(
            "densify length must be positive, got {max_length}"
        )));
    }
    Ok(())
}

fn densify_paths(mp: &MultiPath, max_length: f64, closed: bool) -> MultiPath {
    let paths = mp
        .paths
        .iter()
        .map(|path| {
            let n = path.vertices.len();
            let segments = if closed { n } else { n.saturating_sub(1) };
            let mut out = Vec::with_capacity(n);
            for i in 0..segments {
                let a = path.vertices[i];
                let b = path.vertices[(i + 1) % n];
                out.push(a);
                let length = a.xy.distance_to(&b.xy);
                let pieces = (length / max_length).ceil();
                if pieces.is_finite() && pieces > 1.0 {
                    let count = pieces as usize;
                    out.extend((1..count).map(|k| a.interpolate(&b, k as f64 / pieces)));
                }
            }
            if !closed {
                out.extend(path.vertices.last().copied());
            } else if segments == 0 {
                out.extend(path.vertices.iter().copied());
            }
            Path::new(out)
        })
        .collect();
    MultiPath::new(mp.description, paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::{collect_cursor, SimpleGeometryCursor};
    use crate::geometry::Vertex;

    #[test]
    fn test_line_split_evenly() {
        let line = Geometry::polyline(&[vec![(0.0, 0.0), (10.0, 0.0)]]);
        let d = DensifyOperator::new().densify_geometry(&line, 3.0).unwrap();
        let path = &d.as_multi_path().unwrap().paths[0];
        assert_eq!(path.len(), 5);
        assert!((path.vertices[1].xy.x - 2.5).abs() < 1e-12);
        assert!((d.length() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_envelope_becomes_polygon() {
        let env = Geometry::envelope(0.0, 0.0, 2.0, 1.0);
        let d = DensifyOperator::new().densify_geometry(&env, 0.5).unwrap();
        assert!(matches!(d, Geometry::Polygon(_)));
        assert_eq!(d.point_count(), 12);
        assert!((d.area() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_attributes_interpolated() {
        let mut mp = MultiPath::from_coords(&[vec![(0.0, 0.0), (4.0, 0.0)]]);
        mp.paths[0].vertices[1] = Vertex::new(4.0, 0.0).with_z(8.0);
        let d = DensifyOperator::new()
            .densify_geometry(&Geometry::Polyline(mp), 2.0)
            .unwrap();
        assert!((d.as_multi_path().unwrap().paths[0].vertices[1].z - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_non_positive_length_rejected() {
        let op = DensifyOperator::new();
        let point = Geometry::point(0.0, 0.0);
        assert!(op.densify_geometry(&point, 0.0).is_err());
        assert!(op.densify_geometry(&point, f64::NAN).is_err());
        assert!(op.execute(Box::new(SimpleGeometryCursor::empty()), -1.0, None).is_err());
        let cursor = op
            .execute(Box::new(SimpleGeometryCursor::single(point.clone())), 1.0, None)
            .unwrap();
        assert_eq!(collect_cursor(cursor).unwrap()[0].1, point);
    }
}
