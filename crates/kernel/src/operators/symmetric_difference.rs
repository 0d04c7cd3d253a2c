//! Symmetric difference against one reference geometry.

use tracing::instrument;

use super::overlay::symmetric_difference_pair;
use super::{BinaryCursor, BinaryOperator, OperatorKind};
use crate::config::KernelConfig;
use crate::cursor::GeometryCursor;
use crate::error::KernelResult;
use crate::geometry::{Geometry, SpatialReference};
use crate::progress::ProgressTracker;
use crate::tolerance::operation_tolerance;

#[derive(Debug, Clone)]
pub struct SymmetricDifferenceOperator {
    config: KernelConfig,
}

impl SymmetricDifferenceOperator {
    pub fn new(config: KernelConfig) -> Self {
        Self { config }
    }

    /// Same cursor shape as difference: the first element of `other` is
    /// combined with every input.
    pub fn execute<'a>(
        &'a self,
        inputs: Box<dyn GeometryCursor + 'a>,
        other: Box<dyn GeometryCursor + 'a>,
        sr: Option<SpatialReference>,
        tracker: Option<&'a dyn ProgressTracker>,
    ) -> Box<dyn GeometryCursor + 'a> {
        Box::new(BinaryCursor::new(self, inputs, other, sr, tracker))
    }
}

impl BinaryOperator for SymmetricDifferenceOperator {
    fn kind(&self) -> OperatorKind {
        OperatorKind::SymmetricDifference
    }

    #[instrument(skip_all)]
    fn execute_pair(
        &self,
        a: &Geometry,
        b: &Geometry,
        sr: Option<&SpatialReference>,
        tracker: Option<&dyn ProgressTracker>,
    ) -> KernelResult<Geometry> {
        let tol = operation_tolerance(sr, [a, b]);
        symmetric_difference_pair(a, b, tol, &self.config, tracker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::SimpleGeometryCursor;
    use crate::geometry::GeometryType;

    #[test]
    fn test_symmetric_difference_of_lines() {
        let op = SymmetricDifferenceOperator::new(KernelConfig::default());
        let a = Geometry::polyline(&[vec![(0.0, 0.0), (2.0, 0.0)]]);
        let b = Geometry::polyline(&[vec![(1.0, 0.0), (3.0, 0.0)]]);
        let s = op.execute_pair(&a, &b, None, None).unwrap();
        assert_eq!(s.geometry_type(), GeometryType::Polyline);
        assert!((s.length() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_symmetric_difference_of_points() {
        let op = SymmetricDifferenceOperator::new(KernelConfig::default());
        let a = Geometry::multi_point(&[(0.0, 0.0), (1.0, 1.0)]);
        let b = Geometry::multi_point(&[(1.0, 1.0), (2.0, 2.0)]);
        let s = op.execute_pair(&a, &b, None, None).unwrap();
        assert_eq!(s.point_count(), 2);
    }

    #[test]
    fn test_mixed_dimensions_keep_higher() {
        let op = SymmetricDifferenceOperator::new(KernelConfig::default());
        let poly = Geometry::polygon(&[vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]]);
        let pt = Geometry::point(0.5, 0.5);
        assert_eq!(op.execute_pair(&pt, &poly, None, None).unwrap(), poly);
    }

    #[test]
    fn test_cursor_form() {
        let op = SymmetricDifferenceOperator::new(KernelConfig::default());
        let a = Geometry::polygon(&[vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]]);
        let b = Geometry::polygon(&[vec![(1.0, 1.0), (3.0, 1.0), (3.0, 3.0), (1.0, 3.0)]]);
        let mut cursor = op.execute(
            Box::new(SimpleGeometryCursor::single(a)),
            Box::new(SimpleGeometryCursor::single(b)),
            None,
            None,
        );
        let g = cursor.next().unwrap().unwrap();
        assert_eq!(cursor.current_id(), 0);
        assert!((g.area() - 6.0).abs() < 1e-12);
        assert!(cursor.next().unwrap().is_none());
    }
}
