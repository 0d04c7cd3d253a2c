//! Intersection against one reference geometry.

use tracing::instrument;

use super::overlay::intersection_pair;
use super::{BinaryCursor, BinaryOperator, OperatorKind};
use crate::config::KernelConfig;
use crate::cursor::GeometryCursor;
use crate::error::KernelResult;
use crate::geometry::{Geometry, SpatialReference};
use crate::progress::ProgressTracker;
use crate::tolerance::operation_tolerance;

#[derive(Debug, Clone)]
pub struct IntersectionOperator {
    config: KernelConfig,
}

impl IntersectionOperator {
    pub fn new(config: KernelConfig) -> Self {
        Self { config }
    }

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

impl BinaryOperator for IntersectionOperator {
    fn kind(&self) -> OperatorKind {
        OperatorKind::Intersection
    }

    /// The result has the lower of the two operand dimensions.
    #[instrument(skip_all)]
    fn execute_pair(
        &self,
        a: &Geometry,
        b: &Geometry,
        sr: Option<&SpatialReference>,
        tracker: Option<&dyn ProgressTracker>,
    ) -> KernelResult<Geometry> {
        let tol = operation_tolerance(sr, [a, b]);
        intersection_pair(a, b, tol, &self.config, tracker)
    }
}
