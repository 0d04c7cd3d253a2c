//! Difference: every input minus one subtractor geometry.

use tracing::instrument;

use super::overlay::difference_pair;
use super::{BinaryCursor, BinaryOperator, OperatorKind};
use crate::config::KernelConfig;
use crate::cursor::GeometryCursor;
use crate::error::KernelResult;
use crate::geometry::{Geometry, SpatialReference};
use crate::progress::ProgressTracker;
use crate::tolerance::operation_tolerance;

#[derive(Debug, Clone)]
pub struct DifferenceOperator {
    config: KernelConfig,
}

impl DifferenceOperator {
    pub fn new(config: KernelConfig) -> Self {
        Self { config }
    }

    /// Subtract the first element of `subtractor` from every element of
    /// `inputs`. Output ids follow `inputs`; an empty `subtractor` yields
    /// no output at all.
    pub fn execute<'a>(
        &'a self,
        inputs: Box<dyn GeometryCursor + 'a>,
        subtractor: Box<dyn GeometryCursor + 'a>,
        sr: Option<SpatialReference>,
        tracker: Option<&'a dyn ProgressTracker>,
    ) -> Box<dyn GeometryCursor + 'a> {
        Box::new(BinaryCursor::new(self, inputs, subtractor, sr, tracker))
    }
}

impl BinaryOperator for DifferenceOperator {
    fn kind(&self) -> OperatorKind {
        OperatorKind::Difference
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
        difference_pair(a, b, tol, &self.config, tracker)
    }
}
