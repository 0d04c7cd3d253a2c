//! Union: pairwise, merged over a cursor, or fed incrementally through a
//! push queue.

use tracing::{debug, info, instrument};

use super::overlay::{empty_of_dimension, union_all};
use super::{BinaryOperator, MapCursor, OperatorKind};
use crate::config::KernelConfig;
use crate::cursor::{listening_cursor, GeometryCursor, QueueHandle};
use crate::error::KernelResult;
use crate::geometry::{Envelope2D, Geometry, SpatialReference, VertexDescription};
use crate::progress::{check_progress, ProgressTracker};
use crate::tolerance::{operation_tolerance, tolerance_from_geometry};

#[derive(Debug, Clone)]
pub struct UnionOperator {
    config: KernelConfig,
}

impl UnionOperator {
    pub fn new(config: KernelConfig) -> Self {
        Self { config }
    }

    /// Merge every element of `inputs` into one geometry. The merged
    /// result carries id 0, its position in the output.
    pub fn execute<'a>(
        &'a self,
        inputs: Box<dyn GeometryCursor + 'a>,
        sr: Option<SpatialReference>,
        tracker: Option<&'a dyn ProgressTracker>,
    ) -> UnionCursor<'a> {
        UnionCursor::new(inputs, self.config.clone(), sr, tracker)
    }

    /// Union each element of `left` with the element at the same position
    /// of `right`. Ids follow `left`; when `right` runs out the remaining
    /// left elements pass through unchanged.
    pub fn execute_pairwise<'a>(
        &'a self,
        left: Box<dyn GeometryCursor + 'a>,
        mut right: Box<dyn GeometryCursor + 'a>,
        sr: Option<SpatialReference>,
        tracker: Option<&'a dyn ProgressTracker>,
    ) -> Box<dyn GeometryCursor + 'a> {
        Box::new(MapCursor::new(left, tracker, move |_, g| match right.next()? {
            Some(other) => self.execute_pair(&g, &other, sr.as_ref(), tracker),
            None => Ok(g),
        }))
    }

    /// Streaming form: push geometries through the handle, call
    /// [`QueueHandle::finish`], then pull the single merged result.
    ///
    /// Pulling before the producer has finished only queues what has
    /// arrived and returns `None` without ending the cursor. Queued inputs
    /// are folded once `union_batch_size` of them are pending, or at finish.
    pub fn execute_listening<'a>(
        &'a self,
        sr: Option<SpatialReference>,
        tracker: Option<&'a dyn ProgressTracker>,
    ) -> (QueueHandle, UnionCursor<'a>) {
        let (handle, cursor) = listening_cursor();
        (handle, self.execute(Box::new(cursor), sr, tracker))
    }
}

impl BinaryOperator for UnionOperator {
    fn kind(&self) -> OperatorKind {
        OperatorKind::Union
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
        union_all(&[a, b], tol, &self.config, tracker)
    }
}

// ─── Incremental accumulation ────────────────────────────────────────────────

/// Running union that folds pending inputs every `union_batch_size` pushes.
///
/// Only inputs of the highest dimension seen so far are kept; a higher
/// dimension arriving later discards the lower-dimension state.
///
/// Each fold snaps with the tolerance of the extent seen so far, never less
/// than the previous fold's; a spatial reference tolerance is a floor for
/// all of them. `finish` re-folds the accumulated result whenever the
/// final extent implies a larger tolerance than the last fold used, so the
/// output always comes from one last snap at the operation tolerance.
#[derive(Debug, Clone)]
pub struct IncrementalUnion {
    config: KernelConfig,
    sr: Option<SpatialReference>,
    dimension: i32,
    empty_dimension: i32,
    description: VertexDescription,
    extent: Envelope2D,
    tolerance: f64,
    acc: Option<Geometry>,
    pending: Vec<Geometry>,
    pushed: usize,
    folds: usize,
}

impl IncrementalUnion {
    pub fn new(config: KernelConfig, sr: Option<SpatialReference>) -> Self {
        Self {
            config,
            sr,
            dimension: -1,
            empty_dimension: -1,
            description: VertexDescription::XY,
            extent: Envelope2D::empty(),
            tolerance: 0.0,
            acc: None,
            pending: Vec::new(),
            pushed: 0,
            folds: 0,
        }
    }

    pub fn pushed(&self) -> usize {
        self.pushed
    }

    /// Tolerance of the most recent fold, 0 before the first one.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Add one geometry; polls the tracker once per call.
    pub fn push(
        &mut self,
        geometry: Geometry,
        tracker: Option<&dyn ProgressTracker>,
    ) -> KernelResult<()> {
        self.pushed += 1;
        check_progress(tracker, i32::try_from(self.pushed).unwrap_or(i32::MAX), -1)?;
        self.description = self.description.merge(geometry.description());
        let dimension = geometry.dimension();
        if geometry.is_empty() {
            self.empty_dimension = self.empty_dimension.max(dimension);
            return Ok(());
        }
        if dimension < self.dimension {
            return Ok(());
        }
        if dimension > self.dimension {
            self.dimension = dimension;
            self.acc = None;
            self.pending.clear();
            self.extent = Envelope2D::empty();
            self.tolerance = 0.0;
        }
        self.extent.merge(&geometry.envelope_2d());
        self.pending.push(geometry);
        if self.pending.len() >= self.config.union_batch_size {
            self.fold(tracker)?;
        }
        Ok(())
    }

    fn fold(&mut self, tracker: Option<&dyn ProgressTracker>) -> KernelResult<()> {
        let tol = tolerance_from_geometry(self.sr.as_ref(), &self.extent, true)
            .max(self.tolerance);
        if self.pending.is_empty() && (self.acc.is_none() || tol <= self.tolerance) {
            return Ok(());
        }
        let pending = std::mem::take(&mut self.pending);
        let merged = {
            let mut refs: Vec<&Geometry> = self.acc.iter().collect();
            refs.extend(pending.iter());
            union_all(&refs, tol, &self.config, tracker)?
        };
        self.acc = Some(merged);
        self.tolerance = tol;
        self.folds += 1;
        debug!(folds = self.folds, folded = pending.len(), tol, "pending inputs folded");
        Ok(())
    }

    /// Fold what is pending and hand out the result, resetting the state.
    pub fn finish(&mut self, tracker: Option<&dyn ProgressTracker>) -> KernelResult<Geometry> {
        self.fold(tracker)?;
        let result = match self.acc.take() {
            Some(g) => g,
            None => {
                let dimension = if self.empty_dimension >= 0 {
                    self.empty_dimension
                } else {
                    2
                };
                empty_of_dimension(dimension, self.description)
            }
        };
        info!(
            inputs = self.pushed,
            folds = self.folds,
            vertices = result.point_count(),
            "union finished"
        );
        *self = Self::new(self.config.clone(), self.sr);
        Ok(result)
    }
}

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Yields the union of everything its input produces, once.
pub struct UnionCursor<'a> {
    input: Box<dyn GeometryCursor + 'a>,
    union: IncrementalUnion,
    tracker: Option<&'a dyn ProgressTracker>,
    current: i64,
    done: bool,
}

impl<'a> UnionCursor<'a> {
    pub(crate) fn new(
        input: Box<dyn GeometryCursor + 'a>,
        config: KernelConfig,
        sr: Option<SpatialReference>,
        tracker: Option<&'a dyn ProgressTracker>,
    ) -> Self {
        Self {
            input,
            union: IncrementalUnion::new(config, sr),
            tracker,
            current: -1,
            done: false,
        }
    }

    fn drain(&mut self) -> KernelResult<Option<Geometry>> {
        while let Some(g) = self.input.next()? {
            self.union.push(g, self.tracker)?;
        }
        if self.input.is_pending() {
            return Ok(None);
        }
        self.union.finish(self.tracker).map(Some)
    }
}

impl GeometryCursor for UnionCursor<'_> {
    fn next(&mut self) -> KernelResult<Option<Geometry>> {
        if self.done {
            self.current = -1;
            return Ok(None);
        }
        match self.drain() {
            Ok(Some(g)) => {
                self.done = true;
                self.current = 0;
                Ok(Some(g))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                self.done = true;
                self.current = -1;
                Err(e)
            }
        }
    }

    fn current_id(&self) -> i64 {
        self.current
    }

    fn is_pending(&self) -> bool {
        !self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::SimpleGeometryCursor;
    use crate::error::KernelError;
    use crate::geometry::GeometryType;
    use std::cell::Cell;

    fn square(x0: f64, y0: f64, size: f64) -> Geometry {
        Geometry::polygon(&[vec![
            (x0, y0),
            (x0 + size, y0),
            (x0 + size, y0 + size),
            (x0, y0 + size),
        ]])
    }

    fn op() -> UnionOperator {
        UnionOperator::new(KernelConfig::default())
    }

    #[test]
    fn test_merge_cursor_gives_one_result() {
        let op = op();
        let inputs = SimpleGeometryCursor::new(vec![
            square(0.0, 0.0, 1.0),
            square(1.0, 0.0, 1.0),
            square(0.5, 0.5, 1.0),
        ]);
        let mut cursor = op.execute(Box::new(inputs), None, None);
        let g = cursor.next().unwrap().unwrap();
        assert_eq!(cursor.current_id(), 0);
        assert_eq!(g.as_multi_path().unwrap().paths.len(), 1);
        assert!((g.area() - 2.5).abs() < 1e-9);
        assert!(cursor.next().unwrap().is_none());
        assert!(cursor.next().unwrap().is_none());
        assert_eq!(cursor.current_id(), -1);
    }

    #[test]
    fn test_merge_crosses_batch_boundary() {
        let op = op();
        let squares: Vec<Geometry> = (0..40).map(|i| square(i as f64, 0.0, 1.0)).collect();
        let mut cursor = op.execute(Box::new(SimpleGeometryCursor::new(squares)), None, None);
        let g = cursor.next().unwrap().unwrap();
        assert_eq!(g.as_multi_path().unwrap().paths.len(), 1);
        assert!((g.area() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_cursor_gives_empty_polygon() {
        let op = op();
        let mut cursor = op.execute(Box::new(SimpleGeometryCursor::empty()), None, None);
        let g = cursor.next().unwrap().unwrap();
        assert!(g.is_empty());
        assert_eq!(g.geometry_type(), GeometryType::Polygon);
    }

    #[test]
    fn test_listening_mode() {
        let op = op();
        let (handle, mut cursor) = op.execute_listening(None, None);
        handle.push(square(0.0, 0.0, 1.0));
        assert!(cursor.next().unwrap().is_none());
        handle.push(square(1.0, 0.0, 1.0));
        handle.finish();
        let g = cursor.next().unwrap().unwrap();
        assert!((g.area() - 2.0).abs() < 1e-12);
        assert!(cursor.next().unwrap().is_none());
    }

    #[test]
    fn test_cancellation_on_second_poll() {
        let op = op();
        let calls = Cell::new(0);
        let tracker = |_step: i32, _total: i32| {
            calls.set(calls.get() + 1);
            calls.get() < 2
        };
        let squares: Vec<Geometry> = (0..50).map(|i| square(i as f64 * 3.0, 0.0, 1.0)).collect();
        let mut cursor = op.execute(Box::new(SimpleGeometryCursor::new(squares)), None, Some(&tracker));
        assert_eq!(cursor.next(), Err(KernelError::UserCancelled));
        assert!(cursor.next().unwrap().is_none());
    }

    #[test]
    fn test_pairwise_union_keeps_left_ids() {
        let op = op();
        let left = SimpleGeometryCursor::with_ids(vec![(7, square(0.0, 0.0, 1.0)), (9, square(5.0, 5.0, 1.0))]);
        let right = SimpleGeometryCursor::new(vec![square(1.0, 0.0, 1.0)]);
        let mut cursor = op.execute_pairwise(Box::new(left), Box::new(right), None, None);
        let first = cursor.next().unwrap().unwrap();
        assert_eq!(cursor.current_id(), 7);
        assert!((first.area() - 2.0).abs() < 1e-12);
        let second = cursor.next().unwrap().unwrap();
        assert_eq!(cursor.current_id(), 9);
        assert!((second.area() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pair_is_commutative_in_area() {
        let op = op();
        let (a, b) = (square(0.0, 0.0, 2.0), square(1.0, 1.0, 2.0));
        let ab = op.execute_pair(&a, &b, None, None).unwrap();
        let ba = op.execute_pair(&b, &a, None, None).unwrap();
        assert!((ab.area() - 7.0).abs() < 1e-12);
        assert!((ab.area() - ba.area()).abs() < 1e-12);
    }

    #[test]
    fn test_fold_tolerance_tracks_final_extent() {
        let config = KernelConfig {
            union_batch_size: 2,
            ..KernelConfig::default()
        };
        let squares = vec![
            square(0.0, 0.0, 1.0),
            square(0.5, 0.0, 1.0),
            square(1e3, 0.0, 1.0),
            square(1e3 + 0.5, 0.0, 1.0),
            square(1e6, 0.0, 1.0),
            square(1e6 + 0.5, 0.0, 1.0),
        ];
        let mut union = IncrementalUnion::new(config.clone(), None);
        let mut seen = Vec::new();
        for g in &squares {
            union.push(g.clone(), None).unwrap();
            seen.push(union.tolerance());
        }
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(union.tolerance(), operation_tolerance(None, squares.iter()));
        let streamed = union.finish(None).unwrap();
        let refs: Vec<&Geometry> = squares.iter().collect();
        let once = union_all(&refs, operation_tolerance(None, squares.iter()), &config, None).unwrap();
        assert!((streamed.area() - once.area()).abs() < 1e-6);
        assert_eq!(streamed.as_multi_path().unwrap().paths.len(), 3);
        assert_eq!(once.as_multi_path().unwrap().paths.len(), 3);
    }

    #[test]
    fn test_spatial_reference_tolerance_is_a_floor() {
        let sr = SpatialReference::with_tolerance(0.01);
        let mut union = IncrementalUnion::new(KernelConfig::default(), Some(sr));
        for i in 0..16 {
            union.push(square(i as f64, 0.0, 1.0), None).unwrap();
        }
        assert!((union.tolerance() - 0.011).abs() < 1e-15);
    }
}
