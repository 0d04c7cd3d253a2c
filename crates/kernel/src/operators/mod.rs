//! Operators and their dispatch.
//!
//! Operators are a closed set: [`OperatorKind`] names them, [`Operator`]
//! holds one ready-to-run instance, and [`OperatorContext`] creates them from
//! an explicit configuration and accelerator cache. Nothing here is global.

pub mod boundary;
pub mod buffer;
pub mod clip;
pub mod convex_hull;
pub mod densify;
pub mod difference;
pub mod distance;
pub mod intersection;
pub mod offset;
pub(crate) mod overlay;
pub mod relate;
pub mod relation_matrix;
pub mod simplify;
pub mod symmetric_difference;
pub mod union;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

pub use boundary::BoundaryOperator;
pub use buffer::{BufferOperator, BufferParams, CapType, JoinType};
pub use clip::ClipOperator;
pub use convex_hull::ConvexHullOperator;
pub use densify::DensifyOperator;
pub use difference::DifferenceOperator;
pub use distance::DistanceOperator;
pub use intersection::IntersectionOperator;
pub use offset::{OffsetOperator, OffsetParams};
pub use relate::RelateOperator;
pub use relation_matrix::RelationMatrix;
pub use simplify::SimplifyOperator;
pub use symmetric_difference::SymmetricDifferenceOperator;
pub use union::{IncrementalUnion, UnionCursor, UnionOperator};

use crate::accel::{self, AcceleratorCache};
use crate::config::{AccelerationDegree, KernelConfig};
use crate::cursor::GeometryCursor;
use crate::error::{KernelError, KernelResult};
use crate::geometry::{Geometry, SpatialReference};
use crate::progress::{check_progress, ProgressTracker};
use crate::tolerance::tolerance_from_geometry;

/// Every operator kind a context can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorKind {
    Union,
    Difference,
    SymmetricDifference,
    Intersection,
    Buffer,
    Offset,
    Clip,
    Relate,
    Boundary,
    ConvexHull,
    Distance,
    Simplify,
    DensifyByLength,
    Project,
    ImportFromWkb,
    ExportToWkb,
    ImportFromWkt,
    ExportToWkt,
    ImportFromGeoJson,
    ExportToGeoJson,
    ImportFromEsriShape,
    ExportToEsriShape,
}

impl OperatorKind {
    /// Format import/export kinds, which live outside this crate.
    pub fn is_codec(self) -> bool {
        matches!(
            self,
            OperatorKind::ImportFromWkb
                | OperatorKind::ExportToWkb
                | OperatorKind::ImportFromWkt
                | OperatorKind::ExportToWkt
                | OperatorKind::ImportFromGeoJson
                | OperatorKind::ExportToGeoJson
                | OperatorKind::ImportFromEsriShape
                | OperatorKind::ExportToEsriShape
        )
    }
}

/// Operators combining two geometries into one.
pub trait BinaryOperator {
    fn kind(&self) -> OperatorKind;

    fn execute_pair(
        &self,
        a: &Geometry,
        b: &Geometry,
        sr: Option<&SpatialReference>,
        tracker: Option<&dyn ProgressTracker>,
    ) -> KernelResult<Geometry>;
}

/// One instantiated operator.
#[derive(Debug, Clone)]
pub enum Operator {
    Union(UnionOperator),
    Difference(DifferenceOperator),
    SymmetricDifference(SymmetricDifferenceOperator),
    Intersection(IntersectionOperator),
    Buffer(BufferOperator),
    Offset(OffsetOperator),
    Clip(ClipOperator),
    Relate(RelateOperator),
    Boundary(BoundaryOperator),
    ConvexHull(ConvexHullOperator),
    Distance(DistanceOperator),
    Simplify(SimplifyOperator),
    DensifyByLength(DensifyOperator),
}

impl Operator {
    pub fn kind(&self) -> OperatorKind {
        match self {
            Operator::Union(_) => OperatorKind::Union,
            Operator::Difference(_) => OperatorKind::Difference,
            Operator::SymmetricDifference(_) => OperatorKind::SymmetricDifference,
            Operator::Intersection(_) => OperatorKind::Intersection,
            Operator::Buffer(_) => OperatorKind::Buffer,
            Operator::Offset(_) => OperatorKind::Offset,
            Operator::Clip(_) => OperatorKind::Clip,
            Operator::Relate(_) => OperatorKind::Relate,
            Operator::Boundary(_) => OperatorKind::Boundary,
            Operator::ConvexHull(_) => OperatorKind::ConvexHull,
            Operator::Distance(_) => OperatorKind::Distance,
            Operator::Simplify(_) => OperatorKind::Simplify,
            Operator::DensifyByLength(_) => OperatorKind::DensifyByLength,
        }
    }

    /// The pairwise form, for the set operators.
    pub fn as_binary(&self) -> Option<&dyn BinaryOperator> {
        match self {
            Operator::Union(op) => Some(op),
            Operator::Difference(op) => Some(op),
            Operator::SymmetricDifference(op) => Some(op),
            Operator::Intersection(op) => Some(op),
            _ => None,
        }
    }
}

// ─── Context ─────────────────────────────────────────────────────────────────

/// Caller-owned factory for operators.
///
/// Cloning a context shares its accelerator cache.
#[derive(Debug, Clone)]
pub struct OperatorContext {
    config: KernelConfig,
    cache: Arc<AcceleratorCache>,
}

impl Default for OperatorContext {
    fn default() -> Self {
        let config = KernelConfig::default();
        let cache = Arc::new(AcceleratorCache::new(config.accelerator_cache_capacity));
        Self { config, cache }
    }
}

impl OperatorContext {
    pub fn new(config: KernelConfig) -> KernelResult<Self> {
        config.validate()?;
        let cache = Arc::new(AcceleratorCache::new(config.accelerator_cache_capacity));
        Ok(Self { config, cache })
    }

    /// Context sharing an existing accelerator cache.
    pub fn with_cache(config: KernelConfig, cache: Arc<AcceleratorCache>) -> KernelResult<Self> {
        config.validate()?;
        Ok(Self { config, cache })
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<AcceleratorCache> {
        &self.cache
    }

    /// Operator of the given kind. Codec and projection kinds are not part
    /// of this crate.
    pub fn operator(&self, kind: OperatorKind) -> KernelResult<Operator> {
        let config = self.config.clone();
        Ok(match kind {
            OperatorKind::Union => Operator::Union(UnionOperator::new(config)),
            OperatorKind::Difference => Operator::Difference(DifferenceOperator::new(config)),
            OperatorKind::SymmetricDifference => {
                Operator::SymmetricDifference(SymmetricDifferenceOperator::new(config))
            }
            OperatorKind::Intersection => Operator::Intersection(IntersectionOperator::new(config)),
            OperatorKind::Buffer => Operator::Buffer(BufferOperator::new(config)),
            OperatorKind::Offset => Operator::Offset(OffsetOperator::new(config)),
            OperatorKind::Clip => Operator::Clip(ClipOperator::new(config)),
            OperatorKind::Relate => {
                Operator::Relate(RelateOperator::new(config, Arc::clone(&self.cache)))
            }
            OperatorKind::Boundary => Operator::Boundary(BoundaryOperator::new()),
            OperatorKind::ConvexHull => Operator::ConvexHull(ConvexHullOperator::new()),
            OperatorKind::Distance => Operator::Distance(DistanceOperator::new()),
            OperatorKind::Simplify => Operator::Simplify(SimplifyOperator::new(config)),
            OperatorKind::DensifyByLength => Operator::DensifyByLength(DensifyOperator::new()),
            OperatorKind::Project => {
                return Err(KernelError::not_implemented("projection is not part of the kernel"))
            }
            codec => {
                return Err(KernelError::not_implemented(format!(
                    "{codec:?} is a format codec outside the kernel"
                )))
            }
        })
    }

    pub fn union(&self) -> UnionOperator {
        UnionOperator::new(self.config.clone())
    }

    pub fn difference(&self) -> DifferenceOperator {
        DifferenceOperator::new(self.config.clone())
    }

    pub fn symmetric_difference(&self) -> SymmetricDifferenceOperator {
        SymmetricDifferenceOperator::new(self.config.clone())
    }

    pub fn intersection(&self) -> IntersectionOperator {
        IntersectionOperator::new(self.config.clone())
    }

    pub fn buffer(&self) -> BufferOperator {
        BufferOperator::new(self.config.clone())
    }

    pub fn relate(&self) -> RelateOperator {
        RelateOperator::new(self.config.clone(), Arc::clone(&self.cache))
    }

    /// Build and cache accelerators for `geometry`.
    ///
    /// Returns false when the geometry does not qualify for any accelerator.
    #[instrument(skip(self, geometry, sr))]
    pub fn accelerate_geometry(
        &self,
        geometry: &Geometry,
        sr: Option<&SpatialReference>,
        degree: AccelerationDegree,
    ) -> bool {
        if !accel::can_use_rasterized_geometry(geometry)
            && !accel::can_use_quad_tree(geometry, &self.config)
        {
            return false;
        }
        let key = geometry.key();
        if self.cache.contains(&key) {
            return true;
        }
        let tol = tolerance_from_geometry(sr, &geometry.envelope_2d(), true);
        match accel::build_accelerators(geometry, tol, degree, &self.config) {
            Some(acc) => {
                self.cache.insert(key, acc);
                debug!(cached = self.cache.len(), "geometry accelerated");
                true
            }
            None => false,
        }
    }
}

// ─── Cursor plumbing shared by the operators ─────────────────────────────────

/// Applies a per-element function to an input cursor, keeping input ids.
pub(crate) struct MapCursor<'a, F> {
    input: Box<dyn GeometryCursor + 'a>,
    f: F,
    tracker: Option<&'a dyn ProgressTracker>,
    index: usize,
    current: i64,
    done: bool,
}

impl<'a, F> MapCursor<'a, F>
where
    F: FnMut(usize, Geometry) -> KernelResult<Geometry>,
{
    pub(crate) fn new(
        input: Box<dyn GeometryCursor + 'a>,
        tracker: Option<&'a dyn ProgressTracker>,
        f: F,
    ) -> Self {
        Self {
            input,
            f,
            tracker,
            index: 0,
            current: -1,
            done: false,
        }
    }
}

impl<F> MapCursor<'_, F>
where
    F: FnMut(usize, Geometry) -> KernelResult<Geometry>,
{
    fn advance(&mut self) -> KernelResult<Option<Geometry>> {
        let Some(geometry) = self.input.next()? else {
            self.done = !self.input.is_pending();
            self.current = -1;
            return Ok(None);
        };
        let step = i32::try_from(self.index + 1).unwrap_or(i32::MAX);
        check_progress(self.tracker, step, -1)?;
        let result = (self.f)(self.index, geometry)?;
        self.index += 1;
        self.current = self.input.current_id();
        Ok(Some(result))
    }
}

impl<F> GeometryCursor for MapCursor<'_, F>
where
    F: FnMut(usize, Geometry) -> KernelResult<Geometry>,
{
    fn next(&mut self) -> KernelResult<Option<Geometry>> {
        if self.done {
            return Ok(None);
        }
        let result = self.advance();
        if result.is_err() {
            self.done = true;
            self.current = -1;
        }
        result
    }

    fn current_id(&self) -> i64 {
        self.current
    }

    fn is_pending(&self) -> bool {
        !self.done && self.input.is_pending()
    }
}

/// Applies a binary operator between every input and the first element of
/// a second cursor. The second cursor is read on the first `next` call; when
/// it is empty the output is empty.
pub(crate) struct BinaryCursor<'a, O: ?Sized> {
    op: &'a O,
    inputs: Box<dyn GeometryCursor + 'a>,
    other_source: Option<Box<dyn GeometryCursor + 'a>>,
    other: Option<Geometry>,
    sr: Option<SpatialReference>,
    tracker: Option<&'a dyn ProgressTracker>,
    index: i32,
    current: i64,
    done: bool,
}

impl<'a, O: BinaryOperator + ?Sized> BinaryCursor<'a, O> {
    pub(crate) fn new(
        op: &'a O,
        inputs: Box<dyn GeometryCursor + 'a>,
        other: Box<dyn GeometryCursor + 'a>,
        sr: Option<SpatialReference>,
        tracker: Option<&'a dyn ProgressTracker>,
    ) -> Self {
        Self {
            op,
            inputs,
            other_source: Some(other),
            other: None,
            sr,
            tracker,
            index: 0,
            current: -1,
            done: false,
        }
    }
}

impl<O: BinaryOperator + ?Sized> GeometryCursor for BinaryCursor<'_, O> {
    fn next(&mut self) -> KernelResult<Option<Geometry>> {
        if self.done {
            return Ok(None);
        }
        let result = self.advance();
        if result.is_err() {
            self.done = true;
            self.current = -1;
        }
        result
    }

    fn current_id(&self) -> i64 {
        self.current
    }
}

impl<O: BinaryOperator + ?Sized> BinaryCursor<'_, O> {
    fn advance(&mut self) -> KernelResult<Option<Geometry>> {
        if let Some(mut source) = self.other_source.take() {
            self.other = source.next()?;
        }
        let Some(other) = self.other.as_ref() else {
            debug!(kind = ?self.op.kind(), "second cursor empty, no results");
            self.done = true;
            return Ok(None);
        };
        let Some(geometry) = self.inputs.next()? else {
            self.done = true;
            self.current = -1;
            return Ok(None);
        };
        self.index += 1;
        check_progress(self.tracker, self.index, -1)?;
        let result = self
            .op
            .execute_pair(&geometry, other, self.sr.as_ref(), self.tracker)?;
        self.current = self.inputs.current_id();
        Ok(Some(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kernel_kind_has_an_operator() {
        let ctx = OperatorContext::default();
        let kinds = [
            OperatorKind::Union,
            OperatorKind::Difference,
            OperatorKind::SymmetricDifference,
            OperatorKind::Intersection,
            OperatorKind::Buffer,
            OperatorKind::Offset,
            OperatorKind::Clip,
            OperatorKind::Relate,
            OperatorKind::Boundary,
            OperatorKind::ConvexHull,
            OperatorKind::Distance,
            OperatorKind::Simplify,
            OperatorKind::DensifyByLength,
        ];
        for kind in kinds {
            assert_eq!(ctx.operator(kind).unwrap().kind(), kind);
        }
    }

    #[test]
    fn test_codec_and_projection_kinds_not_implemented() {
        let ctx = OperatorContext::default();
        for kind in [OperatorKind::Project, OperatorKind::ImportFromWkt, OperatorKind::ExportToGeoJson] {
            match ctx.operator(kind) {
                Err(KernelError::NotImplemented { .. }) => {}
                other => panic!("expected NotImplemented for {kind:?}, got {other:?}"),
            }
        }
        assert!(OperatorKind::ExportToEsriShape.is_codec());
        assert!(!OperatorKind::Project.is_codec());
    }

    #[test]
    fn test_set_operators_are_binary() {
        let ctx = OperatorContext::default();
        assert!(ctx.operator(OperatorKind::Union).unwrap().as_binary().is_some());
        assert!(ctx.operator(OperatorKind::Buffer).unwrap().as_binary().is_none());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = KernelConfig {
            union_batch_size: 1,
            ..KernelConfig::default()
        };
        assert!(OperatorContext::new(config).is_err());
    }

    #[test]
    fn test_accelerate_geometry_caches_once() {
        let ctx = OperatorContext::default();
        let coords: Vec<(f64, f64)> = (0..32)
            .map(|i| {
                let a = i as f64 * std::f64::consts::TAU / 32.0;
                (a.cos(), a.sin())
            })
            .collect();
        let circle = Geometry::polygon(&[coords]);
        assert!(ctx.accelerate_geometry(&circle, None, AccelerationDegree::Mild));
        assert!(ctx.accelerate_geometry(&circle, None, AccelerationDegree::Mild));
        assert_eq!(ctx.cache().len(), 1);
        assert!(!ctx.accelerate_geometry(&Geometry::point(0.0, 0.0), None, AccelerationDegree::Mild));
    }
}
