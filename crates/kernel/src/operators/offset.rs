//! Offset: shift polylines sideways and grow or shrink polygons.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::buffer::{arc_points, dedup_points, BufferOperator, BufferParams, CapType, JoinType};
use super::simplify::simplify_polygon;
use super::MapCursor;
use crate::config::KernelConfig;
use crate::cursor::GeometryCursor;
use crate::error::{KernelError, KernelResult};
use crate::geometry::{Geometry, MultiPath, Path, Point2d, SpatialReference};
use crate::progress::ProgressTracker;
use crate::tolerance::tolerance_from_geometry;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OffsetParams {
    pub join: JoinType,
    pub miter_limit: f64,
    /// Largest gap between a round join and its chords; 0 uses 96 chords
    /// per full circle.
    pub flatten_error: f64,
}

impl Default for OffsetParams {
    fn default() -> Self {
        Self {
            join: JoinType::Round,
            miter_limit: 10.0,
            flatten_error: 0.0,
        }
    }
}

impl OffsetParams {
    fn buffer_params(&self) -> BufferParams {
        BufferParams {
            join: self.join,
            cap: CapType::Round,
            miter_limit: self.miter_limit,
            max_deviation: self.flatten_error,
            ..BufferParams::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct OffsetOperator {
    config: KernelConfig,
}

impl OffsetOperator {
    pub fn new(config: KernelConfig) -> Self {
        Self { config }
    }

    /// Offset every input by `distance`; positive is to the left of
    /// polyline paths and outward for polygons.
    pub fn execute<'a>(
        &'a self,
        inputs: Box<dyn GeometryCursor + 'a>,
        sr: Option<SpatialReference>,
        distance: f64,
        params: OffsetParams,
        tracker: Option<&'a dyn ProgressTracker>,
    ) -> KernelResult<Box<dyn GeometryCursor + 'a>> {
        if !distance.is_finite() {
            return Err(KernelError::invalid_argument("offset distance must be finite"));
        }
        params.buffer_params().validate()?;
        Ok(Box::new(MapCursor::new(inputs, tracker, move |_, g| {
            self.offset_geometry(&g, distance, sr.as_ref(), &params, tracker)
        })))
    }

    #[instrument(skip(self, geometry, sr, params, tracker))]
    pub fn offset_geometry(
        &self,
        geometry: &Geometry,
        distance: f64,
        sr: Option<&SpatialReference>,
        params: &OffsetParams,
        tracker: Option<&dyn ProgressTracker>,
    ) -> KernelResult<Geometry> {
        if geometry.is_empty() || distance == 0.0 {
            return Ok(geometry.clone());
        }
        let r = distance.abs();
        let env = geometry.envelope_2d().inflated(r, r);
        let tol = tolerance_from_geometry(sr, &env, true);
        match geometry {
            Geometry::Point(_) | Geometry::MultiPoint(_) => Ok(geometry.clone()),
            Geometry::Polyline(mp) => {
                let chords = params.buffer_params().circle_segments(r);
                let step = std::f64::consts::TAU / chords as f64;
                let paths = mp
                    .paths
                    .iter()
                    .filter_map(|path| {
                        let raw: Vec<Point2d> = path.points().collect();
                        let points = dedup_points(&raw, tol, false);
                        (points.len() >= 2).then(|| {
                            Path::from_points(&offset_path(&points, distance, params, step))
                        })
                    })
                    .collect();
                Ok(Geometry::Polyline(MultiPath::new(mp.description, paths)))
            }
            Geometry::Polygon(_) | Geometry::Envelope(_) => {
                let buffer = BufferOperator::new(self.config.clone());
                let buffer_params = params.buffer_params();
                let grown =
                    buffer.buffer_geometry(geometry, distance, sr, &buffer_params, tracker)?;
                if grown.is_empty() {
                    return Ok(grown);
                }
                Ok(Geometry::Polygon(simplify_polygon(&grown, tol, &self.config, tracker)?))
            }
        }
    }
}

/// Raw offset of an open path; loops on the inner side of tight turns are
/// left in place.
fn offset_path(
    points: &[Point2d],
    distance: f64,
    params: &OffsetParams,
    step: f64,
) -> Vec<Point2d> {
    let r = distance.abs();
    let side = distance.signum();
    let normals: Vec<(Point2d, Point2d)> = points
        .windows(2)
        .filter_map(|w| (w[1] - w[0]).normalized().map(|u| (u, u.left_normal() * side)))
        .collect();
    if normals.is_empty() {
        return points.to_vec();
    }
    let mut out = vec![points[0] + normals[0].1 * r];
    for i in 1..normals.len() {
        let p = points[i];
        let (u, n1) = normals[i - 1];
        let (v, n2) = normals[i];
        let end_prev = p + n1 * r;
        let start_next = p + n2 * r;
        let turn = u.cross(&v) * side;
        if turn.abs() <= 1e-12 && u.dot(&v) > 0.0 {
            out.push(end_prev);
            continue;
        }
        if turn > 0.0 {
            // Inner side: meet where the two offset lines cross.
            let denom = u.cross(&v);
            if denom.abs() > 1e-12 {
                let t = (start_next - end_prev).cross(&v) / denom;
                out.push(end_prev + u * t);
            } else {
                out.push(end_prev);
                out.push(start_next);
            }
            continue;
        }
        match params.join {
            JoinType::Round => out.extend(arc_points(p, n1, n2, r, step)),
            JoinType::Bevel => out.extend([end_prev, start_next]),
            JoinType::Miter => {
                let bisector = n1 + n2;
                let cos_half = bisector.length() / 2.0;
                match bisector.normalized() {
                    Some(dir) if cos_half > 0.0 && 1.0 / cos_half <= params.miter_limit => {
                        out.push(p + dir * (r / cos_half));
                    }
                    _ => out.extend([end_prev, start_next]),
                }
            }
            JoinType::Square => out.extend([end_prev + u * r, start_next - v * r]),
        }
    }
    let last = points.len() - 1;
    let (_, n_last) = normals[normals.len() - 1];
    out.push(points[last] + n_last * r);
    out
}
