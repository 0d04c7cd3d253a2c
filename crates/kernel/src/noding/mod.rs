//! Crack-and-cluster noding of an [`EditShape`].
//!
//! Clustering snaps vertices closer than the tolerance onto one
//! representative; cracking inserts shared vertices where edges cross or
//! touch. Both run alternately, with degenerate edges filtered in between,
//! until a round changes nothing.

pub mod cluster;
pub mod crack;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::config::KernelConfig;
use crate::error::KernelResult;
use crate::progress::{ProgressTicker, ProgressTracker};
use crate::topology::edit_shape::EditShape;

/// Which intersections the noder resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodingMode {
    /// Only intersections between edges of the same geometry.
    SelfIntersections,
    /// Intersections between all geometries in the shape, jointly.
    AllIntersections,
}

/// Counters from one noding call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodingReport {
    pub iterations: usize,
    pub clustered: usize,
    pub removed: usize,
    pub inserted: usize,
    pub converged: bool,
}

/// Node `shape` in place with tolerance `tol`.
///
/// Re-running on an already noded shape with the same tolerance leaves every
/// vertex untouched.
#[instrument(skip(shape, config, tracker))]
pub fn node_edit_shape(
    shape: &mut EditShape,
    tol: f64,
    mode: NodingMode,
    config: &KernelConfig,
    tracker: Option<&dyn ProgressTracker>,
) -> KernelResult<NodingReport> {
    let total = i32::try_from(shape.total_point_count()).unwrap_or(i32::MAX);
    let mut ticker = ProgressTicker::new(config.progress_interval, total);
    let mut report = NodingReport::default();

    while report.iterations < config.max_noding_iterations {
        report.iterations += 1;
        ticker.poll(tracker)?;
        let moved = cluster::cluster_vertices(shape, tol, mode, &mut ticker, tracker)?;
        let removed = shape.filter_degenerate();
        let inserted = crack::crack_edges(shape, tol, mode, &mut ticker, tracker)?;
        report.clustered += moved;
        report.removed += removed;
        report.inserted += inserted;
        if moved == 0 && removed == 0 && inserted == 0 {
            report.converged = true;
            break;
        }
    }

    if !report.converged {
        warn!(
            iterations = report.iterations,
            "noding stopped at the iteration cap before reaching a fixed point"
        );
    }
    info!(
        iterations = report.iterations,
        clustered = report.clustered,
        removed = report.removed,
        inserted = report.inserted,
        vertices = shape.total_point_count(),
        "noding complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KernelError;
    use crate::geometry::{Geometry, Point2d};

    fn snapshot(shape: &EditShape) -> Vec<(u64, u64)> {
        shape.vertex_ids().map(|v| shape.xy(v).bits()).collect()
    }

    #[test]
    fn test_overlapping_squares_are_noded() {
        let mut shape = EditShape::new();
        shape.add_geometry(&Geometry::polygon(&[vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]]));
        shape.add_geometry(&Geometry::polygon(&[vec![(1.0, 1.0), (3.0, 1.0), (3.0, 3.0), (1.0, 3.0)]]));
        let report =
            node_edit_shape(&mut shape, 1e-9, NodingMode::AllIntersections, &KernelConfig::default(), None)
                .unwrap();
        assert!(report.converged);
        assert_eq!(report.inserted, 4);
        assert!(shape.audit(1e-9).is_noded());
    }

    #[test]
    fn test_noding_is_idempotent() {
        let mut shape = EditShape::new();
        shape.add_geometry(&Geometry::polygon(&[vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]]));
        shape.add_geometry(&Geometry::polyline(&[vec![(-1.0, 2.0), (5.0, 2.0), (2.0, -1.0)]]));
        shape.add_geometry(&Geometry::point(2.0, 4.0 + 1e-12));
        let config = KernelConfig::default();
        node_edit_shape(&mut shape, 1e-9, NodingMode::AllIntersections, &config, None).unwrap();
        let before = snapshot(&shape);
        let again =
            node_edit_shape(&mut shape, 1e-9, NodingMode::AllIntersections, &config, None).unwrap();
        assert_eq!(again.iterations, 1);
        assert_eq!(snapshot(&shape), before);
    }

    #[test]
    fn test_near_vertex_snaps_onto_edge() {
        let mut shape = EditShape::new();
        let sq = shape.add_geometry(&Geometry::polygon(&[vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]]));
        shape.add_geometry(&Geometry::polygon(&[vec![(1.0, 1e-12), (1.5, -1.0), (1.8, 1e-12)]]));
        node_edit_shape(&mut shape, 1e-9, NodingMode::AllIntersections, &KernelConfig::default(), None)
            .unwrap();
        let ring: Vec<Point2d> = shape
            .path_vertices(shape.paths_of(sq)[0])
            .map(|v| shape.xy(v))
            .collect();
        assert_eq!(ring.len(), 6);
        assert!(ring.contains(&Point2d::new(1.0, 1e-12)));
    }

    #[test]
    fn test_cancellation_propagates() {
        let mut shape = EditShape::new();
        shape.add_geometry(&Geometry::polygon(&[vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]]));
        let refuse = |_: i32, _: i32| false;
        let err = node_edit_shape(
            &mut shape,
            1e-9,
            NodingMode::AllIntersections,
            &KernelConfig::default(),
            Some(&refuse),
        )
        .unwrap_err();
        assert_eq!(err, KernelError::UserCancelled);
    }
}
