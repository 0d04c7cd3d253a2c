//! Optional spatial accelerators: a segment quad tree and a raster of the
//! interior. Both only prune work; every operator returns the same answer
//! without them.

pub mod cache;
pub mod quad_tree;
pub mod raster;

use std::sync::Arc;

use tracing::{debug, instrument};

pub use cache::AcceleratorCache;
pub use quad_tree::{QuadTree, QuadTreeQuery, SegmentQuadTree};
pub use raster::{CellState, RasterHit, RasterizedGeometry};

use crate::config::{AccelerationDegree, KernelConfig};
use crate::geometry::{Geometry, GeometryKey, MultiPath};

/// Accelerators built for one geometry.
#[derive(Debug, Clone)]
pub struct Accelerators {
    pub quad_tree: Option<SegmentQuadTree>,
    pub raster: Option<RasterizedGeometry>,
    pub degree: AccelerationDegree,
    /// Tolerance the raster's boundary band was built with.
    pub tolerance: f64,
}

fn multi_path_of(geometry: &Geometry) -> Option<(&MultiPath, bool)> {
    match geometry {
        Geometry::Polyline(mp) => Some((mp, false)),
        Geometry::Polygon(mp) => Some((mp, true)),
        _ => None,
    }
}

/// Non-empty polyline or polygon with enough vertices to amortize a tree.
pub fn can_use_quad_tree(geometry: &Geometry, config: &KernelConfig) -> bool {
    multi_path_of(geometry).is_some()
        && !geometry.is_empty()
        && geometry.point_count() >= config.quad_tree_min_vertices
}

pub fn can_use_rasterized_geometry(geometry: &Geometry) -> bool {
    multi_path_of(geometry).is_some() && !geometry.is_empty()
}

/// Build whatever accelerators `geometry` qualifies for.
#[instrument(skip(geometry, config))]
pub fn build_accelerators(
    geometry: &Geometry,
    tolerance: f64,
    degree: AccelerationDegree,
    config: &KernelConfig,
) -> Option<Accelerators> {
    let (mp, closed) = multi_path_of(geometry)?;
    let quad_tree = can_use_quad_tree(geometry, config)
        .then(|| SegmentQuadTree::from_multi_path(mp, closed));
    let raster = can_use_rasterized_geometry(geometry)
        .then(|| RasterizedGeometry::build(mp, closed, tolerance, config.raster.resolution(degree)));
    if quad_tree.is_none() && raster.is_none() {
        return None;
    }
    debug!(
        quad_tree = quad_tree.is_some(),
        raster = raster.is_some(),
        vertices = geometry.point_count(),
        "accelerators built"
    );
    Some(Accelerators {
        quad_tree,
        raster,
        degree,
        tolerance,
    })
}

/// Cached accelerators of `geometry`, if any.
pub fn lookup(cache: &AcceleratorCache, geometry: &Geometry) -> Option<Arc<Accelerators>> {
    let key: GeometryKey = geometry.key();
    cache.get(&key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(n: usize) -> Geometry {
        let coords: Vec<(f64, f64)> = (0..n)
            .map(|i| {
                let a = i as f64 * std::f64::consts::TAU / n as f64;
                (a.cos(), a.sin())
            })
            .collect();
        Geometry::polygon(&[coords])
    }

    #[test]
    fn test_quad_tree_gate() {
        let config = KernelConfig::default();
        assert!(!can_use_quad_tree(&ring(8), &config));
        assert!(can_use_quad_tree(&ring(24), &config));
        assert!(!can_use_quad_tree(&Geometry::multi_point(&[(0.0, 0.0); 30]), &config));
    }

    #[test]
    fn test_build_accelerators_for_large_polygon() {
        let acc = build_accelerators(&ring(32), 1e-9, AccelerationDegree::Medium, &KernelConfig::default())
            .unwrap();
        assert!(acc.quad_tree.is_some());
        assert_eq!(acc.raster.as_ref().map(|r| r.resolution()), Some(64));
        assert!(build_accelerators(&Geometry::point(0.0, 0.0), 1e-9, AccelerationDegree::Mild, &KernelConfig::default()).is_none());
    }
}
