//! OGC-style simplify: make a geometry topologically clean.
//!
//! Polygons are noded against themselves and rebuilt with even-odd fill,
//! so self-crossing rings split into valid rings and doubled edges cancel.
//! Polylines lose degenerate segments; multipoints lose duplicates.

use std::collections::HashSet;

use tracing::instrument;

use super::MapCursor;
use crate::config::KernelConfig;
use crate::cursor::GeometryCursor;
use crate::error::KernelResult;
use crate::geometry::{Geometry, MultiPath, MultiPoint, SpatialReference};
use crate::noding::{node_edit_shape, NodingMode};
use crate::progress::ProgressTracker;
use crate::tolerance::tolerance_from_geometry;
use crate::topology::edit_shape::EditShape;
use crate::topology::topo_graph::TopoGraph;

#[derive(Debug, Clone)]
pub struct SimplifyOperator {
    config: KernelConfig,
}

impl SimplifyOperator {
    pub fn new(config: KernelConfig) -> Self {
        Self { config }
    }

    pub fn execute<'a>(
        &'a self,
        inputs: Box<dyn GeometryCursor + 'a>,
        sr: Option<SpatialReference>,
        tracker: Option<&'a dyn ProgressTracker>,
    ) -> Box<dyn GeometryCursor + 'a> {
        Box::new(MapCursor::new(inputs, tracker, move |_, g| {
            self.simplify_geometry(&g, sr.as_ref(), tracker)
        }))
    }

    #[instrument(skip_all, fields(kind = ?geometry.geometry_type()))]
    pub fn simplify_geometry(
        &self,
        geometry: &Geometry,
        sr: Option<&SpatialReference>,
        tracker: Option<&dyn ProgressTracker>,
    ) -> KernelResult<Geometry> {
        if geometry.is_empty() {
            return Ok(geometry.clone());
        }
        let tol = tolerance_from_geometry(sr, &geometry.envelope_2d(), true);
        match geometry {
            Geometry::Point(_) => Ok(geometry.clone()),
            Geometry::Envelope(_) => Ok(geometry.to_multi_path_form()),
            Geometry::MultiPoint(_) => {
                let noded = self.self_noded(geometry, tol, tracker)?;
                let Geometry::MultiPoint(mp) = noded else {
                    return Ok(noded);
                };
                let mut seen = HashSet::new();
                let points = mp
                    .points
                    .into_iter()
                    .filter(|v| seen.insert(v.xy.bits()))
                    .collect();
                Ok(Geometry::MultiPoint(MultiPoint::new(mp.description, points)))
            }
            Geometry::Polyline(_) => self.self_noded(geometry, tol, tracker),
            Geometry::Polygon(_) => Ok(Geometry::Polygon(simplify_polygon(
                geometry,
                tol,
                &self.config,
                tracker,
            )?)),
        }
    }

    fn self_noded(
        &self,
        geometry: &Geometry,
        tol: f64,
        tracker: Option<&dyn ProgressTracker>,
    ) -> KernelResult<Geometry> {
        let mut shape = EditShape::new();
        let id = shape.add_geometry(geometry);
        node_edit_shape(&mut shape, tol, NodingMode::SelfIntersections, &self.config, tracker)?;
        Ok(shape.get_geometry(id))
    }
}

/// Even-odd rebuild of a polygon (or envelope) noded against itself.
pub(crate) fn simplify_polygon(
    geometry: &Geometry,
    tol: f64,
    config: &KernelConfig,
    tracker: Option<&dyn ProgressTracker>,
) -> KernelResult<MultiPath> {
    let mut shape = EditShape::new();
    let id = shape.add_geometry(geometry);
    node_edit_shape(&mut shape, tol, NodingMode::SelfIntersections, config, tracker)?;
    let graph = TopoGraph::build(&shape, &[id], tol)?;
    Ok(graph.extract_polygon(|mask| mask & 1 != 0))
}
