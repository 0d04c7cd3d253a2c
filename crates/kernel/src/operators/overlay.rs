//! Pairwise and n-ary overlay.
//!
//! Operands are loaded side by side into one [`EditShape`], noded jointly,
//! turned into a [`TopoGraph`], and the faces, edges or nodes making up the
//! result are extracted according to per-operand membership.

use tracing::{debug, instrument};

use crate::config::KernelConfig;
use crate::error::KernelResult;
use crate::geometry::{Geometry, GeometryType, MultiPoint, Point, VertexDescription};
use crate::noding::{node_edit_shape, NodingMode};
use crate::progress::ProgressTracker;
use crate::topology::classify::Location;
use crate::topology::edit_shape::{EditShape, GeometryId};
use crate::topology::topo_graph::{TopoGraph, MAX_OPERANDS};

/// Node `operands` together and build their topology graph.
pub(crate) fn overlay_graph(
    operands: &[&Geometry],
    tol: f64,
    mode: NodingMode,
    config: &KernelConfig,
    tracker: Option<&dyn ProgressTracker>,
) -> KernelResult<TopoGraph> {
    let mut shape = EditShape::new();
    let ids: Vec<GeometryId> = operands.iter().map(|g| shape.add_geometry(g)).collect();
    node_edit_shape(&mut shape, tol, mode, config, tracker)?;
    TopoGraph::build(&shape, &ids, tol)
}

/// Empty result geometry of the given dimension.
pub(crate) fn empty_of_dimension(dimension: i32, description: VertexDescription) -> Geometry {
    let kind = match dimension {
        0 => GeometryType::MultiPoint,
        1 => GeometryType::Polyline,
        _ => GeometryType::Polygon,
    };
    Geometry::empty(kind, description)
}

/// Point results keep the `Point` type when the template was a single point.
fn points_result(template: &Geometry, points: MultiPoint) -> Geometry {
    match template {
        Geometry::Point(p) if points.points.len() <= 1 => Geometry::Point(Point {
            description: p.description.merge(points.description),
            vertex: points.points.first().copied(),
        }),
        _ => Geometry::MultiPoint(points),
    }
}

fn envelopes_apart(a: &Geometry, b: &Geometry, tol: f64) -> bool {
    !a.envelope_2d().inflated(tol, tol).intersects(&b.envelope_2d())
}

// ─── Union ───────────────────────────────────────────────────────────────────

fn extract_union(graph: &TopoGraph, dimension: i32) -> Geometry {
    match dimension {
        2 => Geometry::Polygon(graph.extract_polygon(|mask| mask != 0)),
        1 => Geometry::Polyline(graph.extract_polyline(|_, e| e.line_mask != 0)),
        _ => Geometry::MultiPoint(graph.extract_points(|_, n| n.point_mask != 0)),
    }
}

/// Union of any number of geometries.
///
/// The result has the highest dimension among the non-empty inputs; inputs
/// of lower dimension do not contribute. More than [`MAX_OPERANDS`] inputs
/// are folded in batches into a running result.
#[instrument(skip_all, fields(inputs = geometries.len()))]
pub(crate) fn union_all(
    geometries: &[&Geometry],
    tol: f64,
    config: &KernelConfig,
    tracker: Option<&dyn ProgressTracker>,
) -> KernelResult<Geometry> {
    let description = geometries
        .iter()
        .fold(VertexDescription::XY, |d, g| d.merge(g.description()));
    let Some(dimension) = geometries
        .iter()
        .filter(|g| !g.is_empty())
        .map(|g| g.dimension())
        .max()
    else {
        let dimension = geometries.iter().map(|g| g.dimension()).max().unwrap_or(2);
        return Ok(empty_of_dimension(dimension, description));
    };
    let parts: Vec<&Geometry> = geometries
        .iter()
        .copied()
        .filter(|g| !g.is_empty() && g.dimension() == dimension)
        .collect();

    let mut acc: Option<Geometry> = None;
    let mut rest = &parts[..];
    let mut batches = 0usize;
    loop {
        let room = if acc.is_some() { MAX_OPERANDS - 1 } else { MAX_OPERANDS };
        let take = room.min(rest.len());
        let merged = {
            let mut batch: Vec<&Geometry> = acc.iter().collect();
            batch.extend_from_slice(&rest[..take]);
            let graph = overlay_graph(&batch, tol, NodingMode::AllIntersections, config, tracker)?;
            extract_union(&graph, dimension)
        };
        acc = Some(merged);
        rest = &rest[take..];
        batches += 1;
        if rest.is_empty() {
            break;
        }
    }
    debug!(batches, dimension, "union folded");
    Ok(acc.unwrap_or_else(|| empty_of_dimension(dimension, description)))
}

// ─── Difference ──────────────────────────────────────────────────────────────

/// `a` minus `b`. Returns `a` itself whenever `b` cannot remove anything.
#[instrument(skip_all)]
pub(crate) fn difference_pair(
    a: &Geometry,
    b: &Geometry,
    tol: f64,
    config: &KernelConfig,
    tracker: Option<&dyn ProgressTracker>,
) -> KernelResult<Geometry> {
    if a.is_empty() || b.is_empty() || envelopes_apart(a, b, tol) {
        return Ok(a.clone());
    }
    match (a.dimension(), b.dimension()) {
        (2, d) if d < 2 => return Ok(a.clone()),
        (1, 0) => return Ok(a.clone()),
        _ => {}
    }
    let graph = overlay_graph(&[a, b], tol, NodingMode::AllIntersections, config, tracker)?;
    Ok(match a.dimension() {
        2 => Geometry::Polygon(graph.extract_polygon(|mask| mask & 1 != 0 && mask & 2 == 0)),
        1 => Geometry::Polyline(graph.extract_polyline(|e, edge| {
            edge.line_mask & 1 != 0 && graph.edge_location(e, 1) == Location::Exterior
        })),
        _ => points_result(
            a,
            graph.extract_points(|n, node| {
                node.point_mask & 1 != 0 && graph.node_location(n, 1) == Location::Exterior
            }),
        ),
    })
}

// ─── Symmetric difference ────────────────────────────────────────────────────

/// Points in exactly one of `a` and `b`.
///
/// With operands of different dimension the lower one cannot change the
/// higher one, and the higher-dimension operand is the result.
#[instrument(skip_all)]
pub(crate) fn symmetric_difference_pair(
    a: &Geometry,
    b: &Geometry,
    tol: f64,
    config: &KernelConfig,
    tracker: Option<&dyn ProgressTracker>,
) -> KernelResult<Geometry> {
    if b.is_empty() {
        return Ok(a.clone());
    }
    if a.is_empty() {
        return Ok(b.clone());
    }
    if a.dimension() != b.dimension() {
        return Ok(if a.dimension() > b.dimension() {
            a.clone()
        } else {
            b.clone()
        });
    }
    let graph = overlay_graph(&[a, b], tol, NodingMode::AllIntersections, config, tracker)?;
    let in_one = |mask: u64| (mask & 1 != 0) != (mask & 2 != 0);
    Ok(match a.dimension() {
        2 => Geometry::Polygon(graph.extract_polygon(in_one)),
        1 => Geometry::Polyline(graph.extract_polyline(|_, e| in_one(e.line_mask))),
        _ => points_result(a, graph.extract_points(|_, n| in_one(n.point_mask))),
    })
}

// ─── Intersection ────────────────────────────────────────────────────────────

/// Common part of `a` and `b`, of the lower of the two dimensions.
#[instrument(skip_all)]
pub(crate) fn intersection_pair(
    a: &Geometry,
    b: &Geometry,
    tol: f64,
    config: &KernelConfig,
    tracker: Option<&dyn ProgressTracker>,
) -> KernelResult<Geometry> {
    let dimension = a.dimension().min(b.dimension());
    let description = a.description().merge(b.description());
    if a.is_empty() || b.is_empty() || envelopes_apart(a, b, tol) {
        return Ok(empty_of_dimension(dimension, description));
    }
    if let Geometry::Envelope(e) = b {
        if e.rect.contains(&a.envelope_2d()) {
            return Ok(a.clone());
        }
    }
    if let Geometry::Envelope(e) = a {
        if e.rect.contains(&b.envelope_2d()) {
            return Ok(b.clone());
        }
    }

    let graph = overlay_graph(&[a, b], tol, NodingMode::AllIntersections, config, tracker)?;
    // Index of the lower-dimension operand and of the other one.
    let (low, other) = if a.dimension() <= b.dimension() { (0, 1) } else { (1, 0) };
    let low_bit = 1u64 << low;
    Ok(match dimension {
        2 => Geometry::Polygon(graph.extract_polygon(|mask| mask & 3 == 3)),
        1 => Geometry::Polyline(graph.extract_polyline(|e, edge| {
            edge.line_mask & low_bit != 0 && graph.edge_location(e, other) != Location::Exterior
        })),
        _ => {
            let template = if low == 0 { a } else { b };
            points_result(
                template,
                graph.extract_points(|n, node| {
                    node.point_mask & low_bit != 0
                        && graph.node_location(n, other) != Location::Exterior
                }),
            )
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    fn square(x0: f64, y0: f64, size: f64) -> Geometry {
        Geometry::polygon(&[vec![
            (x0, y0),
            (x0 + size, y0),
            (x0 + size, y0 + size),
            (x0, y0 + size),
        ]])
    }

    fn config() -> KernelConfig {
        KernelConfig::default()
    }

    #[test]
    fn test_union_of_adjacent_squares() {
        let (a, b) = (square(0.0, 0.0, 1.0), square(1.0, 0.0, 1.0));
        let u = union_all(&[&a, &b], TOL, &config(), None).unwrap();
        let mp = u.as_multi_path().unwrap();
        assert_eq!(mp.paths.len(), 1);
        assert_eq!(mp.paths[0].len(), 4);
        assert!((u.area() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_union_ignores_lower_dimension() {
        let a = square(0.0, 0.0, 1.0);
        let line = Geometry::polyline(&[vec![(5.0, 5.0), (6.0, 6.0)]]);
        let u = union_all(&[&a, &line], TOL, &config(), None).unwrap();
        assert_eq!(u.geometry_type(), GeometryType::Polygon);
        assert!((u.area() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_union_of_many_squares_batches() {
        let squares: Vec<Geometry> = (0..70).map(|i| square(i as f64 * 2.0, 0.0, 1.0)).collect();
        let refs: Vec<&Geometry> = squares.iter().collect();
        let u = union_all(&refs, 1e-8, &config(), None).unwrap();
        assert_eq!(u.as_multi_path().unwrap().paths.len(), 70);
        assert!((u.area() - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_difference_with_itself_is_empty() {
        let a = square(0.0, 0.0, 1.0);
        let d = difference_pair(&a, &a, TOL, &config(), None).unwrap();
        assert!(d.is_empty());
    }

    #[test]
    fn test_difference_of_overlapping_squares() {
        let (a, b) = (square(0.0, 0.0, 2.0), square(1.0, 1.0, 2.0));
        let d = difference_pair(&a, &b, TOL, &config(), None).unwrap();
        assert!((d.area() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_difference_disjoint_returns_input() {
        let (a, b) = (square(0.0, 0.0, 1.0), square(5.0, 5.0, 1.0));
        let d = difference_pair(&a, &b, TOL, &config(), None).unwrap();
        assert_eq!(d, a);
    }

    #[test]
    fn test_line_minus_polygon() {
        let line = Geometry::polyline(&[vec![(-1.0, 0.5), (2.0, 0.5)]]);
        let d = difference_pair(&line, &square(0.0, 0.0, 1.0), TOL, &config(), None).unwrap();
        assert_eq!(d.geometry_type(), GeometryType::Polyline);
        assert!((d.length() - 2.0).abs() < 1e-12);
        assert_eq!(d.as_multi_path().unwrap().paths.len(), 2);
    }

    #[test]
    fn test_point_minus_polygon() {
        let inside = Geometry::point(0.5, 0.5);
        let d = difference_pair(&inside, &square(0.0, 0.0, 1.0), TOL, &config(), None).unwrap();
        assert_eq!(d.geometry_type(), GeometryType::Point);
        assert!(d.is_empty());
    }

    #[test]
    fn test_symmetric_difference_area() {
        let (a, b) = (square(0.0, 0.0, 2.0), square(1.0, 1.0, 2.0));
        let s = symmetric_difference_pair(&a, &b, TOL, &config(), None).unwrap();
        assert!((s.area() - 6.0).abs() < 1e-12);
        let same = symmetric_difference_pair(&a, &a, TOL, &config(), None).unwrap();
        assert!(same.is_empty());
    }

    #[test]
    fn test_intersection_of_polygons() {
        let (a, b) = (square(0.0, 0.0, 2.0), square(1.0, 1.0, 2.0));
        let i = intersection_pair(&a, &b, TOL, &config(), None).unwrap();
        assert!((i.area() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_intersection_line_with_polygon() {
        let line = Geometry::polyline(&[vec![(-1.0, 0.5), (2.0, 0.5)]]);
        let i = intersection_pair(&square(0.0, 0.0, 1.0), &line, TOL, &config(), None).unwrap();
        assert_eq!(i.geometry_type(), GeometryType::Polyline);
        assert!((i.length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_intersection_inside_envelope_returns_operand() {
        let a = square(1.0, 1.0, 1.0);
        let env = Geometry::envelope(0.0, 0.0, 5.0, 5.0);
        let i = intersection_pair(&a, &env, TOL, &config(), None).unwrap();
        assert_eq!(i, a);
    }
}
