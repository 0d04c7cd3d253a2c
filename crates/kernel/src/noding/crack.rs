//! Edge cracking: split edges wherever another edge or an isolated point
//! crosses or touches them within tolerance.

use std::collections::HashMap;

use tracing::debug;

use super::NodingMode;
use crate::error::KernelResult;
use crate::geometry::segment::{intersect_segments, SplitPoint};
use crate::geometry::{Envelope2D, Point2d};
use crate::progress::{ProgressTicker, ProgressTracker};
use crate::topology::edit_shape::{EditShape, GeometryId, VertexId};

/// A candidate for cracking: an edge, or an isolated point as a degenerate edge.
struct Item {
    from: VertexId,
    to: Option<VertexId>,
    a: Point2d,
    b: Point2d,
    geometry: GeometryId,
    env: Envelope2D,
}

fn collect_items(shape: &EditShape, tol: f64) -> Vec<Item> {
    let mut items = Vec::new();
    for g in shape.geometry_ids() {
        if shape.has_edges(g) {
            for e in shape.geometry_edges(g) {
                let (a, b) = (shape.xy(e.from), shape.xy(e.to));
                if a.is_nan() || b.is_nan() {
                    continue;
                }
                items.push(Item {
                    from: e.from,
                    to: Some(e.to),
                    a,
                    b,
                    geometry: g,
                    env: Envelope2D::from_segment(&a, &b).inflated(tol, tol),
                });
            }
        } else {
            for &path in shape.paths_of(g) {
                for v in shape.path_vertices(path) {
                    let a = shape.xy(v);
                    if a.is_nan() {
                        continue;
                    }
                    items.push(Item {
                        from: v,
                        to: None,
                        a,
                        b: a,
                        geometry: g,
                        env: Envelope2D::from_segment(&a, &a).inflated(tol, tol),
                    });
                }
            }
        }
    }
    items
}

/// Find all split points, then insert them. Returns the number of inserted vertices.
pub(crate) fn crack_edges(
    shape: &mut EditShape,
    tol: f64,
    mode: NodingMode,
    ticker: &mut ProgressTicker,
    tracker: Option<&dyn ProgressTracker>,
) -> KernelResult<usize> {
    let items = collect_items(shape, tol);
    let mut splits: HashMap<usize, Vec<SplitPoint>> = HashMap::new();

    // Sweep-and-prune on the x extent.
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by(|&a, &b| items[a].env.xmin.total_cmp(&items[b].env.xmin));

    for ii in 0..order.len() {
        let i = order[ii];
        for &j in &order[ii + 1..] {
            if items[j].env.xmin > items[i].env.xmax {
                break;
            }
            if items[i].env.ymax < items[j].env.ymin || items[j].env.ymax < items[i].env.ymin {
                continue;
            }
            let (ei, ej) = (&items[i], &items[j]);
            if ei.to.is_none() && ej.to.is_none() {
                continue;
            }
            if mode == NodingMode::SelfIntersections && ei.geometry != ej.geometry {
                continue;
            }
            let hit = intersect_segments(&ei.a, &ei.b, &ej.a, &ej.b, tol);
            if ei.to.is_some() && !hit.on_a.is_empty() {
                splits.entry(i).or_default().extend(hit.on_a);
            }
            if ej.to.is_some() && !hit.on_b.is_empty() {
                splits.entry(j).or_default().extend(hit.on_b);
            }
        }
        ticker.tick(tracker, 1)?;
    }

    let mut inserted = 0;
    let mut edges: Vec<usize> = splits.keys().copied().collect();
    edges.sort_unstable();
    for idx in edges {
        let item = &items[idx];
        let Some(to) = item.to else { continue };
        let mut points = splits.remove(&idx).unwrap_or_default();
        points.sort_by(|p, q| p.t.total_cmp(&q.t));
        points.dedup_by(|p, q| p.point.bits() == q.point.bits());
        let start = *shape.vertex(item.from);
        let end = *shape.vertex(to);
        let mut after = item.from;
        for sp in points {
            if sp.point.bits() == start.xy.bits() || sp.point.bits() == end.xy.bits() {
                continue;
            }
            let v = start.at_point_on_segment(&end, sp.t, sp.point);
            after = shape.insert_vertex_after(after, v);
            inserted += 1;
        }
    }
    debug!(candidates = items.len(), inserted, "cracked edges");
    Ok(inserted)
}
