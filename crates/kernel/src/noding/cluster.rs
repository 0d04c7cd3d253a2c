//! Vertex clustering: snap every vertex to the representative of its
//! tolerance cluster.

use std::collections::HashMap;

use tracing::debug;

use super::NodingMode;
use crate::error::KernelResult;
use crate::progress::{ProgressTicker, ProgressTracker};
use crate::topology::edit_shape::{EditShape, GeometryId, VertexId};

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    /// The smaller root wins, so a cluster's representative is its earliest member.
    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra < rb {
            self.parent[rb] = ra;
        } else if rb < ra {
            self.parent[ra] = rb;
        }
    }
}

fn cell_of(x: f64, y: f64, cell: f64) -> (i64, i64) {
    ((x / cell).floor() as i64, (y / cell).floor() as i64)
}

/// Merge vertices closer than `tol` into their cluster representative.
///
/// Clusters are transitive. Each member takes the coordinates of the member
/// visited first, bit for bit. Returns the number of vertices that moved.
pub(crate) fn cluster_vertices(
    shape: &mut EditShape,
    tol: f64,
    mode: NodingMode,
    ticker: &mut ProgressTicker,
    tracker: Option<&dyn ProgressTracker>,
) -> KernelResult<usize> {
    let ids: Vec<(VertexId, GeometryId)> = shape
        .vertex_ids()
        .filter(|&v| !shape.xy(v).is_nan())
        .map(|v| (v, shape.geometry_of_vertex(v)))
        .collect();
    if ids.len() < 2 {
        return Ok(0);
    }
    let cell = if tol > 0.0 { tol } else { f64::MIN_POSITIVE };

    let mut grid: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    let mut uf = UnionFind::new(ids.len());
    for (i, &(v, g)) in ids.iter().enumerate() {
        let p = shape.xy(v);
        let (cx, cy) = cell_of(p.x, p.y, cell);
        for dx in -1..=1 {
            for dy in -1..=1 {
                let Some(members) = grid.get(&(cx.saturating_add(dx), cy.saturating_add(dy))) else {
                    continue;
                };
                for &j in members {
                    let (w, h) = ids[j];
                    if mode == NodingMode::SelfIntersections && g != h {
                        continue;
                    }
                    if p.distance_to(&shape.xy(w)) <= tol {
                        uf.union(i, j);
                    }
                }
            }
        }
        grid.entry((cx, cy)).or_default().push(i);
        ticker.tick(tracker, 1)?;
    }

    let mut moved = 0;
    for i in 0..ids.len() {
        let rep = uf.find(i);
        if rep == i {
            continue;
        }
        let target = shape.xy(ids[rep].0);
        let v = ids[i].0;
        if shape.xy(v).bits() != target.bits() {
            shape.set_xy(v, target);
            moved += 1;
        }
    }
    debug!(vertices = ids.len(), moved, "clustered vertices");
    Ok(moved)
}
