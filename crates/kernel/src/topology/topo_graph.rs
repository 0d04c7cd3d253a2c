//! Planar topology graph over a noded [`EditShape`].
//!
//! Nodes are distinct coordinates and edges are distinct node pairs. Each
//! edge records, per operand, the parity of polygon boundaries running along
//! it and whether a polyline covers it. Half-edges `2e` (from -> to) and
//! `2e + 1` (to -> from) are ordered counter-clockwise around their origin;
//! faces lie to the left of their half-edges.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, instrument, warn};

use crate::error::{KernelError, KernelResult};
use crate::geometry::multi_path::{ring_contains_point, ring_signed_area};
use crate::geometry::segment::closest_param;
use crate::geometry::{
    Envelope2D, GeometryType, MultiPath, MultiPoint, Path, Point2d, Vertex, VertexDescription,
};
use crate::topology::edit_shape::{EditShape, GeometryId};

/// Operands are tracked in a 64-bit mask.
pub const MAX_OPERANDS: usize = 64;

/// The face outside every cycle.
pub const UNBOUNDED_FACE: usize = 0;

#[derive(Debug, Clone)]
pub struct TopoNode {
    pub vertex: Vertex,
    /// Operands with an isolated point here.
    pub point_mask: u64,
    /// Operands for which this node ends an odd number of polyline paths.
    pub line_end_parity: u64,
    outgoing: Vec<usize>,
    face: usize,
}

#[derive(Debug, Clone)]
pub struct TopoEdge {
    pub from: usize,
    pub to: usize,
    /// Per operand, odd number of polygon boundaries along this edge.
    pub polygon_parity: u64,
    /// Operands with a polyline covering this edge.
    pub line_mask: u64,
}

#[derive(Debug, Clone)]
pub struct TopoFace {
    /// Operands whose polygon interior contains this face.
    pub inside: u64,
    /// Area of the bounding cycle; infinite for the unbounded face.
    pub area: f64,
}

#[derive(Debug, Clone)]
pub struct TopoGraph {
    nodes: Vec<TopoNode>,
    edges: Vec<TopoEdge>,
    faces: Vec<TopoFace>,
    next: Vec<usize>,
    half_face: Vec<usize>,
    operand_types: Vec<GeometryType>,
    description: VertexDescription,
    tol: f64,
}

// ─── Construction ────────────────────────────────────────────────────────────

#[derive(Default)]
struct GraphBuilder {
    node_index: HashMap<(u64, u64), usize>,
    nodes: Vec<TopoNode>,
    edge_index: HashMap<(usize, usize), usize>,
    edges: Vec<TopoEdge>,
}

impl GraphBuilder {
    fn node(&mut self, vertex: &Vertex) -> usize {
        let nodes = &mut self.nodes;
        *self.node_index.entry(vertex.xy.bits()).or_insert_with(|| {
            nodes.push(TopoNode {
                vertex: *vertex,
                point_mask: 0,
                line_end_parity: 0,
                outgoing: Vec::new(),
                face: UNBOUNDED_FACE,
            });
            nodes.len() - 1
        })
    }

    fn edge(&mut self, a: usize, b: usize) -> usize {
        let key = (a.min(b), a.max(b));
        let edges = &mut self.edges;
        *self.edge_index.entry(key).or_insert_with(|| {
            edges.push(TopoEdge {
                from: key.0,
                to: key.1,
                polygon_parity: 0,
                line_mask: 0,
            });
            edges.len() - 1
        })
    }

    /// Drop edges no operand still uses and nodes nothing touches.
    fn compact(self) -> (Vec<TopoNode>, Vec<TopoEdge>) {
        let edges: Vec<TopoEdge> = self
            .edges
            .into_iter()
            .filter(|e| e.polygon_parity != 0 || e.line_mask != 0)
            .collect();
        let mut used = vec![false; self.nodes.len()];
        for e in &edges {
            used[e.from] = true;
            used[e.to] = true;
        }
        let mut remap = vec![usize::MAX; self.nodes.len()];
        let mut nodes = Vec::new();
        for (i, node) in self.nodes.into_iter().enumerate() {
            if used[i] || node.point_mask != 0 || node.line_end_parity != 0 {
                remap[i] = nodes.len();
                nodes.push(node);
            }
        }
        let edges = edges
            .into_iter()
            .map(|mut e| {
                e.from = remap[e.from];
                e.to = remap[e.to];
                e
            })
            .collect();
        (nodes, edges)
    }
}

struct Cycle {
    half_edges: Vec<usize>,
    area: f64,
    component: usize,
}

fn find_root(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

impl TopoGraph {
    /// Build the graph of `operands`, which must already be noded together.
    #[instrument(skip(shape, operands), fields(operands = operands.len()))]
    pub fn build(shape: &EditShape, operands: &[GeometryId], tol: f64) -> KernelResult<Self> {
        if operands.len() > MAX_OPERANDS {
            return Err(KernelError::invalid_argument(format!(
                "topology graph supports at most {MAX_OPERANDS} operands, got {}",
                operands.len()
            )));
        }
        let mut builder = GraphBuilder::default();
        let mut operand_types = Vec::with_capacity(operands.len());
        let mut description = VertexDescription::XY;

        for (i, &g) in operands.iter().enumerate() {
            let bit = 1u64 << i;
            let kind = shape.geometry_type(g);
            operand_types.push(kind);
            description = description.merge(shape.description(g));
            match kind {
                GeometryType::Polygon | GeometryType::Envelope => {
                    for e in shape.geometry_edges(g) {
                        let (va, vb) = (shape.vertex(e.from), shape.vertex(e.to));
                        if va.xy.is_nan() || vb.xy.is_nan() {
                            continue;
                        }
                        let (a, b) = (builder.node(va), builder.node(vb));
                        if a != b {
                            let idx = builder.edge(a, b);
                            builder.edges[idx].polygon_parity ^= bit;
                        }
                    }
                }
                GeometryType::Polyline => {
                    for &path in shape.paths_of(g) {
                        let ids: Vec<_> = shape.path_vertices(path).collect();
                        if ids.len() < 2 || ids.iter().any(|&v| shape.xy(v).is_nan()) {
                            continue;
                        }
                        let mut any_edge = false;
                        for pair in ids.windows(2) {
                            let a = builder.node(shape.vertex(pair[0]));
                            let b = builder.node(shape.vertex(pair[1]));
                            if a != b {
                                let idx = builder.edge(a, b);
                                builder.edges[idx].line_mask |= bit;
                                any_edge = true;
                            }
                        }
                        if any_edge {
                            let first = builder.node(shape.vertex(ids[0]));
                            let last = builder.node(shape.vertex(ids[ids.len() - 1]));
                            builder.nodes[first].line_end_parity ^= bit;
                            builder.nodes[last].line_end_parity ^= bit;
                        }
                    }
                }
                GeometryType::Point | GeometryType::MultiPoint => {
                    for &path in shape.paths_of(g) {
                        for v in shape.path_vertices(path) {
                            let vertex = shape.vertex(v);
                            if !vertex.xy.is_nan() {
                                let n = builder.node(vertex);
                                builder.nodes[n].point_mask |= bit;
                            }
                        }
                    }
                }
            }
        }

        let (nodes, edges) = builder.compact();
        let mut graph = TopoGraph {
            nodes,
            edges,
            faces: Vec::new(),
            next: Vec::new(),
            half_face: Vec::new(),
            operand_types,
            description,
            tol,
        };
        graph.link_half_edges();
        let cycles = graph.trace_cycles();
        graph.assign_faces(cycles);
        graph.propagate_membership();
        debug!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            faces = graph.faces.len(),
            "topology graph built"
        );
        Ok(graph)
    }

    fn link_half_edges(&mut self) {
        let half_count = self.edges.len() * 2;
        for h in 0..half_count {
            let origin = self.origin(h);
            self.nodes[origin].outgoing.push(h);
        }
        let mut position = vec![0usize; half_count];
        for n in 0..self.nodes.len() {
            let origin = self.nodes[n].vertex.xy;
            let mut out = std::mem::take(&mut self.nodes[n].outgoing);
            let angles: HashMap<usize, f64> = out
                .iter()
                .map(|&h| {
                    let d = self.nodes[self.dest(h)].vertex.xy - origin;
                    (h, d.y.atan2(d.x))
                })
                .collect();
            out.sort_by(|a, b| angles[a].total_cmp(&angles[b]));
            for (i, &h) in out.iter().enumerate() {
                position[h] = i;
            }
            self.nodes[n].outgoing = out;
        }
        self.next = (0..half_count)
            .map(|h| {
                let out = &self.nodes[self.dest(h)].outgoing;
                let k = out.len();
                out[(position[h ^ 1] + k - 1) % k]
            })
            .collect();
    }

    fn trace_cycles(&self) -> Vec<Cycle> {
        let mut parent: Vec<usize> = (0..self.nodes.len()).collect();
        for e in &self.edges {
            let (ra, rb) = (find_root(&mut parent, e.from), find_root(&mut parent, e.to));
            parent[ra.max(rb)] = ra.min(rb);
        }

        let mut visited = vec![false; self.next.len()];
        let mut cycles = Vec::new();
        for start in 0..self.next.len() {
            if visited[start] {
                continue;
            }
            let mut half_edges = Vec::new();
            let mut h = start;
            while !visited[h] {
                visited[h] = true;
                half_edges.push(h);
                h = self.next[h];
            }
            let ring: Vec<Point2d> = half_edges
                .iter()
                .map(|&h| self.nodes[self.origin(h)].vertex.xy)
                .collect();
            let component = find_root(&mut parent, self.origin(start));
            cycles.push(Cycle {
                area: ring_signed_area(&ring),
                half_edges,
                component,
            });
        }
        cycles
    }

    /// Bounded cycles become faces; each component's outer cycle, and each
    /// isolated node, joins the smallest face of another component around it.
    fn assign_faces(&mut self, cycles: Vec<Cycle>) {
        self.half_face = vec![UNBOUNDED_FACE; self.next.len()];
        self.faces = vec![TopoFace {
            inside: 0,
            area: f64::INFINITY,
        }];

        let mut outer_of: HashMap<usize, usize> = HashMap::new();
        for (i, c) in cycles.iter().enumerate() {
            let entry = outer_of.entry(c.component).or_insert(i);
            if c.area < cycles[*entry].area {
                *entry = i;
            }
        }

        // (face, component, ring, envelope) of every bounded face.
        let mut bounded: Vec<(usize, usize, Vec<Point2d>, Envelope2D)> = Vec::new();
        for (i, c) in cycles.iter().enumerate() {
            if outer_of.get(&c.component) == Some(&i) {
                continue;
            }
            let face = self.faces.len();
            self.faces.push(TopoFace {
                inside: 0,
                area: c.area,
            });
            for &h in &c.half_edges {
                self.half_face[h] = face;
            }
            let ring: Vec<Point2d> = c
                .half_edges
                .iter()
                .map(|&h| self.nodes[self.origin(h)].vertex.xy)
                .collect();
            let env = Envelope2D::from_points(ring.iter());
            bounded.push((face, c.component, ring, env));
        }

        let enclosing = |p: &Point2d, component: Option<usize>| -> usize {
            bounded
                .iter()
                .filter(|(_, comp, _, env)| Some(*comp) != component && env.contains_point(p))
                .filter(|(_, _, ring, _)| ring_contains_point(ring, p))
                .min_by(|a, b| self.faces[a.0].area.total_cmp(&self.faces[b.0].area))
                .map(|(face, ..)| *face)
                .unwrap_or(UNBOUNDED_FACE)
        };

        let mut assignments = Vec::new();
        for (&component, &i) in &outer_of {
            let probe = self.nodes[self.origin(cycles[i].half_edges[0])].vertex.xy;
            assignments.push((i, enclosing(&probe, Some(component))));
        }
        let mut isolated = Vec::new();
        for (n, node) in self.nodes.iter().enumerate() {
            if node.outgoing.is_empty() {
                isolated.push((n, enclosing(&node.vertex.xy, None)));
            }
        }
        for (i, face) in assignments {
            for &h in &cycles[i].half_edges {
                self.half_face[h] = face;
            }
        }
        for (n, face) in isolated {
            self.nodes[n].face = face;
        }
    }

    fn propagate_membership(&mut self) {
        let mut by_face: Vec<Vec<usize>> = vec![Vec::new(); self.faces.len()];
        for (h, &f) in self.half_face.iter().enumerate() {
            by_face[f].push(h);
        }
        let mut inside: Vec<Option<u64>> = vec![None; self.faces.len()];
        inside[UNBOUNDED_FACE] = Some(0);
        let mut queue = VecDeque::from([UNBOUNDED_FACE]);
        let mut conflicts = 0usize;
        while let Some(f) = queue.pop_front() {
            let here = inside[f].unwrap_or(0);
            for &h in &by_face[f] {
                let g = self.half_face[h ^ 1];
                let expected = here ^ self.edges[h / 2].polygon_parity;
                match inside[g] {
                    None => {
                        inside[g] = Some(expected);
                        queue.push_back(g);
                    }
                    Some(existing) if existing != expected => conflicts += 1,
                    Some(_) => {}
                }
            }
        }
        if conflicts > 0 {
            warn!(conflicts, "inconsistent face parity in topology graph");
        }
        for (face, value) in self.faces.iter_mut().zip(inside) {
            face.inside = value.unwrap_or(0);
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn nodes(&self) -> &[TopoNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[TopoEdge] {
        &self.edges
    }

    pub fn faces(&self) -> &[TopoFace] {
        &self.faces
    }

    pub fn operand_count(&self) -> usize {
        self.operand_types.len()
    }

    pub fn operand_type(&self, operand: usize) -> GeometryType {
        self.operand_types[operand]
    }

    pub fn tolerance(&self) -> f64 {
        self.tol
    }

    pub fn origin(&self, h: usize) -> usize {
        let e = &self.edges[h / 2];
        if h % 2 == 0 {
            e.from
        } else {
            e.to
        }
    }

    pub fn dest(&self, h: usize) -> usize {
        self.origin(h ^ 1)
    }

    pub fn next(&self, h: usize) -> usize {
        self.next[h]
    }

    pub fn face_of(&self, h: usize) -> usize {
        self.half_face[h]
    }

    pub fn left_face(&self, e: usize) -> usize {
        self.half_face[2 * e]
    }

    pub fn right_face(&self, e: usize) -> usize {
        self.half_face[2 * e + 1]
    }

    pub fn outgoing(&self, n: usize) -> &[usize] {
        &self.nodes[n].outgoing
    }

    /// A face touching node `n`; for isolated nodes, the face containing it.
    pub fn node_face(&self, n: usize) -> usize {
        match self.nodes[n].outgoing.first() {
            Some(&h) => self.half_face[h],
            None => self.nodes[n].face,
        }
    }

    /// Operands with a polygon boundary edge ending at `n`.
    pub fn node_polygon_boundary(&self, n: usize) -> u64 {
        self.nodes[n]
            .outgoing
            .iter()
            .fold(0, |acc, &h| acc | self.edges[h / 2].polygon_parity)
    }

    /// Operands with a polyline edge ending at `n`.
    pub fn node_line_mask(&self, n: usize) -> u64 {
        self.nodes[n]
            .outgoing
            .iter()
            .fold(0, |acc, &h| acc | self.edges[h / 2].line_mask)
    }

    // ─── Extraction ──────────────────────────────────────────────────────

    /// Polygon covering the faces whose operand mask satisfies `in_result`.
    ///
    /// Exterior rings come out counter-clockwise, holes clockwise, each hole
    /// after the smallest exterior ring containing it.
    pub fn extract_polygon(&self, in_result: impl Fn(u64) -> bool) -> MultiPath {
        let face_in: Vec<bool> = self.faces.iter().map(|f| in_result(f.inside)).collect();
        let boundary =
            |h: usize| face_in[self.half_face[h]] && !face_in[self.half_face[h ^ 1]];

        let mut visited = vec![false; self.next.len()];
        let mut rings: Vec<Vec<usize>> = Vec::new();
        for start in 0..self.next.len() {
            if visited[start] || !boundary(start) {
                continue;
            }
            let mut ring = Vec::new();
            let mut h = start;
            while !visited[h] {
                visited[h] = true;
                ring.push(self.origin(h));
                let mut n = self.next[h];
                while !boundary(n) {
                    n = self.next[n ^ 1];
                }
                h = n;
            }
            let ring = self.drop_collinear(ring);
            if ring.len() >= 3 {
                rings.push(ring);
            }
        }

        let points: Vec<Vec<Point2d>> = rings
            .iter()
            .map(|r| r.iter().map(|&n| self.nodes[n].vertex.xy).collect())
            .collect();
        let areas: Vec<f64> = points.iter().map(|r| ring_signed_area(r)).collect();
        let exteriors: Vec<usize> = (0..rings.len()).filter(|&i| areas[i] > 0.0).collect();
        let mut holes_of: Vec<Vec<usize>> = vec![Vec::new(); rings.len()];
        for i in (0..rings.len()).filter(|&i| areas[i] < 0.0) {
            let probe = points[i][0].midpoint(&points[i][1]);
            let owner = exteriors
                .iter()
                .copied()
                .filter(|&x| ring_contains_point(&points[x], &probe))
                .min_by(|&a, &b| areas[a].total_cmp(&areas[b]));
            match owner {
                Some(x) => holes_of[x].push(i),
                None => warn!(ring = i, "hole without an enclosing exterior ring dropped"),
            }
        }

        let to_path = |ring: &[usize]| {
            Path::new(ring.iter().map(|&n| self.nodes[n].vertex).collect())
        };
        let mut paths = Vec::new();
        for &x in &exteriors {
            paths.push(to_path(&rings[x]));
            for &hole in &holes_of[x] {
                paths.push(to_path(&rings[hole]));
            }
        }
        MultiPath::new(self.description, paths)
    }

    fn drop_collinear(&self, mut ring: Vec<usize>) -> Vec<usize> {
        let mut changed = true;
        while changed && ring.len() > 3 {
            changed = false;
            let mut i = 0;
            while i < ring.len() && ring.len() > 3 {
                let n = ring.len();
                let prev = self.nodes[ring[(i + n - 1) % n]].vertex.xy;
                let cur = self.nodes[ring[i]].vertex.xy;
                let next = self.nodes[ring[(i + 1) % n]].vertex.xy;
                if self.passes_through(&prev, &cur, &next) {
                    ring.remove(i);
                    changed = true;
                } else {
                    i += 1;
                }
            }
        }
        ring
    }

    fn passes_through(&self, prev: &Point2d, cur: &Point2d, next: &Point2d) -> bool {
        let t = closest_param(prev, next, cur);
        if t <= 0.0 || t >= 1.0 {
            return false;
        }
        cur.distance_to(&prev.lerp(next, t)) <= self.tol
    }

    /// Polyline made of the edges selected by `keep`, chained between nodes
    /// whose selected degree is not two.
    pub fn extract_polyline(&self, keep: impl Fn(usize, &TopoEdge) -> bool) -> MultiPath {
        let selected: Vec<bool> = self.edges.iter().enumerate().map(|(i, e)| keep(i, e)).collect();
        let mut degree = vec![0usize; self.nodes.len()];
        for (e, edge) in self.edges.iter().enumerate() {
            if selected[e] {
                degree[edge.from] += 1;
                degree[edge.to] += 1;
            }
        }
        let mut used = vec![false; self.edges.len()];
        let mut paths = Vec::new();

        let walk = |start_h: usize, used: &mut Vec<bool>| -> Vec<usize> {
            let mut chain = vec![self.origin(start_h)];
            let mut h = start_h;
            loop {
                used[h / 2] = true;
                let v = self.dest(h);
                chain.push(v);
                if degree[v] != 2 {
                    break;
                }
                let onward = self.nodes[v]
                    .outgoing
                    .iter()
                    .copied()
                    .find(|&o| selected[o / 2] && !used[o / 2]);
                match onward {
                    Some(o) => h = o,
                    None => break,
                }
            }
            chain
        };

        for n in 0..self.nodes.len() {
            if degree[n] == 0 || degree[n] == 2 {
                continue;
            }
            for &h in &self.nodes[n].outgoing {
                if selected[h / 2] && !used[h / 2] {
                    paths.push(walk(h, &mut used));
                }
            }
        }
        for e in 0..self.edges.len() {
            if selected[e] && !used[e] {
                paths.push(walk(2 * e, &mut used));
            }
        }

        let paths = paths
            .into_iter()
            .map(|chain| Path::new(chain.iter().map(|&n| self.nodes[n].vertex).collect()))
            .collect();
        MultiPath::new(self.description, paths)
    }

    /// Points at the nodes selected by `keep`.
    pub fn extract_points(&self, keep: impl Fn(usize, &TopoNode) -> bool) -> MultiPoint {
        let points = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(i, n)| keep(*i, n))
            .map(|(_, n)| n.vertex)
            .collect();
        MultiPoint::new(self.description, points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::geometry::Geometry;
    use crate::noding::{node_edit_shape, NodingMode};

    fn graph_of(geometries: &[Geometry]) -> TopoGraph {
        let mut shape = EditShape::new();
        let ids: Vec<GeometryId> = geometries.iter().map(|g| shape.add_geometry(g)).collect();
        node_edit_shape(&mut shape, 1e-9, NodingMode::AllIntersections, &KernelConfig::default(), None)
            .unwrap();
        TopoGraph::build(&shape, &ids, 1e-9).unwrap()
    }

    fn square(x0: f64, y0: f64, size: f64) -> Geometry {
        Geometry::polygon(&[vec![
            (x0, y0),
            (x0 + size, y0),
            (x0 + size, y0 + size),
            (x0, y0 + size),
        ]])
    }

    #[test]
    fn test_single_square_faces() {
        let g = graph_of(&[square(0.0, 0.0, 1.0)]);
        assert_eq!(g.nodes().len(), 4);
        assert_eq!(g.edges().len(), 4);
        assert_eq!(g.faces().len(), 2);
        assert_eq!(g.faces()[UNBOUNDED_FACE].inside, 0);
        assert_eq!(g.faces()[1].inside, 1);
        assert!((g.faces()[1].area - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_adjacent_squares_union_extracts_rectangle() {
        let g = graph_of(&[square(0.0, 0.0, 1.0), square(1.0, 0.0, 1.0)]);
        let union = g.extract_polygon(|mask| mask != 0);
        assert_eq!(union.paths.len(), 1);
        assert_eq!(union.paths[0].len(), 4);
        assert!((union.signed_area() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_nested_square_becomes_hole() {
        let g = graph_of(&[square(0.0, 0.0, 4.0), square(1.0, 1.0, 2.0)]);
        let diff = g.extract_polygon(|mask| mask & 1 != 0 && mask & 2 == 0);
        assert_eq!(diff.paths.len(), 2);
        assert!(diff.paths[0].signed_area() > 0.0);
        assert!(diff.paths[1].signed_area() < 0.0);
        assert!((diff.signed_area() - 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_polyline_chains_through_degree_two_nodes() {
        let g = graph_of(&[Geometry::polyline(&[vec![(0.0, 0.0), (1.0, 0.0), (2.0, 1.0)]])]);
        let line = g.extract_polyline(|_, e| e.line_mask != 0);
        assert_eq!(line.paths.len(), 1);
        assert_eq!(line.paths[0].len(), 3);
        let ends: Vec<usize> = (0..g.nodes().len())
            .filter(|&n| g.nodes()[n].line_end_parity != 0)
            .collect();
        assert_eq!(ends.len(), 2);
    }

    #[test]
    fn test_isolated_point_face() {
        let g = graph_of(&[square(0.0, 0.0, 2.0), Geometry::point(1.0, 1.0)]);
        let n = (0..g.nodes().len())
            .find(|&n| g.nodes()[n].point_mask != 0)
            .unwrap();
        assert_eq!(g.faces()[g.node_face(n)].inside, 1);
    }
}
