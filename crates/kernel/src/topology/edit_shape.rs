use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SecondaryMap, SlotMap};
use tracing::{debug, instrument};

use crate::geometry::segment::{closest_param, proper_crossing};
use crate::geometry::{
    Envelope2D, Geometry, GeometryType, MultiPath, MultiPoint, Path, Point, Point2d, Vertex,
    VertexDescription,
};

// ─── Entity Keys ─────────────────────────────────────────────────────────────

new_key_type! {
    pub struct VertexId;
    pub struct PathId;
    pub struct GeometryId;
}

// ─── Entities ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditVertex {
    pub vertex: Vertex,
    pub path: PathId,
    pub prev: Option<VertexId>,
    pub next: Option<VertexId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditPath {
    pub geometry: GeometryId,
    pub first: Option<VertexId>,
    pub last: Option<VertexId>,
    /// Rings close from `last` back to `first`.
    pub closed: bool,
    pub vertex_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditGeometry {
    pub geometry_type: GeometryType,
    pub description: VertexDescription,
    pub paths: Vec<PathId>,
    pub prev: Option<GeometryId>,
    pub next: Option<GeometryId>,
}

/// An implicit edge: a vertex and its successor on the same path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EditEdge {
    pub from: VertexId,
    pub to: VertexId,
}

/// Findings of [`EditShape::audit`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditShapeAudit {
    pub vertex_count: usize,
    pub edge_count: usize,
    pub zero_length_edges: usize,
    /// Non-adjacent edge pairs that cross, or touch within tolerance,
    /// without a shared vertex.
    pub unsplit_crossings: usize,
}

impl EditShapeAudit {
    pub fn is_noded(&self) -> bool {
        self.zero_length_edges == 0 && self.unsplit_crossings == 0
    }
}

// ─── Edit Shape ──────────────────────────────────────────────────────────────

/// Arena holding several geometries side by side as linked vertex paths.
///
/// Handles are slotmap keys; indexing with a handle from another shape, or
/// one whose entity was removed, panics.
#[derive(Debug, Clone, Default)]
pub struct EditShape {
    vertices: SlotMap<VertexId, EditVertex>,
    paths: SlotMap<PathId, EditPath>,
    geometries: SlotMap<GeometryId, EditGeometry>,
    first_geometry: Option<GeometryId>,
    last_geometry: Option<GeometryId>,
    user_indices: Vec<SecondaryMap<GeometryId, i32>>,
}

impl EditShape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new per-geometry tag channel and return its slot.
    pub fn create_geometry_user_index(&mut self) -> usize {
        self.user_indices.push(SecondaryMap::new());
        self.user_indices.len() - 1
    }

    pub fn set_geometry_user_index(&mut self, geometry: GeometryId, slot: usize, value: i32) {
        assert!(self.geometries.contains_key(geometry), "stale geometry handle");
        self.user_indices[slot].insert(geometry, value);
    }

    /// The tag stored in `slot`, or -1 when none was set.
    pub fn get_geometry_user_index(&self, geometry: GeometryId, slot: usize) -> i32 {
        self.user_indices[slot].get(geometry).copied().unwrap_or(-1)
    }

    /// Insert a geometry after all previously added ones.
    ///
    /// Envelopes are stored as their rectangle ring.
    #[instrument(skip(self, geometry), fields(kind = ?geometry.geometry_type()))]
    pub fn add_geometry(&mut self, geometry: &Geometry) -> GeometryId {
        let stored_type = match geometry.geometry_type() {
            GeometryType::Envelope => GeometryType::Polygon,
            t => t,
        };
        let id = self.geometries.insert(EditGeometry {
            geometry_type: stored_type,
            description: geometry.description(),
            paths: Vec::new(),
            prev: self.last_geometry,
            next: None,
        });
        match self.last_geometry {
            Some(last) => self.geometries[last].next = Some(id),
            None => self.first_geometry = Some(id),
        }
        self.last_geometry = Some(id);

        match geometry {
            Geometry::Point(p) => {
                if let Some(v) = p.vertex {
                    self.add_path(id, &[v], false);
                }
            }
            Geometry::MultiPoint(mp) => {
                if !mp.points.is_empty() {
                    self.add_path(id, &mp.points, false);
                }
            }
            Geometry::Polyline(mp) => {
                for path in mp.paths.iter().filter(|p| !p.is_empty()) {
                    self.add_path(id, &path.vertices, false);
                }
            }
            Geometry::Polygon(mp) => {
                for ring in mp.paths.iter().filter(|p| !p.is_empty()) {
                    self.add_path(id, &ring.vertices, true);
                }
            }
            Geometry::Envelope(e) => {
                for ring in e.to_polygon().paths {
                    self.add_path(id, &ring.vertices, true);
                }
            }
        }
        debug!(?id, vertices = geometry.point_count(), "geometry added to edit shape");
        id
    }

    fn add_path(&mut self, geometry: GeometryId, vertices: &[Vertex], closed: bool) -> PathId {
        let path = self.paths.insert(EditPath {
            geometry,
            first: None,
            last: None,
            closed,
            vertex_count: 0,
        });
        for v in vertices {
            self.push_vertex(path, *v);
        }
        self.geometries[geometry].paths.push(path);
        path
    }

    fn push_vertex(&mut self, path: PathId, vertex: Vertex) -> VertexId {
        let prev = self.paths[path].last;
        let id = self.vertices.insert(EditVertex {
            vertex,
            path,
            prev,
            next: None,
        });
        match prev {
            Some(p) => self.vertices[p].next = Some(id),
            None => self.paths[path].first = Some(id),
        }
        let p = &mut self.paths[path];
        p.last = Some(id);
        p.vertex_count += 1;
        id
    }

    /// Detach a geometry and everything it owns.
    pub fn remove_geometry(&mut self, geometry: GeometryId) {
        let g = self
            .geometries
            .remove(geometry)
            .unwrap_or_else(|| panic!("stale geometry handle {geometry:?}"));
        for path in g.paths {
            let mut cursor = self.paths[path].first;
            while let Some(v) = cursor {
                cursor = self.vertices[v].next;
                self.vertices.remove(v);
            }
            self.paths.remove(path);
        }
        match g.prev {
            Some(p) => self.geometries[p].next = g.next,
            None => self.first_geometry = g.next,
        }
        match g.next {
            Some(n) => self.geometries[n].prev = g.prev,
            None => self.last_geometry = g.prev,
        }
        for slot in &mut self.user_indices {
            slot.remove(geometry);
        }
    }

    // ─── Iteration ───────────────────────────────────────────────────────

    pub fn first_geometry(&self) -> Option<GeometryId> {
        self.first_geometry
    }

    pub fn next_geometry(&self, geometry: GeometryId) -> Option<GeometryId> {
        self.geometries[geometry].next
    }

    /// Geometry handles in insertion order.
    pub fn geometry_ids(&self) -> impl Iterator<Item = GeometryId> + '_ {
        std::iter::successors(self.first_geometry, move |g| self.geometries[*g].next)
    }

    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    pub fn geometry_type(&self, geometry: GeometryId) -> GeometryType {
        self.geometries[geometry].geometry_type
    }

    pub fn description(&self, geometry: GeometryId) -> VertexDescription {
        self.geometries[geometry].description
    }

    pub fn paths_of(&self, geometry: GeometryId) -> &[PathId] {
        &self.geometries[geometry].paths
    }

    pub fn path(&self, path: PathId) -> &EditPath {
        &self.paths[path]
    }

    pub fn path_ids(&self) -> impl Iterator<Item = PathId> + '_ {
        self.geometry_ids()
            .flat_map(move |g| self.geometries[g].paths.iter().copied())
    }

    /// Vertices of one path in path order.
    pub fn path_vertices(&self, path: PathId) -> impl Iterator<Item = VertexId> + '_ {
        std::iter::successors(self.paths[path].first, move |v| self.vertices[*v].next)
    }

    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.path_ids().flat_map(move |p| self.path_vertices(p))
    }

    pub fn total_point_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertex(&self, v: VertexId) -> &Vertex {
        &self.vertices[v].vertex
    }

    pub fn xy(&self, v: VertexId) -> Point2d {
        self.vertices[v].vertex.xy
    }

    pub fn set_xy(&mut self, v: VertexId, xy: Point2d) {
        self.vertices[v].vertex.xy = xy;
    }

    pub fn path_of(&self, v: VertexId) -> PathId {
        self.vertices[v].path
    }

    pub fn geometry_of_vertex(&self, v: VertexId) -> GeometryId {
        self.paths[self.vertices[v].path].geometry
    }

    /// The edge end following `v`; rings wrap around to their first vertex.
    pub fn edge_end(&self, v: VertexId) -> Option<VertexId> {
        let ev = &self.vertices[v];
        match ev.next {
            Some(n) => Some(n),
            None => {
                let path = &self.paths[ev.path];
                if path.closed && path.vertex_count > 1 {
                    path.first
                } else {
                    None
                }
            }
        }
    }

    /// Whether the geometry's vertices form edges (polylines and polygons).
    pub fn has_edges(&self, geometry: GeometryId) -> bool {
        matches!(
            self.geometries[geometry].geometry_type,
            GeometryType::Polyline | GeometryType::Polygon
        )
    }

    /// Edges of one geometry in path order.
    pub fn geometry_edges(&self, geometry: GeometryId) -> Vec<EditEdge> {
        if !self.has_edges(geometry) {
            return Vec::new();
        }
        let mut edges = Vec::new();
        for &path in &self.geometries[geometry].paths {
            for from in self.path_vertices(path) {
                if let Some(to) = self.edge_end(from) {
                    edges.push(EditEdge { from, to });
                }
            }
        }
        edges
    }

    /// Every edge of every geometry, in insertion order.
    pub fn edges(&self) -> Vec<EditEdge> {
        self.geometry_ids()
            .flat_map(|g| self.geometry_edges(g))
            .collect()
    }

    // ─── Mutation (noder only) ───────────────────────────────────────────

    /// Insert a vertex between `after` and its successor on the same path.
    pub fn insert_vertex_after(&mut self, after: VertexId, vertex: Vertex) -> VertexId {
        let path = self.vertices[after].path;
        let next = self.vertices[after].next;
        let id = self.vertices.insert(EditVertex {
            vertex,
            path,
            prev: Some(after),
            next,
        });
        self.vertices[after].next = Some(id);
        match next {
            Some(n) => self.vertices[n].prev = Some(id),
            None => self.paths[path].last = Some(id),
        }
        self.paths[path].vertex_count += 1;
        id
    }

    pub fn remove_vertex(&mut self, v: VertexId) {
        let ev = self.vertices.remove(v).unwrap_or_else(|| panic!("stale vertex handle {v:?}"));
        match ev.prev {
            Some(p) => self.vertices[p].next = ev.next,
            None => self.paths[ev.path].first = ev.next,
        }
        match ev.next {
            Some(n) => self.vertices[n].prev = ev.prev,
            None => self.paths[ev.path].last = ev.prev,
        }
        self.paths[ev.path].vertex_count -= 1;
    }

    fn remove_path(&mut self, path: PathId) {
        let vertices: Vec<VertexId> = self.path_vertices(path).collect();
        for v in vertices {
            self.vertices.remove(v);
        }
        let geometry = self.paths[path].geometry;
        self.geometries[geometry].paths.retain(|p| *p != path);
        self.paths.remove(path);
    }

    /// Remove zero-length edges and rings or paths that collapsed.
    ///
    /// Coordinates are compared bit for bit; clustering is expected to have
    /// made near-coincident vertices identical beforehand. Returns the number
    /// of vertices removed.
    #[instrument(skip(self))]
    pub fn filter_degenerate(&mut self) -> usize {
        let before = self.vertices.len();
        let geometry_ids: Vec<GeometryId> = self.geometry_ids().collect();
        for g in geometry_ids {
            if !self.has_edges(g) {
                continue;
            }
            let paths = self.geometries[g].paths.clone();
            for path in paths {
                let ids: Vec<VertexId> = self.path_vertices(path).collect();
                for v in ids {
                    if !self.vertices.contains_key(v) {
                        continue;
                    }
                    while let Some(n) = self.edge_end(v) {
                        if n == v || self.xy(v).bits() != self.xy(n).bits() {
                            break;
                        }
                        self.remove_vertex(n);
                    }
                }
                let p = &self.paths[path];
                let min = if p.closed { 3 } else { 2 };
                if p.vertex_count < min {
                    self.remove_path(path);
                }
            }
        }
        let removed = before - self.vertices.len();
        debug!(removed, "filtered degenerate edges");
        removed
    }

    // ─── Views ───────────────────────────────────────────────────────────

    /// Materialize the current state of one geometry.
    pub fn get_geometry(&self, geometry: GeometryId) -> Geometry {
        let g = &self.geometries[geometry];
        let paths: Vec<Path> = g
            .paths
            .iter()
            .map(|&p| Path::new(self.path_vertices(p).map(|v| *self.vertex(v)).collect()))
            .collect();
        match g.geometry_type {
            GeometryType::Point => Geometry::Point(Point {
                description: g.description,
                vertex: paths.first().and_then(|p| p.vertices.first().copied()),
            }),
            GeometryType::MultiPoint => Geometry::MultiPoint(MultiPoint::new(
                g.description,
                paths.into_iter().flat_map(|p| p.vertices).collect(),
            )),
            GeometryType::Polyline => Geometry::Polyline(MultiPath::new(g.description, paths)),
            GeometryType::Polygon | GeometryType::Envelope => {
                Geometry::Polygon(MultiPath::new(g.description, paths))
            }
        }
    }

    pub fn geometry_envelope(&self, geometry: GeometryId) -> Envelope2D {
        let mut env = Envelope2D::empty();
        for &p in &self.geometries[geometry].paths {
            for v in self.path_vertices(p) {
                env.merge_point(&self.xy(v));
            }
        }
        env
    }

    /// Union bounding box of every inserted geometry.
    pub fn envelope_2d(&self) -> Envelope2D {
        let mut env = Envelope2D::empty();
        for v in self.vertices.values() {
            env.merge_point(&v.vertex.xy);
        }
        env
    }

    /// Structural check of the noded state under `tol`.
    #[instrument(skip(self))]
    pub fn audit(&self, tol: f64) -> EditShapeAudit {
        let edges = self.edges();
        let mut audit = EditShapeAudit {
            vertex_count: self.vertices.len(),
            edge_count: edges.len(),
            ..Default::default()
        };
        let segs: Vec<(Point2d, Point2d)> = edges
            .iter()
            .map(|e| (self.xy(e.from), self.xy(e.to)))
            .collect();
        audit.zero_length_edges = segs.iter().filter(|(a, b)| a.bits() == b.bits()).count();

        for i in 0..segs.len() {
            for j in (i + 1)..segs.len() {
                let (a0, a1) = segs[i];
                let (b0, b1) = segs[j];
                if !Envelope2D::from_segment(&a0, &a1)
                    .inflated(tol, tol)
                    .intersects(&Envelope2D::from_segment(&b0, &b1))
                {
                    continue;
                }
                let shares = [a0, a1]
                    .iter()
                    .any(|p| p.bits() == b0.bits() || p.bits() == b1.bits());
                if shares {
                    continue;
                }
                let crosses = proper_crossing(&a0, &a1, &b0, &b1).is_some();
                let touches = [(a0, b0, b1), (a1, b0, b1), (b0, a0, a1), (b1, a0, a1)]
                    .iter()
                    .any(|(p, s0, s1)| p.distance_to(&s0.lerp(s1, closest_param(s0, s1, p))) <= tol);
                if crosses || touches {
                    audit.unsplit_crossings += 1;
                }
            }
        }
        debug!(?audit, "edit shape audit");
        audit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Geometry {
        Geometry::polygon(&[vec![
            (x0, y0),
            (x0 + size, y0),
            (x0 + size, y0 + size),
            (x0, y0 + size),
        ]])
    }

    #[test]
    fn test_insertion_order_iteration() {
        let mut shape = EditShape::new();
        let a = shape.add_geometry(&square(0.0, 0.0, 1.0));
        let b = shape.add_geometry(&Geometry::point(5.0, 5.0));
        let c = shape.add_geometry(&Geometry::polyline(&[vec![(0.0, 0.0), (3.0, 3.0)]]));
        assert_eq!(shape.first_geometry(), Some(a));
        assert_eq!(shape.next_geometry(a), Some(b));
        assert_eq!(shape.next_geometry(b), Some(c));
        assert_eq!(shape.next_geometry(c), None);
        assert_eq!(shape.total_point_count(), 7);
    }

    #[test]
    fn test_user_index_channels() {
        let mut shape = EditShape::new();
        let slot = shape.create_geometry_user_index();
        let other = shape.create_geometry_user_index();
        let g = shape.add_geometry(&square(0.0, 0.0, 1.0));
        shape.set_geometry_user_index(g, slot, 42);
        assert_eq!(shape.get_geometry_user_index(g, slot), 42);
        assert_eq!(shape.get_geometry_user_index(g, other), -1);
    }

    #[test]
    fn test_get_geometry_round_trips_polygon() {
        let mut shape = EditShape::new();
        let sq = square(0.0, 0.0, 2.0);
        let g = shape.add_geometry(&sq);
        assert_eq!(shape.get_geometry(g), sq);
        assert_eq!(shape.geometry_edges(g).len(), 4);
    }

    #[test]
    fn test_envelope_is_stored_as_polygon() {
        let mut shape = EditShape::new();
        let g = shape.add_geometry(&Geometry::envelope(0.0, 0.0, 3.0, 1.0));
        assert_eq!(shape.geometry_type(g), GeometryType::Polygon);
        assert!((shape.get_geometry(g).area() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_insert_and_remove_vertex() {
        let mut shape = EditShape::new();
        let g = shape.add_geometry(&Geometry::polyline(&[vec![(0.0, 0.0), (2.0, 0.0)]]));
        let path = shape.paths_of(g)[0];
        let first = shape.path(path).first.unwrap();
        let mid = shape.insert_vertex_after(first, Vertex::new(1.0, 0.0));
        assert_eq!(shape.path(path).vertex_count, 3);
        assert_eq!(shape.geometry_edges(g).len(), 2);
        shape.remove_vertex(mid);
        assert_eq!(shape.path(path).vertex_count, 2);
        assert_eq!(shape.edge_end(first), shape.path(path).last);
    }

    #[test]
    fn test_filter_degenerate_drops_duplicates_and_collapsed_rings() {
        let mut shape = EditShape::new();
        let g = shape.add_geometry(&Geometry::polygon(&[
            vec![(0.0, 0.0), (1.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)],
            vec![(5.0, 5.0), (6.0, 5.0), (5.0, 5.0)],
        ]));
        let removed = shape.filter_degenerate();
        assert_eq!(removed, 4);
        assert_eq!(shape.paths_of(g).len(), 1);
        assert_eq!(shape.path(shape.paths_of(g)[0]).vertex_count, 4);

        let mut shape = EditShape::new();
        let line = shape.add_geometry(&Geometry::polyline(&[vec![
            (0.0, 0.0),
            (1.0, 0.0),
            (1.0, 0.0),
            (1.0, 0.0),
            (2.0, 0.0),
        ]]));
        assert_eq!(shape.filter_degenerate(), 2);
        assert_eq!(shape.audit(1e-9).zero_length_edges, 0);
        assert_eq!(shape.path(shape.paths_of(line)[0]).vertex_count, 3);
    }

    #[test]
    fn test_remove_geometry_relinks_order() {
        let mut shape = EditShape::new();
        let a = shape.add_geometry(&square(0.0, 0.0, 1.0));
        let b = shape.add_geometry(&square(2.0, 0.0, 1.0));
        let c = shape.add_geometry(&square(4.0, 0.0, 1.0));
        shape.remove_geometry(b);
        assert_eq!(shape.geometry_ids().collect::<Vec<_>>(), vec![a, c]);
        assert_eq!(shape.total_point_count(), 8);
        assert!((shape.envelope_2d().xmax - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_audit_reports_unsplit_crossing() {
        let mut shape = EditShape::new();
        shape.add_geometry(&Geometry::polyline(&[vec![(0.0, 0.0), (2.0, 2.0)]]));
        shape.add_geometry(&Geometry::polyline(&[vec![(0.0, 2.0), (2.0, 0.0)]]));
        let audit = shape.audit(1e-9);
        assert_eq!(audit.unsplit_crossings, 1);
        assert!(!audit.is_noded());
    }
}
