use serde::{Deserialize, Serialize};

use super::description::VertexDescription;
use super::envelope::Envelope2D;
use super::point::{Point2d, Vertex};

/// Shoelace area of a closed point ring; positive when counter-clockwise.
pub fn ring_signed_area(ring: &[Point2d]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    let origin = ring[0];
    let mut twice = 0.0;
    for i in 1..n - 1 {
        twice += (ring[i] - origin).cross(&(ring[i + 1] - origin));
    }
    0.5 * twice
}

/// Even-odd ray cast; points exactly on the ring may land on either side.
pub fn ring_contains_point(ring: &[Point2d], p: &Point2d) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (ring[i], ring[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// One part of a polyline, or one ring of a polygon.
///
/// Rings are implicitly closed: the last vertex connects back to the first
/// and is not repeated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Path {
    pub vertices: Vec<Vertex>,
}

impl Path {
    pub fn new(vertices: Vec<Vertex>) -> Self {
        Self { vertices }
    }

    pub fn from_points(points: &[Point2d]) -> Self {
        Self {
            vertices: points.iter().map(|p| Vertex::from_xy(*p)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = Point2d> + '_ {
        self.vertices.iter().map(|v| v.xy)
    }

    /// Segments as `(start, end)` pairs; rings include the closing segment.
    pub fn segments(&self, closed: bool) -> impl Iterator<Item = (Point2d, Point2d)> + '_ {
        let n = self.vertices.len();
        let count = if closed && n > 1 { n } else { n.saturating_sub(1) };
        (0..count).map(move |i| (self.vertices[i].xy, self.vertices[(i + 1) % n].xy))
    }

    /// Shoelace area; positive for counter-clockwise rings.
    pub fn signed_area(&self) -> f64 {
        ring_signed_area(&self.points().collect::<Vec<_>>())
    }

    pub fn contains_point(&self, p: &Point2d) -> bool {
        ring_contains_point(&self.points().collect::<Vec<_>>(), p)
    }

    pub fn length(&self, closed: bool) -> f64 {
        self.segments(closed).map(|(a, b)| a.distance_to(&b)).sum()
    }

    pub fn envelope(&self) -> Envelope2D {
        Envelope2D::from_points(self.vertices.iter().map(|v| &v.xy))
    }

    pub fn reversed(&self) -> Self {
        let mut vertices = self.vertices.clone();
        vertices.reverse();
        Self { vertices }
    }
}

/// Ordered sequence of paths shared by polylines and polygons.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MultiPath {
    pub description: VertexDescription,
    pub paths: Vec<Path>,
}

impl MultiPath {
    pub fn new(description: VertexDescription, paths: Vec<Path>) -> Self {
        Self { description, paths }
    }

    pub fn from_coords(parts: &[Vec<(f64, f64)>]) -> Self {
        let paths = parts
            .iter()
            .map(|part| {
                let points: Vec<Point2d> = part.iter().map(|&c| c.into()).collect();
                Path::from_points(&points)
            })
            .collect();
        Self::new(VertexDescription::XY, paths)
    }

    pub fn is_empty(&self) -> bool {
        self.paths.iter().all(|p| p.is_empty())
    }

    pub fn point_count(&self) -> usize {
        self.paths.iter().map(|p| p.len()).sum()
    }

    pub fn segment_count(&self, closed: bool) -> usize {
        self.paths.iter().map(|p| p.segments(closed).count()).sum()
    }

    pub fn envelope(&self) -> Envelope2D {
        let mut env = Envelope2D::empty();
        for path in &self.paths {
            env.merge(&path.envelope());
        }
        env
    }

    pub fn segments(&self, closed: bool) -> impl Iterator<Item = (Point2d, Point2d)> + '_ {
        self.paths.iter().flat_map(move |p| p.segments(closed))
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> + '_ {
        self.paths.iter().flat_map(|p| p.vertices.iter())
    }

    /// Sum of signed ring areas (meaningful for polygons).
    pub fn signed_area(&self) -> f64 {
        self.paths.iter().map(|p| p.signed_area()).sum()
    }

    pub fn length(&self, closed: bool) -> f64 {
        self.paths.iter().map(|p| p.length(closed)).sum()
    }

    /// Even-odd containment over all rings.
    pub fn contains_point(&self, p: &Point2d) -> bool {
        self.paths.iter().filter(|r| r.contains_point(p)).count() % 2 == 1
    }

    /// Distance from `p` to the nearest segment.
    pub fn distance_to_boundary(&self, p: &Point2d, closed: bool) -> f64 {
        self.segments(closed)
            .map(|(a, b)| super::segment::distance_to_segment(p, &a, &b))
            .fold(f64::INFINITY, f64::min)
    }

    /// Number of counter-clockwise (exterior) rings.
    pub fn exterior_ring_count(&self) -> usize {
        self.paths.iter().filter(|p| p.signed_area() > 0.0).count()
    }
}

/// A single point; empty when it has no vertex.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub description: VertexDescription,
    pub vertex: Option<Vertex>,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            description: VertexDescription::XY,
            vertex: Some(Vertex::new(x, y)),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn xy(&self) -> Option<Point2d> {
        self.vertex.map(|v| v.xy)
    }
}

/// An unordered collection of points.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MultiPoint {
    pub description: VertexDescription,
    pub points: Vec<Vertex>,
}

impl MultiPoint {
    pub fn new(description: VertexDescription, points: Vec<Vertex>) -> Self {
        Self {
            description,
            points,
        }
    }

    pub fn from_coords(coords: &[(f64, f64)]) -> Self {
        Self::new(
            VertexDescription::XY,
            coords.iter().map(|&(x, y)| Vertex::new(x, y)).collect(),
        )
    }

    pub fn envelope(&self) -> Envelope2D {
        Envelope2D::from_points(self.points.iter().map(|v| &v.xy))
    }
}

/// The envelope geometry variant: a rectangle with a vertex description.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnvelopeGeometry {
    pub description: VertexDescription,
    pub rect: Envelope2D,
}

impl EnvelopeGeometry {
    pub fn new(rect: Envelope2D) -> Self {
        Self {
            description: VertexDescription::XY,
            rect,
        }
    }

    /// The same rectangle as a single counter-clockwise ring.
    pub fn to_polygon(&self) -> MultiPath {
        if self.rect.is_empty() {
            return MultiPath::new(self.description, Vec::new());
        }
        let ring = Path::from_points(&self.rect.corners());
        MultiPath::new(self.description, vec![ring])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_area_orientation() {
        let ccw = Path::from_points(&[
            Point2d::new(0.0, 0.0),
            Point2d::new(2.0, 0.0),
            Point2d::new(2.0, 1.0),
            Point2d::new(0.0, 1.0),
        ]);
        assert!((ccw.signed_area() - 2.0).abs() < 1e-12);
        assert!((ccw.reversed().signed_area() + 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_segments_closed_and_open() {
        let path = Path::from_points(&[
            Point2d::new(0.0, 0.0),
            Point2d::new(1.0, 0.0),
            Point2d::new(1.0, 1.0),
        ]);
        assert_eq!(path.segments(false).count(), 2);
        assert_eq!(path.segments(true).count(), 3);
        assert!((path.length(true) - (2.0 + 2f64.sqrt())).abs() < 1e-12);
    }

    #[test]
    fn test_even_odd_containment_with_hole() {
        let poly = MultiPath::from_coords(&[
            vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)],
            vec![(1.0, 1.0), (1.0, 3.0), (3.0, 3.0), (3.0, 1.0)],
        ]);
        assert!(poly.contains_point(&Point2d::new(0.5, 0.5)));
        assert!(!poly.contains_point(&Point2d::new(2.0, 2.0)));
        assert!(!poly.contains_point(&Point2d::new(5.0, 2.0)));
        assert!((poly.distance_to_boundary(&Point2d::new(2.0, 2.0), true) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_envelope_geometry_to_polygon() {
        let env = EnvelopeGeometry::new(Envelope2D::new(0.0, 0.0, 2.0, 1.0));
        let poly = env.to_polygon();
        assert_eq!(poly.paths.len(), 1);
        assert!((poly.signed_area() - 2.0).abs() < 1e-12);
    }
}
