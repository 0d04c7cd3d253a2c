//! Geometry value types.
//!
//! Geometries are immutable from the operators' point of view: operators
//! build new instances, and may hand an input back unchanged when it is
//! already the exact result.

pub mod description;
pub mod envelope;
pub mod multi_path;
pub mod point;
pub mod segment;
pub mod spatial_reference;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

pub use description::{Semantics, VertexDescription};
pub use envelope::Envelope2D;
pub use multi_path::{EnvelopeGeometry, MultiPath, MultiPoint, Path, Point};
pub use point::{Point2d, Vertex};
pub use spatial_reference::SpatialReference;

/// Discriminant of [`Geometry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryType {
    Point,
    MultiPoint,
    Envelope,
    Polyline,
    Polygon,
}

impl GeometryType {
    /// Topological dimension: 0 for points, 1 for lines, 2 for areas.
    pub fn dimension(&self) -> i32 {
        match self {
            GeometryType::Point | GeometryType::MultiPoint => 0,
            GeometryType::Polyline => 1,
            GeometryType::Envelope | GeometryType::Polygon => 2,
        }
    }
}

/// A planar vector geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Point(Point),
    MultiPoint(MultiPoint),
    Envelope(EnvelopeGeometry),
    Polyline(MultiPath),
    Polygon(MultiPath),
}

impl Geometry {
    pub fn point(x: f64, y: f64) -> Self {
        Geometry::Point(Point::new(x, y))
    }

    pub fn multi_point(coords: &[(f64, f64)]) -> Self {
        Geometry::MultiPoint(MultiPoint::from_coords(coords))
    }

    pub fn envelope(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Geometry::Envelope(EnvelopeGeometry::new(Envelope2D::new(xmin, ymin, xmax, ymax)))
    }

    pub fn polyline(paths: &[Vec<(f64, f64)>]) -> Self {
        Geometry::Polyline(MultiPath::from_coords(paths))
    }

    /// Rings are taken as given; exterior rings are expected counter-clockwise.
    pub fn polygon(rings: &[Vec<(f64, f64)>]) -> Self {
        Geometry::Polygon(MultiPath::from_coords(rings))
    }

    /// An empty geometry of the given type.
    pub fn empty(geometry_type: GeometryType, description: VertexDescription) -> Self {
        match geometry_type {
            GeometryType::Point => Geometry::Point(Point {
                description,
                vertex: None,
            }),
            GeometryType::MultiPoint => Geometry::MultiPoint(MultiPoint::new(description, Vec::new())),
            GeometryType::Envelope => Geometry::Envelope(EnvelopeGeometry {
                description,
                rect: Envelope2D::empty(),
            }),
            GeometryType::Polyline => Geometry::Polyline(MultiPath::new(description, Vec::new())),
            GeometryType::Polygon => Geometry::Polygon(MultiPath::new(description, Vec::new())),
        }
    }

    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Point(_) => GeometryType::Point,
            Geometry::MultiPoint(_) => GeometryType::MultiPoint,
            Geometry::Envelope(_) => GeometryType::Envelope,
            Geometry::Polyline(_) => GeometryType::Polyline,
            Geometry::Polygon(_) => GeometryType::Polygon,
        }
    }

    pub fn dimension(&self) -> i32 {
        self.geometry_type().dimension()
    }

    pub fn description(&self) -> VertexDescription {
        match self {
            Geometry::Point(p) => p.description,
            Geometry::MultiPoint(mp) => mp.description,
            Geometry::Envelope(e) => e.description,
            Geometry::Polyline(mp) | Geometry::Polygon(mp) => mp.description,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Geometry::Point(p) => p.vertex.is_none(),
            Geometry::MultiPoint(mp) => mp.points.is_empty(),
            Geometry::Envelope(e) => e.rect.is_empty(),
            Geometry::Polyline(mp) | Geometry::Polygon(mp) => mp.is_empty(),
        }
    }

    pub fn point_count(&self) -> usize {
        match self {
            Geometry::Point(p) => usize::from(p.vertex.is_some()),
            Geometry::MultiPoint(mp) => mp.points.len(),
            Geometry::Envelope(e) => {
                if e.rect.is_empty() {
                    0
                } else {
                    4
                }
            }
            Geometry::Polyline(mp) | Geometry::Polygon(mp) => mp.point_count(),
        }
    }

    pub fn envelope_2d(&self) -> Envelope2D {
        match self {
            Geometry::Point(p) => match p.xy() {
                Some(xy) => Envelope2D::from_points(std::iter::once(&xy)),
                None => Envelope2D::empty(),
            },
            Geometry::MultiPoint(mp) => mp.envelope(),
            Geometry::Envelope(e) => e.rect,
            Geometry::Polyline(mp) | Geometry::Polygon(mp) => mp.envelope(),
        }
    }

    /// Area of polygons and envelopes; zero for other types.
    pub fn area(&self) -> f64 {
        match self {
            Geometry::Polygon(mp) => mp.signed_area(),
            Geometry::Envelope(e) => e.rect.area(),
            _ => 0.0,
        }
    }

    /// Length of polylines, perimeter of polygons and envelopes.
    pub fn length(&self) -> f64 {
        match self {
            Geometry::Polyline(mp) => mp.length(false),
            Geometry::Polygon(mp) => mp.length(true),
            Geometry::Envelope(e) => 2.0 * (e.rect.width() + e.rect.height()),
            _ => 0.0,
        }
    }

    /// Envelopes become single-ring polygons; everything else is returned as is.
    pub fn to_multi_path_form(&self) -> Geometry {
        match self {
            Geometry::Envelope(e) => Geometry::Polygon(e.to_polygon()),
            other => other.clone(),
        }
    }

    /// All vertices in storage order.
    pub fn vertices(&self) -> Vec<Vertex> {
        match self {
            Geometry::Point(p) => p.vertex.into_iter().collect(),
            Geometry::MultiPoint(mp) => mp.points.clone(),
            Geometry::Envelope(e) => e.to_polygon().vertices().copied().collect(),
            Geometry::Polyline(mp) | Geometry::Polygon(mp) => mp.vertices().copied().collect(),
        }
    }

    pub fn as_multi_path(&self) -> Option<&MultiPath> {
        match self {
            Geometry::Polyline(mp) | Geometry::Polygon(mp) => Some(mp),
            _ => None,
        }
    }

    /// Content-derived token identifying this geometry for accelerator caching.
    pub fn key(&self) -> GeometryKey {
        let mut hasher = DefaultHasher::new();
        self.geometry_type().hash(&mut hasher);
        self.description().hash(&mut hasher);
        match self {
            Geometry::Polyline(mp) | Geometry::Polygon(mp) => {
                for path in &mp.paths {
                    path.len().hash(&mut hasher);
                    for v in &path.vertices {
                        v.xy.bits().hash(&mut hasher);
                    }
                }
            }
            other => {
                for v in other.vertices() {
                    v.xy.bits().hash(&mut hasher);
                }
            }
        }
        GeometryKey {
            hash: hasher.finish(),
            point_count: self.point_count(),
            envelope_bits: envelope_bits(&self.envelope_2d()),
        }
    }
}

fn envelope_bits(env: &Envelope2D) -> [u64; 4] {
    [
        env.xmin.to_bits(),
        env.ymin.to_bits(),
        env.xmax.to_bits(),
        env.ymax.to_bits(),
    ]
}

/// Equality token for geometry content.
///
/// The vertex count and envelope are stored next to the hash so that a
/// hash collision between different shapes does not alias in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryKey {
    hash: u64,
    point_count: usize,
    envelope_bits: [u64; 4],
}

impl From<MultiPath> for Geometry {
    fn from(mp: MultiPath) -> Self {
        Geometry::Polygon(mp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Geometry {
        Geometry::polygon(&[vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]])
    }

    #[test]
    fn test_dimension_and_type() {
        assert_eq!(unit_square().dimension(), 2);
        assert_eq!(Geometry::polyline(&[vec![(0.0, 0.0), (1.0, 0.0)]]).dimension(), 1);
        assert_eq!(Geometry::point(1.0, 1.0).dimension(), 0);
        assert_eq!(Geometry::envelope(0.0, 0.0, 1.0, 1.0).dimension(), 2);
    }

    #[test]
    fn test_empty_geometries() {
        assert!(Geometry::empty(GeometryType::Polygon, VertexDescription::XY).is_empty());
        assert!(Geometry::Point(Point::empty()).is_empty());
        assert!(!unit_square().is_empty());
    }

    #[test]
    fn test_area_and_length() {
        let sq = unit_square();
        assert!((sq.area() - 1.0).abs() < 1e-12);
        assert!((sq.length() - 4.0).abs() < 1e-12);
        assert_eq!(sq.point_count(), 4);
    }

    #[test]
    fn test_key_tracks_content() {
        let a = unit_square();
        let b = unit_square();
        let c = Geometry::polygon(&[vec![(0.0, 0.0), (2.0, 0.0), (2.0, 1.0), (0.0, 1.0)]]);
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn test_envelope_to_polygon_form() {
        let env = Geometry::envelope(0.0, 0.0, 2.0, 1.0);
        let poly = env.to_multi_path_form();
        assert_eq!(poly.geometry_type(), GeometryType::Polygon);
        assert!((poly.area() - 2.0).abs() < 1e-12);
    }
}
