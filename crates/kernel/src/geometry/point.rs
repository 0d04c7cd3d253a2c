use approx::{AbsDiffEq, RelativeEq};
use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

/// A point (or displacement) in the plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2d {
    pub x: f64,
    pub y: f64,
}

impl Point2d {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn nan() -> Self {
        Self::new(f64::NAN, f64::NAN)
    }

    pub fn is_nan(&self) -> bool {
        self.x.is_nan() || self.y.is_nan()
    }

    pub fn distance_to(&self, other: &Self) -> f64 {
        self.distance_squared_to(other).sqrt()
    }

    pub fn distance_squared_to(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// z-component of the 3D cross product.
    pub fn cross(&self, other: &Self) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn length(&self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn normalized(&self) -> Option<Self> {
        let len = self.length();
        if len < 1e-300 || !len.is_finite() {
            None
        } else {
            Some(*self * (1.0 / len))
        }
    }

    /// Counter-clockwise perpendicular.
    pub fn left_normal(&self) -> Self {
        Self::new(-self.y, self.x)
    }

    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        Self {
            x: self.x + t * (other.x - self.x),
            y: self.y + t * (other.y - self.y),
        }
    }

    pub fn midpoint(&self, other: &Self) -> Self {
        self.lerp(other, 0.5)
    }

    /// Key for exact coordinate identity, with -0.0 folded into 0.0.
    pub fn bits(&self) -> (u64, u64) {
        ((self.x + 0.0).to_bits(), (self.y + 0.0).to_bits())
    }

    /// Lexicographic (x, then y) ordering; NaN compares equal.
    pub fn lex_cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.x
            .partial_cmp(&other.x)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                self.y
                    .partial_cmp(&other.y)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    }
}

impl Add for Point2d {
    type Output = Point2d;
    fn add(self, rhs: Self) -> Self::Output {
        Point2d::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point2d {
    type Output = Point2d;
    fn sub(self, rhs: Self) -> Self::Output {
        Point2d::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point2d {
    type Output = Point2d;
    fn mul(self, rhs: f64) -> Self::Output {
        Point2d::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Point2d {
    type Output = Point2d;
    fn neg(self) -> Self::Output {
        Point2d::new(-self.x, -self.y)
    }
}

impl From<(f64, f64)> for Point2d {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl AbsDiffEq for Point2d {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.x.abs_diff_eq(&other.x, epsilon) && self.y.abs_diff_eq(&other.y, epsilon)
    }
}

impl RelativeEq for Point2d {
    fn default_max_relative() -> Self::Epsilon {
        f64::default_max_relative()
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        self.x.relative_eq(&other.x, epsilon, max_relative)
            && self.y.relative_eq(&other.y, epsilon, max_relative)
    }
}

/// A position plus its optional attribute channels.
///
/// Which channels are meaningful is decided by the owning geometry's
/// [`VertexDescription`](super::description::VertexDescription); absent
/// channels hold their default values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Vertex {
    pub xy: Point2d,
    pub z: f64,
    pub m: f64,
}

impl Vertex {
    pub fn new(x: f64, y: f64) -> Self {
        Self::from_xy(Point2d::new(x, y))
    }

    pub fn from_xy(xy: Point2d) -> Self {
        Self {
            xy,
            z: 0.0,
            m: f64::NAN,
        }
    }

    pub fn with_z(mut self, z: f64) -> Self {
        self.z = z;
        self
    }

    pub fn with_m(mut self, m: f64) -> Self {
        self.m = m;
        self
    }

    /// Interpolate position and attributes at parameter `t` along `self -> other`.
    pub fn interpolate(&self, other: &Self, t: f64) -> Self {
        Self {
            xy: self.xy.lerp(&other.xy, t),
            z: self.z + t * (other.z - self.z),
            m: self.m + t * (other.m - self.m),
        }
    }

    /// Same attributes, new position; attributes are interpolated along the segment.
    pub fn at_point_on_segment(&self, other: &Self, t: f64, xy: Point2d) -> Self {
        let mut v = self.interpolate(other, t);
        v.xy = xy;
        v
    }
}

/// Attribute channels compare equal when both hold NaN.
impl PartialEq for Vertex {
    fn eq(&self, other: &Self) -> bool {
        let same = |a: f64, b: f64| a == b || (a.is_nan() && b.is_nan());
        self.xy == other.xy && same(self.z, other.z) && same(self.m, other.m)
    }
}

impl From<Point2d> for Vertex {
    fn from(xy: Point2d) -> Self {
        Self::from_xy(xy)
    }
}
