use approx::AbsDiffEq;
use serde::{Deserialize, Serialize};

use super::point::Point2d;

/// Axis-aligned rectangle; empty when `xmin > xmax`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope2D {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Default for Envelope2D {
    fn default() -> Self {
        Self::empty()
    }
}

impl Envelope2D {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    pub fn empty() -> Self {
        Self {
            xmin: f64::INFINITY,
            ymin: f64::INFINITY,
            xmax: f64::NEG_INFINITY,
            ymax: f64::NEG_INFINITY,
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point2d>) -> Self {
        let mut env = Self::empty();
        for p in points {
            env.merge_point(p);
        }
        env
    }

    pub fn from_segment(a: &Point2d, b: &Point2d) -> Self {
        Self::new(a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y))
    }

    pub fn is_empty(&self) -> bool {
        !(self.xmin <= self.xmax && self.ymin <= self.ymax)
    }

    pub fn width(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.xmax - self.xmin
        }
    }

    pub fn height(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.ymax - self.ymin
        }
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Point2d {
        Point2d::new(
            0.5 * (self.xmin + self.xmax),
            0.5 * (self.ymin + self.ymax),
        )
    }

    /// Skips NaN coordinates.
    pub fn merge_point(&mut self, p: &Point2d) {
        if p.is_nan() {
            return;
        }
        self.xmin = self.xmin.min(p.x);
        self.ymin = self.ymin.min(p.y);
        self.xmax = self.xmax.max(p.x);
        self.ymax = self.ymax.max(p.y);
    }

    pub fn merge(&mut self, other: &Self) {
        if other.is_empty() {
            return;
        }
        self.xmin = self.xmin.min(other.xmin);
        self.ymin = self.ymin.min(other.ymin);
        self.xmax = self.xmax.max(other.xmax);
        self.ymax = self.ymax.max(other.ymax);
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut env = *self;
        env.merge(other);
        env
    }

    pub fn intersection(&self, other: &Self) -> Self {
        let env = Self::new(
            self.xmin.max(other.xmin),
            self.ymin.max(other.ymin),
            self.xmax.min(other.xmax),
            self.ymax.min(other.ymax),
        );
        if env.is_empty() {
            Self::empty()
        } else {
            env
        }
    }

    /// Grow (or shrink, for negative amounts) on every side.
    pub fn inflated(&self, dx: f64, dy: f64) -> Self {
        if self.is_empty() {
            return *self;
        }
        Self::new(self.xmin - dx, self.ymin - dy, self.xmax + dx, self.ymax + dy)
    }

    pub fn intersects(&self, other: &Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.xmin <= other.xmax
            && self.xmax >= other.xmin
            && self.ymin <= other.ymax
            && self.ymax >= other.ymin
    }

    pub fn contains_point(&self, p: &Point2d) -> bool {
        p.x >= self.xmin && p.x <= self.xmax && p.y >= self.ymin && p.y <= self.ymax
    }

    pub fn contains(&self, other: &Self) -> bool {
        !other.is_empty()
            && other.xmin >= self.xmin
            && other.xmax <= self.xmax
            && other.ymin >= self.ymin
            && other.ymax <= self.ymax
    }

    /// Corners in counter-clockwise order starting at the lower left.
    pub fn corners(&self) -> [Point2d; 4] {
        [
            Point2d::new(self.xmin, self.ymin),
            Point2d::new(self.xmax, self.ymin),
            Point2d::new(self.xmax, self.ymax),
            Point2d::new(self.xmin, self.ymax),
        ]
    }

    /// Distance from `p` to the rectangle (0 inside).
    pub fn distance_to_point(&self, p: &Point2d) -> f64 {
        let dx = (self.xmin - p.x).max(0.0).max(p.x - self.xmax);
        let dy = (self.ymin - p.y).max(0.0).max(p.y - self.ymax);
        (dx * dx + dy * dy).sqrt()
    }

    /// Gap between two rectangles (0 when they overlap, infinite when either is empty).
    pub fn distance_to_envelope(&self, other: &Self) -> f64 {
        if self.is_empty() || other.is_empty() {
            return f64::INFINITY;
        }
        let dx = (other.xmin - self.xmax).max(self.xmin - other.xmax).max(0.0);
        let dy = (other.ymin - self.ymax).max(self.ymin - other.ymax).max(0.0);
        (dx * dx + dy * dy).sqrt()
    }
}

impl AbsDiffEq for Envelope2D {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        if self.is_empty() || other.is_empty() {
            return self.is_empty() == other.is_empty();
        }
        self.xmin.abs_diff_eq(&other.xmin, epsilon)
            && self.ymin.abs_diff_eq(&other.ymin, epsilon)
            && self.xmax.abs_diff_eq(&other.xmax, epsilon)
            && self.ymax.abs_diff_eq(&other.ymax, epsilon)
    }
}
