//! Helper functions: error type, geometry builders, cursor plumbing, sampling.

use planar_kernel::cursor::{collect_cursor, GeometryCursor, SimpleGeometryCursor};
use planar_kernel::geometry::{Envelope2D, Geometry, Point2d};
use planar_kernel::KernelError;

// ── Error Type ──────────────────────────────────────────────────────────────

/// Unified error type for the test harness.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("assertion failed: {detail}")]
    AssertionFailed { detail: String },

    #[error("oracle failure ({oracle}): {detail}")]
    OracleFailure { oracle: String, detail: String },

    #[error("unexpected result count: expected {expected}, got {actual}")]
    ResultCount { expected: usize, actual: usize },

    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),
}

// ── Geometry Builders ───────────────────────────────────────────────────────

/// Counter-clockwise axis-aligned rectangle polygon.
pub fn rect(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Geometry {
    Geometry::polygon(&[vec![(xmin, ymin), (xmax, ymin), (xmax, ymax), (xmin, ymax)]])
}

/// Unit square with its lower-left corner at `(x, y)`.
pub fn unit_square(x: f64, y: f64) -> Geometry {
    rect(x, y, x + 1.0, y + 1.0)
}

/// Regular polygon with `n` vertices on a circle of radius `r`.
pub fn regular_polygon(center: (f64, f64), r: f64, n: usize) -> Geometry {
    let coords: Vec<(f64, f64)> = (0..n)
        .map(|i| {
            let t = i as f64 * std::f64::consts::TAU / n as f64;
            (center.0 + r * t.cos(), center.1 + r * t.sin())
        })
        .collect();
    Geometry::polygon(&[coords])
}

/// `count` disjoint unit squares laid out in rows of ten, two units apart.
pub fn disjoint_squares(count: usize) -> Vec<Geometry> {
    (0..count)
        .map(|i| unit_square((i % 10) as f64 * 2.0, (i / 10) as f64 * 2.0))
        .collect()
}

/// Two-point polyline.
pub fn segment(a: (f64, f64), b: (f64, f64)) -> Geometry {
    Geometry::polyline(&[vec![a, b]])
}

// ── Cursor Plumbing ─────────────────────────────────────────────────────────

/// Array-backed cursor over clones of `geometries`.
pub fn cursor_of(geometries: &[Geometry]) -> Box<dyn GeometryCursor> {
    Box::new(SimpleGeometryCursor::new(geometries.to_vec()))
}

/// Drain a cursor and return only the geometries.
pub fn drain(cursor: impl GeometryCursor) -> Result<Vec<Geometry>, HarnessError> {
    Ok(collect_cursor(cursor)?.into_iter().map(|(_, g)| g).collect())
}

/// Drain a cursor that must produce exactly one geometry.
pub fn drain_one(cursor: impl GeometryCursor) -> Result<Geometry, HarnessError> {
    let mut all = drain(cursor)?;
    if all.len() != 1 {
        return Err(HarnessError::ResultCount {
            expected: 1,
            actual: all.len(),
        });
    }
    Ok(all.remove(0))
}

// ── Sampling ────────────────────────────────────────────────────────────────

/// Deterministic linear congruential generator for reproducible sampling.
#[derive(Debug, Clone)]
pub struct Lcg {
    state: u64,
}

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Next value in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.state >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform point inside `env`.
    pub fn point_in(&mut self, env: &Envelope2D) -> Point2d {
        let x = env.xmin + self.next_f64() * env.width();
        let y = env.ymin + self.next_f64() * env.height();
        Point2d::new(x, y)
    }
}

/// Number of exterior (counter-clockwise) and interior rings of a polygon.
pub fn ring_counts(geometry: &Geometry) -> (usize, usize) {
    match geometry.as_multi_path() {
        Some(mp) if matches!(geometry, Geometry::Polygon(_)) => {
            let exterior = mp.exterior_ring_count();
            (exterior, mp.paths.len() - exterior)
        }
        _ => (0, 0),
    }
}
