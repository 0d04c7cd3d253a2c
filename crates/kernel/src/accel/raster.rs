use serde::{Deserialize, Serialize};

use crate::geometry::segment::segment_envelope_distance;
use crate::geometry::{Envelope2D, MultiPath, Point2d};

/// State of one raster cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellState {
    Inside,
    Outside,
    /// Some edge passes within tolerance of the cell.
    Boundary,
}

/// Answer of a raster point query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RasterHit {
    Inside,
    Outside,
    /// The cell touches the boundary; an exact test is required.
    Unknown,
}

/// Occupancy bitmap approximating a geometry's interior.
///
/// Cells farther than the tolerance from every edge have a single state for
/// all their points, so `Inside` and `Outside` answers are exact.
#[derive(Debug, Clone)]
pub struct RasterizedGeometry {
    env: Envelope2D,
    resolution: usize,
    cell_w: f64,
    cell_h: f64,
    tolerance: f64,
    cells: Vec<CellState>,
}

impl RasterizedGeometry {
    /// Rasterize a polygon (`closed`) or polyline at `resolution` cells per side.
    pub fn build(mp: &MultiPath, closed: bool, tolerance: f64, resolution: usize) -> Self {
        let resolution = resolution.max(1);
        let env = mp.envelope().inflated(tolerance, tolerance);
        let cell_w = env.width() / resolution as f64;
        let cell_h = env.height() / resolution as f64;
        let mut raster = Self {
            env,
            resolution,
            cell_w,
            cell_h,
            tolerance,
            cells: vec![CellState::Outside; resolution * resolution],
        };
        if env.is_empty() {
            return raster;
        }
        if closed {
            raster.fill_interior(mp);
        }
        for (a, b) in mp.segments(closed) {
            raster.mark_boundary(&a, &b);
        }
        raster
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    fn cell_env(&self, col: usize, row: usize) -> Envelope2D {
        let x0 = self.env.xmin + col as f64 * self.cell_w;
        let y0 = self.env.ymin + row as f64 * self.cell_h;
        Envelope2D::new(x0, y0, x0 + self.cell_w, y0 + self.cell_h)
    }

    fn col_of(&self, x: f64) -> usize {
        if self.cell_w <= 0.0 {
            return 0;
        }
        (((x - self.env.xmin) / self.cell_w).floor().max(0.0) as usize).min(self.resolution - 1)
    }

    fn row_of(&self, y: f64) -> usize {
        if self.cell_h <= 0.0 {
            return 0;
        }
        (((y - self.env.ymin) / self.cell_h).floor().max(0.0) as usize).min(self.resolution - 1)
    }

    /// Even-odd scanline through each row's cell centres.
    fn fill_interior(&mut self, mp: &MultiPath) {
        let segments: Vec<(Point2d, Point2d)> = mp.segments(true).collect();
        let mut crossings = Vec::new();
        for row in 0..self.resolution {
            let y = self.env.ymin + (row as f64 + 0.5) * self.cell_h;
            crossings.clear();
            for (a, b) in &segments {
                if (a.y > y) != (b.y > y) {
                    crossings.push(a.x + (y - a.y) / (b.y - a.y) * (b.x - a.x));
                }
            }
            crossings.sort_by(f64::total_cmp);
            for col in 0..self.resolution {
                let x = self.env.xmin + (col as f64 + 0.5) * self.cell_w;
                let left = crossings.iter().take_while(|&&c| c < x).count();
                if left % 2 == 1 {
                    self.cells[row * self.resolution + col] = CellState::Inside;
                }
            }
        }
    }

    fn mark_boundary(&mut self, a: &Point2d, b: &Point2d) {
        let reach = Envelope2D::from_segment(a, b).inflated(self.tolerance, self.tolerance);
        let (c0, c1) = (self.col_of(reach.xmin), self.col_of(reach.xmax));
        let (r0, r1) = (self.row_of(reach.ymin), self.row_of(reach.ymax));
        for row in r0..=r1 {
            for col in c0..=c1 {
                let idx = row * self.resolution + col;
                if self.cells[idx] == CellState::Boundary {
                    continue;
                }
                if segment_envelope_distance(a, b, &self.cell_env(col, row)) <= self.tolerance {
                    self.cells[idx] = CellState::Boundary;
                }
            }
        }
    }

    pub fn cell_state(&self, p: &Point2d) -> CellState {
        if !self.env.contains_point(p) {
            return CellState::Outside;
        }
        self.cells[self.row_of(p.y) * self.resolution + self.col_of(p.x)]
    }

    pub fn query_point(&self, p: &Point2d) -> RasterHit {
        if p.is_nan() {
            return RasterHit::Unknown;
        }
        match self.cell_state(p) {
            CellState::Inside => RasterHit::Inside,
            CellState::Outside => RasterHit::Outside,
            CellState::Boundary => RasterHit::Unknown,
        }
    }

    /// Counts of (inside, outside, boundary) cells.
    pub fn census(&self) -> (usize, usize, usize) {
        self.cells.iter().fold((0, 0, 0), |(i, o, b), c| match c {
            CellState::Inside => (i + 1, o, b),
            CellState::Outside => (i, o + 1, b),
            CellState::Boundary => (i, o, b + 1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_raster_queries() {
        let sq = MultiPath::from_coords(&[vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]]);
        let raster = RasterizedGeometry::build(&sq, true, 1e-6, 32);
        assert_eq!(raster.query_point(&Point2d::new(5.0, 5.0)), RasterHit::Inside);
        assert_eq!(raster.query_point(&Point2d::new(20.0, 5.0)), RasterHit::Outside);
        assert_eq!(raster.query_point(&Point2d::new(10.0, 5.0)), RasterHit::Unknown);
        let (inside, _, boundary) = raster.census();
        assert!(inside > 0 && boundary > 0);
    }

    #[test]
    fn test_raster_agrees_with_exact_test() {
        let ring: Vec<(f64, f64)> = (0..24)
            .map(|i| {
                let a = i as f64 * std::f64::consts::TAU / 24.0;
                let r = if i % 2 == 0 { 10.0 } else { 4.0 };
                (r * a.cos(), r * a.sin())
            })
            .collect();
        let star = MultiPath::from_coords(&[ring]);
        let raster = RasterizedGeometry::build(&star, true, 1e-6, 64);
        for i in 0..50 {
            for j in 0..50 {
                let p = Point2d::new(-12.0 + i as f64 * 0.49, -12.0 + j as f64 * 0.49);
                match raster.query_point(&p) {
                    RasterHit::Inside => assert!(star.contains_point(&p)),
                    RasterHit::Outside => assert!(!star.contains_point(&p)),
                    RasterHit::Unknown => {}
                }
            }
        }
    }

    #[test]
    fn test_polyline_raster_has_no_interior() {
        let line = MultiPath::from_coords(&[vec![(0.0, 0.0), (10.0, 10.0)]]);
        let raster = RasterizedGeometry::build(&line, false, 1e-6, 16);
        let (inside, _, boundary) = raster.census();
        assert_eq!(inside, 0);
        assert!(boundary >= 16);
    }
}
