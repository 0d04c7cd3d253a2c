//! Structured text reports of operator results.
//!
//! The text form is for reading in test output; the JSON form is for
//! diffing runs.

use std::fmt;

use planar_kernel::geometry::Geometry;
use serde::Serialize;

use crate::helpers::{ring_counts, HarnessError};
use crate::oracle::OracleVerdict;

/// A report over a named sequence of result geometries.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GeometryReport {
    pub title: String,
    pub entries: Vec<GeometryEntry>,
    pub oracle_results: Vec<VerdictEntry>,
}

/// One result geometry.
#[derive(Debug, Clone, Serialize)]
pub struct GeometryEntry {
    pub id: i64,
    pub geometry_type: String,
    pub point_count: usize,
    pub area: f64,
    pub length: f64,
    pub envelope: Option<[f64; 4]>,
    pub rings: Option<(usize, usize)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerdictEntry {
    pub oracle: String,
    pub passed: bool,
    pub detail: String,
}

impl GeometryEntry {
    pub fn describe(id: i64, geometry: &Geometry) -> Self {
        let env = geometry.envelope_2d();
        Self {
            id,
            geometry_type: format!("{:?}", geometry.geometry_type()),
            point_count: geometry.point_count(),
            area: geometry.area(),
            length: geometry.length(),
            envelope: (!env.is_empty()).then(|| [env.xmin, env.ymin, env.xmax, env.ymax]),
            rings: matches!(geometry, Geometry::Polygon(_)).then(|| ring_counts(geometry)),
        }
    }
}

impl GeometryReport {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Report over `(id, geometry)` pairs as drained from a cursor.
    pub fn from_results(title: impl Into<String>, results: &[(i64, Geometry)]) -> Self {
        let mut report = Self::new(title);
        for (id, g) in results {
            report.add_geometry(*id, g);
        }
        report
    }

    pub fn add_geometry(&mut self, id: i64, geometry: &Geometry) {
        self.entries.push(GeometryEntry::describe(id, geometry));
    }

    pub fn add_verdicts(&mut self, verdicts: &[OracleVerdict]) {
        self.oracle_results.extend(verdicts.iter().map(|v| VerdictEntry {
            oracle: v.oracle_name.clone(),
            passed: v.passed,
            detail: v.detail.clone(),
        }));
    }

    pub fn failed_count(&self) -> usize {
        self.oracle_results.iter().filter(|v| !v.passed).count()
    }

    /// Format the report as text.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("=== {} ===\n\n", self.title));

        out.push_str(&format!("Results ({} geometries):\n", self.entries.len()));
        for entry in &self.entries {
            out.push_str(&format!(
                "  [{}] {} with {} points\n",
                entry.id, entry.geometry_type, entry.point_count,
            ));
            if entry.area != 0.0 || entry.length != 0.0 {
                out.push_str(&format!(
                    "      area {:.6}, length {:.6}\n",
                    entry.area, entry.length,
                ));
            }
            if let Some((exterior, interior)) = entry.rings {
                out.push_str(&format!(
                    "      rings: {} exterior, {} interior\n",
                    exterior, interior,
                ));
            }
            match entry.envelope {
                Some([xmin, ymin, xmax, ymax]) => out.push_str(&format!(
                    "      envelope ({:.3}, {:.3}) -> ({:.3}, {:.3})\n",
                    xmin, ymin, xmax, ymax,
                )),
                None => out.push_str("      envelope: empty\n"),
            }
        }

        if !self.oracle_results.is_empty() {
            out.push_str(&format!(
                "\nOracle Results ({} checks, {} failed):\n",
                self.oracle_results.len(),
                self.failed_count(),
            ));
            for v in &self.oracle_results {
                let status = if v.passed { "PASS" } else { "FAIL" };
                out.push_str(&format!("  [{}] {}: {}\n", status, v.oracle, v.detail));
            }
        }
        out
    }

    pub fn to_json(&self) -> Result<String, HarnessError> {
        serde_json::to_string_pretty(self).map_err(|e| HarnessError::AssertionFailed {
            detail: format!("report serialization failed: {}", e),
        })
    }
}

impl fmt::Display for GeometryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}
