//! Tests for the report module.

use approx::assert_abs_diff_eq;
use planar_kernel::operators::{BufferParams, OperatorContext};
use planar_kernel::Geometry;
use test_harness::helpers::{rect, segment, unit_square};
use test_harness::oracle::{check_area, check_ring_counts};
use test_harness::GeometryReport;

#[test]
fn empty_report() {
    let report = GeometryReport::new("nothing");
    let text = report.to_text();
    assert!(text.contains("=== nothing ==="));
    assert!(text.contains("Results (0 geometries)"));
    assert!(!text.contains("Oracle Results"));
}

#[test]
fn report_lists_each_result() {
    let results = vec![(0, rect(0.0, 0.0, 2.0, 1.0)), (4, segment((0.0, 0.0), (3.0, 4.0)))];
    let report = GeometryReport::from_results("mixed", &results);
    let text = report.to_text();
    assert!(text.contains("Results (2 geometries)"), "{}", text);
    assert!(text.contains("[0] Polygon with 4 points"), "{}", text);
    assert!(text.contains("rings: 1 exterior, 0 interior"), "{}", text);
    assert!(text.contains("[4] Polyline with 2 points"), "{}", text);
    assert!(text.contains("length 5.000000"), "{}", text);
}

#[test]
fn report_marks_empty_envelope() {
    let mut report = GeometryReport::new("empty");
    report.add_geometry(0, &Geometry::polygon(&[]));
    assert!(report.to_text().contains("envelope: empty"));
    assert_eq!(report.entries[0].envelope, None);
}

#[test]
fn report_counts_failed_oracles() {
    let square = unit_square(0.0, 0.0);
    let mut report = GeometryReport::new("checks");
    report.add_geometry(0, &square);
    report.add_verdicts(&[check_area(&square, 1.0, 1e-12), check_ring_counts(&square, 2, 0)]);
    assert_eq!(report.failed_count(), 1);
    let text = report.to_text();
    assert!(text.contains("Oracle Results (2 checks, 1 failed)"), "{}", text);
    assert!(text.contains("[PASS] area"));
    assert!(text.contains("[FAIL] ring_counts"));
}

#[test]
fn report_display_matches_text() {
    let report = GeometryReport::from_results("display", &[(0, unit_square(1.0, 1.0))]);
    assert_eq!(format!("{}", report), report.to_text());
}

#[test]
fn report_serializes_to_json() {
    let ctx = OperatorContext::default();
    let buffered = ctx
        .buffer()
        .buffer_geometry(&Geometry::point(0.0, 0.0), 1.0, None, &BufferParams::default(), None)
        .unwrap();
    let report = GeometryReport::from_results("buffer", &[(0, buffered)]);
    let json = report.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["title"], "buffer");
    assert_eq!(value["entries"][0]["geometry_type"], "Polygon");
    let area = value["entries"][0]["area"].as_f64().unwrap();
    assert_abs_diff_eq!(area, std::f64::consts::PI, epsilon = 0.1);
}
