//! Tests for verification oracles.

use planar_kernel::operators::{BinaryOperator, OperatorContext};
use test_harness::helpers::{cursor_of, rect, regular_polygon, segment, unit_square};
use test_harness::oracle::*;

// ── Measure Oracle Tests ────────────────────────────────────────────────

#[test]
fn area_oracle_passes_for_unit_square() {
    let result = check_area(&unit_square(0.0, 0.0), 1.0, 1e-12);
    assert!(result.passed, "unit square area: {}", result.detail);
    assert_eq!(result.value, Some(1.0));
}

#[test]
fn area_oracle_fails_with_detail() {
    let result = check_area(&rect(0.0, 0.0, 2.0, 1.0), 3.0, 1e-9);
    assert!(!result.passed);
    assert!(result.detail.contains("expected area"), "{}", result.detail);
}

#[test]
fn ring_count_oracle_sees_hole() {
    let holed = planar_kernel::Geometry::polygon(&[
        vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)],
        vec![(1.0, 1.0), (1.0, 3.0), (3.0, 3.0), (3.0, 1.0)],
    ]);
    let result = check_ring_counts(&holed, 1, 1);
    assert!(result.passed, "{}", result.detail);
    assert!(!check_ring_counts(&holed, 1, 0).passed);
}

// ── Set Oracle Tests ────────────────────────────────────────────────────

#[test]
fn set_equality_passes_for_union_of_halves() {
    let ctx = OperatorContext::default();
    let merged = ctx
        .union()
        .execute_pair(&unit_square(0.0, 0.0), &unit_square(1.0, 0.0), None, None)
        .unwrap();
    let result = check_polygon_set_equal(&merged, &rect(0.0, 0.0, 2.0, 1.0), 500, 7, 1e-9);
    assert!(result.passed, "{}", result.detail);
    assert!(result.value.unwrap_or(0.0) > 100.0, "too few samples tested");
}

#[test]
fn set_equality_fails_for_shifted_square() {
    let result =
        check_polygon_set_equal(&unit_square(0.0, 0.0), &unit_square(0.5, 0.0), 500, 11, 1e-9);
    assert!(!result.passed);
    assert!(result.detail.contains("disagree"), "{}", result.detail);
}

#[test]
fn set_equality_rejects_non_polygons() {
    let line = segment((0.0, 0.0), (1.0, 1.0));
    let result = check_polygon_set_equal(&line, &unit_square(0.0, 0.0), 10, 1, 1e-9);
    assert!(!result.passed);
}

#[test]
fn commutativity_oracle_passes_for_set_operators() {
    let ctx = OperatorContext::default();
    let (a, b) = (rect(0.0, 0.0, 2.0, 2.0), rect(1.0, 1.0, 3.0, 3.0));
    assert!(check_commutative(&ctx.union(), &a, &b, 1e-9).passed);
    assert!(check_commutative(&ctx.intersection(), &a, &b, 1e-9).passed);
    assert!(check_commutative(&ctx.symmetric_difference(), &a, &b, 1e-9).passed);
}

#[test]
fn self_cancellation_oracle_passes() {
    let ctx = OperatorContext::default();
    let result = check_self_cancellation(&ctx, &regular_polygon((0.0, 0.0), 5.0, 12));
    assert!(result.passed, "{}", result.detail);
}

#[test]
fn symdiff_oracle_matches_differences() {
    let ctx = OperatorContext::default();
    let result = check_symdiff_matches_differences(
        &ctx,
        &rect(0.0, 0.0, 2.0, 2.0),
        &rect(1.0, 1.0, 3.0, 3.0),
        1e-9,
    );
    assert!(result.passed, "{}", result.detail);
    assert!((result.value.unwrap_or(0.0) - 6.0).abs() < 1e-9);
}

#[test]
fn overlay_checks_all_pass_for_crossing_rectangles() {
    let ctx = OperatorContext::default();
    let verdicts = run_overlay_checks(&ctx, &rect(0.0, 0.0, 4.0, 1.0), &rect(1.0, -1.0, 2.0, 3.0));
    assert_eq!(verdicts.len(), 5);
    for v in &verdicts {
        assert!(v.passed, "{} failed: {}", v.oracle_name, v.detail);
    }
}

// ── Noding Oracle Tests ─────────────────────────────────────────────────

#[test]
fn noding_is_idempotent_for_crossing_shapes() {
    let ctx = OperatorContext::default();
    let shapes = vec![
        rect(0.0, 0.0, 2.0, 2.0),
        rect(1.0, 1.0, 3.0, 3.0),
        segment((-1.0, 0.5), (4.0, 2.5)),
    ];
    let result = check_noding_idempotent(&ctx, &shapes);
    assert!(result.passed, "{}", result.detail);
}

// ── Cursor Oracle Tests ─────────────────────────────────────────────────

#[test]
fn array_cursor_stays_exhausted() {
    let squares = [unit_square(0.0, 0.0), unit_square(2.0, 0.0), unit_square(4.0, 0.0)];
    let mut cursor = cursor_of(&squares);
    let result = check_cursor_exhaustion(&mut *cursor, 5);
    assert!(result.passed, "{}", result.detail);
    assert_eq!(result.value, Some(3.0));
}

#[test]
fn union_cursor_stays_exhausted() {
    let ctx = OperatorContext::default();
    let union = ctx.union();
    let inputs = cursor_of(&[unit_square(0.0, 0.0), unit_square(0.5, 0.0)]);
    let mut cursor = union.execute(inputs, None, None);
    let result = check_cursor_exhaustion(&mut cursor, 3);
    assert!(result.passed, "{}", result.detail);
    assert_eq!(result.value, Some(1.0));
}

// ── Relate Oracle Tests ─────────────────────────────────────────────────

#[test]
fn relate_acceleration_agrees_on_nested_circles() {
    let outer = regular_polygon((0.0, 0.0), 10.0, 32);
    let inner = regular_polygon((0.0, 0.0), 3.0, 24);
    for pattern in ["T*****FF*", "T*F**F***", "FF*FF****", "212FF1FF2"] {
        let result = check_relate_acceleration(&outer, &inner, pattern);
        assert!(result.passed, "{}: {}", pattern, result.detail);
    }
}

#[test]
fn relate_acceleration_agrees_on_small_operands() {
    let a = rect(0.0, 0.0, 1.0, 1.0);
    let b = rect(2.0, 2.0, 3.0, 3.0);
    let result = check_relate_acceleration(&a, &b, "FF*FF****");
    assert!(result.passed, "{}", result.detail);
}
