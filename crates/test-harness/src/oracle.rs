//! Verification oracles: pure functions returning pass/fail verdicts.
//!
//! Each oracle returns an `OracleVerdict` with diagnostic detail, not panics.
//! This lets a scenario collect all failures in one pass.

use planar_kernel::config::AccelerationDegree;
use planar_kernel::cursor::GeometryCursor;
use planar_kernel::geometry::{Geometry, Point2d};
use planar_kernel::noding::{node_edit_shape, NodingMode};
use planar_kernel::operators::{BinaryOperator, OperatorContext};
use planar_kernel::tolerance::operation_tolerance;
use planar_kernel::topology::EditShape;

use crate::helpers::{ring_counts, Lcg};

/// The result of a single oracle check.
#[derive(Debug, Clone)]
pub struct OracleVerdict {
    pub oracle_name: String,
    pub passed: bool,
    pub detail: String,
    pub value: Option<f64>,
}

impl OracleVerdict {
    fn pass(name: &str, detail: String) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed: true,
            detail,
            value: None,
        }
    }

    fn pass_val(name: &str, detail: String, value: f64) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed: true,
            detail,
            value: Some(value),
        }
    }

    fn fail(name: &str, detail: String) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed: false,
            detail,
            value: None,
        }
    }

    fn fail_val(name: &str, detail: String, value: f64) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed: false,
            detail,
            value: Some(value),
        }
    }

    fn from_error(name: &str, err: impl std::fmt::Display) -> Self {
        Self::fail(name, format!("kernel error: {}", err))
    }
}

// ── Measure Oracles ─────────────────────────────────────────────────────────

/// Check a geometry's area within an absolute tolerance.
pub fn check_area(geometry: &Geometry, expected: f64, tol: f64) -> OracleVerdict {
    let area = geometry.area();
    if (area - expected).abs() <= tol {
        OracleVerdict::pass_val("area", format!("area {:.9} ≈ {:.9}", area, expected), area)
    } else {
        OracleVerdict::fail_val(
            "area",
            format!("expected area {:.9}, got {:.9} (tol={})", expected, area, tol),
            area,
        )
    }
}

/// Check the number of exterior and interior rings of a polygon.
pub fn check_ring_counts(geometry: &Geometry, exterior: usize, interior: usize) -> OracleVerdict {
    let (e, i) = ring_counts(geometry);
    if (e, i) == (exterior, interior) {
        OracleVerdict::pass("ring_counts", format!("{} exterior, {} interior", e, i))
    } else {
        OracleVerdict::fail(
            "ring_counts",
            format!(
                "expected {} exterior / {} interior rings, got {} / {}",
                exterior, interior, e, i
            ),
        )
    }
}

// ── Set Oracles ─────────────────────────────────────────────────────────────

/// Check that two polygons cover the same point set.
///
/// Samples `samples` points over the combined envelope (deterministic for a
/// given seed) and compares membership, skipping points within `tol` of
/// either boundary.
pub fn check_polygon_set_equal(
    a: &Geometry,
    b: &Geometry,
    samples: usize,
    seed: u64,
    tol: f64,
) -> OracleVerdict {
    let (Geometry::Polygon(pa), Geometry::Polygon(pb)) = (a, b) else {
        return OracleVerdict::fail(
            "polygon_set_equal",
            format!("expected polygons, got {:?} and {:?}", a.geometry_type(), b.geometry_type()),
        );
    };
    if a.is_empty() || b.is_empty() {
        return if a.is_empty() == b.is_empty() {
            OracleVerdict::pass("polygon_set_equal", "both empty".to_string())
        } else {
            OracleVerdict::fail("polygon_set_equal", "only one operand is empty".to_string())
        };
    }
    let env = a.envelope_2d().union(&b.envelope_2d());
    let mut rng = Lcg::new(seed);
    let mut mismatches: Vec<Point2d> = Vec::new();
    let mut tested = 0usize;
    for _ in 0..samples {
        let p = rng.point_in(&env);
        if pa.distance_to_boundary(&p, true) <= tol || pb.distance_to_boundary(&p, true) <= tol {
            continue;
        }
        tested += 1;
        if pa.contains_point(&p) != pb.contains_point(&p) {
            mismatches.push(p);
        }
    }
    if mismatches.is_empty() {
        OracleVerdict::pass_val(
            "polygon_set_equal",
            format!("{} sampled points agree", tested),
            tested as f64,
        )
    } else {
        OracleVerdict::fail_val(
            "polygon_set_equal",
            format!(
                "{} of {} sampled points disagree, first: {:?}",
                mismatches.len(),
                tested,
                &mismatches[..mismatches.len().min(3)]
            ),
            mismatches.len() as f64,
        )
    }
}

/// Check that `op(a, b)` and `op(b, a)` give the same measures.
pub fn check_commutative(
    op: &dyn BinaryOperator,
    a: &Geometry,
    b: &Geometry,
    tol: f64,
) -> OracleVerdict {
    let name = "commutative";
    let (ab, ba) = match (op.execute_pair(a, b, None, None), op.execute_pair(b, a, None, None)) {
        (Ok(ab), Ok(ba)) => (ab, ba),
        (Err(e), _) | (_, Err(e)) => return OracleVerdict::from_error(name, e),
    };
    let area_diff = (ab.area() - ba.area()).abs();
    let length_diff = (ab.length() - ba.length()).abs();
    if area_diff <= tol && length_diff <= tol && ab.geometry_type() == ba.geometry_type() {
        OracleVerdict::pass(name, format!("{:?}: area {:.9}", op.kind(), ab.area()))
    } else {
        OracleVerdict::fail(
            name,
            format!(
                "{:?}: area {:.9} vs {:.9}, length {:.9} vs {:.9}",
                op.kind(),
                ab.area(),
                ba.area(),
                ab.length(),
                ba.length()
            ),
        )
    }
}

/// Check that `A Δ B` has the area of `(A − B) ∪ (B − A)`.
pub fn check_symdiff_matches_differences(
    ctx: &OperatorContext,
    a: &Geometry,
    b: &Geometry,
    tol: f64,
) -> OracleVerdict {
    let name = "symdiff_vs_differences";
    let run = || -> planar_kernel::KernelResult<(f64, f64)> {
        let sym = ctx.symmetric_difference().execute_pair(a, b, None, None)?;
        let ab = ctx.difference().execute_pair(a, b, None, None)?;
        let ba = ctx.difference().execute_pair(b, a, None, None)?;
        let both = ctx.union().execute_pair(&ab, &ba, None, None)?;
        Ok((sym.area(), both.area()))
    };
    match run() {
        Ok((sym, both)) if (sym - both).abs() <= tol => {
            OracleVerdict::pass_val(name, format!("both {:.9}", sym), sym)
        }
        Ok((sym, both)) => OracleVerdict::fail_val(
            name,
            format!("symmetric difference {:.9}, union of differences {:.9}", sym, both),
            sym - both,
        ),
        Err(e) => OracleVerdict::from_error(name, e),
    }
}

/// Check that `A − A` and `A Δ A` are empty.
pub fn check_self_cancellation(ctx: &OperatorContext, a: &Geometry) -> OracleVerdict {
    let name = "self_cancellation";
    let diff = ctx.difference().execute_pair(a, a, None, None);
    let sym = ctx.symmetric_difference().execute_pair(a, a, None, None);
    match (diff, sym) {
        (Ok(d), Ok(s)) if d.is_empty() && s.is_empty() => {
            OracleVerdict::pass(name, "difference and symmetric difference empty".to_string())
        }
        (Ok(d), Ok(s)) => OracleVerdict::fail(
            name,
            format!(
                "difference has {} points, symmetric difference {}",
                d.point_count(),
                s.point_count()
            ),
        ),
        (Err(e), _) | (_, Err(e)) => OracleVerdict::from_error(name, e),
    }
}

// ── Noding Oracles ──────────────────────────────────────────────────────────

/// Check that noding twice with the same tolerance changes nothing the
/// second time, and that the result passes the audit.
pub fn check_noding_idempotent(ctx: &OperatorContext, geometries: &[Geometry]) -> OracleVerdict {
    let name = "noding_idempotent";
    let tol = operation_tolerance(None, geometries.iter());
    let mut shape = EditShape::new();
    for g in geometries {
        shape.add_geometry(g);
    }
    let mode = NodingMode::AllIntersections;
    if let Err(e) = node_edit_shape(&mut shape, tol, mode, ctx.config(), None) {
        return OracleVerdict::from_error(name, e);
    }
    let snapshot: Vec<(u64, u64)> = shape.vertex_ids().map(|v| shape.xy(v).bits()).collect();
    let second = match node_edit_shape(&mut shape, tol, mode, ctx.config(), None) {
        Ok(report) => report,
        Err(e) => return OracleVerdict::from_error(name, e),
    };
    let after: Vec<(u64, u64)> = shape.vertex_ids().map(|v| shape.xy(v).bits()).collect();
    let audit = shape.audit(tol);
    if snapshot == after && audit.is_noded() {
        OracleVerdict::pass_val(
            name,
            format!("{} vertices stable, {} edges", after.len(), audit.edge_count),
            after.len() as f64,
        )
    } else {
        OracleVerdict::fail(
            name,
            format!(
                "second pass ran {} iterations (vertices {} -> {}), audit {:?}",
                second.iterations,
                snapshot.len(),
                after.len(),
                audit
            ),
        )
    }
}

// ── Cursor Oracles ──────────────────────────────────────────────────────────

/// Drain `cursor`, then check that `extra_calls` further calls all report
/// the end of the sequence.
pub fn check_cursor_exhaustion(
    cursor: &mut dyn GeometryCursor,
    extra_calls: usize,
) -> OracleVerdict {
    let name = "cursor_exhaustion";
    let mut produced = 0usize;
    loop {
        match cursor.next() {
            Ok(Some(_)) => produced += 1,
            Ok(None) => break,
            Err(e) => return OracleVerdict::from_error(name, e),
        }
    }
    for call in 0..extra_calls {
        match cursor.next() {
            Ok(None) => {}
            Ok(Some(_)) => {
                return OracleVerdict::fail(
                    name,
                    format!("element produced on call {} after the end", call + 1),
                )
            }
            Err(e) => return OracleVerdict::from_error(name, e),
        }
    }
    OracleVerdict::pass_val(
        name,
        format!("{} elements, then {} empty calls", produced, extra_calls),
        produced as f64,
    )
}

// ── Relate Oracles ──────────────────────────────────────────────────────────

/// Check that relate answers the same with and without cached accelerators.
pub fn check_relate_acceleration(a: &Geometry, b: &Geometry, pattern: &str) -> OracleVerdict {
    let name = "relate_acceleration";
    let plain = OperatorContext::default();
    let fast = OperatorContext::default();
    let accelerated = [a, b]
        .iter()
        .filter(|g| fast.accelerate_geometry(g, None, AccelerationDegree::Medium))
        .count();
    let slow = plain.relate().execute(a, b, None, pattern, None);
    let quick = fast.relate().execute(a, b, None, pattern, None);
    match (slow, quick) {
        (Ok(s), Ok(q)) if s == q => OracleVerdict::pass(
            name,
            format!("{} -> {} ({} operands accelerated)", pattern, s, accelerated),
        ),
        (Ok(s), Ok(q)) => OracleVerdict::fail(
            name,
            format!("{}: plain {} but accelerated {}", pattern, s, q),
        ),
        (Err(e), _) | (_, Err(e)) => OracleVerdict::from_error(name, e),
    }
}

/// Run the algebraic overlay checks on a pair of geometries.
pub fn run_overlay_checks(
    ctx: &OperatorContext,
    a: &Geometry,
    b: &Geometry,
) -> Vec<OracleVerdict> {
    let scale = a.area().abs().max(b.area().abs()).max(1.0);
    let tol = 1e-9 * scale;
    vec![
        check_commutative(&ctx.union(), a, b, tol),
        check_commutative(&ctx.intersection(), a, b, tol),
        check_commutative(&ctx.symmetric_difference(), a, b, tol),
        check_self_cancellation(ctx, a),
        check_symdiff_matches_differences(ctx, a, b, tol),
    ]
}
