//! Rich assertion helpers with diagnostic output.
//!
//! Every failure names the scenario context, the expected value and the
//! actual value.

use planar_kernel::geometry::{Envelope2D, Geometry, GeometryType};
use planar_kernel::{KernelError, KernelResult};

use crate::helpers::{ring_counts, HarnessError};
use crate::oracle::OracleVerdict;

/// Assert a geometry's area within an absolute tolerance.
pub fn assert_area(
    geometry: &Geometry,
    expected: f64,
    tol: f64,
    ctx: &str,
) -> Result<(), HarnessError> {
    let area = geometry.area();
    if (area - expected).abs() <= tol {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed {
            detail: format!(
                "[{}] expected area {:.9}, got {:.9} (tol={})",
                ctx, expected, area, tol,
            ),
        })
    }
}

/// Assert a geometry's length within an absolute tolerance.
pub fn assert_length(
    geometry: &Geometry,
    expected: f64,
    tol: f64,
    ctx: &str,
) -> Result<(), HarnessError> {
    let length = geometry.length();
    if (length - expected).abs() <= tol {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed {
            detail: format!(
                "[{}] expected length {:.9}, got {:.9} (tol={})",
                ctx, expected, length, tol,
            ),
        })
    }
}

/// Assert the geometry type.
pub fn assert_type(
    geometry: &Geometry,
    expected: GeometryType,
    ctx: &str,
) -> Result<(), HarnessError> {
    if geometry.geometry_type() == expected {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed {
            detail: format!(
                "[{}] expected {:?}, got {:?}",
                ctx,
                expected,
                geometry.geometry_type(),
            ),
        })
    }
}

/// Assert that a geometry is empty.
pub fn assert_empty(geometry: &Geometry, ctx: &str) -> Result<(), HarnessError> {
    if geometry.is_empty() {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed {
            detail: format!(
                "[{}] expected an empty {:?}, got {} points (area {:.9})",
                ctx,
                geometry.geometry_type(),
                geometry.point_count(),
                geometry.area(),
            ),
        })
    }
}

/// Assert exterior and interior ring counts of a polygon.
pub fn assert_ring_counts(
    geometry: &Geometry,
    exterior: usize,
    interior: usize,
    ctx: &str,
) -> Result<(), HarnessError> {
    let (e, i) = ring_counts(geometry);
    if (e, i) == (exterior, interior) {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed {
            detail: format!(
                "[{}] expected {} exterior / {} interior rings, got {} / {}",
                ctx, exterior, interior, e, i,
            ),
        })
    }
}

/// Assert the 2D envelope matches within tolerance.
pub fn assert_envelope(
    geometry: &Geometry,
    expected: &Envelope2D,
    tol: f64,
    ctx: &str,
) -> Result<(), HarnessError> {
    let actual = geometry.envelope_2d();
    let pairs = [
        ("xmin", actual.xmin, expected.xmin),
        ("ymin", actual.ymin, expected.ymin),
        ("xmax", actual.xmax, expected.xmax),
        ("ymax", actual.ymax, expected.ymax),
    ];
    for (name, got, want) in pairs {
        if (got - want).abs() > tol {
            return Err(HarnessError::AssertionFailed {
                detail: format!(
                    "[{}] envelope {}: expected {:.6}, got {:.6} (tol={})",
                    ctx, name, want, got, tol,
                ),
            });
        }
    }
    Ok(())
}

/// Assert that an operation was cancelled by its progress tracker.
pub fn assert_cancelled<T: std::fmt::Debug>(
    result: KernelResult<T>,
    ctx: &str,
) -> Result<(), HarnessError> {
    match result {
        Err(KernelError::UserCancelled) => Ok(()),
        other => Err(HarnessError::AssertionFailed {
            detail: format!("[{}] expected UserCancelled, got {:?}", ctx, other),
        }),
    }
}

/// Turn failing verdicts into one error listing all of them.
pub fn assert_verdicts(verdicts: &[OracleVerdict], ctx: &str) -> Result<(), HarnessError> {
    let failed: Vec<&OracleVerdict> = verdicts.iter().filter(|v| !v.passed).collect();
    match failed.first() {
        None => Ok(()),
        Some(first) => Err(HarnessError::OracleFailure {
            oracle: first.oracle_name.clone(),
            detail: format!(
                "[{}] {} of {} checks failed: {}",
                ctx,
                failed.len(),
                verdicts.len(),
                failed
                    .iter()
                    .map(|v| format!("{} ({})", v.oracle_name, v.detail))
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
        }),
    }
}
