//! Snapping tolerance derived from operand extent.

use crate::geometry::{Envelope2D, Geometry, SpatialReference};

const ENVELOPE_SCALE: f64 = 100.0 * f64::EPSILON;

/// Tolerance implied by the coordinate magnitudes of `env`.
pub fn tolerance_from_envelope(env: &Envelope2D) -> f64 {
    if env.is_empty() {
        return ENVELOPE_SCALE;
    }
    (env.xmin.abs() + env.xmax.abs() + env.ymin.abs() + env.ymax.abs() + 1.0) * ENVELOPE_SCALE
}

/// Tolerance for one operation: the larger of the envelope-derived value and
/// the spatial reference's xy tolerance.
pub fn tolerance_from_geometry(
    sr: Option<&SpatialReference>,
    env: &Envelope2D,
    conservative: bool,
) -> f64 {
    let (env_factor, sr_factor) = if conservative { (4.0, 1.1) } else { (1.0, 1.0) };
    let from_env = tolerance_from_envelope(env) * env_factor;
    let from_sr = sr
        .map(|s| s.xy_tolerance * sr_factor)
        .filter(|t| t.is_finite() && *t > 0.0)
        .unwrap_or(0.0);
    from_env.max(from_sr)
}

/// Union envelope of every operand of one call.
pub fn combined_envelope<'a>(geometries: impl IntoIterator<Item = &'a Geometry>) -> Envelope2D {
    let mut env = Envelope2D::empty();
    for g in geometries {
        env.merge(&g.envelope_2d());
    }
    env
}

/// Tolerance shared by every phase of an operation over `geometries`.
pub fn operation_tolerance<'a>(
    sr: Option<&SpatialReference>,
    geometries: impl IntoIterator<Item = &'a Geometry>,
) -> f64 {
    tolerance_from_geometry(sr, &combined_envelope(geometries), true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_envelope_tolerance() {
        assert_eq!(tolerance_from_envelope(&Envelope2D::empty()), 100.0 * f64::EPSILON);
    }

    #[test]
    fn test_envelope_tolerance_scales_with_extent() {
        let small = tolerance_from_envelope(&Envelope2D::new(0.0, 0.0, 2.0, 1.0));
        let large = tolerance_from_envelope(&Envelope2D::new(0.0, 0.0, 2e6, 1e6));
        assert!((small - 4.0 * 100.0 * f64::EPSILON).abs() < 1e-25);
        assert!(large > small * 1e5);
    }

    #[test]
    fn test_spatial_reference_dominates() {
        let env = Envelope2D::new(0.0, 0.0, 1.0, 1.0);
        let sr = SpatialReference::with_tolerance(0.001);
        assert_eq!(tolerance_from_geometry(Some(&sr), &env, false), 0.001);
        assert!((tolerance_from_geometry(Some(&sr), &env, true) - 0.0011).abs() < 1e-15);
    }

    #[test]
    fn test_conservative_envelope_factor() {
        let env = Envelope2D::new(-1.0, -1.0, 1.0, 1.0);
        let plain = tolerance_from_geometry(None, &env, false);
        let conservative = tolerance_from_geometry(None, &env, true);
        assert!((conservative - 4.0 * plain).abs() < 1e-25);
    }
}
