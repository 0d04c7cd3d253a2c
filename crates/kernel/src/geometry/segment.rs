use super::envelope::Envelope2D;
use super::point::Point2d;

/// A location strictly inside a segment where it must be split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitPoint {
    /// Parameter along the segment, in (0, 1).
    pub t: f64,
    pub point: Point2d,
}

/// Tolerance-aware outcome of intersecting two segments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentIntersection {
    /// The segments come within tolerance of each other.
    pub touches: bool,
    /// Interior split points of the first segment.
    pub on_a: Vec<SplitPoint>,
    /// Interior split points of the second segment.
    pub on_b: Vec<SplitPoint>,
}

impl SegmentIntersection {
    pub fn has_splits(&self) -> bool {
        !self.on_a.is_empty() || !self.on_b.is_empty()
    }
}

/// Parameter of the projection of `p` onto `a -> b`, clamped to [0, 1].
pub fn closest_param(a: &Point2d, b: &Point2d, p: &Point2d) -> f64 {
    let d = *b - *a;
    let len2 = d.dot(&d);
    if len2 <= 0.0 {
        return 0.0;
    }
    ((*p - *a).dot(&d) / len2).clamp(0.0, 1.0)
}

pub fn distance_to_segment(p: &Point2d, a: &Point2d, b: &Point2d) -> f64 {
    let t = closest_param(a, b, p);
    p.distance_to(&a.lerp(b, t))
}

/// Orientation of `c` relative to the directed line `a -> b`:
/// positive on the left, negative on the right.
pub fn orientation(a: &Point2d, b: &Point2d, c: &Point2d) -> f64 {
    (*b - *a).cross(&(*c - *a))
}

/// Proper crossing of two segments (interiors cross at a single point).
pub fn proper_crossing(
    a0: &Point2d,
    a1: &Point2d,
    b0: &Point2d,
    b1: &Point2d,
) -> Option<(f64, f64, Point2d)> {
    let o1 = orientation(a0, a1, b0);
    let o2 = orientation(a0, a1, b1);
    let o3 = orientation(b0, b1, a0);
    let o4 = orientation(b0, b1, a1);
    let straddles_a = (o1 > 0.0 && o2 < 0.0) || (o1 < 0.0 && o2 > 0.0);
    let straddles_b = (o3 > 0.0 && o4 < 0.0) || (o3 < 0.0 && o4 > 0.0);
    if !(straddles_a && straddles_b) {
        return None;
    }
    let da = *a1 - *a0;
    let db = *b1 - *b0;
    let denom = da.cross(&db);
    if denom == 0.0 {
        return None;
    }
    let w = *b0 - *a0;
    let ta = (w.cross(&db) / denom).clamp(0.0, 1.0);
    let tb = (w.cross(&da) / denom).clamp(0.0, 1.0);
    Some((ta, tb, a0.lerp(a1, ta)))
}

/// Intersect `a0 -> a1` with `b0 -> b1` under tolerance `tol`.
///
/// Endpoints within `tol` of the other segment split it at the endpoint's
/// exact coordinate, so both sides end up sharing the coordinate bit for bit.
/// Endpoint-to-endpoint proximity produces no split; that case is left to
/// vertex clustering. A proper crossing produces one shared point on both.
pub fn intersect_segments(
    a0: &Point2d,
    a1: &Point2d,
    b0: &Point2d,
    b1: &Point2d,
    tol: f64,
) -> SegmentIntersection {
    let mut result = SegmentIntersection::default();
    let env_a = Envelope2D::from_segment(a0, a1).inflated(tol, tol);
    let env_b = Envelope2D::from_segment(b0, b1);
    if !env_a.intersects(&env_b) {
        return result;
    }

    for p in [b0, b1] {
        if let Some(split) = endpoint_split(a0, a1, p, tol, &mut result.touches) {
            result.on_a.push(split);
        }
    }
    for p in [a0, a1] {
        if let Some(split) = endpoint_split(b0, b1, p, tol, &mut result.touches) {
            result.on_b.push(split);
        }
    }

    if !result.touches {
        if let Some((ta, tb, point)) = proper_crossing(a0, a1, b0, b1) {
            result.touches = true;
            result.on_a.push(SplitPoint { t: ta, point });
            result.on_b.push(SplitPoint { t: tb, point });
        }
    }
    result
}

fn endpoint_split(
    s0: &Point2d,
    s1: &Point2d,
    p: &Point2d,
    tol: f64,
    touches: &mut bool,
) -> Option<SplitPoint> {
    let t = closest_param(s0, s1, p);
    let on_segment = s0.lerp(s1, t);
    if p.distance_to(&on_segment) > tol {
        return None;
    }
    *touches = true;
    if p.distance_to(s0) <= tol || p.distance_to(s1) <= tol {
        return None;
    }
    Some(SplitPoint { t, point: *p })
}

/// Minimum distance between two segments (0 when they cross).
pub fn segment_distance(a0: &Point2d, a1: &Point2d, b0: &Point2d, b1: &Point2d) -> f64 {
    if proper_crossing(a0, a1, b0, b1).is_some() {
        return 0.0;
    }
    distance_to_segment(a0, b0, b1)
        .min(distance_to_segment(a1, b0, b1))
        .min(distance_to_segment(b0, a0, a1))
        .min(distance_to_segment(b1, a0, a1))
}

/// Liang-Barsky clip of `a -> b` against `env`; returns the kept parameter range.
pub fn clip_to_envelope(a: &Point2d, b: &Point2d, env: &Envelope2D) -> Option<(f64, f64)> {
    if env.is_empty() {
        return None;
    }
    let d = *b - *a;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;
    let checks = [
        (-d.x, a.x - env.xmin),
        (d.x, env.xmax - a.x),
        (-d.y, a.y - env.ymin),
        (d.y, env.ymax - a.y),
    ];
    for (p, q) in checks {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }
    Some((t0, t1))
}

/// Distance from a segment to a rectangle (0 when they overlap).
pub fn segment_envelope_distance(a: &Point2d, b: &Point2d, env: &Envelope2D) -> f64 {
    if clip_to_envelope(a, b, env).is_some() {
        return 0.0;
    }
    let corners = env.corners();
    let mut best = env.distance_to_point(a).min(env.distance_to_point(b));
    for c in &corners {
        best = best.min(distance_to_segment(c, a, b));
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn p(x: f64, y: f64) -> Point2d {
        Point2d::new(x, y)
    }

    #[test]
    fn test_proper_crossing() {
        let hit = intersect_segments(&p(0.0, 0.0), &p(2.0, 2.0), &p(0.0, 2.0), &p(2.0, 0.0), 1e-9);
        assert!(hit.touches);
        assert_eq!(hit.on_a.len(), 1);
        assert_eq!(hit.on_b.len(), 1);
        assert_eq!(hit.on_a[0].point, hit.on_b[0].point);
        assert_abs_diff_eq!(hit.on_a[0].point, p(1.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_t_junction_splits_at_exact_endpoint() {
        let hit = intersect_segments(&p(0.0, 0.0), &p(2.0, 0.0), &p(1.0, 1e-12), &p(1.0, 1.0), 1e-9);
        assert!(hit.touches);
        assert_eq!(hit.on_a.len(), 1);
        assert_eq!(hit.on_a[0].point, p(1.0, 1e-12));
        assert!(hit.on_b.is_empty());
    }

    #[test]
    fn test_endpoint_touch_no_split() {
        let hit = intersect_segments(&p(0.0, 0.0), &p(1.0, 0.0), &p(1.0, 0.0), &p(1.0, 1.0), 1e-9);
        assert!(hit.touches);
        assert!(!hit.has_splits());
    }

    #[test]
    fn test_collinear_overlap_splits_both() {
        let hit = intersect_segments(&p(0.0, 0.0), &p(2.0, 0.0), &p(1.0, 0.0), &p(3.0, 0.0), 1e-9);
        assert!(hit.touches);
        assert_eq!(hit.on_a.len(), 1);
        assert_eq!(hit.on_b.len(), 1);
        assert_eq!(hit.on_a[0].point, p(1.0, 0.0));
        assert_eq!(hit.on_b[0].point, p(2.0, 0.0));
    }

    #[test]
    fn test_disjoint_segments() {
        let hit = intersect_segments(&p(0.0, 0.0), &p(1.0, 0.0), &p(0.0, 1.0), &p(1.0, 1.0), 1e-9);
        assert!(!hit.touches);
        assert_abs_diff_eq!(
            segment_distance(&p(0.0, 0.0), &p(1.0, 0.0), &p(0.0, 1.0), &p(1.0, 1.0)),
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_clip_to_envelope() {
        let env = Envelope2D::new(0.0, 0.0, 1.0, 1.0);
        let (t0, t1) = clip_to_envelope(&p(-1.0, 0.5), &p(2.0, 0.5), &env).unwrap();
        assert_abs_diff_eq!(t0, 1.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(t1, 2.0 / 3.0, epsilon = 1e-12);
        assert!(clip_to_envelope(&p(-1.0, 2.0), &p(2.0, 2.0), &env).is_none());
    }
}
