//! Shared geometry utilities.
//!
//! Everything here works on plain `kurbo::Point` slices so that the
//! contour arena, the sector charge sets and the cleanup passes can share
//! one set of primitives.

use kurbo::{Point, Vec2};

/// Parameter band around a segment endpoint treated as contact rather
/// than a clean crossing.
const ENDPOINT_BAND: f64 = 1e-9;

/// Relative tolerance for the parallel test.
const PARALLEL_EPS: f64 = 1e-12;

/// Outcome of testing two segments against each other.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentHit {
    /// Strict interior crossing. `t` runs along the first segment, `u`
    /// along the second.
    Hit { point: Point, t: f64, u: f64 },
    None,
    /// Collinear overlap, or contact at a segment endpoint.
    DegenerateParallel,
}

/// Intersect segment `a0→a1` with segment `b0→b1`.
pub fn segment_intersection(a0: Point, a1: Point, b0: Point, b1: Point) -> SegmentHit {
    let r = a1 - a0;
    let s = b1 - b0;
    let (len_r, len_s) = (r.hypot(), s.hypot());
    if len_r == 0.0 || len_s == 0.0 {
        return SegmentHit::None;
    }

    let qp = b0 - a0;
    let denom = r.cross(s);

    if denom.abs() <= PARALLEL_EPS * len_r * len_s {
        // Parallel: only collinear overlap matters.
        if qp.cross(r).abs() > PARALLEL_EPS * len_r * len_r.max(qp.hypot()).max(1.0) {
            return SegmentHit::None;
        }
        let rr = r.hypot2();
        let t0 = qp.dot(r) / rr;
        let t1 = (b1 - a0).dot(r) / rr;
        if t0.max(t1) < 0.0 || t0.min(t1) > 1.0 {
            return SegmentHit::None;
        }
        return SegmentHit::DegenerateParallel;
    }

    let t = qp.cross(s) / denom;
    let u = qp.cross(r) / denom;
    let outside = |x: f64| x < -ENDPOINT_BAND || x > 1.0 + ENDPOINT_BAND;
    if outside(t) || outside(u) {
        return SegmentHit::None;
    }
    let interior = |x: f64| x > ENDPOINT_BAND && x < 1.0 - ENDPOINT_BAND;
    if interior(t) && interior(u) {
        SegmentHit::Hit {
            point: a0 + r * t,
            t,
            u,
        }
    } else {
        SegmentHit::DegenerateParallel
    }
}

/// Orthogonal projection of `p` onto segment `a→b`.
///
/// Returns the projected point and its clamped parameter along the segment.
pub fn project_to_segment(p: Point, a: Point, b: Point) -> (Point, f64) {
    let ab = b - a;
    let len2 = ab.hypot2();
    if len2 == 0.0 {
        return (a, 0.0);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    (a + ab * t, t)
}

/// Euclidean distance from `p` to segment `a→b`.
pub fn point_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let (q, _) = project_to_segment(p, a, b);
    p.distance(q)
}

/// Signed area via the shoelace formula. Positive = CCW, negative = CW.
pub fn signed_area(points: &[Point]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    (0..n)
        .map(|i| {
            let j = (i + 1) % n;
            points[i].x * points[j].y - points[j].x * points[i].y
        })
        .sum::<f64>()
        / 2.0
}

/// Twice the signed area of triangle `abc`.
///
/// Positive when `c` lies left of the directed line `a→b`.
pub fn triangle_sign(a: Point, b: Point, c: Point) -> f64 {
    (b - a).cross(c - a)
}

/// Ray-casting point-in-polygon test.
pub fn point_in_polygon(point: Point, polygon: &[Point]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let pi = polygon[i];
        let pj = polygon[j];
        if ((pi.y > point.y) != (pj.y > point.y))
            && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Total length of a polyline, including the closing edge when `closed`.
pub fn polyline_length(points: &[Point], closed: bool) -> f64 {
    let open: f64 = points.windows(2).map(|w| w[0].distance(w[1])).sum();
    match (closed, points.first(), points.last()) {
        (true, Some(first), Some(last)) if points.len() > 2 => open + last.distance(*first),
        _ => open,
    }
}

/// Unit outward normals of a polyline.
///
/// "Outward" is the right-hand side of the travel direction, which is
/// the exterior for a counter-clockwise ring.
pub fn polyline_normals(points: &[Point], closed: bool) -> Vec<Vec2> {
    let n = points.len();
    (0..n)
        .map(|i| {
            let (prev, next) = if closed {
                (points[(i + n - 1) % n], points[(i + 1) % n])
            } else {
                (points[i.saturating_sub(1)], points[(i + 1).min(n - 1)])
            };
            outward_normal(next - prev)
        })
        .collect()
}

/// Right-hand unit normal of a tangent. Zero for a zero tangent.
pub fn outward_normal(tangent: Vec2) -> Vec2 {
    let len = tangent.hypot();
    if len == 0.0 {
        Vec2::ZERO
    } else {
        Vec2::new(tangent.y / len, -tangent.x / len)
    }
}

/// Resample a polyline at (approximately) uniform `spacing`.
///
/// Open polylines keep both endpoints. Closed rings get at least three
/// points and no duplicated closing point.
pub fn resample_polyline(points: &[Point], closed: bool, spacing: f64) -> Vec<Point> {
    if points.len() < 2 || spacing <= 0.0 {
        return points.to_vec();
    }
    let mut ring = points.to_vec();
    if closed {
        ring.push(points[0]);
    }
    let total = polyline_length(&ring, false);
    if total == 0.0 {
        return points.to_vec();
    }

    let segments = if closed {
        ((total / spacing).round() as usize).max(3)
    } else {
        ((total / spacing).round() as usize).max(1)
    };
    let step = total / segments as f64;
    let count = if closed { segments } else { segments + 1 };

    let mut out = Vec::with_capacity(count);
    let mut edge = 0;
    let mut edge_start = 0.0;
    for k in 0..count {
        let target = (k as f64 * step).min(total);
        while edge + 1 < ring.len() - 1 && edge_start + ring[edge].distance(ring[edge + 1]) < target {
            edge_start += ring[edge].distance(ring[edge + 1]);
            edge += 1;
        }
        let len = ring[edge].distance(ring[edge + 1]);
        let t = if len > 0.0 {
            ((target - edge_start) / len).clamp(0.0, 1.0)
        } else {
            0.0
        };
        out.push(ring[edge].lerp(ring[edge + 1], t));
    }
    out
}

/// Interpolate two normalized arc coordinates in `[0, 1)`, taking the
/// short way around the wrap.
pub fn lerp_coordinate(from: f64, to: f64, t: f64) -> f64 {
    let mut delta = to - from;
    if delta > 0.5 {
        delta -= 1.0;
    } else if delta < -0.5 {
        delta += 1.0;
    }
    (from + delta * t).rem_euclid(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn crossing_segments_hit_in_the_middle() {
        let hit = segment_intersection(
            Point::new(0.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
            Point::new(2.0, 0.0),
        );
        match hit {
            SegmentHit::Hit { point, t, u } => {
                assert_abs_diff_eq!(point.x, 1.0, epsilon = 1e-12);
                assert_abs_diff_eq!(point.y, 1.0, epsilon = 1e-12);
                assert_abs_diff_eq!(t, 0.5, epsilon = 1e-12);
                assert_abs_diff_eq!(u, 0.5, epsilon = 1e-12);
            }
            other => panic!("expected a hit, got {:?}", other),
        }
    }

    #[test]
    fn disjoint_and_degenerate_segments() {
        let a0 = Point::new(0.0, 0.0);
        let a1 = Point::new(1.0, 0.0);
        assert_eq!(
            segment_intersection(a0, a1, Point::new(0.0, 1.0), Point::new(1.0, 1.0)),
            SegmentHit::None
        );
        assert_eq!(
            segment_intersection(a0, a1, Point::new(0.5, 0.0), Point::new(2.0, 0.0)),
            SegmentHit::DegenerateParallel
        );
        // T-junction: endpoint of the second segment on the first.
        assert_eq!(
            segment_intersection(a0, a1, Point::new(0.5, 0.0), Point::new(0.5, 1.0)),
            SegmentHit::DegenerateParallel
        );
    }

    #[test]
    fn projection_clamps_to_segment() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(4.0, 0.0);
        let (q, t) = project_to_segment(Point::new(1.0, 3.0), a, b);
        assert_eq!(q, Point::new(1.0, 0.0));
        assert_abs_diff_eq!(t, 0.25);
        assert_abs_diff_eq!(point_segment_distance(Point::new(-3.0, 4.0), a, b), 5.0);
    }

    #[test]
    fn orientation_helpers_agree() {
        let square = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ];
        assert_abs_diff_eq!(signed_area(&square), 1.0);
        assert!(triangle_sign(square[0], square[1], square[2]) > 0.0);
        assert!(point_in_polygon(Point::new(0.5, 0.5), &square));
        assert!(!point_in_polygon(Point::new(1.5, 0.5), &square));

        // Corner normals bisect the neighbouring edges and point outwards.
        let normals = polyline_normals(&square, true);
        let d = std::f64::consts::FRAC_1_SQRT_2;
        assert_abs_diff_eq!(normals[0].x, -d, epsilon = 1e-12);
        assert_abs_diff_eq!(normals[0].y, -d, epsilon = 1e-12);
        assert_abs_diff_eq!(normals[1].x, d, epsilon = 1e-12);
        assert_abs_diff_eq!(normals[1].y, -d, epsilon = 1e-12);
    }

    #[test]
    fn straight_edge_normal_points_out_of_ccw_ring() {
        let ring = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
        ];
        let normals = polyline_normals(&ring, true);
        assert_abs_diff_eq!(normals[1].x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(normals[1].y, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn resampling_keeps_ends_of_open_polyline() {
        let line = [Point::new(0.0, 0.0), Point::new(10.0, 0.0)];
        let out = resample_polyline(&line, false, 2.5);
        assert_eq!(out.len(), 5);
        assert_eq!(out[0], line[0]);
        assert_abs_diff_eq!(out[4].x, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn coordinate_lerp_wraps() {
        assert_abs_diff_eq!(lerp_coordinate(0.9, 0.3, 0.5), 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(lerp_coordinate(0.2, 0.4, 0.5), 0.3, epsilon = 1e-12);
    }
}
