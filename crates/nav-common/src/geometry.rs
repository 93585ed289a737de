//! 2D geometry operations on the XZ plane
//!
//! Navigation polygons are treated as planar shapes projected onto the XZ
//! plane (Y-up coordinate system). The Y component is carried along by
//! interpolation wherever a new point is created on an existing edge.
//!
//! Winding convention: polygons are counter-clockwise, meaning a positive
//! [`polygon_area_2d`]. For a counter-clockwise polygon the interior lies on
//! the positive side of every edge (see [`side_2d`]) and [`edge_normal_2d`]
//! points outwards.

use glam::Vec3;

/// 2D perpendicular product of two vectors on the XZ plane.
#[inline]
pub fn cross_2d(u: Vec3, v: Vec3) -> f32 {
    u.x * v.z - u.z * v.x
}

/// Dot product of two vectors on the XZ plane.
#[inline]
pub fn dot_2d(u: Vec3, v: Vec3) -> f32 {
    u.x * v.x + u.z * v.z
}

/// Calculate twice the signed area of a triangle on the XZ plane.
///
/// The sign indicates the winding order:
/// - Positive: clockwise
/// - Negative: counter-clockwise
/// - Zero: degenerate (collinear points)
#[inline]
pub fn tri_area_2d(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    let abx = b.x - a.x;
    let abz = b.z - a.z;
    let acx = c.x - a.x;
    let acz = c.z - a.z;
    acx * abz - abx * acz
}

/// Which side of the directed line `a -> b` the point `p` lies on.
///
/// Positive values are on the interior side of a counter-clockwise polygon
/// edge, negative values on the exterior. The magnitude is twice the area of
/// the triangle `a, b, p`.
#[inline]
pub fn side_2d(a: Vec3, b: Vec3, p: Vec3) -> f32 {
    cross_2d(b - a, p - a)
}

/// Outward normal of the counter-clockwise edge `a -> b`, not normalized.
#[inline]
pub fn edge_normal_2d(a: Vec3, b: Vec3) -> Vec3 {
    Vec3::new(b.z - a.z, 0.0, a.x - b.x)
}

/// Squared distance between two points on the XZ plane.
#[inline]
pub fn dist_sqr_2d(a: Vec3, b: Vec3) -> f32 {
    let dx = b.x - a.x;
    let dz = b.z - a.z;
    dx * dx + dz * dz
}

/// Distance between two points on the XZ plane.
#[inline]
pub fn dist_2d(a: Vec3, b: Vec3) -> f32 {
    dist_sqr_2d(a, b).sqrt()
}

/// Drops the Y component.
#[inline]
pub fn flatten(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Checks if two points coincide on the XZ plane within `eps`.
#[inline]
pub fn equal_2d(a: Vec3, b: Vec3, eps: f32) -> bool {
    dist_sqr_2d(a, b) <= eps * eps
}

/// Find the closest point on segment `a -> b` to `p` on the XZ plane.
///
/// Returns the point (with Y interpolated along the segment) and the clamped
/// segment parameter.
pub fn closest_point_on_segment_2d(p: Vec3, a: Vec3, b: Vec3) -> (Vec3, f32) {
    let dx = b.x - a.x;
    let dz = b.z - a.z;
    let d = dx * dx + dz * dz;
    if d < f32::EPSILON {
        // Segment is a point
        return (a, 0.0);
    }
    let t = (((p.x - a.x) * dx + (p.z - a.z) * dz) / d).clamp(0.0, 1.0);
    (a.lerp(b, t), t)
}

/// Squared distance from a point to a segment on the XZ plane, with the
/// clamped segment parameter of the closest point.
pub fn dist_point_segment_sqr_2d(p: Vec3, a: Vec3, b: Vec3) -> (f32, f32) {
    let (q, t) = closest_point_on_segment_2d(p, a, b);
    (dist_sqr_2d(p, q), t)
}

/// Intersect the lines through `a0 -> a1` and `b0 -> b1` on the XZ plane.
///
/// Returns the parameters `(s, t)` of the intersection along each line, or
/// `None` when the lines are parallel.
pub fn intersect_lines_2d(a0: Vec3, a1: Vec3, b0: Vec3, b1: Vec3) -> Option<(f32, f32)> {
    let ad = a1 - a0;
    let bd = b1 - b0;
    let d = cross_2d(ad, bd);
    if d.abs() < 1e-8 {
        return None;
    }
    let w = b0 - a0;
    let s = cross_2d(w, bd) / d;
    let t = cross_2d(w, ad) / d;
    Some((s, t))
}

/// Check if two segments cross on the XZ plane, excluding their endpoints.
pub fn segments_cross_2d(a0: Vec3, a1: Vec3, b0: Vec3, b1: Vec3) -> bool {
    match intersect_lines_2d(a0, a1, b0, b1) {
        Some((s, t)) => s > 0.0 && s < 1.0 && t > 0.0 && t < 1.0,
        None => false,
    }
}

/// Squared distance between two segments on the XZ plane.
pub fn dist_segment_segment_sqr_2d(a0: Vec3, a1: Vec3, b0: Vec3, b1: Vec3) -> f32 {
    if segments_cross_2d(a0, a1, b0, b1) {
        return 0.0;
    }
    dist_point_segment_sqr_2d(a0, b0, b1)
        .0
        .min(dist_point_segment_sqr_2d(a1, b0, b1).0)
        .min(dist_point_segment_sqr_2d(b0, a0, a1).0)
        .min(dist_point_segment_sqr_2d(b1, a0, a1).0)
}

/// Signed area of a polygon on the XZ plane. Positive for counter-clockwise.
pub fn polygon_area_2d(points: &[Vec3]) -> f32 {
    let n = points.len();
    let mut area = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        area += a.x * b.z - b.x * a.z;
    }
    area * 0.5
}

/// Check if a point is inside a polygon on the XZ plane.
///
/// Uses the crossing number test so concave polygons are handled. Points
/// exactly on an edge may go either way; see [`point_in_polygon_2d_eps`].
pub fn point_in_polygon_2d(p: Vec3, points: &[Vec3]) -> bool {
    let n = points.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let vi = points[i];
        let vj = points[j];
        if ((vi.z > p.z) != (vj.z > p.z))
            && (p.x < (vj.x - vi.x) * (p.z - vi.z) / (vj.z - vi.z) + vi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Point in polygon test that also accepts points within `eps` of an edge.
pub fn point_in_polygon_2d_eps(p: Vec3, points: &[Vec3], eps: f32) -> bool {
    if point_in_polygon_2d(p, points) {
        return true;
    }
    let eps2 = eps * eps;
    let n = points.len();
    (0..n).any(|i| dist_point_segment_sqr_2d(p, points[i], points[(i + 1) % n]).0 <= eps2)
}

/// Check whether a counter-clockwise polygon is convex.
///
/// Collinear vertices are allowed: a vertex only breaks convexity when it
/// turns clockwise by more than `eps` (measured as a distance).
pub fn is_convex_2d(points: &[Vec3], eps: f32) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    for i in 0..n {
        let a = points[(i + n - 1) % n];
        let b = points[i];
        let c = points[(i + 1) % n];
        let len = dist_2d(a, c);
        if len < f32::EPSILON {
            continue;
        }
        if side_2d(a, c, b) > eps * len {
            return false;
        }
    }
    true
}

/// Area weighted centroid of a polygon.
///
/// Falls back to the vertex mean for degenerate polygons.
pub fn polygon_centroid(points: &[Vec3]) -> Vec3 {
    if points.is_empty() {
        return Vec3::ZERO;
    }
    let origin = points[0];
    let mut centre = Vec3::ZERO;
    let mut total = 0.0;
    for i in 1..points.len().saturating_sub(1) {
        let b = points[i];
        let c = points[i + 1];
        let area = side_2d(origin, b, c).abs() * 0.5;
        centre += (origin + b + c) * (area / 3.0);
        total += area;
    }
    if total > f32::EPSILON {
        centre / total
    } else {
        points.iter().copied().sum::<Vec3>() / points.len() as f32
    }
}

/// Result of clipping a segment against a convex polygon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentPolyHit {
    /// Normalized distance along the segment where it enters the polygon
    pub tmin: f32,
    /// Normalized distance along the segment where it leaves the polygon
    pub tmax: f32,
    /// Edge the segment enters through, `None` if it starts inside
    pub seg_min: Option<usize>,
    /// Edge the segment leaves through, `None` if it ends inside
    pub seg_max: Option<usize>,
}

/// Finds the intersection of a segment with a convex counter-clockwise
/// polygon on the XZ plane.
pub fn intersect_segment_poly_2d(p0: Vec3, p1: Vec3, points: &[Vec3]) -> Option<SegmentPolyHit> {
    const EPS: f32 = 0.000001;

    let mut hit = SegmentPolyHit {
        tmin: 0.0,
        tmax: 1.0,
        seg_min: None,
        seg_max: None,
    };
    let dir = p1 - p0;
    let n = points.len();

    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let normal = edge_normal_2d(a, b);
        let num = -dot_2d(normal, p0 - a);
        let den = dot_2d(normal, dir);

        if den.abs() < EPS {
            // Segment is nearly parallel to this edge
            if num < 0.0 {
                return None;
            }
            continue;
        }

        let t = num / den;
        if den < 0.0 {
            // Segment is entering across this edge
            if t > hit.tmin {
                hit.tmin = t;
                hit.seg_min = Some(i);
                if hit.tmin > hit.tmax {
                    return None;
                }
            }
        } else if t < hit.tmax {
            // Segment is leaving across this edge
            hit.tmax = t;
            hit.seg_max = Some(i);
            if hit.tmax < hit.tmin {
                return None;
            }
        }
    }

    Some(hit)
}

/// Generates a random point inside a convex polygon from two uniform samples
/// in `[0, 1)`.
pub fn random_point_in_convex_poly(points: &[Vec3], s: f32, t: f32) -> Vec3 {
    let n = points.len();
    if n < 3 {
        return points.first().copied().unwrap_or(Vec3::ZERO);
    }

    // Calculate triangle areas of the fan around the first vertex
    let areas: Vec<f32> = (0..n - 2)
        .map(|i| tri_area_2d(points[0], points[i + 1], points[i + 2]).abs() * 0.5)
        .collect();
    let acc: f32 = areas.iter().sum();

    // Find triangle
    let mut tri = 0;
    let mut u = s * acc;
    let mut sum = 0.0;
    for (i, &area) in areas.iter().enumerate() {
        sum += area;
        if u <= sum && area > 0.0 {
            tri = i;
            u = (u - (sum - area)) / area;
            break;
        }
    }
    let u = u.clamp(0.0, 1.0);

    let a = points[0];
    let b = points[tri + 1];
    let c = points[tri + 2];

    let v = t.sqrt();
    a * (1.0 - v) + b * (v * (1.0 - u)) + c * (v * u)
}
