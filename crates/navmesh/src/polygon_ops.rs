//! Planar polygon operations used when editing the mesh
//!
//! All functions work on the XZ plane and interpolate Y for any point they
//! create on an existing edge. Input polygons are counter-clockwise.

use nav_common::{
    closest_point_on_segment_2d, dist_2d, dist_sqr_2d, edge_normal_2d, equal_2d, is_convex_2d,
    polygon_area_2d, segments_cross_2d, side_2d, Vec3,
};

/// Removes consecutive points closer than `eps`, including the wrap-around
pub fn remove_duplicate_points(points: &[Vec3], eps: f32) -> Vec<Vec3> {
    let mut out: Vec<Vec3> = Vec::with_capacity(points.len());
    for &p in points {
        if out.last().map_or(true, |&q| !equal_2d(p, q, eps)) {
            out.push(p);
        }
    }
    while out.len() > 1 && equal_2d(out[0], out[out.len() - 1], eps) {
        out.pop();
    }
    out
}

/// Removes vertices lying within `eps` of the line through their neighbours
pub fn remove_collinear_points(points: &[Vec3], eps: f32) -> Vec<Vec3> {
    let mut out = points.to_vec();
    let mut i = 0;
    while out.len() > 3 && i < out.len() {
        let n = out.len();
        let prev = out[(i + n - 1) % n];
        let next = out[(i + 1) % n];
        let len = dist_2d(prev, next);
        if side_2d(prev, next, out[i]).abs() <= eps * len.max(f32::EPSILON) {
            out.remove(i);
            i = i.saturating_sub(1);
        } else {
            i += 1;
        }
    }
    out
}

/// Removes duplicate and collinear points
pub fn tidy_polygon(points: &[Vec3], eps: f32) -> Vec<Vec3> {
    remove_collinear_points(&remove_duplicate_points(points, eps), eps)
}

/// Checks that no two non-adjacent edges cross
pub fn is_simple_2d(points: &[Vec3]) -> bool {
    let n = points.len();
    for i in 0..n {
        let a0 = points[i];
        let a1 = points[(i + 1) % n];
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            if segments_cross_2d(a0, a1, points[j], points[(j + 1) % n]) {
                return false;
            }
        }
    }
    true
}

/// Clips a polygon against the line through `a -> b`.
///
/// Keeps the left (interior) side when `keep_left` is set, the right side
/// otherwise. Points on the line are kept on both sides.
pub fn clip_half_plane(points: &[Vec3], a: Vec3, b: Vec3, keep_left: bool) -> Vec<Vec3> {
    let sign = if keep_left { 1.0 } else { -1.0 };
    let n = points.len();
    let mut out = Vec::with_capacity(n + 2);
    for i in 0..n {
        let cur = points[i];
        let next = points[(i + 1) % n];
        let dc = sign * side_2d(a, b, cur);
        let dn = sign * side_2d(a, b, next);
        if dc >= 0.0 {
            out.push(cur);
        }
        if (dc > 0.0 && dn < 0.0) || (dc < 0.0 && dn > 0.0) {
            let t = dc / (dc - dn);
            out.push(cur.lerp(next, t));
        }
    }
    out
}

/// Checks whether two convex polygons overlap by more than `eps`.
///
/// Polygons that only touch along an edge or at a vertex do not overlap.
pub fn convex_overlap_2d(a: &[Vec3], b: &[Vec3], eps: f32) -> bool {
    for (poly, other) in [(a, b), (b, a)] {
        let n = poly.len();
        for i in 0..n {
            let normal = edge_normal_2d(poly[i], poly[(i + 1) % n]);
            let len = (normal.x * normal.x + normal.z * normal.z).sqrt();
            if len <= f32::EPSILON {
                continue;
            }
            let project = |p: &Vec3| (normal.x * p.x + normal.z * p.z) / len;
            let (min_a, max_a) = projection_range(poly, project);
            let (min_b, max_b) = projection_range(other, project);
            if max_a <= min_b + eps || max_b <= min_a + eps {
                return false;
            }
        }
    }
    true
}

fn projection_range(points: &[Vec3], project: impl Fn(&Vec3) -> f32) -> (f32, f32) {
    points.iter().fold((f32::MAX, f32::MIN), |(lo, hi), p| {
        let d = project(p);
        (lo.min(d), hi.max(d))
    })
}

fn valid_piece(points: Vec<Vec3>, eps: f32, min_area: f32) -> Option<Vec<Vec3>> {
    let points = tidy_polygon(&points, eps);
    (points.len() >= 3 && polygon_area_2d(&points) > min_area).then_some(points)
}

/// Subtracts convex `clip` from convex `subject`.
///
/// Returns disjoint convex pieces covering `subject` outside `clip`. A subject
/// that does not overlap the clip polygon is returned unchanged.
pub fn subtract_convex(subject: &[Vec3], clip: &[Vec3], eps: f32, min_area: f32) -> Vec<Vec<Vec3>> {
    if !convex_overlap_2d(subject, clip, eps) {
        return vec![subject.to_vec()];
    }

    let mut pieces = Vec::new();
    let mut remaining = subject.to_vec();
    let n = clip.len();
    for k in 0..n {
        let a = clip[k];
        let b = clip[(k + 1) % n];
        if let Some(piece) = valid_piece(clip_half_plane(&remaining, a, b, false), eps, min_area) {
            pieces.push(piece);
        }
        match valid_piece(clip_half_plane(&remaining, a, b, true), eps, min_area) {
            Some(inside) => remaining = inside,
            None => break,
        }
    }
    pieces
}

fn point_in_triangle_2d(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> bool {
    side_2d(a, b, p) >= 0.0 && side_2d(b, c, p) >= 0.0 && side_2d(c, a, p) >= 0.0
}

/// Ear clipping triangulation of a simple counter-clockwise polygon.
///
/// Returns `None` if no ear can be found, which only happens for
/// self-intersecting or degenerate input.
pub fn triangulate(points: &[Vec3]) -> Option<Vec<[usize; 3]>> {
    let n = points.len();
    if n < 3 {
        return None;
    }
    let mut remaining: Vec<usize> = (0..n).collect();
    let mut triangles = Vec::with_capacity(n - 2);

    while remaining.len() > 3 {
        let m = remaining.len();
        let ear = (0..m).find(|&i| {
            let prev = remaining[(i + m - 1) % m];
            let cur = remaining[i];
            let next = remaining[(i + 1) % m];
            let (a, b, c) = (points[prev], points[cur], points[next]);
            if side_2d(a, b, c) <= 0.0 {
                return false;
            }
            !remaining.iter().any(|&j| {
                j != prev
                    && j != cur
                    && j != next
                    && point_in_triangle_2d(points[j], a, b, c)
                    && !equal_2d(points[j], a, 1e-6)
                    && !equal_2d(points[j], b, 1e-6)
                    && !equal_2d(points[j], c, 1e-6)
            })
        })?;
        triangles.push([
            remaining[(ear + m - 1) % m],
            remaining[ear],
            remaining[(ear + 1) % m],
        ]);
        remaining.remove(ear);
    }
    triangles.push([remaining[0], remaining[1], remaining[2]]);
    Some(triangles)
}

/// Joins two polygon loops across an edge they share with opposite
/// orientation. `same` decides whether two vertices coincide.
fn merge_loops<T: Copy>(a: &[T], b: &[T], same: impl Fn(&T, &T) -> bool) -> Option<Vec<T>> {
    let na = a.len();
    let nb = b.len();
    for i in 0..na {
        let a0 = &a[i];
        let a1 = &a[(i + 1) % na];
        for j in 0..nb {
            let b0 = &b[j];
            let b1 = &b[(j + 1) % nb];
            if same(a0, b1) && same(a1, b0) {
                let mut out = Vec::with_capacity(na + nb - 2);
                out.extend((0..na).map(|k| a[(i + 1 + k) % na]));
                out.extend((0..nb - 2).map(|k| b[(j + 2 + k) % nb]));
                return Some(out);
            }
        }
    }
    None
}

/// Merges two convex polygons sharing an edge if the union is convex.
///
/// Collinear vertices are kept so edges of neighbouring polygons still match.
pub fn merge_convex(a: &[Vec3], b: &[Vec3], eps: f32, max_verts: usize) -> Option<Vec<Vec3>> {
    let merged = merge_loops(a, b, |p, q| equal_2d(*p, *q, eps))?;
    (merged.len() <= max_verts && is_convex_2d(&merged, eps)).then_some(merged)
}

/// Splits a simple counter-clockwise polygon into convex pieces.
///
/// Triangulates, then removes diagonals while the pieces stay convex and
/// within `max_verts` vertices.
pub fn convex_partition(points: &[Vec3], eps: f32, max_verts: usize) -> Option<Vec<Vec<Vec3>>> {
    if points.len() <= max_verts && is_convex_2d(points, eps) {
        return Some(vec![points.to_vec()]);
    }

    let mut parts: Vec<Vec<usize>> = triangulate(points)?
        .into_iter()
        .map(|t| t.to_vec())
        .collect();

    let to_points = |indices: &[usize]| indices.iter().map(|&i| points[i]).collect::<Vec<_>>();
    'merge: loop {
        for i in 0..parts.len() {
            for j in (i + 1)..parts.len() {
                let Some(merged) = merge_loops(&parts[i], &parts[j], |p, q| p == q) else {
                    continue;
                };
                if merged.len() <= max_verts && is_convex_2d(&to_points(&merged), eps) {
                    parts[i] = merged;
                    parts.swap_remove(j);
                    continue 'merge;
                }
            }
        }
        break;
    }

    Some(parts.iter().map(|p| to_points(p)).collect())
}

/// Inserts any of `candidates` lying on an edge interior into that edge.
///
/// Inserted points take their XZ position from the candidate and their height
/// from the edge. Returns `None` if nothing was inserted.
pub fn split_edges(points: &[Vec3], candidates: &[Vec3], eps: f32) -> Option<Vec<Vec3>> {
    let n = points.len();
    let eps2 = eps * eps;
    let mut out = Vec::with_capacity(n);
    let mut changed = false;

    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        out.push(a);

        let mut inserts: Vec<(f32, Vec3)> = candidates
            .iter()
            .filter(|&&c| !equal_2d(c, a, eps) && !equal_2d(c, b, eps))
            .filter_map(|&c| {
                let (q, t) = closest_point_on_segment_2d(c, a, b);
                (t > 0.0 && t < 1.0 && dist_sqr_2d(c, q) <= eps2)
                    .then(|| (t, Vec3::new(c.x, q.y, c.z)))
            })
            .collect();
        inserts.sort_by(|x, y| x.0.total_cmp(&y.0));
        for (_, p) in inserts {
            if out.last().map_or(true, |&q| !equal_2d(p, q, eps)) {
                out.push(p);
                changed = true;
            }
        }
    }

    changed.then_some(out)
}
