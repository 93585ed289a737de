//! Narrow spots inside polygons
//!
//! A polygon can be entered through a wide edge and still pinch to a gap too
//! narrow for an agent before the next edge. For every linked edge, each of
//! its endpoints that touches a wall (an unlinked edge) is projected onto the
//! walls visible within the edge's width, following links into neighbouring
//! polygons. Endpoints in the middle of the mesh start nothing. Every such
//! projection is a threshold: a segment an agent wider than the threshold
//! cannot cross.
//!
//! Thresholds depend only on geometry, not on agent size, so they are computed
//! once per polygon and cached until the polygon or its surroundings change.

use std::collections::HashSet;

use nav_common::{segments_cross_2d, Vec3};

use crate::nav_mesh::NavMesh;
use crate::nav_poly::{NavPoly, PolyId};

/// Segment across a polygon that narrower agents can cross
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct TraversalThreshold {
    /// Linked edge endpoint the threshold starts at
    pub from: Vec3,
    /// Closest point on the wall
    pub to: Vec3,
    /// Width of the gap, the XZ length of `from -> to`
    pub width: f32,
}

impl TraversalThreshold {
    /// Whether moving from `a` to `b` crosses this threshold with an agent of
    /// `radius` too wide to fit
    pub fn blocks(&self, a: Vec3, b: Vec3, radius: f32) -> bool {
        self.width < radius * 2.0 && segments_cross_2d(a, b, self.from, self.to)
    }
}

impl NavMesh {
    /// Traversal thresholds of a polygon, computed on first access
    pub fn traversal(&self, id: PolyId) -> Option<&[TraversalThreshold]> {
        let poly = self.polygon(id)?;
        Some(
            poly.traversal
                .get_or_init(|| calculate_traversal(self, poly))
                .as_slice(),
        )
    }

    /// Whether an agent of `radius` can move from `a` to `b` inside polygon `id`
    /// without squeezing through a threshold
    pub fn check_traversal(&self, id: PolyId, a: Vec3, b: Vec3, radius: f32) -> bool {
        if !self.polys.contains_key(&id) {
            return false;
        }
        if radius <= 0.0 {
            return true;
        }
        self.traversal(id)
            .is_some_and(|thresholds| !thresholds.iter().any(|t| t.blocks(a, b, radius)))
    }

    /// Drops every cached threshold
    pub(crate) fn invalidate_all_traversal(&mut self) {
        for poly in self.polys.values_mut() {
            poly.invalidate_traversal();
        }
    }
}

fn calculate_traversal(mesh: &NavMesh, poly: &NavPoly) -> Vec<TraversalThreshold> {
    let mut thresholds = Vec::new();
    let size = poly.size();

    for edge in 0..size {
        if poly.links[edge].is_none() {
            continue;
        }
        let (a, b) = poly.edge_points(edge);
        let limit = nav_common::dist_sqr_2d(a, b);

        // Skip the two edges meeting at each endpoint
        let prev = (edge + size - 1) % size;
        let next = (edge + 1) % size;
        if touches_wall(mesh, poly, edge) {
            let mut visited = HashSet::new();
            visited.insert(poly.id);
            project_onto_walls(mesh, poly, &[edge, prev], a, limit, &mut visited, &mut thresholds);
        }
        if touches_wall(mesh, poly, next) {
            let mut visited = HashSet::new();
            visited.insert(poly.id);
            project_onto_walls(mesh, poly, &[edge, next], b, limit, &mut visited, &mut thresholds);
        }
    }

    log::debug!(
        "Calculated {} traversal thresholds for polygon {}",
        thresholds.len(),
        poly.id
    );
    thresholds
}

/// Whether an unlinked edge ends at vertex `vertex` of `poly`.
///
/// Walks the fan of polygons around the vertex, crossing the edge that leaves
/// the vertex in each polygon. A vertex whose fan closes without meeting an
/// unlinked edge is interior and has open mesh all around it.
fn touches_wall(mesh: &NavMesh, poly: &NavPoly, vertex: usize) -> bool {
    let mut current = poly.id;
    let mut v = vertex;
    for _ in 0..=mesh.len() {
        let Some((next, opposite)) = mesh.linked(current, v) else {
            return true;
        };
        let Some(n) = mesh.polygon(next) else {
            return true;
        };
        // The shared edge runs the other way, so the vertex ends it
        current = next;
        v = (opposite + 1) % n.size();
        if current == poly.id {
            return v != vertex;
        }
    }
    true
}

fn project_onto_walls(
    mesh: &NavMesh,
    look: &NavPoly,
    skip: &[usize],
    from: Vec3,
    limit: f32,
    visited: &mut HashSet<PolyId>,
    out: &mut Vec<TraversalThreshold>,
) {
    for edge in mesh.edges_of(look) {
        if skip.contains(&edge.a) {
            continue;
        }
        let ea = edge.point_a();
        let ed = edge.direction();
        let len2 = ed.x * ed.x + ed.z * ed.z;
        if len2 <= f32::EPSILON {
            continue;
        }
        let t = (ed.x * (from.x - ea.x) + ed.z * (from.z - ea.z)) / len2;
        if t <= 0.0 || t >= 1.0 {
            continue;
        }
        let p = ea + ed * t;
        let dist = nav_common::dist_sqr_2d(p, from);
        if dist >= limit {
            continue;
        }
        match (edge.connected(), edge.opposite_edge()) {
            (Some(next), Some(opposite)) => {
                if visited.insert(next.id) {
                    project_onto_walls(mesh, next, &[opposite], from, limit, visited, out);
                }
            }
            _ => out.push(TraversalThreshold {
                from,
                to: p,
                width: dist.sqrt(),
            }),
        }
    }
}
