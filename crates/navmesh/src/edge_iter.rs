//! Iteration over polygon edges with their adjacency

use nav_common::{edge_normal_2d, Vec3};

use crate::nav_link::{LinkId, NavLink};
use crate::nav_mesh::NavMesh;
use crate::nav_poly::NavPoly;

/// One edge of a polygon, from point `a` to point `b`
#[derive(Debug, Clone, Copy)]
pub struct EdgeInfo<'a> {
    mesh: &'a NavMesh,
    /// Polygon owning the edge
    pub poly: &'a NavPoly,
    /// Index of the first point, which is also the edge index
    pub a: usize,
    /// Index of the second point
    pub b: usize,
}

impl<'a> EdgeInfo<'a> {
    pub fn point_a(&self) -> Vec3 {
        self.poly.points[self.a]
    }

    pub fn point_b(&self) -> Vec3 {
        self.poly.points[self.b]
    }

    /// Vector from `a` to `b`
    pub fn direction(&self) -> Vec3 {
        self.point_b() - self.point_a()
    }

    /// Outward XZ normal, not normalized
    pub fn normal(&self) -> Vec3 {
        edge_normal_2d(self.point_a(), self.point_b())
    }

    pub fn link_id(&self) -> Option<LinkId> {
        self.poly.links[self.a]
    }

    pub fn link(&self) -> Option<&'a NavLink> {
        self.link_id().and_then(|l| self.mesh.link(l))
    }

    pub fn is_connected(&self) -> bool {
        self.link_id().is_some()
    }

    /// Polygon across this edge
    pub fn connected(&self) -> Option<&'a NavPoly> {
        self.mesh.linked_polygon(self.poly.id, self.a)
    }

    /// Edge index on the connected polygon
    pub fn opposite_edge(&self) -> Option<usize> {
        self.mesh.linked_edge(self.poly.id, self.a)
    }
}

/// Iterator over the edges of a polygon in winding order, starting with the
/// closing edge `(size - 1, 0)`
#[derive(Debug, Clone)]
pub struct Edges<'a> {
    mesh: &'a NavMesh,
    poly: &'a NavPoly,
    next: usize,
}

impl<'a> Edges<'a> {
    pub(crate) fn new(mesh: &'a NavMesh, poly: &'a NavPoly) -> Self {
        Self { mesh, poly, next: 0 }
    }
}

impl<'a> Iterator for Edges<'a> {
    type Item = EdgeInfo<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let size = self.poly.size();
        if self.next >= size {
            return None;
        }
        let b = self.next;
        let a = (b + size - 1) % size;
        self.next += 1;
        Some(EdgeInfo {
            mesh: self.mesh,
            poly: self.poly,
            a,
            b,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.poly.size().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Edges<'_> {}
