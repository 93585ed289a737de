//! Navigation polygons

use std::fmt;
use std::sync::OnceLock;

use nav_common::{point_in_polygon_2d_eps, polygon_area_2d, polygon_centroid, Aabb, Vec3};

use crate::nav_link::LinkId;
use crate::traversal::TraversalThreshold;
use crate::types::TypeIndex;

/// Mesh-unique polygon handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct PolyId(pub u32);

impl PolyId {
    /// Sentinel returned by lookups that find nothing
    pub const INVALID: PolyId = PolyId(u32::MAX);

    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u32 {
        self.0
    }

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl Default for PolyId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for PolyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "#{}", self.0)
        } else {
            write!(f, "#invalid")
        }
    }
}

/// Description of a polygon to insert into a mesh or to carve with
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct PolygonDesc {
    pub points: Vec<Vec3>,
    pub type_index: TypeIndex,
    pub tag: i16,
}

impl PolygonDesc {
    pub fn new(points: Vec<Vec3>) -> Self {
        Self {
            points,
            type_index: 0,
            tag: 0,
        }
    }

    pub fn with_type(mut self, type_index: TypeIndex) -> Self {
        self.type_index = type_index;
        self
    }

    pub fn with_tag(mut self, tag: i16) -> Self {
        self.tag = tag;
        self
    }
}

/// Convex polygon owned by a [`NavMesh`](crate::NavMesh).
///
/// Points wind counter-clockwise on the XZ plane. Edge `i` runs from
/// `points[i]` to `points[(i + 1) % size]` and `links[i]` holds the link
/// across it, if any.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct NavPoly {
    pub(crate) id: PolyId,
    pub(crate) points: Vec<Vec3>,
    pub(crate) links: Vec<Option<LinkId>>,
    pub(crate) type_index: TypeIndex,
    pub(crate) tag: i16,
    pub(crate) centre: Vec3,
    pub(crate) extents: Vec3,
    #[cfg_attr(feature = "serialization", serde(skip))]
    pub(crate) traversal: OnceLock<Vec<TraversalThreshold>>,
}

impl NavPoly {
    pub(crate) fn new(id: PolyId, points: Vec<Vec3>, type_index: TypeIndex, tag: i16) -> Self {
        let mut poly = Self {
            id,
            links: vec![None; points.len()],
            points,
            type_index,
            tag,
            centre: Vec3::ZERO,
            extents: Vec3::ZERO,
            traversal: OnceLock::new(),
        };
        poly.update_bounds();
        poly
    }

    /// Replaces the points. All links must have been removed beforehand.
    pub(crate) fn set_points(&mut self, points: Vec<Vec3>) {
        debug_assert!(self.links.iter().all(Option::is_none));
        self.links = vec![None; points.len()];
        self.points = points;
        self.update_bounds();
        self.invalidate_traversal();
    }

    fn update_bounds(&mut self) {
        self.centre = polygon_centroid(&self.points);
        self.extents = self
            .points
            .iter()
            .fold(Vec3::ZERO, |ext, p| ext.max((*p - self.centre).abs()));
    }

    pub fn id(&self) -> PolyId {
        self.id
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Vertex `index`, wrapping around
    pub fn point(&self, index: usize) -> Vec3 {
        self.points[index % self.points.len()]
    }

    /// Number of vertices, which is also the number of edges
    pub fn size(&self) -> usize {
        self.points.len()
    }

    pub fn links(&self) -> &[Option<LinkId>] {
        &self.links
    }

    pub fn link(&self, edge: usize) -> Option<LinkId> {
        self.links.get(edge).copied().flatten()
    }

    /// Number of linked edges
    pub fn link_count(&self) -> usize {
        self.links.iter().filter(|l| l.is_some()).count()
    }

    pub fn type_index(&self) -> TypeIndex {
        self.type_index
    }

    pub fn tag(&self) -> i16 {
        self.tag
    }

    /// Area weighted centroid
    pub fn centre(&self) -> Vec3 {
        self.centre
    }

    /// Half size of the box around [`centre`](Self::centre) that holds every point
    pub fn extents(&self) -> Vec3 {
        self.extents
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.centre - self.extents, self.centre + self.extents)
    }

    /// Planar area
    pub fn area(&self) -> f32 {
        polygon_area_2d(&self.points).abs()
    }

    /// Endpoints of edge `edge`
    pub fn edge_points(&self, edge: usize) -> (Vec3, Vec3) {
        (self.point(edge), self.point(edge + 1))
    }

    /// XZ containment, inclusive of points within `eps` of the boundary
    pub fn contains_2d(&self, p: Vec3, eps: f32) -> bool {
        self.bounds().expand(eps).contains_2d(p) && point_in_polygon_2d_eps(p, &self.points, eps)
    }

    /// Whether the traversal thresholds are currently cached
    pub fn traversal_calculated(&self) -> bool {
        self.traversal.get().is_some()
    }

    pub(crate) fn invalidate_traversal(&mut self) {
        self.traversal.take();
    }
}
