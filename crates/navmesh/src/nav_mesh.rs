//! Navigation mesh implementation
//!
//! The mesh owns every polygon in an id-ordered arena and every link in a
//! slab indexed by [`LinkId`]. Polygons refer to links by id and links refer
//! to polygons by [`PolyId`], so removing a polygon never leaves a dangling
//! reference: both slots of a link are cleared when it is freed.

use std::collections::{BTreeMap, HashSet};

use nav_common::{
    closest_point_on_segment_2d, dist_2d, dist_sqr_2d, equal_2d, is_convex_2d, polygon_area_2d,
    random_point_in_convex_poly, Aabb, Error, Result, Vec3,
};

use crate::config::NavMeshConfig;
use crate::edge_iter::Edges;
use crate::nav_link::{LinkId, NavLink};
use crate::nav_poly::{NavPoly, PolyId, PolygonDesc};
use crate::polygon_ops::remove_duplicate_points;
use crate::types::{TypeIndex, TypeRegistry};

/// Closest boundary edge found by [`NavMesh::closest_boundary`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryHit {
    /// Closest point on the edge
    pub point: Vec3,
    /// Polygon owning the edge
    pub poly: PolyId,
    /// Edge index within the polygon
    pub edge: usize,
    /// Planar distance from the query point
    pub distance: f32,
}

/// Polygon navigation mesh
#[derive(Debug, Clone)]
pub struct NavMesh {
    pub(crate) polys: BTreeMap<PolyId, NavPoly>,
    pub(crate) links: Vec<Option<NavLink>>,
    free_links: Vec<u32>,
    pub(crate) types: TypeRegistry,
    pub(crate) config: NavMeshConfig,
    pub(crate) next_id: u32,
}

impl Default for NavMesh {
    fn default() -> Self {
        Self::from_parts(NavMeshConfig::default(), TypeRegistry::new())
    }
}

impl NavMesh {
    /// Creates an empty mesh
    pub fn new(config: NavMeshConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(config, TypeRegistry::new()))
    }

    /// Creates an empty mesh using an existing type registry
    pub fn with_types(config: NavMeshConfig, types: TypeRegistry) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(config, types))
    }

    pub(crate) fn from_parts(config: NavMeshConfig, types: TypeRegistry) -> Self {
        Self {
            polys: BTreeMap::new(),
            links: Vec::new(),
            free_links: Vec::new(),
            types,
            config,
            next_id: 0,
        }
    }

    pub fn config(&self) -> &NavMeshConfig {
        &self.config
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut TypeRegistry {
        &mut self.types
    }

    /// Number of polygons
    pub fn len(&self) -> usize {
        self.polys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polys.is_empty()
    }

    /// Id the next inserted polygon will get
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    /// Removes every polygon. Ids are not reused afterwards.
    pub fn clear(&mut self) {
        self.polys.clear();
        self.links.clear();
        self.free_links.clear();
    }

    /// All polygons in id order
    pub fn polygons(&self) -> impl Iterator<Item = &NavPoly> + '_ {
        self.polys.values()
    }

    pub fn polygon(&self, id: PolyId) -> Option<&NavPoly> {
        self.polys.get(&id)
    }

    pub fn polygon_tag(&self, id: PolyId) -> Option<i16> {
        self.polys.get(&id).map(|p| p.tag)
    }

    pub fn link(&self, id: LinkId) -> Option<&NavLink> {
        self.links.get(id.index()).and_then(Option::as_ref)
    }

    /// All live links
    pub fn links(&self) -> impl Iterator<Item = (LinkId, &NavLink)> + '_ {
        self.links
            .iter()
            .enumerate()
            .filter_map(|(i, l)| l.as_ref().map(|l| (LinkId(i as u32), l)))
    }

    pub fn link_count(&self) -> usize {
        self.links.len() - self.free_links.len()
    }

    /// Edges of polygon `id` in winding order
    pub fn edges(&self, id: PolyId) -> Option<Edges<'_>> {
        self.polys.get(&id).map(|p| Edges::new(self, p))
    }

    pub fn edges_of<'a>(&'a self, poly: &'a NavPoly) -> Edges<'a> {
        Edges::new(self, poly)
    }

    /// Polygon across edge `edge` of polygon `id`
    pub fn linked_polygon(&self, id: PolyId, edge: usize) -> Option<&NavPoly> {
        let (other, _) = self.linked(id, edge)?;
        self.polys.get(&other)
    }

    /// Edge index on the polygon across edge `edge` of polygon `id`
    pub fn linked_edge(&self, id: PolyId, edge: usize) -> Option<usize> {
        self.linked(id, edge).map(|(_, e)| e)
    }

    /// Id of the polygon across edge `edge`, or [`PolyId::INVALID`]
    pub fn linked_id(&self, id: PolyId, edge: usize) -> PolyId {
        self.linked(id, edge).map_or(PolyId::INVALID, |(p, _)| p)
    }

    pub(crate) fn linked(&self, id: PolyId, edge: usize) -> Option<(PolyId, usize)> {
        let link = self.link(self.polys.get(&id)?.link(edge)?)?;
        link.other(id, edge)
    }

    pub fn edge_points(&self, id: PolyId, edge: usize) -> Option<(Vec3, Vec3)> {
        let poly = self.polys.get(&id)?;
        (edge < poly.size()).then(|| poly.edge_points(edge))
    }

    /// XZ containment test using the mesh edge tolerance
    pub fn is_inside_polygon(&self, point: Vec3, poly: &NavPoly) -> bool {
        poly.contains_2d(point, self.config.edge_epsilon)
    }

    // ==== Editing ==== //

    /// Adds a convex polygon and links it to every coincident edge
    pub fn add_polygon(&mut self, desc: &PolygonDesc) -> Result<PolyId> {
        if !self.types.contains(desc.type_index) {
            return Err(Error::InvalidPolygon(format!(
                "unknown type index {}",
                desc.type_index
            )));
        }
        let points = self.prepare_outline(&desc.points)?;
        if !is_convex_2d(&points, self.config.edge_epsilon) {
            return Err(Error::InvalidPolygon("polygon is not convex".to_string()));
        }
        if self.next_id == PolyId::INVALID.0 {
            return Err(Error::InvalidPolygon("polygon ids exhausted".to_string()));
        }

        let id = self.insert_polygon(points, desc.type_index, desc.tag);
        let links = self.link_polygon(id);
        self.invalidate_all_traversal();
        log::debug!("Added polygon {} with {} links", id, links);
        Ok(id)
    }

    /// Checks an outline and returns it deduplicated and counter-clockwise
    pub(crate) fn prepare_outline(&self, points: &[Vec3]) -> Result<Vec<Vec3>> {
        if points.len() < 3 {
            return Err(Error::InvalidPolygon(format!(
                "polygon needs at least 3 points, got {}",
                points.len()
            )));
        }
        if points.iter().any(|p| !p.is_finite()) {
            return Err(Error::InvalidPolygon(
                "polygon has non-finite coordinates".to_string(),
            ));
        }
        let mut points = remove_duplicate_points(points, self.config.edge_epsilon);
        if points.len() > u16::MAX as usize {
            return Err(Error::InvalidPolygon("too many points".to_string()));
        }
        let area = polygon_area_2d(&points);
        if points.len() < 3 || area.abs() <= self.config.min_polygon_area {
            return Err(Error::InvalidPolygon("polygon has no area".to_string()));
        }
        if area < 0.0 {
            points.reverse();
        }
        Ok(points)
    }

    /// Inserts a polygon without linking it
    pub(crate) fn insert_polygon(&mut self, points: Vec<Vec3>, type_index: TypeIndex, tag: i16) -> PolyId {
        let id = PolyId(self.next_id);
        self.next_id += 1;
        self.insert_polygon_with_id(id, points, type_index, tag);
        id
    }

    pub(crate) fn insert_polygon_with_id(
        &mut self,
        id: PolyId,
        points: Vec<Vec3>,
        type_index: TypeIndex,
        tag: i16,
    ) {
        self.polys
            .insert(id, NavPoly::new(id, points, type_index, tag));
    }

    /// Removes a polygon, freeing its links
    pub fn remove_polygon(&mut self, id: PolyId) -> Option<NavPoly> {
        if !self.polys.contains_key(&id) {
            return None;
        }
        self.unlink_polygon(id);
        let poly = self.polys.remove(&id);
        self.invalidate_all_traversal();
        log::debug!("Removed polygon {}", id);
        poly
    }

    /// Links every unlinked edge of `id` to a coincident unlinked edge.
    /// Returns the number of links created.
    pub(crate) fn link_polygon(&mut self, id: PolyId) -> usize {
        let size = match self.polys.get(&id) {
            Some(poly) => poly.size(),
            None => return 0,
        };
        let mut created = 0;
        for edge in 0..size {
            if self.polys[&id].links[edge].is_some() {
                continue;
            }
            if let Some((other, other_edge)) = self.find_matching_edge(id, edge) {
                self.create_link(id, edge, other, other_edge);
                created += 1;
            }
        }
        created
    }

    fn find_matching_edge(&self, id: PolyId, edge: usize) -> Option<(PolyId, usize)> {
        let eps = self.config.edge_epsilon;
        let (a0, a1) = self.polys.get(&id)?.edge_points(edge);
        if equal_2d(a0, a1, eps) {
            return None;
        }
        let bounds = Aabb::from_points(&[a0, a1]).expand(eps);

        for other in self.polys.values() {
            if other.id == id || !other.bounds().overlaps_2d(&bounds) {
                continue;
            }
            for f in 0..other.size() {
                if other.links[f].is_some() {
                    continue;
                }
                let (b0, b1) = other.edge_points(f);
                if self.edges_match(a0, a1, b0, b1) {
                    return Some((other.id, f));
                }
            }
        }
        None
    }

    /// Edges match when they coincide with opposite orientation
    fn edges_match(&self, a0: Vec3, a1: Vec3, b0: Vec3, b1: Vec3) -> bool {
        let eps = self.config.edge_epsilon;
        let tolerance = self.config.link_height_tolerance;
        equal_2d(a0, b1, eps)
            && equal_2d(a1, b0, eps)
            && (a0.y - b1.y).abs() <= tolerance
            && (a1.y - b0.y).abs() <= tolerance
    }

    pub(crate) fn create_link(&mut self, a: PolyId, edge_a: usize, b: PolyId, edge_b: usize) -> LinkId {
        let mut link = NavLink::new(a, edge_a, b, edge_b);
        self.update_link_metrics(&mut link);

        let id = match self.free_links.pop() {
            Some(index) => {
                self.links[index as usize] = Some(link);
                LinkId(index)
            }
            None => {
                self.links.push(Some(link));
                LinkId((self.links.len() - 1) as u32)
            }
        };
        if let Some(poly) = self.polys.get_mut(&a) {
            poly.links[edge_a] = Some(id);
        }
        if let Some(poly) = self.polys.get_mut(&b) {
            poly.links[edge_b] = Some(id);
        }
        id
    }

    fn update_link_metrics(&self, link: &mut NavLink) {
        let (Some(pa), Some(pb)) = (self.polys.get(&link.poly[0]), self.polys.get(&link.poly[1]))
        else {
            return;
        };
        let (a0, a1) = pa.edge_points(link.edge[0] as usize);
        let (b0, b1) = pb.edge_points(link.edge[1] as usize);
        link.width = dist_2d(a0, a1);
        link.step = (a0.y - b1.y).abs().max((a1.y - b0.y).abs());
        link.distance = pa.centre.distance(pb.centre);
    }

    /// Frees the link across an edge and clears both slots
    pub(crate) fn unlink_edge(&mut self, id: PolyId, edge: usize) {
        let Some(link_id) = self.polys.get_mut(&id).and_then(|p| p.links[edge].take()) else {
            return;
        };
        let Some(link) = self.links.get_mut(link_id.index()).and_then(Option::take) else {
            return;
        };
        self.free_links.push(link_id.0);
        if let Some((other, other_edge)) = link.other(id, edge) {
            if let Some(poly) = self.polys.get_mut(&other) {
                if poly.links[other_edge] == Some(link_id) {
                    poly.links[other_edge] = None;
                }
            }
        }
    }

    pub(crate) fn unlink_polygon(&mut self, id: PolyId) {
        let size = self.polys.get(&id).map_or(0, NavPoly::size);
        for edge in 0..size {
            self.unlink_edge(id, edge);
        }
    }

    /// Checks that every link is referenced from both of its edges
    pub fn validate_links(&self) -> Result<()> {
        let mut referenced = 0;
        for poly in self.polys.values() {
            for (edge, slot) in poly.links.iter().enumerate() {
                let Some(link_id) = slot else { continue };
                referenced += 1;
                let link = self.link(*link_id).ok_or_else(|| {
                    Error::DataCorrupted(format!("polygon {} edge {} has a freed link", poly.id, edge))
                })?;
                let (other, other_edge) = link.other(poly.id, edge).ok_or_else(|| {
                    Error::DataCorrupted(format!(
                        "link {} does not reference polygon {} edge {}",
                        link_id.index(),
                        poly.id,
                        edge
                    ))
                })?;
                let back = self
                    .polys
                    .get(&other)
                    .and_then(|p| p.links.get(other_edge).copied().flatten());
                if back != Some(*link_id) {
                    return Err(Error::DataCorrupted(format!(
                        "link {} between {} and {} is not symmetric",
                        link_id.index(),
                        poly.id,
                        other
                    )));
                }
            }
        }
        if referenced != self.link_count() * 2 {
            return Err(Error::DataCorrupted(format!(
                "{} live links but {} edge references",
                self.link_count(),
                referenced
            )));
        }
        Ok(())
    }

    // ==== Spatial queries ==== //

    /// Polygon containing `point` on the XZ plane.
    ///
    /// When several polygons contain the point, the one whose centre is
    /// vertically closest wins.
    pub fn polygon_at(&self, point: Vec3) -> Option<&NavPoly> {
        let eps = self.config.edge_epsilon;
        let mut best = None;
        let mut best_dy = f32::MAX;
        for poly in self.polys.values() {
            if !poly.contains_2d(point, eps) {
                continue;
            }
            let dy = (point.y - poly.centre.y).abs();
            if dy == 0.0 {
                return Some(poly);
            }
            if dy < best_dy {
                best_dy = dy;
                best = Some(poly);
            }
        }
        best
    }

    /// Id of the polygon containing `point`, or [`PolyId::INVALID`]
    pub fn polygon_id_at(&self, point: Vec3) -> PolyId {
        self.polygon_at(point).map_or(PolyId::INVALID, |p| p.id)
    }

    /// Closest polygon within `max` of `point`, with the closest point on it.
    ///
    /// Polygons containing the point score by how far the point sits above or
    /// below their height range. Other polygons score by distance to the
    /// closest point of their nearest boundary edge.
    pub fn closest_polygon(&self, point: Vec3, max: f32) -> Option<(PolyId, Vec3)> {
        let mut best_d = if max < 1e18 { max * max } else { f32::MAX };
        let mut result = None;

        for poly in self.polys.values() {
            if self.is_inside_polygon(point, poly) {
                let d = (point.y - poly.centre.y).abs() - poly.extents.y;
                if d <= 0.0 {
                    // Within height range
                    return Some((poly.id, point));
                }
                if d * d < best_d {
                    best_d = d * d;
                    result = Some((poly.id, point));
                }
                continue;
            }
            for edge in 0..poly.size() {
                if poly.links[edge].is_some() {
                    continue;
                }
                let (a, b) = poly.edge_points(edge);
                let (q, _) = closest_point_on_segment_2d(point, a, b);
                let d = point.distance_squared(q);
                if d < best_d {
                    best_d = d;
                    result = Some((poly.id, q));
                }
            }
        }
        result
    }

    /// Closest unlinked edge within `radius` of `point`.
    ///
    /// Starts at `polygon`, or at the polygon containing `point` when
    /// `polygon` is [`PolyId::INVALID`], and floods across linked edges that
    /// pass within `radius`.
    pub fn closest_boundary(&self, point: Vec3, polygon: PolyId, radius: f32) -> Option<BoundaryHit> {
        let start = if polygon.is_valid() {
            self.polys.get(&polygon)?
        } else {
            self.polygon_at(point)?
        };

        let mut radius2 = radius * radius;
        let mut result = None;
        let mut stack = vec![start];
        let mut visited = HashSet::from([start.id]);

        while let Some(poly) = stack.pop() {
            for edge in 0..poly.size() {
                let (a, b) = poly.edge_points(edge);
                let (q, _) = closest_point_on_segment_2d(point, a, b);
                let d = dist_sqr_2d(point, q);
                if d >= radius2 {
                    continue;
                }
                match self.linked_polygon(poly.id, edge) {
                    Some(next) => {
                        if visited.insert(next.id) {
                            stack.push(next);
                        }
                    }
                    None => {
                        radius2 = d;
                        result = Some(BoundaryHit {
                            point: q,
                            poly: poly.id,
                            edge,
                            distance: d.sqrt(),
                        });
                    }
                }
            }
        }
        result
    }

    // ==== Random sampling ==== //

    /// Picks a polygon with probability proportional to its area times
    /// `weight(poly)`. Polygons with a weight of zero or less are never picked.
    pub fn random_polygon(
        &self,
        rng: &mut fastrand::Rng,
        weight: &dyn Fn(&NavPoly) -> f32,
    ) -> Option<&NavPoly> {
        let mut accum = 0.0;
        let mut selected = None;
        for poly in self.polys.values() {
            let w = weight(poly);
            if !(w > 0.0) {
                continue;
            }
            let area = poly.area() * w;
            if !(area > 0.0) {
                continue;
            }
            if rng.f32() * (accum + area) >= accum {
                selected = Some(poly);
            }
            accum += area;
        }
        selected
    }

    /// Uniformly distributed point over the polygons accepted by `weight`
    pub fn random_point(
        &self,
        rng: &mut fastrand::Rng,
        weight: &dyn Fn(&NavPoly) -> f32,
    ) -> Option<(PolyId, Vec3)> {
        let poly = self.random_polygon(rng, weight)?;
        let point = random_point_in_convex_poly(&poly.points, rng.f32(), rng.f32());
        Some((poly.id, point))
    }

    /// Uniformly distributed point inside polygon `id`
    pub fn random_point_in(&self, id: PolyId, rng: &mut fastrand::Rng) -> Option<Vec3> {
        let poly = self.polys.get(&id)?;
        Some(random_point_in_convex_poly(&poly.points, rng.f32(), rng.f32()))
    }
}
