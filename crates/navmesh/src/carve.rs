//! Carving and retyping
//!
//! A carve clips every overlapping polygon the patch is allowed to overwrite,
//! optionally fills the patch area with new polygons, then repairs the
//! surrounding region so neighbouring edges meet vertex to vertex again and
//! can be relinked.

use std::collections::BTreeSet;

use nav_common::{is_convex_2d, polygon_area_2d, Aabb, Error, Result, Vec3};

use crate::config::EqualPrecedence;
use crate::nav_mesh::NavMesh;
use crate::nav_poly::{PolyId, PolygonDesc};
use crate::polygon_ops::{
    convex_overlap_2d, convex_partition, is_simple_2d, merge_convex, split_edges,
    subtract_convex, tidy_polygon,
};
use crate::types::TypeIndex;

/// Polygons removed and added by a carve
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarveReport {
    pub removed: Vec<PolyId>,
    pub added: Vec<PolyId>,
}

impl CarveReport {
    /// True if the carve changed nothing
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

#[derive(Debug, Clone)]
struct Piece {
    points: Vec<Vec3>,
    type_index: TypeIndex,
    tag: i16,
}

impl NavMesh {
    /// Carves `patch` into the mesh using the precedence of its type
    pub fn carve(&mut self, patch: &PolygonDesc, add: bool) -> Result<CarveReport> {
        let precedence = self.types.precedence(patch.type_index);
        self.carve_with_precedence(patch, precedence, add)
    }

    /// Carves `patch` into the mesh.
    ///
    /// Polygons whose type precedence is below `precedence` are clipped by the
    /// patch outline. Polygons above it are left alone, and polygons with equal
    /// precedence follow [`NavMeshConfig::equal_precedence`](crate::NavMeshConfig).
    /// With `add` set the patch area not covered by protected polygons is filled
    /// with polygons of the patch type and tag, otherwise it becomes a hole.
    ///
    /// The patch may be concave but must be simple. Invalid patches are rejected
    /// before the mesh is touched.
    pub fn carve_with_precedence(
        &mut self,
        patch: &PolygonDesc,
        precedence: i32,
        add: bool,
    ) -> Result<CarveReport> {
        if add && !self.types.contains(patch.type_index) {
            return Err(Error::InvalidPolygon(format!(
                "unknown type index {}",
                patch.type_index
            )));
        }
        let eps = self.config.edge_epsilon;
        let min_area = self.config.min_polygon_area;
        let max_verts = self.config.max_vertices_per_poly;

        let outline = tidy_polygon(&self.prepare_outline(&patch.points)?, eps);
        if outline.len() < 3 || !is_simple_2d(&outline) {
            return Err(Error::InvalidPolygon(
                "carve patch must be a simple polygon".to_string(),
            ));
        }
        let parts = convex_partition(&outline, eps, max_verts).ok_or_else(|| {
            Error::InvalidPolygon("carve patch could not be triangulated".to_string())
        })?;
        let bounds = Aabb::from_points(&outline);

        // Sort overlapping polygons into clipped and protected
        let mut clipped = Vec::new();
        let mut protected = Vec::new();
        for poly in self.polys.values() {
            if !poly.bounds().overlaps_2d(&bounds)
                || !parts.iter().any(|part| convex_overlap_2d(part, &poly.points, eps))
            {
                continue;
            }
            let other = self.types.precedence(poly.type_index);
            let overwrite = other < precedence
                || (other == precedence
                    && self.config.equal_precedence == EqualPrecedence::Overwrite);
            if overwrite {
                clipped.push(poly.id);
            } else {
                protected.push(poly.id);
            }
        }

        if clipped.is_empty() && !add {
            return Ok(CarveReport::default());
        }

        let mut pieces = Vec::new();
        for id in &clipped {
            let poly = &self.polys[id];
            let mut remaining = vec![poly.points.clone()];
            for part in &parts {
                remaining = remaining
                    .iter()
                    .flat_map(|r| subtract_convex(r, part, eps, min_area))
                    .collect();
            }
            pieces.extend(remaining.into_iter().map(|points| Piece {
                points,
                type_index: poly.type_index,
                tag: poly.tag,
            }));
        }
        if add {
            let mut fill = parts.clone();
            for id in &protected {
                let keep = &self.polys[id].points;
                fill = fill
                    .iter()
                    .flat_map(|f| subtract_convex(f, keep, eps, min_area))
                    .collect();
            }
            pieces.extend(fill.into_iter().map(|points| Piece {
                points,
                type_index: patch.type_index,
                tag: patch.tag,
            }));
        }

        merge_pieces(&mut pieces, eps, max_verts);
        pieces.retain(|p| p.points.len() >= 3 && polygon_area_2d(&p.points) > min_area);

        if (u32::MAX - self.next_id) as usize <= pieces.len() {
            return Err(Error::InvalidPolygon("polygon ids exhausted".to_string()));
        }

        // Everything from here on mutates the mesh
        let mut region = BTreeSet::new();
        for &id in &clipped {
            for edge in 0..self.polys[&id].size() {
                let neighbour = self.linked_id(id, edge);
                if neighbour.is_valid() {
                    region.insert(neighbour);
                }
            }
        }
        for &id in &clipped {
            self.unlink_polygon(id);
            self.polys.remove(&id);
            region.remove(&id);
        }

        let mut added = Vec::with_capacity(pieces.len());
        for piece in pieces {
            let id = self.insert_polygon(piece.points, piece.type_index, piece.tag);
            added.push(id);
            region.insert(id);
        }

        let near = bounds.expand(eps);
        region.extend(
            self.polys
                .values()
                .filter(|p| p.bounds().overlaps_2d(&near))
                .map(|p| p.id),
        );

        self.repair_t_junctions(&region);
        for &id in &region {
            self.link_polygon(id);
        }
        self.invalidate_all_traversal();

        log::debug!(
            "Carve removed {} polygons, added {}, relinked {}",
            clipped.len(),
            added.len(),
            region.len()
        );
        Ok(CarveReport {
            removed: clipped,
            added,
        })
    }

    /// Inserts a vertex wherever a vertex of a nearby polygon lies on an edge
    /// interior, so coincident edges share their endpoints. Modified polygons
    /// lose their links and must be relinked.
    fn repair_t_junctions(&mut self, region: &BTreeSet<PolyId>) {
        let eps = self.config.edge_epsilon;
        let mut updates = Vec::new();
        for id in region {
            let Some(poly) = self.polys.get(id) else { continue };
            let bounds = poly.bounds().expand(eps);
            let candidates: Vec<Vec3> = region
                .iter()
                .filter(|other| *other != id)
                .filter_map(|other| self.polys.get(other))
                .filter(|other| other.bounds().overlaps_2d(&bounds))
                .flat_map(|other| other.points.iter().copied())
                .collect();
            if let Some(points) = split_edges(&poly.points, &candidates, eps) {
                updates.push((*id, points));
            }
        }

        for (id, points) in updates {
            self.unlink_polygon(id);
            if let Some(poly) = self.polys.get_mut(&id) {
                poly.set_points(points);
            }
        }
    }

    /// Changes the type of a polygon and merges it with linked neighbours of
    /// the same type and tag while the result stays convex.
    ///
    /// The polygon keeps its id. Returns the ids of absorbed neighbours, which
    /// no longer exist afterwards.
    pub fn change_type(&mut self, id: PolyId, type_index: TypeIndex) -> Result<Vec<PolyId>> {
        if !self.types.contains(type_index) {
            return Err(Error::InvalidPolygon(format!(
                "unknown type index {type_index}"
            )));
        }
        let poly = self
            .polys
            .get_mut(&id)
            .ok_or(Error::UnknownPolygon(id.0))?;
        poly.type_index = type_index;
        let tag = poly.tag;

        let eps = self.config.edge_epsilon;
        let max_verts = self.config.max_vertices_per_poly;
        let mut absorbed = Vec::new();

        'merge: loop {
            let poly = &self.polys[&id];
            for edge in 0..poly.size() {
                let Some(other) = self.linked_polygon(id, edge) else {
                    continue;
                };
                if other.type_index != type_index || other.tag != tag {
                    continue;
                }
                let Some(merged) = merge_convex(&poly.points, &other.points, eps, max_verts)
                else {
                    continue;
                };
                debug_assert!(is_convex_2d(&merged, eps));
                let other_id = other.id;

                self.remove_polygon(other_id);
                self.unlink_polygon(id);
                if let Some(poly) = self.polys.get_mut(&id) {
                    poly.set_points(merged);
                }
                self.link_polygon(id);
                absorbed.push(other_id);
                continue 'merge;
            }
            break;
        }

        self.invalidate_all_traversal();
        log::debug!(
            "Changed type of polygon {} to {}, absorbed {} neighbours",
            id,
            type_index,
            absorbed.len()
        );
        Ok(absorbed)
    }
}

/// Greedily merges pieces of the same type and tag while they stay convex
fn merge_pieces(pieces: &mut Vec<Piece>, eps: f32, max_verts: usize) {
    'merge: loop {
        for i in 0..pieces.len() {
            for j in (i + 1)..pieces.len() {
                if pieces[i].type_index != pieces[j].type_index || pieces[i].tag != pieces[j].tag {
                    continue;
                }
                let Some(merged) = merge_convex(&pieces[i].points, &pieces[j].points, eps, usize::MAX)
                else {
                    continue;
                };
                let merged = tidy_polygon(&merged, eps);
                if merged.len() <= max_verts && is_convex_2d(&merged, eps) {
                    pieces[i].points = merged;
                    pieces.swap_remove(j);
                    continue 'merge;
                }
            }
        }
        break;
    }
}
