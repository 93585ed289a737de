//! Links between polygon edges

use crate::nav_poly::PolyId;

/// Handle to a link stored in the mesh link table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkId(pub(crate) u32);

impl LinkId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Connection between an edge of one polygon and an edge of another
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct NavLink {
    /// Connected polygons
    pub poly: [PolyId; 2],
    /// Edge of each polygon the link crosses
    pub edge: [u16; 2],
    /// XZ length of the shared edge
    pub width: f32,
    /// Largest height difference between matched edge endpoints
    pub step: f32,
    /// Distance between the polygon centres, used as the search cost
    pub distance: f32,
}

impl NavLink {
    pub(crate) fn new(a: PolyId, edge_a: usize, b: PolyId, edge_b: usize) -> Self {
        Self {
            poly: [a, b],
            edge: [edge_a as u16, edge_b as u16],
            width: 0.0,
            step: 0.0,
            distance: 0.0,
        }
    }

    /// Slot (0 or 1) holding `(poly, edge)`
    pub fn side_of(&self, poly: PolyId, edge: usize) -> Option<usize> {
        (0..2).find(|&k| self.poly[k] == poly && self.edge[k] as usize == edge)
    }

    /// The endpoint across the link from `(poly, edge)`
    pub fn other(&self, poly: PolyId, edge: usize) -> Option<(PolyId, usize)> {
        self.side_of(poly, edge)
            .map(|k| (self.poly[k ^ 1], self.edge[k ^ 1] as usize))
    }

    /// The polygon across the link from `poly`
    pub fn other_poly(&self, poly: PolyId) -> PolyId {
        if self.poly[0] == poly {
            self.poly[1]
        } else {
            self.poly[0]
        }
    }
}
