//! Editable polygon navigation mesh
//!
//! A [`NavMesh`] owns a set of convex polygons ([`NavPoly`]) lying roughly on
//! the XZ plane. Polygons sharing an edge are connected by a [`NavLink`] that
//! records how wide the shared edge is, how large the height step across it is
//! and how far apart the polygon centres are.
//!
//! # Features
//!
//! - **Editing**: add and remove polygons, carve patches in by type
//!   precedence, retype polygons
//! - **Spatial queries**: containing polygon, closest polygon, closest boundary
//! - **Sampling**: area weighted random polygons and points
//! - **Traversal thresholds**: cached per polygon narrow spots used to reject
//!   crossings too tight for an agent
//! - **Persistence**: little-endian binary format with all-or-nothing loading
//!
//! # Example
//!
//! ```rust,ignore
//! use navmesh::{NavMesh, PolygonDesc};
//! use nav_common::Vec3;
//!
//! let mut mesh = NavMesh::default();
//! let ground = mesh.types_mut().set_type("ground", 0)?;
//! let a = mesh.add_polygon(&PolygonDesc::new(vec![
//!     Vec3::new(0.0, 0.0, 0.0),
//!     Vec3::new(1.0, 0.0, 0.0),
//!     Vec3::new(1.0, 0.0, 1.0),
//!     Vec3::new(0.0, 0.0, 1.0),
//! ]).with_type(ground))?;
//!
//! assert_eq!(mesh.polygon_id_at(Vec3::new(0.5, 0.0, 0.5)), a);
//! ```

#[cfg(feature = "std")]
pub mod binary_format;
pub mod carve;
pub mod config;
pub mod edge_iter;
pub mod nav_link;
pub mod nav_mesh;
pub mod nav_poly;
pub mod polygon_ops;
pub mod traversal;
pub mod types;

pub use carve::CarveReport;
pub use config::{EqualPrecedence, NavMeshConfig};
pub use edge_iter::{EdgeInfo, Edges};
pub use nav_link::{LinkId, NavLink};
pub use nav_mesh::{BoundaryHit, NavMesh};
pub use nav_poly::{NavPoly, PolyId, PolygonDesc};
pub use traversal::TraversalThreshold;
pub use types::{TypeIndex, TypeRegistry, DEFAULT_TYPE, MAX_TYPES};

#[cfg(test)]
pub mod test_mesh_helpers;

#[cfg(test)]
mod carve_tests;
