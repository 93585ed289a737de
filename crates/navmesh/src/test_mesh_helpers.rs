//! Test mesh creation helpers
//!
//! Small hand-built meshes shared by the unit tests of this crate.

use nav_common::{Result, Vec3};

use crate::{NavMesh, PolyId, PolygonDesc, TypeIndex};

/// Counter-clockwise axis aligned rectangle at height `y`
pub fn rect(x0: f32, z0: f32, x1: f32, z1: f32, y: f32) -> Vec<Vec3> {
    vec![
        Vec3::new(x0, y, z0),
        Vec3::new(x1, y, z0),
        Vec3::new(x1, y, z1),
        Vec3::new(x0, y, z1),
    ]
}

/// Creates a `cols` x `rows` grid of `size` sized squares.
///
/// Polygon ids are assigned row by row, so the square at column `x` and row
/// `z` has id `z * cols + x`.
pub fn create_grid_mesh(cols: usize, rows: usize, size: f32) -> Result<NavMesh> {
    let mut mesh = NavMesh::default();
    for z in 0..rows {
        for x in 0..cols {
            let (x0, z0) = (x as f32 * size, z as f32 * size);
            mesh.add_polygon(&PolygonDesc::new(rect(x0, z0, x0 + size, z0 + size, 0.0)))?;
        }
    }
    Ok(mesh)
}

/// Adds a square of the given type and returns its id
pub fn add_square(mesh: &mut NavMesh, x0: f32, z0: f32, size: f32, type_index: TypeIndex) -> Result<PolyId> {
    mesh.add_polygon(&PolygonDesc::new(rect(x0, z0, x0 + size, z0 + size, 0.0)).with_type(type_index))
}

/// Creates a quad that pinches from 6 units wide at its east edge down to a
/// gap of roughly 4.6 units, with a rectangle linked to its east edge.
///
/// Returns the mesh and the ids of the pinched polygon and its neighbour.
pub fn create_pinch_mesh() -> Result<(NavMesh, PolyId, PolyId)> {
    let mut mesh = NavMesh::default();
    let pinch = mesh.add_polygon(&PolygonDesc::new(vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(6.0, 0.0, 0.0),
        Vec3::new(6.0, 0.0, 6.0),
        Vec3::new(0.0, 0.0, 1.0),
    ]))?;
    let east = mesh.add_polygon(&PolygonDesc::new(rect(6.0, 0.0, 8.0, 6.0, 0.0)))?;
    Ok((mesh, pinch, east))
}

/// A 2 unit wide corridor along +X whose middle square is split into four
/// triangles around the interior vertex (1, 1).
///
/// Ids: west square 0, triangles south 1, east 2, north 3, west 4, east
/// square 5.
pub fn create_fan_corridor() -> Result<NavMesh> {
    let mut mesh = NavMesh::default();
    let v = |x: f32, z: f32| Vec3::new(x, 0.0, z);
    let centre = v(1.0, 1.0);
    mesh.add_polygon(&PolygonDesc::new(rect(-2.0, 0.0, 0.0, 2.0, 0.0)))?;
    for (a, b) in [
        (v(0.0, 0.0), v(2.0, 0.0)),
        (v(2.0, 0.0), v(2.0, 2.0)),
        (v(2.0, 2.0), v(0.0, 2.0)),
        (v(0.0, 2.0), v(0.0, 0.0)),
    ] {
        mesh.add_polygon(&PolygonDesc::new(vec![a, b, centre]))?;
    }
    mesh.add_polygon(&PolygonDesc::new(rect(2.0, 0.0, 4.0, 2.0, 0.0)))?;
    Ok(mesh)
}

/// Sum of all polygon areas
pub fn total_area(mesh: &NavMesh) -> f32 {
    mesh.polygons().map(|p| p.area()).sum()
}
