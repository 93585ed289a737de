//! Meshes for the search and following tests

use nav_common::{Result, Vec3};
use navmesh::{NavMesh, PolyId, PolygonDesc, TypeIndex};

/// Counter-clockwise axis aligned rectangle at height `y`
pub fn rect(x0: f32, z0: f32, x1: f32, z1: f32, y: f32) -> Vec<Vec3> {
    vec![
        Vec3::new(x0, y, z0),
        Vec3::new(x1, y, z0),
        Vec3::new(x1, y, z1),
        Vec3::new(x0, y, z1),
    ]
}

/// `cols` x `rows` unit squares. The square at column `x` and row `z` has id
/// `z * cols + x`.
pub fn create_grid_mesh(cols: usize, rows: usize) -> Result<NavMesh> {
    let mut mesh = NavMesh::default();
    for z in 0..rows {
        for x in 0..cols {
            let (x0, z0) = (x as f32, z as f32);
            mesh.add_polygon(&PolygonDesc::new(rect(x0, z0, x0 + 1.0, z0 + 1.0, 0.0)))?;
        }
    }
    Ok(mesh)
}

/// Adds a unit square of the given type and returns its id
pub fn add_square(mesh: &mut NavMesh, x0: f32, z0: f32, type_index: TypeIndex) -> Result<PolyId> {
    mesh.add_polygon(&PolygonDesc::new(rect(x0, z0, x0 + 1.0, z0 + 1.0, 0.0)).with_type(type_index))
}

/// A row of unit squares along +X, one per entry in `types`
pub fn create_row(mesh: &mut NavMesh, types: &[TypeIndex]) -> Result<Vec<PolyId>> {
    types
        .iter()
        .enumerate()
        .map(|(x, &t)| add_square(mesh, x as f32, 0.0, t))
        .collect()
}

/// Three unit squares forming an L: east from [0,1]² then north
pub fn create_l_mesh() -> Result<NavMesh> {
    let mut mesh = NavMesh::default();
    add_square(&mut mesh, 0.0, 0.0, 0)?;
    add_square(&mut mesh, 1.0, 0.0, 0)?;
    add_square(&mut mesh, 1.0, 1.0, 0)?;
    Ok(mesh)
}

/// A quad narrowing from 6 units wide down to about 4.6 with a rectangle
/// linked to its east edge.
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

/// Two 2x2 rooms joined through a 0.4 wide gap.
///
/// Returns the mesh plus the ids of the west room and the east room.
pub fn create_gap_mesh() -> Result<(NavMesh, PolyId, PolyId)> {
    let mut mesh = NavMesh::default();
    // West room with its east side split so only [0.8, 1.2] is shared
    let west = mesh.add_polygon(&PolygonDesc::new(vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(2.0, 0.0, 0.0),
        Vec3::new(2.0, 0.0, 0.8),
        Vec3::new(2.0, 0.0, 1.2),
        Vec3::new(2.0, 0.0, 2.0),
        Vec3::new(0.0, 0.0, 2.0),
    ]))?;
    let east = mesh.add_polygon(&PolygonDesc::new(vec![
        Vec3::new(2.0, 0.0, 0.8),
        Vec3::new(4.0, 0.0, 0.8),
        Vec3::new(4.0, 0.0, 1.2),
        Vec3::new(2.0, 0.0, 1.2),
    ]))?;
    Ok((mesh, west, east))
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
