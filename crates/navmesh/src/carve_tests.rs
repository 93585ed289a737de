//! Tests for carving and retyping

#[cfg(test)]
mod tests {
    use crate::test_mesh_helpers::{add_square, create_grid_mesh, rect, total_area};
    use crate::{EqualPrecedence, NavMesh, NavMeshConfig, PolyId, PolygonDesc};
    use nav_common::{Error, Result, Vec3};

    fn ground_mesh(config: NavMeshConfig) -> Result<(NavMesh, PolyId)> {
        let mut mesh = NavMesh::new(config)?;
        let ground = mesh.types_mut().set_type("ground", 0)?;
        let id = add_square(&mut mesh, 0.0, 0.0, 4.0, ground)?;
        Ok((mesh, id))
    }

    #[test]
    fn test_carve_higher_precedence_patch() -> Result<()> {
        let (mut mesh, ground) = ground_mesh(NavMeshConfig::default())?;
        let bridge = mesh.types_mut().set_type("bridge", 5)?;

        let report = mesh.carve(
            &PolygonDesc::new(rect(1.0, 1.0, 3.0, 3.0, 0.0)).with_type(bridge),
            true,
        )?;
        assert_eq!(report.removed, vec![ground]);
        assert_eq!(report.added.len(), 5);
        assert!(mesh.polygon(ground).is_none());

        // Four ground strips around one bridge polygon
        assert_eq!(mesh.len(), 5);
        assert!((total_area(&mesh) - 16.0).abs() < 1e-4);
        mesh.validate_links()?;
        assert_eq!(mesh.link_count(), 8);

        let centre = mesh.polygon_at(Vec3::new(2.0, 0.0, 2.0)).unwrap();
        assert_eq!(centre.type_index(), bridge);
        assert!((centre.area() - 4.0).abs() < 1e-4);
        assert_eq!(centre.link_count(), 4);

        let corner = mesh.polygon_at(Vec3::new(0.5, 0.0, 0.5)).unwrap();
        assert_ne!(corner.type_index(), bridge);
        Ok(())
    }

    #[test]
    fn test_carve_lower_precedence_leaves_polygon() -> Result<()> {
        let mut mesh = NavMesh::default();
        let bridge = mesh.types_mut().set_type("bridge", 5)?;
        let mud = mesh.types_mut().set_type("mud", 1)?;
        let id = add_square(&mut mesh, 0.0, 0.0, 4.0, bridge)?;
        let before = mesh.polygon(id).unwrap().points().to_vec();

        let report = mesh.carve(
            &PolygonDesc::new(rect(1.0, 1.0, 3.0, 3.0, 0.0)).with_type(mud),
            true,
        )?;
        assert!(report.is_empty());
        assert_eq!(mesh.len(), 1);
        assert_eq!(mesh.polygon(id).unwrap().points(), before.as_slice());
        Ok(())
    }

    #[test]
    fn test_carve_fills_around_protected_polygons() -> Result<()> {
        let mut mesh = NavMesh::default();
        let bridge = mesh.types_mut().set_type("bridge", 5)?;
        let mud = mesh.types_mut().set_type("mud", 1)?;
        let id = add_square(&mut mesh, 0.0, 0.0, 2.0, bridge)?;
        let before = mesh.polygon(id).unwrap().points().to_vec();

        // Mud patch overlapping half the bridge
        let report = mesh.carve(
            &PolygonDesc::new(rect(1.0, 0.0, 4.0, 2.0, 0.0)).with_type(mud),
            true,
        )?;
        assert!(report.removed.is_empty());
        assert!(!report.added.is_empty());
        mesh.validate_links()?;

        // The bridge keeps its outline, possibly with extra vertices on its edges
        let bridge_poly = mesh.polygon(id).unwrap();
        assert!((bridge_poly.area() - 4.0).abs() < 1e-4);
        for p in &before {
            assert!(bridge_poly.points().contains(p));
        }

        // Only the part outside the bridge was filled
        let mud_area: f32 = mesh
            .polygons()
            .filter(|p| p.type_index() == mud)
            .map(|p| p.area())
            .sum();
        assert!((mud_area - 4.0).abs() < 1e-4);
        assert!(bridge_poly.link_count() >= 1);
        Ok(())
    }

    #[test]
    fn test_carve_hole() -> Result<()> {
        let mut mesh = create_grid_mesh(3, 3, 1.0)?;
        let hole = mesh.types_mut().set_type("hole", 10)?;
        let report = mesh.carve(
            &PolygonDesc::new(rect(0.5, 0.5, 2.5, 2.5, 0.0)).with_type(hole),
            false,
        )?;
        // Every square overlaps the patch
        assert_eq!(report.removed.len(), 9);
        assert!((total_area(&mesh) - 5.0).abs() < 1e-4);
        assert!(mesh.polygons().all(|p| p.type_index() == 0));
        assert_eq!(mesh.polygon_id_at(Vec3::new(1.5, 0.0, 1.5)), PolyId::INVALID);
        assert!(mesh.polygon_at(Vec3::new(0.25, 0.0, 0.25)).is_some());
        mesh.validate_links()?;

        // The ring around the hole is still one connected region
        let start = mesh.polygon_id_at(Vec3::new(0.25, 0.0, 0.25));
        let mut seen = vec![start];
        let mut i = 0;
        while i < seen.len() {
            let id = seen[i];
            for edge in 0..mesh.polygon(id).unwrap().size() {
                let other = mesh.linked_id(id, edge);
                if other.is_valid() && !seen.contains(&other) {
                    seen.push(other);
                }
            }
            i += 1;
        }
        assert_eq!(seen.len(), mesh.len());
        Ok(())
    }

    #[test]
    fn test_equal_precedence_policy() -> Result<()> {
        let patch = |ground| PolygonDesc::new(rect(1.0, 1.0, 3.0, 3.0, 0.0)).with_type(ground).with_tag(3);

        let (mut keep, ground) = ground_mesh(NavMeshConfig::default())?;
        let report = keep.carve(&patch(keep.polygon(ground).unwrap().type_index()), true)?;
        assert!(report.removed.is_empty());
        assert_eq!(keep.polygon(ground).unwrap().area(), 16.0);

        let config = NavMeshConfig::new().with_equal_precedence(EqualPrecedence::Overwrite);
        let (mut overwrite, ground) = ground_mesh(config)?;
        let report = overwrite.carve(&patch(overwrite.polygon(ground).unwrap().type_index()), true)?;
        assert_eq!(report.removed, vec![ground]);
        assert!((total_area(&overwrite) - 16.0).abs() < 1e-4);
        let tagged = overwrite.polygon_at(Vec3::new(2.0, 0.0, 2.0)).unwrap();
        assert_eq!(tagged.tag(), 3);
        overwrite.validate_links()?;
        Ok(())
    }

    #[test]
    fn test_carve_concave_patch() -> Result<()> {
        let (mut mesh, _) = ground_mesh(NavMeshConfig::default())?;
        let road = mesh.types_mut().set_type("road", 2)?;
        let l_shape = PolygonDesc::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(4.0, 0.0, 0.0),
            Vec3::new(4.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 4.0),
            Vec3::new(0.0, 0.0, 4.0),
        ])
        .with_type(road);
        mesh.carve(&l_shape, true)?;

        let road_area: f32 = mesh
            .polygons()
            .filter(|p| p.type_index() == road)
            .map(|p| p.area())
            .sum();
        assert!((road_area - 7.0).abs() < 1e-4);
        assert!((total_area(&mesh) - 16.0).abs() < 1e-4);
        mesh.validate_links()?;
        for poly in mesh.polygons() {
            assert!(nav_common::is_convex_2d(poly.points(), 1e-3));
        }
        Ok(())
    }

    #[test]
    fn test_degenerate_patch_is_rejected() -> Result<()> {
        let (mut mesh, ground) = ground_mesh(NavMeshConfig::default())?;
        let line = PolygonDesc::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(2.0, 0.0, 2.0),
        ]);
        assert!(matches!(mesh.carve_with_precedence(&line, 10, true), Err(Error::InvalidPolygon(_))));

        let bow = PolygonDesc::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 2.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 2.0),
        ]);
        assert!(mesh.carve_with_precedence(&bow, 10, false).is_err());

        // The mesh is untouched
        assert_eq!(mesh.len(), 1);
        assert!(mesh.polygon(ground).is_some());
        Ok(())
    }

    #[test]
    fn test_carve_next_to_mesh_links_up() -> Result<()> {
        let (mut mesh, ground) = ground_mesh(NavMeshConfig::default())?;
        let path = mesh.types_mut().set_type("path", 1)?;
        // Extends the square eastwards without overlapping it
        let report = mesh.carve(
            &PolygonDesc::new(rect(4.0, 1.0, 6.0, 3.0, 0.0)).with_type(path),
            true,
        )?;
        assert!(report.removed.is_empty());
        assert_eq!(report.added.len(), 1);
        mesh.validate_links()?;

        // The square gained vertices where the new polygon meets it
        let square = mesh.polygon(ground).unwrap();
        assert_eq!(square.size(), 6);
        assert_eq!(mesh.linked_id(report.added[0], 3), ground);
        Ok(())
    }

    #[test]
    fn test_change_type_merges_neighbours() -> Result<()> {
        let mut mesh = create_grid_mesh(2, 1, 1.0)?;
        let sand = mesh.types_mut().set_type("sand", 0)?;
        add_square(&mut mesh, 0.0, 1.0, 1.0, sand)?;

        // Different tag or type keeps polygons apart
        let absorbed = mesh.change_type(PolyId(0), sand)?;
        assert_eq!(absorbed, vec![PolyId(2)]);
        assert_eq!(mesh.len(), 2);
        let merged = mesh.polygon(PolyId(0)).unwrap();
        assert_eq!(merged.type_index(), sand);
        assert!((merged.area() - 2.0).abs() < 1e-5);
        // Collinear vertices are kept, the east edge is now edge 2
        assert_eq!(merged.size(), 6);
        assert_eq!(mesh.linked_id(PolyId(0), 2), PolyId(1));
        mesh.validate_links()?;

        assert!(mesh.change_type(PolyId(2), sand).is_err());
        assert!(mesh.change_type(PolyId(1), 42).is_err());
        Ok(())
    }
}
