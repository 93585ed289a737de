//! Tests for polygon graph searches, raycasts and point resolution

#[cfg(test)]
mod tests {
    use crate::test_mesh_helpers::{
        add_square, create_fan_corridor, create_gap_mesh, create_grid_mesh, create_pinch_mesh,
        create_row, rect,
    };
    use crate::{Location, NavFilter, PathState, Pathfinder, PathfinderConfig};
    use nav_common::{Ray, Result, Vec3};
    use navmesh::{NavMesh, PolyId, PolygonDesc};

    fn assert_chain(pathfinder: &Pathfinder) {
        let mesh = pathfinder.nav_mesh();
        let path = pathfinder.path();
        for (i, node) in path.iter().enumerate() {
            let next = path.get(i + 1).map_or(pathfinder.end_polygon(), |n| n.poly);
            assert_eq!(mesh.linked_id(node.poly, node.edge), next, "step {}", i);
        }
    }

    fn water_filter(mesh: &NavMesh) -> NavFilter {
        let water = mesh.types().find("water").unwrap();
        NavFilter::ALL.without_type(water)
    }

    #[test]
    fn test_grid_search() -> Result<()> {
        let mesh = create_grid_mesh(3, 3)?;
        let mut pathfinder = Pathfinder::new(&mesh);

        assert_eq!(pathfinder.search_polygons(PolyId(0), PolyId(8)), PathState::Success);
        assert_eq!(pathfinder.path().len(), 4);
        assert!((pathfinder.length() - 4.0).abs() < 1e-4);
        assert_eq!(pathfinder.end_polygon(), PolyId(8));
        assert_eq!(pathfinder.path()[0].poly, PolyId(0));
        assert_chain(&pathfinder);
        Ok(())
    }

    #[test]
    fn test_search_within_one_polygon() -> Result<()> {
        let mesh = create_grid_mesh(3, 3)?;
        let mut pathfinder = Pathfinder::new(&mesh);

        let state = pathfinder.search_points(Vec3::new(1.2, 0.0, 1.2), Vec3::new(1.8, 0.0, 1.7));
        assert_eq!(state, PathState::Success);
        assert!(pathfinder.path().is_empty());
        assert_eq!(pathfinder.end_polygon(), PolyId(4));
        assert_eq!(pathfinder.length(), 0.0);
        Ok(())
    }

    #[test]
    fn test_invalid_searches() -> Result<()> {
        let mesh = create_grid_mesh(3, 3)?;
        let mut pathfinder = Pathfinder::new(&mesh);

        assert_eq!(pathfinder.search_polygons(PolyId(99), PolyId(0)), PathState::Invalid);
        assert_eq!(pathfinder.search_polygons(PolyId(0), PolyId::INVALID), PathState::Invalid);

        let off_mesh = Vec3::new(-5.0, 0.0, -5.0);
        assert_eq!(
            pathfinder.search_points(off_mesh, Vec3::new(0.5, 0.0, 0.5)),
            PathState::Invalid
        );
        assert_eq!(
            pathfinder.search_points(Vec3::new(0.5, 0.0, 0.5), off_mesh),
            PathState::Invalid
        );

        pathfinder.set_filter(NavFilter::NONE);
        assert_eq!(pathfinder.search_polygons(PolyId(0), PolyId(8)), PathState::Invalid);
        assert!(pathfinder.path().is_empty());
        Ok(())
    }

    #[test]
    fn test_filter_blocks_row() -> Result<()> {
        let mut mesh = NavMesh::default();
        let water = mesh.types_mut().set_type("water", 1)?;
        let ids = create_row(&mut mesh, &[0, water, 0])?;

        let mut pathfinder = Pathfinder::new(&mesh);
        assert_eq!(pathfinder.search_polygons(ids[0], ids[2]), PathState::Success);

        // Nothing but the start polygon is reachable
        pathfinder.set_filter(water_filter(&mesh));
        assert_eq!(pathfinder.state(), PathState::None);
        assert_eq!(pathfinder.search_polygons(ids[0], ids[2]), PathState::Fail);
        assert!(pathfinder.path().is_empty());
        Ok(())
    }

    #[test]
    fn test_filter_detour() -> Result<()> {
        let mut mesh = NavMesh::default();
        let water = mesh.types_mut().set_type("water", 1)?;
        // 3 x 2 with water in the middle of the bottom row
        for z in 0..2 {
            for x in 0..3 {
                let t = if x == 1 && z == 0 { water } else { 0 };
                add_square(&mut mesh, x as f32, z as f32, t)?;
            }
        }

        let mut pathfinder = Pathfinder::new(&mesh);
        assert_eq!(pathfinder.search_polygons(PolyId(0), PolyId(2)), PathState::Success);
        assert_eq!(pathfinder.path().len(), 2);

        pathfinder.set_filter(water_filter(&mesh));
        assert_eq!(pathfinder.search_polygons(PolyId(0), PolyId(2)), PathState::Success);
        let polys: Vec<PolyId> = pathfinder.path().iter().map(|n| n.poly).collect();
        assert_eq!(polys, vec![PolyId(0), PolyId(3), PolyId(4), PolyId(5)]);
        assert!((pathfinder.length() - 4.0).abs() < 1e-4);
        assert_chain(&pathfinder);
        Ok(())
    }

    #[test]
    fn test_partial_path_to_closest_polygon() -> Result<()> {
        let mut mesh = NavMesh::default();
        let water = mesh.types_mut().set_type("water", 1)?;
        let ids = create_row(&mut mesh, &[0, 0, water])?;

        let mut pathfinder = Pathfinder::new(&mesh);
        pathfinder.set_filter(water_filter(&mesh));
        assert_eq!(pathfinder.search_polygons(ids[0], ids[2]), PathState::Partial);
        assert_eq!(pathfinder.end_polygon(), ids[1]);
        assert_eq!(pathfinder.path().len(), 1);
        assert_chain(&pathfinder);

        let config = PathfinderConfig::new().with_allow_partial(false);
        let mut strict = Pathfinder::with_config(&mesh, config)?;
        strict.set_filter(water_filter(&mesh));
        assert_eq!(strict.search_polygons(ids[0], ids[2]), PathState::Fail);
        Ok(())
    }

    #[test]
    fn test_narrow_link_rejected_by_radius() -> Result<()> {
        let (mesh, west, east) = create_gap_mesh()?;

        let mut pathfinder = Pathfinder::with_config(&mesh, PathfinderConfig::new().with_radius(0.1))?;
        assert_eq!(pathfinder.search_polygons(west, east), PathState::Success);
        assert_eq!(pathfinder.path().len(), 1);

        pathfinder.set_radius(0.3);
        assert_eq!(pathfinder.search_polygons(west, east), PathState::Fail);
        Ok(())
    }

    #[test]
    fn test_search_blocked_by_pinch() -> Result<()> {
        let (mesh, pinch, east) = create_pinch_mesh()?;
        let start = Location::new(Vec3::new(1.0, 0.0, 0.5));
        let goal = Location::new(Vec3::new(7.0, 0.0, 3.0));

        let mut pathfinder = Pathfinder::with_config(&mesh, PathfinderConfig::new().with_radius(2.5))?;
        assert_eq!(pathfinder.search(&start, &goal), PathState::Fail);

        pathfinder.set_radius(2.0);
        assert_eq!(pathfinder.search(&start, &goal), PathState::Success);
        assert_eq!(pathfinder.path()[0].poly, pinch);
        assert_eq!(pathfinder.end_polygon(), east);
        Ok(())
    }

    #[test]
    fn test_search_through_triangle_fan() -> Result<()> {
        let mesh = create_fan_corridor()?;
        let start = Vec3::new(-1.0, 0.0, 1.0);
        let goal = Vec3::new(3.0, 0.0, 1.0);

        for radius in [0.3, 0.6] {
            let mut pathfinder =
                Pathfinder::with_config(&mesh, PathfinderConfig::new().with_radius(radius))?;
            assert_eq!(pathfinder.search_points(start, goal), PathState::Success, "radius {}", radius);
            assert_eq!(pathfinder.end_polygon(), PolyId(5));
            assert_chain(&pathfinder);
        }

        // Wider than the links between the triangles
        let mut pathfinder = Pathfinder::with_config(&mesh, PathfinderConfig::new().with_radius(0.8))?;
        assert_ne!(pathfinder.search_points(start, goal), PathState::Success);
        Ok(())
    }

    #[test]
    fn test_iteration_limit() -> Result<()> {
        let mesh = create_grid_mesh(10, 1)?;

        let config = PathfinderConfig::new().with_max_iterations(3);
        let mut pathfinder = Pathfinder::with_config(&mesh, config.clone())?;
        assert_eq!(pathfinder.search_polygons(PolyId(0), PolyId(9)), PathState::Partial);
        assert_eq!(pathfinder.path().len(), 2);
        assert_eq!(pathfinder.end_polygon(), PolyId(2));

        let mut strict = Pathfinder::with_config(&mesh, config.with_allow_partial(false))?;
        assert_eq!(strict.search_polygons(PolyId(0), PolyId(9)), PathState::Fail);
        Ok(())
    }

    #[test]
    fn test_max_step() -> Result<()> {
        let mut mesh = NavMesh::default();
        mesh.add_polygon(&PolygonDesc::new(rect(0.0, 0.0, 1.0, 1.0, 0.0)))?;
        mesh.add_polygon(&PolygonDesc::new(rect(1.0, 0.0, 2.0, 1.0, 0.3)))?;
        assert_eq!(mesh.link_count(), 1);

        let mut low = Pathfinder::with_config(&mesh, PathfinderConfig::new().with_max_step(0.2))?;
        assert_eq!(low.search_polygons(PolyId(0), PolyId(1)), PathState::Fail);

        let mut high = Pathfinder::with_config(&mesh, PathfinderConfig::new().with_max_step(0.5))?;
        assert_eq!(high.search_polygons(PolyId(0), PolyId(1)), PathState::Success);
        Ok(())
    }

    #[test]
    fn test_search_any_picks_nearest_goal() -> Result<()> {
        let mesh = create_grid_mesh(5, 1)?;
        let mut pathfinder = Pathfinder::new(&mesh);

        let start = Location::new(Vec3::new(2.5, 0.0, 0.5));
        let goals = [
            Location::new(Vec3::new(10.0, 0.0, 10.0)),
            Location::new(Vec3::new(4.5, 0.0, 0.5)),
            Location::new(Vec3::new(1.5, 0.0, 0.5)),
        ];
        let (state, index) = pathfinder.search_any(&start, &goals);
        assert_eq!(state, PathState::Success);
        assert_eq!(index, Some(2));
        assert_eq!(pathfinder.end_polygon(), PolyId(1));

        // Only unresolvable goals
        let (state, index) = pathfinder.search_any(&start, &goals[..1]);
        assert_eq!(state, PathState::Invalid);
        assert_eq!(index, None);
        Ok(())
    }

    #[test]
    fn test_ray_segment() -> Result<()> {
        let mut mesh = NavMesh::default();
        let water = mesh.types_mut().set_type("water", 1)?;
        let ids = create_row(&mut mesh, &[0, 0, water])?;
        let pathfinder = Pathfinder::new(&mesh);

        let start = Vec3::new(0.5, 0.0, 0.5);
        assert!(pathfinder.ray_segment(start, Vec3::new(2.5, 0.0, 0.5), ids[0], NavFilter::ALL));
        assert!(pathfinder.ray_segment(start, Vec3::new(0.8, 0.0, 0.9), ids[0], NavFilter::ALL));
        // Leaves the mesh
        assert!(!pathfinder.ray_segment(start, Vec3::new(3.5, 0.0, 0.5), ids[0], NavFilter::ALL));
        assert!(!pathfinder.ray_segment(start, Vec3::new(1.5, 0.0, 1.8), ids[0], NavFilter::ALL));
        // Enters a filtered polygon
        let filter = water_filter(&mesh);
        assert!(!pathfinder.ray_segment(start, Vec3::new(2.5, 0.0, 0.5), ids[0], filter));
        assert!(pathfinder.ray_segment(start, Vec3::new(1.5, 0.0, 0.5), ids[0], filter));
        // Unknown start polygon falls back to a lookup
        assert!(pathfinder.ray_segment(start, Vec3::new(2.5, 0.0, 0.5), PolyId::INVALID, NavFilter::ALL));
        Ok(())
    }

    #[test]
    fn test_ray_distance() -> Result<()> {
        let mesh = create_grid_mesh(3, 1)?;
        let pathfinder = Pathfinder::new(&mesh);
        let origin = Vec3::new(0.5, 0.0, 0.5);

        let east = Ray::new(origin, Vec3::new(1.0, 0.0, 0.0));
        assert!((pathfinder.ray(&east, 10.0, PolyId(0), NavFilter::ALL) - 2.5).abs() < 1e-4);
        assert_eq!(pathfinder.ray(&east, 1.0, PolyId(0), NavFilter::ALL), 1.0);

        let west = Ray::new(origin, Vec3::new(-2.0, 0.0, 0.0));
        assert!((pathfinder.ray(&west, 10.0, PolyId(0), NavFilter::ALL) - 0.5).abs() < 1e-4);

        let off_mesh = Ray::new(Vec3::new(-1.0, 0.0, 0.5), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(pathfinder.ray(&off_mesh, 10.0, PolyId::INVALID, NavFilter::ALL), 0.0);
        Ok(())
    }

    #[test]
    fn test_resolve_point() -> Result<()> {
        let mesh = create_grid_mesh(3, 1)?;
        let pathfinder = Pathfinder::new(&mesh);

        // Snapped onto the south wall, then pushed in by the radius
        let (poly, p) = pathfinder
            .resolve_point(Vec3::new(1.5, 0.0, -0.5), 0.2, 1.0, 4)
            .unwrap();
        assert_eq!(poly, PolyId(1));
        assert!((p - Vec3::new(1.5, 0.0, 0.2)).length() < 1e-4);

        // Inside and clear of the walls
        let inside = Vec3::new(1.5, 0.0, 0.5);
        assert_eq!(pathfinder.resolve_point(inside, 0.2, 1.0, 4), Some((PolyId(1), inside)));

        assert!(pathfinder
            .resolve_point(Vec3::new(1.5, 0.0, -5.0), 0.2, 1.0, 4)
            .is_none());
        Ok(())
    }

    #[test]
    fn test_check_traversal_uses_radius() -> Result<()> {
        let (mesh, pinch, _) = create_pinch_mesh()?;
        let a = Vec3::new(1.0, 0.0, 0.5);
        let b = Vec3::new(6.0, 0.0, 3.0);

        let wide = Pathfinder::with_config(&mesh, PathfinderConfig::new().with_radius(2.5))?;
        assert!(!wide.check_traversal(pinch, a, b));
        let narrow = Pathfinder::with_config(&mesh, PathfinderConfig::new().with_radius(2.0))?;
        assert!(narrow.check_traversal(pinch, a, b));
        Ok(())
    }

    #[test]
    fn test_invalid_config_rejected() -> Result<()> {
        let mesh = create_grid_mesh(1, 1)?;
        assert!(Pathfinder::with_config(&mesh, PathfinderConfig::new().with_radius(-1.0)).is_err());
        Ok(())
    }

    #[test]
    fn test_random_grid_searches() -> Result<()> {
        let (cols, rows) = (6, 5);
        let mesh = create_grid_mesh(cols, rows)?;
        let mut pathfinder = Pathfinder::new(&mesh);
        let mut rng = fastrand::Rng::with_seed(42);

        for _ in 0..50 {
            let (sx, sz) = (rng.usize(..cols), rng.usize(..rows));
            let (gx, gz) = (rng.usize(..cols), rng.usize(..rows));
            let start = Vec3::new(sx as f32 + rng.f32(), 0.0, sz as f32 + rng.f32());
            let goal = Vec3::new(gx as f32 + rng.f32(), 0.0, gz as f32 + rng.f32());
            let goal_poly = PolyId((gz * cols + gx) as u32);

            assert_eq!(pathfinder.search_points(start, goal), PathState::Success);
            assert_eq!(pathfinder.end_polygon(), goal_poly);
            assert_chain(&pathfinder);

            // Every step crosses one shared edge of the grid
            let cells = sx.abs_diff(gx) + sz.abs_diff(gz);
            assert!(pathfinder.path().len() >= cells);
            if cells > 0 {
                assert_eq!(pathfinder.path()[0].poly, PolyId((sz * cols + sx) as u32));
                assert!(pathfinder.length() > 0.0);
            }
        }
        Ok(())
    }
}
