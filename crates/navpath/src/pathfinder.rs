//! Polygon graph search
//!
//! The [`Pathfinder`] runs A* over the polygons of a borrowed [`NavMesh`].
//! Nodes are polygons and the cost of crossing a link is its centre to centre
//! distance. The heuristic is the planar distance from a polygon centre to the
//! nearest goal position.
//!
//! A link is never crossed when:
//! - it is narrower than the agent diameter,
//! - its height step exceeds the configured maximum,
//! - the filter excludes the polygon on the other side,
//! - a traversal threshold inside the current polygon is too narrow for the
//!   agent between its entry point and the link.
//!
//! When the goal cannot be reached the search can fall back to a partial path
//! ending at the polygon that got closest to the goal.

use nav_common::{
    closest_point_on_segment_2d, dist_2d, dist_sqr_2d, intersect_segment_poly_2d, Ray, Result, Vec3,
};
use navmesh::{NavMesh, NavPoly, PolyId};

use crate::config::PathfinderConfig;
use crate::nav_filter::NavFilter;
use crate::search_node::{NodePool, NodeState, SearchNode};

/// Outcome of the last search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum PathState {
    /// No search has run since the last reset
    #[default]
    None,
    /// The goal polygon was reached
    Success,
    /// No path exists under the current filter
    Fail,
    /// The path ends at the reachable polygon closest to the goal
    Partial,
    /// The start or goal could not be resolved, or the filter is empty
    Invalid,
}

/// A position with an optional known polygon.
///
/// With [`PolyId::INVALID`] the polygon is looked up from the position.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct Location {
    pub position: Vec3,
    pub polygon: PolyId,
}

impl Location {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            polygon: PolyId::INVALID,
        }
    }

    pub fn with_polygon(position: Vec3, polygon: PolyId) -> Self {
        Self { position, polygon }
    }
}

/// One step of a path: the polygon and the edge the path leaves it through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct PathNode {
    pub poly: PolyId,
    pub edge: usize,
}

/// Graph search over a navigation mesh
#[derive(Debug)]
pub struct Pathfinder<'a> {
    nav_mesh: &'a NavMesh,
    filter: NavFilter,
    config: PathfinderConfig,
    path: Vec<PathNode>,
    length: f32,
    end_polygon: PolyId,
    state: PathState,
    pool: NodePool,
}

impl<'a> Pathfinder<'a> {
    /// Creates a pathfinder with the default configuration
    pub fn new(nav_mesh: &'a NavMesh) -> Self {
        Self {
            nav_mesh,
            filter: NavFilter::ALL,
            config: PathfinderConfig::default(),
            path: Vec::new(),
            length: 0.0,
            end_polygon: PolyId::INVALID,
            state: PathState::None,
            pool: NodePool::default(),
        }
    }

    /// Creates a pathfinder with a validated configuration
    pub fn with_config(nav_mesh: &'a NavMesh, config: PathfinderConfig) -> Result<Self> {
        config.validate()?;
        let mut pathfinder = Self::new(nav_mesh);
        pathfinder.config = config;
        Ok(pathfinder)
    }

    pub fn nav_mesh(&self) -> &'a NavMesh {
        self.nav_mesh
    }

    /// Switches to another mesh and clears the current path
    pub fn set_nav_mesh(&mut self, nav_mesh: &'a NavMesh) {
        self.nav_mesh = nav_mesh;
        self.clear();
    }

    pub fn filter(&self) -> NavFilter {
        self.filter
    }

    /// Changes the filter and clears the current path
    pub fn set_filter(&mut self, filter: NavFilter) {
        self.filter = filter;
        self.clear();
    }

    pub fn config(&self) -> &PathfinderConfig {
        &self.config
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.config.radius = radius.max(0.0);
    }

    pub fn state(&self) -> PathState {
        self.state
    }

    /// Path of the last search, excluding the final polygon
    pub fn path(&self) -> &[PathNode] {
        &self.path
    }

    /// Summed link cost of the last path
    pub fn length(&self) -> f32 {
        self.length
    }

    /// Polygon the last path ends in: the goal polygon on success, the closest
    /// reachable polygon for a partial path
    pub fn end_polygon(&self) -> PolyId {
        self.end_polygon
    }

    /// Resets the path and state
    pub fn clear(&mut self) {
        self.path.clear();
        self.length = 0.0;
        self.end_polygon = PolyId::INVALID;
        self.state = PathState::None;
    }

    // ==== Searching ==== //

    /// Searches between two polygons, from centre to centre
    pub fn search_polygons(&mut self, start: PolyId, goal: PolyId) -> PathState {
        let (Some(a), Some(b)) = (self.nav_mesh.polygon(start), self.nav_mesh.polygon(goal)) else {
            self.clear();
            self.state = PathState::Invalid;
            return self.state;
        };
        self.search(
            &Location::with_polygon(a.centre(), start),
            &Location::with_polygon(b.centre(), goal),
        )
    }

    /// Searches between two positions
    pub fn search_points(&mut self, start: Vec3, goal: Vec3) -> PathState {
        self.search(&Location::new(start), &Location::new(goal))
    }

    pub fn search(&mut self, start: &Location, goal: &Location) -> PathState {
        self.search_any(start, std::slice::from_ref(goal)).0
    }

    /// Searches towards whichever goal is reached first.
    ///
    /// Goals that cannot be resolved to a polygon are ignored. Returns the
    /// state and the index of the goal the path leads to.
    pub fn search_any(&mut self, start: &Location, goals: &[Location]) -> (PathState, Option<usize>) {
        self.clear();
        self.state = PathState::Invalid;
        if self.filter.is_empty() {
            return (self.state, None);
        }
        let Some(start_poly) = self.resolve_location(start) else {
            return (self.state, None);
        };
        let targets: Vec<(usize, PolyId, Vec3)> = goals
            .iter()
            .enumerate()
            .filter_map(|(i, goal)| self.resolve_location(goal).map(|poly| (i, poly, goal.position)))
            .collect();
        if targets.is_empty() {
            return (self.state, None);
        }

        if let Some(&(index, _, _)) = targets.iter().find(|t| t.1 == start_poly) {
            self.end_polygon = start_poly;
            self.state = PathState::Success;
            return (self.state, Some(index));
        }

        let (state, goal_index) = self.run_search(start_poly, start.position, &targets);
        self.state = state;
        log::debug!(
            "Search from {} finished as {:?} with {} steps, length {:.2}",
            start_poly,
            state,
            self.path.len(),
            self.length
        );
        (state, goal_index)
    }

    fn run_search(
        &mut self,
        start_poly: PolyId,
        start_pos: Vec3,
        targets: &[(usize, PolyId, Vec3)],
    ) -> (PathState, Option<usize>) {
        let mesh = self.nav_mesh;
        let heuristic = |p: Vec3| -> (f32, usize) {
            targets
                .iter()
                .map(|t| (dist_2d(p, t.2), t.0))
                .fold((f32::MAX, 0), |best, cur| if cur.0 < best.0 { cur } else { best })
        };

        self.pool.clear();
        let (start_h, start_goal) = heuristic(start_pos);
        let start = self.pool.push(SearchNode {
            poly: start_poly,
            parent: None,
            pos: start_pos,
            g: 0.0,
            h: start_h,
            state: NodeState::Open,
        });

        let mut best = (start, start_h, start_goal);
        let mut found = None;
        let mut iterations = 0;

        while let Some(current) = self.pool.pop() {
            iterations += 1;
            let node = self.pool.node(current).clone();
            if let Some(target) = targets.iter().find(|t| t.1 == node.poly) {
                found = Some((current, target.0));
                break;
            }
            let Some(poly) = mesh.polygon(node.poly) else {
                continue;
            };
            if node.h < best.1 {
                best = (current, node.h, heuristic(poly.centre()).1);
            }
            if iterations >= self.config.max_iterations {
                log::debug!("Search hit the iteration limit of {}", self.config.max_iterations);
                break;
            }

            for edge in 0..poly.size() {
                let Some((next, mid, cost)) = self.crossing(poly, edge, node.pos) else {
                    continue;
                };
                let g = node.g + cost;
                match self.pool.find(next.id()) {
                    Some(index) => {
                        let existing = self.pool.node(index);
                        if existing.state == NodeState::Closed || existing.g <= g {
                            continue;
                        }
                        self.pool.update(index, (current, edge), mid, g);
                    }
                    None => {
                        self.pool.push(SearchNode {
                            poly: next.id(),
                            parent: Some((current, edge)),
                            pos: mid,
                            g,
                            h: heuristic(next.centre()).0,
                            state: NodeState::Open,
                        });
                    }
                }
            }
        }

        match found {
            Some((index, goal)) => {
                self.build_path(index);
                (PathState::Success, Some(goal))
            }
            None if self.config.allow_partial && best.0 != start => {
                self.build_path(best.0);
                (PathState::Partial, Some(best.2))
            }
            None => (PathState::Fail, None),
        }
    }

    /// The polygon across `edge`, the middle of the edge and the link cost, if
    /// an agent entering `poly` at `entry` may cross it
    fn crossing(&self, poly: &NavPoly, edge: usize, entry: Vec3) -> Option<(&'a NavPoly, Vec3, f32)> {
        let mesh = self.nav_mesh;
        let link = mesh.link(poly.link(edge)?)?;
        let next = mesh.linked_polygon(poly.id(), edge)?;
        if link.width < self.config.radius * 2.0
            || link.step > self.config.max_step
            || !self.filter.has_type(next.type_index())
        {
            return None;
        }
        let (a, b) = poly.edge_points(edge);
        let mid = (a + b) * 0.5;
        if !mesh.check_traversal(poly.id(), entry, mid, self.config.radius) {
            return None;
        }
        Some((next, mid, link.distance))
    }

    fn build_path(&mut self, index: usize) {
        self.path = self
            .pool
            .route(index)
            .into_iter()
            .map(|(node, edge)| PathNode {
                poly: self.pool.node(node).poly,
                edge,
            })
            .collect();
        let end = self.pool.node(index);
        self.length = end.g;
        self.end_polygon = end.poly;
    }

    fn resolve_location(&self, location: &Location) -> Option<PolyId> {
        if location.polygon.is_valid() {
            self.nav_mesh.polygon(location.polygon).map(|p| p.id())
        } else {
            self.nav_mesh.polygon_at(location.position).map(|p| p.id())
        }
    }

    // ==== Line of sight ==== //

    /// Whether the straight line from `start` to `end` stays on the mesh.
    ///
    /// Walks from polygon to polygon, starting at `poly` when it contains
    /// `start`. Stops at unlinked edges, links narrower than the agent and
    /// polygons `filter` excludes.
    pub fn ray_segment(&self, start: Vec3, end: Vec3, poly: PolyId, filter: NavFilter) -> bool {
        self.walk(start, end, poly, filter).is_none()
    }

    /// Distance along `ray` to the first obstruction, or `limit` when there is
    /// none within it. Zero when the ray starts off the mesh.
    pub fn ray(&self, ray: &Ray, limit: f32, poly: PolyId, filter: NavFilter) -> f32 {
        let dir = ray.direction.normalize_or_zero();
        if dir == Vec3::ZERO || limit <= 0.0 {
            return limit.max(0.0);
        }
        let end = ray.origin + dir * limit;
        match self.walk(ray.origin, end, poly, filter) {
            Some(t) => t * limit,
            None => limit,
        }
    }

    /// `None` when `end` is reached, otherwise the fraction of the segment
    /// where it is blocked
    fn walk(&self, start: Vec3, end: Vec3, poly: PolyId, filter: NavFilter) -> Option<f32> {
        let mesh = self.nav_mesh;
        let mut current = match mesh.polygon(poly) {
            Some(p) if mesh.is_inside_polygon(start, p) => p,
            _ => match mesh.polygon_at(start) {
                Some(p) => p,
                None => return Some(0.0),
            },
        };

        let mut t = 0.0;
        for _ in 0..=mesh.len() {
            if mesh.is_inside_polygon(end, current) {
                return None;
            }
            let Some(hit) = intersect_segment_poly_2d(start, end, current.points()) else {
                return Some(t);
            };
            let Some(edge) = hit.seg_max else {
                return None;
            };
            t = hit.tmax.max(t);
            let Some(link) = current.link(edge).and_then(|id| mesh.link(id)) else {
                return Some(t);
            };
            let Some(next) = mesh.linked_polygon(current.id(), edge) else {
                return Some(t);
            };
            if !filter.has_type(next.type_index()) || link.width < self.config.radius * 2.0 {
                return Some(t);
            }
            current = next;
        }
        Some(t)
    }

    // ==== Point resolution ==== //

    /// Moves a point onto the mesh.
    ///
    /// A point outside every polygon is snapped to the closest polygon within
    /// `search`. With a positive `radius` the point is then pushed away from
    /// boundary edges closer than `radius`, over at most `iterations` passes.
    pub fn resolve_point(
        &self,
        point: Vec3,
        radius: f32,
        search: f32,
        iterations: usize,
    ) -> Option<(PolyId, Vec3)> {
        let mesh = self.nav_mesh;
        let mut pt = point;
        let mut poly = match mesh.polygon_at(pt) {
            Some(p) => p.id(),
            None => {
                let (id, closest) = mesh.closest_polygon(pt, search)?;
                pt = closest;
                id
            }
        };
        if radius <= 0.0 {
            return Some((poly, pt));
        }

        for _ in 0..iterations {
            let Some(hit) = mesh.closest_boundary(pt, poly, radius) else {
                return Some((poly, pt));
            };
            let Some((a, b)) = mesh.edge_points(hit.poly, hit.edge) else {
                break;
            };
            let inward = Vec3::new(a.z - b.z, 0.0, b.x - a.x).normalize_or_zero();
            let close = Vec3::new(hit.point.x, pt.y, hit.point.z);
            let mut resolve = Vec3::new(pt.x - close.x, 0.0, pt.z - close.z);
            if resolve.length_squared() < 1e-6 {
                resolve = inward;
            }
            let resolve = resolve.normalize_or_zero();
            let mut penetration = radius - dist_2d(pt, close);
            if resolve.dot(inward) < 0.0 {
                // Outside the wall, cross it and keep going
                penetration -= radius * 2.0;
            }
            pt += resolve * penetration;
            if let Some(p) = mesh.polygon_at(pt) {
                poly = p.id();
            }
        }

        mesh.polygon_at(pt).map(|p| (p.id(), pt))
    }

    /// Whether the agent fits when moving from `a` to `b` inside `poly`
    pub fn check_traversal(&self, poly: PolyId, a: Vec3, b: Vec3) -> bool {
        self.nav_mesh.check_traversal(poly, a, b, self.config.radius)
    }

    /// Closest point of `poly` to `target` on the XZ plane, height kept from
    /// the polygon boundary
    pub(crate) fn closest_point_in(&self, poly: PolyId, target: Vec3) -> Option<Vec3> {
        let p = self.nav_mesh.polygon(poly)?;
        if self.nav_mesh.is_inside_polygon(target, p) {
            return Some(target);
        }
        (0..p.size())
            .map(|edge| {
                let (a, b) = p.edge_points(edge);
                closest_point_on_segment_2d(target, a, b).0
            })
            .min_by(|x, y| dist_sqr_2d(target, *x).total_cmp(&dist_sqr_2d(target, *y)))
    }
}
