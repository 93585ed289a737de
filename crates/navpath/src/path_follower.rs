//! Agent level path following
//!
//! A [`PathFollower`] keeps track of where an agent is on the mesh, holds the
//! path to its goal and hands out steering targets. Targets are the corners of
//! the string pulled path through the remaining portals, with every portal
//! narrowed by the agent radius so corners keep the agent off the walls.

use nav_common::{
    cross_2d, dist_2d, dist_segment_segment_sqr_2d, dist_sqr_2d, edge_normal_2d, intersect_lines_2d,
    Result, Vec3,
};
use navmesh::{NavMesh, PolyId, TypeIndex};

use crate::config::PathfinderConfig;
use crate::nav_filter::NavFilter;
use crate::pathfinder::{Location, PathState, Pathfinder};

/// Number of path steps checked ahead of the current one when the agent
/// leaves its polygon
const LOOK_AHEAD: usize = 3;

/// Default search distance when resolving goals onto the mesh
const GOAL_SEARCH: f32 = 1.0;

/// Passes used when pushing goals away from walls
const RESOLVE_ITERATIONS: usize = 4;

/// Points closer than this are treated as the same funnel point
const FUNNEL_EPSILON: f32 = 1e-6;

/// Steering target and the point after it
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct VecPair {
    pub first: Vec3,
    pub second: Vec3,
}

impl VecPair {
    pub fn new(first: Vec3, second: Vec3) -> Self {
        Self { first, second }
    }
}

impl From<Vec3> for VecPair {
    fn from(p: Vec3) -> Self {
        Self::new(p, p)
    }
}

/// Follows paths across a navigation mesh for one agent
#[derive(Debug)]
pub struct PathFollower<'a> {
    pathfinder: Pathfinder<'a>,
    path_index: usize,
    polygon: PolyId,
    goal_poly: PolyId,
    position: Vec3,
    goal: Vec3,
    /// Where the current path ends: the goal, or the closest point of the last
    /// polygon of a partial path
    end: Vec3,
    radius: f32,
    goal_index: Option<usize>,
}

impl<'a> PathFollower<'a> {
    pub fn new(nav_mesh: &'a NavMesh) -> Self {
        Self {
            pathfinder: Pathfinder::new(nav_mesh),
            path_index: 0,
            polygon: PolyId::INVALID,
            goal_poly: PolyId::INVALID,
            position: Vec3::ZERO,
            goal: Vec3::ZERO,
            end: Vec3::ZERO,
            radius: 0.0,
            goal_index: None,
        }
    }

    /// Creates a follower whose agent radius comes from `config`
    pub fn with_config(nav_mesh: &'a NavMesh, config: PathfinderConfig) -> Result<Self> {
        let radius = config.radius;
        let mut follower = Self::new(nav_mesh);
        follower.pathfinder = Pathfinder::with_config(nav_mesh, config)?;
        follower.radius = radius;
        Ok(follower)
    }

    pub fn nav_mesh(&self) -> &'a NavMesh {
        self.pathfinder.nav_mesh()
    }

    /// Switches to another mesh. The current polygon is looked up again.
    pub fn set_nav_mesh(&mut self, nav_mesh: &'a NavMesh) {
        self.pathfinder.set_nav_mesh(nav_mesh);
        self.path_index = 0;
        self.polygon = nav_mesh.polygon_id_at(self.position);
        self.goal_poly = PolyId::INVALID;
    }

    pub fn pathfinder(&self) -> &Pathfinder<'a> {
        &self.pathfinder
    }

    pub fn set_filter(&mut self, filter: NavFilter) {
        self.pathfinder.set_filter(filter);
        self.path_index = 0;
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Sets the agent radius used for searching and steering
    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius.max(0.0);
        self.pathfinder.set_radius(self.radius);
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn goal(&self) -> Vec3 {
        self.goal
    }

    /// Goal chosen by the last [`PathFollower::set_goals`]
    pub fn goal_index(&self) -> Option<usize> {
        self.goal_index
    }

    pub fn state(&self) -> PathState {
        self.pathfinder.state()
    }

    /// Polygon the agent is in, [`PolyId::INVALID`] when off the mesh
    pub fn polygon_id(&self) -> PolyId {
        self.polygon
    }

    /// Updates the agent position and the polygon it is in
    pub fn set_position(&mut self, p: Vec3) {
        self.position = p;
        let mesh = self.nav_mesh();
        let current = mesh.polygon(self.polygon);
        if current.is_some_and(|poly| mesh.is_inside_polygon(p, poly)) {
            return;
        }

        let following = matches!(self.state(), PathState::Success | PathState::Partial);
        let path_len = self.pathfinder.path().len();
        if current.is_some() && following && self.path_index < path_len {
            // A few steps further along the path
            let last = (self.path_index + LOOK_AHEAD).min(path_len);
            for i in self.path_index + 1..=last {
                let id = self.step_polygon(i);
                if mesh.polygon(id).is_some_and(|poly| mesh.is_inside_polygon(p, poly)) {
                    self.path_index = i;
                    self.polygon = id;
                    return;
                }
            }
            if mesh
                .polygon(self.goal_poly)
                .is_some_and(|poly| mesh.is_inside_polygon(p, poly))
            {
                self.path_index = path_len;
                self.polygon = self.goal_poly;
                return;
            }
            log::warn!("Position ({:.2}, {:.2}) is not on the path", p.x, p.z);
        }

        self.polygon = mesh.polygon_id_at(p);
        if !self.polygon.is_valid() {
            log::warn!("Position ({:.2}, {:.2}) is not on the navmesh", p.x, p.z);
        } else if following {
            self.repath();
        }
    }

    /// Moves `pos` onto the mesh within `search` and sets it as the position
    pub fn set_position_and_resolve(&mut self, pos: Vec3, search: f32) -> bool {
        match self.resolve_point(pos, self.radius, search) {
            Some(resolved) => {
                self.set_position(resolved);
                true
            }
            None => false,
        }
    }

    /// Sets a new goal and searches for a path to it.
    ///
    /// Returns false when the goal is off the mesh or no path, not even a
    /// partial one, was found.
    pub fn set_goal(&mut self, target: Vec3) -> bool {
        let Some((poly, goal)) =
            self.pathfinder
                .resolve_point(target, self.radius, GOAL_SEARCH, RESOLVE_ITERATIONS)
        else {
            log::warn!("Failed to resolve goal ({:.2}, {:.2}) onto the navmesh", target.x, target.z);
            self.stop();
            return false;
        };
        self.goal = goal;
        self.goal_poly = poly;
        self.goal_index = None;
        matches!(self.repath(), PathState::Success | PathState::Partial)
    }

    /// Searches for a path to whichever goal is reached first.
    ///
    /// Returns the index of that goal, or `None` when no goal can be reached.
    pub fn set_goals(&mut self, targets: &[Vec3]) -> Option<usize> {
        let goals: Vec<Location> = targets
            .iter()
            .map(|&t| {
                match self
                    .pathfinder
                    .resolve_point(t, self.radius, GOAL_SEARCH, RESOLVE_ITERATIONS)
                {
                    Some((poly, p)) => Location::with_polygon(p, poly),
                    None => Location::new(t),
                }
            })
            .collect();

        let start = Location::with_polygon(self.position, self.polygon);
        let (state, index) = self.pathfinder.search_any(&start, &goals);
        self.path_index = 0;
        self.goal_index = index;
        match (state, index) {
            (PathState::Success | PathState::Partial, Some(i)) => {
                self.goal = goals[i].position;
                self.goal_poly = self.nav_mesh().polygon_id_at(self.goal);
                self.update_end();
                Some(i)
            }
            _ => None,
        }
    }

    /// Searches again from the current position to the goal
    pub fn repath(&mut self) -> PathState {
        self.path_index = 0;
        if !self.polygon.is_valid() {
            self.polygon = self.nav_mesh().polygon_id_at(self.position);
        }
        let goal_poly = self.nav_mesh().polygon_id_at(self.goal);
        if goal_poly.is_valid() {
            self.goal_poly = goal_poly;
        }
        let state = self.pathfinder.search(
            &Location::with_polygon(self.position, self.polygon),
            &Location::with_polygon(self.goal, self.goal_poly),
        );
        self.update_end();
        state
    }

    /// Drops the path and makes the current position the goal
    pub fn stop(&mut self) {
        self.goal = self.position;
        self.goal_poly = self.polygon;
        self.end = self.position;
        self.goal_index = None;
        self.path_index = 0;
        self.pathfinder.clear();
    }

    /// Whether the agent is within `threshold` of the goal on the XZ plane
    pub fn at_goal(&self, threshold: f32) -> bool {
        dist_sqr_2d(self.position, self.goal) <= threshold * threshold
    }

    /// Index into the path of the next polygon of `type_index` ahead of the
    /// agent, skipping the first `skip` matches
    pub fn find_next_polygon(&self, type_index: TypeIndex, skip: usize) -> Option<usize> {
        let mesh = self.nav_mesh();
        self.pathfinder
            .path()
            .iter()
            .enumerate()
            .skip(self.path_index)
            .filter(|(_, node)| {
                mesh.polygon(node.poly)
                    .is_some_and(|poly| poly.type_index() == type_index)
            })
            .nth(skip)
            .map(|(i, _)| i)
    }

    /// Polygon the agent is in at path step `i`. One past the last path node
    /// is the polygon the path ends in.
    fn step_polygon(&self, i: usize) -> PolyId {
        self.pathfinder
            .path()
            .get(i)
            .map_or(self.pathfinder.end_polygon(), |node| node.poly)
    }

    fn update_end(&mut self) {
        self.end = match self.state() {
            PathState::Partial => self
                .pathfinder
                .closest_point_in(self.pathfinder.end_polygon(), self.goal)
                .unwrap_or(self.goal),
            _ => self.goal,
        };
    }

    // ==== Steering ==== //

    /// Next point to head for, and the point after it.
    ///
    /// Returns the current position when there is nowhere to go or the path
    /// had to be searched again.
    pub fn next_point(&mut self) -> VecPair {
        if !matches!(self.state(), PathState::Success | PathState::Partial) {
            return VecPair::from(self.position);
        }
        if dist_sqr_2d(self.position, self.end) <= self.radius * self.radius {
            return VecPair::from(self.end);
        }

        let path_len = self.pathfinder.path().len();
        if self.path_index < path_len && self.step_polygon(self.path_index) != self.polygon {
            // The agent skipped ahead or left the path
            match (self.path_index..=path_len).find(|&i| self.step_polygon(i) == self.polygon) {
                Some(i) => self.path_index = i,
                None => {
                    self.repath();
                    return VecPair::from(self.position);
                }
            }
        }

        let Some(portals) = self.portals() else {
            log::debug!("Path no longer matches the navmesh, searching again");
            self.repath();
            return VecPair::from(self.position);
        };
        let corners = string_pull(self.position, &portals, self.end, 2);
        match corners.as_slice() {
            [first, second, ..] => VecPair::new(*first, *second),
            [first] => VecPair::new(*first, *first),
            [] => VecPair::from(self.end),
        }
    }

    /// Remaining portals, each narrowed by the agent radius. `None` when a
    /// path step no longer leads to the next one.
    fn portals(&self) -> Option<Vec<(Vec3, Vec3)>> {
        let mesh = self.nav_mesh();
        let path = self.pathfinder.path();
        let mut portals = Vec::with_capacity(path.len().saturating_sub(self.path_index));
        for i in self.path_index..path.len() {
            let node = path[i];
            let poly = mesh.polygon(node.poly)?;
            if node.edge >= poly.size() || mesh.linked_id(node.poly, node.edge) != self.step_polygon(i + 1) {
                return None;
            }
            let (a, b) = poly.edge_points(node.edge);
            let len = dist_2d(a, b);
            let inset = if len > 0.0 { (self.radius / len).min(0.5) } else { 0.0 };
            portals.push((a.lerp(b, inset), b.lerp(a, inset)));
        }
        Some(portals)
    }

    // ==== Collision ==== //

    /// Clips a move against the walls near `pos`.
    ///
    /// Returns the fraction of `mv` that can be applied before a circle of
    /// `radius` touches a wall, and the unit direction to slide along the
    /// wall that was hit (zero when nothing was hit). Unlinked edges are walls,
    /// and so are links too narrow for `radius` or into filtered polygons.
    /// Only the polygon containing `pos` and neighbours the move sweeps into
    /// are considered.
    pub fn move_collide(&self, pos: Vec3, mv: Vec3, radius: f32) -> (f32, Vec3) {
        let mut tangent = Vec3::ZERO;
        let filter = self.pathfinder.filter();
        if mv.x == 0.0 && mv.z == 0.0 {
            return (1.0, tangent);
        }
        let mesh = self.nav_mesh();
        let Some(start) = mesh.polygon_at(pos) else {
            return (1.0, tangent);
        };

        let move_len = (mv.x * mv.x + mv.z * mv.z).sqrt();
        let dir = Vec3::new(mv.x / move_len, 0.0, mv.z / move_len);
        let end = pos + mv;
        let mut moved = 1.0f32;
        let mut polys = vec![start];
        let mut i = 0;

        while i < polys.len() {
            let poly = polys[i];
            i += 1;
            for edge in mesh.edges_of(poly) {
                let a = edge.point_a();
                let b = edge.point_b();

                let open = edge.link().zip(edge.connected()).filter(|(link, next)| {
                    link.width >= radius * 2.0 && filter.has_type(next.type_index())
                });
                if let Some((_, next)) = open {
                    // Follow the move into neighbours it sweeps across
                    if !polys.iter().any(|p| p.id() == next.id())
                        && dist_segment_segment_sqr_2d(a, b, pos, end) < radius * radius
                    {
                        polys.push(next);
                    }
                    continue;
                }

                let edge_len = dist_2d(a, b);
                if edge_len <= 0.0 {
                    continue;
                }
                let normal = edge_normal_2d(a, b) / edge_len;
                if normal.dot(dir) < 1e-3 {
                    // Moving away from or along the wall
                    continue;
                }

                // Point of the circle that touches the wall first
                let front = pos + normal * radius;
                let Some((mut s, t)) = intersect_lines_2d(front, front + mv, a, b) else {
                    continue;
                };
                let margin = radius / edge_len;
                if !(s < 1.0 && t > -margin * 2.0 && t < 1.0 + margin * 2.0) {
                    continue;
                }

                let on_edge = (0.0..=1.0).contains(&t);
                let hit = if on_edge {
                    a.lerp(b, t)
                } else {
                    // Circle against the edge endpoint
                    let corner = if t < 0.0 { a } else { b };
                    let m = Vec3::new(corner.x - pos.x, 0.0, corner.z - pos.z);
                    let vb = -m.dot(dir);
                    let vc = m.dot(m) - radius * radius;
                    let discriminant = vb * vb - vc;
                    s = if discriminant < 1e-4 {
                        moved + 1.0
                    } else {
                        (-vb - discriminant.sqrt()) / move_len
                    };
                    if s < -1e-4 {
                        s = moved + 1.0;
                    }
                    corner
                };

                if s > -1.0 && s <= moved {
                    let mut hit_tangent = if on_edge {
                        Vec3::new(b.x - a.x, 0.0, b.z - a.z)
                    } else {
                        Vec3::new(pos.z - hit.z, 0.0, hit.x - pos.x)
                    }
                    .normalize_or_zero();
                    if hit_tangent.dot(mv) < 0.0 {
                        hit_tangent = -hit_tangent;
                    }

                    if moved < 1e-4 {
                        // Already blocked, keep the tangent leading further from the hit
                        let away = Vec3::new(pos.x - hit.x, 0.0, pos.z - hit.z);
                        if away.dot(hit_tangent) > away.dot(tangent) {
                            tangent = hit_tangent;
                        }
                    } else {
                        tangent = hit_tangent;
                    }
                    moved = s.max(0.0);
                }
            }
        }
        (moved, tangent)
    }

    /// Whether the straight line from the agent to `target` stays on the mesh
    pub fn ray(&self, target: Vec3, filter: NavFilter) -> bool {
        self.pathfinder
            .ray_segment(self.position, target, self.polygon, filter)
    }

    /// `target` moved onto the mesh and at least `radius` from its walls
    pub fn resolve_point(&self, target: Vec3, radius: f32, search: f32) -> Option<Vec3> {
        self.pathfinder
            .resolve_point(target, radius, search, RESOLVE_ITERATIONS)
            .map(|(_, p)| p)
    }
}

/// First `max_corners` corners of the shortest path from `start` through
/// `portals` to `end`.
///
/// Each portal runs from its `a` point to its `b` point with `start` on the
/// side where `b` is counter-clockwise of `a`.
fn string_pull(start: Vec3, portals: &[(Vec3, Vec3)], end: Vec3, max_corners: usize) -> Vec<Vec3> {
    let turn = |apex: Vec3, u: Vec3, v: Vec3| cross_2d(u - apex, v - apex);
    let same = |p: Vec3, q: Vec3| dist_sqr_2d(p, q) < FUNNEL_EPSILON;

    let mut corners = Vec::with_capacity(max_corners);
    let count = portals.len() + 1;
    let portal = |i: usize| if i < portals.len() { portals[i] } else { (end, end) };

    // Indices are the next portal to look at after each funnel point
    let (mut apex, mut side_a, mut side_b) = (start, start, start);
    let (mut a_next, mut b_next) = (0, 0);
    let mut i = 0;

    while i < count && corners.len() < max_corners {
        let (pa, pb) = portal(i);

        if turn(apex, side_b, pb) <= 0.0 {
            if same(apex, side_b) || same(apex, side_a) || turn(apex, side_a, pb) > 0.0 {
                side_b = pb;
                b_next = i + 1;
            } else {
                // Side b crossed side a, which becomes a corner
                corners.push(side_a);
                apex = side_a;
                let apex_next = a_next;
                side_b = apex;
                b_next = apex_next;
                i = apex_next;
                continue;
            }
        }

        if turn(apex, side_a, pa) >= 0.0 {
            if same(apex, side_a) || same(apex, side_b) || turn(apex, side_b, pa) < 0.0 {
                side_a = pa;
                a_next = i + 1;
            } else {
                corners.push(side_b);
                apex = side_b;
                let apex_next = b_next;
                side_a = apex;
                a_next = apex_next;
                i = apex_next;
                continue;
            }
        }

        i += 1;
    }

    if corners.len() < max_corners && corners.last().map_or(true, |c| !same(*c, end)) {
        corners.push(end);
    }
    corners
}
