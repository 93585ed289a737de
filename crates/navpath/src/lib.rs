//! Pathfinding and path following over a polygon navigation mesh
//!
//! Builds on the [`navmesh`] crate:
//!
//! - [`Pathfinder`]: A* over polygons with type filtering, agent width and
//!   step checks, partial paths and multiple goals
//! - [`PathFollower`]: keeps an agent's polygon up to date, hands out steering
//!   targets along the path and clips moves against walls
//! - [`NavFilter`]: bit mask of the polygon types a search may enter
//!
//! # Example
//!
//! ```rust,ignore
//! use navpath::{PathFollower, PathState};
//! use nav_common::Vec3;
//!
//! let mut follower = PathFollower::new(&mesh);
//! follower.set_radius(0.3);
//! follower.set_position(Vec3::new(0.5, 0.0, 0.5));
//! if follower.set_goal(Vec3::new(8.5, 0.0, 3.5)) {
//!     let target = follower.next_point().first;
//! }
//! ```

pub mod config;
pub mod nav_filter;
pub mod path_follower;
pub mod pathfinder;
mod search_node;

pub use config::PathfinderConfig;
pub use nav_filter::NavFilter;
pub use path_follower::{PathFollower, VecPair};
pub use pathfinder::{Location, PathNode, PathState, Pathfinder};

#[cfg(test)]
pub mod test_mesh_helpers;

#[cfg(test)]
mod pathfinder_tests;
