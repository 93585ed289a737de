//! Configuration for path searches

use nav_common::{Error, Result};

/// Agent and search limits used by a [`Pathfinder`](crate::Pathfinder)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct PathfinderConfig {
    /// Agent radius. Links narrower than twice this are never crossed.
    pub radius: f32,
    /// Largest height step the agent can take across a link
    pub max_step: f32,
    /// Maximum number of polygons expanded by one search
    pub max_iterations: usize,
    /// Return a path to the closest polygon when the goal cannot be reached
    pub allow_partial: bool,
}

impl Default for PathfinderConfig {
    fn default() -> Self {
        Self {
            radius: 0.0,
            max_step: f32::MAX,
            max_iterations: 65536,
            allow_partial: true,
        }
    }
}

impl PathfinderConfig {
    /// Creates a new PathfinderConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_max_step(mut self, max_step: f32) -> Self {
        self.max_step = max_step;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_allow_partial(mut self, allow_partial: bool) -> Self {
        self.allow_partial = allow_partial;
        self
    }

    /// Validates the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if !(self.radius >= 0.0 && self.radius.is_finite()) {
            return Err(Error::InvalidConfig(
                "radius must be finite and not negative".to_string(),
            ));
        }
        if !(self.max_step >= 0.0) {
            return Err(Error::InvalidConfig(
                "max step cannot be negative".to_string(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(Error::InvalidConfig(
                "max iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
