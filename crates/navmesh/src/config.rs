//! Configuration for navigation mesh editing

use nav_common::{Error, Result};

/// What a carve does to polygons whose type has the same precedence as the patch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum EqualPrecedence {
    /// Equal precedence polygons are protected, like higher precedence ones
    #[default]
    Keep,
    /// Equal precedence polygons are clipped, like lower precedence ones
    Overwrite,
}

/// Tolerances and limits used when linking and carving polygons
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct NavMeshConfig {
    /// Maximum XZ distance between two edge endpoints for them to match
    pub edge_epsilon: f32,
    /// Maximum height difference between matched edge endpoints
    pub link_height_tolerance: f32,
    /// Carve policy for equal precedence
    pub equal_precedence: EqualPrecedence,
    /// Polygons merged during editing never exceed this many vertices
    pub max_vertices_per_poly: usize,
    /// Carve output smaller than this area is discarded
    pub min_polygon_area: f32,
}

impl Default for NavMeshConfig {
    fn default() -> Self {
        Self {
            edge_epsilon: 1e-3,
            link_height_tolerance: 0.5,
            equal_precedence: EqualPrecedence::Keep,
            max_vertices_per_poly: 12,
            min_polygon_area: 1e-5,
        }
    }
}

impl NavMeshConfig {
    /// Creates a new NavMeshConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_edge_epsilon(mut self, edge_epsilon: f32) -> Self {
        self.edge_epsilon = edge_epsilon;
        self
    }

    pub fn with_link_height_tolerance(mut self, link_height_tolerance: f32) -> Self {
        self.link_height_tolerance = link_height_tolerance;
        self
    }

    pub fn with_equal_precedence(mut self, equal_precedence: EqualPrecedence) -> Self {
        self.equal_precedence = equal_precedence;
        self
    }

    pub fn with_max_vertices_per_poly(mut self, max_vertices_per_poly: usize) -> Self {
        self.max_vertices_per_poly = max_vertices_per_poly;
        self
    }

    pub fn with_min_polygon_area(mut self, min_polygon_area: f32) -> Self {
        self.min_polygon_area = min_polygon_area;
        self
    }

    /// Validates the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if !(self.edge_epsilon > 0.0 && self.edge_epsilon.is_finite()) {
            return Err(Error::InvalidConfig(
                "edge epsilon must be positive".to_string(),
            ));
        }
        if !(self.link_height_tolerance >= 0.0) {
            return Err(Error::InvalidConfig(
                "link height tolerance cannot be negative".to_string(),
            ));
        }
        if self.max_vertices_per_poly < 3 {
            return Err(Error::InvalidConfig(
                "polygons need at least 3 vertices".to_string(),
            ));
        }
        if !(self.min_polygon_area >= 0.0) {
            return Err(Error::InvalidConfig(
                "minimum polygon area cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}
