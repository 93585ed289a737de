//! Polygon type filter for searches and raycasts

use navmesh::{TypeIndex, TypeRegistry, MAX_TYPES};
use nav_common::Result;

/// Bit mask over polygon type indices. Bit `i` allows type `i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct NavFilter(u64);

impl NavFilter {
    /// Every type is allowed
    pub const ALL: NavFilter = NavFilter(u64::MAX);
    /// No type is allowed
    pub const NONE: NavFilter = NavFilter(0);

    /// Creates a filter from a raw mask
    pub const fn new(mask: u64) -> Self {
        Self(mask)
    }

    /// Raw mask
    pub fn mask(&self) -> u64 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Allows polygons of type `index`
    pub fn add_type(&mut self, index: TypeIndex) {
        if (index as usize) < MAX_TYPES {
            self.0 |= 1u64 << index;
        }
    }

    /// Excludes polygons of type `index`
    pub fn remove_type(&mut self, index: TypeIndex) {
        if (index as usize) < MAX_TYPES {
            self.0 &= !(1u64 << index);
        }
    }

    /// Whether polygons of type `index` pass the filter
    pub fn has_type(&self, index: TypeIndex) -> bool {
        (index as usize) < MAX_TYPES && self.0 & (1u64 << index) != 0
    }

    /// Builder form of [`NavFilter::add_type`]
    pub fn with_type(mut self, index: TypeIndex) -> Self {
        self.add_type(index);
        self
    }

    /// Builder form of [`NavFilter::remove_type`]
    pub fn without_type(mut self, index: TypeIndex) -> Self {
        self.remove_type(index);
        self
    }

    /// Allows a type by name, registering the name if it is new
    pub fn add_type_name(&mut self, types: &mut TypeRegistry, name: &str) -> Result<()> {
        let index = types.type_id(name)?;
        self.add_type(index);
        Ok(())
    }

    /// Excludes a type by name, registering the name if it is new
    pub fn remove_type_name(&mut self, types: &mut TypeRegistry, name: &str) -> Result<()> {
        let index = types.type_id(name)?;
        self.remove_type(index);
        Ok(())
    }

    /// Whether a named type passes. Unknown names never pass.
    pub fn has_type_name(&self, types: &TypeRegistry, name: &str) -> bool {
        types.find(name).is_some_and(|index| self.has_type(index))
    }
}

impl Default for NavFilter {
    fn default() -> Self {
        Self::ALL
    }
}
