//! Named polygon types with carve precedence

use nav_common::{Error, Result};

/// Index of a polygon type within a [`TypeRegistry`]
pub type TypeIndex = u16;

/// Maximum number of distinct polygon types, one per filter bit
pub const MAX_TYPES: usize = 64;

/// Name of the type every registry starts with, at index 0
pub const DEFAULT_TYPE: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
struct TypeEntry {
    name: String,
    precedence: i32,
}

/// Maps polygon type names to indices and carve precedence.
///
/// Entries are never removed, so a [`TypeIndex`] stays valid for the lifetime
/// of the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeRegistry {
    entries: Vec<TypeEntry>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Creates a registry holding only [`DEFAULT_TYPE`] with precedence 0
    pub fn new() -> Self {
        Self {
            entries: vec![TypeEntry {
                name: DEFAULT_TYPE.to_string(),
                precedence: 0,
            }],
        }
    }

    /// Registers a type or updates the precedence of an existing one
    pub fn set_type(&mut self, name: &str, precedence: i32) -> Result<TypeIndex> {
        if let Some(index) = self.find(name) {
            self.entries[index as usize].precedence = precedence;
            return Ok(index);
        }
        self.push(name, precedence)
    }

    /// Returns the index of `name`, registering it with precedence 0 if missing
    pub fn type_id(&mut self, name: &str) -> Result<TypeIndex> {
        match self.find(name) {
            Some(index) => Ok(index),
            None => self.push(name, 0),
        }
    }

    pub fn find(&self, name: &str) -> Option<TypeIndex> {
        self.entries
            .iter()
            .position(|e| e.name == name)
            .map(|i| i as TypeIndex)
    }

    pub fn name(&self, index: TypeIndex) -> Option<&str> {
        self.entries.get(index as usize).map(|e| e.name.as_str())
    }

    /// Carve precedence of a type. Unknown indices have precedence 0.
    pub fn precedence(&self, index: TypeIndex) -> i32 {
        self.entries
            .get(index as usize)
            .map_or(0, |e| e.precedence)
    }

    pub fn contains(&self, index: TypeIndex) -> bool {
        (index as usize) < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(index, name, precedence)` in index order
    pub fn iter(&self) -> impl Iterator<Item = (TypeIndex, &str, i32)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i as TypeIndex, e.name.as_str(), e.precedence))
    }

    fn push(&mut self, name: &str, precedence: i32) -> Result<TypeIndex> {
        if self.entries.len() >= MAX_TYPES {
            return Err(Error::TooManyTypes(MAX_TYPES));
        }
        self.entries.push(TypeEntry {
            name: name.to_string(),
            precedence,
        });
        Ok((self.entries.len() - 1) as TypeIndex)
    }
}
