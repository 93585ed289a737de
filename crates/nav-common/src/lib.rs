//! Common utilities and data structures shared by the navmesh and navpath crates

mod bounds;
mod geometry;

pub use bounds::*;
pub use geometry::*;

/// Represents a 3D position
pub type Vec3 = glam::Vec3;

/// Represents a position on the XZ plane
pub type Vec2 = glam::Vec2;

/// Error types for the library
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid polygon: {0}")]
    InvalidPolygon(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("too many polygon types (limit is {0})")]
    TooManyTypes(usize),

    #[error("unknown polygon id {0}")]
    UnknownPolygon(u32),

    #[error("wrong magic number: {0:#010x}")]
    WrongMagic(u32),

    #[error("unsupported version: {0}")]
    WrongVersion(u32),

    #[error("corrupted navmesh data: {0}")]
    DataCorrupted(String),

    #[cfg(feature = "std")]
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for navigation operations
pub type Result<T> = std::result::Result<T, Error>;
