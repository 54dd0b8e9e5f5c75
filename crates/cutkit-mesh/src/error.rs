//! Error types for mesh splitting.

use thiserror::Error;

/// Errors that can occur while splitting a mesh along a cut surface.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    /// An edge is shared by other than exactly two faces, or two faces
    /// sharing an edge disagree on orientation.
    #[error("mesh is not a closed 2-manifold")]
    NonManifold,

    /// The seam could not be chained into closed loops.
    #[error("seam is open at vertex {0}")]
    OpenSeam(u32),

    /// Invalid cut profile.
    #[error("invalid cut profile: {0}")]
    InvalidProfile(String),

    /// Geometry too degenerate to process.
    #[error("degenerate geometry: {0}")]
    Degenerate(String),
}

/// Result type for mesh operations.
pub type Result<T> = std::result::Result<T, MeshError>;
