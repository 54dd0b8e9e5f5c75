//! Error types for the cutting engine.

use cutkit_mesh::MeshError;
use thiserror::Error;

/// Errors that can occur while performing a cut.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CutError {
    /// The cut does not yield a valid manifold split.
    #[error("degenerate cut geometry: {0}")]
    GeometryDegenerate(String),

    /// A cut parameter does not fit the object.
    #[error("parameter out of range: {0}")]
    ParameterOutOfRange(String),

    /// The requested instance does not exist.
    #[error("instance {index} out of range (object has {count})")]
    InstanceOutOfRange {
        /// Requested instance index.
        index: usize,
        /// Number of instances of the object.
        count: usize,
    },

    /// The request was already used.
    #[error("cut request already performed")]
    AlreadyPerformed,

    /// Invalid engine configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Mesh failures surface as degenerate cut geometry.
impl From<MeshError> for CutError {
    fn from(err: MeshError) -> Self {
        CutError::GeometryDegenerate(err.to_string())
    }
}

/// Result type for cut operations.
pub type Result<T> = std::result::Result<T, CutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_errors_become_degenerate_geometry() {
        let err: CutError = MeshError::OpenSeam(3).into();
        assert_eq!(
            err,
            CutError::GeometryDegenerate("seam is open at vertex 3".into())
        );
    }

    #[test]
    fn test_instance_message() {
        let err = CutError::InstanceOutOfRange { index: 2, count: 1 };
        assert_eq!(err.to_string(), "instance 2 out of range (object has 1)");
    }
}
