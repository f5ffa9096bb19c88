//! Error types for implore-octree
//!
//! Two layers of errors exist:
//! - `PagingError`: produced by a paging bridge when backing storage
//!   cannot deliver a node's children
//! - `OctreeError`: everything a traversal, query or configuration
//!   call can fail with
//!
//! Paging failures are fatal for the traversal in flight. They are
//! propagated up the recursion and never turned into a skipped subtree.

use thiserror::Error;

/// Errors raised by a paging bridge
#[derive(Error, Debug)]
pub enum PagingError {
    /// No record exists at the requested offset
    #[error("Node record unavailable at offset {offset}")]
    Unavailable { offset: u64 },

    /// The record exists but cannot be decoded
    #[error("Node record at offset {offset} is corrupt: {message}")]
    Corrupt { offset: u64, message: String },

    /// Backing store I/O errors
    #[error("Backing store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Main error type for octree operations
#[derive(Error, Debug)]
pub enum OctreeError {
    /// A node could not be paged in
    #[error("Paging failed: {0}")]
    Paging(#[from] PagingError),

    /// Invalid configuration values
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration could not be parsed
    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    /// Invalid query parameters (negative or NaN radius, ...)
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Internal tree state does not match what a traversal requires
    #[error("Invariant violated: {0}")]
    Invariant(String),
}

/// Result type alias for octree operations
pub type OctreeResult<T> = Result<T, OctreeError>;

/// Result type alias for paging bridge operations
pub type PagingResult<T> = Result<T, PagingError>;

/// Validation utilities
pub mod validation {
    use super::*;

    /// Validate a query or interactor radius, returning its square
    pub fn validate_radius(radius: f32) -> OctreeResult<f32> {
        if !radius.is_finite() || radius < 0.0 {
            return Err(OctreeError::InvalidQuery(format!(
                "radius must be finite and non-negative, got {}",
                radius
            )));
        }
        Ok(radius * radius)
    }

    /// Validate a query point
    pub fn validate_point(point: [f32; 3]) -> OctreeResult<()> {
        if point.iter().any(|c| !c.is_finite()) {
            return Err(OctreeError::InvalidQuery(format!(
                "query point must be finite, got {:?}",
                point
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paging_error_display() {
        let err = PagingError::Corrupt {
            offset: 42,
            message: "truncated".to_string(),
        };
        assert!(err.to_string().contains("42"));
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn test_io_error_converts_into_octree_error() {
        fn read_record() -> OctreeResult<()> {
            let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
            Err(PagingError::from(io).into())
        }

        let err = read_record().unwrap_err();
        assert!(matches!(err, OctreeError::Paging(PagingError::Io(_))));
        assert!(err.to_string().contains("short read"));
    }

    #[test]
    fn test_octree_error_from_paging() {
        let err: OctreeError = PagingError::Unavailable { offset: 9 }.into();
        assert!(matches!(err, OctreeError::Paging(_)));
        assert!(err.to_string().contains("offset 9"));
    }

    #[test]
    fn test_validate_radius() {
        assert_eq!(validation::validate_radius(2.0).unwrap(), 4.0);
        assert_eq!(validation::validate_radius(0.0).unwrap(), 0.0);
        assert!(validation::validate_radius(-1.0).is_err());
        assert!(validation::validate_radius(f32::NAN).is_err());
        assert!(validation::validate_radius(f32::INFINITY).is_err());
    }

    #[test]
    fn test_validate_point() {
        assert!(validation::validate_point([0.0, 1.0, 2.0]).is_ok());
        assert!(validation::validate_point([0.0, f32::NAN, 2.0]).is_err());
    }
}
