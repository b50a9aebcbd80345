use thiserror::Error;

/// Errors that abort mapping of a frame pair.
///
/// Degenerate geometry, inconsistent intersection topology and nodes that
/// fail to migrate are recovered locally and never surface here.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MigrationError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("contour has {0} vertices, at least 3 are required")]
    TooFewVertices(usize),

    #[error("empty contour")]
    EmptyContour,

    #[error("coordinate tracking failed: {0}")]
    CoordinateTracking(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
