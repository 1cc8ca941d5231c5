//! Error types for coordinate transforms.

use thiserror::Error;

/// Result type alias using ProjectionError.
pub type ProjectionResult<T> = Result<T, ProjectionError>;

/// Errors raised by horizontal transforms.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// The geographic position has no image on the grid.
    #[error("position ({lat}, {lon}) is outside the transform domain")]
    OutOfDomain { lat: f64, lon: f64 },

    /// The grid coordinates fall outside the grid extent.
    #[error("grid coordinates ({x}, {y}) are outside the grid")]
    OutOfGrid { x: f64, y: f64 },

    /// The numeric inversion did not converge.
    #[error("inversion did not converge for ({lat}, {lon}) after {iterations} iterations")]
    NotConverged {
        lat: f64,
        lon: f64,
        iterations: usize,
    },
}
