//! The horizontal transform interface.

use crate::error::ProjectionResult;

/// Conversion between geographic positions and fractional grid
/// coordinates for one grid topology.
///
/// Grid coordinates are fractional column/row indices: `(0.0, 0.0)` is
/// the first grid point, `(ni - 1, nj - 1)` the last. Implementations do
/// not clamp or wrap; bounds policy belongs to the caller.
pub trait HorizontalTransform: Send + Sync {
    /// Convert a geographic position to fractional grid coordinates.
    fn to_grid_xy(&self, lat: f64, lon: f64) -> ProjectionResult<(f64, f64)>;

    /// Convert fractional grid coordinates to a geographic position.
    fn to_lat_lon(&self, x: f64, y: f64) -> ProjectionResult<(f64, f64)>;

    /// Angle of the grid +x axis at a grid position, in radians
    /// counterclockwise from geographic east.
    ///
    /// Zero for grids whose axes already align with geographic east and
    /// north; vector fields on such grids need no reorientation.
    fn bearing_at(&self, x: f64, y: f64) -> ProjectionResult<f64>;
}
