//! Horizontal coordinate transforms and spatial lookup.
//!
//! Each grid topology converts between geographic positions and
//! fractional grid coordinates through a [`HorizontalTransform`]:
//!
//! - [`LatLonTransform`] — regular lat/lon grids, analytic in both
//!   directions
//! - [`CurvilinearTransform`] — grids with per-node coordinates, inverted
//!   numerically with a Newton iteration on the bilinear coordinate
//!   surface
//!
//! Scattered-point and mesh topologies have no grid axes to transform;
//! they locate data through the bucketed [`SpatialIndex`] instead.

pub mod curvilinear;
pub mod error;
pub mod latlon;
pub mod spatial;
pub mod transform;

pub use curvilinear::CurvilinearTransform;
pub use error::{ProjectionError, ProjectionResult};
pub use latlon::LatLonTransform;
pub use spatial::SpatialIndex;
pub use transform::HorizontalTransform;
