//! Vector companion sampling.
//!
//! Wind-like fields come as two co-registered component instances. Each
//! is sampled independently; on topologies whose grid axes are not
//! geographic (curvilinear), the pair is then rotated by the local grid
//! bearing so the result is expressed along geographic east/north.

use std::sync::Arc;

use projection::HorizontalTransform;

use crate::definition::Topology;
use crate::error::{GridError, Result};
use crate::instance::GridInstance;
use crate::sample::{regular, sample, Position, SampleMode, SampleOptions};

/// Sample a (U, V) component pair over a list of levels.
///
/// Both instances must be on the same grid: identical definition, or
/// matching signatures and tile layout. Magnitude is preserved by the
/// reorientation.
pub fn sample_vector(
    u: &Arc<GridInstance>,
    v: &Arc<GridInstance>,
    mode: SampleMode,
    position: Position,
    levels: &[f64],
    options: &SampleOptions,
) -> Result<Vec<(f32, f32)>> {
    let co_registered = Arc::ptr_eq(u.definition_arc(), v.definition_arc())
        || (u.definition().signature.matches(&v.definition().signature)
            && u.definition().layout.tile_count() == v.definition().layout.tile_count());
    if !co_registered {
        return Err(GridError::inconsistent(
            "vector components use different grids",
        ));
    }

    let u_samples = sample(u, mode, position, levels, options)?;
    let v_samples = sample(v, mode, position, levels, options)?;
    let pairs = u_samples.into_iter().zip(v_samples);

    match &u.definition().topology {
        Topology::Curvilinear { transform } => {
            let (x, y) = regular::resolve(transform, position)?;
            let bearing = transform.bearing_at(x, y)?;
            let (sin, cos) = (bearing.sin() as f32, bearing.cos() as f32);
            Ok(pairs
                .map(|(gu, gv)| (gu * cos - gv * sin, gu * sin + gv * cos))
                .collect())
        }
        // Grid axes already point east/north.
        _ => Ok(pairs.collect()),
    }
}
