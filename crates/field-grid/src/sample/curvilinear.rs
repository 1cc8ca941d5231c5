//! Sampling on curvilinear grids.
//!
//! Geographic positions invert numerically to fractional grid
//! coordinates; the lookup itself is the regular-grid logic.

use projection::CurvilinearTransform;

use crate::error::Result;
use crate::instance::GridInstance;
use crate::sample::{regular, Position, SampleMode};

pub(super) fn sample(
    instance: &GridInstance,
    transform: &CurvilinearTransform,
    mode: SampleMode,
    position: Position,
    level_idx: usize,
) -> Result<f32> {
    let (x, y) = regular::resolve(transform, position)?;
    regular::sample_grid(instance, mode, x, y, level_idx)
}
