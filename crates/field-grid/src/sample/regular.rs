//! Sampling on regular grids, shared with the curvilinear path.

use projection::HorizontalTransform;

use crate::error::{GridError, Result};
use crate::instance::GridInstance;
use crate::sample::{Position, SampleMode};

/// Slack for positions that sit numerically on the grid edge.
const EDGE_EPS: f64 = 1e-9;

pub(super) fn sample(
    instance: &GridInstance,
    transform: &dyn HorizontalTransform,
    mode: SampleMode,
    position: Position,
    level_idx: usize,
) -> Result<f32> {
    let (x, y) = resolve(transform, position)?;
    sample_grid(instance, mode, x, y, level_idx)
}

/// Convert a position to fractional grid coordinates.
pub(super) fn resolve(
    transform: &dyn HorizontalTransform,
    position: Position,
) -> Result<(f64, f64)> {
    match position {
        Position::GridXY { x, y } => Ok((x, y)),
        Position::LatLon { lat, lon } => transform
            .to_grid_xy(lat, lon)
            .map_err(|err| GridError::out_of_range(err.to_string())),
    }
}

/// Nearest/bilinear lookup at fractional grid coordinates.
///
/// On a wrapping grid the column folds modulo NI, per stencil column, so
/// the 4-point neighbourhood may straddle the seam and read from the
/// tiles on both edges.
pub(super) fn sample_grid(
    instance: &GridInstance,
    mode: SampleMode,
    x: f64,
    y: f64,
    level_idx: usize,
) -> Result<f32> {
    let definition = instance.definition();
    let ni = definition.ni;
    let nj = definition.nj;
    let wraps = definition.wraps;

    let x = if wraps { x.rem_euclid(ni as f64) } else { x };
    let x_max = if wraps { ni as f64 } else { (ni - 1) as f64 };
    if !(-EDGE_EPS..=x_max + EDGE_EPS).contains(&x)
        || !(-EDGE_EPS..=(nj - 1) as f64 + EDGE_EPS).contains(&y)
    {
        tracing::warn!(
            variable = %instance.variable,
            x,
            y,
            "sample position outside grid"
        );
        return Err(GridError::out_of_range(format!(
            "position ({}, {}) outside {}x{} grid",
            x, y, ni, nj
        )));
    }
    let x = x.clamp(0.0, x_max);
    let y = y.clamp(0.0, (nj - 1) as f64);

    // Fold a column index onto the grid: modulo for wrapping grids,
    // clamp at the non-wrapping edge (where dx is zero anyway).
    let fold = |i: usize| -> usize {
        if wraps {
            i % ni
        } else {
            i.min(ni - 1)
        }
    };

    match mode {
        SampleMode::Nearest => {
            let i = fold(x.round() as usize);
            let j = (y.round() as usize).min(nj - 1);
            instance.cell(level_idx, i, j)
        }
        SampleMode::Linear => {
            let x0 = x.floor().min(x_max);
            let y0 = y.floor().min((nj - 1) as f64);
            let dx = (x - x0) as f32;
            let dy = (y - y0) as f32;

            let i0 = fold(x0 as usize);
            let i1 = fold(x0 as usize + 1);
            let j0 = y0 as usize;
            let j1 = (j0 + 1).min(nj - 1);

            let d0 = instance.cell(level_idx, i0, j0)?;
            let d1 = instance.cell(level_idx, i1, j0)?;
            let d2 = instance.cell(level_idx, i0, j1)?;
            let d3 = instance.cell(level_idx, i1, j1)?;

            Ok(d0 + (d1 - d0) * dx + (d2 - d0) * dy + (d3 - d1 - d2 + d0) * dx * dy)
        }
    }
}
