//! Topology-dispatched point sampling.
//!
//! A query names a position (grid coordinates or geographic), a mode,
//! and a list of level values; the engine dispatches on the grid's
//! topology and produces one sample per level, loading tiles on demand:
//!
//! - regular grids: bilinear/nearest with wraparound folding
//! - scattered points: distance-weighted averaging over the K nearest
//! - triangular meshes: barycentric lookup through the spatial index
//! - curvilinear grids: numeric inversion, then the regular logic

mod curvilinear;
mod mesh;
mod regular;
mod scattered;
mod vector;

pub use vector::sample_vector;

use crate::config::GridConfig;
use crate::definition::Topology;
use crate::error::{GridError, Result};
use crate::instance::GridInstance;

/// Empirically tuned shape constant of the Barnes weighting kernel.
pub const BARNES_SHAPE: f64 = 14.2;

/// How a sample combines neighbouring values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleMode {
    /// Value of the closest grid point / vertex.
    Nearest,
    /// Distance-weighted combination of neighbours.
    Linear,
}

/// A query position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Position {
    /// Fractional grid coordinates. On scattered and mesh grids, `x` is
    /// a point/node index.
    GridXY { x: f64, y: f64 },
    /// Geographic coordinates in degrees.
    LatLon { lat: f64, lon: f64 },
}

/// Weighting kernel for scattered-point interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScatterKernel {
    /// Gaussian falloff.
    Barnes,
    /// Ratio falloff.
    Cressman,
}

/// Tunable parameters for sampling.
#[derive(Debug, Clone)]
pub struct SampleOptions {
    /// Neighbour count for scattered linear sampling.
    pub neighbors: usize,
    /// Scattered weighting kernel.
    pub kernel: ScatterKernel,
    /// Barnes kernel shape constant.
    pub barnes_shape: f64,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            neighbors: 4,
            kernel: ScatterKernel::Barnes,
            barnes_shape: BARNES_SHAPE,
        }
    }
}

impl SampleOptions {
    /// Options seeded from a catalog configuration.
    pub fn from_config(config: &GridConfig) -> Self {
        Self {
            neighbors: config.sample_neighbors,
            kernel: ScatterKernel::Barnes,
            barnes_shape: config.barnes_shape,
        }
    }
}

/// Sample an instance at one position over a list of level values.
///
/// Levels are visited in the order given (ascending or descending
/// profiles both work). Any out-of-range level or position fails the
/// whole call; there is no partial output.
pub fn sample(
    instance: &GridInstance,
    mode: SampleMode,
    position: Position,
    levels: &[f64],
    options: &SampleOptions,
) -> Result<Vec<f32>> {
    // Resolve every level up front so a bad profile produces no output.
    let mut level_indices = Vec::with_capacity(levels.len());
    for &level in levels {
        let index = instance.level_index(level).ok_or_else(|| {
            tracing::warn!(variable = %instance.variable, level, "sample of unknown level");
            GridError::out_of_range(format!("level {} not in instance", level))
        })?;
        level_indices.push(index);
    }

    let mut samples = Vec::with_capacity(levels.len());
    for index in level_indices {
        samples.push(sample_level(instance, mode, position, index, options)?);
    }
    Ok(samples)
}

fn sample_level(
    instance: &GridInstance,
    mode: SampleMode,
    position: Position,
    level_idx: usize,
    options: &SampleOptions,
) -> Result<f32> {
    match &instance.definition().topology {
        Topology::Regular { transform } => {
            regular::sample(instance, transform, mode, position, level_idx)
        }
        Topology::Scattered { index } => {
            scattered::sample(instance, index, mode, position, level_idx, options)
        }
        Topology::Mesh {
            index,
            nodes,
            triangles,
        } => mesh::sample(instance, index, nodes, triangles, mode, position, level_idx),
        Topology::Curvilinear { transform } => {
            curvilinear::sample(instance, transform, mode, position, level_idx)
        }
    }
}
