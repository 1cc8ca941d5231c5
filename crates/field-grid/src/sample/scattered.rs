//! Distance-weighted sampling over scattered points.

use std::f64::consts::PI;

use projection::SpatialIndex;

use crate::error::{GridError, Result};
use crate::instance::GridInstance;
use crate::sample::{Position, SampleMode, SampleOptions, ScatterKernel};

/// Guard factor keeping the Cressman weight positive at the influence
/// radius.
const CRESSMAN_GUARD: f64 = 1.001;

pub(super) fn sample(
    instance: &GridInstance,
    index: &SpatialIndex,
    mode: SampleMode,
    position: Position,
    level_idx: usize,
    options: &SampleOptions,
) -> Result<f32> {
    let (lon, lat) = match position {
        Position::LatLon { lat, lon } => (lon, lat),
        // A grid-index query on a point cloud addresses the point
        // directly.
        Position::GridXY { x, .. } => {
            let point = x.round();
            if point < 0.0 || point >= index.len() as f64 {
                return Err(GridError::out_of_range(format!(
                    "point index {} of {}",
                    point,
                    index.len()
                )));
            }
            return point_value(instance, level_idx, point as usize);
        }
    };

    let k = match mode {
        SampleMode::Nearest => 1,
        SampleMode::Linear => options.neighbors.max(1),
    };
    let hits = index.nearest_k(lon, lat, k);
    let Some(&(nearest, nearest_d)) = hits.first() else {
        tracing::warn!(variable = %instance.variable, lon, lat, "no points near query");
        return Err(GridError::out_of_range(format!(
            "no points near ({}, {})",
            lon, lat
        )));
    };
    if hits.len() == 1 {
        return point_value(instance, level_idx, nearest);
    }

    // The farthest of the K distances sets the influence radius.
    let radius = hits.last().map(|&(_, d)| d).unwrap_or(nearest_d);
    if radius <= 0.0 {
        return point_value(instance, level_idx, nearest);
    }

    let mut weighted = 0.0f64;
    let mut total = 0.0f64;
    for &(point, distance) in &hits {
        let value = point_value(instance, level_idx, point)?;
        if value.is_nan() {
            continue;
        }
        let weight = match options.kernel {
            ScatterKernel::Barnes => {
                (-(PI * options.barnes_shape / (radius * radius)) * distance * distance).exp()
            }
            ScatterKernel::Cressman => {
                (radius * CRESSMAN_GUARD - distance) / (radius * CRESSMAN_GUARD + distance)
            }
        };
        weighted += weight * value as f64;
        total += weight;
    }
    if total == 0.0 {
        return Ok(f32::NAN);
    }
    Ok((weighted / total) as f32)
}

/// Value stored at one point of the cloud.
fn point_value(instance: &GridInstance, level_idx: usize, point: usize) -> Result<f32> {
    let ni = instance.definition().ni;
    instance.cell(level_idx, point % ni, point / ni)
}
