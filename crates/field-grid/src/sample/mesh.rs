//! Barycentric sampling on triangular meshes.

use projection::SpatialIndex;

use crate::error::{GridError, Result};
use crate::instance::GridInstance;
use crate::sample::{Position, SampleMode};

/// Tolerance for the containment test; points on an edge belong to the
/// triangle.
const EDGE_EPS: f64 = 1e-9;

pub(super) fn sample(
    instance: &GridInstance,
    index: &SpatialIndex,
    nodes: &[(f64, f64)],
    triangles: &[[u32; 3]],
    mode: SampleMode,
    position: Position,
    level_idx: usize,
) -> Result<f32> {
    let (lon, lat) = match position {
        Position::LatLon { lat, lon } => (lon, lat),
        // A grid-index query addresses a mesh node directly.
        Position::GridXY { x, .. } => {
            let node = x.round();
            if node < 0.0 || node >= nodes.len() as f64 {
                return Err(GridError::out_of_range(format!(
                    "node index {} of {}",
                    node,
                    nodes.len()
                )));
            }
            return node_value(instance, level_idx, node as usize);
        }
    };

    for &triangle_id in index.bucket_at(lon, lat) {
        let triangle = triangles[triangle_id as usize];
        let a = nodes[triangle[0] as usize];
        let b = nodes[triangle[1] as usize];
        let c = nodes[triangle[2] as usize];
        let Some(weights) = barycentric((lon, lat), a, b, c) else {
            continue;
        };

        let values = [
            node_value(instance, level_idx, triangle[0] as usize)?,
            node_value(instance, level_idx, triangle[1] as usize)?,
            node_value(instance, level_idx, triangle[2] as usize)?,
        ];
        return match mode {
            SampleMode::Nearest => {
                let mut best = 0;
                for vertex in 1..3 {
                    if weights[vertex] > weights[best] {
                        best = vertex;
                    }
                }
                Ok(values[best])
            }
            SampleMode::Linear => Ok((weights[0] * values[0] as f64
                + weights[1] * values[1] as f64
                + weights[2] * values[2] as f64) as f32),
        };
    }

    tracing::warn!(variable = %instance.variable, lon, lat, "no triangle contains query");
    Err(GridError::out_of_range(format!(
        "({}, {}) outside the mesh",
        lon, lat
    )))
}

/// Barycentric weights of `p` in triangle (a, b, c), or `None` when the
/// point lies outside or the triangle is degenerate.
fn barycentric(
    p: (f64, f64),
    a: (f64, f64),
    b: (f64, f64),
    c: (f64, f64),
) -> Option<[f64; 3]> {
    let det = (b.0 - a.0) * (c.1 - a.1) - (c.0 - a.0) * (b.1 - a.1);
    if det.abs() < f64::EPSILON {
        return None;
    }
    let wb = ((p.0 - a.0) * (c.1 - a.1) - (c.0 - a.0) * (p.1 - a.1)) / det;
    let wc = ((b.0 - a.0) * (p.1 - a.1) - (p.0 - a.0) * (b.1 - a.1)) / det;
    let wa = 1.0 - wb - wc;
    if wa >= -EDGE_EPS && wb >= -EDGE_EPS && wc >= -EDGE_EPS {
        Some([wa, wb, wc])
    } else {
        None
    }
}

/// Value stored at one mesh node.
fn node_value(instance: &GridInstance, level_idx: usize, node: usize) -> Result<f32> {
    let ni = instance.definition().ni;
    instance.cell(level_idx, node % ni, node / ni)
}
