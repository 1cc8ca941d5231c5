//! Curvilinear grid transform with numeric inversion.
//!
//! A curvilinear grid stores the geographic coordinates of every node.
//! The forward transform (grid to geographic) bilinearly interpolates the
//! node coordinates; the inverse has no analytic form and is solved with
//! a Newton iteration on the bilinear coordinate surface, seeded at the
//! nearest node.

use nalgebra::{Matrix2, Vector2};

use crate::error::{ProjectionError, ProjectionResult};
use crate::transform::HorizontalTransform;

/// Maximum Newton steps before giving up.
const MAX_ITERATIONS: usize = 25;
/// Convergence tolerance on the residual, in degrees.
const TOLERANCE: f64 = 1e-9;
/// Step used for finite-difference bearings.
const BEARING_STEP: f64 = 1e-3;

/// Transform for a grid with per-node geographic coordinates.
#[derive(Debug, Clone)]
pub struct CurvilinearTransform {
    ni: usize,
    nj: usize,
    /// Node latitudes, row-major.
    lats: Vec<f64>,
    /// Node longitudes, row-major.
    lons: Vec<f64>,
}

impl CurvilinearTransform {
    /// Create a transform from row-major node coordinate arrays.
    pub fn new(ni: usize, nj: usize, lats: Vec<f64>, lons: Vec<f64>) -> Option<Self> {
        if ni < 2 || nj < 2 || lats.len() != ni * nj || lons.len() != ni * nj {
            return None;
        }
        Some(Self { ni, nj, lats, lons })
    }

    /// Grid dimensions (columns, rows).
    pub fn dimensions(&self) -> (usize, usize) {
        (self.ni, self.nj)
    }

    fn node(&self, i: usize, j: usize) -> (f64, f64) {
        let idx = j * self.ni + i;
        (self.lats[idx], self.lons[idx])
    }

    /// Bilinear interpolation of node coordinates at fractional (x, y),
    /// together with the partial derivatives of (lat, lon) with respect
    /// to x and y.
    fn surface_at(&self, x: f64, y: f64) -> ((f64, f64), Matrix2<f64>) {
        let i0 = (x.floor() as isize).clamp(0, self.ni as isize - 2) as usize;
        let j0 = (y.floor() as isize).clamp(0, self.nj as isize - 2) as usize;
        let dx = x - i0 as f64;
        let dy = y - j0 as f64;

        let (lat00, lon00) = self.node(i0, j0);
        let (lat10, lon10) = self.node(i0 + 1, j0);
        let (lat01, lon01) = self.node(i0, j0 + 1);
        let (lat11, lon11) = self.node(i0 + 1, j0 + 1);

        let lat = lat00
            + (lat10 - lat00) * dx
            + (lat01 - lat00) * dy
            + (lat11 - lat10 - lat01 + lat00) * dx * dy;
        let lon = lon00
            + (lon10 - lon00) * dx
            + (lon01 - lon00) * dy
            + (lon11 - lon10 - lon01 + lon00) * dx * dy;

        let dlat_dx = (lat10 - lat00) + (lat11 - lat10 - lat01 + lat00) * dy;
        let dlat_dy = (lat01 - lat00) + (lat11 - lat10 - lat01 + lat00) * dx;
        let dlon_dx = (lon10 - lon00) + (lon11 - lon10 - lon01 + lon00) * dy;
        let dlon_dy = (lon01 - lon00) + (lon11 - lon10 - lon01 + lon00) * dx;

        let jacobian = Matrix2::new(dlat_dx, dlat_dy, dlon_dx, dlon_dy);
        ((lat, lon), jacobian)
    }

    /// Nearest node to a geographic position, used to seed the
    /// inversion. Linear scan; node counts on curvilinear grids are
    /// modest and the result is only a starting point.
    fn nearest_node(&self, lat: f64, lon: f64) -> (usize, usize) {
        let mut best = (0, 0);
        let mut best_d = f64::INFINITY;
        for j in 0..self.nj {
            for i in 0..self.ni {
                let (nlat, nlon) = self.node(i, j);
                let dlat = nlat - lat;
                let dlon = wrap_degrees(nlon - lon);
                let d = dlat * dlat + dlon * dlon;
                if d < best_d {
                    best_d = d;
                    best = (i, j);
                }
            }
        }
        best
    }
}

impl HorizontalTransform for CurvilinearTransform {
    fn to_grid_xy(&self, lat: f64, lon: f64) -> ProjectionResult<(f64, f64)> {
        let (si, sj) = self.nearest_node(lat, lon);
        let mut x = si as f64;
        let mut y = sj as f64;

        for _ in 0..MAX_ITERATIONS {
            let ((clat, clon), jacobian) = self.surface_at(x, y);
            let residual = Vector2::new(clat - lat, wrap_degrees(clon - lon));
            if residual.norm() < TOLERANCE {
                return Ok((x, y));
            }
            let step = jacobian
                .lu()
                .solve(&residual)
                .ok_or(ProjectionError::NotConverged {
                    lat,
                    lon,
                    iterations: MAX_ITERATIONS,
                })?;
            x = (x - step[0]).clamp(0.0, (self.ni - 1) as f64);
            y = (y - step[1]).clamp(0.0, (self.nj - 1) as f64);
        }

        // One final check: the iteration may land on the boundary clamp
        // with a small residual for points just outside the grid.
        let ((clat, clon), _) = self.surface_at(x, y);
        let residual = ((clat - lat).powi(2) + wrap_degrees(clon - lon).powi(2)).sqrt();
        if residual < TOLERANCE {
            Ok((x, y))
        } else {
            Err(ProjectionError::NotConverged {
                lat,
                lon,
                iterations: MAX_ITERATIONS,
            })
        }
    }

    fn to_lat_lon(&self, x: f64, y: f64) -> ProjectionResult<(f64, f64)> {
        if x < 0.0 || y < 0.0 || x > (self.ni - 1) as f64 || y > (self.nj - 1) as f64 {
            return Err(ProjectionError::OutOfGrid { x, y });
        }
        let ((lat, lon), _) = self.surface_at(x, y);
        Ok((lat, lon))
    }

    fn bearing_at(&self, x: f64, y: f64) -> ProjectionResult<f64> {
        // Central difference along the +x axis, one-sided at the edges.
        let h = BEARING_STEP;
        let x0 = (x - h).max(0.0);
        let x1 = (x + h).min((self.ni - 1) as f64);
        let (lat0, lon0) = self.to_lat_lon(x0, y)?;
        let (lat1, lon1) = self.to_lat_lon(x1, y)?;
        let lat_mid = (lat0 + lat1) / 2.0;
        let de = wrap_degrees(lon1 - lon0) * lat_mid.to_radians().cos();
        let dn = lat1 - lat0;
        Ok(dn.atan2(de))
    }
}

/// Fold a longitude difference into [-180, 180).
fn wrap_degrees(d: f64) -> f64 {
    (d + 180.0).rem_euclid(360.0) - 180.0
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Axis-aligned patch: node (i, j) sits at lat = 40 + j, lon = -100 + i.
    fn aligned_patch(ni: usize, nj: usize) -> CurvilinearTransform {
        let mut lats = Vec::with_capacity(ni * nj);
        let mut lons = Vec::with_capacity(ni * nj);
        for j in 0..nj {
            for i in 0..ni {
                lats.push(40.0 + j as f64);
                lons.push(-100.0 + i as f64);
            }
        }
        CurvilinearTransform::new(ni, nj, lats, lons).unwrap()
    }

    /// Patch rotated by `angle` degrees around its first node.
    fn rotated_patch(ni: usize, nj: usize, angle: f64) -> CurvilinearTransform {
        let (sin, cos) = angle.to_radians().sin_cos();
        let mut lats = Vec::with_capacity(ni * nj);
        let mut lons = Vec::with_capacity(ni * nj);
        for j in 0..nj {
            for i in 0..ni {
                let (u, v) = (i as f64, j as f64);
                lons.push(u * cos - v * sin);
                lats.push(u * sin + v * cos);
            }
        }
        CurvilinearTransform::new(ni, nj, lats, lons).unwrap()
    }

    #[test]
    fn test_forward_at_nodes() {
        let t = aligned_patch(5, 4);
        let (lat, lon) = t.to_lat_lon(2.0, 3.0).unwrap();
        assert!((lat - 43.0).abs() < 1e-12);
        assert!((lon - (-98.0)).abs() < 1e-12);
    }

    #[test]
    fn test_inversion_round_trip() {
        let t = rotated_patch(6, 5, 30.0);
        for &(x, y) in &[(0.0, 0.0), (2.5, 1.5), (4.9, 3.2), (5.0, 4.0)] {
            let (lat, lon) = t.to_lat_lon(x, y).unwrap();
            let (xi, yi) = t.to_grid_xy(lat, lon).unwrap();
            assert!((xi - x).abs() < 1e-6, "x {} != {}", xi, x);
            assert!((yi - y).abs() < 1e-6, "y {} != {}", yi, y);
        }
    }

    #[test]
    fn test_inversion_fails_outside_grid() {
        let t = aligned_patch(4, 4);
        assert!(t.to_grid_xy(40.0, -50.0).is_err());
    }

    #[test]
    fn test_forward_out_of_grid() {
        let t = aligned_patch(4, 4);
        assert!(t.to_lat_lon(-0.5, 0.0).is_err());
        assert!(t.to_lat_lon(0.0, 3.5).is_err());
    }

    #[test]
    fn test_bearing_aligned_grid() {
        let t = aligned_patch(5, 5);
        let b = t.bearing_at(2.0, 2.0).unwrap();
        assert!(b.abs() < 1e-6);
    }

    #[test]
    fn test_bearing_rotated_grid() {
        // Equator-centred patch so the cos(lat) factor stays near 1.
        let t = rotated_patch(6, 6, 45.0);
        let b = t.bearing_at(1.0, 1.0).unwrap().to_degrees();
        assert!((b - 45.0).abs() < 1.0, "bearing {}", b);
    }
}
