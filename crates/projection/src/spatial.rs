//! Bucketed spatial index for scattered points and mesh triangles.
//!
//! Points are binned into a regular lon/lat cell grid sized from the
//! point count. Nearest-neighbour queries expand outward ring by ring
//! until no closer candidate can exist; containment queries return the
//! payloads (triangle ids) registered over the query cell.
//!
//! Distances are planar degrees with a cos(latitude) correction on the
//! longitude axis; callers only compare or ratio them, so the metric
//! needs to be monotonic, not geodesic.

/// Cells per axis are capped to keep the bucket table small for huge
/// point sets.
const MAX_CELLS_PER_AXIS: usize = 256;
/// Padding around the point extent so boundary points stay inside.
const EXTENT_EPS: f64 = 1e-9;

/// Spatial index over a set of geographic points.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    min_lon: f64,
    min_lat: f64,
    nx: usize,
    ny: usize,
    cell_w: f64,
    cell_h: f64,
    points: Vec<(f64, f64)>,
    point_cells: Vec<Vec<u32>>,
    payload_cells: Vec<Vec<u32>>,
}

impl SpatialIndex {
    /// Build an index over `points` given as (lon, lat) pairs.
    pub fn from_points(points: &[(f64, f64)]) -> Self {
        let mut min_lon = f64::INFINITY;
        let mut min_lat = f64::INFINITY;
        let mut max_lon = f64::NEG_INFINITY;
        let mut max_lat = f64::NEG_INFINITY;
        for &(lon, lat) in points {
            min_lon = min_lon.min(lon);
            min_lat = min_lat.min(lat);
            max_lon = max_lon.max(lon);
            max_lat = max_lat.max(lat);
        }
        if points.is_empty() {
            min_lon = 0.0;
            min_lat = 0.0;
            max_lon = 1.0;
            max_lat = 1.0;
        }
        min_lon -= EXTENT_EPS;
        min_lat -= EXTENT_EPS;
        max_lon += EXTENT_EPS;
        max_lat += EXTENT_EPS;

        let per_axis = (((points.len() as f64 / 2.0).sqrt().ceil()) as usize)
            .clamp(1, MAX_CELLS_PER_AXIS);
        let nx = per_axis;
        let ny = per_axis;
        let cell_w = (max_lon - min_lon) / nx as f64;
        let cell_h = (max_lat - min_lat) / ny as f64;

        let mut index = Self {
            min_lon,
            min_lat,
            nx,
            ny,
            cell_w,
            cell_h,
            points: points.to_vec(),
            point_cells: vec![Vec::new(); nx * ny],
            payload_cells: Vec::new(),
        };
        for (id, &(lon, lat)) in points.iter().enumerate() {
            let (cx, cy) = index.cell_of(lon, lat);
            index.point_cells[cy * nx + cx].push(id as u32);
        }
        index
    }

    /// Register payloads (e.g. triangles) by bounding box. Payload `p`
    /// becomes a candidate of every cell its box overlaps.
    pub fn insert_payloads(&mut self, boxes: &[(f64, f64, f64, f64)]) {
        self.payload_cells = vec![Vec::new(); self.nx * self.ny];
        for (id, &(min_lon, min_lat, max_lon, max_lat)) in boxes.iter().enumerate() {
            let (cx0, cy0) = self.cell_of(min_lon, min_lat);
            let (cx1, cy1) = self.cell_of(max_lon, max_lat);
            for cy in cy0..=cy1 {
                for cx in cx0..=cx1 {
                    self.payload_cells[cy * self.nx + cx].push(id as u32);
                }
            }
        }
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the index holds no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Coordinates of an indexed point.
    pub fn point(&self, id: usize) -> (f64, f64) {
        self.points[id]
    }

    /// The `k` nearest points to (lon, lat), closest first, with their
    /// distances. Returns fewer than `k` entries when the index holds
    /// fewer points.
    pub fn nearest_k(&self, lon: f64, lat: f64, k: usize) -> Vec<(usize, f64)> {
        if k == 0 || self.points.is_empty() {
            return Vec::new();
        }
        let (qx, qy) = self.cell_of(lon, lat);
        let max_ring = self.nx.max(self.ny);
        // Minimum separation per ring of cells, under the same scaled
        // metric distance() uses. The (ring - 1) accounts for the query
        // sitting anywhere within its own cell.
        let cos_q = lat.to_radians().cos().abs().min(1.0);
        let min_cell = (self.cell_w * cos_q).min(self.cell_h);

        let mut hits: Vec<(usize, f64)> = Vec::new();
        for ring in 0..=max_ring {
            for (cx, cy) in ring_cells(qx, qy, ring, self.nx, self.ny) {
                for &id in &self.point_cells[cy * self.nx + cx] {
                    let (plon, plat) = self.points[id as usize];
                    hits.push((id as usize, distance(lon, lat, plon, plat)));
                }
            }
            if ring > 0 && hits.len() >= k {
                hits.sort_by(|a, b| a.1.total_cmp(&b.1));
                let kth = hits[k - 1].1;
                if kth <= (ring - 1) as f64 * min_cell {
                    break;
                }
            }
        }
        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits.truncate(k);
        hits
    }

    /// Candidate payload ids for the cell containing (lon, lat). Empty
    /// when the position falls outside the indexed extent or no payloads
    /// were registered.
    pub fn bucket_at(&self, lon: f64, lat: f64) -> &[u32] {
        if self.payload_cells.is_empty() || !self.contains(lon, lat) {
            return &[];
        }
        let (cx, cy) = self.cell_of(lon, lat);
        &self.payload_cells[cy * self.nx + cx]
    }

    fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon
            && lat >= self.min_lat
            && lon <= self.min_lon + self.cell_w * self.nx as f64
            && lat <= self.min_lat + self.cell_h * self.ny as f64
    }

    fn cell_of(&self, lon: f64, lat: f64) -> (usize, usize) {
        let cx = ((lon - self.min_lon) / self.cell_w).floor() as isize;
        let cy = ((lat - self.min_lat) / self.cell_h).floor() as isize;
        (
            cx.clamp(0, self.nx as isize - 1) as usize,
            cy.clamp(0, self.ny as isize - 1) as usize,
        )
    }
}

/// Planar distance in degrees with longitude scaled by cos(mean
/// latitude).
pub fn distance(a_lon: f64, a_lat: f64, b_lon: f64, b_lat: f64) -> f64 {
    let mid = ((a_lat + b_lat) / 2.0).to_radians();
    let mut dlon = b_lon - a_lon;
    if dlon > 180.0 {
        dlon -= 360.0;
    } else if dlon < -180.0 {
        dlon += 360.0;
    }
    let dx = dlon * mid.cos();
    let dy = b_lat - a_lat;
    (dx * dx + dy * dy).sqrt()
}

/// Cells at Chebyshev distance `ring` from (qx, qy), clipped to the
/// grid.
fn ring_cells(
    qx: usize,
    qy: usize,
    ring: usize,
    nx: usize,
    ny: usize,
) -> impl Iterator<Item = (usize, usize)> {
    let r = ring as isize;
    let (qx, qy) = (qx as isize, qy as isize);
    let (nx, ny) = (nx as isize, ny as isize);
    let mut cells = Vec::new();
    for dy in -r..=r {
        for dx in -r..=r {
            if dx.abs().max(dy.abs()) != r {
                continue;
            }
            let cx = qx + dx;
            let cy = qy + dy;
            if cx >= 0 && cy >= 0 && cx < nx && cy < ny {
                cells.push((cx as usize, cy as usize));
            }
        }
    }
    cells.into_iter()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_points() -> Vec<(f64, f64)> {
        vec![
            (0.0, 0.0),
            (1.0, 0.0),
            (0.0, 1.0),
            (5.0, 5.0),
            (10.0, 0.0),
            (3.0, 4.0),
        ]
    }

    #[test]
    fn test_nearest_one() {
        let index = SpatialIndex::from_points(&sample_points());
        let hits = index.nearest_k(0.1, 0.1, 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, 0);
    }

    #[test]
    fn test_nearest_k_sorted() {
        let index = SpatialIndex::from_points(&sample_points());
        let hits = index.nearest_k(0.0, 0.0, 4);
        assert_eq!(hits.len(), 4);
        for pair in hits.windows(2) {
            assert!(pair[0].1 <= pair[1].1);
        }
        assert_eq!(hits[0].0, 0);
        assert_eq!(hits[0].1, 0.0);
    }

    #[test]
    fn test_nearest_k_exhausts_small_sets() {
        let index = SpatialIndex::from_points(&[(0.0, 0.0), (1.0, 1.0)]);
        let hits = index.nearest_k(0.0, 0.0, 10);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_bucket_payloads() {
        let mut index = SpatialIndex::from_points(&sample_points());
        index.insert_payloads(&[(0.0, 0.0, 1.0, 1.0), (4.0, 4.0, 6.0, 6.0)]);

        assert!(index.bucket_at(0.5, 0.5).contains(&0));
        assert!(index.bucket_at(5.0, 5.0).contains(&1));
        assert!(index.bucket_at(100.0, 0.0).is_empty());
    }

    #[test]
    fn test_distance_scales_longitude() {
        // One degree of longitude at 60N spans half a degree of arc.
        let d = distance(0.0, 60.0, 1.0, 60.0);
        assert!((d - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_distance_wraps_longitude() {
        let d = distance(179.5, 0.0, -179.5, 0.0);
        assert!((d - 1.0).abs() < 1e-9);
    }
}
