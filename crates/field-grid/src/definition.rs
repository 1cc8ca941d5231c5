//! Shared grid definitions: geometry, tiling layout, and the cache
//! signature that deduplicates them.

use field_common::{LevelType, TileDescriptor, TopologyKind, VerticalReference};
use projection::{CurvilinearTransform, LatLonTransform, SpatialIndex};

use crate::error::{GridError, Result};

/// Placement of one tile within the full grid.
///
/// The padded extent is what a tile record stores; the interior extent
/// is the tile's exclusive share of the grid. Interiors partition the
/// grid, padded extents overlap by the halo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileFrame {
    /// Tile index in row-major tile order.
    pub index: usize,
    /// Padded origin column.
    pub i0: usize,
    /// Padded origin row.
    pub j0: usize,
    /// Padded width.
    pub ni: usize,
    /// Padded height.
    pub nj: usize,
    /// Interior origin column.
    pub int_i0: usize,
    /// Interior origin row.
    pub int_j0: usize,
    /// Interior width.
    pub int_ni: usize,
    /// Interior height.
    pub int_nj: usize,
}

impl TileFrame {
    /// Build a frame from a tile descriptor record.
    pub fn from_descriptor(d: &TileDescriptor) -> Self {
        Self {
            index: d.index,
            i0: d.i0,
            j0: d.j0,
            ni: d.ni,
            nj: d.nj,
            int_i0: d.int_i0,
            int_j0: d.int_j0,
            int_ni: d.int_ni,
            int_nj: d.int_nj,
        }
    }

    /// Frame covering the whole grid, for untiled fields.
    pub fn full(ni: usize, nj: usize) -> Self {
        Self {
            index: 0,
            i0: 0,
            j0: 0,
            ni,
            nj,
            int_i0: 0,
            int_j0: 0,
            int_ni: ni,
            int_nj: nj,
        }
    }

    /// Number of points in the padded extent.
    pub fn len(&self) -> usize {
        self.ni * self.nj
    }

    /// Whether the padded extent is empty.
    pub fn is_empty(&self) -> bool {
        self.ni == 0 || self.nj == 0
    }

    /// Whether (i, j) falls inside the interior extent.
    pub fn contains_interior(&self, i: usize, j: usize) -> bool {
        i >= self.int_i0
            && i < self.int_i0 + self.int_ni
            && j >= self.int_j0
            && j < self.int_j0 + self.int_nj
    }

    /// Index of full-grid cell (i, j) within this tile's padded buffer,
    /// or `None` when the cell is outside the padded extent.
    pub fn local_index(&self, i: usize, j: usize) -> Option<usize> {
        if i < self.i0 || j < self.j0 {
            return None;
        }
        let li = i - self.i0;
        let lj = j - self.j0;
        if li >= self.ni || lj >= self.nj {
            return None;
        }
        Some(lj * self.ni + li)
    }
}

/// Tiling layout of a grid.
#[derive(Debug, Clone)]
pub struct TileLayout {
    /// Number of tile columns.
    pub nti: usize,
    /// Number of tile rows.
    pub ntj: usize,
    /// Halo width shared between adjacent tiles.
    pub halo: usize,
    /// Per-tile placement, in tile index order.
    pub frames: Vec<TileFrame>,
}

impl TileLayout {
    /// Single-tile layout covering the whole grid.
    pub fn untiled(ni: usize, nj: usize) -> Self {
        Self {
            nti: 1,
            ntj: 1,
            halo: 0,
            frames: vec![TileFrame::full(ni, nj)],
        }
    }

    /// Infer the layout from the tile descriptors of a field.
    ///
    /// Tile counts come from the distinct interior origins, the halo
    /// width from the padding of non-edge tiles. Descriptor indices must
    /// cover `0..nti*ntj` without gaps.
    pub fn from_descriptors(descriptors: &[TileDescriptor], ni: usize, nj: usize) -> Result<Self> {
        if descriptors.is_empty() {
            return Err(GridError::inconsistent("tiled field has no tile descriptors"));
        }

        let mut frames: Vec<TileFrame> =
            descriptors.iter().map(TileFrame::from_descriptor).collect();
        frames.sort_by_key(|f| f.index);
        for (expected, frame) in frames.iter().enumerate() {
            if frame.index != expected {
                return Err(GridError::inconsistent(format!(
                    "tile descriptor {} missing (found index {})",
                    expected, frame.index
                )));
            }
        }

        let mut origins_i: Vec<usize> = frames.iter().map(|f| f.int_i0).collect();
        origins_i.sort_unstable();
        origins_i.dedup();
        let mut origins_j: Vec<usize> = frames.iter().map(|f| f.int_j0).collect();
        origins_j.sort_unstable();
        origins_j.dedup();
        let nti = origins_i.len();
        let ntj = origins_j.len();
        if nti * ntj != frames.len() {
            return Err(GridError::inconsistent(format!(
                "{} tile descriptors do not fill a {}x{} tile grid",
                frames.len(),
                nti,
                ntj
            )));
        }

        let halo = frames
            .iter()
            .map(|f| (f.int_i0 - f.i0).max(f.int_j0 - f.j0))
            .max()
            .unwrap_or(0);

        let interior: usize = frames.iter().map(|f| f.int_ni * f.int_nj).sum();
        if interior != ni * nj {
            return Err(GridError::inconsistent(format!(
                "tile interiors cover {} points, grid has {}",
                interior,
                ni * nj
            )));
        }

        Ok(Self {
            nti,
            ntj,
            halo,
            frames,
        })
    }

    /// Total number of tiles.
    pub fn tile_count(&self) -> usize {
        self.frames.len()
    }

    /// Whether the grid is a single untiled block.
    pub fn is_untiled(&self) -> bool {
        self.frames.len() == 1
    }

    /// Index of the tile whose interior contains cell (i, j).
    pub fn tile_for(&self, i: usize, j: usize) -> Option<usize> {
        self.frames
            .iter()
            .position(|f| f.contains_interior(i, j))
    }
}

/// Topology of a grid, carrying the topology-specific lookup data so
/// interpolation cannot pair an algorithm with the wrong structures.
#[derive(Debug, Clone)]
pub enum Topology {
    /// Regular lat/lon grid.
    Regular { transform: LatLonTransform },
    /// Unstructured point cloud with a nearest-neighbour index.
    Scattered { index: SpatialIndex },
    /// Triangular mesh with node coordinates and a triangle bucket
    /// index.
    Mesh {
        index: SpatialIndex,
        /// Node (lon, lat) coordinates.
        nodes: Vec<(f64, f64)>,
        /// Triangles as node index triples.
        triangles: Vec<[u32; 3]>,
    },
    /// Curvilinear grid with a numerically inverted transform.
    Curvilinear { transform: CurvilinearTransform },
}

impl Topology {
    /// The topology tag.
    pub fn kind(&self) -> TopologyKind {
        match self {
            Self::Regular { .. } => TopologyKind::Regular,
            Self::Scattered { .. } => TopologyKind::Scattered,
            Self::Mesh { .. } => TopologyKind::Mesh,
            Self::Curvilinear { .. } => TopologyKind::Curvilinear,
        }
    }
}

/// Cache identity of a grid definition.
///
/// Two definitions are interchangeable when their signatures match; the
/// comparison is intentionally coarser for some topologies (fewer
/// geometry ids) and treats sigma level sets as eta.
#[derive(Debug, Clone, Copy)]
pub struct DefinitionSignature {
    /// Topology tag.
    pub topology: TopologyKind,
    /// Whether the grid is split into tiles.
    pub tiled: bool,
    /// Opaque geometry descriptor ids from the record header.
    pub geometry: [i32; 4],
    /// Vertical type, sigma already normalized to eta.
    pub level_type: LevelType,
    /// Lowest level value.
    pub first_level: f64,
    /// Highest level value.
    pub last_level: f64,
}

impl DefinitionSignature {
    /// Build a signature from header fields and a vertical reference.
    pub fn new(
        topology: TopologyKind,
        tiled: bool,
        geometry: [i32; 4],
        vertical: &VerticalReference,
    ) -> Self {
        Self {
            topology,
            tiled,
            geometry,
            level_type: vertical.level_type().signature_equivalent(),
            first_level: vertical.first().unwrap_or(f64::NAN),
            last_level: vertical.last().unwrap_or(f64::NAN),
        }
    }

    /// Whether two signatures identify the same shareable definition.
    ///
    /// Tiled regular grids compare two geometry ids, mesh and scattered
    /// grids three, everything else the full four.
    pub fn matches(&self, other: &Self) -> bool {
        if self.topology != other.topology || self.tiled != other.tiled {
            return false;
        }
        if self.level_type != other.level_type
            || self.first_level != other.first_level
            || self.last_level != other.last_level
        {
            return false;
        }
        let ids = match self.topology {
            TopologyKind::Regular if self.tiled => 2,
            TopologyKind::Mesh | TopologyKind::Scattered => 3,
            _ => 4,
        };
        self.geometry[..ids] == other.geometry[..ids]
    }
}

/// The shared, immutable geometric description of a grid.
///
/// Built once per distinct signature, registered in the definition
/// cache, and referenced by every instance on the same grid. Read-only
/// after construction, so concurrent reads need no synchronization.
#[derive(Debug)]
pub struct GridDefinition {
    /// Grid width.
    pub ni: usize,
    /// Grid height.
    pub nj: usize,
    /// Horizontal topology with its lookup data.
    pub topology: Topology,
    /// Tiling layout.
    pub layout: TileLayout,
    /// Whether columns wrap around the globe.
    pub wraps: bool,
    /// Whether the grid covers the north pole.
    pub pole_north: bool,
    /// Whether the grid covers the south pole.
    pub pole_south: bool,
    /// Ordered unique level list.
    pub vertical: VerticalReference,
    /// Cache identity.
    pub signature: DefinitionSignature,
}

impl GridDefinition {
    /// The topology tag.
    pub fn kind(&self) -> TopologyKind {
        self.topology.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(
        index: usize,
        i0: usize,
        ni: usize,
        int_i0: usize,
        int_ni: usize,
        nj: usize,
    ) -> TileDescriptor {
        TileDescriptor {
            index,
            i0,
            j0: 0,
            ni,
            nj,
            int_i0,
            int_j0: 0,
            int_ni,
            int_nj: nj,
        }
    }

    fn pressure_levels(levels: Vec<f64>) -> VerticalReference {
        VerticalReference::new(levels, LevelType::Pressure)
    }

    #[test]
    fn test_layout_from_descriptors() {
        // 8x4 grid split in two along I with halo 1.
        let descs = vec![
            descriptor(0, 0, 5, 0, 4, 4),
            descriptor(1, 3, 5, 4, 4, 4),
        ];
        let layout = TileLayout::from_descriptors(&descs, 8, 4).unwrap();
        assert_eq!(layout.nti, 2);
        assert_eq!(layout.ntj, 1);
        assert_eq!(layout.halo, 1);
        assert_eq!(layout.tile_for(3, 0), Some(0));
        assert_eq!(layout.tile_for(4, 0), Some(1));
        assert_eq!(layout.tile_for(8, 0), None);
    }

    #[test]
    fn test_layout_missing_descriptor() {
        let descs = vec![descriptor(1, 3, 5, 4, 4, 4)];
        let err = TileLayout::from_descriptors(&descs, 8, 4).unwrap_err();
        assert!(matches!(err, GridError::InconsistentState(_)));
    }

    #[test]
    fn test_layout_coverage_check() {
        // Interiors cover only half the grid.
        let descs = vec![descriptor(0, 0, 4, 0, 4, 4)];
        assert!(TileLayout::from_descriptors(&descs, 8, 4).is_err());
    }

    #[test]
    fn test_frame_local_index() {
        let frame = TileFrame {
            index: 1,
            i0: 3,
            j0: 0,
            ni: 5,
            nj: 4,
            int_i0: 4,
            int_j0: 0,
            int_ni: 4,
            int_nj: 4,
        };
        assert_eq!(frame.local_index(3, 0), Some(0));
        assert_eq!(frame.local_index(4, 1), Some(6));
        assert_eq!(frame.local_index(2, 0), None);
        assert_eq!(frame.local_index(8, 0), None);
    }

    #[test]
    fn test_signature_tiled_regular_compares_two_ids() {
        let vertical = pressure_levels(vec![1000.0, 500.0]);
        let a = DefinitionSignature::new(
            TopologyKind::Regular,
            true,
            [1, 2, 3, 4],
            &vertical,
        );
        let b = DefinitionSignature::new(
            TopologyKind::Regular,
            true,
            [1, 2, 9, 9],
            &vertical,
        );
        assert!(a.matches(&b));

        let c = DefinitionSignature::new(
            TopologyKind::Regular,
            true,
            [1, 9, 3, 4],
            &vertical,
        );
        assert!(!a.matches(&c));
    }

    #[test]
    fn test_signature_mesh_compares_three_ids() {
        let vertical = pressure_levels(vec![1000.0]);
        let a = DefinitionSignature::new(TopologyKind::Mesh, false, [1, 2, 3, 4], &vertical);
        let b = DefinitionSignature::new(TopologyKind::Mesh, false, [1, 2, 3, 9], &vertical);
        let c = DefinitionSignature::new(TopologyKind::Mesh, false, [1, 2, 9, 9], &vertical);
        assert!(a.matches(&b));
        assert!(!a.matches(&c));
    }

    #[test]
    fn test_signature_untiled_regular_compares_all_ids() {
        let vertical = pressure_levels(vec![1000.0]);
        let a = DefinitionSignature::new(TopologyKind::Regular, false, [1, 2, 3, 4], &vertical);
        let b = DefinitionSignature::new(TopologyKind::Regular, false, [1, 2, 3, 9], &vertical);
        assert!(!a.matches(&b));
        assert!(a.matches(&a));
    }

    #[test]
    fn test_signature_sigma_matches_eta() {
        let sigma = VerticalReference::new(vec![0.5, 1.0], LevelType::Sigma);
        let eta = VerticalReference::new(vec![0.5, 1.0], LevelType::Eta);
        let a = DefinitionSignature::new(TopologyKind::Regular, false, [1, 2, 3, 4], &sigma);
        let b = DefinitionSignature::new(TopologyKind::Regular, false, [1, 2, 3, 4], &eta);
        assert!(a.matches(&b));
    }

    #[test]
    fn test_signature_level_range_must_match() {
        let a = DefinitionSignature::new(
            TopologyKind::Regular,
            false,
            [1, 2, 3, 4],
            &pressure_levels(vec![1000.0, 500.0]),
        );
        let b = DefinitionSignature::new(
            TopologyKind::Regular,
            false,
            [1, 2, 3, 4],
            &pressure_levels(vec![1000.0, 250.0]),
        );
        assert!(!a.matches(&b));
    }
}
