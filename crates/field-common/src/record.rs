//! Record selectors, headers, and the record-source interface.
//!
//! A record source holds raw field records keyed by selection metadata:
//! variable, category, label, validity date, level code, and (for tiled
//! grids) a tile index. The grid layer never touches the on-disk format;
//! everything goes through [`RecordSource`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FieldResult;
use crate::vertical::LevelEncoding;

/// Opaque handle to a record inside a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordHandle(pub u64);

/// The kind of payload a record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    /// Field values for one tile and level.
    Data,
    /// Companion validity mask for a data record (non-zero = valid).
    Mask,
    /// Tile geometry descriptor (no payload).
    TileDescriptor,
}

impl RecordKind {
    /// Get the kind as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Mask => "mask",
            Self::TileDescriptor => "tile_descriptor",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Horizontal grid topology tag carried in record headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopologyKind {
    /// Regular lat/lon grid with constant spacing.
    Regular,
    /// Unstructured point cloud.
    Scattered,
    /// Triangular mesh over unstructured nodes.
    Mesh,
    /// Curvilinear grid with per-node coordinates.
    Curvilinear,
}

impl TopologyKind {
    /// Get the topology as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Scattered => "scattered",
            Self::Mesh => "mesh",
            Self::Curvilinear => "curvilinear",
        }
    }
}

impl std::fmt::Display for TopologyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Selection criteria for locating records in a source.
///
/// `None` fields act as wildcards: a selector with `level_code: None`
/// matches records at any level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selector {
    /// Variable name (e.g. "TT").
    pub variable: String,
    /// Product category.
    pub category: String,
    /// Free-form run label.
    pub label: String,
    /// Validity date of the field.
    pub validity: DateTime<Utc>,
    /// Level encoding the `level_code` is expressed in.
    pub encoding: LevelEncoding,
    /// Encoded vertical level, or any level.
    pub level_code: Option<i32>,
    /// Tile index for tiled grids, or any tile.
    pub tile: Option<usize>,
    /// Payload kind to match.
    pub kind: RecordKind,
    /// Restrict matches to records with these geometry ids.
    pub geometry: Option<[i32; 4]>,
}

impl Selector {
    /// Create a data selector matching any level and tile.
    pub fn new(
        variable: impl Into<String>,
        category: impl Into<String>,
        label: impl Into<String>,
        validity: DateTime<Utc>,
    ) -> Self {
        Self {
            variable: variable.into(),
            category: category.into(),
            label: label.into(),
            validity,
            encoding: LevelEncoding::Primary,
            level_code: None,
            tile: None,
            kind: RecordKind::Data,
            geometry: None,
        }
    }

    /// Restrict to a specific encoded level.
    pub fn with_level_code(mut self, code: i32) -> Self {
        self.level_code = Some(code);
        self
    }

    /// Restrict to a specific tile index.
    pub fn with_tile(mut self, tile: usize) -> Self {
        self.tile = Some(tile);
        self
    }

    /// Select a different record kind.
    pub fn with_kind(mut self, kind: RecordKind) -> Self {
        self.kind = kind;
        self
    }

    /// Mark the level code as expressed in the given encoding.
    pub fn with_encoding(mut self, encoding: LevelEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Restrict matches to records carrying these geometry ids.
    pub fn with_geometry(mut self, geometry: [i32; 4]) -> Self {
        self.geometry = Some(geometry);
        self
    }
}

/// Placement of one tile within the full grid.
///
/// Padded extents include the halo overlap with neighbouring tiles;
/// interior extents partition the full grid without overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileDescriptor {
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

/// Decoded header of a record.
///
/// `ni`/`nj` are always the full-grid dimensions; a tiled record's own
/// extent lives in its [`TileDescriptor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordHeader {
    /// Full grid width.
    pub ni: usize,
    /// Full grid height.
    pub nj: usize,
    /// Validity date.
    pub validity: DateTime<Utc>,
    /// Encoded vertical level.
    pub level_code: i32,
    /// Opaque geometry descriptor ids.
    pub geometry: [i32; 4],
    /// Horizontal topology.
    pub topology: TopologyKind,
    /// Whether the grid is split into tiles.
    pub tiled: bool,
    /// This record's tile placement, if tiled.
    pub tile: Option<TileDescriptor>,
    /// Whether the grid wraps around in the column direction.
    pub wraps: bool,
    /// Whether the grid covers the north pole.
    pub pole_north: bool,
    /// Whether the grid covers the south pole.
    pub pole_south: bool,
}

/// Geometric payload needed to build a grid's horizontal transform.
///
/// Read once per distinct geometry when a grid definition is first
/// derived; shared definitions never re-read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GeometryPayload {
    /// Regular lat/lon grid parameters.
    Regular {
        first_lat: f64,
        first_lon: f64,
        dlat: f64,
        dlon: f64,
    },
    /// Coordinates of each scattered point.
    Scattered { lats: Vec<f64>, lons: Vec<f64> },
    /// Mesh node coordinates plus triangle vertex indices.
    Mesh {
        lats: Vec<f64>,
        lons: Vec<f64>,
        triangles: Vec<[u32; 3]>,
    },
    /// Per-node coordinates of a curvilinear grid, row-major.
    Curvilinear { lats: Vec<f64>, lons: Vec<f64> },
}

/// Interface to an external store of raw field records.
///
/// Implementations must be safe to call from multiple threads; the grid
/// layer issues concurrent finds and reads during parallel tile loads.
pub trait RecordSource: Send + Sync {
    /// Find the first record matching the selector.
    fn find(&self, selector: &Selector) -> Option<RecordHandle>;

    /// Read a record's payload into `dest`, replacing its contents.
    fn read(&self, handle: RecordHandle, dest: &mut Vec<f32>) -> FieldResult<()>;

    /// Decode a record's header.
    fn header_of(&self, handle: RecordHandle) -> FieldResult<RecordHeader>;

    /// All distinct level codes of data records matching the selector,
    /// ignoring its level restriction.
    fn level_codes(&self, selector: &Selector) -> Vec<i32>;

    /// Read the geometric payload backing a record's grid.
    fn geometry_of(&self, handle: RecordHandle) -> FieldResult<GeometryPayload>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_selector_builder() {
        let validity = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let sel = Selector::new("TT", "forecast", "run42", validity)
            .with_level_code(500)
            .with_tile(3)
            .with_kind(RecordKind::Mask);

        assert_eq!(sel.variable, "TT");
        assert_eq!(sel.level_code, Some(500));
        assert_eq!(sel.tile, Some(3));
        assert_eq!(sel.kind, RecordKind::Mask);
        assert_eq!(sel.geometry, None);
    }

    #[test]
    fn test_topology_kind_display() {
        assert_eq!(TopologyKind::Regular.to_string(), "regular");
        assert_eq!(TopologyKind::Curvilinear.to_string(), "curvilinear");
    }
}
