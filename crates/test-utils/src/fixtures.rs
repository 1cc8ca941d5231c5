//! Fixture builders populating a [`MemorySource`] with fields of every
//! topology.
//!
//! All fixtures share one validity date, category, and label, so a data
//! selector only needs the variable name. Values are supplied per level
//! through a closure receiving the level index.

use chrono::{DateTime, TimeZone, Utc};

use field_common::{
    level_to_code, GeometryPayload, LevelEncoding, LevelType, RecordHeader, RecordKind,
    Selector, TileDescriptor, TopologyKind,
};

use crate::source::{MemorySource, StoredRecord};

/// Category shared by all fixture records.
pub const CATEGORY: &str = "forecast";
/// Label shared by all fixture records.
pub const LABEL: &str = "r1";

/// Geometry ids of the first fixture grid.
pub const GEOM_A: [i32; 4] = [101, 102, 103, 104];
/// Geometry ids of a second, distinct grid.
pub const GEOM_B: [i32; 4] = [201, 202, 203, 204];

/// Validity date shared by all fixture records.
pub fn base_validity() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
}

/// A later validity date, for time-blend fixtures.
pub fn later_validity() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 18, 0, 0).unwrap()
}

/// Data selector for a fixture variable at the base validity.
pub fn data_selector(variable: &str) -> Selector {
    Selector::new(variable, CATEGORY, LABEL, base_validity())
}

/// Unit-degree transform payload: grid (x, y) equals (lon, lat).
pub fn unit_payload() -> GeometryPayload {
    GeometryPayload::Regular {
        first_lat: 0.0,
        first_lon: 0.0,
        dlat: 1.0,
        dlon: 1.0,
    }
}

fn header(
    topology: TopologyKind,
    ni: usize,
    nj: usize,
    geometry: [i32; 4],
    level_code: i32,
    tiled: bool,
    tile: Option<TileDescriptor>,
    wraps: bool,
    validity: DateTime<Utc>,
) -> RecordHeader {
    RecordHeader {
        ni,
        nj,
        validity,
        level_code,
        geometry,
        topology,
        tiled,
        tile,
        wraps,
        pole_north: false,
        pole_south: false,
    }
}

/// Add an untiled regular field: pressure levels, primary encoding, unit
/// transform.
pub fn add_regular_field(
    source: &mut MemorySource,
    variable: &str,
    ni: usize,
    nj: usize,
    geometry: [i32; 4],
    levels: &[f64],
    values: impl Fn(usize) -> Vec<f32>,
) {
    add_regular_field_opts(
        source,
        variable,
        ni,
        nj,
        geometry,
        levels,
        LevelType::Pressure,
        LevelEncoding::Primary,
        false,
        unit_payload(),
        base_validity(),
        values,
    );
}

/// Add an untiled regular field with explicit level type, encoding,
/// wraparound, payload, and validity.
#[allow(clippy::too_many_arguments)]
pub fn add_regular_field_opts(
    source: &mut MemorySource,
    variable: &str,
    ni: usize,
    nj: usize,
    geometry: [i32; 4],
    levels: &[f64],
    level_type: LevelType,
    encoding: LevelEncoding,
    wraps: bool,
    payload: GeometryPayload,
    validity: DateTime<Utc>,
    values: impl Fn(usize) -> Vec<f32>,
) {
    for (level_idx, &level) in levels.iter().enumerate() {
        let code = level_to_code(level, level_type, encoding);
        source.push(StoredRecord {
            variable: variable.to_string(),
            category: CATEGORY.to_string(),
            label: LABEL.to_string(),
            validity,
            level_code: Some(code),
            tile: None,
            kind: RecordKind::Data,
            header: header(
                TopologyKind::Regular,
                ni,
                nj,
                geometry,
                code,
                false,
                None,
                wraps,
                validity,
            ),
            data: values(level_idx),
            geometry: Some(payload.clone()),
        });
    }
}

/// Add a globally wrapping regular field (dlon = 360 / ni).
pub fn add_wrapping_field(
    source: &mut MemorySource,
    variable: &str,
    ni: usize,
    nj: usize,
    geometry: [i32; 4],
    levels: &[f64],
    values: impl Fn(usize) -> Vec<f32>,
) {
    let payload = GeometryPayload::Regular {
        first_lat: -90.0,
        first_lon: 0.0,
        dlat: 180.0 / (nj - 1) as f64,
        dlon: 360.0 / ni as f64,
    };
    add_regular_field_opts(
        source,
        variable,
        ni,
        nj,
        geometry,
        levels,
        LevelType::Pressure,
        LevelEncoding::Primary,
        true,
        payload,
        base_validity(),
        values,
    );
}

/// Descriptors of a grid split into two tiles along I at column
/// `ni / 2`, each padded into its neighbour by `halo` columns.
pub fn two_tile_frames(ni: usize, nj: usize, halo: usize) -> [TileDescriptor; 2] {
    let split = ni / 2;
    [
        TileDescriptor {
            index: 0,
            i0: 0,
            j0: 0,
            ni: split + halo,
            nj,
            int_i0: 0,
            int_j0: 0,
            int_ni: split,
            int_nj: nj,
        },
        TileDescriptor {
            index: 1,
            i0: split - halo,
            j0: 0,
            ni: ni - split + halo,
            nj,
            int_i0: split,
            int_j0: 0,
            int_ni: ni - split,
            int_nj: nj,
        },
    ]
}

/// Copy a tile's padded block out of a full grid.
pub fn padded_block(full: &[f32], ni: usize, descriptor: &TileDescriptor) -> Vec<f32> {
    let mut block = Vec::with_capacity(descriptor.ni * descriptor.nj);
    for j in descriptor.j0..descriptor.j0 + descriptor.nj {
        let row = j * ni + descriptor.i0;
        block.extend_from_slice(&full[row..row + descriptor.ni]);
    }
    block
}

/// Add a regular field split into two halo-padded tiles along I, with
/// descriptor records. `values` produces the full grid per level; tile
/// records receive the matching padded blocks.
#[allow(clippy::too_many_arguments)]
pub fn add_split_field(
    source: &mut MemorySource,
    variable: &str,
    ni: usize,
    nj: usize,
    halo: usize,
    wraps: bool,
    geometry: [i32; 4],
    levels: &[f64],
    values: impl Fn(usize) -> Vec<f32>,
) {
    let frames = two_tile_frames(ni, nj, halo);
    let validity = base_validity();
    let payload = unit_payload();

    for descriptor in &frames {
        source.push(StoredRecord {
            variable: variable.to_string(),
            category: CATEGORY.to_string(),
            label: LABEL.to_string(),
            validity,
            level_code: None,
            tile: Some(descriptor.index),
            kind: RecordKind::TileDescriptor,
            header: header(
                TopologyKind::Regular,
                ni,
                nj,
                geometry,
                0,
                true,
                Some(*descriptor),
                wraps,
                validity,
            ),
            data: Vec::new(),
            geometry: None,
        });
    }

    for (level_idx, &level) in levels.iter().enumerate() {
        let code = level_to_code(level, LevelType::Pressure, LevelEncoding::Primary);
        let full = values(level_idx);
        assert_eq!(full.len(), ni * nj, "fixture values must cover the grid");
        for descriptor in &frames {
            source.push(StoredRecord {
                variable: variable.to_string(),
                category: CATEGORY.to_string(),
                label: LABEL.to_string(),
                validity,
                level_code: Some(code),
                tile: Some(descriptor.index),
                kind: RecordKind::Data,
                header: header(
                    TopologyKind::Regular,
                    ni,
                    nj,
                    geometry,
                    code,
                    true,
                    Some(*descriptor),
                    wraps,
                    validity,
                ),
                data: padded_block(&full, ni, descriptor),
                geometry: Some(payload.clone()),
            });
        }
    }
}

/// Add a companion validity mask for an untiled regular field record.
/// Non-zero mask values mark valid cells.
pub fn add_mask(
    source: &mut MemorySource,
    variable: &str,
    ni: usize,
    nj: usize,
    geometry: [i32; 4],
    level: f64,
    mask: Vec<f32>,
) {
    let validity = base_validity();
    let code = level_to_code(level, LevelType::Pressure, LevelEncoding::Primary);
    source.push(StoredRecord {
        variable: variable.to_string(),
        category: CATEGORY.to_string(),
        label: LABEL.to_string(),
        validity,
        level_code: Some(code),
        tile: None,
        kind: RecordKind::Mask,
        header: header(
            TopologyKind::Regular,
            ni,
            nj,
            geometry,
            code,
            false,
            None,
            false,
            validity,
        ),
        data: mask,
        geometry: None,
    });
}

/// Add a scattered-point field; `ni` is the point count, `nj` is 1.
#[allow(clippy::too_many_arguments)]
pub fn add_scattered_field(
    source: &mut MemorySource,
    variable: &str,
    lons: Vec<f64>,
    lats: Vec<f64>,
    geometry: [i32; 4],
    levels: &[f64],
    values: impl Fn(usize) -> Vec<f32>,
) {
    let count = lons.len();
    assert_eq!(count, lats.len(), "fixture coordinate arrays must agree");
    let payload = GeometryPayload::Scattered { lats, lons };
    let validity = base_validity();
    for (level_idx, &level) in levels.iter().enumerate() {
        let code = level_to_code(level, LevelType::Pressure, LevelEncoding::Primary);
        source.push(StoredRecord {
            variable: variable.to_string(),
            category: CATEGORY.to_string(),
            label: LABEL.to_string(),
            validity,
            level_code: Some(code),
            tile: None,
            kind: RecordKind::Data,
            header: header(
                TopologyKind::Scattered,
                count,
                1,
                geometry,
                code,
                false,
                None,
                false,
                validity,
            ),
            data: values(level_idx),
            geometry: Some(payload.clone()),
        });
    }
}

/// Add a triangular mesh field; `ni` is the node count, `nj` is 1.
#[allow(clippy::too_many_arguments)]
pub fn add_mesh_field(
    source: &mut MemorySource,
    variable: &str,
    lons: Vec<f64>,
    lats: Vec<f64>,
    triangles: Vec<[u32; 3]>,
    geometry: [i32; 4],
    levels: &[f64],
    values: impl Fn(usize) -> Vec<f32>,
) {
    let count = lons.len();
    assert_eq!(count, lats.len(), "fixture coordinate arrays must agree");
    let payload = GeometryPayload::Mesh {
        lats,
        lons,
        triangles,
    };
    let validity = base_validity();
    for (level_idx, &level) in levels.iter().enumerate() {
        let code = level_to_code(level, LevelType::Pressure, LevelEncoding::Primary);
        source.push(StoredRecord {
            variable: variable.to_string(),
            category: CATEGORY.to_string(),
            label: LABEL.to_string(),
            validity,
            level_code: Some(code),
            tile: None,
            kind: RecordKind::Data,
            header: header(
                TopologyKind::Mesh,
                count,
                1,
                geometry,
                code,
                false,
                None,
                false,
                validity,
            ),
            data: values(level_idx),
            geometry: Some(payload.clone()),
        });
    }
}

/// Add a curvilinear field from row-major node coordinate arrays.
#[allow(clippy::too_many_arguments)]
pub fn add_curvilinear_field(
    source: &mut MemorySource,
    variable: &str,
    ni: usize,
    nj: usize,
    lats: Vec<f64>,
    lons: Vec<f64>,
    geometry: [i32; 4],
    levels: &[f64],
    values: impl Fn(usize) -> Vec<f32>,
) {
    assert_eq!(lats.len(), ni * nj, "fixture node arrays must cover the grid");
    let payload = GeometryPayload::Curvilinear { lats, lons };
    let validity = base_validity();
    for (level_idx, &level) in levels.iter().enumerate() {
        let code = level_to_code(level, LevelType::Pressure, LevelEncoding::Primary);
        source.push(StoredRecord {
            variable: variable.to_string(),
            category: CATEGORY.to_string(),
            label: LABEL.to_string(),
            validity,
            level_code: Some(code),
            tile: None,
            kind: RecordKind::Data,
            header: header(
                TopologyKind::Curvilinear,
                ni,
                nj,
                geometry,
                code,
                false,
                None,
                false,
                validity,
            ),
            data: values(level_idx),
            geometry: Some(payload.clone()),
        });
    }
}
