//! Curvilinear sampling and vector reorientation.

use std::sync::Arc;

use field_common::RecordSource;
use field_grid::{
    sample, sample_vector, Catalog, GridConfig, GridError, Position, SampleMode,
    SampleOptions,
};
use test_utils::{
    add_curvilinear_field, add_regular_field, create_constant_grid, create_sequence_grid,
    data_selector, MemorySource, GEOM_A, GEOM_B,
};

fn catalog(source: &Arc<MemorySource>) -> Catalog {
    Catalog::new(
        Arc::clone(source) as Arc<dyn RecordSource>,
        GridConfig::default(),
    )
}

/// Axis-aligned 4×4 patch: node (i, j) at lat = 10 + j, lon = 20 + i.
fn aligned_nodes() -> (Vec<f64>, Vec<f64>) {
    let mut lats = Vec::new();
    let mut lons = Vec::new();
    for j in 0..4 {
        for i in 0..4 {
            lats.push(10.0 + j as f64);
            lons.push(20.0 + i as f64);
        }
    }
    (lats, lons)
}

/// 4×4 patch near the equator whose +x axis points north: node (i, j)
/// at lat = i, lon = -j.
fn rotated_nodes() -> (Vec<f64>, Vec<f64>) {
    let mut lats = Vec::new();
    let mut lons = Vec::new();
    for j in 0..4 {
        for i in 0..4 {
            lats.push(i as f64);
            lons.push(-(j as f64));
        }
    }
    (lats, lons)
}

#[test]
fn test_latlon_sampling_matches_grid_values() {
    let (lats, lons) = aligned_nodes();
    let mut source = MemorySource::new();
    add_curvilinear_field(&mut source, "TT", 4, 4, lats, lons, GEOM_A, &[1000.0], |_| {
        create_sequence_grid(4, 4)
    });
    let source = Arc::new(source);
    let catalog = catalog(&source);
    let field = catalog.open(&data_selector("TT")).unwrap();

    // Node (1, 2) holds value 2*4 + 1 + 1 = 10.
    let at_node = sample(
        &field,
        SampleMode::Linear,
        Position::LatLon {
            lat: 12.0,
            lon: 21.0,
        },
        &[1000.0],
        &SampleOptions::default(),
    )
    .unwrap();
    assert!((at_node[0] - 10.0).abs() < 1e-4);

    // Centre of the first cell: (1 + 2 + 5 + 6) / 4.
    let mid_cell = sample(
        &field,
        SampleMode::Linear,
        Position::LatLon {
            lat: 10.5,
            lon: 20.5,
        },
        &[1000.0],
        &SampleOptions::default(),
    )
    .unwrap();
    assert!((mid_cell[0] - 3.5).abs() < 1e-4);
}

#[test]
fn test_gridxy_bypasses_inversion() {
    let (lats, lons) = aligned_nodes();
    let mut source = MemorySource::new();
    add_curvilinear_field(&mut source, "TT", 4, 4, lats, lons, GEOM_A, &[1000.0], |_| {
        create_sequence_grid(4, 4)
    });
    let source = Arc::new(source);
    let catalog = catalog(&source);
    let field = catalog.open(&data_selector("TT")).unwrap();

    let result = sample(
        &field,
        SampleMode::Nearest,
        Position::GridXY { x: 1.0, y: 1.0 },
        &[1000.0],
        &SampleOptions::default(),
    )
    .unwrap();
    assert_eq!(result, vec![6.0]);
}

#[test]
fn test_position_off_patch_is_out_of_range() {
    let (lats, lons) = aligned_nodes();
    let mut source = MemorySource::new();
    add_curvilinear_field(&mut source, "TT", 4, 4, lats, lons, GEOM_A, &[1000.0], |_| {
        create_sequence_grid(4, 4)
    });
    let source = Arc::new(source);
    let catalog = catalog(&source);
    let field = catalog.open(&data_selector("TT")).unwrap();

    let err = sample(
        &field,
        SampleMode::Linear,
        Position::LatLon {
            lat: 50.0,
            lon: 20.0,
        },
        &[1000.0],
        &SampleOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, GridError::OutOfRange(_)));
}

#[test]
fn test_vector_rotation_on_rotated_patch() {
    // Grid +x points geographic north. A grid-relative easterly
    // (u, v) = (1, 0) is a geographic northerly (0, 1).
    let (lats, lons) = rotated_nodes();
    let mut source = MemorySource::new();
    add_curvilinear_field(
        &mut source,
        "UU",
        4,
        4,
        lats.clone(),
        lons.clone(),
        GEOM_A,
        &[1000.0],
        |_| create_constant_grid(4, 4, 1.0),
    );
    add_curvilinear_field(&mut source, "VV", 4, 4, lats, lons, GEOM_A, &[1000.0], |_| {
        create_constant_grid(4, 4, 0.0)
    });
    let source = Arc::new(source);
    let catalog = catalog(&source);

    let u = catalog.open(&data_selector("UU")).unwrap();
    let v = catalog.open(&data_selector("VV")).unwrap();
    assert!(Arc::ptr_eq(u.definition_arc(), v.definition_arc()));

    let pairs = sample_vector(
        &u,
        &v,
        SampleMode::Linear,
        Position::LatLon {
            lat: 1.5,
            lon: -1.5,
        },
        &[1000.0],
        &SampleOptions::default(),
    )
    .unwrap();
    assert_eq!(pairs.len(), 1);
    let (east, north) = pairs[0];
    assert!(east.abs() < 0.05, "east component {}", east);
    assert!((north - 1.0).abs() < 0.05, "north component {}", north);

    // Reorientation preserves magnitude.
    let magnitude = (east * east + north * north).sqrt();
    assert!((magnitude - 1.0).abs() < 1e-3);
}

#[test]
fn test_vector_on_regular_grid_is_unrotated() {
    let mut source = MemorySource::new();
    add_regular_field(&mut source, "UU", 4, 4, GEOM_A, &[1000.0], |_| {
        create_constant_grid(4, 4, 3.0)
    });
    add_regular_field(&mut source, "VV", 4, 4, GEOM_A, &[1000.0], |_| {
        create_constant_grid(4, 4, 4.0)
    });
    let source = Arc::new(source);
    let catalog = catalog(&source);

    let u = catalog.open(&data_selector("UU")).unwrap();
    let v = catalog.open(&data_selector("VV")).unwrap();
    let pairs = sample_vector(
        &u,
        &v,
        SampleMode::Linear,
        Position::GridXY { x: 1.5, y: 1.5 },
        &[1000.0],
        &SampleOptions::default(),
    )
    .unwrap();
    assert_eq!(pairs, vec![(3.0, 4.0)]);
}

#[test]
fn test_vector_components_must_share_grid() {
    let mut source = MemorySource::new();
    add_regular_field(&mut source, "UU", 4, 4, GEOM_A, &[1000.0], |_| {
        create_constant_grid(4, 4, 1.0)
    });
    add_regular_field(&mut source, "VV", 4, 4, GEOM_B, &[1000.0], |_| {
        create_constant_grid(4, 4, 0.0)
    });
    let source = Arc::new(source);
    let catalog = catalog(&source);

    let u = catalog.open(&data_selector("UU")).unwrap();
    let v = catalog.open(&data_selector("VV")).unwrap();
    let err = sample_vector(
        &u,
        &v,
        SampleMode::Linear,
        Position::GridXY { x: 1.0, y: 1.0 },
        &[1000.0],
        &SampleOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, GridError::InconsistentState(_)));
}
