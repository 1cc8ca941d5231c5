//! Triangular mesh sampling through the spatial index.

use std::sync::Arc;

use field_common::RecordSource;
use field_grid::{
    sample, Catalog, GridConfig, GridError, Position, SampleMode, SampleOptions,
};
use test_utils::{add_mesh_field, data_selector, MemorySource, GEOM_A};

fn catalog(source: &Arc<MemorySource>) -> Catalog {
    Catalog::new(
        Arc::clone(source) as Arc<dyn RecordSource>,
        GridConfig::default(),
    )
}

/// One triangle: A(0,0)=10, B(1,0)=20, C(0,1)=30.
fn single_triangle() -> (Arc<MemorySource>, Catalog) {
    let mut source = MemorySource::new();
    add_mesh_field(
        &mut source,
        "TT",
        vec![0.0, 1.0, 0.0],
        vec![0.0, 0.0, 1.0],
        vec![[0, 1, 2]],
        GEOM_A,
        &[1000.0],
        |_| vec![10.0, 20.0, 30.0],
    );
    let source = Arc::new(source);
    let catalog = catalog(&source);
    (source, catalog)
}

/// Two triangles forming the unit square, values rising with longitude.
fn split_square() -> (Arc<MemorySource>, Catalog) {
    let mut source = MemorySource::new();
    add_mesh_field(
        &mut source,
        "TT",
        vec![0.0, 1.0, 1.0, 0.0],
        vec![0.0, 0.0, 1.0, 1.0],
        vec![[0, 1, 2], [0, 2, 3]],
        GEOM_A,
        &[1000.0],
        |_| vec![0.0, 10.0, 10.0, 0.0],
    );
    let source = Arc::new(source);
    let catalog = catalog(&source);
    (source, catalog)
}

#[test]
fn test_centroid_interpolation() {
    let (_, catalog) = single_triangle();
    let field = catalog.open(&data_selector("TT")).unwrap();

    let result = sample(
        &field,
        SampleMode::Linear,
        Position::LatLon {
            lat: 1.0 / 3.0,
            lon: 1.0 / 3.0,
        },
        &[1000.0],
        &SampleOptions::default(),
    )
    .unwrap();
    // Equal weights: (10 + 20 + 30) / 3.
    assert!((result[0] - 20.0).abs() < 1e-5);
}

#[test]
fn test_query_at_vertex_is_exact() {
    let (_, catalog) = single_triangle();
    let field = catalog.open(&data_selector("TT")).unwrap();

    let result = sample(
        &field,
        SampleMode::Linear,
        Position::LatLon { lat: 0.0, lon: 0.0 },
        &[1000.0],
        &SampleOptions::default(),
    )
    .unwrap();
    assert_eq!(result, vec![10.0]);
}

#[test]
fn test_nearest_picks_dominant_vertex() {
    let (_, catalog) = single_triangle();
    let field = catalog.open(&data_selector("TT")).unwrap();

    // Close to C: its barycentric weight dominates.
    let result = sample(
        &field,
        SampleMode::Nearest,
        Position::LatLon {
            lat: 0.75,
            lon: 0.1,
        },
        &[1000.0],
        &SampleOptions::default(),
    )
    .unwrap();
    assert_eq!(result, vec![30.0]);
}

#[test]
fn test_point_outside_mesh() {
    let (_, catalog) = single_triangle();
    let field = catalog.open(&data_selector("TT")).unwrap();

    // Outside the indexed extent entirely.
    let err = sample(
        &field,
        SampleMode::Linear,
        Position::LatLon { lat: 2.0, lon: 2.0 },
        &[1000.0],
        &SampleOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, GridError::OutOfRange(_)));

    // Inside the extent but outside every triangle.
    let err = sample(
        &field,
        SampleMode::Linear,
        Position::LatLon { lat: 0.9, lon: 0.9 },
        &[1000.0],
        &SampleOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, GridError::OutOfRange(_)));
}

#[test]
fn test_bucket_search_tries_candidates() {
    let (_, catalog) = split_square();
    let field = catalog.open(&data_selector("TT")).unwrap();

    // Points on both sides of the diagonal, values linear in lon.
    for &(lat, lon) in &[(0.1, 0.9), (0.9, 0.1), (0.5, 0.5)] {
        let result = sample(
            &field,
            SampleMode::Linear,
            Position::LatLon { lat, lon },
            &[1000.0],
            &SampleOptions::default(),
        )
        .unwrap();
        assert!(
            (result[0] - 10.0 * lon as f32).abs() < 1e-5,
            "({}, {}) -> {}",
            lat,
            lon,
            result[0]
        );
    }
}

#[test]
fn test_gridxy_addresses_node() {
    let (_, catalog) = single_triangle();
    let field = catalog.open(&data_selector("TT")).unwrap();

    let result = sample(
        &field,
        SampleMode::Linear,
        Position::GridXY { x: 1.0, y: 0.0 },
        &[1000.0],
        &SampleOptions::default(),
    )
    .unwrap();
    assert_eq!(result, vec![20.0]);
}
