//! Scattered-point sampling: nearest lookup and weighted averaging.

use std::sync::Arc;

use field_common::RecordSource;
use field_grid::{
    sample, Catalog, GridConfig, GridError, Position, SampleMode, SampleOptions,
    ScatterKernel,
};
use test_utils::{add_scattered_field, data_selector, MemorySource, GEOM_A};

fn catalog(source: &Arc<MemorySource>) -> Catalog {
    Catalog::new(
        Arc::clone(source) as Arc<dyn RecordSource>,
        GridConfig::default(),
    )
}

/// Four stations around the origin plus a remote one.
fn station_field() -> (Arc<MemorySource>, Catalog) {
    let mut source = MemorySource::new();
    add_scattered_field(
        &mut source,
        "TT",
        vec![0.0, 1.0, 0.0, -1.0, 5.0],
        vec![0.0, 0.0, 1.0, -1.0, 5.0],
        GEOM_A,
        &[1000.0],
        |_| vec![10.0, 20.0, 30.0, 40.0, 100.0],
    );
    let source = Arc::new(source);
    let catalog = catalog(&source);
    (source, catalog)
}

fn at(lat: f64, lon: f64) -> Position {
    Position::LatLon { lat, lon }
}

#[test]
fn test_nearest_returns_nearest_station() {
    let (_, catalog) = station_field();
    let field = catalog.open(&data_selector("TT")).unwrap();

    let result = sample(
        &field,
        SampleMode::Nearest,
        at(0.1, 0.1),
        &[1000.0],
        &SampleOptions::default(),
    )
    .unwrap();
    assert_eq!(result, vec![10.0]);

    let remote = sample(
        &field,
        SampleMode::Nearest,
        at(4.8, 5.1),
        &[1000.0],
        &SampleOptions::default(),
    )
    .unwrap();
    assert_eq!(remote, vec![100.0]);
}

#[test]
fn test_linear_stays_inside_value_hull() {
    let (_, catalog) = station_field();
    let field = catalog.open(&data_selector("TT")).unwrap();

    for kernel in [ScatterKernel::Barnes, ScatterKernel::Cressman] {
        let options = SampleOptions {
            kernel,
            ..SampleOptions::default()
        };
        for &(lat, lon) in &[(0.0, 0.0), (0.3, 0.2), (0.9, 0.1), (2.0, 2.0)] {
            let result = sample(
                &field,
                SampleMode::Linear,
                at(lat, lon),
                &[1000.0],
                &options,
            )
            .unwrap();
            assert!(
                (10.0..=100.0).contains(&result[0]),
                "{:?} at ({}, {}) -> {}",
                kernel,
                lat,
                lon,
                result[0]
            );
        }
    }
}

#[test]
fn test_query_on_station_is_dominated_by_it() {
    let (_, catalog) = station_field();
    let field = catalog.open(&data_selector("TT")).unwrap();

    for kernel in [ScatterKernel::Barnes, ScatterKernel::Cressman] {
        let options = SampleOptions {
            neighbors: 2,
            kernel,
            ..SampleOptions::default()
        };
        let result = sample(&field, SampleMode::Linear, at(0.0, 0.0), &[1000.0], &options)
            .unwrap();
        assert!(
            (result[0] - 10.0).abs() < 0.5,
            "{:?} -> {}",
            kernel,
            result[0]
        );
    }
}

#[test]
fn test_nearest_weight_grows_with_radius() {
    // Two-station configurations differing only in how far the second
    // station sits. The far station always lies at the influence radius
    // and keeps a fixed weight; a larger radius raises the near
    // station's weight towards its maximum share, pulling the result
    // towards its value.
    let build = |far_lon: f64| {
        let mut source = MemorySource::new();
        add_scattered_field(
            &mut source,
            "TT",
            vec![0.5, far_lon],
            vec![0.0, 0.0],
            GEOM_A,
            &[1000.0],
            |_| vec![10.0, 1000.0],
        );
        let source = Arc::new(source);
        Catalog::new(
            Arc::clone(&source) as Arc<dyn RecordSource>,
            GridConfig::default(),
        )
    };
    let options = SampleOptions {
        neighbors: 2,
        kernel: ScatterKernel::Cressman,
        ..SampleOptions::default()
    };

    let near = build(2.0);
    let tight = sample(
        &near.open(&data_selector("TT")).unwrap(),
        SampleMode::Linear,
        at(0.0, 0.0),
        &[1000.0],
        &options,
    )
    .unwrap();

    let far = build(8.0);
    let wide = sample(
        &far.open(&data_selector("TT")).unwrap(),
        SampleMode::Linear,
        at(0.0, 0.0),
        &[1000.0],
        &options,
    )
    .unwrap();

    assert!(
        (wide[0] - 10.0).abs() < (tight[0] - 10.0).abs(),
        "wide {} should sit closer to 10 than tight {}",
        wide[0],
        tight[0]
    );
}

#[test]
fn test_barnes_shape_override_sharpens_falloff() {
    let (_, catalog) = station_field();
    let field = catalog.open(&data_selector("TT")).unwrap();
    let position = at(0.1, 0.1);

    let default = sample(
        &field,
        SampleMode::Linear,
        position,
        &[1000.0],
        &SampleOptions::default(),
    )
    .unwrap();
    let sharp = sample(
        &field,
        SampleMode::Linear,
        position,
        &[1000.0],
        &SampleOptions {
            barnes_shape: 200.0,
            ..SampleOptions::default()
        },
    )
    .unwrap();
    assert!((sharp[0] - 10.0).abs() <= (default[0] - 10.0).abs());
}

#[test]
fn test_gridxy_addresses_station_directly() {
    let (_, catalog) = station_field();
    let field = catalog.open(&data_selector("TT")).unwrap();

    let result = sample(
        &field,
        SampleMode::Linear,
        Position::GridXY { x: 2.0, y: 0.0 },
        &[1000.0],
        &SampleOptions::default(),
    )
    .unwrap();
    assert_eq!(result, vec![30.0]);

    let err = sample(
        &field,
        SampleMode::Linear,
        Position::GridXY { x: 9.0, y: 0.0 },
        &[1000.0],
        &SampleOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, GridError::OutOfRange(_)));
}
