//! The catalog: opening, copying, and deriving grid instances.
//!
//! A catalog owns a record source and a definition cache. It is an
//! explicitly constructed handle, not a process-wide singleton; tests
//! run isolated catalogs side by side.

use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use rayon::prelude::*;

use field_common::{
    GeometryPayload, RecordHandle, RecordHeader, RecordKind, RecordSource, Selector,
    TopologyKind, VerticalReference,
};
use projection::{CurvilinearTransform, LatLonTransform, SpatialIndex};

use crate::cache::DefinitionCache;
use crate::config::GridConfig;
use crate::definition::{DefinitionSignature, GridDefinition, TileLayout, Topology};
use crate::error::{GridError, Result};
use crate::instance::{BlendSources, GridInstance};

/// Factory and registry handle for grid instances.
pub struct Catalog {
    source: Arc<dyn RecordSource>,
    definitions: Arc<DefinitionCache>,
    config: GridConfig,
}

impl Catalog {
    /// Create a catalog with its own definition cache.
    pub fn new(source: Arc<dyn RecordSource>, config: GridConfig) -> Self {
        let definitions = Arc::new(DefinitionCache::with_capacity(
            config.definition_cache_capacity,
        ));
        Self {
            source,
            definitions,
            config,
        }
    }

    /// Create a catalog sharing an existing definition cache.
    pub fn with_cache(
        source: Arc<dyn RecordSource>,
        definitions: Arc<DefinitionCache>,
        config: GridConfig,
    ) -> Self {
        Self {
            source,
            definitions,
            config,
        }
    }

    /// The definition cache.
    pub fn definitions(&self) -> &Arc<DefinitionCache> {
        &self.definitions
    }

    /// The catalog configuration.
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Open the field matching a selector.
    ///
    /// The first matching record supplies the grid signature. On a cache
    /// hit the shared definition is adopted as-is; otherwise the full
    /// geometry is derived from the source and registered, making the
    /// new instance the definition's master. A full cache degrades to an
    /// unshared definition with a warning.
    pub fn open(&self, selector: &Selector) -> Result<Arc<GridInstance>> {
        let handle = self.source.find(selector).ok_or_else(|| {
            tracing::warn!(variable = %selector.variable, "no record matches selector");
            GridError::not_found(format!("no record for {}", selector.variable))
        })?;
        let header = self.source.header_of(handle)?;

        let codes = self.source.level_codes(selector);
        let vertical = VerticalReference::from_codes(&codes)?;
        // The instance keeps its own vertical type: signature matching
        // may hand a sigma field an eta definition, but its record
        // lookups stay sigma-encoded.
        let level_type = vertical.level_type();
        let candidate =
            DefinitionSignature::new(header.topology, header.tiled, header.geometry, &vertical);

        let (definition, master) = match self.definitions.find(&candidate) {
            Some(shared) => {
                tracing::debug!(
                    variable = %selector.variable,
                    topology = %header.topology,
                    "definition cache hit"
                );
                (shared, false)
            }
            None => {
                let definition =
                    Arc::new(self.derive_definition(selector, handle, &header, vertical, candidate)?);
                let master = match self.definitions.insert(Arc::clone(&definition)) {
                    Ok(()) => true,
                    Err(err) => {
                        tracing::warn!(
                            variable = %selector.variable,
                            error = %err,
                            "definition not cached, proceeding unshared"
                        );
                        false
                    }
                };
                (definition, master)
            }
        };

        let levels = definition.vertical.levels().to_vec();
        Ok(Arc::new(GridInstance::new(
            selector.variable.clone(),
            selector.category.clone(),
            selector.label.clone(),
            selector.validity,
            levels,
            level_type,
            definition,
            Arc::clone(&self.source),
            None,
            master,
            Arc::downgrade(&self.definitions),
        )))
    }

    /// Create a self-contained copy of an instance, optionally
    /// restricted to one level.
    ///
    /// Every tile of every retained level is loaded eagerly (tiles in
    /// parallel), so the copy never goes back to the source or to blend
    /// parents afterwards.
    pub fn copy_level(
        &self,
        source: &Arc<GridInstance>,
        level: Option<f64>,
    ) -> Result<Arc<GridInstance>> {
        let levels = match level {
            Some(value) => {
                if source.level_index(value).is_none() {
                    tracing::warn!(variable = %source.variable, level = value, "copy of unknown level");
                    return Err(GridError::out_of_range(format!(
                        "level {} not in instance",
                        value
                    )));
                }
                vec![value]
            }
            None => source.levels().to_vec(),
        };

        let copy = Arc::new(GridInstance::new(
            source.variable.clone(),
            source.category.clone(),
            source.label.clone(),
            source.validity,
            levels,
            source.level_type(),
            Arc::clone(source.definition_arc()),
            Arc::clone(&source.source),
            source.blend().cloned(),
            false,
            Weak::new(),
        ));
        if let Some(factor) = source.scale_factor() {
            copy.set_scale(factor);
        }

        let level_count = copy.levels().len();
        (0..copy.tile_count())
            .into_par_iter()
            .try_for_each(|tile_idx| {
                for level_idx in 0..level_count {
                    match copy.ensure_loaded(tile_idx, level_idx) {
                        Ok(_) => {}
                        // Missing records were already logged by the
                        // loader; the copy stays sparse there.
                        Err(GridError::NotFound(_)) => {}
                        Err(err) => return Err(err),
                    }
                }
                Ok(())
            })?;

        Ok(copy)
    }

    /// Create a lazily blended instance between two dates.
    ///
    /// The sources must share one grid definition and the target date
    /// must lie inside `[earlier.validity, later.validity]`. Tiles blend
    /// on demand with weight `(target - earlier) / (later - earlier)`.
    pub fn time_interpolate(
        &self,
        earlier: &Arc<GridInstance>,
        later: &Arc<GridInstance>,
        target: DateTime<Utc>,
    ) -> Result<Arc<GridInstance>> {
        if !Arc::ptr_eq(earlier.definition_arc(), later.definition_arc()) {
            return Err(GridError::inconsistent(
                "blend sources use different grid definitions",
            ));
        }
        let span = (later.validity - earlier.validity).num_milliseconds();
        if span <= 0 {
            return Err(GridError::inconsistent(
                "blend sources must be ordered in time",
            ));
        }
        if target < earlier.validity || target > later.validity {
            tracing::warn!(
                variable = %earlier.variable,
                target = %target,
                "blend target outside source interval"
            );
            return Err(GridError::out_of_range(format!(
                "target {} outside [{}, {}]",
                target, earlier.validity, later.validity
            )));
        }
        let fraction = (target - earlier.validity).num_milliseconds() as f64 / span as f64;

        Ok(Arc::new(GridInstance::new(
            earlier.variable.clone(),
            earlier.category.clone(),
            earlier.label.clone(),
            target,
            earlier.levels().to_vec(),
            earlier.level_type(),
            Arc::clone(earlier.definition_arc()),
            Arc::clone(&earlier.source),
            Some(BlendSources {
                earlier: Arc::clone(earlier),
                later: Arc::clone(later),
                fraction,
            }),
            false,
            Weak::new(),
        )))
    }

    /// Derive a full grid definition from the record source.
    ///
    /// Reads the tile descriptors (for tiled fields) and the geometry
    /// payload; performed only on a definition cache miss.
    fn derive_definition(
        &self,
        selector: &Selector,
        handle: RecordHandle,
        header: &RecordHeader,
        vertical: VerticalReference,
        signature: DefinitionSignature,
    ) -> Result<GridDefinition> {
        let layout = if header.tiled {
            let descriptors = self.read_tile_descriptors(selector)?;
            TileLayout::from_descriptors(&descriptors, header.ni, header.nj)?
        } else {
            TileLayout::untiled(header.ni, header.nj)
        };

        let payload = self.source.geometry_of(handle)?;
        let topology = build_topology(header, payload)?;

        tracing::debug!(
            variable = %selector.variable,
            topology = %header.topology,
            ni = header.ni,
            nj = header.nj,
            tiles = layout.tile_count(),
            halo = layout.halo,
            "derived grid definition"
        );

        Ok(GridDefinition {
            ni: header.ni,
            nj: header.nj,
            topology,
            layout,
            wraps: header.wraps,
            pole_north: header.pole_north,
            pole_south: header.pole_south,
            vertical,
            signature,
        })
    }

    /// Read consecutive tile descriptor records until the first gap.
    fn read_tile_descriptors(
        &self,
        selector: &Selector,
    ) -> Result<Vec<field_common::TileDescriptor>> {
        let mut descriptors = Vec::new();
        for index in 0.. {
            let descriptor_selector = Selector::new(
                selector.variable.clone(),
                selector.category.clone(),
                selector.label.clone(),
                selector.validity,
            )
            .with_kind(RecordKind::TileDescriptor)
            .with_tile(index);
            let Some(handle) = self.source.find(&descriptor_selector) else {
                break;
            };
            let header = self.source.header_of(handle)?;
            let descriptor = header.tile.ok_or_else(|| {
                GridError::inconsistent(format!(
                    "descriptor record for tile {} carries no tile info",
                    index
                ))
            })?;
            descriptors.push(descriptor);
        }
        if descriptors.is_empty() {
            return Err(GridError::inconsistent(
                "tiled field has no tile descriptors",
            ));
        }
        Ok(descriptors)
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("definitions", &self.definitions)
            .field("config", &self.config)
            .finish()
    }
}

/// Build the topology variant from a header and its geometry payload.
fn build_topology(header: &RecordHeader, payload: GeometryPayload) -> Result<Topology> {
    match (header.topology, payload) {
        (
            TopologyKind::Regular,
            GeometryPayload::Regular {
                first_lat,
                first_lon,
                dlat,
                dlon,
            },
        ) => Ok(Topology::Regular {
            transform: LatLonTransform::new(
                first_lat,
                first_lon,
                dlat,
                dlon,
                header.ni,
                header.nj,
                header.wraps,
            ),
        }),
        (TopologyKind::Scattered, GeometryPayload::Scattered { lats, lons }) => {
            let points: Vec<(f64, f64)> =
                lons.iter().copied().zip(lats.iter().copied()).collect();
            if points.len() != header.ni * header.nj {
                return Err(GridError::inconsistent(format!(
                    "{} scattered points for a grid of {}",
                    points.len(),
                    header.ni * header.nj
                )));
            }
            Ok(Topology::Scattered {
                index: SpatialIndex::from_points(&points),
            })
        }
        (TopologyKind::Mesh, GeometryPayload::Mesh { lats, lons, triangles }) => {
            let nodes: Vec<(f64, f64)> =
                lons.iter().copied().zip(lats.iter().copied()).collect();
            let boxes: Vec<(f64, f64, f64, f64)> = triangles
                .iter()
                .map(|tri| {
                    let mut bbox = (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
                    for &v in tri {
                        let (lon, lat) = *nodes.get(v as usize).ok_or_else(|| {
                            GridError::inconsistent(format!(
                                "triangle vertex {} outside {} nodes",
                                v,
                                nodes.len()
                            ))
                        })?;
                        bbox.0 = bbox.0.min(lon);
                        bbox.1 = bbox.1.min(lat);
                        bbox.2 = bbox.2.max(lon);
                        bbox.3 = bbox.3.max(lat);
                    }
                    Ok(bbox)
                })
                .collect::<Result<_>>()?;
            let mut index = SpatialIndex::from_points(&nodes);
            index.insert_payloads(&boxes);
            Ok(Topology::Mesh {
                index,
                nodes,
                triangles,
            })
        }
        (TopologyKind::Curvilinear, GeometryPayload::Curvilinear { lats, lons }) => {
            let transform = CurvilinearTransform::new(header.ni, header.nj, lats, lons)
                .ok_or_else(|| {
                    GridError::inconsistent("curvilinear node arrays do not match grid dimensions")
                })?;
            Ok(Topology::Curvilinear { transform })
        }
        (kind, payload) => Err(GridError::inconsistent(format!(
            "{} geometry payload does not fit {} topology",
            payload_kind(&payload),
            kind
        ))),
    }
}

fn payload_kind(payload: &GeometryPayload) -> &'static str {
    match payload {
        GeometryPayload::Regular { .. } => "regular",
        GeometryPayload::Scattered { .. } => "scattered",
        GeometryPayload::Mesh { .. } => "mesh",
        GeometryPayload::Curvilinear { .. } => "curvilinear",
    }
}
