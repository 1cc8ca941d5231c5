//! Grid instances: one field on a shared grid definition.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};

use chrono::{DateTime, Utc};
use field_common::{LevelType, RecordSource};

use crate::cache::DefinitionCache;
use crate::definition::GridDefinition;
use crate::error::{GridError, Result};
use crate::tile::Tile;

/// Sources of a time-blended instance.
#[derive(Clone)]
pub struct BlendSources {
    /// Instance at the earlier validity date.
    pub earlier: Arc<GridInstance>,
    /// Instance at the later validity date.
    pub later: Arc<GridInstance>,
    /// Weight of the later source, in [0, 1].
    pub fraction: f64,
}

/// Cached burn output of an instance.
#[derive(Default)]
pub(crate) struct BurnState {
    /// Level index currently materialized.
    pub level: Option<usize>,
    /// Flattened full-grid buffer for that level.
    pub buffer: Option<Arc<Vec<f32>>>,
}

/// One field on a grid: selection metadata, a shared definition, and
/// lazily populated tiles.
///
/// Instances are handed out as `Arc`s; tile buffers load on first use
/// and stay resident until the instance drops. The instance that first
/// derived and registered its definition is the master; dropping it
/// unregisters the definition.
pub struct GridInstance {
    /// Variable name.
    pub variable: String,
    /// Product category.
    pub category: String,
    /// Run label.
    pub label: String,
    /// Validity date.
    pub validity: DateTime<Utc>,

    pub(crate) levels: Vec<f64>,
    /// The field's own vertical type. Kept separate from the shared
    /// definition: a sigma field adopting an eta definition still
    /// encodes its record lookups as sigma.
    pub(crate) level_type: LevelType,
    pub(crate) definition: Arc<GridDefinition>,
    pub(crate) tiles: Vec<Tile>,
    pub(crate) source: Arc<dyn RecordSource>,
    pub(crate) blend: Option<BlendSources>,
    pub(crate) scale: OnceLock<f32>,
    pub(crate) burn_state: Mutex<BurnState>,
    pub(crate) master: bool,
    pub(crate) registry: Weak<DefinitionCache>,

    /// Number of (tile, level) loads performed.
    pub(crate) tile_loads: AtomicU64,
    /// Number of tile-to-destination copies performed by burns.
    pub(crate) burn_copies: AtomicU64,
}

impl GridInstance {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        variable: String,
        category: String,
        label: String,
        validity: DateTime<Utc>,
        levels: Vec<f64>,
        level_type: LevelType,
        definition: Arc<GridDefinition>,
        source: Arc<dyn RecordSource>,
        blend: Option<BlendSources>,
        master: bool,
        registry: Weak<DefinitionCache>,
    ) -> Self {
        let tiles = definition
            .layout
            .frames
            .iter()
            .map(|frame| Tile::new(*frame, levels.len()))
            .collect();
        Self {
            variable,
            category,
            label,
            validity,
            levels,
            level_type,
            definition,
            tiles,
            source,
            blend,
            scale: OnceLock::new(),
            burn_state: Mutex::new(BurnState::default()),
            master,
            registry,
            tile_loads: AtomicU64::new(0),
            burn_copies: AtomicU64::new(0),
        }
    }

    /// The shared grid definition.
    pub fn definition(&self) -> &GridDefinition {
        &self.definition
    }

    /// The shared grid definition handle, for identity comparison.
    pub fn definition_arc(&self) -> &Arc<GridDefinition> {
        &self.definition
    }

    /// The instance's level values, ascending.
    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    /// The field's own vertical coordinate type.
    pub fn level_type(&self) -> LevelType {
        self.level_type
    }

    /// Index of a level value within this instance's level set.
    pub fn level_index(&self, level: f64) -> Option<usize> {
        const EPS: f64 = 1e-6;
        self.levels
            .iter()
            .position(|&l| (l - level).abs() <= EPS * l.abs().max(level.abs()).max(1.0))
    }

    /// Number of tiles.
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Access a tile by index.
    pub fn tile(&self, index: usize) -> Option<&Tile> {
        self.tiles.get(index)
    }

    /// Whether this instance registered its definition.
    pub fn is_master(&self) -> bool {
        self.master
    }

    /// Blend sources, when this instance is a time interpolation.
    pub fn blend(&self) -> Option<&BlendSources> {
        self.blend.as_ref()
    }

    /// Attach a multiplicative factor applied to every buffer at load
    /// time. Settable once; returns whether it took effect.
    pub fn set_scale(&self, factor: f32) -> bool {
        self.scale.set(factor).is_ok()
    }

    /// The post-load scale factor, if set.
    pub fn scale_factor(&self) -> Option<f32> {
        self.scale.get().copied()
    }

    /// Number of (tile, level) loads performed so far.
    pub fn tile_load_count(&self) -> u64 {
        self.tile_loads.load(Ordering::Relaxed)
    }

    /// Number of tile copies performed by burns so far.
    pub fn burn_copy_count(&self) -> u64 {
        self.burn_copies.load(Ordering::Relaxed)
    }

    /// Value of full-grid cell (i, j) at a level index, loading the
    /// owning tile if needed. Masked-out cells read as NaN.
    pub(crate) fn cell(&self, level_idx: usize, i: usize, j: usize) -> Result<f32> {
        let tile_idx = self.definition.layout.tile_for(i, j).ok_or_else(|| {
            GridError::out_of_range(format!(
                "cell ({}, {}) outside {}x{} grid",
                i, j, self.definition.ni, self.definition.nj
            ))
        })?;
        let data = self.ensure_loaded(tile_idx, level_idx)?;
        let tile = &self.tiles[tile_idx];
        let local = tile.frame().local_index(i, j).ok_or_else(|| {
            GridError::inconsistent(format!(
                "cell ({}, {}) not covered by tile {}",
                i, j, tile_idx
            ))
        })?;
        if let Some(mask) = tile.mask(level_idx) {
            if mask.buffer()[local] == 0 {
                return Ok(f32::NAN);
            }
        }
        Ok(data[local])
    }
}

impl Drop for GridInstance {
    fn drop(&mut self) {
        // Owned buffers and masks fall with their Arcs; borrowed masks
        // only drop the alias. The master additionally unregisters the
        // shared definition.
        if self.master {
            if let Some(registry) = self.registry.upgrade() {
                registry.remove(&self.definition);
                tracing::debug!(
                    variable = %self.variable,
                    "master instance dropped, definition unregistered"
                );
            }
        }
    }
}

impl std::fmt::Debug for GridInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridInstance")
            .field("variable", &self.variable)
            .field("category", &self.category)
            .field("validity", &self.validity)
            .field("levels", &self.levels.len())
            .field("tiles", &self.tiles.len())
            .field("master", &self.master)
            .field("blend", &self.blend.is_some())
            .finish()
    }
}
