//! Tiled Grid Cache with Lazy Loading and Topology-Dispatched Sampling
//!
//! This crate manages large gridded fields that are too costly to
//! materialize eagerly. Each grid is split into overlapping tiles that
//! load on demand from an external record store; the geometric
//! description of a grid is derived once and shared between every field
//! on the same grid.
//!
//! # Architecture
//!
//! ```text
//! Query (grid index or lat/lon)
//!      │
//!      ▼
//! sample() ── dispatch on topology
//!      │
//!      ├─► ensure_loaded(tile, level)
//!      │         │
//!      │         ├─► Loaded: return shared buffer
//!      │         │
//!      │         └─► Unloaded: read record (primary then alternate
//!      │             level encoding), or blend source tiles
//!      │
//!      └─► weighted combination of the neighbouring cells
//!               │
//!               ▼
//!          one sample per requested level
//! ```
//!
//! Definitions are deduplicated through a [`DefinitionCache`] owned by a
//! [`Catalog`]; both are plain values, so isolated catalogs can coexist
//! in one process.
//!
//! # Example
//!
//! ```ignore
//! use field_grid::{Catalog, GridConfig, Position, SampleMode, SampleOptions, sample};
//!
//! let catalog = Catalog::new(source, GridConfig::default());
//! let field = catalog.open(&selector)?;
//!
//! let profile = sample(
//!     &field,
//!     SampleMode::Linear,
//!     Position::LatLon { lat: 46.8, lon: -71.2 },
//!     &[1000.0, 850.0, 500.0],
//!     &SampleOptions::default(),
//! )?;
//! ```

pub mod burn;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod definition;
pub mod error;
pub mod instance;
pub mod loader;
pub mod sample;
pub mod tile;

// Re-export commonly used types at crate root
pub use cache::{CacheStats, DefinitionCache};
pub use catalog::Catalog;
pub use config::GridConfig;
pub use definition::{
    DefinitionSignature, GridDefinition, TileFrame, TileLayout, Topology,
};
pub use error::{GridError, Result};
pub use instance::{BlendSources, GridInstance};
pub use sample::{
    sample, sample_vector, Position, SampleMode, SampleOptions, ScatterKernel, BARNES_SHAPE,
};
pub use tile::{LoadState, MaskBuf, Tile};
