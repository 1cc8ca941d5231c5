//! Shared vocabulary for the field-server workspace.
//!
//! This crate defines the metadata model the grid layer speaks to its
//! external collaborators in:
//!
//! - record selectors, headers, and the [`RecordSource`] trait
//! - the vertical level model and level code conversion
//! - the shared error type
//!
//! It deliberately knows nothing about file formats, tiling, or
//! interpolation; those live in `field-grid` and the surrounding
//! application.

pub mod error;
pub mod record;
pub mod vertical;

// Re-export commonly used types at crate root
pub use error::{FieldError, FieldResult};
pub use record::{
    GeometryPayload, RecordHandle, RecordHeader, RecordKind, RecordSource, Selector,
    TileDescriptor, TopologyKind,
};
pub use vertical::{
    code_to_level, level_to_code, LevelEncoding, LevelType, VerticalReference,
    ENCODING_STRATEGIES,
};
