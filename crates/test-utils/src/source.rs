//! In-memory record source with probe counters.

use std::sync::atomic::{AtomicU64, Ordering};

use field_common::{
    FieldError, FieldResult, GeometryPayload, RecordHandle, RecordHeader, RecordKind,
    RecordSource, Selector,
};

/// One record held by a [`MemorySource`].
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub variable: String,
    pub category: String,
    pub label: String,
    pub validity: chrono::DateTime<chrono::Utc>,
    /// Encoded level; `None` for descriptor records.
    pub level_code: Option<i32>,
    /// Tile index; `None` for untiled records.
    pub tile: Option<usize>,
    pub kind: RecordKind,
    pub header: RecordHeader,
    pub data: Vec<f32>,
    /// Geometry payload, present on at least one record per grid.
    pub geometry: Option<GeometryPayload>,
}

impl StoredRecord {
    fn matches(&self, selector: &Selector) -> bool {
        if self.kind != selector.kind
            || self.variable != selector.variable
            || self.category != selector.category
            || self.label != selector.label
            || self.validity != selector.validity
        {
            return false;
        }
        if let Some(code) = selector.level_code {
            if self.level_code != Some(code) {
                return false;
            }
        }
        if let Some(tile) = selector.tile {
            if self.tile != Some(tile) {
                return false;
            }
        }
        if let Some(geometry) = selector.geometry {
            if self.header.geometry != geometry {
                return false;
            }
        }
        true
    }
}

/// Record source backed by a vector of records, with counters for the
/// calls a test wants to observe (find/read/geometry probes).
#[derive(Debug, Default)]
pub struct MemorySource {
    records: Vec<StoredRecord>,
    find_calls: AtomicU64,
    read_calls: AtomicU64,
    header_calls: AtomicU64,
    geometry_calls: AtomicU64,
}

impl MemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record.
    pub fn push(&mut self, record: StoredRecord) {
        self.records.push(record);
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the source holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of `find` calls so far.
    pub fn find_count(&self) -> u64 {
        self.find_calls.load(Ordering::Relaxed)
    }

    /// Number of `read` calls so far.
    pub fn read_count(&self) -> u64 {
        self.read_calls.load(Ordering::Relaxed)
    }

    /// Number of `header_of` calls so far.
    pub fn header_count(&self) -> u64 {
        self.header_calls.load(Ordering::Relaxed)
    }

    /// Number of `geometry_of` calls so far.
    pub fn geometry_count(&self) -> u64 {
        self.geometry_calls.load(Ordering::Relaxed)
    }

    fn record(&self, handle: RecordHandle) -> FieldResult<&StoredRecord> {
        self.records
            .get(handle.0 as usize)
            .ok_or(FieldError::InvalidHandle(handle.0))
    }
}

impl RecordSource for MemorySource {
    fn find(&self, selector: &Selector) -> Option<RecordHandle> {
        self.find_calls.fetch_add(1, Ordering::Relaxed);
        self.records
            .iter()
            .position(|record| record.matches(selector))
            .map(|index| RecordHandle(index as u64))
    }

    fn read(&self, handle: RecordHandle, dest: &mut Vec<f32>) -> FieldResult<()> {
        self.read_calls.fetch_add(1, Ordering::Relaxed);
        let record = self.record(handle)?;
        dest.clear();
        dest.extend_from_slice(&record.data);
        Ok(())
    }

    fn header_of(&self, handle: RecordHandle) -> FieldResult<RecordHeader> {
        self.header_calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.record(handle)?.header.clone())
    }

    fn level_codes(&self, selector: &Selector) -> Vec<i32> {
        let mut codes = Vec::new();
        for record in &self.records {
            if record.kind != RecordKind::Data
                || record.variable != selector.variable
                || record.category != selector.category
                || record.label != selector.label
                || record.validity != selector.validity
            {
                continue;
            }
            if let Some(code) = record.level_code {
                if !codes.contains(&code) {
                    codes.push(code);
                }
            }
        }
        codes
    }

    fn geometry_of(&self, handle: RecordHandle) -> FieldResult<GeometryPayload> {
        self.geometry_calls.fetch_add(1, Ordering::Relaxed);
        self.record(handle)?
            .geometry
            .clone()
            .ok_or_else(|| FieldError::invalid_metadata("record carries no geometry payload"))
    }
}
