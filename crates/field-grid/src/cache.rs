//! Fixed-capacity, deduplicating cache of grid definitions.
//!
//! This is not an LRU: there is no eviction. A full cache refuses the
//! insert and the caller keeps its definition unshared, trading
//! performance for correctness.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::definition::{DefinitionSignature, GridDefinition};
use crate::error::{GridError, Result};

/// Registry of shared grid definitions, deduplicated by signature.
///
/// A fixed slot vector scanned under a single lock; lookups are rare
/// (instance construction only), so scan cost is irrelevant next to
/// geometry derivation.
pub struct DefinitionCache {
    slots: Mutex<Vec<Option<Arc<GridDefinition>>>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    removals: AtomicU64,
}

impl DefinitionCache {
    /// Create a cache with a fixed number of slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(vec![None; capacity]),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            inserts: AtomicU64::new(0),
            removals: AtomicU64::new(0),
        }
    }

    /// Find a registered definition matching the candidate signature.
    pub fn find(&self, candidate: &DefinitionSignature) -> Option<Arc<GridDefinition>> {
        let slots = self.slots.lock().unwrap();
        let found = slots
            .iter()
            .flatten()
            .find(|def| def.signature.matches(candidate))
            .cloned();
        match found {
            Some(def) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(def)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Register a definition in the first free slot.
    pub fn insert(&self, definition: Arc<GridDefinition>) -> Result<()> {
        let mut slots = self.slots.lock().unwrap();
        match slots.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = Some(definition);
                self.inserts.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            None => Err(GridError::CacheExhausted {
                capacity: self.capacity,
            }),
        }
    }

    /// Remove a definition by identity. Returns whether it was present.
    pub fn remove(&self, definition: &GridDefinition) -> bool {
        let mut slots = self.slots.lock().unwrap();
        for slot in slots.iter_mut() {
            let registered = slot
                .as_ref()
                .is_some_and(|def| std::ptr::eq(Arc::as_ptr(def), definition));
            if registered {
                *slot = None;
                self.removals.fetch_add(1, Ordering::Relaxed);
                return true;
            }
        }
        false
    }

    /// Number of registered definitions.
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap().iter().flatten().count()
    }

    /// Whether no definitions are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The fixed slot count.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            removals: self.removals.load(Ordering::Relaxed),
            entries: self.len(),
            capacity: self.capacity,
        }
    }
}

impl std::fmt::Debug for DefinitionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefinitionCache")
            .field("capacity", &self.capacity)
            .field("entries", &self.len())
            .finish()
    }
}

/// Statistics for the definition cache.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub removals: u64,
    pub entries: usize,
    pub capacity: usize,
}

impl CacheStats {
    /// Hit rate over all lookups, 0.0 when none happened yet.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
