//! Tiles: independently locked sub-blocks holding per-level buffers.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::definition::TileFrame;

/// Load state of one (tile, level) buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// No data resident.
    #[default]
    Unloaded,
    /// A loader owns the tile lock and is populating the buffer.
    Loading,
    /// Data resident; the buffer is safe for unsynchronized reads.
    Loaded,
}

/// A validity mask buffer with explicit ownership.
///
/// A time-blended instance reuses the mask of its earlier source rather
/// than copying it; the `Borrowed` tag records that the mask belongs to
/// someone else, so releasing the instance releases only the alias.
#[derive(Debug, Clone)]
pub enum MaskBuf {
    /// Mask loaded and owned by this instance.
    Owned(Arc<Vec<u8>>),
    /// Alias of another instance's mask.
    Borrowed(Arc<Vec<u8>>),
}

impl MaskBuf {
    /// The mask bytes, non-zero meaning valid.
    pub fn buffer(&self) -> &Arc<Vec<u8>> {
        match self {
            Self::Owned(buf) | Self::Borrowed(buf) => buf,
        }
    }

    /// Whether this instance owns the mask storage.
    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Owned(_))
    }

    /// A borrowed alias of this mask.
    pub fn borrowed(&self) -> MaskBuf {
        Self::Borrowed(Arc::clone(self.buffer()))
    }
}

/// Per-level storage of a tile.
#[derive(Debug, Default)]
pub struct LevelSlot {
    /// Load state.
    pub state: LoadState,
    /// Field values over the padded extent, row-major.
    pub data: Option<Arc<Vec<f32>>>,
    /// Optional validity mask over the same extent.
    pub mask: Option<MaskBuf>,
}

/// One rectangular sub-block of a grid instance.
///
/// The slot vector is guarded by the tile's own lock; holding it across
/// a load is what serializes concurrent requesters of the same tile.
/// Buffers are handed out as `Arc`s, so readers never hold the lock.
#[derive(Debug)]
pub struct Tile {
    frame: TileFrame,
    slots: Mutex<Vec<LevelSlot>>,
}

impl Tile {
    /// Create an empty tile with one slot per level.
    pub fn new(frame: TileFrame, levels: usize) -> Self {
        let mut slots = Vec::with_capacity(levels);
        slots.resize_with(levels, LevelSlot::default);
        Self {
            frame,
            slots: Mutex::new(slots),
        }
    }

    /// The tile's placement within the grid.
    pub fn frame(&self) -> &TileFrame {
        &self.frame
    }

    /// Whether the buffer for a level is resident.
    pub fn is_loaded(&self, level: usize) -> bool {
        self.slots
            .lock()
            .unwrap()
            .get(level)
            .is_some_and(|slot| slot.state == LoadState::Loaded)
    }

    /// The data buffer for a level, if resident.
    pub fn data(&self, level: usize) -> Option<Arc<Vec<f32>>> {
        self.slots
            .lock()
            .unwrap()
            .get(level)
            .and_then(|slot| slot.data.clone())
    }

    /// The validity mask for a level, if any.
    pub fn mask(&self, level: usize) -> Option<MaskBuf> {
        self.slots
            .lock()
            .unwrap()
            .get(level)
            .and_then(|slot| slot.mask.clone())
    }

    /// Lock the slot vector for a load.
    pub(crate) fn lock_slots(&self) -> MutexGuard<'_, Vec<LevelSlot>> {
        self.slots.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tile_is_unloaded() {
        let tile = Tile::new(TileFrame::full(4, 4), 3);
        assert!(!tile.is_loaded(0));
        assert!(tile.data(0).is_none());
        assert!(tile.mask(2).is_none());
        assert!(!tile.is_loaded(99));
    }

    #[test]
    fn test_mask_ownership_tags() {
        let owned = MaskBuf::Owned(Arc::new(vec![1, 0, 1]));
        assert!(owned.is_owned());

        let alias = owned.borrowed();
        assert!(!alias.is_owned());
        assert!(Arc::ptr_eq(owned.buffer(), alias.buffer()));
    }

    #[test]
    fn test_loaded_slot_visible() {
        let tile = Tile::new(TileFrame::full(2, 2), 1);
        {
            let mut slots = tile.lock_slots();
            slots[0].data = Some(Arc::new(vec![1.0, 2.0, 3.0, 4.0]));
            slots[0].state = LoadState::Loaded;
        }
        assert!(tile.is_loaded(0));
        assert_eq!(tile.data(0).unwrap().as_slice(), &[1.0, 2.0, 3.0, 4.0]);
    }
}
