//! Lazy tile loading.
//!
//! Each (tile, level) buffer moves `Unloaded → Loading → Loaded`, or
//! back to `Unloaded` on a failed read. The transition happens under the
//! tile's own lock, so concurrent requesters of the same tile block on
//! the lock instead of loading twice; different tiles load in parallel.
//!
//! A direct instance reads its record from the source, trying the
//! primary level encoding first and the alternate second, then decodes a
//! companion mask record if one exists. A blended instance recursively
//! loads the corresponding source tiles and combines them; its mask is a
//! borrowed alias of the earlier source's mask. A scale factor, if set,
//! applies elementwise after either path.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use field_common::{level_to_code, RecordKind, Selector, ENCODING_STRATEGIES};

use crate::definition::TileFrame;
use crate::error::{GridError, Result};
use crate::instance::{BlendSources, GridInstance};
use crate::tile::{LoadState, MaskBuf};

impl GridInstance {
    /// Ensure the buffer for (tile, level) is resident and return it.
    ///
    /// Blocks while another thread loads the same tile. A failed load
    /// leaves the slot `Unloaded`; the error is the caller's sentinel.
    pub fn ensure_loaded(&self, tile_idx: usize, level_idx: usize) -> Result<Arc<Vec<f32>>> {
        let tile = self.tiles.get(tile_idx).ok_or_else(|| {
            GridError::out_of_range(format!("tile index {} of {}", tile_idx, self.tiles.len()))
        })?;
        let level = *self.levels.get(level_idx).ok_or_else(|| {
            GridError::out_of_range(format!(
                "level index {} of {}",
                level_idx,
                self.levels.len()
            ))
        })?;

        let mut slots = tile.lock_slots();
        let slot = &mut slots[level_idx];
        if slot.state == LoadState::Loaded {
            if let Some(data) = &slot.data {
                return Ok(Arc::clone(data));
            }
        }

        slot.state = LoadState::Loading;
        let frame = *tile.frame();
        let outcome = match &self.blend {
            Some(blend) => self.load_blend(blend, tile_idx, &frame, level),
            None => self.load_direct(&frame, level),
        };

        match outcome {
            Ok((data, mask)) => {
                let data = Arc::new(data);
                slot.data = Some(Arc::clone(&data));
                slot.mask = mask;
                slot.state = LoadState::Loaded;
                self.tile_loads.fetch_add(1, Ordering::Relaxed);
                Ok(data)
            }
            Err(err) => {
                slot.state = LoadState::Unloaded;
                slot.data = None;
                slot.mask = None;
                tracing::warn!(
                    variable = %self.variable,
                    tile = tile_idx,
                    level,
                    error = %err,
                    "tile load failed"
                );
                Err(err)
            }
        }
    }

    /// Read one tile record from the source, trying both level
    /// encodings.
    fn load_direct(&self, frame: &TileFrame, level: f64) -> Result<(Vec<f32>, Option<MaskBuf>)> {
        let level_type = self.level_type;

        let mut found = None;
        for encoding in ENCODING_STRATEGIES {
            let selector = self
                .selector(RecordKind::Data, frame)
                .with_encoding(encoding)
                .with_level_code(level_to_code(level, level_type, encoding));
            if let Some(handle) = self.source.find(&selector) {
                found = Some((handle, selector));
                break;
            }
        }
        let Some((handle, selector)) = found else {
            return Err(GridError::not_found(format!(
                "no record for {} at level {} under either encoding",
                self.variable, level
            )));
        };

        let mut data = Vec::new();
        data.try_reserve_exact(frame.len())
            .map_err(|_| GridError::allocation(format!("tile buffer of {}", frame.len())))?;
        self.source.read(handle, &mut data)?;
        if data.len() != frame.len() {
            return Err(GridError::inconsistent(format!(
                "record holds {} values, tile expects {}",
                data.len(),
                frame.len()
            )));
        }

        // Companion validity mask, stored under the same selection.
        let mask_selector = selector.with_kind(RecordKind::Mask);
        let mask = match self.source.find(&mask_selector) {
            Some(mask_handle) => {
                let mut raw = Vec::new();
                raw.try_reserve_exact(frame.len())
                    .map_err(|_| GridError::allocation(format!("mask buffer of {}", frame.len())))?;
                self.source.read(mask_handle, &mut raw)?;
                if raw.len() != frame.len() {
                    return Err(GridError::inconsistent(format!(
                        "mask holds {} values, tile expects {}",
                        raw.len(),
                        frame.len()
                    )));
                }
                let bits: Vec<u8> = raw.iter().map(|&v| u8::from(v != 0.0)).collect();
                Some(MaskBuf::Owned(Arc::new(bits)))
            }
            None => None,
        };

        self.apply_scale(&mut data);
        Ok((data, mask))
    }

    /// Blend the corresponding source tiles elementwise.
    ///
    /// Only the source tiles' locks are taken during the recursion; the
    /// destination tile's lock is already held by the caller.
    fn load_blend(
        &self,
        blend: &BlendSources,
        tile_idx: usize,
        frame: &TileFrame,
        level: f64,
    ) -> Result<(Vec<f32>, Option<MaskBuf>)> {
        let earlier_idx = blend.earlier.level_index(level).ok_or_else(|| {
            GridError::inconsistent(format!("blend source missing level {}", level))
        })?;
        let later_idx = blend.later.level_index(level).ok_or_else(|| {
            GridError::inconsistent(format!("blend source missing level {}", level))
        })?;

        let earlier = blend.earlier.ensure_loaded(tile_idx, earlier_idx)?;
        let later = blend.later.ensure_loaded(tile_idx, later_idx)?;

        let f1 = blend.fraction as f32;
        let f0 = 1.0 - f1;
        let mut data = Vec::new();
        data.try_reserve_exact(frame.len())
            .map_err(|_| GridError::allocation(format!("blend buffer of {}", frame.len())))?;
        data.extend(
            earlier
                .iter()
                .zip(later.iter())
                .map(|(&e, &l)| e * f0 + l * f1),
        );

        // The mask is aliased from the earlier source, never copied.
        let mask = blend.earlier.tiles[tile_idx]
            .mask(earlier_idx)
            .map(|m| m.borrowed());

        self.apply_scale(&mut data);
        Ok((data, mask))
    }

    fn apply_scale(&self, data: &mut [f32]) {
        if let Some(factor) = self.scale_factor() {
            for value in data.iter_mut() {
                *value *= factor;
            }
        }
    }

    fn selector(&self, kind: RecordKind, frame: &TileFrame) -> Selector {
        let mut selector = Selector::new(
            self.variable.clone(),
            self.category.clone(),
            self.label.clone(),
            self.validity,
        )
        .with_kind(kind);
        if !self.definition.layout.is_untiled() {
            selector = selector.with_tile(frame.index);
        }
        selector
    }
}
