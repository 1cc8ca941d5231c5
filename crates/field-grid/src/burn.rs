//! Burn: materializing one level's tiles into a full-grid buffer.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::error::{GridError, Result};
use crate::instance::GridInstance;

impl GridInstance {
    /// Assemble the full NI×NJ field for a level value.
    ///
    /// Single-tile grids hand back the tile buffer itself; multi-tile
    /// grids copy each tile's interior rows (halo excluded) into a
    /// destination buffer. The instance caches the result per level:
    /// burning the same level again is a no-op, burning another level
    /// replaces the cached buffer. Buffers returned earlier stay valid —
    /// they simply no longer track the instance.
    pub fn burn(&self, level: f64) -> Result<Arc<Vec<f32>>> {
        let level_idx = self.level_index(level).ok_or_else(|| {
            tracing::warn!(variable = %self.variable, level, "burn of unknown level");
            GridError::out_of_range(format!("level {} not in instance", level))
        })?;

        let mut state = self.burn_state.lock().unwrap();
        if state.level == Some(level_idx) {
            if let Some(buffer) = &state.buffer {
                return Ok(Arc::clone(buffer));
            }
        }

        let definition = self.definition();
        let frame = self.tiles[0].frame();
        let buffer = if self.tiles.len() == 1
            && frame.ni == definition.ni
            && frame.nj == definition.nj
        {
            self.ensure_loaded(0, level_idx)?
        } else {
            let (ni, nj) = (definition.ni, definition.nj);
            let mut dest = Vec::new();
            dest.try_reserve_exact(ni * nj)
                .map_err(|_| GridError::allocation(format!("burn buffer of {}", ni * nj)))?;
            dest.resize(ni * nj, f32::NAN);

            for (tile_idx, tile) in self.tiles.iter().enumerate() {
                let data = self.ensure_loaded(tile_idx, level_idx)?;
                let frame = tile.frame();
                let halo_cols = frame.int_i0 - frame.i0;
                for row in 0..frame.int_nj {
                    let j = frame.int_j0 + row;
                    let src = (j - frame.j0) * frame.ni + halo_cols;
                    let dst = j * ni + frame.int_i0;
                    dest[dst..dst + frame.int_ni]
                        .copy_from_slice(&data[src..src + frame.int_ni]);
                }
                self.burn_copies.fetch_add(1, Ordering::Relaxed);
            }
            Arc::new(dest)
        };

        state.level = Some(level_idx);
        state.buffer = Some(Arc::clone(&buffer));
        Ok(buffer)
    }
}
