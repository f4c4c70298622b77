use std::collections::BTreeMap;

use ndarray::{Array2, s};

use crate::{
    db::{Coord, Device},
    error::ChipDbError,
};

/// Per-tile bit windows keyed by 0-based grid position.
pub type TileBitmap = BTreeMap<Coord, Array2<u8>>;

/// Where a tile's bit window sits within the full-chip bit grid.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TileWindow {
    pub y: usize,
    pub x: usize,
    pub height: usize,
    pub width: usize,
}

impl Device {
    pub fn tile_windows(&self) -> impl Iterator<Item = (Coord, TileWindow)> + '_ {
        let mut y = 0;
        self.grid.rows().into_iter().enumerate().flat_map(move |(row, kinds)| {
            let top = y;
            y += self.tiles[kinds[0]].height;
            let mut x = 0;
            kinds
                .into_iter()
                .enumerate()
                .map(move |(col, &kind)| {
                    let tile = &self.tiles[kind];
                    let window = TileWindow {
                        y: top,
                        x,
                        height: tile.height,
                        width: tile.width,
                    };
                    x += tile.width;
                    ((row, col), window)
                })
                .collect::<Vec<_>>()
        })
    }

    fn check_shape(&self, found: (usize, usize)) -> Result<(), ChipDbError> {
        let expected = (self.height(), self.width());
        if found != expected {
            return Err(ChipDbError::GridShape { expected, found });
        }
        Ok(())
    }

    /// Splits a full-chip bit grid into per-tile windows.  All-zero tiles are only
    /// included when `empty` is set.
    pub fn tile_bitmap(&self, bitmap: &Array2<u8>, empty: bool) -> Result<TileBitmap, ChipDbError> {
        self.check_shape(bitmap.dim())?;
        let mut res = TileBitmap::new();
        for (crd, w) in self.tile_windows() {
            let tile = bitmap.slice(s![w.y..w.y + w.height, w.x..w.x + w.width]);
            if empty || tile.iter().any(|&bit| bit != 0) {
                res.insert(crd, tile.to_owned());
            }
        }
        Ok(res)
    }

    /// Reassembles per-tile windows into a full-chip bit grid.  Missing tiles are zero.
    pub fn fuse_bitmap(&self, tiles: &TileBitmap) -> Result<Array2<u8>, ChipDbError> {
        let mut res = Array2::zeros((self.height(), self.width()));
        for (crd, w) in self.tile_windows() {
            let Some(tile) = tiles.get(&crd) else {
                continue;
            };
            if tile.dim() != (w.height, w.width) {
                return Err(ChipDbError::GridShape {
                    expected: (w.height, w.width),
                    found: tile.dim(),
                });
            }
            res.slice_mut(s![w.y..w.y + w.height, w.x..w.x + w.width])
                .assign(tile);
        }
        Ok(res)
    }
}
