use ndarray::Array2;
use prjcombine_gowin::{BitSet, Coord, Device, FeatureKey, Tile, bitmap::TileBitmap};

use crate::{
    design::{Cell, IobDirection, Placement},
    error::{Error, Result},
};

pub const BANK_BEL: &str = "BANK";
pub const BANK_MODE: &str = "DEFAULT";

/// A tile of the device together with its writable bit window.
pub(crate) struct TileMut<'a> {
    pub row: usize,
    pub col: usize,
    pub tile: &'a Tile,
    pub bits: &'a mut Array2<u8>,
}

impl TileMut<'_> {
    pub fn set_bits(&mut self, bits: &BitSet) {
        for &(r, c) in bits {
            match self.bits.get_mut((r, c)) {
                Some(bit) => *bit = 1,
                None => log::warn!(
                    "R{row}C{col}: bit ({r}, {c}) lies outside the tile",
                    row = self.row,
                    col = self.col
                ),
            }
        }
    }

    fn bel_feature(&self, bel: &str, key: FeatureKey, mode: bool) -> Result<&BitSet> {
        let Some(b) = self.tile.bels.get(bel) else {
            return Err(Error::UnknownBel {
                row: self.row,
                col: self.col,
                bel: bel.to_string(),
            });
        };
        let found = if mode { b.mode(&key) } else { b.flag(&key) };
        found.ok_or_else(|| Error::UnknownFeature {
            row: self.row,
            col: self.col,
            bel: bel.to_string(),
            feature: key,
        })
    }

    pub fn flag(&self, bel: &str, key: impl Into<FeatureKey>) -> Result<&BitSet> {
        self.bel_feature(bel, key.into(), false)
    }

    pub fn mode(&self, bel: &str, key: impl Into<FeatureKey>) -> Result<&BitSet> {
        self.bel_feature(bel, key.into(), true)
    }
}

/// Looks up the tile at 1-based `(row, col)` and its window, creating an
/// all-zero window if the bitmap has none.
pub(crate) fn tile_mut<'a>(
    device: &'a Device,
    tiles: &'a mut TileBitmap,
    row: usize,
    col: usize,
) -> Result<TileMut<'a>> {
    let Some(tile) = row
        .checked_sub(1)
        .zip(col.checked_sub(1))
        .and_then(|(r, c)| device.tile(r, c))
    else {
        return Err(Error::OutOfGrid { row, col });
    };
    let bits = tiles
        .entry((row - 1, col - 1))
        .or_insert_with(|| Array2::zeros((tile.height, tile.width)));
    Ok(TileMut {
        row,
        col,
        tile,
        bits,
    })
}

/// Bank number and 0-based reference tile for an I/O at 1-based `(row, col)`,
/// or `None` for a tile off the border.
pub fn bank_tile(rows: usize, cols: usize, row: usize, col: usize) -> Option<(u8, Coord)> {
    if row == 1 {
        Some((0, (0, 0)))
    } else if row == rows {
        Some((2, (rows - 1, cols - 1)))
    } else if col == 1 {
        Some((3, (rows - 1, 0)))
    } else if col == cols {
        Some((1, (0, cols - 1)))
    } else {
        None
    }
}

fn place_lut(
    device: &Device,
    tiles: &mut TileBitmap,
    p: &Placement,
    index: u8,
    init: &bitvec::slice::BitSlice,
) -> Result<()> {
    let mut t = tile_mut(device, tiles, p.row, p.col)?;
    let lut = format!("LUT{index}");
    for (pos, bit) in init.iter().by_vals().enumerate() {
        if bit {
            continue;
        }
        let bits = t.flag(&lut, pos as u8)?.clone();
        t.set_bits(&bits);
    }
    let bits = t.mode(&format!("DFF{index}"), "DFF")?.clone();
    t.set_bits(&bits);
    Ok(())
}

fn place_iob(
    device: &Device,
    tiles: &mut TileBitmap,
    p: &Placement,
    index: char,
    dir: IobDirection,
) -> Result<()> {
    let mut t = tile_mut(device, tiles, p.row, p.col)?;
    let iob = format!("IOB{index}");
    let mode = match dir {
        IobDirection::Input => "IBUF",
        IobDirection::Output => "OBUF",
    };
    let mut bits = t.mode(&iob, mode)?.clone();
    if let Ok(shared) = t.flag(&iob, format!("{mode}C")) {
        bits.extend(shared);
    }
    t.set_bits(&bits);

    let Some((bank, (brow, bcol))) = bank_tile(device.rows(), device.cols(), p.row, p.col) else {
        log::debug!("R{}C{}_{iob}: not on the border, no bank", p.row, p.col);
        return Ok(());
    };
    let mut t = tile_mut(device, tiles, brow + 1, bcol + 1)?;
    log::debug!("R{}C{}_{iob}: enabling bank {bank}", p.row, p.col);
    let bits = t.mode(BANK_BEL, BANK_MODE)?.clone();
    t.set_bits(&bits);
    Ok(())
}

/// Sets the configuration bits of every placed cell.  Bits are only ever set.
pub fn place(device: &Device, tiles: &mut TileBitmap, placements: &[Placement]) -> Result<()> {
    for p in placements {
        match p.cell {
            Cell::Lut { index, ref init } => place_lut(device, tiles, p, index, init)?,
            Cell::Iob { index, dir } => place_iob(device, tiles, p, index, dir)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use bitvec::prelude::*;
    use unnamed_entity::EntityVec;

    use super::*;

    fn device() -> Device {
        let mut tile = Tile::new(4, 4);
        for pos in 0..16u8 {
            tile.bel_mut("LUT0")
                .insert_flag(pos, [(pos as usize / 4, pos as usize % 4)]);
        }
        tile.bel_mut("DFF0").insert_mode("DFF", [(3, 3), (0, 0)]);
        let mut tiles = EntityVec::new();
        let kind = tiles.push(tile);
        Device::new(tiles, Array2::from_elem((2, 2), kind), vec![], vec![]).unwrap()
    }

    #[test]
    fn test_bank_tile() {
        assert_eq!(bank_tile(10, 20, 1, 5), Some((0, (0, 0))));
        assert_eq!(bank_tile(10, 20, 1, 20), Some((0, (0, 0))));
        assert_eq!(bank_tile(10, 20, 10, 1), Some((2, (9, 19))));
        assert_eq!(bank_tile(10, 20, 4, 1), Some((3, (9, 0))));
        assert_eq!(bank_tile(10, 20, 4, 20), Some((1, (0, 19))));
        assert_eq!(bank_tile(10, 20, 4, 7), None);
    }

    #[test]
    fn test_lut_bits() {
        let dev = device();
        let mut tiles = TileBitmap::new();
        let p = Placement {
            row: 2,
            col: 1,
            cell: Cell::Lut {
                index: 0,
                init: bitvec![1, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0],
            },
        };
        place(&dev, &mut tiles, &[p]).unwrap();
        assert_eq!(Vec::from_iter(tiles.keys().copied()), vec![(1, 0)]);
        let set: BitSet = tiles[&(1, 0)]
            .indexed_iter()
            .filter(|&(_, &b)| b != 0)
            .map(|(crd, _)| crd)
            .collect();
        assert_eq!(set, BitSet::from([(0, 1), (3, 3), (0, 0)]));
    }

    #[test]
    fn test_errors() {
        let dev = device();
        let mut tiles = TileBitmap::new();
        let lut = |row, col, index| Placement {
            row,
            col,
            cell: Cell::Lut {
                index,
                init: bitvec![0; 16],
            },
        };
        assert_matches!(
            place(&dev, &mut tiles, &[lut(3, 1, 0)]),
            Err(Error::OutOfGrid { row: 3, col: 1 })
        );
        assert_matches!(
            place(&dev, &mut tiles, &[lut(1, 1, 1)]),
            Err(Error::UnknownBel { bel, .. }) if bel == "LUT1"
        );
        let iob = Placement {
            row: 1,
            col: 1,
            cell: Cell::Iob {
                index: 'A',
                dir: IobDirection::Input,
            },
        };
        assert_matches!(
            place(&dev, &mut tiles, &[iob]),
            Err(Error::UnknownBel { bel, .. }) if bel == "IOBA"
        );
    }
}
