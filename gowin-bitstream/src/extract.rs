use std::collections::{BTreeMap, BTreeSet};

use ndarray::{Array2, ArrayView2};
use prjcombine_gowin::{Bel, BitSet, Coord, Device, FeatureKey, Tile};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Active features of one bel.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct BelState {
    pub flags: BTreeSet<FeatureKey>,
    pub mode: Option<FeatureKey>,
}

impl BelState {
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty() && self.mode.is_none()
    }

    pub fn features(&self) -> impl Iterator<Item = &FeatureKey> {
        self.mode.iter().chain(self.flags.iter())
    }

    pub fn has(&self, key: &FeatureKey) -> bool {
        self.mode.as_ref() == Some(key) || self.flags.contains(key)
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TileFeatures {
    pub bels: BTreeMap<String, BelState>,
    /// dest -> src
    pub pips: BTreeMap<String, String>,
}

/// Extracted features keyed by 0-based tile position.
pub type DesignFeatures = BTreeMap<Coord, TileFeatures>;

fn is_set(bits: ArrayView2<u8>, crd: Coord) -> bool {
    bits.get(crd).is_some_and(|&bit| bit != 0)
}

fn set_within(bits: ArrayView2<u8>, region: &BitSet) -> BitSet {
    region
        .iter()
        .copied()
        .filter(|&crd| is_set(bits, crd))
        .collect()
}

pub fn extract_bel(name: &str, bel: &Bel, bits: ArrayView2<u8>) -> BelState {
    let flags = bel
        .flags
        .iter()
        .filter(|(_, fbits)| fbits.iter().all(|&crd| is_set(bits, crd)))
        .map(|(key, _)| key.clone())
        .collect();
    let mut mode = None;
    if !bel.modes.is_empty() {
        let set = set_within(bits, &bel.mode_bits());
        for (key, mbits) in &bel.modes {
            if *mbits != set {
                continue;
            }
            if let Some(first) = &mode {
                log::warn!("{name}: modes {first} and {key} have the same bits, keeping {first}");
            } else {
                mode = Some(key.clone());
            }
        }
    }
    BelState { flags, mode }
}

pub fn extract_tile(tile: &Tile, bits: ArrayView2<u8>) -> TileFeatures {
    let mut res = TileFeatures::default();
    for (name, bel) in tile.bels_ordered() {
        let state = extract_bel(name, bel, bits);
        if !state.is_empty() {
            res.bels.insert(name.to_string(), state);
        }
    }
    for (dest, srcs) in &tile.pips {
        let region = BitSet::from_iter(srcs.values().flatten().copied());
        let set = set_within(bits, &region);
        if let Some((src, _)) = srcs.iter().find(|(_, sbits)| **sbits == set) {
            res.pips.insert(dest.clone(), src.clone());
        }
    }
    res
}

/// Extracts the features of every tile with at least one bit set.
pub fn extract(device: &Device, data: &Array2<u8>) -> Result<DesignFeatures> {
    let tiles = device.tile_bitmap(data, false)?;
    Ok(tiles
        .par_iter()
        .filter_map(|(&(row, col), bits)| {
            let tile = device.tile(row, col)?;
            log::debug!("extracting R{}C{}", row + 1, col + 1);
            Some(((row, col), extract_tile(tile, bits.view())))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(set: &[Coord]) -> Array2<u8> {
        let mut res = Array2::zeros((4, 4));
        for &crd in set {
            res[crd] = 1;
        }
        res
    }

    #[test]
    fn test_flag_conjunction() {
        let mut bel = Bel::new();
        bel.insert_flag(0u8, [(0, 0), (0, 1)]);
        bel.insert_flag(1u8, [(1, 0)]);
        let state = extract_bel("LUT0", &bel, window(&[(0, 0)]).view());
        assert!(state.is_empty());
        let state = extract_bel("LUT0", &bel, window(&[(0, 0), (0, 1), (2, 2)]).view());
        assert_eq!(state.flags, BTreeSet::from([FeatureKey::Index(0)]));
        assert_eq!(state.mode, None);
    }

    #[test]
    fn test_mode_exclusive() {
        let mut bel = Bel::new();
        bel.insert_mode("DFF", [(0, 0)]);
        bel.insert_mode("DFFS", [(0, 0), (0, 1)]);
        bel.insert_mode("DFFR", [(0, 0), (0, 2)]);
        let mode = |set: &[Coord]| extract_bel("DFF0", &bel, window(set).view()).mode;
        assert_eq!(mode(&[(0, 0)]), Some("DFF".into()));
        assert_eq!(mode(&[(0, 0), (0, 1), (3, 3)]), Some("DFFS".into()));
        assert_eq!(mode(&[(0, 0), (0, 1), (0, 2)]), None);
        assert_eq!(mode(&[(0, 1)]), None);
    }

    #[test]
    fn test_pips() {
        let mut tile = Tile::new(4, 4);
        tile.add_pip("A0", "N100", [(2, 0)]);
        tile.add_pip("A0", "E210", [(2, 1)]);
        tile.add_pip("A0", "F1", [(2, 0), (2, 1)]);
        tile.add_pip("X01", "F0", [(3, 0)]);
        let f = extract_tile(&tile, window(&[(2, 0), (2, 1)]).view());
        assert_eq!(f.pips, BTreeMap::from([("A0".to_string(), "F1".to_string())]));
        let f = extract_tile(&tile, window(&[(2, 1), (3, 0)]).view());
        assert_eq!(f.pips["A0"], "E210");
        assert_eq!(f.pips["X01"], "F0");
        assert!(f.bels.is_empty());
    }
}
