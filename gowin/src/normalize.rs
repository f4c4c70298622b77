//! One-time database cleanups, run after a device has been loaded and before it
//! is used for packing or unpacking.

use itertools::Itertools;

use crate::{
    db::{Bel, BitSet, Device, FeatureKey, Tile},
    names::{BelKind, BelName},
};

pub const LUT_PORTS: [(&str, char); 5] = [
    ("F", 'F'),
    ("I0", 'A'),
    ("I1", 'B'),
    ("I2", 'C'),
    ("I3", 'D'),
];

/// Name of the flag that takes over the bits a mode shares with another bel.
pub fn shared_flag_key(mode: &FeatureKey) -> FeatureKey {
    FeatureKey::Name(format!("{mode}C"))
}

fn split_shared_bits(bel: &mut Bel, common: &BitSet) {
    let Bel { flags, modes, .. } = bel;
    for (mode, bits) in modes.iter_mut() {
        let shared: BitSet = bits.intersection(common).copied().collect();
        if shared.is_empty() {
            continue;
        }
        bits.retain(|bit| !shared.contains(bit));
        flags
            .entry(shared_flag_key(mode))
            .or_default()
            .extend(shared);
    }
}

impl Tile {
    /// Moves mode bits claimed by two bels with different mode regions into
    /// `<mode>C` flags on both bels, so that each bel's modes can be matched
    /// exactly without seeing the other bel's bits.
    pub fn split_shared_mode_bits(&mut self) {
        for (name_a, name_b) in self.bel_order.clone().into_iter().tuple_combinations() {
            let bits_a = self.bels[&name_a].mode_bits();
            let bits_b = self.bels[&name_b].mode_bits();
            if bits_a == bits_b {
                continue;
            }
            let common: BitSet = bits_a.intersection(&bits_b).copied().collect();
            if common.is_empty() {
                continue;
            }
            log::debug!("{name_a} and {name_b} share mode bits {common:?}");
            for name in [&name_a, &name_b] {
                if let Some(bel) = self.bels.get_mut(name) {
                    split_shared_bits(bel, &common);
                }
            }
        }
    }

    /// Fills in the fixed port map of every LUT that does not have one yet,
    /// numbering wires by the LUT's instance index.
    pub fn assign_lut_portmaps(&mut self) {
        let luts = Vec::from_iter(
            self.bel_order
                .iter()
                .filter(|name| BelName::parse(name).is_some_and(|n| n.kind == BelKind::Lut))
                .cloned(),
        );
        for name in luts {
            let Some(idx) = self.bel_index(&name) else {
                continue;
            };
            let bel = self.bel_mut(name);
            if !bel.portmap.is_empty() {
                continue;
            }
            for (port, wire) in LUT_PORTS {
                bel.portmap.insert(port.to_string(), format!("{wire}{idx}"));
            }
        }
    }

    pub fn normalize(&mut self) {
        self.split_shared_mode_bits();
        self.assign_lut_portmaps();
    }
}

impl Device {
    pub fn normalize(&mut self) {
        for tile in self.tiles.values_mut() {
            tile.normalize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> FeatureKey {
        FeatureKey::from(name)
    }

    #[test]
    fn test_split_shared() {
        let mut tile = Tile::new(8, 8);
        let a = tile.bel_mut("IOBA");
        a.insert_mode("IBUF", [(0, 0), (0, 1)]);
        a.insert_mode("OBUF", [(0, 0), (1, 1)]);
        let b = tile.bel_mut("IOBB");
        b.insert_mode("IBUF", [(0, 1), (2, 2)]);
        b.insert_mode("OBUF", [(2, 3)]);
        tile.split_shared_mode_bits();

        let a = &tile.bels["IOBA"];
        assert_eq!(a.modes[&key("IBUF")], BitSet::from([(0, 0)]));
        assert_eq!(a.modes[&key("OBUF")], BitSet::from([(0, 0), (1, 1)]));
        assert_eq!(a.flags[&key("IBUFC")], BitSet::from([(0, 1)]));
        assert!(!a.flags.contains_key(&key("OBUFC")));
        let b = &tile.bels["IOBB"];
        assert_eq!(b.modes[&key("IBUF")], BitSet::from([(2, 2)]));
        assert_eq!(b.flags[&key("IBUFC")], BitSet::from([(0, 1)]));
        assert!(b.mode_bits().is_disjoint(&a.mode_bits()));
    }

    #[test]
    fn test_split_identical_regions() {
        let mut tile = Tile::new(8, 8);
        tile.bel_mut("DFF0").insert_mode("DFF", [(1, 1)]);
        tile.bel_mut("DFF1").insert_mode("DFF", [(1, 1)]);
        let before = tile.clone();
        tile.split_shared_mode_bits();
        assert_eq!(tile, before);
    }

    #[test]
    fn test_lut_portmaps() {
        let mut tile = Tile::new(8, 8);
        for name in ["LUT0", "DFF0", "LUT1", "IOBA"] {
            tile.bel_mut(name);
        }
        tile.bel_mut("IOBA")
            .portmap
            .insert("I".to_string(), "D6".to_string());
        tile.normalize();
        let lut1 = &tile.bels["LUT1"].portmap;
        assert_eq!(lut1["F"], "F1");
        assert_eq!(lut1["I0"], "A1");
        assert_eq!(lut1["I3"], "D1");
        assert_eq!(tile.bels["LUT0"].portmap["I2"], "C0");
        assert!(tile.bels["DFF0"].portmap.is_empty());
        assert_eq!(tile.bels["IOBA"].portmap.len(), 1);
    }
}
