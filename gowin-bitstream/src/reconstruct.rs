//! Turns extracted tile features back into primitive instances.

use bitvec::vec::BitVec;
use prjcombine_gowin::{
    Bel, Device, FeatureKey,
    names::{BelKind, BelName, tile_scoped},
    normalize::LUT_PORTS,
};

use crate::{
    design::LUT_SIZE,
    error::{Error, Result},
    extract::{BelState, DesignFeatures, TileFeatures},
    netlist::{Module, ParamValue, Primitive},
};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum FlipFlopKind {
    Dff,
    DffS,
    DffR,
    DffP,
    DffC,
    DffN,
    DffNS,
    DffNR,
    DffNP,
    DffNC,
}

impl FlipFlopKind {
    pub const ALL: [FlipFlopKind; 10] = [
        FlipFlopKind::Dff,
        FlipFlopKind::DffS,
        FlipFlopKind::DffR,
        FlipFlopKind::DffP,
        FlipFlopKind::DffC,
        FlipFlopKind::DffN,
        FlipFlopKind::DffNS,
        FlipFlopKind::DffNR,
        FlipFlopKind::DffNP,
        FlipFlopKind::DffNC,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FlipFlopKind::Dff => "DFF",
            FlipFlopKind::DffS => "DFFS",
            FlipFlopKind::DffR => "DFFR",
            FlipFlopKind::DffP => "DFFP",
            FlipFlopKind::DffC => "DFFC",
            FlipFlopKind::DffN => "DFFN",
            FlipFlopKind::DffNS => "DFFNS",
            FlipFlopKind::DffNR => "DFFNR",
            FlipFlopKind::DffNP => "DFFNP",
            FlipFlopKind::DffNC => "DFFNC",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// The set/reset style input, driven from the slice's LSR wire.
    pub fn control_port(self) -> Option<&'static str> {
        match self {
            FlipFlopKind::Dff | FlipFlopKind::DffN => None,
            FlipFlopKind::DffS | FlipFlopKind::DffNS => Some("SET"),
            FlipFlopKind::DffR | FlipFlopKind::DffNR => Some("RESET"),
            FlipFlopKind::DffP | FlipFlopKind::DffNP => Some("PRESET"),
            FlipFlopKind::DffC | FlipFlopKind::DffNC => Some("CLEAR"),
        }
    }
}

impl std::fmt::Display for FlipFlopKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum IobKind {
    Ibuf,
    Obuf,
    Iobuf,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PadDirection {
    Input,
    Output,
    Inout,
}

impl IobKind {
    pub const ALL: [IobKind; 3] = [IobKind::Ibuf, IobKind::Obuf, IobKind::Iobuf];

    pub fn name(self) -> &'static str {
        match self {
            IobKind::Ibuf => "IBUF",
            IobKind::Obuf => "OBUF",
            IobKind::Iobuf => "IOBUF",
        }
    }

    /// Fabric-side ports with the portmap key each one reads.
    pub fn fabric_ports(self) -> &'static [(&'static str, &'static str)] {
        match self {
            IobKind::Ibuf => &[("O", "O")],
            IobKind::Obuf => &[("I", "I")],
            IobKind::Iobuf => &[("I", "I"), ("O", "O"), ("OEN", "OE")],
        }
    }

    pub fn pad_port(self) -> (&'static str, PadDirection) {
        match self {
            IobKind::Ibuf => ("I", PadDirection::Input),
            IobKind::Obuf => ("O", PadDirection::Output),
            IobKind::Iobuf => ("IO", PadDirection::Inout),
        }
    }
}

/// A bel of one tile being reconstructed; `row` and `col` are 1-based.
struct BelSite<'a> {
    row: usize,
    col: usize,
    name: &'a str,
    bel: &'a Bel,
    state: &'a BelState,
}

impl BelSite<'_> {
    fn ambiguous(&self, reason: impl Into<String>) -> Error {
        Error::AmbiguousExtraction {
            row: self.row,
            col: self.col,
            bel: self.name.to_string(),
            reason: reason.into(),
        }
    }

    fn scoped(&self, name: &str) -> String {
        tile_scoped(self.row, self.col, name)
    }

    fn number(&self, bel: &BelName) -> Result<usize> {
        bel.number()
            .ok_or_else(|| self.ambiguous("instance suffix is not a number"))
    }

    /// The single active feature among `choices`.
    fn only_one<T: Copy>(&self, choices: &[T], name: impl Fn(T) -> &'static str) -> Result<T> {
        let mut found = choices
            .iter()
            .copied()
            .filter(|&c| self.state.has(&FeatureKey::from(name(c))));
        match (found.next(), found.next()) {
            (Some(c), None) => Ok(c),
            (None, _) => Err(self.ambiguous("no variant is active")),
            (Some(a), Some(b)) => Err(self.ambiguous(format!(
                "both {} and {} are active",
                name(a),
                name(b)
            ))),
        }
    }
}

fn lut_primitive(site: &BelSite, idx: usize) -> Primitive {
    let mut init = BitVec::repeat(true, LUT_SIZE);
    for pos in site.state.flags.iter().filter_map(FeatureKey::index) {
        if (pos as usize) < LUT_SIZE {
            init.set(pos as usize, false);
        }
    }
    let mut prim = Primitive::new("LUT4", site.scoped(&format!("LUT4_{idx}")));
    for (port, letter) in LUT_PORTS {
        let wire = match site.bel.portmap.get(port) {
            Some(wire) => wire.clone(),
            None => format!("{letter}{idx}"),
        };
        prim.connect(port, site.scoped(&wire));
    }
    prim.params.insert("INIT".to_string(), ParamValue::Bits(init));
    prim
}

fn dff_primitive(site: &BelSite, idx: usize) -> Result<Primitive> {
    let kind = site.only_one(&FlipFlopKind::ALL, FlipFlopKind::name)?;
    let mut prim = Primitive::new(format!("{kind}E"), site.scoped(&format!("DFFE_{idx}")));
    let slice = idx / 2;
    prim.connect("CLK", site.scoped(&format!("CLK{slice}")));
    prim.connect("D", site.scoped(&format!("F{idx}")));
    prim.connect("Q", site.scoped(&format!("Q{idx}")));
    prim.connect("CE", site.scoped(&format!("CE{slice}")));
    if let Some(port) = kind.control_port() {
        prim.connect(port, site.scoped(&format!("LSR{slice}")));
    }
    Ok(prim)
}

fn iob_primitive(site: &BelSite, idx: &str, module: &mut Module) -> Result<Primitive> {
    let kind = site.only_one(&IobKind::ALL, IobKind::name)?;
    let mut prim = Primitive::new(kind.name(), site.scoped(&format!("{}_{idx}", kind.name())));
    for &(port, key) in kind.fabric_ports() {
        let wire = site
            .bel
            .portmap
            .get(key)
            .ok_or_else(|| site.ambiguous(format!("no port map entry for {key}")))?;
        prim.connect(port, site.scoped(wire));
    }
    let (pad, dir) = kind.pad_port();
    let pad_wire = site.scoped(&format!("{pad}{idx}"));
    prim.connect(pad, pad_wire.clone());
    match dir {
        PadDirection::Input => module.inputs.insert(pad_wire),
        PadDirection::Output => module.outputs.insert(pad_wire),
        PadDirection::Inout => module.inouts.insert(pad_wire),
    };
    Ok(prim)
}

fn bel_primitive(site: &BelSite, module: &mut Module) -> Result<Option<Primitive>> {
    let Some(bel) = BelName::parse(site.name) else {
        return Ok(None);
    };
    match bel.kind {
        BelKind::Lut => {
            let idx = site.number(&bel)?;
            Ok(Some(lut_primitive(site, idx)))
        }
        BelKind::Dff => {
            let idx = site.number(&bel)?;
            Ok(Some(dff_primitive(site, idx)?))
        }
        BelKind::Iob => Ok(Some(iob_primitive(site, bel.index, module)?)),
        BelKind::Bank | BelKind::Cfg => Ok(None),
    }
}

/// Rebuilds the primitives, pips and aliases of the tile at 0-based `(row, col)`.
pub fn tile_module(device: &Device, row: usize, col: usize, features: &TileFeatures) -> Module {
    let mut module = Module::new();
    let Some(tile) = device.tile(row, col) else {
        return module;
    };
    let (row, col) = (row + 1, col + 1);
    for (name, state) in &features.bels {
        let Some(bel) = tile.bels.get(name) else {
            log::warn!("R{row}C{col}: {name} is not a bel of this tile");
            continue;
        };
        let site = BelSite {
            row,
            col,
            name,
            bel,
            state,
        };
        match bel_primitive(&site, &mut module) {
            Ok(Some(prim)) => {
                let wires = Vec::from_iter(
                    prim.ports
                        .values()
                        .filter(|wire| !module.is_port(wire))
                        .cloned(),
                );
                module.wires.extend(wires);
                module.add_primitive(prim);
            }
            Ok(None) => (),
            Err(err) => log::warn!("skipping bel: {err}"),
        }
    }
    let connections = features
        .pips
        .iter()
        .chain(tile.aliases.iter());
    for (dest, src) in connections {
        module.assign(
            device.wire_to_global(row, col, dest),
            device.wire_to_global(row, col, src),
        );
    }
    module
}

fn constant_drivers() -> [Primitive; 2] {
    let mut gnd = Primitive::new("GND", "mygnd");
    gnd.connect("G", "VSS");
    let mut vcc = Primitive::new("VCC", "myvcc");
    vcc.connect("V", "VCC");
    [gnd, vcc]
}

/// Rebuilds the whole design: one module with every tile's primitives and
/// connections plus the constant drivers.
pub fn reconstruct(device: &Device, features: &DesignFeatures) -> Module {
    let mut res = Module::new();
    for (&(row, col), tile) in features {
        res.merge(tile_module(device, row, col, tile));
    }
    for prim in constant_drivers() {
        res.add_primitive(prim);
    }
    res
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use ndarray::Array2;
    use unnamed_entity::EntityVec;

    use super::*;
    use prjcombine_gowin::Tile;

    fn device() -> Device {
        let mut tile = Tile::new(2, 2);
        tile.bel_mut("LUT0");
        tile.bel_mut("DFF0");
        tile.bel_mut("LUT1");
        tile.bel_mut("DFF1");
        let iob = tile.bel_mut("IOBA");
        iob.portmap.insert("I".to_string(), "D6".to_string());
        iob.portmap.insert("O".to_string(), "Q6".to_string());
        iob.portmap.insert("OE".to_string(), "B6".to_string());
        tile.add_alias("B0", "X01");
        tile.normalize();
        let mut tiles = EntityVec::new();
        let kind = tiles.push(tile);
        Device::new(tiles, Array2::from_elem((3, 3), kind), vec![], vec![]).unwrap()
    }

    fn state(mode: Option<&str>, flags: &[FeatureKey]) -> BelState {
        BelState {
            flags: BTreeSet::from_iter(flags.iter().cloned()),
            mode: mode.map(FeatureKey::from),
        }
    }

    #[test]
    fn test_lut() {
        let dev = device();
        let mut f = TileFeatures::default();
        f.bels
            .insert("LUT1".to_string(), state(None, &[FeatureKey::Index(0), FeatureKey::Index(3)]));
        let m = tile_module(&dev, 1, 2, &f);
        let prim = &m.primitives["R2C3_LUT4_1"];
        assert_eq!(prim.kind, "LUT4");
        assert_eq!(prim.params["INIT"].to_string(), "16'b1111111111110110");
        assert_eq!(prim.ports["F"], "R2C3_F1");
        assert_eq!(prim.ports["I2"], "R2C3_C1");
    }

    #[test]
    fn test_dff() {
        let dev = device();
        let mut f = TileFeatures::default();
        f.bels.insert("DFF1".to_string(), state(Some("DFFNR"), &[]));
        f.bels.insert(
            "DFF0".to_string(),
            state(Some("DFF"), &[FeatureKey::from("DFFS")]),
        );
        let m = tile_module(&dev, 0, 0, &f);
        assert_eq!(m.primitives.len(), 1);
        let prim = &m.primitives["R1C1_DFFE_1"];
        assert_eq!(prim.kind, "DFFNRE");
        assert_eq!(prim.ports["CLK"], "R1C1_CLK0");
        assert_eq!(prim.ports["D"], "R1C1_F1");
        assert_eq!(prim.ports["Q"], "R1C1_Q1");
        assert_eq!(prim.ports["RESET"], "R1C1_LSR0");
    }

    #[test]
    fn test_slice_wires() {
        let dev = device();
        let mut f = TileFeatures::default();
        f.bels.insert("LUT0".to_string(), state(None, &[FeatureKey::Index(0)]));
        f.bels.insert("DFF0".to_string(), state(Some("DFFR"), &[]));
        let m = tile_module(&dev, 1, 1, &f);
        assert_eq!(m.primitives.len(), 2);
        for wire in ["A0", "B0", "C0", "D0", "F0", "Q0", "CLK0", "CE0", "LSR0"] {
            assert!(m.wires.contains(&format!("R2C2_{wire}")), "{wire}");
        }
        assert!(m.inputs.is_empty() && m.outputs.is_empty() && m.inouts.is_empty());
    }

    #[test]
    fn test_iob() {
        let dev = device();
        let mut f = TileFeatures::default();
        f.bels.insert("IOBA".to_string(), state(Some("IOBUF"), &[]));
        let m = tile_module(&dev, 0, 1, &f);
        let prim = &m.primitives["R1C2_IOBUF_A"];
        assert_eq!(prim.ports["OEN"], "R1C2_B6");
        assert_eq!(prim.ports["IO"], "R1C2_IOA");
        assert!(m.inouts.contains("R1C2_IOA"));
        assert!(m.wires.contains("R1C2_Q6"));
        assert_eq!(m.assigns["R1C2_B0"], "R1C2_X01");
    }

    #[test]
    fn test_constants() {
        let dev = device();
        let m = reconstruct(&dev, &DesignFeatures::new());
        assert_eq!(m.primitives["mygnd"].ports["G"], "VSS");
        assert_eq!(m.primitives["myvcc"].ports["V"], "VCC");
        assert_eq!(m.primitives.len(), 2);
    }

    #[test]
    fn test_flip_flop_kinds() {
        assert_eq!(FlipFlopKind::from_name("DFFP"), Some(FlipFlopKind::DffP));
        assert_eq!(FlipFlopKind::DffNC.control_port(), Some("CLEAR"));
        assert_eq!(FlipFlopKind::DffN.control_port(), None);
        assert_eq!(FlipFlopKind::from_name("DFFE"), None);
    }
}
