use std::{
    collections::{BTreeMap, BTreeSet, btree_map},
    fs::File,
    path::Path,
};

use jzon::JsonValue;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use unnamed_entity::{EntityVec, entity_id};

use crate::{error::ChipDbError, names::BelName};

/// A (row, column) pair: a tile within the grid, or a bit within a tile.
pub type Coord = (usize, usize);
pub type BitSet = BTreeSet<Coord>;

entity_id! {
    pub id TileKindId u16;
}

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum FeatureKey {
    /// LUT truth table position.
    Index(u8),
    Name(String),
}

impl FeatureKey {
    pub fn index(&self) -> Option<u8> {
        match *self {
            FeatureKey::Index(idx) => Some(idx),
            FeatureKey::Name(_) => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            FeatureKey::Index(_) => None,
            FeatureKey::Name(name) => Some(name),
        }
    }
}

impl From<u8> for FeatureKey {
    fn from(value: u8) -> Self {
        FeatureKey::Index(value)
    }
}

impl From<&str> for FeatureKey {
    fn from(value: &str) -> Self {
        FeatureKey::Name(value.to_string())
    }
}

impl From<String> for FeatureKey {
    fn from(value: String) -> Self {
        FeatureKey::Name(value)
    }
}

impl std::fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureKey::Index(idx) => write!(f, "{idx}"),
            FeatureKey::Name(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Bel {
    /// Independent features; any subset can be set at once.
    pub flags: BTreeMap<FeatureKey, BitSet>,
    /// Mutually exclusive features, matched by exact bit pattern.
    pub modes: BTreeMap<FeatureKey, BitSet>,
    pub portmap: BTreeMap<String, String>,
}

impl Bel {
    pub fn new() -> Self {
        Self::default()
    }

    /// All bits reserved for mode selection.
    pub fn mode_bits(&self) -> BitSet {
        self.modes.values().flatten().copied().collect()
    }

    pub fn flag(&self, key: &FeatureKey) -> Option<&BitSet> {
        self.flags.get(key)
    }

    pub fn mode(&self, key: &FeatureKey) -> Option<&BitSet> {
        self.modes.get(key)
    }

    pub fn insert_flag(
        &mut self,
        key: impl Into<FeatureKey>,
        bits: impl IntoIterator<Item = Coord>,
    ) {
        self.flags.entry(key.into()).or_default().extend(bits);
    }

    pub fn insert_mode(
        &mut self,
        key: impl Into<FeatureKey>,
        bits: impl IntoIterator<Item = Coord>,
    ) {
        self.modes.entry(key.into()).or_default().extend(bits);
    }

    pub fn merge(&mut self, other: &Bel) {
        if self == other {
            return;
        }
        for (key, bits) in &other.flags {
            self.insert_flag(key.clone(), bits.iter().copied());
        }
        for (key, bits) in &other.modes {
            self.insert_mode(key.clone(), bits.iter().copied());
        }
        for (port, wire) in &other.portmap {
            self.portmap
                .entry(port.clone())
                .or_insert_with(|| wire.clone());
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub width: usize,
    pub height: usize,
    /// dest wire -> src wire -> bits; an empty set is always connected.
    pub pips: BTreeMap<String, BTreeMap<String, BitSet>>,
    /// Fuse-less dest -> src connections.
    pub aliases: BTreeMap<String, String>,
    pub bels: BTreeMap<String, Bel>,
    /// Bel names in database order; instance indices are derived from it.
    pub bel_order: Vec<String>,
}

impl Tile {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pips: BTreeMap::new(),
            aliases: BTreeMap::new(),
            bels: BTreeMap::new(),
            bel_order: vec![],
        }
    }

    pub fn bel_mut(&mut self, name: impl Into<String>) -> &mut Bel {
        match self.bels.entry(name.into()) {
            btree_map::Entry::Vacant(e) => {
                self.bel_order.push(e.key().clone());
                e.insert(Bel::new())
            }
            btree_map::Entry::Occupied(e) => e.into_mut(),
        }
    }

    pub fn add_bel(&mut self, name: impl Into<String>, bel: Bel) {
        self.bel_mut(name).merge(&bel);
    }

    pub fn add_pip(
        &mut self,
        dest: impl Into<String>,
        src: impl Into<String>,
        bits: impl IntoIterator<Item = Coord>,
    ) {
        self.pips
            .entry(dest.into())
            .or_default()
            .entry(src.into())
            .or_default()
            .extend(bits);
    }

    pub fn add_alias(&mut self, dest: impl Into<String>, src: impl Into<String>) {
        self.aliases.insert(dest.into(), src.into());
    }

    pub fn pip(&self, dest: &str, src: &str) -> Option<&BitSet> {
        self.pips.get(dest)?.get(src)
    }

    pub fn bels_ordered(&self) -> impl Iterator<Item = (&str, &Bel)> {
        self.bel_order
            .iter()
            .filter_map(|name| Some((name.as_str(), self.bels.get(name)?)))
    }

    /// Position of a bel among the bels of the same kind, in database order.
    pub fn bel_index(&self, name: &str) -> Option<usize> {
        let kind = BelName::parse(name)?.kind;
        self.bel_order
            .iter()
            .filter(|other| BelName::parse(other).is_some_and(|other| other.kind == kind))
            .position(|other| other == name)
    }

    pub fn contains(&self, (row, col): Coord) -> bool {
        row < self.height && col < self.width
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub tiles: EntityVec<TileKindId, Tile>,
    pub grid: Array2<TileKindId>,
    /// wire class -> wire -> delays
    pub timing: BTreeMap<String, BTreeMap<String, Vec<f64>>>,
    pub header: Vec<Vec<u8>>,
    pub footer: Vec<Vec<u8>>,
    /// All-zero bit grid with the chip's total dimensions.
    pub template: Array2<u8>,
}

impl Device {
    pub fn new(
        tiles: EntityVec<TileKindId, Tile>,
        grid: Array2<TileKindId>,
        header: Vec<Vec<u8>>,
        footer: Vec<Vec<u8>>,
    ) -> Result<Self, ChipDbError> {
        let (rows, cols) = grid.dim();
        if rows == 0 || cols == 0 {
            return Err(ChipDbError::EmptyGrid);
        }
        for &kind in &grid {
            if tiles.get(kind).is_none() {
                return Err(ChipDbError::UnknownTileKind(kind));
            }
        }
        for ((row, col), &kind) in grid.indexed_iter() {
            let tile = &tiles[kind];
            if tile.height != tiles[grid[(row, 0)]].height
                || tile.width != tiles[grid[(0, col)]].width
            {
                return Err(ChipDbError::NonUniformGrid { row, col });
            }
        }
        let mut res = Device {
            tiles,
            grid,
            timing: BTreeMap::new(),
            header,
            footer,
            template: Array2::zeros((0, 0)),
        };
        res.template = Array2::zeros((res.height(), res.width()));
        Ok(res)
    }

    pub fn rows(&self) -> usize {
        self.grid.nrows()
    }

    pub fn cols(&self) -> usize {
        self.grid.ncols()
    }

    /// Total bit height, summed down the first column.
    pub fn height(&self) -> usize {
        self.grid.column(0).iter().map(|&k| self.tiles[k].height).sum()
    }

    /// Total bit width, summed across the first row.
    pub fn width(&self) -> usize {
        self.grid.row(0).iter().map(|&k| self.tiles[k].width).sum()
    }

    pub fn tile_kind(&self, row: usize, col: usize) -> Option<TileKindId> {
        self.grid.get((row, col)).copied()
    }

    /// Tile at 0-based grid position.
    pub fn tile(&self, row: usize, col: usize) -> Option<&Tile> {
        Some(&self.tiles[self.tile_kind(row, col)?])
    }

    pub fn tile_kinds(&self) -> impl Iterator<Item = (TileKindId, &Tile)> {
        self.tiles.iter()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub devices: BTreeMap<String, Device>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn device(&self, name: &str) -> Option<&Device> {
        self.devices.get(name)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ChipDbError> {
        let f = File::open(path)?;
        let mut cf = zstd::stream::Decoder::new(f)?;
        let config = bincode::config::standard();
        Ok(bincode::serde::decode_from_std_read(&mut cf, config)?)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ChipDbError> {
        let f = File::create(path)?;
        let mut cf = zstd::stream::Encoder::new(f, 9)?;
        let config = bincode::config::standard();
        bincode::serde::encode_into_std_write(self, &mut cf, config)?;
        cf.finish()?;
        Ok(())
    }
}

fn bits_to_json(bits: &BitSet) -> JsonValue {
    Vec::from_iter(bits.iter().map(|&(row, col)| jzon::array![row, col])).into()
}

fn features_to_json(features: &BTreeMap<FeatureKey, BitSet>) -> JsonValue {
    jzon::object::Object::from_iter(
        features
            .iter()
            .map(|(key, bits)| (key.to_string(), bits_to_json(bits))),
    )
    .into()
}

impl From<&Bel> for JsonValue {
    fn from(bel: &Bel) -> Self {
        jzon::object! {
            flags: features_to_json(&bel.flags),
            modes: features_to_json(&bel.modes),
            portmap: jzon::object::Object::from_iter(
                bel.portmap.iter().map(|(port, wire)| (port.as_str(), wire.as_str()))
            ),
        }
    }
}

impl From<&Tile> for JsonValue {
    fn from(tile: &Tile) -> Self {
        jzon::object! {
            width: tile.width,
            height: tile.height,
            pips: jzon::object::Object::from_iter(tile.pips.iter().map(|(dest, srcs)| {
                (
                    dest.as_str(),
                    jzon::object::Object::from_iter(
                        srcs.iter().map(|(src, bits)| (src.as_str(), bits_to_json(bits))),
                    ),
                )
            })),
            aliases: jzon::object::Object::from_iter(
                tile.aliases.iter().map(|(dest, src)| (dest.as_str(), src.as_str()))
            ),
            bels: jzon::object::Object::from_iter(
                tile.bels_ordered().map(|(name, bel)| (name, bel))
            ),
        }
    }
}
