pub mod bitmap;
pub mod db;
pub mod error;
pub mod names;
pub mod normalize;
pub mod wires;

pub use db::{Bel, BitSet, Coord, Database, Device, FeatureKey, Tile, TileKindId};
pub use error::ChipDbError;
