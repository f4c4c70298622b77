//! Packing placed and routed designs into Gowin configuration images, and
//! unpacking images back into primitive netlists.

use ndarray::Array2;
use prjcombine_gowin::Device;

pub mod config;
pub mod design;
pub mod error;
pub mod extract;
pub mod image;
pub mod netlist;
pub mod place;
pub mod reconstruct;
pub mod route;

pub use config::{Config, RouteMode};
pub use design::{Cell, IobDirection, Pip, Placement};
pub use error::{Error, Result};
pub use image::Bitstream;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Packed {
    pub bitstream: Bitstream,
    /// Pips left out in diagnostic mode.
    pub unrouted: Vec<Pip>,
}

/// Places, routes and checksums a design.
pub fn pack(cfg: &Config, device: &Device, placements: &[Placement], pips: &[Pip]) -> Result<Packed> {
    let mut tiles = device.tile_bitmap(&device.template, true)?;
    place::place(device, &mut tiles, placements)?;
    let unrouted = route::route(cfg.route_mode, device, &mut tiles, pips)?;
    let mut bitstream = Bitstream::new(device, device.fuse_bitmap(&tiles)?);
    bitstream.finalize();
    Ok(Packed {
        bitstream,
        unrouted,
    })
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Unpacked {
    pub features: extract::DesignFeatures,
    pub module: netlist::Module,
}

/// Recovers the active features and the primitive netlist of a bit grid.
pub fn unpack(device: &Device, data: &Array2<u8>) -> Result<Unpacked> {
    let features = extract::extract(device, data)?;
    let module = reconstruct::reconstruct(device, &features);
    Ok(Unpacked { features, module })
}
