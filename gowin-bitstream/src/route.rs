use prjcombine_gowin::{Device, bitmap::TileBitmap};

use crate::{
    config::RouteMode,
    design::Pip,
    error::{Error, Result},
    place::tile_mut,
};

/// Sets the bits of every pip.  Returns the pips the device does not have,
/// which is always empty in strict mode.
pub fn route(
    mode: RouteMode,
    device: &Device,
    tiles: &mut TileBitmap,
    pips: &[Pip],
) -> Result<Vec<Pip>> {
    let mut skipped = vec![];
    for pip in pips {
        let mut t = tile_mut(device, tiles, pip.row, pip.col)?;
        let tile = t.tile;
        let Some(bits) = tile.pip(&pip.dest, &pip.src) else {
            let err = Error::UnknownWirePair {
                row: pip.row,
                col: pip.col,
                src: pip.src.clone(),
                dest: pip.dest.clone(),
            };
            match mode {
                RouteMode::Strict => return Err(err),
                RouteMode::Diagnostic => {
                    log::warn!("skipping pip: {err}");
                    skipped.push(pip.clone());
                    continue;
                }
            }
        };
        t.set_bits(bits);
    }
    Ok(skipped)
}
