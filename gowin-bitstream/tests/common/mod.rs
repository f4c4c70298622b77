use ndarray::Array2;
use prjcombine_gowin::{Database, Device, Tile};
use unnamed_entity::EntityVec;

pub const ROWS: usize = 4;
pub const COLS: usize = 5;
pub const TILE_WIDTH: usize = 12;
pub const TILE_HEIGHT: usize = 10;
pub const DEVICE: &str = "GW-TEST";

const DFF_MODES: [(&str, &[usize]); 4] = [
    ("DFF", &[0]),
    ("DFFS", &[0, 1]),
    ("DFFR", &[0, 2]),
    ("DFFN", &[3]),
];

fn logic(tile: &mut Tile) {
    for lut in 0..2 {
        let name = format!("LUT{lut}");
        for pos in 0..16u8 {
            let bit = (pos as usize / 4, lut * 4 + pos as usize % 4);
            tile.bel_mut(name.as_str()).insert_flag(pos, [bit]);
        }
        let dff = tile.bel_mut(format!("DFF{lut}"));
        for (mode, cols) in DFF_MODES {
            dff.insert_mode(mode, cols.iter().map(|&c| (4, lut * 4 + c)));
        }
    }
    tile.add_pip("A0", "N100", [(6, 0)]);
    tile.add_pip("A0", "E210", [(6, 1)]);
    tile.add_pip("A0", "F1", [(6, 0), (6, 1)]);
    tile.add_pip("X01", "F0", [(7, 0)]);
    tile.add_pip("X01", "VCC", [(7, 1)]);
    tile.add_pip("S100", "F0", [(8, 0), (8, 1)]);
    tile.add_pip("S100", "Q0", [(8, 1)]);
    tile.add_alias("B0", "X01");
}

fn io(tile: &mut Tile) {
    for (row, x) in [(0, 'A'), (1, 'B')] {
        let iob = tile.bel_mut(format!("IOB{x}"));
        iob.insert_mode("IBUF", [(row, 8), (row, 9), (2, 11)]);
        iob.insert_mode("OBUF", [(row, 8), (row, 10)]);
        iob.insert_mode("IOBUF", [(row, 8), (row, 9), (row, 10)]);
        for (port, wire) in [("I", "D"), ("O", "Q"), ("OE", "B")] {
            iob.portmap
                .insert(port.to_string(), format!("{wire}{}", 6 + row));
        }
    }
    tile.add_pip("D6", "N100", [(5, 0)]);
    tile.add_pip("D6", "S130", [(5, 1)]);
    tile.add_pip("D7", "S131", [(5, 2)]);
}

/// A 4x5 grid: logic everywhere, I/O on the border, a bank bel in the corners.
pub fn device() -> Device {
    let mut tiles = EntityVec::new();
    let mut tile = Tile::new(TILE_WIDTH, TILE_HEIGHT);
    logic(&mut tile);
    let center = tiles.push(tile.clone());
    io(&mut tile);
    let edge = tiles.push(tile.clone());
    tile.bel_mut("BANK").insert_mode("DEFAULT", [(9, 11)]);
    let corner = tiles.push(tile);
    let grid = Array2::from_shape_fn((ROWS, COLS), |(r, c)| {
        let row_edge = r == 0 || r == ROWS - 1;
        let col_edge = c == 0 || c == COLS - 1;
        match (row_edge, col_edge) {
            (true, true) => corner,
            (false, false) => center,
            _ => edge,
        }
    });
    let header = vec![vec![0xff, 0xff], vec![0xa5, 0xc3]];
    let footer = vec![vec![0xff; 8], vec![0; 8]];
    let mut dev = Device::new(tiles, grid, header, footer).unwrap();
    dev.normalize();
    dev
}

#[allow(dead_code)]
pub fn database() -> Database {
    let mut db = Database::new();
    db.devices.insert(DEVICE.to_string(), device());
    db
}
