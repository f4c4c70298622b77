use serde::{Deserialize, Serialize};

use crate::{db::Device, names::tile_scoped};

pub const POWER_RAILS: [&str; 2] = ["VCC", "VSS"];
pub const GLOBAL_PREFIX: char = 'G';

#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Dir {
    N,
    E,
    S,
    W,
}

impl Dir {
    pub const DIRS: [Dir; 4] = [Dir::N, Dir::E, Dir::S, Dir::W];

    pub fn from_char(c: char) -> Option<Dir> {
        match c {
            'N' => Some(Dir::N),
            'E' => Some(Dir::E),
            'S' => Some(Dir::S),
            'W' => Some(Dir::W),
            _ => None,
        }
    }

    /// (row, col) step from a wire's tile towards the tile it originates in.
    pub fn delta(self) -> (isize, isize) {
        match self {
            Dir::N => (1, 0),
            Dir::E => (0, -1),
            Dir::S => (-1, 0),
            Dir::W => (0, 1),
        }
    }
}

impl core::ops::Not for Dir {
    type Output = Dir;
    fn not(self) -> Dir {
        match self {
            Dir::N => Dir::S,
            Dir::E => Dir::W,
            Dir::S => Dir::N,
            Dir::W => Dir::E,
        }
    }
}

impl std::fmt::Display for Dir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Dir::N => "N",
                Dir::E => "E",
                Dir::S => "S",
                Dir::W => "W",
            }
        )
    }
}

/// An inter-tile wire, `<dir><length><segment>`, e.g. `N281`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct SegmentWire {
    pub dir: Dir,
    /// Two-digit span class; the first digit is 1, 2 or 8.
    pub length: u8,
    /// Distance from the originating tile.
    pub segment: u8,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum WireName<'a> {
    Global(&'a str),
    Segment(SegmentWire),
    Local(&'a str),
}

impl<'a> WireName<'a> {
    /// Classifies a tile-local wire name.  Segment wires only need a matching prefix;
    /// anything after the segment digit is ignored.
    pub fn parse(name: &'a str) -> Self {
        if name.starts_with(GLOBAL_PREFIX) || POWER_RAILS.contains(&name) {
            return WireName::Global(name);
        }
        match Self::parse_segment(name) {
            Some(seg) => WireName::Segment(seg),
            None => WireName::Local(name),
        }
    }

    fn parse_segment(name: &str) -> Option<SegmentWire> {
        let mut chars = name.chars();
        let dir = Dir::from_char(chars.next()?)?;
        let l0 = chars.next().filter(|c| matches!(c, '1' | '2' | '8'))?;
        let l1 = chars.next()?.to_digit(10)?;
        let segment = chars.next()?.to_digit(10)?;
        Some(SegmentWire {
            dir,
            length: (l0.to_digit(10)? * 10 + l1) as u8,
            segment: segment as u8,
        })
    }
}

/// Folds a coordinate that stepped off either end of `1..=extent` back into the grid.
fn wrap(pos: isize, extent: usize, dir: &mut Dir) -> isize {
    let extent = extent as isize;
    if pos < 1 {
        *dir = !*dir;
        1 - pos
    } else if pos > extent {
        *dir = !*dir;
        2 * extent + 1 - pos
    } else {
        pos
    }
}

/// Resolves a wire at 1-based tile `(row, col)` of a `rows` x `cols` grid to its
/// chip-wide name.
pub fn resolve_wire(rows: usize, cols: usize, row: usize, col: usize, wire: &str) -> String {
    match WireName::parse(wire) {
        WireName::Global(name) => name.to_string(),
        WireName::Local(name) => tile_scoped(row, col, name),
        WireName::Segment(seg) => {
            let (drow, dcol) = seg.dir.delta();
            let mut dir = seg.dir;
            let root_row = row as isize + drow * seg.segment as isize;
            let root_col = col as isize + dcol * seg.segment as isize;
            let root_row = wrap(root_row, rows, &mut dir);
            let root_col = wrap(root_col, cols, &mut dir);
            format!("R{root_row}C{root_col}_{dir}{len}", len = seg.length)
        }
    }
}

impl Device {
    pub fn wire_to_global(&self, row: usize, col: usize, wire: &str) -> String {
        resolve_wire(self.rows(), self.cols(), row, col, wire)
    }
}
