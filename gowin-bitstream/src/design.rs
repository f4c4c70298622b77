//! Typed placement and routing records, validated where they enter the packer.

use std::collections::BTreeMap;

use bitvec::vec::BitVec;
use prjcombine_gowin::names::{is_word_char, split_tile_prefix};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, malformed};

pub const SLICE_CELL: &str = "GENERIC_SLICE";
pub const IOB_CELL: &str = "GENERIC_IOB";

pub const LUT_SIZE: usize = 16;

/// Boolean I/O attributes; at most one may be set.
pub const IOB_ATTRS: [&str; 3] = ["INPUT_USED", "OUTPUT_USED", "ENABLE_USED"];

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum IobDirection {
    Input,
    Output,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Cell {
    /// `init[k]` is the truth table entry at position `k`.
    Lut { index: u8, init: BitVec },
    Iob { index: char, dir: IobDirection },
}

/// A placed cell; `row` and `col` are 1-based.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Placement {
    pub row: usize,
    pub col: usize,
    pub cell: Cell,
}

/// Parses a binary truth table string, last character first, repeating it up
/// to the full LUT size.
pub fn parse_init(init: &str) -> Result<BitVec> {
    let len = init.len();
    if len == 0 || len > LUT_SIZE || LUT_SIZE % len != 0 {
        return Err(malformed("INIT", init));
    }
    let mut res = BitVec::with_capacity(LUT_SIZE);
    for _ in 0..LUT_SIZE / len {
        for c in init.chars().rev() {
            match c {
                '0' => res.push(false),
                '1' => res.push(true),
                _ => return Err(malformed("INIT", init)),
            }
        }
    }
    Ok(res)
}

fn parse_flag(value: &str) -> Option<u32> {
    if value.is_empty() {
        return None;
    }
    u32::from_str_radix(value, 2).ok()
}

fn parse_iob(row: usize, col: usize, params: &BTreeMap<String, String>) -> Result<IobDirection> {
    let mut used = BTreeMap::new();
    for attr in IOB_ATTRS {
        let Some(value) = params.get(attr) else {
            continue;
        };
        let value = parse_flag(value).ok_or_else(|| malformed("I/O attribute", value.as_str()))?;
        used.insert(attr, value);
    }
    let asserted = used.values().filter(|&&v| v != 0).count();
    if asserted > 1 || used.values().any(|&v| v > 1) {
        return Err(Error::ConfigurationConflict {
            row,
            col,
            message: format!("more than one of {} is set", IOB_ATTRS.join(", ")),
        });
    }
    let is_set = |attr: &str| used.get(attr).is_some_and(|&v| v != 0);
    if is_set("INPUT_USED") {
        Ok(IobDirection::Input)
    } else if is_set("OUTPUT_USED") {
        Ok(IobDirection::Output)
    } else {
        Err(Error::ConfigurationConflict {
            row,
            col,
            message: "I/O is neither input nor output".to_string(),
        })
    }
}

impl Placement {
    pub fn new(
        cell_type: &str,
        row: usize,
        col: usize,
        instance: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<Self> {
        if row == 0 || col == 0 {
            return Err(Error::OutOfGrid { row, col });
        }
        let cell = match cell_type {
            SLICE_CELL => {
                let index = instance
                    .parse()
                    .map_err(|_| malformed("slice instance", instance))?;
                let init = params
                    .get("INIT")
                    .ok_or_else(|| malformed("slice parameters", format!("R{row}C{col}_SLICE{instance}")))?;
                Cell::Lut {
                    index,
                    init: parse_init(init)?,
                }
            }
            IOB_CELL => {
                let mut chars = instance.chars();
                let index = match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_alphanumeric() => c,
                    _ => return Err(malformed("I/O instance", instance)),
                };
                Cell::Iob {
                    index,
                    dir: parse_iob(row, col, params)?,
                }
            }
            _ => return Err(Error::UnknownCellType(cell_type.to_string())),
        };
        Ok(Placement { row, col, cell })
    }

    /// Builds a placement from a placer's bel name, `R<row>C<col>_SLICE<n>` or
    /// `R<row>C<col>_IOB<x>`.
    pub fn from_bel(cell_type: &str, bel: &str, params: &BTreeMap<String, String>) -> Result<Self> {
        let (row, col, rest) = split_tile_prefix(bel).ok_or_else(|| malformed("bel", bel))?;
        let instance = match cell_type {
            SLICE_CELL => rest.strip_prefix("SLICE"),
            IOB_CELL => rest.strip_prefix("IOB"),
            _ => return Err(Error::UnknownCellType(cell_type.to_string())),
        };
        let instance = instance
            .filter(|s| !s.is_empty() && s.chars().all(is_word_char))
            .ok_or_else(|| malformed("bel", bel))?;
        Self::new(cell_type, row, col, instance, params)
    }
}

/// A programmable interconnect point to enable; `row` and `col` are 1-based.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Pip {
    pub row: usize,
    pub col: usize,
    pub src: String,
    pub dest: String,
}

impl Pip {
    pub fn new(row: usize, col: usize, src: impl Into<String>, dest: impl Into<String>) -> Self {
        Pip {
            row,
            col,
            src: src.into(),
            dest: dest.into(),
        }
    }

    /// Parses a single `R<row>C<col>_<src>_<dest>` record, with an optional
    /// trailing `;`.  The split between source and destination is the last
    /// underscore.
    pub fn parse(record: &str) -> Result<Self> {
        let body = record.strip_suffix(';').unwrap_or(record);
        let (row, col, rest) = split_tile_prefix(body).ok_or_else(|| malformed("pip", record))?;
        let (src, dest) = rest.rsplit_once('_').ok_or_else(|| malformed("pip", record))?;
        if src.is_empty()
            || dest.is_empty()
            || !src.chars().all(is_word_char)
            || !dest.chars().all(is_word_char)
        {
            return Err(malformed("pip", record));
        }
        Ok(Pip::new(row, col, src, dest))
    }

    /// Collects the pips of a net's routing string.  Fields naming plain wires
    /// or strengths are skipped.
    pub fn from_routing(routing: &str) -> Result<Vec<Pip>> {
        let mut res = vec![];
        for field in routing.split(';') {
            let Some((_, _, rest)) = split_tile_prefix(field) else {
                continue;
            };
            if !rest.contains('_') {
                continue;
            }
            res.push(Pip::parse(field)?);
        }
        Ok(res)
    }
}
