use prjcombine_gowin::{ChipDbError, FeatureKey};
use thiserror::Error;

/// Errors of the pack and unpack pipelines.  Grid coordinates are 1-based.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration conflict at R{row}C{col}: {message}")]
    ConfigurationConflict {
        row: usize,
        col: usize,
        message: String,
    },
    #[error("unknown cell type {0}")]
    UnknownCellType(String),
    #[error("no pip {src} -> {dest} in tile R{row}C{col}")]
    UnknownWirePair {
        row: usize,
        col: usize,
        src: String,
        dest: String,
    },
    #[error("malformed {what}: {record:?}")]
    MalformedInput { what: &'static str, record: String },
    #[error("no bel {bel} in tile R{row}C{col}")]
    UnknownBel { row: usize, col: usize, bel: String },
    #[error("bel {bel} in tile R{row}C{col} has no feature {feature}")]
    UnknownFeature {
        row: usize,
        col: usize,
        bel: String,
        feature: FeatureKey,
    },
    #[error("bel {bel} in tile R{row}C{col} matches no primitive: {reason}")]
    AmbiguousExtraction {
        row: usize,
        col: usize,
        bel: String,
        reason: String,
    },
    #[error("R{row}C{col} is outside the device grid")]
    OutOfGrid { row: usize, col: usize },
    #[error("unknown device {0}")]
    UnknownDevice(String),
    #[error("no device selected")]
    MissingDevice,
    #[error(transparent)]
    ChipDb(#[from] ChipDbError),
}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn malformed(what: &'static str, record: impl Into<String>) -> Error {
    Error::MalformedInput {
        what,
        record: record.into(),
    }
}
