use thiserror::Error;

use crate::db::TileKindId;

#[derive(Debug, Error)]
pub enum ChipDbError {
    #[error("device grid is empty")]
    EmptyGrid,
    #[error("device grid refers to unknown tile kind {0:?}")]
    UnknownTileKind(TileKindId),
    #[error("tile at ({row}, {col}) does not line up with its row and column")]
    NonUniformGrid { row: usize, col: usize },
    #[error("bit grid is {found:?}, expected {expected:?}")]
    GridShape {
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("cannot decode database: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    #[error("cannot encode database: {0}")]
    Encode(#[from] bincode::error::EncodeError),
}
