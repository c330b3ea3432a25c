// error.rs — error types surfaced to the engine

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("entity lump record {record}: {reason}")]
    EntityLump { record: usize, reason: String },

    #[error("map list: {0}")]
    MapList(String),

    #[error("no free entity slots ({0} in use)")]
    EntityStoreFull(usize),

    #[error("slot {0} has no client record")]
    UnknownClient(usize),

    #[error("connection refused: {0}")]
    ConnectRefused(String),

    #[error("{0}")]
    Fatal(String),
}

pub type GameResult<T> = Result<T, GameError>;

impl GameError {
    pub fn lump(record: usize, reason: impl Into<String>) -> Self {
        GameError::EntityLump { record, reason: reason.into() }
    }
}
