use thiserror::Error;

use crate::components::world::TileId;

/// Failures raised by the round engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("no empty cell left to spawn a tile")]
    NoEmptyCell,
    #[error("round cannot finalize while {pending} tile move(s) are unacknowledged")]
    MovesPending { pending: usize },
    #[error("move ticket for tile {tile} is unknown or already acknowledged")]
    UnknownMoveTicket { tile: TileId },
    #[error("invalid savegame: {0}")]
    InvalidSnapshot(String),
    #[error("game is not in the won state")]
    NotWon,
}
