//! Rules engine error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChessError {
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("invalid position notation: {0}")]
    InvalidFen(String),

    #[error("invalid move notation: {0}")]
    InvalidMoveNotation(String),

    /// Deliberately carries no detail about which rule failed.
    #[error("illegal move")]
    IllegalMove,
}
