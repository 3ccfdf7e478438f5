//! Moves as submitted by players: a source square, a destination square and
//! an optional promotion choice. Text form is long algebraic (`e2e4`, `e7e8q`).

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::coordinate::Coordinate;
use crate::error::ChessError;
use crate::piece::PieceType;

static MOVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-h][1-8])([a-h][1-8])([nbrqNBRQ])?$").expect("move pattern compiles")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub source: Coordinate,
    pub destination: Coordinate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<PieceType>,
}

impl Move {
    pub const fn new(source: Coordinate, destination: Coordinate) -> Self {
        Self {
            source,
            destination,
            promotion: None,
        }
    }

    pub const fn with_promotion(source: Coordinate, destination: Coordinate, kind: PieceType) -> Self {
        Self {
            source,
            destination,
            promotion: Some(kind),
        }
    }
}

impl FromStr for Move {
    type Err = ChessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = MOVE_RE
            .captures(s.trim())
            .ok_or_else(|| ChessError::InvalidMoveNotation(s.to_string()))?;

        let source: Coordinate = caps[1].parse()?;
        let destination: Coordinate = caps[2].parse()?;
        let promotion = caps
            .get(3)
            .and_then(|m| m.as_str().chars().next())
            .and_then(PieceType::from_letter);

        Ok(Self {
            source,
            destination,
            promotion,
        })
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.source, self.destination)?;
        if let Some(kind) = self.promotion {
            write!(f, "{}", kind.letter())?;
        }
        Ok(())
    }
}
