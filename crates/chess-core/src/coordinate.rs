//! Board coordinates and algebraic square names.
//!
//! A `Coordinate` is a file/rank pair, both zero-based: `a1` is `(0, 0)` and
//! `h8` is `(7, 7)`. Values can only be built from valid pairs or valid
//! algebraic text, so every `Coordinate` in circulation is on the board.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ChessError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coordinate {
    file: u8,
    rank: u8,
}

impl Coordinate {
    pub fn new(file: u8, rank: u8) -> Result<Self, ChessError> {
        if file > 7 || rank > 7 {
            return Err(ChessError::InvalidCoordinate(format!("({file}, {rank})")));
        }
        Ok(Self { file, rank })
    }

    /// Caller guarantees both values are in `0..8`.
    pub(crate) const fn from_parts(file: u8, rank: u8) -> Self {
        Self { file, rank }
    }

    pub const fn file(self) -> u8 {
        self.file
    }

    pub const fn rank(self) -> u8 {
        self.rank
    }

    /// Square reached by stepping `(df, dr)`, or `None` when that leaves the board.
    pub fn offset(self, df: i8, dr: i8) -> Option<Self> {
        let file = self.file as i8 + df;
        let rank = self.rank as i8 + dr;
        if (0..8).contains(&file) && (0..8).contains(&rank) {
            Some(Self::from_parts(file as u8, rank as u8))
        } else {
            None
        }
    }

    /// All 64 squares, rank by rank from `a1`.
    pub fn all() -> impl Iterator<Item = Coordinate> {
        (0..8u8).flat_map(|rank| (0..8u8).map(move |file| Coordinate::from_parts(file, rank)))
    }
}

impl FromStr for Coordinate {
    type Err = ChessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.as_bytes() {
            [f @ b'a'..=b'h', r @ b'1'..=b'8'] => Ok(Self::from_parts(f - b'a', r - b'1')),
            _ => Err(ChessError::InvalidCoordinate(s.to_string())),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.file) as char, self.rank + 1)
    }
}

impl Serialize for Coordinate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Coordinate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}
