//! Castling rights and the fixed geometry of each castling move.

use serde::{Deserialize, Serialize};

use crate::coordinate::Coordinate;
use crate::piece::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CastlingRight {
    WhiteKingSide,
    WhiteQueenSide,
    BlackKingSide,
    BlackQueenSide,
}

impl CastlingRight {
    pub const ALL: [CastlingRight; 4] = [
        CastlingRight::WhiteKingSide,
        CastlingRight::WhiteQueenSide,
        CastlingRight::BlackKingSide,
        CastlingRight::BlackQueenSide,
    ];

    pub const fn for_color(color: Color) -> [CastlingRight; 2] {
        match color {
            Color::White => [CastlingRight::WhiteKingSide, CastlingRight::WhiteQueenSide],
            Color::Black => [CastlingRight::BlackKingSide, CastlingRight::BlackQueenSide],
        }
    }

    pub const fn color(self) -> Color {
        match self {
            CastlingRight::WhiteKingSide | CastlingRight::WhiteQueenSide => Color::White,
            CastlingRight::BlackKingSide | CastlingRight::BlackQueenSide => Color::Black,
        }
    }

    const fn is_king_side(self) -> bool {
        matches!(self, CastlingRight::WhiteKingSide | CastlingRight::BlackKingSide)
    }

    const fn bit(self) -> u8 {
        match self {
            CastlingRight::WhiteKingSide => 1 << 0,
            CastlingRight::WhiteQueenSide => 1 << 1,
            CastlingRight::BlackKingSide => 1 << 2,
            CastlingRight::BlackQueenSide => 1 << 3,
        }
    }

    pub const fn fen_letter(self) -> char {
        match self {
            CastlingRight::WhiteKingSide => 'K',
            CastlingRight::WhiteQueenSide => 'Q',
            CastlingRight::BlackKingSide => 'k',
            CastlingRight::BlackQueenSide => 'q',
        }
    }

    const fn rank(self) -> u8 {
        self.color().home_rank()
    }

    /// Corner the rook starts on.
    pub const fn rook_square(self) -> Coordinate {
        let file = if self.is_king_side() { 7 } else { 0 };
        Coordinate::from_parts(file, self.rank())
    }

    pub const fn king_destination(self) -> Coordinate {
        let file = if self.is_king_side() { 6 } else { 2 };
        Coordinate::from_parts(file, self.rank())
    }

    /// The square the king crosses, where the rook lands.
    pub const fn rook_destination(self) -> Coordinate {
        let file = if self.is_king_side() { 5 } else { 3 };
        Coordinate::from_parts(file, self.rank())
    }

    /// Squares that must be empty between king and rook.
    pub fn squares_between(self) -> Vec<Coordinate> {
        let files: &[u8] = if self.is_king_side() { &[5, 6] } else { &[1, 2, 3] };
        files
            .iter()
            .map(|&file| Coordinate::from_parts(file, self.rank()))
            .collect()
    }

    /// Squares the king passes through, destination included.
    pub fn king_path(self) -> [Coordinate; 2] {
        [self.rook_destination(), self.king_destination()]
    }

    /// The right that is lost when a piece leaves or is captured on `square`.
    pub fn for_rook_square(square: Coordinate) -> Option<Self> {
        Self::ALL.into_iter().find(|right| right.rook_square() == square)
    }

    /// Right exercised by a king moving from its home square to `destination`.
    pub fn for_king_move(color: Color, destination: Coordinate) -> Option<Self> {
        Self::for_color(color)
            .into_iter()
            .find(|right| right.king_destination() == destination)
    }
}

/// Set of castling rights still held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CastlingRights(u8);

impl CastlingRights {
    pub const fn none() -> Self {
        Self(0)
    }

    pub const fn all() -> Self {
        Self(0b1111)
    }

    pub const fn contains(self, right: CastlingRight) -> bool {
        self.0 & right.bit() != 0
    }

    pub fn insert(&mut self, right: CastlingRight) {
        self.0 |= right.bit();
    }

    pub fn remove(&mut self, right: CastlingRight) {
        self.0 &= !right.bit();
    }

    pub fn remove_color(&mut self, color: Color) {
        for right in CastlingRight::for_color(color) {
            self.remove(right);
        }
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = CastlingRight> {
        CastlingRight::ALL
            .into_iter()
            .filter(move |right| self.contains(*right))
    }

    pub fn to_fen(self) -> String {
        if self.is_empty() {
            return "-".to_string();
        }
        self.iter().map(CastlingRight::fen_letter).collect()
    }

    pub fn from_fen(text: &str) -> Option<Self> {
        if text == "-" {
            return Some(Self::none());
        }
        if text.is_empty() {
            return None;
        }
        let mut rights = Self::none();
        for c in text.chars() {
            let right = CastlingRight::ALL
                .into_iter()
                .find(|right| right.fen_letter() == c)?;
            if rights.contains(right) {
                return None;
            }
            rights.insert(right);
        }
        Some(rights)
    }
}
