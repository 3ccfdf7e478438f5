//! Pieces and their raw movement patterns.
//!
//! Each piece kind contributes the squares it could reach on the current
//! board, ignoring whether the move would expose its own king. Filtering for
//! king safety happens in the validator.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::castling::CastlingRight;
use crate::coordinate::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub const fn opposite(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Rank direction pawns of this color advance in.
    pub(crate) const fn forward(self) -> i8 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }

    pub(crate) const fn home_rank(self) -> u8 {
        match self {
            Color::White => 0,
            Color::Black => 7,
        }
    }

    pub(crate) const fn pawn_rank(self) -> u8 {
        match self {
            Color::White => 1,
            Color::Black => 6,
        }
    }

    pub(crate) const fn promotion_rank(self) -> u8 {
        match self {
            Color::White => 7,
            Color::Black => 0,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "white"),
            Color::Black => write!(f, "black"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceType {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceType {
    pub const PROMOTIONS: [PieceType; 4] = [
        PieceType::Queen,
        PieceType::Rook,
        PieceType::Bishop,
        PieceType::Knight,
    ];

    /// Lowercase letter used in notation (`p`, `n`, `b`, `r`, `q`, `k`).
    pub const fn letter(self) -> char {
        match self {
            PieceType::Pawn => 'p',
            PieceType::Knight => 'n',
            PieceType::Bishop => 'b',
            PieceType::Rook => 'r',
            PieceType::Queen => 'q',
            PieceType::King => 'k',
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'p' => Some(PieceType::Pawn),
            'n' => Some(PieceType::Knight),
            'b' => Some(PieceType::Bishop),
            'r' => Some(PieceType::Rook),
            'q' => Some(PieceType::Queen),
            'k' => Some(PieceType::King),
            _ => None,
        }
    }

    pub const fn is_promotion_choice(self) -> bool {
        matches!(
            self,
            PieceType::Knight | PieceType::Bishop | PieceType::Rook | PieceType::Queen
        )
    }
}

const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

const KING_OFFSETS: [(i8, i8); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

pub(crate) const ROOK_DIRECTIONS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
pub(crate) const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

pub(crate) fn knight_offsets() -> &'static [(i8, i8)] {
    &KNIGHT_OFFSETS
}

pub(crate) fn king_offsets() -> &'static [(i8, i8)] {
    &KING_OFFSETS
}

/// A piece standing on a particular square. Pieces are values: moving one
/// places an updated copy on the destination square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub color: Color,
    pub kind: PieceType,
    pub position: Coordinate,
}

impl Piece {
    pub const fn new(color: Color, kind: PieceType, position: Coordinate) -> Self {
        Self {
            color,
            kind,
            position,
        }
    }

    pub const fn moved_to(self, position: Coordinate) -> Self {
        Self { position, ..self }
    }

    /// Notation letter: uppercase for white, lowercase for black.
    pub fn symbol(&self) -> char {
        match self.color {
            Color::White => self.kind.letter().to_ascii_uppercase(),
            Color::Black => self.kind.letter(),
        }
    }

    /// Squares this piece could move to on `board` before the own-king check
    /// filter is applied. Castling destinations are included for the king.
    pub fn candidate_destinations(&self, board: &Board) -> Vec<Coordinate> {
        match self.kind {
            PieceType::Pawn => self.pawn_destinations(board),
            PieceType::Knight => self.step_destinations(board, knight_offsets()),
            PieceType::Bishop => self.sliding_destinations(board, &BISHOP_DIRECTIONS),
            PieceType::Rook => self.sliding_destinations(board, &ROOK_DIRECTIONS),
            PieceType::Queen => {
                let mut squares = self.sliding_destinations(board, &ROOK_DIRECTIONS);
                squares.extend(self.sliding_destinations(board, &BISHOP_DIRECTIONS));
                squares
            }
            PieceType::King => {
                let mut squares = self.step_destinations(board, king_offsets());
                squares.extend(self.castling_destinations(board));
                squares
            }
        }
    }

    fn is_enemy_of(&self, other: &Piece) -> bool {
        self.color != other.color
    }

    fn step_destinations(&self, board: &Board, offsets: &[(i8, i8)]) -> Vec<Coordinate> {
        offsets
            .iter()
            .filter_map(|&(df, dr)| self.position.offset(df, dr))
            .filter(|&to| match board.piece_at(to) {
                Some(occupant) => self.is_enemy_of(&occupant),
                None => true,
            })
            .collect()
    }

    /// Rays stop at the first occupied square, which is included only when
    /// an enemy stands on it.
    fn sliding_destinations(&self, board: &Board, directions: &[(i8, i8)]) -> Vec<Coordinate> {
        let mut squares = Vec::new();
        for &(df, dr) in directions {
            let mut cursor = self.position;
            while let Some(next) = cursor.offset(df, dr) {
                match board.piece_at(next) {
                    None => squares.push(next),
                    Some(occupant) => {
                        if self.is_enemy_of(&occupant) {
                            squares.push(next);
                        }
                        break;
                    }
                }
                cursor = next;
            }
        }
        squares
    }

    fn pawn_destinations(&self, board: &Board) -> Vec<Coordinate> {
        let mut squares = Vec::new();
        let forward = self.color.forward();

        if let Some(one) = self.position.offset(0, forward) {
            if board.piece_at(one).is_none() {
                squares.push(one);
                if self.position.rank() == self.color.pawn_rank() {
                    if let Some(two) = one.offset(0, forward) {
                        if board.piece_at(two).is_none() {
                            squares.push(two);
                        }
                    }
                }
            }
        }

        for df in [-1, 1] {
            let Some(target) = self.position.offset(df, forward) else {
                continue;
            };
            match board.piece_at(target) {
                Some(occupant) if self.is_enemy_of(&occupant) => squares.push(target),
                None if board.en_passant() == Some(target) => squares.push(target),
                _ => {}
            }
        }

        squares
    }

    /// Two-square king moves toward a rook. Every condition is checked here:
    /// the right is still held, king and rook stand on their original squares,
    /// the squares between them are empty and the king neither starts on,
    /// crosses, nor lands on an attacked square.
    fn castling_destinations(&self, board: &Board) -> Vec<Coordinate> {
        let home = Coordinate::from_parts(4, self.color.home_rank());
        if self.position != home {
            return Vec::new();
        }
        let enemy = self.color.opposite();
        if board.is_attacked(home, enemy) {
            return Vec::new();
        }

        CastlingRight::for_color(self.color)
            .into_iter()
            .filter(|&right| board.castling_rights().contains(right))
            .filter(|&right| {
                let rook_square = right.rook_square();
                let rook_in_place = board.piece_at(rook_square)
                    == Some(Piece::new(self.color, PieceType::Rook, rook_square));
                rook_in_place
                    && right.squares_between().iter().all(|&sq| board.piece_at(sq).is_none())
                    && right
                        .king_path()
                        .iter()
                        .all(|&sq| !board.is_attacked(sq, enemy))
            })
            .map(|right| right.king_destination())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(name: &str) -> Coordinate {
        name.parse().unwrap()
    }

    fn sorted(mut squares: Vec<Coordinate>) -> Vec<String> {
        squares.sort();
        squares.into_iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn knight_jumps_over_pieces() {
        let board = Board::starting();
        let knight = board.piece_at(sq("g1")).unwrap();
        assert_eq!(sorted(knight.candidate_destinations(&board)), vec!["f3", "h3"]);
    }

    #[test]
    fn rook_ray_stops_at_pieces() {
        let board: Board = "4k3/8/8/8/R2p4/8/8/R3K3 w - - 0 1".parse().unwrap();
        let rook = board.piece_at(sq("a4")).unwrap();
        let squares = sorted(rook.candidate_destinations(&board));
        // Blocked by own rook on a1, captures the pawn on d4 but not beyond.
        assert!(squares.contains(&"d4".to_string()));
        assert!(!squares.contains(&"e4".to_string()));
        assert!(!squares.contains(&"a1".to_string()));
        assert!(squares.contains(&"a2".to_string()));
        assert!(squares.contains(&"a8".to_string()));
    }

    #[test]
    fn pawn_double_step_needs_both_squares_empty() {
        let board: Board = "4k3/8/8/8/4p3/8/3PP3/4K3 w - - 0 1".parse().unwrap();
        let d2 = board.piece_at(sq("d2")).unwrap();
        assert_eq!(sorted(d2.candidate_destinations(&board)), vec!["d3", "d4"]);

        let blocked: Board = "4k3/8/8/8/8/4p3/4P3/4K3 w - - 0 1".parse().unwrap();
        let e2 = blocked.piece_at(sq("e2")).unwrap();
        assert!(e2.candidate_destinations(&blocked).is_empty());
    }

    #[test]
    fn pawn_captures_diagonally_and_en_passant() {
        let board: Board = "4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1".parse().unwrap();
        let pawn = board.piece_at(sq("e5")).unwrap();
        assert_eq!(sorted(pawn.candidate_destinations(&board)), vec!["d6", "e6"]);
    }

    #[test]
    fn symbols_follow_color_case() {
        let white_queen = Piece::new(Color::White, PieceType::Queen, sq("d1"));
        let black_knight = Piece::new(Color::Black, PieceType::Knight, sq("b8"));
        assert_eq!(white_queen.symbol(), 'Q');
        assert_eq!(black_knight.symbol(), 'n');
        assert_eq!(white_queen.moved_to(sq("h5")).position, sq("h5"));
    }
}
