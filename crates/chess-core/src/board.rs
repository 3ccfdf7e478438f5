//! Board state: an 8x8 grid of optional pieces plus the side to move,
//! castling rights, en-passant target and move counters.

use std::fmt;

use crate::castling::{CastlingRight, CastlingRights};
use crate::coordinate::Coordinate;
use crate::piece::{Color, Piece, PieceType};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Board {
    /// Indexed `[rank][file]`.
    squares: [[Option<Piece>; 8]; 8],
    pub(crate) side_to_move: Color,
    pub(crate) castling: CastlingRights,
    pub(crate) en_passant: Option<Coordinate>,
    pub(crate) halfmove_clock: u32,
    pub(crate) fullmove_number: u32,
}

impl Board {
    /// A board with no pieces, white to move and no castling rights.
    pub fn empty() -> Self {
        Self {
            squares: [[None; 8]; 8],
            side_to_move: Color::White,
            castling: CastlingRights::none(),
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    /// The standard initial position (`STARTING_FEN`).
    pub fn starting() -> Self {
        const BACK_RANK: [PieceType; 8] = [
            PieceType::Rook,
            PieceType::Knight,
            PieceType::Bishop,
            PieceType::Queen,
            PieceType::King,
            PieceType::Bishop,
            PieceType::Knight,
            PieceType::Rook,
        ];

        let mut board = Self::empty();
        for color in [Color::White, Color::Black] {
            for (file, kind) in BACK_RANK.into_iter().enumerate() {
                let file = file as u8;
                board.set_piece(Piece::new(
                    color,
                    kind,
                    Coordinate::from_parts(file, color.home_rank()),
                ));
                board.set_piece(Piece::new(
                    color,
                    PieceType::Pawn,
                    Coordinate::from_parts(file, color.pawn_rank()),
                ));
            }
        }
        board.castling = CastlingRights::all();
        board
    }

    pub fn piece_at(&self, square: Coordinate) -> Option<Piece> {
        self.squares[square.rank() as usize][square.file() as usize]
    }

    /// Places `piece` on its own `position`, replacing whatever stood there.
    pub fn set_piece(&mut self, piece: Piece) {
        self.squares[piece.position.rank() as usize][piece.position.file() as usize] = Some(piece);
    }

    pub fn remove_piece(&mut self, square: Coordinate) -> Option<Piece> {
        self.squares[square.rank() as usize][square.file() as usize].take()
    }

    pub fn pieces(&self) -> impl Iterator<Item = Piece> + '_ {
        self.squares.iter().flatten().filter_map(|cell| *cell)
    }

    pub fn pieces_of(&self, color: Color) -> impl Iterator<Item = Piece> + '_ {
        self.pieces().filter(move |piece| piece.color == color)
    }

    pub fn king_position(&self, color: Color) -> Option<Coordinate> {
        self.pieces_of(color)
            .find(|piece| piece.kind == PieceType::King)
            .map(|king| king.position)
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    pub fn set_side_to_move(&mut self, color: Color) {
        self.side_to_move = color;
    }

    pub fn castling_rights(&self) -> CastlingRights {
        self.castling
    }

    /// Permanently drops a castling right. Rights are never re-granted by play.
    pub fn revoke_castling(&mut self, right: CastlingRight) {
        self.castling.remove(right);
    }

    pub fn en_passant(&self) -> Option<Coordinate> {
        self.en_passant
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::starting()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_fen())
    }
}
