//! Move validation: attack detection, own-king safety filtering, move
//! application and end-of-game detection.

use std::collections::BTreeSet;

use crate::board::Board;
use crate::castling::CastlingRight;
use crate::chess_move::Move;
use crate::coordinate::Coordinate;
use crate::error::ChessError;
use crate::piece::{
    king_offsets, knight_offsets, Color, Piece, PieceType, BISHOP_DIRECTIONS, ROOK_DIRECTIONS,
};

/// How a game ended, when the position alone decides it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Checkmate { winner: Color },
    Stalemate,
    InsufficientMaterial,
}

impl Board {
    /// True when any piece of color `by` attacks `square` on this board.
    /// Pawns attack diagonally only; castling never counts as an attack.
    pub fn is_attacked(&self, square: Coordinate, by: Color) -> bool {
        let holds = |at: Option<Coordinate>, kinds: &[PieceType]| {
            at.and_then(|sq| self.piece_at(sq))
                .is_some_and(|p| p.color == by && kinds.contains(&p.kind))
        };

        // A pawn of `by` attacks `square` from one rank behind it.
        let behind = -by.forward();
        if holds(square.offset(-1, behind), &[PieceType::Pawn])
            || holds(square.offset(1, behind), &[PieceType::Pawn])
        {
            return true;
        }

        if knight_offsets()
            .iter()
            .any(|&(df, dr)| holds(square.offset(df, dr), &[PieceType::Knight]))
        {
            return true;
        }

        if king_offsets()
            .iter()
            .any(|&(df, dr)| holds(square.offset(df, dr), &[PieceType::King]))
        {
            return true;
        }

        self.ray_hits(square, &ROOK_DIRECTIONS, by, &[PieceType::Rook, PieceType::Queen])
            || self.ray_hits(square, &BISHOP_DIRECTIONS, by, &[PieceType::Bishop, PieceType::Queen])
    }

    /// Walks each ray out from `square` and reports whether the first piece
    /// met is one of `kinds` belonging to `by`.
    fn ray_hits(
        &self,
        square: Coordinate,
        directions: &[(i8, i8)],
        by: Color,
        kinds: &[PieceType],
    ) -> bool {
        directions.iter().any(|&(df, dr)| {
            let mut cursor = square;
            while let Some(next) = cursor.offset(df, dr) {
                if let Some(piece) = self.piece_at(next) {
                    return piece.color == by && kinds.contains(&piece.kind);
                }
                cursor = next;
            }
            false
        })
    }

    pub fn in_check(&self, color: Color) -> bool {
        self.king_position(color)
            .is_some_and(|king| self.is_attacked(king, color.opposite()))
    }

    /// Whether the side to move is in check.
    pub fn is_check(&self) -> bool {
        self.in_check(self.side_to_move)
    }

    /// Legal destinations for the piece on `position`. Empty when the square
    /// is empty or holds a piece of the side not on move.
    pub fn legal_destinations(&self, position: Coordinate) -> BTreeSet<Coordinate> {
        match self.piece_at(position) {
            Some(piece) if piece.color == self.side_to_move => self.safe_destinations(piece),
            _ => BTreeSet::new(),
        }
    }

    fn safe_destinations(&self, piece: Piece) -> BTreeSet<Coordinate> {
        piece
            .candidate_destinations(self)
            .into_iter()
            .filter(|&to| !self.play(piece, to, None).in_check(piece.color))
            .collect()
    }

    /// Validate `mv` against this position and return the resulting board.
    /// `self` is never modified; a rejected move has no effect.
    pub fn apply(&self, mv: &Move) -> Result<Board, ChessError> {
        let piece = self
            .piece_at(mv.source)
            .filter(|p| p.color == self.side_to_move)
            .ok_or(ChessError::IllegalMove)?;

        if !self.legal_destinations(mv.source).contains(&mv.destination) {
            return Err(ChessError::IllegalMove);
        }

        let promotes =
            piece.kind == PieceType::Pawn && mv.destination.rank() == piece.color.promotion_rank();
        match (promotes, mv.promotion) {
            (true, Some(kind)) if kind.is_promotion_choice() => {}
            (false, None) => {}
            _ => return Err(ChessError::IllegalMove),
        }

        Ok(self.play(piece, mv.destination, mv.promotion))
    }

    /// Plays a move without checking legality. Handles captures, en passant,
    /// the rook half of castling, promotion, rights and counters.
    fn play(&self, piece: Piece, to: Coordinate, promotion: Option<PieceType>) -> Board {
        let mut next = self.clone();
        let from = piece.position;

        next.remove_piece(from);
        let mut captured = next.remove_piece(to);

        if piece.kind == PieceType::Pawn
            && captured.is_none()
            && from.file() != to.file()
            && self.en_passant == Some(to)
        {
            captured = next.remove_piece(Coordinate::from_parts(to.file(), from.rank()));
        }

        if piece.kind == PieceType::King && from.file().abs_diff(to.file()) == 2 {
            if let Some(right) = CastlingRight::for_king_move(piece.color, to) {
                if let Some(rook) = next.remove_piece(right.rook_square()) {
                    next.set_piece(rook.moved_to(right.rook_destination()));
                }
            }
        }

        let kind = match (piece.kind, promotion) {
            (PieceType::Pawn, Some(choice)) => choice,
            (kind, _) => kind,
        };
        next.set_piece(Piece::new(piece.color, kind, to));

        if piece.kind == PieceType::King {
            next.castling.remove_color(piece.color);
        }
        for square in [from, to] {
            if let Some(right) = CastlingRight::for_rook_square(square) {
                next.castling.remove(right);
            }
        }

        next.en_passant = if piece.kind == PieceType::Pawn && from.rank().abs_diff(to.rank()) == 2 {
            from.offset(0, piece.color.forward())
        } else {
            None
        };

        if piece.kind == PieceType::Pawn || captured.is_some() {
            next.halfmove_clock = 0;
        } else {
            next.halfmove_clock = next.halfmove_clock.saturating_add(1);
        }
        if piece.color == Color::Black {
            next.fullmove_number = next.fullmove_number.saturating_add(1);
        }
        next.side_to_move = piece.color.opposite();

        next
    }

    /// Every legal move for the side to move; promotions appear once per choice.
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        for piece in self.pieces_of(self.side_to_move) {
            for to in self.safe_destinations(piece) {
                if piece.kind == PieceType::Pawn && to.rank() == piece.color.promotion_rank() {
                    moves.extend(
                        PieceType::PROMOTIONS
                            .iter()
                            .map(|&kind| Move::with_promotion(piece.position, to, kind)),
                    );
                } else {
                    moves.push(Move::new(piece.position, to));
                }
            }
        }
        moves
    }

    fn has_legal_move(&self) -> bool {
        self.pieces_of(self.side_to_move)
            .any(|piece| !self.safe_destinations(piece).is_empty())
    }

    /// Bare kings, or a single knight or bishop against a bare king.
    pub fn is_insufficient_material(&self) -> bool {
        let mut minors = 0;
        for piece in self.pieces() {
            match piece.kind {
                PieceType::King => {}
                PieceType::Knight | PieceType::Bishop => minors += 1,
                _ => return false,
            }
        }
        minors <= 1
    }

    pub fn outcome(&self) -> Option<Outcome> {
        if !self.has_legal_move() {
            return Some(if self.is_check() {
                Outcome::Checkmate {
                    winner: self.side_to_move.opposite(),
                }
            } else {
                Outcome::Stalemate
            });
        }
        if self.is_insufficient_material() {
            return Some(Outcome::InsufficientMaterial);
        }
        None
    }
}
