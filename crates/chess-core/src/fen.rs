//! Position notation (FEN) parsing and generation.

use std::str::FromStr;

use crate::board::Board;
use crate::castling::CastlingRights;
use crate::coordinate::Coordinate;
use crate::error::ChessError;
use crate::piece::{Color, Piece, PieceType};

pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

fn invalid(reason: impl Into<String>) -> ChessError {
    ChessError::InvalidFen(reason.into())
}

impl Board {
    /// Parse all six notation fields. Requires exactly one king per side and
    /// no pawns on the first or last rank.
    pub fn from_fen(fen: &str) -> Result<Self, ChessError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(invalid(format!("expected 6 fields, got {}", fields.len())));
        }

        let mut board = Board::empty();

        let ranks: Vec<&str> = fields[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(invalid(format!("expected 8 ranks, got {}", ranks.len())));
        }
        for (idx, rank_text) in ranks.iter().enumerate() {
            let rank = 7 - idx as u8;
            let mut file: u8 = 0;
            for c in rank_text.chars() {
                if let Some(run) = c.to_digit(10) {
                    if !(1..=8).contains(&run) {
                        return Err(invalid(format!("bad empty run '{c}' on rank {}", rank + 1)));
                    }
                    file += run as u8;
                } else {
                    let kind = PieceType::from_letter(c)
                        .ok_or_else(|| invalid(format!("unknown piece letter '{c}'")))?;
                    if file > 7 {
                        return Err(invalid(format!("rank {} is too long", rank + 1)));
                    }
                    let color = if c.is_ascii_uppercase() {
                        Color::White
                    } else {
                        Color::Black
                    };
                    if kind == PieceType::Pawn && (rank == 0 || rank == 7) {
                        return Err(invalid(format!("pawn on rank {}", rank + 1)));
                    }
                    board.set_piece(Piece::new(color, kind, Coordinate::from_parts(file, rank)));
                    file += 1;
                }
                if file > 8 {
                    return Err(invalid(format!("rank {} is too long", rank + 1)));
                }
            }
            if file != 8 {
                return Err(invalid(format!("rank {} has {file} squares", rank + 1)));
            }
        }

        for color in [Color::White, Color::Black] {
            let kings = board
                .pieces_of(color)
                .filter(|piece| piece.kind == PieceType::King)
                .count();
            if kings != 1 {
                return Err(invalid(format!("{color} has {kings} kings")));
            }
        }

        board.side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(invalid(format!("bad side to move '{other}'"))),
        };

        board.castling = CastlingRights::from_fen(fields[2])
            .ok_or_else(|| invalid(format!("bad castling field '{}'", fields[2])))?;

        if fields[3] != "-" {
            let target: Coordinate = fields[3]
                .parse()
                .map_err(|_| invalid(format!("bad en passant square '{}'", fields[3])))?;
            let expected_rank = match board.side_to_move {
                Color::White => 5,
                Color::Black => 2,
            };
            if target.rank() != expected_rank {
                return Err(invalid(format!("en passant square {target} on wrong rank")));
            }
            board.en_passant = Some(target);
        }

        board.halfmove_clock = fields[4]
            .parse()
            .map_err(|_| invalid(format!("bad halfmove clock '{}'", fields[4])))?;
        board.fullmove_number = fields[5]
            .parse()
            .map_err(|_| invalid(format!("bad fullmove number '{}'", fields[5])))?;
        if board.fullmove_number == 0 {
            return Err(invalid("fullmove number must be at least 1"));
        }

        Ok(board)
    }

    pub fn to_fen(&self) -> String {
        let mut fen = String::with_capacity(90);

        for rank in (0..8u8).rev() {
            let mut empty = 0u8;
            for file in 0..8u8 {
                match self.piece_at(Coordinate::from_parts(file, rank)) {
                    Some(piece) => {
                        if empty > 0 {
                            fen.push((b'0' + empty) as char);
                            empty = 0;
                        }
                        fen.push(piece.symbol());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                fen.push((b'0' + empty) as char);
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        });
        fen.push(' ');
        fen.push_str(&self.castling.to_fen());
        fen.push(' ');
        match self.en_passant {
            Some(target) => fen.push_str(&target.to_string()),
            None => fen.push('-'),
        }
        fen.push_str(&format!(" {} {}", self.halfmove_clock, self.fullmove_number));

        fen
    }
}

impl FromStr for Board {
    type Err = ChessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Board::from_fen(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_known_positions() {
        for fen in [
            STARTING_FEN,
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1",
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "4k3/8/8/8/8/8/8/4K3 b - - 37 80",
        ] {
            let board: Board = fen.parse().unwrap();
            assert_eq!(board.to_fen(), fen);
            assert_eq!(Board::from_fen(&board.to_fen()).unwrap(), board);
        }
    }

    #[test]
    fn rejects_malformed_notation() {
        let cases = [
            "",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP w KQkq - 0 1",
            "rnbqkbnr/pppppppp/9/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNRR w KQkq - 0 1",
            "rnbqkbnr/pppppppp/7/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnr/ppppxppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbq1bnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkz - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq e4 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - x 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 0",
            "rnbqkbnP/pppppppp/8/8/8/8/PPPPPPP1/RNBQKBNR w KQkq - 0 1",
        ];
        for fen in cases {
            assert!(
                matches!(Board::from_fen(fen), Err(ChessError::InvalidFen(_))),
                "{fen:?} should be rejected"
            );
        }
    }
}
