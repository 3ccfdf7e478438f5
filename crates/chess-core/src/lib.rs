//! Chess rules engine: board representation, position notation, move
//! generation with own-king safety, and game outcome detection.

pub mod board;
pub mod castling;
pub mod chess_move;
pub mod coordinate;
pub mod error;
pub mod fen;
pub mod piece;
pub mod validator;

pub use board::Board;
pub use castling::{CastlingRight, CastlingRights};
pub use chess_move::Move;
pub use coordinate::Coordinate;
pub use error::ChessError;
pub use fen::STARTING_FEN;
pub use piece::{Color, Piece, PieceType};
pub use validator::Outcome;
