//! Board representation: bitboards, make/unmake, attacks, move generation.

pub(crate) mod attacks;
mod error;
mod fen;
mod make_unmake;
mod movegen;
mod see;
mod state;
mod types;

#[cfg(test)]
mod tests;

pub use attacks::{set_indexing_mode, PextMode};
pub use error::{FenError, MoveParseError, SquareError};
pub use state::{Board, NullMoveInfo, UnmakeInfo};
pub use types::{Bitboard, Color, Move, MoveList, Piece, ScoredMove, ScoredMoveList, Square};

pub(crate) use types::{EMPTY_MOVE, MAX_PLY};
