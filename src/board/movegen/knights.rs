//! Knight move generation.

use crate::board::attacks::tables;
use crate::board::state::Board;
use crate::board::types::{Bitboard, Move, MoveList, Square};

impl Board {
    pub(crate) fn knight_moves(&self, from: Square, moves: &mut MoveList, captures_only: bool) {
        let us = self.side_to_move;
        let targets =
            tables().knight_attacks(from.index()) & !self.occupied[us.index()].0;
        for to in Bitboard(targets).iter() {
            if !self.is_empty_square(to) {
                moves.push(Move::capture(from, to));
            } else if !captures_only {
                moves.push(Move::quiet(from, to));
            }
        }
    }
}
