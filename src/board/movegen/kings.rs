//! King move generation, including castling.

use crate::board::attacks::tables;
use crate::board::state::Board;
use crate::board::types::{
    Bitboard, Move, MoveList, Piece, Square, CASTLE_BLACK_K, CASTLE_BLACK_Q, CASTLE_WHITE_K,
    CASTLE_WHITE_Q,
};

impl Board {
    pub(crate) fn king_moves(&self, from: Square, moves: &mut MoveList, captures_only: bool) {
        let us = self.side_to_move;
        let targets = tables().king_attacks(from.index()) & !self.occupied[us.index()].0;
        for to in Bitboard(targets).iter() {
            if !self.is_empty_square(to) {
                moves.push(Move::capture(from, to));
            } else if !captures_only {
                moves.push(Move::quiet(from, to));
            }
        }

        if !captures_only {
            self.castling_moves(from, moves);
        }
    }

    /// Castling requires: the right is held, the squares between king and
    /// rook are empty, the rook is home, and no square the king touches
    /// (origin, transit, destination) is attacked.
    fn castling_moves(&self, from: Square, moves: &mut MoveList) {
        let us = self.side_to_move;
        let them = us.opponent();
        let back = if us.is_white() { 0 } else { 7 };
        if from != Square::new(back, 4) {
            return;
        }

        let (kingside, queenside) = if us.is_white() {
            (CASTLE_WHITE_K, CASTLE_WHITE_Q)
        } else {
            (CASTLE_BLACK_K, CASTLE_BLACK_Q)
        };

        if self.castling_rights & kingside != 0
            && self.is_empty_square(Square::new(back, 5))
            && self.is_empty_square(Square::new(back, 6))
            && self.piece_at(Square::new(back, 7)) == Some((us, Piece::Rook))
            && !self.is_square_attacked(from, them)
            && !self.is_square_attacked(Square::new(back, 5), them)
            && !self.is_square_attacked(Square::new(back, 6), them)
        {
            moves.push(Move::castle_kingside(from, Square::new(back, 6)));
        }

        if self.castling_rights & queenside != 0
            && self.is_empty_square(Square::new(back, 1))
            && self.is_empty_square(Square::new(back, 2))
            && self.is_empty_square(Square::new(back, 3))
            && self.piece_at(Square::new(back, 0)) == Some((us, Piece::Rook))
            && !self.is_square_attacked(from, them)
            && !self.is_square_attacked(Square::new(back, 3), them)
            && !self.is_square_attacked(Square::new(back, 2), them)
        {
            moves.push(Move::castle_queenside(from, Square::new(back, 2)));
        }
    }
}
