//! Bishop, rook, and queen move generation.

use crate::board::attacks::tables;
use crate::board::state::Board;
use crate::board::types::{Bitboard, Move, MoveList, Square};

#[derive(Clone, Copy)]
pub(crate) enum SliderType {
    Bishop,
    Rook,
    Queen,
}

impl Board {
    pub(crate) fn slider_moves(
        &self,
        from: Square,
        slider: SliderType,
        moves: &mut MoveList,
        captures_only: bool,
    ) {
        let us = self.side_to_move;
        let occ = self.all_occupied.0;
        let attacks = match slider {
            SliderType::Bishop => tables().bishop_attacks(from.index(), occ),
            SliderType::Rook => tables().rook_attacks(from.index(), occ),
            SliderType::Queen => tables().queen_attacks(from.index(), occ),
        };
        let targets = attacks & !self.occupied[us.index()].0;
        for to in Bitboard(targets).iter() {
            if !self.is_empty_square(to) {
                moves.push(Move::capture(from, to));
            } else if !captures_only {
                moves.push(Move::quiet(from, to));
            }
        }
    }
}
