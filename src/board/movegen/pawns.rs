//! Pawn move generation: pushes, double pushes, captures, en passant,
//! and the four promotions for each promoting push or capture.

use crate::board::attacks::tables;
use crate::board::state::Board;
use crate::board::types::{Bitboard, Move, MoveList, Square, PROMOTION_PIECES};

impl Board {
    pub(crate) fn pawn_moves(&self, from: Square, moves: &mut MoveList, captures_only: bool) {
        let us = self.side_to_move;
        let white = us.is_white();
        let rank = from.rank();
        let file = from.file();

        // A pawn never stands on its own promotion rank, so the forward
        // rank is always on the board.
        debug_assert!((1..=6).contains(&rank));
        let next_rank = if white { rank + 1 } else { rank - 1 };
        let promo_rank = if white { 7 } else { 0 };
        let start_rank = if white { 1 } else { 6 };

        let forward = Square::new(next_rank, file);
        if self.is_empty_square(forward) {
            if next_rank == promo_rank {
                // Promotion pushes belong to the tactical set too.
                for piece in PROMOTION_PIECES {
                    moves.push(Move::promotion(from, forward, piece, false));
                }
            } else if !captures_only {
                moves.push(Move::quiet(from, forward));
                if rank == start_rank {
                    let double_rank = if white { rank + 2 } else { rank - 2 };
                    let double = Square::new(double_rank, file);
                    if self.is_empty_square(double) {
                        moves.push(Move::double_push(from, double));
                    }
                }
            }
        }

        let targets = tables().pawn_attacks(us.index(), from.index());
        for to in Bitboard(targets).iter() {
            if let Some((color, _)) = self.piece_at(to) {
                if color != us {
                    if to.rank() == promo_rank {
                        for piece in PROMOTION_PIECES {
                            moves.push(Move::promotion(from, to, piece, true));
                        }
                    } else {
                        moves.push(Move::capture(from, to));
                    }
                }
            } else if Some(to) == self.en_passant_target {
                moves.push(Move::en_passant(from, to));
            }
        }
    }
}
