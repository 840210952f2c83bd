//! Move ordering.
//!
//! Scores every generated move into ordering regions; the move loop then
//! drains them best-first with incremental selection, so the hash move,
//! winning captures, and killers phase out before quiet moves are even
//! looked at.

use crate::board::{Move, MoveList, Piece, ScoredMoveList, EMPTY_MOVE};

use super::alphabeta::SearchContext;
use super::constants::{
    BAD_CAPTURE_SCORE, COUNTER_MOVE_SCORE, GOOD_CAPTURE_SCORE, KILLER_PRIMARY_SCORE,
    KILLER_SECONDARY_SCORE, TT_MOVE_SCORE,
};

impl SearchContext<'_> {
    /// Score `moves` for best-first draining.
    pub(crate) fn order_moves(
        &self,
        moves: &MoveList,
        tt_move: Move,
        ply: usize,
        prev_move: Move,
    ) -> ScoredMoveList {
        let counter = if prev_move.is_null() {
            EMPTY_MOVE
        } else {
            self.tables
                .counters
                .get(prev_move.from().index(), prev_move.to().index())
        };

        let mut scored = ScoredMoveList::new();
        for m in moves {
            let score = if *m == tt_move {
                TT_MOVE_SCORE
            } else if *m == counter && m.is_quiet() {
                COUNTER_MOVE_SCORE
            } else if m.is_capture() {
                let exchange = self.mvv_lva(*m);
                if self
                    .board
                    .see_ge(m.from(), m.to(), self.params.see_good_capture_threshold)
                {
                    GOOD_CAPTURE_SCORE + exchange
                } else {
                    BAD_CAPTURE_SCORE + exchange
                }
            } else if m.is_promotion() {
                // Quiet promotions rank with winning captures.
                GOOD_CAPTURE_SCORE
                    + m.promotion_piece().map_or(0, Piece::value)
            } else if *m == self.tables.killers.primary(ply) {
                KILLER_PRIMARY_SCORE
            } else if *m == self.tables.killers.secondary(ply) {
                KILLER_SECONDARY_SCORE
            } else {
                self.tables.history.score(*m)
            };
            scored.push(*m, score);
        }
        scored
    }

    /// Most-valuable-victim / least-valuable-aggressor capture score.
    pub(crate) fn mvv_lva(&self, m: Move) -> i32 {
        let attacker = match self.board.piece_at(m.from()) {
            Some((_, piece)) => piece.value(),
            None => return 0,
        };
        let victim = if m.is_en_passant() {
            Piece::Pawn.value()
        } else {
            match self.board.piece_at(m.to()) {
                Some((_, piece)) => piece.value(),
                None => return 0,
            }
        };
        victim * 10 - attacker
    }
}
