//! Quiescence search: captures-only extension past the horizon.

use crate::board::{MoveList, ScoredMoveList, EMPTY_MOVE, MAX_PLY};
use crate::tt::Bound;

use super::constants::{mated_in, score_to_tt, DELTA_PRUNE_VALUE, SCORE_INFINITE, TT_MOVE_SCORE};

use super::alphabeta::SearchContext;

impl SearchContext<'_> {
    /// Resolve tactics before trusting the static evaluation. While in
    /// check there is no quiet standpoint to stand on, so every evasion
    /// is searched and a position with none is mate.
    pub(crate) fn quiescence(&mut self, mut alpha: i32, beta: i32, ply: usize) -> i32 {
        self.count_node(ply);
        if self.should_stop() {
            return 0;
        }

        let stand_pat = self.evaluate();
        if ply >= MAX_PLY - 1 {
            return stand_pat;
        }

        let in_check = self.board.is_in_check(self.board.side_to_move());

        let mut moves = MoveList::new();
        if in_check {
            self.board.generate_pseudo_legal(&mut moves);
        } else {
            // Stand pat: the side to move can usually decline all captures.
            if stand_pat >= beta {
                return beta;
            }
            // Delta pruning: even winning a queen cannot rescue this node.
            if stand_pat < alpha - DELTA_PRUNE_VALUE {
                return alpha;
            }
            if stand_pat > alpha {
                alpha = stand_pat;
            }
            self.board.generate_captures(&mut moves);
        }

        let hash = self.board.hash();
        let tt_move = self.tt.best_move(hash).unwrap_or(EMPTY_MOVE);

        let mut scored = ScoredMoveList::new();
        for m in &moves {
            // Losing captures cannot improve a quiet standpoint; evasions
            // are never filtered.
            if !in_check && m.is_capture() && self.board.see(m.from(), m.to()) < 0 {
                continue;
            }
            let score = if *m == tt_move {
                TT_MOVE_SCORE
            } else {
                self.mvv_lva(*m)
            };
            scored.push(*m, score);
        }

        let original_alpha = alpha;
        let mut best_score = if in_check { -SCORE_INFINITE } else { stand_pat };
        let mut best_move = EMPTY_MOVE;
        let mut legal_moves = 0usize;

        let mut index = 0;
        while let Some(scored_move) = scored.pick_best(index) {
            index += 1;
            let m = scored_move.mv;

            let us = self.board.side_to_move();
            let info = self.board.make_move(m);
            if self.board.is_in_check(us) {
                self.board.unmake_move(m, info);
                continue;
            }
            legal_moves += 1;

            let score = -self.quiescence(-beta, -alpha, ply + 1);
            self.board.unmake_move(m, info);

            if self.should_stop() {
                return 0;
            }

            if score > best_score {
                best_score = score;
                best_move = m;
                if score > alpha {
                    alpha = score;
                    if alpha >= beta {
                        break;
                    }
                }
            }
        }

        if in_check && legal_moves == 0 {
            return mated_in(ply);
        }

        // Depth-zero entries feed move ordering on re-entry; the TT's
        // replacement rules keep them from displacing real search data.
        if !best_move.is_null() && !self.should_stop() {
            let bound = if best_score >= beta {
                Bound::Lower
            } else if best_score > original_alpha {
                Bound::Exact
            } else {
                Bound::Upper
            };
            self.tt
                .store(hash, 0, score_to_tt(best_score, ply), bound, Some(best_move));
        }

        best_score
    }
}
