//! ProbCut: node-level pruning on strong tactical captures.

use crate::board::{MoveList, EMPTY_MOVE};

use super::alphabeta::SearchContext;

impl SearchContext<'_> {
    /// If a positive-SEE capture beats `beta` by a margin at reduced
    /// depth, and a verification search one ply below full depth
    /// confirms, the whole node is cut to `beta`.
    pub(crate) fn probcut(&mut self, depth: i32, beta: i32, ply: usize) -> Option<i32> {
        let probcut_beta = beta + self.params.probcut_margin;

        let mut captures = MoveList::new();
        self.board.generate_captures(&mut captures);

        for m in &captures {
            if !m.is_capture() {
                continue;
            }
            if self.board.see(m.from(), m.to()) <= 0 {
                continue;
            }

            let us = self.board.side_to_move();
            let info = self.board.make_move(*m);
            if self.board.is_in_check(us) {
                self.board.unmake_move(*m, info);
                continue;
            }
            self.previous_move[ply] = *m;

            let mut score = -self.alphabeta(
                depth - 2,
                -probcut_beta,
                -probcut_beta + 1,
                ply + 1,
                false,
                EMPTY_MOVE,
            );

            if score >= probcut_beta {
                // Confirm just below full depth before trusting the cut.
                score = -self.alphabeta(
                    depth - 1,
                    -probcut_beta,
                    -probcut_beta + 1,
                    ply + 1,
                    false,
                    EMPTY_MOVE,
                );
            }

            self.board.unmake_move(*m, info);

            if self.should_stop() {
                return None;
            }
            if score >= probcut_beta {
                return Some(beta);
            }
        }

        None
    }
}
