//! PVS alpha-beta search.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use crate::board::{Board, Move, MoveList, EMPTY_MOVE, MAX_PLY};
use crate::eval::Evaluator;
use crate::tt::{Bound, TranspositionTable};

use super::constants::{
    is_mate_score, mate_in, mated_in, score_from_tt, score_to_tt, DRAW_SCORE, SCORE_INFINITE,
};
use super::{SearchParams, SearchTables, SharedSearch};

/// How many nodes accumulate locally before flushing to the shared
/// counter and re-checking the clock.
const NODE_FLUSH_INTERVAL: u64 = 2048;

/// One worker's search state for a single search.
pub(crate) struct SearchContext<'a> {
    pub board: &'a mut Board,
    pub tt: &'a TranspositionTable,
    pub tables: &'a mut SearchTables,
    pub evaluator: &'a dyn Evaluator,
    pub params: &'a SearchParams,
    pub stop: &'a AtomicBool,
    pub shared_nodes: &'a AtomicU64,
    pub start_time: Instant,
    pub hard_deadline_ms: u64,
    pub node_limit: u64,
    pub nodes: u64,
    flushed_nodes: u64,
    pub seldepth: u32,
    /// Move made at each ply, for the counter-move heuristic.
    pub previous_move: [Move; MAX_PLY],
    /// True when multiple workers share the TT: enables ABDADA deferral.
    pub coordinate: bool,
}

impl<'a> SearchContext<'a> {
    pub(crate) fn new(
        shared: &'a SharedSearch<'a>,
        board: &'a mut Board,
        tables: &'a mut SearchTables,
    ) -> Self {
        SearchContext {
            board,
            tt: shared.tt,
            tables,
            evaluator: shared.evaluator,
            params: shared.params,
            stop: shared.stop,
            shared_nodes: &shared.total_nodes,
            start_time: shared.start_time,
            hard_deadline_ms: shared.hard_deadline_ms,
            node_limit: shared.node_limit,
            nodes: 0,
            flushed_nodes: 0,
            seldepth: 0,
            previous_move: [EMPTY_MOVE; MAX_PLY],
            coordinate: shared.threads > 1,
        }
    }

    #[inline]
    pub(crate) fn evaluate(&self) -> i32 {
        self.evaluator.evaluate(self.board)
    }

    /// Count a node, bumping seldepth and periodically flushing the local
    /// counter to the shared atomic.
    #[inline]
    pub(crate) fn count_node(&mut self, ply: usize) {
        self.nodes += 1;
        if ply as u32 + 1 > self.seldepth {
            self.seldepth = ply as u32 + 1;
        }
        if self.nodes - self.flushed_nodes >= NODE_FLUSH_INTERVAL {
            self.flush_nodes();
        }
    }

    pub(crate) fn flush_nodes(&mut self) {
        let pending = self.nodes - self.flushed_nodes;
        if pending > 0 {
            self.shared_nodes.fetch_add(pending, Ordering::Relaxed);
            self.flushed_nodes = self.nodes;
        }
    }

    /// Polled at every node entry. Raises the stop flag itself when the
    /// time or node budget is exhausted, so peers unwind too.
    #[inline]
    pub(crate) fn should_stop(&self) -> bool {
        if self.stop.load(Ordering::Relaxed) {
            return true;
        }
        if self.nodes & 1023 == 0 {
            if self.node_limit > 0 {
                let global =
                    self.shared_nodes.load(Ordering::Relaxed) + (self.nodes - self.flushed_nodes);
                if global >= self.node_limit {
                    self.stop.store(true, Ordering::Relaxed);
                    return true;
                }
            }
            if self.hard_deadline_ms > 0
                && self.start_time.elapsed().as_millis() as u64 >= self.hard_deadline_ms
            {
                self.stop.store(true, Ordering::Relaxed);
                return true;
            }
        }
        false
    }

    /// Root-level move loop. `moves` must already be legal; returns the
    /// best score and move under the given window.
    pub(crate) fn search_root(&mut self, depth: i32, mut alpha: i32, beta: i32) -> (i32, Move) {
        let original_alpha = alpha;
        let hash = self.board.hash();
        let tt_move = self.tt.best_move(hash).unwrap_or(EMPTY_MOVE);

        let legal = self.board.generate_legal();
        let mut scored = self.order_moves(&legal, tt_move, 0, EMPTY_MOVE);

        let mut best_score = -SCORE_INFINITE;
        let mut best_move = EMPTY_MOVE;

        let mut index = 0;
        while let Some(scored_move) = scored.pick_best(index) {
            index += 1;
            let m = scored_move.mv;

            let info = self.board.make_move(m);
            self.previous_move[0] = m;

            let score = if index == 1 {
                -self.alphabeta(depth - 1, -beta, -alpha, 1, true, EMPTY_MOVE)
            } else {
                let mut s = -self.alphabeta(depth - 1, -alpha - 1, -alpha, 1, true, EMPTY_MOVE);
                if s > alpha && s < beta {
                    s = -self.alphabeta(depth - 1, -beta, -alpha, 1, true, EMPTY_MOVE);
                }
                s
            };

            self.board.unmake_move(m, info);

            if self.should_stop() {
                break;
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

        if !best_move.is_null() && !self.should_stop() {
            let bound = if best_score >= beta {
                Bound::Lower
            } else if best_score > original_alpha {
                Bound::Exact
            } else {
                Bound::Upper
            };
            self.tt
                .store(hash, depth, score_to_tt(best_score, 0), bound, Some(best_move));
        }

        (best_score, best_move)
    }

    /// The main alpha-beta node. Scores are centipawns from the
    /// side-to-move's perspective; mate scores carry distance from root.
    #[allow(clippy::too_many_lines)]
    pub(crate) fn alphabeta(
        &mut self,
        mut depth: i32,
        mut alpha: i32,
        mut beta: i32,
        ply: usize,
        allow_null: bool,
        excluded: Move,
    ) -> i32 {
        self.count_node(ply);
        if self.should_stop() {
            return 0;
        }
        if ply >= MAX_PLY - 1 {
            return self.evaluate();
        }

        let is_pv = beta > alpha + 1;
        let excluded_active = !excluded.is_null();

        // Draws by repetition, fifty-move rule, or bare material.
        if self.board.is_draw() {
            return DRAW_SCORE;
        }

        let in_check = self.board.is_in_check(self.board.side_to_move());

        // Check extension, capped to keep the tree bounded.
        if self.params.check_extension && in_check && depth < self.params.check_extension_max_depth
        {
            depth += 1;
        }

        if depth <= 0 {
            return self.quiescence(alpha, beta, ply);
        }

        // Mate distance pruning: no line from here can beat an already
        // proven faster mate.
        alpha = alpha.max(mated_in(ply));
        beta = beta.min(mate_in(ply + 1));
        if alpha >= beta {
            return alpha;
        }

        // TT probe: move for ordering, score for cutoffs.
        let hash = self.board.hash();
        let mut tt_move = EMPTY_MOVE;
        let mut tt_score = 0;
        let mut tt_bound = Bound::Upper;
        let mut tt_depth = -1;
        let mut tt_hit = false;
        if !excluded_active {
            if let Some(entry) = self.tt.probe(hash) {
                tt_hit = true;
                tt_move = entry.mv;
                tt_score = score_from_tt(entry.score, ply);
                tt_bound = entry.bound;
                tt_depth = entry.depth;

                if entry.depth >= depth {
                    match entry.bound {
                        Bound::Exact => return tt_score,
                        Bound::Lower if tt_score >= beta => return beta,
                        Bound::Upper if tt_score <= alpha => return alpha,
                        _ => {}
                    }
                }
            }
        }

        let static_eval = if in_check {
            -SCORE_INFINITE
        } else {
            self.evaluate()
        };

        // Singular extension: if every alternative to the TT move fails
        // well below its score, the TT move is singular and earns a ply.
        let mut singular_extension = 0;
        if self.params.singular_extension
            && !excluded_active
            && depth >= 8
            && ply > 0
            && tt_hit
            && !tt_move.is_null()
            && tt_bound != Bound::Upper
            && tt_depth >= depth - 3
            && !is_mate_score(tt_score)
        {
            let singular_beta = tt_score - self.params.singular_margin * depth;
            let score = self.alphabeta(
                (depth - 1) / 2,
                singular_beta - 1,
                singular_beta,
                ply,
                false,
                tt_move,
            );
            if score < singular_beta {
                singular_extension = 1;
            }
        }

        // Node-level pruning, never at PV nodes or in check.
        if !is_pv && !in_check && !excluded_active {
            // Reverse futility: statically far enough above beta that the
            // node will fail high anyway.
            if self.params.reverse_futility
                && depth <= 8
                && static_eval - self.params.rfp_margin * depth >= beta
                && !is_mate_score(beta)
            {
                return beta;
            }

            // Null-move pruning: hand over the move; a still-failing-high
            // reduced search means this node is too good to matter.
            if self.params.null_move
                && allow_null
                && depth >= 3
                && self.board.has_non_pawn_material()
            {
                let r = self.params.null_reduction;
                let info = self.board.make_null_move();
                let score =
                    -self.alphabeta(depth - 1 - r, -beta, -beta + 1, ply + 1, false, EMPTY_MOVE);
                self.board.unmake_null_move(info);
                if self.should_stop() {
                    return 0;
                }
                if score >= beta && !is_mate_score(score) {
                    return beta;
                }
            }

            // Razoring: hopeless shallow nodes drop straight to quiescence.
            if self.params.razoring
                && depth <= 2
                && static_eval + self.params.razor_margins[depth as usize] <= alpha
            {
                return self.quiescence(alpha, beta, ply);
            }

            // ProbCut: a good capture that beats beta by a margin at
            // reduced depth, confirmed one ply deeper, cuts the node.
            if self.params.probcut && depth >= 5 && !is_mate_score(beta) {
                if let Some(score) = self.probcut(depth, beta, ply) {
                    return score;
                }
            }
        }

        // Internal iterative reduction: no TT move at depth means the
        // previous iterations never visited this node; search shallower.
        if tt_move.is_null() && depth >= self.params.iir_min_depth && !excluded_active {
            depth -= 1;
        }

        let mut moves = MoveList::new();
        self.board.generate_pseudo_legal(&mut moves);
        let prev_move = if ply > 0 {
            self.previous_move[ply - 1]
        } else {
            EMPTY_MOVE
        };
        let mut scored = self.order_moves(&moves, tt_move, ply, prev_move);

        let original_alpha = alpha;
        let mut best_score = -SCORE_INFINITE;
        let mut best_move = EMPTY_MOVE;
        let mut legal_moves = 0usize;
        let mut deferred: Vec<Move> = Vec::new();

        let mut index = 0;
        while let Some(scored_move) = scored.pick_best(index) {
            index += 1;
            let m = scored_move.mv;
            if m == excluded {
                continue;
            }

            // History pruning: shallow, late, quiet, and historically bad.
            if m.is_quiet()
                && !in_check
                && depth <= self.params.history_prune_max_depth
                && legal_moves > self.params.history_prune_min_index
                && self.tables.history.score(m) < self.params.history_prune_threshold
                && best_score > -SCORE_INFINITE
            {
                continue;
            }

            let us = self.board.side_to_move();
            let info = self.board.make_move(m);
            if self.board.is_in_check(us) {
                self.board.unmake_move(m, info);
                continue;
            }
            legal_moves += 1;

            let gives_check = self.board.is_in_check(self.board.side_to_move());

            // Futility: a quiet move from a statically hopeless position
            // will not raise alpha at shallow depth.
            if self.params.futility
                && m.is_quiet()
                && !in_check
                && !gives_check
                && depth <= 3
                && legal_moves > 1
                && static_eval + self.params.futility_margins[depth as usize] <= alpha
            {
                self.board.unmake_move(m, info);
                continue;
            }

            // ABDADA: if a peer already expands this child deep enough,
            // postpone it and pick up the result from the TT later.
            let mut reserved = false;
            if self.coordinate && depth >= self.params.abdada_min_depth && legal_moves > 1 {
                if self.tt.try_start_search(self.board.hash(), depth - 1) {
                    reserved = true;
                } else {
                    self.board.unmake_move(m, info);
                    deferred.push(m);
                    continue;
                }
            }

            self.previous_move[ply] = m;

            let mut extension = 0;
            if m == tt_move && singular_extension > 0 {
                extension = singular_extension;
            }
            let new_depth = depth - 1 + extension;

            let score = self.search_move_child(
                m,
                legal_moves,
                new_depth,
                depth,
                alpha,
                beta,
                ply,
                in_check,
                gives_check,
            );

            if reserved {
                self.tt.end_search(self.board.hash());
            }
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
                        self.on_beta_cutoff(m, ply, depth);
                        break;
                    }
                }
            }
        }

        // Second pass over ABDADA-deferred moves; by now a peer has
        // usually filled the TT for them.
        if alpha < beta {
            for m in deferred {
                if self.should_stop() {
                    return 0;
                }
                let info = self.board.make_move(m);
                let gives_check = self.board.is_in_check(self.board.side_to_move());
                self.previous_move[ply] = m;

                let score = self.search_move_child(
                    m,
                    legal_moves.max(2),
                    depth - 1,
                    depth,
                    alpha,
                    beta,
                    ply,
                    in_check,
                    gives_check,
                );

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
                            self.on_beta_cutoff(m, ply, depth);
                            break;
                        }
                    }
                }
            }
        }

        if legal_moves == 0 {
            if excluded_active {
                // Exclusion search with no alternatives: fail low.
                return alpha;
            }
            return if in_check {
                mated_in(ply)
            } else {
                DRAW_SCORE
            };
        }

        if !excluded_active && !self.should_stop() && !best_move.is_null() {
            let bound = if best_score >= beta {
                Bound::Lower
            } else if best_score > original_alpha {
                Bound::Exact
            } else {
                Bound::Upper
            };
            self.tt.store(
                hash,
                depth,
                score_to_tt(best_score, ply),
                bound,
                Some(best_move),
            );
        }

        best_score
    }

    /// PVS child search with late-move reductions. The first legal move
    /// gets the full window; later moves get a null window and re-search
    /// on improvement.
    #[allow(clippy::too_many_arguments)]
    fn search_move_child(
        &mut self,
        m: Move,
        move_number: usize,
        new_depth: i32,
        depth: i32,
        alpha: i32,
        beta: i32,
        ply: usize,
        in_check: bool,
        gives_check: bool,
    ) -> i32 {
        if move_number == 1 {
            return -self.alphabeta(new_depth, -beta, -alpha, ply + 1, true, EMPTY_MOVE);
        }

        // Late-move reduction for quiet, checkless moves past the fourth.
        let mut reduction = 0;
        if self.params.lmr && depth >= 3 && move_number > 4 && m.is_quiet() && !in_check && !gives_check
        {
            let poor_history = self.tables.history.score(m) < 0;
            reduction = depth / 4 + move_number as i32 / 8 + i32::from(poor_history);
            reduction = reduction.clamp(0, (new_depth - 1).max(0));
        }

        let mut score = -self.alphabeta(
            new_depth - reduction,
            -alpha - 1,
            -alpha,
            ply + 1,
            true,
            EMPTY_MOVE,
        );

        if reduction > 0 && score > alpha {
            score = -self.alphabeta(new_depth, -alpha - 1, -alpha, ply + 1, true, EMPTY_MOVE);
        }
        if score > alpha && score < beta {
            score = -self.alphabeta(new_depth, -beta, -alpha, ply + 1, true, EMPTY_MOVE);
        }
        score
    }

    /// Quiet cutoff bookkeeping: killers, history, counter-move.
    fn on_beta_cutoff(&mut self, m: Move, ply: usize, depth: i32) {
        if !m.is_quiet() {
            return;
        }
        self.tables.killers.update(ply, m);
        self.tables.history.update(m, depth);
        if ply > 0 {
            let prev = self.previous_move[ply - 1];
            if !prev.is_null() {
                self.tables
                    .counters
                    .set(prev.from().index(), prev.to().index(), m);
            }
        }
    }
}
