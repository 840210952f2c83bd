//! Iterative deepening driver for a single worker.

use crate::board::{Board, Move, EMPTY_MOVE, MAX_PLY};
use crate::tt::TranspositionTable;

use super::alphabeta::SearchContext;
use super::constants::{is_mate_score, mated_in, DRAW_SCORE, SCORE_INFINITE};
use super::{SearchTables, SharedSearch};

/// One worker's full iterative-deepening run. Worker 0 reports first in
/// the common case; any worker that completes a new deepest iteration
/// publishes it.
pub(crate) fn iterative_worker(shared: &SharedSearch<'_>, root: &Board, worker_id: usize) {
    let mut board = root.clone();
    let mut tables = SearchTables::new();

    let root_moves = board.generate_legal();
    if root_moves.is_empty() {
        let score = if board.is_in_check(board.side_to_move()) {
            mated_in(0)
        } else {
            DRAW_SCORE
        };
        shared.report_iteration(0, score, EMPTY_MOVE, Vec::new());
        return;
    }

    let mut ctx = SearchContext::new(shared, &mut board, &mut tables);
    let mut previous_score = 0;
    let mut have_score = false;

    // Helpers start deeper so the TT fills ahead of worker 0.
    let start_depth = (1 + worker_id as u32 % 4).min(shared.max_depth.max(1));

    for depth in start_depth..=shared.max_depth {
        if ctx.should_stop() {
            break;
        }
        if depth > start_depth && shared.soft_deadline_passed() {
            break;
        }

        let Some((score, best_move)) = aspiration_search(
            &mut ctx,
            depth as i32,
            previous_score,
            have_score,
            worker_id,
        ) else {
            break;
        };

        previous_score = score;
        have_score = true;

        ctx.flush_nodes();
        shared.update_seldepth(ctx.seldepth);

        let pv = extract_pv(ctx.board, ctx.tt, best_move, depth as usize + 4);
        shared.report_iteration(depth, score, best_move, pv);

        ctx.tables.history.decay();

        // Nothing deeper to learn once a forced mate is on the board.
        if is_mate_score(score) && depth >= 4 {
            break;
        }
    }

    ctx.flush_nodes();
    shared.update_seldepth(ctx.seldepth);
}

/// Root search inside an aspiration window, widening on failure.
/// Returns `None` when the iteration was cut short by the stop flag.
fn aspiration_search(
    ctx: &mut SearchContext<'_>,
    depth: i32,
    previous_score: i32,
    have_score: bool,
    worker_id: usize,
) -> Option<(i32, Move)> {
    let use_window = ctx.params.aspiration && depth >= 4 && have_score;
    let (mut alpha, mut beta) = if use_window {
        let delta = ctx.params.aspiration_delta;
        let mut alpha = previous_score.saturating_sub(delta).max(-SCORE_INFINITE);
        let mut beta = previous_score.saturating_add(delta).min(SCORE_INFINITE);
        // LazySMP workers probe biased windows, alternating side by
        // parity, so they disagree productively about the same tree.
        if worker_id > 0 {
            let offset = ctx.params.smp_aspiration_delta * worker_id as i32;
            if worker_id % 2 == 1 {
                alpha = alpha.saturating_sub(offset).max(-SCORE_INFINITE);
            } else {
                beta = beta.saturating_add(offset).min(SCORE_INFINITE);
            }
        }
        (alpha, beta)
    } else {
        (-SCORE_INFINITE, SCORE_INFINITE)
    };

    loop {
        let (score, best_move) = ctx.search_root(depth, alpha, beta);
        if ctx.should_stop() {
            return None;
        }

        // Mate scores are exact enough; stop re-bracketing.
        if is_mate_score(score) && !best_move.is_null() {
            return Some((score, best_move));
        }

        let window = (beta - alpha).max(1);
        if score <= alpha {
            alpha = alpha.saturating_sub(2 * window).max(-SCORE_INFINITE);
        } else if score >= beta {
            beta = beta.saturating_add(2 * window).min(SCORE_INFINITE);
        } else {
            debug_assert!(!best_move.is_null());
            return Some((score, best_move));
        }
    }
}

/// Reconstruct the principal variation by walking the TT best-move chain
/// from the root, stopping at a null move, an illegal move, or a
/// repetition of a visited key.
pub(crate) fn extract_pv(
    board: &mut Board,
    tt: &TranspositionTable,
    first_move: Move,
    max_len: usize,
) -> Vec<Move> {
    let max_len = max_len.min(MAX_PLY);
    let mut pv = Vec::with_capacity(max_len);
    let mut seen_hashes = [0u64; MAX_PLY];
    let mut unwound = Vec::with_capacity(max_len);

    for step in 0..max_len {
        let hash = board.hash();
        if seen_hashes[..step].contains(&hash) {
            break;
        }
        seen_hashes[step] = hash;

        let mv = if step == 0 {
            first_move
        } else {
            match tt.best_move(hash) {
                Some(mv) => mv,
                None => break,
            }
        };
        if mv.is_null() || !board.is_legal_move(mv) {
            break;
        }

        pv.push(mv);
        let info = board.make_move(mv);
        unwound.push((mv, info));
    }

    for (mv, info) in unwound.into_iter().rev() {
        board.unmake_move(mv, info);
    }

    pv
}
