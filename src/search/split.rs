//! Work-stealing parallel search.
//!
//! The master runs iterative deepening; at each depth past the split
//! thresholds it creates a split point at the root: a shared queue of
//! remaining moves plus shared `(best_score, best_move, alpha)` state
//! with an atomic cutoff flag. Workers pull moves, search them with the
//! current alpha as the null-window bound, and publish results. A score
//! at or above beta raises the cutoff flag and drains the queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::board::{Board, Move, EMPTY_MOVE};
use crate::tt::Bound;

use super::alphabeta::SearchContext;
use super::constants::{is_mate_score, mated_in, score_to_tt, DRAW_SCORE, SCORE_INFINITE};
use super::iterative::extract_pv;
use super::{SearchTables, SharedSearch};

const SEARCH_STACK_SIZE: usize = 32 * 1024 * 1024;

/// Master wake-up period while waiting for helpers, to re-check the stop
/// flag.
const COMPLETION_POLL: Duration = Duration::from_millis(10);

struct SplitState {
    alpha: i32,
    best_score: i32,
    best_move: Move,
}

struct SplitPoint {
    /// Remaining moves; drained back-to-front so the best-ordered move
    /// is pulled first.
    queue: Mutex<Vec<Move>>,
    state: Mutex<SplitState>,
    cutoff: AtomicBool,
    /// Helpers still inside the split.
    remaining: Mutex<usize>,
    done: Condvar,
    depth: i32,
    beta: i32,
}

pub(crate) fn run_work_stealing(shared: &SharedSearch<'_>, root: &Board) {
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

    let mut previous_score: i32 = 0;
    let mut have_score = false;

    for depth in 1..=shared.max_depth {
        if shared.stop.load(Ordering::Relaxed) {
            break;
        }
        if depth > 1 && shared.soft_deadline_passed() {
            break;
        }

        let d = depth as i32;
        let split = d >= shared.params.split_min_depth
            && root_moves.len() >= shared.params.split_min_moves;

        let use_window = shared.params.aspiration && depth >= 4 && have_score;
        let (mut alpha, mut beta) = if use_window {
            let delta = shared.params.aspiration_delta;
            (
                previous_score.saturating_sub(delta).max(-SCORE_INFINITE),
                previous_score.saturating_add(delta).min(SCORE_INFINITE),
            )
        } else {
            (-SCORE_INFINITE, SCORE_INFINITE)
        };

        let iteration = loop {
            let (score, best_move) = if split {
                split_root(shared, &board, d, alpha, beta)
            } else {
                let mut ctx = SearchContext::new(shared, &mut board, &mut tables);
                let result = ctx.search_root(d, alpha, beta);
                ctx.flush_nodes();
                shared.update_seldepth(ctx.seldepth);
                result
            };

            if shared.stop.load(Ordering::Relaxed) {
                break None;
            }
            if is_mate_score(score) && !best_move.is_null() {
                break Some((score, best_move));
            }

            let window = (beta - alpha).max(1);
            if score <= alpha {
                alpha = alpha.saturating_sub(2 * window).max(-SCORE_INFINITE);
            } else if score >= beta {
                beta = beta.saturating_add(2 * window).min(SCORE_INFINITE);
            } else {
                break Some((score, best_move));
            }
        };

        let Some((score, best_move)) = iteration else {
            break;
        };
        previous_score = score;
        have_score = true;

        let pv = extract_pv(&mut board, shared.tt, best_move, depth as usize + 4);
        shared.report_iteration(depth, score, best_move, pv);

        if is_mate_score(score) && depth >= 4 {
            break;
        }
    }
}

/// Search one root iteration through a split point.
fn split_root(
    shared: &SharedSearch<'_>,
    root: &Board,
    depth: i32,
    alpha: i32,
    beta: i32,
) -> (i32, Move) {
    let mut board = root.clone();
    let mut tables = SearchTables::new();
    let mut ctx = SearchContext::new(shared, &mut board, &mut tables);

    let hash = ctx.board.hash();
    let tt_move = ctx.tt.best_move(hash).unwrap_or(EMPTY_MOVE);
    let legal = ctx.board.generate_legal();
    let mut scored = ctx.order_moves(&legal, tt_move, 0, EMPTY_MOVE);

    let mut ordered = Vec::with_capacity(legal.len());
    let mut index = 0;
    while let Some(scored_move) = scored.pick_best(index) {
        index += 1;
        ordered.push(scored_move.mv);
    }

    // The master establishes alpha with a full-window search of the best
    // candidate before the queue opens; helpers then bound against it.
    let first = ordered[0];
    let info = ctx.board.make_move(first);
    ctx.previous_move[0] = first;
    let first_score = -ctx.alphabeta(depth - 1, -beta, -alpha, 1, true, EMPTY_MOVE);
    ctx.board.unmake_move(first, info);
    ctx.flush_nodes();
    shared.update_seldepth(ctx.seldepth);

    if first_score >= beta || shared.stop.load(Ordering::Relaxed) || ordered.len() == 1 {
        store_root(shared, hash, depth, first_score, alpha, beta, first);
        return (first_score, first);
    }

    let helpers = shared.threads - 1;
    let split_point = SplitPoint {
        queue: Mutex::new(ordered[1..].iter().rev().copied().collect()),
        state: Mutex::new(SplitState {
            alpha: alpha.max(first_score),
            best_score: first_score,
            best_move: first,
        }),
        cutoff: AtomicBool::new(false),
        remaining: Mutex::new(helpers),
        done: Condvar::new(),
        depth,
        beta,
    };

    thread::scope(|scope| {
        for helper_id in 0..helpers {
            let sp = &split_point;
            let builder = thread::Builder::new()
                .name(format!("split-{helper_id}"))
                .stack_size(SEARCH_STACK_SIZE);
            builder
                .spawn_scoped(scope, move || {
                    let mut helper_board = root.clone();
                    let mut helper_tables = SearchTables::new();
                    let mut helper_ctx =
                        SearchContext::new(shared, &mut helper_board, &mut helper_tables);
                    drain_split(sp, &mut helper_ctx);
                    helper_ctx.flush_nodes();
                    shared.update_seldepth(helper_ctx.seldepth);

                    let mut remaining = sp.remaining.lock();
                    *remaining -= 1;
                    sp.done.notify_all();
                })
                .expect("failed to spawn split worker");
        }

        // The master pulls from its own split too.
        drain_split(&split_point, &mut ctx);
        ctx.flush_nodes();
        shared.update_seldepth(ctx.seldepth);

        // Completion event with periodic wake-ups to re-check the stop
        // flag; a stop turns into a cutoff so helpers drain immediately.
        let mut remaining = split_point.remaining.lock();
        while *remaining > 0 {
            split_point.done.wait_for(&mut remaining, COMPLETION_POLL);
            if shared.stop.load(Ordering::Relaxed) {
                split_point.cutoff.store(true, Ordering::Release);
            }
        }
    });

    let final_state = split_point.state.into_inner();
    store_root(
        shared,
        hash,
        depth,
        final_state.best_score,
        alpha,
        beta,
        final_state.best_move,
    );
    (final_state.best_score, final_state.best_move)
}

/// Pull moves off the split queue and search them against the shared
/// window until the queue empties, a cutoff lands, or the search stops.
fn drain_split(sp: &SplitPoint, ctx: &mut SearchContext<'_>) {
    loop {
        if ctx.should_stop() || sp.cutoff.load(Ordering::Acquire) {
            break;
        }
        let Some(m) = sp.queue.lock().pop() else {
            break;
        };

        let alpha_now = sp.state.lock().alpha;
        if alpha_now >= sp.beta {
            sp.cutoff.store(true, Ordering::Release);
            break;
        }

        let info = ctx.board.make_move(m);
        ctx.previous_move[0] = m;
        let mut score =
            -ctx.alphabeta(sp.depth - 1, -alpha_now - 1, -alpha_now, 1, true, EMPTY_MOVE);
        if score > alpha_now
            && score < sp.beta
            && !sp.cutoff.load(Ordering::Relaxed)
            && !ctx.should_stop()
        {
            score = -ctx.alphabeta(sp.depth - 1, -sp.beta, -alpha_now, 1, true, EMPTY_MOVE);
        }
        ctx.board.unmake_move(m, info);

        if ctx.should_stop() {
            break;
        }

        // Publish: a raised alpha narrows every later null window; a
        // score at or above beta stops the whole split.
        let mut state = sp.state.lock();
        if score > state.best_score {
            state.best_score = score;
            state.best_move = m;
            if score > state.alpha {
                state.alpha = score;
            }
            if score >= sp.beta {
                sp.cutoff.store(true, Ordering::Release);
            }
        }
    }
}

fn store_root(
    shared: &SharedSearch<'_>,
    hash: u64,
    depth: i32,
    score: i32,
    alpha: i32,
    beta: i32,
    best_move: Move,
) {
    if best_move.is_null() || shared.stop.load(Ordering::Relaxed) {
        return;
    }
    let bound = if score >= beta {
        Bound::Lower
    } else if score > alpha {
        Bound::Exact
    } else {
        Bound::Upper
    };
    shared
        .tt
        .store(hash, depth, score_to_tt(score, 0), bound, Some(best_move));
}
