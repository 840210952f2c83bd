//! Lazy SMP: independent workers over a shared transposition table.
//!
//! Workers differ by staggered starting depth and biased aspiration
//! windows; the TT is the only coordination channel. Separate
//! killer/history tables per worker avoid correlated pruning failures.

use std::thread;

use crate::board::Board;

use super::iterative::iterative_worker;
use super::SharedSearch;

/// Stack size for search threads (deep recursion plus move buffers).
const SEARCH_STACK_SIZE: usize = 32 * 1024 * 1024;

pub(crate) fn run_lazy_smp(shared: &SharedSearch<'_>, root: &Board) {
    let threads = shared.threads;

    thread::scope(|scope| {
        for worker_id in 0..threads {
            let builder = thread::Builder::new()
                .name(format!("search-{worker_id}"))
                .stack_size(SEARCH_STACK_SIZE);
            builder
                .spawn_scoped(scope, move || {
                    iterative_worker(shared, root, worker_id);
                })
                .expect("failed to spawn search worker");
        }
    });
}
