//! Search module: alpha-beta with iterative deepening and two parallel
//! drivers.
//!
//! Features:
//! - Iterative deepening with aspiration windows
//! - PVS alpha-beta with null move, razoring, ProbCut, futility, LMR,
//!   history pruning, check and singular extensions
//! - Quiescence search with SEE filtering and delta pruning
//! - Move ordering (TT move, counter-move, SEE-partitioned captures,
//!   killers, history)
//! - Lazy SMP and work-stealing parallel drivers over a shared TT with
//!   ABDADA duplication control

mod alphabeta;
mod constants;
mod iterative;
mod ordering;
mod params;
mod pruning;
mod quiescence;
mod smp;
mod split;


pub use constants::{MATE_THRESHOLD, MATE_VALUE};
pub use params::{ParallelMode, SearchParams};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::board::{Board, Move, EMPTY_MOVE, MAX_PLY};
use crate::eval::Evaluator;
use crate::tt::TranspositionTable;

// ============================================================================
// Per-thread ordering tables
// ============================================================================

/// Two killer slots per ply, quiet moves only.
pub struct KillerTable {
    slots: [[Move; 2]; MAX_PLY],
}

impl KillerTable {
    #[must_use]
    pub fn new() -> Self {
        KillerTable {
            slots: [[EMPTY_MOVE; 2]; MAX_PLY],
        }
    }

    #[must_use]
    pub fn primary(&self, ply: usize) -> Move {
        self.slots.get(ply).map_or(EMPTY_MOVE, |row| row[0])
    }

    #[must_use]
    pub fn secondary(&self, ply: usize) -> Move {
        self.slots.get(ply).map_or(EMPTY_MOVE, |row| row[1])
    }

    /// Rotate `mv` into the primary slot.
    pub fn update(&mut self, ply: usize, mv: Move) {
        if ply >= MAX_PLY {
            return;
        }
        if self.slots[ply][0] != mv {
            self.slots[ply][1] = self.slots[ply][0];
            self.slots[ply][0] = mv;
        }
    }

    pub fn reset(&mut self) {
        self.slots = [[EMPTY_MOVE; 2]; MAX_PLY];
    }
}

impl Default for KillerTable {
    fn default() -> Self {
        KillerTable::new()
    }
}

/// Butterfly history, indexed `[from][to]`.
pub struct HistoryTable {
    entries: [i32; 4096],
}

impl HistoryTable {
    #[must_use]
    pub fn new() -> Self {
        HistoryTable { entries: [0; 4096] }
    }

    #[inline]
    #[must_use]
    pub fn score(&self, mv: Move) -> i32 {
        self.entries[mv.from().index() * 64 + mv.to().index()]
    }

    /// Reward a cutoff move with depth squared, clamped.
    pub fn update(&mut self, mv: Move, depth: i32) {
        let entry = &mut self.entries[mv.from().index() * 64 + mv.to().index()];
        *entry = (*entry + depth * depth).clamp(-constants::HISTORY_MAX, constants::HISTORY_MAX);
    }

    /// Halve every entry; called between iterations.
    pub fn decay(&mut self) {
        for entry in &mut self.entries {
            *entry >>= 1;
        }
    }

    pub fn reset(&mut self) {
        self.entries = [0; 4096];
    }
}

impl Default for HistoryTable {
    fn default() -> Self {
        HistoryTable::new()
    }
}

/// Best reply to the opponent's previous move, indexed `[from][to]`.
pub struct CounterMoveTable {
    entries: [[Move; 64]; 64],
}

impl CounterMoveTable {
    #[must_use]
    pub fn new() -> Self {
        CounterMoveTable {
            entries: [[EMPTY_MOVE; 64]; 64],
        }
    }

    #[must_use]
    pub fn get(&self, from: usize, to: usize) -> Move {
        self.entries[from][to]
    }

    pub fn set(&mut self, from: usize, to: usize, mv: Move) {
        self.entries[from][to] = mv;
    }

    pub fn reset(&mut self) {
        self.entries = [[EMPTY_MOVE; 64]; 64];
    }
}

impl Default for CounterMoveTable {
    fn default() -> Self {
        CounterMoveTable::new()
    }
}

/// Per-worker ordering tables. Never shared: each worker owns its own and
/// cutoff updates cannot corrupt a peer's lookups.
pub struct SearchTables {
    pub killers: KillerTable,
    pub history: HistoryTable,
    pub counters: CounterMoveTable,
}

impl SearchTables {
    #[must_use]
    pub fn new() -> Self {
        SearchTables {
            killers: KillerTable::new(),
            history: HistoryTable::new(),
            counters: CounterMoveTable::new(),
        }
    }
}

impl Default for SearchTables {
    fn default() -> Self {
        SearchTables::new()
    }
}

// ============================================================================
// Limits, info records, outcome
// ============================================================================

/// External search limits, as handed over by the protocol collaborator.
#[derive(Clone, Debug, Default)]
pub struct SearchLimits {
    pub max_depth: Option<u32>,
    pub time_ms: Option<u64>,
    pub node_limit: Option<u64>,
    pub infinite: bool,
    pub ponder: bool,
}

impl SearchLimits {
    #[must_use]
    pub fn depth(max_depth: u32) -> Self {
        SearchLimits {
            max_depth: Some(max_depth),
            ..SearchLimits::default()
        }
    }

    #[must_use]
    pub fn time(time_ms: u64) -> Self {
        SearchLimits {
            time_ms: Some(time_ms),
            ..SearchLimits::default()
        }
    }

    #[must_use]
    pub fn nodes(node_limit: u64) -> Self {
        SearchLimits {
            node_limit: Some(node_limit),
            ..SearchLimits::default()
        }
    }
}

/// Structured record for one completed iteration, consumed by the
/// protocol layer.
#[derive(Clone, Debug)]
pub struct SearchIterationInfo {
    pub depth: u32,
    pub seldepth: u32,
    pub time_ms: u64,
    pub nodes: u64,
    pub nps: u64,
    pub hashfull_per_mille: u32,
    /// Centipawn score; mate scores are also mirrored into `mate_in`.
    pub score_cp: i32,
    /// Moves until mate (positive: we mate, negative: we get mated).
    pub mate_in: Option<i32>,
    pub pv: Vec<Move>,
}

pub type SearchInfoCallback = Arc<dyn Fn(&SearchIterationInfo) + Send + Sync>;

/// Final search result.
#[derive(Clone, Debug)]
pub struct SearchOutcome {
    pub best_move: Option<Move>,
    pub ponder_move: Option<Move>,
    pub score: i32,
    pub mate_in: Option<i32>,
    pub depth: u32,
    pub seldepth: u32,
    pub nodes: u64,
    pub time_ms: u64,
}

/// Moves-to-mate from a mate score, if the score is one.
#[must_use]
pub fn mate_distance(score: i32) -> Option<i32> {
    if score >= MATE_THRESHOLD {
        Some((MATE_VALUE - score + 1) / 2)
    } else if score <= -MATE_THRESHOLD {
        Some(-((MATE_VALUE + score + 1) / 2))
    } else {
        None
    }
}

// ============================================================================
// Shared driver state
// ============================================================================

/// Deepest completed iteration, shared by all workers under a lock.
pub(crate) struct BestResult {
    pub depth: u32,
    pub score: i32,
    pub best_move: Move,
    pub pv: Vec<Move>,
}

/// Everything a worker needs that is shared across the search.
pub(crate) struct SharedSearch<'a> {
    pub tt: &'a TranspositionTable,
    pub evaluator: &'a dyn Evaluator,
    pub params: &'a SearchParams,
    pub stop: &'a AtomicBool,
    pub total_nodes: AtomicU64,
    pub max_seldepth: AtomicU64,
    pub best: Mutex<BestResult>,
    pub start_time: Instant,
    /// 0 = no deadline; the stop flag is raised when exceeded.
    pub hard_deadline_ms: u64,
    /// Consulted between iterations only.
    pub soft_deadline_ms: u64,
    pub node_limit: u64,
    pub max_depth: u32,
    pub threads: usize,
    pub info_callback: Option<SearchInfoCallback>,
}

impl SharedSearch<'_> {
    /// Record a completed iteration; the first worker to finish a depth
    /// wins and emits the info record.
    pub(crate) fn report_iteration(&self, depth: u32, score: i32, best_move: Move, pv: Vec<Move>) {
        let mut best = self.best.lock();
        if depth <= best.depth && !best.best_move.is_null() {
            return;
        }
        best.depth = depth;
        best.score = score;
        best.best_move = best_move;
        best.pv = pv.clone();
        drop(best);

        if let Some(callback) = &self.info_callback {
            let time_ms = self.start_time.elapsed().as_millis() as u64;
            let nodes = self.total_nodes.load(Ordering::Relaxed);
            let info = SearchIterationInfo {
                depth,
                seldepth: self.max_seldepth.load(Ordering::Relaxed) as u32,
                time_ms,
                nodes,
                nps: if time_ms > 0 { nodes * 1000 / time_ms } else { 0 },
                hashfull_per_mille: self.tt.hashfull_per_mille(),
                score_cp: score,
                mate_in: mate_distance(score),
                pv,
            };
            callback(&info);
        }
    }

    pub(crate) fn update_seldepth(&self, seldepth: u32) {
        self.max_seldepth
            .fetch_max(u64::from(seldepth), Ordering::Relaxed);
    }

    pub(crate) fn soft_deadline_passed(&self) -> bool {
        self.soft_deadline_ms > 0
            && self.start_time.elapsed().as_millis() as u64 >= self.soft_deadline_ms
    }
}

// ============================================================================
// Driver entry
// ============================================================================

/// Borrowed inputs for one search.
pub struct SearchSpec<'a> {
    pub board: &'a Board,
    pub tt: &'a TranspositionTable,
    pub evaluator: &'a dyn Evaluator,
    pub params: &'a SearchParams,
    pub limits: &'a SearchLimits,
    pub stop: &'a AtomicBool,
    pub threads: usize,
    pub mode: ParallelMode,
    pub info_callback: Option<SearchInfoCallback>,
}

/// Run a full search and return the deepest fully-completed iteration's
/// result. Timeouts are normal termination, never an error.
#[must_use]
pub fn run_search(spec: &SearchSpec) -> SearchOutcome {
    let start_time = Instant::now();
    spec.tt.new_search();
    spec.tt.set_aging_depth_threshold(spec.params.tt_aging_depth);

    let (soft, hard) = if spec.limits.infinite || spec.limits.ponder {
        (0, 0)
    } else {
        match spec.limits.time_ms {
            Some(ms) => (ms * 6 / 10, ms),
            None => (0, 0),
        }
    };

    let shared = SharedSearch {
        tt: spec.tt,
        evaluator: spec.evaluator,
        params: spec.params,
        stop: spec.stop,
        total_nodes: AtomicU64::new(0),
        max_seldepth: AtomicU64::new(0),
        best: Mutex::new(BestResult {
            depth: 0,
            score: 0,
            best_move: EMPTY_MOVE,
            pv: Vec::new(),
        }),
        start_time,
        hard_deadline_ms: hard,
        soft_deadline_ms: soft,
        node_limit: spec.limits.node_limit.unwrap_or(0),
        max_depth: spec.limits.max_depth.unwrap_or(MAX_PLY as u32 - 1),
        threads: spec.threads.max(1),
        info_callback: spec.info_callback.clone(),
    };

    if spec.threads <= 1 {
        iterative::iterative_worker(&shared, spec.board, 0);
    } else {
        match spec.mode {
            ParallelMode::LazySmp => smp::run_lazy_smp(&shared, spec.board),
            ParallelMode::WorkStealing => split::run_work_stealing(&shared, spec.board),
        }
    }

    // Every worker has returned; make sure nothing keeps searching.
    spec.stop.store(true, Ordering::Relaxed);

    let best = shared.best.lock();
    let best_move = if best.best_move.is_null() {
        None
    } else {
        Some(best.best_move)
    };
    let ponder_move = best_move.and_then(|mv| ponder_from_tt(spec.board, spec.tt, mv));

    SearchOutcome {
        best_move,
        ponder_move,
        score: best.score,
        mate_in: mate_distance(best.score),
        depth: best.depth,
        seldepth: shared.max_seldepth.load(Ordering::Relaxed) as u32,
        nodes: shared.total_nodes.load(Ordering::Relaxed),
        time_ms: start_time.elapsed().as_millis() as u64,
    }
}

/// Expected reply for pondering: play the best move and probe the TT,
/// keeping the suggestion only if it is legal.
fn ponder_from_tt(board: &Board, tt: &TranspositionTable, best_move: Move) -> Option<Move> {
    let mut board = board.clone();
    board.make_move(best_move);
    tt.best_move(board.hash()).filter(|&mv| board.is_legal_move(mv))
}
