//! The narrow engine API consumed by the textual-protocol collaborator.
//!
//! The protocol layer owns stdin/stdout; this module owns positions,
//! options, the transposition table, and search orchestration.

mod options;

pub use options::EngineOptions;

use std::fmt;
use std::sync::Arc;

use crate::board::{Board, FenError, Move, MoveParseError, PextMode};
use crate::eval::{Evaluator, MaterialEvaluator};
use crate::search::{
    run_search, ParallelMode, SearchInfoCallback, SearchOutcome, SearchParams, SearchSpec,
};
use crate::sync::StopFlag;
use crate::tt::TranspositionTable;

pub use crate::search::SearchLimits;

/// Error kinds surfaced to the protocol layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// FEN rejected; the previous position is untouched.
    MalformedFen(FenError),
    /// An externally supplied move is not legal in the current position.
    IllegalMove(MoveParseError),
    /// Option name unrecognized or value outside its declared range; the
    /// option is unchanged.
    InvalidOption { name: String, value: String },
    /// TT resize could not allocate; the previous table is retained.
    ResourceExhausted,
    /// Audit-mode invariant failure (Zobrist mismatch or corrupted
    /// position state).
    InternalInvariantViolation(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::MalformedFen(e) => write!(f, "malformed FEN: {e}"),
            EngineError::IllegalMove(e) => write!(f, "illegal move: {e}"),
            EngineError::InvalidOption { name, value } => {
                write!(f, "invalid option '{name}' = '{value}'")
            }
            EngineError::ResourceExhausted => write!(f, "resource exhausted"),
            EngineError::InternalInvariantViolation(what) => {
                write!(f, "internal invariant violation: {what}")
            }
        }
    }
}

impl std::error::Error for EngineError {}

impl From<FenError> for EngineError {
    fn from(e: FenError) -> Self {
        EngineError::MalformedFen(e)
    }
}

impl From<MoveParseError> for EngineError {
    fn from(e: MoveParseError) -> Self {
        EngineError::IllegalMove(e)
    }
}

/// Engine facade: position, options, TT, and search orchestration.
pub struct Engine {
    board: Board,
    tt: Arc<TranspositionTable>,
    params: SearchParams,
    options: EngineOptions,
    stop: StopFlag,
    evaluator: Arc<dyn Evaluator>,
    info_callback: Option<SearchInfoCallback>,
}

impl Engine {
    /// Create an engine with a `hash_mb`-sized transposition table.
    #[must_use]
    pub fn new(hash_mb: usize) -> Self {
        let options = EngineOptions {
            hash_mb,
            ..EngineOptions::default()
        };
        crate::board::set_indexing_mode(options.pext_mode);
        Engine {
            board: Board::new(),
            tt: Arc::new(TranspositionTable::new(hash_mb)),
            params: SearchParams::default(),
            options,
            stop: StopFlag::new(),
            evaluator: Arc::new(MaterialEvaluator),
            info_callback: None,
        }
    }

    /// Replace the evaluator (neural networks and tablebase adapters
    /// satisfy the same capability).
    pub fn set_evaluator(&mut self, evaluator: Arc<dyn Evaluator>) {
        self.evaluator = evaluator;
    }

    /// Register the per-iteration info consumer.
    pub fn set_info_callback(&mut self, callback: SearchInfoCallback) {
        self.info_callback = Some(callback);
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[must_use]
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    #[must_use]
    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    /// Parse a FEN; on failure the previous position is preserved.
    pub fn set_position_from_fen(&mut self, fen: &str) -> Result<(), EngineError> {
        let board = Board::try_from_fen(fen)?;
        self.board = board;
        Ok(())
    }

    /// Apply a UCI long-algebraic move (`e2e4`, `e1g1`, `e7e8q`).
    /// Rejects moves that are not legal in the current position.
    pub fn apply_uci_move(&mut self, uci: &str) -> Result<Move, EngineError> {
        Ok(self.board.make_move_uci(uci)?)
    }

    /// Run a search under `limits` and return the deepest fully-completed
    /// iteration's result. Exceeding a budget is normal termination, not
    /// an error.
    pub fn search(&mut self, limits: &SearchLimits) -> Result<SearchOutcome, EngineError> {
        self.stop.reset();

        let mode = if self.options.threads > 1 {
            self.options.parallel_mode
        } else {
            ParallelMode::WorkStealing
        };

        let spec = SearchSpec {
            board: &self.board,
            tt: &self.tt,
            evaluator: &*self.evaluator,
            params: &self.params,
            limits,
            stop: self.stop.as_atomic(),
            threads: self.options.threads,
            mode,
            info_callback: self.info_callback.clone(),
        };
        let outcome = run_search(&spec);

        self.audit_position()?;
        Ok(outcome)
    }

    /// Raise the stop flag: every in-flight search frame returns within a
    /// bounded number of nodes.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Clonable handle for stopping a search from another thread.
    #[must_use]
    pub fn stop_handle(&self) -> StopFlag {
        self.stop.clone()
    }

    /// Drop every TT entry.
    pub fn clear_hash(&self) {
        self.tt.clear();
    }

    /// Reallocate the TT. On failure the previous table is retained.
    pub fn resize_hash(&mut self, size_mb: usize) -> Result<(), EngineError> {
        match TranspositionTable::try_new(size_mb) {
            Ok(tt) => {
                self.tt = Arc::new(tt);
                self.options.hash_mb = size_mb;
                Ok(())
            }
            Err(_) => Err(EngineError::ResourceExhausted),
        }
    }

    /// TT occupancy estimate for protocol reporting.
    #[must_use]
    pub fn hashfull_per_mille(&self) -> u32 {
        self.tt.hashfull_per_mille()
    }

    /// TT probe/store counters for tuning.
    #[must_use]
    pub fn tt_stats(&self) -> crate::tt::TtStatsSnapshot {
        self.tt.stats()
    }

    /// Verify the position's structural invariants. Cheap enough to run
    /// after every search in audit builds.
    fn audit_position(&self) -> Result<(), EngineError> {
        #[cfg(debug_assertions)]
        {
            if !self.board.check_invariants() {
                return Err(EngineError::InternalInvariantViolation(
                    "position state diverged from incremental bookkeeping".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Apply a recognized option; unknown names and out-of-range values
    /// leave everything unchanged.
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<(), EngineError> {
        options::apply(self, name, value)
    }

    pub(crate) fn set_pext_mode(&mut self, mode: PextMode) {
        self.options.pext_mode = mode;
        crate::board::set_indexing_mode(mode);
    }

    pub(crate) fn params_mut(&mut self) -> &mut SearchParams {
        &mut self.params
    }

    pub(crate) fn options_mut(&mut self) -> &mut EngineOptions {
        &mut self.options
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new(EngineOptions::default().hash_mb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_position_preserves_previous_on_error() {
        let mut engine = Engine::new(1);
        engine.apply_uci_move("e2e4").unwrap();
        let before = engine.board().to_fen();

        assert!(engine.set_position_from_fen("not a fen").is_err());
        assert_eq!(engine.board().to_fen(), before);
    }

    #[test]
    fn test_apply_illegal_move_rejected() {
        let mut engine = Engine::new(1);
        assert!(matches!(
            engine.apply_uci_move("e2e5"),
            Err(EngineError::IllegalMove(_))
        ));
        // Board unchanged: the legal move still works.
        assert!(engine.apply_uci_move("e2e4").is_ok());
    }

    #[test]
    fn test_search_returns_a_move() {
        let mut engine = Engine::new(1);
        let outcome = engine.search(&SearchLimits::depth(3)).unwrap();
        assert!(outcome.best_move.is_some());
        assert!(outcome.depth >= 1);
        assert!(outcome.nodes > 0);
    }

    #[test]
    fn test_resize_and_clear_hash() {
        let mut engine = Engine::new(1);
        engine.search(&SearchLimits::depth(2)).unwrap();
        engine.resize_hash(2).unwrap();
        engine.clear_hash();
        assert_eq!(engine.options().hash_mb, 2);
    }
}
