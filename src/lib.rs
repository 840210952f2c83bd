//! Chess engine core library.
//!
//! Provides the search and move-generation engine of a UCI-compatible
//! analysis program:
//! - Bitboard-based board representation with incremental Zobrist hashing
//! - Magic-bitboard sliding-piece attacks with runtime PEXT selection
//! - Parallel iterative-deepening alpha-beta search with quiescence
//! - Shared, lock-free-on-read transposition table
//!
//! The textual protocol layer is an external collaborator; it drives the
//! engine through the narrow API in [`engine`].
//!
//! # Quick Start
//!
//! ```
//! use sabre::engine::{Engine, SearchLimits};
//!
//! let mut engine = Engine::new(16);
//! engine
//!     .set_position_from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
//!     .unwrap();
//! engine.apply_uci_move("e2e4").unwrap();
//!
//! let report = engine.search(&SearchLimits::depth(4)).unwrap();
//! assert!(report.best_move.is_some());
//! ```
//!
//! # Building Positions
//!
//! ```
//! use sabre::board::Board;
//!
//! // From FEN notation
//! let board = Board::try_from_fen("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1").unwrap();
//! assert!(board.white_to_move());
//!
//! // The starting position
//! let mut board = Board::new();
//! assert_eq!(board.generate_legal().len(), 20);
//! ```
//!
//! # Features
//!
//! - `serde` - Enable serialization for `Piece`, `Color`, `Square`, and `Move`

// Enable pedantic lints with sensible domain-specific exceptions
#![warn(clippy::pedantic)]
// Bitboard hex literals are clearer without separators (bit patterns visible)
#![allow(clippy::unreadable_literal)]
// Chess engines have intentionally similar names (alpha/beta, from/to, etc.)
#![allow(clippy::similar_names)]
// Index casts are ubiquitous and safe in chess (board indices, square indices)
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
// Large arrays are needed for move lists and attack tables
#![allow(clippy::large_stack_arrays)]
// Module-level documentation is sufficient for this codebase
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod board;
pub mod engine;
pub mod eval;
pub mod search;
pub mod sync;
pub mod tt;
pub mod zobrist;
