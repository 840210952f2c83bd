//! Zobrist hashing keys.
//!
//! All keys are drawn from a fixed-seed PRNG, so two processes (or two
//! implementations sharing the seed) produce bitwise-identical keys for
//! the same position sequence.

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::board::{Color, Piece, Square};

/// Seed for the key tables. Changing it invalidates every stored hash.
const ZOBRIST_SEED: u64 = 0x9E3779B97F4A7C15;

/// The full set of Zobrist keys for one process.
pub struct ZobristKeys {
    /// One key per (color, piece, square).
    pub piece: [[[u64; 64]; 6]; 2],
    /// One key per 4-bit castling-rights set.
    pub castling: [u64; 16],
    /// One key per en-passant file.
    pub ep_file: [u64; 8],
    /// Xored into the hash iff Black is to move.
    pub side: u64,
}

impl ZobristKeys {
    fn generate(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut piece = [[[0u64; 64]; 6]; 2];
        for color in &mut piece {
            for piece_keys in color.iter_mut() {
                for key in piece_keys.iter_mut() {
                    *key = rng.gen();
                }
            }
        }
        let mut castling = [0u64; 16];
        for key in &mut castling {
            *key = rng.gen();
        }
        let mut ep_file = [0u64; 8];
        for key in &mut ep_file {
            *key = rng.gen();
        }
        ZobristKeys {
            piece,
            castling,
            ep_file,
            side: rng.gen(),
        }
    }

    /// Key for a piece of `color` on `sq`.
    #[inline]
    #[must_use]
    pub fn piece_key(&self, color: Color, piece: Piece, sq: Square) -> u64 {
        self.piece[color.index()][piece.index()][sq.index()]
    }
}

/// Process-wide key tables, constructed once on first use.
pub static ZOBRIST: Lazy<ZobristKeys> = Lazy::new(|| ZobristKeys::generate(ZOBRIST_SEED));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_deterministic() {
        let a = ZobristKeys::generate(ZOBRIST_SEED);
        let b = ZobristKeys::generate(ZOBRIST_SEED);
        assert_eq!(a.piece, b.piece);
        assert_eq!(a.castling, b.castling);
        assert_eq!(a.ep_file, b.ep_file);
        assert_eq!(a.side, b.side);
    }

    #[test]
    fn test_keys_differ_between_features() {
        let keys = &*ZOBRIST;
        // A handful of spot checks that distinct features get distinct keys.
        assert_ne!(
            keys.piece_key(Color::White, Piece::Pawn, Square::from_index(0)),
            keys.piece_key(Color::Black, Piece::Pawn, Square::from_index(0))
        );
        assert_ne!(keys.castling[0], keys.castling[15]);
        assert_ne!(keys.ep_file[0], keys.ep_file[7]);
        assert_ne!(keys.side, 0);
    }
}
