//! Board state: piece bitboards, mailbox, clocks, and attack queries.

use crate::zobrist::ZOBRIST;

use super::attacks::tables;
use super::types::{
    bit_for_square, Bitboard, Color, Piece, Square, ALL_CASTLING_RIGHTS,
};

/// Mailbox sentinel for an empty square.
pub(crate) const NO_PIECE: u8 = 255;

/// Undo record returned by `make_move`, owned by the caller's search frame.
#[derive(Clone, Debug)]
pub struct UnmakeInfo {
    pub(crate) captured: Option<(Color, Piece)>,
    /// Where the captured piece stood; differs from the move target only
    /// for en passant.
    pub(crate) captured_sq: Option<Square>,
    pub(crate) prev_castling: u8,
    pub(crate) prev_en_passant: Option<Square>,
    pub(crate) prev_halfmove_clock: u32,
    pub(crate) prev_hash: u64,
}

/// Undo record for a null move.
#[derive(Clone, Debug)]
pub struct NullMoveInfo {
    pub(crate) prev_en_passant: Option<Square>,
    pub(crate) prev_hash: u64,
}

/// A chess position.
///
/// Positions are not shared between threads; each search worker clones its
/// own. Undo information lives in per-frame [`UnmakeInfo`] records rather
/// than inside the position, so clones stay cheap.
#[derive(Clone, Debug)]
pub struct Board {
    /// Piece bitboards, indexed `[color][piece]`.
    pub(crate) pieces: [[Bitboard; 6]; 2],
    /// Occupancy per color (cached union of that color's piece boards).
    pub(crate) occupied: [Bitboard; 2],
    pub(crate) all_occupied: Bitboard,
    /// Piece-on-square array for O(1) victim lookup: `color*6 + piece`,
    /// `NO_PIECE` when empty.
    pub(crate) mailbox: [u8; 64],
    pub(crate) side_to_move: Color,
    pub(crate) en_passant_target: Option<Square>,
    /// 4-bit set `{WK, WQ, BK, BQ}`.
    pub(crate) castling_rights: u8,
    pub(crate) halfmove_clock: u32,
    pub(crate) fullmove_number: u32,
    /// Incrementally maintained Zobrist key.
    pub(crate) hash: u64,
    /// Hashes of prior positions along the game/search path, for
    /// repetition detection. Pushed by `make_move`, popped by `unmake_move`.
    pub(crate) history: Vec<u64>,
}

impl Board {
    /// The standard starting position.
    #[must_use]
    pub fn new() -> Self {
        let mut board = Board::empty();
        let back_rank = [
            Piece::Rook,
            Piece::Knight,
            Piece::Bishop,
            Piece::Queen,
            Piece::King,
            Piece::Bishop,
            Piece::Knight,
            Piece::Rook,
        ];
        for (file, piece) in back_rank.iter().enumerate() {
            board.set_piece(Square::new(0, file), Color::White, *piece);
            board.set_piece(Square::new(7, file), Color::Black, *piece);
            board.set_piece(Square::new(1, file), Color::White, Piece::Pawn);
            board.set_piece(Square::new(6, file), Color::Black, Piece::Pawn);
        }
        board.castling_rights = ALL_CASTLING_RIGHTS;
        board.hash = board.calculate_hash();
        board
    }

    pub(crate) fn empty() -> Self {
        Board {
            pieces: [[Bitboard::EMPTY; 6]; 2],
            occupied: [Bitboard::EMPTY; 2],
            all_occupied: Bitboard::EMPTY,
            mailbox: [NO_PIECE; 64],
            side_to_move: Color::White,
            en_passant_target: None,
            castling_rights: 0,
            halfmove_clock: 0,
            fullmove_number: 1,
            hash: 0,
            history: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    #[inline]
    #[must_use]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline]
    #[must_use]
    pub fn white_to_move(&self) -> bool {
        self.side_to_move.is_white()
    }

    #[must_use]
    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    #[must_use]
    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    #[must_use]
    pub fn en_passant_target(&self) -> Option<Square> {
        self.en_passant_target
    }

    /// Bitboard of `color`'s pieces of the given type.
    #[inline]
    #[must_use]
    pub fn piece_board(&self, color: Color, piece: Piece) -> Bitboard {
        self.pieces[color.index()][piece.index()]
    }

    pub(crate) fn set_piece(&mut self, sq: Square, color: Color, piece: Piece) {
        let bit = bit_for_square(sq).0;
        let c_idx = color.index();
        self.pieces[c_idx][piece.index()].0 |= bit;
        self.occupied[c_idx].0 |= bit;
        self.all_occupied.0 |= bit;
        self.mailbox[sq.index()] = (c_idx * 6 + piece.index()) as u8;
    }

    pub(crate) fn remove_piece(&mut self, sq: Square, color: Color, piece: Piece) {
        let bit = bit_for_square(sq).0;
        let c_idx = color.index();
        self.pieces[c_idx][piece.index()].0 &= !bit;
        self.occupied[c_idx].0 &= !bit;
        self.all_occupied.0 &= !bit;
        self.mailbox[sq.index()] = NO_PIECE;
    }

    /// The piece on `sq`, if any. O(1) via the mailbox.
    #[inline]
    #[must_use]
    pub fn piece_at(&self, sq: Square) -> Option<(Color, Piece)> {
        let code = self.mailbox[sq.index()];
        if code == NO_PIECE {
            return None;
        }
        let color = if code < 6 { Color::White } else { Color::Black };
        Some((color, Piece::from_index((code % 6) as usize)))
    }

    #[inline]
    pub(crate) fn is_empty_square(&self, sq: Square) -> bool {
        self.mailbox[sq.index()] == NO_PIECE
    }

    pub(crate) fn king_square(&self, color: Color) -> Square {
        let kings = self.pieces[color.index()][Piece::King.index()].0;
        debug_assert!(kings != 0, "{color} has no king");
        Square::from_index(kings.trailing_zeros() as usize)
    }

    /// Recompute the Zobrist key from scratch. Used to seed the incremental
    /// key and to audit it in debug builds.
    #[must_use]
    pub(crate) fn calculate_hash(&self) -> u64 {
        let mut hash = 0u64;
        for idx in 0..64 {
            let sq = Square::from_index(idx);
            if let Some((color, piece)) = self.piece_at(sq) {
                hash ^= ZOBRIST.piece_key(color, piece, sq);
            }
        }
        hash ^= ZOBRIST.castling[self.castling_rights as usize];
        if let Some(ep) = self.en_passant_target {
            hash ^= ZOBRIST.ep_file[ep.file()];
        }
        if self.side_to_move == Color::Black {
            hash ^= ZOBRIST.side;
        }
        hash
    }

    // ------------------------------------------------------------------
    // Attack queries
    // ------------------------------------------------------------------

    /// True iff any piece of `by_color` attacks `sq` under the current
    /// occupancy.
    #[must_use]
    pub fn is_square_attacked(&self, sq: Square, by_color: Color) -> bool {
        let t = tables();
        let target = sq.index();
        let c_idx = by_color.index();
        let them = &self.pieces[c_idx];

        // A pawn of `by_color` attacks `sq` iff `sq` pawn-attacks (from the
        // defender's perspective) one of their pawns.
        let pawn_sources = t.pawn_attacks(by_color.opponent().index(), target);
        if them[Piece::Pawn.index()].0 & pawn_sources != 0 {
            return true;
        }
        if them[Piece::Knight.index()].0 & t.knight_attacks(target) != 0 {
            return true;
        }
        if them[Piece::King.index()].0 & t.king_attacks(target) != 0 {
            return true;
        }

        let occ = self.all_occupied.0;
        let rook_like = them[Piece::Rook.index()].0 | them[Piece::Queen.index()].0;
        if rook_like != 0 && t.rook_attacks(target, occ) & rook_like != 0 {
            return true;
        }
        let bishop_like = them[Piece::Bishop.index()].0 | them[Piece::Queen.index()].0;
        bishop_like != 0 && t.bishop_attacks(target, occ) & bishop_like != 0
    }

    /// True iff `color`'s king is attacked.
    #[must_use]
    pub fn is_in_check(&self, color: Color) -> bool {
        self.is_square_attacked(self.king_square(color), color.opponent())
    }

    /// All pieces (both colors) attacking `sq` given an explicit occupancy.
    /// The occupancy parameter lets SEE re-evaluate attacks as pieces are
    /// peeled off the board.
    #[must_use]
    pub(crate) fn attackers_to(&self, sq: Square, occupancy: u64) -> Bitboard {
        let t = tables();
        let target = sq.index();
        let mut attackers = 0u64;

        attackers |= t.pawn_attacks(1, target) & self.pieces[0][Piece::Pawn.index()].0;
        attackers |= t.pawn_attacks(0, target) & self.pieces[1][Piece::Pawn.index()].0;
        attackers |= t.knight_attacks(target)
            & (self.pieces[0][Piece::Knight.index()].0 | self.pieces[1][Piece::Knight.index()].0);
        attackers |= t.king_attacks(target)
            & (self.pieces[0][Piece::King.index()].0 | self.pieces[1][Piece::King.index()].0);

        let diagonal = self.pieces[0][Piece::Bishop.index()].0
            | self.pieces[1][Piece::Bishop.index()].0
            | self.pieces[0][Piece::Queen.index()].0
            | self.pieces[1][Piece::Queen.index()].0;
        attackers |= t.bishop_attacks(target, occupancy) & diagonal;

        let straight = self.pieces[0][Piece::Rook.index()].0
            | self.pieces[1][Piece::Rook.index()].0
            | self.pieces[0][Piece::Queen.index()].0
            | self.pieces[1][Piece::Queen.index()].0;
        attackers |= t.rook_attacks(target, occupancy) & straight;

        Bitboard(attackers & occupancy)
    }

    /// All pieces of `by_color` attacking `sq` given an explicit occupancy.
    #[must_use]
    pub fn get_attackers(&self, sq: Square, by_color: Color, occupancy: u64) -> Bitboard {
        Bitboard(self.attackers_to(sq, occupancy).0 & self.occupied[by_color.index()].0)
    }

    /// True iff the side to move has any piece besides pawns and the king.
    /// Gate for null-move pruning (zugzwang guard).
    #[must_use]
    pub(crate) fn has_non_pawn_material(&self) -> bool {
        let us = &self.pieces[self.side_to_move.index()];
        (us[Piece::Knight.index()].0
            | us[Piece::Bishop.index()].0
            | us[Piece::Rook.index()].0
            | us[Piece::Queen.index()].0)
            != 0
    }

    // ------------------------------------------------------------------
    // Draw detection
    // ------------------------------------------------------------------

    /// True iff the current position occurred before on the game/search
    /// path. Only positions since the last irreversible move can repeat.
    #[must_use]
    pub fn is_repetition(&self) -> bool {
        let n = self.history.len();
        let lookback = (self.halfmove_clock as usize).min(n);
        self.history[n - lookback..].iter().any(|&h| h == self.hash)
    }

    /// Fifty-move rule, repetition, or insufficient material.
    #[must_use]
    pub fn is_draw(&self) -> bool {
        self.halfmove_clock >= 100 || self.is_repetition() || self.is_insufficient_material()
    }

    fn is_insufficient_material(&self) -> bool {
        let majors_or_pawns = [Piece::Pawn, Piece::Rook, Piece::Queen]
            .iter()
            .any(|p| self.pieces[0][p.index()].0 | self.pieces[1][p.index()].0 != 0);
        if majors_or_pawns {
            return false;
        }
        let minors = (self.pieces[0][Piece::Knight.index()].0
            | self.pieces[1][Piece::Knight.index()].0
            | self.pieces[0][Piece::Bishop.index()].0
            | self.pieces[1][Piece::Bishop.index()].0)
            .count_ones();
        minors <= 1
    }

    // ------------------------------------------------------------------
    // Invariant auditing
    // ------------------------------------------------------------------

    /// Verify the structural invariants of the position. Cheap enough for
    /// debug assertions, precise enough for audit mode.
    #[must_use]
    pub(crate) fn check_invariants(&self) -> bool {
        // Piece boards are pairwise disjoint and agree with the caches.
        let mut union = 0u64;
        let mut seen = 0u64;
        for color_boards in &self.pieces {
            for bb in color_boards {
                if bb.0 & seen != 0 {
                    return false;
                }
                seen |= bb.0;
                union |= bb.0;
            }
        }
        let white: u64 = self.pieces[0].iter().map(|b| b.0).fold(0, |a, b| a | b);
        let black: u64 = self.pieces[1].iter().map(|b| b.0).fold(0, |a, b| a | b);
        if white != self.occupied[0].0 || black != self.occupied[1].0 {
            return false;
        }
        if union != self.all_occupied.0 {
            return false;
        }

        // Mailbox agrees with the bitboards.
        for idx in 0..64 {
            let sq = Square::from_index(idx);
            let from_mailbox = self.piece_at(sq);
            let from_boards = self.piece_at_slow(sq);
            if from_mailbox != from_boards {
                return false;
            }
        }

        // Exactly one king each.
        if self.pieces[0][Piece::King.index()].popcount() != 1
            || self.pieces[1][Piece::King.index()].popcount() != 1
        {
            return false;
        }

        // No pawns on the back ranks.
        let pawns = self.pieces[0][Piece::Pawn.index()].0 | self.pieces[1][Piece::Pawn.index()].0;
        if pawns & (Bitboard::RANK_1.0 | Bitboard::RANK_8.0) != 0 {
            return false;
        }

        self.hash == self.calculate_hash()
    }

    fn piece_at_slow(&self, sq: Square) -> Option<(Color, Piece)> {
        let bit = bit_for_square(sq).0;
        for color in [Color::White, Color::Black] {
            for piece in Piece::ALL {
                if self.pieces[color.index()][piece.index()].0 & bit != 0 {
                    return Some((color, piece));
                }
            }
        }
        None
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_position_invariants() {
        let board = Board::new();
        assert!(board.check_invariants());
        assert_eq!(board.all_occupied.popcount(), 32);
        assert_eq!(board.side_to_move(), Color::White);
        assert_eq!(board.castling_rights, ALL_CASTLING_RIGHTS);
    }

    #[test]
    fn test_piece_at_mailbox() {
        let board = Board::new();
        assert_eq!(
            board.piece_at(Square::new(0, 4)),
            Some((Color::White, Piece::King))
        );
        assert_eq!(
            board.piece_at(Square::new(7, 3)),
            Some((Color::Black, Piece::Queen))
        );
        assert_eq!(board.piece_at(Square::new(4, 4)), None);
    }

    #[test]
    fn test_start_position_not_in_check() {
        let board = Board::new();
        assert!(!board.is_in_check(Color::White));
        assert!(!board.is_in_check(Color::Black));
    }

    #[test]
    fn test_king_square() {
        let board = Board::new();
        assert_eq!(board.king_square(Color::White), Square::new(0, 4));
        assert_eq!(board.king_square(Color::Black), Square::new(7, 4));
    }

    #[test]
    fn test_insufficient_material() {
        let board = Board::try_from_fen("8/8/4k3/8/8/3BK3/8/8 w - - 0 1").unwrap();
        assert!(board.is_draw());
        let board = Board::try_from_fen("8/8/4k3/8/8/2NBK3/8/8 w - - 0 1").unwrap();
        assert!(!board.is_draw());
    }
}
