//! Move application and reversal with incremental Zobrist maintenance.

use crate::zobrist::ZOBRIST;

use super::state::{Board, NullMoveInfo, UnmakeInfo};
use super::types::{Color, Move, Piece, Square, CASTLE_MASK};

impl Board {
    /// Apply a pseudo-legal move and return the undo record.
    ///
    /// The caller owns the record and must pass it back to `unmake_move`;
    /// nothing is stacked inside the position itself.
    pub fn make_move(&mut self, m: Move) -> UnmakeInfo {
        let us = self.side_to_move;
        let them = us.opponent();
        let from = m.from();
        let to = m.to();

        let prev_castling = self.castling_rights;
        let prev_en_passant = self.en_passant_target;
        let prev_halfmove_clock = self.halfmove_clock;
        let prev_hash = self.hash;
        self.history.push(self.hash);

        let mut hash = self.hash ^ ZOBRIST.side;
        if let Some(ep) = self.en_passant_target {
            hash ^= ZOBRIST.ep_file[ep.file()];
        }

        let (_, moving) = self.piece_at(from).expect("make_move from an empty square");

        let mut captured = None;
        let mut captured_sq = None;
        if m.is_en_passant() {
            let cap_sq = to.backward(us.is_white());
            captured = Some((them, Piece::Pawn));
            captured_sq = Some(cap_sq);
            self.remove_piece(cap_sq, them, Piece::Pawn);
            hash ^= ZOBRIST.piece_key(them, Piece::Pawn, cap_sq);
        } else if m.is_capture() {
            let (cap_color, cap_piece) = self.piece_at(to).expect("capture without a victim");
            captured = Some((cap_color, cap_piece));
            captured_sq = Some(to);
            self.remove_piece(to, cap_color, cap_piece);
            hash ^= ZOBRIST.piece_key(cap_color, cap_piece, to);
        }

        self.remove_piece(from, us, moving);
        hash ^= ZOBRIST.piece_key(us, moving, from);

        let placed = m.promotion_piece().unwrap_or(moving);
        self.set_piece(to, us, placed);
        hash ^= ZOBRIST.piece_key(us, placed, to);

        if m.is_castling() {
            // E1->G1 moves H1->F1, E1->C1 moves A1->D1, mirrored on rank 8.
            let rank = from.rank();
            let (rook_from_file, rook_to_file) = if to.file() == 6 { (7, 5) } else { (0, 3) };
            let rook_from = Square::new(rank, rook_from_file);
            let rook_to = Square::new(rank, rook_to_file);
            self.remove_piece(rook_from, us, Piece::Rook);
            self.set_piece(rook_to, us, Piece::Rook);
            hash ^= ZOBRIST.piece_key(us, Piece::Rook, rook_from);
            hash ^= ZOBRIST.piece_key(us, Piece::Rook, rook_to);
        }

        // Moving from or capturing on a king/rook home square drops the
        // affected rights.
        let new_rights =
            self.castling_rights & CASTLE_MASK[from.index()] & CASTLE_MASK[to.index()];
        if new_rights != self.castling_rights {
            hash ^= ZOBRIST.castling[self.castling_rights as usize];
            hash ^= ZOBRIST.castling[new_rights as usize];
            self.castling_rights = new_rights;
        }

        self.en_passant_target = None;
        if m.is_double_push() {
            let ep = Square::from_index(usize::midpoint(from.index(), to.index()));
            self.en_passant_target = Some(ep);
            hash ^= ZOBRIST.ep_file[ep.file()];
        }

        if moving == Piece::Pawn || captured.is_some() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }
        if us == Color::Black {
            self.fullmove_number += 1;
        }

        self.side_to_move = them;
        self.hash = hash;
        debug_assert_eq!(self.hash, self.calculate_hash());

        UnmakeInfo {
            captured,
            captured_sq,
            prev_castling,
            prev_en_passant,
            prev_halfmove_clock,
            prev_hash,
        }
    }

    /// Restore the exact prior state, including the Zobrist key.
    pub fn unmake_move(&mut self, m: Move, info: UnmakeInfo) {
        self.history.pop();

        let us = self.side_to_move.opponent();
        self.side_to_move = us;
        if us == Color::Black {
            self.fullmove_number -= 1;
        }
        self.en_passant_target = info.prev_en_passant;
        self.castling_rights = info.prev_castling;
        self.halfmove_clock = info.prev_halfmove_clock;
        self.hash = info.prev_hash;

        let from = m.from();
        let to = m.to();
        let (_, placed) = self.piece_at(to).expect("unmake_move with empty target square");
        self.remove_piece(to, us, placed);
        let original = if m.is_promotion() { Piece::Pawn } else { placed };
        self.set_piece(from, us, original);

        if m.is_castling() {
            let rank = from.rank();
            let (rook_from_file, rook_to_file) = if to.file() == 6 { (7, 5) } else { (0, 3) };
            self.remove_piece(Square::new(rank, rook_to_file), us, Piece::Rook);
            self.set_piece(Square::new(rank, rook_from_file), us, Piece::Rook);
        }

        if let (Some((cap_color, cap_piece)), Some(cap_sq)) = (info.captured, info.captured_sq) {
            self.set_piece(cap_sq, cap_color, cap_piece);
        }

        debug_assert_eq!(self.hash, self.calculate_hash());
    }

    /// Pass the move: toggle side-to-move and clear the en-passant square.
    /// Must not be called while the side to move is in check.
    pub fn make_null_move(&mut self) -> NullMoveInfo {
        debug_assert!(!self.is_in_check(self.side_to_move));

        let info = NullMoveInfo {
            prev_en_passant: self.en_passant_target,
            prev_hash: self.hash,
        };
        self.history.push(self.hash);

        let mut hash = self.hash ^ ZOBRIST.side;
        if let Some(ep) = self.en_passant_target {
            hash ^= ZOBRIST.ep_file[ep.file()];
        }
        self.en_passant_target = None;
        self.side_to_move = self.side_to_move.opponent();
        self.hash = hash;
        debug_assert_eq!(self.hash, self.calculate_hash());

        info
    }

    pub fn unmake_null_move(&mut self, info: NullMoveInfo) {
        self.history.pop();
        self.side_to_move = self.side_to_move.opponent();
        self.en_passant_target = info.prev_en_passant;
        self.hash = info.prev_hash;
        debug_assert_eq!(self.hash, self.calculate_hash());
    }
}
