//! Pseudo-legal move generation.
//!
//! The generators write into a caller-provided fixed-capacity buffer and
//! do not filter self-check legality; the search applies each move and
//! tests the mover's king. Castling is the one exception: a castle is
//! only emitted when the king's whole path (origin included) is
//! unattacked, so an emitted castle never needs the path re-checked.

mod kings;
mod knights;
mod pawns;
mod sliders;

use self::sliders::SliderType;
use super::state::Board;
use super::types::{Move, MoveList, Piece};

impl Board {
    /// All pseudo-legal moves for the side to move.
    pub fn generate_pseudo_legal(&self, moves: &mut MoveList) {
        self.generate_into(moves, false);
    }

    /// Captures, promotion-captures, promotion-pushes, and en passant:
    /// the quiescence-search expansion set.
    pub fn generate_captures(&self, moves: &mut MoveList) {
        self.generate_into(moves, true);
    }

    fn generate_into(&self, moves: &mut MoveList, captures_only: bool) {
        let c_idx = self.side_to_move.index();

        for from in self.pieces[c_idx][Piece::Pawn.index()].iter() {
            self.pawn_moves(from, moves, captures_only);
        }
        for from in self.pieces[c_idx][Piece::Knight.index()].iter() {
            self.knight_moves(from, moves, captures_only);
        }
        for from in self.pieces[c_idx][Piece::Bishop.index()].iter() {
            self.slider_moves(from, SliderType::Bishop, moves, captures_only);
        }
        for from in self.pieces[c_idx][Piece::Rook.index()].iter() {
            self.slider_moves(from, SliderType::Rook, moves, captures_only);
        }
        for from in self.pieces[c_idx][Piece::Queen.index()].iter() {
            self.slider_moves(from, SliderType::Queen, moves, captures_only);
        }
        for from in self.pieces[c_idx][Piece::King.index()].iter() {
            self.king_moves(from, moves, captures_only);
        }
    }

    /// All legal moves: pseudo-legal filtered by the make/test/unmake
    /// king-safety check. Used at the root and by the external-move API.
    pub fn generate_legal(&mut self) -> MoveList {
        let mut pseudo = MoveList::new();
        self.generate_pseudo_legal(&mut pseudo);

        let us = self.side_to_move;
        let mut legal = MoveList::new();
        for m in &pseudo {
            let info = self.make_move(*m);
            if !self.is_in_check(us) {
                legal.push(*m);
            }
            self.unmake_move(*m, info);
        }
        legal
    }

    /// Validate a single move (from the TT or an external caller) against
    /// the current position.
    #[must_use]
    pub fn is_legal_move(&mut self, mv: Move) -> bool {
        if mv.is_null() {
            return false;
        }
        match self.piece_at(mv.from()) {
            Some((color, _)) if color == self.side_to_move => {}
            _ => return false,
        }
        self.generate_legal().contains(mv)
    }

    #[must_use]
    pub fn is_checkmate(&mut self) -> bool {
        self.is_in_check(self.side_to_move) && self.generate_legal().is_empty()
    }

    #[must_use]
    pub fn is_stalemate(&mut self) -> bool {
        !self.is_in_check(self.side_to_move) && self.generate_legal().is_empty()
    }

    /// Count leaf positions to `depth`: the move-generation ground truth.
    #[must_use]
    pub fn perft(&mut self, depth: usize) -> u64 {
        if depth == 0 {
            return 1;
        }

        let mut moves = MoveList::new();
        self.generate_pseudo_legal(&mut moves);

        let us = self.side_to_move;
        let mut nodes = 0;
        for m in &moves {
            let info = self.make_move(*m);
            if !self.is_in_check(us) {
                nodes += if depth == 1 { 1 } else { self.perft(depth - 1) };
            }
            self.unmake_move(*m, info);
        }
        nodes
    }

    /// Perft split by root move, for debugging the generator against a
    /// known-good engine.
    #[must_use]
    pub fn perft_divide(&mut self, depth: usize) -> Vec<(Move, u64)> {
        let moves = self.generate_legal();
        let mut counts = Vec::with_capacity(moves.len());
        for m in &moves {
            let info = self.make_move(*m);
            counts.push((*m, self.perft(depth.saturating_sub(1))));
            self.unmake_move(*m, info);
        }
        counts
    }
}
