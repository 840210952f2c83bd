//! Static Exchange Evaluation (SEE).
//!
//! Evaluates capture sequences on a single square to determine whether a
//! capture wins, loses, or breaks even, with x-ray attackers entering
//! play as front pieces are exchanged off.

use super::attacks::tables;
use super::state::Board;
use super::types::{Bitboard, Piece, Square};

/// Piece values for SEE (simpler than eval values)
const SEE_VALUES: [i32; 6] = [
    100,   // Pawn
    320,   // Knight
    330,   // Bishop
    500,   // Rook
    900,   // Queen
    20000, // King
];

impl Board {
    /// Material balance after all exchanges on the target square, in
    /// centipawns from the perspective of the side making the initial
    /// capture. Positive = winning, zero = equal, negative = losing.
    #[must_use]
    pub fn see(&self, from: Square, to: Square) -> i32 {
        let victim = match self.piece_at(to) {
            Some((_, piece)) => piece,
            None => {
                // En passant: the victim is a pawn, just not on `to`.
                if self.en_passant_target == Some(to) {
                    Piece::Pawn
                } else {
                    return 0;
                }
            }
        };

        let Some((_, attacker)) = self.piece_at(from) else {
            return 0;
        };

        self.see_exchange(from, to, attacker, victim)
    }

    /// True if the capture's exchange value meets `threshold`.
    #[inline]
    #[must_use]
    pub fn see_ge(&self, from: Square, to: Square, threshold: i32) -> bool {
        self.see(from, to) >= threshold
    }

    fn see_exchange(&self, from: Square, to: Square, attacker: Piece, victim: Piece) -> i32 {
        const MAX_EXCHANGES: usize = 32;

        let mut gain = [0i32; MAX_EXCHANGES];
        let mut depth = 0;
        let mut white_to_capture = self.white_to_move();

        let mut occupancy = self.all_occupied.0;
        let mut attackers = self.attackers_to(to, occupancy);

        gain[0] = SEE_VALUES[victim.index()];

        let mut current_attacker = attacker;
        let mut from_bb = Bitboard::from_square(from);

        loop {
            // Lift the capturing piece off the board.
            occupancy ^= from_bb.0;
            attackers = Bitboard(attackers.0 & !from_bb.0);

            // Removing a piece may reveal an x-ray attacker behind it along
            // the same ray.
            if matches!(
                current_attacker,
                Piece::Pawn | Piece::Bishop | Piece::Queen
            ) {
                let diagonal = self.diagonal_sliders();
                let revealed = tables().bishop_attacks(to.index(), occupancy) & diagonal.0;
                attackers = Bitboard(attackers.0 | (revealed & occupancy));
            }
            if matches!(current_attacker, Piece::Rook | Piece::Queen) {
                let straight = self.straight_sliders();
                let revealed = tables().rook_attacks(to.index(), occupancy) & straight.0;
                attackers = Bitboard(attackers.0 | (revealed & occupancy));
            }

            white_to_capture = !white_to_capture;
            let side_idx = usize::from(!white_to_capture);
            let side_attackers = Bitboard(attackers.0 & self.occupied[side_idx].0);
            if side_attackers.is_empty() {
                break;
            }

            depth += 1;
            if depth >= MAX_EXCHANGES {
                break;
            }

            let (lva_piece, lva_bb) = self.least_valuable_attacker(side_attackers, side_idx);

            gain[depth] = SEE_VALUES[current_attacker.index()] - gain[depth - 1];

            // Neither continuing nor standing pat can help: stop early.
            if (-gain[depth - 1]).max(gain[depth]) < 0 {
                break;
            }

            // The king may only recapture if the opponent has no reply.
            if lva_piece == Piece::King {
                let opponent_attackers =
                    Bitboard(attackers.0 & self.occupied[1 - side_idx].0 & !lva_bb.0);
                if !opponent_attackers.is_empty() {
                    break;
                }
            }

            current_attacker = lva_piece;
            from_bb = lva_bb;
        }

        // Minimax the gain sequence back to the root capture.
        while depth > 0 {
            depth -= 1;
            gain[depth] = -(-gain[depth]).max(gain[depth + 1]);
        }

        gain[0]
    }

    #[inline]
    fn diagonal_sliders(&self) -> Bitboard {
        Bitboard(
            self.pieces[0][Piece::Bishop.index()].0
                | self.pieces[0][Piece::Queen.index()].0
                | self.pieces[1][Piece::Bishop.index()].0
                | self.pieces[1][Piece::Queen.index()].0,
        )
    }

    #[inline]
    fn straight_sliders(&self) -> Bitboard {
        Bitboard(
            self.pieces[0][Piece::Rook.index()].0
                | self.pieces[0][Piece::Queen.index()].0
                | self.pieces[1][Piece::Rook.index()].0
                | self.pieces[1][Piece::Queen.index()].0,
        )
    }

    /// Least valuable attacker among `attackers` for `color_idx`, as a
    /// piece type and a single-bit board.
    fn least_valuable_attacker(&self, attackers: Bitboard, color_idx: usize) -> (Piece, Bitboard) {
        for piece in Piece::ALL {
            let candidates = Bitboard(attackers.0 & self.pieces[color_idx][piece.index()].0);
            if !candidates.is_empty() {
                let single = Bitboard(candidates.0 & candidates.0.wrapping_neg());
                return (piece, single);
            }
        }
        (Piece::Pawn, Bitboard::EMPTY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_board(fen: &str) -> Board {
        fen.parse().expect("valid fen")
    }

    #[test]
    fn test_see_free_pawn() {
        let board = make_board("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1");
        assert_eq!(board.see(Square::new(3, 4), Square::new(4, 3)), 100);
    }

    #[test]
    fn test_see_equal_exchange() {
        // Pawn takes a pawn defended by a pawn.
        let board = make_board("4k3/8/2p5/3p4/4P3/8/8/4K3 w - - 0 1");
        assert_eq!(board.see(Square::new(3, 4), Square::new(4, 3)), 0);
    }

    #[test]
    fn test_see_knight_takes_defended_pawn() {
        let board = make_board("4k3/8/2p5/3p4/4N3/8/8/4K3 w - - 0 1");
        let see = board.see(Square::new(3, 4), Square::new(4, 3));
        assert_eq!(see, 100 - 320);
    }

    #[test]
    fn test_see_queen_takes_defended_pawn() {
        let board = make_board("4k3/8/2p5/3p4/4Q3/8/8/4K3 w - - 0 1");
        assert!(board.see(Square::new(3, 4), Square::new(4, 3)) < 0);
    }

    #[test]
    fn test_see_xray_recapture() {
        // Rook takes rook on an open file; a second black rook behind
        // recaptures: 500 - 500 = 0.
        let board = make_board("3r4/3r4/8/8/8/8/4K3/3R2k1 w - - 0 1");
        assert_eq!(board.see(Square::new(0, 3), Square::new(6, 3)), 0);
    }

    #[test]
    fn test_see_xray_stacked_attackers() {
        // Rook takes defended rook but a friendly rook behind supports:
        // win a rook, lose a rook, recapture the defender's rook.
        let board = make_board("3r4/8/8/8/8/3R4/3R4/3K2k1 w - - 0 1");
        assert_eq!(board.see(Square::new(2, 3), Square::new(7, 3)), 500);
    }

    #[test]
    fn test_see_en_passant_victim_is_pawn() {
        let board = make_board("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1");
        // e5xd6 e.p. captures a pawn.
        assert_eq!(board.see(Square::new(4, 4), Square::new(5, 3)), 100);
    }

    #[test]
    fn test_see_ge_threshold() {
        let board = make_board("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1");
        assert!(board.see_ge(Square::new(3, 4), Square::new(4, 3), 0));
        assert!(board.see_ge(Square::new(3, 4), Square::new(4, 3), 100));
        assert!(!board.see_ge(Square::new(3, 4), Square::new(4, 3), 101));
    }
}
