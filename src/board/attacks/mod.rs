//! Precomputed attack tables.
//!
//! A single [`AttackTables`] value is constructed on first use and handed
//! out by reference; nothing here mutates after construction except the
//! indexing-mode flag in [`mode`].

mod magics;
mod mode;

pub use mode::{set_indexing_mode, PextMode};

use once_cell::sync::Lazy;

use magics::{SliderTable, BISHOP_DELTAS, ROOK_DELTAS};

/// Leaper tables plus the two parallel slider tables per piece.
pub(crate) struct AttackTables {
    knight: [u64; 64],
    king: [u64; 64],
    /// Diagonal pawn captures, indexed `[color][square]`.
    pawn: [[u64; 64]; 2],
    bishop: SliderTable,
    rook: SliderTable,
}

static TABLES: Lazy<AttackTables> = Lazy::new(AttackTables::build);

/// The process-wide attack tables.
#[inline]
pub(crate) fn tables() -> &'static AttackTables {
    &TABLES
}

impl AttackTables {
    fn build() -> Self {
        let mut rng = magics::magic_rng();
        AttackTables {
            knight: leaper_table(&[
                (2, 1),
                (1, 2),
                (-1, 2),
                (-2, 1),
                (-2, -1),
                (-1, -2),
                (1, -2),
                (2, -1),
            ]),
            king: leaper_table(&[
                (1, 0),
                (-1, 0),
                (0, 1),
                (0, -1),
                (1, 1),
                (1, -1),
                (-1, 1),
                (-1, -1),
            ]),
            pawn: pawn_tables(),
            bishop: SliderTable::build(&BISHOP_DELTAS, &mut rng),
            rook: SliderTable::build(&ROOK_DELTAS, &mut rng),
        }
    }

    #[inline]
    pub(crate) fn knight_attacks(&self, sq: usize) -> u64 {
        self.knight[sq]
    }

    #[inline]
    pub(crate) fn king_attacks(&self, sq: usize) -> u64 {
        self.king[sq]
    }

    /// Squares a pawn of `color_idx` on `sq` attacks diagonally.
    #[inline]
    pub(crate) fn pawn_attacks(&self, color_idx: usize, sq: usize) -> u64 {
        self.pawn[color_idx][sq]
    }

    /// Bishop attacks through `occ`, via the currently selected indexing.
    #[inline]
    pub(crate) fn bishop_attacks(&self, sq: usize, occ: u64) -> u64 {
        #[cfg(target_arch = "x86_64")]
        {
            if mode::use_pext() {
                // use_pext is only ever set after a BMI2 support check.
                return unsafe { self.bishop.lookup_pext_hw(sq, occ) };
            }
        }
        self.bishop.lookup_magic(sq, occ)
    }

    /// Rook attacks through `occ`, via the currently selected indexing.
    #[inline]
    pub(crate) fn rook_attacks(&self, sq: usize, occ: u64) -> u64 {
        #[cfg(target_arch = "x86_64")]
        {
            if mode::use_pext() {
                return unsafe { self.rook.lookup_pext_hw(sq, occ) };
            }
        }
        self.rook.lookup_magic(sq, occ)
    }

    /// Queen attacks: union of bishop and rook rays.
    #[inline]
    pub(crate) fn queen_attacks(&self, sq: usize, occ: u64) -> u64 {
        self.bishop_attacks(sq, occ) | self.rook_attacks(sq, occ)
    }

    // Explicit-path lookups, used by the parity tests and the selection
    // benchmark regardless of the active mode.

    #[inline]
    pub(crate) fn bishop_attacks_magic(&self, sq: usize, occ: u64) -> u64 {
        self.bishop.lookup_magic(sq, occ)
    }

    #[inline]
    pub(crate) fn rook_attacks_magic(&self, sq: usize, occ: u64) -> u64 {
        self.rook.lookup_magic(sq, occ)
    }

    #[inline]
    pub(crate) fn bishop_attacks_pext(&self, sq: usize, occ: u64) -> u64 {
        #[cfg(target_arch = "x86_64")]
        {
            if magics::hardware_pext_available() {
                return unsafe { self.bishop.lookup_pext_hw(sq, occ) };
            }
        }
        self.bishop.lookup_pext_sw(sq, occ)
    }

    #[inline]
    pub(crate) fn rook_attacks_pext(&self, sq: usize, occ: u64) -> u64 {
        #[cfg(target_arch = "x86_64")]
        {
            if magics::hardware_pext_available() {
                return unsafe { self.rook.lookup_pext_hw(sq, occ) };
            }
        }
        self.rook.lookup_pext_sw(sq, occ)
    }

    /// Ray-walk oracle, exposed for the attack-symmetry tests.
    #[cfg(test)]
    pub(crate) fn bishop_attacks_ray(&self, sq: usize, occ: u64) -> u64 {
        magics::ray_attacks(sq, occ, &BISHOP_DELTAS)
    }

    #[cfg(test)]
    pub(crate) fn rook_attacks_ray(&self, sq: usize, occ: u64) -> u64 {
        magics::ray_attacks(sq, occ, &ROOK_DELTAS)
    }
}

fn leaper_table(deltas: &[(i32, i32)]) -> [u64; 64] {
    let mut attacks = [0u64; 64];
    for (sq, slot) in attacks.iter_mut().enumerate() {
        let r = (sq / 8) as i32;
        let f = (sq % 8) as i32;
        let mut mask = 0u64;
        for &(dr, df) in deltas {
            let nr = r + dr;
            let nf = f + df;
            if (0..8).contains(&nr) && (0..8).contains(&nf) {
                mask |= 1u64 << (nr * 8 + nf);
            }
        }
        *slot = mask;
    }
    attacks
}

fn pawn_tables() -> [[u64; 64]; 2] {
    let mut attacks = [[0u64; 64]; 2];
    for sq in 0..64 {
        let r = (sq / 8) as i32;
        let f = (sq % 8) as i32;
        for (color, dr) in [(0usize, 1i32), (1, -1)] {
            let nr = r + dr;
            if (0..8).contains(&nr) {
                let mut mask = 0u64;
                for df in [-1, 1] {
                    let nf = f + df;
                    if (0..8).contains(&nf) {
                        mask |= 1u64 << (nr * 8 + nf);
                    }
                }
                attacks[color][sq] = mask;
            }
        }
    }
    attacks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_knight_attack_counts() {
        let t = tables();
        assert_eq!(t.knight_attacks(0).count_ones(), 2); // a1
        assert_eq!(t.knight_attacks(27).count_ones(), 8); // d4
        assert_eq!(t.knight_attacks(63).count_ones(), 2); // h8
    }

    #[test]
    fn test_king_attack_counts() {
        let t = tables();
        assert_eq!(t.king_attacks(0).count_ones(), 3);
        assert_eq!(t.king_attacks(27).count_ones(), 8);
    }

    #[test]
    fn test_pawn_attacks_direction() {
        let t = tables();
        // White pawn on e4 attacks d5 and f5.
        assert_eq!(t.pawn_attacks(0, 28), (1u64 << 35) | (1u64 << 37));
        // Black pawn on e4 attacks d3 and f3.
        assert_eq!(t.pawn_attacks(1, 28), (1u64 << 19) | (1u64 << 21));
        // Pawns on the back ranks attack nothing further.
        assert_eq!(t.pawn_attacks(0, 60), 0);
        assert_eq!(t.pawn_attacks(1, 4), 0);
    }

    #[test]
    fn test_slider_empty_board() {
        let t = tables();
        // Rook on a1, empty board: full file + full rank minus itself.
        assert_eq!(t.rook_attacks(0, 0).count_ones(), 14);
        // Bishop on d4, empty board: 13 diagonal squares.
        assert_eq!(t.bishop_attacks(27, 0).count_ones(), 13);
        // Queen = union.
        assert_eq!(
            t.queen_attacks(27, 0),
            t.rook_attacks(27, 0) | t.bishop_attacks(27, 0)
        );
    }

    #[test]
    fn test_magic_pext_ray_parity_exhaustive_squares() {
        let t = tables();
        let occs = [
            0u64,
            0x00FF_0000_0000_FF00,
            0x0042_2400_0024_4200,
            0x55AA_55AA_55AA_55AA,
            0x8100_0000_0000_0081,
        ];
        for sq in 0..64 {
            for &occ in &occs {
                assert_eq!(
                    t.rook_attacks_magic(sq, occ),
                    t.rook_attacks_pext(sq, occ),
                    "rook path mismatch on sq {sq}"
                );
                assert_eq!(
                    t.rook_attacks_magic(sq, occ),
                    t.rook_attacks_ray(sq, occ),
                    "rook oracle mismatch on sq {sq}"
                );
                assert_eq!(
                    t.bishop_attacks_magic(sq, occ),
                    t.bishop_attacks_pext(sq, occ),
                    "bishop path mismatch on sq {sq}"
                );
                assert_eq!(
                    t.bishop_attacks_magic(sq, occ),
                    t.bishop_attacks_ray(sq, occ),
                    "bishop oracle mismatch on sq {sq}"
                );
            }
        }
    }
}
