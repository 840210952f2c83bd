//! Castling rights as a 4-bit set.

pub(crate) const CASTLE_WHITE_K: u8 = 1 << 0;
pub(crate) const CASTLE_WHITE_Q: u8 = 1 << 1;
pub(crate) const CASTLE_BLACK_K: u8 = 1 << 2;
pub(crate) const CASTLE_BLACK_Q: u8 = 1 << 3;

pub(crate) const ALL_CASTLING_RIGHTS: u8 =
    CASTLE_WHITE_K | CASTLE_WHITE_Q | CASTLE_BLACK_K | CASTLE_BLACK_Q;

/// Per-square castling-rights mask, ANDed into the rights on every move.
///
/// Moving from (or capturing on) a king or rook home square clears the
/// corresponding rights; every other square leaves them untouched. Indexed
/// by square (a1=0 .. h8=63).
pub(crate) const CASTLE_MASK: [u8; 64] = {
    let mut mask = [ALL_CASTLING_RIGHTS; 64];
    mask[0] = ALL_CASTLING_RIGHTS & !CASTLE_WHITE_Q; // a1
    mask[4] = ALL_CASTLING_RIGHTS & !(CASTLE_WHITE_K | CASTLE_WHITE_Q); // e1
    mask[7] = ALL_CASTLING_RIGHTS & !CASTLE_WHITE_K; // h1
    mask[56] = ALL_CASTLING_RIGHTS & !CASTLE_BLACK_Q; // a8
    mask[60] = ALL_CASTLING_RIGHTS & !(CASTLE_BLACK_K | CASTLE_BLACK_Q); // e8
    mask[63] = ALL_CASTLING_RIGHTS & !CASTLE_BLACK_K; // h8
    mask
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_castle_mask_corners() {
        assert_eq!(CASTLE_MASK[0] & CASTLE_WHITE_Q, 0);
        assert_eq!(CASTLE_MASK[7] & CASTLE_WHITE_K, 0);
        assert_eq!(CASTLE_MASK[56] & CASTLE_BLACK_Q, 0);
        assert_eq!(CASTLE_MASK[63] & CASTLE_BLACK_K, 0);
        assert_eq!(
            CASTLE_MASK[4] & (CASTLE_WHITE_K | CASTLE_WHITE_Q),
            0
        );
        assert_eq!(
            CASTLE_MASK[60] & (CASTLE_BLACK_K | CASTLE_BLACK_Q),
            0
        );
    }

    #[test]
    fn test_castle_mask_ordinary_square() {
        assert_eq!(CASTLE_MASK[28], ALL_CASTLING_RIGHTS); // e4
    }
}
