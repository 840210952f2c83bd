//! Property tests: randomized playouts must preserve every invariant.

use proptest::prelude::*;
use rand::prelude::*;
use rand::Rng as _;

use crate::board::{Board, Move, UnmakeInfo};

/// Play `plies` random legal moves from the start position using `seed`,
/// then unwind them all.
fn random_playout_round_trip(seed: u64, plies: usize) {
    let mut board = Board::new();
    let start_fen = board.to_fen();
    let start_hash = board.hash();

    let mut rng = StdRng::seed_from_u64(seed);
    let mut history: Vec<(Move, UnmakeInfo)> = Vec::new();

    for _ in 0..plies {
        let moves = board.generate_legal();
        if moves.is_empty() {
            break;
        }
        let mv = moves[rng.gen_range(0..moves.len())];
        let info = board.make_move(mv);
        history.push((mv, info));

        assert!(board.check_invariants(), "invariants broken after {mv}");
    }

    while let Some((mv, info)) = history.pop() {
        board.unmake_move(mv, info);
        assert!(board.check_invariants(), "invariants broken unwinding {mv}");
    }

    assert_eq!(board.to_fen(), start_fen);
    assert_eq!(board.hash(), start_hash);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_random_playouts_round_trip(seed in any::<u64>(), plies in 1usize..80) {
        random_playout_round_trip(seed, plies);
    }

    #[test]
    fn prop_capture_generation_is_subset_of_all_moves(seed in any::<u64>()) {
        let mut board = Board::new();
        let mut rng = StdRng::seed_from_u64(seed);

        for _ in 0..30 {
            let moves = board.generate_legal();
            if moves.is_empty() {
                break;
            }

            let mut all = crate::board::MoveList::new();
            board.generate_pseudo_legal(&mut all);
            let mut captures = crate::board::MoveList::new();
            board.generate_captures(&mut captures);

            for m in &captures {
                prop_assert!(all.contains(*m), "capture {m} missing from full set");
                prop_assert!(
                    m.is_capture() || m.is_promotion(),
                    "non-tactical move {m} in capture set"
                );
            }

            let mv = moves[rng.gen_range(0..moves.len())];
            board.make_move(mv);
        }
    }
}
