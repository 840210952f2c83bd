//! Make/unmake round-trip and Zobrist consistency tests.

use rand::prelude::*;

use crate::board::{Board, Color, Move, Piece, Square, UnmakeInfo};

fn find_move(board: &mut Board, from: Square, to: Square, promotion: Option<Piece>) -> Move {
    for m in &board.generate_legal() {
        if m.from() == from && m.to() == to && m.promotion_piece() == promotion {
            return *m;
        }
    }
    panic!("expected move {from}{to} not found");
}

/// Every observable piece of state, for exact round-trip comparison.
fn observable_state(board: &Board) -> (String, u64, u32, u32) {
    (
        board.to_fen(),
        board.hash(),
        board.halfmove_clock(),
        board.fullmove_number(),
    )
}

#[test]
fn test_simple_move_round_trip() {
    let mut board = Board::new();
    let before = observable_state(&board);
    let mv = find_move(&mut board, Square::new(1, 4), Square::new(3, 4), None);
    let info = board.make_move(mv);
    board.unmake_move(mv, info);
    assert_eq!(observable_state(&board), before);
}

#[test]
fn test_en_passant_round_trip() {
    let mut board =
        Board::try_from_fen("rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3")
            .unwrap();
    let before = observable_state(&board);
    let mv = find_move(&mut board, Square::new(4, 4), Square::new(5, 5), None);
    assert!(mv.is_en_passant());

    let info = board.make_move(mv);
    // The captured pawn disappears from f5, not f6.
    assert_eq!(board.piece_at(Square::new(4, 5)), None);
    board.unmake_move(mv, info);
    assert_eq!(observable_state(&board), before);
    assert_eq!(
        board.piece_at(Square::new(4, 5)),
        Some((Color::Black, Piece::Pawn))
    );
}

#[test]
fn test_promotion_round_trip() {
    let mut board = Board::try_from_fen("4k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
    let before = observable_state(&board);
    let mv = find_move(
        &mut board,
        Square::new(6, 0),
        Square::new(7, 0),
        Some(Piece::Queen),
    );
    let info = board.make_move(mv);
    assert_eq!(
        board.piece_at(Square::new(7, 0)),
        Some((Color::White, Piece::Queen))
    );
    board.unmake_move(mv, info);
    assert_eq!(observable_state(&board), before);
    assert_eq!(
        board.piece_at(Square::new(6, 0)),
        Some((Color::White, Piece::Pawn))
    );
}

#[test]
fn test_castling_round_trip_both_sides() {
    for (fen, from, to, rook_from, rook_to) in [
        (
            "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1",
            Square::new(0, 4),
            Square::new(0, 6),
            Square::new(0, 7),
            Square::new(0, 5),
        ),
        (
            "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1",
            Square::new(0, 4),
            Square::new(0, 2),
            Square::new(0, 0),
            Square::new(0, 3),
        ),
        (
            "r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 0 1",
            Square::new(7, 4),
            Square::new(7, 6),
            Square::new(7, 7),
            Square::new(7, 5),
        ),
    ] {
        let mut board = Board::try_from_fen(fen).unwrap();
        let before = observable_state(&board);
        let color = board.side_to_move();
        let mv = find_move(&mut board, from, to, None);
        assert!(mv.is_castling());

        let info = board.make_move(mv);
        assert_eq!(board.piece_at(to), Some((color, Piece::King)));
        assert_eq!(board.piece_at(rook_to), Some((color, Piece::Rook)));
        assert_eq!(board.piece_at(rook_from), None);

        board.unmake_move(mv, info);
        assert_eq!(observable_state(&board), before);
    }
}

#[test]
fn test_rook_capture_drops_castling_right() {
    use crate::board::types::CASTLE_BLACK_K;

    // Capturing the h8 rook must clear Black's kingside right.
    let mut board = Board::try_from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
    let mv = find_move(&mut board, Square::new(0, 7), Square::new(7, 7), None);
    let info = board.make_move(mv);
    assert_eq!(board.castling_rights & CASTLE_BLACK_K, 0);
    board.unmake_move(mv, info);
    assert_ne!(board.castling_rights & CASTLE_BLACK_K, 0);
}

#[test]
fn test_null_move_round_trip() {
    let mut board =
        Board::try_from_fen("rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3")
            .unwrap();
    let before = observable_state(&board);
    let side = board.side_to_move();

    let info = board.make_null_move();
    assert_eq!(board.en_passant_target(), None);
    assert_ne!(board.hash(), before.1);
    assert_ne!(board.side_to_move(), side);

    board.unmake_null_move(info);
    assert_eq!(observable_state(&board), before);
}

#[test]
fn test_fullmove_number_counts_black_moves() {
    let mut board = Board::new();
    assert_eq!(board.fullmove_number(), 1);
    board.make_move_uci("e2e4").unwrap();
    assert_eq!(board.fullmove_number(), 1);
    board.make_move_uci("e7e5").unwrap();
    assert_eq!(board.fullmove_number(), 2);
}

#[test]
fn test_hash_matches_recompute_after_random_moves() {
    let mut board = Board::new();
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    let mut history: Vec<(Move, UnmakeInfo)> = Vec::new();

    for _ in 0..60 {
        let moves = board.generate_legal();
        if moves.is_empty() {
            break;
        }
        let mv = moves[rng.gen_range(0..moves.len())];
        let info = board.make_move(mv);
        history.push((mv, info));
        assert_eq!(board.hash(), board.calculate_hash());
    }

    while let Some((mv, info)) = history.pop() {
        board.unmake_move(mv, info);
        assert_eq!(board.hash(), board.calculate_hash());
    }
    assert_eq!(board.hash(), Board::new().hash());
}

#[test]
fn test_zobrist_consistency_with_interleaved_nulls() {
    let mut board = Board::new();
    let mut rng = StdRng::seed_from_u64(0x5EED);

    for step in 0..40 {
        if step % 5 == 4 && !board.is_in_check(board.side_to_move()) {
            let info = board.make_null_move();
            assert_eq!(board.hash(), board.calculate_hash());
            board.unmake_null_move(info);
            assert_eq!(board.hash(), board.calculate_hash());
        }
        let moves = board.generate_legal();
        if moves.is_empty() {
            break;
        }
        let mv = moves[rng.gen_range(0..moves.len())];
        board.make_move(mv);
        assert_eq!(board.hash(), board.calculate_hash());
    }
}

#[test]
fn test_repetition_detection() {
    let mut board = Board::new();
    // Shuffle knights back and forth; the third occurrence of the start
    // position is a repetition of the first two.
    for uci in ["g1f3", "g8f6", "f3g1", "f6g8"] {
        assert!(!board.is_repetition());
        board.make_move_uci(uci).unwrap();
    }
    assert!(board.is_repetition());
}

#[test]
fn test_legal_moves_stable_after_round_trips() {
    let mut board = Board::new();
    let initial_moves = board.generate_legal();
    let mut initial_list: Vec<String> = initial_moves.iter().map(ToString::to_string).collect();
    initial_list.sort();

    for mv in &initial_moves {
        let info = board.make_move(*mv);
        board.unmake_move(*mv, info);
    }

    let after = board.generate_legal();
    let mut after_list: Vec<String> = after.iter().map(ToString::to_string).collect();
    after_list.sort();
    assert_eq!(initial_list, after_list);
}
