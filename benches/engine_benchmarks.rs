//! Benchmarks for engine performance.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use sabre::board::{set_indexing_mode, Board, MoveList, PextMode};
use sabre::engine::SearchLimits;
use sabre::eval::{Evaluator, MaterialEvaluator};
use sabre::search::{run_search, ParallelMode, SearchParams, SearchSpec};
use sabre::tt::TranspositionTable;

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

fn bench_perft(c: &mut Criterion) {
    let mut group = c.benchmark_group("perft");

    let mut board = Board::new();
    for depth in 1..=4 {
        group.bench_with_input(BenchmarkId::new("startpos", depth), &depth, |b, &depth| {
            b.iter(|| board.perft(black_box(depth)));
        });
    }

    let mut kiwipete = Board::try_from_fen(KIWIPETE).unwrap();
    for depth in 1..=3 {
        group.bench_with_input(BenchmarkId::new("kiwipete", depth), &depth, |b, &depth| {
            b.iter(|| kiwipete.perft(black_box(depth)));
        });
    }

    group.finish();
}

fn bench_movegen(c: &mut Criterion) {
    let mut group = c.benchmark_group("movegen");

    let positions = [
        ("startpos", Board::new()),
        ("kiwipete", Board::try_from_fen(KIWIPETE).unwrap()),
    ];

    for (name, board) in positions {
        group.bench_function(BenchmarkId::new("pseudo_legal", name), |b| {
            b.iter(|| {
                let mut moves = MoveList::new();
                board.generate_pseudo_legal(&mut moves);
                black_box(moves.len())
            });
        });
        group.bench_function(BenchmarkId::new("captures", name), |b| {
            b.iter(|| {
                let mut moves = MoveList::new();
                board.generate_captures(&mut moves);
                black_box(moves.len())
            });
        });
    }

    group.finish();
}

fn bench_attack_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("attacks");

    let board = Board::try_from_fen(KIWIPETE).unwrap();
    let king_sq = board.piece_board(sabre::board::Color::White, sabre::board::Piece::King);

    for mode in [PextMode::Disable, PextMode::Force] {
        set_indexing_mode(mode);
        group.bench_function(BenchmarkId::new("is_square_attacked", format!("{mode:?}")), |b| {
            b.iter(|| {
                let sq = king_sq.iter().next().unwrap();
                black_box(board.is_square_attacked(sq, sabre::board::Color::Black))
            });
        });
    }
    set_indexing_mode(PextMode::Disable);

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    group.sample_size(10);

    for depth in [3u32, 4, 5] {
        group.bench_with_input(BenchmarkId::new("startpos", depth), &depth, |b, &depth| {
            b.iter(|| {
                let board = Board::new();
                let tt = TranspositionTable::new(16);
                let params = SearchParams::default();
                let limits = SearchLimits::depth(depth);
                let stop = AtomicBool::new(false);
                let spec = SearchSpec {
                    board: &board,
                    tt: &tt,
                    evaluator: &MaterialEvaluator,
                    params: &params,
                    limits: &limits,
                    stop: &stop,
                    threads: 1,
                    mode: ParallelMode::WorkStealing,
                    info_callback: None,
                };
                black_box(run_search(&spec).best_move)
            });
        });
    }

    group.finish();
}

fn bench_eval(c: &mut Criterion) {
    let mut group = c.benchmark_group("eval");

    let positions = [
        ("startpos", Board::new()),
        ("kiwipete", Board::try_from_fen(KIWIPETE).unwrap()),
        ("endgame", Board::try_from_fen("8/5k2/8/8/8/8/5K2/4R3 w - - 0 1").unwrap()),
    ];

    let evaluator = Arc::new(MaterialEvaluator);
    for (name, board) in positions {
        group.bench_with_input(BenchmarkId::new("material", name), &board, |b, board| {
            b.iter(|| black_box(evaluator.evaluate(board)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_perft,
    bench_movegen,
    bench_attack_lookup,
    bench_search,
    bench_eval
);
criterion_main!(benches);
