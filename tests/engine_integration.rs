//! End-to-end tests through the public engine API.

use std::sync::Arc;

use parking_lot::Mutex;

use sabre::engine::{Engine, EngineError, SearchLimits};
use sabre::search::{SearchIterationInfo, MATE_THRESHOLD};

#[test]
fn test_game_sequence_and_search() {
    let mut engine = Engine::new(16);
    for mv in ["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "g8f6"] {
        engine.apply_uci_move(mv).unwrap();
    }

    let outcome = engine.search(&SearchLimits::depth(5)).unwrap();
    let best = outcome.best_move.expect("a best move");

    // The reported move must be playable.
    engine.apply_uci_move(&best.to_string()).unwrap();
}

#[test]
fn test_fen_position_and_mate_report() {
    let mut engine = Engine::new(16);
    engine
        .set_position_from_fen("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1")
        .unwrap();

    let outcome = engine.search(&SearchLimits::depth(4)).unwrap();
    assert!(outcome.score >= MATE_THRESHOLD);
    assert_eq!(outcome.mate_in, Some(1));
    assert_eq!(outcome.best_move.unwrap().to_string(), "a1a8");
}

#[test]
fn test_malformed_fen_keeps_position() {
    let mut engine = Engine::new(16);
    engine.apply_uci_move("d2d4").unwrap();
    let fen_before = engine.board().to_fen();

    assert!(matches!(
        engine.set_position_from_fen("rubbish"),
        Err(EngineError::MalformedFen(_))
    ));
    assert_eq!(engine.board().to_fen(), fen_before);
}

#[test]
fn test_info_records_per_depth() {
    let records: Arc<Mutex<Vec<SearchIterationInfo>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&records);

    let mut engine = Engine::new(16);
    engine.set_info_callback(Arc::new(move |info| {
        sink.lock().push(info.clone());
    }));
    engine.search(&SearchLimits::depth(4)).unwrap();

    let records = records.lock();
    assert!(!records.is_empty());
    // Depths arrive strictly increasing, each with a PV and node counts.
    for pair in records.windows(2) {
        assert!(pair[0].depth < pair[1].depth);
    }
    for info in records.iter() {
        assert!(!info.pv.is_empty());
        assert!(info.nodes > 0);
        assert!(info.seldepth >= info.depth || info.depth <= 2);
    }
}

#[test]
fn test_threaded_search_with_options() {
    let mut engine = Engine::new(16);
    engine.set_option("Threads", "4").unwrap();
    engine.set_option("ParallelMode", "LazySMP").unwrap();

    engine
        .set_position_from_fen(
            "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4",
        )
        .unwrap();
    let outcome = engine.search(&SearchLimits::depth(6)).unwrap();
    assert!(outcome.best_move.is_some());
    assert!(outcome.nodes > 0);

    engine.set_option("ParallelMode", "WorkStealing").unwrap();
    let outcome = engine.search(&SearchLimits::depth(6)).unwrap();
    assert!(outcome.best_move.is_some());
}

#[test]
fn test_time_limited_search_terminates() {
    let mut engine = Engine::new(16);
    let start = std::time::Instant::now();
    let outcome = engine.search(&SearchLimits::time(200)).unwrap();
    assert!(start.elapsed().as_millis() < 2_000);
    assert!(outcome.best_move.is_some());
}

#[test]
fn test_hash_maintenance() {
    let mut engine = Engine::new(4);
    engine.search(&SearchLimits::depth(4)).unwrap();
    assert!(engine.tt_stats().probes > 0);

    engine.resize_hash(8).unwrap();
    engine.clear_hash();
    assert_eq!(engine.hashfull_per_mille(), 0);
}

#[test]
fn test_search_on_checkmated_position() {
    // Fool's mate delivered: White is already mated, no move exists.
    let mut engine = Engine::new(4);
    engine
        .set_position_from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3")
        .unwrap();
    let outcome = engine.search(&SearchLimits::depth(3)).unwrap();
    assert!(outcome.best_move.is_none());
    assert!(outcome.score <= -MATE_THRESHOLD);
}
