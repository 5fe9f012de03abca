//! The bench and perft entry points: fixed positions, fixed depths,
//! reproducible numbers.

use chess::board::Board;
use colored::Colorize;
use engine::pool::MctsConfig;
use engine::pool::SearchPool;
use engine::position::Position;
use engine::search::SearchSettings;
use engine::time_control::TimeController;
use itertools::Itertools;
use rayon::prelude::*;
use std::time::Duration;
use std::time::Instant;
use uci::time_control::TimeControl;

/// A hand-picked spread: openings, tactical middlegames, simple and tricky
/// endgames, so the bench exercises every corner of the search.
const BENCH_POSITIONS: [&str; 12] = [
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
    "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
    "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
    "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1",
    "6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1",
    "1k1r4/pp1b1R2/3q2pp/4p3/2B5/4Q3/PPP2B2/2K5 b - - 0 1",
    "r1bq1rk1/pp2bppp/2n2n2/3p2B1/3P4/2NBP3/PP3PPP/R2QK1NR w KQ - 0 9",
    "8/8/1p6/p1p5/P1P5/1P6/8/K6k w - - 0 1",
    "2r3k1/5pp1/p2p3p/1p1Pp3/1P2P3/P4P2/5P1P/2R3K1 b - - 0 1",
];

/// Run a fixed-depth search over the bench suite, printing per-position
/// and total node counts. The one number engine developers compare.
pub fn run(depth: usize) {
    let mut total_nodes = 0u64;
    let start = Instant::now();

    for (i, fen) in BENCH_POSITIONS.iter().enumerate() {
        let position = Position::new(fen.parse().expect("bench positions are valid"));
        let mut pool = SearchPool::new(16, 1);

        let (tc, _handle) = TimeController::new(
            TimeControl::Depth(depth),
            position.board.current,
            false,
            Duration::ZERO,
        );

        let search_start = Instant::now();
        let outcome = pool.search(
            &position,
            &tc,
            &SearchSettings::default(),
            &MctsConfig::default(),
            None,
        );

        let nodes = pool.nodes_searched();
        total_nodes += nodes;

        eprintln!(
            "{} {fen}: {} nodes, best {}, {} ms",
            format!("[{:2}/{}]", i + 1, BENCH_POSITIONS.len()).bright_blue(),
            nodes,
            outcome.best_move,
            search_start.elapsed().as_millis(),
        );
    }

    let elapsed = start.elapsed();
    let nps = (1000 * total_nodes).checked_div(elapsed.as_millis() as u64).unwrap_or(0);

    println!("{total_nodes} nodes {nps} nps");
}

////////////////////////////////////////////////////////////////////////////////
//
// Perft
//
////////////////////////////////////////////////////////////////////////////////

/// Print the per-move breakdown and the total, in the format every perft
/// debugging tool expects.
pub fn perft_divide(board: &Board, depth: usize) {
    let start = Instant::now();
    let results = board.perft_divide(depth);
    let total: u64 = results.iter().map(|(_, nodes)| nodes).sum();

    for (mv, nodes) in results.iter().sorted_by_key(|(mv, _)| mv.to_string()) {
        println!("{mv}: {nodes}");
    }

    println!();
    println!("Nodes searched: {total}");

    let elapsed = start.elapsed();
    let nps = (1000 * total).checked_div(elapsed.as_millis() as u64).unwrap_or(0);
    eprintln!("({} ms, {} nps)", elapsed.as_millis(), nps);
}

/// The standard perft validation suite, run in parallel.
pub fn perft_suite() {
    const SUITE: [(&str, usize, u64); 6] = [
        ("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", 5, 4_865_609),
        ("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1", 4, 4_085_603),
        ("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1", 5, 674_624),
        ("r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1", 4, 422_333),
        ("rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8", 4, 2_103_487),
        ("r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10", 4, 3_894_594),
    ];

    let results: Vec<_> = SUITE
        .par_iter()
        .map(|&(fen, depth, expected)| {
            let board: Board = fen.parse().expect("suite positions are valid");
            let nodes = board.perft(depth);
            (fen, depth, expected, nodes)
        })
        .collect();

    let mut all_good = true;

    for (fen, depth, expected, nodes) in results {
        let verdict = if nodes == expected {
            "ok".green()
        } else {
            all_good = false;
            format!("FAIL (expected {expected})").red()
        };

        println!("perft({depth}) {fen} = {nodes} {verdict}");
    }

    if all_good {
        println!("{}", "suite passed".green());
    } else {
        println!("{}", "suite FAILED".red());
        std::process::exit(1);
    }
}
