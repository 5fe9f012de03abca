//! The worker pool: lazy SMP.
//!
//! Every worker searches the same root with the same algorithm; they share
//! the transposition table, the stop flag and a node counter, and nothing
//! else. No splitting, no work queues: the helpers are useful because their
//! private history tables and staggered start depths make them explore
//! different subtrees, and everything any of them learns lands in the TT
//! where the others can find it.
//!
//! Worker 0 is "main": it runs the clock, reports progress, and raises the
//! stop flag when it finishes or times out. The rest run until they see the
//! flag. When the Monte-Carlo mode is on, a configurable slice of the
//! helpers descends the MCTS tree instead of running alpha-beta.

use crate::evaluate::ScoreExt;
use crate::history_tables::History;
use crate::learning::LearningBook;
use crate::mcts::MctsParams;
use crate::mcts::MctsSearch;
use crate::mcts::MctsTree;
use crate::position::Position;
use crate::search::NodeCounter;
use crate::search::SearchOutcome;
use crate::search::SearchRunner;
use crate::search::SearchSettings;
use crate::time_control::TimeController;
use crate::transpositions::TTable;
use chess::moves::Move;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

/// How the Monte-Carlo mode is wired into the pool.
#[derive(Debug, Clone)]
pub struct MctsConfig {
    pub enabled: bool,

    /// How many helper workers run MCTS instead of alpha-beta
    pub threads: usize,

    pub params: MctsParams,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threads: 1,
            params: MctsParams::default(),
        }
    }
}

pub struct SearchPool {
    tt: TTable,
    mcts: Option<MctsTree>,

    /// One persistent history per worker, carried across searches
    histories: Vec<Box<History>>,

    global_nodes: AtomicU64,
    threads: usize,
}

impl SearchPool {
    pub fn new(tt_mb: usize, threads: usize) -> Self {
        let threads = threads.max(1);

        Self {
            tt: TTable::with_capacity(tt_mb, threads),
            mcts: None,
            histories: (0..threads).map(|_| History::new()).collect(),
            global_nodes: AtomicU64::new(0),
            threads,
        }
    }

    /// Reshape to exactly `n` workers.
    pub fn set_threads(&mut self, n: usize) {
        self.threads = n.max(1);
        self.histories
            .resize_with(self.threads, History::new);
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn resize_tt(&mut self, mb: usize) {
        self.tt.resize(mb, self.threads);
    }

    pub fn tt(&self) -> &TTable {
        &self.tt
    }

    /// Nodes searched by all workers in the last (or current) search.
    pub fn nodes_searched(&self) -> u64 {
        self.global_nodes.load(Ordering::Relaxed)
    }

    /// Forget everything: TT, histories, and the Monte-Carlo tree.
    pub fn clear(&mut self) {
        self.tt.clear(self.threads);
        self.histories = (0..self.threads).map(|_| History::new()).collect();

        if let Some(tree) = &mut self.mcts {
            tree.clear();
        }
    }

    /// Make sure the MCTS arena exists (it's a few dozen MB, so it's only
    /// allocated once the option asks for it).
    pub fn enable_mcts(&mut self, enabled: bool) {
        if enabled && self.mcts.is_none() {
            self.mcts = Some(MctsTree::new());
        }
    }

    ////////////////////////////////////////////////////////////////////////////
    //
    // Running a search
    //
    ////////////////////////////////////////////////////////////////////////////

    /// Search `pos` with every worker and return the best line any of them
    /// found. Blocks until all workers have come home.
    pub fn search(
        &mut self,
        pos: &Position,
        tc: &TimeController,
        settings: &SearchSettings,
        mcts_cfg: &MctsConfig,
        learning: Option<&LearningBook>,
    ) -> SearchOutcome {
        self.tt.new_search();
        self.global_nodes.store(0, Ordering::Relaxed);

        let tt = &self.tt;
        let global_nodes = &self.global_nodes;
        let mcts_tree = self.mcts.as_ref().filter(|_| mcts_cfg.enabled);

        if let Some(tree) = mcts_tree {
            tree.set_threads(self.threads);
        }

        let mut outcomes = Vec::with_capacity(self.threads);

        std::thread::scope(|scope| {
            let mut histories = self.histories.iter_mut();
            let main_history = histories.next().expect("the pool always has a main worker");

            ////////////////////////////////////////////////////////////////////
            //
            // Helpers first; they'll spin on the TT until main catches up
            //
            ////////////////////////////////////////////////////////////////////

            let handles: Vec<_> = histories
                .enumerate()
                .map(|(idx, history)| {
                    let id = idx + 1;
                    let tc = tc.helper();
                    let settings = settings.clone();
                    let params = mcts_cfg.params.clone();
                    let runs_mcts = mcts_tree.is_some() && id <= mcts_cfg.threads;

                    scope.spawn(move || {
                        let mut runner =
                            SearchRunner::new(id, tt, NodeCounter::new(global_nodes));

                        std::mem::swap(&mut runner.history, history);
                        runner.tc = tc;
                        runner.settings = settings;
                        runner.learning = learning;

                        let outcome = match mcts_tree {
                            Some(tree) if runs_mcts => {
                                MctsSearch::new(tree, &mut runner, params).search::<false>(pos)
                            }
                            _ => runner.iterative_deepening::<false>(pos),
                        };

                        std::mem::swap(&mut runner.history, history);
                        outcome
                    })
                })
                .collect();

            ////////////////////////////////////////////////////////////////////
            //
            // Main runs right here on the pool thread
            //
            ////////////////////////////////////////////////////////////////////

            let mut runner = SearchRunner::new(0, tt, NodeCounter::new(global_nodes));

            std::mem::swap(&mut runner.history, main_history);
            runner.tc = tc.clone();
            runner.settings = settings.clone();
            runner.learning = learning;

            // With a single thread, an enabled MCTS runs on main itself;
            // otherwise main stays on alpha-beta and the helpers descend.
            let main_outcome = match mcts_tree {
                Some(tree) if self.threads == 1 => {
                    MctsSearch::new(tree, &mut runner, mcts_cfg.params.clone())
                        .search::<true>(pos)
                }
                _ => runner.iterative_deepening::<true>(pos),
            };

            std::mem::swap(&mut runner.history, main_history);

            // Main is done: everyone else packs up too
            tc.stop();

            outcomes.push(main_outcome);

            for handle in handles {
                outcomes.push(handle.join().expect("search workers don't panic"));
            }
        });

        select_best(outcomes)
    }
}

////////////////////////////////////////////////////////////////////////////////
//
// Best-thread selection
//
////////////////////////////////////////////////////////////////////////////////

/// Pick the outcome to report: among threads that completed within two
/// iterations of the deepest, the best score wins, with depth as the
/// tiebreak. A proven mate beats a deeper non-mate as long as the mate is
/// shorter than the other thread's horizon.
fn select_best(outcomes: Vec<SearchOutcome>) -> SearchOutcome {
    let max_depth = outcomes.iter().map(|o| o.depth).max().unwrap_or(0);

    let mut best: Option<&SearchOutcome> = None;

    for outcome in &outcomes {
        if outcome.best_move == Move::NULL {
            continue;
        }

        let Some(current) = best else {
            best = Some(outcome);
            continue;
        };

        let mate = outcome.score.is_mate() && outcome.score > 0;
        let current_mate = current.score.is_mate() && current.score > 0;

        // A mate short enough to fit inside the rival's horizon is proven;
        // completion depth stops mattering.
        if mate && !current_mate && outcome.score.mate_distance() <= current.depth {
            best = Some(outcome);
            continue;
        }

        if current_mate && !mate && current.score.mate_distance() <= outcome.depth {
            continue;
        }

        if outcome.depth < max_depth - 2 {
            continue;
        }

        if current.depth < max_depth - 2
            || outcome.score > current.score
            || (outcome.score == current.score && outcome.depth > current.depth)
        {
            best = Some(outcome);
        }
    }

    best.cloned()
        .unwrap_or_else(|| outcomes.into_iter().next().expect("at least one worker ran"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::Score;
    use crate::search::SearchSettings;
    use crate::time_control::TimeController;
    use chess::board::Board;
    use chess::piece::Color;
    use std::time::Duration;
    use uci::time_control::TimeControl;

    fn run(fen: &str, tc: TimeControl, threads: usize) -> SearchOutcome {
        let pos = Position::new(fen.parse().unwrap());
        let mut pool = SearchPool::new(8, threads);
        let (tc, _handle) =
            TimeController::new(tc, pos.board.current, false, Duration::ZERO);

        pool.search(
            &pos,
            &tc,
            &SearchSettings::default(),
            &MctsConfig::default(),
            None,
        )
    }

    #[test]
    fn finds_mate_in_one() {
        let outcome = run(
            "6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1",
            TimeControl::Depth(4),
            1,
        );

        assert_eq!(outcome.best_move.to_string(), "a1a8");
        assert_eq!(outcome.score, Score::mate_in(1));
    }

    #[test]
    fn stalemate_reports_null_move() {
        let outcome = run("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1", TimeControl::Depth(2), 1);

        assert_eq!(outcome.best_move, Move::NULL);
        assert_eq!(outcome.score, Score::DRAW);
    }

    #[test]
    fn checkmated_position_reports_mate_score() {
        // Back-rank mate already delivered; black to move
        let outcome = run("R5k1/5ppp/8/8/8/8/5PPP/6K1 b - - 0 1", TimeControl::Depth(2), 1);

        assert_eq!(outcome.best_move, Move::NULL);
        assert_eq!(outcome.score, Score::mated_in(0));
    }

    #[test]
    fn avoids_repetition_when_ahead(){
        // Up a queen: shuffling back and forth would throw the win away
        let outcome = run(
            "6k1/8/8/8/8/8/5PPP/3Q2K1 w - - 0 1",
            TimeControl::Depth(6),
            1,
        );

        assert!(outcome.score > 500);
        assert_ne!(outcome.best_move, Move::NULL);
    }

    #[test]
    fn multithreaded_searches_agree_on_forced_mate() {
        let outcome = run(
            "6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1",
            TimeControl::Depth(5),
            4,
        );

        assert_eq!(outcome.best_move.to_string(), "a1a8");
        assert_eq!(outcome.score, Score::mate_in(1));
    }

    #[test]
    fn mcts_mode_produces_a_legal_move() {
        let pos = Position::new(Board::default());
        let mut pool = SearchPool::new(8, 1);
        pool.enable_mcts(true);

        let (tc, _handle) = TimeController::new(
            TimeControl::Nodes(20_000),
            Color::White,
            false,
            Duration::ZERO,
        );

        let outcome = pool.search(
            &pos,
            &tc,
            &SearchSettings::default(),
            &MctsConfig {
                enabled: true,
                threads: 1,
                params: MctsParams::default(),
            },
            None,
        );

        assert!(pos.board.find_move(outcome.best_move.into()).is_some());
    }

    #[test]
    fn sidesteps_threefold_repetition() {
        // Knights have been shuffling: one more Ng1 is a threefold
        let mut pos = Position::new(Board::default());

        for mv in ["g1f3", "g8f6", "f3g1", "f6g8", "g1f3", "g8f6"] {
            pos = pos.play_bare_move(mv.parse().unwrap()).unwrap();
        }

        let mut pool = SearchPool::new(8, 1);
        let (tc, _handle) = TimeController::new(
            TimeControl::Depth(6),
            pos.board.current,
            false,
            Duration::ZERO,
        );

        let outcome = pool.search(
            &pos,
            &tc,
            &SearchSettings::default(),
            &MctsConfig::default(),
            None,
        );

        // The repetition line scores as a dead draw, so anything with
        // content beats shuffling back
        assert_ne!(outcome.best_move, Move::NULL);
        assert_ne!(outcome.best_move.to_string(), "f3g1");
    }

    #[test]
    fn warm_tt_makes_the_re_search_cheaper() {
        let pos = Position::new(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1"
                .parse()
                .unwrap(),
        );

        let mut pool = SearchPool::new(16, 1);
        let settings = SearchSettings::default();
        let mcts = MctsConfig::default();

        let (tc, _h) =
            TimeController::new(TimeControl::Depth(9), Color::White, false, Duration::ZERO);
        let first = pool.search(&pos, &tc, &settings, &mcts, None);
        let first_nodes = pool.nodes_searched();

        let (tc, _h) =
            TimeController::new(TimeControl::Depth(9), Color::White, false, Duration::ZERO);
        let second = pool.search(&pos, &tc, &settings, &mcts, None);
        let second_nodes = pool.nodes_searched();

        assert_eq!(first.best_move, second.best_move);
        assert!(
            second_nodes < first_nodes,
            "warm TT: {second_nodes} nodes vs cold {first_nodes}"
        );
    }

    #[test]
    fn stop_flag_ends_an_infinite_search() {
        let pos = Position::new(Board::default());
        let mut pool = SearchPool::new(8, 2);

        let (tc, handle) = TimeController::new(
            TimeControl::Infinite,
            Color::White,
            false,
            Duration::ZERO,
        );

        // Pull the plug from another thread shortly after the search starts
        let stopper = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            handle.stop();
        });

        // If the workers ignored the flag, this would never return
        let outcome = pool.search(
            &pos,
            &tc,
            &SearchSettings::default(),
            &MctsConfig::default(),
            None,
        );

        stopper.join().unwrap();
        assert_ne!(outcome.best_move, Move::NULL);
    }

    #[test]
    fn search_moves_restricts_the_root() {
        let pos = Position::new(Board::default());
        let mut pool = SearchPool::new(8, 1);

        let only = pos.board.find_move("a2a3".parse().unwrap()).unwrap();
        let settings = SearchSettings {
            search_moves: vec![only],
            ..Default::default()
        };

        let (tc, _handle) = TimeController::new(
            TimeControl::Depth(5),
            Color::White,
            false,
            Duration::ZERO,
        );

        let outcome = pool.search(&pos, &tc, &settings, &MctsConfig::default(), None);

        assert_eq!(outcome.best_move, only);
    }
}
