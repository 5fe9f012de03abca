//! The search: iterative deepening around a negamax alpha-beta core.
//!
//! Each worker owns one `SearchRunner`: its stack, its history tables, its
//! root move list. Workers share exactly three things: the transposition
//! table, the global node counter, and the stop flag. Everything else that
//! looks shared is a per-worker copy, and the small divergences between
//! those copies are what spread the workers across different parts of the
//! tree.
//!
//! The driver in this module walks depths 1, 2, 3, ... and hands each depth
//! to an aspiration-window search per MultiPV line. Between iterations it
//! feeds stability statistics to the time controller, which decides whether
//! starting the next depth is worth the time we have left.

use crate::evaluate::Score;
use crate::evaluate::ScoreExt;
use crate::history_tables::pv::PVTable;
use crate::history_tables::History;
use crate::learning::LearningBook;
use crate::position::Position;
use crate::search::params::MAX_DEPTH;
use crate::style::StyleBias;
use crate::time_control::TimeController;
use crate::transpositions::TTable;
use chess::moves::Move;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;
use uci::engine::UciEngineMessage;
use uci::search_info::Bound as UciBound;
use uci::search_info::Score as UciScore;
use uci::search_info::SearchInfo;
use uci::time_control::TimeControl;
use uci::wdl::WDL_MODEL;

pub mod params;

mod aspiration;
mod negamax;
mod quiescence;
mod zero_window;

////////////////////////////////////////////////////////////////////////////////
//
// Root moves
//
////////////////////////////////////////////////////////////////////////////////

/// The running tally for one root move across iterations.
#[derive(Debug, Clone)]
pub struct RootMove {
    pub mv: Move,
    pub pv: Vec<Move>,
    pub score: Score,
    pub prev_score: Score,
    pub avg_score: Score,
    pub seldepth: usize,
    pub lowerbound: bool,
    pub upperbound: bool,
}

impl RootMove {
    fn new(mv: Move) -> Self {
        Self {
            mv,
            pv: vec![mv],
            score: Score::MINUS_INF,
            prev_score: Score::MINUS_INF,
            avg_score: Score::MINUS_INF,
            seldepth: 0,
            lowerbound: false,
            upperbound: false,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
//
// Search settings
//
////////////////////////////////////////////////////////////////////////////////

/// The option-driven knobs a search runs under.
#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub multipv: usize,
    pub show_wdl: bool,
    pub style: StyleBias,
    pub search_moves: Vec<Move>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            multipv: 1,
            show_wdl: false,
            style: StyleBias::default(),
            search_moves: Vec::new(),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
//
// Search stack
//
////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Copy, Clone)]
pub(crate) struct SearchStackEntry {
    /// The (corrected) static eval at this ply, NO_SCORE while in check
    pub eval: Score,

    /// A move excluded at this ply by a singular verification search
    pub excluded: Option<Move>,

    /// How many double extensions the path here has spent
    pub double_exts: u8,

    /// Whether this node was ever part of a TT principal variation
    pub tt_pv: bool,
}

impl Default for SearchStackEntry {
    fn default() -> Self {
        Self {
            eval: Score::NO_SCORE,
            excluded: None,
            double_exts: 0,
            tt_pv: false,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
//
// The runner
//
////////////////////////////////////////////////////////////////////////////////

pub struct SearchRunner<'a> {
    /// Worker id; worker 0 is "main" and owns timekeeping and reporting
    pub id: usize,

    pub tt: &'a TTable,
    pub history: Box<History>,
    pub nodes: NodeCounter<'a>,
    pub tc: TimeController,
    pub settings: SearchSettings,
    pub learning: Option<&'a LearningBook>,

    /// The current nominal iteration depth
    pub depth: i32,

    /// The deepest completed iteration
    pub completed_depth: i32,

    /// The deepest ply touched this iteration (quiescence included)
    pub seldepth: usize,

    pub root_moves: Vec<RootMove>,

    /// The MultiPV slot currently being searched
    pub pv_idx: usize,

    /// Root moves still eligible in the current MultiPV pass
    pub(crate) root_filter: Vec<Move>,

    pub(crate) stack: [SearchStackEntry; MAX_DEPTH],

    /// Below this ply, null moves are disabled by a running verification
    pub(crate) nmp_min_ply: usize,

    pub(crate) aborted: bool,

    /// Reporting throttle state
    search_start: Instant,
    last_report: Instant,
}

impl<'a> SearchRunner<'a> {
    pub fn new(id: usize, tt: &'a TTable, nodes: NodeCounter<'a>) -> Self {
        // Placeholder controller; each search installs its own.
        let (tc, _) = TimeController::new(
            TimeControl::Infinite,
            chess::piece::Color::White,
            false,
            Duration::ZERO,
        );

        Self {
            id,
            tt,
            history: History::new(),
            nodes,
            tc,
            settings: SearchSettings::default(),
            learning: None,
            depth: 1,
            completed_depth: 0,
            seldepth: 0,
            root_moves: Vec::new(),
            pv_idx: 0,
            root_filter: Vec::new(),
            stack: [SearchStackEntry::default(); MAX_DEPTH],
            nmp_min_ply: 0,
            aborted: false,
            search_start: Instant::now(),
            last_report: Instant::now(),
        }
    }

    fn reinit(&mut self, start_depth: i32) {
        self.depth = start_depth;
        self.completed_depth = 0;
        self.seldepth = 0;
        self.pv_idx = 0;
        self.stack = [SearchStackEntry::default(); MAX_DEPTH];
        self.nmp_min_ply = 0;
        self.aborted = false;
        self.nodes.clear_local();
        self.history.clear_nodes();
        self.search_start = Instant::now();
        self.last_report = self.search_start;
    }

    ////////////////////////////////////////////////////////////////////////////
    //
    // Iterative deepening
    //
    ////////////////////////////////////////////////////////////////////////////

    /// Run the full iterative-deepening loop on `pos` and return the best
    /// line found. `MAIN` workers additionally report progress and feed the
    /// time controller.
    pub fn iterative_deepening<const MAIN: bool>(&mut self, pos: &Position) -> SearchOutcome {
        // Helpers start at staggered depths so they don't all chew on the
        // same tree in lockstep.
        let start_depth = if self.id == 0 { 1 } else { 1 + (self.id % 3) as i32 };
        self.reinit(start_depth);

        self.root_moves = pos
            .board
            .legal_moves()
            .into_iter()
            .filter(|mv| {
                self.settings.search_moves.is_empty()
                    || self.settings.search_moves.contains(mv)
            })
            .map(RootMove::new)
            .collect();

        if self.root_moves.is_empty() {
            let outcome = SearchOutcome::none(pos);

            // Mated or stalemated at the root: still tell the host what the
            // position is worth before the null bestmove goes out.
            if MAIN {
                let score = if outcome.score.is_mate() {
                    UciScore::mate(0)
                } else {
                    UciScore::cp(0)
                };

                let info = SearchInfo {
                    depth: Some(0),
                    score: Some(score),
                    ..Default::default()
                };

                println!("{}", UciEngineMessage::Info(info));
            }

            return outcome;
        }

        if MAIN && self.root_moves.len() == 1 {
            self.tc.stop_early();
        }

        let multipv = self.settings.multipv.clamp(1, self.root_moves.len());
        let mut prev_best: Option<Move> = None;
        let mut prev_score = 0;
        let mut bm_stability = 0;
        let mut score_stability = 0;

        while (self.depth as usize) < MAX_DEPTH
            && self
                .tc
                .should_start_search(self.depth as usize, self.nodes.local())
        {
            self.seldepth = 0;
            self.history.clear_all_killers();

            // Scores are wiped before every iteration: a stale score from a
            // previous depth must never outrank a freshly searched one.
            for root in self.root_moves.iter_mut() {
                if root.score != Score::MINUS_INF {
                    root.prev_score = root.score;
                }

                root.score = Score::MINUS_INF;
                root.lowerbound = false;
                root.upperbound = false;
            }

            ////////////////////////////////////////////////////////////////////
            //
            // One aspiration search per MultiPV slot
            //
            ////////////////////////////////////////////////////////////////////

            for pv_idx in 0..multipv {
                self.pv_idx = pv_idx;
                self.root_filter = self.root_moves[pv_idx..]
                    .iter()
                    .map(|root| root.mv)
                    .collect();

                let guess = self.root_moves[pv_idx].prev_score;
                let (score, pv) = self.aspiration_search::<MAIN>(pos, guess);

                if self.aborted {
                    break;
                }

                self.store_root_result(pv_idx, score, &pv);

                // Keep the finished slots sorted best-first
                self.root_moves[pv_idx..]
                    .sort_by(|a, b| b.score.cmp(&a.score));
            }

            if self.aborted {
                break;
            }

            self.completed_depth = self.depth;

            if MAIN {
                self.report_lines(pos, multipv, false);

                ////////////////////////////////////////////////////////////////
                //
                // Feed the time controller
                //
                ////////////////////////////////////////////////////////////////

                let best_mv = self.root_moves[0].mv;
                let best_score = self.root_moves[0].score;

                if prev_best == Some(best_mv) {
                    bm_stability += 1;
                } else {
                    bm_stability = 0;
                }
                prev_best = Some(best_mv);

                if (best_score - prev_score).abs() <= 10 {
                    score_stability += 1;
                } else {
                    score_stability = 0;
                }
                prev_score = best_score;

                let bm_nodes = self.history.get_nodes(best_mv);
                let node_frac = bm_nodes as f64 / self.nodes.local().max(1) as f64;

                self.tc.update(bm_stability, node_frac, score_stability);

                // `go mate N`: stop once a mate within N moves is proven
                if let TimeControl::Mate(moves) = self.tc.kind() {
                    if best_score.is_mate()
                        && best_score > 0
                        && ((best_score.mate_distance() + 1) / 2) as usize <= moves
                    {
                        self.tc.stop();
                        break;
                    }
                }
            }

            self.depth += 1;
        }

        self.nodes.flush();

        if MAIN {
            // The final lines always go out, whatever the throttle says
            self.report_lines(pos, multipv, true);
        }

        SearchOutcome::from_runner(self, pos)
    }

    /// Write one finished aspiration result back into the root move list.
    fn store_root_result(&mut self, pv_idx: usize, score: Score, pv: &PVTable) {
        let best_move = match pv.pv_move() {
            Some(mv) => mv,
            None => self.root_moves[pv_idx].mv,
        };

        let slot = self.root_moves[pv_idx..]
            .iter()
            .position(|root| root.mv == best_move)
            .map(|offset| pv_idx + offset)
            .unwrap_or(pv_idx);

        let root = &mut self.root_moves[slot];

        root.score = score;
        root.avg_score = if root.avg_score == Score::MINUS_INF {
            score
        } else {
            (root.avg_score + score) / 2
        };

        if !pv.moves().is_empty() {
            root.pv = pv.moves().to_vec();
        }

        root.seldepth = self.seldepth;

        // Pull the freshly searched move to the front of its segment
        self.root_moves[pv_idx..=slot].rotate_right(1);
    }

    ////////////////////////////////////////////////////////////////////////////
    //
    // Reporting
    //
    ////////////////////////////////////////////////////////////////////////////

    /// The reporting schedule: depth 1 goes out immediately, then every
    /// 100ms for the first second, every second for the first minute, and
    /// every ten seconds after that.
    fn report_due(&self) -> bool {
        let elapsed = self.search_start.elapsed();
        let since_last = self.last_report.elapsed();

        if self.depth <= 1 {
            true
        } else if elapsed < Duration::from_secs(1) {
            since_last >= Duration::from_millis(100)
        } else if elapsed < Duration::from_secs(60) {
            since_last >= Duration::from_secs(1)
        } else {
            since_last >= Duration::from_secs(10)
        }
    }

    /// Emit one `info` line per MultiPV slot.
    fn report_lines(&mut self, pos: &Position, multipv: usize, force: bool) {
        if self.completed_depth == 0 || (!force && !self.report_due()) {
            return;
        }

        self.last_report = Instant::now();

        for idx in 0..multipv.min(self.root_moves.len()) {
            let line = self.line_info(pos, idx);
            println!("{}", UciEngineMessage::Info(line));
        }
    }

    /// Build the `info` payload for one root line.
    pub(crate) fn line_info(&self, pos: &Position, idx: usize) -> SearchInfo {
        let root = &self.root_moves[idx];
        let elapsed = self.tc.elapsed();
        let nodes = self.nodes.global();

        let nps = (1_000_000 * nodes)
            .checked_div(elapsed.as_micros() as u64)
            .unwrap_or_default();

        let bound = if root.lowerbound {
            UciBound::Lower
        } else if root.upperbound {
            UciBound::Upper
        } else {
            UciBound::Exact
        };

        let score = root.score;
        let wdl_params = WDL_MODEL.params(&pos.board);

        // Mate scores report their move distance; everything else leaves
        // the engine rescaled to the protocol's centipawn convention.
        let uci_score = if score.is_mate() {
            UciScore::mate(score.signum() * (score.mate_distance() + 1) / 2)
        } else {
            UciScore::cp(wdl_params.normalized(score))
        }
        .with_bound(bound);

        let wdl = self.settings.show_wdl.then(|| wdl_params.wdl(score));

        SearchInfo {
            depth: Some(self.completed_depth.max(1) as u8),
            seldepth: Some(root.seldepth.max(self.seldepth) as u8),
            multipv: Some(idx as u32 + 1),
            score: Some(uci_score),
            time: Some(elapsed.as_millis() as u64),
            nodes: Some(nodes),
            nps: Some(nps),
            hashfull: Some(self.tt.hashfull()),
            tbhits: Some(0),
            wdl,
            currmove: None,
            currmovenumber: None,
            pv: root.pv.clone(),
        }
    }

    /// Report a line produced by the Monte-Carlo search, which has no root
    /// move list to draw on.
    pub(crate) fn report_mcts_line(
        &mut self,
        pos: &Position,
        depth: i32,
        score: Score,
        pv: Vec<Move>,
        force: bool,
    ) {
        if !force && !self.report_due() {
            return;
        }

        self.last_report = Instant::now();

        let elapsed = self.tc.elapsed();
        let nodes = self.nodes.global();

        let nps = (1_000_000 * nodes)
            .checked_div(elapsed.as_micros() as u64)
            .unwrap_or_default();

        let wdl_params = WDL_MODEL.params(&pos.board);

        let uci_score = if score.is_mate() {
            UciScore::mate(score.signum() * (score.mate_distance() + 1) / 2)
        } else {
            UciScore::cp(wdl_params.normalized(score))
        };

        let wdl = self.settings.show_wdl.then(|| wdl_params.wdl(score));

        let info = SearchInfo {
            depth: Some(depth.clamp(1, u8::MAX as i32) as u8),
            seldepth: Some(self.seldepth.max(pv.len()) as u8),
            multipv: Some(1),
            score: Some(uci_score),
            time: Some(elapsed.as_millis() as u64),
            nodes: Some(nodes),
            nps: Some(nps),
            hashfull: Some(self.tt.hashfull()),
            tbhits: Some(0),
            wdl,
            currmove: None,
            currmovenumber: None,
            pv,
        };

        println!("{}", UciEngineMessage::Info(info));
    }

    /// Report a fail-high/low at the root mid-iteration (long searches only).
    pub(crate) fn report_bound(&mut self, pos: &Position) {
        if self.tc.elapsed() >= Duration::from_secs(3) && self.report_due() {
            self.last_report = Instant::now();
            let line = self.line_info(pos, self.pv_idx);
            println!("{}", UciEngineMessage::Info(line));
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
//
// Outcomes
//
////////////////////////////////////////////////////////////////////////////////

/// What a worker's deepening loop produced, in the shape the pool needs to
/// pick a winner and report.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub best_move: Move,
    pub ponder: Option<Move>,
    pub score: Score,
    pub depth: i32,
    pub pv: Vec<Move>,
}

impl SearchOutcome {
    /// The no-legal-moves outcome: mate or stalemate at the root.
    fn none(pos: &Position) -> Self {
        let score = if pos.board.in_check() {
            Score::mated_in(0)
        } else {
            Score::DRAW
        };

        Self {
            best_move: Move::NULL,
            ponder: None,
            score,
            depth: 0,
            pv: Vec::new(),
        }
    }

    fn from_runner(runner: &SearchRunner, pos: &Position) -> Self {
        let root = &runner.root_moves[0];

        // If no iteration finished, fall back to any legal move rather than
        // resigning on the spot.
        let best_move = root.mv;

        let score = if root.score != Score::MINUS_INF {
            root.score
        } else if root.prev_score != Score::MINUS_INF {
            root.prev_score
        } else {
            0
        };

        // The ponder move: second PV move, or the TT's best reply
        let ponder = root.pv.get(1).copied().or_else(|| {
            let next = pos.play_move(best_move);
            let (entry, _) = runner.tt.probe(next.hash);

            entry
                .map(|entry| entry.mv)
                .filter(|&mv| mv != Move::NULL && next.board.find_move(mv.into()).is_some())
        });

        Self {
            best_move,
            ponder,
            score,
            depth: runner.completed_depth.max(1),
            pv: root.pv.clone(),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
//
// Node counter
//
////////////////////////////////////////////////////////////////////////////////

/// A per-worker node counter that drips into a shared global count in
/// batches, so the hot path stays free of atomic traffic.
#[derive(Clone)]
pub struct NodeCounter<'a> {
    local: u64,
    buffer: u64,
    global: &'a AtomicU64,
}

impl<'a> NodeCounter<'a> {
    const FLUSH_INTERVAL: u64 = 2048;

    pub fn new(global: &'a AtomicU64) -> Self {
        Self {
            global,
            local: 0,
            buffer: 0,
        }
    }

    pub fn increment(&mut self) {
        self.local += 1;
        self.buffer += 1;

        if self.buffer >= Self::FLUSH_INTERVAL {
            self.flush();
        }
    }

    /// Push any locally buffered counts into the shared total.
    pub fn flush(&mut self) {
        self.global.fetch_add(self.buffer, Ordering::Relaxed);
        self.buffer = 0;
    }

    /// This worker's own count.
    pub fn local(&self) -> u64 {
        self.local
    }

    /// Every worker's count, as of the last flushes.
    pub fn global(&self) -> u64 {
        self.global.load(Ordering::Relaxed) + self.buffer
    }

    pub fn clear_local(&mut self) {
        self.local = 0;
        self.buffer = 0;
    }

    pub fn clear_global(&self) {
        self.global.store(0, Ordering::Relaxed);
    }
}
