//! Time management: deciding when a search must stop.
//!
//! Two deadlines matter. The *hard* limit is non-negotiable: when it hits,
//! the ongoing search unwinds and reports whatever it has. The *soft* limit
//! only gates the start of new iterations: a new depth we can't plausibly
//! finish is time wasted. The soft limit breathes during the search,
//! shrinking when the best move looks settled and stretching when the
//! iterations keep changing their mind.
//!
//! Pondering trumps all of it: while we're searching on the opponent's
//! time, nothing stops the search except an explicit `stop` or a
//! `ponderhit` converting it into a normal timed search.

use chess::piece::Color;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;
use uci::time_control::TimeControl;

/// How many nodes may pass between checks of the clock and the stop flag.
const CHECKUP_WINDOW: u64 = 1024;

/// The fraction of the remaining clock we may never exceed, whatever the
/// increments promise.
const LIMIT_FRAC: u32 = 76;

/// Soft/hard deadlines as fractions (percent) of the per-move budget.
const SOFT_FRAC: u32 = 76;
const HARD_FRAC: u32 = 304;

/// Per-move budget as a fraction (permille) of the remaining time when no
/// movestogo was given.
const BASE_FRAC: u32 = 54;

/// How much of the increment counts towards the per-move budget (percent).
const INC_FRAC: u32 = 75;

#[derive(Debug, Clone)]
pub struct TimeController {
    tc: TimeControl,

    /// When the search started (the `go`, not the `ponderhit`)
    start: Instant,

    base_soft_time: Duration,
    soft_time: Duration,
    hard_time: Duration,

    /// Shared flags, visible to every worker and the input thread
    stop: Arc<AtomicBool>,
    pondering: Arc<AtomicBool>,

    /// The next node count at which to look at the clock again
    next_checkup: u64,

    /// Set when the position is forced and iterating deeper is pointless
    stop_early: bool,

    // Soft-time scale factors fed back from the iterative deepening loop
    bm_stability_factor: f64,
    node_frac_factor: f64,
    score_stability_factor: f64,
}

impl TimeController {
    /// Soft-time scales by how many iterations the best move has survived.
    const BESTMOVE_STABILITY: [f64; 5] = [2.50, 1.20, 0.90, 0.80, 0.75];

    /// Soft-time scales by how stable the reported score has been.
    const SCORE_STABILITY: [f64; 5] = [1.25, 1.15, 1.00, 0.94, 0.88];

    /// Build a controller for one `go` command, plus the handle the input
    /// thread keeps to stop or ponderhit the search.
    pub fn new(
        tc: TimeControl,
        side: Color,
        ponder: bool,
        overhead: Duration,
    ) -> (Self, TimeControlHandle) {
        let stop = Arc::new(AtomicBool::new(false));
        let pondering = Arc::new(AtomicBool::new(ponder));

        let handle = TimeControlHandle {
            stop: stop.clone(),
            pondering: pondering.clone(),
        };

        let mut controller = TimeController {
            tc,
            start: Instant::now(),
            base_soft_time: Duration::default(),
            soft_time: Duration::default(),
            hard_time: Duration::default(),
            stop,
            pondering,
            next_checkup: CHECKUP_WINDOW,
            stop_early: false,
            bm_stability_factor: 1.0,
            node_frac_factor: 1.0,
            score_stability_factor: 1.0,
        };

        match tc {
            TimeControl::FixedTime(movetime) => {
                controller.hard_time = movetime.saturating_sub(overhead);
                controller.soft_time = controller.hard_time;
            }

            TimeControl::Clock { wtime, btime, winc, binc, movestogo } => {
                let time = if side.is_white() { wtime } else { btime };
                let inc = if side.is_white() { winc } else { binc };
                let inc = inc.unwrap_or_default();

                let allowed = time.saturating_sub(overhead);
                let limit = LIMIT_FRAC * allowed / 100;

                // Budget for this move: an even share of the moves we still
                // expect to play, plus most of the increment.
                let budget = if let Some(movestogo) = movestogo {
                    allowed / movestogo.max(1) + INC_FRAC * inc / 100
                } else {
                    BASE_FRAC * allowed / 1000 + INC_FRAC * inc / 100
                };

                controller.hard_time = (HARD_FRAC * budget / 100).min(limit);
                controller.base_soft_time = (SOFT_FRAC * budget / 100).min(limit);
                controller.soft_time = controller.base_soft_time;
            }

            _ => {}
        }

        (controller, handle)
    }

    /// May the search keep expanding the current iteration? Checked from
    /// the move loop; cheap until the node counter crosses the next checkup
    /// mark.
    pub fn should_continue(&mut self, nodes: u64) -> bool {
        if nodes < self.next_checkup {
            return true;
        }

        self.next_checkup = nodes.saturating_add(CHECKUP_WINDOW);

        if self.stopped() {
            return false;
        }

        // While pondering, only the stop flag can end the search
        if self.pondering() {
            return true;
        }

        let keep_going = match self.tc {
            TimeControl::Nodes(max_nodes) => nodes < max_nodes,
            TimeControl::FixedTime(_) => self.elapsed() < self.hard_time,
            TimeControl::Clock { .. } => self.elapsed() < self.hard_time,
            _ => true,
        };

        // A breached hard limit stops every worker, not just this one
        if !keep_going {
            self.stop();
        }

        keep_going
    }

    /// A controller for a helper worker: same shared flags, but no limits
    /// of its own. Helpers stop when the main worker raises the stop flag.
    pub fn helper(&self) -> Self {
        Self {
            tc: TimeControl::Infinite,
            next_checkup: CHECKUP_WINDOW,
            ..self.clone()
        }
    }

    /// Is starting an iteration at `depth` still worth it?
    pub fn should_start_search(&self, depth: usize, nodes: u64) -> bool {
        // Always complete at least one iteration, or there's no move to play
        if depth <= 1 {
            return true;
        }

        if self.stopped() {
            return false;
        }

        if self.pondering() {
            return true;
        }

        match self.tc {
            TimeControl::Depth(max_depth) => depth <= max_depth,
            TimeControl::Nodes(max_nodes) => nodes < max_nodes,
            TimeControl::FixedTime(_) => self.elapsed() < self.hard_time,

            TimeControl::Clock { .. } => {
                if self.stop_early {
                    return false;
                }

                let mut soft = self.soft_time.as_millis() as f64;
                soft *= self.bm_stability_factor;
                soft *= self.node_frac_factor;

                if depth >= 7 {
                    soft *= self.score_stability_factor;
                }

                (self.elapsed().as_millis() as f64) < soft
            }

            // Infinite and mate searches run until stopped (the driver cuts
            // a mate search short once the mate is proven)
            _ => true,
        }
    }

    /// Feed back the stability statistics gathered by the deepening loop.
    pub fn update(&mut self, bm_stability: usize, node_frac: f64, score_stability: usize) {
        self.bm_stability_factor = Self::BESTMOVE_STABILITY[bm_stability.min(4)];
        self.score_stability_factor = Self::SCORE_STABILITY[score_stability.min(4)];
        self.node_frac_factor = (1.52 - node_frac) * 1.74;
    }

    /// Don't bother starting another iteration (e.g. only one legal move).
    pub fn stop_early(&mut self) {
        self.stop_early = true;
    }

    pub fn stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    pub fn pondering(&self) -> bool {
        self.pondering.load(Ordering::Acquire)
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// The raw time control this search runs under.
    pub fn kind(&self) -> TimeControl {
        self.tc
    }

    /// Raise the stop flag ourselves (main worker, on a breached deadline).
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }
}

////////////////////////////////////////////////////////////////////////////////
//
// Handle
//
////////////////////////////////////////////////////////////////////////////////

/// The input thread's remote control for a running search.
#[derive(Clone)]
pub struct TimeControlHandle {
    stop: Arc<AtomicBool>,
    pondering: Arc<AtomicBool>,
}

impl TimeControlHandle {
    /// Stop the search as soon as every worker notices.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// The pondered-on move was played: switch to normal timing.
    pub fn ponderhit(&self) {
        self.pondering.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_limit_is_respected() {
        let (tc, _handle) =
            TimeController::new(TimeControl::Depth(6), Color::White, false, Duration::ZERO);

        assert!(tc.should_start_search(6, 0));
        assert!(!tc.should_start_search(7, 0));
    }

    #[test]
    fn stop_flag_ends_everything() {
        let (mut tc, handle) =
            TimeController::new(TimeControl::Infinite, Color::White, false, Duration::ZERO);

        assert!(tc.should_start_search(30, 0));
        assert!(tc.should_continue(u64::MAX));

        handle.stop();

        assert!(!tc.should_start_search(2, 0));
        assert!(!tc.should_continue(u64::MAX));
    }

    #[test]
    fn node_limits_bind() {
        let (mut tc, _handle) =
            TimeController::new(TimeControl::Nodes(5000), Color::White, false, Duration::ZERO);

        assert!(tc.should_continue(2000));
        assert!(!tc.should_continue(6000));
        assert!(!tc.should_start_search(2, 6000));
    }

    #[test]
    fn pondering_ignores_the_clock() {
        let (mut tc, handle) = TimeController::new(
            TimeControl::FixedTime(Duration::ZERO),
            Color::White,
            true,
            Duration::ZERO,
        );

        // Pondering: the exhausted movetime doesn't matter
        assert!(tc.should_continue(u64::MAX));
        assert!(tc.should_start_search(10, 0));

        // After the ponderhit the movetime binds again
        handle.ponderhit();
        assert!(!tc.should_continue(u64::MAX));
    }

    #[test]
    fn clock_budget_stays_below_remaining_time() {
        let (tc, _handle) = TimeController::new(
            TimeControl::Clock {
                wtime: Duration::from_millis(10_000),
                btime: Duration::from_millis(10_000),
                winc: Some(Duration::from_millis(100)),
                binc: Some(Duration::from_millis(100)),
                movestogo: None,
            },
            Color::White,
            false,
            Duration::from_millis(20),
        );

        assert!(tc.hard_time < Duration::from_millis(10_000));
        assert!(tc.soft_time <= tc.hard_time);
        assert!(tc.hard_time > Duration::ZERO);
    }
}
