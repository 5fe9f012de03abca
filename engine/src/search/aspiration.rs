//! Aspiration windows.
//!
//! After the first few iterations, the previous score is an excellent guess
//! for the next one, so the root search starts with a window only a few
//! dozen centipawns wide. Most of the time the score lands inside it and
//! the whole iteration gets the benefit of the tight bounds; when it
//! doesn't, the window is re-opened on the side that failed, exponentially,
//! until the score fits.

use super::params::*;
use super::SearchRunner;
use crate::evaluate::Score;
use crate::evaluate::ScoreExt;
use crate::history_tables::pv::PVTable;
use crate::position::Position;

impl SearchRunner<'_> {
    /// One depth's root search for the current MultiPV slot, windowed
    /// around `guess`. Returns the settled score and its PV.
    pub(crate) fn aspiration_search<const MAIN: bool>(
        &mut self,
        pos: &Position,
        guess: Score,
    ) -> (Score, PVTable) {
        let mut pv = PVTable::new();

        let trust_guess = guess.abs() < Score::TB_WIN
            && self.depth as usize >= ASPIRATION_MIN_DEPTH;

        let mut delta = if trust_guess {
            ASPIRATION_BASE_DELTA + guess * guess / ASPIRATION_DELTA_DIVISOR
        } else {
            ASPIRATION_BASE_DELTA
        };

        let (mut alpha, mut beta) = if trust_guess {
            (
                (guess - delta).max(Score::MINUS_INF),
                (guess + delta).min(Score::PLUS_INF),
            )
        } else {
            (Score::MINUS_INF, Score::PLUS_INF)
        };

        // Consecutive fail-highs trim the re-search depth: the move that
        // keeps blowing past beta will justify itself at lower depth too.
        let mut fail_high_count = 0;

        loop {
            pv.clear();

            let adjusted_depth = (self.depth - fail_high_count).max(1);
            let score =
                self.negamax::<true>(pos, 0, adjusted_depth, alpha, beta, &mut pv, false, false);

            if self.aborted {
                return (score, pv);
            }

            if score <= alpha {
                // Fail low: drop alpha, and pull beta towards the middle so
                // a wild score swing settles faster
                beta = (alpha + beta) / 2;
                alpha = (score - delta).max(Score::MINUS_INF);
                fail_high_count = 0;

                if MAIN {
                    self.root_moves[self.pv_idx].score = score;
                    self.root_moves[self.pv_idx].upperbound = true;
                    self.root_moves[self.pv_idx].lowerbound = false;
                    self.report_bound(pos);
                }
            } else if score >= beta {
                beta = (score + delta).min(Score::PLUS_INF);
                fail_high_count += 1;

                if MAIN {
                    self.root_moves[self.pv_idx].score = score;
                    self.root_moves[self.pv_idx].lowerbound = true;
                    self.root_moves[self.pv_idx].upperbound = false;
                    self.report_bound(pos);
                }
            } else {
                if MAIN {
                    self.root_moves[self.pv_idx].lowerbound = false;
                    self.root_moves[self.pv_idx].upperbound = false;
                }

                return (score, pv);
            }

            // Widen geometrically
            delta += delta / 3;
        }
    }
}
