//! Quiescence search: keep resolving captures (and checks) past the
//! nominal horizon, so the score we eventually trust isn't taken from the
//! middle of a piece trade.

use super::params::*;
use super::SearchRunner;
use crate::evaluate::evaluate;
use crate::evaluate::Score;
use crate::evaluate::ScoreExt;
use crate::move_picker::MovePicker;
use crate::move_picker::PickerMode;
use crate::position::Position;
use crate::transpositions::Bound;
use chess::moves::Move;
use chess::see::piece_value;
use chess::piece::PieceType;

impl SearchRunner<'_> {
    pub(crate) fn quiescence(
        &mut self,
        pos: &Position,
        ply: usize,
        mut alpha: Score,
        beta: Score,
    ) -> Score {
        if self.aborted {
            return Score::MINUS_INF;
        }

        if !self.tc.should_continue(self.nodes.local()) {
            self.aborted = true;
            return Score::MINUS_INF;
        }

        self.nodes.increment();
        self.seldepth = self.seldepth.max(ply);

        if pos.board.is_rule_draw() || pos.is_repetition() {
            return Score::DRAW;
        }

        let in_check = pos.board.in_check();

        ////////////////////////////////////////////////////////////////////////
        //
        // Transposition table: quiescence entries are stored at depth 0, so
        // anything usable in the table can cut here.
        //
        ////////////////////////////////////////////////////////////////////////

        let (tt_entry, tt_writer) = self.tt.probe(pos.hash);

        if let Some(entry) = tt_entry {
            if let Some(score) = entry.usable_score(0, alpha, beta, ply, pos.board.halfmoves) {
                return score;
            }
        }

        let tt_move = tt_entry
            .map(|entry| entry.mv)
            .filter(|&mv| mv != Move::NULL);

        ////////////////////////////////////////////////////////////////////////
        //
        // Stand pat: not being forced to capture, the static eval is a
        // floor on what this position is worth.
        //
        ////////////////////////////////////////////////////////////////////////

        let (raw_eval, static_eval) = if in_check {
            // No standing pat while in check; something must be played
            (Score::NO_SCORE, Score::NO_SCORE)
        } else {
            let raw_eval = match tt_entry {
                Some(entry) if entry.eval != Score::NO_SCORE => entry.eval,
                _ => evaluate(&pos.board),
            };

            (raw_eval, self.history.correct_eval(pos, raw_eval))
        };

        let mut best_score = if in_check { Score::MINUS_INF } else { static_eval };

        if ply >= MAX_DEPTH - 1 {
            return best_score.max(Score::mated_in(ply));
        }

        if !in_check {
            if best_score >= beta {
                return best_score;
            }

            if best_score > alpha {
                alpha = best_score;
            }
        }

        let futility_base = static_eval + QS_FUTILITY_BASE;

        ////////////////////////////////////////////////////////////////////////
        //
        // Walk the tacticals (or every evasion, when in check)
        //
        ////////////////////////////////////////////////////////////////////////

        let mut picker = MovePicker::new(
            pos,
            tt_move,
            self.history.killers(ply),
            None,
            PickerMode::Quiescence,
        );

        let mut best_move = None;
        let mut move_count = 0;
        let mut quiet_evasions = 0;

        while let Some(mv) = picker.next(&self.history) {
            ////////////////////////////////////////////////////////////////////
            //
            // Per-move pruning, none of which applies while in check
            //
            ////////////////////////////////////////////////////////////////////

            if !in_check {
                // Futility: even capturing this victim for free wouldn't
                // bring us back to alpha
                let victim = pos
                    .board
                    .get_at(mv.tgt())
                    .map(|piece| piece.piece_type())
                    .unwrap_or(PieceType::Pawn);

                if mv.is_capture()
                    && !mv.is_promotion()
                    && futility_base + piece_value(victim) <= alpha
                {
                    continue;
                }

                // Losing exchanges don't rescue anything either
                if !pos.board.see(mv, 0) {
                    continue;
                }
            }

            // Escaping check with quiet moves is allowed, but only a couple
            // of times per node, or perpetual-check lines explode
            if in_check && mv.is_quiet() {
                if quiet_evasions >= QS_MAX_QUIET_EVASIONS && best_score > -Score::TB_WIN {
                    picker.skip_quiets = true;
                    continue;
                }

                quiet_evasions += 1;
            }

            ////////////////////////////////////////////////////////////////////
            //
            // Recurse
            //
            ////////////////////////////////////////////////////////////////////

            self.history.push_mv(&pos.board, mv);
            self.tt.prefetch(pos.approx_hash_after(mv));

            let next = pos.play_move(mv);
            let score = -self.quiescence(&next, ply + 1, -beta, -alpha);

            self.history.pop_mv();
            move_count += 1;

            if self.aborted {
                return Score::MINUS_INF;
            }

            if score > best_score {
                best_score = score;
            }

            if score >= beta {
                best_move = Some(mv);
                break;
            }

            if score > alpha {
                alpha = score;
                best_move = Some(mv);
            }
        }

        // In check with no legal way out: that's mate, even at the horizon
        if in_check && move_count == 0 {
            return Score::mated_in(ply);
        }

        ////////////////////////////////////////////////////////////////////////
        //
        // Store what we learned
        //
        ////////////////////////////////////////////////////////////////////////

        let bound = if best_score >= beta {
            Bound::Lower
        } else {
            Bound::Upper
        };

        tt_writer.write(
            best_score,
            raw_eval,
            0,
            bound,
            best_move.unwrap_or(Move::NULL),
            false,
            ply,
        );

        best_score
    }
}
