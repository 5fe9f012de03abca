//! The negamax core: fail-soft alpha-beta with the full complement of
//! pruning, reduction and extension heuristics layered on top.
//!
//! Each heuristic is a bet that some part of the tree doesn't need a full
//! look. The bets are staggered from cheapest to dearest: a TT cutoff costs
//! one probe, a null-move verification costs a reduced search, a singular
//! check costs an exclusion search. Anything that survives them all gets
//! recursed on for real.

use super::params::*;
use super::SearchRunner;
use crate::evaluate::evaluate;
use crate::evaluate::Score;
use crate::evaluate::ScoreExt;
use crate::history_tables::history::HistoryScore;
use crate::history_tables::pv::PVTable;
use crate::move_picker::MovePicker;
use crate::move_picker::PickerMode;
use crate::move_picker::Stage;
use crate::position::Position;
use crate::transpositions::Bound;
use chess::movegen::MoveList;
use chess::moves::Move;

impl SearchRunner<'_> {
    /// Search `pos` to `depth` within the window `(alpha, beta)`.
    ///
    /// Fail-soft: the returned score may fall outside the window, carrying
    /// a tighter bound back to the caller than the window itself would.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn negamax<const PV: bool>(
        &mut self,
        pos: &Position,
        ply: usize,
        mut depth: i32,
        mut alpha: Score,
        mut beta: Score,
        pv: &mut PVTable,
        try_null: bool,
        cutnode: bool,
    ) -> Score {
        if self.aborted {
            return Score::MINUS_INF;
        }

        let in_root = PV && ply == 0;
        let us = pos.board.current;
        let in_check = pos.board.in_check();
        let excluded = self.stack[ply].excluded;

        // When in check, make sure we always look at least one ply further.
        if in_check && !in_root {
            depth += 1;
        }

        // The horizon: resolve the tactical noise before trusting any score.
        if depth <= 0 && !in_check {
            return self.quiescence(pos, ply, alpha, beta);
        }

        self.nodes.increment();
        self.seldepth = self.seldepth.max(ply);

        if ply > 0 {
            self.stack[ply].double_exts = self.stack[ply - 1].double_exts;
        }

        if !in_root {
            ////////////////////////////////////////////////////////////////////
            //
            // Draws, depth caps, and mate-distance pruning
            //
            ////////////////////////////////////////////////////////////////////

            if pos.board.is_rule_draw() || pos.is_repetition() {
                return Score::DRAW;
            }

            if ply >= MAX_DEPTH - 1 {
                return if in_check { Score::DRAW } else { evaluate(&pos.board) };
            }

            // No line from here can be better than the fastest mate we
            // could still deliver, or worse than the fastest one we could
            // still suffer. Narrow the window accordingly.
            alpha = alpha.max(Score::mated_in(ply));
            beta = beta.min(Score::mate_in(ply + 1));

            if alpha >= beta {
                return alpha;
            }
        }

        ////////////////////////////////////////////////////////////////////////
        //
        // Transposition table
        //
        ////////////////////////////////////////////////////////////////////////

        let (tt_entry, tt_writer) = if excluded.is_none() {
            let (entry, writer) = self.tt.probe(pos.hash);
            (entry, Some(writer))
        } else {
            // A singular verification must not be contaminated by (or
            // overwrite) the entry for the unrestricted node.
            (None, None)
        };

        let tt_move = tt_entry
            .map(|entry| entry.mv)
            .filter(|&mv| mv != Move::NULL);

        // Cut on the stored score where the bounds allow it. Near the
        // 50-move horizon the stored score may belong to a now-drawn line
        // (the dreaded graph-history interaction), so stop trusting it.
        if !PV && !in_root && pos.board.halfmoves < 90 {
            if let Some(entry) = tt_entry {
                if let Some(score) =
                    entry.usable_score(depth, alpha, beta, ply, pos.board.halfmoves)
                {
                    return score;
                }
            }
        }

        ////////////////////////////////////////////////////////////////////////
        //
        // Learning table
        //
        // On a TT miss, a persisted-learning hit of sufficient depth may cut
        // just like a TT lower bound would.
        //
        ////////////////////////////////////////////////////////////////////////

        if !PV && !in_root && tt_entry.is_none() && excluded.is_none() {
            if let Some(book) = self.learning {
                if let Some(hit) = book.probe(pos.hash) {
                    if hit.depth as i32 >= depth && hit.score >= beta {
                        return hit.score;
                    }
                }
            }
        }

        ////////////////////////////////////////////////////////////////////////
        //
        // Static evaluation, with correction history applied
        //
        ////////////////////////////////////////////////////////////////////////

        let raw_eval = if in_check {
            Score::NO_SCORE
        } else if let Some(entry) = tt_entry {
            if entry.eval != Score::NO_SCORE {
                entry.eval
            } else {
                evaluate(&pos.board)
            }
        } else {
            evaluate(&pos.board)
        };

        let static_eval = if in_check {
            Score::NO_SCORE
        } else if excluded.is_some() {
            // Unchanged position: reuse the eval the unrestricted node left
            self.stack[ply].eval
        } else {
            self.history.correct_eval(pos, raw_eval)
        };

        self.stack[ply].eval = static_eval;

        let tt_pv = PV || tt_entry.is_some_and(|entry| entry.pv);
        self.stack[ply].tt_pv = tt_pv;

        // Children should only see killers planted by their own siblings.
        self.history.clear_killers(ply + 1);

        // Better off than two plies ago? Loosens fail-high pruning,
        // tightens fail-low pruning.
        let improving = !in_check
            && ply >= 2
            && self.stack[ply - 2].eval != Score::NO_SCORE
            && static_eval > self.stack[ply - 2].eval;

        ////////////////////////////////////////////////////////////////////////
        //
        // Whole-node pruning: razoring, reverse futility, null move,
        // ProbCut. All of it only outside PV nodes and only out of check.
        //
        ////////////////////////////////////////////////////////////////////////

        if !PV && !in_check && excluded.is_none() {
            // Razoring: an eval so far below alpha that only a tactic could
            // save it; ask quiescence directly.
            if depth <= RAZOR_MAX_DEPTH
                && static_eval + RAZOR_BASE + RAZOR_MARGIN * depth < alpha
            {
                let score = self.quiescence(pos, ply, alpha, beta);

                if score < alpha {
                    return score;
                }
            }

            // Reverse futility: an eval comfortably above beta at shallow
            // depth almost never comes back down.
            let rfp_margin = RFP_MARGIN * depth - RFP_IMPROVING_MARGIN * improving as i32
                + self.settings.style.futility_delta;

            if !tt_pv
                && depth <= RFP_MAX_DEPTH
                && static_eval.abs() < Score::TB_WIN
                && static_eval - rfp_margin >= beta
            {
                return (static_eval + beta) / 2;
            }

            ////////////////////////////////////////////////////////////////////
            //
            // Null-move pruning
            //
            // Hand the opponent a free move; if the reduced search still
            // fails high, the real position is surely a cutoff. Verified
            // at high depth by a re-search with null moves disabled, since
            // zugzwang makes the free-move logic lie.
            //
            ////////////////////////////////////////////////////////////////////

            if try_null
                && ply >= self.nmp_min_ply
                && depth >= NMP_MIN_DEPTH
                && static_eval >= beta
                && beta > -Score::TB_WIN
                && pos.board.has_non_pawn_material(us)
            {
                let reduction = (NMP_BASE_REDUCTION
                    + depth / NMP_DEPTH_DIVISOR
                    + ((static_eval - beta) / NMP_EVAL_DIVISOR).min(NMP_MAX_EVAL_REDUCTION))
                .min(depth);

                self.history.push_null_mv();

                let null_score = -self.zero_window(
                    &pos.play_null_move(),
                    ply + 1,
                    depth - reduction,
                    -beta + 1,
                    false,
                    !cutnode,
                );

                self.history.pop_mv();

                if self.aborted {
                    return Score::MINUS_INF;
                }

                if null_score >= beta {
                    // Never return unproven mates out of a null search
                    let null_score = if null_score >= Score::TB_WIN {
                        beta
                    } else {
                        null_score
                    };

                    if self.nmp_min_ply > 0 || depth < 12 {
                        return null_score;
                    }

                    // Verification: same depth budget, null moves off below
                    // this ply until the verification completes.
                    self.nmp_min_ply = ply + (3 * (depth - reduction) / 4) as usize;
                    let verified =
                        self.zero_window(pos, ply, depth - reduction, beta, false, false);
                    self.nmp_min_ply = 0;

                    if verified >= beta {
                        return null_score;
                    }
                }
            }

            ////////////////////////////////////////////////////////////////////
            //
            // ProbCut
            //
            // If a good capture beats beta by a margin even at reduced
            // depth, the full-depth search is almost certain to as well.
            //
            ////////////////////////////////////////////////////////////////////

            let probcut_beta = beta + PROBCUT_MARGIN - 40 * improving as i32;

            if depth >= PROBCUT_MIN_DEPTH
                && beta.abs() < Score::TB_WIN
                && !tt_entry.is_some_and(|entry| {
                    entry.depth >= depth - 3 && entry.value.from_tt(ply, pos.board.halfmoves) < probcut_beta
                })
            {
                let threshold = probcut_beta - static_eval;
                let mut picker = MovePicker::new(
                    pos,
                    tt_move,
                    self.history.killers(ply),
                    None,
                    PickerMode::ProbCut(threshold),
                );

                while let Some(mv) = picker.next(&self.history) {
                    if Some(mv) == excluded {
                        continue;
                    }

                    self.history.push_mv(&pos.board, mv);
                    let next = pos.play_move(mv);

                    // A quick quiescence look first; only on promise do we
                    // pay for the reduced verification search.
                    let mut score =
                        -self.quiescence(&next, ply + 1, -probcut_beta, -probcut_beta + 1);

                    if score >= probcut_beta && depth > PROBCUT_REDUCTION {
                        score = -self.zero_window(
                            &next,
                            ply + 1,
                            depth - PROBCUT_REDUCTION,
                            -probcut_beta + 1,
                            true,
                            !cutnode,
                        );
                    }

                    self.history.pop_mv();

                    if self.aborted {
                        return Score::MINUS_INF;
                    }

                    if score >= probcut_beta {
                        if let Some(writer) = tt_writer {
                            writer.write(
                                score,
                                raw_eval,
                                depth - 3,
                                Bound::Lower,
                                mv,
                                tt_pv,
                                ply,
                            );
                        }

                        return score;
                    }
                }
            }
        }

        ////////////////////////////////////////////////////////////////////////
        //
        // Internal iterative reduction: no TT move means the ordering here
        // is guesswork; spend less on this visit and let the TT fill in.
        //
        ////////////////////////////////////////////////////////////////////////

        if tt_move.is_none() && depth >= IIR_MIN_DEPTH && (PV || cutnode) {
            depth -= 1;
        }

        ////////////////////////////////////////////////////////////////////////
        //
        // Singular extension candidate
        //
        ////////////////////////////////////////////////////////////////////////

        let se_candidate = tt_entry
            .filter(|entry| {
                depth >= SE_MIN_DEPTH
                    && !in_root
                    && excluded.is_none()
                    && entry.bound != Bound::Upper
                    && entry.depth >= depth - SE_TT_DEPTH_SLACK
                    && !entry.value.from_tt(ply, pos.board.halfmoves).is_mate()
            })
            .map(|entry| entry.mv)
            .filter(|&mv| mv != Move::NULL);

        ////////////////////////////////////////////////////////////////////////
        //
        // The move loop
        //
        ////////////////////////////////////////////////////////////////////////

        let mut picker = MovePicker::new(
            pos,
            tt_move,
            self.history.killers(ply),
            self.history.countermove(),
            PickerMode::Normal,
        );

        let mut move_count: usize = 0;
        let mut quiets_tried = MoveList::new();
        let mut tacticals_tried = MoveList::new();
        let mut best_move: Option<Move> = None;
        let mut best_score = Score::MINUS_INF;
        let mut bound = Bound::Upper;
        let mut local_pv = PVTable::new();

        while let Some(mv) = picker.next(&self.history) {
            if Some(mv) == excluded {
                continue;
            }

            if in_root && !self.root_filter.contains(&mv) {
                continue;
            }

            if !self.tc.should_continue(self.nodes.local()) {
                self.aborted = true;
                return Score::MINUS_INF;
            }

            local_pv.clear();

            let quiet = mv.is_quiet();
            let lmr_depth = (depth - lmr_reduction(depth, move_count)).max(0);

            ////////////////////////////////////////////////////////////////////
            //
            // Shallow move-loop pruning. Only once some move has produced a
            // non-losing score: the first move is always searched in full.
            //
            ////////////////////////////////////////////////////////////////////

            if !in_root && best_score > -Score::TB_WIN {
                // Late move pruning: deep into the list at low depth,
                // quiets stop being worth generating at all
                let lmp_threshold =
                    ((LMP_BASE + depth * depth) / (2 - improving as i32)) as usize;

                if !PV && !in_check && depth <= LMP_MAX_DEPTH && move_count >= lmp_threshold {
                    picker.skip_quiets = true;
                }

                // Futility: a hopeless eval plus a quiet move stays hopeless
                let futility = FP_BASE
                    + FP_MARGIN * lmr_depth
                    + self.settings.style.futility_delta;

                if !PV
                    && !in_check
                    && quiet
                    && lmr_depth <= FP_MAX_DEPTH
                    && static_eval + futility < alpha
                {
                    picker.skip_quiets = true;
                    continue;
                }

                // History pruning: a move everyone keeps sneering at
                if !in_check
                    && depth <= HP_MAX_DEPTH
                    && picker.stage() > Stage::GoodTacticals
                    && picker.current_score() < HP_MARGIN * depth
                {
                    if quiet {
                        picker.skip_quiets = true;
                    }

                    continue;
                }

                // SEE pruning: losing exchanges, scaled by depth
                if picker.stage() > Stage::GoodTacticals && move_count > 0 {
                    let margin = if quiet {
                        -SEE_QUIET_MARGIN * depth
                    } else {
                        -SEE_TACTICAL_MARGIN * depth
                    };

                    if !pos.board.see(mv, margin) {
                        continue;
                    }
                }
            }

            ////////////////////////////////////////////////////////////////////
            //
            // Singular extensions
            //
            // Exclude the TT move and search the rest shallower, against a
            // window just below the TT score. If nothing comes close, the
            // TT move is "singular" and deserves extra depth. If instead
            // the exclusion search already beats beta, more than one move
            // refutes this node: multicut, return at once.
            //
            ////////////////////////////////////////////////////////////////////

            let mut extension: i32 = 0;

            if se_candidate == Some(mv) {
                let tt_value = tt_entry
                    .expect("a singular candidate always has a TT entry")
                    .value
                    .from_tt(ply, pos.board.halfmoves);

                let se_beta = (tt_value - SE_MARGIN * depth).max(-Score::MATE);
                let se_depth = (depth - 1) / 2;

                self.stack[ply].excluded = Some(mv);
                let value = self.zero_window(pos, ply, se_depth, se_beta, false, cutnode);
                self.stack[ply].excluded = None;

                if self.aborted {
                    return Score::MINUS_INF;
                }

                if value < se_beta {
                    extension = 1;

                    if !PV
                        && value + DOUBLE_EXT_MARGIN < se_beta
                        && self.stack[ply].double_exts <= DOUBLE_EXT_MAX
                    {
                        extension = 2;
                        self.stack[ply].double_exts += 1;
                    }
                } else if se_beta >= beta {
                    return se_beta;
                } else if tt_value >= beta {
                    // Negative extension: probably one of several refuters,
                    // not worth full depth
                    extension = -1;
                }
            }

            ////////////////////////////////////////////////////////////////////
            //
            // Play the move and recurse: principal variation search
            //
            ////////////////////////////////////////////////////////////////////

            self.history.push_mv(&pos.board, mv);
            self.tt.prefetch(pos.approx_hash_after(mv));

            let next = pos.play_move(mv);
            let gives_check = next.board.in_check();
            let new_depth = depth - 1 + extension;
            let nodes_before = self.nodes.local();

            let mut score;

            if move_count == 0 {
                // First move: full window, full depth
                score = -self.negamax::<PV>(
                    &next,
                    ply + 1,
                    new_depth,
                    -beta,
                    -alpha,
                    &mut local_pv,
                    false,
                    !(PV || cutnode),
                );
            } else {
                ////////////////////////////////////////////////////////////////
                //
                // Late move reductions: the picker put this move late for a
                // reason; search it shallower, and only on a surprise
                // fail-high give it the full treatment.
                //
                ////////////////////////////////////////////////////////////////

                let mut reduction = 0;

                if depth >= LMR_MIN_DEPTH && move_count >= LMR_MIN_MOVES + PV as usize {
                    reduction = lmr_reduction(depth, move_count);

                    // Quiets and bad tacticals reduce more
                    reduction += (picker.stage() > Stage::GoodTacticals) as i32;

                    // Expected cutnodes reduce more
                    reduction += 2 * cutnode as i32;

                    // A tactical TT move makes later quiets less promising
                    reduction += tt_move.is_some_and(|mv| mv.is_tactical()) as i32;

                    // Anything near the PV reduces less
                    reduction -= 2 * tt_pv as i32;

                    // Checks on either side deserve a real look
                    reduction -= in_check as i32;
                    reduction -= gives_check as i32;

                    // Let the history tables speak
                    if quiet {
                        reduction -= picker.current_score() / LMR_HISTORY_DIVISOR;
                    }

                    reduction += self.settings.style.reduction_delta;
                    reduction = reduction.clamp(0, new_depth.max(1) - 1);
                }

                // Zero-window scout at reduced depth
                score = -self.zero_window(
                    &next,
                    ply + 1,
                    new_depth - reduction,
                    -alpha,
                    true,
                    true,
                );

                // Fail-high on the reduced search: retry at full depth
                if score > alpha && reduction > 0 {
                    score = -self.zero_window(&next, ply + 1, new_depth, -alpha, true, !cutnode);
                }

                // Still above alpha in a PV node: full window re-search
                if PV && score > alpha && score < beta {
                    score = -self.negamax::<true>(
                        &next,
                        ply + 1,
                        new_depth,
                        -beta,
                        -alpha,
                        &mut local_pv,
                        false,
                        false,
                    );
                }
            }

            self.history.pop_mv();
            move_count += 1;

            if in_root {
                let spent = self.nodes.local() - nodes_before;
                self.history.add_nodes(mv, spent as u32);
            }

            if self.aborted {
                return Score::MINUS_INF;
            }

            ////////////////////////////////////////////////////////////////////
            //
            // Fail-soft bookkeeping
            //
            ////////////////////////////////////////////////////////////////////

            if score > best_score {
                best_score = score;
            }

            if score >= beta {
                bound = Bound::Lower;
                best_move = Some(mv);
                break;
            }

            if score > alpha {
                alpha = score;
                bound = Bound::Exact;
                best_move = Some(mv);
                pv.add_to_front(mv, &local_pv);
            }

            // Everyone searched without a cutoff is in line for a penalty
            if quiet {
                quiets_tried.push(mv);
            } else if mv.is_tactical() {
                tacticals_tried.push(mv);
            }
        }

        ////////////////////////////////////////////////////////////////////////
        //
        // No moves at all: mate, stalemate, or an exclusion search that
        // excluded the only move.
        //
        ////////////////////////////////////////////////////////////////////////

        if move_count == 0 {
            if excluded.is_some() {
                return alpha;
            }

            return if in_check {
                Score::mated_in(ply)
            } else {
                Score::DRAW
            };
        }

        ////////////////////////////////////////////////////////////////////////
        //
        // History updates on a cutoff
        //
        ////////////////////////////////////////////////////////////////////////

        if bound == Bound::Lower {
            let best = best_move.expect("a fail-high always has a best move");
            let bonus = HistoryScore::bonus(depth);

            if best.is_quiet() {
                self.history.update_quiet(pos, best, bonus);
                self.history.add_killer(ply, best);
                self.history.add_countermove(best);

                for &mv in quiets_tried.iter().filter(|&&mv| mv != best) {
                    self.history.update_quiet(pos, mv, -bonus);
                }
            } else if best.is_tactical() {
                self.history.update_tactical(&pos.board, best, bonus);
            }

            for &mv in tacticals_tried.iter().filter(|&&mv| mv != best) {
                self.history.update_tactical(&pos.board, mv, -bonus);
            }
        }

        if excluded.is_none() {
            ////////////////////////////////////////////////////////////////////
            //
            // Correction history: remember how far the static eval missed,
            // when the score is usable as evidence against it.
            //
            ////////////////////////////////////////////////////////////////////

            if !in_check
                && !best_move.is_some_and(|mv| mv.is_tactical())
                && !(bound == Bound::Lower && best_score <= static_eval)
                && !(bound == Bound::Upper && best_score >= static_eval)
            {
                let keys = self.history.corr_keys(pos);
                self.history
                    .corr_hist
                    .update(&keys, best_score, static_eval, depth);
            }

            ////////////////////////////////////////////////////////////////////
            //
            // Store the result
            //
            ////////////////////////////////////////////////////////////////////

            if let Some(writer) = tt_writer {
                writer.write(
                    best_score,
                    raw_eval,
                    depth,
                    bound,
                    best_move.unwrap_or(Move::NULL),
                    tt_pv,
                    ply,
                );
            }
        }

        best_score
    }
}
