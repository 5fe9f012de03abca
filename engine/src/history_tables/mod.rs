//! Every statistical table one worker keeps about its own search.
//!
//! None of this is shared: each worker owns a full set, and the divergence
//! between the workers' tables is precisely what makes the lazy-SMP threads
//! explore different trees.

use crate::evaluate::Score;
use crate::position::Position;
use crate::search::params::MAX_DEPTH;
use arrayvec::ArrayVec;
use capthist::CaptureHistoryTable;
use chess::board::Board;
use chess::moves::Move;
use chess::piece::PieceType;
use chess::square::Square;
use conthist::ContinuationHistoryTable;
use corrhist::CorrHistKeys;
use corrhist::CorrHistTable;
use countermoves::CountermoveTable;
use history::ButterflyTable;
use history::HistoryScore;
use history::PieceTo;
use killers::Killers;
use pawnhist::PawnHistoryTable;

pub mod capthist;
pub mod conthist;
pub mod corrhist;
pub mod countermoves;
pub mod history;
pub mod killers;
pub mod pawnhist;
pub mod pv;

/// The plies the continuation history chains back through.
const CONT_HIST_PLIES: [usize; 3] = [1, 2, 4];

#[derive(Debug)]
pub struct History {
    main_hist: Box<ButterflyTable>,
    pawn_hist: Box<PawnHistoryTable>,
    capt_hist: Box<CaptureHistoryTable>,
    cont_hist: Box<ContinuationHistoryTable>,
    pub corr_hist: Box<CorrHistTable>,
    countermoves: Box<CountermoveTable>,
    killers: [Killers; MAX_DEPTH],

    /// The (piece, to) of each move on the path from the root; None stands
    /// for a null move.
    indices: ArrayVec<Option<PieceTo>, MAX_DEPTH>,

    /// Nodes spent below each root move, for time-management purposes
    node_counts: [[u32; Square::COUNT]; Square::COUNT],
}

impl History {
    pub fn new() -> Box<Self> {
        Box::new(Self {
            main_hist: ButterflyTable::boxed(),
            pawn_hist: PawnHistoryTable::boxed(),
            capt_hist: CaptureHistoryTable::boxed(),
            cont_hist: ContinuationHistoryTable::boxed(),
            corr_hist: CorrHistTable::boxed(),
            countermoves: CountermoveTable::boxed(),
            killers: [Killers::new(); MAX_DEPTH],
            indices: ArrayVec::new(),
            node_counts: [[0; Square::COUNT]; Square::COUNT],
        })
    }

    ////////////////////////////////////////////////////////////////////////////
    //
    // The move path
    //
    ////////////////////////////////////////////////////////////////////////////

    pub fn push_mv(&mut self, board: &Board, mv: Move) {
        if !self.indices.is_full() {
            self.indices.push(Some(PieceTo::new(board, mv)));
        }
    }

    pub fn push_null_mv(&mut self) {
        if !self.indices.is_full() {
            self.indices.push(None);
        }
    }

    pub fn pop_mv(&mut self) {
        self.indices.pop();
    }

    /// The (piece, to) of the move played `plies_back` plies ago, if it
    /// wasn't a null move.
    fn played(&self, plies_back: usize) -> Option<PieceTo> {
        self.indices
            .len()
            .checked_sub(plies_back)
            .and_then(|idx| self.indices[idx])
    }

    pub fn last_played(&self) -> Option<PieceTo> {
        self.played(1)
    }

    ////////////////////////////////////////////////////////////////////////////
    //
    // Scoring and updating
    //
    ////////////////////////////////////////////////////////////////////////////

    /// The combined history score of a quiet move: butterfly + pawn-keyed +
    /// the continuation tables along the path.
    pub fn quiet_score(&self, pos: &Position, mv: Move) -> i32 {
        let index = PieceTo::new(&pos.board, mv);
        let mut total: i32 = self.main_hist[(pos.board.current, mv)].into();

        total += i32::from(self.pawn_hist[(pos.pawn_hash, index)]);

        for plies_back in CONT_HIST_PLIES {
            if let Some(prev) = self.played(plies_back) {
                total += i32::from(self.cont_hist[(prev, index)]);
            }
        }

        total
    }

    /// The history score of a capture.
    pub fn tactical_score(&self, board: &Board, mv: Move) -> i32 {
        let index = PieceTo::new(board, mv);
        i32::from(self.capt_hist[(index, victim_of(board, mv))])
    }

    /// Reward (or punish, for a negative bonus) a quiet move in all the
    /// tables that track quiets.
    pub fn update_quiet(&mut self, pos: &Position, mv: Move, bonus: HistoryScore) {
        let index = PieceTo::new(&pos.board, mv);

        self.main_hist[(pos.board.current, mv)] += bonus;
        self.pawn_hist[(pos.pawn_hash, index)] += bonus;

        for plies_back in CONT_HIST_PLIES {
            if let Some(prev) = self.played(plies_back) {
                self.cont_hist[(prev, index)] += bonus;
            }
        }
    }

    /// Reward or punish a capture.
    pub fn update_tactical(&mut self, board: &Board, mv: Move, bonus: HistoryScore) {
        let index = PieceTo::new(board, mv);
        self.capt_hist[(index, victim_of(board, mv))] += bonus;
    }

    ////////////////////////////////////////////////////////////////////////////
    //
    // Correction history
    //
    ////////////////////////////////////////////////////////////////////////////

    pub fn corr_keys(&self, pos: &Position) -> CorrHistKeys {
        CorrHistKeys {
            side: pos.board.current,
            pawn: pos.pawn_hash,
            minor: pos.minor_hash,
            nonpawn: pos.nonpawn_hashes,
            material: pos.material_hash,
            prev_move: self.last_played(),
        }
    }

    /// The corrected static eval for this position.
    pub fn correct_eval(&self, pos: &Position, raw_eval: Score) -> Score {
        raw_eval + self.corr_hist.correction(&self.corr_keys(pos))
    }

    ////////////////////////////////////////////////////////////////////////////
    //
    // Countermoves and killers
    //
    ////////////////////////////////////////////////////////////////////////////

    pub fn add_countermove(&mut self, mv: Move) {
        if let Some(prev) = self.last_played() {
            self.countermoves[prev] = mv;
        }
    }

    pub fn countermove(&self) -> Option<Move> {
        self.last_played()
            .map(|prev| self.countermoves[prev])
            .filter(|&mv| mv != Move::NULL)
    }

    pub fn add_killer(&mut self, ply: usize, mv: Move) {
        self.killers[ply.min(MAX_DEPTH - 1)].add(mv);
    }

    pub fn killers(&self, ply: usize) -> Killers {
        self.killers[ply.min(MAX_DEPTH - 1)]
    }

    pub fn clear_killers(&mut self, ply: usize) {
        self.killers[ply.min(MAX_DEPTH - 1)].clear();
    }

    pub fn clear_all_killers(&mut self) {
        self.killers = [Killers::new(); MAX_DEPTH];
    }

    ////////////////////////////////////////////////////////////////////////////
    //
    // Per-root-move node accounting
    //
    ////////////////////////////////////////////////////////////////////////////

    pub fn clear_nodes(&mut self) {
        self.node_counts = [[0; Square::COUNT]; Square::COUNT];
    }

    pub fn add_nodes(&mut self, mv: Move, nodes: u32) {
        self.node_counts[mv.src()][mv.tgt()] += nodes;
    }

    pub fn get_nodes(&self, mv: Move) -> u32 {
        self.node_counts[mv.src()][mv.tgt()]
    }
}

/// What a capture captured. En-passant (and anything else landing on an
/// empty square) counts as a pawn.
fn victim_of(board: &Board, mv: Move) -> PieceType {
    board
        .get_at(mv.tgt())
        .map(|piece| piece.piece_type())
        .unwrap_or(PieceType::Pawn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::moves::MoveKind;
    use chess::square::Square::*;

    #[test]
    fn quiet_updates_feed_back_into_scores() {
        let mut history = History::new();
        let pos = Position::new(Board::default());
        let mv = pos.board.find_move("g1f3".parse().unwrap()).unwrap();

        assert_eq!(history.quiet_score(&pos, mv), 0);

        history.update_quiet(&pos, mv, HistoryScore::bonus(8));
        let rewarded = history.quiet_score(&pos, mv);
        assert!(rewarded > 0);

        history.update_quiet(&pos, mv, -HistoryScore::bonus(8));
        assert!(history.quiet_score(&pos, mv) < rewarded);
    }

    #[test]
    fn continuation_history_depends_on_the_path() {
        let mut history = History::new();
        let root = Position::new(Board::default());

        let e4 = root.board.find_move("e2e4".parse().unwrap()).unwrap();
        let after_e4 = root.play_move(e4);
        let e5 = after_e4.board.find_move("e7e5".parse().unwrap()).unwrap();

        // Reward e5 as a reply to e4
        history.push_mv(&root.board, e4);
        history.update_quiet(&after_e4, e5, HistoryScore::bonus(6));
        let on_path = history.quiet_score(&after_e4, e5);
        history.pop_mv();

        // Off the path, only the butterfly and pawn components remain
        let off_path = history.quiet_score(&after_e4, e5);
        assert!(on_path > off_path);
    }

    #[test]
    fn countermove_is_keyed_by_previous_move() {
        let mut history = History::new();
        let root = Position::new(Board::default());

        let e4 = root.board.find_move("e2e4".parse().unwrap()).unwrap();
        let reply = Move::new(E7, E5, MoveKind::DoublePush);

        assert_eq!(history.countermove(), None);

        history.push_mv(&root.board, e4);
        history.add_countermove(reply);
        assert_eq!(history.countermove(), Some(reply));

        history.pop_mv();
        assert_eq!(history.countermove(), None);
    }
}
