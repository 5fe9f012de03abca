//! Scores and static evaluation.
//!
//! The `Score` type is a plain i32 centipawn value from the point of view of
//! the side to move, with a few distinguished bands at the edges:
//!
//! ```text
//!  -INF  ...mated-in-N...  | ordinary centipawns |  ...mate-in-N...  +INF
//! ```
//!
//! Mate scores encode their distance: `MATE - ply` means "we mate in `ply`
//! plies", so that shorter mates compare higher. A narrow band just inside
//! the mate band is reserved for tablebase wins. `NO_SCORE` is the "nothing
//! stored" marker and lies outside all of it.
//!
//! The static evaluation itself is deliberately plain: tapered material plus
//! piece-square tables, behind the one-function seam the search consumes.
//! Anything smarter (a network, say) slots in behind `evaluate` without the
//! search noticing.

use crate::search::params::MAX_DEPTH;
use chess::board::Board;
use chess::piece::Color;
use chess::piece::PieceType;
use chess::square::Square;

pub type Score = i32;

////////////////////////////////////////////////////////////////////////////////
//
// Score bands and mate arithmetic
//
////////////////////////////////////////////////////////////////////////////////

pub trait ScoreExt {
    const PLUS_INF: Score;
    const MINUS_INF: Score;
    const MATE: Score;
    const TB_WIN: Score;
    const NO_SCORE: Score;
    const DRAW: Score;

    /// "We get mated in `ply` plies": the worst score that still orders
    /// longer survival higher.
    fn mated_in(ply: usize) -> Score;

    /// "We mate in `ply` plies"
    fn mate_in(ply: usize) -> Score;

    /// Is this score inside either mate band?
    fn is_mate(self) -> bool;

    /// Plies until mate (either direction)
    fn mate_distance(self) -> i32;

    /// Translate a score from "plies from the root" to "plies from this
    /// node" before storing it in the TT.
    fn to_tt(self, ply: usize) -> Score;

    /// Undo `to_tt` when reading the entry back at `ply`. A mate that can't
    /// be delivered before the 50-move counter runs out is cut back to the
    /// tablebase band, since the draw rule would interfere with it.
    fn from_tt(self, ply: usize, halfmoves: u8) -> Score;
}

impl ScoreExt for Score {
    const PLUS_INF: Score = 32_001;
    const MINUS_INF: Score = -32_001;
    const MATE: Score = 32_000;
    const TB_WIN: Score = Self::MATE - 2 * MAX_DEPTH as Score;
    const NO_SCORE: Score = 32_002;
    const DRAW: Score = 0;

    fn mated_in(ply: usize) -> Score {
        -Self::MATE + ply as Score
    }

    fn mate_in(ply: usize) -> Score {
        Self::MATE - ply as Score
    }

    fn is_mate(self) -> bool {
        self.abs() > Self::TB_WIN && self.abs() <= Self::MATE
    }

    fn mate_distance(self) -> i32 {
        Self::MATE - self.abs()
    }

    fn to_tt(self, ply: usize) -> Score {
        if self == Self::NO_SCORE {
            self
        } else if self.is_mate() {
            if self > 0 {
                self + ply as Score
            } else {
                self - ply as Score
            }
        } else {
            self
        }
    }

    fn from_tt(self, ply: usize, halfmoves: u8) -> Score {
        if self == Self::NO_SCORE || !self.is_mate() {
            return self;
        }

        // A mate further out than the 50-move rule allows can't be trusted:
        // report it as merely winning.
        let plies_to_mate = self.mate_distance();

        if plies_to_mate > 100 - halfmoves as i32 {
            return if self > 0 {
                Self::TB_WIN - 1
            } else {
                -Self::TB_WIN + 1
            };
        }

        if self > 0 {
            self - ply as Score
        } else {
            self + ply as Score
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
//
// Static evaluation
//
////////////////////////////////////////////////////////////////////////////////

#[rustfmt::skip]
const MG_VALUES: [Score; PieceType::COUNT] = [
    // Pawn, Knight, Bishop, Rook, Queen, King
       82,   337,    365,    477,  1025,  0,
];

#[rustfmt::skip]
const EG_VALUES: [Score; PieceType::COUNT] = [
    // Pawn, Knight, Bishop, Rook, Queen, King
       94,   281,    297,    512,  936,   0,
];

/// Game-phase weights per piece type; 24 at the initial position, 0 with
/// nothing but pawns and kings left.
const PHASE_VALUES: [Score; PieceType::COUNT] = [0, 1, 1, 2, 4, 0];
const MAX_PHASE: Score = 24;

/// Evaluate the board, in centipawns, from the side to move's perspective.
pub fn evaluate(board: &Board) -> Score {
    let mut mg = 0;
    let mut eg = 0;
    let mut phase = 0;

    for sq in board.all_occupied() {
        let piece = board.get_at(sq).unwrap();
        let ptype = piece.piece_type();
        let sign = if piece.color() == board.current { 1 } else { -1 };

        // The tables are written from white's point of view; black reads
        // them through the vertical mirror.
        let table_sq = match piece.color() {
            Color::White => sq.flip(),
            Color::Black => sq,
        };

        phase += PHASE_VALUES[ptype];
        mg += sign * (MG_VALUES[ptype] + MG_TABLES[ptype as usize][table_sq]);
        eg += sign * (EG_VALUES[ptype] + EG_TABLES[ptype as usize][table_sq]);
    }

    let phase = phase.min(MAX_PHASE);

    (mg * phase + eg * (MAX_PHASE - phase)) / MAX_PHASE
}

////////////////////////////////////////////////////////////////////////////////
//
// Piece-square tables
//
// Written out visually: the first row is rank 8, the last is rank 1, from
// white's point of view.
//
////////////////////////////////////////////////////////////////////////////////

#[rustfmt::skip]
const MG_TABLES: [[Score; Square::COUNT]; PieceType::COUNT] = [
    // Pawns: push the center, keep the shield at home
    [
          0,   0,   0,   0,   0,   0,   0,   0,
         60,  65,  55,  70,  70,  55,  65,  60,
         15,  25,  35,  40,  40,  35,  25,  15,
          0,   5,  10,  25,  25,  10,   5,   0,
         -5,   0,   5,  20,  20,   5,   0,  -5,
         -5,  -5,   0,   5,   5,   0,  -5,  -5,
         -5,   5,   0, -15, -15,   0,   5,  -5,
          0,   0,   0,   0,   0,   0,   0,   0,
    ],
    // Knights: rim is grim
    [
        -60, -40, -25, -25, -25, -25, -40, -60,
        -40, -15,   0,   5,   5,   0, -15, -40,
        -25,   5,  15,  20,  20,  15,   5, -25,
        -25,   0,  20,  30,  30,  20,   0, -25,
        -25,   0,  20,  30,  30,  20,   0, -25,
        -25,   5,  15,  20,  20,  15,   5, -25,
        -40, -15,   0,   5,   5,   0, -15, -40,
        -60, -40, -25, -25, -25, -25, -40, -60,
    ],
    // Bishops: long diagonals, avoid the corners
    [
        -20, -10, -10, -10, -10, -10, -10, -20,
        -10,   0,   0,   0,   0,   0,   0, -10,
        -10,   0,  10,  10,  10,  10,   0, -10,
        -10,   5,  10,  15,  15,  10,   5, -10,
        -10,   5,  10,  15,  15,  10,   5, -10,
        -10,  10,  10,  10,  10,  10,  10, -10,
        -10,  10,   0,   5,   5,   0,  10, -10,
        -20, -10, -15, -10, -10, -15, -10, -20,
    ],
    // Rooks: seventh rank, open-file-ish center files
    [
          5,  10,  10,  15,  15,  10,  10,   5,
         15,  20,  20,  25,  25,  20,  20,  15,
          0,   5,   5,  10,  10,   5,   5,   0,
         -5,   0,   0,   5,   5,   0,   0,  -5,
         -5,   0,   0,   5,   5,   0,   0,  -5,
         -5,   0,   0,   5,   5,   0,   0,  -5,
        -10,  -5,   0,   5,   5,   0,  -5, -10,
        -15,  -5,   0,   5,   5,   0,  -5, -15,
    ],
    // Queens: stay modest until developed
    [
        -20, -10, -10,  -5,  -5, -10, -10, -20,
        -10,   0,   0,   0,   0,   0,   0, -10,
        -10,   0,   5,   5,   5,   5,   0, -10,
         -5,   0,   5,  10,  10,   5,   0,  -5,
         -5,   0,   5,  10,  10,   5,   0,  -5,
        -10,   0,   5,   5,   5,   5,   0, -10,
        -10,   0,   0,   0,   0,   0,   0, -10,
        -20, -10, -10,  -5,  -5, -10, -10, -20,
    ],
    // King, middlegame: hide behind the pawns
    [
        -50, -50, -50, -50, -50, -50, -50, -50,
        -40, -40, -40, -40, -40, -40, -40, -40,
        -35, -35, -35, -35, -35, -35, -35, -35,
        -30, -30, -35, -40, -40, -35, -30, -30,
        -20, -25, -30, -35, -35, -30, -25, -20,
        -10, -15, -20, -25, -25, -20, -15, -10,
          5,   5, -10, -20, -20, -10,   5,   5,
         15,  25,   5, -10, -10,   0,  30,  15,
    ],
];

#[rustfmt::skip]
const EG_TABLES: [[Score; Square::COUNT]; PieceType::COUNT] = [
    // Pawns: passed-pawn geometry, runners are everything
    [
          0,   0,   0,   0,   0,   0,   0,   0,
        110, 105, 100,  90,  90, 100, 105, 110,
         60,  60,  50,  45,  45,  50,  60,  60,
         25,  25,  20,  15,  15,  20,  25,  25,
         10,  10,   5,   5,   5,   5,  10,  10,
          0,   0,   0,   0,   0,   0,   0,   0,
         -5,  -5,  -5,  -5,  -5,  -5,  -5,  -5,
          0,   0,   0,   0,   0,   0,   0,   0,
    ],
    // Knights
    [
        -45, -30, -20, -20, -20, -20, -30, -45,
        -30, -10,   0,   0,   0,   0, -10, -30,
        -20,   0,  10,  15,  15,  10,   0, -20,
        -20,   5,  15,  20,  20,  15,   5, -20,
        -20,   5,  15,  20,  20,  15,   5, -20,
        -20,   0,  10,  15,  15,  10,   0, -20,
        -30, -10,   0,   0,   0,   0, -10, -30,
        -45, -30, -20, -20, -20, -20, -30, -45,
    ],
    // Bishops
    [
        -15,  -5,  -5,  -5,  -5,  -5,  -5, -15,
         -5,   0,   0,   0,   0,   0,   0,  -5,
         -5,   0,   5,  10,  10,   5,   0,  -5,
         -5,   5,  10,  10,  10,  10,   5,  -5,
         -5,   5,  10,  10,  10,  10,   5,  -5,
         -5,   0,   5,  10,  10,   5,   0,  -5,
         -5,   0,   0,   0,   0,   0,   0,  -5,
        -15,  -5,  -5,  -5,  -5,  -5,  -5, -15,
    ],
    // Rooks
    [
         10,  10,  10,  10,  10,  10,  10,  10,
         15,  15,  15,  15,  15,  15,  15,  15,
          5,   5,   5,   5,   5,   5,   5,   5,
          0,   0,   0,   0,   0,   0,   0,   0,
          0,   0,   0,   0,   0,   0,   0,   0,
          0,   0,   0,   0,   0,   0,   0,   0,
          0,   0,   0,   0,   0,   0,   0,   0,
          0,   0,   0,   0,   0,   0,   0,   0,
    ],
    // Queens
    [
        -10,  -5,  -5,  -5,  -5,  -5,  -5, -10,
         -5,   0,   5,   5,   5,   5,   0,  -5,
         -5,   5,  10,  10,  10,  10,   5,  -5,
         -5,   5,  10,  15,  15,  10,   5,  -5,
         -5,   5,  10,  15,  15,  10,   5,  -5,
         -5,   5,  10,  10,  10,  10,   5,  -5,
         -5,   0,   5,   5,   5,   5,   0,  -5,
        -10,  -5,  -5,  -5,  -5,  -5,  -5, -10,
    ],
    // King, endgame: march to the center
    [
        -40, -25, -15, -10, -10, -15, -25, -40,
        -25,  -5,   5,  10,  10,   5,  -5, -25,
        -15,   5,  15,  20,  20,  15,   5, -15,
        -10,  10,  20,  30,  30,  20,  10, -10,
        -10,  10,  20,  30,  30,  20,  10, -10,
        -15,   5,  15,  20,  20,  15,   5, -15,
        -25,  -5,   5,  10,  10,   5,  -5, -25,
        -40, -25, -15, -10, -10, -15, -25, -40,
    ],
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mate_arithmetic() {
        assert!(Score::mate_in(3) > Score::mate_in(5));
        assert!(Score::mated_in(3) < Score::mated_in(5));
        assert!(Score::mate_in(1).is_mate());
        assert!(Score::mated_in(1).is_mate());
        assert!(!500.is_mate());
        assert_eq!(Score::mate_in(7).mate_distance(), 7);
    }

    #[test]
    fn tt_translation_roundtrips_for_normal_scores() {
        for score in [-2500, -1, 0, 42, 1800] {
            assert_eq!(score.to_tt(12).from_tt(12, 0), score);
        }
    }

    #[test]
    fn tt_translation_shifts_mates_by_ply() {
        let mate = Score::mate_in(5);

        // Stored at ply 3, the entry says "mate in 8 from this node"
        assert_eq!(mate.to_tt(3), Score::MATE - 8);

        // Read back at a different ply, the distance adapts
        assert_eq!(mate.to_tt(3).from_tt(1, 0), Score::mate_in(7));
    }

    #[test]
    fn unprovable_mates_fall_back_to_winning() {
        // Mate in 30 plies, but only 4 plies of 50-move budget left
        let far_mate = Score::mate_in(30).to_tt(0);
        let score = far_mate.from_tt(0, 96);

        assert!(!score.is_mate());
        assert!(score > 10_000);
    }

    #[test]
    fn startpos_is_roughly_balanced() {
        let score = evaluate(&Board::default());
        assert!(score.abs() < 50, "startpos evaluated at {score}");
    }

    #[test]
    fn evaluation_is_symmetric() {
        // The same position with colors swapped evaluates to the same score
        // for the respective side to move
        let white: Board = "4k3/8/8/8/8/8/PPP5/4K3 w - - 0 1".parse().unwrap();
        let black: Board = "4k3/ppp5/8/8/8/8/8/4K3 b - - 0 1".parse().unwrap();

        assert_eq!(evaluate(&white), evaluate(&black));
    }

    #[test]
    fn material_up_is_winning() {
        let board: Board = "4k3/8/8/8/8/8/8/Q3K3 w - - 0 1".parse().unwrap();
        assert!(evaluate(&board) > 800);
        assert!(evaluate(&board.play_null_move()) < -800);
    }
}
