//! Win/draw/loss model.
//!
//! Maps an internal centipawn score to expected game-outcome probabilities.
//! The sharpness of the mapping depends on how much material is left: the
//! same +150 is far more decisive in an endgame than in a packed middlegame,
//! so the logistic's parameters are polynomials in the remaining material.

use chess::board::Board;
use chess::piece::PieceType;

pub const WDL_MODEL: WdlModel = WdlModel {
    a: [-1.719, 9.087, -15.35, 354.9],
    b: [-3.875, 28.41, -53.69, 95.54],
};

#[derive(Debug, PartialEq, Copy, Clone)]
pub struct WdlModel {
    pub a: [f64; 4],
    pub b: [f64; 4],
}

#[derive(Debug, PartialEq, Copy, Clone)]
pub struct WdlParams {
    a: f64,
    b: f64,
}

impl WdlModel {
    /// Evaluate the parameter polynomials for the material count on the board.
    pub fn params(&self, board: &Board) -> WdlParams {
        use PieceType::*;

        let material = board.piece_bbs[Pawn].count()
            + 3 * board.piece_bbs[Knight].count()
            + 3 * board.piece_bbs[Bishop].count()
            + 5 * board.piece_bbs[Rook].count()
            + 9 * board.piece_bbs[Queen].count();

        let material = material.clamp(17, 78) as f64 / 58.0;

        WdlParams {
            a: self.a[0]
                .mul_add(material, self.a[1])
                .mul_add(material, self.a[2])
                .mul_add(material, self.a[3]),
            b: self.b[0]
                .mul_add(material, self.b[1])
                .mul_add(material, self.b[2])
                .mul_add(material, self.b[3]),
        }
    }
}

impl WdlParams {
    /// Expected (win, draw, loss) in permille for the given score.
    pub fn wdl(&self, score: i32) -> (u64, u64, u64) {
        let win = 1000.0 / (1.0 + f64::exp((self.a - score as f64) / self.b));
        let loss = 1000.0 / (1.0 + f64::exp((self.a + score as f64) / self.b));
        let draw = 1000.0 - win - loss;

        (win as u64, draw as u64, loss as u64)
    }

    /// Rescale an internal score to the centipawn convention the protocol
    /// expects: `cp = round(value * 100 / normalization)`, anchored so that
    /// a reported 100 is the score at which the model gives even odds of
    /// winning. Internal units never leave the engine unscaled.
    pub fn normalized(&self, score: i32) -> i32 {
        (100.0 * score as f64 / self.a) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wdl_sums_to_permille() {
        let board = Board::default();
        let params = WDL_MODEL.params(&board);

        for score in [-500, -100, 0, 100, 500] {
            let (win, draw, loss) = params.wdl(score);
            let total = win + draw + loss;
            // Rounding may shave off a few permille
            assert!((997..=1000).contains(&total), "w{win} d{draw} l{loss}");
        }
    }

    #[test]
    fn normalization_rescales_but_keeps_shape() {
        let board = Board::default();
        let params = WDL_MODEL.params(&board);

        assert_eq!(params.normalized(0), 0);

        // Sign and ordering survive the rescaling
        assert!(params.normalized(300) > 0);
        assert!(params.normalized(-300) < 0);
        assert!(params.normalized(600) > params.normalized(200));
        assert_eq!(params.normalized(150), -params.normalized(-150));
    }

    #[test]
    fn symmetry_and_monotonicity() {
        let board = Board::default();
        let params = WDL_MODEL.params(&board);

        let (win_plus, _, loss_plus) = params.wdl(200);
        let (win_minus, _, loss_minus) = params.wdl(-200);

        // Mirrored scores swap win and loss (up to rounding)
        assert!(win_plus.abs_diff(loss_minus) <= 1);
        assert!(loss_plus.abs_diff(win_minus) <= 1);

        // Bigger score, better chances
        assert!(params.wdl(300).0 > params.wdl(100).0);
    }
}
